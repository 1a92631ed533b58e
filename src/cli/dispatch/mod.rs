use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let graphql_url = matches
        .get_one("graphql-url")
        .map(|s: &String| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --graphql-url"))?;

    let mut globals = GlobalArgs::new(graphql_url);

    let admin_secret = matches
        .get_one("admin-secret")
        .map(|s: &String| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --admin-secret"))?;
    globals.set_admin_secret(SecretString::from(admin_secret));

    let jwt_secret = matches
        .get_one("jwt-secret")
        .map(|s: &String| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --jwt-secret"))?;
    globals.set_jwt_secret(SecretString::from(jwt_secret));

    let action = Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(3000),
    };

    Ok((action, globals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn test_handler_builds_action_and_globals() -> Result<()> {
        let matches = commands::new().get_matches_from(vec![
            "kadra",
            "--port",
            "8088",
            "--graphql-url",
            "https://graphql.tld/v1/graphql",
            "--admin-secret",
            "s3cr3t",
            "--jwt-secret",
            r#"{"type":"HS256","key":"k"}"#,
        ]);

        let (action, globals) = handler(&matches)?;

        let Action::Server { port } = action;
        assert_eq!(port, 8088);
        assert_eq!(globals.graphql_url, "https://graphql.tld/v1/graphql");
        assert_eq!(globals.admin_secret.expose_secret(), "s3cr3t");
        Ok(())
    }
}
