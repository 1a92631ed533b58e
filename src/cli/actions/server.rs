use crate::auth::token::TokenService;
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::hasura::Hasura;
use crate::kadra;
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port } => {
            Url::parse(&globals.graphql_url).context("invalid GraphQL endpoint URL")?;

            let tokens = TokenService::from_secret(globals.jwt_secret.expose_secret())
                .context("invalid JWT secret document")?;

            let hasura = Hasura::new(globals)?;

            kadra::new(port, globals, hasura, tokens).await?;
        }
    }

    Ok(())
}
