use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub graphql_url: String,
    pub admin_secret: SecretString,
    pub jwt_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(graphql_url: String) -> Self {
        Self {
            graphql_url,
            admin_secret: SecretString::default(),
            jwt_secret: SecretString::default(),
        }
    }

    pub fn set_admin_secret(&mut self, secret: SecretString) {
        self.admin_secret = secret;
    }

    pub fn set_jwt_secret(&mut self, secret: SecretString) {
        self.jwt_secret = secret;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let url = "https://graphql.kadra.test/v1/graphql".to_string();
        let args = GlobalArgs::new(url);
        assert_eq!(args.graphql_url, "https://graphql.kadra.test/v1/graphql");
        assert_eq!(args.admin_secret.expose_secret(), "");
        assert_eq!(args.jwt_secret.expose_secret(), "");
    }

    #[test]
    fn test_set_secrets() {
        let mut args = GlobalArgs::new("http://localhost:8080".to_string());
        args.set_admin_secret(SecretString::from("admin".to_string()));
        args.set_jwt_secret(SecretString::from(
            "{\"type\":\"HS256\",\"key\":\"k\"}".to_string(),
        ));
        assert_eq!(args.admin_secret.expose_secret(), "admin");
        assert!(args.jwt_secret.expose_secret().contains("HS256"));
    }
}
