use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub frontend_url: String,
    pub token_seed: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(frontend_url: String, token_seed: SecretString) -> Self {
        Self {
            frontend_url,
            token_seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            "https://app.laboro.dev".to_string(),
            SecretString::from("seed"),
        );
        assert_eq!(args.frontend_url, "https://app.laboro.dev");
        assert_eq!(args.token_seed.expose_secret(), "seed");
    }
}
