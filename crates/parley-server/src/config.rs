use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Placeholder JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PARLEY_JWT_SECRET is unset or still a placeholder")]
    MissingSecret,

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("PARLEY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret);
        }

        let db_path = lookup("PARLEY_DB_PATH").unwrap_or_else(|| "parley.db".into());
        let host = lookup("PARLEY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = lookup("PARLEY_PORT").unwrap_or_else(|| "3000".into());
        let addr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                var: "PARLEY_HOST/PARLEY_PORT",
                value: format!("{}:{}", host, port),
            })?;

        let token_days = match lookup("PARLEY_TOKEN_DAYS") {
            Some(value) => match value.parse::<i64>() {
                Ok(days) if days > 0 => days,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "PARLEY_TOKEN_DAYS",
                        value,
                    });
                }
            },
            None => 30,
        };

        Ok(Self {
            db_path: db_path.into(),
            addr,
            jwt_secret,
            token_ttl: chrono::Duration::days(token_days),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("PARLEY_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("parley.db"));
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.token_ttl, chrono::Duration::days(30));
    }

    #[test]
    fn test_rejects_placeholder_secret() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingSecret)));
        assert!(matches!(
            load(&[("PARLEY_JWT_SECRET", "dev-secret-change-me")]),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = load(&[
            ("PARLEY_JWT_SECRET", "s3cret"),
            ("PARLEY_HOST", "127.0.0.1"),
            ("PARLEY_PORT", "8080"),
            ("PARLEY_TOKEN_DAYS", "7"),
        ])
        .unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.token_ttl, chrono::Duration::days(7));

        assert!(matches!(
            load(&[("PARLEY_JWT_SECRET", "s3cret"), ("PARLEY_PORT", "http")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            load(&[("PARLEY_JWT_SECRET", "s3cret"), ("PARLEY_TOKEN_DAYS", "0")]),
            Err(ConfigError::Invalid { var: "PARLEY_TOKEN_DAYS", .. })
        ));
    }
}
