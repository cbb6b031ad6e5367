//! Server configuration read from the environment.

use tracing::warn;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE_URL: &str = "sqlite:chope.db";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:8080";
const DEV_JWT_SECRET: &str = "chope-development-secret-change-me";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), cfg!(debug_assertions))
    }

    /// Build a config from any key lookup. Without a `JWT_SECRET`, `allow_dev_secret`
    /// decides between the development fallback and an error.
    pub fn from_lookup<F>(lookup: F, allow_dev_secret: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let token_ttl_hours = match lookup("TOKEN_TTL_HOURS") {
            Some(value) => match value.trim().parse::<i64>() {
                Ok(hours) if (1..=MAX_TOKEN_TTL_HOURS).contains(&hours) => hours,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "TOKEN_TTL_HOURS",
                        value,
                    })
                }
            },
            None => DEFAULT_TOKEN_TTL_HOURS,
        };

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret,
            None if allow_dev_secret => {
                warn!("JWT_SECRET is not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        Ok(Self {
            port,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            jwt_secret,
            token_ttl_hours,
            cors_origin: lookup("CORS_ORIGIN")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
        })
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]), true).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, "sqlite:chope.db");
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.cors_origin, "http://localhost:8080");
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(
            lookup(&[
                ("PORT", "8081"),
                ("DATABASE_URL", "sqlite::memory:"),
                ("JWT_SECRET", "s3cret"),
                ("TOKEN_TTL_HOURS", "2"),
            ]),
            false,
        )
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.token_ttl(), chrono::Duration::hours(2));
    }

    #[test]
    fn test_release_requires_secret() {
        let result = Config::from_lookup(lookup(&[]), false);
        assert_eq!(result.unwrap_err(), ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("PORT", "abc")]), true),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("TOKEN_TTL_HOURS", "0")]), true),
            Err(ConfigError::Invalid { name: "TOKEN_TTL_HOURS", .. })
        ));
    }

    #[test]
    fn test_token_ttl_is_capped_at_a_year() {
        let config = Config::from_lookup(lookup(&[("TOKEN_TTL_HOURS", "8760")]), true).unwrap();
        assert_eq!(config.token_ttl(), chrono::Duration::days(365));

        for value in ["8761", "9223372036854775807"] {
            assert!(matches!(
                Config::from_lookup(lookup(&[("TOKEN_TTL_HOURS", value)]), true),
                Err(ConfigError::Invalid { name: "TOKEN_TTL_HOURS", .. })
            ));
        }
    }
}
