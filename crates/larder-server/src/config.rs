//! Server configuration, loaded from the environment once at startup.

use larder_auth::config::AuthConfig;
use larder_db::DbConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Everything the server needs to come up. The token secret has no
/// default; the server refuses to start without one.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|name| std::env::var(name).ok())
    }

    fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_defaults = DbConfig::default();
        let db = DbConfig {
            url: get("LARDER_DB_URL").unwrap_or(db_defaults.url),
            namespace: get("LARDER_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
            database: get("LARDER_DB_DATABASE").unwrap_or(db_defaults.database),
            username: get("LARDER_DB_USERNAME").unwrap_or(db_defaults.username),
            password: get("LARDER_DB_PASSWORD").unwrap_or(db_defaults.password),
        };

        let token_secret = get("LARDER_TOKEN_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("LARDER_TOKEN_SECRET"))?;
        let auth_defaults = AuthConfig::default();
        let auth = AuthConfig {
            token_secret,
            access_token_lifetime_secs: parse_or(
                get("LARDER_TOKEN_LIFETIME_SECS"),
                "LARDER_TOKEN_LIFETIME_SECS",
                auth_defaults.access_token_lifetime_secs,
            )?,
            pepper: get("LARDER_PASSWORD_PEPPER"),
            min_password_length: parse_or(
                get("LARDER_MIN_PASSWORD_LENGTH"),
                "LARDER_MIN_PASSWORD_LENGTH",
                auth_defaults.min_password_length,
            )?,
        };

        Ok(Self { db, auth })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
