//! Configuration management for Lambda functions.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Full connection string, bypasses Secrets Manager when set (local runs)
    pub database_url: Option<String>,
    /// Database host, when the credentials secret does not carry one
    pub db_host: Option<String>,
    /// Database port
    pub db_port: u16,
    /// Database name
    pub db_name: String,
    /// ARN of the secret containing database credentials
    pub db_secret_arn: Option<String>,
    /// Pool size per container
    pub db_max_connections: u32,
    /// How long a request waits for a pooled connection
    pub db_acquire_timeout: Duration,
    /// AWS region
    pub aws_region: String,
    /// Role assumed for requests without authorizer claims
    pub anon_role: String,
    /// Role assumed for requests carrying authorizer claims
    pub authenticated_role: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL");
        let db_secret_arn = lookup("DATABASE_URL_SECRET_ARN");

        if database_url.is_none() && db_secret_arn.is_none() {
            return Err(Error::Config(
                "either DATABASE_URL or DATABASE_URL_SECRET_ARN must be set".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            db_host: lookup("DATABASE_HOST"),
            db_port: parse_or(&lookup, "DATABASE_PORT", 5432)?,
            db_name: lookup("DATABASE_NAME").unwrap_or_else(|| "worldkeeper".to_string()),
            db_secret_arn,
            db_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                3,
            )?),
            aws_region: lookup("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            anon_role: lookup("DB_ANON_ROLE").unwrap_or_else(|| "anon".to_string()),
            authenticated_role: lookup("DB_AUTHENTICATED_ROLE")
                .unwrap_or_else(|| "authenticated".to_string()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid number: {:?}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("DATABASE_HOST", "db.internal"),
            ("DATABASE_URL_SECRET_ARN", "arn:aws:secretsmanager:us-east-1:1:secret:db"),
        ])
        .unwrap();

        assert_eq!(config.db_host.as_deref(), Some("db.internal"));
        assert_eq!(config.db_port, 5432);
        assert_eq!(config.db_name, "worldkeeper");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.db_acquire_timeout, Duration::from_secs(3));
        assert_eq!(config.anon_role, "anon");
        assert_eq!(config.authenticated_role, "authenticated");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_database_url_override() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/worlds")]).unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/worlds")
        );
        assert!(config.db_secret_arn.is_none());
    }

    #[test]
    fn test_missing_connection_settings() {
        assert!(matches!(load(&[]), Err(Error::Config(_))));
    }

    #[test]
    fn test_host_may_come_from_secret() {
        let config = load(&[("DATABASE_URL_SECRET_ARN", "arn")]).unwrap();
        assert!(config.db_host.is_none());
        assert_eq!(config.db_secret_arn.as_deref(), Some("arn"));
    }

    #[test]
    fn test_invalid_number() {
        let result = load(&[
            ("DATABASE_URL", "postgres://localhost/worlds"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ]);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
