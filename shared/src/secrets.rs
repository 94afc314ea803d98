//! AWS Secrets Manager integration.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{Error, Result};

/// Secrets fetched by this container, keyed by ARN.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Database credentials as stored by RDS-managed secrets.
#[derive(Debug, Deserialize)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
}

impl DatabaseCredentials {
    /// Parse the secret string of a database secret.
    pub fn parse(secret_string: &str) -> Result<Self> {
        serde_json::from_str(secret_string)
            .map_err(|e| Error::Aws(format!("Failed to parse database credentials: {}", e)))
    }
}

/// Get a secret value from Secrets Manager with caching.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(secret_arn) {
            debug!(secret_arn, "secret cache hit");
            return Ok(value.clone());
        }
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    get_cache()
        .write()
        .await
        .insert(secret_arn.to_string(), secret_string.clone());

    Ok(secret_string)
}

/// Get database credentials from Secrets Manager.
pub async fn get_database_credentials(
    client: &SecretsClient,
    secret_arn: &str,
) -> Result<DatabaseCredentials> {
    let secret_string = get_secret(client, secret_arn).await?;
    DatabaseCredentials::parse(&secret_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let json = r#"{"username":"calendar_reader","password":"secret123","host":"db.example.com","port":5432,"dbname":"worldkeeper"}"#;
        let creds = DatabaseCredentials::parse(json).unwrap();
        assert_eq!(creds.username, "calendar_reader");
        assert_eq!(creds.password, "secret123");
        assert_eq!(creds.host.as_deref(), Some("db.example.com"));
        assert_eq!(creds.port, Some(5432));
    }

    #[test]
    fn test_parse_credentials_minimal() {
        let creds = DatabaseCredentials::parse(r#"{"username":"u","password":"p"}"#).unwrap();
        assert!(creds.host.is_none());
        assert!(creds.dbname.is_none());
    }

    #[test]
    fn test_parse_credentials_rejects_garbage() {
        assert!(matches!(
            DatabaseCredentials::parse("not json"),
            Err(Error::Aws(_))
        ));
    }
}
