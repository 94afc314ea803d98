//! Database connection management.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::debug;

use crate::client::DataSource;
use crate::error::BackendError;
use crate::query::{FilterValue, Select};
use crate::secrets::DatabaseCredentials;
use crate::session::SessionContext;
use crate::{Config, Error, Result};

/// Connection options for the pool.
///
/// `DATABASE_URL` wins when set; otherwise the pool connects with the
/// credentials from Secrets Manager, falling back to the configured host,
/// port and database name where the secret leaves them out.
pub fn connect_options(
    config: &Config,
    credentials: Option<&DatabaseCredentials>,
) -> Result<PgConnectOptions> {
    match (&config.database_url, credentials) {
        (Some(url), _) => url
            .parse::<PgConnectOptions>()
            .map_err(|e| Error::Config(format!("Invalid DATABASE_URL: {}", e))),
        (None, Some(creds)) => {
            let host = creds
                .host
                .as_deref()
                .or(config.db_host.as_deref())
                .ok_or_else(|| {
                    Error::Config("No database host in secret or DATABASE_HOST".to_string())
                })?;

            Ok(PgConnectOptions::new()
                .host(host)
                .port(creds.port.unwrap_or(config.db_port))
                .database(creds.dbname.as_deref().unwrap_or(&config.db_name))
                .username(&creds.username)
                .password(&creds.password))
        }
        (None, None) => Err(Error::Config(
            "No database credentials available".to_string(),
        )),
    }
}

/// Create a database connection pool.
pub async fn create_pool(
    config: &Config,
    credentials: Option<&DatabaseCredentials>,
) -> Result<PgPool> {
    let options = connect_options(config, credentials)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// PostgreSQL-backed [`DataSource`].
///
/// Every fetch runs in its own read-only transaction with the caller's role
/// and claims set transaction-locally, so row-level security policies see
/// the caller rather than the pool's login role.
#[derive(Clone)]
pub struct PgDataSource {
    pool: PgPool,
}

impl PgDataSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataSource for PgDataSource {
    async fn fetch(
        &self,
        session: &SessionContext,
        select: &Select,
    ) -> std::result::Result<Vec<Value>, BackendError> {
        let statement = select.to_statement();
        debug!(sql = %statement.sql, role = session.role(), "running select");

        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "SELECT set_config('role', $1, true), set_config('request.jwt.claims', $2, true)",
        )
        .bind(session.role())
        .bind(session.claims().to_string())
        .execute(&mut *tx)
        .await?;

        let mut query = sqlx::query_scalar::<_, Json<Value>>(&statement.sql);
        for param in &statement.params {
            query = match param {
                FilterValue::Int(v) => query.bind(*v),
                FilterValue::Text(v) => query.bind(v.clone()),
                FilterValue::Bool(v) => query.bind(*v),
            };
        }

        let rows = query.fetch_all(&mut *tx).await?;
        tx.rollback().await?;

        Ok(rows.into_iter().map(|Json(row)| row).collect())
    }
}
