//! Request-scoped data access.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::BackendError;
use crate::query::Select;
use crate::session::SessionContext;

/// Rows the single-row contract fetches, one more than it accepts.
const SINGLE_ROW_PROBE: u64 = 2;

/// Something that can run a [`Select`] on behalf of a caller.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Run the select under `session`, returning one JSON object per row.
    async fn fetch(
        &self,
        session: &SessionContext,
        select: &Select,
    ) -> Result<Vec<Value>, BackendError>;

    /// Bind this source to one request's session.
    fn scoped(&self, session: SessionContext) -> ScopedClient<'_, Self>
    where
        Self: Sized,
    {
        ScopedClient::new(self, session)
    }
}

/// A data source bound to the session of a single request.
pub struct ScopedClient<'a, D: ?Sized> {
    source: &'a D,
    session: SessionContext,
}

impl<'a, D: DataSource + ?Sized> ScopedClient<'a, D> {
    pub fn new(source: &'a D, session: SessionContext) -> Self {
        Self { source, session }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// All rows matching the select.
    pub async fn select(&self, select: &Select) -> Result<Vec<Value>, BackendError> {
        self.source.fetch(&self.session, select).await
    }

    /// Exactly one row, decoded into `T`.
    ///
    /// The select is issued with a limit of two so a surplus match is seen
    /// rather than silently dropped. Zero rows and more than one row are
    /// both errors.
    pub async fn single<T: DeserializeOwned>(&self, select: &Select) -> Result<T, BackendError> {
        let probe = select.clone().limit(SINGLE_ROW_PROBE);
        let mut rows = self.source.fetch(&self.session, &probe).await?;

        debug!(table = select.table(), rows = rows.len(), "single-row read");

        match rows.len() {
            0 => Err(BackendError::NoRows),
            1 => Ok(serde_json::from_value(rows.remove(0))?),
            _ => Err(BackendError::MultipleRows),
        }
    }
}
