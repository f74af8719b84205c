use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::DatabaseConfig;
use crate::errors::{DataError, DriverError};
use crate::types::{KeyspaceDefinition, TableDefinition, UserId, UserRecord};

/// Rows of a full-table scan, fetched page by page as the stream is polled.
pub type UserStream = BoxStream<'static, Result<UserRecord, DriverError>>;

/// The narrow slice of a CQL client the registry needs.
///
/// Schema statements use `IF NOT EXISTS`; data statements run against the
/// keyspace selected with `use_keyspace`.
#[async_trait]
pub trait CqlSession: Send + Sync {
    async fn create_keyspace(&self, keyspace: &KeyspaceDefinition) -> Result<(), DriverError>;

    async fn use_keyspace(&self, keyspace: &str) -> Result<(), DriverError>;

    async fn create_table(&self, table: &TableDefinition) -> Result<(), DriverError>;

    /// Insert one row; `created_at` is assigned by the server.
    async fn insert_user(
        &self,
        table: &str,
        user_id: UserId,
        username: &str,
        email: &str,
    ) -> Result<(), DriverError>;

    async fn scan_users(&self, table: &str) -> Result<UserStream, DriverError>;

    async fn fetch_user(
        &self,
        table: &str,
        user_id: UserId,
    ) -> Result<Option<UserRecord>, DriverError>;

    /// Release the session. Consumes it, so it runs at most once.
    async fn shutdown(self)
    where
        Self: Sized;
}

/// Opens sessions against a cluster.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: CqlSession;

    /// Fails with `DataError::ConnectionError`.
    async fn connect(&self, config: &DatabaseConfig) -> Result<Self::Session, DataError>;
}
