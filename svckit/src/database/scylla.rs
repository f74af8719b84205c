use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use scylla::frame::value::CqlTimestamp;
use scylla::statement::Consistency;
use scylla::transport::execution_profile::ExecutionProfile;
use scylla::transport::session::PoolSize;
use scylla::{Session, SessionBuilder};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::query_builder::QueryBuilder;
use super::session::{Connector, CqlSession, UserStream};
use crate::config::DatabaseConfig;
use crate::errors::{DataError, DriverError};
use crate::types::{ConsistencyLevel, KeyspaceDefinition, TableDefinition, UserId, UserRecord};

/// Column order of every users SELECT built by `QueryBuilder`.
type UserRow = (Uuid, Option<String>, Option<String>, Option<CqlTimestamp>);

/// ScyllaDB/Cassandra session wrapper
pub struct ScyllaConnection {
    session: Session,
    contact_points: Vec<String>,
}

impl ScyllaConnection {
    /// Connect to the cluster. The session starts without a keyspace.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DataError> {
        let contact_points = config.contact_points();
        info!("Connecting to cluster: {:?}", contact_points);

        let pool_size = NonZeroUsize::new(config.pool_size as usize).unwrap_or(NonZeroUsize::MIN);

        let profile = ExecutionProfile::builder()
            .consistency(config.consistency.into())
            .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)))
            .build();

        let mut session_builder = SessionBuilder::new()
            .known_nodes(&contact_points)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .pool_size(PoolSize::PerShard(pool_size))
            .default_execution_profile_handle(profile.into_handle());

        // Add authentication if provided
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            session_builder = session_builder.user(username, password);
        }

        let session = session_builder.build().await.map_err(|e| {
            error!("Failed to connect to {:?}: {}", contact_points, e);
            DataError::ConnectionError(format!("Connection to {:?} failed: {}", contact_points, e))
        })?;

        info!("Successfully connected to cluster");

        Ok(Self {
            session,
            contact_points,
        })
    }

    /// Get the underlying Scylla session
    pub fn get_session(&self) -> &Session {
        &self.session
    }

    pub fn contact_points(&self) -> &[String] {
        &self.contact_points
    }
}

#[async_trait]
impl CqlSession for ScyllaConnection {
    async fn create_keyspace(&self, keyspace: &KeyspaceDefinition) -> Result<(), DriverError> {
        let query = QueryBuilder::build_create_keyspace(keyspace);
        debug!("Executing: {}", query);
        self.session.query_unpaged(query, ()).await?;
        Ok(())
    }

    async fn use_keyspace(&self, keyspace: &str) -> Result<(), DriverError> {
        self.session.use_keyspace(keyspace, false).await?;
        Ok(())
    }

    async fn create_table(&self, table: &TableDefinition) -> Result<(), DriverError> {
        let query = QueryBuilder::build_create_table(table);
        debug!("Executing: {}", query);
        self.session.query_unpaged(query, ()).await?;
        Ok(())
    }

    async fn insert_user(
        &self,
        table: &str,
        user_id: UserId,
        username: &str,
        email: &str,
    ) -> Result<(), DriverError> {
        self.session
            .query_unpaged(
                QueryBuilder::build_insert_user(table),
                (user_id.as_uuid(), username, email),
            )
            .await?;
        Ok(())
    }

    async fn scan_users(&self, table: &str) -> Result<UserStream, DriverError> {
        let rows = self
            .session
            .query_iter(QueryBuilder::build_select_users(table), ())
            .await?
            .into_typed::<UserRow>();

        Ok(rows
            .map(|row| {
                row.map_err(|e| DriverError::new(format!("Failed to fetch row: {}", e)))
                    .and_then(decode_user_row)
            })
            .boxed())
    }

    async fn fetch_user(
        &self,
        table: &str,
        user_id: UserId,
    ) -> Result<Option<UserRecord>, DriverError> {
        let result = self
            .session
            .query_unpaged(
                QueryBuilder::build_select_user_by_id(table),
                (user_id.as_uuid(),),
            )
            .await?;

        let row = result
            .maybe_first_row_typed::<UserRow>()
            .map_err(|e| DriverError::new(format!("Failed to decode row: {}", e)))?;

        row.map(decode_user_row).transpose()
    }

    async fn shutdown(self) {
        // Dropping the session closes its connection pools
        drop(self.session);
        info!("Connection to {:?} closed", self.contact_points);
    }
}

fn decode_user_row(
    (user_id, username, email, created_at): UserRow,
) -> Result<UserRecord, DriverError> {
    UserRecord::from_columns(user_id, username, email, created_at.map(|ts| ts.0))
}

impl From<ConsistencyLevel> for Consistency {
    fn from(level: ConsistencyLevel) -> Self {
        match level {
            ConsistencyLevel::Any => Consistency::Any,
            ConsistencyLevel::One => Consistency::One,
            ConsistencyLevel::Two => Consistency::Two,
            ConsistencyLevel::Three => Consistency::Three,
            ConsistencyLevel::Quorum => Consistency::Quorum,
            ConsistencyLevel::All => Consistency::All,
            ConsistencyLevel::LocalQuorum => Consistency::LocalQuorum,
            ConsistencyLevel::EachQuorum => Consistency::EachQuorum,
            ConsistencyLevel::LocalOne => Consistency::LocalOne,
        }
    }
}

/// Connects through the scylla driver (ScyllaDB or Cassandra 4.x).
#[derive(Debug, Default, Clone, Copy)]
pub struct ScyllaConnector;

#[async_trait]
impl Connector for ScyllaConnector {
    type Session = ScyllaConnection;

    async fn connect(&self, config: &DatabaseConfig) -> Result<ScyllaConnection, DataError> {
        ScyllaConnection::new(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReplicationStrategy;

    #[test]
    fn test_consistency_mapping() {
        assert_eq!(Consistency::from(ConsistencyLevel::LocalOne), Consistency::LocalOne);
        assert_eq!(Consistency::from(ConsistencyLevel::Quorum), Consistency::Quorum);
        assert_eq!(Consistency::from(ConsistencyLevel::EachQuorum), Consistency::EachQuorum);
    }

    #[test]
    fn test_decode_user_row() {
        let id = Uuid::new_v4();
        let row: UserRow = (
            id,
            Some("jane_smith".to_string()),
            Some("jane@example.com".to_string()),
            Some(CqlTimestamp(1_700_000_000_000)),
        );

        let record = decode_user_row(row).unwrap();
        assert_eq!(record.user_id, UserId::from(id));
        assert_eq!(record.username, "jane_smith");

        assert!(decode_user_row((id, None, None, None)).is_err());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let config = DatabaseConfig {
            hosts: vec!["127.0.0.1:1".to_string()],
            connection_timeout_secs: 1,
            ..DatabaseConfig::default()
        };

        let result = ScyllaConnector.connect(&config).await;
        assert!(matches!(result, Err(DataError::ConnectionError(_))));
    }

    #[tokio::test]
    #[ignore] // Requires running Cassandra/ScyllaDB instance
    async fn test_round_trip_against_cluster() {
        let conn = ScyllaConnection::new(&DatabaseConfig::default()).await.unwrap();

        let keyspace = KeyspaceDefinition {
            name: "user_registry_it".to_string(),
            replication: ReplicationStrategy::default(),
        };
        conn.create_keyspace(&keyspace).await.unwrap();
        conn.create_keyspace(&keyspace).await.unwrap();
        conn.use_keyspace(&keyspace.name).await.unwrap();
        conn.create_table(&TableDefinition::users("users")).await.unwrap();
        conn.create_table(&TableDefinition::users("users")).await.unwrap();

        let user_id = UserId::generate();
        conn.insert_user("users", user_id, "john_doe", "john@example.com")
            .await
            .unwrap();

        let found = conn.fetch_user("users", user_id).await.unwrap().unwrap();
        assert_eq!(found.username, "john_doe");
        assert_eq!(found.email, "john@example.com");

        let missing = conn.fetch_user("users", UserId::generate()).await.unwrap();
        assert!(missing.is_none());

        let scanned: Vec<UserId> = conn
            .scan_users("users")
            .await
            .unwrap()
            .filter_map(|row| async move { row.ok().map(|r| r.user_id) })
            .collect()
            .await;
        assert!(scanned.contains(&user_id));

        conn.shutdown().await;
    }
}
