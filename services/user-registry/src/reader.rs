use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, warn};

use svckit::{
    database::CqlSession,
    errors::DataError,
    types::{UserId, UserRecord},
};

pub struct RecordReader<'a, S> {
    session: &'a S,
    table: &'a str,
}

impl<'a, S: CqlSession> RecordReader<'a, S> {
    pub fn new(session: &'a S, table: &'a str) -> Self {
        Self { session, table }
    }

    /// Full-table scan. Rows are fetched lazily, page by page, as the stream
    /// is polled; errors on individual rows arrive as stream items.
    pub async fn list_all_users(
        &self,
    ) -> Result<BoxStream<'static, Result<UserRecord, DataError>>, DataError> {
        let rows = self.session.scan_users(self.table).await.map_err(|e| {
            warn!("Scan of {} failed: {}", self.table, e);
            DataError::ReadError(format!("listing users failed: {}", e))
        })?;

        Ok(rows
            .map(|row| {
                row.map_err(|e| DataError::ReadError(format!("reading user row failed: {}", e)))
            })
            .boxed())
    }

    /// Point lookup by primary key. A missing row is `Ok(None)`.
    pub async fn get_user_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, DataError> {
        let user = self
            .session
            .fetch_user(self.table, user_id)
            .await
            .map_err(|e| {
                warn!("Lookup of user {} failed: {}", user_id, e);
                DataError::ReadError(format!("looking up user {} failed: {}", user_id, e))
            })?;

        debug!("Lookup of {} found {} row(s)", user_id, usize::from(user.is_some()));
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use svckit::config::DatabaseConfig;
    use svckit::database::{Connector, Fault, MemoryConnector, MemorySession};
    use svckit::types::{KeyspaceDefinition, ReplicationStrategy, TableDefinition};

    use crate::writer::RecordWriter;

    async fn ready_session(connector: &MemoryConnector) -> MemorySession {
        let session = connector.connect(&DatabaseConfig::default()).await.unwrap();
        session
            .create_keyspace(&KeyspaceDefinition {
                name: "ks".to_string(),
                replication: ReplicationStrategy::default(),
            })
            .await
            .unwrap();
        session.use_keyspace("ks").await.unwrap();
        session.create_table(&TableDefinition::users("users")).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_round_trip() {
        let connector = MemoryConnector::new();
        let session = ready_session(&connector).await;
        let writer = RecordWriter::new(&session, "users");
        let reader = RecordReader::new(&session, "users");

        let id = writer.insert_user("john_doe", "john@example.com").await.unwrap();
        let user = reader.get_user_by_id(id).await.unwrap().unwrap();

        assert_eq!(user.user_id, id);
        assert_eq!(user.username, "john_doe");
        assert_eq!(user.email, "john@example.com");
        assert!(user.created_at <= chrono::Utc::now());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let connector = MemoryConnector::new();
        let session = ready_session(&connector).await;
        let reader = RecordReader::new(&session, "users");

        let result = reader.get_user_by_id(UserId::generate()).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_full_scan_contains_inserted_ids() {
        let connector = MemoryConnector::new();
        let session = ready_session(&connector).await;
        let writer = RecordWriter::new(&session, "users");
        let reader = RecordReader::new(&session, "users");

        // Rows left by an earlier run
        writer.insert_user("old_user", "old@example.com").await.unwrap();

        let a = writer.insert_user("john_doe", "john@example.com").await.unwrap();
        let b = writer.insert_user("jane_smith", "jane@example.com").await.unwrap();
        let c = writer.insert_user("bob_wilson", "bob@example.com").await.unwrap();

        let scanned: HashSet<UserId> = reader
            .list_all_users()
            .await
            .unwrap()
            .map(|row| row.unwrap().user_id)
            .collect()
            .await;

        assert!(scanned.is_superset(&HashSet::from([a, b, c])));
        assert_eq!(scanned.len(), 4);
    }

    #[tokio::test]
    async fn test_bad_row_is_a_stream_item() {
        let connector = MemoryConnector::new();
        let session = ready_session(&connector).await;
        let writer = RecordWriter::new(&session, "users");
        let reader = RecordReader::new(&session, "users");

        writer.insert_user("john_doe", "john@example.com").await.unwrap();
        writer.insert_user("jane_smith", "jane@example.com").await.unwrap();
        connector.inject(Fault::CorruptRow("jane_smith".to_string()));

        let rows: Vec<Result<UserRecord, DataError>> =
            reader.list_all_users().await.unwrap().collect().await;

        assert_eq!(rows.len(), 2);
        assert_eq!(rows.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(rows.iter().any(|r| {
            matches!(r, Err(DataError::ReadError(msg)) if msg.contains("reading user row"))
        }));
    }

    #[tokio::test]
    async fn test_read_failures_are_read_errors() {
        let connector = MemoryConnector::new();
        let session = ready_session(&connector).await;
        let reader = RecordReader::new(&session, "users");

        connector.inject(Fault::Scan);
        connector.inject(Fault::Fetch);

        let scan = reader.list_all_users().await;
        assert!(matches!(scan, Err(DataError::ReadError(_))));

        let lookup = reader.get_user_by_id(UserId::generate()).await;
        assert!(matches!(lookup, Err(DataError::ReadError(_))));
    }
}
