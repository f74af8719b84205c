use tracing::{error, info};

use svckit::{
    database::CqlSession,
    errors::DataError,
    types::{KeyspaceDefinition, ReplicationStrategy, TableDefinition},
};

/// Creates the keyspace and table the registry writes to. Safe to run repeatedly.
pub struct SchemaBootstrapper<'a, S> {
    session: &'a S,
}

impl<'a, S: CqlSession> SchemaBootstrapper<'a, S> {
    pub fn new(session: &'a S) -> Self {
        Self { session }
    }

    /// Create the keyspace if missing and make it the session's active keyspace.
    pub async fn ensure_keyspace(
        &self,
        name: &str,
        replication: &ReplicationStrategy,
    ) -> Result<(), DataError> {
        let keyspace = KeyspaceDefinition {
            name: name.to_string(),
            replication: replication.clone(),
        };

        self.session.create_keyspace(&keyspace).await.map_err(|e| {
            error!("Failed to create keyspace {}: {}", name, e);
            DataError::SchemaError(format!("creating keyspace '{}' failed: {}", name, e))
        })?;

        self.session.use_keyspace(name).await.map_err(|e| {
            error!("Failed to switch to keyspace {}: {}", name, e);
            DataError::SchemaError(format!("switching to keyspace '{}' failed: {}", name, e))
        })?;

        info!("Keyspace {} ready", name);
        Ok(())
    }

    pub async fn ensure_table(&self, table: &TableDefinition) -> Result<(), DataError> {
        self.session.create_table(table).await.map_err(|e| {
            error!("Failed to create table {}: {}", table.name, e);
            DataError::SchemaError(format!("creating table '{}' failed: {}", table.name, e))
        })?;

        info!("Table {} ready", table.name);
        Ok(())
    }
}
