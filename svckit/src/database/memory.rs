// svckit/src/database/memory.rs
//
// In-process stand-in for a CQL cluster
// Backs `--driver memory` runs and the test suites. Faults can be injected
// per operation to exercise the partial-failure paths.
//

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::session::{Connector, CqlSession, UserStream};
use crate::config::DatabaseConfig;
use crate::errors::{DataError, DriverError};
use crate::types::{KeyspaceDefinition, TableDefinition, UserId, UserRecord};

/// Operation that should fail with a simulated error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    Connect,
    CreateKeyspace,
    UseKeyspace,
    CreateTable,
    /// Inserts of this username fail
    Insert(String),
    Scan,
    /// The stored row of this username fails to decode during scans
    CorruptRow(String),
    Fetch,
}

#[derive(Debug, Clone)]
struct StoredUser {
    username: String,
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryTable {
    definition: Option<TableDefinition>,
    // Ordered by key so scans are deterministic
    rows: BTreeMap<UserId, StoredUser>,
}

#[derive(Debug, Default)]
struct MemoryCluster {
    keyspaces: HashMap<String, KeyspaceDefinition>,
    tables: HashMap<(String, String), MemoryTable>,
    last_write: Option<DateTime<Utc>>,
}

impl MemoryCluster {
    /// Server clock for `toTimestamp(now())`; never goes backwards.
    fn next_write_time(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_write {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_write = Some(ts);
        ts
    }
}

#[derive(Debug, Default)]
struct Shared {
    cluster: Mutex<MemoryCluster>,
    faults: Mutex<HashSet<Fault>>,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
}

impl Shared {
    fn check(&self, fault: &Fault) -> Result<(), DriverError> {
        if self.faults.lock().contains(fault) {
            return Err(DriverError::new(format!(
                "simulated network error during {:?}",
                fault
            )));
        }
        Ok(())
    }
}

/// Opens sessions on one shared in-memory cluster.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(self, fault: Fault) -> Self {
        self.inject(fault);
        self
    }

    pub fn inject(&self, fault: Fault) {
        self.shared.faults.lock().insert(fault);
    }

    pub fn clear_faults(&self) {
        self.shared.faults.lock().clear();
    }

    pub fn sessions_opened(&self) -> usize {
        self.shared.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.shared.sessions_closed.load(Ordering::SeqCst)
    }

    /// Definition stored for `keyspace.table`, if it was created.
    pub fn table_definition(&self, keyspace: &str, table: &str) -> Option<TableDefinition> {
        self.shared
            .cluster
            .lock()
            .tables
            .get(&(keyspace.to_string(), table.to_string()))
            .and_then(|t| t.definition.clone())
    }

    pub fn keyspace_definition(&self, keyspace: &str) -> Option<KeyspaceDefinition> {
        self.shared.cluster.lock().keyspaces.get(keyspace).cloned()
    }

    pub fn row_count(&self, keyspace: &str, table: &str) -> usize {
        self.shared
            .cluster
            .lock()
            .tables
            .get(&(keyspace.to_string(), table.to_string()))
            .map_or(0, |t| t.rows.len())
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemorySession;

    async fn connect(&self, config: &DatabaseConfig) -> Result<MemorySession, DataError> {
        self.shared
            .check(&Fault::Connect)
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        self.shared.sessions_opened.fetch_add(1, Ordering::SeqCst);
        info!("Opened in-memory session (configured hosts: {:?})", config.hosts);

        Ok(MemorySession {
            shared: self.shared.clone(),
            keyspace: Mutex::new(None),
        })
    }
}

/// Session on a `MemoryConnector` cluster with its own active keyspace.
#[derive(Debug)]
pub struct MemorySession {
    shared: Arc<Shared>,
    keyspace: Mutex<Option<String>>,
}

impl MemorySession {
    fn table_key(&self, table: &str) -> Result<(String, String), DriverError> {
        let keyspace = self
            .keyspace
            .lock()
            .clone()
            .ok_or_else(|| DriverError::new("No keyspace has been specified"))?;
        Ok((keyspace, table.to_string()))
    }

    fn with_table<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut MemoryCluster, (String, String)) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        let key = self.table_key(table)?;
        let mut cluster = self.shared.cluster.lock();
        let exists = cluster
            .tables
            .get(&key)
            .is_some_and(|t| t.definition.is_some());
        if !exists {
            return Err(DriverError::new(format!(
                "unconfigured table {}.{}",
                key.0, key.1
            )));
        }
        f(&mut *cluster, key)
    }
}

#[async_trait]
impl CqlSession for MemorySession {
    async fn create_keyspace(&self, keyspace: &KeyspaceDefinition) -> Result<(), DriverError> {
        self.shared.check(&Fault::CreateKeyspace)?;
        let mut cluster = self.shared.cluster.lock();
        if cluster.keyspaces.contains_key(&keyspace.name) {
            debug!("Keyspace {} already exists", keyspace.name);
        } else {
            cluster.keyspaces.insert(keyspace.name.clone(), keyspace.clone());
        }
        Ok(())
    }

    async fn use_keyspace(&self, keyspace: &str) -> Result<(), DriverError> {
        self.shared.check(&Fault::UseKeyspace)?;
        if !self.shared.cluster.lock().keyspaces.contains_key(keyspace) {
            return Err(DriverError::new(format!("Keyspace '{}' does not exist", keyspace)));
        }
        *self.keyspace.lock() = Some(keyspace.to_string());
        Ok(())
    }

    async fn create_table(&self, table: &TableDefinition) -> Result<(), DriverError> {
        self.shared.check(&Fault::CreateTable)?;
        let key = self.table_key(&table.name)?;
        let mut cluster = self.shared.cluster.lock();
        let entry = cluster.tables.entry(key).or_default();
        if entry.definition.is_none() {
            entry.definition = Some(table.clone());
        } else {
            debug!("Table {} already exists", table.name);
        }
        Ok(())
    }

    async fn insert_user(
        &self,
        table: &str,
        user_id: UserId,
        username: &str,
        email: &str,
    ) -> Result<(), DriverError> {
        self.shared.check(&Fault::Insert(username.to_string()))?;
        self.with_table(table, |cluster, key| {
            let created_at = cluster.next_write_time();
            let stored = StoredUser {
                username: username.to_string(),
                email: email.to_string(),
                created_at,
            };
            // CQL inserts are upserts
            if let Some(t) = cluster.tables.get_mut(&key) {
                t.rows.insert(user_id, stored);
            }
            Ok(())
        })
    }

    async fn scan_users(&self, table: &str) -> Result<UserStream, DriverError> {
        self.shared.check(&Fault::Scan)?;
        let snapshot: Vec<Result<UserRecord, DriverError>> =
            self.with_table(table, |cluster, key| {
                Ok(cluster
                    .tables
                    .get(&key)
                    .map(|t| {
                        t.rows
                            .iter()
                            .map(|(id, u)| -> Result<UserRecord, DriverError> {
                                self.shared.check(&Fault::CorruptRow(u.username.clone()))?;
                                Ok(to_record(*id, u))
                            })
                            .collect()
                    })
                    .unwrap_or_default())
            })?;
        Ok(futures::stream::iter(snapshot).boxed())
    }

    async fn fetch_user(
        &self,
        table: &str,
        user_id: UserId,
    ) -> Result<Option<UserRecord>, DriverError> {
        self.shared.check(&Fault::Fetch)?;
        self.with_table(table, |cluster, key| {
            Ok(cluster
                .tables
                .get(&key)
                .and_then(|t| t.rows.get(&user_id))
                .map(|u| to_record(user_id, u)))
        })
    }

    async fn shutdown(self) {
        self.shared.sessions_closed.fetch_add(1, Ordering::SeqCst);
        info!("In-memory session closed");
    }
}

fn to_record(user_id: UserId, user: &StoredUser) -> UserRecord {
    UserRecord {
        user_id,
        username: user.username.clone(),
        email: user.email.clone(),
        created_at: user.created_at,
    }
}
