use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DriverError;

/// Primary key of a user row. Generated client-side, never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Decode the nullable columns of a `users` row.
    pub fn from_columns(
        user_id: Uuid,
        username: Option<String>,
        email: Option<String>,
        created_at_millis: Option<i64>,
    ) -> Result<Self, DriverError> {
        let username = username.ok_or_else(|| null_column(user_id, "username"))?;
        let email = email.ok_or_else(|| null_column(user_id, "email"))?;
        let millis = created_at_millis.ok_or_else(|| null_column(user_id, "created_at"))?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            DriverError::new(format!(
                "row {}: created_at {} is out of range",
                user_id, millis
            ))
        })?;

        Ok(Self {
            user_id: UserId(user_id),
            username,
            email,
            created_at,
        })
    }
}

fn null_column(user_id: Uuid, column: &str) -> DriverError {
    DriverError::new(format!("row {}: column {} is null", user_id, column))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    #[default]
    LocalOne,
}

/// Keyspace replication policy. Supplied by the caller, never tuned here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum ReplicationStrategy {
    SimpleStrategy { replication_factor: u32 },
    NetworkTopologyStrategy { datacenters: BTreeMap<String, u32> },
}

impl Default for ReplicationStrategy {
    fn default() -> Self {
        ReplicationStrategy::SimpleStrategy {
            replication_factor: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceDefinition {
    pub name: String,
    pub replication: ReplicationStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CqlType {
    Uuid,
    Text,
    Timestamp,
}

impl fmt::Display for CqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CqlType::Uuid => write!(f, "UUID"),
            CqlType::Text => write!(f, "TEXT"),
            CqlType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub cql_type: CqlType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: String,
}

impl TableDefinition {
    /// `users(user_id UUID, username TEXT, email TEXT, created_at TIMESTAMP)` keyed by `user_id`.
    pub fn users(name: &str) -> Self {
        let column = |name: &str, cql_type| ColumnDefinition {
            name: name.to_string(),
            cql_type,
        };

        Self {
            name: name.to_string(),
            columns: vec![
                column("user_id", CqlType::Uuid),
                column("username", CqlType::Text),
                column("email", CqlType::Text),
                column("created_at", CqlType::Timestamp),
            ],
            primary_key: "user_id".to_string(),
        }
    }
}
