use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};

use crate::errors::DataError;
use crate::types::{ConsistencyLevel, ReplicationStrategy};

/// Longest keyspace or table name the server accepts.
const MAX_IDENTIFIER_LEN: usize = 48;

/// Session implementation selected at startup.
///
/// Deserialized through `From<String>`, so aliases such as `cassandra` or
/// `in-memory` are accepted and unknown names resolve to `Scylla`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DatabaseDriver {
    #[default]
    Scylla,
    Memory,
}

impl From<&str> for DatabaseDriver {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" | "mem" => DatabaseDriver::Memory,
            // The scylla driver speaks CQL to Cassandra 4.x as well
            "scylla" | "scylladb" | "cassandra" | "cassandra4" => DatabaseDriver::Scylla,
            _ => DatabaseDriver::Scylla,
        }
    }
}

impl From<String> for DatabaseDriver {
    fn from(s: String) -> Self {
        DatabaseDriver::from(s.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub driver: DatabaseDriver,
    pub hosts: Vec<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connection_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub pool_size: u32,
    pub consistency: ConsistencyLevel,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::Scylla,
            hosts: vec!["127.0.0.1".to_string()],
            port: 9042,
            username: None,
            password: None,
            connection_timeout_secs: 5,
            request_timeout_secs: 10,
            pool_size: 4,
            consistency: ConsistencyLevel::LocalOne,
        }
    }
}

impl DatabaseConfig {
    /// `host:port` for every configured host; hosts that already carry a port keep it.
    ///
    /// Bare IPv6 addresses are bracketed before the port is appended.
    pub fn contact_points(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|host| with_default_port(host.trim(), self.port))
            .collect()
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.hosts.is_empty() {
            return Err(DataError::ConfigError(
                "at least one database host is required".to_string(),
            ));
        }
        if let Some(pos) = self.hosts.iter().position(|h| h.trim().is_empty()) {
            return Err(DataError::ConfigError(format!(
                "database host #{} is blank",
                pos + 1
            )));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(DataError::ConfigError(
                "username and password must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

fn with_default_port(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        return format!("[{}]:{}", host, port);
    }
    let has_port = match host.strip_prefix('[') {
        Some(bracketed) => bracketed.contains("]:"),
        None => host.contains(':'),
    };
    if has_port {
        host.to_string()
    } else {
        format!("{}:{}", host, port)
    }
}

/// Where the users table lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub keyspace: String,
    pub table: String,
    pub replication: ReplicationStrategy,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            keyspace: "data_management".to_string(),
            table: "users".to_string(),
            replication: ReplicationStrategy::default(),
        }
    }
}

impl SchemaConfig {
    pub fn validate(&self) -> Result<(), DataError> {
        validate_identifier("keyspace", &self.keyspace)?;
        validate_identifier("table", &self.table)?;

        match &self.replication {
            ReplicationStrategy::SimpleStrategy { replication_factor }
                if *replication_factor == 0 =>
            {
                Err(DataError::ConfigError(
                    "replication_factor must be at least 1".to_string(),
                ))
            }
            ReplicationStrategy::NetworkTopologyStrategy { datacenters } => {
                if datacenters.is_empty() {
                    return Err(DataError::ConfigError(
                        "NetworkTopologyStrategy needs at least one datacenter".to_string(),
                    ));
                }
                // Datacenter names end up inside a quoted CQL map literal
                match datacenters.keys().find(|dc| dc.is_empty() || dc.contains('\'')) {
                    Some(dc) => Err(DataError::ConfigError(format!(
                        "invalid datacenter name '{}'",
                        dc
                    ))),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Names are interpolated into DDL, so only unquoted CQL identifiers are accepted.
pub fn validate_identifier(kind: &str, name: &str) -> Result<(), DataError> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !starts_with_letter || !rest_ok || name.len() > MAX_IDENTIFIER_LEN {
        return Err(DataError::ConfigError(format!(
            "invalid {} name '{}': expected a letter followed by up to {} \
             letters, digits or underscores",
            kind,
            name,
            MAX_IDENTIFIER_LEN - 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_driver_from_string() {
        assert_eq!(DatabaseDriver::from("memory"), DatabaseDriver::Memory);
        assert_eq!(DatabaseDriver::from("In-Memory"), DatabaseDriver::Memory);
        assert_eq!(DatabaseDriver::from("cassandra"), DatabaseDriver::Scylla);
        assert_eq!(DatabaseDriver::from("ScyllaDB"), DatabaseDriver::Scylla);
        assert_eq!(DatabaseDriver::from("unknown".to_string()), DatabaseDriver::Scylla);
    }

    #[test]
    fn test_contact_points() {
        let config = DatabaseConfig {
            hosts: vec!["10.0.0.1".to_string(), "10.0.0.2:19042".to_string()],
            ..DatabaseConfig::default()
        };
        assert_eq!(
            config.contact_points(),
            vec!["10.0.0.1:9042".to_string(), "10.0.0.2:19042".to_string()]
        );
    }

    #[test]
    fn test_contact_points_ipv6() {
        let config = DatabaseConfig {
            hosts: vec![
                "::1".to_string(),
                "fe80::1".to_string(),
                "[::1]:19042".to_string(),
                "[fe80::2]".to_string(),
            ],
            ..DatabaseConfig::default()
        };
        assert_eq!(
            config.contact_points(),
            vec![
                "[::1]:9042".to_string(),
                "[fe80::1]:9042".to_string(),
                "[::1]:19042".to_string(),
                "[fe80::2]:9042".to_string(),
            ]
        );
    }

    #[test]
    fn test_database_validation() {
        assert!(DatabaseConfig::default().validate().is_ok());

        let no_hosts = DatabaseConfig {
            hosts: vec![],
            ..DatabaseConfig::default()
        };
        assert!(no_hosts.validate().is_err());

        let one_blank = DatabaseConfig {
            hosts: vec!["10.0.0.1".to_string(), " ".to_string()],
            ..DatabaseConfig::default()
        };
        let err = one_blank.validate().unwrap_err();
        assert!(err.to_string().contains("host #2 is blank"));

        let half_auth = DatabaseConfig {
            username: Some("cassandra".to_string()),
            ..DatabaseConfig::default()
        };
        assert!(half_auth.validate().is_err());
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("keyspace", "data_management").is_ok());
        assert!(validate_identifier("table", "users2").is_ok());
        assert!(validate_identifier("table", "").is_err());
        assert!(validate_identifier("table", "2users").is_err());
        assert!(validate_identifier("table", "users; DROP TABLE x").is_err());
        assert!(validate_identifier("keyspace", &"k".repeat(49)).is_err());
        assert!(validate_identifier("keyspace", &"k".repeat(48)).is_ok());
    }

    #[test]
    fn test_schema_validation() {
        assert!(SchemaConfig::default().validate().is_ok());

        let zero_rf = SchemaConfig {
            replication: ReplicationStrategy::SimpleStrategy {
                replication_factor: 0,
            },
            ..SchemaConfig::default()
        };
        assert!(zero_rf.validate().is_err());

        let no_dcs = SchemaConfig {
            replication: ReplicationStrategy::NetworkTopologyStrategy {
                datacenters: BTreeMap::new(),
            },
            ..SchemaConfig::default()
        };
        assert!(no_dcs.validate().is_err());

        let mut datacenters = BTreeMap::new();
        datacenters.insert("dc1'".to_string(), 3);
        let quoted_dc = SchemaConfig {
            replication: ReplicationStrategy::NetworkTopologyStrategy { datacenters },
            ..SchemaConfig::default()
        };
        assert!(quoted_dc.validate().is_err());
    }
}
