use crate::types::{KeyspaceDefinition, ReplicationStrategy, TableDefinition};

const USER_COLUMNS: &str = "user_id, username, email, created_at";

pub struct QueryBuilder;

impl QueryBuilder {
    /// Build an idempotent CREATE KEYSPACE statement
    pub fn build_create_keyspace(keyspace: &KeyspaceDefinition) -> String {
        format!(
            "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {}",
            keyspace.name,
            Self::build_replication_map(&keyspace.replication)
        )
    }

    /// Render a replication strategy as a CQL map literal
    pub fn build_replication_map(replication: &ReplicationStrategy) -> String {
        match replication {
            ReplicationStrategy::SimpleStrategy { replication_factor } => format!(
                "{{'class': 'SimpleStrategy', 'replication_factor': '{}'}}",
                replication_factor
            ),
            ReplicationStrategy::NetworkTopologyStrategy { datacenters } => {
                let mut map = String::from("{'class': 'NetworkTopologyStrategy'");
                for (dc, factor) in datacenters {
                    map.push_str(&format!(", '{}': '{}'", dc, factor));
                }
                map.push('}');
                map
            }
        }
    }

    /// Build an idempotent CREATE TABLE statement
    pub fn build_create_table(table: &TableDefinition) -> String {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.cql_type))
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}))",
            table.name,
            columns.join(", "),
            table.primary_key
        )
    }

    /// INSERT binding user_id, username and email; created_at comes from the server clock
    pub fn build_insert_user(table: &str) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, toTimestamp(now()))",
            table, USER_COLUMNS
        )
    }

    /// Full scan of the users table
    pub fn build_select_users(table: &str) -> String {
        format!("SELECT {} FROM {}", USER_COLUMNS, table)
    }

    /// Point lookup by primary key
    pub fn build_select_user_by_id(table: &str) -> String {
        format!("SELECT {} FROM {} WHERE user_id = ?", USER_COLUMNS, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_build_create_keyspace_simple() {
        let keyspace = KeyspaceDefinition {
            name: "data_management".to_string(),
            replication: ReplicationStrategy::default(),
        };

        assert_eq!(
            QueryBuilder::build_create_keyspace(&keyspace),
            "CREATE KEYSPACE IF NOT EXISTS data_management WITH replication = \
             {'class': 'SimpleStrategy', 'replication_factor': '1'}"
        );
    }

    #[test]
    fn test_build_replication_map_network_topology() {
        let mut datacenters = BTreeMap::new();
        datacenters.insert("us_east".to_string(), 3);
        datacenters.insert("eu_west".to_string(), 2);

        let strategy = ReplicationStrategy::NetworkTopologyStrategy { datacenters };
        let map = QueryBuilder::build_replication_map(&strategy);
        assert_eq!(
            map,
            "{'class': 'NetworkTopologyStrategy', 'eu_west': '2', 'us_east': '3'}"
        );
    }

    #[test]
    fn test_build_create_table() {
        let query = QueryBuilder::build_create_table(&TableDefinition::users("users"));
        assert_eq!(
            query,
            "CREATE TABLE IF NOT EXISTS users (user_id UUID, username TEXT, email TEXT, \
             created_at TIMESTAMP, PRIMARY KEY (user_id))"
        );
    }

    #[test]
    fn test_build_user_statements() {
        assert_eq!(
            QueryBuilder::build_insert_user("users"),
            "INSERT INTO users (user_id, username, email, created_at) \
             VALUES (?, ?, ?, toTimestamp(now()))"
        );
        assert_eq!(
            QueryBuilder::build_select_users("users"),
            "SELECT user_id, username, email, created_at FROM users"
        );
        assert_eq!(
            QueryBuilder::build_select_user_by_id("users"),
            "SELECT user_id, username, email, created_at FROM users WHERE user_id = ?"
        );
    }
}
