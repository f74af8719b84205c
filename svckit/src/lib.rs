//! Shared building blocks for the user registry: configuration, the error
//! taxonomy, the users row model and the CQL session seam with its ScyllaDB
//! and in-memory implementations.

pub mod config;
pub mod database;
pub mod errors;
pub mod types;
