pub mod memory;
pub mod query_builder;
pub mod scylla;
pub mod session;

pub use self::memory::{Fault, MemoryConnector, MemorySession};
pub use self::query_builder::QueryBuilder;
pub use self::scylla::{ScyllaConnection, ScyllaConnector};
pub use self::session::{Connector, CqlSession, UserStream};
