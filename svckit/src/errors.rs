use thiserror::Error;

/// Errors surfaced by the user registry, one variant per pipeline stage.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Write error: {0}")]
    WriteError(String),

    #[error("Read error: {0}")]
    ReadError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Output error: {0}")]
    OutputError(#[from] std::io::Error),
}

impl DataError {
    /// Fatal errors end the run; the rest are reported and skipped.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DataError::WriteError(_) | DataError::ReadError(_))
    }
}

/// Failure reported by a `CqlSession` implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<scylla::transport::errors::QueryError> for DriverError {
    fn from(err: scylla::transport::errors::QueryError) -> Self {
        DriverError::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(DataError::ConnectionError("refused".to_string()).is_fatal());
        assert!(DataError::SchemaError("unauthorized".to_string()).is_fatal());
        assert!(DataError::ConfigError("bad keyspace".to_string()).is_fatal());
        assert!(!DataError::WriteError("timeout".to_string()).is_fatal());
        assert!(!DataError::ReadError("timeout".to_string()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = DataError::WriteError(DriverError::new("write timeout").to_string());
        assert_eq!(err.to_string(), "Write error: write timeout");
    }
}
