//! Domain error types
//!
//! This module defines the error hierarchy for tablesync.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main tablesync error type
///
/// This is the primary error type used throughout the library.
/// It wraps the table store taxonomy and provides context for error handling.
#[derive(Debug, Error)]
pub enum TableSyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Table store errors
    #[error("Table store error: {0}")]
    TableStore(#[from] TableStoreError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backup or restore errors
    #[error("Backup error: {0}")]
    Backup(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl TableSyncError {
    /// Returns the store error when this error came from the remote table store
    pub fn as_store_error(&self) -> Option<&TableStoreError> {
        match self {
            TableSyncError::TableStore(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this error is a `Conflict` from the store
    pub fn is_conflict(&self) -> bool {
        matches!(self, TableSyncError::TableStore(TableStoreError::Conflict(_)))
    }
}

/// Remote table store errors
///
/// `NotFound` and `Conflict` are expected outcomes for point operations; the
/// single-entity client turns them into explicit return values and only the
/// repositories surface them as errors when the caller has to branch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableStoreError {
    /// Point lookup or delete on an absent key
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Create on an existing key
    #[error("Entity already exists: {0}")]
    Conflict(String),

    /// No signed credential configured for the table; nothing was sent
    #[error("No credential configured for table '{0}'")]
    MissingCredential(String),

    /// Throttled by the store (429, or 503 server busy)
    #[error("Rate limited by table store ({status}): {message}")]
    RateLimited { status: u16, message: String },

    /// Failed to reach the store
    #[error("Failed to connect to table store: {0}")]
    ConnectionFailed(String),

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Credential rejected (expired, wrong scope or missing permission)
    #[error("Authorization failed ({status}): {message}")]
    AuthorizationFailed { status: u16, message: String },

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Response body could not be interpreted
    #[error("Invalid response from table store: {0}")]
    InvalidResponse(String),
}

impl TableStoreError {
    /// Maps an unsuccessful HTTP status to the error taxonomy
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => TableStoreError::NotFound(message),
            409 => TableStoreError::Conflict(message),
            429 | 503 => TableStoreError::RateLimited { status, message },
            408 | 504 => TableStoreError::Timeout(message),
            401 | 403 => TableStoreError::AuthorizationFailed { status, message },
            500..=599 => TableStoreError::ServerError { status, message },
            _ => TableStoreError::ClientError { status, message },
        }
    }

    /// Whether the store asked us to slow down
    pub fn is_throttled(&self) -> bool {
        matches!(self, TableStoreError::RateLimited { .. })
    }

    /// Whether a later retry of the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TableStoreError::RateLimited { .. }
                | TableStoreError::ConnectionFailed(_)
                | TableStoreError::Timeout(_)
                | TableStoreError::ServerError { .. }
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for TableSyncError {
    fn from(err: std::io::Error) -> Self {
        TableSyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for TableSyncError {
    fn from(err: serde_json::Error) -> Self {
        TableSyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for TableSyncError {
    fn from(err: toml::de::Error) -> Self {
        TableSyncError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let err = TableSyncError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_store_error_conversion() {
        let store_err = TableStoreError::MissingCredential("Patients".to_string());
        let err: TableSyncError = store_err.into();
        assert!(matches!(err, TableSyncError::TableStore(_)));
        assert_eq!(
            err.as_store_error(),
            Some(&TableStoreError::MissingCredential("Patients".to_string()))
        );
    }

    #[test_case(404 => matches TableStoreError::NotFound(_) ; "not found")]
    #[test_case(409 => matches TableStoreError::Conflict(_) ; "conflict")]
    #[test_case(429 => matches TableStoreError::RateLimited { status: 429, .. } ; "too many requests")]
    #[test_case(503 => matches TableStoreError::RateLimited { status: 503, .. } ; "server busy")]
    #[test_case(504 => matches TableStoreError::Timeout(_) ; "gateway timeout")]
    #[test_case(403 => matches TableStoreError::AuthorizationFailed { .. } ; "forbidden")]
    #[test_case(500 => matches TableStoreError::ServerError { .. } ; "internal error")]
    #[test_case(400 => matches TableStoreError::ClientError { .. } ; "bad request")]
    fn test_from_status(status: u16) -> TableStoreError {
        TableStoreError::from_status(status, "boom")
    }

    #[test]
    fn test_transient_classification() {
        assert!(TableStoreError::from_status(429, "slow down").is_throttled());
        assert!(TableStoreError::from_status(500, "oops").is_transient());
        assert!(TableStoreError::ConnectionFailed("reset".to_string()).is_transient());
        assert!(!TableStoreError::from_status(404, "gone").is_transient());
        assert!(!TableStoreError::MissingCredential("Users".to_string()).is_transient());
    }

    #[test]
    fn test_is_conflict() {
        let err: TableSyncError = TableStoreError::Conflict("File 1".to_string()).into();
        assert!(err.is_conflict());
        assert!(!TableSyncError::Other("x".to_string()).is_conflict());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: TableSyncError = io_err.into();
        assert!(matches!(err, TableSyncError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: TableSyncError = json_err.into();
        assert!(matches!(err, TableSyncError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: TableSyncError = toml_err.into();
        assert!(matches!(err, TableSyncError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
