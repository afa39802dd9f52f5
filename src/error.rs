//! Error types for the dbxcore library

use std::fmt;

/// Result type alias for dbxcore operations
pub type Result<T> = std::result::Result<T, DbxError>;

/// Main error type for dbxcore operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbxError {
    /// Malformed wire block or request envelope
    Wire(String),

    /// Unknown handle or illegal session-state transition
    Session(String),

    /// Global (key-value) operation errors
    Global(String),

    /// Transaction nesting violations
    Transaction(String),

    /// Unknown function, class, method, property or object reference
    Object(String),

    /// Reply would not fit the capacity declared by the caller
    Capacity(String),

    /// Configuration/profile errors
    Config(String),

    /// I/O errors
    Io(String),

    /// General errors
    Other(String),
}

impl fmt::Display for DbxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbxError::Wire(msg) => write!(f, "Wire format error: {}", msg),
            DbxError::Session(msg) => write!(f, "Session error: {}", msg),
            DbxError::Global(msg) => write!(f, "Global error: {}", msg),
            DbxError::Transaction(msg) => write!(f, "Transaction error: {}", msg),
            DbxError::Object(msg) => write!(f, "Object error: {}", msg),
            DbxError::Capacity(msg) => write!(f, "Capacity exceeded: {}", msg),
            DbxError::Config(msg) => write!(f, "Configuration error: {}", msg),
            DbxError::Io(msg) => write!(f, "I/O error: {}", msg),
            DbxError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DbxError {}

impl From<std::io::Error> for DbxError {
    fn from(err: std::io::Error) -> Self {
        DbxError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DbxError {
    fn from(err: serde_json::Error) -> Self {
        DbxError::Config(err.to_string())
    }
}

impl From<String> for DbxError {
    fn from(msg: String) -> Self {
        DbxError::Other(msg)
    }
}

impl From<&str> for DbxError {
    fn from(msg: &str) -> Self {
        DbxError::Other(msg.to_string())
    }
}
