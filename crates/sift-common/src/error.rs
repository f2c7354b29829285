//! Error types for timesift.

use thiserror::Error;

/// Result type alias for timesift operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for timesift.
///
/// Module-level errors in `sift-core` convert into this type at the
/// boundary of the extraction pass and the CLI.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration file: {0}")]
    InvalidConfig(String),

    // Registry errors (20-29)
    #[error("plugin already registered: {name}")]
    DuplicateIdentity { name: String },

    #[error("invalid plugin declaration for '{name}': {reason}")]
    InvalidPluginDeclaration { name: String, reason: String },

    #[error("plugin not found: {name}")]
    PluginNotFound { name: String },

    // Container and query errors (30-39)
    #[error("container {path} is unreadable: {reason}")]
    ContainerUnreadable { path: String, reason: String },

    #[error("plugin {plugin} query {query_hash} failed: {reason}")]
    QueryExecution {
        plugin: String,
        query_hash: String,
        reason: String,
    },

    // Coercion errors (40-49)
    #[error("unsupported epoch: {0}")]
    UnsupportedEpoch(String),

    #[error("malformed payload in field '{field}': {reason}")]
    MalformedPayload { field: String, reason: String },

    // Sink errors (50-59)
    #[error("event sink error: {0}")]
    Sink(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::DuplicateIdentity { .. } => 20,
            Error::InvalidPluginDeclaration { .. } => 21,
            Error::PluginNotFound { .. } => 22,
            Error::ContainerUnreadable { .. } => 30,
            Error::QueryExecution { .. } => 31,
            Error::UnsupportedEpoch(_) => 41,
            Error::MalformedPayload { .. } => 42,
            Error::Sink(_) => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}
