//! Error types for rowshape
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors with clear error chains.

/// Top-level error for resolving a connection target and running the suite
#[derive(Debug, thiserror::Error)]
pub enum RowshapeError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Database operation errors
///
/// Every failure of `execute` or `query` surfaces as one of these variants on
/// the returned future or row stream. Nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    /// A bound value does not fit the declared type of its column
    #[error("Binding error: {0}")]
    Binding(String),

    /// The backend's result cannot be read in the requested shape
    #[error("Result shape mismatch: {0}")]
    ResultShapeMismatch(String),

    /// Connection could not be established or was lost
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend rejected the statement for another reason
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// A table or column descriptor is malformed
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

/// Configuration loading/parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Home directory not found
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Config file not found
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Connection profile not found
    #[error("Connection profile '{0}' not found")]
    ProfileNotFound(String),
}

/// Reproduction scenario failures
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The façade returned an error
    #[error("{0}")]
    Database(#[from] DbError),

    /// The façade succeeded but the observed result was wrong
    #[error("Assertion failed: {0}")]
    Assertion(String),
}

impl DbError {
    /// True for connectivity failures (before or during an operation)
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DbError::BackendUnavailable(_))
    }
}

/// Specialized Result type for rowshape operations
pub type Result<T> = std::result::Result<T, RowshapeError>;

/// Specialized Result type for database operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Specialized Result type for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized Result type for scenario runs
pub type ScenarioResult<T> = std::result::Result<T, ScenarioError>;
