//! Domain-specific error types for rsvp-desk

use thiserror::Error;

/// Main error type for the rsvp-desk console
#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Rejected credentials. The console shows a generic message; the
    /// provider detail stays in here for the logs.
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Full roster fetch failed; non-blocking, shown as a banner
    #[error("Fetch error: {message}")]
    Fetch { message: String },

    /// Remote write failed after the optimistic local apply; local state
    /// is left ahead of remote truth
    #[error("Sync error: {message}")]
    Sync { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for DeskError {
    fn from(err: anyhow::Error) -> Self {
        DeskError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(err: serde_json::Error) -> Self {
        DeskError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<surrealdb::Error> for DeskError {
    fn from(err: surrealdb::Error) -> Self {
        DeskError::Database {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for DeskError {
    fn from(err: std::io::Error) -> Self {
        DeskError::Internal {
            message: err.to_string(),
        }
    }
}

/// Result type alias for rsvp-desk operations
pub type Result<T> = std::result::Result<T, DeskError>;
