//! Error types for the core data model.

use thiserror::Error;

/// Errors raised while building or parsing core values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    #[error("Invalid record id: {0}")]
    InvalidNodeId(String),

    #[error("Unknown construction status: {0}")]
    UnknownStatus(String),

    #[error("Principal must not be empty")]
    EmptyPrincipal,

    #[error("Unable to parse graph URI: {0}")]
    InvalidUri(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
