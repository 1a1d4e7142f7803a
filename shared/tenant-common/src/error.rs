//! Common Error Types

use thiserror::Error;

/// Errors raised while parsing shared types from their string forms.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Unknown role name.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Unknown permission key.
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    /// Unknown verification status.
    #[error("Unknown verification status: {0}")]
    UnknownVerificationStatus(String),
}

/// Result alias for common parsing.
pub type Result<T> = std::result::Result<T, Error>;
