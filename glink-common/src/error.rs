//! Common error types for GuardianLink

use thiserror::Error;

/// Common result type for GuardianLink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the GuardianLink core
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller role is not permitted to perform the operation
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Meeting reschedule limit exceeded
    #[error("Reschedule limit reached: {0}")]
    RescheduleQuota(String),

    /// Operation not valid in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Document store read/write failure (propagated, never retried here).
    /// Constructed by host store adapters; the in-process stores in this
    /// workspace have no failing operations.
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
