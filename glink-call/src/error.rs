//! Error types for call signaling

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallError {
    /// The user denied camera/microphone access
    #[error("media permission denied: {0}")]
    MediaPermissionDenied(String),

    /// No capture device is present
    #[error("no media device available: {0}")]
    MediaUnavailable(String),

    /// Any other media acquisition failure
    #[error("media error: {0}")]
    Media(String),

    /// Signaling store operation failed
    #[error("signaling store error: {0}")]
    Store(#[from] glink_common::Error),

    /// Malformed or unexpected signaling payload
    #[error("signaling error: {0}")]
    Signal(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_adapter_failures_convert_and_display() {
        // The path a host store adapter's error takes into this crate.
        fn fails() -> Result<()> {
            Err(glink_common::Error::Store("write timed out".to_string()))?
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, CallError::Store(glink_common::Error::Store(_))));
        assert_eq!(
            err.to_string(),
            "signaling store error: Store error: write timed out"
        );
    }
}
