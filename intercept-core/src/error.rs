//! Error types for interceptor operations

use intercept_common::PendingError;
use thiserror::Error;

/// Main error type for the interception engine
///
/// The interceptor's own operations fail open and never return these;
/// they surface from setup paths (configuration, logging, breakpoint
/// construction) and from placing a transaction on hold.
#[derive(Debug, Error)]
pub enum InterceptError {
    #[error("Pending error: {0}")]
    Pending(#[from] PendingError),

    #[error("Configuration error: {component} - {reason}")]
    Config { component: String, reason: String },

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InterceptError {
    /// Create a configuration error
    pub fn config(component: &str, reason: impl Into<String>) -> Self {
        Self::Config {
            component: component.to_string(),
            reason: reason.into(),
        }
    }
}
