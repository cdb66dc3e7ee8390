//! Error types for the coffee machine HTTP client.
//!
//! Rejections the server maps from the machine's failure taxonomy are turned
//! back into [`MachineError`] values, so callers can tell "try later" from
//! "gone for good" the same way in-process callers do.

use thiserror::Error;

use crate::error::{FailureKind, MachineError};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The machine rejected the request with a known failure.
    #[error(transparent)]
    Machine(#[from] MachineError),

    /// Any other non-success response.
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    /// Transport failure (DNS, connection refused, timeout, bad JSON).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ClientError {
    /// Whether polling again later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Machine(err) if err.kind() == FailureKind::TryLater)
    }
}
