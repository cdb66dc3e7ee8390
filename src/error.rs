use thiserror::Error;

/// Failures reported by the machine controller.
///
/// None of these are fatal: each one ends the call that produced it and leaves
/// the machine in a consistent state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("unsupported product: {0}")]
    UnsupportedProduct(String),

    #[error("machine not available to accept jobs")]
    Busy,

    #[error("job ID already exists: {0}")]
    JobIdExists(String),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job already retrieved: {0}")]
    AlreadyRetrieved(String),

    #[error("job not ready: {0}")]
    NotReady(String),

    #[error("generate job id: {0}")]
    IdGeneration(String),
}

/// Coarse grouping of [`MachineError`] as seen by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Worth retrying later (busy machine, brew still running).
    TryLater,
    /// The job is gone for good.
    Gone,
    /// The request itself was wrong.
    BadInput,
    /// Nothing known under that identifier.
    Unknown,
    /// Failure inside the service.
    Internal,
}

impl MachineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            MachineError::Busy | MachineError::NotReady(_) => FailureKind::TryLater,
            MachineError::AlreadyRetrieved(_) => FailureKind::Gone,
            MachineError::UnsupportedProduct(_) | MachineError::JobIdExists(_) => {
                FailureKind::BadInput
            }
            MachineError::NotFound(_) => FailureKind::Unknown,
            MachineError::IdGeneration(_) => FailureKind::Internal,
        }
    }

    /// HTTP status used by the server for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            MachineError::Busy | MachineError::NotReady(_) => 503,
            MachineError::UnsupportedProduct(_) => 400,
            MachineError::JobIdExists(_) => 409,
            MachineError::NotFound(_) => 404,
            MachineError::AlreadyRetrieved(_) => 410,
            MachineError::IdGeneration(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_http_contract() {
        assert_eq!(MachineError::Busy.status_code(), 503);
        assert_eq!(MachineError::UnsupportedProduct("TEA".into()).status_code(), 400);
        assert_eq!(MachineError::JobIdExists("j".into()).status_code(), 409);
        assert_eq!(MachineError::NotFound("j".into()).status_code(), 404);
        assert_eq!(MachineError::AlreadyRetrieved("j".into()).status_code(), 410);
        assert_eq!(MachineError::NotReady("j".into()).status_code(), 503);
        assert_eq!(MachineError::IdGeneration("eof".into()).status_code(), 500);
    }

    #[test]
    fn kinds_separate_retryable_from_terminal() {
        assert_eq!(MachineError::Busy.kind(), FailureKind::TryLater);
        assert_eq!(MachineError::NotReady("j".into()).kind(), FailureKind::TryLater);
        assert_eq!(MachineError::AlreadyRetrieved("j".into()).kind(), FailureKind::Gone);
        assert_eq!(MachineError::JobIdExists("j".into()).kind(), FailureKind::BadInput);
        assert_eq!(MachineError::NotFound("j".into()).kind(), FailureKind::Unknown);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            MachineError::UnsupportedProduct("INVALID".into()).to_string(),
            "unsupported product: INVALID"
        );
        assert_eq!(MachineError::Busy.to_string(), "machine not available to accept jobs");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MachineError>();
    }
}
