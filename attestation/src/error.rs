use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttestationError {
    #[error("attestation timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("attestation service unavailable: {0}")]
    Unavailable(String),

    #[error("attestation service rejected the request: {0}")]
    Rejected(String),

    #[error("invalid response from attestation service: {0}")]
    InvalidResponse(String),
}

impl AttestationError {
    /// Transient failures that may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unavailable(_))
    }
}
