use crate::state::VerificationState;
use thiserror::Error;
use vouch_attestation::AttestationError;
use vouch_types::{RequestId, UserId};

/// Every way a verification operation can be refused.
///
/// All variants are local and recoverable by the caller; each names a specific
/// condition so a front end can show an actionable message.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("request {0} does not exist")]
    UnknownRequest(RequestId),

    #[error("a request with this title was submitted moments ago as {0}")]
    DuplicateSubmission(RequestId),

    #[error("{validator} is not a chosen validator for {request}")]
    NotAValidator { request: RequestId, validator: UserId },

    #[error("{validator} has already confirmed {request}")]
    DuplicateConfirmation { request: RequestId, validator: UserId },

    #[error("invalid rating: {0}")]
    InvalidRating(String),

    #[error("request {request} is already {state}")]
    RequestClosed {
        request: RequestId,
        state: VerificationState,
    },

    #[error("request {request} is {state}, not verified")]
    NotVerified {
        request: RequestId,
        state: VerificationState,
    },

    #[error("a certificate for {0} has already been issued")]
    AlreadyIssued(RequestId),

    #[error("attestation unavailable: {0}")]
    AttestationUnavailable(String),

    #[error("attestation refused: {0}")]
    AttestationRejected(String),

    #[error("failed to encode certificate: {0}")]
    Encoding(String),
}

/// Transient attestation failures stay retryable; everything else is final.
impl From<AttestationError> for VerificationError {
    fn from(e: AttestationError) -> Self {
        if e.is_retryable() {
            Self::AttestationUnavailable(e.to_string())
        } else {
            Self::AttestationRejected(e.to_string())
        }
    }
}

impl VerificationError {
    /// Errors the caller may simply retry later without changing the input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AttestationUnavailable(_))
    }
}
