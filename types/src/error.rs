//! Errors raised while parsing identifiers.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("user id must not be blank")]
    BlankUserId,

    #[error("user id {0:?} contains whitespace")]
    WhitespaceInUserId(String),

    #[error("invalid request id: {0}")]
    InvalidRequestId(String),

    #[error("invalid certificate id: {0}")]
    InvalidCertificateId(String),
}
