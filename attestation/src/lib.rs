//! External attestation for issued certificates.
//!
//! vouch never hashes, signs, or anchors certificate content itself. An
//! [`Attestor`] receives the canonical certificate bytes and returns an opaque
//! proof hash plus an external reference (a transaction id, a log index, ...).
//! Whatever the attestor does to make the content tamper-evident is its own
//! business.
//!
//! - [`HttpAttestor`] talks to an attestation service over HTTP.
//! - [`attest_with_retry`] bounds every attempt with a timeout and retries
//!   transient failures with exponential backoff.

pub mod error;
pub mod http;
pub mod retry;

pub use error::AttestationError;
pub use http::HttpAttestor;
pub use retry::{attest_with_retry, RetryPolicy};

use serde::{Deserialize, Serialize};
use std::future::Future;

/// Trait for the external attestation collaborator.
pub trait Attestor: Send + Sync {
    /// Attest `content`, returning the proof the collaborator bound to it.
    fn attest(
        &self,
        content: &[u8],
    ) -> impl Future<Output = Result<Attestation, AttestationError>> + Send;

    /// Whether `proof_hash` is known to the collaborator.
    fn verify(&self, proof_hash: &str)
        -> impl Future<Output = Result<bool, AttestationError>> + Send;

    /// Human-readable name of this attestor.
    fn name(&self) -> &str;
}

/// Proof returned by an [`Attestor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// Opaque proof identifier chosen by the collaborator.
    pub proof_hash: String,
    /// Where the proof can be looked up outside vouch.
    pub external_ref: String,
}
