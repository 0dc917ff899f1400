//! Nullable attestor — an in-memory attestation service.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use vouch_attestation::{Attestation, AttestationError, Attestor};

/// A deterministic attestor for testing.
///
/// Proofs are sequential (`null-proof-1`, `null-proof-2`, ...) and remembered
/// so [`Attestor::verify`] can answer. It can be told to fail its first N
/// calls with `Unavailable`, to refuse every call with `Rejected`, or to
/// stall each call for a fixed delay.
pub struct NullAttestor {
    failures: u32,
    rejecting: bool,
    delay: Option<Duration>,
    calls: AtomicU32,
    issued: Mutex<HashSet<String>>,
}

impl NullAttestor {
    pub fn new() -> Self {
        Self {
            failures: 0,
            rejecting: false,
            delay: None,
            calls: AtomicU32::new(0),
            issued: Mutex::new(HashSet::new()),
        }
    }

    /// Fail the first `n` attest calls with a retryable error.
    pub fn failing_first(mut self, n: u32) -> Self {
        self.failures = n;
        self
    }

    /// Refuse every attest call with a permanent error.
    pub fn rejecting(mut self) -> Self {
        self.rejecting = true;
        self
    }

    /// Sleep for `delay` inside every attest call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of attest calls made, successful or not.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of proofs handed out.
    pub fn issued_count(&self) -> usize {
        self.issued.lock().unwrap().len()
    }
}

impl Default for NullAttestor {
    fn default() -> Self {
        Self::new()
    }
}

impl Attestor for NullAttestor {
    async fn attest(&self, content: &[u8]) -> Result<Attestation, AttestationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call <= self.failures {
            return Err(AttestationError::Unavailable(format!(
                "null attestor scripted failure {call}/{}",
                self.failures
            )));
        }
        if self.rejecting {
            return Err(AttestationError::Rejected("null attestor refuses all content".into()));
        }
        if content.is_empty() {
            return Err(AttestationError::Rejected("empty content".into()));
        }
        let proof_hash = format!("null-proof-{call}");
        self.issued.lock().unwrap().insert(proof_hash.clone());
        Ok(Attestation {
            external_ref: format!("null://attestations/{call}"),
            proof_hash,
        })
    }

    async fn verify(&self, proof_hash: &str) -> Result<bool, AttestationError> {
        Ok(self.issued.lock().unwrap().contains(proof_hash))
    }

    fn name(&self) -> &str {
        "null-attestor"
    }
}
