//! Timeout and retry around a single attestation.

use crate::error::AttestationError;
use crate::{Attestation, Attestor};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{warn, Instrument};
use vouch_utils::spans::attestation_span;

/// Backoff never grows beyond this multiple of the base delay.
const MAX_BACKOFF_MULTIPLIER: u32 = 8;

/// How attestation attempts are bounded and retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Upper bound on a single attempt.
    pub timeout: Duration,
    /// Extra attempts after the first one.
    pub retries: u32,
    /// Delay before the first retry; doubles after each failure.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            timeout,
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let multiplier = 1u32
            .checked_shl(retry)
            .unwrap_or(u32::MAX)
            .min(MAX_BACKOFF_MULTIPLIER);
        self.backoff.saturating_mul(multiplier)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retries: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Attest `content`, bounding each attempt by `policy.timeout` and retrying
/// transient failures. Non-retryable errors are returned immediately.
pub async fn attest_with_retry<A: Attestor>(
    attestor: &A,
    content: &[u8],
    policy: &RetryPolicy,
) -> Result<Attestation, AttestationError> {
    let mut attempt = 0u32;
    loop {
        let span = attestation_span(attestor.name(), attempt + 1);
        let result = match tokio::time::timeout(policy.timeout, attestor.attest(content))
            .instrument(span)
            .await
        {
            Ok(result) => result,
            Err(_) => Err(AttestationError::Timeout {
                after_ms: policy.timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(attestation) => return Ok(attestation),
            Err(e) if e.is_retryable() && attempt < policy.retries => {
                let delay = policy.backoff_for(attempt);
                warn!(
                    attestor = attestor.name(),
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "attestation failed, retrying: {e}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the configured error for the first `failures` calls.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        retryable: bool,
    }

    impl Flaky {
        fn new(failures: u32, retryable: bool) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                retryable,
            }
        }
    }

    impl Attestor for Flaky {
        async fn attest(&self, _content: &[u8]) -> Result<Attestation, AttestationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(if self.retryable {
                    AttestationError::Unavailable("flaky".into())
                } else {
                    AttestationError::Rejected("bad content".into())
                });
            }
            Ok(Attestation {
                proof_hash: format!("proof-{call}"),
                external_ref: "ref".into(),
            })
        }

        async fn verify(&self, _proof_hash: &str) -> Result<bool, AttestationError> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    /// Never completes within any reasonable timeout.
    struct Stalled;

    impl Attestor for Stalled {
        async fn attest(&self, _content: &[u8]) -> Result<Attestation, AttestationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(AttestationError::Unavailable("unreachable".into()))
        }

        async fn verify(&self, _proof_hash: &str) -> Result<bool, AttestationError> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    fn fast_policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(50),
            retries,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            timeout: Duration::from_secs(1),
            retries: 10,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(800));
        assert_eq!(policy.backoff_for(9), Duration::from_millis(800));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let attestor = Flaky::new(2, true);
        let attestation = attest_with_retry(&attestor, b"c", &fast_policy(3))
            .await
            .unwrap();
        assert_eq!(attestation.proof_hash, "proof-2");
        assert_eq!(attestor.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_when_retries_exhausted() {
        let attestor = Flaky::new(10, true);
        let err = attest_with_retry(&attestor, b"c", &fast_policy(2))
            .await
            .unwrap_err();
        assert!(matches!(err, AttestationError::Unavailable(_)));
        assert_eq!(attestor.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_is_not_retried() {
        let attestor = Flaky::new(1, false);
        let err = attest_with_retry(&attestor, b"c", &fast_policy(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AttestationError::Rejected(_)));
        assert_eq!(attestor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stalled_attempt_times_out() {
        let err = attest_with_retry(&Stalled, b"c", &fast_policy(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AttestationError::Timeout { after_ms: 50 }));
    }
}
