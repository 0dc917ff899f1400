//! HTTP client for an external attestation service.
//!
//! The API contract:
//! - `POST {base}/attest` with `{"content": "<hex>"}` returns
//!   `{"proof_hash": "...", "external_ref": "..."}`.
//! - `GET {base}/verify/{proof_hash}` returns `{"valid": bool}`; a 404 means
//!   the proof is unknown.

use crate::error::AttestationError;
use crate::{Attestation, Attestor};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout for attestation requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`Attestor`] backed by an HTTP attestation service.
pub struct HttpAttestor {
    base_url: String,
    timeout: Duration,
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct AttestRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
struct AttestResponse {
    proof_hash: String,
    external_ref: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    valid: bool,
}

impl HttpAttestor {
    /// Create a client for `base_url` with default timeouts.
    pub fn new(base_url: &str) -> Self {
        Self::with_timeouts(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a client with custom request and connect timeouts.
    pub fn with_timeouts(base_url: &str, timeout: Duration, connect_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base_url` with `segments` appended, each percent-encoded as one path
    /// segment.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, AttestationError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            AttestationError::Rejected(format!("invalid endpoint {:?}: {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                AttestationError::Rejected(format!("endpoint {:?} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn map_send_error(&self, e: reqwest::Error) -> AttestationError {
        if e.is_timeout() {
            AttestationError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_connect() {
            AttestationError::Unavailable(format!("connection failed: {e}"))
        } else {
            AttestationError::Unavailable(e.to_string())
        }
    }
}

/// Map a non-success HTTP status onto the error taxonomy: server errors are
/// transient, client errors are not.
fn status_error(status: reqwest::StatusCode) -> AttestationError {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        AttestationError::Unavailable(format!("HTTP status {status}"))
    } else {
        AttestationError::Rejected(format!("HTTP status {status}"))
    }
}

impl Attestor for HttpAttestor {
    async fn attest(&self, content: &[u8]) -> Result<Attestation, AttestationError> {
        let url = self.endpoint(&["attest"])?;
        let body = AttestRequest {
            content: hex::encode(content),
        };

        let response = self
            .http_client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        let parsed: AttestResponse = response.json().await.map_err(|e| {
            AttestationError::InvalidResponse(format!("failed to parse attest response: {e}"))
        })?;

        if parsed.proof_hash.trim().is_empty() {
            return Err(AttestationError::InvalidResponse(
                "empty proof_hash".to_string(),
            ));
        }

        Ok(Attestation {
            proof_hash: parsed.proof_hash,
            external_ref: parsed.external_ref,
        })
    }

    async fn verify(&self, proof_hash: &str) -> Result<bool, AttestationError> {
        let url = self.endpoint(&["verify", proof_hash])?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        let parsed: VerifyResponse = response.json().await.map_err(|e| {
            AttestationError::InvalidResponse(format!("failed to parse verify response: {e}"))
        })?;
        Ok(parsed.valid)
    }

    fn name(&self) -> &str {
        "http"
    }
}
