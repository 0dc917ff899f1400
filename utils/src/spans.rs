//! Pre-built [`tracing::Span`] constructors for verification work.
//!
//! Using consistent span names and field sets makes it easy to correlate every
//! log line that belongs to one request.

use tracing::{info_span, Span};

/// Span covering intake of a new verification request.
pub fn submit_span(requester: &str, title: &str) -> Span {
    info_span!("submit_request", requester = %requester, title = %title)
}

/// Span covering one validator decision on a request.
pub fn confirmation_span(request_id: &str, validator: &str) -> Span {
    info_span!("record_confirmation", request = %request_id, validator = %validator)
}

/// Span covering certificate issuance, including the attestation round-trip.
pub fn issuance_span(request_id: &str) -> Span {
    info_span!("issue_certificate", request = %request_id)
}

/// Span covering a single attestation attempt against the external collaborator.
pub fn attestation_span(attestor: &str, attempt: u32) -> Span {
    info_span!("attest", attestor = %attestor, attempt = attempt)
}
