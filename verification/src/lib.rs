//! Peer-validated contribution verification.
//!
//! A contributor opens a [`VerificationRequest`] naming the work, the skills
//! it demonstrates, supporting evidence, and the peers who should vouch for
//! it. The flow:
//!
//! 1. **Intake**: the request is validated and fanned out to each chosen
//!    validator's queue.
//! 2. **Confirmation**: validators approve (with a 1–5 rating) or reject; each
//!    decision is appended to the request's [`ConfirmationLedger`].
//! 3. **Quorum**: after every append the [`QuorumEvaluator`] recomputes the
//!    state. `pending` moves to `verified` or `disputed` and stops there.
//! 4. **Certificate**: a verified request gets exactly one [`Certificate`],
//!    attested by an external [`vouch_attestation::Attestor`].
//!
//! [`VerificationOrchestrator`] is the thread-safe entry point for all of it.

pub mod certificate;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod queue;
pub mod quorum;
pub mod request;
pub mod state;

pub use certificate::{Certificate, CertificateBody, CertificateIssuer, IssuanceSlot};
pub use error::VerificationError;
pub use ledger::{Confirmation, ConfirmationInput, ConfirmationLedger, Decision};
pub use orchestrator::{OrchestratorSnapshot, VerificationEvent, VerificationOrchestrator};
pub use queue::ValidatorQueues;
pub use quorum::{QuorumEvaluator, VerificationStatus};
pub use request::{EvidenceKind, EvidenceRef, NewRequest, RequestKind, VerificationRequest};
pub use state::{RequestRecord, VerificationState};
