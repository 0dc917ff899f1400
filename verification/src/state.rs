//! Per-request state tracking.

use crate::certificate::{Certificate, IssuanceSlot};
use crate::ledger::ConfirmationLedger;
use crate::request::VerificationRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a request is in its life cycle.
///
/// `Pending` moves to exactly one of the terminal states and never back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationState {
    /// Waiting for more confirmations.
    Pending,
    /// Enough validators approved.
    Verified,
    /// Too many rejections for the threshold to remain reachable.
    Disputed,
}

impl VerificationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Forward-only transition: a terminal state is never replaced.
    pub fn advance(self, evaluated: VerificationState) -> VerificationState {
        if self.is_terminal() {
            self
        } else {
            evaluated
        }
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Verified => write!(f, "verified"),
            Self::Disputed => write!(f, "disputed"),
        }
    }
}

/// Everything the orchestrator holds for one request, guarded by one lock.
#[derive(Debug)]
pub struct RequestRecord {
    pub request: VerificationRequest,
    pub ledger: ConfirmationLedger,
    pub state: VerificationState,
    pub issuance: IssuanceSlot,
}

impl RequestRecord {
    pub fn new(request: VerificationRequest) -> Self {
        Self {
            request,
            ledger: ConfirmationLedger::new(),
            state: VerificationState::Pending,
            issuance: IssuanceSlot::Idle,
        }
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        match &self.issuance {
            IssuanceSlot::Issued(cert) => Some(cert),
            _ => None,
        }
    }

    /// Persistable view. An in-flight issuance is dropped: it restarts as idle.
    pub fn to_snapshot(&self) -> RecordSnapshot {
        RecordSnapshot {
            request: self.request.clone(),
            ledger: self.ledger.clone(),
            state: self.state,
            certificate: self.certificate().cloned(),
        }
    }

    pub fn from_snapshot(snapshot: RecordSnapshot) -> Self {
        Self {
            request: snapshot.request,
            ledger: snapshot.ledger,
            state: snapshot.state,
            issuance: match snapshot.certificate {
                Some(cert) => IssuanceSlot::Issued(cert),
                None => IssuanceSlot::Idle,
            },
        }
    }
}

/// Serializable form of a [`RequestRecord`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub request: VerificationRequest,
    pub ledger: ConfirmationLedger,
    pub state: VerificationState,
    pub certificate: Option<Certificate>,
}
