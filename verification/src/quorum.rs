//! Quorum evaluation — derives a request's state from its ledger.

use crate::ledger::ConfirmationLedger;
use crate::request::VerificationRequest;
use crate::state::VerificationState;
use serde::{Deserialize, Serialize};
use vouch_types::RequestId;

/// Derived status of a request, recomputed after every confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStatus {
    pub request_id: RequestId,
    pub state: VerificationState,
    /// Number of approvals recorded.
    pub current_count: u32,
    /// Approvals needed to verify.
    pub required_count: u32,
    pub reject_count: u32,
    /// Chosen validators who have not responded yet.
    pub outstanding: u32,
}

/// Derives a request's state from its ledger.
///
/// The approval requirement is the one frozen on the request at intake, so
/// evaluation is a pure function of the request and its ledger: re-running it
/// on an unchanged ledger gives the same answer, and a later policy change
/// cannot move an existing request.
pub struct QuorumEvaluator;

impl QuorumEvaluator {
    /// Verified once approvals reach the requirement; disputed as soon as the
    /// outstanding validators could no longer close the gap.
    pub fn evaluate(
        request: &VerificationRequest,
        ledger: &ConfirmationLedger,
    ) -> VerificationStatus {
        let validator_count = request.validator_count();
        let approvals = ledger.approvals();
        let rejections = ledger.rejections();
        let outstanding = validator_count.saturating_sub(approvals + rejections);
        let required = request.required_approvals;

        let state = if approvals >= required {
            VerificationState::Verified
        } else if approvals + outstanding < required {
            VerificationState::Disputed
        } else {
            VerificationState::Pending
        };

        VerificationStatus {
            request_id: request.id,
            state,
            current_count: approvals,
            required_count: required,
            reject_count: rejections,
            outstanding,
        }
    }
}
