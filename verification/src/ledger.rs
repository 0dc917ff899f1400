//! Confirmation ledger — the append-only record of validator decisions.

use crate::error::VerificationError;
use crate::request::{normalize_skills, VerificationRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use vouch_types::{RequestId, Timestamp, UserId};

/// Lowest and highest rating an approving validator may give.
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A validator's decision on a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "approve"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// What a validator submits.
#[derive(Clone, Debug)]
pub struct ConfirmationInput {
    pub request_id: RequestId,
    pub validator: UserId,
    pub decision: Decision,
    pub skills_confirmed: Vec<String>,
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

/// A recorded decision. Never mutated after it is appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub request_id: RequestId,
    pub validator: UserId,
    pub decision: Decision,
    pub skills_confirmed: BTreeSet<String>,
    /// Present iff `decision` is [`Decision::Approve`].
    pub rating: Option<u8>,
    pub comment: Option<String>,
    pub timestamp: Timestamp,
}

/// All confirmations for one request, in append order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationLedger {
    entries: Vec<Confirmation>,
}

impl ConfirmationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `input` against `request` and append it.
    ///
    /// Checks run in order: validator membership, uniqueness, rating, skills.
    /// A rejected input leaves the ledger untouched.
    pub fn append(
        &mut self,
        request: &VerificationRequest,
        input: ConfirmationInput,
        now: Timestamp,
    ) -> Result<&Confirmation, VerificationError> {
        if !request.is_validator(&input.validator) {
            return Err(VerificationError::NotAValidator {
                request: request.id,
                validator: input.validator,
            });
        }
        if self.has_confirmed(&input.validator) {
            return Err(VerificationError::DuplicateConfirmation {
                request: request.id,
                validator: input.validator,
            });
        }
        check_rating(input.decision, input.rating)?;

        let skills_confirmed = normalize_skills(&input.skills_confirmed)?;
        if let Some(unclaimed) = skills_confirmed
            .iter()
            .find(|s| !request.claimed_skills.contains(*s))
        {
            return Err(VerificationError::Validation(format!(
                "skill {unclaimed:?} was not claimed by the request"
            )));
        }

        let comment = input
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        self.entries.push(Confirmation {
            request_id: request.id,
            validator: input.validator,
            decision: input.decision,
            skills_confirmed,
            rating: input.rating,
            comment,
            timestamp: now,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn has_confirmed(&self, validator: &UserId) -> bool {
        self.entries.iter().any(|c| &c.validator == validator)
    }

    pub fn approvals(&self) -> u32 {
        self.count(Decision::Approve)
    }

    pub fn rejections(&self) -> u32 {
        self.count(Decision::Reject)
    }

    fn count(&self, decision: Decision) -> u32 {
        self.entries.iter().filter(|c| c.decision == decision).count() as u32
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Confirmation] {
        &self.entries
    }

    /// Approving validators in the order they confirmed.
    pub fn approving_validators(&self) -> Vec<UserId> {
        self.entries
            .iter()
            .filter(|c| c.decision == Decision::Approve)
            .map(|c| c.validator.clone())
            .collect()
    }

    /// Union of skills confirmed by approving validators.
    pub fn confirmed_skills(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|c| c.decision == Decision::Approve)
            .flat_map(|c| c.skills_confirmed.iter().cloned())
            .collect()
    }

    /// Mean rating across approvals, if any.
    pub fn average_rating(&self) -> Option<f64> {
        let ratings: Vec<u8> = self.entries.iter().filter_map(|c| c.rating).collect();
        if ratings.is_empty() {
            return None;
        }
        let sum: u32 = ratings.iter().map(|&r| r as u32).sum();
        Some(sum as f64 / ratings.len() as f64)
    }
}

/// A rating is required in `[1, 5]` for approvals and forbidden for rejections.
pub fn check_rating(decision: Decision, rating: Option<u8>) -> Result<(), VerificationError> {
    match (decision, rating) {
        (Decision::Approve, None) => Err(VerificationError::InvalidRating(
            "an approval requires a rating".into(),
        )),
        (Decision::Approve, Some(r)) if !(MIN_RATING..=MAX_RATING).contains(&r) => {
            Err(VerificationError::InvalidRating(format!(
                "rating {r} is outside {MIN_RATING}..={MAX_RATING}"
            )))
        }
        (Decision::Reject, Some(r)) => Err(VerificationError::InvalidRating(format!(
            "a rejection cannot carry a rating (got {r})"
        ))),
        _ => Ok(()),
    }
}
