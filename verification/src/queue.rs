//! Validator queues — each validator's inbox of requests awaiting a decision.
//!
//! The queue only indexes request ids. Whether an entry is still pending for
//! a validator is decided at listing time from the request's current state,
//! so re-listing is idempotent and never consumes anything.

use std::collections::HashMap;
use vouch_types::{RequestId, UserId};

#[derive(Debug, Default)]
pub struct ValidatorQueues {
    inboxes: HashMap<UserId, Vec<RequestId>>,
}

impl ValidatorQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fan a request out to every chosen validator.
    pub fn enqueue<'a>(
        &mut self,
        request_id: RequestId,
        validators: impl IntoIterator<Item = &'a UserId>,
    ) {
        for validator in validators {
            let inbox = self.inboxes.entry(validator.clone()).or_default();
            if !inbox.contains(&request_id) {
                inbox.push(request_id);
            }
        }
    }

    /// Every request ever queued for `validator`, oldest first.
    pub fn entries(&self, validator: &UserId) -> Vec<RequestId> {
        self.inboxes.get(validator).cloned().unwrap_or_default()
    }

    /// Number of validators with at least one queued request.
    pub fn validator_count(&self) -> usize {
        self.inboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inboxes.is_empty()
    }
}
