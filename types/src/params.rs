//! Verification parameters: the quorum threshold policy and intake limits.
//!
//! Every value is configurable; the defaults are a reasonable starting point,
//! not a normative rule.

use serde::{Deserialize, Serialize};

/// Basis points in 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Decides how many approvals settle a request.
///
/// `required = max(1, min_approvals, ceil(n * approval_threshold_bps / 10_000))`
/// where `n` is the number of chosen validators. At least one approval is
/// always required, whatever the configuration says.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumPolicy {
    /// Floor on the number of approvals, regardless of validator count.
    #[serde(default = "default_min_approvals")]
    pub min_approvals: u32,

    /// Fraction of chosen validators that must approve (basis points).
    /// Default 5001 = strict majority.
    #[serde(default = "default_approval_threshold_bps")]
    pub approval_threshold_bps: u32,
}

fn default_min_approvals() -> u32 {
    2
}

fn default_approval_threshold_bps() -> u32 {
    5001
}

impl QuorumPolicy {
    pub fn new(min_approvals: u32, approval_threshold_bps: u32) -> Self {
        Self {
            min_approvals,
            approval_threshold_bps,
        }
    }

    /// Approvals required for a request with `validator_count` chosen validators.
    pub fn required_approvals(&self, validator_count: u32) -> u32 {
        let scaled = validator_count as u64 * self.approval_threshold_bps as u64;
        let by_fraction = scaled.div_ceil(BPS_DENOMINATOR) as u32;
        by_fraction.max(self.min_approvals).max(1)
    }

    /// Whether `validator_count` validators can ever reach the threshold.
    pub fn is_reachable(&self, validator_count: u32) -> bool {
        self.required_approvals(validator_count) <= validator_count
    }
}

impl Default for QuorumPolicy {
    fn default() -> Self {
        Self {
            min_approvals: default_min_approvals(),
            approval_threshold_bps: default_approval_threshold_bps(),
        }
    }
}

/// All parameters the verification service reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationParams {
    #[serde(default)]
    pub quorum: QuorumPolicy,

    /// Window (seconds) in which a second request with the same requester and
    /// title is treated as a double submission.
    #[serde(default = "default_dedupe_window_secs")]
    pub dedupe_window_secs: u64,
}

fn default_dedupe_window_secs() -> u64 {
    300
}

impl Default for VerificationParams {
    fn default() -> Self {
        Self {
            quorum: QuorumPolicy::default(),
            dedupe_window_secs: default_dedupe_window_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_of_three_is_two() {
        assert_eq!(QuorumPolicy::default().required_approvals(3), 2);
    }

    #[test]
    fn majority_of_four_is_three() {
        assert_eq!(QuorumPolicy::default().required_approvals(4), 3);
    }

    #[test]
    fn zero_policy_still_requires_one_approval() {
        let policy = QuorumPolicy::new(0, 0);
        assert_eq!(policy.required_approvals(3), 1);
        assert_eq!(policy.required_approvals(0), 1);
        assert!(!policy.is_reachable(0));
        assert!(policy.is_reachable(1));
    }

    #[test]
    fn minimum_applies_to_small_sets() {
        let policy = QuorumPolicy::default();
        assert_eq!(policy.required_approvals(1), 2);
        assert!(!policy.is_reachable(1));
        assert!(policy.is_reachable(2));
    }

    #[test]
    fn unanimity_policy() {
        let policy = QuorumPolicy::new(1, 10_000);
        assert_eq!(policy.required_approvals(5), 5);
        assert_eq!(policy.required_approvals(1), 1);
    }
}
