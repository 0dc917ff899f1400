use proptest::prelude::*;

use vouch_types::{QuorumPolicy, RequestId, Timestamp, UserId};

proptest! {
    /// RequestId display/parse roundtrip.
    #[test]
    fn request_id_display_parse(n in 0u64..u64::MAX) {
        let id = RequestId::new(n);
        let parsed: RequestId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// RequestId survives bincode encoding (it is embedded in certificate bodies).
    #[test]
    fn request_id_bincode_roundtrip(n in 0u64..u64::MAX) {
        let id = RequestId::new(n);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: RequestId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }

    /// Any handle without whitespace parses back to itself.
    #[test]
    fn user_id_accepts_plain_handles(handle in "[a-z][a-z0-9_.-]{0,20}") {
        let id = UserId::parse(&handle).unwrap();
        prop_assert_eq!(id.as_str(), handle.as_str());
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// Timestamp has_expired agrees with manual arithmetic.
    #[test]
    fn timestamp_has_expired_correct(
        start in 0u64..500_000,
        duration in 1u64..500_000,
        offset in 0u64..1_000_000,
    ) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(start.saturating_add(offset));
        prop_assert_eq!(t.has_expired(duration, now), offset >= duration);
    }

    /// The required approval count never exceeds the validator count once the
    /// set is large enough to satisfy the minimum.
    #[test]
    fn required_approvals_bounded(
        min_approvals in 1u32..5,
        bps in 1u32..=10_000,
        n in 1u32..200,
    ) {
        let policy = QuorumPolicy::new(min_approvals, bps);
        let required = policy.required_approvals(n);
        prop_assert!(required >= min_approvals);
        if n >= min_approvals {
            prop_assert!(required <= n);
            prop_assert!(policy.is_reachable(n));
        }
    }

    /// Required approvals is monotone in the validator count.
    #[test]
    fn required_approvals_monotone(bps in 1u32..=10_000, n in 1u32..200) {
        let policy = QuorumPolicy::new(1, bps);
        prop_assert!(policy.required_approvals(n) <= policy.required_approvals(n + 1));
    }

    /// No configuration, however degenerate, lets a request verify with zero
    /// approvals.
    #[test]
    fn at_least_one_approval_required(
        min_approvals in 0u32..5,
        bps in 0u32..=10_000,
        n in 0u32..200,
    ) {
        let policy = QuorumPolicy::new(min_approvals, bps);
        prop_assert!(policy.required_approvals(n) >= 1);
    }
}
