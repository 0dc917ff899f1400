use proptest::prelude::*;
use std::sync::Arc;

use vouch_attestation::RetryPolicy;
use vouch_nullables::NullClock;
use vouch_types::{QuorumPolicy, RequestId, Timestamp, UserId, VerificationParams};
use vouch_verification::{
    ConfirmationInput, ConfirmationLedger, Decision, NewRequest, QuorumEvaluator, RequestKind,
    VerificationError, VerificationOrchestrator, VerificationRequest, VerificationState,
};

fn validators(n: usize) -> Vec<UserId> {
    (0..n)
        .map(|i| UserId::parse(&format!("validator{i}")).unwrap())
        .collect()
}

fn new_request(n: usize) -> NewRequest {
    NewRequest {
        requester: UserId::parse("requester").unwrap(),
        title: "Release tooling".into(),
        description: "Automated the release pipeline".into(),
        kind: RequestKind::Contribution,
        claimed_skills: vec!["CI".into()],
        evidence: Vec::new(),
        validators: validators(n),
    }
}

fn input(request_id: RequestId, validator: UserId, approve: bool) -> ConfirmationInput {
    ConfirmationInput {
        request_id,
        validator,
        decision: if approve { Decision::Approve } else { Decision::Reject },
        skills_confirmed: Vec::new(),
        rating: approve.then_some(3),
        comment: None,
    }
}

/// (validator count, sequence of (validator index, approve?)) with indices
/// that may repeat.
fn decision_script() -> impl Strategy<Value = (usize, Vec<(usize, bool)>)> {
    (2usize..9).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, any::<bool>()), 0..20)))
}

proptest! {
    /// Once a request leaves `pending` its state never changes, and
    /// evaluating an unchanged ledger again gives the same answer.
    #[test]
    fn quorum_is_monotonic_and_idempotent((n, script) in decision_script()) {
        let policy = QuorumPolicy::default();
        let request = VerificationRequest::from_new(
            RequestId::new(1),
            new_request(n),
            &policy,
            Timestamp::new(0),
        )
        .unwrap();
        let people = validators(n);
        let mut ledger = ConfirmationLedger::new();
        let mut state = VerificationState::Pending;

        for (i, (who, approve)) in script.into_iter().enumerate() {
            if state.is_terminal() {
                break;
            }
            let _ = ledger.append(&request, input(request.id, people[who].clone(), approve), Timestamp::new(i as u64));
            let first = QuorumEvaluator::evaluate(&request, &ledger);
            let second = QuorumEvaluator::evaluate(&request, &ledger);
            prop_assert_eq!(first, second);

            let next = state.advance(first.state);
            if state.is_terminal() {
                prop_assert_eq!(next, state);
            }
            state = next;
        }
    }

    /// However the confirmations arrive, the orchestrator keeps at most one
    /// per validator and never moves a terminal request.
    #[test]
    fn one_confirmation_per_validator((n, script) in decision_script()) {
        let orch = VerificationOrchestrator::new(
            VerificationParams::default(),
            RetryPolicy::default(),
            Arc::new(NullClock::new(10)),
        );
        let id = orch.submit_request(new_request(n)).unwrap();
        let people = validators(n);
        let mut terminal: Option<VerificationState> = None;

        for (who, approve) in script {
            match orch.record_confirmation(input(id, people[who].clone(), approve)) {
                Ok(status) => {
                    prop_assert!(terminal.is_none());
                    if status.state.is_terminal() {
                        terminal = Some(status.state);
                    }
                }
                Err(VerificationError::DuplicateConfirmation { .. }) => {}
                Err(VerificationError::RequestClosed { state, .. }) => {
                    prop_assert_eq!(Some(state), terminal);
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        let confirmations = orch.confirmations(id).unwrap();
        let mut seen = std::collections::HashSet::new();
        for c in &confirmations {
            prop_assert!(seen.insert(c.validator.clone()));
        }
        prop_assert!(confirmations.len() <= n);
    }
}
