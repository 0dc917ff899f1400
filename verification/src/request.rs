//! Verification requests and intake validation.

use crate::error::VerificationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use vouch_types::{QuorumPolicy, RequestId, Timestamp, UserId};

/// What the requester wants vouched for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Contribution,
    Skill,
    Project,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contribution => write!(f, "contribution"),
            Self::Skill => write!(f, "skill"),
            Self::Project => write!(f, "project"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Commit,
    File,
    Link,
    Screenshot,
}

/// A pointer to supporting material. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef {
    kind: EvidenceKind,
    url: String,
    description: String,
    timestamp: Timestamp,
}

impl EvidenceRef {
    pub fn new(
        kind: EvidenceKind,
        url: impl Into<String>,
        description: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            kind,
            url: url.into(),
            description: description.into(),
            timestamp,
        }
    }

    pub fn kind(&self) -> EvidenceKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Input to [`crate::VerificationOrchestrator::submit_request`].
#[derive(Clone, Debug)]
pub struct NewRequest {
    pub requester: UserId,
    pub title: String,
    pub description: String,
    pub kind: RequestKind,
    pub claimed_skills: Vec<String>,
    pub evidence: Vec<EvidenceRef>,
    pub validators: Vec<UserId>,
}

/// An accepted verification request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: RequestId,
    pub requester: UserId,
    pub title: String,
    pub description: String,
    pub kind: RequestKind,
    pub claimed_skills: BTreeSet<String>,
    pub evidence: Vec<EvidenceRef>,
    pub chosen_validators: BTreeSet<UserId>,
    /// Approvals needed to verify, fixed by the policy in force at intake.
    pub required_approvals: u32,
    pub created_at: Timestamp,
}

impl VerificationRequest {
    /// Validate `new` and build the request it describes.
    ///
    /// Skills are trimmed and duplicate validators collapse into the set.
    pub fn from_new(
        id: RequestId,
        new: NewRequest,
        policy: &QuorumPolicy,
        now: Timestamp,
    ) -> Result<Self, VerificationError> {
        let title = new.title.trim().to_string();
        let description = new.description.trim().to_string();
        if title.is_empty() {
            return Err(VerificationError::Validation("title must not be blank".into()));
        }
        if description.is_empty() {
            return Err(VerificationError::Validation(
                "description must not be blank".into(),
            ));
        }

        let claimed_skills = normalize_skills(&new.claimed_skills)?;
        if claimed_skills.is_empty() {
            return Err(VerificationError::Validation(
                "at least one claimed skill is required".into(),
            ));
        }

        if let Some(bad) = new.evidence.iter().find(|e| e.url().trim().is_empty()) {
            return Err(VerificationError::Validation(format!(
                "evidence {:?} has a blank url",
                bad.description()
            )));
        }

        let chosen_validators: BTreeSet<UserId> = new.validators.into_iter().collect();
        if chosen_validators.is_empty() {
            return Err(VerificationError::Validation(
                "at least one validator must be chosen".into(),
            ));
        }
        if chosen_validators.contains(&new.requester) {
            return Err(VerificationError::Validation(
                "requesters cannot validate their own request".into(),
            ));
        }
        let count = chosen_validators.len() as u32;
        let required_approvals = policy.required_approvals(count);
        if required_approvals > count {
            return Err(VerificationError::Validation(format!(
                "{count} validator(s) can never reach the {required_approvals} approvals required"
            )));
        }

        Ok(Self {
            id,
            requester: new.requester,
            title,
            description,
            kind: new.kind,
            claimed_skills,
            evidence: new.evidence,
            chosen_validators,
            required_approvals,
            created_at: now,
        })
    }

    pub fn is_validator(&self, user: &UserId) -> bool {
        self.chosen_validators.contains(user)
    }

    pub fn validator_count(&self) -> u32 {
        self.chosen_validators.len() as u32
    }

    /// Key used to detect double submissions: requester plus case-folded title.
    pub fn dedupe_key(&self) -> DedupeKey {
        DedupeKey::new(&self.requester, &self.title)
    }
}

/// Identity of a submission for double-submit detection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DedupeKey {
    requester: UserId,
    folded_title: String,
}

impl DedupeKey {
    pub fn new(requester: &UserId, title: &str) -> Self {
        Self {
            requester: requester.clone(),
            folded_title: title.trim().to_lowercase(),
        }
    }
}

/// Trim every skill, rejecting blanks. Duplicates collapse.
pub(crate) fn normalize_skills(skills: &[String]) -> Result<BTreeSet<String>, VerificationError> {
    skills
        .iter()
        .map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(VerificationError::Validation("skills must not be blank".into()))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn new_request() -> NewRequest {
        NewRequest {
            requester: user("maya"),
            title: "Landing page redesign".into(),
            description: "Rebuilt the hero section and navigation".into(),
            kind: RequestKind::Contribution,
            claimed_skills: vec!["UI Design".into(), " Figma ".into()],
            evidence: vec![EvidenceRef::new(
                EvidenceKind::File,
                "https://files.example/hero.fig",
                "final mockups",
                Timestamp::new(10),
            )],
            validators: vec![user("alex"), user("jordan"), user("sam")],
        }
    }

    fn build(new: NewRequest) -> Result<VerificationRequest, VerificationError> {
        VerificationRequest::from_new(
            RequestId::new(1),
            new,
            &QuorumPolicy::default(),
            Timestamp::new(100),
        )
    }

    #[test]
    fn valid_request_is_normalized() {
        let req = build(new_request()).unwrap();
        assert!(req.claimed_skills.contains("Figma"));
        assert_eq!(req.validator_count(), 3);
        assert_eq!(req.required_approvals, 2);
        assert_eq!(req.created_at, Timestamp::new(100));
    }

    #[test]
    fn empty_skills_rejected() {
        let mut new = new_request();
        new.claimed_skills.clear();
        assert!(matches!(build(new), Err(VerificationError::Validation(_))));
    }

    #[test]
    fn blank_skill_rejected() {
        let mut new = new_request();
        new.claimed_skills.push("   ".into());
        assert!(matches!(build(new), Err(VerificationError::Validation(_))));
    }

    #[test]
    fn blank_title_or_description_rejected() {
        let mut new = new_request();
        new.title = "  ".into();
        assert!(matches!(build(new), Err(VerificationError::Validation(_))));

        let mut new = new_request();
        new.description = String::new();
        assert!(matches!(build(new), Err(VerificationError::Validation(_))));
    }

    #[test]
    fn no_validators_rejected() {
        let mut new = new_request();
        new.validators.clear();
        assert!(matches!(build(new), Err(VerificationError::Validation(_))));
    }

    #[test]
    fn self_validation_rejected() {
        let mut new = new_request();
        new.validators.push(user("maya"));
        assert!(matches!(build(new), Err(VerificationError::Validation(_))));
    }

    #[test]
    fn too_few_validators_for_policy_rejected() {
        let mut new = new_request();
        new.validators = vec![user("alex")];
        assert!(matches!(build(new), Err(VerificationError::Validation(_))));
    }

    #[test]
    fn duplicate_validators_collapse() {
        let mut new = new_request();
        new.validators = vec![user("alex"), user("alex"), user("sam")];
        let req = build(new).unwrap();
        assert_eq!(req.validator_count(), 2);
    }

    #[test]
    fn blank_evidence_url_rejected() {
        let mut new = new_request();
        new.evidence.push(EvidenceRef::new(
            EvidenceKind::Link,
            " ",
            "broken",
            Timestamp::new(1),
        ));
        assert!(matches!(build(new), Err(VerificationError::Validation(_))));
    }

    #[test]
    fn dedupe_key_folds_case_and_whitespace() {
        let a = DedupeKey::new(&user("maya"), "Landing Page ");
        let b = DedupeKey::new(&user("maya"), "landing page");
        let c = DedupeKey::new(&user("alex"), "landing page");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
