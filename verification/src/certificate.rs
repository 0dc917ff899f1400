//! Certificate issuer — turns a verified request into an attested certificate.
//!
//! Issuance is split around the external attestation call so no lock is held
//! while waiting on the network:
//!
//! 1. [`CertificateIssuer::begin`] (under the request lock) checks the request
//!    is verified, compare-and-sets the slot from `Idle` to `InFlight`, and
//!    snapshots the certificate body.
//! 2. The caller attests [`CertificateBody::canonical_bytes`].
//! 3. [`CertificateIssuer::complete`] or [`CertificateIssuer::abandon`]
//!    (under the lock again) settles the slot.

use crate::error::VerificationError;
use crate::request::{EvidenceRef, RequestKind};
use crate::state::{RequestRecord, VerificationState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use vouch_attestation::Attestation;
use vouch_types::{CertificateId, RequestId, Timestamp, UserId};

/// The attested content of a certificate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateBody {
    pub request_id: RequestId,
    pub requester: UserId,
    pub title: String,
    pub kind: RequestKind,
    pub issued_at: Timestamp,
    /// Approving validators, in confirmation order.
    pub confirming_validators: Vec<UserId>,
    pub evidence_snapshot: Vec<EvidenceRef>,
    pub confirmed_skills: BTreeSet<String>,
}

impl CertificateBody {
    /// Deterministic byte encoding handed to the attestor.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, VerificationError> {
        bincode::serialize(self).map_err(|e| VerificationError::Encoding(e.to_string()))
    }
}

/// An issued certificate. Immutable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub body: CertificateBody,
    pub attestation: Attestation,
}

impl Certificate {
    pub fn request_id(&self) -> RequestId {
        self.body.request_id
    }

    pub fn issued_at(&self) -> Timestamp {
        self.body.issued_at
    }

    pub fn proof_hash(&self) -> &str {
        &self.attestation.proof_hash
    }

    pub fn external_ref(&self) -> &str {
        &self.attestation.external_ref
    }
}

/// Issuance progress for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum IssuanceSlot {
    #[default]
    Idle,
    /// An attestation round-trip is under way.
    InFlight,
    Issued(Certificate),
}

pub struct CertificateIssuer;

impl CertificateIssuer {
    /// Reserve the issuance slot and snapshot the body.
    ///
    /// Fails with `NotVerified` unless the request is verified, and with
    /// `AlreadyIssued` while another issuance is in flight or once one
    /// has completed.
    pub fn begin(
        record: &mut RequestRecord,
        now: Timestamp,
    ) -> Result<CertificateBody, VerificationError> {
        let request_id = record.request.id;
        if record.state != VerificationState::Verified {
            return Err(VerificationError::NotVerified {
                request: request_id,
                state: record.state,
            });
        }
        if record.issuance != IssuanceSlot::Idle {
            return Err(VerificationError::AlreadyIssued(request_id));
        }
        record.issuance = IssuanceSlot::InFlight;

        Ok(CertificateBody {
            request_id,
            requester: record.request.requester.clone(),
            title: record.request.title.clone(),
            kind: record.request.kind,
            issued_at: now,
            confirming_validators: record.ledger.approving_validators(),
            evidence_snapshot: record.request.evidence.clone(),
            confirmed_skills: record.ledger.confirmed_skills(),
        })
    }

    /// Store the attested certificate. Only valid after a successful `begin`.
    pub fn complete(
        record: &mut RequestRecord,
        id: CertificateId,
        body: CertificateBody,
        attestation: Attestation,
    ) -> Certificate {
        let certificate = Certificate {
            id,
            body,
            attestation,
        };
        record.issuance = IssuanceSlot::Issued(certificate.clone());
        certificate
    }

    /// Release an in-flight reservation so issuance can be retried.
    pub fn abandon(record: &mut RequestRecord) {
        if record.issuance == IssuanceSlot::InFlight {
            record.issuance = IssuanceSlot::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ConfirmationInput, Decision};
    use crate::request::{EvidenceKind, NewRequest, VerificationRequest};
    use vouch_types::QuorumPolicy;

    fn user(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn record() -> RequestRecord {
        let request = VerificationRequest::from_new(
            RequestId::new(3),
            NewRequest {
                requester: user("maya"),
                title: "Mobile app".into(),
                description: "Shipped the iOS client".into(),
                kind: RequestKind::Project,
                claimed_skills: vec!["Swift".into(), "UX".into()],
                evidence: vec![EvidenceRef::new(
                    EvidenceKind::Commit,
                    "https://git.example/app/commit/abc",
                    "release commit",
                    Timestamp::new(2),
                )],
                validators: vec![user("alex"), user("sam"), user("jordan")],
            },
            &QuorumPolicy::default(),
            Timestamp::new(10),
        )
        .unwrap();
        RequestRecord::new(request)
    }

    fn approve(record: &mut RequestRecord, validator: &str, skill: &str) {
        let request = record.request.clone();
        record
            .ledger
            .append(
                &request,
                ConfirmationInput {
                    request_id: request.id,
                    validator: user(validator),
                    decision: Decision::Approve,
                    skills_confirmed: vec![skill.into()],
                    rating: Some(5),
                    comment: None,
                },
                Timestamp::new(20),
            )
            .unwrap();
    }

    fn attestation() -> Attestation {
        Attestation {
            proof_hash: "p".into(),
            external_ref: "r".into(),
        }
    }

    #[test]
    fn pending_request_cannot_be_certified() {
        let mut rec = record();
        let err = CertificateIssuer::begin(&mut rec, Timestamp::new(30)).unwrap_err();
        assert!(matches!(err, VerificationError::NotVerified { .. }));
        assert_eq!(rec.issuance, IssuanceSlot::Idle);
    }

    #[test]
    fn body_snapshots_validators_and_evidence() {
        let mut rec = record();
        approve(&mut rec, "sam", "Swift");
        approve(&mut rec, "alex", "UX");
        rec.state = VerificationState::Verified;

        let body = CertificateIssuer::begin(&mut rec, Timestamp::new(30)).unwrap();
        assert_eq!(body.confirming_validators, vec![user("sam"), user("alex")]);
        assert_eq!(body.evidence_snapshot.len(), 1);
        assert_eq!(body.confirmed_skills.len(), 2);
        assert_eq!(rec.issuance, IssuanceSlot::InFlight);
    }

    #[test]
    fn in_flight_and_issued_slots_refuse_a_second_issuance() {
        let mut rec = record();
        rec.state = VerificationState::Verified;
        let body = CertificateIssuer::begin(&mut rec, Timestamp::new(30)).unwrap();

        let err = CertificateIssuer::begin(&mut rec, Timestamp::new(31)).unwrap_err();
        assert!(matches!(err, VerificationError::AlreadyIssued(_)));

        CertificateIssuer::complete(&mut rec, CertificateId::new(1), body, attestation());
        let err = CertificateIssuer::begin(&mut rec, Timestamp::new(32)).unwrap_err();
        assert!(matches!(err, VerificationError::AlreadyIssued(_)));
        assert_eq!(rec.certificate().map(|c| c.proof_hash()), Some("p"));
    }

    #[test]
    fn abandon_allows_retry() {
        let mut rec = record();
        rec.state = VerificationState::Verified;
        CertificateIssuer::begin(&mut rec, Timestamp::new(30)).unwrap();
        CertificateIssuer::abandon(&mut rec);
        assert!(CertificateIssuer::begin(&mut rec, Timestamp::new(31)).is_ok());
    }

    #[test]
    fn canonical_bytes_are_stable() {
        let mut rec = record();
        rec.state = VerificationState::Verified;
        let body = CertificateIssuer::begin(&mut rec, Timestamp::new(30)).unwrap();
        assert_eq!(body.canonical_bytes().unwrap(), body.clone().canonical_bytes().unwrap());
    }
}
