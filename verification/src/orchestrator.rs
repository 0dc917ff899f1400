//! Verification orchestrator — connects intake, validator queues, the
//! confirmation ledger, quorum evaluation, and certificate issuance into a
//! single thread-safe workflow.
//!
//! Lock order: dedupe index → request registry → request record → queues →
//! events. No lock is held across an `.await`.

use crate::certificate::{Certificate, CertificateIssuer};
use crate::error::VerificationError;
use crate::ledger::{Confirmation, ConfirmationInput, Decision};
use crate::quorum::{QuorumEvaluator, VerificationStatus};
use crate::queue::ValidatorQueues;
use crate::request::{DedupeKey, NewRequest, VerificationRequest};
use crate::state::{RecordSnapshot, RequestRecord, VerificationState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn, Instrument};
use vouch_attestation::{attest_with_retry, Attestor, RetryPolicy};
use vouch_types::{
    CertificateId, Clock, RequestId, SystemClock, Timestamp, UserId, VerificationParams,
};
use vouch_utils::spans::{confirmation_span, issuance_span, submit_span};
use vouch_utils::StatsCounter;

/// Counter names exposed through [`VerificationOrchestrator::stats`].
pub const STAT_NAMES: &[&str] = &[
    "requests_submitted",
    "requests_rejected",
    "confirmations_recorded",
    "requests_verified",
    "requests_disputed",
    "certificates_issued",
    "attestation_failures",
];

/// Events emitted by the orchestrator for a front end to consume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationEvent {
    /// A request was accepted and queued for its validators.
    RequestSubmitted {
        request_id: RequestId,
        validators: Vec<UserId>,
    },
    /// A validator decision was appended to the ledger.
    ConfirmationRecorded {
        request_id: RequestId,
        validator: UserId,
        decision: Decision,
    },
    /// Quorum reached.
    RequestVerified {
        request_id: RequestId,
        approvals: u32,
        required: u32,
    },
    /// Quorum became unreachable.
    RequestDisputed {
        request_id: RequestId,
        rejections: u32,
    },
    /// A certificate was attested and stored.
    CertificateIssued {
        request_id: RequestId,
        certificate_id: CertificateId,
    },
}

type SharedRecord = Arc<Mutex<RequestRecord>>;

/// Recover the guard from a poisoned lock; every mutation below leaves the
/// record consistent before it can panic.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(|e| e.into_inner())
}

/// The orchestrator ties together all verification subsystems.
pub struct VerificationOrchestrator {
    params: VerificationParams,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    requests: RwLock<HashMap<RequestId, SharedRecord>>,
    queues: Mutex<ValidatorQueues>,
    /// Latest submission per dedupe key: (request, submitted at).
    dedupe: Mutex<HashMap<DedupeKey, (RequestId, Timestamp)>>,
    next_request_id: AtomicU64,
    next_certificate_id: AtomicU64,
    pending_events: Mutex<Vec<VerificationEvent>>,
    stats: StatsCounter,
}

impl Default for VerificationOrchestrator {
    fn default() -> Self {
        Self::new(
            VerificationParams::default(),
            RetryPolicy::default(),
            Arc::new(SystemClock),
        )
    }
}

impl VerificationOrchestrator {
    pub fn new(params: VerificationParams, retry: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            params,
            retry,
            clock,
            requests: RwLock::new(HashMap::new()),
            queues: Mutex::new(ValidatorQueues::new()),
            dedupe: Mutex::new(HashMap::new()),
            next_request_id: AtomicU64::new(1),
            next_certificate_id: AtomicU64::new(1),
            pending_events: Mutex::new(Vec::new()),
            stats: StatsCounter::new(STAT_NAMES),
        }
    }

    pub fn params(&self) -> &VerificationParams {
        &self.params
    }

    // ── Intake ─────────────────────────────────────────────────────────

    /// Validate and accept a request, fanning it out to its validators.
    ///
    /// A second submission with the same requester and (case-folded) title
    /// inside `dedupe_window_secs` fails with `DuplicateSubmission`.
    pub fn submit_request(&self, new: NewRequest) -> Result<RequestId, VerificationError> {
        let _span = submit_span(new.requester.as_str(), &new.title).entered();
        let now = self.clock.now();

        let key = DedupeKey::new(&new.requester, &new.title);
        let mut dedupe = lock(&self.dedupe);
        if let Some(&(existing, at)) = dedupe.get(&key) {
            if !at.has_expired(self.params.dedupe_window_secs, now) {
                self.stats.increment("requests_rejected");
                return Err(VerificationError::DuplicateSubmission(existing));
            }
        }

        // Validate against a provisional id; the counter only advances on success.
        let provisional = RequestId::new(self.next_request_id.load(Ordering::SeqCst));
        let request = match VerificationRequest::from_new(provisional, new, &self.params.quorum, now)
        {
            Ok(request) => request,
            Err(e) => {
                self.stats.increment("requests_rejected");
                debug!("request rejected: {e}");
                return Err(e);
            }
        };
        let id = RequestId::new(self.next_request_id.fetch_add(1, Ordering::SeqCst));
        let request = VerificationRequest { id, ..request };
        let validators: Vec<UserId> = request.chosen_validators.iter().cloned().collect();

        dedupe.insert(key, (id, now));
        write(&self.requests).insert(id, Arc::new(Mutex::new(RequestRecord::new(request))));
        lock(&self.queues).enqueue(id, &validators);
        drop(dedupe);

        info!(request = %id, validators = validators.len(), "verification request submitted");
        self.stats.increment("requests_submitted");
        self.push_event(VerificationEvent::RequestSubmitted {
            request_id: id,
            validators,
        });
        Ok(id)
    }

    // ── Validator queue ────────────────────────────────────────────────

    /// Requests still awaiting `validator`'s decision, newest first.
    pub fn list_pending(&self, validator: &UserId) -> Vec<VerificationRequest> {
        let ids = lock(&self.queues).entries(validator);
        let records: Vec<SharedRecord> = {
            let registry = read(&self.requests);
            ids.iter().filter_map(|id| registry.get(id).cloned()).collect()
        };

        let mut pending: Vec<VerificationRequest> = records
            .iter()
            .filter_map(|record| {
                let rec = lock(record);
                let awaiting = rec.state == VerificationState::Pending
                    && !rec.ledger.has_confirmed(validator);
                awaiting.then(|| rec.request.clone())
            })
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        pending
    }

    /// Append a validator decision and re-evaluate quorum under the same lock.
    ///
    /// A closed request is refused first; the ledger then checks membership,
    /// uniqueness, rating, and skills in that order.
    pub fn record_confirmation(
        &self,
        input: ConfirmationInput,
    ) -> Result<VerificationStatus, VerificationError> {
        let request_id = input.request_id;
        let _span = confirmation_span(&request_id.to_string(), input.validator.as_str()).entered();
        let record = self.record(request_id)?;
        let now = self.clock.now();

        let mut rec = lock(&record);
        if rec.state.is_terminal() {
            return Err(VerificationError::RequestClosed {
                request: request_id,
                state: rec.state,
            });
        }

        let validator = input.validator.clone();
        let decision = input.decision;
        let RequestRecord { request, ledger, .. } = &mut *rec;
        ledger.append(request, input, now)?;

        let evaluated = QuorumEvaluator::evaluate(&rec.request, &rec.ledger);
        let previous = rec.state;
        rec.state = previous.advance(evaluated.state);
        let status = VerificationStatus {
            state: rec.state,
            ..evaluated
        };
        drop(rec);

        debug!(%decision, approvals = status.current_count, "confirmation recorded");
        self.stats.increment("confirmations_recorded");
        self.push_event(VerificationEvent::ConfirmationRecorded {
            request_id,
            validator,
            decision,
        });

        if previous != status.state {
            match status.state {
                VerificationState::Verified => {
                    info!(request = %request_id, approvals = status.current_count, "request verified");
                    self.stats.increment("requests_verified");
                    self.push_event(VerificationEvent::RequestVerified {
                        request_id,
                        approvals: status.current_count,
                        required: status.required_count,
                    });
                }
                VerificationState::Disputed => {
                    info!(request = %request_id, rejections = status.reject_count, "request disputed");
                    self.stats.increment("requests_disputed");
                    self.push_event(VerificationEvent::RequestDisputed {
                        request_id,
                        rejections: status.reject_count,
                    });
                }
                VerificationState::Pending => {}
            }
        }

        Ok(status)
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// Current status of a request. The state is the stored one; only the
    /// counts are derived from the ledger.
    pub fn status(&self, request_id: RequestId) -> Result<VerificationStatus, VerificationError> {
        let record = self.record(request_id)?;
        let rec = lock(&record);
        Ok(VerificationStatus {
            state: rec.state,
            ..QuorumEvaluator::evaluate(&rec.request, &rec.ledger)
        })
    }

    pub fn request(&self, request_id: RequestId) -> Result<VerificationRequest, VerificationError> {
        let record = self.record(request_id)?;
        let rec = lock(&record);
        Ok(rec.request.clone())
    }

    pub fn confirmations(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<Confirmation>, VerificationError> {
        let record = self.record(request_id)?;
        let rec = lock(&record);
        Ok(rec.ledger.entries().to_vec())
    }

    /// The issued certificate for a request, if any.
    pub fn certificate(
        &self,
        request_id: RequestId,
    ) -> Result<Option<Certificate>, VerificationError> {
        let record = self.record(request_id)?;
        let rec = lock(&record);
        Ok(rec.certificate().cloned())
    }

    /// All requests opened by `requester`, oldest first.
    pub fn requests_by(&self, requester: &UserId) -> Vec<VerificationRequest> {
        let records: Vec<SharedRecord> = read(&self.requests).values().cloned().collect();
        let mut out: Vec<VerificationRequest> = records
            .iter()
            .filter_map(|r| {
                let rec = lock(r);
                (&rec.request.requester == requester).then(|| rec.request.clone())
            })
            .collect();
        out.sort_by_key(|r| r.id);
        out
    }

    // ── Certificates ───────────────────────────────────────────────────

    /// Issue the certificate for a verified request, attesting it through
    /// `attestor`.
    ///
    /// At most one certificate is ever issued per request: concurrent callers
    /// that lose the race get `AlreadyIssued`. If attestation fails the
    /// reservation is released and the request stays verified. A transient
    /// failure surfaces as `AttestationUnavailable` and may be retried; a
    /// permanent one as `AttestationRejected`.
    pub async fn issue_certificate<A: Attestor>(
        &self,
        request_id: RequestId,
        attestor: &A,
    ) -> Result<Certificate, VerificationError> {
        let record = self.record(request_id)?;
        let body = {
            let mut rec = lock(&record);
            CertificateIssuer::begin(&mut rec, self.clock.now())?
        };
        let mut reservation = Reservation::new(Arc::clone(&record));

        let content = body.canonical_bytes()?;
        let attested = attest_with_retry(attestor, &content, &self.retry)
            .instrument(issuance_span(&request_id.to_string()))
            .await;

        let attestation = match attested {
            Ok(attestation) => attestation,
            Err(e) => {
                warn!(request = %request_id, attestor = attestor.name(), "attestation failed: {e}");
                self.stats.increment("attestation_failures");
                return Err(e.into());
            }
        };

        let certificate_id =
            CertificateId::new(self.next_certificate_id.fetch_add(1, Ordering::SeqCst));
        let certificate = {
            let mut rec = lock(&record);
            CertificateIssuer::complete(&mut rec, certificate_id, body, attestation)
        };
        reservation.disarm();

        info!(
            request = %request_id,
            certificate = %certificate_id,
            proof = certificate.proof_hash(),
            "certificate issued"
        );
        self.stats.increment("certificates_issued");
        self.push_event(VerificationEvent::CertificateIssued {
            request_id,
            certificate_id,
        });
        Ok(certificate)
    }

    /// Ask the attestor whether a certificate's proof is known.
    pub async fn verify_certificate<A: Attestor>(
        &self,
        certificate: &Certificate,
        attestor: &A,
    ) -> Result<bool, VerificationError> {
        match tokio::time::timeout(self.retry.timeout, attestor.verify(certificate.proof_hash()))
            .await
        {
            Ok(Ok(valid)) => Ok(valid),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(VerificationError::AttestationUnavailable(format!(
                "verification timed out after {} ms",
                self.retry.timeout.as_millis()
            ))),
        }
    }

    // ── Events, stats, persistence ─────────────────────────────────────

    /// Drain pending events for the front end to process.
    pub fn drain_events(&self) -> Vec<VerificationEvent> {
        std::mem::take(&mut *lock(&self.pending_events))
    }

    pub fn stats(&self) -> BTreeMap<&'static str, u64> {
        self.stats.snapshot()
    }

    /// Serialize every request, ledger, and issued certificate.
    pub fn snapshot(&self) -> OrchestratorSnapshot {
        let records: Vec<SharedRecord> = read(&self.requests).values().cloned().collect();
        let mut snapshots: Vec<RecordSnapshot> =
            records.iter().map(|r| lock(r).to_snapshot()).collect();
        snapshots.sort_by_key(|s| s.request.id);
        OrchestratorSnapshot {
            records: snapshots,
            next_request_id: self.next_request_id.load(Ordering::SeqCst),
            next_certificate_id: self.next_certificate_id.load(Ordering::SeqCst),
        }
    }

    /// Rebuild an orchestrator from a snapshot, re-deriving queues and the
    /// dedupe index.
    pub fn restore(
        snapshot: OrchestratorSnapshot,
        params: VerificationParams,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let orchestrator = Self::new(params, retry, clock);
        let mut max_request = 0;
        let mut max_certificate = 0;
        {
            let mut registry = write(&orchestrator.requests);
            let mut queues = lock(&orchestrator.queues);
            let mut dedupe = lock(&orchestrator.dedupe);
            for snap in snapshot.records {
                let record = RequestRecord::from_snapshot(snap);
                let id = record.request.id;
                max_request = max_request.max(id.as_u64());
                if let Some(cert) = record.certificate() {
                    max_certificate = max_certificate.max(cert.id.as_u64());
                }
                queues.enqueue(id, &record.request.chosen_validators);
                let key = record.request.dedupe_key();
                let created = record.request.created_at;
                let newer = dedupe.get(&key).map_or(true, |&(_, at)| at <= created);
                if newer {
                    dedupe.insert(key, (id, created));
                }
                registry.insert(id, Arc::new(Mutex::new(record)));
            }
        }
        orchestrator
            .next_request_id
            .store(snapshot.next_request_id.max(max_request + 1), Ordering::SeqCst);
        orchestrator.next_certificate_id.store(
            snapshot.next_certificate_id.max(max_certificate + 1),
            Ordering::SeqCst,
        );
        orchestrator
    }

    fn record(&self, request_id: RequestId) -> Result<SharedRecord, VerificationError> {
        read(&self.requests)
            .get(&request_id)
            .cloned()
            .ok_or(VerificationError::UnknownRequest(request_id))
    }

    fn push_event(&self, event: VerificationEvent) {
        lock(&self.pending_events).push(event);
    }
}

/// Serializable snapshot of orchestrator state for persistence across restarts.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OrchestratorSnapshot {
    pub records: Vec<RecordSnapshot>,
    pub next_request_id: u64,
    pub next_certificate_id: u64,
}

/// Releases an in-flight issuance if the issuing future fails or is dropped
/// before completing.
struct Reservation {
    record: SharedRecord,
    armed: bool,
}

impl Reservation {
    fn new(record: SharedRecord) -> Self {
        Self {
            record,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed {
            CertificateIssuer::abandon(&mut lock(&self.record));
        }
    }
}
