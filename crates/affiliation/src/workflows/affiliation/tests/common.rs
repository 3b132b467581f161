use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::affiliation::domain::{
    AffiliationRecord, EvidenceDescriptor, ModerationDecision, ModerationStatus, RecordId,
};
use crate::workflows::affiliation::repository::{
    AdminAuthorizer, AdminCredentials, AffiliationNotification, AffiliationRepository,
    BiometricError, BiometricVerifier, NotificationError, NotificationPublisher, RepositoryError,
    SubmissionReceipt,
};
use crate::workflows::affiliation::{
    affiliation_router, AffiliationApi, AffiliationSession, FixedClock, StepValidator,
    ValidationConfig,
};

pub(super) const VALID_DOCUMENT: &str = "52998224725";
pub(super) const OTHER_VALID_DOCUMENT: &str = "12345678909";
pub(super) const THIRD_VALID_DOCUMENT: &str = "98765432100";
pub(super) const INVALID_DOCUMENT: &str = "12345678900";

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Reference date shared by the fixtures: before the declaration cutoff of a
/// non-election year.
pub(super) fn today() -> NaiveDate {
    date(2025, 3, 10)
}

pub(super) fn validator() -> StepValidator {
    validator_with(ValidationConfig::default())
}

pub(super) fn validator_with(config: ValidationConfig) -> StepValidator {
    StepValidator::new(config, Arc::new(FixedClock(today())))
}

pub(super) fn evidence(name: &str) -> EvidenceDescriptor {
    EvidenceDescriptor::new(
        format!("{name}.jpg"),
        format!("uploads/affiliations/{name}.jpg"),
    )
}

/// A record that passes every step as of [`today`].
pub(super) fn complete_record() -> AffiliationRecord {
    AffiliationRecord {
        full_name: "Maria da Silva Souza".to_string(),
        birth_date: Some(date(1990, 5, 20)),
        document_number: VALID_DOCUMENT.to_string(),
        phone: "(11) 98765-4321".to_string(),
        email: "maria.souza@example.org".to_string(),
        terms_accepted: true,
        statute_accepted: true,
        postal_code: "01310-100".to_string(),
        address_state: "SP".to_string(),
        city: "São Paulo".to_string(),
        street: "Avenida Paulista".to_string(),
        district: "Bela Vista".to_string(),
        house_number: "1578".to_string(),
        complement: "apto 42".to_string(),
        voter_registration: "123456789012".to_string(),
        electoral_state: "SP".to_string(),
        electoral_city: "São Paulo".to_string(),
        gender: "F".to_string(),
        mother_name: "Ana da Silva".to_string(),
        father_name: "José Souza".to_string(),
        is_volunteer: true,
        profession: "Teacher".to_string(),
        education_level: "Higher education".to_string(),
        interests: BTreeSet::from(["education".to_string(), "housing".to_string()]),
        document_front: Some(evidence("front")),
        document_back: Some(evidence("back")),
        signature: Some(evidence("signature")),
        selfie: Some(evidence("selfie")),
        ..AffiliationRecord::default()
    }
}

/// A stored member as the lookup returns it.
pub(super) fn member(id: &str, document_number: &str) -> AffiliationRecord {
    AffiliationRecord {
        id: Some(RecordId(id.to_string())),
        status: Some(ModerationStatus::Approved),
        document_number: document_number.to_string(),
        ..complete_record()
    }
}

pub(super) fn pending_entry(id: &str, full_name: &str, document_number: &str) -> AffiliationRecord {
    AffiliationRecord {
        id: Some(RecordId(id.to_string())),
        status: Some(ModerationStatus::Pending),
        full_name: full_name.to_string(),
        document_number: document_number.to_string(),
        ..complete_record()
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    members: Mutex<HashMap<String, AffiliationRecord>>,
    queue: Mutex<Vec<AffiliationRecord>>,
    submissions: Mutex<Vec<AffiliationRecord>>,
    updates: Mutex<Vec<AffiliationRecord>>,
    decisions: Mutex<Vec<(RecordId, ModerationDecision)>>,
    decision_failure: Mutex<Option<RepositoryError>>,
    crash_on_writes: Mutex<bool>,
}

impl MemoryRepository {
    pub(super) fn with_member(self, record: AffiliationRecord) -> Self {
        self.members
            .lock()
            .expect("repository mutex poisoned")
            .insert(record.document_number.clone(), record);
        self
    }

    pub(super) fn with_pending(self, record: AffiliationRecord) -> Self {
        self.queue
            .lock()
            .expect("repository mutex poisoned")
            .push(record);
        self
    }

    pub(super) fn fail_decisions(&self, error: RepositoryError) {
        *self
            .decision_failure
            .lock()
            .expect("repository mutex poisoned") = Some(error);
    }

    /// Make every later write panic, as a crashing store driver would.
    pub(super) fn crash_writes(&self) {
        *self.crash_on_writes.lock().expect("repository mutex poisoned") = true;
    }

    fn check_crash(&self) {
        let crash = *self.crash_on_writes.lock().expect("repository mutex poisoned");
        if crash {
            panic!("store driver crashed");
        }
    }

    pub(super) fn submissions(&self) -> Vec<AffiliationRecord> {
        self.submissions
            .lock()
            .expect("repository mutex poisoned")
            .clone()
    }

    pub(super) fn updates(&self) -> Vec<AffiliationRecord> {
        self.updates
            .lock()
            .expect("repository mutex poisoned")
            .clone()
    }

    pub(super) fn decisions(&self) -> Vec<(RecordId, ModerationDecision)> {
        self.decisions
            .lock()
            .expect("repository mutex poisoned")
            .clone()
    }
}

impl AffiliationRepository for MemoryRepository {
    fn find_by_document(
        &self,
        document_number: &str,
    ) -> Result<Option<AffiliationRecord>, RepositoryError> {
        let guard = self.members.lock().expect("repository mutex poisoned");
        Ok(guard.get(document_number).cloned())
    }

    fn submit_new(&self, record: AffiliationRecord) -> Result<SubmissionReceipt, RepositoryError> {
        let mut submissions = self.submissions.lock().expect("repository mutex poisoned");
        submissions.push(record.clone());
        let id = RecordId(format!("rec-{}", submissions.len()));

        self.queue
            .lock()
            .expect("repository mutex poisoned")
            .push(AffiliationRecord {
                id: Some(id.clone()),
                status: Some(ModerationStatus::Pending),
                ..record
            });

        Ok(SubmissionReceipt {
            record_id: Some(id),
            message: "Affiliation received and sent for review.".to_string(),
        })
    }

    fn submit_update(
        &self,
        record: AffiliationRecord,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        self.check_crash();
        let record_id = record.id.clone();
        self.updates
            .lock()
            .expect("repository mutex poisoned")
            .push(record);
        Ok(SubmissionReceipt {
            record_id,
            message: "Update sent for review.".to_string(),
        })
    }

    fn pending(&self) -> Result<Vec<AffiliationRecord>, RepositoryError> {
        Ok(self.queue.lock().expect("repository mutex poisoned").clone())
    }

    fn decide(&self, id: &RecordId, decision: &ModerationDecision) -> Result<(), RepositoryError> {
        self.check_crash();
        if let Some(error) = self
            .decision_failure
            .lock()
            .expect("repository mutex poisoned")
            .clone()
        {
            return Err(error);
        }

        let mut queue = self.queue.lock().expect("repository mutex poisoned");
        let position = queue
            .iter()
            .position(|entry| entry.id.as_ref() == Some(id))
            .ok_or(RepositoryError::NotFound)?;
        queue.remove(position);
        self.decisions
            .lock()
            .expect("repository mutex poisoned")
            .push((id.clone(), decision.clone()));
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl AffiliationRepository for UnavailableRepository {
    fn find_by_document(
        &self,
        _document_number: &str,
    ) -> Result<Option<AffiliationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn submit_new(&self, _record: AffiliationRecord) -> Result<SubmissionReceipt, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn submit_update(
        &self,
        _record: AffiliationRecord,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn pending(&self) -> Result<Vec<AffiliationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn decide(
        &self,
        _id: &RecordId,
        _decision: &ModerationDecision,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Biometric gate with a fixed answer, or offline when `None`.
pub(super) struct ScriptedBiometrics(pub(super) Option<bool>);

impl BiometricVerifier for ScriptedBiometrics {
    fn verify(&self, _document_number: &str) -> Result<bool, BiometricError> {
        self.0
            .ok_or_else(|| BiometricError::Unavailable("camera service offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<AffiliationNotification>>,
    offline: bool,
}

impl MemoryNotifier {
    pub(super) fn offline() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            offline: true,
        }
    }

    pub(super) fn events(&self) -> Vec<AffiliationNotification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, notification: AffiliationNotification) -> Result<(), NotificationError> {
        if self.offline {
            return Err(NotificationError::Transport("smtp relay down".to_string()));
        }
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct StaticAuthorizer(pub(super) AdminCredentials);

impl AdminAuthorizer for StaticAuthorizer {
    fn authorize(&self, credentials: &AdminCredentials) -> Result<bool, RepositoryError> {
        Ok(credentials == &self.0)
    }
}

pub(super) fn reviewer() -> AdminCredentials {
    AdminCredentials {
        email: "reviewer@party.org".to_string(),
        password: "correct horse".to_string(),
    }
}

pub(super) type MemorySession = AffiliationSession<MemoryRepository, ScriptedBiometrics, MemoryNotifier>;

pub(super) fn build_session(
    repository: MemoryRepository,
) -> (MemorySession, Arc<MemoryRepository>, Arc<MemoryNotifier>) {
    let repository = Arc::new(repository);
    let notifier = Arc::new(MemoryNotifier::default());
    let session = AffiliationSession::new(
        repository.clone(),
        Arc::new(ScriptedBiometrics(Some(true))),
        notifier.clone(),
        validator(),
    );
    (session, repository, notifier)
}

pub(super) fn build_router(repository: MemoryRepository) -> (axum::Router, Arc<MemoryRepository>) {
    let repository = Arc::new(repository);
    let api = AffiliationApi::new(
        repository.clone(),
        Arc::new(StaticAuthorizer(reviewer())),
        validator(),
    );
    (affiliation_router(Arc::new(api)), repository)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
