use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use affiliation::workflows::affiliation::{
    AdminAuthorizer, AdminCredentials, AffiliationNotification, AffiliationRecord,
    AffiliationRepository, BiometricError, BiometricVerifier, EvidenceDescriptor, FormStep,
    ModerationDecision, ModerationStatus, NotificationError, NotificationPublisher, RecordId,
    RepositoryError, SubmissionReceipt,
};
use affiliation::workflows::affiliation::validators::normalize_document_number;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreState {
    records: Vec<AffiliationRecord>,
    issued: u64,
}

/// Process-local affiliation store keyed by normalized document number.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAffiliationStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryAffiliationStore {
    /// Store pre-loaded with an approved member and two entries awaiting review.
    pub(crate) fn seeded() -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            for (record, status) in sample_records() {
                state.issued += 1;
                let id = RecordId(format!("aff-{:05}", state.issued));
                state.records.push(AffiliationRecord {
                    id: Some(id),
                    status: Some(status),
                    ..record
                });
            }
        }
        store
    }

    pub(crate) fn records(&self) -> Result<Vec<AffiliationRecord>, RepositoryError> {
        Ok(self.lock()?.records.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }
}

fn document_key(raw: &str) -> String {
    normalize_document_number(raw).unwrap_or_else(|| raw.trim().to_string())
}

impl AffiliationRepository for InMemoryAffiliationStore {
    fn find_by_document(
        &self,
        document_number: &str,
    ) -> Result<Option<AffiliationRecord>, RepositoryError> {
        let wanted = document_key(document_number);
        let state = self.lock()?;
        Ok(state
            .records
            .iter()
            .find(|record| document_key(&record.document_number) == wanted)
            .cloned())
    }

    fn submit_new(&self, record: AffiliationRecord) -> Result<SubmissionReceipt, RepositoryError> {
        let key = document_key(&record.document_number);
        let mut state = self.lock()?;
        if state
            .records
            .iter()
            .any(|existing| document_key(&existing.document_number) == key)
        {
            return Err(RepositoryError::Conflict);
        }

        state.issued += 1;
        let id = RecordId(format!("aff-{:05}", state.issued));
        state.records.push(AffiliationRecord {
            id: Some(id.clone()),
            status: Some(ModerationStatus::Pending),
            ..record
        });
        info!(record_id = %id, "affiliation stored for moderation");

        Ok(SubmissionReceipt {
            record_id: Some(id),
            message: "Your affiliation request was received and is awaiting review.".to_string(),
        })
    }

    fn submit_update(
        &self,
        record: AffiliationRecord,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        let mut state = self.lock()?;
        let stored = state
            .records
            .iter_mut()
            .find(|existing| existing.id.is_some() && existing.id == record.id)
            .ok_or(RepositoryError::NotFound)?;

        *stored = AffiliationRecord {
            status: Some(ModerationStatus::Pending),
            ..record
        };
        Ok(SubmissionReceipt {
            record_id: stored.id.clone(),
            message: "Your membership update was received and is awaiting review.".to_string(),
        })
    }

    fn pending(&self) -> Result<Vec<AffiliationRecord>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .records
            .iter()
            .filter(|record| record.status == Some(ModerationStatus::Pending))
            .cloned()
            .collect())
    }

    fn decide(&self, id: &RecordId, decision: &ModerationDecision) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let stored = state
            .records
            .iter_mut()
            .find(|record| record.id.as_ref() == Some(id))
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != Some(ModerationStatus::Pending) {
            return Err(RepositoryError::Conflict);
        }

        stored.status = Some(decision.outcome.status());
        info!(
            record_id = %id,
            status = decision.outcome.status().label(),
            reason = decision.reason.as_deref().unwrap_or(""),
            "moderation decision stored"
        );
        Ok(())
    }
}

/// Stand-in for the face-match service. Answers with a fixed verdict.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulatedBiometrics {
    pub(crate) accept: bool,
}

impl BiometricVerifier for SimulatedBiometrics {
    fn verify(&self, document_number: &str) -> Result<bool, BiometricError> {
        info!(
            document = %document_number.chars().take(3).collect::<String>(),
            accept = self.accept,
            "simulated biometric check"
        );
        Ok(self.accept)
    }
}

/// Publishes notifications to the log and keeps them for inspection.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    outbox: Arc<Mutex<Vec<AffiliationNotification>>>,
}

impl LoggingNotifier {
    pub(crate) fn sent(&self) -> Vec<AffiliationNotification> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

impl NotificationPublisher for LoggingNotifier {
    fn publish(&self, notification: AffiliationNotification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            recipient = %notification.recipient,
            "notification queued"
        );
        self.outbox
            .lock()
            .map_err(|_| NotificationError::Transport("outbox lock poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

/// Reviewer gate backed by a single configured credential pair.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConfiguredAdminAuthorizer {
    credentials: Option<AdminCredentials>,
}

impl ConfiguredAdminAuthorizer {
    pub(crate) fn new(credentials: Option<AdminCredentials>) -> Self {
        Self { credentials }
    }
}

impl AdminAuthorizer for ConfiguredAdminAuthorizer {
    fn authorize(&self, credentials: &AdminCredentials) -> Result<bool, RepositoryError> {
        Ok(self.credentials.as_ref().is_some_and(|expected| {
            expected.email.eq_ignore_ascii_case(credentials.email.trim())
                && expected.password == credentials.password
        }))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_step(raw: &str) -> Result<FormStep, String> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .and_then(FormStep::from_index)
        .ok_or_else(|| format!("'{raw}' is not a form step (expected 1 to 6)"))
}

pub(crate) fn evidence(name: &str) -> Option<EvidenceDescriptor> {
    Some(EvidenceDescriptor::new(
        format!("{name}.jpg"),
        format!("uploads/{name}.jpg"),
    ))
}

fn sample_records() -> Vec<(AffiliationRecord, ModerationStatus)> {
    let base = AffiliationRecord {
        birth_date: NaiveDate::from_ymd_opt(1979, 7, 3),
        phone: "(61) 3322-1100".to_string(),
        terms_accepted: true,
        statute_accepted: true,
        postal_code: "70040-010".to_string(),
        address_state: "DF".to_string(),
        city: "Brasília".to_string(),
        street: "SBS Quadra 2".to_string(),
        district: "Asa Sul".to_string(),
        house_number: "12".to_string(),
        electoral_state: "DF".to_string(),
        electoral_city: "Brasília".to_string(),
        interests: BTreeSet::from(["health".to_string()]),
        document_front: evidence("front"),
        document_back: evidence("back"),
        signature: evidence("signature"),
        selfie: evidence("selfie"),
        ..AffiliationRecord::default()
    };

    vec![
        (
            AffiliationRecord {
                full_name: "Roberto Carlos Nunes".to_string(),
                document_number: "39053344705".to_string(),
                email: "roberto.nunes@example.org".to_string(),
                voter_registration: "004356781234".to_string(),
                mother_name: "Teresa Nunes".to_string(),
                ..base.clone()
            },
            ModerationStatus::Approved,
        ),
        (
            AffiliationRecord {
                full_name: "Fernanda Lima Prado".to_string(),
                document_number: "98765432100".to_string(),
                email: "fernanda.prado@example.org".to_string(),
                voter_registration: "009812345678".to_string(),
                mother_name: "Cecilia Lima".to_string(),
                ..base.clone()
            },
            ModerationStatus::Pending,
        ),
        (
            AffiliationRecord {
                full_name: "Paulo Henrique Dias".to_string(),
                document_number: "12345678909".to_string(),
                email: "paulo.dias@example.org".to_string(),
                voter_registration: "007700112233".to_string(),
                mother_name: "Rosa Dias".to_string(),
                ..base
            },
            ModerationStatus::Pending,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(email: &str, password: &str) -> AdminCredentials {
        AdminCredentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn seeded_store_exposes_two_pending_entries() {
        let store = InMemoryAffiliationStore::seeded();
        let pending = store.pending().expect("pending");
        assert_eq!(pending.len(), 2);
        assert!(pending
            .iter()
            .all(|record| record.status == Some(ModerationStatus::Pending) && record.id.is_some()));
    }

    #[test]
    fn lookup_ignores_document_punctuation() {
        let store = InMemoryAffiliationStore::seeded();
        let found = store
            .find_by_document("390.533.447-05")
            .expect("lookup")
            .expect("seeded member");
        assert_eq!(found.full_name, "Roberto Carlos Nunes");
        assert!(store.find_by_document("11144477735").expect("lookup").is_none());
    }

    #[test]
    fn duplicate_documents_conflict() {
        let store = InMemoryAffiliationStore::seeded();
        let duplicate = AffiliationRecord {
            document_number: "987.654.321-00".to_string(),
            ..AffiliationRecord::default()
        };
        assert_eq!(store.submit_new(duplicate), Err(RepositoryError::Conflict));
    }

    #[test]
    fn decisions_are_final() {
        let store = InMemoryAffiliationStore::seeded();
        let id = store.pending().expect("pending")[0]
            .id
            .clone()
            .expect("seeded id");

        store
            .decide(&id, &ModerationDecision::approve())
            .expect("first decision");
        assert_eq!(
            store.decide(&id, &ModerationDecision::reject("late")),
            Err(RepositoryError::Conflict)
        );
        assert_eq!(store.pending().expect("pending").len(), 1);
    }

    #[test]
    fn updates_return_to_the_queue() {
        let store = InMemoryAffiliationStore::seeded();
        let mut member = store
            .find_by_document("39053344705")
            .expect("lookup")
            .expect("seeded member");
        member.city = "Taguatinga".to_string();

        let receipt = store.submit_update(member.clone()).expect("update");
        assert_eq!(receipt.record_id, member.id);
        assert_eq!(store.pending().expect("pending").len(), 3);

        let unknown = AffiliationRecord {
            id: Some(RecordId("aff-99999".to_string())),
            ..member
        };
        assert_eq!(store.submit_update(unknown), Err(RepositoryError::NotFound));
    }

    #[test]
    fn authorizer_without_credentials_refuses_everyone() {
        let closed = ConfiguredAdminAuthorizer::default();
        assert_eq!(closed.authorize(&credentials("a@b.org", "x")), Ok(false));

        let open = ConfiguredAdminAuthorizer::new(Some(credentials("desk@party.org", "pw")));
        assert_eq!(open.authorize(&credentials("DESK@party.org", "pw")), Ok(true));
        assert_eq!(open.authorize(&credentials("desk@party.org", "PW")), Ok(false));
    }

    #[test]
    fn step_parser_accepts_one_through_six() {
        assert_eq!(parse_step("3"), Ok(FormStep::Complementary));
        assert!(parse_step("0").is_err());
        assert!(parse_step("seven").is_err());
        assert!(parse_date("2026-08-15").is_ok());
        assert!(parse_date("15/08/2026").is_err());
    }

    #[test]
    fn notifier_keeps_what_it_sent() {
        let notifier = LoggingNotifier::default();
        let record = AffiliationRecord {
            full_name: "Fernanda Lima Prado".to_string(),
            email: "fernanda.prado@example.org".to_string(),
            ..AffiliationRecord::default()
        };
        notifier
            .publish(AffiliationNotification::welcome(&record))
            .expect("publish");
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "fernanda.prado@example.org");
    }
}
