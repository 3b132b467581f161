use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{AffiliationRecord, ModerationDecision, RecordId};

/// Backing store for member records and the moderation queue.
pub trait AffiliationRepository: Send + Sync {
    fn find_by_document(
        &self,
        document_number: &str,
    ) -> Result<Option<AffiliationRecord>, RepositoryError>;
    fn submit_new(&self, record: AffiliationRecord) -> Result<SubmissionReceipt, RepositoryError>;
    fn submit_update(&self, record: AffiliationRecord)
        -> Result<SubmissionReceipt, RepositoryError>;
    fn pending(&self) -> Result<Vec<AffiliationRecord>, RepositoryError>;
    fn decide(&self, id: &RecordId, decision: &ModerationDecision) -> Result<(), RepositoryError>;
}

/// Acknowledgement returned when the store accepts a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    pub message: String,
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Opaque pass/fail biometric gate run after a member has been located.
pub trait BiometricVerifier: Send + Sync {
    fn verify(&self, document_number: &str) -> Result<bool, BiometricError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BiometricError {
    #[error("biometric service unavailable: {0}")]
    Unavailable(String),
}

/// Reviewer sign-in details forwarded to the authorization capability.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// External capability deciding whether a reviewer may moderate.
pub trait AdminAuthorizer: Send + Sync {
    fn authorize(&self, credentials: &AdminCredentials) -> Result<bool, RepositoryError>;
}

/// Outbound messages such as the welcome e-mail sent after enrollment.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: AffiliationNotification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliationNotification {
    pub template: String,
    pub recipient: String,
    pub details: BTreeMap<String, String>,
}

impl AffiliationNotification {
    pub fn welcome(record: &AffiliationRecord) -> Self {
        let mut details = BTreeMap::new();
        details.insert("full_name".to_string(), record.full_name.clone());
        if let Some(id) = &record.id {
            details.insert("record_id".to_string(), id.0.clone());
        }
        Self {
            template: "affiliation_welcome".to_string(),
            recipient: record.email.clone(),
            details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
