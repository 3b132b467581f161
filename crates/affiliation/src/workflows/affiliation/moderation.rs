use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{AffiliationRecord, ModerationDecision, ModerationStatus, RecordId};
use super::repository::{AdminAuthorizer, AdminCredentials, AffiliationRepository, RepositoryError};
use super::session::PendingCall;
use super::validators::format_document_number;

/// Summary of a queue entry for reviewer listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntryView {
    pub record_id: RecordId,
    pub full_name: String,
    pub document_number: String,
    pub email: String,
    pub city: String,
    pub address_state: String,
    pub status: &'static str,
}

impl QueueEntryView {
    pub fn from_record(record: &AffiliationRecord) -> Option<Self> {
        Some(Self {
            record_id: record.id.clone()?,
            full_name: record.full_name.clone(),
            document_number: format_document_number(&record.document_number),
            email: record.email.clone(),
            city: record.city.clone(),
            address_state: record.address_state.clone(),
            status: record.status.unwrap_or(ModerationStatus::Pending).label(),
        })
    }
}

/// Reviewer-side view of the moderation queue.
///
/// Entries leave the local queue once a decision is persisted; they are not re-fetched.
pub struct ModerationDesk<R> {
    repository: Arc<R>,
    queue: Vec<AffiliationRecord>,
    selected: Option<RecordId>,
    authorized: bool,
    in_flight: Option<PendingCall>,
}

/// Failures surfaced by the desk. The queue is untouched whenever one is returned.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("reviewer is not signed in")]
    Unauthorized,
    #[error("{0} already in flight")]
    Busy(PendingCall),
    #[error("record {0} is not awaiting moderation")]
    NotPending(RecordId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl<R> ModerationDesk<R>
where
    R: AffiliationRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            queue: Vec::new(),
            selected: None,
            authorized: false,
            in_flight: None,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// Exclusive borrowing already rules out re-entry while a store call runs.
    /// The marker stays set only when that call unwinds, and the desk then
    /// refuses further work until [`Self::sign_out`].
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_queued(&self, id: &RecordId) -> bool {
        self.position_of(id).is_ok()
    }

    pub fn queue(&self) -> &[AffiliationRecord] {
        &self.queue
    }

    pub fn selected(&self) -> Option<&AffiliationRecord> {
        let id = self.selected.as_ref()?;
        self.queue.iter().find(|entry| entry.id.as_ref() == Some(id))
    }

    /// Ask the authorization capability whether these credentials may moderate.
    pub fn sign_in<A>(
        &mut self,
        authorizer: &A,
        credentials: &AdminCredentials,
    ) -> Result<bool, ModerationError>
    where
        A: AdminAuthorizer + ?Sized,
    {
        self.ensure_idle()?;
        let granted = authorizer.authorize(credentials)?;
        if granted {
            info!("reviewer signed in");
        } else {
            warn!("reviewer sign-in refused");
        }
        self.authorized = granted;
        Ok(granted)
    }

    pub fn sign_out(&mut self) {
        self.authorized = false;
        self.queue.clear();
        self.selected = None;
        self.in_flight = None;
    }

    /// Reload the pending queue from the store.
    pub fn refresh(&mut self) -> Result<&[AffiliationRecord], ModerationError> {
        self.ensure_authorized()?;
        self.ensure_idle()?;

        self.in_flight = Some(PendingCall::Lookup);
        let fetched = self.repository.pending();
        self.in_flight = None;

        let queue: Vec<AffiliationRecord> = fetched?
            .into_iter()
            .filter(|record| {
                let ready = record.id.is_some() && record.status == Some(ModerationStatus::Pending);
                if !ready {
                    warn!(
                        record_id = ?record.id,
                        status = ?record.status,
                        "skipping non-pending queue entry"
                    );
                }
                ready
            })
            .collect();

        info!(pending = queue.len(), "moderation queue refreshed");
        let selection_survives = self.selected.as_ref().is_some_and(|selected| {
            queue
                .iter()
                .any(|entry| entry.id.as_ref() == Some(selected))
        });
        if !selection_survives {
            self.selected = None;
        }
        self.queue = queue;
        Ok(&self.queue)
    }

    pub fn select(&mut self, id: &RecordId) -> Result<&AffiliationRecord, ModerationError> {
        self.ensure_authorized()?;
        let position = self.position_of(id)?;
        self.selected = Some(id.clone());
        Ok(&self.queue[position])
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Resolve a pending entry. Approved and rejected are terminal.
    pub fn decide(
        &mut self,
        id: &RecordId,
        decision: ModerationDecision,
    ) -> Result<ModerationStatus, ModerationError> {
        self.ensure_authorized()?;
        self.ensure_idle()?;
        let position = self.position_of(id)?;

        self.in_flight = Some(PendingCall::Decision);
        let persisted = self.repository.decide(id, &decision);
        self.in_flight = None;

        if let Err(err) = persisted {
            warn!(record_id = %id, error = %err, "moderation decision not persisted");
            return Err(err.into());
        }

        let status = decision.outcome.status();
        self.queue.remove(position);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        info!(record_id = %id, status = status.label(), "moderation decision recorded");
        Ok(status)
    }

    fn position_of(&self, id: &RecordId) -> Result<usize, ModerationError> {
        self.queue
            .iter()
            .position(|entry| entry.id.as_ref() == Some(id))
            .ok_or_else(|| ModerationError::NotPending(id.clone()))
    }

    fn ensure_authorized(&self) -> Result<(), ModerationError> {
        if self.authorized {
            Ok(())
        } else {
            Err(ModerationError::Unauthorized)
        }
    }

    fn ensure_idle(&self) -> Result<(), ModerationError> {
        match self.in_flight {
            Some(call) => Err(ModerationError::Busy(call)),
            None => Ok(()),
        }
    }
}
