use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::candidacy::{eligible_election_years, reconcile_declared_year, CandidacyEligibility};
use super::domain::{AffiliationRecord, FormStep, ModerationStatus, RecordField, RecordId};
use super::repository::{
    AffiliationNotification, AffiliationRepository, BiometricError, BiometricVerifier,
    NotificationPublisher, RepositoryError, SubmissionReceipt,
};
use super::validation::{StepFailure, StepValidator, ValidationErrors};
use super::validators::{is_valid_document_number, normalize_document_number};

/// Screen the applicant (or reviewer) is currently on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "detail", rename_all = "snake_case")]
pub enum View {
    Home,
    UpdateAuth,
    MemberPanel,
    Form(FormStep),
    Success,
    Admin(AdminView),
}

impl View {
    pub const fn name(&self) -> &'static str {
        match self {
            View::Home => "home",
            View::UpdateAuth => "update_auth",
            View::MemberPanel => "member_panel",
            View::Form(_) => "form",
            View::Success => "success",
            View::Admin(_) => "admin",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Form(step) => write!(f, "form {step}"),
            View::Admin(screen) => write!(f, "admin {}", screen.name()),
            other => f.write_str(other.name()),
        }
    }
}

/// Sub-screens of the reviewer area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", content = "record_id", rename_all = "snake_case")]
pub enum AdminView {
    Login,
    List,
    Detail(RecordId),
}

impl AdminView {
    pub const fn name(&self) -> &'static str {
        match self {
            AdminView::Login => "login",
            AdminView::List => "list",
            AdminView::Detail(_) => "detail",
        }
    }
}

/// External call currently suspending the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingCall {
    Lookup,
    Biometric,
    Submission,
    Decision,
}

impl fmt::Display for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PendingCall::Lookup => "record lookup",
            PendingCall::Biometric => "biometric check",
            PendingCall::Submission => "submission",
            PendingCall::Decision => "moderation decision",
        };
        f.write_str(label)
    }
}

/// Observable workflow position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowState {
    pub view: View,
    pub current_step: Option<FormStep>,
    pub update_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthOutcome {
    Authenticated,
    InvalidDocument,
    NotFound,
    BiometricRejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    Moved(FormStep),
    ReturnedToPanel,
    Submitted(SubmissionReceipt),
    Blocked(StepFailure),
}

/// Errors that leave the session exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("cannot {operation} from the {view} view")]
    InvalidTransition {
        operation: &'static str,
        view: &'static str,
    },
    #[error("{0} already in flight")]
    Busy(PendingCall),
    #[error("{0} cannot be changed while updating an existing membership")]
    LockedField(RecordField),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Biometric(#[from] BiometricError),
}

/// One applicant's pass through the enrollment or update flow.
pub struct AffiliationSession<R, B, N> {
    repository: Arc<R>,
    biometrics: Arc<B>,
    notifier: Arc<N>,
    validator: StepValidator,
    view: View,
    record: AffiliationRecord,
    errors: ValidationErrors,
    update_mode: bool,
    in_flight: Option<PendingCall>,
    success_message: Option<String>,
}

impl<R, B, N> AffiliationSession<R, B, N>
where
    R: AffiliationRepository + 'static,
    B: BiometricVerifier + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        biometrics: Arc<B>,
        notifier: Arc<N>,
        validator: StepValidator,
    ) -> Self {
        Self {
            repository,
            biometrics,
            notifier,
            validator,
            view: View::Home,
            record: AffiliationRecord::default(),
            errors: ValidationErrors::new(),
            update_mode: false,
            in_flight: None,
            success_message: None,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn state(&self) -> WorkflowState {
        WorkflowState {
            view: self.view.clone(),
            current_step: self.current_step(),
            update_mode: self.update_mode,
        }
    }

    pub fn current_step(&self) -> Option<FormStep> {
        match self.view {
            View::Form(step) => Some(step),
            _ => None,
        }
    }

    pub fn record(&self) -> &AffiliationRecord {
        &self.record
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn is_update_mode(&self) -> bool {
        self.update_mode
    }

    /// Set while a collaborator call is outstanding. Exclusive borrowing rules
    /// out re-entry during the call itself, so the flag is only observed after
    /// a collaborator unwinds; the session then refuses work until
    /// [`Self::exit_to_home`].
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<PendingCall> {
        self.in_flight
    }

    pub fn success_message(&self) -> Option<&str> {
        self.success_message.as_deref()
    }

    /// Election years selectable for the record's current candidacy.
    pub fn candidacy_eligibility(&self) -> CandidacyEligibility {
        let office = if self.record.is_candidate {
            self.record.political_office
        } else {
            None
        };
        CandidacyEligibility::compute(office, self.validator.clock().today())
    }

    pub fn start_enrollment(&mut self) -> Result<(), WorkflowError> {
        self.ensure_idle()?;
        if self.view != View::Home {
            return Err(self.invalid("start an enrollment"));
        }

        self.record = AffiliationRecord::default();
        self.errors = ValidationErrors::new();
        self.update_mode = false;
        self.success_message = None;
        self.view = View::Form(FormStep::Personal);
        Ok(())
    }

    pub fn start_update(&mut self) -> Result<(), WorkflowError> {
        self.ensure_idle()?;
        if self.view != View::Home {
            return Err(self.invalid("start an update"));
        }

        self.view = View::UpdateAuth;
        Ok(())
    }

    /// Locate an existing member by document number and open the member panel.
    pub fn authenticate(&mut self, document_number: &str) -> Result<AuthOutcome, WorkflowError> {
        self.sign_in_member(document_number, false)
    }

    /// Same as [`Self::authenticate`], then gate on the biometric check.
    pub fn authenticate_with_biometrics(
        &mut self,
        document_number: &str,
    ) -> Result<AuthOutcome, WorkflowError> {
        self.sign_in_member(document_number, true)
    }

    fn sign_in_member(
        &mut self,
        document_number: &str,
        biometric: bool,
    ) -> Result<AuthOutcome, WorkflowError> {
        self.ensure_idle()?;
        if self.view != View::UpdateAuth {
            return Err(self.invalid("authenticate"));
        }

        let normalized = match normalize_document_number(document_number) {
            Some(digits) if is_valid_document_number(&digits) => digits,
            _ => {
                debug!("update sign-in refused: malformed document number");
                return Ok(AuthOutcome::InvalidDocument);
            }
        };

        self.in_flight = Some(PendingCall::Lookup);
        let lookup = self.repository.find_by_document(&normalized);
        self.in_flight = None;

        let Some(found) = lookup? else {
            info!("no member found for the supplied document number");
            return Ok(AuthOutcome::NotFound);
        };

        if biometric {
            self.in_flight = Some(PendingCall::Biometric);
            let verified = self.biometrics.verify(&normalized);
            self.in_flight = None;

            if !verified? {
                warn!(record_id = ?found.id, "biometric check rejected member sign-in");
                return Ok(AuthOutcome::BiometricRejected);
            }
        }

        info!(record_id = ?found.id, biometric, "member authenticated for update");
        self.record = found;
        self.errors = ValidationErrors::new();
        self.update_mode = true;
        self.success_message = None;
        self.view = View::MemberPanel;
        Ok(AuthOutcome::Authenticated)
    }

    /// Apply a change set to the record while a form step is open.
    ///
    /// Returns the fields that changed; their error entries are cleared.
    pub fn edit<F>(&mut self, apply: F) -> Result<Vec<RecordField>, WorkflowError>
    where
        F: FnOnce(&mut AffiliationRecord),
    {
        self.ensure_idle()?;
        if !matches!(self.view, View::Form(_)) {
            return Err(self.invalid("edit the record"));
        }

        let mut draft = self.record.clone();
        apply(&mut draft);
        draft.id = self.record.id.clone();
        draft.status = self.record.status;
        self.sync_candidacy(&mut draft);

        let changed = self.record.changed_fields(&draft);
        if self.update_mode {
            if let Some(locked) = changed.iter().copied().find(|field| field.is_identity_locked()) {
                return Err(WorkflowError::LockedField(locked));
            }
        }

        self.errors.clear_fields(changed.iter().copied());
        self.record = draft;
        Ok(changed)
    }

    fn sync_candidacy(&self, draft: &mut AffiliationRecord) {
        if !draft.is_candidate {
            draft.clear_candidacy();
            return;
        }

        let office_changed = draft.political_office != self.record.political_office;
        let flag_changed = draft.is_candidate != self.record.is_candidate;
        if office_changed || flag_changed {
            let years =
                eligible_election_years(draft.political_office, self.validator.clock().today());
            draft.election_year = reconcile_declared_year(draft.election_year, &years);
        }
    }

    pub fn edit_section(&mut self, step: FormStep) -> Result<(), WorkflowError> {
        self.ensure_idle()?;
        if self.view != View::MemberPanel {
            return Err(self.invalid("edit a section"));
        }

        self.view = View::Form(step);
        Ok(())
    }

    /// Validate the open step and move on when it passes.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, WorkflowError> {
        self.ensure_idle()?;
        let View::Form(step) = self.view else {
            return Err(self.invalid("advance"));
        };

        let report = self.validator.validate(&self.record, step, self.update_mode);
        let mut errors = self.errors.clone();
        errors.merge_step(step, &report.errors);

        if let Some(failure) = report.failure() {
            debug!(step = step.index(), %failure, "step blocked");
            self.errors = errors;
            return Ok(AdvanceOutcome::Blocked(failure));
        }

        if self.update_mode {
            self.errors = errors;
            self.view = View::MemberPanel;
            return Ok(AdvanceOutcome::ReturnedToPanel);
        }

        match step.next() {
            Some(next) => {
                self.errors = errors;
                self.view = View::Form(next);
                Ok(AdvanceOutcome::Moved(next))
            }
            None => {
                let receipt = self.submit_enrollment()?;
                self.errors = errors;
                Ok(AdvanceOutcome::Submitted(receipt))
            }
        }
    }

    fn submit_enrollment(&mut self) -> Result<SubmissionReceipt, WorkflowError> {
        let submission = self.record.without_metadata();

        self.in_flight = Some(PendingCall::Submission);
        let result = self.repository.submit_new(submission);
        self.in_flight = None;
        let receipt = result?;

        info!(record_id = ?receipt.record_id, "enrollment submitted for moderation");
        self.record.id = receipt.record_id.clone();
        self.record.status = Some(ModerationStatus::Pending);
        self.success_message = Some(receipt.message.clone());
        self.view = View::Success;

        let notification = AffiliationNotification::welcome(&self.record);
        if let Err(err) = self.notifier.publish(notification) {
            warn!(error = %err, "welcome notification was not delivered");
        }

        Ok(receipt)
    }

    pub fn retreat(&mut self) -> Result<(), WorkflowError> {
        self.ensure_idle()?;
        let View::Form(step) = self.view else {
            return Err(self.invalid("go back"));
        };

        self.view = if self.update_mode {
            View::MemberPanel
        } else {
            match step.previous() {
                Some(previous) => View::Form(previous),
                None => View::Home,
            }
        };
        Ok(())
    }

    /// Send the edited membership back through moderation.
    pub fn submit_for_review(&mut self) -> Result<SubmissionReceipt, WorkflowError> {
        self.ensure_idle()?;
        if !self.update_mode || self.view != View::MemberPanel {
            return Err(self.invalid("submit for review"));
        }

        self.in_flight = Some(PendingCall::Submission);
        let result = self.repository.submit_update(self.record.clone());
        self.in_flight = None;
        let receipt = result?;

        info!(record_id = ?self.record.id, "membership update submitted for review");
        self.success_message = Some(receipt.message.clone());
        self.view = View::Success;
        Ok(receipt)
    }

    /// Return to the landing screen from anywhere. The record is kept.
    pub fn exit_to_home(&mut self) {
        self.in_flight = None;
        self.view = View::Home;
    }

    /// Enter the reviewer area; already-authorized reviewers skip the login screen.
    pub fn open_admin(&mut self, reviewer_authorized: bool) -> Result<(), WorkflowError> {
        self.ensure_idle()?;
        if self.view != View::Home {
            return Err(self.invalid("open the admin area"));
        }

        self.view = View::Admin(if reviewer_authorized {
            AdminView::List
        } else {
            AdminView::Login
        });
        Ok(())
    }

    pub fn admin_signed_in(&mut self) -> Result<(), WorkflowError> {
        if self.view != View::Admin(AdminView::Login) {
            return Err(self.invalid("complete admin sign-in"));
        }

        self.view = View::Admin(AdminView::List);
        Ok(())
    }

    pub fn admin_open_detail(&mut self, id: RecordId) -> Result<(), WorkflowError> {
        if !matches!(
            self.view,
            View::Admin(AdminView::List) | View::Admin(AdminView::Detail(_))
        ) {
            return Err(self.invalid("open a pending record"));
        }

        self.view = View::Admin(AdminView::Detail(id));
        Ok(())
    }

    pub fn admin_close_detail(&mut self) -> Result<(), WorkflowError> {
        if !matches!(self.view, View::Admin(AdminView::Detail(_))) {
            return Err(self.invalid("close a pending record"));
        }

        self.view = View::Admin(AdminView::List);
        Ok(())
    }

    pub fn admin_sign_out(&mut self) -> Result<(), WorkflowError> {
        if !matches!(self.view, View::Admin(_)) {
            return Err(self.invalid("sign out of the admin area"));
        }

        self.view = View::Home;
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), WorkflowError> {
        match self.in_flight {
            Some(call) => Err(WorkflowError::Busy(call)),
            None => Ok(()),
        }
    }

    fn invalid(&self, operation: &'static str) -> WorkflowError {
        WorkflowError::InvalidTransition {
            operation,
            view: self.view.name(),
        }
    }
}
