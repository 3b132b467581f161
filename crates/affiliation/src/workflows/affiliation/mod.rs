//! Guided affiliation enrollment: field validators, candidacy eligibility,
//! per-step validation, the applicant workflow, and reviewer moderation.

pub mod candidacy;
pub mod clock;
pub mod domain;
pub mod moderation;
pub mod repository;
pub mod router;
pub mod session;
pub mod validation;
pub mod validators;

#[cfg(test)]
mod tests;

pub use candidacy::{eligible_election_years, reconcile_declared_year, CandidacyEligibility};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    AffiliationRecord, ElectiveOffice, EvidenceDescriptor, FormStep, ModerationDecision,
    ModerationOutcome, ModerationStatus, OfficeCategory, ParseOfficeError, RecordField, RecordId,
};
pub use moderation::{ModerationDesk, ModerationError, QueueEntryView};
pub use repository::{
    AdminAuthorizer, AdminCredentials, AffiliationNotification, AffiliationRepository,
    BiometricError, BiometricVerifier, NotificationError, NotificationPublisher, RepositoryError,
    SubmissionReceipt,
};
pub use router::{affiliation_router, AffiliationApi};
pub use session::{
    AdminView, AdvanceOutcome, AffiliationSession, AuthOutcome, PendingCall, View, WorkflowError,
    WorkflowState,
};
pub use validation::{
    validate_step, EvidenceSlot, StepFailure, StepReport, StepValidator, ValidationConfig,
    ValidationErrors,
};
