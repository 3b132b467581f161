mod config;
mod rules;

pub use config::ValidationConfig;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::domain::{AffiliationRecord, FormStep, RecordField};

/// Field-keyed error messages. A field with no entry currently passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<RecordField, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: RecordField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: RecordField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: RecordField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = RecordField> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordField, &str)> + '_ {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    pub fn clear_fields<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = RecordField>,
    {
        for field in fields {
            self.0.remove(&field);
        }
    }

    /// Replace the entries owned by `step` with `fresh`, leaving other steps untouched.
    pub fn merge_step(&mut self, step: FormStep, fresh: &ValidationErrors) {
        self.clear_fields(step.fields().iter().copied());
        for (field, message) in fresh.iter() {
            self.insert(field, message);
        }
    }
}

/// Evidence captured as images rather than typed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSlot {
    DocumentFront,
    DocumentBack,
    Signature,
    Selfie,
}

impl EvidenceSlot {
    pub const fn label(self) -> &'static str {
        match self {
            EvidenceSlot::DocumentFront => "document front photo",
            EvidenceSlot::DocumentBack => "document back photo",
            EvidenceSlot::Signature => "signature",
            EvidenceSlot::Selfie => "selfie",
        }
    }
}

/// Result of validating one step.
///
/// Field rules land in `errors`; image evidence is coarse pass/fail and is
/// reported through `missing_evidence` instead of the field map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: FormStep,
    pub errors: ValidationErrors,
    pub missing_evidence: Vec<EvidenceSlot>,
}

impl StepReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty() && self.missing_evidence.is_empty()
    }

    pub fn failure(&self) -> Option<StepFailure> {
        if !self.errors.is_empty() {
            Some(StepFailure::InvalidFields(self.errors.clone()))
        } else if !self.missing_evidence.is_empty() {
            Some(StepFailure::MissingEvidence(self.missing_evidence.clone()))
        } else {
            None
        }
    }
}

/// Why a step refused to let the form move forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StepFailure {
    InvalidFields(ValidationErrors),
    MissingEvidence(Vec<EvidenceSlot>),
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepFailure::InvalidFields(errors) => {
                let fields: Vec<&str> = errors.fields().map(RecordField::key).collect();
                write!(f, "invalid fields: {}", fields.join(", "))
            }
            StepFailure::MissingEvidence(slots) => {
                let labels: Vec<&str> = slots.iter().map(|slot| slot.label()).collect();
                write!(f, "missing {}", labels.join(", "))
            }
        }
    }
}

/// Applies the per-step rules against an injected reference clock.
#[derive(Clone)]
pub struct StepValidator {
    config: ValidationConfig,
    clock: Arc<dyn Clock>,
}

impl StepValidator {
    pub fn new(config: ValidationConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn validate(
        &self,
        record: &AffiliationRecord,
        step: FormStep,
        update_mode: bool,
    ) -> StepReport {
        validate_step(record, step, update_mode, self.clock.today(), &self.config)
    }
}

impl fmt::Debug for StepValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepValidator")
            .field("config", &self.config)
            .field("today", &self.clock.today())
            .finish()
    }
}

/// Validate `step` of `record` as of `today`. Never fails; problems are data.
pub fn validate_step(
    record: &AffiliationRecord,
    step: FormStep,
    update_mode: bool,
    today: chrono::NaiveDate,
    config: &ValidationConfig,
) -> StepReport {
    rules::check_step(record, step, update_mode, today, config)
}
