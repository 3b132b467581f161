use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier assigned by the store once a record has been submitted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a captured image (document photo, signature, selfie).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceDescriptor {
    pub file_name: String,
    pub storage_key: String,
}

impl EvidenceDescriptor {
    pub fn new(file_name: impl Into<String>, storage_key: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            storage_key: storage_key.into(),
        }
    }
}

/// Everything the guided enrollment collects, grouped by the step that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AffiliationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ModerationStatus>,

    // identity
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub document_number: String,
    pub phone: String,
    pub email: String,
    pub terms_accepted: bool,
    pub statute_accepted: bool,

    // address
    pub postal_code: String,
    pub address_state: String,
    pub city: String,
    pub street: String,
    pub district: String,
    pub house_number: String,
    pub complement: String,

    // electoral
    pub voter_registration: String,
    pub electoral_state: String,
    pub electoral_city: String,
    pub gender: String,
    pub mother_name: String,
    pub father_name: String,
    pub is_candidate: bool,
    pub political_name: String,
    pub political_office: Option<ElectiveOffice>,
    pub election_year: Option<i32>,
    pub is_poll_watcher: bool,
    pub is_volunteer: bool,

    // socioeconomic
    pub profession: String,
    pub education_level: String,
    pub religion: String,
    pub interests: BTreeSet<String>,

    // evidence
    pub document_front: Option<EvidenceDescriptor>,
    pub document_back: Option<EvidenceDescriptor>,
    pub signature: Option<EvidenceDescriptor>,
    pub selfie: Option<EvidenceDescriptor>,
}

impl AffiliationRecord {
    /// Blank every candidacy detail. Used whenever the candidacy flag is off.
    pub fn clear_candidacy(&mut self) {
        self.political_name.clear();
        self.political_office = None;
        self.election_year = None;
    }

    pub fn has_candidacy_details(&self) -> bool {
        !self.political_name.trim().is_empty()
            || self.political_office.is_some()
            || self.election_year.is_some()
    }

    /// Copy of the record without the metadata the store assigns on submission.
    pub fn without_metadata(&self) -> Self {
        Self {
            id: None,
            status: None,
            ..self.clone()
        }
    }

    /// Fields whose value differs between `self` and `other`, in declaration order.
    pub fn changed_fields(&self, other: &Self) -> Vec<RecordField> {
        use RecordField::*;

        let checks = [
            (FullName, self.full_name != other.full_name),
            (BirthDate, self.birth_date != other.birth_date),
            (DocumentNumber, self.document_number != other.document_number),
            (Phone, self.phone != other.phone),
            (Email, self.email != other.email),
            (TermsAccepted, self.terms_accepted != other.terms_accepted),
            (StatuteAccepted, self.statute_accepted != other.statute_accepted),
            (PostalCode, self.postal_code != other.postal_code),
            (AddressState, self.address_state != other.address_state),
            (City, self.city != other.city),
            (Street, self.street != other.street),
            (District, self.district != other.district),
            (HouseNumber, self.house_number != other.house_number),
            (Complement, self.complement != other.complement),
            (VoterRegistration, self.voter_registration != other.voter_registration),
            (ElectoralState, self.electoral_state != other.electoral_state),
            (ElectoralCity, self.electoral_city != other.electoral_city),
            (Gender, self.gender != other.gender),
            (MotherName, self.mother_name != other.mother_name),
            (FatherName, self.father_name != other.father_name),
            (IsCandidate, self.is_candidate != other.is_candidate),
            (PoliticalName, self.political_name != other.political_name),
            (PoliticalOffice, self.political_office != other.political_office),
            (ElectionYear, self.election_year != other.election_year),
            (IsPollWatcher, self.is_poll_watcher != other.is_poll_watcher),
            (IsVolunteer, self.is_volunteer != other.is_volunteer),
            (Profession, self.profession != other.profession),
            (EducationLevel, self.education_level != other.education_level),
            (Religion, self.religion != other.religion),
            (Interests, self.interests != other.interests),
            (DocumentFront, self.document_front != other.document_front),
            (DocumentBack, self.document_back != other.document_back),
            (Signature, self.signature != other.signature),
            (Selfie, self.selfie != other.selfie),
        ];

        checks
            .into_iter()
            .filter_map(|(field, changed)| changed.then_some(field))
            .collect()
    }
}

/// Field keys used by the error map. Serialized in camelCase to match the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordField {
    FullName,
    BirthDate,
    DocumentNumber,
    Phone,
    Email,
    TermsAccepted,
    StatuteAccepted,
    PostalCode,
    AddressState,
    City,
    Street,
    District,
    HouseNumber,
    Complement,
    VoterRegistration,
    ElectoralState,
    ElectoralCity,
    Gender,
    MotherName,
    FatherName,
    IsCandidate,
    PoliticalName,
    PoliticalOffice,
    ElectionYear,
    IsPollWatcher,
    IsVolunteer,
    Profession,
    EducationLevel,
    Religion,
    Interests,
    DocumentFront,
    DocumentBack,
    Signature,
    Selfie,
}

impl RecordField {
    pub const fn key(self) -> &'static str {
        match self {
            RecordField::FullName => "fullName",
            RecordField::BirthDate => "birthDate",
            RecordField::DocumentNumber => "documentNumber",
            RecordField::Phone => "phone",
            RecordField::Email => "email",
            RecordField::TermsAccepted => "termsAccepted",
            RecordField::StatuteAccepted => "statuteAccepted",
            RecordField::PostalCode => "postalCode",
            RecordField::AddressState => "addressState",
            RecordField::City => "city",
            RecordField::Street => "street",
            RecordField::District => "district",
            RecordField::HouseNumber => "houseNumber",
            RecordField::Complement => "complement",
            RecordField::VoterRegistration => "voterRegistration",
            RecordField::ElectoralState => "electoralState",
            RecordField::ElectoralCity => "electoralCity",
            RecordField::Gender => "gender",
            RecordField::MotherName => "motherName",
            RecordField::FatherName => "fatherName",
            RecordField::IsCandidate => "isCandidate",
            RecordField::PoliticalName => "politicalName",
            RecordField::PoliticalOffice => "politicalOffice",
            RecordField::ElectionYear => "electionYear",
            RecordField::IsPollWatcher => "isPollWatcher",
            RecordField::IsVolunteer => "isVolunteer",
            RecordField::Profession => "profession",
            RecordField::EducationLevel => "educationLevel",
            RecordField::Religion => "religion",
            RecordField::Interests => "interests",
            RecordField::DocumentFront => "documentFront",
            RecordField::DocumentBack => "documentBack",
            RecordField::Signature => "signature",
            RecordField::Selfie => "selfie",
        }
    }

    /// Identity fields become read-only once a member is loaded through the update path.
    pub const fn is_identity_locked(self) -> bool {
        matches!(
            self,
            RecordField::FullName
                | RecordField::BirthDate
                | RecordField::DocumentNumber
                | RecordField::VoterRegistration
                | RecordField::MotherName
                | RecordField::FatherName
        )
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The six form steps, in enrollment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    Personal,
    Address,
    Complementary,
    Interests,
    Documents,
    Selfie,
}

impl FormStep {
    pub const ALL: [FormStep; 6] = [
        FormStep::Personal,
        FormStep::Address,
        FormStep::Complementary,
        FormStep::Interests,
        FormStep::Documents,
        FormStep::Selfie,
    ];

    /// One-based position of the step.
    pub const fn index(self) -> u8 {
        match self {
            FormStep::Personal => 1,
            FormStep::Address => 2,
            FormStep::Complementary => 3,
            FormStep::Interests => 4,
            FormStep::Documents => 5,
            FormStep::Selfie => 6,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.index() == index)
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub const fn label(self) -> &'static str {
        match self {
            FormStep::Personal => "Personal data",
            FormStep::Address => "Address",
            FormStep::Complementary => "Electoral data",
            FormStep::Interests => "Interests",
            FormStep::Documents => "Documents",
            FormStep::Selfie => "Selfie",
        }
    }

    /// Record fields collected on this step.
    pub const fn fields(self) -> &'static [RecordField] {
        use RecordField::*;
        match self {
            FormStep::Personal => &[
                FullName,
                BirthDate,
                DocumentNumber,
                Phone,
                Email,
                TermsAccepted,
                StatuteAccepted,
            ],
            FormStep::Address => &[
                PostalCode,
                AddressState,
                City,
                Street,
                District,
                HouseNumber,
                Complement,
            ],
            FormStep::Complementary => &[
                VoterRegistration,
                ElectoralState,
                ElectoralCity,
                Gender,
                MotherName,
                FatherName,
                IsCandidate,
                PoliticalName,
                PoliticalOffice,
                ElectionYear,
                IsPollWatcher,
                IsVolunteer,
            ],
            FormStep::Interests => &[Profession, EducationLevel, Religion, Interests],
            FormStep::Documents => &[DocumentFront, DocumentBack, Signature],
            FormStep::Selfie => &[Selfie],
        }
    }
}

impl fmt::Display for FormStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.index(), self.label())
    }
}

/// Election cycle family an office belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficeCategory {
    Municipal,
    General,
}

/// Elective offices a member may declare a candidacy for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElectiveOffice {
    #[serde(rename = "PREFEITO(A)")]
    Mayor,
    #[serde(rename = "VICE-PREFEITO(A)")]
    ViceMayor,
    #[serde(rename = "VEREADOR(A)")]
    CityCouncilor,
    #[serde(rename = "DEPUTADO(A) ESTADUAL")]
    StateDeputy,
    #[serde(rename = "DEPUTADO(A) DISTRITAL")]
    DistrictDeputy,
    #[serde(rename = "DEPUTADO(A) FEDERAL")]
    FederalDeputy,
    #[serde(rename = "SENADOR(A)")]
    Senator,
    #[serde(rename = "SUPLENTE DE SENADOR(A)")]
    AlternateSenator,
    #[serde(rename = "GOVERNADOR(A)")]
    Governor,
    #[serde(rename = "VICE-GOVERNADOR(A)")]
    ViceGovernor,
    #[serde(rename = "PRESIDENTE")]
    President,
}

impl ElectiveOffice {
    pub const ALL: [ElectiveOffice; 11] = [
        ElectiveOffice::Mayor,
        ElectiveOffice::ViceMayor,
        ElectiveOffice::CityCouncilor,
        ElectiveOffice::StateDeputy,
        ElectiveOffice::DistrictDeputy,
        ElectiveOffice::FederalDeputy,
        ElectiveOffice::Senator,
        ElectiveOffice::AlternateSenator,
        ElectiveOffice::Governor,
        ElectiveOffice::ViceGovernor,
        ElectiveOffice::President,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ElectiveOffice::Mayor => "PREFEITO(A)",
            ElectiveOffice::ViceMayor => "VICE-PREFEITO(A)",
            ElectiveOffice::CityCouncilor => "VEREADOR(A)",
            ElectiveOffice::StateDeputy => "DEPUTADO(A) ESTADUAL",
            ElectiveOffice::DistrictDeputy => "DEPUTADO(A) DISTRITAL",
            ElectiveOffice::FederalDeputy => "DEPUTADO(A) FEDERAL",
            ElectiveOffice::Senator => "SENADOR(A)",
            ElectiveOffice::AlternateSenator => "SUPLENTE DE SENADOR(A)",
            ElectiveOffice::Governor => "GOVERNADOR(A)",
            ElectiveOffice::ViceGovernor => "VICE-GOVERNADOR(A)",
            ElectiveOffice::President => "PRESIDENTE",
        }
    }

    pub const fn category(self) -> OfficeCategory {
        match self {
            ElectiveOffice::Mayor | ElectiveOffice::ViceMayor | ElectiveOffice::CityCouncilor => {
                OfficeCategory::Municipal
            }
            _ => OfficeCategory::General,
        }
    }
}

impl fmt::Display for ElectiveOffice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown elective office '{0}'")]
pub struct ParseOfficeError(pub String);

impl FromStr for ElectiveOffice {
    type Err = ParseOfficeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|office| office.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseOfficeError(value.to_string()))
    }
}

/// Moderation lifecycle of a submitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ModerationStatus::Pending)
    }
}

/// Reviewer verdict on a pending record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationOutcome {
    Approved,
    Rejected,
}

impl ModerationOutcome {
    pub const fn status(self) -> ModerationStatus {
        match self {
            ModerationOutcome::Approved => ModerationStatus::Approved,
            ModerationOutcome::Rejected => ModerationStatus::Rejected,
        }
    }
}

/// Decision payload forwarded to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationDecision {
    pub outcome: ModerationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ModerationDecision {
    pub fn approve() -> Self {
        Self {
            outcome: ModerationOutcome::Approved,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            outcome: ModerationOutcome::Rejected,
            reason: Some(reason.into()),
        }
    }
}
