use chrono::NaiveDate;

use super::super::candidacy::eligible_election_years;
use super::super::domain::{AffiliationRecord, FormStep, RecordField};
use super::super::validators::{
    is_valid_age, is_valid_document_number, is_valid_email, is_valid_full_name, is_valid_phone,
};
use super::config::ValidationConfig;
use super::{EvidenceSlot, StepReport, ValidationErrors};

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn require(errors: &mut ValidationErrors, field: RecordField, value: &str, message: &str) {
    if is_blank(value) {
        errors.insert(field, message);
    }
}

pub(crate) fn check_step(
    record: &AffiliationRecord,
    step: FormStep,
    update_mode: bool,
    today: NaiveDate,
    config: &ValidationConfig,
) -> StepReport {
    let mut errors = ValidationErrors::new();
    let mut missing_evidence = Vec::new();

    match step {
        FormStep::Personal => personal(record, today, &mut errors),
        FormStep::Address => address(record, &mut errors),
        FormStep::Complementary => complementary(record, today, &mut errors),
        FormStep::Interests => {}
        FormStep::Documents => {
            if !update_mode {
                documents(record, config, &mut missing_evidence);
            }
        }
        FormStep::Selfie => {
            if !update_mode && record.selfie.is_none() {
                missing_evidence.push(EvidenceSlot::Selfie);
            }
        }
    }

    StepReport {
        step,
        errors,
        missing_evidence,
    }
}

fn personal(record: &AffiliationRecord, today: NaiveDate, errors: &mut ValidationErrors) {
    if is_blank(&record.full_name) {
        errors.insert(RecordField::FullName, "full name is required");
    } else if !is_valid_full_name(&record.full_name) {
        errors.insert(
            RecordField::FullName,
            "full name must have at least two words and no digits or symbols",
        );
    }

    match record.birth_date {
        None => errors.insert(RecordField::BirthDate, "birth date is required"),
        Some(birth_date) if !is_valid_age(birth_date, today) => {
            errors.insert(RecordField::BirthDate, "age must be between 16 and 100 years")
        }
        Some(_) => {}
    }

    if !is_valid_document_number(&record.document_number) {
        errors.insert(RecordField::DocumentNumber, "document number is invalid");
    }

    if is_blank(&record.phone) {
        errors.insert(RecordField::Phone, "phone is required");
    } else if !is_valid_phone(&record.phone) {
        errors.insert(RecordField::Phone, "phone must include area code and number");
    }

    if !is_valid_email(&record.email) {
        errors.insert(RecordField::Email, "email is invalid");
    }

    if !record.terms_accepted {
        errors.insert(RecordField::TermsAccepted, "the terms must be accepted");
    }
    if !record.statute_accepted {
        errors.insert(RecordField::StatuteAccepted, "the party statute must be accepted");
    }
}

fn address(record: &AffiliationRecord, errors: &mut ValidationErrors) {
    require(errors, RecordField::PostalCode, &record.postal_code, "postal code is required");
    require(errors, RecordField::Street, &record.street, "street is required");
    require(errors, RecordField::HouseNumber, &record.house_number, "house number is required");
    require(errors, RecordField::District, &record.district, "district is required");
    require(errors, RecordField::City, &record.city, "city is required");
    require(errors, RecordField::AddressState, &record.address_state, "state is required");
}

fn complementary(record: &AffiliationRecord, today: NaiveDate, errors: &mut ValidationErrors) {
    require(
        errors,
        RecordField::VoterRegistration,
        &record.voter_registration,
        "voter registration number is required",
    );
    require(
        errors,
        RecordField::ElectoralState,
        &record.electoral_state,
        "electoral state is required",
    );
    require(
        errors,
        RecordField::ElectoralCity,
        &record.electoral_city,
        "electoral city is required",
    );

    if is_blank(&record.mother_name) {
        errors.insert(RecordField::MotherName, "mother's name is required");
    } else if !is_valid_full_name(&record.mother_name) {
        errors.insert(
            RecordField::MotherName,
            "mother's name must be complete, with no digits or symbols",
        );
    }

    if !record.is_candidate {
        if record.has_candidacy_details() {
            errors.insert(
                RecordField::IsCandidate,
                "candidacy details must be blank without a candidacy declaration",
            );
        }
        return;
    }

    require(
        errors,
        RecordField::PoliticalName,
        &record.political_name,
        "political name is required",
    );

    let Some(office) = record.political_office else {
        errors.insert(RecordField::PoliticalOffice, "elective office is required");
        return;
    };

    let eligible = eligible_election_years(Some(office), today);
    match record.election_year {
        Some(year) if eligible.contains(&year) => {}
        Some(_) => errors.insert(
            RecordField::ElectionYear,
            "election year is not open for this office",
        ),
        None => errors.insert(RecordField::ElectionYear, "election year is required"),
    }
}

fn documents(
    record: &AffiliationRecord,
    config: &ValidationConfig,
    missing: &mut Vec<EvidenceSlot>,
) {
    if record.document_front.is_none() {
        missing.push(EvidenceSlot::DocumentFront);
    }
    if record.document_back.is_none() {
        missing.push(EvidenceSlot::DocumentBack);
    }
    if config.require_signature && record.signature.is_none() {
        missing.push(EvidenceSlot::Signature);
    }
}
