use std::fs;

use affiliation::config::AppConfig;
use affiliation::error::AppError;
use affiliation::workflows::affiliation::{
    AffiliationRecord, CandidacyEligibility, ElectiveOffice, FixedClock, FormStep, StepReport,
    StepValidator,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct EligibilityArgs {
    /// Elective office label, e.g. "VEREADOR(A)"
    #[arg(long)]
    pub(crate) office: ElectiveOffice,
    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) on: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Record as inline JSON, or @path to a JSON file
    #[arg(long)]
    pub(crate) record: String,
    /// Form step to validate (1 to 6)
    #[arg(long, value_parser = crate::infra::parse_step)]
    pub(crate) step: FormStep,
    /// Validate as an update of an existing membership
    #[arg(long)]
    pub(crate) update: bool,
    /// Override the reference date (defaults to the configured clock)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_eligibility(args: EligibilityArgs) -> Result<(), AppError> {
    let on = args.on.unwrap_or_else(|| Local::now().date_naive());
    let eligibility = CandidacyEligibility::compute(Some(args.office), on);
    render_eligibility(&eligibility);
    Ok(())
}

pub(crate) fn render_eligibility(eligibility: &CandidacyEligibility) {
    let office = eligibility
        .office
        .map(|office| office.label())
        .unwrap_or("no office");
    let years: Vec<String> = eligibility.years.iter().map(i32::to_string).collect();
    println!(
        "{office} as of {}: {}",
        eligibility.reference_date,
        if years.is_empty() {
            "no open election".to_string()
        } else {
            years.join(", ")
        }
    );
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let raw = match args.record.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)?,
        None => args.record.clone(),
    };
    let record: AffiliationRecord = serde_json::from_str(&raw)?;

    let validator = match args.today {
        Some(today) => StepValidator::new(
            config.workflow.validation.clone(),
            Arc::new(FixedClock(today)),
        ),
        None => config.workflow.step_validator(),
    };
    let report = validator.validate(&record, args.step, args.update);
    println!("{}", render_report(&report)?);
    Ok(())
}

pub(crate) fn render_report(report: &StepReport) -> Result<String, AppError> {
    let payload = serde_json::json!({
        "step": report.step,
        "label": report.step.label(),
        "passed": report.passed(),
        "errors": report.errors,
        "missing_evidence": report.missing_evidence,
    });
    Ok(serde_json::to_string_pretty(&payload)?)
}
