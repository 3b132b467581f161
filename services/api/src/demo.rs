use crate::commands::render_eligibility;
use crate::infra::{
    evidence, ConfiguredAdminAuthorizer, InMemoryAffiliationStore, LoggingNotifier,
    SimulatedBiometrics,
};
use affiliation::error::AppError;
use affiliation::workflows::affiliation::{
    AdminCredentials, AdvanceOutcome, AffiliationRecord, AffiliationSession, AuthOutcome,
    CandidacyEligibility, ElectiveOffice, FixedClock, FormStep, ModerationDecision,
    ModerationDesk, ModerationError, QueueEntryView, StepValidator, ValidationConfig, View,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::collections::BTreeSet;
use std::sync::Arc;

const DEMO_MEMBER_DOCUMENT: &str = "390.533.447-05";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for age and candidacy checks (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Skip the reviewer portion of the demo.
    #[arg(long)]
    pub(crate) skip_moderation: bool,
}

type DemoSession = AffiliationSession<InMemoryAffiliationStore, SimulatedBiometrics, LoggingNotifier>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        skip_moderation,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let store = Arc::new(InMemoryAffiliationStore::seeded());
    let notifier = Arc::new(LoggingNotifier::default());
    let validator = StepValidator::new(ValidationConfig::default(), Arc::new(FixedClock(today)));
    let mut session: DemoSession = AffiliationSession::new(
        store.clone(),
        Arc::new(SimulatedBiometrics { accept: true }),
        notifier.clone(),
        validator,
    );

    println!("Affiliation workflow demo (reference date {today})");
    println!("\nCandidacy windows");
    for office in [
        ElectiveOffice::CityCouncilor,
        ElectiveOffice::Mayor,
        ElectiveOffice::FederalDeputy,
        ElectiveOffice::President,
    ] {
        print!("- ");
        render_eligibility(&CandidacyEligibility::compute(Some(office), today));
    }

    println!("\nNew enrollment");
    enroll(&mut session)?;
    for notification in notifier.sent() {
        println!(
            "  Notification: template={} -> {}",
            notification.template, notification.recipient
        );
    }

    println!("\nMembership update");
    session.exit_to_home();
    update_member(&mut session)?;

    if skip_moderation {
        return Ok(());
    }

    println!("\nModeration");
    moderate(store)
}

fn enroll(session: &mut DemoSession) -> Result<(), AppError> {
    session.start_enrollment()?;

    if let AdvanceOutcome::Blocked(failure) = session.advance()? {
        println!("- Empty {} blocked: {failure}", FormStep::Personal);
    }

    session.edit(|record| *record = demo_applicant())?;
    session.edit(|record| {
        record.is_candidate = true;
        record.political_name = "Lia da Feira".to_string();
        record.political_office = Some(ElectiveOffice::CityCouncilor);
    })?;
    if session.record().election_year.is_none() {
        let first_open = session.candidacy_eligibility().years.first().copied();
        session.edit(|record| record.election_year = first_open)?;
    }
    println!(
        "- Candidacy for {} in {}",
        ElectiveOffice::CityCouncilor,
        session
            .record()
            .election_year
            .map(|year| year.to_string())
            .unwrap_or_else(|| "no open year".to_string())
    );

    loop {
        let step = session.current_step();
        match session.advance()? {
            AdvanceOutcome::Moved(next) => println!("- Passed {} -> {next}", describe(step)),
            AdvanceOutcome::Submitted(receipt) => {
                println!(
                    "- Submitted as {}: {}",
                    receipt
                        .record_id
                        .as_ref()
                        .map(|id| id.0.as_str())
                        .unwrap_or("unassigned"),
                    receipt.message
                );
                return Ok(());
            }
            AdvanceOutcome::Blocked(failure) => {
                println!("- {} blocked: {failure}", describe(step));
                return Ok(());
            }
            AdvanceOutcome::ReturnedToPanel => return Ok(()),
        }
    }
}

fn update_member(session: &mut DemoSession) -> Result<(), AppError> {
    session.start_update()?;
    match session.authenticate_with_biometrics(DEMO_MEMBER_DOCUMENT)? {
        AuthOutcome::Authenticated => {}
        other => {
            println!("- Sign-in refused: {other:?}");
            session.exit_to_home();
            return Ok(());
        }
    }
    println!(
        "- Signed in as {} ({})",
        session.record().full_name,
        session.view()
    );

    session.edit_section(FormStep::Address)?;
    session.edit(|record| {
        record.street = "QNL 14 Conjunto B".to_string();
        record.city = "Taguatinga".to_string();
        record.district = "Taguatinga Norte".to_string();
    })?;
    if let Err(err) = session.edit(|record| record.full_name = "Somebody Else".to_string()) {
        println!("- Identity edit refused: {err}");
    }

    match session.advance()? {
        AdvanceOutcome::ReturnedToPanel => println!("- Address updated, back at the member panel"),
        other => println!("- Address not updated: {other:?}"),
    }

    if session.view() == &View::MemberPanel {
        let receipt = session.submit_for_review()?;
        println!("- {}", receipt.message);
    }
    Ok(())
}

fn moderate(store: Arc<InMemoryAffiliationStore>) -> Result<(), AppError> {
    let credentials = AdminCredentials {
        email: "demo-reviewer@example.org".to_string(),
        password: "demo".to_string(),
    };
    let authorizer = ConfiguredAdminAuthorizer::new(Some(credentials.clone()));
    let mut desk = ModerationDesk::new(store.clone());
    if !desk.sign_in(&authorizer, &credentials)? {
        println!("- Reviewer sign-in refused");
        return Ok(());
    }

    let queue: Vec<QueueEntryView> = desk
        .refresh()?
        .iter()
        .filter_map(QueueEntryView::from_record)
        .collect();
    println!("- {} entries awaiting review", queue.len());
    for entry in &queue {
        println!(
            "  - {} | {} | {} | {}/{}",
            entry.record_id, entry.full_name, entry.document_number, entry.city, entry.address_state
        );
    }

    for (position, entry) in queue.iter().enumerate() {
        let decision = if position % 2 == 0 {
            ModerationDecision::approve()
        } else {
            ModerationDecision::reject("voter registration could not be confirmed")
        };
        desk.select(&entry.record_id)?;
        let status = desk.decide(&entry.record_id, decision)?;
        println!("- {} -> {}", entry.record_id, status.label());
    }

    println!("- {} entries left in the queue", desk.queue().len());
    let decided = store
        .records()
        .map_err(ModerationError::from)?
        .iter()
        .filter(|record| record.status.is_some_and(|status| status.is_terminal()))
        .count();
    println!("- {decided} memberships with a final decision");
    Ok(())
}

fn describe(step: Option<FormStep>) -> String {
    step.map(|step| step.to_string())
        .unwrap_or_else(|| "form".to_string())
}

fn demo_applicant() -> AffiliationRecord {
    AffiliationRecord {
        full_name: "Lia Andrade Campos".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1988, 4, 12),
        document_number: "111.444.777-35".to_string(),
        phone: "(81) 99123-4567".to_string(),
        email: "lia.campos@example.org".to_string(),
        terms_accepted: true,
        statute_accepted: true,
        postal_code: "50030-230".to_string(),
        address_state: "PE".to_string(),
        city: "Recife".to_string(),
        street: "Rua do Bom Jesus".to_string(),
        district: "Recife Antigo".to_string(),
        house_number: "125".to_string(),
        voter_registration: "045612378901".to_string(),
        electoral_state: "PE".to_string(),
        electoral_city: "Recife".to_string(),
        gender: "F".to_string(),
        mother_name: "Marta Andrade".to_string(),
        father_name: "Jorge Campos".to_string(),
        is_poll_watcher: true,
        profession: "Nurse".to_string(),
        education_level: "Higher education".to_string(),
        interests: BTreeSet::from(["health".to_string(), "transport".to_string()]),
        document_front: evidence("lia-front"),
        document_back: evidence("lia-back"),
        signature: evidence("lia-signature"),
        selfie: evidence("lia-selfie"),
        ..AffiliationRecord::default()
    }
}
