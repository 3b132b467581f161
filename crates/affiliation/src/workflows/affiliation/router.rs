use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::candidacy::CandidacyEligibility;
use super::domain::{AffiliationRecord, ElectiveOffice, FormStep, ModerationDecision, RecordId};
use super::moderation::{ModerationDesk, ModerationError, QueueEntryView};
use super::repository::{AdminAuthorizer, AdminCredentials, AffiliationRepository, RepositoryError};
use super::validation::StepValidator;

type SharedDesk<R> = Arc<Mutex<ModerationDesk<R>>>;

/// Shared state behind the affiliation endpoints.
///
/// Every successful reviewer sign-in gets its own desk, addressed by the
/// bearer token returned from `POST /api/v1/admin/session`.
pub struct AffiliationApi<R, A> {
    repository: Arc<R>,
    desks: Mutex<HashMap<String, SharedDesk<R>>>,
    authorizer: Arc<A>,
    validator: StepValidator,
}

impl<R, A> AffiliationApi<R, A>
where
    R: AffiliationRepository + 'static,
    A: AdminAuthorizer + 'static,
{
    pub fn new(repository: Arc<R>, authorizer: Arc<A>, validator: StepValidator) -> Self {
        Self {
            repository,
            desks: Mutex::new(HashMap::new()),
            authorizer,
            validator,
        }
    }

    /// Number of reviewer sessions currently open.
    pub fn open_desks(&self) -> usize {
        lock(&self.desks).len()
    }

    fn open_desk(&self, desk: ModerationDesk<R>) -> String {
        let token = Uuid::new_v4().simple().to_string();
        lock(&self.desks).insert(token.clone(), Arc::new(Mutex::new(desk)));
        token
    }

    fn desk_for(&self, headers: &HeaderMap) -> Option<SharedDesk<R>> {
        let token = bearer_token(headers)?;
        lock(&self.desks).get(token).cloned()
    }

    fn close_desk(&self, headers: &HeaderMap) -> Option<SharedDesk<R>> {
        let token = bearer_token(headers)?;
        lock(&self.desks).remove(token)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Router exposing eligibility lookup, step validation, and the moderation desk.
pub fn affiliation_router<R, A>(api: Arc<AffiliationApi<R, A>>) -> Router
where
    R: AffiliationRepository + 'static,
    A: AdminAuthorizer + 'static,
{
    Router::new()
        .route(
            "/api/v1/candidacy/eligibility",
            get(eligibility_handler::<R, A>),
        )
        .route(
            "/api/v1/affiliations/steps/:step/validate",
            post(validate_handler::<R, A>),
        )
        .route(
            "/api/v1/admin/session",
            post(sign_in_handler::<R, A>).delete(sign_out_handler::<R, A>),
        )
        .route(
            "/api/v1/admin/affiliations/pending",
            get(pending_handler::<R, A>),
        )
        .route(
            "/api/v1/admin/affiliations/:record_id/decision",
            post(decision_handler::<R, A>),
        )
        .with_state(api)
}

#[derive(Debug, Deserialize)]
pub(crate) struct EligibilityQuery {
    #[serde(default)]
    pub(crate) office: Option<String>,
    #[serde(default)]
    pub(crate) on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValidateStepRequest {
    pub(crate) record: AffiliationRecord,
    #[serde(default)]
    pub(crate) update_mode: bool,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, Json(payload)).into_response()
}

fn moderation_error_response(error: ModerationError) -> Response {
    let status = match &error {
        ModerationError::Unauthorized => StatusCode::UNAUTHORIZED,
        ModerationError::NotPending(_) => StatusCode::NOT_FOUND,
        ModerationError::Busy(_) => StatusCode::CONFLICT,
        ModerationError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ModerationError::Repository(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, error.to_string())
}

pub(crate) async fn eligibility_handler<R, A>(
    State(api): State<Arc<AffiliationApi<R, A>>>,
    Query(query): Query<EligibilityQuery>,
) -> Response
where
    R: AffiliationRepository + 'static,
    A: AdminAuthorizer + 'static,
{
    let office = match query.office.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(label) => match label.parse::<ElectiveOffice>() {
            Ok(office) => Some(office),
            Err(err) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        },
    };

    let on = query
        .on
        .unwrap_or_else(|| api.validator.clock().today());
    let eligibility = CandidacyEligibility::compute(office, on);
    (StatusCode::OK, Json(eligibility)).into_response()
}

pub(crate) async fn validate_handler<R, A>(
    State(api): State<Arc<AffiliationApi<R, A>>>,
    Path(step): Path<u8>,
    Json(request): Json<ValidateStepRequest>,
) -> Response
where
    R: AffiliationRepository + 'static,
    A: AdminAuthorizer + 'static,
{
    let Some(step) = FormStep::from_index(step) else {
        return error_response(StatusCode::NOT_FOUND, format!("unknown step {step}"));
    };

    let report = api
        .validator
        .validate(&request.record, step, request.update_mode);
    let passed = report.passed();
    let payload = json!({
        "step": report.step,
        "passed": passed,
        "errors": report.errors,
        "missing_evidence": report.missing_evidence,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn sign_in_handler<R, A>(
    State(api): State<Arc<AffiliationApi<R, A>>>,
    Json(credentials): Json<AdminCredentials>,
) -> Response
where
    R: AffiliationRepository + 'static,
    A: AdminAuthorizer + 'static,
{
    let mut desk = ModerationDesk::new(api.repository.clone());
    match desk.sign_in(api.authorizer.as_ref(), &credentials) {
        Ok(true) => {
            let token = api.open_desk(desk);
            let payload = json!({ "token": token, "token_type": "Bearer" });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Ok(false) => error_response(StatusCode::UNAUTHORIZED, "invalid reviewer credentials"),
        Err(err) => moderation_error_response(err),
    }
}

pub(crate) async fn sign_out_handler<R, A>(
    State(api): State<Arc<AffiliationApi<R, A>>>,
    headers: HeaderMap,
) -> Response
where
    R: AffiliationRepository + 'static,
    A: AdminAuthorizer + 'static,
{
    match api.close_desk(&headers) {
        Some(desk) => {
            lock(&*desk).sign_out();
            info!("reviewer signed out");
            StatusCode::NO_CONTENT.into_response()
        }
        None => moderation_error_response(ModerationError::Unauthorized),
    }
}

pub(crate) async fn pending_handler<R, A>(
    State(api): State<Arc<AffiliationApi<R, A>>>,
    headers: HeaderMap,
) -> Response
where
    R: AffiliationRepository + 'static,
    A: AdminAuthorizer + 'static,
{
    let Some(desk) = api.desk_for(&headers) else {
        return moderation_error_response(ModerationError::Unauthorized);
    };

    let mut desk = lock(&*desk);
    match desk.refresh() {
        Ok(queue) => {
            let entries: Vec<QueueEntryView> =
                queue.iter().filter_map(QueueEntryView::from_record).collect();
            (StatusCode::OK, Json(entries)).into_response()
        }
        Err(err) => moderation_error_response(err),
    }
}

pub(crate) async fn decision_handler<R, A>(
    State(api): State<Arc<AffiliationApi<R, A>>>,
    headers: HeaderMap,
    Path(record_id): Path<String>,
    Json(decision): Json<ModerationDecision>,
) -> Response
where
    R: AffiliationRepository + 'static,
    A: AdminAuthorizer + 'static,
{
    let Some(desk) = api.desk_for(&headers) else {
        return moderation_error_response(ModerationError::Unauthorized);
    };

    let id = RecordId(record_id);
    let mut desk = lock(&*desk);
    // The desk only knows entries from its last listing; reload before giving up on an id.
    if !desk.is_queued(&id) {
        if let Err(err) = desk.refresh() {
            return moderation_error_response(err);
        }
    }

    match desk.decide(&id, decision) {
        Ok(status) => {
            let payload = json!({
                "record_id": id,
                "status": status,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => moderation_error_response(err),
    }
}
