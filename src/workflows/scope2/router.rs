use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{SubmissionForm, SubmissionId, SubmissionStatus};
use super::service::{Scope2AssessmentService, Scope2ServiceError};
use super::store::SubmissionStore;
use super::transport::MailTransport;

const PENDING_LIST_LIMIT: usize = 100;

/// Router builder exposing the public intake endpoint and the admin
/// review/transition endpoints.
pub fn scope2_router<S, M>(service: Arc<Scope2AssessmentService<S, M>>) -> Router
where
    S: SubmissionStore + 'static,
    M: MailTransport + 'static,
{
    Router::new()
        .route(
            "/api/v1/scope2/submissions",
            post(submit_handler::<S, M>).get(pending_handler::<S, M>),
        )
        .route(
            "/api/v1/scope2/submissions/:id",
            get(get_handler::<S, M>),
        )
        .route(
            "/api/v1/scope2/submissions/:id/approve",
            post(approve_handler::<S, M>),
        )
        .route(
            "/api/v1/scope2/submissions/:id/reject",
            post(reject_handler::<S, M>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RejectBody {
    #[serde(default)]
    pub reason: Option<String>,
}

pub(crate) async fn submit_handler<S, M>(
    State(service): State<Arc<Scope2AssessmentService<S, M>>>,
    axum::Json(form): axum::Json<SubmissionForm>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MailTransport + 'static,
{
    match service.submit(form) {
        Ok(record) => {
            let payload = json!({
                "id": record.id,
                "status": record.status.label(),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<S, M>(
    State(service): State<Arc<Scope2AssessmentService<S, M>>>,
    Path(id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MailTransport + 'static,
{
    match service.get(&SubmissionId(id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn pending_handler<S, M>(
    State(service): State<Arc<Scope2AssessmentService<S, M>>>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MailTransport + 'static,
{
    match service.pending(PENDING_LIST_LIMIT) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn approve_handler<S, M>(
    State(service): State<Arc<Scope2AssessmentService<S, M>>>,
    Path(id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MailTransport + 'static,
{
    transition_response(service.transition(&SubmissionId(id), SubmissionStatus::Approved, None))
}

pub(crate) async fn reject_handler<S, M>(
    State(service): State<Arc<Scope2AssessmentService<S, M>>>,
    Path(id): Path<String>,
    body: Option<axum::Json<RejectBody>>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MailTransport + 'static,
{
    let reason = body.and_then(|axum::Json(body)| body.reason);
    transition_response(service.transition(
        &SubmissionId(id),
        SubmissionStatus::Rejected,
        reason,
    ))
}

fn transition_response(
    result: Result<super::domain::Submission, Scope2ServiceError>,
) -> Response {
    match result {
        Ok(record) => {
            let payload = json!({
                "success": true,
                "status": record.status.label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: Scope2ServiceError) -> Response {
    let status = match &err {
        Scope2ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        Scope2ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        Scope2ServiceError::IllegalTransition { .. } => StatusCode::CONFLICT,
        Scope2ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
