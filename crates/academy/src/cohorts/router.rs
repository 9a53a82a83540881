use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::access::Actor;
use crate::error::ServiceError;
use crate::ids::{CohortId, EnrollmentId, ModuleId};
use crate::notify::NotificationPublisher;
use crate::services::ProgramServices;
use crate::store::ProgramStore;

use super::domain::{CohortDraft, CohortPatch, Decision};

/// Router exposing cohort scheduling and enrollment admission endpoints.
pub fn cohort_router<S, N>(services: Arc<ProgramServices<S, N>>) -> Router
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/cohorts",
            get(list_cohorts_handler::<S, N>).post(create_cohort_handler::<S, N>),
        )
        .route(
            "/api/v1/cohorts/:cohort_id",
            axum::routing::patch(update_cohort_handler::<S, N>)
                .delete(delete_cohort_handler::<S, N>),
        )
        .route(
            "/api/v1/cohorts/:cohort_id/enrollments",
            post(apply_handler::<S, N>),
        )
        .route(
            "/api/v1/enrollments/pending",
            get(pending_enrollments_handler::<S, N>),
        )
        .route("/api/v1/enrollments/mine", get(my_enrollments_handler::<S, N>))
        .route(
            "/api/v1/enrollments/:enrollment_id/decision",
            post(decide_handler::<S, N>),
        )
        .route(
            "/api/v1/enrollments/:enrollment_id/complete",
            post(complete_handler::<S, N>),
        )
        .with_state(services)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CohortQuery {
    pub(crate) module_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DecisionRequest {
    pub(crate) decision: Decision,
}

pub(crate) async fn list_cohorts_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    Query(query): Query<CohortQuery>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let module_id = query.module_id.map(ModuleId);
    let cohorts = services.scheduler.list_cohorts(module_id.as_ref())?;
    Ok(Json(cohorts))
}

pub(crate) async fn create_cohort_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Json(draft): Json<CohortDraft>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let cohort = services.scheduler.create_cohort(&actor, draft)?;
    Ok((StatusCode::CREATED, Json(cohort)))
}

pub(crate) async fn update_cohort_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Path(cohort_id): Path<String>,
    Json(patch): Json<CohortPatch>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let cohort = services
        .scheduler
        .update_cohort(&actor, &CohortId(cohort_id), patch)?;
    Ok(Json(cohort))
}

pub(crate) async fn delete_cohort_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Path(cohort_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    services
        .scheduler
        .delete_cohort(&actor, &CohortId(cohort_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn apply_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Path(cohort_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let enrollment = services.admission.apply(&actor, &CohortId(cohort_id))?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

pub(crate) async fn pending_enrollments_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    Ok(Json(services.admission.list_pending(&actor)?))
}

pub(crate) async fn my_enrollments_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    Ok(Json(services.admission.student_enrollments(&actor)?))
}

pub(crate) async fn decide_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Path(enrollment_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let enrollment =
        services
            .admission
            .decide(&actor, &EnrollmentId(enrollment_id), request.decision)?;
    Ok(Json(enrollment))
}

pub(crate) async fn complete_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Path(enrollment_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let enrollment = services
        .admission
        .complete(&actor, &EnrollmentId(enrollment_id))?;
    Ok(Json(enrollment))
}
