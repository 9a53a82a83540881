use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::access::Actor;
use crate::error::ServiceError;
use crate::ids::{AssessmentId, QuestionId, SubmissionId};
use crate::notify::NotificationPublisher;
use crate::services::ProgramServices;
use crate::store::ProgramStore;

use super::domain::{AssessmentDraft, AssessmentPatch, GradeInput, QuestionDraft};

/// Router exposing assessment authoring, submission, and grading endpoints.
pub fn assessment_router<S, N>(services: Arc<ProgramServices<S, N>>) -> Router
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/assessments", post(create_assessment_handler::<S, N>))
        .route(
            "/api/v1/assessments/:assessment_id",
            get(get_assessment_handler::<S, N>)
                .patch(update_assessment_handler::<S, N>)
                .delete(delete_assessment_handler::<S, N>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/submissions",
            post(submit_handler::<S, N>),
        )
        .route(
            "/api/v1/submissions/grading",
            get(grading_queue_handler::<S, N>),
        )
        .route(
            "/api/v1/submissions/:submission_id/grade",
            post(grade_handler::<S, N>),
        )
        .with_state(services)
}

/// Body of an assessment update: a scalar patch plus an optional replacement question set.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpdateAssessmentRequest {
    #[serde(default)]
    pub(crate) patch: AssessmentPatch,
    #[serde(default)]
    pub(crate) questions: Option<Vec<QuestionDraft>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    pub(crate) answers: BTreeMap<QuestionId, Value>,
}

pub(crate) async fn create_assessment_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Json(draft): Json<AssessmentDraft>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let assessment = services.assessments.create(&actor, draft)?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

pub(crate) async fn get_assessment_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    Path(assessment_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let assessment = services.assessments.get(&AssessmentId(assessment_id))?;
    Ok(Json(assessment))
}

pub(crate) async fn update_assessment_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Path(assessment_id): Path<String>,
    Json(request): Json<UpdateAssessmentRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let assessment = services.assessments.update(
        &actor,
        &AssessmentId(assessment_id),
        request.patch,
        request.questions,
    )?;
    Ok(Json(assessment))
}

pub(crate) async fn delete_assessment_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Path(assessment_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    services
        .assessments
        .delete(&actor, &AssessmentId(assessment_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn submit_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Path(assessment_id): Path<String>,
    Json(request): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let submission =
        services
            .assessments
            .submit(&actor, &AssessmentId(assessment_id), request.answers)?;
    Ok((StatusCode::CREATED, Json(submission)))
}

pub(crate) async fn grading_queue_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    Ok(Json(services.grading.list_for_grading(&actor)?))
}

pub(crate) async fn grade_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Path(submission_id): Path<String>,
    Json(input): Json<GradeInput>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let submission = services
        .grading
        .grade(&actor, &SubmissionId(submission_id), input)?;
    Ok(Json(submission))
}
