use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};

use crate::access::Actor;
use crate::error::ServiceError;
use crate::ids::{CurriculumId, ModuleId};
use crate::notify::NotificationPublisher;
use crate::services::ProgramServices;
use crate::store::ProgramStore;

use super::domain::{CurriculumDraft, ModuleDraft};

/// Router exposing curriculum and module administration.
pub fn catalog_router<S, N>(services: Arc<ProgramServices<S, N>>) -> Router
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/curricula", post(create_curriculum_handler::<S, N>))
        .route(
            "/api/v1/curricula/:curriculum_id/modules",
            post(create_module_handler::<S, N>).get(curriculum_modules_handler::<S, N>),
        )
        .route(
            "/api/v1/modules/:module_id",
            delete(remove_module_handler::<S, N>),
        )
        .with_state(services)
}

pub(crate) async fn create_curriculum_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Json(draft): Json<CurriculumDraft>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let curriculum = services.catalog.create_curriculum(&actor, draft)?;
    Ok((StatusCode::CREATED, Json(curriculum)))
}

pub(crate) async fn create_module_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Path(curriculum_id): Path<String>,
    Json(draft): Json<ModuleDraft>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let module = services
        .catalog
        .create_module(&actor, &CurriculumId(curriculum_id), draft)?;
    Ok((StatusCode::CREATED, Json(module)))
}

pub(crate) async fn curriculum_modules_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    Path(curriculum_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let modules = services
        .catalog
        .curriculum_modules(&CurriculumId(curriculum_id))?;
    Ok(Json(modules))
}

pub(crate) async fn remove_module_handler<S, N>(
    State(services): State<Arc<ProgramServices<S, N>>>,
    actor: Actor,
    Path(module_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    let module = services
        .catalog
        .remove_module(&actor, &ModuleId(module_id))?;
    Ok(Json(module))
}
