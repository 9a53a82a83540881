use std::sync::Arc;

use axum::Router;

use crate::assessments::{assessment_router, AssessmentEngine, GradingEngine};
use crate::catalog::{catalog_router, ProgramCatalog};
use crate::clock::Clock;
use crate::cohorts::{cohort_router, CohortScheduler, EnrollmentAdmission};
use crate::config::AdmissionPolicy;
use crate::notify::NotificationPublisher;
use crate::store::ProgramStore;

/// Every core component wired against one store and one notification publisher.
pub struct ProgramServices<S, N> {
    pub catalog: Arc<ProgramCatalog<S>>,
    pub scheduler: CohortScheduler<S>,
    pub admission: EnrollmentAdmission<S, N>,
    pub assessments: AssessmentEngine<S>,
    pub grading: GradingEngine<S, N>,
}

impl<S, N> ProgramServices<S, N>
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        clock: Arc<dyn Clock>,
        admission: AdmissionPolicy,
    ) -> Self {
        let catalog = Arc::new(ProgramCatalog::new(store.clone(), clock.clone()));
        Self {
            scheduler: CohortScheduler::new(
                store.clone(),
                catalog.clone(),
                clock.clone(),
                admission,
            ),
            admission: EnrollmentAdmission::new(
                store.clone(),
                catalog.clone(),
                notifier.clone(),
                clock.clone(),
                admission,
            ),
            assessments: AssessmentEngine::new(store.clone(), clock.clone()),
            grading: GradingEngine::new(store, notifier, clock),
            catalog,
        }
    }
}

/// All program endpoints merged into one router.
pub fn program_router<S, N>(services: Arc<ProgramServices<S, N>>) -> Router
where
    S: ProgramStore + 'static,
    N: NotificationPublisher + 'static,
{
    catalog_router(services.clone())
        .merge(cohort_router(services.clone()))
        .merge(assessment_router(services))
}
