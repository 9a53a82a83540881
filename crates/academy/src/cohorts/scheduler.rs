use std::sync::Arc;

use tracing::{debug, info};

use crate::access::{AccessPolicy, Actor, Operation, Resource};
use crate::catalog::{CatalogRepository, Module, ProgramCatalog};
use crate::clock::Clock;
use crate::config::AdmissionPolicy;
use crate::error::ServiceError;
use crate::ids::{CohortId, ModuleId};

use super::domain::{
    duration_is_valid, Cohort, CohortDraft, CohortPatch, CohortSummary, EnrollmentStatus,
};
use super::repository::{CohortRepository, EnrollmentRepository};

/// Creates and updates cohorts under a module.
pub struct CohortScheduler<S> {
    store: Arc<S>,
    catalog: Arc<ProgramCatalog<S>>,
    clock: Arc<dyn Clock>,
    policy: AccessPolicy,
    default_capacity: u32,
}

impl<S> CohortScheduler<S>
where
    S: CatalogRepository + CohortRepository + EnrollmentRepository + 'static,
{
    pub fn new(
        store: Arc<S>,
        catalog: Arc<ProgramCatalog<S>>,
        clock: Arc<dyn Clock>,
        admission: AdmissionPolicy,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            policy: AccessPolicy::standard(),
            default_capacity: admission.default_capacity,
        }
    }

    /// Schedule a new cohort.
    ///
    /// When the module already has a cohort, the new application deadline is the end date of
    /// the one finishing last, whatever the draft says. Otherwise the draft's deadline is used,
    /// falling back to the day before the start date.
    pub fn create_cohort(&self, actor: &Actor, draft: CohortDraft) -> Result<Cohort, ServiceError> {
        let module = self.catalog.module(&draft.module_id)?;
        self.authorize_for(actor, &module, Operation::Create)?;

        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ServiceError::validation("cohort title is required"));
        }
        if !duration_is_valid(draft.start_date, draft.end_date) {
            return Err(ServiceError::InvalidDuration);
        }
        let capacity = draft.capacity.unwrap_or(self.default_capacity);
        if capacity == 0 {
            return Err(ServiceError::validation("cohort capacity must be positive"));
        }

        let previous = self.store.cohorts_for_module(&module.id)?.into_iter().next();
        let application_deadline = match (&previous, draft.application_deadline) {
            (Some(previous), requested) => {
                if requested.is_some_and(|requested| requested != previous.end_date) {
                    debug!(
                        module = %module.id,
                        previous = %previous.id,
                        "ignoring caller deadline; chaining to previous cohort end date"
                    );
                }
                previous.end_date
            }
            (None, Some(requested)) => requested,
            (None, None) => draft
                .start_date
                .pred_opt()
                .ok_or_else(|| ServiceError::validation("start date is out of range"))?,
        };

        let cohort = Cohort {
            id: CohortId::next(),
            module_id: module.id.clone(),
            title: title.to_string(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            application_deadline,
            capacity,
            status: draft.status,
            created_at: self.clock.now(),
            deleted_at: None,
        };

        let stored = self.store.insert_cohort(cohort)?;
        info!(
            cohort = %stored.id,
            module = %module.id,
            deadline = %stored.application_deadline,
            chained = previous.is_some(),
            "cohort scheduled"
        );
        Ok(stored)
    }

    /// Apply a whitelisted patch. The application deadline is never recomputed here.
    pub fn update_cohort(
        &self,
        actor: &Actor,
        cohort_id: &CohortId,
        patch: CohortPatch,
    ) -> Result<Cohort, ServiceError> {
        let mut cohort = self.live_cohort(cohort_id)?;
        let module = self.catalog.module(&cohort.module_id)?;
        self.authorize_for(actor, &module, Operation::Update)?;

        if patch.touches_dates() {
            let start = patch.start_date.unwrap_or(cohort.start_date);
            let end = patch.end_date.unwrap_or(cohort.end_date);
            if !duration_is_valid(start, end) {
                return Err(ServiceError::InvalidDuration);
            }
        }
        if patch.capacity == Some(0) {
            return Err(ServiceError::validation("cohort capacity must be positive"));
        }

        let CohortPatch {
            title,
            start_date,
            end_date,
            capacity,
            status,
        } = patch;

        if let Some(title) = title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ServiceError::validation("cohort title is required"));
            }
            cohort.title = title.to_string();
        }
        if let Some(start_date) = start_date {
            cohort.start_date = start_date;
        }
        if let Some(end_date) = end_date {
            cohort.end_date = end_date;
        }
        if let Some(capacity) = capacity {
            cohort.capacity = capacity;
        }
        if let Some(status) = status {
            cohort.status = status;
        }

        self.store.update_cohort(cohort.clone())?;
        info!(cohort = %cohort.id, status = cohort.status.label(), "cohort updated");
        Ok(cohort)
    }

    pub fn delete_cohort(&self, actor: &Actor, cohort_id: &CohortId) -> Result<(), ServiceError> {
        let mut cohort = self.live_cohort(cohort_id)?;
        let module = self.catalog.module(&cohort.module_id)?;
        self.authorize_for(actor, &module, Operation::Delete)?;

        cohort.deleted_at = Some(self.clock.now());
        self.store.update_cohort(cohort)?;
        info!(cohort = %cohort_id, "cohort deleted");
        Ok(())
    }

    /// Live cohorts, optionally limited to one module, with their enrollment counts.
    pub fn list_cohorts(
        &self,
        module_id: Option<&ModuleId>,
    ) -> Result<Vec<CohortSummary>, ServiceError> {
        let cohorts = match module_id {
            Some(module_id) => self.store.cohorts_for_module(module_id)?,
            None => self.store.cohorts()?,
        };

        cohorts
            .into_iter()
            .map(|cohort| -> Result<CohortSummary, ServiceError> {
                let enrollments = self.store.enrollments_for_cohort(&cohort.id)?;
                let count = |status: EnrollmentStatus| {
                    enrollments
                        .iter()
                        .filter(|enrollment| enrollment.status == status)
                        .count() as u32
                };
                let pending_count = count(EnrollmentStatus::Pending);
                let approved_count = count(EnrollmentStatus::Approved);
                let seats_remaining = cohort.capacity.saturating_sub(approved_count);
                Ok(CohortSummary {
                    cohort,
                    pending_count,
                    approved_count,
                    seats_remaining,
                })
            })
            .collect()
    }

    pub(crate) fn live_cohort(&self, cohort_id: &CohortId) -> Result<Cohort, ServiceError> {
        self.store
            .fetch_cohort(cohort_id)?
            .filter(Cohort::is_live)
            .ok_or(ServiceError::NotFound("cohort"))
    }

    fn authorize_for(
        &self,
        actor: &Actor,
        module: &Module,
        operation: Operation,
    ) -> Result<(), ServiceError> {
        self.policy
            .authorize(actor, Resource::Cohort, operation, Some(&module.faculty_id))?;
        Ok(())
    }
}
