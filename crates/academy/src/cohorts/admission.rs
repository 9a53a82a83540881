use std::sync::Arc;

use tracing::{info, warn};

use crate::access::{AccessPolicy, Actor, Operation, Resource};
use crate::catalog::{CatalogRepository, Module, ProgramCatalog};
use crate::clock::Clock;
use crate::config::AdmissionPolicy;
use crate::error::ServiceError;
use crate::ids::{CohortId, EnrollmentId};
use crate::notify::{dispatch, Notification, NotificationPublisher};
use crate::store::RepositoryError;

use super::domain::{Cohort, Decision, Enrollment, EnrollmentStatus, PendingEnrollmentView};
use super::repository::{CohortRepository, EnrollmentRepository, EnrollmentTransition};

/// Accepts applications to cohorts and adjudicates them. The only writer of enrollment status.
pub struct EnrollmentAdmission<S, N> {
    store: Arc<S>,
    catalog: Arc<ProgramCatalog<S>>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    access: AccessPolicy,
    policy: AdmissionPolicy,
}

impl<S, N> EnrollmentAdmission<S, N>
where
    S: CatalogRepository + CohortRepository + EnrollmentRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        store: Arc<S>,
        catalog: Arc<ProgramCatalog<S>>,
        notifier: Arc<N>,
        clock: Arc<dyn Clock>,
        policy: AdmissionPolicy,
    ) -> Self {
        Self {
            store,
            catalog,
            notifier,
            clock,
            access: AccessPolicy::standard(),
            policy,
        }
    }

    /// Record a pending application from `student` to `cohort_id`.
    ///
    /// At most one enrollment ever exists per (student, cohort); a rejected student cannot
    /// apply again. The store enforces the pair uniqueness inside the insert.
    pub fn apply(&self, student: &Actor, cohort_id: &CohortId) -> Result<Enrollment, ServiceError> {
        self.access
            .authorize(student, Resource::Enrollment, Operation::Create, None)?;

        let cohort = self.live_cohort(cohort_id)?;
        self.catalog.module(&cohort.module_id)?;
        if self.policy.enforce_deadline && !cohort.accepts_applications_on(self.clock.today()) {
            return Err(ServiceError::conflict(format!(
                "applications for this cohort closed on {}",
                cohort.application_deadline
            )));
        }

        let enrollment = Enrollment {
            id: EnrollmentId::next(),
            student_id: student.id.clone(),
            cohort_id: cohort.id.clone(),
            status: EnrollmentStatus::Pending,
            applied_at: self.clock.now(),
            decided_at: None,
            decided_by: None,
        };

        let seat_limit = self.policy.application_seat_limit(cohort.capacity);
        let stored = match self.store.insert_enrollment(enrollment, seat_limit) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict(_)) => {
                return Err(ServiceError::conflict(
                    "student has already applied to this cohort",
                ))
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            enrollment = %stored.id,
            cohort = %cohort.id,
            student = %student.id,
            "application received"
        );
        Ok(stored)
    }

    /// Pending applications to cohorts of modules the actor owns. Administrators see all.
    pub fn list_pending(&self, actor: &Actor) -> Result<Vec<PendingEnrollmentView>, ServiceError> {
        self.access
            .authorize(actor, Resource::Enrollment, Operation::Review, None)?;

        let cohorts = self.store.cohorts()?;
        let mut views = Vec::new();
        for cohort in cohorts {
            let module = match self.store.fetch_module(&cohort.module_id)? {
                Some(module) if module.is_live() => module,
                _ => continue,
            };
            if !actor.is_administrator() && module.faculty_id != actor.id {
                continue;
            }

            for enrollment in self.store.enrollments_for_cohort(&cohort.id)? {
                if enrollment.status != EnrollmentStatus::Pending {
                    continue;
                }
                views.push(PendingEnrollmentView {
                    enrollment_id: enrollment.id,
                    student_id: enrollment.student_id,
                    applied_at: enrollment.applied_at,
                    cohort_id: cohort.id.clone(),
                    cohort_title: cohort.title.clone(),
                    cohort_start_date: cohort.start_date,
                    application_deadline: cohort.application_deadline,
                    module_id: module.id.clone(),
                    module_title: module.title.clone(),
                });
            }
        }

        views.sort_by(|a, b| a.applied_at.cmp(&b.applied_at));
        Ok(views)
    }

    /// Approve or reject a pending application. Only the owner of the cohort's module (or an
    /// administrator) may decide.
    pub fn decide(
        &self,
        actor: &Actor,
        enrollment_id: &EnrollmentId,
        decision: Decision,
    ) -> Result<Enrollment, ServiceError> {
        let (enrollment, cohort, module) = self.resolve(enrollment_id)?;
        self.access.authorize(
            actor,
            Resource::Enrollment,
            Operation::Decide,
            Some(&module.faculty_id),
        )?;

        let next = decision.status();
        let seat_limit = match decision {
            Decision::Approved => self.policy.approval_seat_limit(cohort.capacity),
            Decision::Rejected => None,
        };
        let updated = self.transition(
            &enrollment,
            EnrollmentTransition {
                expected: EnrollmentStatus::Pending,
                next,
                actor: actor.id.clone(),
                at: self.clock.now(),
                seat_limit,
            },
        )?;

        info!(
            enrollment = %updated.id,
            cohort = %cohort.id,
            decision = next.label(),
            actor = %actor.id,
            "application decided"
        );
        dispatch(
            self.notifier.as_ref(),
            Notification::new("enrollment_decided", updated.student_id.clone())
                .detail("enrollment_id", updated.id.to_string())
                .detail("cohort", cohort.title.clone())
                .detail("decision", next.label()),
        );
        Ok(updated)
    }

    /// Mark an approved enrollment completed once the student finished the cohort.
    pub fn complete(
        &self,
        actor: &Actor,
        enrollment_id: &EnrollmentId,
    ) -> Result<Enrollment, ServiceError> {
        let (enrollment, cohort, module) = self.resolve(enrollment_id)?;
        self.access.authorize(
            actor,
            Resource::Enrollment,
            Operation::Complete,
            Some(&module.faculty_id),
        )?;

        let updated = self.transition(
            &enrollment,
            EnrollmentTransition {
                expected: EnrollmentStatus::Approved,
                next: EnrollmentStatus::Completed,
                actor: actor.id.clone(),
                at: self.clock.now(),
                seat_limit: None,
            },
        )?;

        info!(enrollment = %updated.id, cohort = %cohort.id, "enrollment completed");
        Ok(updated)
    }

    /// The student's own applications, newest first.
    pub fn student_enrollments(&self, student: &Actor) -> Result<Vec<Enrollment>, ServiceError> {
        let mut enrollments = self.store.enrollments_for_student(&student.id)?;
        enrollments.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(enrollments)
    }

    fn transition(
        &self,
        enrollment: &Enrollment,
        transition: EnrollmentTransition,
    ) -> Result<Enrollment, ServiceError> {
        let expected = transition.expected;
        match self.store.transition_enrollment(&enrollment.id, transition) {
            Ok(updated) => Ok(updated),
            Err(RepositoryError::StaleWrite(_)) => {
                let current = self
                    .store
                    .fetch_enrollment(&enrollment.id)?
                    .map(|current| current.status)
                    .unwrap_or(enrollment.status);
                warn!(
                    enrollment = %enrollment.id,
                    expected = expected.label(),
                    found = current.label(),
                    "enrollment transition rejected"
                );
                Err(ServiceError::conflict(format!(
                    "enrollment is {}, expected {}",
                    current.label(),
                    expected.label()
                )))
            }
            Err(other) => Err(other.into()),
        }
    }

    fn resolve(
        &self,
        enrollment_id: &EnrollmentId,
    ) -> Result<(Enrollment, Cohort, Module), ServiceError> {
        let enrollment = self
            .store
            .fetch_enrollment(enrollment_id)?
            .ok_or(ServiceError::NotFound("enrollment"))?;
        let cohort = self.live_cohort(&enrollment.cohort_id)?;
        let module = self.catalog.module(&cohort.module_id)?;
        Ok((enrollment, cohort, module))
    }

    fn live_cohort(&self, cohort_id: &CohortId) -> Result<Cohort, ServiceError> {
        self.store
            .fetch_cohort(cohort_id)?
            .filter(Cohort::is_live)
            .ok_or(ServiceError::NotFound("cohort"))
    }
}
