//! Cohort scheduling and enrollment admission.
//!
//! The scheduler owns the duration and deadline-chaining rules for cohorts; admission owns
//! the enrollment state machine and is the only component that writes enrollment status.

pub mod admission;
pub mod domain;
pub mod repository;
pub mod router;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use admission::EnrollmentAdmission;
pub use domain::{
    months_between, Cohort, CohortDraft, CohortPatch, CohortStatus, CohortSummary, Decision,
    Enrollment, EnrollmentStatus, PendingEnrollmentView, MAX_COHORT_MONTHS, MIN_COHORT_MONTHS,
};
pub use repository::{CohortRepository, EnrollmentRepository, EnrollmentTransition};
pub use router::cohort_router;
pub use scheduler::CohortScheduler;
