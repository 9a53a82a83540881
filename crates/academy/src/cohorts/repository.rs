use chrono::{DateTime, Utc};

use crate::access::ActorId;
use crate::ids::{CohortId, EnrollmentId, ModuleId};
use crate::store::RepositoryError;

use super::domain::{Cohort, Enrollment, EnrollmentStatus};

pub trait CohortRepository: Send + Sync {
    fn insert_cohort(&self, cohort: Cohort) -> Result<Cohort, RepositoryError>;
    fn update_cohort(&self, cohort: Cohort) -> Result<(), RepositoryError>;
    fn fetch_cohort(&self, id: &CohortId) -> Result<Option<Cohort>, RepositoryError>;
    /// Live cohorts of a module ordered by end date, latest first.
    fn cohorts_for_module(&self, module: &ModuleId) -> Result<Vec<Cohort>, RepositoryError>;
    /// Every live cohort ordered by start date.
    fn cohorts(&self) -> Result<Vec<Cohort>, RepositoryError>;
}

/// Conditional status write: applied only when the stored status still equals `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentTransition {
    pub expected: EnrollmentStatus,
    pub next: EnrollmentStatus,
    pub actor: ActorId,
    pub at: DateTime<Utc>,
    /// When set and `next` is approved, the write fails if approved enrollments already
    /// fill this many seats.
    pub seat_limit: Option<u32>,
}

/// Enrollment storage. Implementations must enforce (cohort, student) uniqueness and the
/// seat checks inside the same atomic write, not as a separate read.
pub trait EnrollmentRepository: Send + Sync {
    /// Fails with `Conflict` when the pair already exists, and with `CapacityReached` when
    /// `seat_limit` is set and seat-holding enrollments already fill it.
    fn insert_enrollment(
        &self,
        enrollment: Enrollment,
        seat_limit: Option<u32>,
    ) -> Result<Enrollment, RepositoryError>;
    fn fetch_enrollment(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, RepositoryError>;
    fn transition_enrollment(
        &self,
        id: &EnrollmentId,
        transition: EnrollmentTransition,
    ) -> Result<Enrollment, RepositoryError>;
    fn enrollments_for_cohort(&self, cohort: &CohortId) -> Result<Vec<Enrollment>, RepositoryError>;
    fn enrollments_for_student(&self, student: &ActorId)
        -> Result<Vec<Enrollment>, RepositoryError>;
}
