//! Repository error type and the in-memory store backing the service and tests.
//!
//! All tables live behind one mutex, so each repository call is a single atomic unit:
//! uniqueness and seat checks happen inside the write that depends on them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::access::ActorId;
use crate::assessments::{
    Assessment, AssessmentRepository, Question, Submission, SubmissionRepository,
};
use crate::catalog::{CatalogRepository, Curriculum, Module};
use crate::cohorts::{
    Cohort, CohortRepository, Enrollment, EnrollmentRepository, EnrollmentStatus,
    EnrollmentTransition,
};
use crate::ids::{AssessmentId, CohortId, CurriculumId, EnrollmentId, ModuleId, SubmissionId};

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("cohort is at capacity ({capacity} seats)")]
    CapacityReached { capacity: u32 },
    #[error("{0}")]
    StaleWrite(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Everything the program services need from storage.
pub trait ProgramStore:
    CatalogRepository
    + CohortRepository
    + EnrollmentRepository
    + AssessmentRepository
    + SubmissionRepository
{
}

impl<T> ProgramStore for T where
    T: CatalogRepository
        + CohortRepository
        + EnrollmentRepository
        + AssessmentRepository
        + SubmissionRepository
{
}

#[derive(Debug, Default)]
struct Tables {
    curricula: HashMap<CurriculumId, Curriculum>,
    modules: HashMap<ModuleId, Module>,
    cohorts: HashMap<CohortId, Cohort>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    assessments: HashMap<AssessmentId, Assessment>,
    questions: HashMap<AssessmentId, Vec<Question>>,
    submissions: HashMap<SubmissionId, Submission>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `Unavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        if self.offline.load(Ordering::Acquire) {
            return Err(RepositoryError::Unavailable("store offline".to_string()));
        }
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl CatalogRepository for InMemoryStore {
    fn insert_curriculum(&self, curriculum: Curriculum) -> Result<Curriculum, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.curricula.contains_key(&curriculum.id) {
            return Err(RepositoryError::Conflict("curriculum already exists".to_string()));
        }
        tables
            .curricula
            .insert(curriculum.id.clone(), curriculum.clone());
        Ok(curriculum)
    }

    fn fetch_curriculum(&self, id: &CurriculumId) -> Result<Option<Curriculum>, RepositoryError> {
        Ok(self.tables()?.curricula.get(id).cloned())
    }

    fn insert_module(&self, module: Module) -> Result<Module, RepositoryError> {
        let mut tables = self.tables()?;
        let index_taken = tables.modules.values().any(|existing| {
            existing.is_live()
                && existing.curriculum_id == module.curriculum_id
                && existing.order_index == module.order_index
        });
        if index_taken {
            return Err(RepositoryError::Conflict(format!(
                "curriculum already has a module at index {}",
                module.order_index
            )));
        }
        tables.modules.insert(module.id.clone(), module.clone());
        Ok(module)
    }

    fn update_module(&self, module: Module) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.modules.get_mut(&module.id) {
            Some(slot) if slot.is_live() => {
                *slot = module;
                Ok(())
            }
            _ => Err(RepositoryError::NotFound("module")),
        }
    }

    fn fetch_module(&self, id: &ModuleId) -> Result<Option<Module>, RepositoryError> {
        Ok(self.tables()?.modules.get(id).cloned())
    }

    fn modules_in(&self, curriculum: &CurriculumId) -> Result<Vec<Module>, RepositoryError> {
        Ok(self
            .tables()?
            .modules
            .values()
            .filter(|module| &module.curriculum_id == curriculum)
            .cloned()
            .collect())
    }

    fn modules_owned_by(&self, faculty: &ActorId) -> Result<Vec<Module>, RepositoryError> {
        Ok(self
            .tables()?
            .modules
            .values()
            .filter(|module| module.is_live() && &module.faculty_id == faculty)
            .cloned()
            .collect())
    }
}

impl CohortRepository for InMemoryStore {
    fn insert_cohort(&self, cohort: Cohort) -> Result<Cohort, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.cohorts.contains_key(&cohort.id) {
            return Err(RepositoryError::Conflict("cohort already exists".to_string()));
        }
        tables.cohorts.insert(cohort.id.clone(), cohort.clone());
        Ok(cohort)
    }

    fn update_cohort(&self, cohort: Cohort) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.cohorts.get_mut(&cohort.id) {
            Some(slot) if slot.is_live() => {
                *slot = cohort;
                Ok(())
            }
            _ => Err(RepositoryError::NotFound("cohort")),
        }
    }

    fn fetch_cohort(&self, id: &CohortId) -> Result<Option<Cohort>, RepositoryError> {
        Ok(self.tables()?.cohorts.get(id).cloned())
    }

    fn cohorts_for_module(&self, module: &ModuleId) -> Result<Vec<Cohort>, RepositoryError> {
        let mut cohorts: Vec<Cohort> = self
            .tables()?
            .cohorts
            .values()
            .filter(|cohort| cohort.is_live() && &cohort.module_id == module)
            .cloned()
            .collect();
        cohorts.sort_by(|a, b| {
            b.end_date
                .cmp(&a.end_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(cohorts)
    }

    fn cohorts(&self) -> Result<Vec<Cohort>, RepositoryError> {
        let mut cohorts: Vec<Cohort> = self
            .tables()?
            .cohorts
            .values()
            .filter(|cohort| cohort.is_live())
            .cloned()
            .collect();
        cohorts.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(cohorts)
    }
}

impl EnrollmentRepository for InMemoryStore {
    fn insert_enrollment(
        &self,
        enrollment: Enrollment,
        seat_limit: Option<u32>,
    ) -> Result<Enrollment, RepositoryError> {
        let mut tables = self.tables()?;
        let siblings = tables
            .enrollments
            .values()
            .filter(|existing| existing.cohort_id == enrollment.cohort_id);

        let mut seats_held = 0u32;
        for existing in siblings {
            if existing.student_id == enrollment.student_id {
                return Err(RepositoryError::Conflict(
                    "enrollment already exists for this student and cohort".to_string(),
                ));
            }
            if existing.status.holds_seat() {
                seats_held += 1;
            }
        }
        if let Some(capacity) = seat_limit {
            if seats_held >= capacity {
                return Err(RepositoryError::CapacityReached { capacity });
            }
        }

        tables
            .enrollments
            .insert(enrollment.id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    fn fetch_enrollment(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, RepositoryError> {
        Ok(self.tables()?.enrollments.get(id).cloned())
    }

    fn transition_enrollment(
        &self,
        id: &EnrollmentId,
        transition: EnrollmentTransition,
    ) -> Result<Enrollment, RepositoryError> {
        let mut tables = self.tables()?;
        let (cohort_id, status) = match tables.enrollments.get(id) {
            Some(enrollment) => (enrollment.cohort_id.clone(), enrollment.status),
            None => return Err(RepositoryError::NotFound("enrollment")),
        };
        if status != transition.expected {
            return Err(RepositoryError::StaleWrite(format!(
                "enrollment is {}",
                status.label()
            )));
        }

        if let (EnrollmentStatus::Approved, Some(capacity)) = (transition.next, transition.seat_limit)
        {
            let approved = tables
                .enrollments
                .values()
                .filter(|other| {
                    other.cohort_id == cohort_id && other.status == EnrollmentStatus::Approved
                })
                .count() as u32;
            if approved >= capacity {
                return Err(RepositoryError::CapacityReached { capacity });
            }
        }

        let enrollment = tables
            .enrollments
            .get_mut(id)
            .ok_or(RepositoryError::NotFound("enrollment"))?;
        enrollment.status = transition.next;
        enrollment.decided_at = Some(transition.at);
        enrollment.decided_by = Some(transition.actor);
        Ok(enrollment.clone())
    }

    fn enrollments_for_cohort(&self, cohort: &CohortId) -> Result<Vec<Enrollment>, RepositoryError> {
        let mut enrollments: Vec<Enrollment> = self
            .tables()?
            .enrollments
            .values()
            .filter(|enrollment| &enrollment.cohort_id == cohort)
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| a.applied_at.cmp(&b.applied_at).then_with(|| a.id.cmp(&b.id)));
        Ok(enrollments)
    }

    fn enrollments_for_student(
        &self,
        student: &ActorId,
    ) -> Result<Vec<Enrollment>, RepositoryError> {
        Ok(self
            .tables()?
            .enrollments
            .values()
            .filter(|enrollment| &enrollment.student_id == student)
            .cloned()
            .collect())
    }
}

impl AssessmentRepository for InMemoryStore {
    fn insert_assessment(
        &self,
        assessment: Assessment,
        questions: Vec<Question>,
    ) -> Result<Assessment, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.assessments.contains_key(&assessment.id) {
            return Err(RepositoryError::Conflict("assessment already exists".to_string()));
        }
        tables.questions.insert(assessment.id.clone(), questions);
        tables
            .assessments
            .insert(assessment.id.clone(), assessment.clone());
        Ok(assessment)
    }

    fn update_assessment(
        &self,
        assessment: Assessment,
        questions: Option<Vec<Question>>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let live = tables
            .assessments
            .get(&assessment.id)
            .is_some_and(Assessment::is_live);
        if !live {
            return Err(RepositoryError::NotFound("assessment"));
        }
        if let Some(questions) = questions {
            tables.questions.insert(assessment.id.clone(), questions);
        }
        tables.assessments.insert(assessment.id.clone(), assessment);
        Ok(())
    }

    fn fetch_assessment(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        Ok(self.tables()?.assessments.get(id).cloned())
    }

    fn questions_for(&self, id: &AssessmentId) -> Result<Vec<Question>, RepositoryError> {
        let mut questions = self
            .tables()?
            .questions
            .get(id)
            .cloned()
            .unwrap_or_default();
        questions.sort_by_key(|question| question.position);
        Ok(questions)
    }

    fn assessments_owned_by(
        &self,
        faculty: Option<&ActorId>,
    ) -> Result<Vec<Assessment>, RepositoryError> {
        Ok(self
            .tables()?
            .assessments
            .values()
            .filter(|assessment| assessment.is_live())
            .filter(|assessment| faculty.map_or(true, |owner| &assessment.faculty_id == owner))
            .cloned()
            .collect())
    }

    fn delete_assessment(&self, id: &AssessmentId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let assessment = tables
            .assessments
            .get_mut(id)
            .filter(|assessment| assessment.is_live())
            .ok_or(RepositoryError::NotFound("assessment"))?;
        assessment.deleted_at = Some(at);
        tables.questions.remove(id);
        tables
            .submissions
            .retain(|_, submission| &submission.assessment_id != id);
        Ok(())
    }
}

impl SubmissionRepository for InMemoryStore {
    fn insert_submission(&self, submission: Submission) -> Result<Submission, RepositoryError> {
        let mut tables = self.tables()?;
        let duplicate = tables.submissions.values().any(|existing| {
            existing.assessment_id == submission.assessment_id
                && existing.student_id == submission.student_id
        });
        if duplicate {
            return Err(RepositoryError::Conflict(
                "submission already exists for this student and assessment".to_string(),
            ));
        }
        tables
            .submissions
            .insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    fn update_submission(&self, submission: Submission) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.submissions.get_mut(&submission.id) {
            Some(slot) => {
                *slot = submission;
                Ok(())
            }
            None => Err(RepositoryError::NotFound("submission")),
        }
    }

    fn fetch_submission(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        Ok(self.tables()?.submissions.get(id).cloned())
    }

    fn submissions_for(
        &self,
        assessment: &AssessmentId,
    ) -> Result<Vec<Submission>, RepositoryError> {
        Ok(self
            .tables()?
            .submissions
            .values()
            .filter(|submission| &submission.assessment_id == assessment)
            .cloned()
            .collect())
    }
}
