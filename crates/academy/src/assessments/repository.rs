use chrono::{DateTime, Utc};

use crate::access::ActorId;
use crate::ids::{AssessmentId, SubmissionId};
use crate::store::RepositoryError;

use super::domain::{Assessment, Question, Submission};

pub trait AssessmentRepository: Send + Sync {
    /// Persist an assessment and its questions as one write.
    fn insert_assessment(
        &self,
        assessment: Assessment,
        questions: Vec<Question>,
    ) -> Result<Assessment, RepositoryError>;
    /// Overwrite the assessment row. When `questions` is supplied every existing question of
    /// the assessment is dropped and replaced in the same write.
    fn update_assessment(
        &self,
        assessment: Assessment,
        questions: Option<Vec<Question>>,
    ) -> Result<(), RepositoryError>;
    fn fetch_assessment(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError>;
    /// Questions in position order.
    fn questions_for(&self, id: &AssessmentId) -> Result<Vec<Question>, RepositoryError>;
    /// Live assessments owned by `faculty`; every live assessment when `faculty` is `None`.
    fn assessments_owned_by(
        &self,
        faculty: Option<&ActorId>,
    ) -> Result<Vec<Assessment>, RepositoryError>;
    /// Soft-delete the assessment and drop its questions and submissions.
    fn delete_assessment(&self, id: &AssessmentId, at: DateTime<Utc>) -> Result<(), RepositoryError>;
}

pub trait SubmissionRepository: Send + Sync {
    /// Fails with `Conflict` when the student already submitted this assessment.
    fn insert_submission(&self, submission: Submission) -> Result<Submission, RepositoryError>;
    fn update_submission(&self, submission: Submission) -> Result<(), RepositoryError>;
    fn fetch_submission(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError>;
    fn submissions_for(&self, assessment: &AssessmentId)
        -> Result<Vec<Submission>, RepositoryError>;
}
