//! Assessment assembly, student submissions, and grading.

pub mod domain;
pub mod engine;
pub mod grading;
pub mod repository;
pub mod router;

#[cfg(test)]
mod tests;

pub use domain::{
    Assessment, AssessmentDraft, AssessmentKind, AssessmentPatch, AssessmentWithQuestions,
    Difficulty, GradeInput, GradingView, Question, QuestionDraft, QuestionKind, Submission,
};
pub use engine::AssessmentEngine;
pub use grading::{suggested_score, GradingEngine};
pub use repository::{AssessmentRepository, SubmissionRepository};
pub use router::assessment_router;
