use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::access::ActorId;
use crate::ids::{AssessmentId, CohortId, QuestionId, SubmissionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Quiz,
    Assignment,
    Exam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    Written,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// A gradable instrument owned by one faculty member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub faculty_id: ActorId,
    pub cohort_id: Option<CohortId>,
    pub title: String,
    pub description: Option<String>,
    pub kind: AssessmentKind,
    pub total_marks: u32,
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Assessment {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub assessment_id: AssessmentId,
    /// Zero-based position within the assessment.
    pub position: u32,
    pub kind: QuestionKind,
    pub prompt: String,
    pub points: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    pub category: Option<String>,
}

impl Question {
    /// Whether `answer` matches the recorded correct answer of a multiple-choice question.
    /// Written questions never match automatically.
    pub fn is_answered_correctly(&self, answer: &Value) -> bool {
        if self.kind != QuestionKind::MultipleChoice {
            return false;
        }
        let (Some(expected), Some(given)) = (self.correct_answer.as_deref(), answer.as_str())
        else {
            return false;
        };
        expected.trim().eq_ignore_ascii_case(given.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionDraft {
    pub kind: QuestionKind,
    pub prompt: String,
    pub points: u32,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssessmentDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: AssessmentKind,
    pub total_marks: u32,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cohort_id: Option<CohortId>,
    pub questions: Vec<QuestionDraft>,
}

/// Whitelisted scalar fields for a partial assessment update.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssessmentPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: Option<AssessmentKind>,
    #[serde(default)]
    pub total_marks: Option<u32>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

/// Assessment together with its questions in position order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentWithQuestions {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub questions: Vec<Question>,
}

impl AssessmentWithQuestions {
    pub fn question_points(&self) -> u32 {
        self.questions.iter().map(|question| question.points).sum()
    }
}

/// A student's answered instance of an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub assessment_id: AssessmentId,
    pub student_id: ActorId,
    pub submitted_at: DateTime<Utc>,
    pub total_score: Option<f32>,
    pub graded: bool,
    pub graded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graded_by: Option<ActorId>,
    pub feedback: Option<String>,
    pub answers: BTreeMap<QuestionId, Value>,
}

/// Score and feedback written back by the grading faculty member.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradeInput {
    pub total_score: f32,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default = "graded_by_default")]
    pub graded: bool,
}

fn graded_by_default() -> bool {
    true
}

impl GradeInput {
    pub fn new(total_score: f32, feedback: Option<&str>) -> Self {
        Self {
            total_score,
            feedback: feedback.map(str::to_string),
            graded: true,
        }
    }
}

/// Submission queued for grading, with the assessment context a grader needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradingView {
    #[serde(flatten)]
    pub submission: Submission,
    pub assessment_title: String,
    pub assessment_total_marks: u32,
    /// Points earned on multiple-choice questions answered correctly.
    pub suggested_score: u32,
}
