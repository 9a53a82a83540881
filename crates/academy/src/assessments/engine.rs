use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::access::{AccessPolicy, Actor, Operation, Resource};
use crate::clock::Clock;
use crate::cohorts::CohortRepository;
use crate::error::ServiceError;
use crate::ids::{AssessmentId, QuestionId, SubmissionId};
use crate::store::RepositoryError;

use super::domain::{
    Assessment, AssessmentDraft, AssessmentPatch, AssessmentWithQuestions, Question,
    QuestionDraft, QuestionKind, Submission,
};
use super::repository::{AssessmentRepository, SubmissionRepository};

/// Assembles assessments with their ordered question sets and records student submissions.
pub struct AssessmentEngine<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    policy: AccessPolicy,
}

impl<S> AssessmentEngine<S>
where
    S: AssessmentRepository + SubmissionRepository + CohortRepository + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policy: AccessPolicy::standard(),
        }
    }

    /// Create an assessment owned by `actor`. Nothing is written unless every field and
    /// question validates.
    pub fn create(
        &self,
        actor: &Actor,
        draft: AssessmentDraft,
    ) -> Result<AssessmentWithQuestions, ServiceError> {
        self.policy
            .authorize(actor, Resource::Assessment, Operation::Create, None)?;

        let AssessmentDraft {
            title,
            description,
            kind,
            total_marks,
            due_at,
            cohort_id,
            questions,
        } = draft;

        let title = required_title(&title)?;
        if total_marks == 0 {
            return Err(ServiceError::validation("total marks must be positive"));
        }
        if let Some(cohort_id) = &cohort_id {
            self.store
                .fetch_cohort(cohort_id)?
                .filter(|cohort| cohort.is_live())
                .ok_or(ServiceError::NotFound("cohort"))?;
        }

        let id = AssessmentId::next();
        let questions = build_questions(&id, questions)?;
        let now = self.clock.now();
        let assessment = Assessment {
            id,
            faculty_id: actor.id.clone(),
            cohort_id,
            title,
            description,
            kind,
            total_marks,
            due_at,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let stored = self.store.insert_assessment(assessment, questions.clone())?;
        info!(
            assessment = %stored.id,
            faculty = %actor.id,
            questions = questions.len(),
            "assessment created"
        );
        Ok(AssessmentWithQuestions {
            assessment: stored,
            questions,
        })
    }

    /// Patch scalar fields and, when `questions` is supplied, replace the whole question set.
    ///
    /// Replacement is destructive: previous questions are deleted and the new ones receive
    /// fresh identities.
    pub fn update(
        &self,
        actor: &Actor,
        assessment_id: &AssessmentId,
        patch: AssessmentPatch,
        questions: Option<Vec<QuestionDraft>>,
    ) -> Result<AssessmentWithQuestions, ServiceError> {
        let mut assessment = self.live_assessment(assessment_id)?;
        self.authorize_owner(actor, &assessment, Operation::Update)?;

        let replacement = questions
            .map(|drafts| build_questions(&assessment.id, drafts))
            .transpose()?;

        let AssessmentPatch {
            title,
            description,
            kind,
            total_marks,
            due_at,
        } = patch;

        if let Some(title) = title {
            assessment.title = required_title(&title)?;
        }
        if let Some(total_marks) = total_marks {
            if total_marks == 0 {
                return Err(ServiceError::validation("total marks must be positive"));
            }
            assessment.total_marks = total_marks;
        }
        if description.is_some() {
            assessment.description = description;
        }
        if let Some(kind) = kind {
            assessment.kind = kind;
        }
        if due_at.is_some() {
            assessment.due_at = due_at;
        }
        assessment.updated_at = self.clock.now();

        let replaced = replacement.as_ref().map(Vec::len);
        self.store
            .update_assessment(assessment.clone(), replacement)?;
        info!(
            assessment = %assessment.id,
            replaced_questions = ?replaced,
            "assessment updated"
        );

        let questions = self.store.questions_for(&assessment.id)?;
        Ok(AssessmentWithQuestions {
            assessment,
            questions,
        })
    }

    /// Soft-delete an assessment; its questions and submissions go with it.
    pub fn delete(&self, actor: &Actor, assessment_id: &AssessmentId) -> Result<(), ServiceError> {
        let assessment = self.live_assessment(assessment_id)?;
        self.authorize_owner(actor, &assessment, Operation::Delete)?;

        self.store.delete_assessment(assessment_id, self.clock.now())?;
        info!(assessment = %assessment_id, actor = %actor.id, "assessment deleted");
        Ok(())
    }

    pub fn get(&self, assessment_id: &AssessmentId) -> Result<AssessmentWithQuestions, ServiceError> {
        let assessment = self.live_assessment(assessment_id)?;
        let questions = self.store.questions_for(assessment_id)?;
        Ok(AssessmentWithQuestions {
            assessment,
            questions,
        })
    }

    /// Record a student's answers. Each student submits an assessment once.
    pub fn submit(
        &self,
        student: &Actor,
        assessment_id: &AssessmentId,
        answers: BTreeMap<QuestionId, Value>,
    ) -> Result<Submission, ServiceError> {
        self.policy
            .authorize(student, Resource::Submission, Operation::Create, None)?;

        let assessment = self.live_assessment(assessment_id)?;
        let questions = self.store.questions_for(&assessment.id)?;
        if let Some(unknown) = answers
            .keys()
            .find(|key| !questions.iter().any(|question| &question.id == *key))
        {
            return Err(ServiceError::validation(format!(
                "answer references unknown question {unknown}"
            )));
        }

        let submission = Submission {
            id: SubmissionId::next(),
            assessment_id: assessment.id.clone(),
            student_id: student.id.clone(),
            submitted_at: self.clock.now(),
            total_score: None,
            graded: false,
            graded_at: None,
            graded_by: None,
            feedback: None,
            answers,
        };

        let stored = match self.store.insert_submission(submission) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict(_)) => {
                return Err(ServiceError::conflict(
                    "student has already submitted this assessment",
                ))
            }
            Err(other) => return Err(other.into()),
        };
        info!(
            submission = %stored.id,
            assessment = %assessment.id,
            student = %student.id,
            "submission received"
        );
        Ok(stored)
    }

    fn live_assessment(&self, assessment_id: &AssessmentId) -> Result<Assessment, ServiceError> {
        self.store
            .fetch_assessment(assessment_id)?
            .filter(Assessment::is_live)
            .ok_or(ServiceError::NotFound("assessment"))
    }

    fn authorize_owner(
        &self,
        actor: &Actor,
        assessment: &Assessment,
        operation: Operation,
    ) -> Result<(), ServiceError> {
        self.policy.authorize(
            actor,
            Resource::Assessment,
            operation,
            Some(&assessment.faculty_id),
        )?;
        Ok(())
    }
}

fn required_title(raw: &str) -> Result<String, ServiceError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("assessment title is required"));
    }
    Ok(title.to_string())
}

/// Validate drafts and turn them into questions with fresh identities, positioned by array
/// order.
fn build_questions(
    assessment_id: &AssessmentId,
    drafts: Vec<QuestionDraft>,
) -> Result<Vec<Question>, ServiceError> {
    if drafts.is_empty() {
        return Err(ServiceError::validation(
            "an assessment needs at least one question",
        ));
    }

    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| {
            let number = index + 1;
            let prompt = draft.prompt.trim();
            if prompt.is_empty() {
                return Err(ServiceError::validation(format!(
                    "question {number} needs prompt text"
                )));
            }
            if draft.points == 0 {
                return Err(ServiceError::validation(format!(
                    "question {number} must be worth at least one point"
                )));
            }

            let options = match draft.kind {
                QuestionKind::MultipleChoice => {
                    if draft.options.len() == 1 {
                        return Err(ServiceError::validation(format!(
                            "question {number} needs at least two options"
                        )));
                    }
                    if let Some(answer) = &draft.correct_answer {
                        if !draft.options.is_empty()
                            && !draft.options.iter().any(|option| option == answer)
                        {
                            return Err(ServiceError::validation(format!(
                                "question {number} correct answer is not one of its options"
                            )));
                        }
                    }
                    draft.options
                }
                QuestionKind::Written => Vec::new(),
            };

            Ok(Question {
                id: QuestionId::next(),
                assessment_id: assessment_id.clone(),
                position: index as u32,
                kind: draft.kind,
                prompt: prompt.to_string(),
                points: draft.points,
                options,
                correct_answer: draft.correct_answer,
                explanation: draft.explanation,
                difficulty: draft.difficulty,
                category: draft.category,
            })
        })
        .collect()
}
