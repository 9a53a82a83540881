use std::sync::Arc;

use tracing::{debug, info};

use crate::access::{AccessPolicy, Actor, Operation, Resource};
use crate::clock::Clock;
use crate::error::ServiceError;
use crate::ids::SubmissionId;
use crate::notify::{dispatch, Notification, NotificationPublisher};

use super::domain::{Assessment, GradeInput, GradingView, Question, Submission};
use super::repository::{AssessmentRepository, SubmissionRepository};

/// Scores and annotates submissions on behalf of the owning faculty member.
pub struct GradingEngine<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    policy: AccessPolicy,
}

impl<S, N> GradingEngine<S, N>
where
    S: AssessmentRepository + SubmissionRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            clock,
            policy: AccessPolicy::standard(),
        }
    }

    /// Submissions to the actor's assessments, newest first. Administrators see every
    /// assessment's submissions.
    pub fn list_for_grading(&self, actor: &Actor) -> Result<Vec<GradingView>, ServiceError> {
        self.policy
            .authorize(actor, Resource::Submission, Operation::Review, None)?;

        let owner = (!actor.is_administrator()).then_some(&actor.id);
        let mut views = Vec::new();
        for assessment in self.store.assessments_owned_by(owner)? {
            let questions = self.store.questions_for(&assessment.id)?;
            for submission in self.store.submissions_for(&assessment.id)? {
                views.push(GradingView {
                    suggested_score: suggested_score(&questions, &submission),
                    assessment_title: assessment.title.clone(),
                    assessment_total_marks: assessment.total_marks,
                    submission,
                });
            }
        }

        views.sort_by(|a, b| b.submission.submitted_at.cmp(&a.submission.submitted_at));
        Ok(views)
    }

    /// Write a score and feedback back to a submission.
    ///
    /// Scores must lie within `[0, total_marks]` of the assessment. Grading again with the
    /// same score and feedback leaves the submission untouched.
    pub fn grade(
        &self,
        actor: &Actor,
        submission_id: &SubmissionId,
        input: GradeInput,
    ) -> Result<Submission, ServiceError> {
        let mut submission = self
            .store
            .fetch_submission(submission_id)?
            .ok_or(ServiceError::NotFound("submission"))?;
        let assessment = self
            .store
            .fetch_assessment(&submission.assessment_id)?
            .filter(Assessment::is_live)
            .ok_or(ServiceError::NotFound("submission"))?;
        self.policy.authorize(
            actor,
            Resource::Submission,
            Operation::Grade,
            Some(&assessment.faculty_id),
        )?;

        let GradeInput {
            total_score,
            feedback,
            graded,
        } = input;

        if !total_score.is_finite() || total_score < 0.0 {
            return Err(ServiceError::validation(
                "total score must be a non-negative number",
            ));
        }
        if total_score > assessment.total_marks as f32 {
            return Err(ServiceError::validation(format!(
                "total score {total_score} exceeds the assessment's {} marks",
                assessment.total_marks
            )));
        }

        if submission.graded == graded
            && submission.total_score == Some(total_score)
            && submission.feedback == feedback
        {
            debug!(submission = %submission.id, "grade unchanged");
            return Ok(submission);
        }

        submission.total_score = Some(total_score);
        submission.feedback = feedback;
        submission.graded = graded;
        if graded {
            submission.graded_at = Some(self.clock.now());
            submission.graded_by = Some(actor.id.clone());
        } else {
            submission.graded_at = None;
            submission.graded_by = None;
        }

        self.store.update_submission(submission.clone())?;
        info!(
            submission = %submission.id,
            assessment = %assessment.id,
            score = total_score,
            graded,
            "submission graded"
        );

        if graded {
            dispatch(
                self.notifier.as_ref(),
                Notification::new("submission_graded", submission.student_id.clone())
                    .detail("submission_id", submission.id.to_string())
                    .detail("assessment", assessment.title.clone())
                    .detail("score", format!("{total_score}/{}", assessment.total_marks)),
            );
        }
        Ok(submission)
    }
}

/// Sum of points for multiple-choice questions the submission answered correctly.
pub fn suggested_score(questions: &[Question], submission: &Submission) -> u32 {
    questions
        .iter()
        .filter(|question| {
            submission
                .answers
                .get(&question.id)
                .is_some_and(|answer| question.is_answered_correctly(answer))
        })
        .map(|question| question.points)
        .sum()
}
