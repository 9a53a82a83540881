use super::common::*;
use crate::assessments::{suggested_score, GradeInput};
use crate::error::ServiceError;

#[test]
fn queue_suggests_scores_from_multiple_choice_answers() {
    let fixture = Fixture::new();
    let quiz = fixture.create_quiz();
    fixture.submit(&student(1), &quiz, &["A", "B", "long essay"]);
    fixture.submit(&student(2), &quiz, &[" a ", "C"]);

    let queue = fixture
        .services
        .grading
        .list_for_grading(&author())
        .expect("queue");
    assert_eq!(queue.len(), 2);

    let score_for = |student_id: &str| {
        queue
            .iter()
            .find(|view| view.submission.student_id.as_str() == student_id)
            .map(|view| view.suggested_score)
    };
    assert_eq!(score_for("s-1"), Some(5));
    assert_eq!(score_for("s-2"), Some(3));
    assert!(queue
        .iter()
        .all(|view| view.assessment_title == "Week 1 quiz" && view.assessment_total_marks == 10));
}

#[test]
fn queue_is_scoped_to_the_graders_assessments() {
    let fixture = Fixture::new();
    let quiz = fixture.create_quiz();
    fixture.submit(&student(1), &quiz, &["A"]);
    let grading = &fixture.services.grading;

    assert!(grading
        .list_for_grading(&other_faculty())
        .expect("queue")
        .is_empty());
    assert_eq!(grading.list_for_grading(&admin()).expect("queue").len(), 1);
    assert!(matches!(
        grading.list_for_grading(&student(1)),
        Err(ServiceError::Forbidden(_))
    ));
}

#[test]
fn grading_records_score_and_notifies_student() {
    let fixture = Fixture::new();
    let quiz = fixture.create_quiz();
    let submission = fixture.submit(&student(3), &quiz, &["A", "B"]);

    let graded = fixture
        .services
        .grading
        .grade(&author(), &submission.id, GradeInput::new(7.5, Some("Solid work")))
        .expect("graded");

    assert!(graded.graded);
    assert_eq!(graded.total_score, Some(7.5));
    assert_eq!(graded.feedback.as_deref(), Some("Solid work"));
    assert_eq!(graded.graded_by, Some(author().id));
    assert!(graded.graded_at.is_some());

    let events = fixture.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].template, "submission_graded");
    assert_eq!(events[0].recipient, student(3).id);
    assert_eq!(
        events[0].details.get("score").map(String::as_str),
        Some("7.5/10")
    );
}

#[test]
fn regrading_with_identical_values_is_a_no_op() {
    let fixture = Fixture::new();
    let quiz = fixture.create_quiz();
    let submission = fixture.submit(&student(1), &quiz, &["A"]);
    let grading = &fixture.services.grading;

    let first = grading
        .grade(&author(), &submission.id, GradeInput::new(6.0, None))
        .expect("graded");
    let second = grading
        .grade(&admin(), &submission.id, GradeInput::new(6.0, None))
        .expect("regraded");

    assert_eq!(first, second);
    assert_eq!(fixture.notifier.events().len(), 1);
}

#[test]
fn scores_must_fall_within_total_marks() {
    let fixture = Fixture::new();
    let quiz = fixture.create_quiz();
    let submission = fixture.submit(&student(1), &quiz, &["A"]);
    let grading = &fixture.services.grading;

    for score in [10.5, -1.0, f32::NAN, f32::INFINITY] {
        assert!(
            matches!(
                grading.grade(&author(), &submission.id, GradeInput::new(score, None)),
                Err(ServiceError::Validation(_))
            ),
            "score {score} should be rejected"
        );
    }
    grading
        .grade(&author(), &submission.id, GradeInput::new(10.0, None))
        .expect("full marks allowed");
    grading
        .grade(&author(), &submission.id, GradeInput::new(0.0, None))
        .expect("zero allowed");
}

#[test]
fn only_the_assessment_owner_grades() {
    let fixture = Fixture::new();
    let quiz = fixture.create_quiz();
    let submission = fixture.submit(&student(1), &quiz, &["A"]);

    for actor in [other_faculty(), student(1)] {
        assert!(matches!(
            fixture
                .services
                .grading
                .grade(&actor, &submission.id, GradeInput::new(5.0, None)),
            Err(ServiceError::Forbidden(_))
        ));
    }
    assert!(fixture.notifier.events().is_empty());
}

#[test]
fn unknown_or_deleted_submissions_are_not_found() {
    let fixture = Fixture::new();
    let quiz = fixture.create_quiz();
    let submission = fixture.submit(&student(1), &quiz, &["A"]);
    let grading = &fixture.services.grading;

    assert!(matches!(
        grading.grade(&author(), &"sub-missing".into(), GradeInput::new(1.0, None)),
        Err(ServiceError::NotFound("submission"))
    ));

    fixture
        .services
        .assessments
        .delete(&author(), &quiz.assessment.id)
        .expect("deleted");
    assert!(matches!(
        grading.grade(&author(), &submission.id, GradeInput::new(1.0, None)),
        Err(ServiceError::NotFound("submission"))
    ));
}

#[test]
fn suggested_score_ignores_written_and_unanswered_questions() {
    let fixture = Fixture::new();
    let quiz = fixture.create_quiz();
    let submission = fixture.submit(&student(1), &quiz, &["B", "B", "B"]);

    assert_eq!(suggested_score(&quiz.questions, &submission), 2);
}
