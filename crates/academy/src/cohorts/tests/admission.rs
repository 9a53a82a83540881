use std::sync::Arc;
use std::thread;

use super::common::*;
use crate::cohorts::{Decision, EnrollmentStatus};
use crate::config::{AdmissionPolicy, CapacityPolicy};
use crate::error::ServiceError;
use crate::notify::{Notification, NotificationError, NotificationPublisher};

#[test]
fn application_starts_pending_and_is_unique_per_student() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(5);

    let enrollment = fixture.apply(&student(1), &cohort);
    assert_eq!(enrollment.status, EnrollmentStatus::Pending);
    assert_eq!(enrollment.student_id, student(1).id);
    assert!(enrollment.decided_at.is_none());

    match fixture.services.admission.apply(&student(1), &cohort.id) {
        Err(ServiceError::Conflict(message)) => {
            assert_eq!(message, "student has already applied to this cohort")
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn rejected_student_cannot_reapply() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(5);
    let admission = &fixture.services.admission;

    let enrollment = fixture.apply(&student(1), &cohort);
    admission
        .decide(&owner(), &enrollment.id, Decision::Rejected)
        .expect("rejected");

    assert!(matches!(
        admission.apply(&student(1), &cohort.id),
        Err(ServiceError::Conflict(_))
    ));
}

#[test]
fn only_students_apply() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(5);

    for actor in [owner(), admin()] {
        assert!(matches!(
            fixture.services.admission.apply(&actor, &cohort.id),
            Err(ServiceError::Forbidden(_))
        ));
    }
}

#[test]
fn applications_close_after_the_deadline() {
    let fixture = Fixture::new();
    let mut draft = fixture.draft(date(2025, 2, 1), date(2025, 4, 1));
    draft.application_deadline = Some(date(2025, 1, 5));
    let cohort = fixture
        .services
        .scheduler
        .create_cohort(&owner(), draft)
        .expect("cohort");

    match fixture.services.admission.apply(&student(1), &cohort.id) {
        Err(ServiceError::Conflict(message)) => {
            assert_eq!(message, "applications for this cohort closed on 2025-01-05")
        }
        other => panic!("expected closed cohort, got {other:?}"),
    }
}

#[test]
fn deadline_day_itself_is_still_open() {
    let fixture = Fixture::new();
    let mut draft = fixture.draft(date(2025, 2, 1), date(2025, 4, 1));
    draft.application_deadline = Some(today());
    let cohort = fixture
        .services
        .scheduler
        .create_cohort(&owner(), draft)
        .expect("cohort");

    fixture.apply(&student(1), &cohort);
}

#[test]
fn deadline_can_be_made_advisory() {
    let fixture = Fixture::with_policy(AdmissionPolicy {
        enforce_deadline: false,
        ..AdmissionPolicy::default()
    });
    let mut draft = fixture.draft(date(2025, 2, 1), date(2025, 4, 1));
    draft.application_deadline = Some(date(2025, 1, 5));
    let cohort = fixture
        .services
        .scheduler
        .create_cohort(&owner(), draft)
        .expect("cohort");

    fixture.apply(&student(1), &cohort);
}

#[test]
fn approvals_stop_at_capacity() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(1);
    let admission = &fixture.services.admission;

    let first = fixture.apply(&student(1), &cohort);
    let second = fixture.apply(&student(2), &cohort);

    admission
        .decide(&owner(), &first.id, Decision::Approved)
        .expect("first seat");
    match admission.decide(&owner(), &second.id, Decision::Approved) {
        Err(ServiceError::Conflict(message)) => assert!(message.contains("capacity")),
        other => panic!("expected capacity conflict, got {other:?}"),
    }

    let still_pending = admission
        .student_enrollments(&student(2))
        .expect("enrollments");
    assert_eq!(still_pending[0].status, EnrollmentStatus::Pending);

    admission
        .decide(&owner(), &second.id, Decision::Rejected)
        .expect("rejection needs no seat");
}

#[test]
fn application_time_capacity_counts_pending_seats() {
    let fixture = Fixture::with_capacity_policy(CapacityPolicy::OnApplication);
    let cohort = fixture.open_cohort(1);

    fixture.apply(&student(1), &cohort);
    assert!(matches!(
        fixture.services.admission.apply(&student(2), &cohort.id),
        Err(ServiceError::Conflict(_))
    ));
}

#[test]
fn advisory_capacity_never_blocks() {
    let fixture = Fixture::with_capacity_policy(CapacityPolicy::Advisory);
    let cohort = fixture.open_cohort(1);
    let admission = &fixture.services.admission;

    for n in 1..=3 {
        let enrollment = fixture.apply(&student(n), &cohort);
        admission
            .decide(&owner(), &enrollment.id, Decision::Approved)
            .expect("advisory capacity");
    }
    let summary = fixture
        .services
        .scheduler
        .list_cohorts(None)
        .expect("listing")
        .remove(0);
    assert_eq!(summary.approved_count, 3);
    assert_eq!(summary.seats_remaining, 0);
}

#[test]
fn decisions_belong_to_the_module_owner() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(5);
    let admission = &fixture.services.admission;
    let enrollment = fixture.apply(&student(1), &cohort);

    for actor in [other_faculty(), student(1)] {
        assert!(matches!(
            admission.decide(&actor, &enrollment.id, Decision::Approved),
            Err(ServiceError::Forbidden(_))
        ));
    }

    let decided = admission
        .decide(&owner(), &enrollment.id, Decision::Approved)
        .expect("owner decides");
    assert_eq!(decided.status, EnrollmentStatus::Approved);
    assert_eq!(decided.decided_by, Some(owner().id));
    assert!(decided.decided_at.is_some());
}

#[test]
fn decided_enrollment_cannot_be_decided_again() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(5);
    let admission = &fixture.services.admission;
    let enrollment = fixture.apply(&student(1), &cohort);

    admission
        .decide(&admin(), &enrollment.id, Decision::Approved)
        .expect("administrator decides");
    match admission.decide(&owner(), &enrollment.id, Decision::Rejected) {
        Err(ServiceError::Conflict(message)) => {
            assert_eq!(message, "enrollment is approved, expected pending")
        }
        other => panic!("expected stale transition, got {other:?}"),
    }
}

#[test]
fn decision_notifies_the_student() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(5);
    let enrollment = fixture.apply(&student(7), &cohort);

    fixture
        .services
        .admission
        .decide(&owner(), &enrollment.id, Decision::Rejected)
        .expect("rejected");

    let events = fixture.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].template, "enrollment_decided");
    assert_eq!(events[0].recipient, student(7).id);
    assert_eq!(
        events[0].details.get("decision").map(String::as_str),
        Some("rejected")
    );
}

struct BrokenNotifier;

impl NotificationPublisher for BrokenNotifier {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp down".to_string()))
    }
}

#[test]
fn notification_failure_does_not_undo_the_decision() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(5);
    let enrollment = fixture.apply(&student(1), &cohort);

    let admission = crate::cohorts::EnrollmentAdmission::new(
        fixture.store.clone(),
        fixture.services.catalog.clone(),
        Arc::new(BrokenNotifier),
        Arc::new(crate::clock::FixedClock::on(today())),
        AdmissionPolicy::default(),
    );
    let decided = admission
        .decide(&owner(), &enrollment.id, Decision::Approved)
        .expect("decision stands");
    assert_eq!(decided.status, EnrollmentStatus::Approved);
}

#[test]
fn completion_requires_an_approved_enrollment() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(5);
    let admission = &fixture.services.admission;
    let enrollment = fixture.apply(&student(1), &cohort);

    assert!(matches!(
        admission.complete(&owner(), &enrollment.id),
        Err(ServiceError::Conflict(_))
    ));

    admission
        .decide(&owner(), &enrollment.id, Decision::Approved)
        .expect("approved");
    let completed = admission
        .complete(&owner(), &enrollment.id)
        .expect("completed");
    assert_eq!(completed.status, EnrollmentStatus::Completed);
}

#[test]
fn pending_queue_is_scoped_to_owned_modules() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(5);
    let admission = &fixture.services.admission;

    let first = fixture.apply(&student(1), &cohort);
    let second = fixture.apply(&student(2), &cohort);
    admission
        .decide(&owner(), &second.id, Decision::Approved)
        .expect("approved");

    let queue = admission.list_pending(&owner()).expect("owner queue");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].enrollment_id, first.id);
    assert_eq!(queue[0].module_title, "Pipelines");
    assert_eq!(queue[0].cohort_title, cohort.title);

    assert!(admission
        .list_pending(&other_faculty())
        .expect("other queue")
        .is_empty());
    assert_eq!(admission.list_pending(&admin()).expect("admin queue").len(), 1);
    assert!(matches!(
        admission.list_pending(&student(1)),
        Err(ServiceError::Forbidden(_))
    ));
}

#[test]
fn concurrent_approvals_never_exceed_capacity() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(2);
    let enrollments: Vec<_> = (0..8).map(|n| fixture.apply(&student(n), &cohort)).collect();
    let admission = &fixture.services.admission;

    let approved = thread::scope(|scope| {
        let handles: Vec<_> = enrollments
            .iter()
            .map(|enrollment| {
                scope.spawn(move || admission.decide(&owner(), &enrollment.id, Decision::Approved))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .filter(Result::is_ok)
            .count()
    });

    assert_eq!(approved, 2);
}

#[test]
fn concurrent_duplicate_applications_create_one_enrollment() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(5);
    let admission = &fixture.services.admission;
    let cohort_id = &cohort.id;

    let accepted = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(move || admission.apply(&student(1), cohort_id)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .filter(Result::is_ok)
            .count()
    });

    assert_eq!(accepted, 1);
    assert_eq!(
        admission
            .student_enrollments(&student(1))
            .expect("enrollments")
            .len(),
        1
    );
}

#[test]
fn removed_module_closes_its_cohorts() {
    let fixture = Fixture::new();
    let cohort = fixture.open_cohort(5);
    let pending = fixture.apply(&student(1), &cohort);

    fixture
        .services
        .catalog
        .remove_module(&admin(), &fixture.module.id)
        .expect("module removed");

    let admission = &fixture.services.admission;
    assert!(matches!(
        admission.apply(&student(2), &cohort.id),
        Err(ServiceError::NotFound("module"))
    ));
    assert!(matches!(
        admission.decide(&owner(), &pending.id, Decision::Approved),
        Err(ServiceError::NotFound("module"))
    ));
    assert!(admission.list_pending(&admin()).expect("queue").is_empty());
}
