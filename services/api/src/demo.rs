use std::collections::BTreeMap;
use std::sync::Arc;

use academy::access::Actor;
use academy::assessments::{
    AssessmentDraft, AssessmentKind, Difficulty, GradeInput, QuestionDraft, QuestionKind,
};
use academy::catalog::{CurriculumDraft, ModuleDraft};
use academy::clock::FixedClock;
use academy::cohorts::{Cohort, CohortDraft, CohortStatus, Decision};
use academy::config::{AdmissionPolicy, CapacityPolicy};
use academy::error::{AppError, ServiceError};
use academy::notify::MemoryNotifier;
use academy::store::InMemoryStore;
use academy::ProgramServices;
use chrono::{Days, Local, Months, NaiveDate};
use clap::Args;
use serde_json::json;

type DemoServices = ProgramServices<InMemoryStore, MemoryNotifier>;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Date the walkthrough runs on (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Seats in the first cohort.
    #[arg(long, default_value_t = 2)]
    pub(crate) capacity: u32,
    /// Number of students applying to the first cohort.
    #[arg(long, default_value_t = 3)]
    pub(crate) applicants: usize,
}

/// Outcome of one walkthrough, printed by the CLI and asserted in tests.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DemoSummary {
    pub(crate) first_cohort: Cohort,
    pub(crate) second_cohort: Cohort,
    pub(crate) approved: usize,
    pub(crate) turned_away: usize,
    pub(crate) suggested_score: u32,
    pub(crate) graded_score: f32,
    pub(crate) notifications: usize,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    println!("Academy program demo ({today})");
    let summary = run_walkthrough(today, args.capacity, args.applicants)?;
    render_summary(&summary);
    Ok(())
}

pub(crate) fn run_walkthrough(
    today: NaiveDate,
    capacity: u32,
    applicants: usize,
) -> Result<DemoSummary, ServiceError> {
    let notifier = Arc::new(MemoryNotifier::default());
    let services: DemoServices = ProgramServices::new(
        Arc::new(InMemoryStore::new()),
        notifier.clone(),
        Arc::new(FixedClock::on(today)),
        AdmissionPolicy {
            capacity: CapacityPolicy::OnApproval,
            ..AdmissionPolicy::default()
        },
    );

    let registrar = Actor::administrator("registrar");
    let instructor = Actor::faculty("instructor-ada");

    let curriculum = services.catalog.create_curriculum(
        &registrar,
        CurriculumDraft {
            title: "Cloud Engineering".to_string(),
            description: Some("Three-module professional track".to_string()),
        },
    )?;
    let module = services.catalog.create_module(
        &registrar,
        &curriculum.id,
        ModuleDraft {
            faculty_id: instructor.id.clone(),
            title: "Infrastructure as Code".to_string(),
            description: "Provisioning, drift, and review workflows".to_string(),
            order_index: 0,
            duration_months: 2,
        },
    )?;

    let first_start = shift(today.checked_add_days(Days::new(30)))?;
    let first_end = shift(first_start.checked_add_months(Months::new(2)))?;
    let second_end = shift(first_end.checked_add_months(Months::new(2)))?;

    let first_cohort = services.scheduler.create_cohort(
        &instructor,
        CohortDraft {
            module_id: module.id.clone(),
            title: "IaC spring".to_string(),
            start_date: first_start,
            end_date: first_end,
            status: CohortStatus::Planned,
            capacity: Some(capacity),
            application_deadline: None,
        },
    )?;
    let second_cohort = services.scheduler.create_cohort(
        &instructor,
        CohortDraft {
            module_id: module.id.clone(),
            title: "IaC summer".to_string(),
            start_date: first_end,
            end_date: second_end,
            status: CohortStatus::Planned,
            capacity: Some(capacity),
            application_deadline: None,
        },
    )?;

    let students: Vec<Actor> = (1..=applicants)
        .map(|n| Actor::student(format!("student-{n:02}")))
        .collect();
    let mut approved = 0;
    let mut turned_away = 0;
    for student in &students {
        let enrollment = services.admission.apply(student, &first_cohort.id)?;
        match services
            .admission
            .decide(&instructor, &enrollment.id, Decision::Approved)
        {
            Ok(_) => approved += 1,
            Err(ServiceError::Conflict(_)) => {
                services
                    .admission
                    .decide(&instructor, &enrollment.id, Decision::Rejected)?;
                turned_away += 1;
            }
            Err(other) => return Err(other),
        }
    }

    let quiz = services.assessments.create(
        &instructor,
        AssessmentDraft {
            title: "Terraform state quiz".to_string(),
            description: None,
            kind: AssessmentKind::Quiz,
            total_marks: 10,
            due_at: None,
            cohort_id: Some(first_cohort.id.clone()),
            questions: vec![
                QuestionDraft {
                    kind: QuestionKind::MultipleChoice,
                    prompt: "Which command shows planned changes?".to_string(),
                    points: 4,
                    options: vec!["plan".to_string(), "apply".to_string()],
                    correct_answer: Some("plan".to_string()),
                    explanation: None,
                    difficulty: Difficulty::Easy,
                    category: Some("workflow".to_string()),
                },
                QuestionDraft {
                    kind: QuestionKind::Written,
                    prompt: "Explain remote state locking.".to_string(),
                    points: 6,
                    options: Vec::new(),
                    correct_answer: None,
                    explanation: None,
                    difficulty: Difficulty::Medium,
                    category: Some("state".to_string()),
                },
            ],
        },
    )?;

    let mut answers = BTreeMap::new();
    if let [choice, essay] = quiz.questions.as_slice() {
        answers.insert(choice.id.clone(), json!("plan"));
        answers.insert(essay.id.clone(), json!("A lock stops two applies racing."));
    }
    let submitter = students
        .first()
        .cloned()
        .unwrap_or_else(|| Actor::student("student-01"));
    let submission = services
        .assessments
        .submit(&submitter, &quiz.assessment.id, answers)?;

    let queue = services.grading.list_for_grading(&instructor)?;
    let suggested_score = queue
        .iter()
        .find(|view| view.submission.id == submission.id)
        .map(|view| view.suggested_score)
        .unwrap_or_default();
    let graded_score = suggested_score as f32 + 5.0;
    services.grading.grade(
        &instructor,
        &submission.id,
        GradeInput::new(graded_score, Some("Clear explanation of locking")),
    )?;

    Ok(DemoSummary {
        first_cohort,
        second_cohort,
        approved,
        turned_away,
        suggested_score,
        graded_score,
        notifications: notifier.events().len(),
    })
}

fn shift(date: Option<NaiveDate>) -> Result<NaiveDate, ServiceError> {
    date.ok_or_else(|| ServiceError::validation("demo dates are out of range"))
}

fn render_summary(summary: &DemoSummary) {
    let DemoSummary {
        first_cohort,
        second_cohort,
        approved,
        turned_away,
        suggested_score,
        graded_score,
        notifications,
    } = summary;

    println!("\nCohorts");
    for cohort in [first_cohort, second_cohort] {
        println!(
            "  - {} {} → {} (applications close {}, {} seats)",
            cohort.title,
            cohort.start_date,
            cohort.end_date,
            cohort.application_deadline,
            cohort.capacity
        );
    }
    println!(
        "\nAdmissions: {approved} approved, {turned_away} turned away at capacity"
    );
    println!("Grading: suggested {suggested_score}, recorded {graded_score}");
    println!("Notifications sent: {notifications}");
}
