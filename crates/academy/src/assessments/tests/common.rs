use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::access::{Actor, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use crate::assessments::{
    AssessmentDraft, AssessmentKind, AssessmentWithQuestions, Difficulty, QuestionDraft,
    QuestionKind, Submission,
};
use crate::clock::FixedClock;
use crate::config::AdmissionPolicy;
use crate::ids::QuestionId;
use crate::notify::MemoryNotifier;
use crate::services::ProgramServices;
use crate::store::InMemoryStore;

pub(super) type Services = ProgramServices<InMemoryStore, MemoryNotifier>;

pub(super) fn author() -> Actor {
    Actor::faculty("f-author")
}

pub(super) fn other_faculty() -> Actor {
    Actor::faculty("f-other")
}

pub(super) fn admin() -> Actor {
    Actor::administrator("admin-1")
}

pub(super) fn student(n: usize) -> Actor {
    Actor::student(format!("s-{n}"))
}

pub(super) struct Fixture {
    pub(super) services: Arc<Services>,
    pub(super) store: Arc<InMemoryStore>,
    pub(super) notifier: Arc<MemoryNotifier>,
}

impl Fixture {
    pub(super) fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(MemoryNotifier::default());
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date");
        let services = Arc::new(ProgramServices::new(
            store.clone(),
            notifier.clone(),
            Arc::new(FixedClock::on(today)),
            AdmissionPolicy::default(),
        ));
        Self {
            services,
            store,
            notifier,
        }
    }

    pub(super) fn create_quiz(&self) -> AssessmentWithQuestions {
        self.services
            .assessments
            .create(&author(), quiz_draft())
            .expect("quiz created")
    }

    pub(super) fn submit(
        &self,
        student: &Actor,
        assessment: &AssessmentWithQuestions,
        answers: &[&str],
    ) -> Submission {
        self.services
            .assessments
            .submit(student, &assessment.assessment.id, answer_map(assessment, answers))
            .expect("submission accepted")
    }
}

pub(super) fn multiple_choice(prompt: &str, points: u32, correct: &str) -> QuestionDraft {
    QuestionDraft {
        kind: QuestionKind::MultipleChoice,
        prompt: prompt.to_string(),
        points,
        options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
        correct_answer: Some(correct.to_string()),
        explanation: None,
        difficulty: Difficulty::Easy,
        category: Some("basics".to_string()),
    }
}

pub(super) fn written(prompt: &str, points: u32) -> QuestionDraft {
    QuestionDraft {
        kind: QuestionKind::Written,
        prompt: prompt.to_string(),
        points,
        options: Vec::new(),
        correct_answer: None,
        explanation: None,
        difficulty: Difficulty::Hard,
        category: None,
    }
}

/// Two multiple-choice questions worth 3 and 2 points plus one written question worth 5.
pub(super) fn quiz_draft() -> AssessmentDraft {
    AssessmentDraft {
        title: "Week 1 quiz".to_string(),
        description: Some("Warm-up".to_string()),
        kind: AssessmentKind::Quiz,
        total_marks: 10,
        due_at: None,
        cohort_id: None,
        questions: vec![
            multiple_choice("Pick A", 3, "A"),
            multiple_choice("Pick B", 2, "B"),
            written("Explain backpressure", 5),
        ],
    }
}

/// Answers keyed by question position.
pub(super) fn answer_map(
    assessment: &AssessmentWithQuestions,
    answers: &[&str],
) -> BTreeMap<QuestionId, Value> {
    assessment
        .questions
        .iter()
        .zip(answers)
        .map(|(question, answer)| (question.id.clone(), json!(answer)))
        .collect()
}

pub(super) fn request(method: &str, uri: &str, actor: Option<&Actor>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header(ACTOR_ID_HEADER, actor.id.as_str())
            .header(ACTOR_ROLE_HEADER, actor.role.label());
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).expect("serialize body"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
