use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::access::{Actor, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use crate::catalog::{CurriculumDraft, Module, ModuleDraft};
use crate::clock::FixedClock;
use crate::cohorts::{Cohort, CohortDraft, CohortStatus, Enrollment};
use crate::config::{AdmissionPolicy, CapacityPolicy};
use crate::notify::MemoryNotifier;
use crate::services::ProgramServices;
use crate::store::InMemoryStore;

pub(super) type Services = ProgramServices<InMemoryStore, MemoryNotifier>;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn today() -> NaiveDate {
    date(2025, 1, 10)
}

pub(super) fn admin() -> Actor {
    Actor::administrator("admin-1")
}

pub(super) fn owner() -> Actor {
    Actor::faculty("f-owner")
}

pub(super) fn other_faculty() -> Actor {
    Actor::faculty("f-other")
}

pub(super) fn student(n: usize) -> Actor {
    Actor::student(format!("s-{n}"))
}

pub(super) struct Fixture {
    pub(super) services: Arc<Services>,
    pub(super) store: Arc<InMemoryStore>,
    pub(super) notifier: Arc<MemoryNotifier>,
    pub(super) module: Module,
}

impl Fixture {
    pub(super) fn new() -> Self {
        Self::with_policy(AdmissionPolicy::default())
    }

    pub(super) fn with_capacity_policy(capacity: CapacityPolicy) -> Self {
        Self::with_policy(AdmissionPolicy {
            capacity,
            ..AdmissionPolicy::default()
        })
    }

    pub(super) fn with_policy(policy: AdmissionPolicy) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(MemoryNotifier::default());
        let services = Arc::new(ProgramServices::new(
            store.clone(),
            notifier.clone(),
            Arc::new(FixedClock::on(today())),
            policy,
        ));

        let curriculum = services
            .catalog
            .create_curriculum(
                &admin(),
                CurriculumDraft {
                    title: "Data Engineering".to_string(),
                    description: None,
                },
            )
            .expect("curriculum");
        let module = services
            .catalog
            .create_module(
                &admin(),
                &curriculum.id,
                ModuleDraft {
                    faculty_id: owner().id,
                    title: "Pipelines".to_string(),
                    description: "Batch and stream processing".to_string(),
                    order_index: 0,
                    duration_months: 2,
                },
            )
            .expect("module");

        Self {
            services,
            store,
            notifier,
            module,
        }
    }

    pub(super) fn draft(&self, start: NaiveDate, end: NaiveDate) -> CohortDraft {
        CohortDraft {
            module_id: self.module.id.clone(),
            title: "Spring cohort".to_string(),
            start_date: start,
            end_date: end,
            status: CohortStatus::Planned,
            capacity: None,
            application_deadline: None,
        }
    }

    /// Cohort starting next month with the given number of seats, open for applications today.
    pub(super) fn open_cohort(&self, capacity: u32) -> Cohort {
        let mut draft = self.draft(date(2025, 2, 1), date(2025, 4, 1));
        draft.capacity = Some(capacity);
        self.services
            .scheduler
            .create_cohort(&owner(), draft)
            .expect("cohort scheduled")
    }

    pub(super) fn apply(&self, student: &Actor, cohort: &Cohort) -> Enrollment {
        self.services
            .admission
            .apply(student, &cohort.id)
            .expect("application accepted")
    }
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
