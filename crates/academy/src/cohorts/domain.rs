use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::access::ActorId;
use crate::ids::{CohortId, EnrollmentId, ModuleId};

pub const MIN_COHORT_MONTHS: i32 = 1;
pub const MAX_COHORT_MONTHS: i32 = 3;

/// Whole calendar months elapsed between two dates.
///
/// A partial trailing month does not count, so 2025-03-15 → 2025-04-14 is zero months while
/// 2025-03-15 → 2025-04-15 is one. Spans running backwards are negative.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if months > 0 && end.day() < start.day() {
        months -= 1;
    } else if months < 0 && end.day() > start.day() {
        months += 1;
    }
    months
}

pub(crate) fn duration_is_valid(start: NaiveDate, end: NaiveDate) -> bool {
    (MIN_COHORT_MONTHS..=MAX_COHORT_MONTHS).contains(&months_between(start, end))
}

/// Lifecycle of a cohort. Any status may move to any other through an explicit update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortStatus {
    #[default]
    Planned,
    Active,
    Completed,
}

impl CohortStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CohortStatus::Planned => "planned",
            CohortStatus::Active => "active",
            CohortStatus::Completed => "completed",
        }
    }
}

/// One scheduled run of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    pub id: CohortId,
    pub module_id: ModuleId,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub application_deadline: NaiveDate,
    pub capacity: u32,
    pub status: CohortStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Cohort {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn accepts_applications_on(&self, day: NaiveDate) -> bool {
        day <= self.application_deadline
    }
}

/// Fields a caller may supply when scheduling a cohort.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CohortDraft {
    pub module_id: ModuleId,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: CohortStatus,
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Honoured only for a module's first cohort; later cohorts chain off their predecessor.
    #[serde(default)]
    pub application_deadline: Option<NaiveDate>,
}

/// Whitelisted cohort fields that may change after creation. The application deadline is
/// deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CohortPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub status: Option<CohortStatus>,
}

impl CohortPatch {
    pub fn touches_dates(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Cohort listing row with live enrollment counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortSummary {
    #[serde(flatten)]
    pub cohort: Cohort,
    pub pending_count: u32,
    pub approved_count: u32,
    pub seats_remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl EnrollmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Approved => "approved",
            EnrollmentStatus::Rejected => "rejected",
            EnrollmentStatus::Completed => "completed",
        }
    }

    /// Counts against a cohort's seats when capacity is checked at application time.
    pub const fn holds_seat(self) -> bool {
        matches!(self, EnrollmentStatus::Pending | EnrollmentStatus::Approved)
    }
}

/// A student's application to join a cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: ActorId,
    pub cohort_id: CohortId,
    pub status: EnrollmentStatus,
    pub applied_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<ActorId>,
}

/// Faculty adjudication of a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub const fn status(self) -> EnrollmentStatus {
        match self {
            Decision::Approved => EnrollmentStatus::Approved,
            Decision::Rejected => EnrollmentStatus::Rejected,
        }
    }
}

/// Pending application joined with the cohort and module it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEnrollmentView {
    pub enrollment_id: EnrollmentId,
    pub student_id: ActorId,
    pub applied_at: DateTime<Utc>,
    pub cohort_id: CohortId,
    pub cohort_title: String,
    pub cohort_start_date: NaiveDate,
    pub application_deadline: NaiveDate,
    pub module_id: ModuleId,
    pub module_title: String,
}
