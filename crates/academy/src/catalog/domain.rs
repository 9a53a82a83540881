use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::ActorId;
use crate::ids::{CurriculumId, ModuleId};

/// Top-level program grouping ordered modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curriculum {
    pub id: CurriculumId,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: ActorId,
    pub created_at: DateTime<Utc>,
}

/// A single-teacher-owned unit of a curriculum, run repeatedly as cohorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub curriculum_id: CurriculumId,
    pub faculty_id: ActorId,
    pub title: String,
    pub description: String,
    pub order_index: u32,
    pub duration_months: u8,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_at: Option<DateTime<Utc>>,
}

impl Module {
    pub fn is_live(&self) -> bool {
        self.removed_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurriculumDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDraft {
    pub faculty_id: ActorId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order_index: u32,
    pub duration_months: u8,
}
