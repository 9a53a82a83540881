use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Allocate the next identifier from a process-wide sequence. Identifiers are
            /// never reused within a process.
            pub fn next() -> Self {
                static SEQUENCE: AtomicU64 = AtomicU64::new(1);
                let id = SEQUENCE.fetch_add(1, Ordering::Relaxed);
                Self(format!(concat!($prefix, "-{:06}"), id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Identifier for a curriculum.
    CurriculumId,
    "cur"
);
identifier!(
    /// Identifier for a module within a curriculum.
    ModuleId,
    "mod"
);
identifier!(
    /// Identifier for one scheduled run of a module.
    CohortId,
    "coh"
);
identifier!(EnrollmentId, "enr");
identifier!(AssessmentId, "asm");
identifier!(QuestionId, "q");
identifier!(SubmissionId, "sub");
