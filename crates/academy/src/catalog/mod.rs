//! Curriculum → Module hierarchy and the module lookups every other component relies on.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{Curriculum, CurriculumDraft, Module, ModuleDraft};
pub use repository::CatalogRepository;
pub use router::catalog_router;
pub use service::ProgramCatalog;
