use crate::access::ActorId;
use crate::ids::{CurriculumId, ModuleId};
use crate::store::RepositoryError;

use super::domain::{Curriculum, Module};

/// Storage for the curriculum hierarchy.
pub trait CatalogRepository: Send + Sync {
    fn insert_curriculum(&self, curriculum: Curriculum) -> Result<Curriculum, RepositoryError>;
    fn fetch_curriculum(&self, id: &CurriculumId) -> Result<Option<Curriculum>, RepositoryError>;
    /// Fails with `Conflict` when a live module in the same curriculum holds the index.
    fn insert_module(&self, module: Module) -> Result<Module, RepositoryError>;
    fn update_module(&self, module: Module) -> Result<(), RepositoryError>;
    fn fetch_module(&self, id: &ModuleId) -> Result<Option<Module>, RepositoryError>;
    /// Every module in the curriculum, including removed ones, in no particular order.
    fn modules_in(&self, curriculum: &CurriculumId) -> Result<Vec<Module>, RepositoryError>;
    fn modules_owned_by(&self, faculty: &ActorId) -> Result<Vec<Module>, RepositoryError>;
}
