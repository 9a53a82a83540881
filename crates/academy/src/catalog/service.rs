use std::sync::Arc;

use tracing::info;

use crate::access::{AccessPolicy, Actor, Operation, Resource};
use crate::clock::Clock;
use crate::error::ServiceError;
use crate::ids::{CurriculumId, ModuleId};

use super::domain::{Curriculum, CurriculumDraft, Module, ModuleDraft};
use super::repository::CatalogRepository;

/// Read-mostly view over curricula and their ordered modules.
pub struct ProgramCatalog<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    policy: AccessPolicy,
}

impl<S> ProgramCatalog<S>
where
    S: CatalogRepository + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policy: AccessPolicy::standard(),
        }
    }

    pub fn create_curriculum(
        &self,
        actor: &Actor,
        draft: CurriculumDraft,
    ) -> Result<Curriculum, ServiceError> {
        self.policy
            .authorize(actor, Resource::Curriculum, Operation::Create, None)?;

        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ServiceError::validation("curriculum title is required"));
        }

        let curriculum = Curriculum {
            id: CurriculumId::next(),
            title: title.to_string(),
            description: draft.description,
            owner_id: actor.id.clone(),
            created_at: self.clock.now(),
        };

        let stored = self.store.insert_curriculum(curriculum)?;
        info!(curriculum = %stored.id, actor = %actor.id, "curriculum created");
        Ok(stored)
    }

    pub fn create_module(
        &self,
        actor: &Actor,
        curriculum_id: &CurriculumId,
        draft: ModuleDraft,
    ) -> Result<Module, ServiceError> {
        let curriculum = self.curriculum(curriculum_id)?;
        self.policy.authorize(
            actor,
            Resource::Module,
            Operation::Create,
            Some(&curriculum.owner_id),
        )?;

        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ServiceError::validation("module title is required"));
        }
        if draft.duration_months == 0 {
            return Err(ServiceError::validation(
                "module duration must be at least one month",
            ));
        }

        let module = Module {
            id: ModuleId::next(),
            curriculum_id: curriculum_id.clone(),
            faculty_id: draft.faculty_id,
            title: title.to_string(),
            description: draft.description,
            order_index: draft.order_index,
            duration_months: draft.duration_months,
            created_at: self.clock.now(),
            removed_at: None,
        };

        let stored = self.store.insert_module(module)?;
        info!(
            module = %stored.id,
            curriculum = %curriculum_id,
            faculty = %stored.faculty_id,
            "module added to curriculum"
        );
        Ok(stored)
    }

    /// Soft-remove a module. Only the curriculum owner (or an administrator) may do this. Its
    /// cohorts remain in storage but the module no longer resolves.
    pub fn remove_module(&self, actor: &Actor, module_id: &ModuleId) -> Result<Module, ServiceError> {
        let mut module = self.module(module_id)?;
        let curriculum = self.curriculum(&module.curriculum_id)?;
        self.policy.authorize(
            actor,
            Resource::Module,
            Operation::Delete,
            Some(&curriculum.owner_id),
        )?;

        module.removed_at = Some(self.clock.now());
        self.store.update_module(module.clone())?;
        info!(module = %module_id, "module removed");
        Ok(module)
    }

    fn curriculum(&self, curriculum_id: &CurriculumId) -> Result<Curriculum, ServiceError> {
        self.store
            .fetch_curriculum(curriculum_id)?
            .ok_or(ServiceError::NotFound("curriculum"))
    }

    /// Resolve a live module.
    pub fn module(&self, module_id: &ModuleId) -> Result<Module, ServiceError> {
        self.store
            .fetch_module(module_id)?
            .filter(Module::is_live)
            .ok_or(ServiceError::NotFound("module"))
    }

    /// Live modules of a curriculum ordered by their index.
    pub fn curriculum_modules(
        &self,
        curriculum_id: &CurriculumId,
    ) -> Result<Vec<Module>, ServiceError> {
        self.store
            .fetch_curriculum(curriculum_id)?
            .ok_or(ServiceError::NotFound("curriculum"))?;

        let mut modules: Vec<Module> = self
            .store
            .modules_in(curriculum_id)?
            .into_iter()
            .filter(Module::is_live)
            .collect();
        modules.sort_by_key(|module| module.order_index);
        Ok(modules)
    }
}
