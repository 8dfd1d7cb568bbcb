//! Registry mutations: adding, removing and editing repositories.
//!
//! All mutations are serialized by the manager's registry lock and persisted before they
//! return. A mutation whose persist fails is rolled back in memory.

use std::sync::Arc;

use lodestone_config::repository::{derive_repository_id, is_valid_repository_id, Repository};
use tracing::{debug, info};

use crate::{
    error::LodestoneError,
    manager::RepositoryManager,
    state::{RepositoryEntry, RepositorySlot},
    LodestoneResult,
};

/// Result of a successful [`RepositoryManager::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    pub id: String,
    /// Whether the initial sync produced a listing. The repository is registered either way.
    pub synced: bool,
}

impl RepositoryManager {
    /// Registers a repository, deriving its id from `name`, and attempts an initial sync.
    ///
    /// # Errors
    ///
    /// * [`LodestoneError::InvalidRepositoryName`] if no id can be derived from `name`
    /// * [`LodestoneError::DuplicateRepository`] if the id collides with a registered one
    pub fn add(&self, name: &str, url: &str) -> LodestoneResult<AddOutcome> {
        self.register(None, name, url, None)
    }

    /// Registers a repository under an explicit `id` and attempts an initial sync.
    pub fn add_with_id(&self, id: &str, name: &str, url: &str) -> LodestoneResult<AddOutcome> {
        self.register(Some(id), name, url, None)
    }

    /// Registers a repository and attempts an initial sync.
    ///
    /// The id is derived from `name` unless given. `auth_token` is in place before the
    /// initial sync, so a private repository can be added in one step.
    pub fn register(
        &self,
        id: Option<&str>,
        name: &str,
        url: &str,
        auth_token: Option<String>,
    ) -> LodestoneResult<AddOutcome> {
        let id = match id {
            Some(id) if is_valid_repository_id(id) => id.to_string(),
            Some(id) => return Err(LodestoneError::InvalidRepositoryName(id.to_string())),
            None => {
                derive_repository_id(name)
                    .ok_or_else(|| LodestoneError::InvalidRepositoryName(name.to_string()))?
            }
        };

        {
            let _guard = self.registry_guard();

            if let Some(existing) = self
                .slots()
                .iter()
                .find(|s| s.read().repository.collides_with(&id))
            {
                return Err(LodestoneError::DuplicateRepository(existing.id.clone()));
            }

            let mut repository = Repository::new(&id, name.trim(), url.trim());
            repository.auth_token = auth_token.filter(|t| !t.trim().is_empty());
            self.slots_mut()
                .push(Arc::new(RepositorySlot::new(RepositoryEntry::new(repository))));

            if let Err(err) = self.persist() {
                self.slots_mut().retain(|s| s.id != id);
                return Err(err);
            }
            info!("Added repository '{}' ({})", id, url.trim());
        }

        let synced = self.sync_one(&id);
        Ok(AddOutcome {
            id,
            synced,
        })
    }

    /// Unregisters `id`. Returns `false` if it was not registered.
    ///
    /// The cache snapshot is left in place; [`RepositoryManager::prune_cache`] removes it.
    pub fn remove(&self, id: &str) -> LodestoneResult<bool> {
        let _guard = self.registry_guard();

        let removed = {
            let mut slots = self.slots_mut();
            match slots.iter().position(|s| s.id == id) {
                Some(index) => (index, slots.remove(index)),
                None => {
                    debug!("Repository '{}' is not registered", id);
                    return Ok(false);
                }
            }
        };

        if let Err(err) = self.persist() {
            let (index, slot) = removed;
            self.slots_mut().insert(index, slot);
            return Err(err);
        }

        info!("Removed repository '{}'", id);
        Ok(true)
    }

    /// Snapshot of `id`, enabled or not.
    pub fn get(&self, id: &str) -> Option<RepositoryEntry> {
        self.slot(id).map(|s| s.snapshot())
    }

    /// Snapshots of all repositories in registry order.
    pub fn list(&self) -> Vec<RepositoryEntry> {
        self.slots().iter().map(|s| s.snapshot()).collect()
    }

    /// Snapshots of enabled repositories in registry order.
    pub fn list_enabled(&self) -> Vec<RepositoryEntry> {
        self.slots()
            .iter()
            .map(|s| s.snapshot())
            .filter(|e| e.repository.enabled)
            .collect()
    }

    /// Enables or disables `id`.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> LodestoneResult<()> {
        self.edit(id, |repo| {
            let previous = repo.enabled;
            repo.enabled = enabled;
            move |repo: &mut Repository| repo.enabled = previous
        })?;
        info!(
            "Repository '{}' {}",
            id,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Sets or clears the bearer token of `id`. A blank token clears it.
    pub fn set_auth_token(&self, id: &str, token: Option<String>) -> LodestoneResult<()> {
        let token = token.filter(|t| !t.trim().is_empty());
        self.edit(id, |repo| {
            let previous = std::mem::replace(&mut repo.auth_token, token);
            move |repo: &mut Repository| repo.auth_token = previous
        })
    }

    /// Applies `change` to `id` and persists, undoing it if persisting fails.
    fn edit<F, U>(&self, id: &str, change: F) -> LodestoneResult<()>
    where
        F: FnOnce(&mut Repository) -> U,
        U: FnOnce(&mut Repository),
    {
        let _guard = self.registry_guard();
        let slot = self
            .slot(id)
            .ok_or_else(|| LodestoneError::RepositoryNotFound(id.to_string()))?;

        let undo = change(&mut slot.write().repository);

        if let Err(err) = self.persist() {
            undo(&mut slot.write().repository);
            return Err(err);
        }
        Ok(())
    }
}
