use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use lodestone_config::{repository::default_repository, store::KeyValueStore};
use lodestone_registry::{CacheStore, RemoteRepository};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    error::LodestoneError,
    state::{ManagerSettings, PersistedRepository, RepositoryEntry, RepositorySlot},
    LodestoneResult,
};

/// State key holding the registry.
pub const REPOSITORIES_KEY: &str = "repositories";

/// State key holding the bootstrap server URL.
pub const SERVER_URL_KEY: &str = "server_url";

/// Owner of all repository state: registry, listings, cache and remote access.
///
/// Every operation takes `&self`. The manager is `Send + Sync` and is meant to be shared
/// behind an `Arc` between the caller's control thread and its workers.
pub struct RepositoryManager {
    slots: RwLock<Vec<Arc<RepositorySlot>>>,
    /// Serializes add, remove and edits of the registry.
    registry_lock: Mutex<()>,
    store: Mutex<Box<dyn KeyValueStore>>,
    pub(crate) cache: CacheStore,
    pub(crate) remote: Arc<dyn RemoteRepository>,
    pub(crate) settings: ManagerSettings,
}

impl RepositoryManager {
    /// Loads the registry from `store`.
    ///
    /// When no repositories were persisted yet, a default repository pointing at the stored
    /// `server_url` (or [`ManagerSettings::server_url`]) is registered and saved. No network
    /// call is made.
    pub fn load(
        store: Box<dyn KeyValueStore>,
        cache: CacheStore,
        remote: Arc<dyn RemoteRepository>,
        settings: ManagerSettings,
    ) -> LodestoneResult<Self> {
        let manager = Self {
            slots: RwLock::new(Vec::new()),
            registry_lock: Mutex::new(()),
            store: Mutex::new(store),
            cache,
            remote,
            settings,
        };

        let entries = manager.read_persisted()?;
        if entries.is_empty() {
            manager.bootstrap()?;
        } else {
            debug!("Loaded {} repositories", entries.len());
            let mut slots = manager.slots_mut();
            slots.extend(entries.into_iter().map(|e| Arc::new(RepositorySlot::new(e))));
        }

        Ok(manager)
    }

    fn read_persisted(&self) -> LodestoneResult<Vec<RepositoryEntry>> {
        let value = self.store().get(REPOSITORIES_KEY);

        let map = match value {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(LodestoneError::InvalidState {
                    key: REPOSITORIES_KEY,
                    reason: format!("expected an object, found {other}"),
                })
            }
        };

        let entries = map
            .into_iter()
            .filter_map(|(id, value)| {
                match serde_json::from_value::<PersistedRepository>(value) {
                    Ok(stored) => Some(stored.into_entry(&id)),
                    Err(err) => {
                        warn!("Skipping unreadable repository '{}': {}", id, err);
                        None
                    }
                }
            })
            .collect();

        Ok(entries)
    }

    fn bootstrap(&self) -> LodestoneResult<()> {
        let server_url = {
            let store = self.store();
            store
                .get(SERVER_URL_KEY)
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_else(|| self.settings.server_url.clone())
        };

        let repository = default_repository(&server_url);
        info!(
            "Registering default repository '{}' at {}",
            repository.id, server_url
        );
        self.slots_mut()
            .push(Arc::new(RepositorySlot::new(RepositoryEntry::new(repository))));

        let mut store = self.store();
        store.set(SERVER_URL_KEY, Value::String(server_url));
        self.write_registry(store.as_mut())
    }

    /// Rewrites the whole registry into the store and saves it.
    pub(crate) fn persist(&self) -> LodestoneResult<()> {
        let mut store = self.store();
        self.write_registry(store.as_mut())
    }

    fn write_registry(&self, store: &mut dyn KeyValueStore) -> LodestoneResult<()> {
        let mut map = Map::new();
        for slot in self.slots().iter() {
            let stored = PersistedRepository::from_entry(&slot.read());
            let value = serde_json::to_value(stored).map_err(|err| {
                LodestoneError::InvalidState {
                    key: REPOSITORIES_KEY,
                    reason: err.to_string(),
                }
            })?;
            map.insert(slot.id.clone(), value);
        }

        store.set(REPOSITORIES_KEY, Value::Object(map));
        store.save()?;
        Ok(())
    }

    fn store(&self) -> MutexGuard<'_, Box<dyn KeyValueStore>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn slots(&self) -> RwLockReadGuard<'_, Vec<Arc<RepositorySlot>>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn slots_mut(&self) -> RwLockWriteGuard<'_, Vec<Arc<RepositorySlot>>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn registry_guard(&self) -> MutexGuard<'_, ()> {
        self.registry_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn slot(&self, id: &str) -> Option<Arc<RepositorySlot>> {
        self.slots().iter().find(|s| s.id == id).cloned()
    }

    /// The slot of `id` if it exists and is enabled.
    pub(crate) fn enabled_slot(&self, id: &str) -> Option<Arc<RepositorySlot>> {
        self.slot(id).filter(|s| s.is_enabled())
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Deletes cache snapshots of repositories that are no longer registered.
    pub fn prune_cache(&self) -> LodestoneResult<usize> {
        let ids: Vec<String> = self.slots().iter().map(|s| s.id.clone()).collect();
        let removed = self.cache.prune(ids.iter().map(String::as_str))?;
        if removed > 0 {
            info!("Removed {} orphaned cache snapshots", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use lodestone_config::{
        repository::{DEFAULT_REPOSITORY_ID, DEFAULT_REPOSITORY_NAME},
        store::{JsonFileStore, MemoryStore},
    };
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::test_utils::{manager_with, FakeRemote};

    #[test]
    fn test_bootstrap_registers_default_repository() {
        let dir = tempdir().unwrap();
        let (manager, _remote) = manager_with(MemoryStore::new(), dir.path());

        let repos = manager.list();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].repository.id, DEFAULT_REPOSITORY_ID);
        assert_eq!(repos[0].repository.name, DEFAULT_REPOSITORY_NAME);
        assert_eq!(repos[0].repository.url, "http://localhost:5000");
        assert_eq!(repos[0].last_updated, 0);
    }

    #[test]
    fn test_bootstrap_uses_stored_server_url() {
        let dir = tempdir().unwrap();
        let mut store = MemoryStore::new();
        store.set(SERVER_URL_KEY, json!("http://packs.example:8080"));

        let (manager, _remote) = manager_with(store, dir.path());
        let entry = manager.get(DEFAULT_REPOSITORY_ID).unwrap();
        assert_eq!(entry.repository.url, "http://packs.example:8080");
    }

    #[test]
    fn test_registry_survives_reload() {
        let dir = tempdir().unwrap();
        let state = dir.path().join("state.json");
        let cache = CacheStore::new(dir.path().join("cache"));

        {
            let manager = RepositoryManager::load(
                Box::new(JsonFileStore::open(&state).unwrap()),
                cache.clone(),
                Arc::new(FakeRemote::new()),
                ManagerSettings::default(),
            )
            .unwrap();
            manager.add("Zeta Packs", "http://zeta").unwrap();
            manager.add("Alpha Packs", "http://alpha").unwrap();
            manager.set_auth_token("zeta_packs", Some("tok".into())).unwrap();
        }

        let reloaded = RepositoryManager::load(
            Box::new(JsonFileStore::open(&state).unwrap()),
            cache,
            Arc::new(FakeRemote::new()),
            ManagerSettings::default(),
        )
        .unwrap();

        let ids: Vec<String> = reloaded
            .list()
            .into_iter()
            .map(|e| e.repository.id)
            .collect();
        assert_eq!(ids, vec!["default", "zeta_packs", "alpha_packs"]);
        assert_eq!(
            reloaded
                .get("zeta_packs")
                .unwrap()
                .repository
                .auth_token
                .as_deref(),
            Some("tok")
        );
    }

    #[test]
    fn test_invalid_repositories_value_is_an_error() {
        let dir = tempdir().unwrap();
        let mut store = MemoryStore::new();
        store.set(REPOSITORIES_KEY, json!(["not", "a", "map"]));

        let result = RepositoryManager::load(
            Box::new(store),
            CacheStore::new(dir.path()),
            Arc::new(FakeRemote::new()),
            ManagerSettings::default(),
        );
        assert!(matches!(result, Err(LodestoneError::InvalidState { .. })));
    }

    #[test]
    fn test_prune_cache_keeps_registered() {
        let dir = tempdir().unwrap();
        let (manager, _remote) = manager_with(MemoryStore::new(), dir.path());
        manager.cache().write(DEFAULT_REPOSITORY_ID, &[]).unwrap();
        manager.cache().write("removed_repo", &[]).unwrap();

        assert_eq!(manager.prune_cache().unwrap(), 1);
        assert!(manager.cache().read(DEFAULT_REPOSITORY_ID).is_some());
    }
}
