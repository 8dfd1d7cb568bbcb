use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lodestone_config::repository::Repository;
use lodestone_registry::package::PackageRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Default staleness threshold, in seconds.
pub const DEFAULT_STALE_AFTER_SECS: u64 = 3600;

/// A registered repository together with its synchronized listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryEntry {
    pub repository: Repository,
    /// Seconds since the epoch of the last successful listing fetch. `0` means never.
    pub last_updated: u64,
    /// Current listing. Replaced wholesale by sync, never edited in place.
    pub listing: Arc<Vec<PackageRecord>>,
}

impl RepositoryEntry {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            last_updated: 0,
            listing: Arc::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.repository.id
    }

    /// Whether the listing is older than `stale_after` seconds at time `now`.
    ///
    /// Advisory only; nothing syncs automatically because of it.
    pub fn needs_update(&self, now: u64, stale_after: u64) -> bool {
        now.saturating_sub(self.last_updated) > stale_after
    }
}

/// Per-repository cell of the manager.
///
/// `sync_lock` serializes syncs of one repository; `state` is only held for short reads and
/// wholesale swaps, never across network calls.
pub(crate) struct RepositorySlot {
    pub(crate) id: String,
    pub(crate) sync_lock: Mutex<()>,
    state: RwLock<RepositoryEntry>,
}

impl RepositorySlot {
    pub(crate) fn new(entry: RepositoryEntry) -> Self {
        Self {
            id: entry.repository.id.clone(),
            sync_lock: Mutex::new(()),
            state: RwLock::new(entry),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, RepositoryEntry> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, RepositoryEntry> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn snapshot(&self) -> RepositoryEntry {
        self.read().clone()
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.read().repository.enabled
    }
}

/// Stored form of one repository under the `repositories` state key.
///
/// Written in camel case; the snake case keys of older state files are still read.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersistedRepository {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub url: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default, alias = "auth_token")]
    pub auth_token: Option<String>,

    #[serde(default, alias = "last_updated")]
    pub last_updated: u64,

    #[serde(default, alias = "modpacks")]
    pub listing: Vec<Value>,
}

fn default_enabled() -> bool {
    true
}

impl PersistedRepository {
    pub(crate) fn from_entry(entry: &RepositoryEntry) -> Self {
        let listing = entry
            .listing
            .iter()
            .filter_map(|record| serde_json::to_value(record).ok())
            .collect();

        Self {
            name: Some(entry.repository.name.clone()),
            url: entry.repository.url.clone(),
            enabled: entry.repository.enabled,
            auth_token: entry.repository.auth_token.clone(),
            last_updated: entry.last_updated,
            listing,
        }
    }

    /// Rebuilds the entry for `id`. Listing records that no longer decode are dropped.
    pub(crate) fn into_entry(self, id: &str) -> RepositoryEntry {
        let listing: Vec<PackageRecord> = self
            .listing
            .into_iter()
            .filter_map(|value| {
                PackageRecord::from_value(value)
                    .inspect_err(|err| warn!("Dropping stored package of '{}': {}", id, err))
                    .ok()
            })
            .collect();

        let mut repository = Repository::new(
            id,
            self.name.unwrap_or_else(|| id.to_string()),
            self.url,
        );
        repository.enabled = self.enabled;
        repository.auth_token = self.auth_token.filter(|t| !t.trim().is_empty());

        RepositoryEntry {
            repository,
            last_updated: self.last_updated,
            listing: Arc::new(listing),
        }
    }
}

/// Behaviour knobs of a [`crate::RepositoryManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSettings {
    /// URL of the repository bootstrapped on first run.
    pub server_url: String,
    pub stale_after_secs: u64,
    pub strict_checksum: bool,
    /// Sync repositories on the rayon pool.
    pub parallel: bool,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".to_string(),
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
            strict_checksum: false,
            parallel: true,
        }
    }
}

impl ManagerSettings {
    pub fn from_config(config: &lodestone_config::config::Config) -> Self {
        Self {
            server_url: config.server_url().to_string(),
            stale_after_secs: config.stale_after_secs(),
            strict_checksum: config.strict_checksum(),
            parallel: config.parallel(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_needs_update() {
        let mut entry = RepositoryEntry::new(Repository::new("a", "A", "http://x"));
        assert!(entry.needs_update(100, 3600));

        entry.last_updated = 10_000;
        assert!(!entry.needs_update(13_600, 3600));
        assert!(entry.needs_update(13_601, 3600));
        assert!(!entry.needs_update(5, 3600));
    }

    #[test]
    fn test_persisted_reads_snake_case_keys() {
        let stored: PersistedRepository = serde_json::from_value(json!({
            "name": "Old",
            "url": "http://old",
            "auth_token": "t",
            "last_updated": 42,
            "modpacks": [{"id": "p", "name": "Pack"}, {"name": "no id"}]
        }))
        .unwrap();

        let entry = stored.into_entry("old");
        assert_eq!(entry.repository.name, "Old");
        assert!(entry.repository.enabled);
        assert_eq!(entry.repository.auth_token.as_deref(), Some("t"));
        assert_eq!(entry.last_updated, 42);
        assert_eq!(entry.listing.len(), 1);
    }

    #[test]
    fn test_persisted_writes_camel_case_keys() {
        let mut entry = RepositoryEntry::new(Repository::new("a", "A", "http://x"));
        entry.last_updated = 7;
        entry.listing = Arc::new(vec![PackageRecord::new("p", "Pack")]);

        let value = serde_json::to_value(PersistedRepository::from_entry(&entry)).unwrap();
        assert_eq!(value["lastUpdated"], json!(7));
        assert_eq!(value["authToken"], Value::Null);
        assert_eq!(value["listing"][0]["id"], json!("p"));
    }

    #[test]
    fn test_persisted_name_defaults_to_id() {
        let stored: PersistedRepository =
            serde_json::from_value(json!({"url": "http://x"})).unwrap();
        assert_eq!(stored.into_entry("bare").repository.name, "bare");
    }
}
