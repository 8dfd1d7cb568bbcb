//! Listing synchronization with cache fallback.

use std::{collections::HashMap, sync::Arc};

use lodestone_utils::time::now_secs;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{manager::RepositoryManager, state::RepositorySlot};

impl RepositoryManager {
    /// Refreshes the listing of `id`.
    ///
    /// Returns `true` when a listing is available afterwards, fresh or from cache. A fetch
    /// failure falls back to the cache snapshot without touching `last_updated`; with no
    /// snapshot either, the previous in-memory state is kept and `false` is returned.
    ///
    /// Unknown and disabled repositories return `false` without any network call. Failures
    /// are logged, never returned.
    pub fn sync_one(&self, id: &str) -> bool {
        match self.enabled_slot(id) {
            Some(slot) => self.sync_slot(&slot),
            None => {
                debug!("Skipping sync of unknown or disabled repository '{}'", id);
                false
            }
        }
    }

    fn sync_slot(&self, slot: &RepositorySlot) -> bool {
        let _sync = slot
            .sync_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let repository = slot.read().repository.clone();
        if !repository.enabled {
            return false;
        }

        match self.remote.fetch_listing(&repository) {
            Ok(listing) => {
                if let Err(err) = self.cache.write(&repository.id, &listing) {
                    warn!("Failed to cache listing of '{}': {}", repository.id, err);
                }

                let count = listing.len();
                {
                    let mut entry = slot.write();
                    entry.listing = Arc::new(listing);
                    entry.last_updated = now_secs().max(entry.last_updated + 1);
                }

                if let Err(err) = self.persist() {
                    warn!(
                        "Failed to persist registry after syncing '{}': {}",
                        repository.id, err
                    );
                }

                info!("Synced '{}': {} packages", repository.id, count);
                true
            }
            Err(err) => {
                warn!("Failed to fetch listing of '{}': {}", repository.id, err);

                match self.cache.read(&repository.id) {
                    Some(cached) => {
                        warn!(
                            "Using cached listing of '{}' ({} packages)",
                            repository.id,
                            cached.len()
                        );
                        slot.write().listing = Arc::new(cached);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Syncs every enabled repository. Outcomes are independent per repository.
    pub fn sync_all(&self) -> HashMap<String, bool> {
        let slots: Vec<Arc<RepositorySlot>> = self
            .slots()
            .iter()
            .filter(|s| s.is_enabled())
            .cloned()
            .collect();
        self.sync_slots(slots)
    }

    /// Syncs enabled repositories whose listing is older than the staleness threshold.
    pub fn sync_stale(&self) -> HashMap<String, bool> {
        let now = now_secs();
        let stale_after = self.settings.stale_after_secs;

        let slots: Vec<Arc<RepositorySlot>> = self
            .slots()
            .iter()
            .filter(|s| {
                let entry = s.read();
                entry.repository.enabled && entry.needs_update(now, stale_after)
            })
            .cloned()
            .collect();

        if slots.is_empty() {
            debug!("All repositories are up to date");
        }
        self.sync_slots(slots)
    }

    fn sync_slots(&self, slots: Vec<Arc<RepositorySlot>>) -> HashMap<String, bool> {
        if self.settings.parallel {
            slots
                .par_iter()
                .map(|slot| (slot.id.clone(), self.sync_slot(slot)))
                .collect()
        } else {
            slots
                .iter()
                .map(|slot| (slot.id.clone(), self.sync_slot(slot)))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Barrier, thread};

    use lodestone_config::store::MemoryStore;
    use lodestone_registry::package::PackageRecord;
    use tempfile::tempdir;

    use super::*;
    use crate::test_utils::{manager_with, manager_with_settings};

    fn listing(names: &[&str]) -> Vec<PackageRecord> {
        names
            .iter()
            .map(|n| PackageRecord::new(n.to_lowercase(), *n))
            .collect()
    }

    #[test]
    fn test_sync_success_updates_listing_and_cache() {
        let dir = tempdir().unwrap();
        let (manager, remote) = manager_with(MemoryStore::new(), dir.path());
        remote.set_listing("http://localhost:5000", listing(&["A", "B"]));

        let before = manager.get("default").unwrap().last_updated;
        assert!(manager.sync_one("default"));

        let entry = manager.get("default").unwrap();
        assert!(entry.last_updated > before);
        assert_eq!(*entry.listing, listing(&["A", "B"]));
        assert_eq!(manager.cache().read("default"), Some(listing(&["A", "B"])));
    }

    #[test]
    fn test_repeated_sync_is_idempotent() {
        let dir = tempdir().unwrap();
        let (manager, remote) = manager_with(MemoryStore::new(), dir.path());
        remote.set_listing("http://localhost:5000", listing(&["A"]));

        assert!(manager.sync_one("default"));
        let first = manager.get("default").unwrap();
        assert!(manager.sync_one("default"));
        let second = manager.get("default").unwrap();

        assert_eq!(first.listing, second.listing);
        assert!(second.last_updated > first.last_updated);
    }

    #[test]
    fn test_failed_fetch_falls_back_to_cache() {
        let dir = tempdir().unwrap();
        let (manager, remote) = manager_with(MemoryStore::new(), dir.path());
        remote.set_listing("http://localhost:5000", listing(&["Fresh"]));
        assert!(manager.sync_one("default"));
        let synced_at = manager.get("default").unwrap().last_updated;

        manager
            .cache()
            .write("default", &listing(&["Cached"]))
            .unwrap();
        remote.fail_listing("http://localhost:5000");

        assert!(manager.sync_one("default"));
        let entry = manager.get("default").unwrap();
        assert_eq!(*entry.listing, listing(&["Cached"]));
        assert_eq!(entry.last_updated, synced_at);
    }

    #[test]
    fn test_failed_fetch_without_cache_keeps_state() {
        let dir = tempdir().unwrap();
        let (manager, remote) = manager_with(MemoryStore::new(), dir.path());
        remote.set_listing("http://localhost:5000", listing(&["Kept"]));
        assert!(manager.sync_one("default"));
        std::fs::remove_file(manager.cache().path("default")).unwrap();
        let before = manager.get("default").unwrap();

        remote.fail_listing("http://localhost:5000");

        assert!(!manager.sync_one("default"));
        assert_eq!(manager.get("default").unwrap(), before);
    }

    #[test]
    fn test_disabled_and_unknown_make_no_request() {
        let dir = tempdir().unwrap();
        let (manager, remote) = manager_with(MemoryStore::new(), dir.path());
        manager.set_enabled("default", false).unwrap();

        assert!(!manager.sync_one("default"));
        assert!(!manager.sync_one("missing"));
        assert_eq!(remote.listing_calls(), 0);
    }

    #[test]
    fn test_sync_all_outcomes_are_independent() {
        let dir = tempdir().unwrap();
        let (manager, remote) = manager_with(MemoryStore::new(), dir.path());
        remote.set_listing("http://localhost:5000", listing(&["A"]));
        manager.add("Broken", "http://broken").unwrap();
        manager.add("Other", "http://other").unwrap();
        manager.set_enabled("other", false).unwrap();

        let outcomes = manager.sync_all();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes.get("default"), Some(&true));
        assert_eq!(outcomes.get("broken"), Some(&false));
        assert!(!outcomes.contains_key("other"));
    }

    #[test]
    fn test_sync_all_sequential() {
        let dir = tempdir().unwrap();
        let mut settings = crate::ManagerSettings::default();
        settings.parallel = false;
        let (manager, remote) = manager_with_settings(MemoryStore::new(), dir.path(), settings);
        remote.set_listing("http://localhost:5000", listing(&["A"]));

        assert_eq!(manager.sync_all().get("default"), Some(&true));
    }

    #[test]
    fn test_sync_stale_skips_fresh_repositories() {
        let dir = tempdir().unwrap();
        let (manager, remote) = manager_with(MemoryStore::new(), dir.path());
        remote.set_listing("http://localhost:5000", listing(&["A"]));

        assert_eq!(manager.sync_stale().get("default"), Some(&true));
        let calls = remote.listing_calls();

        assert!(manager.sync_stale().is_empty());
        assert_eq!(remote.listing_calls(), calls);
    }

    #[test]
    fn test_concurrent_syncs_of_one_repository() {
        let dir = tempdir().unwrap();
        let (manager, remote) = manager_with(MemoryStore::new(), dir.path());
        remote.set_listing("http://localhost:5000", listing(&["A", "B", "C"]));
        let manager = Arc::new(manager);
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    manager.sync_one("default")
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(manager.get("default").unwrap().listing.len(), 3);
        assert_eq!(manager.cache().read("default").unwrap().len(), 3);
    }

    #[test]
    fn test_sync_sends_auth_token() {
        let dir = tempdir().unwrap();
        let (manager, remote) = manager_with(MemoryStore::new(), dir.path());
        manager.set_auth_token("default", Some("tok".into())).unwrap();
        remote.set_listing("http://localhost:5000", Vec::new());

        assert!(manager.sync_one("default"));
        assert_eq!(remote.last_token().as_deref(), Some("tok"));
    }
}
