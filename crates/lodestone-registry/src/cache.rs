use std::{
    collections::HashSet,
    fs,
    io::ErrorKind,
    path::PathBuf,
};

use lodestone_utils::fs::{safe_remove, write_atomic};
use tracing::{debug, warn};

use crate::{
    error::{ErrorContext, Result},
    package::PackageRecord,
};

const SNAPSHOT_EXTENSION: &str = "json";

/// Per-repository snapshots of the last successfully fetched listing.
///
/// The store is a fallback only: it is written after a successful fetch and read when a
/// fetch fails. Each repository owns exactly one file, `{id}.json`, under the cache root.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Snapshot file of `repo_id`.
    pub fn path(&self, repo_id: &str) -> PathBuf {
        self.root.join(format!("{repo_id}.{SNAPSHOT_EXTENSION}"))
    }

    /// Replaces the snapshot of `repo_id` with `listing`.
    ///
    /// The previous snapshot stays intact until the new one is completely written.
    pub fn write(&self, repo_id: &str, listing: &[PackageRecord]) -> Result<()> {
        let content = serde_json::to_vec(listing)?;
        write_atomic(self.path(repo_id), &content)?;
        debug!("Cached {} packages for '{}'", listing.len(), repo_id);
        Ok(())
    }

    /// Loads the snapshot of `repo_id`.
    ///
    /// Returns `None` if there is no snapshot or it cannot be read or parsed. Failures are logged,
    /// never raised: an unusable snapshot is the same as no snapshot.
    pub fn read(&self, repo_id: &str) -> Option<Vec<PackageRecord>> {
        let path = self.path(repo_id);

        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No cache snapshot for '{}'", repo_id);
                return None;
            }
            Err(err) => {
                warn!("Failed to read cache snapshot {}: {}", path.display(), err);
                return None;
            }
        };

        match serde_json::from_slice::<Vec<PackageRecord>>(&content) {
            Ok(listing) => Some(listing),
            Err(err) => {
                warn!(
                    "Ignoring corrupt cache snapshot {}: {}",
                    path.display(),
                    err
                );
                None
            }
        }
    }

    /// Deletes snapshots whose repository is not in `known_ids`. Returns how many were removed.
    pub fn prune<'a, I>(&self, known_ids: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: HashSet<&str> = known_ids.into_iter().collect();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("reading cache directory {}", self.root.display())
                })
            }
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry
                .with_context(|| format!("reading cache directory {}", self.root.display()))?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if known.contains(stem) {
                continue;
            }

            safe_remove(&path)?;
            debug!("Removed orphaned cache snapshot {}", path.display());
            removed += 1;
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    fn listing() -> Vec<PackageRecord> {
        let mut a = PackageRecord::new("a", "Alpha");
        a.mc_versions = Some(vec!["1.20.1".into()]);
        a.extra.insert("downloads".into(), json!(3));
        vec![a, PackageRecord::new("b", "Beta")]
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let cache = CacheStore::new(dir.path().join("cache").join("repositories"));

        cache.write("default", &listing()).unwrap();

        assert!(cache.path("default").ends_with("default.json"));
        assert_eq!(cache.read("default"), Some(listing()));
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempdir().unwrap();
        let cache = CacheStore::new(dir.path());

        assert_eq!(cache.read("nothing"), None);
    }

    #[test]
    fn test_read_corrupt_is_none() {
        let dir = tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        fs::write(cache.path("broken"), "{\"truncated\": [").unwrap();

        assert_eq!(cache.read("broken"), None);
    }

    #[test]
    fn test_write_replaces_previous_snapshot() {
        let dir = tempdir().unwrap();
        let cache = CacheStore::new(dir.path());

        cache.write("r", &listing()).unwrap();
        cache.write("r", &[]).unwrap();

        assert_eq!(cache.read("r"), Some(Vec::new()));
    }

    #[test]
    fn test_prune_removes_only_orphans() {
        let dir = tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        cache.write("kept", &[]).unwrap();
        cache.write("gone", &[]).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let removed = cache.prune(["kept"]).unwrap();

        assert_eq!(removed, 1);
        assert!(cache.path("kept").exists());
        assert!(!cache.path("gone").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_prune_missing_root() {
        let dir = tempdir().unwrap();
        let cache = CacheStore::new(dir.path().join("absent"));
        assert_eq!(cache.prune(std::iter::empty()).unwrap(), 0);
    }
}
