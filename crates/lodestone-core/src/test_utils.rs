//! In-process doubles for manager tests.

use std::{
    collections::HashMap,
    io::{self, Read},
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use lodestone_config::{
    error::ConfigError,
    repository::Repository,
    store::{KeyValueStore, MemoryStore},
};
use lodestone_dl::{error::DownloadError, types::ArtifactStream};
use lodestone_registry::{
    error::{RegistryError, Result},
    package::PackageRecord,
    CacheStore, RemoteRepository,
};
use serde_json::Value;

use crate::{ManagerSettings, RepositoryManager};

/// Body served for one download URL.
#[derive(Clone)]
pub struct FakeArtifact {
    data: Vec<u8>,
    send_length: bool,
    fail: bool,
}

impl FakeArtifact {
    pub fn new(data: &[u8], send_length: bool) -> Self {
        Self {
            data: data.to_vec(),
            send_length,
            fail: false,
        }
    }

    /// Yields the data, then a connection reset.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

struct ResetAfter {
    data: io::Cursor<Vec<u8>>,
}

impl Read for ResetAfter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            n => Ok(n),
        }
    }
}

/// A [`RemoteRepository`] answering from in-memory tables keyed by repository URL.
///
/// Listings of unknown URLs fail with a transport error.
#[derive(Default)]
pub struct FakeRemote {
    listings: Mutex<HashMap<String, Vec<PackageRecord>>>,
    details: Mutex<HashMap<(String, String), PackageRecord>>,
    artifacts: Mutex<HashMap<String, FakeArtifact>>,
    icons: Mutex<HashMap<(String, String), Vec<u8>>>,
    listing_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    last_token: Mutex<Option<String>>,
}

fn unreachable(url: &str) -> RegistryError {
    RegistryError::Transport {
        url: url.to_string(),
        source: DownloadError::Io(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        )),
    }
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listing(&self, url: &str, listing: Vec<PackageRecord>) {
        self.listings
            .lock()
            .unwrap()
            .insert(url.to_string(), listing);
    }

    pub fn fail_listing(&self, url: &str) {
        self.listings.lock().unwrap().remove(url);
    }

    pub fn set_detail(&self, url: &str, record: PackageRecord) {
        self.details
            .lock()
            .unwrap()
            .insert((url.to_string(), record.id.clone()), record);
    }

    pub fn set_artifact(&self, download_url: &str, artifact: FakeArtifact) {
        self.artifacts
            .lock()
            .unwrap()
            .insert(download_url.to_string(), artifact);
    }

    pub fn set_icon(&self, url: &str, package_id: &str, bytes: &[u8]) {
        self.icons
            .lock()
            .unwrap()
            .insert((url.to_string(), package_id.to_string()), bytes.to_vec());
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    /// Bearer token sent with the most recent listing request.
    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }
}

impl RemoteRepository for FakeRemote {
    fn fetch_listing(&self, repo: &Repository) -> Result<Vec<PackageRecord>> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = repo.bearer_token().map(String::from);

        self.listings
            .lock()
            .unwrap()
            .get(&repo.url)
            .cloned()
            .ok_or_else(|| unreachable(&repo.url))
    }

    fn fetch_detail(&self, repo: &Repository, package_id: &str) -> Result<PackageRecord> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);

        self.details
            .lock()
            .unwrap()
            .get(&(repo.url.clone(), package_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                RegistryError::NotFound {
                    url: format!("{}/api/modpacks/{}", repo.url, package_id),
                }
            })
    }

    fn fetch_artifact_stream(
        &self,
        _repo: &Repository,
        download_url: &str,
    ) -> Result<ArtifactStream> {
        let artifact = self
            .artifacts
            .lock()
            .unwrap()
            .get(download_url)
            .cloned()
            .ok_or_else(|| unreachable(download_url))?;

        let length = artifact.send_length.then_some(artifact.data.len() as u64);
        let data = io::Cursor::new(artifact.data);
        Ok(if artifact.fail {
            ArtifactStream::new(
                ResetAfter {
                    data,
                },
                length.map(|l| l * 2),
            )
        } else {
            ArtifactStream::new(data, length)
        })
    }

    fn fetch_icon(&self, repo: &Repository, package_id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .icons
            .lock()
            .unwrap()
            .get(&(repo.url.clone(), package_id.to_string()))
            .cloned())
    }
}

/// A [`MemoryStore`] whose saves start failing after a number of successes.
pub struct FailingStore {
    inner: MemoryStore,
    remaining: usize,
}

impl FailingStore {
    pub fn after(successes: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            remaining: successes,
        }
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.inner.set(key, value);
    }

    fn save(&mut self) -> lodestone_config::error::Result<()> {
        if self.remaining == 0 {
            return Err(ConfigError::IoError(io::Error::other("disk full")));
        }
        self.remaining -= 1;
        self.inner.save()
    }
}

pub fn manager_with(
    store: impl KeyValueStore + 'static,
    dir: &Path,
) -> (RepositoryManager, Arc<FakeRemote>) {
    manager_with_settings(store, dir, ManagerSettings::default())
}

pub fn manager_with_settings(
    store: impl KeyValueStore + 'static,
    dir: &Path,
    settings: ManagerSettings,
) -> (RepositoryManager, Arc<FakeRemote>) {
    let remote = Arc::new(FakeRemote::new());
    let manager = RepositoryManager::load(
        Box::new(store),
        CacheStore::new(dir.join("cache")),
        remote.clone(),
        settings,
    )
    .unwrap();
    (manager, remote)
}
