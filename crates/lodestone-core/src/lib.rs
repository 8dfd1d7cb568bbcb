//! Repository management for lodestone.
//!
//! [`RepositoryManager`] is the single owner of repository state. It combines the registry
//! (persisted through a [`KeyValueStore`](lodestone_config::store::KeyValueStore)), the
//! in-memory listings, the cache snapshots and a [`RemoteRepository`] implementation, and
//! exposes:
//! - registry edits: [`add`](RepositoryManager::add), [`remove`](RepositoryManager::remove),
//!   [`set_enabled`](RepositoryManager::set_enabled)
//! - sync with cache fallback: [`sync_one`](RepositoryManager::sync_one),
//!   [`sync_all`](RepositoryManager::sync_all)
//! - [`search`](RepositoryManager::search) over the loaded listings
//! - [`download_artifact`](RepositoryManager::download_artifact) and
//!   [`download_icon`](RepositoryManager::download_icon)
//!
//! All operations block and take `&self`, so the manager can be shared behind an `Arc` and
//! called from worker threads. Syncs of one repository are serialized; different
//! repositories never wait on each other except while the registry itself is edited.
//!
//! [`RemoteRepository`]: lodestone_registry::RemoteRepository

pub mod download;
pub mod error;
pub mod manager;
pub mod registry;
pub mod search;
pub mod state;
pub mod sync;

#[cfg(test)]
pub mod test_utils;

pub use download::{IconOutcome, ProgressFn};
pub use error::LodestoneError;
pub use manager::RepositoryManager;
pub use registry::AddOutcome;
pub use state::{ManagerSettings, RepositoryEntry};

pub type LodestoneResult<T> = std::result::Result<T, LodestoneError>;
