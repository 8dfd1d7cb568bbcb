//! Remote repository access for lodestone.
//!
//! This crate holds everything that talks to, or mirrors, a single remote modpack
//! repository:
//! - [`PackageRecord`]: a package entry as served by `GET {base}/api/modpacks`
//! - [`RemoteRepository`] and its HTTP implementation [`HttpRepositoryClient`]
//! - [`CacheStore`]: the per-repository snapshot of the last good listing
//!
//! # Example
//!
//! ```no_run
//! use lodestone_config::repository::Repository;
//! use lodestone_registry::{CacheStore, HttpRepositoryClient, RemoteRepository};
//!
//! fn refresh(repo: &Repository, cache: &CacheStore) -> lodestone_registry::Result<usize> {
//!     let listing = HttpRepositoryClient::default().fetch_listing(repo)?;
//!     cache.write(&repo.id, &listing)?;
//!     Ok(listing.len())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod package;

pub use cache::CacheStore;
pub use client::{HttpRepositoryClient, RemoteRepository};
pub use error::{ErrorContext, FailureKind, RegistryError, Result};
pub use package::{MatchedPackage, PackageRecord, RepositoryRef};
