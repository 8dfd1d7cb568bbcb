//! Package details, artifact downloads and icons.

use std::path::{Path, PathBuf};

use lodestone_dl::{download::Download, types::DownloadReport};
use lodestone_registry::{error::FailureKind, package::PackageRecord};
use lodestone_utils::fs::write_atomic;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{error::LodestoneError, manager::RepositoryManager, LodestoneResult};

/// Callback receiving the completed fraction of a download, in `0.0..=1.0`.
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Result of [`RepositoryManager::download_icon`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconOutcome {
    Saved { path: PathBuf, bytes: usize },
    /// The repository has no icon for the package.
    Missing,
}

impl RepositoryManager {
    /// Details of `package_id` in `repo_id`.
    ///
    /// A record already in the in-memory listing is returned without a network call.
    ///
    /// # Errors
    ///
    /// * [`LodestoneError::RepositoryNotFound`] if the repository is unknown or disabled
    /// * [`LodestoneError::PackageNotFound`] if the server does not know the package
    /// * [`LodestoneError::Registry`] on transport or protocol failures
    pub fn get_details(&self, repo_id: &str, package_id: &str) -> LodestoneResult<PackageRecord> {
        let slot = self
            .enabled_slot(repo_id)
            .ok_or_else(|| LodestoneError::RepositoryNotFound(repo_id.to_string()))?;

        let (repository, listing) = {
            let entry = slot.read();
            (entry.repository.clone(), entry.listing.clone())
        };

        if let Some(record) = listing.iter().find(|r| r.id == package_id) {
            debug!("Found '{}' in local listing of '{}'", package_id, repo_id);
            return Ok(record.clone());
        }

        self.remote
            .fetch_detail(&repository, package_id)
            .map_err(|err| {
                match err.kind() {
                    FailureKind::NotFound => {
                        LodestoneError::PackageNotFound {
                            repository: repo_id.to_string(),
                            package: package_id.to_string(),
                        }
                    }
                    _ => err.into(),
                }
            })
    }

    /// Downloads the artifact of `package_id` to `target`.
    ///
    /// `on_progress` runs on the calling thread. When the response carries a non-zero
    /// `Content-Length` it receives the fraction after every chunk; it always receives a
    /// final `1.0` on success. A checksum mismatch is logged and reported through
    /// [`DownloadReport::verified`] unless strict checksums are configured.
    ///
    /// On failure or cancellation nothing is left at `target`, and an existing file there is
    /// not modified.
    pub fn download_artifact(
        &self,
        repo_id: &str,
        package_id: &str,
        target: &Path,
        on_progress: Option<ProgressFn<'_>>,
        cancel: Option<CancellationToken>,
    ) -> LodestoneResult<DownloadReport> {
        let details = self.get_details(repo_id, package_id)?;

        let Some(download_url) = details.download_url.as_deref() else {
            return Err(LodestoneError::MissingArtifact {
                repository: repo_id.to_string(),
                package: package_id.to_string(),
            });
        };

        let repository = self
            .enabled_slot(repo_id)
            .map(|s| s.read().repository.clone())
            .ok_or_else(|| LodestoneError::RepositoryNotFound(repo_id.to_string()))?;

        info!("Downloading '{}' from '{}'", package_id, repo_id);
        let stream = self
            .remote
            .fetch_artifact_stream(&repository, download_url)?;

        let mut download = Download::new(target)
            .expected_checksum(details.file_hash.as_deref())
            .strict_checksum(self.settings.strict_checksum);

        if let Some(token) = cancel {
            download = download.cancellation(token);
        }
        if let Some(on_progress) = on_progress {
            download = download.progress(move |progress| {
                if let Some(fraction) = progress.fraction() {
                    on_progress(fraction);
                }
            });
        }

        let report = download.execute(stream)?;
        info!(
            "Downloaded '{}' to {} ({} bytes)",
            package_id,
            report.path.display(),
            report.bytes
        );
        Ok(report)
    }

    /// Saves the icon of `package_id` to `target`.
    ///
    /// A repository without an icon for the package yields [`IconOutcome::Missing`].
    pub fn download_icon(
        &self,
        repo_id: &str,
        package_id: &str,
        target: &Path,
    ) -> LodestoneResult<IconOutcome> {
        let repository = self
            .enabled_slot(repo_id)
            .map(|s| s.read().repository.clone())
            .ok_or_else(|| LodestoneError::RepositoryNotFound(repo_id.to_string()))?;

        let Some(bytes) = self.remote.fetch_icon(&repository, package_id)? else {
            debug!("No icon for '{}' in '{}'", package_id, repo_id);
            return Ok(IconOutcome::Missing);
        };

        write_atomic(target, &bytes)?;
        Ok(IconOutcome::Saved {
            path: target.to_path_buf(),
            bytes: bytes.len(),
        })
    }
}
