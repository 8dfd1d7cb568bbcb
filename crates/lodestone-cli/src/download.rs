use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use lodestone_core::{IconOutcome, RepositoryManager};
use lodestone_dl::utils::{filename_from_url, resolve_url};
use lodestone_registry::PackageRecord;
use lodestone_utils::bytes::format_bytes;
use nu_ansi_term::Color::{Cyan, Green, Magenta, Yellow};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    progress::{create_download_job, handle_download_progress},
    utils::{blocking, Colored, Icons},
};

/// File name for a downloaded artifact: the last URL segment, else `{package}.zip`.
fn artifact_file_name(repo_url: &str, record: &PackageRecord) -> String {
    record
        .download_url
        .as_deref()
        .and_then(|url| resolve_url(repo_url, url).ok())
        .and_then(|url| filename_from_url(&url))
        .unwrap_or_else(|| format!("{}.zip", record.id))
}

/// `output` if it names a file, `output/file_name` if it is a directory, else
/// `default_dir/file_name`.
fn output_path(output: Option<&str>, default_dir: &Path, file_name: &str) -> PathBuf {
    match output {
        Some(output) => {
            let path = PathBuf::from(output);
            if path.is_dir() || output.ends_with(std::path::MAIN_SEPARATOR) {
                path.join(file_name)
            } else {
                path
            }
        }
        None => default_dir.join(file_name),
    }
}

pub async fn download_package(
    manager: Arc<RepositoryManager>,
    repo: String,
    package: String,
    output: Option<String>,
    downloads_dir: PathBuf,
) -> miette::Result<()> {
    let (record, repo_url) = {
        let manager = manager.clone();
        let (repo, package) = (repo.clone(), package.clone());
        blocking(move || {
            let record = manager.get_details(&repo, &package)?;
            let repo_url = manager
                .get(&repo)
                .map(|e| e.repository.url)
                .unwrap_or_default();
            Ok((record, repo_url))
        })
        .await?
    };

    let target = output_path(
        output.as_deref(),
        &downloads_dir,
        &artifact_file_name(&repo_url, &record),
    );
    debug!("Downloading {}#{} to {}", repo, package, target.display());

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling download");
                cancel.cancel();
            }
        })
    };

    let pb = create_download_job(&record.name);
    let result = {
        let pb = pb.clone();
        let target = target.clone();
        blocking(move || {
            let on_progress = move |fraction: f64| handle_download_progress(fraction, &pb);
            manager.download_artifact(&repo, &package, &target, Some(&on_progress), Some(cancel))
        })
        .await
    };
    interrupt.abort();
    pb.finish_and_clear();

    let report = result?;
    info!(
        path = %report.path.display(),
        bytes = report.bytes,
        checksum = report.checksum,
        verified = ?report.verified,
        "{} Downloaded {} to {} ({})",
        Colored(Green, Icons::CHECK),
        Colored(Cyan, &record.name),
        report.path.display(),
        Colored(Magenta, format_bytes(report.bytes, 2))
    );

    match report.verified {
        Some(true) => debug!("Checksum verified: {}", report.checksum),
        Some(false) => {
            warn!(
                "{} Checksum does not match the published hash; the file may be corrupt",
                Colored(Yellow, Icons::WARNING)
            )
        }
        None => debug!("No published checksum for {}", record.id),
    }

    Ok(())
}

pub async fn download_icon(
    manager: Arc<RepositoryManager>,
    repo: String,
    package: String,
    output: Option<String>,
    downloads_dir: PathBuf,
) -> miette::Result<()> {
    let target = output_path(
        output.as_deref(),
        &downloads_dir.join("icons"),
        &format!("{repo}_{package}.png"),
    );

    let outcome = {
        let target = target.clone();
        let package = package.clone();
        blocking(move || manager.download_icon(&repo, &package, &target)).await?
    };

    match outcome {
        IconOutcome::Saved {
            path,
            bytes,
        } => {
            info!(
                path = %path.display(),
                bytes = bytes,
                "{} Saved icon to {}",
                Colored(Green, Icons::CHECK),
                path.display()
            );
        }
        IconOutcome::Missing => warn!("No icon available for '{}'", package),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_artifact_file_name() {
        let mut record = PackageRecord::new("atm9", "All The Mods 9");
        assert_eq!(artifact_file_name("http://x", &record), "atm9.zip");

        record.download_url = Some("/files/atm9-1.0.zip".into());
        assert_eq!(artifact_file_name("http://x", &record), "atm9-1.0.zip");

        record.download_url = Some("https://cdn.example/p/pack.mrpack?sig=1".into());
        assert_eq!(artifact_file_name("http://x", &record), "pack.mrpack");
    }

    #[test]
    fn test_output_path() {
        let dir = tempdir().unwrap();
        let default_dir = Path::new("/downloads");

        assert_eq!(
            output_path(None, default_dir, "a.zip"),
            PathBuf::from("/downloads/a.zip")
        );

        let existing = dir.path().to_str().unwrap();
        assert_eq!(
            output_path(Some(existing), default_dir, "a.zip"),
            dir.path().join("a.zip")
        );

        let file = dir.path().join("custom.zip");
        assert_eq!(
            output_path(Some(file.to_str().unwrap()), default_dir, "a.zip"),
            file
        );
    }
}
