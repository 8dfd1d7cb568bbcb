//! Error types for lodestone-core.

use lodestone_config::error::ConfigError;
use lodestone_dl::error::DownloadError;
use lodestone_registry::error::RegistryError;
use lodestone_utils::error::FileSystemError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum LodestoneError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    #[diagnostic(code(lodestone::filesystem), help("Check file permissions and disk space"))]
    FileSystem(#[from] FileSystemError),

    #[error("Repository '{0}' not found or disabled")]
    #[diagnostic(
        code(lodestone::repository_not_found),
        help("Run `lodestone repo list` to see registered repositories")
    )]
    RepositoryNotFound(String),

    #[error("Package '{package}' not found in repository '{repository}'")]
    #[diagnostic(
        code(lodestone::package_not_found),
        help("Run `lodestone sync` to refresh listings, or check the package id")
    )]
    PackageNotFound { repository: String, package: String },

    #[error("Repository '{0}' already exists")]
    #[diagnostic(
        code(lodestone::duplicate_repository),
        help("Choose a different name or remove the existing repository first")
    )]
    DuplicateRepository(String),

    #[error("Invalid repository name: '{0}'")]
    #[diagnostic(
        code(lodestone::invalid_repository_name),
        help("Names need at least one letter or digit; explicit ids may only use letters, digits, `_` and `-`")
    )]
    InvalidRepositoryName(String),

    #[error("Package '{package}' in repository '{repository}' has no download URL")]
    #[diagnostic(code(lodestone::missing_artifact))]
    MissingArtifact { repository: String, package: String },

    #[error("Invalid persisted state under `{key}`: {reason}")]
    #[diagnostic(
        code(lodestone::invalid_state),
        help("Fix or remove the state file to start from a fresh registry")
    )]
    InvalidState { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LodestoneError::PackageNotFound {
            repository: "default".into(),
            package: "atm9".into(),
        };
        assert_eq!(
            err.to_string(),
            "Package 'atm9' not found in repository 'default'"
        );

        let err = LodestoneError::DuplicateRepository("my_repo".into());
        assert_eq!(err.to_string(), "Repository 'my_repo' already exists");
    }
}
