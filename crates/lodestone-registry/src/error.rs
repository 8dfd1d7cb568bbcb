//! Error types for the registry crate.
//!
//! Every failure of the repository client maps to one [`FailureKind`], so callers can apply
//! their fallback policy without matching on transport details.

use lodestone_dl::error::DownloadError;
use lodestone_utils::error::FileSystemError;
use miette::Diagnostic;
use thiserror::Error;

/// Coarse classification of a [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The repository could not be reached or the exchange broke off (DNS, connect, TLS, timeout).
    Transport,
    /// The repository answered, but not with what the protocol requires.
    InvalidResponse,
    /// The repository reported that the requested resource does not exist.
    NotFound,
    /// A local failure: filesystem, serialization, or a request URL that could not be formed.
    Local,
}

#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Failed to reach {url}: {source}")]
    #[diagnostic(
        code(lodestone_registry::transport),
        help("Check your network connection and the repository URL")
    )]
    Transport {
        url: String,
        #[source]
        source: DownloadError,
    },

    #[error("Invalid response from {url}: {reason}")]
    #[diagnostic(
        code(lodestone_registry::invalid_response),
        help("The repository server does not speak the expected modpack API")
    )]
    InvalidResponse { url: String, reason: String },

    #[error("Cannot request {url}: {source}")]
    #[diagnostic(
        code(lodestone_registry::invalid_url),
        help("Check the repository URL and the package id")
    )]
    InvalidUrl {
        url: String,
        #[source]
        source: DownloadError,
    },

    #[error("Not found: {url}")]
    #[diagnostic(code(lodestone_registry::not_found))]
    NotFound { url: String },

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(lodestone_registry::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(
        code(lodestone_registry::json),
        help("The cached listing could not be serialized")
    )]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(lodestone_registry::filesystem))]
    FileSystem(#[from] FileSystemError),
}

impl RegistryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport { .. } => FailureKind::Transport,
            Self::InvalidResponse { .. } => FailureKind::InvalidResponse,
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::InvalidUrl { .. }
            | Self::IoError { .. }
            | Self::JsonError(_)
            | Self::FileSystem(_) => FailureKind::Local,
        }
    }

    pub(crate) fn invalid_response(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Classifies a transport-layer error raised while talking to `url`.
    pub(crate) fn from_download(url: &str, err: DownloadError) -> Self {
        match err {
            DownloadError::HttpError {
                status: 404, ..
            } => {
                Self::NotFound {
                    url: url.to_string(),
                }
            }
            DownloadError::HttpError {
                status, ..
            } => Self::invalid_response(url, format!("unexpected HTTP status {status}")),
            DownloadError::InvalidResponse {
                reason,
            } => Self::invalid_response(url, reason),
            source if source.is_bad_url() => {
                Self::InvalidUrl {
                    url: url.to_string(),
                    source,
                }
            }
            source => {
                Self::Transport {
                    url: url.to_string(),
                    source,
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            RegistryError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_classification() {
        let not_found = RegistryError::from_download(
            "http://x/api/modpacks/1",
            DownloadError::HttpError {
                status: 404,
                url: "http://x/api/modpacks/1".into(),
            },
        );
        assert_eq!(not_found.kind(), FailureKind::NotFound);

        let server_error = RegistryError::from_download(
            "http://x/api/modpacks",
            DownloadError::HttpError {
                status: 503,
                url: "http://x/api/modpacks".into(),
            },
        );
        assert_eq!(server_error.kind(), FailureKind::InvalidResponse);
        assert!(server_error.to_string().contains("503"));
    }

    #[test]
    fn test_transport_classification() {
        let err = RegistryError::from_download(
            "http://x",
            DownloadError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "timed out",
            )),
        );
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[test]
    fn test_unusable_url_is_local() {
        let source = lodestone_dl::utils::resolve_url("not-a-base", "/a.zip").unwrap_err();
        let err = RegistryError::from_download("/a.zip", source);
        assert_eq!(err.kind(), FailureKind::Local);
        assert!(err.to_string().contains("Cannot request"));
    }

    #[test]
    fn test_error_context() {
        let io: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = io.with_context(|| "reading cache".into()).unwrap_err();

        assert_eq!(err.kind(), FailureKind::Local);
        assert_eq!(err.to_string(), "Error while reading cache: denied");
    }
}
