use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DownloadError {
    #[error("Invalid URL: {url}")]
    #[diagnostic(code(lodestone_dl::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Request could not be built: {0}")]
    #[diagnostic(code(lodestone_dl::bad_request))]
    BadRequest(#[source] Box<ureq::Error>),

    #[error(transparent)]
    #[diagnostic(
        code(lodestone_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(lodestone_dl::http_error))]
    HttpError { status: u16, url: String },

    #[error("I/O error: {0}")]
    #[diagnostic(code(lodestone_dl::io))]
    Io(#[from] std::io::Error),

    #[error("Invalid response from server: {reason}")]
    #[diagnostic(code(lodestone_dl::invalid_response))]
    InvalidResponse { reason: String },

    #[error("Download cancelled")]
    #[diagnostic(code(lodestone_dl::cancelled))]
    Cancelled,

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(lodestone_dl::checksum_mismatch),
        help("The downloaded file was removed. The server may be serving a corrupt or outdated artifact")
    )]
    ChecksumMismatch { expected: String, actual: String },
}

impl DownloadError {
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Whether the error happened while reaching the server or reading its response.
    ///
    /// A URL that never became a request is not a transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Io(_))
    }

    /// Whether the request URL itself was unusable.
    pub fn is_bad_url(&self) -> bool {
        matches!(self, Self::InvalidUrl { .. } | Self::BadRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl From<ureq::Error> for DownloadError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Io(io) => Self::Io(io),
            bad @ (ureq::Error::BadUri(_) | ureq::Error::Http(_)) => {
                Self::BadRequest(Box::new(bad))
            }
            other => Self::Network(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_http_error() {
        let err = DownloadError::HttpError {
            status: 404,
            url: "https://example.com/notfound".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("HTTP 404"));
        assert!(msg.contains("https://example.com/notfound"));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_from_ureq_error() {
        let download_err: DownloadError = ureq::Error::ConnectionFailed.into();
        assert!(matches!(download_err, DownloadError::Network(_)));
        assert!(download_err.is_transport());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let download_err: DownloadError = ureq::Error::Io(io).into();
        assert!(matches!(download_err, DownloadError::Io(_)));
    }

    #[test]
    fn test_bad_uri_is_not_transport() {
        let err: DownloadError = ureq::Error::BadUri("http://host/a b".into()).into();
        assert!(matches!(err, DownloadError::BadRequest(_)));
        assert!(err.is_bad_url());
        assert!(!err.is_transport());

        let err = DownloadError::InvalidUrl {
            url: "::".into(),
            source: url::ParseError::RelativeUrlWithoutBase,
        };
        assert!(err.is_bad_url());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_checksum_mismatch_message() {
        let err = DownloadError::ChecksumMismatch {
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert_eq!(err.to_string(), "Checksum mismatch: expected aa, got bb");
    }

    #[test]
    fn test_invalid_response_reason() {
        let err = DownloadError::invalid_response("expected a JSON array");
        assert!(err.to_string().contains("expected a JSON array"));
        assert!(!err.is_transport());
    }
}
