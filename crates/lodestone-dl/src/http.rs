use serde::de::DeserializeOwned;
use tracing::trace;
use ureq::{
    http::{header::CONTENT_LENGTH, Response, StatusCode},
    Body,
};

use crate::{
    error::{DownloadError, Result},
    http_client,
    types::{ArtifactStream, RequestTimeout},
};

pub struct Http;

impl Http {
    /// Sends a GET request, returning the response whatever its status.
    ///
    /// The bearer token, when given, is sent as `Authorization: Bearer <token>`.
    pub fn fetch(
        url: &str,
        bearer: Option<&str>,
        timeout: RequestTimeout,
    ) -> Result<Response<Body>> {
        trace!("GET {url}");
        let mut req = http_client::get(url);

        if let Some(token) = bearer {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }

        let req = match timeout {
            RequestTimeout::Total(t) => req.config().timeout_global(Some(t)).build(),
            RequestTimeout::UntilHeaders(t) => {
                req.config()
                    .timeout_global(None)
                    .timeout_connect(Some(t))
                    .timeout_recv_response(Some(t))
                    .build()
            }
        };

        req.call().map_err(DownloadError::from)
    }

    /// Fetches `url` and decodes a successful response body as JSON.
    ///
    /// # Errors
    ///
    /// * [`DownloadError::HttpError`] on a non-success status
    /// * [`DownloadError::InvalidResponse`] if the body is not valid JSON for `T`
    pub fn json<T: DeserializeOwned>(
        url: &str,
        bearer: Option<&str>,
        timeout: RequestTimeout,
    ) -> Result<T> {
        let resp = Self::fetch(url, bearer, timeout)?;
        ensure_success(&resp, url)?;

        let reader = resp.into_body().into_reader();
        serde_json::from_reader(reader).map_err(|err| {
            if err.is_io() {
                DownloadError::Io(err.into())
            } else {
                DownloadError::invalid_response(format!("malformed JSON from {url}: {err}"))
            }
        })
    }

    /// Fetches `url` into memory. A 404 yields `Ok(None)`.
    pub fn bytes(
        url: &str,
        bearer: Option<&str>,
        timeout: RequestTimeout,
    ) -> Result<Option<Vec<u8>>> {
        let resp = Self::fetch(url, bearer, timeout)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        ensure_success(&resp, url)?;

        let bytes = resp.into_body().read_to_vec()?;
        Ok(Some(bytes))
    }

    /// Opens a streamed GET against `url`.
    pub fn stream(
        url: &str,
        bearer: Option<&str>,
        timeout: RequestTimeout,
    ) -> Result<ArtifactStream> {
        let resp = Self::fetch(url, bearer, timeout)?;
        ensure_success(&resp, url)?;

        let content_length = parse_content_length(&resp);
        Ok(ArtifactStream::new(
            resp.into_body().into_reader(),
            content_length,
        ))
    }
}

fn ensure_success(resp: &Response<Body>, url: &str) -> Result<()> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(DownloadError::HttpError {
            status: resp.status().as_u16(),
            url: url.to_string(),
        })
    }
}

fn parse_content_length(resp: &Response<Body>) -> Option<u64> {
    resp.headers()
        .get(CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|len| len.trim().parse::<u64>().ok())
}
