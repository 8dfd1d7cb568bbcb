use std::time::Duration;

use lodestone_config::repository::Repository;
use lodestone_dl::{
    http::Http,
    types::{ArtifactStream, RequestTimeout},
    utils::resolve_url,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{RegistryError, Result},
    package::{json_kind, PackageRecord},
};

/// Default timeout for listing, detail and icon requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const MODPACKS_ENDPOINT: &str = "/api/modpacks";

/// Characters escaped in a single path segment, `/` and `%` included.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// One round trip per operation against a single repository.
///
/// Implementations never retry. Every failure is classified by [`RegistryError::kind`].
pub trait RemoteRepository: Send + Sync {
    /// `GET {base}/api/modpacks`. The body must be a JSON array of package records.
    fn fetch_listing(&self, repo: &Repository) -> Result<Vec<PackageRecord>>;

    /// `GET {base}/api/modpacks/{package_id}`. The body must be a JSON object with an `id`.
    fn fetch_detail(&self, repo: &Repository, package_id: &str) -> Result<PackageRecord>;

    /// Opens a streamed GET against `download_url`, resolved against the repository base
    /// when it has no scheme.
    fn fetch_artifact_stream(&self, repo: &Repository, download_url: &str)
        -> Result<ArtifactStream>;

    /// `GET {base}/api/modpacks/{package_id}/icon`. `Ok(None)` when the server answers 404.
    fn fetch_icon(&self, repo: &Repository, package_id: &str) -> Result<Option<Vec<u8>>>;
}

/// [`RemoteRepository`] over HTTP, using the shared agent from `lodestone-dl`.
#[derive(Debug, Clone)]
pub struct HttpRepositoryClient {
    timeout: Duration,
}

impl Default for HttpRepositoryClient {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl HttpRepositoryClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
        }
    }

    fn get_json(&self, repo: &Repository, url: &str) -> Result<Value> {
        Http::json(
            url,
            repo.bearer_token(),
            RequestTimeout::Total(self.timeout),
        )
        .map_err(|err| RegistryError::from_download(url, err))
    }
}

fn listing_url(repo: &Repository) -> String {
    format!("{}{MODPACKS_ENDPOINT}", repo.url)
}

fn detail_url(repo: &Repository, package_id: &str) -> String {
    let segment = utf8_percent_encode(package_id, SEGMENT);
    format!("{}{MODPACKS_ENDPOINT}/{segment}", repo.url)
}

fn icon_url(repo: &Repository, package_id: &str) -> String {
    format!("{}/icon", detail_url(repo, package_id))
}

/// Validates a listing body. Any element that is not a record makes the whole listing invalid.
fn parse_listing(url: &str, body: Value) -> Result<Vec<PackageRecord>> {
    let Value::Array(items) = body else {
        return Err(RegistryError::invalid_response(
            url,
            format!("expected a JSON array, got {}", json_kind(&body)),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            PackageRecord::from_value(item).map_err(|reason| {
                RegistryError::invalid_response(url, format!("listing entry {idx}: {reason}"))
            })
        })
        .collect()
}

impl RemoteRepository for HttpRepositoryClient {
    fn fetch_listing(&self, repo: &Repository) -> Result<Vec<PackageRecord>> {
        let url = listing_url(repo);
        let body = self.get_json(repo, &url)?;
        let listing = parse_listing(&url, body)?;
        debug!("Fetched {} packages from {}", listing.len(), url);
        Ok(listing)
    }

    fn fetch_detail(&self, repo: &Repository, package_id: &str) -> Result<PackageRecord> {
        let url = detail_url(repo, package_id);
        let body = self.get_json(repo, &url)?;
        PackageRecord::from_value(body).map_err(|reason| RegistryError::invalid_response(&url, reason))
    }

    fn fetch_artifact_stream(
        &self,
        repo: &Repository,
        download_url: &str,
    ) -> Result<ArtifactStream> {
        let url = resolve_url(&repo.url, download_url)
            .map_err(|err| RegistryError::from_download(download_url, err))?;

        Http::stream(
            &url,
            repo.bearer_token(),
            RequestTimeout::UntilHeaders(self.timeout),
        )
        .map_err(|err| RegistryError::from_download(&url, err))
    }

    fn fetch_icon(&self, repo: &Repository, package_id: &str) -> Result<Option<Vec<u8>>> {
        let url = icon_url(repo, package_id);
        Http::bytes(
            &url,
            repo.bearer_token(),
            RequestTimeout::Total(self.timeout),
        )
        .map_err(|err| RegistryError::from_download(&url, err))
    }
}
