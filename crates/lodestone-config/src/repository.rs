use serde::{Deserialize, Serialize};

/// Id of the repository registered on first run.
pub const DEFAULT_REPOSITORY_ID: &str = "default";

/// Display name of the repository registered on first run.
pub const DEFAULT_REPOSITORY_NAME: &str = "Default Repository";

/// Connection metadata of a remote modpack repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Repository {
    /// Stable slug used as registry key and cache file name.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Base endpoint. Endpoints are built as `url` + fixed suffix.
    pub url: String,

    /// Disabled repositories are skipped by sync, search and download.
    pub enabled: bool,

    /// Opaque bearer credential sent with every request when present.
    pub auth_token: Option<String>,
}

impl Repository {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            enabled: true,
            auth_token: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the bearer token, treating an empty string as no token.
    pub fn bearer_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Whether this repository's id collides with `other_id`.
    pub fn collides_with(&self, other_id: &str) -> bool {
        self.id.eq_ignore_ascii_case(other_id)
    }
}

/// Derives a repository id from a display name.
///
/// The name is lower-cased, every run of characters that are not alphanumeric
/// (spaces, dashes, punctuation) becomes a single underscore, and leading or
/// trailing underscores are dropped. Returns `None` when nothing usable remains.
///
/// # Examples
///
/// ```
/// use lodestone_config::repository::derive_repository_id;
///
/// assert_eq!(derive_repository_id("My Repo").as_deref(), Some("my_repo"));
/// assert_eq!(derive_repository_id("Fabric - Community").as_deref(), Some("fabric_community"));
/// assert_eq!(derive_repository_id("  !! "), None);
/// ```
pub fn derive_repository_id(name: &str) -> Option<String> {
    let mut id = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if pending_separator && !id.is_empty() {
                id.push('_');
            }
            pending_separator = false;
            id.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    (!id.is_empty()).then_some(id)
}

/// Checks an explicitly supplied repository id.
///
/// Explicit ids are kept verbatim but must be usable as a file name: non-empty and
/// made only of alphanumerics, `_` and `-`.
pub fn is_valid_repository_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// The repository registered when no repositories have been persisted yet.
pub fn default_repository(server_url: &str) -> Repository {
    Repository::new(DEFAULT_REPOSITORY_ID, DEFAULT_REPOSITORY_NAME, server_url)
}
