use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{DownloadError, Result};

/// Extract filename from URL path
pub fn filename_from_url(url: &str) -> Option<String> {
    Url::parse(url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .and_then(|s| {
                percent_decode_str(s)
                    .decode_utf8()
                    .ok()
                    .map(|cow| cow.into_owned())
            })
    })
}

/// Resolves a possibly relative artifact URL against a repository base.
///
/// A URL that already carries a scheme is returned unchanged. Anything else is appended to
/// `base` verbatim, the same way fixed endpoint suffixes are.
///
/// # Errors
///
/// Returns [`DownloadError::InvalidUrl`] if the resulting URL does not parse.
///
/// # Examples
///
/// ```
/// use lodestone_dl::utils::resolve_url;
///
/// assert_eq!(
///     resolve_url("http://repo:5000", "/files/pack.zip").unwrap(),
///     "http://repo:5000/files/pack.zip"
/// );
/// assert_eq!(
///     resolve_url("http://repo:5000", "https://cdn.example/pack.zip").unwrap(),
///     "https://cdn.example/pack.zip"
/// );
/// ```
pub fn resolve_url(base: &str, url: &str) -> Result<String> {
    let url = url.trim();
    let resolved = if has_scheme(url) {
        url.to_string()
    } else {
        format!("{base}{url}")
    };

    Url::parse(&resolved).map_err(|source| {
        DownloadError::InvalidUrl {
            url: resolved.clone(),
            source,
        }
    })?;

    Ok(resolved)
}

fn has_scheme(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("http://x/files/My%20Pack.zip").as_deref(),
            Some("My Pack.zip")
        );
        assert_eq!(filename_from_url("http://x/files/"), None);
        assert_eq!(filename_from_url("not a url"), None);
    }

    #[test]
    fn test_resolve_relative_url_appends_to_base() {
        assert_eq!(
            resolve_url("http://localhost:5000", "/api/modpacks/7/download").unwrap(),
            "http://localhost:5000/api/modpacks/7/download"
        );
    }

    #[test]
    fn test_resolve_absolute_url_is_kept() {
        assert_eq!(
            resolve_url("http://localhost:5000", " https://cdn.example/a.zip ").unwrap(),
            "https://cdn.example/a.zip"
        );
    }

    #[test]
    fn test_resolve_invalid_url() {
        let result = resolve_url("not-a-base", "/a.zip");
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }
}
