// src/source.rs
//
// Image byte sources: inline bytes or remote references.
// Remote references are gated on their declared media type, resolved
// against an optional host URL, and fetched over blocking HTTP.

use crate::error::{BatchResizeError, Result};
use std::time::Duration;
use tracing::debug;

/// Media types accepted for remote file references.
pub const ACCEPTED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
];

/// Bound on a single remote fetch. A hung download must not stall the
/// whole batch indefinitely.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One input image of a batch. Consumed once to yield raw bytes.
#[derive(Clone, Debug)]
pub enum ImageSource {
    /// Raw image bytes supplied by the caller
    Inline(Vec<u8>),
    /// Remote reference with its declared media type
    Remote { url: String, media_type: String },
}

impl ImageSource {
    pub fn inline(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Inline(bytes.into())
    }

    pub fn remote(url: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self::Remote {
            url: url.into(),
            media_type: media_type.into(),
        }
    }

    /// Resolve this source to raw bytes.
    ///
    /// Remote sources are media-type gated before any network work,
    /// then resolved against `host_url` and fetched. Inline sources
    /// pass through untouched.
    pub fn resolve(self, host_url: Option<&str>, fetcher: &dyn FetchBytes) -> Result<Vec<u8>> {
        match self {
            Self::Inline(bytes) => Ok(bytes),
            Self::Remote { url, media_type } => {
                if !is_accepted_media_type(&media_type) {
                    return Err(BatchResizeError::unsupported_media_type(media_type));
                }
                let absolute = resolve_url(&url, host_url)?;
                let bytes = fetcher.fetch_bytes(&absolute)?;
                debug!(url = %absolute, bytes = bytes.len(), "downloaded image");
                Ok(bytes)
            }
        }
    }
}

pub fn is_accepted_media_type(media_type: &str) -> bool {
    ACCEPTED_MEDIA_TYPES.contains(&media_type)
}

/// Join a possibly-relative image location with the host base URL.
///
/// Absolute http(s) locations pass through. For relative ones the
/// host's trailing slash and the location's leading slash collapse to
/// a single separator.
pub fn resolve_url(url: &str, host_url: Option<&str>) -> Result<String> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(url.to_string());
    }
    let host = host_url
        .filter(|h| !h.is_empty())
        .ok_or_else(|| BatchResizeError::missing_host_url(url.to_string()))?;
    Ok(format!(
        "{}/{}",
        host.trim_end_matches('/'),
        url.trim_start_matches('/')
    ))
}

/// Byte retrieval seam, pluggable for tests.
pub trait FetchBytes {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher with a bounded per-request timeout.
/// One client is shared across a batch (connection reuse).
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            // Builder only fails on TLS backend misconfiguration
            .expect("failed to construct HTTP client");
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchBytes for HttpFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| BatchResizeError::fetch_failed(url.to_string(), e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| BatchResizeError::fetch_failed(url.to_string(), e.to_string()))?;
        let bytes = response
            .bytes()
            .map_err(|e| BatchResizeError::fetch_failed(url.to_string(), e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoFetch;

    impl FetchBytes for NoFetch {
        fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
            panic!("unexpected fetch of {url}");
        }
    }

    #[test]
    fn test_accepted_media_types() {
        assert!(is_accepted_media_type("image/jpeg"));
        assert!(is_accepted_media_type("image/bmp"));
        assert!(!is_accepted_media_type("image/tiff"));
        assert!(!is_accepted_media_type("text/plain"));
    }

    #[test]
    fn test_resolve_url_absolute_passthrough() {
        let url = resolve_url("https://cdn.example/a.png", Some("https://host.example")).unwrap();
        assert_eq!(url, "https://cdn.example/a.png");
        let url = resolve_url("http://cdn.example/a.png", None).unwrap();
        assert_eq!(url, "http://cdn.example/a.png");
    }

    #[test]
    fn test_resolve_url_relative_joins_host() {
        let url = resolve_url("/files/a.png", Some("https://host.example/")).unwrap();
        assert_eq!(url, "https://host.example/files/a.png");
        let url = resolve_url("files/a.png", Some("https://host.example")).unwrap();
        assert_eq!(url, "https://host.example/files/a.png");
    }

    #[test]
    fn test_resolve_url_relative_without_host_fails() {
        let err = resolve_url("/files/a.png", None).unwrap_err();
        assert!(matches!(err, BatchResizeError::MissingHostUrl { .. }));
        let err = resolve_url("/files/a.png", Some("")).unwrap_err();
        assert!(matches!(err, BatchResizeError::MissingHostUrl { .. }));
    }

    #[test]
    fn test_http_fetcher_builds_with_timeout() {
        // Construction must not fall back to a client without the
        // fetch timeout
        let _fetcher = HttpFetcher::new();
        let _default = HttpFetcher::default();
    }

    #[test]
    fn test_inline_source_skips_fetcher() {
        let source = ImageSource::inline(vec![1, 2, 3]);
        let bytes = source.resolve(None, &NoFetch).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_remote_source_media_type_gate_runs_before_fetch() {
        let source = ImageSource::remote("/files/a.bin", "application/octet-stream");
        // NoFetch panics on any network call, so the gate must fire first
        let err = source
            .resolve(Some("https://host.example"), &NoFetch)
            .unwrap_err();
        assert!(matches!(err, BatchResizeError::UnsupportedMediaType { .. }));
    }
}
