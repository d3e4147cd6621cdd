//! Request identity and stored response payload types.

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Normalized request identity used as the cache key.
///
/// Construction resolves relative paths against a configured origin and
/// strips the URL fragment, so that two requests for the same resource
/// always produce the same key. Query strings are preserved — `/a?v=1` and
/// `/a?v=2` are distinct assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    /// Resolves a raw URL against an origin into a normalized cache key.
    ///
    /// Absolute `http://`/`https://` URLs are taken as-is; URLs starting
    /// with `/` are joined onto the origin; bare relative paths are treated
    /// as rooted at the origin. The fragment (`#...`) is dropped in all
    /// cases.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the URL is empty after stripping
    /// the fragment.
    pub fn resolve(origin: &str, raw: &str) -> Result<Self> {
        // Fragments never reach the server, so they are not part of identity.
        let raw = raw.split('#').next().unwrap_or("");
        if raw.is_empty() {
            return Err(Error::InvalidUrl(raw.to_string()));
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Self(raw.to_string()));
        }

        let origin = origin.trim_end_matches('/');
        if origin.is_empty() {
            return Err(Error::InvalidUrl(format!("{raw} (no origin configured)")));
        }

        if let Some(path) = raw.strip_prefix('/') {
            Ok(Self(format!("{origin}/{path}")))
        } else {
            Ok(Self(format!("{origin}/{raw}")))
        }
    }

    /// Returns the normalized URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque stored response: status, headers and body as returned by a
/// fetch, plus the time it was fetched.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers as ordered (name, value) pairs.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Bytes,
    /// When the response was fetched from the network.
    pub fetched_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Creates a response fetched now.
    #[must_use]
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            fetched_at: Utc::now(),
        }
    }

    /// Returns true if the status code indicates success (200-299).
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Consumes the response, failing with [`Error::SeedFetch`] unless the
    /// status indicates success. Used by the install path, which must not
    /// seed a generation with error payloads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SeedFetch`] for any non-2xx status.
    pub fn require_success(self, url: &str) -> Result<Self> {
        if self.ok() {
            Ok(self)
        } else {
            Err(Error::SeedFetch {
                url: url.to_string(),
                status: self.status,
            })
        }
    }

    /// Returns the body length in bytes.
    #[must_use]
    pub fn body_len(&self) -> u64 {
        self.body.len() as u64
    }
}
