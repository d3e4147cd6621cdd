//! Network fetch abstraction.

use async_trait::async_trait;

use crate::asset::{AssetKey, CachedResponse};
use crate::error::Result;

/// Abstraction over the network subsystem for testability.
///
/// The agent consumes this seam in two places: bulk seed population during
/// install, and the fall-through path on a cache miss. Errors are
/// propagated to the caller untranslated.
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    /// Performs a single GET request for the asset and returns its response.
    async fn fetch(&self, key: &AssetKey) -> Result<CachedResponse>;
}

/// Default fetcher backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a fresh client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher reusing an existing client (connection pooling).
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NetworkFetcher for HttpFetcher {
    async fn fetch(&self, key: &AssetKey) -> Result<CachedResponse> {
        let response = self.client.get(key.as_str()).send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?;

        Ok(CachedResponse::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_fetcher_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpFetcher>();
    }

    #[test]
    fn fetcher_clones_share_client() {
        let fetcher = HttpFetcher::new();
        let _clone = fetcher.clone();
    }
}
