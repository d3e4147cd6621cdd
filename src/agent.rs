//! The cache synchronization agent: install, activate and fetch handling.

use std::time::{Duration, Instant};

use futures::{StreamExt, stream};

use crate::asset::{AssetKey, CachedResponse};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::net::{HttpFetcher, NetworkFetcher};
use crate::store::CacheStore;

/// Where a fetch response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Served from an existing cache generation; no network access occurred.
    Cache,
    /// Cache miss; the response is the result of a single network fetch.
    Network,
}

/// The single response produced for an intercepted request.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Whether the response was a cache hit or a network fall-through.
    pub source: FetchSource,
    /// The response itself, unmodified.
    pub response: CachedResponse,
}

/// Summary of a completed install.
#[derive(Debug, Clone, Copy)]
pub struct InstallReport {
    /// Number of seed entries populated.
    pub entries: usize,
    /// Total body bytes fetched and stored.
    pub total_bytes: u64,
    /// Wall-clock time the population took.
    pub elapsed: Duration,
}

/// Keeps exactly one cache generation in sync with a fixed seed list and
/// serves requests from it transparently.
///
/// The three async methods map onto the host lifecycle signals: the caller
/// awaits the returned future before finalizing the corresponding phase.
/// The agent itself is stateless beyond its fixed configuration; install
/// precedes activate, and activate precedes fetch handling, enforced by the
/// caller.
pub struct CacheAgent<S: CacheStore, N: NetworkFetcher = HttpFetcher> {
    store: S,
    fetcher: N,
    config: AgentConfig,
}

impl<S: CacheStore> CacheAgent<S> {
    /// Creates an agent with the default HTTP fetcher.
    #[must_use]
    pub fn new(store: S, config: AgentConfig) -> Self {
        Self {
            store,
            fetcher: HttpFetcher::new(),
            config,
        }
    }
}

impl<S: CacheStore, N: NetworkFetcher> CacheAgent<S, N> {
    /// Creates an agent with a custom network fetcher implementation.
    #[must_use]
    pub const fn with_fetcher(store: S, fetcher: N, config: AgentConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Returns a reference to the agent configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns a reference to the underlying cache store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Install handler: populates the current generation with every seed
    /// URL, all-or-nothing.
    ///
    /// Seeds are fetched concurrently (bounded by
    /// `config.concurrent_seeds`). A transport failure or a non-success
    /// status on any single seed fails the whole install; the host decides
    /// whether to retry. No guarantee is made about partial generation
    /// contents after a failed install.
    ///
    /// # Errors
    ///
    /// Returns the first seed fetch or store error encountered.
    pub async fn install(&self) -> Result<InstallReport> {
        let started = Instant::now();
        let keys: Vec<AssetKey> = self
            .config
            .seeds
            .iter()
            .map(|seed| AssetKey::resolve(&self.config.origin, seed))
            .collect::<Result<_>>()?;

        log::info!(
            "installing {} seed assets into generation {}",
            keys.len(),
            self.config.version
        );

        let results: Vec<Result<u64>> = stream::iter(keys.iter())
            .map(|key| async move {
                let response = self
                    .fetcher
                    .fetch(key)
                    .await?
                    .require_success(key.as_str())?;
                let bytes = response.body_len();
                self.store.put(&self.config.version, key, response).await?;
                log::debug!("seeded {key}");
                Ok(bytes)
            })
            .buffer_unordered(self.config.concurrent_seeds.max(1))
            .collect()
            .await;

        let mut total_bytes = 0u64;
        for result in results {
            total_bytes += result?;
        }

        let report = InstallReport {
            entries: keys.len(),
            total_bytes,
            elapsed: started.elapsed(),
        };
        log::info!(
            "install of {} complete: {} entries, {} bytes",
            self.config.version,
            report.entries,
            report.total_bytes
        );
        Ok(report)
    }

    /// Activate handler: deletes every generation whose name is not the
    /// current version. The live generation is never touched.
    ///
    /// Returns the names of the generations deleted. Idempotent: a second
    /// activate with no intervening install deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns the first deletion error; the host may re-issue the signal.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for name in self.store.generations().await? {
            if name != self.config.version {
                self.store.remove_generation(&name).await?;
                log::info!("removed stale cache generation {name}");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Fetch handler: cache-first lookup with network fall-through.
    ///
    /// The lookup matches any existing generation. On a miss, exactly one
    /// network fetch is performed and its result is returned unmodified,
    /// whatever its status; network errors propagate to the caller
    /// untranslated. The fetch path never writes to the cache — population
    /// happens only during install.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidUrl`] for an unresolvable URL, store
    /// errors from the lookup, or the untranslated network error on a
    /// failed fall-through fetch.
    pub async fn handle_fetch(&self, url: &str) -> Result<FetchOutcome> {
        let key = AssetKey::resolve(&self.config.origin, url)?;

        if let Some(response) = self.store.lookup(&key).await? {
            log::debug!("cache hit for {key}");
            return Ok(FetchOutcome {
                source: FetchSource::Cache,
                response,
            });
        }

        log::debug!("cache miss for {key}, falling through to network");
        let response = self.fetcher.fetch(&key).await?;
        Ok(FetchOutcome {
            source: FetchSource::Network,
            response,
        })
    }
}
