//! precache - an offline-asset pre-caching agent.
//!
//! This library keeps a named, versioned asset cache ("generation") in sync
//! with a fixed seed list and answers requests cache-first with network
//! fallback. It mirrors the three-phase lifecycle of a background caching
//! worker: install (bulk populate), activate (garbage-collect old
//! generations), fetch (cache-first lookup).
//!
//! # Example
//!
//! ```no_run
//! use precache::{AgentConfig, CacheAgent, DiskStore, FetchSource};
//!
//! # async fn example() -> precache::Result<()> {
//! let config = AgentConfig::new()
//!     .with_version("guiding-light-v1")
//!     .with_origin("http://localhost:3000")
//!     .with_seeds(["/", "/static/css/main.css"]);
//!
//! let agent = CacheAgent::new(DiskStore::new("/var/cache/precache"), config);
//!
//! // Lifecycle: install populates the generation, activate purges old ones.
//! agent.install().await?;
//! agent.activate().await?;
//!
//! // Requests are answered cache-first, falling through to the network.
//! let outcome = agent.handle_fetch("/").await?;
//! assert_eq!(outcome.source, FetchSource::Cache);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod agent;
pub mod asset;
pub mod config;
pub mod error;
pub mod net;
pub mod store;

// Re-export main types for convenience
pub use agent::{CacheAgent, FetchOutcome, FetchSource, InstallReport};
pub use asset::{AssetKey, CachedResponse};
pub use config::{AgentConfig, PathConfig, SeedManifest};
pub use error::{Error, Result};
pub use net::{HttpFetcher, NetworkFetcher};
pub use store::{CacheStore, DiskStore, MemoryStore};
