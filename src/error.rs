//! Error types for the precache library.

use thiserror::Error;

/// Errors that can occur during cache population and lookup.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error during cache store operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache entry metadata could not be encoded or decoded.
    #[error("cache entry encoding failed: {0}")]
    Entry(#[from] serde_json::Error),

    /// Seed manifest parsing failed.
    #[error("manifest parsing failed: {0}")]
    Manifest(#[from] toml::de::Error),

    /// A request URL could not be resolved into a cache key.
    #[error("invalid asset URL: {0}")]
    InvalidUrl(String),

    /// A seed asset fetch returned a non-success status during install.
    #[error("seed fetch for {url} returned status {status}")]
    SeedFetch {
        /// URL of the seed asset that failed.
        url: String,
        /// HTTP status code returned by the server.
        status: u16,
    },
}

/// A specialized `Result` type for precache operations.
pub type Result<T> = std::result::Result<T, Error>;
