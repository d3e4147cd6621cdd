//! Configuration types for the caching agent.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for the caching agent: the current cache generation name,
/// the origin used to resolve relative seed URLs, and the seed list itself.
///
/// These values are fixed for the lifetime of an agent; shipping a new asset
/// set means shipping a new version string and running a fresh
/// install/activate cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name of the current cache generation (the version tag).
    pub version: String,
    /// Origin against which relative seed and request URLs are resolved.
    pub origin: String,
    /// Ordered list of URLs populated into the generation at install time.
    pub seeds: Vec<String>,
    /// Number of seed assets fetched concurrently during install.
    pub concurrent_seeds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version: "guiding-light-v1".to_string(),
            origin: "http://localhost:3000".to_string(),
            seeds: vec!["/".to_string(), "/static/css/main.css".to_string()],
            concurrent_seeds: 4,
        }
    }
}

impl AgentConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache generation name.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the origin used to resolve relative URLs.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Sets the seed URL list.
    #[must_use]
    pub fn with_seeds<I, S>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seeds = seeds.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the number of concurrent seed fetches during install.
    #[must_use]
    pub const fn with_concurrent_seeds(mut self, concurrent: usize) -> Self {
        self.concurrent_seeds = concurrent;
        self
    }
}

/// A seed manifest file: the on-disk TOML form of [`AgentConfig`] consumed
/// by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedManifest {
    /// Cache generation name.
    pub version: String,
    /// Origin for relative URLs.
    pub origin: String,
    /// Seed URL list.
    pub seeds: Vec<String>,
    /// Optional install concurrency override.
    pub concurrent_seeds: Option<usize>,
}

impl SeedManifest {
    /// Loads and parses a manifest from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Ok(toml::from_str(&text)?)
    }

    /// Converts the manifest into an agent configuration, filling defaults
    /// for any omitted fields.
    #[must_use]
    pub fn into_config(self) -> AgentConfig {
        let defaults = AgentConfig::default();
        AgentConfig {
            version: self.version,
            origin: self.origin,
            seeds: self.seeds,
            concurrent_seeds: self.concurrent_seeds.unwrap_or(defaults.concurrent_seeds),
        }
    }
}

/// Default filesystem locations for the CLI.
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Root directory of the on-disk cache store.
    pub store_dir: PathBuf,
    /// Default location of the seed manifest.
    pub manifest_path: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            store_dir: data_dir.join("precache").join("store"),
            manifest_path: config_dir.join("precache").join("manifest.toml"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.version, "guiding-light-v1");
        assert_eq!(config.origin, "http://localhost:3000");
        assert_eq!(config.seeds, vec!["/", "/static/css/main.css"]);
        assert_eq!(config.concurrent_seeds, 4);
    }

    #[test]
    fn builder_pattern() {
        let config = AgentConfig::new()
            .with_version("guiding-light-v2")
            .with_origin("https://app.example.com")
            .with_seeds(["/", "/app.js"])
            .with_concurrent_seeds(8);

        assert_eq!(config.version, "guiding-light-v2");
        assert_eq!(config.origin, "https://app.example.com");
        assert_eq!(config.seeds, vec!["/", "/app.js"]);
        assert_eq!(config.concurrent_seeds, 8);
    }

    #[test]
    fn manifest_parses_from_toml() {
        let manifest: SeedManifest = toml::from_str(
            r#"
            version = "guiding-light-v1"
            origin = "http://localhost:3000"
            seeds = ["/", "/static/css/main.css"]
            "#,
        )
        .unwrap();

        let config = manifest.into_config();
        assert_eq!(config.version, "guiding-light-v1");
        assert_eq!(config.seeds.len(), 2);
        // Omitted concurrency falls back to the default
        assert_eq!(config.concurrent_seeds, 4);
    }

    #[test]
    fn manifest_concurrency_override() {
        let manifest: SeedManifest = toml::from_str(
            r#"
            version = "v1"
            origin = "http://localhost:3000"
            seeds = ["/"]
            concurrent_seeds = 2
            "#,
        )
        .unwrap();
        assert_eq!(manifest.into_config().concurrent_seeds, 2);
    }

    #[test]
    fn manifest_rejects_garbage() {
        let result: std::result::Result<SeedManifest, _> = toml::from_str("not = valid");
        assert!(result.is_err());
    }

    #[test]
    fn config_serializes_to_toml() {
        let config = AgentConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AgentConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.version, config.version);
        assert_eq!(deserialized.seeds, config.seeds);
    }

    #[test]
    fn default_path_config() {
        let paths = PathConfig::default();
        assert!(paths.store_dir.to_string_lossy().contains("precache"));
        assert!(paths.manifest_path.to_string_lossy().ends_with("manifest.toml"));
    }

    #[tokio::test]
    async fn manifest_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("manifest.toml");
        std::fs::write(
            &path,
            "version = \"v1\"\norigin = \"http://localhost:3000\"\nseeds = [\"/\"]\n",
        )
        .unwrap();

        let manifest = SeedManifest::load(&path).await.unwrap();
        assert_eq!(manifest.version, "v1");
    }

    #[tokio::test]
    async fn manifest_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = SeedManifest::load(&dir.path().join("absent.toml")).await;
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
