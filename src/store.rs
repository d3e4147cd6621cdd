//! Cache store abstraction and its in-memory and on-disk implementations.
//!
//! A store holds named cache generations, each mapping a normalized asset
//! URL to a stored response. The agent only ever writes during install
//! (bulk populate) and activate (bulk delete); fetch handling is read-only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::asset::{AssetKey, CachedResponse};
use crate::error::Result;

/// Abstraction over the versioned key/value cache store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Stores a response under the given generation, creating the
    /// generation if it does not exist. Overwrites any existing entry for
    /// the same key.
    async fn put(&self, generation: &str, key: &AssetKey, response: CachedResponse)
    -> Result<()>;

    /// Looks a key up across **all** existing generations, returning the
    /// stored response if any generation holds it.
    async fn lookup(&self, key: &AssetKey) -> Result<Option<CachedResponse>>;

    /// Returns true if the given generation holds an entry for the key.
    async fn contains(&self, generation: &str, key: &AssetKey) -> Result<bool>;

    /// Lists the names of all existing generations.
    async fn generations(&self) -> Result<Vec<String>>;

    /// Deletes a whole generation. Returns true if it existed.
    async fn remove_generation(&self, name: &str) -> Result<bool>;

    /// Returns the number of entries in a generation (0 if absent).
    async fn entry_count(&self, generation: &str) -> Result<usize>;
}

/// In-memory store. Used by tests and by embedders that do not need
/// durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    generations: RwLock<HashMap<String, HashMap<String, CachedResponse>>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn put(
        &self,
        generation: &str,
        key: &AssetKey,
        response: CachedResponse,
    ) -> Result<()> {
        let mut generations = self.generations.write().await;
        generations
            .entry(generation.to_string())
            .or_default()
            .insert(key.as_str().to_string(), response);
        Ok(())
    }

    async fn lookup(&self, key: &AssetKey) -> Result<Option<CachedResponse>> {
        let generations = self.generations.read().await;
        Ok(generations
            .values()
            .find_map(|entries| entries.get(key.as_str()).cloned()))
    }

    async fn contains(&self, generation: &str, key: &AssetKey) -> Result<bool> {
        let generations = self.generations.read().await;
        Ok(generations
            .get(generation)
            .is_some_and(|entries| entries.contains_key(key.as_str())))
    }

    async fn generations(&self) -> Result<Vec<String>> {
        let generations = self.generations.read().await;
        Ok(generations.keys().cloned().collect())
    }

    async fn remove_generation(&self, name: &str) -> Result<bool> {
        let mut generations = self.generations.write().await;
        Ok(generations.remove(name).is_some())
    }

    async fn entry_count(&self, generation: &str) -> Result<usize> {
        let generations = self.generations.read().await;
        Ok(generations.get(generation).map_or(0, HashMap::len))
    }
}

/// Metadata sidecar persisted next to each entry's body file.
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    fetched_at: DateTime<Utc>,
}

/// Durable store backed by the local filesystem.
///
/// Layout: one directory per generation under the root, and per entry a
/// `{id}.json` metadata sidecar plus a `{id}.body` payload file, where `id`
/// is the SHA-256 of the normalized URL. The body is written before the
/// sidecar so a crash mid-write never leaves a sidecar pointing at a
/// missing body.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Creates a store rooted at the given directory. The directory is
    /// created lazily on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_id(key: &AssetKey) -> String {
        let digest = Sha256::digest(key.as_str().as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn meta_path(&self, generation: &str, id: &str) -> PathBuf {
        self.root.join(generation).join(format!("{id}.json"))
    }

    fn body_path(&self, generation: &str, id: &str) -> PathBuf {
        self.root.join(generation).join(format!("{id}.body"))
    }

    async fn read_entry(&self, generation: &str, id: &str) -> Result<Option<CachedResponse>> {
        let meta_path = self.meta_path(generation, id);
        let meta_bytes = match tokio::fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: EntryMeta = serde_json::from_slice(&meta_bytes)?;
        let body = tokio::fs::read(self.body_path(generation, id)).await?;
        Ok(Some(CachedResponse {
            status: meta.status,
            headers: meta.headers,
            body: Bytes::from(body),
            fetched_at: meta.fetched_at,
        }))
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn put(
        &self,
        generation: &str,
        key: &AssetKey,
        response: CachedResponse,
    ) -> Result<()> {
        let dir = self.root.join(generation);
        tokio::fs::create_dir_all(&dir).await?;

        let id = Self::entry_id(key);
        let meta = EntryMeta {
            url: key.as_str().to_string(),
            status: response.status,
            headers: response.headers,
            fetched_at: response.fetched_at,
        };

        tokio::fs::write(self.body_path(generation, &id), &response.body).await?;
        tokio::fs::write(self.meta_path(generation, &id), serde_json::to_vec(&meta)?).await?;
        Ok(())
    }

    async fn lookup(&self, key: &AssetKey) -> Result<Option<CachedResponse>> {
        let id = Self::entry_id(key);
        for generation in self.generations().await? {
            if let Some(response) = self.read_entry(&generation, &id).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    async fn contains(&self, generation: &str, key: &AssetKey) -> Result<bool> {
        let id = Self::entry_id(key);
        match tokio::fs::metadata(self.meta_path(generation, &id)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn generations(&self) -> Result<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn remove_generation(&self, name: &str) -> Result<bool> {
        match tokio::fs::remove_dir_all(self.root.join(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn entry_count(&self, generation: &str) -> Result<usize> {
        let mut dir = match tokio::fs::read_dir(self.root.join(generation)).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(entry) = dir.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(url: &str) -> AssetKey {
        AssetKey::resolve("http://localhost:3000", url).unwrap()
    }

    fn response(body: &'static [u8]) -> CachedResponse {
        CachedResponse::new(
            200,
            vec![("content-type".to_string(), "text/plain".to_string())],
            Bytes::from_static(body),
        )
    }

    mod memory {
        use super::*;

        #[tokio::test]
        async fn put_then_lookup() {
            let store = MemoryStore::new();
            store.put("v1", &key("/"), response(b"index")).await.unwrap();

            let hit = store.lookup(&key("/")).await.unwrap().unwrap();
            assert_eq!(hit.body.as_ref(), b"index");
            assert_eq!(hit.status, 200);
        }

        #[tokio::test]
        async fn lookup_miss() {
            let store = MemoryStore::new();
            assert!(store.lookup(&key("/absent")).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn lookup_searches_all_generations() {
            let store = MemoryStore::new();
            store.put("v0", &key("/old.css"), response(b"old")).await.unwrap();
            store.put("v1", &key("/new.css"), response(b"new")).await.unwrap();

            assert!(store.lookup(&key("/old.css")).await.unwrap().is_some());
            assert!(store.lookup(&key("/new.css")).await.unwrap().is_some());
        }

        #[tokio::test]
        async fn put_overwrites_existing_entry() {
            let store = MemoryStore::new();
            store.put("v1", &key("/"), response(b"first")).await.unwrap();
            store.put("v1", &key("/"), response(b"second")).await.unwrap();

            let hit = store.lookup(&key("/")).await.unwrap().unwrap();
            assert_eq!(hit.body.as_ref(), b"second");
            assert_eq!(store.entry_count("v1").await.unwrap(), 1);
        }

        #[tokio::test]
        async fn remove_generation_drops_entries() {
            let store = MemoryStore::new();
            store.put("v0", &key("/"), response(b"x")).await.unwrap();

            assert!(store.remove_generation("v0").await.unwrap());
            assert!(!store.remove_generation("v0").await.unwrap());
            assert!(store.lookup(&key("/")).await.unwrap().is_none());
            assert!(store.generations().await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn contains_is_generation_scoped() {
            let store = MemoryStore::new();
            store.put("v1", &key("/"), response(b"x")).await.unwrap();

            assert!(store.contains("v1", &key("/")).await.unwrap());
            assert!(!store.contains("v0", &key("/")).await.unwrap());
        }
    }

    mod disk {
        use super::*;

        #[tokio::test]
        async fn put_then_lookup_roundtrip() {
            let dir = TempDir::new().unwrap();
            let store = DiskStore::new(dir.path());

            store
                .put("guiding-light-v1", &key("/static/css/main.css"), response(b"body{}"))
                .await
                .unwrap();

            let hit = store
                .lookup(&key("/static/css/main.css"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(hit.status, 200);
            assert_eq!(hit.body.as_ref(), b"body{}");
            assert_eq!(hit.headers[0].0, "content-type");
        }

        #[tokio::test]
        async fn entries_survive_store_reopen() {
            let dir = TempDir::new().unwrap();
            {
                let store = DiskStore::new(dir.path());
                store.put("v1", &key("/"), response(b"index")).await.unwrap();
            }

            let reopened = DiskStore::new(dir.path());
            let hit = reopened.lookup(&key("/")).await.unwrap().unwrap();
            assert_eq!(hit.body.as_ref(), b"index");
        }

        #[tokio::test]
        async fn empty_root_has_no_generations() {
            let dir = TempDir::new().unwrap();
            let store = DiskStore::new(dir.path().join("never-created"));
            assert!(store.generations().await.unwrap().is_empty());
            assert!(store.lookup(&key("/")).await.unwrap().is_none());
            assert_eq!(store.entry_count("v1").await.unwrap(), 0);
        }

        #[tokio::test]
        async fn generations_listed_sorted() {
            let dir = TempDir::new().unwrap();
            let store = DiskStore::new(dir.path());
            store.put("v2", &key("/"), response(b"x")).await.unwrap();
            store.put("v1", &key("/"), response(b"x")).await.unwrap();

            assert_eq!(store.generations().await.unwrap(), vec!["v1", "v2"]);
        }

        #[tokio::test]
        async fn remove_generation_leaves_siblings_intact() {
            let dir = TempDir::new().unwrap();
            let store = DiskStore::new(dir.path());
            store.put("v0", &key("/old"), response(b"old")).await.unwrap();
            store.put("v1", &key("/new"), response(b"new")).await.unwrap();

            assert!(store.remove_generation("v0").await.unwrap());
            assert!(store.lookup(&key("/old")).await.unwrap().is_none());
            assert!(store.lookup(&key("/new")).await.unwrap().is_some());
            assert_eq!(store.generations().await.unwrap(), vec!["v1"]);
        }

        #[tokio::test]
        async fn remove_missing_generation_reports_false() {
            let dir = TempDir::new().unwrap();
            let store = DiskStore::new(dir.path());
            assert!(!store.remove_generation("v9").await.unwrap());
        }

        #[tokio::test]
        async fn entry_count_counts_sidecars_only() {
            let dir = TempDir::new().unwrap();
            let store = DiskStore::new(dir.path());
            store.put("v1", &key("/a"), response(b"a")).await.unwrap();
            store.put("v1", &key("/b"), response(b"b")).await.unwrap();

            // 4 files on disk (2 bodies + 2 sidecars), 2 logical entries
            assert_eq!(store.entry_count("v1").await.unwrap(), 2);
        }

        #[test]
        fn entry_id_is_stable_hex() {
            let id = DiskStore::entry_id(&key("/"));
            assert_eq!(id.len(), 64);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(id, DiskStore::entry_id(&key("/")));
        }
    }
}
