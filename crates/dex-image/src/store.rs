//! Conversion Store (C2) blob backing: persists normalized image bytes on
//! disk, keyed by conversion id. Row metadata (`bound`, `expires_at`, ...)
//! lives in `dex-db::conversions`; this module only owns the bytes.
//!
//! `file-blob-cache`'s own `cache.rs` was absent from the teacher checkout
//! (only its `types.rs`/`lib.rs` survived), so this is a fresh
//! implementation built to the same `CacheEntry`/`CacheStats` shape.

use crate::types::{CacheEntry, CacheStats};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

pub struct BlobStore {
    root: PathBuf,
    entries: RwLock<HashMap<Uuid, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn put(&self, id: Uuid, bytes: &[u8], content_type: &str) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(id.to_string());
        tokio::fs::write(&path, bytes).await?;

        let entry = CacheEntry {
            path: path.clone(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            created_at: Utc::now(),
        };
        self.entries.write().unwrap().insert(id, entry);
        Ok(path)
    }

    pub async fn get(&self, id: Uuid) -> Option<Vec<u8>> {
        let path = self.entries.read().unwrap().get(&id).map(|e| e.path.clone());
        match path {
            Some(path) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tokio::fs::read(&path).await.ok()
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn delete(&self, id: Uuid) -> std::io::Result<()> {
        let path = self.entries.write().unwrap().remove(&id).map(|e| e.path);
        if let Some(path) = path {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e),
            }
        } else {
            Ok(())
        }
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap();
        CacheStats {
            entries: entries.len(),
            total_size: entries.values().map(|e| e.size).sum(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let id = Uuid::new_v4();
        store.put(id, b"hello", "image/png").await.unwrap();

        let bytes = store.get(id).await.unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(store.stats().hits, 1);
    }

    #[tokio::test]
    async fn get_missing_id_counts_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        assert!(store.get(Uuid::new_v4()).await.is_none());
        assert_eq!(store.stats().misses, 1);
    }

    #[tokio::test]
    async fn delete_removes_the_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let id = Uuid::new_v4();
        store.put(id, b"hello", "image/png").await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.get(id).await.is_none());
    }
}
