//! Durable key-value storage for session data.
//!
//! Every value is a string. Structured values (the user profile, the cached
//! dashboard) are stored as JSON text, and the expiry instant as decimal
//! epoch milliseconds.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Result, StoreError};

/// Default store file name within the data directory.
pub const STORE_FILE: &str = "session.json";

/// Well-known storage keys.
pub mod keys {
    /// Bearer credential.
    pub const TOKEN: &str = "token";
    /// JSON-encoded user profile.
    pub const USER: &str = "user";
    /// Decimal epoch milliseconds at which the token stops being valid.
    pub const TOKEN_EXPIRES_AT: &str = "tokenExpiresAt";
    /// JSON-encoded dashboard snapshot.
    pub const DASHBOARD_DATA: &str = "cache_dashboard_data";
    /// Instant the dashboard snapshot was persisted.
    pub const DASHBOARD_TIMESTAMP: &str = "cache_dashboard_timestamp";

    /// Everything removed when a session ends.
    pub const SESSION: [&str; 5] = [
        TOKEN,
        USER,
        TOKEN_EXPIRES_AT,
        DASHBOARD_DATA,
        DASHBOARD_TIMESTAMP,
    ];
}

// ============================================================================
// SessionStore Trait
// ============================================================================

/// Asynchronous string key-value store.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Read a value. Missing keys are `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove several keys at once. Missing keys are not an error.
    async fn remove(&self, keys: &[&str]) -> Result<()>;
}

// ============================================================================
// FileStore
// ============================================================================

/// JSON-object file store.
///
/// The whole map is rewritten on every mutation through a temp file and a
/// rename, so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    /// Store at `data_dir/session.json`.
    pub fn new(data_dir: &Path) -> Self {
        Self::with_path(data_dir.join(STORE_FILE))
    }

    /// Store at an explicit path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Map to mutate. A corrupt file yields an empty map flagged for rewrite.
    async fn read_map_for_update(&self) -> Result<(BTreeMap<String, String>, bool)> {
        match self.read_map().await {
            Ok(map) => Ok((map, false)),
            Err(StoreError::Corrupt(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Session store is corrupt; starting from an empty map"
                );
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let (mut map, _) = self.read_map_for_update().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await?;
        tracing::trace!(key, path = %self.path.display(), "Stored value");
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let (mut map, corrupt) = self.read_map_for_update().await?;
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if corrupt || map.len() != before {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}

// ============================================================================
// MemoryStore (for testing)
// ============================================================================

/// In-memory store with switchable failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with values.
    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.values.lock();
            for (k, v) in values {
                map.insert(k.to_string(), v.to_string());
            }
        }
        store
    }

    /// Make every subsequent read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write or remove fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Synchronous peek for assertions.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.values
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        let mut map = self.values.lock();
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());
        assert_eq!(store.get(keys::TOKEN).await.unwrap(), None);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_file_store_set_get_remove() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(&temp.path().join("nested"));

        store.set(keys::TOKEN, "abc").await.unwrap();
        store.set(keys::TOKEN_EXPIRES_AT, "1700000000000").await.unwrap();
        assert_eq!(store.get(keys::TOKEN).await.unwrap().as_deref(), Some("abc"));

        store.remove(&[keys::TOKEN, keys::USER]).await.unwrap();
        assert_eq!(store.get(keys::TOKEN).await.unwrap(), None);
        assert_eq!(
            store.get(keys::TOKEN_EXPIRES_AT).await.unwrap().as_deref(),
            Some("1700000000000")
        );
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let temp = tempdir().unwrap();
        FileStore::new(temp.path())
            .set(keys::USER, r#"{"name":"Ada"}"#)
            .await
            .unwrap();

        let reopened = FileStore::new(temp.path());
        assert_eq!(
            reopened.get(keys::USER).await.unwrap().as_deref(),
            Some(r#"{"name":"Ada"}"#)
        );
        assert!(!temp.path().join("session.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(
            store.get(keys::TOKEN).await,
            Err(StoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_file_store_write_replaces_corrupt_file() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());
        std::fs::write(store.path(), "{truncated").unwrap();

        store.set(keys::TOKEN, "fresh").await.unwrap();
        assert_eq!(
            store.get(keys::TOKEN).await.unwrap().as_deref(),
            Some("fresh")
        );
    }

    #[tokio::test]
    async fn test_file_store_remove_resets_corrupt_file() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());
        std::fs::write(store.path(), "{truncated").unwrap();

        store.remove(&keys::SESSION).await.unwrap();
        assert_eq!(store.get(keys::TOKEN).await.unwrap(), None);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_memory_store_failure_injection() {
        let store = MemoryStore::with_values([(keys::TOKEN, "t")]);
        store.fail_reads(true);
        assert!(store.get(keys::TOKEN).await.is_err());
        store.fail_reads(false);
        store.fail_writes(true);
        assert!(store.remove(&keys::SESSION).await.is_err());
        assert_eq!(store.peek(keys::TOKEN).as_deref(), Some("t"));
    }
}
