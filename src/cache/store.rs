//! File-backed key/value store for cached responses
//!
//! The whole store lives in a single JSON file: a map of cache entries plus the
//! schema version marker. Every read goes to the file, and every mutation
//! re-reads the file, applies the change and atomically replaces it, so stores
//! opened on the same path always see each other's writes.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when reading or writing the cache file
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading, writing or creating the cache file failed
    #[error("Failed to access cache file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cache file exists but does not hold a valid store
    #[error("Cache file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No default cache location could be determined
    #[error("Could not determine a cache directory (no home directory?)")]
    NoCacheDir,
}

/// A single cached response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The response body, after any transform was applied
    pub data: Value,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time
    pub fn new(data: Value) -> Self {
        Self {
            data,
            created_at: Utc::now(),
        }
    }

    /// How long ago the entry was written, relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }
}

/// On-disk layout of the cache file
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
}

/// Persistent mapping from cache key to [`CacheEntry`]
///
/// The store holds no copy of the data: the file is the only state. Writers in
/// this process are serialized by a lock, so a read-modify-write never loses a
/// concurrent in-process change. Writers in other processes follow
/// last-writer-wins per mutation.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CacheStore {
    /// Opens the store at `path`
    ///
    /// The file is read once to check that it holds a valid store. A missing
    /// (or empty) file is an empty store without a version marker. The file and
    /// its parent directories are only created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };

        let state = store.load()?;
        debug!(
            path = %store.path.display(),
            entries = state.entries.len(),
            version = state.version.as_deref().unwrap_or("<none>"),
            "opened cache store"
        );

        Ok(store)
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.load()?.entries.remove(key))
    }

    pub fn has(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.load()?.entries.contains_key(key))
    }

    /// Inserts or overwrites the entry at `key`
    pub fn set(&self, key: impl Into<String>, entry: CacheEntry) -> Result<(), StoreError> {
        let key = key.into();
        self.update(|state| {
            state.entries.insert(key, entry);
            true
        })?;
        Ok(())
    }

    /// Removes the entry at `key`, returning whether one was present
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.update(|state| state.entries.remove(key).is_some())
    }

    /// Drops every entry. The version marker is kept.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.update(|state| {
            state.entries.clear();
            true
        })?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.load()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// The recorded schema version, if any
    pub fn version(&self) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.version)
    }

    pub fn set_version(&self, version: impl Into<String>) -> Result<(), StoreError> {
        let version = version.into();
        self.update(|state| {
            state.version = Some(version);
            true
        })?;
        Ok(())
    }

    /// Brings the version marker in line with `version`
    ///
    /// When a different marker is already recorded every entry is dropped first.
    /// An absent marker is simply recorded. Both steps are one read-modify-write.
    /// Returns `true` when entries were invalidated.
    pub fn sync_version(&self, version: &str) -> Result<bool, StoreError> {
        let mut invalidated = false;

        self.update(|state| {
            if state.version.as_deref() == Some(version) {
                return false;
            }
            if state.version.is_some() {
                state.entries.clear();
                invalidated = true;
            }
            state.version = Some(version.to_string());
            true
        })?;

        Ok(invalidated)
    }

    /// Reads the current contents of the file
    fn load(&self) -> Result<StoreFile, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(StoreFile::default()),
            Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(StoreFile::default()),
            // A parent that is a regular file cannot hold the store either;
            // the error surfaces once something is written
            Err(_) if self.path.parent().is_some_and(Path::is_file) => Ok(StoreFile::default()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Re-reads the file, applies `change` and writes the result back
    ///
    /// `change` returns whether it modified the store; nothing is written when
    /// it did not.
    fn update<F>(&self, change: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut StoreFile) -> bool,
    {
        let _guard = self.write_lock.lock();

        let mut state = self.load()?;
        let changed = change(&mut state);
        if changed {
            self.flush(&state)?;
        }

        Ok(changed)
    }

    /// Replaces the file with `state`, creating the parent directory if needed
    ///
    /// The new contents go to a temporary file in the same directory, which is
    /// then renamed over the store, so readers never see a partial write.
    fn flush(&self, state: &StoreFile) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| io_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.persist(&self.path).map_err(|e| io_err(e.error))?;

        Ok(())
    }
}
