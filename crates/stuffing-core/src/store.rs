//! Persistent identity storage
//!
//! The dynamic app manager records which app family is active through the
//! [`IdentityStore`] trait: durable key→string storage that survives process
//! restarts. The store is owned by a single process; no concurrent-process
//! access is assumed.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, StuffingError};

/// Durable key→string storage consumed by the dynamic app manager.
///
/// `set` and `replace_all` must be durable on return: a process restart
/// racing an unflushed write must never observe the previous identity.
pub trait IdentityStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`. Durable on return.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Whether a value is stored under `key`.
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Clears the store and replaces its entire contents with `entries` in
    /// one durable step. This is the switch path's clear-and-reset write.
    fn replace_all(&self, entries: &[(String, String)]) -> Result<()>;
}

/// File-backed [`IdentityStore`] persisting a single JSON object.
///
/// Writes go to a temporary file in the same directory, are flushed to disk,
/// and are then renamed over the previous file, so a restart racing a write
/// observes either the old state or the new state, never a torn one.
#[derive(Debug)]
pub struct FileIdentityStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileIdentityStore {
    /// Opens the store at `path`, loading existing entries if the file is
    /// present. A missing file is an empty store, not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| StuffingError::StoreUnavailable(format!("{}: {e}", path.display())))?;
            serde_json::from_str(&content)
                .map_err(|e| StuffingError::StoreUnavailable(format!("{}: {e}", path.display())))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(serde_json::to_string_pretty(entries)?.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl IdentityStore for FileIdentityStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock();
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn replace_all(&self, new_entries: &[(String, String)]) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.clear();
        for (key, value) in new_entries {
            entries.insert(key.clone(), value.clone());
        }
        self.flush(&entries)
    }
}

/// In-memory [`IdentityStore`] for testing.
///
/// Counts durable writes and can be switched into a failing state to
/// exercise store-unavailable paths.
#[derive(Default)]
pub struct MemoryIdentityStore {
    entries: Mutex<BTreeMap<String, String>>,
    write_count: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of durable writes performed so far.
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Makes every subsequent operation fail with a store error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StuffingError::StoreUnavailable(
                "memory store marked unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_available()?;
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn replace_all(&self, new_entries: &[(String, String)]) -> Result<()> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        entries.clear();
        for (key, value) in new_entries {
            entries.insert(key.clone(), value.clone());
        }
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
