//! File-backed key-value backend.
//!
//! [`FileBackend`] keeps every entry in memory and mirrors the whole map to
//! a JSON document after each mutation. The document is written to a
//! temporary file in the same directory and renamed over the target, so a
//! crash leaves either the old or the new document, never a torn one.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{BackendError, BackendResult};
use crate::listener::{ChangeListener, ListenerId, ListenerRegistry};
use crate::primitive::Primitive;
use crate::traits::KvBackend;

type Entries = BTreeMap<String, Primitive>;

/// A [`KvBackend`] persisted as a single JSON document.
pub struct FileBackend {
    path: PathBuf,
    entries: RwLock<Entries>,
    listeners: ListenerRegistry,
}

impl FileBackend {
    /// Open (or create) the store document at `path`.
    ///
    /// Missing parent directories are created. A missing or empty file is
    /// an empty store; a file that does not decode is
    /// [`BackendError::Corrupt`].
    pub fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                Entries::new()
            } else {
                serde_json::from_str(&text).map_err(|e| BackendError::Corrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?
            }
        } else {
            Entries::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "file backend opened");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_entry(&self, key: &str) -> BackendResult<Option<Primitive>> {
        let map = self.entries.read().map_err(|_| BackendError::LockPoisoned)?;
        Ok(map.get(key).cloned())
    }

    /// Apply `f` to a copy of the map, persist the copy, then swap it in.
    ///
    /// The in-memory map only changes once the document is on disk. The
    /// closure returns the keys whose entries changed; they are notified
    /// after the lock is released.
    fn mutate<F>(&self, f: F) -> BackendResult<Vec<String>>
    where
        F: FnOnce(&mut Entries) -> Vec<String>,
    {
        let changed = {
            let mut map = self.entries.write().map_err(|_| BackendError::LockPoisoned)?;
            let mut next = map.clone();
            let changed = f(&mut next);
            if !changed.is_empty() {
                self.persist(&next)?;
                *map = next;
            }
            changed
        };
        for key in &changed {
            self.listeners.notify(key);
        }
        Ok(changed)
    }

    fn persist(&self, entries: &Entries) -> BackendResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, entries)
            .map_err(|e| BackendError::Serialization(e.to_string()))?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| BackendError::Io(e.error))?;

        debug!(path = %self.path.display(), entries = entries.len(), "store document written");
        Ok(())
    }
}

impl KvBackend for FileBackend {
    fn contains(&self, key: &str) -> BackendResult<bool> {
        let map = self.entries.read().map_err(|_| BackendError::LockPoisoned)?;
        Ok(map.contains_key(key))
    }

    fn get_string(&self, key: &str) -> BackendResult<Option<String>> {
        Ok(self
            .read_entry(key)?
            .and_then(|p| p.as_str().map(str::to_string)))
    }

    fn get_bool(&self, key: &str) -> BackendResult<Option<bool>> {
        Ok(self.read_entry(key)?.and_then(|p| p.as_bool()))
    }

    fn get_number(&self, key: &str) -> BackendResult<Option<f64>> {
        Ok(self.read_entry(key)?.and_then(|p| p.as_number()))
    }

    fn get_raw(&self, key: &str) -> BackendResult<Option<Primitive>> {
        self.read_entry(key)
    }

    fn set(&self, key: &str, value: Primitive) -> BackendResult<()> {
        // JSON has no NaN or infinity; they would be written as `null` and
        // the document would no longer open.
        if let Primitive::Number(n) = value {
            if !n.is_finite() {
                debug!(key, slot = value.slot_name(), "rejected non-finite number");
                return Err(BackendError::Serialization(format!(
                    "{key}: {n} cannot be stored in a JSON document"
                )));
            }
        }
        self.mutate(|map| {
            map.insert(key.to_string(), value);
            vec![key.to_string()]
        })?;
        Ok(())
    }

    fn delete(&self, key: &str) -> BackendResult<bool> {
        let changed = self.mutate(|map| match map.remove(key) {
            Some(_) => vec![key.to_string()],
            None => Vec::new(),
        })?;
        Ok(!changed.is_empty())
    }

    fn clear_all(&self) -> BackendResult<()> {
        self.mutate(|map| {
            let removed: Vec<String> = map.keys().cloned().collect();
            map.clear();
            removed
        })?;
        Ok(())
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        let map = self.entries.read().map_err(|_| BackendError::LockPoisoned)?;
        Ok(map.keys().cloned().collect())
    }

    fn add_listener(&self, listener: ChangeListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("path", &self.path)
            .field("entry_count", &self.len())
            .finish()
    }
}
