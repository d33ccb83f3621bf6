use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{BackendError, BackendResult};
use crate::listener::{ChangeListener, ListenerId, ListenerRegistry};
use crate::primitive::Primitive;
use crate::traits::KvBackend;

/// In-memory, HashMap-based backend.
///
/// Intended for tests and embedding. Entries are held behind a `RwLock`;
/// data is lost when the backend is dropped.
pub struct InMemoryBackend {
    entries: RwLock<HashMap<String, Primitive>>,
    listeners: ListenerRegistry,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the backend holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registered change listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn read_entry(&self, key: &str) -> BackendResult<Option<Primitive>> {
        let map = self.entries.read().map_err(|_| BackendError::LockPoisoned)?;
        Ok(map.get(key).cloned())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KvBackend for InMemoryBackend {
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
        {
            let mut map = self.entries.write().map_err(|_| BackendError::LockPoisoned)?;
            map.insert(key.to_string(), value);
        }
        self.listeners.notify(key);
        Ok(())
    }

    fn delete(&self, key: &str) -> BackendResult<bool> {
        let existed = {
            let mut map = self.entries.write().map_err(|_| BackendError::LockPoisoned)?;
            map.remove(key).is_some()
        };
        if existed {
            self.listeners.notify(key);
        }
        Ok(existed)
    }

    fn clear_all(&self) -> BackendResult<()> {
        let mut removed: Vec<String> = {
            let mut map = self.entries.write().map_err(|_| BackendError::LockPoisoned)?;
            map.drain().map(|(k, _)| k).collect()
        };
        removed.sort();
        for key in &removed {
            self.listeners.notify(key);
        }
        Ok(())
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        let map = self.entries.read().map_err(|_| BackendError::LockPoisoned)?;
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn add_listener(&self, listener: ChangeListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("entry_count", &self.len())
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn record_changes(backend: &InMemoryBackend) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        backend.add_listener(Arc::new(move |key: &str| {
            sink.lock().unwrap().push(key.to_string());
        }));
        seen
    }

    // -----------------------------------------------------------------------
    // Slots
    // -----------------------------------------------------------------------

    #[test]
    fn write_and_read_each_slot() {
        let backend = InMemoryBackend::new();
        backend.set("name", "ada".into()).unwrap();
        backend.set("enabled", true.into()).unwrap();
        backend.set("count", 7.0.into()).unwrap();

        assert_eq!(backend.get_string("name").unwrap(), Some("ada".into()));
        assert_eq!(backend.get_bool("enabled").unwrap(), Some(true));
        assert_eq!(backend.get_number("count").unwrap(), Some(7.0));
    }

    #[test]
    fn wrong_slot_reads_as_missing() {
        let backend = InMemoryBackend::new();
        backend.set("count", 7.0.into()).unwrap();
        assert!(backend.contains("count").unwrap());
        assert_eq!(backend.get_string("count").unwrap(), None);
        assert_eq!(backend.get_bool("count").unwrap(), None);
    }

    #[test]
    fn missing_key_reads_as_none() {
        let backend = InMemoryBackend::new();
        assert!(!backend.contains("nope").unwrap());
        assert_eq!(backend.get_string("nope").unwrap(), None);
        assert_eq!(backend.get_raw("nope").unwrap(), None);
    }

    #[test]
    fn set_replaces_slot() {
        let backend = InMemoryBackend::new();
        backend.set("k", "text".into()).unwrap();
        backend.set("k", false.into()).unwrap();
        assert_eq!(backend.get_string("k").unwrap(), None);
        assert_eq!(backend.get_raw("k").unwrap(), Some(Primitive::Bool(false)));
        assert_eq!(backend.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Delete / clear
    // -----------------------------------------------------------------------

    #[test]
    fn delete_reports_presence() {
        let backend = InMemoryBackend::new();
        backend.set("k", "v".into()).unwrap();
        assert!(backend.delete("k").unwrap());
        assert!(!backend.contains("k").unwrap());
        assert!(!backend.delete("k").unwrap());
    }

    #[test]
    fn clear_all_removes_everything() {
        let backend = InMemoryBackend::new();
        backend.set("a", "1".into()).unwrap();
        backend.set("b", true.into()).unwrap();
        backend.clear_all().unwrap();
        assert!(backend.is_empty());
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn keys_are_sorted() {
        let backend = InMemoryBackend::new();
        for key in ["zeta", "alpha", "mid"] {
            backend.set(key, true.into()).unwrap();
        }
        assert_eq!(backend.keys().unwrap(), vec!["alpha", "mid", "zeta"]);
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    #[test]
    fn set_notifies_changed_key() {
        let backend = InMemoryBackend::new();
        let seen = record_changes(&backend);
        backend.set("theme", "dark".into()).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["theme"]);
    }

    #[test]
    fn deleting_absent_key_is_silent() {
        let backend = InMemoryBackend::new();
        let seen = record_changes(&backend);
        backend.delete("ghost").unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn clear_all_notifies_each_removed_key() {
        let backend = InMemoryBackend::new();
        backend.set("b", "1".into()).unwrap();
        backend.set("a", "2".into()).unwrap();
        let seen = record_changes(&backend);
        backend.clear_all().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn listener_sees_write_already_applied() {
        let backend = Arc::new(InMemoryBackend::new());
        let observed = Arc::new(Mutex::new(None));
        let reader = Arc::clone(&backend);
        let sink = Arc::clone(&observed);
        backend.add_listener(Arc::new(move |key: &str| {
            *sink.lock().unwrap() = reader.get_string(key).unwrap();
        }));

        backend.set("greeting", "hello".into()).unwrap();
        assert_eq!(*observed.lock().unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn removed_listener_stops_receiving() {
        let backend = InMemoryBackend::new();
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let id = backend.add_listener(Arc::new(move |_key: &str| {
            *sink.lock().unwrap() += 1;
        }));
        backend.set("k", "1".into()).unwrap();
        assert!(backend.remove_listener(id));
        backend.set("k", "2".into()).unwrap();
        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(backend.listener_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_writers_to_distinct_keys() {
        use std::thread;

        let backend = Arc::new(InMemoryBackend::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let backend = Arc::clone(&backend);
                thread::spawn(move || {
                    backend.set(&format!("key-{i}"), (i as f64).into()).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(backend.len(), 8);
        assert_eq!(backend.get_number("key-3").unwrap(), Some(3.0));
    }

    #[test]
    fn debug_format() {
        let backend = InMemoryBackend::new();
        backend.set("x", "y".into()).unwrap();
        let debug = format!("{backend:?}");
        assert!(debug.contains("InMemoryBackend"));
        assert!(debug.contains("entry_count"));
    }

    proptest::proptest! {
        #[test]
        fn string_slot_round_trips(key in "[a-z]{1,12}", value in ".*") {
            let backend = InMemoryBackend::new();
            backend.set(&key, Primitive::String(value.clone())).unwrap();
            proptest::prop_assert_eq!(backend.get_string(&key).unwrap(), Some(value));
        }

        #[test]
        fn number_slot_round_trips(value in proptest::num::f64::NORMAL) {
            let backend = InMemoryBackend::new();
            backend.set("n", Primitive::Number(value)).unwrap();
            proptest::prop_assert_eq!(backend.get_number("n").unwrap(), Some(value));
        }
    }
}
