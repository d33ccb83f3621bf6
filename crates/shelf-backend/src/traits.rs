use crate::error::BackendResult;
use crate::listener::{ChangeListener, ListenerId};
use crate::primitive::Primitive;

/// Embedded key-value engine with typed primitive slots.
///
/// All implementations must satisfy these invariants:
/// - A write is visible to every reader before `set`/`delete`/`clear_all`
///   returns.
/// - Listeners are notified after the write has taken effect, with the
///   changed key, and never while an internal data lock is held.
/// - The slot getters return `Ok(None)` when the key is absent or holds a
///   value of another slot. That `None` is the missing-value sentinel.
/// - The backend serializes its own internal access; it is shared across
///   stores and subscribers through an `Arc`.
pub trait KvBackend: Send + Sync {
    /// Whether any entry exists for `key`.
    fn contains(&self, key: &str) -> BackendResult<bool>;

    /// Read the string slot.
    fn get_string(&self, key: &str) -> BackendResult<Option<String>>;

    /// Read the bool slot.
    fn get_bool(&self, key: &str) -> BackendResult<Option<bool>>;

    /// Read the number slot.
    fn get_number(&self, key: &str) -> BackendResult<Option<f64>>;

    /// Write a primitive, replacing any previous entry for `key`.
    fn set(&self, key: &str, value: Primitive) -> BackendResult<()>;

    /// Delete the entry for `key`. Returns `true` if it existed.
    fn delete(&self, key: &str) -> BackendResult<bool>;

    /// Delete every entry.
    fn clear_all(&self) -> BackendResult<()>;

    /// All keys currently held, sorted.
    fn keys(&self) -> BackendResult<Vec<String>>;

    /// Register a change listener.
    fn add_listener(&self, listener: ChangeListener) -> ListenerId;

    /// Unregister a change listener. Returns `true` if it was registered.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Read whatever slot `key` holds.
    ///
    /// Default implementation probes each slot in turn. Backends may
    /// override to read the entry once.
    fn get_raw(&self, key: &str) -> BackendResult<Option<Primitive>> {
        if let Some(s) = self.get_string(key)? {
            return Ok(Some(Primitive::String(s)));
        }
        if let Some(b) = self.get_bool(key)? {
            return Ok(Some(Primitive::Bool(b)));
        }
        Ok(self.get_number(key)?.map(Primitive::Number))
    }
}
