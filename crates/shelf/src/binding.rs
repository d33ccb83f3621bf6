//! Reactive access to a single key.
//!
//! A [`Binding`] pairs a live value with a setter. It registers a backend
//! change listener for its key on creation and keeps a cached copy of the
//! raw backend value, refreshed on every change notification from any
//! writer: other bindings, other stores, or direct backend calls. The
//! listener is removed when the binding is dropped.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde::de::DeserializeOwned;
use serde_json::Value;
use shelf_backend::{KvBackend, ListenerId};
use shelf_schema::Kind;
use tracing::warn;

use crate::access::{self, Accessor};
use crate::error::StoreResult;

type Observer = Arc<dyn Fn(&Value) + Send + Sync>;

struct BindingState {
    key: String,
    accessor: Accessor,
    default: Value,
    raw: RwLock<Option<Value>>,
    observers: RwLock<Vec<Observer>>,
}

impl BindingState {
    fn resolved(&self) -> Value {
        let raw = self.raw.read().unwrap_or_else(PoisonError::into_inner).clone();
        access::resolve(self.accessor.kind(), raw, &self.default)
    }

    /// Re-read the backend and fan the resolved value out to observers.
    ///
    /// The cache lock is held across the backend read so concurrent
    /// refreshes apply in the order they observed the backend.
    fn refresh<B: KvBackend + ?Sized>(&self, backend: &B) {
        {
            let mut cached = self.raw.write().unwrap_or_else(PoisonError::into_inner);
            *cached = self.accessor.read(backend, &self.key).unwrap_or_else(|e| {
                warn!(key = %self.key, error = %e, "failed to refresh bound value");
                None
            });
        }

        let value = self.resolved();
        let observers: Vec<Observer> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer(&value);
        }
    }
}

/// Live value for one key, paired with a setter.
///
/// The slot used for reads and writes is fixed at creation from the key's
/// declared kind.
pub struct Binding<B: KvBackend + ?Sized + 'static> {
    state: Arc<BindingState>,
    backend: Arc<B>,
    listener: ListenerId,
}

impl<B: KvBackend + ?Sized + 'static> Binding<B> {
    pub(crate) fn new(key: &str, accessor: Accessor, default: Value, backend: Arc<B>) -> Self {
        let state = Arc::new(BindingState {
            key: key.to_string(),
            accessor,
            default,
            raw: RwLock::new(None),
            observers: RwLock::new(Vec::new()),
        });

        // Weak handles: the backend owns the listener, so strong ones would
        // keep both alive forever.
        let weak_state: Weak<BindingState> = Arc::downgrade(&state);
        let weak_backend: Weak<B> = Arc::downgrade(&backend);
        let listener = backend.add_listener(Arc::new(move |changed: &str| {
            let (Some(state), Some(backend)) = (weak_state.upgrade(), weak_backend.upgrade()) else {
                return;
            };
            if changed == state.key {
                state.refresh(&*backend);
            }
        }));

        // Initial read, after registration so no write can slip between.
        let initial = state.accessor.read(&*backend, key).unwrap_or_else(|e| {
            warn!(key, error = %e, "failed to read bound value");
            None
        });
        *state.raw.write().unwrap_or_else(PoisonError::into_inner) = initial;

        Self {
            state,
            backend,
            listener,
        }
    }

    pub fn key(&self) -> &str {
        &self.state.key
    }

    /// Kind of the slot this binding reads and writes.
    pub fn kind(&self) -> Kind {
        self.state.accessor.kind()
    }

    /// Current value with default fallback applied.
    ///
    /// String keys fall back when the stored string is empty; other kinds
    /// only when nothing is stored.
    pub fn get(&self) -> Value {
        self.state.resolved()
    }

    /// [`get`](Self::get), deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.get()).ok()
    }

    /// Write through the bound slot. `Null` deletes the stored value.
    ///
    /// Fails with [`StoreError::KindMismatch`](crate::StoreError::KindMismatch)
    /// when the value does not fit a primitive slot, and with
    /// [`StoreError::Backend`](crate::StoreError::Backend) when the backend
    /// refuses the write.
    pub fn set(&self, value: impl Into<Value>) -> StoreResult<()> {
        self.state
            .accessor
            .write(&*self.backend, &self.state.key, value.into())
    }

    /// Call `observer` with the resolved value after every change to the
    /// key, for as long as this binding lives.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.state
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    /// Re-read the backend now, notifying observers.
    pub fn refresh(&self) {
        self.state.refresh(&*self.backend);
    }
}

impl<B: KvBackend + ?Sized + 'static> Drop for Binding<B> {
    fn drop(&mut self) {
        self.backend.remove_listener(self.listener);
    }
}

impl<B: KvBackend + ?Sized + 'static> std::fmt::Debug for Binding<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.state.key)
            .field("kind", &self.kind())
            .field("value", &self.get())
            .finish()
    }
}
