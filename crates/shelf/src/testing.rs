//! Test backend that can be switched into a failing state.

use std::sync::atomic::{AtomicBool, Ordering};

use shelf_backend::{
    BackendError, BackendResult, ChangeListener, InMemoryBackend, KvBackend, ListenerId, Primitive,
};

#[derive(Debug, Default)]
pub(crate) struct FlakyBackend {
    inner: InMemoryBackend,
    failing: AtomicBool,
}

impl FlakyBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    fn check(&self) -> BackendResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

impl KvBackend for FlakyBackend {
    fn contains(&self, key: &str) -> BackendResult<bool> {
        self.check()?;
        self.inner.contains(key)
    }

    fn get_string(&self, key: &str) -> BackendResult<Option<String>> {
        self.check()?;
        self.inner.get_string(key)
    }

    fn get_bool(&self, key: &str) -> BackendResult<Option<bool>> {
        self.check()?;
        self.inner.get_bool(key)
    }

    fn get_number(&self, key: &str) -> BackendResult<Option<f64>> {
        self.check()?;
        self.inner.get_number(key)
    }

    fn set(&self, key: &str, value: Primitive) -> BackendResult<()> {
        self.check()?;
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> BackendResult<bool> {
        self.check()?;
        self.inner.delete(key)
    }

    fn clear_all(&self) -> BackendResult<()> {
        self.check()?;
        self.inner.clear_all()
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        self.check()?;
        self.inner.keys()
    }

    fn add_listener(&self, listener: ChangeListener) -> ListenerId {
        self.inner.add_listener(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.remove_listener(id)
    }
}
