//! Key-value backends for Shelf.
//!
//! A backend is an embedded key-value engine with three native primitive
//! slots (string, bool, number) and key-level change notification. The typed
//! store in the `shelf` crate sits on top of any [`KvBackend`]; it never
//! touches backend internals.
//!
//! # Backends
//!
//! - [`InMemoryBackend`] -- `HashMap`-based backend for tests and embedding
//! - [`FileBackend`] -- in-memory map mirrored to a JSON document on disk
//!
//! # Design Rules
//!
//! 1. Every write takes effect before the call returns.
//! 2. Listeners are notified after the write, outside the data lock.
//! 3. Reading a key through the wrong slot yields the missing sentinel (`None`).
//! 4. Backends serialize their own access; callers take no locks.

pub mod error;
pub mod file;
pub mod listener;
pub mod memory;
pub mod primitive;
pub mod traits;

pub use error::{BackendError, BackendResult};
pub use file::FileBackend;
pub use listener::{ChangeListener, ListenerId, ListenerRegistry};
pub use memory::InMemoryBackend;
pub use primitive::Primitive;
pub use traits::KvBackend;
