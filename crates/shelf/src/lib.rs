//! Schema-typed persistent key-value storage.
//!
//! [`TypedStore`] layers a declarative [`Schema`] over any
//! [`KvBackend`](shelf_backend::KvBackend): every key has a kind and a
//! default, reads never fail, and bumping a key's schema version evicts the
//! value persisted under the old version the next time a store is built.
//!
//! ```
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use shelf::{KeyDescriptor, Schema, TypedStore};
//! use shelf_backend::InMemoryBackend;
//!
//! let schema = Schema::builder()
//!     .key("count", KeyDescriptor::number(0))
//!     .key("profile", KeyDescriptor::structured(json!({})).with_version("2"))
//!     .build()
//!     .unwrap();
//! let store = TypedStore::new(schema, Arc::new(InMemoryBackend::new())).unwrap();
//!
//! assert_eq!(store.get("count"), json!(0));
//! store.set("count", 5);
//! assert_eq!(store.get("count"), json!(5));
//!
//! let count = store.bind("count");
//! store.set("count", 6);
//! assert_eq!(count.get(), json!(6));
//! ```
//!
//! # Modules
//!
//! - [`store`]: [`TypedStore`]: imperative get/set/remove/clear
//! - [`binding`]: [`Binding`]: live value + setter for one key
//! - [`migrate`]: the construction-time version check
//! - [`options`]: [`StoreOptions`]
//! - [`error`]: [`StoreError`]

mod access;
pub mod binding;
pub mod error;
pub mod migrate;
pub mod options;
pub mod store;

#[cfg(test)]
mod testing;

pub use binding::Binding;
pub use error::{StoreError, StoreResult};
pub use migrate::MigrationReport;
pub use options::StoreOptions;
pub use store::TypedStore;

pub use shelf_schema::{Kind, KeyDescriptor, Metadata, Schema, SchemaError, SchemaVersion, METADATA_KEY};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use shelf_backend::{FileBackend, InMemoryBackend, KvBackend};
    use std::sync::Arc;

    #[test]
    fn counter_scenario() {
        let schema = Schema::builder()
            .key("count", KeyDescriptor::number(0))
            .build()
            .unwrap();
        let store = TypedStore::new(schema, Arc::new(InMemoryBackend::new())).unwrap();

        assert_eq!(store.get("count"), json!(0));
        store.set("count", 5);
        assert_eq!(store.get("count"), json!(5));
        store.set("count", Value::Null);
        assert_eq!(store.get("count"), json!(0));
    }

    #[test]
    fn blob_version_scenario() {
        let blob = |version: &str| {
            Schema::builder()
                .key("blob", KeyDescriptor::structured(json!({})).with_version(version))
                .build()
                .unwrap()
        };
        let backend = Arc::new(InMemoryBackend::new());

        let v1 = TypedStore::new(blob("1"), Arc::clone(&backend)).unwrap();
        v1.set("blob", json!({ "x": 1 }));

        let v2 = TypedStore::new(blob("2"), Arc::clone(&backend)).unwrap();
        assert_eq!(v2.get("blob"), json!({}));
        assert_eq!(
            v2.metadata().unwrap().get("blob"),
            Some(&SchemaVersion::from("2"))
        );
    }

    #[test]
    fn persists_across_processes_with_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let schema = || {
            Schema::from_toml(
                r#"
                [keys.theme]
                kind = "string"
                default = "light"

                [keys.cache]
                kind = "structured"
                default = []
                version = 1
                "#,
            )
            .unwrap()
        };

        {
            let store = TypedStore::new(schema(), Arc::new(FileBackend::open(&path).unwrap())).unwrap();
            store.set("theme", "dark");
            store.set("cache", json!([1, 2]));
        }

        let backend = Arc::new(FileBackend::open(&path).unwrap());
        assert!(backend.contains(METADATA_KEY).unwrap());
        let store = TypedStore::new(schema(), backend).unwrap();
        assert!(store.last_migration().is_noop());
        assert_eq!(store.get("theme"), json!("dark"));
        assert_eq!(store.get("cache"), json!([1, 2]));
    }
}
