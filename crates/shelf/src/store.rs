use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shelf_backend::KvBackend;
use shelf_schema::{Kind, Metadata, Schema, SchemaError};
use tracing::warn;

use crate::access::{self, Accessor};
use crate::binding::Binding;
use crate::error::{StoreError, StoreResult};
use crate::migrate::{self, MigrationReport};
use crate::options::StoreOptions;

/// Schema-typed view over a shared key-value backend.
///
/// Construction runs the migration pass; afterwards every read falls back
/// to the schema default and no read or write surfaces an error. Failures
/// are logged as warnings and replaced by the default (reads) or dropped
/// (writes).
///
/// The backend is injected and shared: several stores, direct backend
/// users and any number of [`Binding`]s may use it at once.
pub struct TypedStore<B: KvBackend + ?Sized> {
    schema: Schema,
    backend: Arc<B>,
    options: StoreOptions,
    migration: MigrationReport,
}

impl<B: KvBackend + ?Sized + 'static> TypedStore<B> {
    /// Build a store with default options and run the migration pass.
    pub fn new(schema: Schema, backend: Arc<B>) -> StoreResult<Self> {
        Self::with_options(schema, backend, StoreOptions::default())
    }

    /// Build a store and run the migration pass.
    ///
    /// Fails if the schema declares the metadata key or if the backend
    /// fails while migrating.
    pub fn with_options(schema: Schema, backend: Arc<B>, options: StoreOptions) -> StoreResult<Self> {
        if schema.contains(&options.metadata_key) {
            return Err(SchemaError::ReservedKey(options.metadata_key).into());
        }
        let migration = migrate::run(&schema, &*backend, &options.metadata_key)?;
        Ok(Self {
            schema,
            backend,
            options,
            migration,
        })
    }

    /// Value for `key`, or its default when nothing usable is stored.
    ///
    /// A key missing from the schema reads as `Null`.
    pub fn get(&self, key: &str) -> Value {
        let Some(descriptor) = self.schema.descriptor(key) else {
            warn!(key, "read of key not declared in schema");
            return Value::Null;
        };
        match self.read(key, descriptor.kind) {
            Ok(raw) => access::resolve(descriptor.kind, raw, &descriptor.default),
            Err(e) => {
                warn!(key, error = %e, "failed to read stored value; using default");
                descriptor.default.clone()
            }
        }
    }

    /// [`get`](Self::get), deserialized into `T`. `None` if the value does
    /// not have `T`'s shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match serde_json::from_value(self.get(key)) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "stored value does not fit the requested type");
                None
            }
        }
    }

    /// Store `value` for `key`. `Null` deletes the stored value.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        if let Err(e) = self.write(key, value.into()) {
            warn!(key, error = %e, "failed to write value; write dropped");
        }
    }

    /// Serialize `value` and store it for `key`.
    pub fn set_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value),
            Err(e) => warn!(key, error = %e, "failed to serialize value; write dropped"),
        }
    }

    /// Delete the stored value for `key`. Deleting an absent key is a no-op.
    ///
    /// The metadata record cannot be removed this way; use
    /// [`clear`](Self::clear).
    pub fn remove(&self, key: &str) {
        if key == self.options.metadata_key {
            warn!(key, "refusing to remove the metadata record");
            return;
        }
        if let Err(e) = self.backend.delete(key) {
            warn!(key, error = %e, "failed to remove value");
        }
    }

    /// Delete every backend entry, the metadata record included.
    pub fn clear(&self) {
        if let Err(e) = self.backend.clear_all() {
            warn!(error = %e, "failed to clear storage");
        }
    }

    /// Whether the backend holds any entry for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.backend.contains(key).unwrap_or_else(|e| {
            warn!(key, error = %e, "failed to probe key");
            false
        })
    }

    /// Live value for `key` paired with a setter.
    ///
    /// A key missing from the schema binds through the string slot with a
    /// `Null` default.
    pub fn bind(&self, key: &str) -> Binding<B> {
        let descriptor = self.schema.descriptor(key);
        let accessor = Accessor::for_kind(descriptor.map(|d| d.kind));
        let default = descriptor.map(|d| d.default.clone()).unwrap_or(Value::Null);
        Binding::new(key, accessor, default, Arc::clone(&self.backend))
    }

    /// Current metadata record as persisted in the backend.
    pub fn metadata(&self) -> StoreResult<Metadata> {
        migrate::load_metadata(&*self.backend, &self.options.metadata_key)
    }

    /// Report from the migration pass run at construction.
    pub fn last_migration(&self) -> &MigrationReport {
        &self.migration
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn read(&self, key: &str, kind: Kind) -> StoreResult<Option<Value>> {
        if !self.backend.contains(key)? {
            return Ok(None);
        }
        Accessor::for_kind(Some(kind)).read(&*self.backend, key)
    }

    fn write(&self, key: &str, value: Value) -> StoreResult<()> {
        if key == self.options.metadata_key {
            return Err(SchemaError::ReservedKey(key.to_string()).into());
        }
        if !self.options.strict_kinds {
            return access::write_loose(&*self.backend, key, value);
        }

        let descriptor = self
            .schema
            .descriptor(key)
            .ok_or_else(|| StoreError::UnknownKey(key.to_string()))?;
        if !value.is_null() && !descriptor.kind.accepts(&value) {
            return Err(StoreError::KindMismatch {
                key: key.to_string(),
                kind: descriptor.kind,
            });
        }
        Accessor::for_kind(Some(descriptor.kind)).write(&*self.backend, key, value)
    }
}

impl<B: KvBackend + ?Sized> std::fmt::Debug for TypedStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedStore")
            .field("keys", &self.schema.len())
            .field("options", &self.options)
            .field("invalidated", &self.migration.invalidated)
            .finish()
    }
}
