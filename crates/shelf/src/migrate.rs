use shelf_backend::{KvBackend, Primitive};
use shelf_schema::{Metadata, Schema};
use tracing::{debug, warn};

use crate::error::StoreResult;

/// Outcome of the construction-time migration pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MigrationReport {
    /// Keys whose stored value was evicted because their version changed
    /// (or was recorded for the first time).
    pub invalidated: Vec<String>,
    /// The metadata record as written back to the backend.
    pub metadata: Metadata,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.invalidated.is_empty()
    }
}

/// Read the metadata record at `metadata_key`.
///
/// A missing or empty record is an empty mapping. A record that does not
/// decode is logged and treated as empty, which invalidates every versioned
/// key on the next pass.
pub(crate) fn load_metadata<B>(backend: &B, metadata_key: &str) -> StoreResult<Metadata>
where
    B: KvBackend + ?Sized,
{
    match backend.get_string(metadata_key)? {
        Some(text) if !text.is_empty() => Ok(Metadata::decode(&text).unwrap_or_else(|e| {
            warn!(key = metadata_key, error = %e, "unreadable storage metadata; starting fresh");
            Metadata::new()
        })),
        _ => Ok(Metadata::new()),
    }
}

/// Evict every versioned key whose recorded version differs from the
/// schema, then write the merged record back.
///
/// The record is written even when nothing changed. Versions recorded for
/// keys that are no longer in the schema are carried over untouched.
pub(crate) fn run<B>(schema: &Schema, backend: &B, metadata_key: &str) -> StoreResult<MigrationReport>
where
    B: KvBackend + ?Sized,
{
    let mut metadata = load_metadata(backend, metadata_key)?;
    let mut invalidated = Vec::new();

    for (key, version) in schema.versioned() {
        if metadata.get(key) == Some(version) {
            continue;
        }
        backend.delete(key)?;
        let previous = metadata.record(key, version.clone());
        match previous {
            Some(previous) => {
                debug!(key, from = %previous, to = %version, "schema version changed; stored value evicted")
            }
            None => debug!(key, to = %version, "first version recorded; stored value evicted"),
        }
        invalidated.push(key.to_string());
    }

    backend.set(metadata_key, Primitive::String(metadata.encode()?))?;
    debug!(invalidated = invalidated.len(), "migration pass complete");

    Ok(MigrationReport {
        invalidated,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shelf_backend::InMemoryBackend;
    use shelf_schema::{KeyDescriptor, SchemaVersion, METADATA_KEY};

    fn schema(version: &str) -> Schema {
        Schema::builder()
            .key("blob", KeyDescriptor::structured(json!({})).with_version(version))
            .key("plain", KeyDescriptor::string("x"))
            .build()
            .unwrap()
    }

    #[test]
    fn first_pass_records_versions() {
        let backend = InMemoryBackend::new();
        let report = run(&schema("1"), &backend, METADATA_KEY).unwrap();
        assert_eq!(report.invalidated, vec!["blob"]);
        assert_eq!(report.metadata.get("blob"), Some(&SchemaVersion::from("1")));
        assert_eq!(
            backend.get_string(METADATA_KEY).unwrap(),
            Some(r#"{"blob":"1"}"#.into())
        );
    }

    #[test]
    fn matching_version_is_a_noop_but_still_writes() {
        let backend = InMemoryBackend::new();
        run(&schema("1"), &backend, METADATA_KEY).unwrap();
        backend.set("blob", r#"{"kept":true}"#.into()).unwrap();
        backend.delete(METADATA_KEY).unwrap();
        backend.set(METADATA_KEY, r#"{"blob":"1"}"#.into()).unwrap();

        let report = run(&schema("1"), &backend, METADATA_KEY).unwrap();
        assert!(report.is_noop());
        assert!(backend.contains("blob").unwrap());
        assert!(backend.contains(METADATA_KEY).unwrap());
    }

    #[test]
    fn unversioned_keys_are_never_touched() {
        let backend = InMemoryBackend::new();
        backend.set("plain", "kept".into()).unwrap();
        run(&schema("1"), &backend, METADATA_KEY).unwrap();
        run(&schema("2"), &backend, METADATA_KEY).unwrap();
        assert_eq!(backend.get_string("plain").unwrap(), Some("kept".into()));
    }

    #[test]
    fn records_for_removed_keys_survive() {
        let backend = InMemoryBackend::new();
        backend
            .set(METADATA_KEY, r#"{"retired":"7"}"#.into())
            .unwrap();
        let report = run(&schema("1"), &backend, METADATA_KEY).unwrap();
        assert_eq!(report.metadata.get("retired"), Some(&SchemaVersion::from("7")));
        assert_eq!(report.metadata.len(), 2);
    }

    #[test]
    fn corrupt_record_counts_as_empty() {
        let backend = InMemoryBackend::new();
        backend.set(METADATA_KEY, "not json".into()).unwrap();
        backend.set("blob", "{}".into()).unwrap();
        let report = run(&schema("1"), &backend, METADATA_KEY).unwrap();
        assert_eq!(report.invalidated, vec!["blob"]);
        assert!(!backend.contains("blob").unwrap());
    }

    #[test]
    fn custom_metadata_key() {
        let backend = InMemoryBackend::new();
        run(&schema("1"), &backend, "__meta").unwrap();
        assert!(backend.contains("__meta").unwrap());
        assert!(!backend.contains(METADATA_KEY).unwrap());
    }
}
