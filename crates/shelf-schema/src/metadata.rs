use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::version::SchemaVersion;

/// Backend key under which the migration record is persisted.
pub const METADATA_KEY: &str = "__storage_metadata";

/// Persisted mapping from logical key to the last schema version applied.
///
/// Encoded as a flat JSON object (`{"blob": "2", "cache": 3}`). Entries for
/// keys that have left the schema are kept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, SchemaVersion>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(text: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(text).map_err(|e| SchemaError::Parse(e.to_string()))
    }

    pub fn encode(&self) -> Result<String, SchemaError> {
        serde_json::to_string(self).map_err(|e| SchemaError::Parse(e.to_string()))
    }

    /// Version last applied for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&SchemaVersion> {
        self.0.get(key)
    }

    /// Record `version` for `key`, returning the previous version.
    pub fn record(&mut self, key: &str, version: SchemaVersion) -> Option<SchemaVersion> {
        self.0.insert(key.to_string(), version)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaVersion)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_as_flat_object() {
        let mut meta = Metadata::new();
        meta.record("blob", SchemaVersion::from("2"));
        meta.record("cache", SchemaVersion::from(3));
        assert_eq!(meta.encode().unwrap(), r#"{"blob":"2","cache":3.0}"#);
    }

    #[test]
    fn decodes_record_written_elsewhere() {
        let meta = Metadata::decode(r#"{"exampleObject":"2.0","n":1}"#).unwrap();
        assert_eq!(meta.len(), 2);
        assert_eq!(meta.get("exampleObject"), Some(&SchemaVersion::from("2.0")));
        assert_eq!(meta.get("n"), Some(&SchemaVersion::from(1)));
        assert_eq!(meta.get("missing"), None);
    }

    #[test]
    fn record_returns_previous() {
        let mut meta = Metadata::new();
        assert_eq!(meta.record("k", SchemaVersion::from("1")), None);
        assert_eq!(
            meta.record("k", SchemaVersion::from("2")),
            Some(SchemaVersion::from("1"))
        );
        assert_eq!(meta.len(), 1);
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(Metadata::decode("[1,2"), Err(SchemaError::Parse(_))));
        assert!(Metadata::decode(r#"{"k": true}"#).is_err());
    }

    proptest::proptest! {
        #[test]
        fn versions_survive_encoding(
            key in "[a-zA-Z_]{1,16}",
            text in "[a-z0-9.]{1,8}",
            number in 0u32..100_000,
        ) {
            let mut meta = Metadata::new();
            meta.record(&key, SchemaVersion::from(text.as_str()));
            meta.record("numeric", SchemaVersion::from(number));
            let decoded = Metadata::decode(&meta.encode().unwrap()).unwrap();
            proptest::prop_assert_eq!(decoded, meta);
        }
    }
}
