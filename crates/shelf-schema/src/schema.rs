use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;
use crate::kind::{value_type_name, Kind};
use crate::metadata::METADATA_KEY;
use crate::version::SchemaVersion;

/// Declaration of one logical key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyDescriptor {
    #[serde(alias = "type")]
    pub kind: Kind,
    /// Returned whenever nothing usable is stored for the key.
    pub default: Value,
    /// Changing this evicts the stored value on the next store construction.
    #[serde(
        default,
        alias = "schema_version",
        alias = "schemaVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<SchemaVersion>,
}

impl KeyDescriptor {
    pub fn new(kind: Kind, default: impl Into<Value>) -> Self {
        Self {
            kind,
            default: default.into(),
            version: None,
        }
    }

    pub fn string(default: impl Into<String>) -> Self {
        Self::new(Kind::String, Value::String(default.into()))
    }

    pub fn boolean(default: bool) -> Self {
        Self::new(Kind::Boolean, default)
    }

    pub fn number(default: impl Into<Value>) -> Self {
        Self::new(Kind::Number, default)
    }

    pub fn structured(default: Value) -> Self {
        Self::new(Kind::Structured, default)
    }

    /// Attach a version token.
    pub fn with_version(mut self, version: impl Into<SchemaVersion>) -> Self {
        self.version = Some(version.into());
        self
    }

    fn validate(&self, key: &str) -> Result<(), SchemaError> {
        if !self.kind.accepts(&self.default) {
            return Err(SchemaError::DefaultKindMismatch {
                key: key.to_string(),
                kind: self.kind,
                found: value_type_name(&self.default),
            });
        }
        // The metadata record is JSON, which cannot hold NaN or infinity.
        if let Some(SchemaVersion::Number(n)) = &self.version {
            if !n.is_finite() {
                return Err(SchemaError::InvalidVersion {
                    key: key.to_string(),
                    version: n.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Validated, immutable mapping from logical key to [`KeyDescriptor`].
///
/// Keys iterate in sorted order, which fixes the order of the migration
/// pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    keys: BTreeMap<String, KeyDescriptor>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Validate an already-collected mapping.
    pub fn from_descriptors(keys: BTreeMap<String, KeyDescriptor>) -> Result<Self, SchemaError> {
        for (key, descriptor) in &keys {
            validate_key(key)?;
            descriptor.validate(key)?;
        }
        Ok(Self { keys })
    }

    /// Load from a TOML document with one `[keys.<name>]` table per key.
    ///
    /// ```toml
    /// [keys.count]
    /// kind = "number"
    /// default = 0
    ///
    /// [keys.profile]
    /// kind = "structured"
    /// default = {}
    /// version = "2"
    /// ```
    ///
    /// Other top-level tables are ignored.
    pub fn from_toml(text: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDocument =
            toml::from_str(text).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::from_descriptors(doc.keys)
    }

    /// Load from a JSON document shaped like the TOML one (`{"keys": {...}}`).
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDocument =
            serde_json::from_str(text).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::from_descriptors(doc.keys)
    }

    pub fn descriptor(&self, key: &str) -> Option<&KeyDescriptor> {
        self.keys.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Declared keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeyDescriptor)> {
        self.keys.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// Keys that declare a version, with that version.
    pub fn versioned(&self) -> impl Iterator<Item = (&str, &SchemaVersion)> {
        self.keys
            .iter()
            .filter_map(|(k, d)| d.version.as_ref().map(|v| (k.as_str(), v)))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Collects key declarations and validates them in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    keys: Vec<(String, KeyDescriptor)>,
}

impl SchemaBuilder {
    pub fn key(mut self, name: impl Into<String>, descriptor: KeyDescriptor) -> Self {
        self.keys.push((name.into(), descriptor));
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut keys = BTreeMap::new();
        for (name, descriptor) in self.keys {
            if keys.contains_key(&name) {
                return Err(SchemaError::DuplicateKey(name));
            }
            keys.insert(name, descriptor);
        }
        Schema::from_descriptors(keys)
    }
}

#[derive(Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    keys: BTreeMap<String, KeyDescriptor>,
}

fn validate_key(key: &str) -> Result<(), SchemaError> {
    if key.is_empty() {
        return Err(SchemaError::EmptyKey);
    }
    if key == METADATA_KEY {
        return Err(SchemaError::ReservedKey(key.to_string()));
    }
    Ok(())
}
