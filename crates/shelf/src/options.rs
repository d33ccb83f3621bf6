use serde::{Deserialize, Serialize};
use shelf_schema::METADATA_KEY;

/// Configuration for a [`TypedStore`](crate::TypedStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Backend key holding the migration record.
    pub metadata_key: String,
    /// When `true`, `set` rejects values whose runtime type does not fit
    /// the key's declared kind, and always JSON-encodes structured keys.
    /// When `false`, values are written to the slot matching their own
    /// runtime type.
    pub strict_kinds: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            metadata_key: METADATA_KEY.to_string(),
            strict_kinds: false,
        }
    }
}

impl StoreOptions {
    /// Options that enforce declared kinds on write.
    pub fn strict() -> Self {
        Self {
            strict_kinds: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let o = StoreOptions::default();
        assert_eq!(o.metadata_key, "__storage_metadata");
        assert!(!o.strict_kinds);
        assert!(StoreOptions::strict().strict_kinds);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let o: StoreOptions = serde_json::from_str(r#"{"strict_kinds": true}"#).unwrap();
        assert_eq!(o.metadata_key, METADATA_KEY);
        assert!(o.strict_kinds);
    }
}
