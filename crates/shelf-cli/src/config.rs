use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use shelf::{Schema, StoreOptions};

/// Contents of a schema file: the key declarations plus store options.
///
/// ```toml
/// [store]
/// strict_kinds = true
///
/// [keys.count]
/// kind = "number"
/// default = 0
/// ```
#[derive(Debug)]
pub struct ShelfConfig {
    pub options: StoreOptions,
    pub schema: Schema,
}

#[derive(Deserialize)]
struct OptionsTable {
    #[serde(default)]
    store: StoreOptions,
}

impl ShelfConfig {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let table: OptionsTable = toml::from_str(text).context("invalid [store] table")?;
        let schema = Schema::from_toml(text)?;
        Ok(Self {
            options: table.store,
            schema,
        })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read schema file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in schema file {}", path.display()))
    }
}
