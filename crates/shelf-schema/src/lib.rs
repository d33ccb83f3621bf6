//! Schema types for Shelf.
//!
//! A [`Schema`] declares every logical key a typed store knows about: its
//! [`Kind`], the default returned while nothing usable is stored, and an
//! optional [`SchemaVersion`]. Bumping a key's version makes the next store
//! construction evict whatever was persisted under the old version.
//!
//! # Key Types
//!
//! - [`Kind`]: string, boolean, number or structured (JSON)
//! - [`SchemaVersion`]: opaque text or numeric version token
//! - [`KeyDescriptor`]: kind + default + optional version
//! - [`Schema`]: validated, immutable key → descriptor mapping
//! - [`Metadata`]: the persisted key → last-applied version record

pub mod error;
pub mod kind;
pub mod metadata;
pub mod schema;
pub mod version;

pub use error::SchemaError;
pub use kind::Kind;
pub use metadata::{Metadata, METADATA_KEY};
pub use schema::{KeyDescriptor, Schema, SchemaBuilder};
pub use version::SchemaVersion;
