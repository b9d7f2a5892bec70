//! redb table definitions for the Stratus stores.
//!
//! The object store table uses path-shaped `&str` keys
//! (`/ns/{ns}/resources/{kind}/{id}`, `/ns/{ns}/mcis/{id}/...`) with
//! JSON-serialized values. The spec catalog is an append-log keyed by a
//! monotonically increasing sequence number, with a separate key index
//! mapping `{ns}/{id}` to the newest sequence.

use redb::TableDefinition;

/// Resource/MCIS/policy documents keyed by their full path key.
pub const OBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");

/// Spec catalog rows keyed by insertion sequence.
pub const SPEC_ROWS: TableDefinition<u64, &[u8]> = TableDefinition::new("spec_rows");

/// Spec key index: `{ns}/{id}` to the sequence of the row it points at.
pub const SPEC_KEYS: TableDefinition<&str, u64> = TableDefinition::new("spec_keys");

/// Label index entries keyed by resource uid.
pub const LABELS: TableDefinition<&str, &[u8]> = TableDefinition::new("labels");

/// Store metadata (currently only the catalog sequence counter).
pub const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// META key holding the next catalog row sequence.
pub const SPEC_NEXT_SEQ: &str = "spec_next_seq";
