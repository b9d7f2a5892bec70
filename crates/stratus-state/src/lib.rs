//! Embedded persistence for the Stratus control plane.
//!
//! Three independent persistence collaborators share one redb database:
//!
//! - the **object store**: generic key/value CRUD over path-shaped keys,
//!   holding JSON-serialized resource/MCIS/policy documents;
//! - the **spec catalog**: an append-log of normalized instance-type rows
//!   with a key index, batched bulk insert, predicate queries, and a
//!   deduplication maintenance pass;
//! - the **label index**: a secondary tag mapping keyed by resource uid.
//!
//! No transaction ever spans more than one of the three; callers accept
//! transient divergence after a partial failure, with catalog dedup as the
//! compensating mechanism.

mod catalog;
mod error;
mod labels;
mod store;
mod tables;
mod types;

pub use catalog::{Predicate, SPEC_BATCH_SIZE};
pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::{LabelEntry, SpecEntry};
