//! Resource lifecycle management.
//!
//! One generic manager drives the shared create/register/resize/delete flow
//! for every resource kind; per-kind behavior (validation, driver endpoints,
//! request/response mapping, label tags) lives behind the
//! [`ResourceAdapter`] capability trait instead of a shared mutable
//! structure inspected by type switches. The data disk is the reference
//! resource kind.
//!
//! Write ordering per operation: the remote mutation must succeed before
//! the primary-store write; the label-index write happens strictly after
//! and its failure is logged but never unwinds the primary write.

mod adapter;
mod disk;
mod manager;

pub use adapter::{CreateMode, Endpoint, ResourceAdapter};
pub use disk::{DiskAdapter, DiskObject, DiskReq, DiskUpsizeReq};
pub use manager::{LifecycleManager, csp_resource_name};
