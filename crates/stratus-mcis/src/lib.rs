//! MCIS fan-out operations.
//!
//! An MCIS is a logical group of VM instances organized into subgroups,
//! potentially spanning providers and regions, managed as one unit. This
//! crate covers the operations that fan out across the group:
//!
//! - distinct retrieval projections (full object, id list, status,
//!   access info), each doing its own aggregation work;
//! - remote command dispatch with per-VM failure isolation;
//! - namespace+MCIS-scoped automation policy CRUD.
//!
//! Fan-out units run as independent tasks; every outcome is tagged with its
//! target VM's identity, and a per-target failure never cancels siblings.

mod command;
mod model;
mod ops;
mod policy;

pub use command::{
    CommandRunner, DEFAULT_VM_USER, RemoteCommander, SshCommandRunner,
};
pub use model::*;
pub use ops::McisService;
