pub mod config;
pub mod error;
pub mod id;
pub mod keys;

pub use config::StratusConfig;
pub use error::{Error, Result};
pub use id::{check_id, new_uid, to_safe_id};
pub use keys::*;
