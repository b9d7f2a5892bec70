//! Provider gateway access for the Stratus control plane.
//!
//! The remote driver translates uniform requests into provider-specific
//! cloud API calls; this crate holds the client side of that contract:
//!
//! - [`DriverClient`]: a thin reqwest-based client exposing one uniform
//!   `call(method, path, connection, body, deadline)` operation. Non-2xx
//!   responses become [`GatewayError::Upstream`] carrying the raw body
//!   verbatim; this layer never retries.
//! - [`CloudDriver`]: the trait seam the catalog/resource/MCIS layers
//!   program against, so tests can script a fake driver.
//! - [`ConnectionRegistry`]: immutable named connections enriched on read
//!   with static geolocation data.

mod client;
mod error;
mod geo;
mod registry;
mod types;

pub use client::{CloudDriver, DriverClient, call_as};
pub use error::{GatewayError, GatewayResult};
pub use geo::cloud_location;
pub use registry::ConnectionRegistry;
pub use reqwest::Method;
pub use types::*;
