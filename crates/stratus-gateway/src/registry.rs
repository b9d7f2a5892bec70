//! Connection registry.
//!
//! Holds immutable connection descriptors registered at startup (or through
//! the boundary API) and resolves each to an enriched geolocation on read. A
//! resolution failure for one connection never invalidates the others;
//! aggregating callers accept partial success.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::error::{GatewayError, GatewayResult};
use crate::geo;
use crate::types::ConnConfig;

/// Thread-safe registry of named provider connections.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<String, ConnConfig>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Descriptors are immutable once registered;
    /// re-registering a name is an error.
    pub fn register(&self, conn: ConnConfig) -> GatewayResult<()> {
        let mut map = self.inner.write().expect("registry lock poisoned");
        if map.contains_key(&conn.name) {
            return Err(GatewayError::AlreadyRegistered(conn.name));
        }
        map.insert(conn.name.clone(), conn);
        Ok(())
    }

    /// Get one connection with its geolocation resolved.
    ///
    /// An unknown provider/region in the geography asset is a terminal
    /// error for this connection only.
    pub fn get(&self, name: &str) -> GatewayResult<ConnConfig> {
        let mut conn = {
            let map = self.inner.read().expect("registry lock poisoned");
            map.get(name)
                .cloned()
                .ok_or_else(|| GatewayError::UnknownConnection(name.to_string()))?
        };
        let location = geo::cloud_location(&conn.provider_name, &conn.region_name)?;
        conn.location = Some(location);
        Ok(conn)
    }

    /// List all connections with best-effort geolocation enrichment.
    ///
    /// Resolution failures are logged and leave that connection's location
    /// empty; the rest of the list is unaffected.
    pub fn list(&self) -> Vec<ConnConfig> {
        let mut conns: Vec<ConnConfig> = {
            let map = self.inner.read().expect("registry lock poisoned");
            map.values().cloned().collect()
        };
        conns.sort_by(|a, b| a.name.cmp(&b.name));
        for conn in &mut conns {
            match geo::cloud_location(&conn.provider_name, &conn.region_name) {
                Ok(location) => conn.location = Some(location),
                Err(e) => {
                    warn!(connection = %conn.name, error = %e, "cannot resolve location");
                }
            }
        }
        conns
    }

    /// Names of all registered connections.
    pub fn names(&self) -> Vec<String> {
        let map = self.inner.read().expect("registry lock poisoned");
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }
}
