//! Per-kind capability trait for the generic lifecycle flow.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use stratus_core::Result;
use stratus_gateway::Method;

/// How a resource comes into the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Create a new provider-native resource through the driver.
    Create,
    /// Adopt a resource the driver already knows by name (lookup-style GET).
    RegisterByName,
    /// Adopt a provider-native resource by its native id (creation-style
    /// POST against the driver's register endpoint).
    RegisterByNativeId,
}

/// A driver endpoint selected for one operation.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into() }
    }
}

/// Capability interface implemented once per resource kind.
///
/// Implementations are stateless; the [`crate::LifecycleManager`] owns the
/// driver and store handles and calls these hooks in a fixed order:
/// validate, endpoint, to_driver_request, from_driver_response, label_tags.
pub trait ResourceAdapter: Send + Sync + 'static {
    /// Kind string used in store keys and label entries.
    const KIND: &'static str;

    /// Creation/registration request shape.
    type Req: Send + Sync;
    /// Canonical persisted object shape.
    type Object: Serialize + DeserializeOwned + Send + Sync;

    /// Namespace-unique id requested for the new object.
    fn name(req: &Self::Req) -> &str;

    /// Connection the driver call is addressed to.
    fn connection_name(req: &Self::Req) -> &str;

    /// Kind-specific request validation. Runs after the identifier rule
    /// check and before any remote call.
    fn validate(req: &Self::Req, mode: CreateMode) -> Result<()>;

    /// Driver endpoint and verb for the given mode.
    fn endpoint(req: &Self::Req, mode: CreateMode) -> Endpoint;

    /// Driver request payload (the envelope's `ReqInfo`).
    fn to_driver_request(req: &Self::Req, uid: &str, mode: CreateMode) -> Option<Value>;

    /// Map the driver response into the canonical object shape.
    fn from_driver_response(
        ns: &str,
        req: &Self::Req,
        uid: &str,
        mode: CreateMode,
        response: Value,
    ) -> Result<Self::Object>;

    /// Uid recorded on the object.
    fn uid(obj: &Self::Object) -> &str;

    /// Connection recorded on the object.
    fn object_connection(obj: &Self::Object) -> &str;

    /// Objects that reference this one; non-empty blocks deletion without
    /// an explicit override.
    fn associated_objects(obj: &Self::Object) -> &[String];

    /// Driver endpoint for deleting the provider-native resource.
    fn delete_endpoint(obj: &Self::Object) -> Endpoint;

    /// Tags written to the label index after the primary write.
    fn label_tags(ns: &str, obj: &Self::Object) -> HashMap<String, String>;
}
