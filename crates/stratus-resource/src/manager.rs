//! Generic resource lifecycle flow.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use stratus_core::{Error, Result, check_id, keys, new_uid};
use stratus_gateway::CloudDriver;
use stratus_state::StateStore;

use crate::adapter::{CreateMode, Endpoint, ResourceAdapter};

/// Drives create/register/delete for one resource kind.
///
/// The flow is fixed; kind-specific behavior comes from the adapter:
/// validate, then remote call, then primary-store write, then label-index
/// write. The label write is secondary: its failure is logged and never
/// rolls back the primary write.
pub struct LifecycleManager<A: ResourceAdapter> {
    driver: Arc<dyn CloudDriver>,
    store: StateStore,
    deadline: Option<Duration>,
    _kind: PhantomData<A>,
}

impl<A: ResourceAdapter> Clone for LifecycleManager<A> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            store: self.store.clone(),
            deadline: self.deadline,
            _kind: PhantomData,
        }
    }
}

impl<A: ResourceAdapter> LifecycleManager<A> {
    pub fn new(driver: Arc<dyn CloudDriver>, store: StateStore, deadline: Option<Duration>) -> Self {
        Self { driver, store, deadline, _kind: PhantomData }
    }

    fn key(ns: &str, id: &str) -> Result<String> {
        let key = keys::resource_key(ns, A::KIND, id);
        if !keys::is_valid_key(&key) {
            return Err(Error::Validation(format!(
                "no valid key for kind {:?} id {id:?}",
                A::KIND
            )));
        }
        Ok(key)
    }

    pub(crate) async fn driver_call(
        &self,
        endpoint: Endpoint,
        connection: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        Ok(self
            .driver
            .call(endpoint.method, &endpoint.path, connection, body, self.deadline)
            .await?)
    }

    pub(crate) fn persist(&self, ns: &str, id: &str, obj: &A::Object) -> Result<()> {
        let key = Self::key(ns, id)?;
        self.store.put(&key, obj)?;
        Ok(())
    }

    /// Create a new resource, or adopt an existing provider-native one.
    ///
    /// Identifier and request validation happen before any remote call; the
    /// remote mutation must succeed before anything is persisted.
    pub async fn create(&self, ns: &str, req: &A::Req, mode: CreateMode) -> Result<A::Object> {
        check_id(ns)?;
        check_id(A::name(req))?;
        A::validate(req, mode)?;

        let id = A::name(req);
        let key = Self::key(ns, id)?;
        if self.exists(ns, id)? {
            return Err(Error::Conflict(format!(
                "{} {id} already exists in namespace {ns}",
                A::KIND
            )));
        }

        let uid = new_uid();
        let endpoint = A::endpoint(req, mode);
        let body = A::to_driver_request(req, &uid, mode);
        let response = self
            .driver_call(endpoint, A::connection_name(req), body)
            .await?;

        let object = A::from_driver_response(ns, req, &uid, mode, response)?;
        self.store.put(&key, &object)?;
        debug!(kind = A::KIND, %id, ns, "resource stored");

        // Secondary index write; failure must never unwind the create.
        if let Err(e) =
            self.store
                .create_or_update_label(A::KIND, &uid, &key, A::label_tags(ns, &object))
        {
            warn!(kind = A::KIND, %id, error = %e, "label index write failed");
        }

        Ok(object)
    }

    /// Load a resource object from the primary store.
    pub fn get(&self, ns: &str, id: &str) -> Result<A::Object> {
        let key = Self::key(ns, id)?;
        self.store
            .get::<A::Object>(&key)?
            .ok_or_else(|| Error::NotFound(format!("{} {id} in namespace {ns}", A::KIND)))
    }

    /// Whether the resource exists in the primary store.
    pub fn exists(&self, ns: &str, id: &str) -> Result<bool> {
        let key = Self::key(ns, id)?;
        Ok(self.store.get::<Value>(&key)?.is_some())
    }

    /// Delete a resource: associated-object guard, remote delete, then
    /// removal from both stores.
    pub async fn delete(&self, ns: &str, id: &str, force: bool) -> Result<()> {
        let object = self.get(ns, id)?;

        let associated = A::associated_objects(&object);
        if !associated.is_empty() && !force {
            return Err(Error::Conflict(format!(
                "{} {id} is associated with {} object(s); delete requires force",
                A::KIND,
                associated.len()
            )));
        }

        let endpoint = A::delete_endpoint(&object);
        self.driver_call(endpoint, A::object_connection(&object), None)
            .await?;

        let key = Self::key(ns, id)?;
        self.store.delete(&key)?;
        if let Err(e) = self.store.delete_label(A::uid(&object)) {
            warn!(kind = A::KIND, %id, error = %e, "label index delete failed");
        }
        debug!(kind = A::KIND, %id, ns, "resource deleted");
        Ok(())
    }
}

/// Resolve the provider-native name recorded for a stored object.
///
/// Specs record it under `cspSpecName`; every other kind under
/// `cspResourceName`.
pub fn csp_resource_name(store: &StateStore, ns: &str, kind: &str, id: &str) -> Result<String> {
    let key = keys::resource_key(ns, kind, id);
    if !keys::is_valid_key(&key) {
        return Err(Error::Validation(format!(
            "no valid key for kind {kind:?} id {id:?}"
        )));
    }

    let object: Value = store
        .get(&key)?
        .ok_or_else(|| Error::NotFound(format!("{kind} {id} in namespace {ns}")))?;

    let field = match kind {
        keys::KIND_SPEC => "cspSpecName",
        _ => "cspResourceName",
    };
    match object.get(field).and_then(Value::as_str) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(Error::NotFound(format!(
            "{kind} {id} has no recorded {field}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::{DiskAdapter, DiskReq, DiskUpsizeReq};

    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use stratus_gateway::{GatewayError, GatewayResult, Method};

    /// Driver double that replays a scripted queue of responses and records
    /// every call it receives.
    struct ScriptedDriver {
        script: Mutex<VecDeque<GatewayResult<Value>>>,
        calls: Mutex<Vec<(Method, String)>>,
    }

    impl ScriptedDriver {
        fn new(script: Vec<GatewayResult<Value>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(Method, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CloudDriver for ScriptedDriver {
        async fn call(
            &self,
            method: Method,
            path: &str,
            _connection: &str,
            _body: Option<Value>,
            _deadline: Option<Duration>,
        ) -> GatewayResult<Value> {
            self.calls.lock().unwrap().push((method, path.to_string()));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Value::Null))
        }
    }

    fn disk_response(size: &str) -> Value {
        json!({
            "IId": {"NameId": "native-name", "SystemId": "vol-0abc"},
            "DiskType": "gp3",
            "DiskSize": size,
            "Status": "Available",
            "CreatedTime": "2024-05-01T00:00:00Z"
        })
    }

    fn disk_req(name: &str, size: &str) -> DiskReq {
        DiskReq {
            name: name.to_string(),
            connection_name: "aws-seoul".to_string(),
            disk_type: "gp3".to_string(),
            disk_size: size.to_string(),
            description: "scratch disk".to_string(),
            csp_resource_id: String::new(),
        }
    }

    fn manager(
        script: Vec<GatewayResult<Value>>,
    ) -> (LifecycleManager<DiskAdapter>, Arc<ScriptedDriver>, StateStore) {
        let driver = ScriptedDriver::new(script);
        let store = StateStore::open_in_memory().unwrap();
        (
            LifecycleManager::new(driver.clone(), store.clone(), None),
            driver,
            store,
        )
    }

    #[tokio::test]
    async fn create_persists_object_and_label() {
        let (mgr, driver, store) = manager(vec![Ok(disk_response("100"))]);

        let disk = mgr
            .create("ns01", &disk_req("disk01", "100"), CreateMode::Create)
            .await
            .unwrap();
        assert_eq!(disk.id, "disk01");
        assert_eq!(disk.csp_resource_id, "vol-0abc");
        assert_eq!(disk.system_label, "");

        // Remote call went to the creation endpoint.
        assert_eq!(driver.calls(), vec![(Method::POST, "/disk".to_string())]);

        // Primary store holds the object; label index holds the tags.
        assert!(mgr.exists("ns01", "disk01").unwrap());
        let label = store.get_label(&disk.uid).unwrap().unwrap();
        assert_eq!(label.kind, "data-disk");
        assert_eq!(label.tags["diskSize"], "100");
        assert_eq!(label.object_key, "/ns/ns01/resources/data-disk/disk01");
    }

    #[tokio::test]
    async fn invalid_identifier_fails_before_any_call() {
        let (mgr, driver, _store) = manager(vec![Ok(disk_response("100"))]);

        let err = mgr
            .create("ns01", &disk_req("Disk_01", "100"), CreateMode::Create)
            .await;
        assert!(matches!(err, Err(Error::Validation(_))));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn bad_size_fails_before_any_call() {
        let (mgr, driver, _store) = manager(vec![Ok(disk_response("100"))]);

        let err = mgr
            .create("ns01", &disk_req("disk01", "lots"), CreateMode::Create)
            .await;
        assert!(matches!(err, Err(Error::Validation(_))));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let (mgr, _driver, _store) =
            manager(vec![Ok(disk_response("100")), Ok(disk_response("100"))]);

        mgr.create("ns01", &disk_req("disk01", "100"), CreateMode::Create)
            .await
            .unwrap();
        let err = mgr
            .create("ns01", &disk_req("disk01", "100"), CreateMode::Create)
            .await;
        assert!(matches!(err, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn upstream_error_persists_nothing() {
        let (mgr, _driver, store) = manager(vec![Err(GatewayError::Upstream {
            status: 500,
            body: "quota exceeded".to_string(),
        })]);

        let err = mgr
            .create("ns01", &disk_req("disk01", "100"), CreateMode::Create)
            .await;
        match err {
            Err(Error::Upstream { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
        assert!(!mgr.exists("ns01", "disk01").unwrap());
        assert!(store.list_keys("/ns/ns01/").unwrap().is_empty());
    }

    #[tokio::test]
    async fn register_by_name_uses_lookup_get() {
        let (mgr, driver, _store) = manager(vec![Ok(disk_response("500"))]);

        let disk = mgr
            .create("ns01", &disk_req("imported", "500"), CreateMode::RegisterByName)
            .await
            .unwrap();
        assert_eq!(driver.calls(), vec![(Method::GET, "/disk/imported".to_string())]);
        assert_eq!(disk.system_label, "Registered from driver resource");
    }

    #[tokio::test]
    async fn register_by_native_id_posts_to_register_endpoint() {
        let (mgr, driver, _store) = manager(vec![Ok(disk_response("500"))]);

        let mut req = disk_req("imported", "500");
        req.csp_resource_id = "vol-0abc".to_string();
        let disk = mgr
            .create("ns01", &req, CreateMode::RegisterByNativeId)
            .await
            .unwrap();
        assert_eq!(driver.calls(), vec![(Method::POST, "/regdisk".to_string())]);
        assert_eq!(disk.system_label, "Registered from CSP resource");
    }

    #[tokio::test]
    async fn register_by_native_id_requires_the_native_id() {
        let (mgr, driver, _store) = manager(vec![Ok(disk_response("500"))]);

        let err = mgr
            .create("ns01", &disk_req("imported", "500"), CreateMode::RegisterByNativeId)
            .await;
        assert!(matches!(err, Err(Error::Validation(_))));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn get_and_exists_distinguish_absence() {
        let (mgr, _driver, _store) = manager(vec![Ok(disk_response("100"))]);

        assert!(!mgr.exists("ns01", "disk01").unwrap());
        assert!(matches!(mgr.get("ns01", "disk01"), Err(Error::NotFound(_))));

        mgr.create("ns01", &disk_req("disk01", "100"), CreateMode::Create)
            .await
            .unwrap();
        assert!(mgr.exists("ns01", "disk01").unwrap());
        assert_eq!(mgr.get("ns01", "disk01").unwrap().disk_size, "100");
    }

    #[tokio::test]
    async fn upsize_rejects_non_increasing_target() {
        let (mgr, driver, _store) = manager(vec![Ok(disk_response("100"))]);
        mgr.create("ns01", &disk_req("disk01", "100"), CreateMode::Create)
            .await
            .unwrap();

        let err = mgr
            .upsize(
                "ns01",
                "disk01",
                &DiskUpsizeReq { disk_size: "50".to_string(), description: String::new() },
            )
            .await;
        assert!(matches!(err, Err(Error::Validation(_))));

        // Equal is rejected too, never a silent no-op.
        let err = mgr
            .upsize(
                "ns01",
                "disk01",
                &DiskUpsizeReq { disk_size: "100".to_string(), description: String::new() },
            )
            .await;
        assert!(matches!(err, Err(Error::Validation(_))));

        // Only the create call reached the driver.
        assert_eq!(driver.calls().len(), 1);
    }

    #[tokio::test]
    async fn upsize_persists_the_new_size() {
        let (mgr, driver, _store) = manager(vec![Ok(disk_response("100")), Ok(Value::Null)]);
        mgr.create("ns01", &disk_req("disk01", "100"), CreateMode::Create)
            .await
            .unwrap();

        let disk = mgr
            .upsize(
                "ns01",
                "disk01",
                &DiskUpsizeReq {
                    disk_size: "150".to_string(),
                    description: "grown".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(disk.disk_size, "150");

        let calls = driver.calls();
        assert_eq!(calls[1], (Method::PUT, "/disk/native-name/size".to_string()));

        let stored = mgr.get("ns01", "disk01").unwrap();
        assert_eq!(stored.disk_size, "150");
        assert_eq!(stored.description, "grown");
    }

    #[tokio::test]
    async fn upsize_upstream_failure_keeps_stored_size() {
        let (mgr, _driver, _store) = manager(vec![
            Ok(disk_response("100")),
            Err(GatewayError::Upstream { status: 400, body: "unsupported".to_string() }),
        ]);
        mgr.create("ns01", &disk_req("disk01", "100"), CreateMode::Create)
            .await
            .unwrap();

        let err = mgr
            .upsize(
                "ns01",
                "disk01",
                &DiskUpsizeReq { disk_size: "150".to_string(), description: String::new() },
            )
            .await;
        assert!(matches!(err, Err(Error::Upstream { .. })));
        assert_eq!(mgr.get("ns01", "disk01").unwrap().disk_size, "100");
    }

    #[tokio::test]
    async fn delete_guards_associated_objects() {
        let (mgr, driver, store) = manager(vec![Ok(disk_response("100")), Ok(Value::Null)]);
        let disk = mgr
            .create("ns01", &disk_req("disk01", "100"), CreateMode::Create)
            .await
            .unwrap();

        // Attach the disk to a VM, then try to delete it.
        let key = "/ns/ns01/resources/data-disk/disk01";
        let mut attached = disk.clone();
        attached.associated_objects = vec!["/ns/ns01/mcis/m1/vm/g1-1".to_string()];
        store.put(key, &attached).unwrap();

        let err = mgr.delete("ns01", "disk01", false).await;
        assert!(matches!(err, Err(Error::Conflict(_))));
        assert!(mgr.exists("ns01", "disk01").unwrap());
        // The guard fired before any remote call.
        assert_eq!(driver.calls().len(), 1);

        // Force overrides the guard.
        mgr.delete("ns01", "disk01", true).await.unwrap();
        assert!(!mgr.exists("ns01", "disk01").unwrap());
    }

    #[tokio::test]
    async fn delete_removes_both_stores() {
        let (mgr, driver, store) = manager(vec![Ok(disk_response("100")), Ok(Value::Null)]);
        let disk = mgr
            .create("ns01", &disk_req("disk01", "100"), CreateMode::Create)
            .await
            .unwrap();
        assert!(store.get_label(&disk.uid).unwrap().is_some());

        mgr.delete("ns01", "disk01", false).await.unwrap();
        assert!(!mgr.exists("ns01", "disk01").unwrap());
        assert!(store.get_label(&disk.uid).unwrap().is_none());
        assert_eq!(
            driver.calls()[1],
            (Method::DELETE, "/disk/native-name".to_string())
        );
    }

    #[tokio::test]
    async fn csp_resource_name_resolves_per_kind() {
        let (mgr, _driver, store) = manager(vec![Ok(disk_response("100"))]);
        mgr.create("ns01", &disk_req("disk01", "100"), CreateMode::Create)
            .await
            .unwrap();

        let name = csp_resource_name(&store, "ns01", keys::KIND_DATA_DISK, "disk01").unwrap();
        assert_eq!(name, "native-name");

        assert!(matches!(
            csp_resource_name(&store, "ns01", keys::KIND_DATA_DISK, "ghost"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            csp_resource_name(&store, "ns01", "public-ip", "x"),
            Err(Error::Validation(_))
        ));
    }
}
