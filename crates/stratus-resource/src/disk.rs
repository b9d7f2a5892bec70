//! Data disk resource kind, the reference adapter instance.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use stratus_core::{Error, Result, keys};
use stratus_gateway::{DriverDiskInfo, KeyValue, Method};

use crate::adapter::{CreateMode, Endpoint, ResourceAdapter};
use crate::manager::LifecycleManager;

/// Disk creation/registration request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiskReq {
    pub name: String,
    pub connection_name: String,
    pub disk_type: String,
    /// Size in GB, as the driver carries it.
    pub disk_size: String,
    pub description: String,
    /// Provider-native id, required for register-by-native-id.
    pub csp_resource_id: String,
}

/// Disk resize request. The target size must be strictly greater than the
/// current size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUpsizeReq {
    pub disk_size: String,
    #[serde(default)]
    pub description: String,
}

/// Canonical persisted disk object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskObject {
    pub resource_type: String,
    pub id: String,
    pub name: String,
    pub uid: String,
    pub connection_name: String,
    pub disk_type: String,
    pub disk_size: String,
    pub csp_resource_id: String,
    pub csp_resource_name: String,
    pub status: String,
    #[serde(default)]
    pub associated_objects: Vec<String>,
    pub created_time: String,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
    pub description: String,
    pub system_label: String,
}

fn parse_size(raw: &str) -> Result<u32> {
    raw.parse::<u32>()
        .map_err(|_| Error::Validation(format!("disk size {raw:?} is not a whole GB count")))
}

/// Adapter for the data disk kind.
pub struct DiskAdapter;

impl ResourceAdapter for DiskAdapter {
    const KIND: &'static str = keys::KIND_DATA_DISK;

    type Req = DiskReq;
    type Object = DiskObject;

    fn name(req: &DiskReq) -> &str {
        &req.name
    }

    fn connection_name(req: &DiskReq) -> &str {
        &req.connection_name
    }

    fn validate(req: &DiskReq, mode: CreateMode) -> Result<()> {
        if req.connection_name.is_empty() {
            return Err(Error::Validation("connectionName is required".to_string()));
        }
        match mode {
            CreateMode::Create => {
                let size = parse_size(&req.disk_size)?;
                if size == 0 {
                    return Err(Error::Validation("disk size must be positive".to_string()));
                }
            }
            CreateMode::RegisterByName => {}
            CreateMode::RegisterByNativeId => {
                if req.csp_resource_id.is_empty() {
                    return Err(Error::Validation(
                        "cspResourceId is required to register by native id".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn endpoint(req: &DiskReq, mode: CreateMode) -> Endpoint {
        match mode {
            // The driver already knows the disk under the requested name.
            CreateMode::RegisterByName => {
                Endpoint::new(Method::GET, format!("/disk/{}", req.name))
            }
            CreateMode::RegisterByNativeId => Endpoint::new(Method::POST, "/regdisk"),
            CreateMode::Create => Endpoint::new(Method::POST, "/disk"),
        }
    }

    fn to_driver_request(req: &DiskReq, uid: &str, _mode: CreateMode) -> Option<Value> {
        Some(json!({
            "Name": uid,
            "CSPid": req.csp_resource_id,
            "DiskType": req.disk_type,
            "DiskSize": req.disk_size,
        }))
    }

    fn from_driver_response(
        _ns: &str,
        req: &DiskReq,
        uid: &str,
        mode: CreateMode,
        response: Value,
    ) -> Result<DiskObject> {
        let info: DriverDiskInfo = serde_json::from_value(response)
            .map_err(|e| Error::Driver(format!("unexpected disk payload: {e}")))?;

        let system_label = match mode {
            CreateMode::Create => String::new(),
            CreateMode::RegisterByName => "Registered from driver resource".to_string(),
            CreateMode::RegisterByNativeId => "Registered from CSP resource".to_string(),
        };

        Ok(DiskObject {
            resource_type: Self::KIND.to_string(),
            id: req.name.clone(),
            name: req.name.clone(),
            uid: uid.to_string(),
            connection_name: req.connection_name.clone(),
            disk_type: info.disk_type,
            disk_size: info.disk_size,
            csp_resource_id: info.iid.system_id,
            csp_resource_name: info.iid.name_id,
            status: info.status,
            associated_objects: Vec::new(),
            created_time: info.created_time,
            key_value_list: info.key_value_list,
            description: req.description.clone(),
            system_label,
        })
    }

    fn uid(obj: &DiskObject) -> &str {
        &obj.uid
    }

    fn object_connection(obj: &DiskObject) -> &str {
        &obj.connection_name
    }

    fn associated_objects(obj: &DiskObject) -> &[String] {
        &obj.associated_objects
    }

    fn delete_endpoint(obj: &DiskObject) -> Endpoint {
        Endpoint::new(Method::DELETE, format!("/disk/{}", obj.csp_resource_name))
    }

    fn label_tags(ns: &str, obj: &DiskObject) -> HashMap<String, String> {
        HashMap::from([
            ("manager".to_string(), "stratus".to_string()),
            ("namespace".to_string(), ns.to_string()),
            ("labelType".to_string(), Self::KIND.to_string()),
            ("id".to_string(), obj.id.clone()),
            ("name".to_string(), obj.name.clone()),
            ("uid".to_string(), obj.uid.clone()),
            ("diskType".to_string(), obj.disk_type.clone()),
            ("diskSize".to_string(), obj.disk_size.clone()),
            ("cspResourceId".to_string(), obj.csp_resource_id.clone()),
            ("cspResourceName".to_string(), obj.csp_resource_name.clone()),
            ("connectionName".to_string(), obj.connection_name.clone()),
            ("description".to_string(), obj.description.clone()),
            ("createdTime".to_string(), obj.created_time.clone()),
        ])
    }
}

impl LifecycleManager<DiskAdapter> {
    /// Grow a disk. The target size must be strictly greater than the
    /// current size; anything else is a validation error, never a silent
    /// no-op. Resize is inherently single-target: a driver timeout fails
    /// the whole operation.
    pub async fn upsize(&self, ns: &str, id: &str, req: &DiskUpsizeReq) -> Result<DiskObject> {
        let mut disk = self.get(ns, id)?;

        let current = parse_size(&disk.disk_size)?;
        let target = parse_size(&req.disk_size)?;
        if target <= current {
            return Err(Error::Validation(format!(
                "target disk size ({target} GB) must be greater than the current size ({current} GB)"
            )));
        }

        self.driver_call(
            Endpoint::new(
                Method::PUT,
                format!("/disk/{}/size", disk.csp_resource_name),
            ),
            &disk.connection_name,
            Some(json!({ "Size": req.disk_size })),
        )
        .await?;

        disk.disk_size = req.disk_size.clone();
        disk.description = req.description.clone();
        self.persist(ns, id, &disk)?;
        Ok(disk)
    }
}
