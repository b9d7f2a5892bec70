//! Wire types for the provider gateway and connection descriptors.
//!
//! Driver payloads use the driver's PascalCase field names and carry most
//! numbers as strings; normalization into canonical types happens in the
//! catalog crawler, not here.

use serde::{Deserialize, Serialize};

/// A generic key/value pair as the driver reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Driver-side identity of a provider-native resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriverIid {
    pub name_id: String,
    pub system_id: String,
}

/// vCPU block of a driver spec descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriverVCpuInfo {
    #[serde(default)]
    pub count: String,
    #[serde(default)]
    pub clock: String,
}

/// Accelerator block of a driver spec descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriverGpuInfo {
    #[serde(default)]
    pub count: String,
    #[serde(default)]
    pub mfr: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, rename = "MemSizeGB")]
    pub mem_size_gb: String,
}

/// One instance-type descriptor as the driver reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriverSpecInfo {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, rename = "VCpu")]
    pub v_cpu: DriverVCpuInfo,
    #[serde(default, rename = "MemSizeMiB")]
    pub mem_size_mib: String,
    #[serde(default, rename = "DiskSizeGB")]
    pub disk_size_gb: String,
    #[serde(default)]
    pub gpu: Vec<DriverGpuInfo>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

/// The driver's full instance-type catalog for one connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverSpecList {
    #[serde(default)]
    pub vmspec: Vec<DriverSpecInfo>,
}

/// A disk resource as the driver reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriverDiskInfo {
    #[serde(rename = "IId")]
    pub iid: DriverIid,
    #[serde(default)]
    pub disk_type: String,
    #[serde(default)]
    pub disk_size: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

/// A VM's runtime status as the driver reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriverVmStatusInfo {
    #[serde(default)]
    pub vm_status: String,
}

/// A named, immutable provider connection.
///
/// `location` is not stored: it is computed on read by joining the
/// connection's provider and native region against the static geography
/// asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnConfig {
    pub name: String,
    pub provider_name: String,
    pub region_name: String,
    pub credential_name: String,
    #[serde(default)]
    pub location: Option<GeoLocation>,
}

/// Geographical location of a connection's region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub latitude: String,
    pub longitude: String,
    pub brief_addr: String,
    pub cloud_type: String,
    pub native_region: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_info_parses_driver_payload() {
        let json = r#"{
            "Name": "t3.large",
            "Region": "ap-northeast-2",
            "VCpu": {"Count": "2", "Clock": "2.5"},
            "MemSizeMiB": "8192",
            "DiskSizeGB": "-1",
            "Gpu": [{"Count": "1", "Mfr": "NVIDIA", "Model": "T4", "MemSizeGB": "16"}],
            "KeyValueList": [{"Key": "arch", "Value": "x86_64"}]
        }"#;
        let info: DriverSpecInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.name, "t3.large");
        assert_eq!(info.v_cpu.count, "2");
        assert_eq!(info.mem_size_mib, "8192");
        assert_eq!(info.gpu[0].mem_size_gb, "16");
        assert_eq!(info.key_value_list[0].key, "arch");
    }

    #[test]
    fn spec_info_tolerates_missing_blocks() {
        let info: DriverSpecInfo = serde_json::from_str(r#"{"Name": "tiny"}"#).unwrap();
        assert!(info.gpu.is_empty());
        assert!(info.v_cpu.count.is_empty());
    }

    #[test]
    fn disk_info_parses_iid() {
        let json = r#"{
            "IId": {"NameId": "d-uid", "SystemId": "vol-0abc"},
            "DiskType": "gp3",
            "DiskSize": "100",
            "Status": "Available",
            "CreatedTime": "2024-05-01T00:00:00Z"
        }"#;
        let info: DriverDiskInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.iid.system_id, "vol-0abc");
        assert_eq!(info.disk_size, "100");
    }
}
