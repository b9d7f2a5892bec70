//! MCIS domain types persisted in the object store.
//!
//! Composite keys follow the shared scheme: the MCIS document at
//! `/ns/{ns}/mcis/{id}`, subgroups and VMs nested under it, and policy
//! documents under `/ns/{ns}/policy/mcis/{id}`.

use serde::{Deserialize, Serialize};

/// MCIS document (metadata only; subgroups and VMs are separate objects).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Mcis {
    pub id: String,
    pub name: String,
    pub status: String,
    pub description: String,
    pub system_label: String,
    /// Unix timestamp (seconds) when the MCIS was created.
    pub created_at: u64,
}

/// A scaling unit of VMs within an MCIS sharing one spec/image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubGroup {
    pub id: String,
    pub spec_id: String,
    pub size: u32,
}

/// A single VM instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Vm {
    pub id: String,
    pub name: String,
    pub subgroup_id: String,
    pub status: String,
    pub public_ip: String,
    pub ssh_port: String,
    pub ssh_key_id: String,
    pub vm_user_name: String,
    pub connection_name: String,
    pub csp_vm_id: String,
    pub csp_vm_name: String,
    pub spec_id: String,
    pub image_id: String,
    /// Unix timestamp (seconds) when the VM was created.
    pub created_at: u64,
}

/// Full MCIS projection: the document plus its subgroups and VM records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McisInfo {
    #[serde(flatten)]
    pub mcis: Mcis,
    pub subgroups: Vec<SubGroup>,
    pub vms: Vec<Vm>,
}

/// Status projection of one VM, tagged with its identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VmStatusEntry {
    pub id: String,
    pub public_ip: String,
    /// Driver-reported status, or empty when the probe failed.
    pub status: String,
    /// Probe failure for this VM only; siblings are unaffected.
    pub error: Option<String>,
}

/// Aggregated status projection of an MCIS.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McisStatus {
    pub id: String,
    /// Dominant status with counts, e.g. `Running:2/3`.
    pub status_summary: String,
    pub vms: Vec<VmStatusEntry>,
}

/// Access info for one VM.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VmAccessInfo {
    pub vm_id: String,
    pub public_ip: String,
    pub ssh_port: String,
    pub vm_user_name: String,
    pub ssh_key_id: String,
    /// Private key material, only when the caller asked to see it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

/// Access info grouped by subgroup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubGroupAccessInfo {
    pub subgroup_id: String,
    pub vms: Vec<VmAccessInfo>,
}

/// Access info projection of an MCIS.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McisAccessInfo {
    pub mcis_id: String,
    pub subgroups: Vec<SubGroupAccessInfo>,
}

/// Remote command request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandReq {
    pub user_name: String,
    pub command: String,
}

/// Outcome of one VM's command execution, tagged with its identity.
///
/// A failure here is that VM's own result; it never cancels or fails
/// sibling executions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub vm_id: String,
    pub vm_ip: String,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Condition block of an automation policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoCondition {
    pub metric: String,
    pub operator: String,
    pub operand: String,
}

/// Action block of an automation policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoAction {
    pub action_type: String,
    pub placement_algo: String,
    pub description: String,
}

/// Namespace+MCIS-scoped automation policy document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyDoc {
    pub policy_id: String,
    pub mcis_id: String,
    pub auto_condition: AutoCondition,
    pub auto_action: AutoAction,
    pub status: String,
    pub description: String,
}

/// Policy creation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyReq {
    pub auto_condition: AutoCondition,
    pub auto_action: AutoAction,
    pub description: String,
}
