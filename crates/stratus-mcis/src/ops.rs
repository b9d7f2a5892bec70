//! MCIS retrieval projections and document CRUD.
//!
//! Each projection is its own operation because each needs different
//! aggregation work: the full projection reads stored records, the status
//! projection fans a driver read out to every VM, and the access-info
//! projection assembles per-VM credentials.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use stratus_core::{Error, Result, check_id, keys};
use stratus_gateway::{CloudDriver, DriverVmStatusInfo, Method, call_as};
use stratus_state::StateStore;

use crate::model::*;

/// MCIS operations over the object store and the provider gateway.
#[derive(Clone)]
pub struct McisService {
    driver: Arc<dyn CloudDriver>,
    store: StateStore,
    deadline: Option<Duration>,
}

impl McisService {
    pub fn new(driver: Arc<dyn CloudDriver>, store: StateStore, deadline: Option<Duration>) -> Self {
        Self { driver, store, deadline }
    }

    pub(crate) fn store(&self) -> &StateStore {
        &self.store
    }

    // ── Document CRUD ──────────────────────────────────────────────

    /// Persist an MCIS document.
    pub fn register_mcis(&self, ns: &str, mcis: &Mcis) -> Result<()> {
        check_id(ns)?;
        check_id(&mcis.id)?;
        self.store.put(&keys::mcis_key(ns, &mcis.id, None), mcis)?;
        Ok(())
    }

    /// Persist a subgroup document under its MCIS.
    pub fn register_subgroup(&self, ns: &str, mcis_id: &str, group: &SubGroup) -> Result<()> {
        check_id(&group.id)?;
        self.require_mcis(ns, mcis_id)?;
        self.store
            .put(&keys::subgroup_key(ns, mcis_id, &group.id), group)?;
        Ok(())
    }

    /// Persist a VM record under its MCIS.
    pub fn register_vm(&self, ns: &str, mcis_id: &str, vm: &Vm) -> Result<()> {
        check_id(&vm.id)?;
        self.require_mcis(ns, mcis_id)?;
        self.store
            .put(&keys::mcis_key(ns, mcis_id, Some(&vm.id)), vm)?;
        Ok(())
    }

    fn require_mcis(&self, ns: &str, mcis_id: &str) -> Result<Mcis> {
        check_id(ns)?;
        check_id(mcis_id)?;
        self.store
            .get::<Mcis>(&keys::mcis_key(ns, mcis_id, None))?
            .ok_or_else(|| Error::NotFound(format!("mcis {mcis_id} in namespace {ns}")))
    }

    fn load_vms(&self, ns: &str, mcis_id: &str) -> Result<Vec<Vm>> {
        let prefix = format!("{}/vm/", keys::mcis_key(ns, mcis_id, None));
        let mut vms: Vec<Vm> = self
            .store
            .list::<Vm>(&prefix)?
            .into_iter()
            .map(|(_, vm)| vm)
            .collect();
        vms.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(vms)
    }

    // ── Projections ────────────────────────────────────────────────

    /// Full projection: the MCIS document with its subgroups and stored VM
    /// records.
    pub fn get_mcis(&self, ns: &str, mcis_id: &str) -> Result<McisInfo> {
        let mcis = self.require_mcis(ns, mcis_id)?;

        let group_prefix = format!("{}/subgroup/", keys::mcis_key(ns, mcis_id, None));
        let mut subgroups: Vec<SubGroup> = self
            .store
            .list::<SubGroup>(&group_prefix)?
            .into_iter()
            .map(|(_, g)| g)
            .collect();
        subgroups.sort_by(|a, b| a.id.cmp(&b.id));

        let vms = self.load_vms(ns, mcis_id)?;
        Ok(McisInfo { mcis, subgroups, vms })
    }

    /// Ids of all MCIS documents in a namespace.
    pub fn list_mcis_ids(&self, ns: &str) -> Result<Vec<String>> {
        check_id(ns)?;
        let prefix = keys::mcis_prefix(ns);
        let mut ids: Vec<String> = self
            .store
            .list_keys(&prefix)?
            .into_iter()
            .filter_map(|key| {
                let rest = key.strip_prefix(&prefix)?;
                // Direct children only; nested vm/subgroup keys contain '/'.
                (!rest.contains('/')).then(|| rest.to_string())
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Subgroup ids of an MCIS.
    pub fn list_subgroup_ids(&self, ns: &str, mcis_id: &str) -> Result<Vec<String>> {
        self.require_mcis(ns, mcis_id)?;
        let prefix = format!("{}/subgroup/", keys::mcis_key(ns, mcis_id, None));
        let mut ids: Vec<String> = self
            .store
            .list_keys(&prefix)?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// VM ids of one subgroup.
    pub fn list_vms_by_subgroup(
        &self,
        ns: &str,
        mcis_id: &str,
        subgroup_id: &str,
    ) -> Result<Vec<String>> {
        self.require_mcis(ns, mcis_id)?;
        Ok(self
            .load_vms(ns, mcis_id)?
            .into_iter()
            .filter(|vm| vm.subgroup_id == subgroup_id)
            .map(|vm| vm.id)
            .collect())
    }

    /// Id-list projection, optionally filtered by one VM record field
    /// (serialized camelCase name) matched case-insensitively.
    pub fn list_vm_ids(
        &self,
        ns: &str,
        mcis_id: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<String>> {
        self.require_mcis(ns, mcis_id)?;
        let vms = self.load_vms(ns, mcis_id)?;
        let mut ids = Vec::new();
        for vm in vms {
            let keep = match filter {
                None => true,
                Some((field, wanted)) => {
                    let value = serde_json::to_value(&vm)
                        .map_err(|e| Error::Store(e.to_string()))?;
                    value
                        .get(field)
                        .and_then(Value::as_str)
                        .is_some_and(|v| v.eq_ignore_ascii_case(wanted))
                }
            };
            if keep {
                ids.push(vm.id);
            }
        }
        Ok(ids)
    }

    /// Single VM record.
    pub fn get_vm(&self, ns: &str, mcis_id: &str, vm_id: &str) -> Result<Vm> {
        self.require_mcis(ns, mcis_id)?;
        self.store
            .get::<Vm>(&keys::mcis_key(ns, mcis_id, Some(vm_id)))?
            .ok_or_else(|| Error::NotFound(format!("vm {vm_id} in mcis {mcis_id}")))
    }

    /// Driver status read for one VM.
    pub async fn vm_status(&self, ns: &str, mcis_id: &str, vm_id: &str) -> Result<VmStatusEntry> {
        let vm = self.get_vm(ns, mcis_id, vm_id)?;
        Ok(self.probe_vm(vm).await)
    }

    async fn probe_vm(&self, vm: Vm) -> VmStatusEntry {
        let result: Result<DriverVmStatusInfo> = call_as(
            self.driver.as_ref(),
            Method::GET,
            &format!("/vmstatus/{}", vm.csp_vm_name),
            &vm.connection_name,
            None,
            self.deadline,
        )
        .await
        .map_err(Error::from);

        match result {
            Ok(info) => VmStatusEntry {
                id: vm.id,
                public_ip: vm.public_ip,
                status: info.vm_status,
                error: None,
            },
            Err(e) => {
                warn!(vm = %vm.id, error = %e, "vm status probe failed");
                VmStatusEntry {
                    id: vm.id,
                    public_ip: vm.public_ip,
                    status: String::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Status projection: a concurrent driver status read per VM.
    ///
    /// Each probe runs as its own task; a probe failure (including deadline
    /// expiry) is recorded in that VM's entry and never aborts siblings.
    pub async fn mcis_status(&self, ns: &str, mcis_id: &str) -> Result<McisStatus> {
        self.require_mcis(ns, mcis_id)?;
        let vms = self.load_vms(ns, mcis_id)?;

        let mut handles = Vec::new();
        for vm in vms {
            let service = self.clone();
            let vm_id = vm.id.clone();
            let ip = vm.public_ip.clone();
            handles.push((vm_id, ip, tokio::spawn(async move { service.probe_vm(vm).await })));
        }

        let mut entries = Vec::new();
        for (vm_id, ip, handle) in handles {
            match handle.await {
                Ok(entry) => entries.push(entry),
                Err(e) => entries.push(VmStatusEntry {
                    id: vm_id,
                    public_ip: ip,
                    status: String::new(),
                    error: Some(e.to_string()),
                }),
            }
        }

        let summary = summarize(&entries);
        debug!(mcis = mcis_id, %summary, "mcis status aggregated");
        Ok(McisStatus {
            id: mcis_id.to_string(),
            status_summary: summary,
            vms: entries,
        })
    }

    /// Access-info projection: per-VM connection data grouped by subgroup,
    /// with private key material only on request.
    pub fn access_info(
        &self,
        ns: &str,
        mcis_id: &str,
        show_ssh_key: bool,
    ) -> Result<McisAccessInfo> {
        self.require_mcis(ns, mcis_id)?;
        let vms = self.load_vms(ns, mcis_id)?;

        let mut groups: BTreeMap<String, Vec<VmAccessInfo>> = BTreeMap::new();
        for vm in vms {
            let private_key = if show_ssh_key {
                self.lookup_private_key(ns, &vm.ssh_key_id)
            } else {
                None
            };
            groups.entry(vm.subgroup_id.clone()).or_default().push(VmAccessInfo {
                vm_id: vm.id,
                public_ip: vm.public_ip,
                ssh_port: if vm.ssh_port.is_empty() { "22".to_string() } else { vm.ssh_port },
                vm_user_name: vm.vm_user_name,
                ssh_key_id: vm.ssh_key_id,
                private_key,
            });
        }

        Ok(McisAccessInfo {
            mcis_id: mcis_id.to_string(),
            subgroups: groups
                .into_iter()
                .map(|(subgroup_id, vms)| SubGroupAccessInfo { subgroup_id, vms })
                .collect(),
        })
    }

    fn lookup_private_key(&self, ns: &str, ssh_key_id: &str) -> Option<String> {
        if ssh_key_id.is_empty() {
            return None;
        }
        let key = keys::resource_key(ns, keys::KIND_SSH_KEY, ssh_key_id);
        match self.store.get::<Value>(&key) {
            Ok(Some(obj)) => obj
                .get("privateKey")
                .and_then(Value::as_str)
                .map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                warn!(%ssh_key_id, error = %e, "ssh key lookup failed");
                None
            }
        }
    }

    // ── Deletion ───────────────────────────────────────────────────

    /// Delete an MCIS document tree (the document, subgroups, and VM
    /// records). Without `force`, a running MCIS is rejected.
    pub fn delete_mcis(&self, ns: &str, mcis_id: &str, force: bool) -> Result<()> {
        let mcis = self.require_mcis(ns, mcis_id)?;
        if !force && mcis.status.starts_with("Running") {
            return Err(Error::Conflict(format!(
                "mcis {mcis_id} is {}; delete requires force",
                mcis.status
            )));
        }

        let root = keys::mcis_key(ns, mcis_id, None);
        self.store.delete(&root)?;
        self.store.delete_prefix(&format!("{root}/"))?;
        debug!(ns, mcis = mcis_id, "mcis deleted");
        Ok(())
    }

    /// Delete every MCIS in a namespace. Returns the deleted ids.
    pub fn delete_all_mcis(&self, ns: &str, force: bool) -> Result<Vec<String>> {
        let ids = self.list_mcis_ids(ns)?;
        let mut deleted = Vec::new();
        for id in ids {
            self.delete_mcis(ns, &id, force)?;
            deleted.push(id);
        }
        Ok(deleted)
    }
}

/// Dominant status with counts, e.g. `Running:2/3`.
fn summarize(entries: &[VmStatusEntry]) -> String {
    if entries.is_empty() {
        return "Empty:0/0".to_string();
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in entries {
        let status = if entry.error.is_some() { "Failed" } else { entry.status.as_str() };
        *counts.entry(status).or_default() += 1;
    }
    let (dominant, count) = counts
        .iter()
        .max_by_key(|(_, c)| **c)
        .map(|(s, c)| (*s, *c))
        .unwrap_or(("Unknown", 0));
    format!("{dominant}:{count}/{}", entries.len())
}
