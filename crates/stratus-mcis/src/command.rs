//! Remote command dispatch across an MCIS.
//!
//! The target VM set is computed first (all VMs, intersected with an
//! optional subgroup filter and an optional single-VM filter); an empty set
//! is rejected before any dispatch. The same command then goes to every
//! target as an independent task, and each VM's outcome (output or error,
//! including a per-VM deadline expiry) becomes that VM's own result entry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use stratus_core::{Error, Result, check_id, keys};
use stratus_state::StateStore;

use crate::model::{CommandReq, CommandResult, Vm};

/// Login user when neither the request nor the VM record names one.
pub const DEFAULT_VM_USER: &str = "cloud-user";

/// Executes one command on one VM. Implementations must be side-effect
/// isolated per target; the dispatcher enforces the deadline.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, vm: &Vm, user: &str, command: &str) -> std::result::Result<String, String>;
}

/// Runs commands over the system `ssh` binary.
///
/// Host key checking is disabled: target VMs are freshly provisioned and
/// their keys are not in anyone's known_hosts. Key-based auth comes from
/// the ambient ssh agent.
pub struct SshCommandRunner;

#[async_trait]
impl CommandRunner for SshCommandRunner {
    async fn run(&self, vm: &Vm, user: &str, command: &str) -> std::result::Result<String, String> {
        let port = if vm.ssh_port.is_empty() { "22" } else { vm.ssh_port.as_str() };
        let target = format!("{user}@{}", vm.public_ip);

        let output = Command::new("ssh")
            .args([
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "UserKnownHostsFile=/dev/null",
                "-o",
                "BatchMode=yes",
                "-p",
                port,
                &target,
                command,
            ])
            .output()
            .await
            .map_err(|e| format!("ssh spawn failed: {e}"))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
            Err(if stderr.is_empty() {
                format!("ssh exited with {}", output.status)
            } else {
                stderr
            })
        }
    }
}

/// Dispatches remote commands across an MCIS with per-VM failure isolation.
#[derive(Clone)]
pub struct RemoteCommander {
    store: StateStore,
    runner: Arc<dyn CommandRunner>,
    deadline: Option<Duration>,
}

impl RemoteCommander {
    pub fn new(store: StateStore, runner: Arc<dyn CommandRunner>, deadline: Option<Duration>) -> Self {
        Self { store, runner, deadline }
    }

    /// Send one command to the filtered VM set of an MCIS.
    ///
    /// Returns exactly one result entry per target VM, tagged with the VM's
    /// id and address; sibling failures never cancel each other. An empty
    /// target set after filtering is a caller input error raised before any
    /// dispatch.
    pub async fn send_command(
        &self,
        ns: &str,
        mcis_id: &str,
        subgroup_filter: Option<&str>,
        vm_filter: Option<&str>,
        req: &CommandReq,
    ) -> Result<Vec<CommandResult>> {
        check_id(ns)?;
        check_id(mcis_id)?;
        if req.command.is_empty() {
            return Err(Error::Validation("command is empty".to_string()));
        }

        let root = keys::mcis_key(ns, mcis_id, None);
        if self.store.get::<serde_json::Value>(&root)?.is_none() {
            return Err(Error::NotFound(format!("mcis {mcis_id} in namespace {ns}")));
        }

        let vms: Vec<Vm> = self
            .store
            .list::<Vm>(&format!("{root}/vm/"))?
            .into_iter()
            .map(|(_, vm)| vm)
            .filter(|vm| subgroup_filter.is_none_or(|g| vm.subgroup_id == g))
            .filter(|vm| vm_filter.is_none_or(|id| vm.id == id))
            .collect();

        if vms.is_empty() {
            return Err(Error::FanoutInput(format!(
                "no target VMs in mcis {mcis_id} after filtering (subgroup {subgroup_filter:?}, vm {vm_filter:?})"
            )));
        }
        debug!(mcis = mcis_id, targets = vms.len(), "dispatching remote command");

        let mut handles = Vec::new();
        for vm in vms {
            let runner = Arc::clone(&self.runner);
            let deadline = self.deadline;
            let user = if !req.user_name.is_empty() {
                req.user_name.clone()
            } else if !vm.vm_user_name.is_empty() {
                vm.vm_user_name.clone()
            } else {
                DEFAULT_VM_USER.to_string()
            };
            let command = req.command.clone();
            let vm_id = vm.id.clone();
            let vm_ip = vm.public_ip.clone();

            let handle = tokio::spawn(async move {
                let run = runner.run(&vm, &user, &command);
                let outcome = match deadline {
                    Some(limit) => match tokio::time::timeout(limit, run).await {
                        Ok(result) => result,
                        Err(_) => Err(format!("command exceeded {}s deadline", limit.as_secs())),
                    },
                    None => run.await,
                };
                match outcome {
                    Ok(result) => CommandResult {
                        vm_id: vm.id,
                        vm_ip: vm.public_ip,
                        result,
                        error: None,
                    },
                    Err(error) => CommandResult {
                        vm_id: vm.id,
                        vm_ip: vm.public_ip,
                        result: String::new(),
                        error: Some(error),
                    },
                }
            });
            handles.push((vm_id, vm_ip, handle));
        }

        let mut results = Vec::new();
        for (vm_id, vm_ip, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(vm = %vm_id, error = %e, "command task panicked");
                    results.push(CommandResult {
                        vm_id,
                        vm_ip,
                        result: String::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        Ok(results)
    }
}
