//! Spec catalog crawler.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use stratus_core::{Error, Result, check_id, to_safe_id};
use stratus_gateway::{
    CloudDriver, ConnectionRegistry, DriverSpecInfo, DriverSpecList, Method, call_as,
};
use stratus_state::{SpecEntry, StateStore};

/// Placeholder cost for crawled rows until a pricing source fills it in.
const UNKNOWN_COST_PER_HOUR: f32 = 99999999.9;
/// Placeholder evaluation score for crawled rows.
const UNKNOWN_EVALUATION_SCORE: f32 = -99.9;

/// Outcome of an all-connections crawl.
///
/// The crawl is best-effort: failed connections are listed here instead of
/// aborting the rest.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub connections_processed: u32,
    pub specs_registered: u32,
    pub failures: Vec<ConnectionFailure>,
}

/// One connection that could not be crawled, tagged by its name.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionFailure {
    pub connection: String,
    pub error: String,
}

/// Request to register a single spec under a caller-chosen id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecRegisterReq {
    pub name: String,
    pub connection_name: String,
    pub csp_spec_name: String,
    #[serde(default)]
    pub description: String,
}

/// Normalize one driver spec descriptor into a canonical catalog entry.
///
/// Namespace, id, connection, and provider/region fields are left for the
/// caller to assign. Only the first accelerator is retained; additional
/// accelerators are logged and dropped (a deliberate simplification).
pub fn normalize_spec(info: &DriverSpecInfo) -> Result<SpecEntry> {
    if info.name.is_empty() {
        return Err(Error::Validation(
            "driver spec has an empty name".to_string(),
        ));
    }

    let vcpu = info.v_cpu.count.parse::<u16>().unwrap_or(0);
    let memory_gib = info.mem_size_mib.parse::<f32>().map(|m| m / 1024.0).unwrap_or(0.0);
    let disk_size_gb = info.disk_size_gb.parse::<f32>().unwrap_or(0.0);

    let mut entry = SpecEntry {
        namespace: String::new(),
        id: String::new(),
        csp_spec_name: info.name.clone(),
        connection_name: String::new(),
        provider_name: String::new(),
        region_name: info.region.clone(),
        infra_type: "vm".to_string(),
        vcpu,
        memory_gib,
        disk_size_gb,
        accelerator_type: String::new(),
        accelerator_model: String::new(),
        accelerator_count: 0,
        accelerator_memory_gb: 0.0,
        cost_per_hour: UNKNOWN_COST_PER_HOUR,
        evaluation_score: UNKNOWN_EVALUATION_SCORE,
        system_label: "auto-gen".to_string(),
    };

    if let Some(first) = info.gpu.first() {
        entry.accelerator_type = "gpu".to_string();

        entry.accelerator_model = if !first.mfr.is_empty() && !first.model.is_empty() {
            if first.model.starts_with(&first.mfr) {
                first.model.clone()
            } else {
                format!("{} {}", first.mfr, first.model)
            }
        } else if !first.model.is_empty() {
            first.model.clone()
        } else {
            first.mfr.clone()
        };

        if !first.count.is_empty() && first.count != "-1" {
            if let Ok(count) = first.count.parse::<u8>() {
                entry.accelerator_count = count;
            }
        }
        if !first.mem_size_gb.is_empty() && first.mem_size_gb != "-1" {
            if let Ok(mem) = first.mem_size_gb.parse::<f32>() {
                entry.accelerator_memory_gb = mem;
            }
        }

        if info.gpu.len() > 1 {
            warn!(
                spec = %info.name,
                gpus = info.gpu.len(),
                "spec has multiple accelerators; only the first is retained"
            );
        }
    }

    Ok(entry)
}

/// Fans out over provider connections to build and refresh the spec catalog.
#[derive(Clone)]
pub struct SpecCrawler {
    driver: Arc<dyn CloudDriver>,
    registry: ConnectionRegistry,
    store: StateStore,
    deadline: Option<Duration>,
}

impl SpecCrawler {
    pub fn new(
        driver: Arc<dyn CloudDriver>,
        registry: ConnectionRegistry,
        store: StateStore,
        deadline: Option<Duration>,
    ) -> Self {
        Self { driver, registry, store, deadline }
    }

    /// Crawl one connection: fetch its full instance-type catalog, normalize
    /// every descriptor, and upsert the rows. Returns the number of specs
    /// registered.
    pub async fn crawl_connection(
        &self,
        ns: &str,
        connection_name: &str,
        update_on_conflict: bool,
    ) -> Result<u32> {
        let conn = self.registry.get(connection_name)?;
        let list: DriverSpecList = call_as(
            self.driver.as_ref(),
            Method::GET,
            "/vmspec",
            connection_name,
            None,
            self.deadline,
        )
        .await?;

        let provider = conn.provider_name.to_lowercase();
        let mut count = 0u32;
        for info in &list.vmspec {
            let mut entry = match normalize_spec(info) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(connection = %conn.name, error = %e, "skipping unnormalizable spec");
                    continue;
                }
            };
            entry.namespace = ns.to_string();
            entry.id = to_safe_id(&format!("{provider}+{}+{}", conn.region_name, info.name));
            entry.connection_name = conn.name.clone();
            entry.provider_name = provider.clone();
            entry.region_name = conn.region_name.clone();

            self.store.insert_or_update_spec(&entry, update_on_conflict)?;
            count += 1;
        }
        debug!(connection = %conn.name, specs = count, "connection crawled");
        Ok(count)
    }

    /// Crawl every registered connection concurrently.
    ///
    /// Each connection runs as its own task; a failure (unreachable
    /// provider, unresolvable region, upsert error) is recorded in the
    /// report tagged with the connection's name and never aborts the
    /// siblings. Completion order carries no meaning.
    pub async fn crawl_all_connections(
        &self,
        ns: &str,
        update_on_conflict: bool,
    ) -> Result<CrawlReport> {
        check_id(ns)?;

        let mut handles = Vec::new();
        for name in self.registry.names() {
            let crawler = self.clone();
            let ns = ns.to_string();
            let conn = name.clone();
            let handle = tokio::spawn(async move {
                crawler.crawl_connection(&ns, &conn, update_on_conflict).await
            });
            handles.push((name, handle));
        }

        let mut report = CrawlReport::default();
        for (name, handle) in handles {
            report.connections_processed += 1;
            match handle.await {
                Ok(Ok(count)) => report.specs_registered += count,
                Ok(Err(e)) => {
                    warn!(connection = %name, error = %e, "connection crawl failed");
                    report.failures.push(ConnectionFailure {
                        connection: name,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(connection = %name, error = %e, "connection crawl task panicked");
                    report.failures.push(ConnectionFailure {
                        connection: name,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Register a single spec under a caller-chosen id, looking the
    /// provider-native descriptor up through the driver first.
    pub async fn register_spec(
        &self,
        ns: &str,
        req: &SpecRegisterReq,
        update_on_conflict: bool,
    ) -> Result<SpecEntry> {
        check_id(ns)?;
        check_id(&req.name)?;

        let conn = self.registry.get(&req.connection_name)?;
        let info: DriverSpecInfo = call_as(
            self.driver.as_ref(),
            Method::GET,
            &format!("/vmspec/{}", req.csp_spec_name),
            &req.connection_name,
            None,
            self.deadline,
        )
        .await?;

        let mut entry = normalize_spec(&info)?;
        entry.namespace = ns.to_string();
        entry.id = req.name.clone();
        entry.connection_name = conn.name.clone();
        entry.provider_name = conn.provider_name.to_lowercase();
        entry.region_name = conn.region_name.clone();
        entry.system_label = String::new();

        self.store.insert_or_update_spec(&entry, update_on_conflict)?;
        Ok(entry)
    }

    /// Route a pre-normalized list of entries through batched bulk insert.
    pub fn register_specs_in_bulk(&self, entries: &[SpecEntry]) -> Result<u32> {
        Ok(self.store.bulk_insert_specs(entries)?)
    }

    /// Remove duplicate catalog rows left behind by racing crawls.
    pub fn dedup_catalog(&self, ns: &str) -> Result<u32> {
        check_id(ns)?;
        Ok(self.store.dedup_specs(ns)?)
    }
}
