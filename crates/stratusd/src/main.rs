//! stratusd — the Stratus daemon.
//!
//! Single binary that assembles the control-plane subsystems:
//! - State store (redb)
//! - Connection registry (from stratus.toml)
//! - Provider gateway client
//! - Periodic all-connections spec catalog refresh, with the duplicate-row
//!   cleanup pass after each round
//!
//! # Usage
//!
//! ```text
//! stratusd run --config stratus.toml --data-dir /var/lib/stratus
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use stratus_core::StratusConfig;
use stratus_gateway::{ConnConfig, ConnectionRegistry, DriverClient};

const DEFAULT_DATA_DIR: &str = "/var/lib/stratus";
const DEFAULT_NAMESPACE: &str = "system";
const DEFAULT_REFRESH_SECS: u64 = 3600;

#[derive(Parser)]
#[command(name = "stratusd", about = "Stratus daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon: wire the stores and refresh the spec catalog.
    Run {
        /// Path to the stratus.toml configuration file.
        #[arg(long, default_value = "stratus.toml")]
        config: PathBuf,

        /// Data directory for persistent state (overrides the config).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Refresh the catalog once and exit instead of looping.
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stratusd=debug,stratus=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, data_dir, once } => run(config, data_dir, once).await,
    }
}

async fn run(config_path: PathBuf, data_dir: Option<PathBuf>, once: bool) -> anyhow::Result<()> {
    info!("Stratus daemon starting");

    let config = StratusConfig::from_file(&config_path)?;

    // ── State store ────────────────────────────────────────────────
    let data_dir = data_dir
        .or_else(|| config.store.as_ref().and_then(|s| s.data_dir.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("stratus.redb");
    let store = stratus_state::StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    // Filter and catalog schemas must agree before anything runs.
    stratus_catalog::validate_bindings()?;

    // ── Connection registry ────────────────────────────────────────
    let registry = ConnectionRegistry::new();
    for entry in &config.connections {
        registry.register(ConnConfig {
            name: entry.name.clone(),
            provider_name: entry.provider.clone(),
            region_name: entry.region.clone(),
            credential_name: entry.credential.clone(),
            location: None,
        })?;
    }
    info!(connections = config.connections.len(), "connection registry initialized");

    // ── Provider gateway client ────────────────────────────────────
    let deadline = config.driver.timeout_secs.map(Duration::from_secs);
    let driver = Arc::new(DriverClient::new(&config.driver.endpoint, deadline)?);
    info!(endpoint = %config.driver.endpoint, "gateway client initialized");

    // ── Catalog crawler ────────────────────────────────────────────
    let crawler_cfg = config.crawler.clone();
    let namespace = crawler_cfg
        .as_ref()
        .map(|c| c.namespace.clone())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    let interval_secs = crawler_cfg
        .as_ref()
        .and_then(|c| c.interval_secs)
        .unwrap_or(DEFAULT_REFRESH_SECS);
    let update_on_conflict = crawler_cfg
        .as_ref()
        .and_then(|c| c.update_on_conflict)
        .unwrap_or(true);

    let crawler = stratus_catalog::SpecCrawler::new(driver, registry, store, deadline);

    if once {
        refresh_catalog(&crawler, &namespace, update_on_conflict).await;
        info!("single refresh done");
        return Ok(());
    }

    // ── Refresh loop ───────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let loop_crawler = crawler.clone();
    let loop_ns = namespace.clone();
    let refresh_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        let mut shutdown = shutdown_rx;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    refresh_catalog(&loop_crawler, &loop_ns, update_on_conflict).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    info!(interval = interval_secs, namespace = %namespace, "catalog refresh loop started");

    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = refresh_handle.await;

    info!("Stratus daemon stopped");
    Ok(())
}

async fn refresh_catalog(
    crawler: &stratus_catalog::SpecCrawler,
    namespace: &str,
    update_on_conflict: bool,
) {
    match crawler.crawl_all_connections(namespace, update_on_conflict).await {
        Ok(report) => {
            info!(
                connections = report.connections_processed,
                specs = report.specs_registered,
                failures = report.failures.len(),
                "catalog refreshed"
            );
            for failure in &report.failures {
                warn!(connection = %failure.connection, error = %failure.error, "connection skipped");
            }
        }
        Err(e) => {
            warn!(error = %e, "catalog refresh failed");
            return;
        }
    }

    // Compensate for duplicate rows racing crawls can leave behind.
    match crawler.dedup_catalog(namespace) {
        Ok(0) => {}
        Ok(removed) => info!(removed, "duplicate catalog rows cleaned"),
        Err(e) => warn!(error = %e, "catalog dedup failed"),
    }
}
