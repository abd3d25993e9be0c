//! Daemon assembly -- startup checks, service wiring and HTTP lifecycle.
//!
//! The [`Orchestrator`] is the central coordinator of `purlsight-daemon`.
//! It validates configuration, checks both backing stores, builds the
//! issue resolver and serves the HTTP API until a shutdown signal arrives.
//!
//! # Startup Order
//!
//! 1. Metrics recorder (if enabled)
//! 2. Component database: pool + `SELECT 1`
//! 3. LDB knowledge base: table listing (pivot and file tables are required)
//! 4. Issue resolver and HTTP router

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;

use purlsight_core::PurlsightConfig;
use purlsight_issue_resolver::{
    IssueResolverBuilder, LdbStore, PgComponentRepository, ResolverConfig, StoreConfig,
};

use crate::health::{DaemonHealth, ldb_status};
use crate::metrics_server;
use crate::routes::{AppState, router};
use crate::service::IssueService;

/// Production state: PostgreSQL components, subprocess LDB.
pub type DaemonState = AppState<PgComponentRepository, LdbStore>;

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: PurlsightConfig,
    /// Shared handler state.
    state: Arc<DaemonState>,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or any
    /// startup check fails.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = PurlsightConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The database is unreachable
    /// - The knowledge base is missing or lacks the pivot or file table
    pub async fn build_from_config(config: PurlsightConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {e}"))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let repository = PgComponentRepository::connect(&config.database)
            .await
            .map_err(|e| anyhow::anyhow!("database startup check failed: {e}"))?;

        let store_config = StoreConfig::from_core(&config.ldb);
        let store = LdbStore::new(store_config.clone());
        let tables = store
            .verify_tables()
            .await
            .map_err(|e| anyhow::anyhow!("ldb startup check failed: {e}"))?;
        tracing::info!(tables = ?tables.tables, "ldb tables found");

        if !tables.pivot || !tables.file {
            return Err(anyhow::anyhow!(
                "ldb startup check failed: required tables '{}' and '{}' not both present",
                store_config.pivot_table,
                store_config.file_table
            ));
        }
        if !tables.issues {
            tracing::error!(
                table = store_config.issues_table.as_str(),
                "issues table missing; issue lookups will return no findings"
            );
        }

        let resolver = IssueResolverBuilder::new()
            .repository(repository)
            .store(store)
            .resolver_config(ResolverConfig::from_core(&config.resolver))
            .store_config(store_config)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build issue resolver: {e}"))?;

        let state = Arc::new(AppState::new(
            IssueService::new(resolver),
            ldb_status(&tables),
        ));

        tracing::info!(
            selection_mode = %config.resolver.selection_mode,
            "orchestrator initialized"
        );

        Ok(Self { config, state })
    }

    /// Serve the HTTP API until SIGTERM or SIGINT.
    ///
    /// In-flight requests finish before this returns.
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!(
            "{}:{}",
            self.config.server.listen_addr, self.config.server.port
        )
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server listen address: {e}"))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
        tracing::info!(listen_addr = %addr, "HTTP API listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server failed: {e}"))?;

        tracing::info!("HTTP API stopped");
        Ok(())
    }

    /// Current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        self.state.health().await
    }

    /// Loaded configuration.
    pub fn config(&self) -> &PurlsightConfig {
        &self.config
    }
}

/// Resolve once a shutdown signal is received.
async fn shutdown_signal() {
    match wait_for_shutdown_signal().await {
        Ok(signal) => tracing::info!(signal, "shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "signal handlers unavailable, falling back to ctrl-c");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {e}"))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {e}"))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
