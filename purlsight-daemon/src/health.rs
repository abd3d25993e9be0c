//! Aggregated health check reporting.
//!
//! `GET /health` produces a unified [`DaemonHealth`] report from the
//! component database and the LDB knowledge base. The overall daemon
//! status is the worst status among all enabled modules.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reason)
//! - Any Unhealthy -> Unhealthy(reason)
//!
//! The reason lists every non-healthy module, degraded ones included.

use serde::Serialize;

use purlsight_core::HealthStatus;
use purlsight_issue_resolver::{IssueResolverError, TableAvailability};

/// Module name of the component database.
pub const DATABASE_MODULE: &str = "database";
/// Module name of the LDB knowledge base.
pub const LDB_MODULE: &str = "ldb";

/// Aggregated health report for the entire daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Overall daemon health status (worst of all modules).
    pub status: HealthStatus,
    /// Daemon uptime in seconds since start.
    pub uptime_secs: u64,
    /// Per-module health reports.
    pub modules: Vec<ModuleHealth>,
}

/// Health status for a single module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleHealth {
    /// Module name (e.g., "database", "ldb").
    pub name: String,
    /// Whether the module is enabled in configuration.
    pub enabled: bool,
    /// Current health status of the module.
    pub status: HealthStatus,
}

impl ModuleHealth {
    /// An enabled module with the given status.
    pub fn enabled(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_owned(),
            enabled: true,
            status,
        }
    }
}

/// Aggregate multiple module health statuses into a single status.
///
/// Returns the worst status found: Unhealthy > Degraded > Healthy.
/// Only considers enabled modules.
pub fn aggregate_status(modules: &[ModuleHealth]) -> HealthStatus {
    let enabled_modules = modules.iter().filter(|m| m.enabled);

    let mut worst = HealthStatus::Healthy;
    let mut reasons = Vec::new();

    for module in enabled_modules {
        match &module.status {
            HealthStatus::Healthy => {}
            HealthStatus::Degraded(reason) => {
                reasons.push(format!("{}: {}", module.name, reason));
                if !worst.is_unhealthy() {
                    worst = HealthStatus::Degraded(String::new());
                }
            }
            HealthStatus::Unhealthy(reason) => {
                reasons.push(format!("{}: {}", module.name, reason));
                worst = HealthStatus::Unhealthy(String::new());
            }
        }
    }

    match worst {
        HealthStatus::Healthy => HealthStatus::Healthy,
        HealthStatus::Degraded(_) => HealthStatus::Degraded(reasons.join("; ")),
        HealthStatus::Unhealthy(_) => HealthStatus::Unhealthy(reasons.join("; ")),
    }
}

/// Map a database ping result to a module status.
pub fn database_status(ping: Result<(), IssueResolverError>) -> HealthStatus {
    match ping {
        Ok(()) => HealthStatus::Healthy,
        Err(e) => HealthStatus::Unhealthy(e.to_string()),
    }
}

/// Map the startup table listing to a module status.
///
/// Without the pivot or file table no request can produce findings. A missing
/// issues table only empties the issues hop.
pub fn ldb_status(tables: &TableAvailability) -> HealthStatus {
    let mut missing = Vec::new();
    if !tables.pivot {
        missing.push("pivot");
    }
    if !tables.file {
        missing.push("file");
    }
    if !missing.is_empty() {
        return HealthStatus::Unhealthy(format!("missing tables: {}", missing.join(", ")));
    }
    if !tables.issues {
        return HealthStatus::Degraded("issues table missing".to_owned());
    }
    HealthStatus::Healthy
}
