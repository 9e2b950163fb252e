//! AppState construction extracted from `main.rs`.
//!
//! `serve` and the integration tests share [`build_app_state`];
//! [`build_with`] lets tests swap the staffing and planner collaborators.

use std::sync::Arc;

use anyhow::Context;

use rh_domain::config::{Config, ConfigSeverity};
use rh_staffing::{RestStaffingConnector, StaffingConnector};

use crate::auth::{AuthGate, TrustPresentedClaims};
use crate::dispatch::Dispatcher;
use crate::runtime::{LlmPlannerFactory, PlannerFactory, UpstreamPool};
use crate::state::AppState;

/// Validate config and wire the production collaborators.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Staffing backend ─────────────────────────────────────────────
    let connector = RestStaffingConnector::new(&config.staffing)
        .context("building staffing client")?;
    tracing::info!(
        base_url = %config.staffing.base_url,
        max_attempts = config.staffing.max_attempts,
        "staffing client ready"
    );

    // ── Planner ──────────────────────────────────────────────────────
    let planners = LlmPlannerFactory::new(config.planner.clone())
        .context("building planner HTTP client")?;

    build_with(config, Arc::new(connector), Arc::new(planners))
}

/// Wire a dispatcher around the given collaborators.
pub fn build_with(
    config: Arc<Config>,
    connector: Arc<dyn StaffingConnector>,
    planners: Arc<dyn PlannerFactory>,
) -> anyhow::Result<AppState> {
    let pool = Arc::new(UpstreamPool::new(&config.pool));
    tracing::info!(
        max_concurrent = config.pool.max_concurrent,
        max_queued = config.pool.max_queued,
        "upstream pool ready"
    );

    let auth = AuthGate::new(&config.auth, Arc::new(TrustPresentedClaims));
    let dispatcher = Dispatcher::new(config.clone(), auth, connector, planners, pool)
        .context("building dispatcher")?;

    Ok(AppState {
        config,
        dispatcher: Arc::new(dispatcher),
    })
}
