//! Replay an approved order through the indent aggregator.
//!
//! # Usage
//!
//! ```bash
//! prodplan-cli approve --tenant acme --file order.json
//! ```
//!
//! The file holds the same JSON body accepted by
//! `POST /api/indent/approvals`. The aggregation report is printed to
//! stdout as JSON.
//!
//! # Environment Variables
//!
//! Same as the planner service (`PLANNER_DATABASE_URL`,
//! `PLANNER_UTC_OFFSET_MINUTES`, ...).

use std::path::Path;

use prodplan_core::TenantId;
use prodplan_planner::config::{ConfigError, PlannerConfig};
use prodplan_planner::db::create_pool;
use prodplan_planner::error::AppError;
use prodplan_planner::models::OrderApproval;
use prodplan_planner::state::AppState;
use thiserror::Error;

/// Errors that can occur while replaying an approval.
#[derive(Debug, Error)]
pub enum ApproveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid tenant id: {0}")]
    InvalidTenant(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid approval JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AppError),
}

/// Aggregate the approval stored at `file` for `tenant`.
///
/// # Errors
///
/// Returns `ApproveError` if the input cannot be read or parsed, or the
/// aggregation fails as a whole. Per-line failures are part of the report.
pub async fn run(file: &Path, tenant: &str) -> Result<(), ApproveError> {
    dotenvy::dotenv().ok();

    let tenant_id =
        TenantId::parse(tenant).map_err(|_| ApproveError::InvalidTenant(tenant.to_owned()))?;

    let raw = std::fs::read_to_string(file).map_err(|source| ApproveError::Read {
        path: file.display().to_string(),
        source,
    })?;
    let approval: OrderApproval = serde_json::from_str(&raw)?;

    let config = PlannerConfig::from_env()?;
    tracing::info!("Connecting to planner database...");
    let pool = create_pool(&config.database_url, 2).await?;
    let state = AppState::postgres(pool, config.calendar);

    let report = state
        .indent_aggregator()
        .approve(&tenant_id, &approval)
        .await?;

    tracing::info!(
        order_id = %report.order_id,
        applied = report.applied.len(),
        already_counted = report.already_counted.len(),
        failed = report.failed.len(),
        "Order aggregated"
    );

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
