//! Order approval intake.

use axum::{Json, Router, extract::State, routing::post};

use crate::error::AppError;
use crate::middleware::TenantContext;
use crate::models::{AggregationReport, OrderApproval};
use crate::state::AppState;

/// Build the indent router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/indent/approvals", post(approve_order))
}

/// Aggregate an approved order. Per-line failures are reported, not raised.
async fn approve_order(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(approval): Json<OrderApproval>,
) -> Result<Json<AggregationReport>, AppError> {
    let report = state
        .indent_aggregator()
        .approve(&tenant.tenant_id, &approval)
        .await?;
    Ok(Json(report))
}
