//! Daily summary routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;

use prodplan_core::{PlanningUpdate, ProductId};

use crate::error::AppError;
use crate::middleware::TenantContext;
use crate::models::{DailySummary, SummaryFilter};
use crate::state::AppState;

/// Build the daily summary router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/daily-summaries", get(list_summaries))
        .route(
            "/api/daily-summaries/{product_id}/{date}",
            get(get_summary).patch(update_planning),
        )
}

/// List filters. `product_id` accepts a comma-separated list.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub date: Option<NaiveDate>,
    pub product_id: Option<String>,
    #[serde(default)]
    pub shortage_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    fn filter(&self) -> Result<SummaryFilter, AppError> {
        let product_ids = self
            .product_id
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                ProductId::parse(p).map_err(|e| AppError::BadRequest(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SummaryFilter {
            product_ids,
            shortage_only: self.shortage_only,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

async fn list_summaries(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DailySummary>>, AppError> {
    let date = query.date.unwrap_or_else(|| state.calendar().today());
    let summaries = state
        .daily_summaries()
        .list(&tenant.tenant_id, date, query.filter()?)
        .await?;
    Ok(Json(summaries))
}

async fn get_summary(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path((product_id, date)): Path<(ProductId, NaiveDate)>,
) -> Result<Json<DailySummary>, AppError> {
    let summary = state
        .daily_summaries()
        .get(&tenant.tenant_id, &product_id, date)
        .await?;
    Ok(Json(summary))
}

/// Only planning inputs are read from the body; derived fields are ignored.
async fn update_planning(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path((product_id, date)): Path<(ProductId, NaiveDate)>,
    Json(update): Json<PlanningUpdate>,
) -> Result<Json<DailySummary>, AppError> {
    let summary = state
        .daily_summaries()
        .apply_planning_update(&tenant.tenant_id, &product_id, date, &update)
        .await?;
    Ok(Json(summary))
}
