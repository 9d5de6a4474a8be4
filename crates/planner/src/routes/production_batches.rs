//! Production batch routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use serde::Deserialize;

use prodplan_core::{BatchField, BatchNumber, ItemId};

use crate::error::AppError;
use crate::middleware::TenantContext;
use crate::models::{ProductionBatch, ProductionSheet};
use crate::state::AppState;

/// Build the production batch router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/production-batches", get(production_sheet))
        .route("/api/production-batches/today", post(get_or_create_today))
        .route("/api/production-batches/next", post(create_next))
        .route("/api/production-batches/field", patch(update_field))
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SheetQuery {
    pub date: Option<NaiveDate>,
    pub item_id: Option<ItemId>,
}

/// Target batch; `batchNo` accepts an ordinal (`2`) or a label (`"BATNO02"`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTarget {
    pub item_id: ItemId,
    #[serde(default)]
    pub batch_no: Option<BatchNumber>,
}

/// `{"itemId": "I1", "batchNo": "BATNO01", "field": "productionLoss", "value": "12"}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdateRequest {
    pub item_id: ItemId,
    #[serde(default)]
    pub batch_no: Option<BatchNumber>,
    #[serde(flatten)]
    pub update: BatchField,
}

// =============================================================================
// Handlers
// =============================================================================

async fn production_sheet(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<SheetQuery>,
) -> Result<Json<ProductionSheet>, AppError> {
    let date = query.date.unwrap_or_else(|| state.calendar().today());
    let sheet = state
        .batch_tracking()
        .production_sheet(&tenant.tenant_id, date, query.item_id.as_ref())
        .await?;
    Ok(Json(sheet))
}

async fn get_or_create_today(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(target): Json<BatchTarget>,
) -> Result<Json<ProductionBatch>, AppError> {
    let user = tenant.require_user()?;
    let batch = state
        .batch_tracking()
        .get_or_create_for_today(&tenant.tenant_id, &target.item_id, target.batch_no, user)
        .await?;
    Ok(Json(batch))
}

async fn create_next(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(target): Json<BatchTarget>,
) -> Result<Json<ProductionBatch>, AppError> {
    let user = tenant.require_user()?;
    let batch = state
        .batch_tracking()
        .create_next_batch(&tenant.tenant_id, &target.item_id, user)
        .await?;
    Ok(Json(batch))
}

async fn update_field(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(request): Json<FieldUpdateRequest>,
) -> Result<Json<ProductionBatch>, AppError> {
    let user = tenant.require_user()?;
    let batch = state
        .batch_tracking()
        .update_field(
            &tenant.tenant_id,
            &request.item_id,
            request.batch_no,
            &request.update,
            user,
        )
        .await?;
    Ok(Json(batch))
}
