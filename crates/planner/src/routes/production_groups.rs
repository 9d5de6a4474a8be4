//! Production group routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};

use prodplan_core::ProductionGroupId;

use super::DateQuery;
use crate::error::AppError;
use crate::middleware::TenantContext;
use crate::models::{GroupInput, ProductionGroup, ProductionGroupSheet};
use crate::state::AppState;

/// Build the production group router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/production-groups",
            get(list_groups).post(create_group),
        )
        .route("/api/production-groups/sheet", get(grouped_sheet))
        .route("/api/production-groups/ungrouped-items", get(ungrouped_sheet))
        .route(
            "/api/production-groups/ungrouped-item-group",
            get(ungrouped_sheet),
        )
        .route(
            "/api/production-groups/{id}",
            get(get_group).put(update_group).delete(delete_group),
        )
}

async fn list_groups(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<Vec<ProductionGroup>>, AppError> {
    let groups = state.production_groups().list(&tenant.tenant_id).await?;
    Ok(Json(groups))
}

async fn create_group(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(input): Json<GroupInput>,
) -> Result<(StatusCode, Json<ProductionGroup>), AppError> {
    let user = tenant.require_user()?;
    let group = state
        .production_groups()
        .create(&tenant.tenant_id, &input, user)
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn get_group(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<ProductionGroupId>,
) -> Result<Json<ProductionGroup>, AppError> {
    let group = state.production_groups().get(&tenant.tenant_id, id).await?;
    Ok(Json(group))
}

async fn update_group(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<ProductionGroupId>,
    Json(input): Json<GroupInput>,
) -> Result<Json<ProductionGroup>, AppError> {
    let user = tenant.require_user()?;
    let group = state
        .production_groups()
        .update(&tenant.tenant_id, id, &input, user)
        .await?;
    Ok(Json(group))
}

async fn delete_group(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<ProductionGroupId>,
) -> Result<StatusCode, AppError> {
    tenant.require_user()?;
    state
        .production_groups()
        .delete(&tenant.tenant_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn grouped_sheet(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<DateQuery>,
) -> Result<Json<ProductionGroupSheet>, AppError> {
    let date = query.date_or_today(&state);
    let sheet = state
        .production_groups()
        .sheet(&tenant.tenant_id, date)
        .await?;
    Ok(Json(sheet))
}

/// Serves both ungrouped routes.
async fn ungrouped_sheet(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<DateQuery>,
) -> Result<Json<ProductionGroupSheet>, AppError> {
    let date = query.date_or_today(&state);
    let sheet = state
        .production_groups()
        .list_ungrouped(&tenant.tenant_id, date)
        .await?;
    Ok(Json(sheet))
}
