//! Persistence for the planner.
//!
//! # Schema: `production`
//!
//! ## Tables
//!
//! - `item` - Tenant catalog of products/items (owned by the catalog collaborator)
//! - `daily_summary` - Demand and planning quantities per (tenant, product, day)
//! - `indent_contribution` - Orders already counted into a daily summary
//! - `production_batch` - Batch records per (tenant, item, batch, day)
//! - `production_group` / `production_group_item` - Items produced in lockstep
//!
//! Every store is reached through a trait so services run unchanged against
//! `PostgreSQL` or the in-memory backend.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/planner/migrations/` and run via:
//! ```bash
//! cargo run -p prodplan-cli -- migrate
//! ```

pub mod catalog;
pub mod daily_summary;
pub mod memory;
pub mod production_batch;
pub mod production_group;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use prodplan_core::{
    BatchField, BatchNumber, ItemId, PlanningUpdate, ProductionGroupId, TenantId, UserId,
    ValidationError,
};

use crate::models::{
    BatchKey, ContributionOutcome, DailySummary, IndentContribution, NewProductionGroup,
    ProductionBatch, ProductionGroup, SummaryFilter, SummaryKey,
};

pub use catalog::PgItemCatalog;
pub use daily_summary::PgSummaryStore;
pub use memory::MemoryStore;
pub use production_batch::PgBatchStore;
pub use production_group::PgGroupStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate batch).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The write was refused by a domain rule evaluated against the stored row.
    #[error(transparent)]
    Rejected(#[from] ValidationError),
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique/foreign-key violation on one of `constraints` to a conflict.
pub(crate) fn map_constraint(
    err: sqlx::Error,
    constraints: &[(&str, &str)],
) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && let Some(name) = db_err.constraint()
        && let Some((_, message)) = constraints.iter().find(|(c, _)| *c == name)
    {
        return RepositoryError::Conflict((*message).to_string());
    }
    RepositoryError::Database(err)
}

/// Whether `err` is `PostgreSQL` rejecting a value too wide for its column.
pub(crate) fn is_numeric_overflow(err: &sqlx::Error) -> bool {
    const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";
    matches!(err, sqlx::Error::Database(db_err)
        if db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE))
}

/// Daily summary persistence.
///
/// `record_contribution` is the only write path for `total_indent`.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Atomically add one order's demand to its product/day summary, creating
    /// the summary on first demand. A repeated (order, product) pair is a no-op.
    async fn record_contribution(
        &self,
        contribution: &IndentContribution,
    ) -> Result<ContributionOutcome, RepositoryError>;

    async fn get_summary(&self, key: &SummaryKey) -> Result<Option<DailySummary>, RepositoryError>;

    /// Summaries for one day ordered by product id.
    async fn list_summaries(
        &self,
        tenant_id: &TenantId,
        date: NaiveDate,
        filter: &SummaryFilter,
    ) -> Result<Vec<DailySummary>, RepositoryError>;

    /// Merge planning inputs and recompute derived fields atomically.
    /// Returns `None` when the summary does not exist.
    async fn apply_planning_update(
        &self,
        key: &SummaryKey,
        update: &PlanningUpdate,
    ) -> Result<Option<DailySummary>, RepositoryError>;
}

/// Production batch persistence.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Insert unless a batch with the same key exists.
    /// Returns `None` when another writer created it first.
    async fn insert_batch_if_absent(
        &self,
        batch: &ProductionBatch,
    ) -> Result<Option<ProductionBatch>, RepositoryError>;

    async fn get_batch(&self, key: &BatchKey) -> Result<Option<ProductionBatch>, RepositoryError>;

    /// Highest batch number recorded for the item on the day.
    async fn latest_batch_number(
        &self,
        tenant_id: &TenantId,
        item_id: &ItemId,
        date: NaiveDate,
    ) -> Result<Option<BatchNumber>, RepositoryError>;

    /// Apply one field write to an existing batch under a row lock.
    /// Returns `None` when the batch does not exist.
    async fn apply_batch_field(
        &self,
        key: &BatchKey,
        field: &BatchField,
        updated_by: &UserId,
    ) -> Result<Option<ProductionBatch>, RepositoryError>;

    /// Batches for a day ordered by item then batch number.
    async fn list_batches(
        &self,
        tenant_id: &TenantId,
        date: NaiveDate,
        item_id: Option<&ItemId>,
    ) -> Result<Vec<ProductionBatch>, RepositoryError>;
}

/// Production group persistence.
///
/// Creating or updating a group whose name or any member is already taken
/// within the tenant fails with [`RepositoryError::Conflict`].
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn create_group(
        &self,
        tenant_id: &TenantId,
        group: &NewProductionGroup,
    ) -> Result<ProductionGroup, RepositoryError>;

    async fn get_group(
        &self,
        tenant_id: &TenantId,
        id: ProductionGroupId,
    ) -> Result<Option<ProductionGroup>, RepositoryError>;

    /// Groups ordered by name.
    async fn list_groups(&self, tenant_id: &TenantId)
    -> Result<Vec<ProductionGroup>, RepositoryError>;

    async fn update_group(
        &self,
        tenant_id: &TenantId,
        id: ProductionGroupId,
        group: &NewProductionGroup,
    ) -> Result<Option<ProductionGroup>, RepositoryError>;

    /// Returns whether a group was deleted.
    async fn delete_group(
        &self,
        tenant_id: &TenantId,
        id: ProductionGroupId,
    ) -> Result<bool, RepositoryError>;
}

/// Read access to the tenant's product/item catalog.
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    /// The subset of `items` that exist for the tenant.
    async fn known_items(
        &self,
        tenant_id: &TenantId,
        items: &[ItemId],
    ) -> Result<HashSet<ItemId>, RepositoryError>;
}
