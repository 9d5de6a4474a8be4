//! Daily summary reads and planning-input writes.

use chrono::NaiveDate;
use tracing::{info, instrument};

use prodplan_core::{PlanningUpdate, ProductId, TenantId};

use crate::db::SummaryStore;
use crate::error::AppError;
use crate::models::{DailySummary, SummaryFilter, SummaryKey};

/// Page size when the caller gives none.
pub const DEFAULT_LIST_LIMIT: i64 = 100;
/// Largest page a caller may request.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Planner access to daily summaries.
///
/// Summaries are created only by indent aggregation; planners read them and
/// edit the planning inputs.
pub struct DailySummaryService<'a> {
    summaries: &'a dyn SummaryStore,
}

impl<'a> DailySummaryService<'a> {
    #[must_use]
    pub const fn new(summaries: &'a dyn SummaryStore) -> Self {
        Self { summaries }
    }

    /// Get one summary.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no demand was aggregated for the key.
    #[instrument(skip(self), fields(tenant = %tenant_id, product = %product_id))]
    pub async fn get(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        date: NaiveDate,
    ) -> Result<DailySummary, AppError> {
        let key = SummaryKey::new(tenant_id.clone(), product_id.clone(), date);
        self.summaries
            .get_summary(&key)
            .await?
            .ok_or_else(|| not_found(product_id, date))
    }

    /// List summaries for a day, paged.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    #[instrument(skip(self, filter), fields(tenant = %tenant_id))]
    pub async fn list(
        &self,
        tenant_id: &TenantId,
        date: NaiveDate,
        filter: SummaryFilter,
    ) -> Result<Vec<DailySummary>, AppError> {
        let filter = SummaryFilter {
            limit: Some(
                filter
                    .limit
                    .unwrap_or(DEFAULT_LIST_LIMIT)
                    .clamp(1, MAX_LIST_LIMIT),
            ),
            offset: Some(filter.offset.unwrap_or(0).max(0)),
            ..filter
        };

        Ok(self.summaries.list_summaries(tenant_id, date, &filter).await?)
    }

    /// Merge planning inputs and return the recomputed summary.
    ///
    /// Negative inputs are clamped to zero.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if an input cannot be stored and
    /// `AppError::NotFound` if the summary does not exist.
    #[instrument(skip(self, update), fields(tenant = %tenant_id, product = %product_id))]
    pub async fn apply_planning_update(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        date: NaiveDate,
        update: &PlanningUpdate,
    ) -> Result<DailySummary, AppError> {
        let update = update.normalized()?;
        let key = SummaryKey::new(tenant_id.clone(), product_id.clone(), date);
        let summary = self
            .summaries
            .apply_planning_update(&key, &update)
            .await?
            .ok_or_else(|| not_found(product_id, date))?;

        info!(
            to_be_produced_batches = %summary.derived.to_be_produced_batches,
            expiry_shortage = %summary.derived.expiry_shortage,
            "Applied planning update"
        );

        Ok(summary)
    }
}

fn not_found(product_id: &ProductId, date: NaiveDate) -> AppError {
    AppError::NotFound(format!("daily summary for {product_id} on {date}"))
}
