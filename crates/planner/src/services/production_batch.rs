//! Batch allocation and operator field writes.
//!
//! Writes always target the business calendar's current day. Creation relies
//! on the store's uniqueness on (tenant, item, batch, day): losing a creation
//! race yields the winner's record rather than a duplicate.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use prodplan_core::{
    BatchField, BatchMeasurements, BatchNumber, BusinessCalendar, ItemId, TenantId, UserId,
};

use crate::db::{BatchStore, SummaryStore};
use crate::error::AppError;
use crate::models::{BatchKey, ProductionBatch, ProductionSheet, SummaryKey};

/// Operator access to production batches.
pub struct BatchTrackingService<'a> {
    batches: &'a dyn BatchStore,
    summaries: &'a dyn SummaryStore,
    calendar: BusinessCalendar,
}

impl<'a> BatchTrackingService<'a> {
    #[must_use]
    pub const fn new(
        batches: &'a dyn BatchStore,
        summaries: &'a dyn SummaryStore,
        calendar: BusinessCalendar,
    ) -> Self {
        Self {
            batches,
            summaries,
            calendar,
        }
    }

    /// Return today's batch for the item, creating it with defaults if absent.
    ///
    /// `batch` defaults to the first batch.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the item is not in the catalog.
    #[instrument(skip(self, created_by), fields(tenant = %tenant_id, item = %item_id))]
    pub async fn get_or_create_for_today(
        &self,
        tenant_id: &TenantId,
        item_id: &ItemId,
        batch: Option<BatchNumber>,
        created_by: &UserId,
    ) -> Result<ProductionBatch, AppError> {
        let today = self.calendar.today();
        let key = BatchKey::new(
            tenant_id.clone(),
            item_id.clone(),
            batch.unwrap_or(BatchNumber::FIRST),
            today,
        );

        if let Some(existing) = self.batches.get_batch(&key).await? {
            return Ok(existing);
        }

        let fresh = self.new_batch(key.clone(), created_by).await?;
        if let Some(created) = self.batches.insert_batch_if_absent(&fresh).await? {
            info!(batch_no = %created.batch_no, "Created production batch");
            return Ok(created);
        }

        debug!(batch_no = %fresh.batch_no, "Batch created concurrently, reading winner");
        self.batches
            .get_batch(&key)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("batch {} could not be created", fresh.batch_no)))
    }

    /// Allocate the next batch number for the item today and create it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the allocation loses a race twice.
    #[instrument(skip(self, created_by), fields(tenant = %tenant_id, item = %item_id))]
    pub async fn create_next_batch(
        &self,
        tenant_id: &TenantId,
        item_id: &ItemId,
        created_by: &UserId,
    ) -> Result<ProductionBatch, AppError> {
        let today = self.calendar.today();

        for attempt in 0..2 {
            let next = self
                .batches
                .latest_batch_number(tenant_id, item_id, today)
                .await?
                .map_or(BatchNumber::FIRST, BatchNumber::next);

            let key = BatchKey::new(tenant_id.clone(), item_id.clone(), next, today);
            let fresh = self.new_batch(key, created_by).await?;
            if let Some(created) = self.batches.insert_batch_if_absent(&fresh).await? {
                info!(batch_no = %created.batch_no, "Allocated production batch");
                return Ok(created);
            }
            debug!(attempt, batch_no = %fresh.batch_no, "Batch number taken, retrying");
        }

        Err(AppError::Conflict(format!(
            "could not allocate a new batch for {item_id}"
        )))
    }

    /// Write one field of today's batch, creating the batch if needed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for negative quantities or an unloading
    /// time before the moulding time.
    #[instrument(skip(self, updated_by), fields(tenant = %tenant_id, item = %item_id, field = field.name()))]
    pub async fn update_field(
        &self,
        tenant_id: &TenantId,
        item_id: &ItemId,
        batch: Option<BatchNumber>,
        field: &BatchField,
        updated_by: &UserId,
    ) -> Result<ProductionBatch, AppError> {
        // Reject malformed values before a lazy create.
        BatchMeasurements::default().with_field(field)?;

        let target = self
            .get_or_create_for_today(tenant_id, item_id, batch, updated_by)
            .await?;

        let updated = self
            .batches
            .apply_batch_field(&target.key(), field, updated_by)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("batch {}", target.batch_no)))?;

        info!(
            batch_no = %updated.batch_no,
            status = %updated.status,
            qty_achieved = %updated.qty_achieved,
            "Updated production batch"
        );

        Ok(updated)
    }

    /// All batches recorded on a day, optionally for one item.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    #[instrument(skip(self), fields(tenant = %tenant_id))]
    pub async fn production_sheet(
        &self,
        tenant_id: &TenantId,
        date: NaiveDate,
        item_id: Option<&ItemId>,
    ) -> Result<ProductionSheet, AppError> {
        let batches = self.batches.list_batches(tenant_id, date, item_id).await?;
        Ok(ProductionSheet::build(date, batches))
    }

    /// A `not_started` batch seeded with today's planned qty/batch.
    async fn new_batch(
        &self,
        key: BatchKey,
        created_by: &UserId,
    ) -> Result<ProductionBatch, AppError> {
        let summary_key = SummaryKey::new(
            key.tenant_id.clone(),
            key.item_id.clone(),
            key.production_date,
        );
        let qty_per_batch = self
            .summaries
            .get_summary(&summary_key)
            .await?
            .map_or(Decimal::ZERO, |s| s.inputs.qty_per_batch);

        Ok(ProductionBatch::new(
            key,
            BatchMeasurements::with_qty_per_batch(qty_per_batch),
            created_by.clone(),
            Utc::now(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use prodplan_core::{BatchStatus, OrderId, PlanningUpdate, ValidationError};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::IndentContribution;

    fn tenant() -> TenantId {
        TenantId::parse("T1").unwrap()
    }

    fn item() -> ItemId {
        ItemId::parse("I1").unwrap()
    }

    fn operator() -> UserId {
        UserId::parse("op-1").unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::new().with_items(&tenant(), [item()])
    }

    #[tokio::test]
    async fn test_get_or_create_defaults_to_first_batch() {
        let store = store();
        let service = BatchTrackingService::new(&store, &store, BusinessCalendar::utc());

        let batch = service
            .get_or_create_for_today(&tenant(), &item(), None, &operator())
            .await
            .unwrap();
        let again = service
            .get_or_create_for_today(&tenant(), &item(), Some(BatchNumber::FIRST), &operator())
            .await
            .unwrap();

        assert_eq!(batch.batch_no, "BATNO01");
        assert_eq!(batch.status, BatchStatus::NotStarted);
        assert_eq!(batch, again);
        let sheet = service
            .production_sheet(&tenant(), BusinessCalendar::utc().today(), None)
            .await
            .unwrap();
        assert_eq!(sheet.items[0].total_batches, 1);
    }

    #[tokio::test]
    async fn test_new_batch_takes_qty_from_todays_summary() {
        let store = store();
        let calendar = BusinessCalendar::utc();
        store
            .record_contribution(&IndentContribution {
                tenant_id: tenant(),
                order_id: OrderId::parse("SO-1").unwrap(),
                product_id: item(),
                date: calendar.today(),
                quantity: dec!(900),
                sales_person_id: None,
            })
            .await
            .unwrap();
        store
            .apply_planning_update(
                &SummaryKey::new(tenant(), item(), calendar.today()),
                &PlanningUpdate {
                    qty_per_batch: Some(dec!(600)),
                    ..PlanningUpdate::default()
                },
            )
            .await
            .unwrap();

        let service = BatchTrackingService::new(&store, &store, calendar);
        let batch = service
            .get_or_create_for_today(&tenant(), &item(), None, &operator())
            .await
            .unwrap();

        assert_eq!(batch.measurements.qty_per_batch, dec!(600));
        assert_eq!(batch.qty_achieved, dec!(600));
    }

    #[tokio::test]
    async fn test_state_machine_follows_timestamps() {
        let store = store();
        let service = BatchTrackingService::new(&store, &store, BusinessCalendar::utc());
        let start = Utc::now();

        let moulding = service
            .update_field(&tenant(), &item(), None, &BatchField::MouldingTime(Some(start)), &operator())
            .await
            .unwrap();
        assert_eq!(moulding.status, BatchStatus::InProgress);

        let unloaded = service
            .update_field(
                &tenant(),
                &item(),
                None,
                &BatchField::UnloadingTime(Some(start + Duration::hours(2))),
                &operator(),
            )
            .await
            .unwrap();
        assert_eq!(unloaded.status, BatchStatus::Completed);

        let reopened = service
            .update_field(&tenant(), &item(), None, &BatchField::UnloadingTime(None), &operator())
            .await
            .unwrap();
        assert_eq!(reopened.status, BatchStatus::InProgress);
    }

    #[tokio::test]
    async fn test_qty_achieved_tracks_loss() {
        let store = store();
        let service = BatchTrackingService::new(&store, &store, BusinessCalendar::utc());

        service
            .update_field(&tenant(), &item(), None, &BatchField::QtyPerBatch(dec!(300)), &operator())
            .await
            .unwrap();
        let batch = service
            .update_field(&tenant(), &item(), None, &BatchField::ProductionLoss(dec!(450)), &operator())
            .await
            .unwrap();

        assert_eq!(batch.qty_achieved, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_negative_loss_is_rejected_without_creating() {
        let store = store();
        let service = BatchTrackingService::new(&store, &store, BusinessCalendar::utc());

        let result = service
            .update_field(&tenant(), &item(), None, &BatchField::ProductionLoss(dec!(-1)), &operator())
            .await;

        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::NegativeQuantity { .. }))
        ));
        let sheet = service
            .production_sheet(&tenant(), BusinessCalendar::utc().today(), None)
            .await
            .unwrap();
        assert!(sheet.items.is_empty());
    }

    #[tokio::test]
    async fn test_unloading_before_moulding_is_rejected() {
        let store = store();
        let service = BatchTrackingService::new(&store, &store, BusinessCalendar::utc());
        let start = Utc::now();

        service
            .update_field(&tenant(), &item(), None, &BatchField::MouldingTime(Some(start)), &operator())
            .await
            .unwrap();
        let result = service
            .update_field(
                &tenant(),
                &item(),
                None,
                &BatchField::UnloadingTime(Some(start - Duration::minutes(5))),
                &operator(),
            )
            .await;

        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::UnloadingBeforeMoulding { .. }))
        ));
    }

    #[tokio::test]
    async fn test_next_batch_numbers_are_sequential() {
        let store = store();
        let service = BatchTrackingService::new(&store, &store, BusinessCalendar::utc());

        let first = service
            .create_next_batch(&tenant(), &item(), &operator())
            .await
            .unwrap();
        let second = service
            .create_next_batch(&tenant(), &item(), &operator())
            .await
            .unwrap();

        assert_eq!(first.batch_no, "BATNO01");
        assert_eq!(second.batch_no, "BATNO02");
    }
}
