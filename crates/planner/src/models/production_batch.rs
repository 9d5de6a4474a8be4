//! Production batch records and the operator production sheet.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use prodplan_core::{BatchMeasurements, BatchNumber, BatchStatus, ItemId, TenantId, UserId};

/// Identity of a production batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub tenant_id: TenantId,
    pub item_id: ItemId,
    pub batch_number: BatchNumber,
    pub production_date: NaiveDate,
}

impl BatchKey {
    #[must_use]
    pub const fn new(
        tenant_id: TenantId,
        item_id: ItemId,
        batch_number: BatchNumber,
        production_date: NaiveDate,
    ) -> Self {
        Self {
            tenant_id,
            item_id,
            batch_number,
            production_date,
        }
    }
}

/// One physical production run of an item on a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionBatch {
    pub tenant_id: TenantId,
    pub item_id: ItemId,
    pub batch_number: BatchNumber,
    /// Display label, e.g. `BATNO01`.
    pub batch_no: String,
    pub production_date: NaiveDate,
    #[serde(flatten)]
    pub measurements: BatchMeasurements,
    pub qty_achieved: Decimal,
    pub status: BatchStatus,
    pub created_by: UserId,
    pub updated_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductionBatch {
    /// A fresh `not_started` batch.
    #[must_use]
    pub fn new(
        key: BatchKey,
        measurements: BatchMeasurements,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        let mut batch = Self {
            tenant_id: key.tenant_id,
            item_id: key.item_id,
            batch_number: key.batch_number,
            batch_no: key.batch_number.label(),
            production_date: key.production_date,
            measurements,
            qty_achieved: Decimal::ZERO,
            status: BatchStatus::NotStarted,
            updated_by: created_by.clone(),
            created_by,
            created_at: now,
            updated_at: now,
        };
        batch.refresh_derived();
        batch
    }

    #[must_use]
    pub fn key(&self) -> BatchKey {
        BatchKey::new(
            self.tenant_id.clone(),
            self.item_id.clone(),
            self.batch_number,
            self.production_date,
        )
    }

    /// Replace the measurements and re-evaluate achieved quantity and status.
    pub fn set_measurements(&mut self, measurements: BatchMeasurements) {
        self.measurements = measurements;
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        self.qty_achieved = self.measurements.qty_achieved();
        self.status = self.measurements.status();
    }
}

/// All batches of one item on the sheet day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBatchSheet {
    pub item_id: ItemId,
    pub batches: Vec<ProductionBatch>,
    pub total_batches: usize,
    pub completed_batches: usize,
    pub total_qty_achieved: Decimal,
    pub total_production_loss: Decimal,
}

impl ItemBatchSheet {
    fn from_batches(item_id: ItemId, batches: Vec<ProductionBatch>) -> Self {
        let completed_batches = batches.iter().filter(|b| b.status.is_completed()).count();
        let total_qty_achieved = batches.iter().map(|b| b.qty_achieved).sum();
        let total_production_loss = batches
            .iter()
            .map(|b| b.measurements.production_loss)
            .sum();
        Self {
            item_id,
            total_batches: batches.len(),
            completed_batches,
            total_qty_achieved,
            total_production_loss,
            batches,
        }
    }
}

/// Operator view of every batch recorded on a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionSheet {
    pub date: NaiveDate,
    pub items: Vec<ItemBatchSheet>,
}

impl ProductionSheet {
    /// Group batches by item. Input must be ordered by item then batch number.
    #[must_use]
    pub fn build(date: NaiveDate, batches: Vec<ProductionBatch>) -> Self {
        let mut items: Vec<ItemBatchSheet> = Vec::new();
        let mut current: Vec<ProductionBatch> = Vec::new();

        for batch in batches {
            if let Some(last) = current.last()
                && last.item_id != batch.item_id
            {
                let item_id = last.item_id.clone();
                items.push(ItemBatchSheet::from_batches(
                    item_id,
                    std::mem::take(&mut current),
                ));
            }
            current.push(batch);
        }
        if let Some(first) = current.first() {
            let item_id = first.item_id.clone();
            items.push(ItemBatchSheet::from_batches(item_id, current));
        }

        Self { date, items }
    }
}
