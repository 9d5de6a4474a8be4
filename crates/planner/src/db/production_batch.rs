//! `PostgreSQL` production batch store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use prodplan_core::{
    BatchField, BatchMeasurements, BatchNumber, BatchStatus, ItemId, TenantId, UserId,
};

use super::{BatchStore, RepositoryError};
use crate::models::{BatchKey, ProductionBatch};

macro_rules! batch_columns {
    () => {
        "tenant_id, item_id, batch_number, batch_no, production_date, \
         moulding_time, unloading_time, production_loss, qty_per_batch, \
         qty_achieved, status, created_by, updated_by, created_at, updated_at"
    };
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductionBatchRow {
    tenant_id: TenantId,
    item_id: ItemId,
    batch_number: i32,
    batch_no: String,
    production_date: NaiveDate,
    moulding_time: Option<DateTime<Utc>>,
    unloading_time: Option<DateTime<Utc>>,
    production_loss: Decimal,
    qty_per_batch: Decimal,
    qty_achieved: Decimal,
    status: BatchStatus,
    created_by: UserId,
    updated_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductionBatchRow> for ProductionBatch {
    type Error = RepositoryError;

    fn try_from(row: ProductionBatchRow) -> Result<Self, Self::Error> {
        let batch_number = BatchNumber::new(row.batch_number).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "production_batch {}/{}: {e}",
                row.item_id, row.batch_no
            ))
        })?;

        Ok(Self {
            tenant_id: row.tenant_id,
            item_id: row.item_id,
            batch_number,
            batch_no: row.batch_no,
            production_date: row.production_date,
            measurements: BatchMeasurements {
                moulding_time: row.moulding_time,
                unloading_time: row.unloading_time,
                production_loss: row.production_loss,
                qty_per_batch: row.qty_per_batch,
            },
            qty_achieved: row.qty_achieved,
            status: row.status,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// Production batches backed by `production.production_batch`.
#[derive(Clone)]
pub struct PgBatchStore {
    pool: PgPool,
}

impl PgBatchStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchStore for PgBatchStore {
    async fn insert_batch_if_absent(
        &self,
        batch: &ProductionBatch,
    ) -> Result<Option<ProductionBatch>, RepositoryError> {
        let m = &batch.measurements;
        let row = sqlx::query_as::<_, ProductionBatchRow>(concat!(
            r"
            INSERT INTO production.production_batch (
                tenant_id, item_id, batch_number, batch_no, production_date,
                moulding_time, unloading_time, production_loss, qty_per_batch,
                qty_achieved, status, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT DO NOTHING
            RETURNING ",
            batch_columns!()
        ))
        .bind(&batch.tenant_id)
        .bind(&batch.item_id)
        .bind(batch.batch_number.get())
        .bind(&batch.batch_no)
        .bind(batch.production_date)
        .bind(m.moulding_time)
        .bind(m.unloading_time)
        .bind(m.production_loss)
        .bind(m.qty_per_batch)
        .bind(batch.qty_achieved)
        .bind(batch.status)
        .bind(&batch.created_by)
        .bind(&batch.updated_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("production_batch_item_fkey")
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        row.map(ProductionBatch::try_from).transpose()
    }

    async fn get_batch(&self, key: &BatchKey) -> Result<Option<ProductionBatch>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductionBatchRow>(concat!(
            "SELECT ",
            batch_columns!(),
            r"
            FROM production.production_batch
            WHERE tenant_id = $1 AND item_id = $2 AND batch_number = $3 AND production_date = $4
            "
        ))
        .bind(&key.tenant_id)
        .bind(&key.item_id)
        .bind(key.batch_number.get())
        .bind(key.production_date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductionBatch::try_from).transpose()
    }

    async fn latest_batch_number(
        &self,
        tenant_id: &TenantId,
        item_id: &ItemId,
        date: NaiveDate,
    ) -> Result<Option<BatchNumber>, RepositoryError> {
        let latest: Option<i32> = sqlx::query_scalar(
            r"
            SELECT MAX(batch_number) FROM production.production_batch
            WHERE tenant_id = $1 AND item_id = $2 AND production_date = $3
            ",
        )
        .bind(tenant_id)
        .bind(item_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        latest
            .map(|n| {
                BatchNumber::new(n).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
            })
            .transpose()
    }

    async fn apply_batch_field(
        &self,
        key: &BatchKey,
        field: &BatchField,
        updated_by: &UserId,
    ) -> Result<Option<ProductionBatch>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductionBatchRow>(concat!(
            "SELECT ",
            batch_columns!(),
            r"
            FROM production.production_batch
            WHERE tenant_id = $1 AND item_id = $2 AND batch_number = $3 AND production_date = $4
            FOR UPDATE
            "
        ))
        .bind(&key.tenant_id)
        .bind(&key.item_id)
        .bind(key.batch_number.get())
        .bind(key.production_date)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut batch = ProductionBatch::try_from(row)?;
        let measurements = batch.measurements.with_field(field)?;
        batch.set_measurements(measurements);

        let m = &batch.measurements;
        let row = sqlx::query_as::<_, ProductionBatchRow>(concat!(
            r"
            UPDATE production.production_batch
            SET moulding_time = $5,
                unloading_time = $6,
                production_loss = $7,
                qty_per_batch = $8,
                qty_achieved = $9,
                status = $10,
                updated_by = $11,
                updated_at = now()
            WHERE tenant_id = $1 AND item_id = $2 AND batch_number = $3 AND production_date = $4
            RETURNING ",
            batch_columns!()
        ))
        .bind(&key.tenant_id)
        .bind(&key.item_id)
        .bind(key.batch_number.get())
        .bind(key.production_date)
        .bind(m.moulding_time)
        .bind(m.unloading_time)
        .bind(m.production_loss)
        .bind(m.qty_per_batch)
        .bind(batch.qty_achieved)
        .bind(batch.status)
        .bind(updated_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        ProductionBatch::try_from(row).map(Some)
    }

    async fn list_batches(
        &self,
        tenant_id: &TenantId,
        date: NaiveDate,
        item_id: Option<&ItemId>,
    ) -> Result<Vec<ProductionBatch>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductionBatchRow>(concat!(
            "SELECT ",
            batch_columns!(),
            r"
            FROM production.production_batch
            WHERE tenant_id = $1
                AND production_date = $2
                AND ($3::text IS NULL OR item_id = $3)
            ORDER BY item_id, batch_number
            "
        ))
        .bind(tenant_id)
        .bind(date)
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProductionBatch::try_from).collect()
    }
}
