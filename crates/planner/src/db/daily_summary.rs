//! `PostgreSQL` daily summary store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use prodplan_core::{
    DerivedQuantities, PlanningInputs, PlanningUpdate, ProductId, TenantId, ValidationError,
    require_storable,
};

use super::{RepositoryError, SummaryStore, is_numeric_overflow};
use crate::models::daily_summary::record_sale;
use crate::models::{
    ContributionOutcome, DailySummary, IndentContribution, SalesBreakdownEntry, SummaryFilter,
    SummaryKey,
};

macro_rules! summary_columns {
    () => {
        "id, tenant_id, product_id, summary_date, total_indent, sales_breakdown, \
         physical_stock, packing, batch_adjusted, qty_per_batch, \
         production_final_batches, to_be_produced_day, to_be_produced_batches, \
         expiry_shortage, balance_final_batches, created_at, updated_at"
    };
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DailySummaryRow {
    id: i32,
    tenant_id: TenantId,
    product_id: ProductId,
    summary_date: NaiveDate,
    total_indent: Decimal,
    sales_breakdown: Json<Vec<SalesBreakdownEntry>>,
    physical_stock: Decimal,
    packing: Decimal,
    batch_adjusted: Decimal,
    qty_per_batch: Decimal,
    production_final_batches: Decimal,
    to_be_produced_day: Decimal,
    to_be_produced_batches: Decimal,
    expiry_shortage: Decimal,
    balance_final_batches: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DailySummaryRow> for DailySummary {
    fn from(row: DailySummaryRow) -> Self {
        Self {
            tenant_id: row.tenant_id,
            product_id: row.product_id,
            date: row.summary_date,
            total_indent: row.total_indent,
            sales_breakdown: row.sales_breakdown.0,
            inputs: PlanningInputs {
                physical_stock: row.physical_stock,
                packing: row.packing,
                batch_adjusted: row.batch_adjusted,
                qty_per_batch: row.qty_per_batch,
            },
            derived: DerivedQuantities {
                production_final_batches: row.production_final_batches,
                to_be_produced_day: row.to_be_produced_day,
                to_be_produced_batches: row.to_be_produced_batches,
                expiry_shortage: row.expiry_shortage,
                balance_final_batches: row.balance_final_batches,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Daily summaries backed by `production.daily_summary`.
#[derive(Clone)]
pub struct PgSummaryStore {
    pool: PgPool,
}

impl PgSummaryStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write the recomputed derived fields (and breakdown) of a locked row.
    async fn write_derived(
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
        summary: &DailySummary,
    ) -> Result<DailySummaryRow, RepositoryError> {
        let derived = &summary.derived;
        let row = sqlx::query_as::<_, DailySummaryRow>(concat!(
            r"
            UPDATE production.daily_summary
            SET sales_breakdown = $2,
                production_final_batches = $3,
                to_be_produced_day = $4,
                to_be_produced_batches = $5,
                expiry_shortage = $6,
                balance_final_batches = $7,
                updated_at = now()
            WHERE id = $1
            RETURNING ",
            summary_columns!()
        ))
        .bind(id)
        .bind(Json(&summary.sales_breakdown))
        .bind(derived.production_final_batches)
        .bind(derived.to_be_produced_day)
        .bind(derived.to_be_produced_batches)
        .bind(derived.expiry_shortage)
        .bind(derived.balance_final_batches)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl SummaryStore for PgSummaryStore {
    async fn record_contribution(
        &self,
        contribution: &IndentContribution,
    ) -> Result<ContributionOutcome, RepositoryError> {
        require_storable("quantity", contribution.quantity)?;
        let mut tx = self.pool.begin().await?;

        let recorded: Option<String> = sqlx::query_scalar(
            r"
            INSERT INTO production.indent_contribution (
                tenant_id, order_id, product_id, summary_date, quantity, sales_person_id
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tenant_id, order_id, product_id) DO NOTHING
            RETURNING order_id
            ",
        )
        .bind(&contribution.tenant_id)
        .bind(&contribution.order_id)
        .bind(&contribution.product_id)
        .bind(contribution.date)
        .bind(contribution.quantity)
        .bind(contribution.sales_person_id.as_ref())
        .fetch_optional(&mut *tx)
        .await?;

        if recorded.is_none() {
            tx.rollback().await?;
            return Ok(ContributionOutcome::AlreadyCounted);
        }

        // The upsert takes the row lock; the derived write below happens under it.
        let row = sqlx::query_as::<_, DailySummaryRow>(concat!(
            r"
            INSERT INTO production.daily_summary (tenant_id, product_id, summary_date, total_indent)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT uq_daily_summary_key DO UPDATE
            SET total_indent = production.daily_summary.total_indent + EXCLUDED.total_indent,
                updated_at = now()
            RETURNING ",
            summary_columns!()
        ))
        .bind(&contribution.tenant_id)
        .bind(&contribution.product_id)
        .bind(contribution.date)
        .bind(contribution.quantity)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("daily_summary_item_fkey")
            {
                return RepositoryError::NotFound;
            }
            // Dropping the transaction also discards the contribution marker.
            if is_numeric_overflow(&e) {
                return RepositoryError::Rejected(ValidationError::QuantityOverflow {
                    field: "totalIndent",
                    added: contribution.quantity,
                });
            }
            RepositoryError::Database(e)
        })?;

        let id = row.id;
        let mut summary = DailySummary::from(row);
        if let Some(sales_person_id) = &contribution.sales_person_id {
            record_sale(
                &mut summary.sales_breakdown,
                sales_person_id,
                contribution.quantity,
            );
        }
        summary.recompute();

        let row = Self::write_derived(&mut tx, id, &summary).await?;
        tx.commit().await?;

        Ok(ContributionOutcome::Applied(row.into()))
    }

    async fn get_summary(&self, key: &SummaryKey) -> Result<Option<DailySummary>, RepositoryError> {
        let row = sqlx::query_as::<_, DailySummaryRow>(concat!(
            "SELECT ",
            summary_columns!(),
            r"
            FROM production.daily_summary
            WHERE tenant_id = $1 AND product_id = $2 AND summary_date = $3
            "
        ))
        .bind(&key.tenant_id)
        .bind(&key.product_id)
        .bind(key.date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_summaries(
        &self,
        tenant_id: &TenantId,
        date: NaiveDate,
        filter: &SummaryFilter,
    ) -> Result<Vec<DailySummary>, RepositoryError> {
        let product_ids: Vec<String> = filter
            .product_ids
            .iter()
            .map(|p| p.as_str().to_owned())
            .collect();

        let rows = sqlx::query_as::<_, DailySummaryRow>(concat!(
            "SELECT ",
            summary_columns!(),
            r"
            FROM production.daily_summary
            WHERE tenant_id = $1
                AND summary_date = $2
                AND (cardinality($3::text[]) = 0 OR product_id = ANY($3))
                AND (NOT $4 OR expiry_shortage > 0)
            ORDER BY product_id
            LIMIT $5 OFFSET $6
            "
        ))
        .bind(tenant_id)
        .bind(date)
        .bind(&product_ids)
        .bind(filter.shortage_only)
        .bind(filter.limit)
        .bind(filter.offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn apply_planning_update(
        &self,
        key: &SummaryKey,
        update: &PlanningUpdate,
    ) -> Result<Option<DailySummary>, RepositoryError> {
        let update = update.normalized()?;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, DailySummaryRow>(concat!(
            r"
            UPDATE production.daily_summary
            SET physical_stock = COALESCE($4, physical_stock),
                packing = COALESCE($5, packing),
                batch_adjusted = COALESCE($6, batch_adjusted),
                qty_per_batch = COALESCE($7, qty_per_batch),
                updated_at = now()
            WHERE tenant_id = $1 AND product_id = $2 AND summary_date = $3
            RETURNING ",
            summary_columns!()
        ))
        .bind(&key.tenant_id)
        .bind(&key.product_id)
        .bind(key.date)
        .bind(update.physical_stock)
        .bind(update.packing)
        .bind(update.batch_adjusted)
        .bind(update.qty_per_batch)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let id = row.id;
        let mut summary = DailySummary::from(row);
        summary.recompute();

        let row = Self::write_derived(&mut tx, id, &summary).await?;
        tx.commit().await?;

        Ok(Some(row.into()))
    }
}
