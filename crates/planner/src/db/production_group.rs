//! `PostgreSQL` production group store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use prodplan_core::{ItemId, ProductionGroupId, TenantId, UserId};

use super::{GroupStore, RepositoryError, map_constraint};
use crate::models::{NewProductionGroup, ProductionGroup};

const GROUP_CONSTRAINTS: &[(&str, &str)] = &[
    (
        "uq_production_group_name",
        "a production group with this name already exists",
    ),
    (
        "uq_production_group_item_tenant",
        "an item can belong to only one production group",
    ),
    (
        "production_group_item_pkey",
        "item appears more than once in the group",
    ),
];

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductionGroupRow {
    id: i32,
    tenant_id: TenantId,
    name: String,
    description: Option<String>,
    qty_per_batch: Decimal,
    created_by: UserId,
    updated_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductionGroupRow {
    fn into_group(self, items: Vec<ItemId>) -> ProductionGroup {
        ProductionGroup {
            id: ProductionGroupId::new(self.id),
            tenant_id: self.tenant_id,
            name: self.name,
            description: self.description,
            items,
            qty_per_batch: self.qty_per_batch,
            created_by: self.created_by,
            updated_by: self.updated_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GroupItemRow {
    group_id: i32,
    item_id: ItemId,
}

// =============================================================================
// Store
// =============================================================================

/// Production groups backed by `production.production_group`.
#[derive(Clone)]
pub struct PgGroupStore {
    pool: PgPool,
}

impl PgGroupStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_items(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: &TenantId,
        group_id: i32,
        items: &[ItemId],
    ) -> Result<(), RepositoryError> {
        let ids: Vec<String> = items.iter().map(|i| i.as_str().to_owned()).collect();

        sqlx::query(
            r"
            INSERT INTO production.production_group_item (group_id, tenant_id, item_id, position)
            SELECT $1, $2, item.id, item.position::integer
            FROM UNNEST($3::text[]) WITH ORDINALITY AS item (id, position)
            ",
        )
        .bind(group_id)
        .bind(tenant_id)
        .bind(&ids)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("production_group_item_fkey")
            {
                return RepositoryError::NotFound;
            }
            map_constraint(e, GROUP_CONSTRAINTS)
        })?;

        Ok(())
    }

    async fn load_items(&self, group_id: i32) -> Result<Vec<ItemId>, RepositoryError> {
        let items = sqlx::query_scalar(
            r"
            SELECT item_id FROM production.production_group_item
            WHERE group_id = $1
            ORDER BY position
            ",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

#[async_trait]
impl GroupStore for PgGroupStore {
    async fn create_group(
        &self,
        tenant_id: &TenantId,
        group: &NewProductionGroup,
    ) -> Result<ProductionGroup, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductionGroupRow>(
            r"
            INSERT INTO production.production_group (
                tenant_id, name, description, qty_per_batch, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, tenant_id, name, description, qty_per_batch,
                created_by, updated_by, created_at, updated_at
            ",
        )
        .bind(tenant_id)
        .bind(&group.name)
        .bind(group.description.as_deref())
        .bind(group.qty_per_batch)
        .bind(&group.acting_user)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, GROUP_CONSTRAINTS))?;

        Self::insert_items(&mut tx, tenant_id, row.id, &group.items).await?;
        tx.commit().await?;

        Ok(row.into_group(group.items.clone()))
    }

    async fn get_group(
        &self,
        tenant_id: &TenantId,
        id: ProductionGroupId,
    ) -> Result<Option<ProductionGroup>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductionGroupRow>(
            r"
            SELECT id, tenant_id, name, description, qty_per_batch,
                created_by, updated_by, created_at, updated_at
            FROM production.production_group
            WHERE tenant_id = $1 AND id = $2
            ",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = self.load_items(row.id).await?;

        Ok(Some(row.into_group(items)))
    }

    async fn list_groups(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<ProductionGroup>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductionGroupRow>(
            r"
            SELECT id, tenant_id, name, description, qty_per_batch,
                created_by, updated_by, created_at, updated_at
            FROM production.production_group
            WHERE tenant_id = $1
            ORDER BY name
            ",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let item_rows = sqlx::query_as::<_, GroupItemRow>(
            r"
            SELECT group_id, item_id FROM production.production_group_item
            WHERE tenant_id = $1
            ORDER BY group_id, position
            ",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let mut members: HashMap<i32, Vec<ItemId>> = HashMap::new();
        for item in item_rows {
            members.entry(item.group_id).or_default().push(item.item_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = members.remove(&row.id).unwrap_or_default();
                row.into_group(items)
            })
            .collect())
    }

    async fn update_group(
        &self,
        tenant_id: &TenantId,
        id: ProductionGroupId,
        group: &NewProductionGroup,
    ) -> Result<Option<ProductionGroup>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductionGroupRow>(
            r"
            UPDATE production.production_group
            SET name = $3,
                description = $4,
                qty_per_batch = $5,
                updated_by = $6,
                updated_at = now()
            WHERE tenant_id = $1 AND id = $2
            RETURNING id, tenant_id, name, description, qty_per_batch,
                created_by, updated_by, created_at, updated_at
            ",
        )
        .bind(tenant_id)
        .bind(id)
        .bind(&group.name)
        .bind(group.description.as_deref())
        .bind(group.qty_per_batch)
        .bind(&group.acting_user)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, GROUP_CONSTRAINTS))?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM production.production_group_item WHERE group_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        Self::insert_items(&mut tx, tenant_id, row.id, &group.items).await?;
        tx.commit().await?;

        Ok(Some(row.into_group(group.items.clone())))
    }

    async fn delete_group(
        &self,
        tenant_id: &TenantId,
        id: ProductionGroupId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM production.production_group WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
