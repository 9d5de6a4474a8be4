//! `PostgreSQL` item catalog lookups.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;

use prodplan_core::{ItemId, TenantId};

use super::{ItemCatalog, RepositoryError};

/// Catalog backed by `production.item`.
#[derive(Clone)]
pub struct PgItemCatalog {
    pool: PgPool,
}

impl PgItemCatalog {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemCatalog for PgItemCatalog {
    async fn known_items(
        &self,
        tenant_id: &TenantId,
        items: &[ItemId],
    ) -> Result<HashSet<ItemId>, RepositoryError> {
        if items.is_empty() {
            return Ok(HashSet::new());
        }
        let ids: Vec<String> = items.iter().map(|i| i.as_str().to_owned()).collect();

        let found: Vec<ItemId> = sqlx::query_scalar(
            r"
            SELECT id FROM production.item
            WHERE tenant_id = $1 AND id = ANY($2)
            ",
        )
        .bind(tenant_id)
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(found.into_iter().collect())
    }
}
