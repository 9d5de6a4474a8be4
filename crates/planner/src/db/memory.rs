//! In-memory store backend.
//!
//! Implements every store trait with the same key and uniqueness rules as the
//! `PostgreSQL` schema. All state sits behind one mutex, so each operation is
//! linearizable.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use prodplan_core::{
    BatchField, BatchNumber, ItemId, OrderId, PlanningUpdate, ProductId, ProductionGroupId,
    TenantId, UserId,
};

use super::{BatchStore, GroupStore, ItemCatalog, RepositoryError, SummaryStore};
use crate::models::{
    BatchKey, ContributionOutcome, DailySummary, IndentContribution, NewProductionGroup,
    ProductionBatch, ProductionGroup, SummaryFilter, SummaryKey,
};

#[derive(Default)]
struct State {
    items: HashSet<(TenantId, ItemId)>,
    summaries: HashMap<SummaryKey, DailySummary>,
    contributions: HashSet<(TenantId, OrderId, ProductId)>,
    batches: HashMap<BatchKey, ProductionBatch>,
    groups: BTreeMap<ProductionGroupId, ProductionGroup>,
    next_group_id: i32,
}

impl State {
    fn has_item(&self, tenant_id: &TenantId, item_id: &ItemId) -> bool {
        self.items.contains(&(tenant_id.clone(), item_id.clone()))
    }

    /// Reject a group definition that collides with another group of the tenant.
    fn check_group_unique(
        &self,
        tenant_id: &TenantId,
        group: &NewProductionGroup,
        except: Option<ProductionGroupId>,
    ) -> Result<(), RepositoryError> {
        if let Some(item) = group.items.iter().find(|i| !self.has_item(tenant_id, i)) {
            tracing::debug!(item_id = %item, "group member not in catalog");
            return Err(RepositoryError::NotFound);
        }
        for other in self
            .groups
            .values()
            .filter(|g| &g.tenant_id == tenant_id && Some(g.id) != except)
        {
            if other.name == group.name {
                return Err(RepositoryError::Conflict(
                    "a production group with this name already exists".to_string(),
                ));
            }
            if group.items.iter().any(|i| other.items.contains(i)) {
                return Err(RepositoryError::Conflict(
                    "an item can belong to only one production group".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Store backend holding everything in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register catalog items for a tenant.
    #[must_use]
    pub fn with_items<I>(self, tenant_id: &TenantId, items: I) -> Self
    where
        I: IntoIterator<Item = ItemId>,
    {
        {
            let mut state = self.lock();
            for item in items {
                state.items.insert((tenant_id.clone(), item));
            }
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    async fn record_contribution(
        &self,
        contribution: &IndentContribution,
    ) -> Result<ContributionOutcome, RepositoryError> {
        let mut state = self.lock();
        if !state.has_item(&contribution.tenant_id, &contribution.product_id) {
            return Err(RepositoryError::NotFound);
        }

        let marker = (
            contribution.tenant_id.clone(),
            contribution.order_id.clone(),
            contribution.product_id.clone(),
        );
        if state.contributions.contains(&marker) {
            return Ok(ContributionOutcome::AlreadyCounted);
        }

        let key = SummaryKey::new(
            contribution.tenant_id.clone(),
            contribution.product_id.clone(),
            contribution.date,
        );
        let now = Utc::now();
        let mut summary = state.summaries.get(&key).cloned().unwrap_or_else(|| {
            DailySummary::seeded(key.clone(), rust_decimal::Decimal::ZERO, now)
        });
        // A rejected contribution leaves neither the marker nor the summary behind.
        summary.add_indent(contribution.quantity, contribution.sales_person_id.as_ref())?;
        summary.updated_at = now;

        state.contributions.insert(marker);
        state.summaries.insert(key, summary.clone());

        Ok(ContributionOutcome::Applied(summary))
    }

    async fn get_summary(&self, key: &SummaryKey) -> Result<Option<DailySummary>, RepositoryError> {
        Ok(self.lock().summaries.get(key).cloned())
    }

    async fn list_summaries(
        &self,
        tenant_id: &TenantId,
        date: NaiveDate,
        filter: &SummaryFilter,
    ) -> Result<Vec<DailySummary>, RepositoryError> {
        let state = self.lock();
        let mut summaries: Vec<DailySummary> = state
            .summaries
            .values()
            .filter(|s| &s.tenant_id == tenant_id && s.date == date && filter.matches(s))
            .cloned()
            .collect();
        drop(state);

        summaries.sort_by(|a, b| a.product_id.cmp(&b.product_id));

        let offset = usize::try_from(filter.offset.unwrap_or(0)).unwrap_or(0);
        let limit = filter
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(0));

        Ok(summaries.into_iter().skip(offset).take(limit).collect())
    }

    async fn apply_planning_update(
        &self,
        key: &SummaryKey,
        update: &PlanningUpdate,
    ) -> Result<Option<DailySummary>, RepositoryError> {
        let mut state = self.lock();
        let Some(summary) = state.summaries.get_mut(key) else {
            return Ok(None);
        };
        summary.apply_planning_update(update)?;
        summary.updated_at = Utc::now();

        Ok(Some(summary.clone()))
    }
}

#[async_trait]
impl BatchStore for MemoryStore {
    async fn insert_batch_if_absent(
        &self,
        batch: &ProductionBatch,
    ) -> Result<Option<ProductionBatch>, RepositoryError> {
        let mut state = self.lock();
        if !state.has_item(&batch.tenant_id, &batch.item_id) {
            return Err(RepositoryError::NotFound);
        }

        let key = batch.key();
        if state.batches.contains_key(&key) {
            return Ok(None);
        }
        state.batches.insert(key, batch.clone());

        Ok(Some(batch.clone()))
    }

    async fn get_batch(&self, key: &BatchKey) -> Result<Option<ProductionBatch>, RepositoryError> {
        Ok(self.lock().batches.get(key).cloned())
    }

    async fn latest_batch_number(
        &self,
        tenant_id: &TenantId,
        item_id: &ItemId,
        date: NaiveDate,
    ) -> Result<Option<BatchNumber>, RepositoryError> {
        Ok(self
            .lock()
            .batches
            .keys()
            .filter(|k| {
                &k.tenant_id == tenant_id && &k.item_id == item_id && k.production_date == date
            })
            .map(|k| k.batch_number)
            .max())
    }

    async fn apply_batch_field(
        &self,
        key: &BatchKey,
        field: &BatchField,
        updated_by: &UserId,
    ) -> Result<Option<ProductionBatch>, RepositoryError> {
        let mut state = self.lock();
        let Some(batch) = state.batches.get_mut(key) else {
            return Ok(None);
        };

        let measurements = batch.measurements.with_field(field)?;
        batch.set_measurements(measurements);
        batch.updated_by = updated_by.clone();
        batch.updated_at = Utc::now();

        Ok(Some(batch.clone()))
    }

    async fn list_batches(
        &self,
        tenant_id: &TenantId,
        date: NaiveDate,
        item_id: Option<&ItemId>,
    ) -> Result<Vec<ProductionBatch>, RepositoryError> {
        let state = self.lock();
        let mut batches: Vec<ProductionBatch> = state
            .batches
            .values()
            .filter(|b| {
                &b.tenant_id == tenant_id
                    && b.production_date == date
                    && item_id.is_none_or(|i| &b.item_id == i)
            })
            .cloned()
            .collect();
        drop(state);

        batches.sort_by(|a, b| {
            a.item_id
                .cmp(&b.item_id)
                .then(a.batch_number.cmp(&b.batch_number))
        });

        Ok(batches)
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn create_group(
        &self,
        tenant_id: &TenantId,
        group: &NewProductionGroup,
    ) -> Result<ProductionGroup, RepositoryError> {
        let mut state = self.lock();
        state.check_group_unique(tenant_id, group, None)?;

        state.next_group_id += 1;
        let now = Utc::now();
        let created = ProductionGroup {
            id: ProductionGroupId::new(state.next_group_id),
            tenant_id: tenant_id.clone(),
            name: group.name.clone(),
            description: group.description.clone(),
            items: group.items.clone(),
            qty_per_batch: group.qty_per_batch,
            created_by: group.acting_user.clone(),
            updated_by: group.acting_user.clone(),
            created_at: now,
            updated_at: now,
        };
        state.groups.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get_group(
        &self,
        tenant_id: &TenantId,
        id: ProductionGroupId,
    ) -> Result<Option<ProductionGroup>, RepositoryError> {
        Ok(self
            .lock()
            .groups
            .get(&id)
            .filter(|g| &g.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_groups(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<ProductionGroup>, RepositoryError> {
        let mut groups: Vec<ProductionGroup> = self
            .lock()
            .groups
            .values()
            .filter(|g| &g.tenant_id == tenant_id)
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(groups)
    }

    async fn update_group(
        &self,
        tenant_id: &TenantId,
        id: ProductionGroupId,
        group: &NewProductionGroup,
    ) -> Result<Option<ProductionGroup>, RepositoryError> {
        let mut state = self.lock();
        if !state
            .groups
            .get(&id)
            .is_some_and(|g| &g.tenant_id == tenant_id)
        {
            return Ok(None);
        }
        state.check_group_unique(tenant_id, group, Some(id))?;

        let Some(existing) = state.groups.get_mut(&id) else {
            return Ok(None);
        };
        existing.name.clone_from(&group.name);
        existing.description.clone_from(&group.description);
        existing.items.clone_from(&group.items);
        existing.qty_per_batch = group.qty_per_batch;
        existing.updated_by = group.acting_user.clone();
        existing.updated_at = Utc::now();

        Ok(Some(existing.clone()))
    }

    async fn delete_group(
        &self,
        tenant_id: &TenantId,
        id: ProductionGroupId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.lock();
        if !state
            .groups
            .get(&id)
            .is_some_and(|g| &g.tenant_id == tenant_id)
        {
            return Ok(false);
        }
        state.groups.remove(&id);

        Ok(true)
    }
}

#[async_trait]
impl ItemCatalog for MemoryStore {
    async fn known_items(
        &self,
        tenant_id: &TenantId,
        items: &[ItemId],
    ) -> Result<HashSet<ItemId>, RepositoryError> {
        let state = self.lock();
        Ok(items
            .iter()
            .filter(|i| state.has_item(tenant_id, i))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use prodplan_core::{BatchMeasurements, ValidationError};
    use rust_decimal_macros::dec;

    use super::*;

    fn tenant() -> TenantId {
        TenantId::parse("T1").unwrap()
    }

    fn item(id: &str) -> ItemId {
        ItemId::parse(id).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::new().with_items(&tenant(), [item("P1"), item("P2")])
    }

    fn contribution(order: &str, product: &str, quantity: rust_decimal::Decimal) -> IndentContribution {
        IndentContribution {
            tenant_id: tenant(),
            order_id: OrderId::parse(order).unwrap(),
            product_id: item(product),
            date: day(),
            quantity,
            sales_person_id: None,
        }
    }

    #[tokio::test]
    async fn test_contributions_accumulate_once_per_order() {
        let store = store();
        store
            .record_contribution(&contribution("SO-1", "P1", dec!(10)))
            .await
            .unwrap();
        store
            .record_contribution(&contribution("SO-2", "P1", dec!(15)))
            .await
            .unwrap();
        let repeat = store
            .record_contribution(&contribution("SO-1", "P1", dec!(10)))
            .await
            .unwrap();

        assert_eq!(repeat, ContributionOutcome::AlreadyCounted);
        let summary = store
            .get_summary(&SummaryKey::new(tenant(), item("P1"), day()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.total_indent, dec!(25));
    }

    #[tokio::test]
    async fn test_contribution_for_unknown_product_is_not_found() {
        let result = store()
            .record_contribution(&contribution("SO-1", "P404", dec!(1)))
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_overflowing_contribution_is_rejected_and_not_marked() {
        let store = store();
        store
            .record_contribution(&contribution("SO-1", "P1", dec!(90000000000000)))
            .await
            .unwrap();

        let result = store
            .record_contribution(&contribution("SO-2", "P1", dec!(10000000000000)))
            .await;
        assert!(matches!(
            result,
            Err(RepositoryError::Rejected(ValidationError::QuantityOverflow { .. }))
        ));

        // the order was not counted, so a corrected retry still applies
        let retry = store
            .record_contribution(&contribution("SO-2", "P1", dec!(1)))
            .await
            .unwrap();
        assert!(matches!(retry, ContributionOutcome::Applied(_)));
        let summary = store
            .get_summary(&SummaryKey::new(tenant(), item("P1"), day()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.total_indent, dec!(90000000000001));
    }

    #[tokio::test]
    async fn test_rejected_planning_update_keeps_stored_summary() {
        let store = store();
        store
            .record_contribution(&contribution("SO-1", "P1", dec!(1000)))
            .await
            .unwrap();
        let key = SummaryKey::new(tenant(), item("P1"), day());
        let before = store.get_summary(&key).await.unwrap().unwrap();

        let result = store
            .apply_planning_update(
                &key,
                &PlanningUpdate {
                    physical_stock: Some(rust_decimal::Decimal::MAX),
                    ..PlanningUpdate::default()
                },
            )
            .await;

        assert!(matches!(result, Err(RepositoryError::Rejected(_))));
        assert_eq!(store.get_summary(&key).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_planning_update_on_missing_summary_is_none() {
        let result = store()
            .apply_planning_update(
                &SummaryKey::new(tenant(), item("P1"), day()),
                &PlanningUpdate::default(),
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_product_and_pages() {
        let store = store();
        store
            .record_contribution(&contribution("SO-1", "P2", dec!(5)))
            .await
            .unwrap();
        store
            .record_contribution(&contribution("SO-1", "P1", dec!(5)))
            .await
            .unwrap();

        let all = store
            .list_summaries(&tenant(), day(), &SummaryFilter::default())
            .await
            .unwrap();
        assert_eq!(all[0].product_id.as_str(), "P1");
        assert_eq!(all[1].product_id.as_str(), "P2");

        let page = store
            .list_summaries(
                &tenant(),
                day(),
                &SummaryFilter {
                    limit: Some(1),
                    offset: Some(1),
                    ..SummaryFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].product_id.as_str(), "P2");
    }

    #[tokio::test]
    async fn test_second_batch_insert_is_absent() {
        let store = store();
        let batch = ProductionBatch::new(
            BatchKey::new(tenant(), item("P1"), BatchNumber::FIRST, day()),
            BatchMeasurements::default(),
            UserId::parse("op-1").unwrap(),
            Utc::now(),
        );

        assert!(store.insert_batch_if_absent(&batch).await.unwrap().is_some());
        assert!(store.insert_batch_if_absent(&batch).await.unwrap().is_none());
        assert_eq!(
            store
                .latest_batch_number(&tenant(), &item("P1"), day())
                .await
                .unwrap(),
            Some(BatchNumber::FIRST)
        );
    }

    #[tokio::test]
    async fn test_item_can_join_one_group_only() {
        let store = store();
        let group = |name: &str| NewProductionGroup {
            name: name.to_string(),
            description: None,
            items: vec![item("P1")],
            qty_per_batch: dec!(600),
            acting_user: UserId::parse("planner").unwrap(),
        };

        store.create_group(&tenant(), &group("A")).await.unwrap();
        let result = store.create_group(&tenant(), &group("B")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }
}
