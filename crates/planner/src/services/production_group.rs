//! Production group consolidation.
//!
//! Grouped items must agree on qty/batch in their daily summaries for the
//! planning day; the consolidated value is the maximum reported. The grouped
//! and ungrouped sheets are built by the same function from the same summary
//! read, so both views always agree.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use prodplan_core::{
    BusinessCalendar, ItemBatchQuantity, ItemId, ProductionGroupId, TenantId, UserId,
    ValidationError, consolidate_qty_per_batch, validate_members,
};

use crate::db::{GroupStore, ItemCatalog, SummaryStore};
use crate::error::AppError;
use crate::models::{
    DailySummary, GroupInput, GroupView, NewProductionGroup, ProductionGroup,
    ProductionGroupSheet, SummaryFilter,
};

/// Display name of single-item views on the ungrouped sheet.
pub const UNGROUPED_NAME: &str = "Ungrouped";

/// Planner access to production groups.
pub struct ProductionGroupService<'a> {
    groups: &'a dyn GroupStore,
    summaries: &'a dyn SummaryStore,
    catalog: &'a dyn ItemCatalog,
    calendar: BusinessCalendar,
}

impl<'a> ProductionGroupService<'a> {
    #[must_use]
    pub const fn new(
        groups: &'a dyn GroupStore,
        summaries: &'a dyn SummaryStore,
        catalog: &'a dyn ItemCatalog,
        calendar: BusinessCalendar,
    ) -> Self {
        Self {
            groups,
            summaries,
            catalog,
            calendar,
        }
    }

    /// Consolidated qty/batch of `items` on `date`.
    ///
    /// Items without a summary for the day report zero.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` naming every item when two members
    /// report different non-zero values.
    #[instrument(skip(self, items), fields(tenant = %tenant_id, items = items.len()))]
    pub async fn compute_group_qty_per_batch(
        &self,
        tenant_id: &TenantId,
        items: &[ItemId],
        date: NaiveDate,
    ) -> Result<Decimal, AppError> {
        let summaries = self
            .summaries
            .list_summaries(
                tenant_id,
                date,
                &SummaryFilter::for_products(items.to_vec()),
            )
            .await?;
        let by_product = index_by_product(&summaries);

        let reports: Vec<ItemBatchQuantity> = items
            .iter()
            .map(|item| {
                let qty = by_product
                    .get(item)
                    .map_or(Decimal::ZERO, |s| s.inputs.qty_per_batch);
                ItemBatchQuantity::new(item.clone(), qty)
            })
            .collect();

        Ok(consolidate_qty_per_batch(&reports)?)
    }

    /// Create a group after validating its members for today.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a blank name, an empty or duplicated
    /// member list, or conflicting qty/batch. Returns `AppError::NotFound` for
    /// unknown items and `AppError::Conflict` when the name or an item is
    /// already taken.
    #[instrument(skip(self, input, acting_user), fields(tenant = %tenant_id))]
    pub async fn create(
        &self,
        tenant_id: &TenantId,
        input: &GroupInput,
        acting_user: &UserId,
    ) -> Result<ProductionGroup, AppError> {
        let group = self.validate(tenant_id, input, acting_user).await?;
        let created = self.groups.create_group(tenant_id, &group).await?;

        info!(group_id = %created.id, name = %created.name, "Created production group");
        Ok(created)
    }

    /// Replace a group's name, description and members.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`], plus `AppError::NotFound` for a missing group.
    #[instrument(skip(self, input, acting_user), fields(tenant = %tenant_id, group_id = %id))]
    pub async fn update(
        &self,
        tenant_id: &TenantId,
        id: ProductionGroupId,
        input: &GroupInput,
        acting_user: &UserId,
    ) -> Result<ProductionGroup, AppError> {
        let group = self.validate(tenant_id, input, acting_user).await?;
        let updated = self
            .groups
            .update_group(tenant_id, id, &group)
            .await?
            .ok_or_else(|| group_not_found(id))?;

        info!(name = %updated.name, "Updated production group");
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the group does not exist.
    pub async fn get(
        &self,
        tenant_id: &TenantId,
        id: ProductionGroupId,
    ) -> Result<ProductionGroup, AppError> {
        self.groups
            .get_group(tenant_id, id)
            .await?
            .ok_or_else(|| group_not_found(id))
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, tenant_id: &TenantId) -> Result<Vec<ProductionGroup>, AppError> {
        Ok(self.groups.list_groups(tenant_id).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the group does not exist.
    #[instrument(skip(self), fields(tenant = %tenant_id))]
    pub async fn delete(&self, tenant_id: &TenantId, id: ProductionGroupId) -> Result<(), AppError> {
        if !self.groups.delete_group(tenant_id, id).await? {
            return Err(group_not_found(id));
        }
        info!(group_id = %id, "Deleted production group");
        Ok(())
    }

    /// Every group with its member summaries for `date`.
    ///
    /// A group whose members now disagree is reported with its conflicts
    /// instead of failing the sheet.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    #[instrument(skip(self), fields(tenant = %tenant_id))]
    pub async fn sheet(
        &self,
        tenant_id: &TenantId,
        date: NaiveDate,
    ) -> Result<ProductionGroupSheet, AppError> {
        let (groups, summaries) = self.read_sheet_inputs(tenant_id, date).await?;
        let by_product = index_by_product(&summaries);

        let views = groups
            .iter()
            .map(|g| build_view(Some(g.id), &g.name, &g.items, &by_product))
            .collect();

        Ok(ProductionGroupSheet {
            date,
            groups: views,
        })
    }

    /// Every item with demand on `date` that belongs to no group, each as its
    /// own single-item view.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    #[instrument(skip(self), fields(tenant = %tenant_id))]
    pub async fn list_ungrouped(
        &self,
        tenant_id: &TenantId,
        date: NaiveDate,
    ) -> Result<ProductionGroupSheet, AppError> {
        let (groups, summaries) = self.read_sheet_inputs(tenant_id, date).await?;
        let by_product = index_by_product(&summaries);
        let grouped: HashSet<&ItemId> = groups.iter().flat_map(|g| g.items.iter()).collect();

        let views = summaries
            .iter()
            .filter(|s| !grouped.contains(&s.product_id))
            .map(|s| {
                build_view(
                    None,
                    UNGROUPED_NAME,
                    std::slice::from_ref(&s.product_id),
                    &by_product,
                )
            })
            .collect();

        Ok(ProductionGroupSheet {
            date,
            groups: views,
        })
    }

    async fn read_sheet_inputs(
        &self,
        tenant_id: &TenantId,
        date: NaiveDate,
    ) -> Result<(Vec<ProductionGroup>, Vec<DailySummary>), AppError> {
        let groups = self.groups.list_groups(tenant_id).await?;
        let summaries = self
            .summaries
            .list_summaries(tenant_id, date, &SummaryFilter::default())
            .await?;
        Ok((groups, summaries))
    }

    async fn validate(
        &self,
        tenant_id: &TenantId,
        input: &GroupInput,
        acting_user: &UserId,
    ) -> Result<NewProductionGroup, AppError> {
        let name = input
            .trimmed_name()
            .ok_or(ValidationError::MissingField { field: "name" })?;
        validate_members(&input.items)?;

        let known = self.catalog.known_items(tenant_id, &input.items).await?;
        if let Some(unknown) = input.items.iter().find(|i| !known.contains(*i)) {
            return Err(AppError::NotFound(format!("item {unknown}")));
        }

        let today = self.calendar.today();
        let qty_per_batch = self
            .compute_group_qty_per_batch(tenant_id, &input.items, today)
            .await?;

        Ok(NewProductionGroup {
            name: name.to_string(),
            description: input.trimmed_description().map(str::to_string),
            items: input.items.clone(),
            qty_per_batch,
            acting_user: acting_user.clone(),
        })
    }
}

fn index_by_product(summaries: &[DailySummary]) -> HashMap<&ItemId, &DailySummary> {
    summaries.iter().map(|s| (&s.product_id, s)).collect()
}

/// Consolidated view of a set of items; shared by grouped and ungrouped sheets.
fn build_view(
    group_id: Option<ProductionGroupId>,
    name: &str,
    items: &[ItemId],
    by_product: &HashMap<&ItemId, &DailySummary>,
) -> GroupView {
    let summaries: Vec<DailySummary> = items
        .iter()
        .filter_map(|item| by_product.get(item).map(|s| (*s).clone()))
        .collect();
    let reports: Vec<ItemBatchQuantity> = summaries
        .iter()
        .map(|s| ItemBatchQuantity::new(s.product_id.clone(), s.inputs.qty_per_batch))
        .collect();

    let (qty_per_batch, conflicts) = match consolidate_qty_per_batch(&reports) {
        Ok(qty) => (Some(qty), Vec::new()),
        Err(ValidationError::ConflictingBatchQuantity { conflicts }) => {
            warn!(group = name, "Grouped items no longer share qty/batch");
            (None, conflicts)
        }
        Err(_) => (None, Vec::new()),
    };

    GroupView {
        group_id,
        name: name.to_string(),
        items: items.to_vec(),
        qty_per_batch,
        conflicts,
        summaries,
    }
}

fn group_not_found(id: ProductionGroupId) -> AppError {
    AppError::NotFound(format!("production group {id}"))
}
