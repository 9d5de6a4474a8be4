//! Daily demand and planning record for one product.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use prodplan_core::{
    DerivedQuantities, PlanningInputs, PlanningUpdate, ProductId, SalesPersonId, TenantId,
    ValidationError, add_to_total,
};

/// Identity of a daily summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummaryKey {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub date: NaiveDate,
}

impl SummaryKey {
    #[must_use]
    pub const fn new(tenant_id: TenantId, product_id: ProductId, date: NaiveDate) -> Self {
        Self {
            tenant_id,
            product_id,
            date,
        }
    }
}

/// Informational per-salesperson demand split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesBreakdownEntry {
    pub sales_person_id: SalesPersonId,
    pub total_quantity: Decimal,
    pub order_count: i64,
}

/// Aggregated demand and planning quantities for one (tenant, product, day).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub date: NaiveDate,
    /// Sum of approved order quantities.
    pub total_indent: Decimal,
    /// Ordered by first contribution.
    pub sales_breakdown: Vec<SalesBreakdownEntry>,
    #[serde(flatten)]
    pub inputs: PlanningInputs,
    #[serde(flatten)]
    pub derived: DerivedQuantities,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailySummary {
    /// A summary seeded from its first indent contribution.
    #[must_use]
    pub fn seeded(key: SummaryKey, total_indent: Decimal, now: DateTime<Utc>) -> Self {
        let mut summary = Self {
            tenant_id: key.tenant_id,
            product_id: key.product_id,
            date: key.date,
            total_indent,
            sales_breakdown: Vec::new(),
            inputs: PlanningInputs::default(),
            derived: DerivedQuantities::default(),
            created_at: now,
            updated_at: now,
        };
        summary.recompute();
        summary
    }

    #[must_use]
    pub fn key(&self) -> SummaryKey {
        SummaryKey::new(self.tenant_id.clone(), self.product_id.clone(), self.date)
    }

    /// Recompute every derived field from the current inputs.
    pub fn recompute(&mut self) {
        self.derived = self.inputs.derive(self.total_indent);
    }

    /// Merge a planning write and recompute.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnstorableQuantity` without touching the
    /// summary if an updated field cannot be stored.
    pub fn apply_planning_update(
        &mut self,
        update: &PlanningUpdate,
    ) -> Result<(), ValidationError> {
        self.inputs = self.inputs.merge(update)?;
        self.recompute();
        Ok(())
    }

    /// Add one approved order line to the indent.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::QuantityOverflow` without touching the
    /// summary if the new total would not be storable.
    pub fn add_indent(
        &mut self,
        quantity: Decimal,
        sales_person_id: Option<&SalesPersonId>,
    ) -> Result<(), ValidationError> {
        self.total_indent = add_to_total("totalIndent", self.total_indent, quantity)?;
        if let Some(sales_person_id) = sales_person_id {
            record_sale(&mut self.sales_breakdown, sales_person_id, quantity);
        }
        self.recompute();
        Ok(())
    }
}

/// Fold one order's quantity into the breakdown for its sales person.
///
/// Entries are bounded by the summary's total, so they share its range.
pub fn record_sale(
    breakdown: &mut Vec<SalesBreakdownEntry>,
    sales_person_id: &SalesPersonId,
    quantity: Decimal,
) {
    if let Some(entry) = breakdown
        .iter_mut()
        .find(|e| &e.sales_person_id == sales_person_id)
    {
        entry.total_quantity = entry.total_quantity.saturating_add(quantity);
        entry.order_count += 1;
    } else {
        breakdown.push(SalesBreakdownEntry {
            sales_person_id: sales_person_id.clone(),
            total_quantity: quantity,
            order_count: 1,
        });
    }
}

/// Filter criteria for listing summaries of one day.
#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    /// Restrict to these products (empty means all).
    pub product_ids: Vec<ProductId>,
    /// Only summaries with a positive expiry shortage.
    pub shortage_only: bool,
    /// Maximum number of results (`None` means all).
    pub limit: Option<i64>,
    /// Number of results to skip.
    pub offset: Option<i64>,
}

impl SummaryFilter {
    /// All summaries for the given products.
    #[must_use]
    pub const fn for_products(product_ids: Vec<ProductId>) -> Self {
        Self {
            product_ids,
            shortage_only: false,
            limit: None,
            offset: None,
        }
    }

    /// Whether a summary passes the non-paging criteria.
    #[must_use]
    pub fn matches(&self, summary: &DailySummary) -> bool {
        (self.product_ids.is_empty() || self.product_ids.contains(&summary.product_id))
            && (!self.shortage_only || summary.derived.expiry_shortage > Decimal::ZERO)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn key() -> SummaryKey {
        SummaryKey::new(
            TenantId::parse("T1").unwrap(),
            ProductId::parse("P1").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        )
    }

    #[test]
    fn test_seeded_summary_defaults_inputs_to_zero() {
        let summary = DailySummary::seeded(key(), dec!(40), Utc::now());
        assert_eq!(summary.inputs, PlanningInputs::default());
        assert_eq!(summary.derived.to_be_produced_day, dec!(40));
        assert_eq!(summary.derived.to_be_produced_batches, Decimal::ZERO);
    }

    #[test]
    fn test_add_indent_accumulates_and_tracks_sales() {
        let alice = SalesPersonId::parse("S1").unwrap();
        let bob = SalesPersonId::parse("S2").unwrap();
        let mut summary = DailySummary::seeded(key(), Decimal::ZERO, Utc::now());

        summary.add_indent(dec!(10), Some(&alice)).unwrap();
        summary.add_indent(dec!(15), Some(&bob)).unwrap();
        summary.add_indent(dec!(5), Some(&alice)).unwrap();
        summary.add_indent(dec!(1), None).unwrap();

        assert_eq!(summary.total_indent, dec!(31));
        assert_eq!(summary.sales_breakdown.len(), 2);
        assert_eq!(summary.sales_breakdown[0].sales_person_id, alice);
        assert_eq!(summary.sales_breakdown[0].total_quantity, dec!(15));
        assert_eq!(summary.sales_breakdown[0].order_count, 2);
        assert_eq!(summary.sales_breakdown[1].order_count, 1);
    }

    #[test]
    fn test_planning_update_recomputes() {
        let mut summary = DailySummary::seeded(key(), dec!(1000), Utc::now());
        summary
            .apply_planning_update(&PlanningUpdate {
                physical_stock: Some(dec!(100)),
                packing: Some(dec!(50)),
                batch_adjusted: Some(dec!(5)),
                qty_per_batch: Some(dec!(200)),
            })
            .unwrap();
        assert_eq!(summary.derived.to_be_produced_day, dec!(850));
        assert_eq!(summary.derived.to_be_produced_batches, dec!(5));
        assert_eq!(summary.derived.balance_final_batches, Decimal::ZERO);
    }

    #[test]
    fn test_overflowing_indent_leaves_summary_unchanged() {
        let alice = SalesPersonId::parse("S1").unwrap();
        let mut summary = DailySummary::seeded(key(), Decimal::ZERO, Utc::now());
        summary.add_indent(dec!(90000000000000), Some(&alice)).unwrap();
        let before = summary.clone();

        let err = summary
            .add_indent(dec!(10000000000000), Some(&alice))
            .unwrap_err();

        assert!(matches!(
            err,
            ValidationError::QuantityOverflow { field: "totalIndent", .. }
        ));
        assert_eq!(summary, before);
    }

    #[test]
    fn test_unstorable_planning_update_leaves_summary_unchanged() {
        let mut summary = DailySummary::seeded(key(), dec!(1000), Utc::now());
        let before = summary.clone();

        let result = summary.apply_planning_update(&PlanningUpdate {
            packing: Some(Decimal::MAX),
            ..PlanningUpdate::default()
        });

        assert!(result.is_err());
        assert_eq!(summary, before);
    }

    #[test]
    fn test_serialized_view_is_flat_camel_case() {
        let summary = DailySummary::seeded(key(), dec!(12), Utc::now());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["productId"], "P1");
        assert_eq!(json["totalIndent"], "12");
        assert!(json.get("qtyPerBatch").is_some());
        assert!(json.get("expiryShortage").is_some());
        assert!(json.get("inputs").is_none());
    }
}
