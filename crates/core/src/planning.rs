//! Production-planning formulas for a daily summary.
//!
//! Planners write [`PlanningInputs`]; everything in [`DerivedQuantities`] is a
//! pure function of those inputs and the aggregated indent. Derived values are
//! recomputed on every write and are never accepted from a caller.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{clamp_non_negative, require_storable};

/// Decimal places the operator commits `batchAdjusted` at.
pub const FINAL_BATCH_SCALE: u32 = 2;

/// Operator-editable planning numbers for one product/day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningInputs {
    /// Finished stock already on hand.
    pub physical_stock: Decimal,
    /// Units already packed.
    pub packing: Decimal,
    /// Batches already produced or committed (may be fractional).
    pub batch_adjusted: Decimal,
    /// Nominal units per batch.
    pub qty_per_batch: Decimal,
}

/// A partial planning write. Absent fields keep their stored value.
///
/// Unknown fields, including derived ones, are ignored on deserialisation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningUpdate {
    pub physical_stock: Option<Decimal>,
    pub packing: Option<Decimal>,
    pub batch_adjusted: Option<Decimal>,
    pub qty_per_batch: Option<Decimal>,
}

impl PlanningUpdate {
    /// Whether the update carries no fields at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.physical_stock.is_none()
            && self.packing.is_none()
            && self.batch_adjusted.is_none()
            && self.qty_per_batch.is_none()
    }

    /// Clamp every present field at zero and check it can be stored.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnstorableQuantity` naming the first field
    /// that is too wide or too precise.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let check = |field, value: Option<Decimal>| {
            value
                .map(|v| require_storable(field, clamp_non_negative(v)))
                .transpose()
        };
        Ok(Self {
            physical_stock: check("physicalStock", self.physical_stock)?,
            packing: check("packing", self.packing)?,
            batch_adjusted: check("batchAdjusted", self.batch_adjusted)?,
            qty_per_batch: check("qtyPerBatch", self.qty_per_batch)?,
        })
    }
}

/// Values computed from the indent and the planning inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedQuantities {
    /// Authoritative planned batch count.
    pub production_final_batches: Decimal,
    /// Net units still to produce today.
    pub to_be_produced_day: Decimal,
    /// Whole batches needed to cover `to_be_produced_day`.
    pub to_be_produced_batches: Decimal,
    /// Units at risk because too few batches were committed.
    pub expiry_shortage: Decimal,
    /// Committed minus needed batches; negative means a deficit.
    pub balance_final_batches: Decimal,
}

impl PlanningInputs {
    /// Clamp every input at zero.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            physical_stock: clamp_non_negative(self.physical_stock),
            packing: clamp_non_negative(self.packing),
            batch_adjusted: clamp_non_negative(self.batch_adjusted),
            qty_per_batch: clamp_non_negative(self.qty_per_batch),
        }
    }

    /// Merge a partial update over these inputs, clamping the result.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnstorableQuantity` if an updated field
    /// cannot be stored; `self` is left as it was.
    pub fn merge(self, update: &PlanningUpdate) -> Result<Self, ValidationError> {
        let update = update.normalized()?;
        Ok(Self {
            physical_stock: update.physical_stock.unwrap_or(self.physical_stock),
            packing: update.packing.unwrap_or(self.packing),
            batch_adjusted: update.batch_adjusted.unwrap_or(self.batch_adjusted),
            qty_per_batch: update.qty_per_batch.unwrap_or(self.qty_per_batch),
        }
        .normalized())
    }

    /// Compute the derived planning quantities for the given indent.
    #[must_use]
    pub fn derive(&self, total_indent: Decimal) -> DerivedQuantities {
        let inputs = self.normalized();
        let total_indent = clamp_non_negative(total_indent);

        let production_final_batches = inputs
            .batch_adjusted
            .round_dp_with_strategy(FINAL_BATCH_SCALE, RoundingStrategy::MidpointAwayFromZero);

        // Overflow here can only be towards negative infinity, which clamps to zero.
        let to_be_produced_day = total_indent
            .checked_sub(inputs.physical_stock)
            .and_then(|net| net.checked_sub(inputs.packing))
            .map_or(Decimal::ZERO, clamp_non_negative);

        let to_be_produced_batches = if inputs.qty_per_batch > Decimal::ZERO {
            to_be_produced_day
                .checked_div(inputs.qty_per_batch)
                .map_or(Decimal::ZERO, |batches| batches.ceil())
        } else {
            Decimal::ZERO
        };

        let balance_final_batches =
            production_final_batches.saturating_sub(to_be_produced_batches);

        let expiry_shortage =
            clamp_non_negative(-balance_final_batches).saturating_mul(inputs.qty_per_batch);

        DerivedQuantities {
            production_final_batches,
            to_be_produced_day,
            to_be_produced_batches,
            expiry_shortage,
            balance_final_batches,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn inputs(stock: Decimal, packing: Decimal, adjusted: Decimal, qpb: Decimal) -> PlanningInputs {
        PlanningInputs {
            physical_stock: stock,
            packing,
            batch_adjusted: adjusted,
            qty_per_batch: qpb,
        }
    }

    #[test]
    fn test_end_to_end_example() {
        let derived = inputs(dec!(100), dec!(50), dec!(5), dec!(200)).derive(dec!(1000));
        assert_eq!(derived.to_be_produced_day, dec!(850));
        assert_eq!(derived.to_be_produced_batches, dec!(5));
        assert_eq!(derived.production_final_batches, dec!(5));
        assert_eq!(derived.balance_final_batches, dec!(0));
        assert_eq!(derived.expiry_shortage, dec!(0));
    }

    #[test]
    fn test_stock_exceeding_indent_never_goes_negative() {
        let derived = inputs(dec!(900), dec!(300), dec!(0), dec!(100)).derive(dec!(1000));
        assert_eq!(derived.to_be_produced_day, Decimal::ZERO);
        assert_eq!(derived.to_be_produced_batches, Decimal::ZERO);
        assert_eq!(derived.expiry_shortage, Decimal::ZERO);
    }

    #[test]
    fn test_zero_qty_per_batch_forces_zero_batches() {
        let derived = inputs(dec!(0), dec!(0), dec!(2), dec!(0)).derive(dec!(500));
        assert_eq!(derived.to_be_produced_day, dec!(500));
        assert_eq!(derived.to_be_produced_batches, Decimal::ZERO);
        assert_eq!(derived.expiry_shortage, Decimal::ZERO);
        assert_eq!(derived.balance_final_batches, dec!(2));
    }

    #[test]
    fn test_under_committed_batches_report_shortage() {
        let derived = inputs(dec!(0), dec!(0), dec!(2), dec!(200)).derive(dec!(1000));
        assert_eq!(derived.to_be_produced_batches, dec!(5));
        assert_eq!(derived.balance_final_batches, dec!(-3));
        assert_eq!(derived.expiry_shortage, dec!(600));
    }

    #[test]
    fn test_fractional_commitment_counts_against_shortage() {
        let derived = inputs(dec!(0), dec!(0), dec!(4.5), dec!(100)).derive(dec!(500));
        assert_eq!(derived.production_final_batches, dec!(4.5));
        assert_eq!(derived.expiry_shortage, dec!(50));
        assert_eq!(derived.balance_final_batches, dec!(-0.5));
    }

    #[test]
    fn test_batch_adjusted_rounds_to_committed_granularity() {
        let derived = inputs(dec!(0), dec!(0), dec!(2.345), dec!(10)).derive(dec!(0));
        assert_eq!(derived.production_final_batches, dec!(2.35));
    }

    #[test]
    fn test_negative_inputs_are_clamped() {
        let derived = inputs(dec!(-50), dec!(-10), dec!(-1), dec!(-200)).derive(dec!(100));
        assert_eq!(derived.to_be_produced_day, dec!(100));
        assert_eq!(derived.production_final_batches, Decimal::ZERO);
        assert_eq!(derived.to_be_produced_batches, Decimal::ZERO);
    }

    #[test]
    fn test_merge_keeps_absent_fields_and_clamps() {
        let base = inputs(dec!(10), dec!(20), dec!(1), dec!(200));
        let merged = base
            .merge(&PlanningUpdate {
                packing: Some(dec!(-5)),
                qty_per_batch: Some(dec!(250)),
                ..PlanningUpdate::default()
            })
            .unwrap();
        assert_eq!(merged, inputs(dec!(10), dec!(0), dec!(1), dec!(250)));
    }

    #[test]
    fn test_derive_is_idempotent() {
        let update = PlanningUpdate {
            physical_stock: Some(dec!(120)),
            packing: Some(dec!(30)),
            batch_adjusted: Some(dec!(3)),
            qty_per_batch: Some(dec!(150)),
        };
        let once = PlanningInputs::default().merge(&update).unwrap();
        let twice = once.merge(&update).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.derive(dec!(700)), twice.derive(dec!(700)));
    }

    #[test]
    fn test_update_ignores_derived_fields() {
        let update: PlanningUpdate = serde_json::from_str(
            r#"{"packing": 5, "toBeProducedDay": 9999, "expiryShortage": 1}"#,
        )
        .unwrap_or_default();
        assert_eq!(update.packing, Some(dec!(5)));
        assert!(update.physical_stock.is_none());
    }

    #[test]
    fn test_extreme_inputs_saturate_instead_of_overflowing() {
        let huge = inputs(Decimal::MAX, Decimal::MAX, Decimal::MAX, Decimal::MAX);
        let derived = huge.derive(Decimal::ZERO);
        assert_eq!(derived.to_be_produced_day, Decimal::ZERO);
        assert_eq!(derived.to_be_produced_batches, Decimal::ZERO);
        assert_eq!(derived.expiry_shortage, Decimal::ZERO);

        let derived = inputs(dec!(0), dec!(0), dec!(0), dec!(0.0001)).derive(Decimal::MAX);
        assert_eq!(derived.to_be_produced_day, Decimal::MAX);
        assert_eq!(derived.to_be_produced_batches, Decimal::ZERO);

        let derived = inputs(dec!(0), dec!(0), dec!(0), Decimal::MAX).derive(Decimal::MAX);
        assert_eq!(derived.to_be_produced_batches, dec!(1));
        assert_eq!(derived.balance_final_batches, dec!(-1));
        assert_eq!(derived.expiry_shortage, Decimal::MAX);
    }

    #[test]
    fn test_merge_rejects_unstorable_values() {
        let base = inputs(dec!(10), dec!(20), dec!(1), dec!(200));
        let too_wide = PlanningUpdate {
            physical_stock: Some(dec!(1000000000000000)),
            ..PlanningUpdate::default()
        };
        assert_eq!(
            base.merge(&too_wide),
            Err(ValidationError::UnstorableQuantity {
                field: "physicalStock",
                value: dec!(1000000000000000),
            })
        );

        let too_precise = PlanningUpdate {
            qty_per_batch: Some(dec!(0.00001)),
            ..PlanningUpdate::default()
        };
        assert!(matches!(
            base.merge(&too_precise),
            Err(ValidationError::UnstorableQuantity { field: "qtyPerBatch", .. })
        ));

        let negative_is_clamped_first = PlanningUpdate {
            packing: Some(dec!(-1000000000000000.123456)),
            ..PlanningUpdate::default()
        };
        assert_eq!(base.merge(&negative_is_clamped_first).unwrap().packing, Decimal::ZERO);
    }
}
