//! Production-group consolidation rules.
//!
//! Items produced together in lockstep must agree on batch size. The
//! consolidated qty/batch is the maximum reported by the members; two distinct
//! non-zero values are a validation error, never averaged.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::ItemId;

/// The qty/batch one item reports in its daily summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBatchQuantity {
    pub item_id: ItemId,
    pub qty_per_batch: Decimal,
}

impl ItemBatchQuantity {
    #[must_use]
    pub const fn new(item_id: ItemId, qty_per_batch: Decimal) -> Self {
        Self {
            item_id,
            qty_per_batch,
        }
    }
}

/// Check a member list: non-empty and free of duplicates.
///
/// # Errors
///
/// Returns `ValidationError::EmptyGroup` or `ValidationError::DuplicateGroupItem`.
pub fn validate_members(items: &[ItemId]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyGroup);
    }
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item) {
            return Err(ValidationError::DuplicateGroupItem {
                item_id: item.clone(),
            });
        }
    }
    Ok(())
}

/// Consolidate the members' reported qty/batch into one group value.
///
/// Zero means "not planned yet" and does not conflict with anything. Returns
/// zero when no member reports a value.
///
/// # Errors
///
/// Returns `ValidationError::ConflictingBatchQuantity` listing every member with
/// a non-zero value when those values differ.
pub fn consolidate_qty_per_batch(reports: &[ItemBatchQuantity]) -> Result<Decimal, ValidationError> {
    let reported: Vec<&ItemBatchQuantity> = reports
        .iter()
        .filter(|r| r.qty_per_batch > Decimal::ZERO)
        .collect();

    let Some(first) = reported.first() else {
        return Ok(Decimal::ZERO);
    };

    if reported.iter().any(|r| r.qty_per_batch != first.qty_per_batch) {
        return Err(ValidationError::ConflictingBatchQuantity {
            conflicts: reported.into_iter().cloned().collect(),
        });
    }

    Ok(reported
        .iter()
        .map(|r| r.qty_per_batch)
        .max()
        .unwrap_or(Decimal::ZERO))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn report(item: &str, qty: Decimal) -> ItemBatchQuantity {
        ItemBatchQuantity::new(ItemId::parse(item).unwrap(), qty)
    }

    #[test]
    fn test_equal_quantities_consolidate() {
        let qty = consolidate_qty_per_batch(&[report("I1", dec!(600)), report("I2", dec!(600))])
            .unwrap();
        assert_eq!(qty, dec!(600));
    }

    #[test]
    fn test_conflicting_quantities_name_both_items() {
        let err =
            consolidate_qty_per_batch(&[report("I1", dec!(600)), report("I2", dec!(321))])
                .unwrap_err();
        let ValidationError::ConflictingBatchQuantity { conflicts } = err else {
            panic!("expected conflict");
        };
        assert_eq!(
            conflicts,
            vec![report("I1", dec!(600)), report("I2", dec!(321))]
        );
    }

    #[test]
    fn test_unplanned_members_do_not_conflict() {
        let qty = consolidate_qty_per_batch(&[
            report("I1", Decimal::ZERO),
            report("I2", dec!(250)),
            report("I3", dec!(250.00)),
        ])
        .unwrap();
        assert_eq!(qty, dec!(250));
    }

    #[test]
    fn test_no_reports_is_zero() {
        assert_eq!(consolidate_qty_per_batch(&[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_validate_members() {
        let i1 = ItemId::parse("I1").unwrap();
        let i2 = ItemId::parse("I2").unwrap();
        assert!(validate_members(&[i1.clone(), i2]).is_ok());
        assert_eq!(validate_members(&[]), Err(ValidationError::EmptyGroup));
        assert_eq!(
            validate_members(&[i1.clone(), i1.clone()]),
            Err(ValidationError::DuplicateGroupItem { item_id: i1 })
        );
    }
}
