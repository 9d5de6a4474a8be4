//! Validation errors raised by the domain rules.
//!
//! These are caller mistakes: they carry enough detail (offending field,
//! offending items and values) for the caller to correct the request, and are
//! never retried.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::group::ItemBatchQuantity;
use crate::types::ItemId;

/// A rejected input.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ValidationError {
    /// A quantity that must be non-negative was negative.
    #[error("{field} must not be negative (got {value})")]
    NegativeQuantity {
        /// Offending field.
        field: &'static str,
        /// Rejected value.
        value: Decimal,
    },

    /// A quantity that must be positive was zero or negative.
    #[error("{field} must be greater than zero (got {value})")]
    NonPositiveQuantity {
        /// Offending field.
        field: &'static str,
        /// Rejected value.
        value: Decimal,
    },

    /// A quantity has more digits than storage can hold.
    #[error("{field} must have at most 14 integer digits and 4 decimal places (got {value})")]
    UnstorableQuantity {
        /// Offending field.
        field: &'static str,
        /// Rejected value.
        value: Decimal,
    },

    /// Adding a quantity would push a running total out of storable range.
    #[error("adding {added} would take {field} out of range")]
    QuantityOverflow {
        /// Total that would overflow.
        field: &'static str,
        /// Quantity being added.
        added: Decimal,
    },

    /// A required field was missing or blank.
    #[error("{field} is required")]
    MissingField {
        /// Offending field.
        field: &'static str,
    },

    /// A batch identifier was neither an ordinal nor a `BATNO` label.
    #[error("invalid batch identifier: {value}")]
    InvalidBatchNumber {
        /// Rejected input.
        value: String,
    },

    /// The unloading time would precede the moulding time.
    #[error("unloading time {unloading_time} is before moulding time {moulding_time}")]
    UnloadingBeforeMoulding {
        /// Recorded moulding start.
        moulding_time: DateTime<Utc>,
        /// Rejected unloading time.
        unloading_time: DateTime<Utc>,
    },

    /// A production group lists no items.
    #[error("production group must contain at least one item")]
    EmptyGroup,

    /// A production group lists the same item twice.
    #[error("item {item_id} appears more than once in the group")]
    DuplicateGroupItem {
        /// Repeated item.
        item_id: ItemId,
    },

    /// Items grouped together report different batch quantities.
    #[error("items in a production group must share qty/batch: {}", describe_conflicts(.conflicts))]
    ConflictingBatchQuantity {
        /// Every item with a non-zero qty/batch, with its value.
        conflicts: Vec<ItemBatchQuantity>,
    },
}

fn describe_conflicts(conflicts: &[ItemBatchQuantity]) -> String {
    let mut out = String::new();
    for (i, conflict) in conflicts.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}={}", conflict.item_id, conflict.qty_per_batch);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_conflict_message_names_items_and_values() {
        let err = ValidationError::ConflictingBatchQuantity {
            conflicts: vec![
                ItemBatchQuantity::new(ItemId::parse("I1").unwrap(), dec!(600)),
                ItemBatchQuantity::new(ItemId::parse("I2").unwrap(), dec!(321)),
            ],
        };
        assert_eq!(
            err.to_string(),
            "items in a production group must share qty/batch: I1=600, I2=321"
        );
    }

    #[test]
    fn test_validation_error_serializes_with_kind() {
        let err = ValidationError::NegativeQuantity {
            field: "productionLoss",
            value: dec!(-4),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "negative_quantity");
        assert_eq!(json["field"], "productionLoss");
        assert_eq!(json["value"], "-4");
    }
}
