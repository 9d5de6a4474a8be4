//! Quantity helpers shared by the planning formulas.
//!
//! All quantities (units, batches, losses) are `Decimal`. Negative planning
//! inputs are clamped to zero; negative measured values are rejected.
//! Persisted quantities are `NUMERIC(18, 4)`, so anything wider is rejected
//! before it reaches storage.

use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Decimal places a stored quantity may carry.
pub const MAX_STORED_SCALE: u32 = 4;

/// Largest magnitude a stored quantity may have (14 integer digits).
pub const MAX_STORED_QUANTITY: Decimal =
    Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 4);

/// Clamp a quantity at zero.
#[must_use]
pub fn clamp_non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Reject a negative quantity for the named field.
///
/// # Errors
///
/// Returns `ValidationError::NegativeQuantity` if `value` is below zero.
pub fn require_non_negative(field: &'static str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::NegativeQuantity { field, value });
    }
    Ok(value)
}

/// Reject a quantity that is zero or negative for the named field.
///
/// # Errors
///
/// Returns `ValidationError::NonPositiveQuantity` if `value` is not above zero.
pub fn require_positive(field: &'static str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveQuantity { field, value });
    }
    Ok(value)
}

/// Reject a quantity the storage columns cannot hold exactly.
///
/// # Errors
///
/// Returns `ValidationError::UnstorableQuantity` if `value` has more than
/// [`MAX_STORED_SCALE`] significant decimal places or exceeds
/// [`MAX_STORED_QUANTITY`] in magnitude.
pub fn require_storable(field: &'static str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value.abs() > MAX_STORED_QUANTITY || value.normalize().scale() > MAX_STORED_SCALE {
        return Err(ValidationError::UnstorableQuantity { field, value });
    }
    Ok(value)
}

/// Add `added` to a running `total`, keeping the result storable.
///
/// # Errors
///
/// Returns `ValidationError::QuantityOverflow` if the sum overflows or
/// exceeds [`MAX_STORED_QUANTITY`].
pub fn add_to_total(
    field: &'static str,
    total: Decimal,
    added: Decimal,
) -> Result<Decimal, ValidationError> {
    total
        .checked_add(added)
        .filter(|sum| sum.abs() <= MAX_STORED_QUANTITY)
        .ok_or(ValidationError::QuantityOverflow { field, added })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(clamp_non_negative(dec!(-3.5)), Decimal::ZERO);
        assert_eq!(clamp_non_negative(dec!(12)), dec!(12));
    }

    #[test]
    fn test_require_non_negative() {
        assert!(require_non_negative("productionLoss", dec!(0)).is_ok());
        assert!(require_non_negative("productionLoss", dec!(-0)).is_ok());
        assert_eq!(
            require_non_negative("productionLoss", dec!(-1)),
            Err(ValidationError::NegativeQuantity {
                field: "productionLoss",
                value: dec!(-1),
            })
        );
    }

    #[test]
    fn test_max_stored_quantity() {
        assert_eq!(MAX_STORED_QUANTITY, dec!(99999999999999.9999));
    }

    #[test]
    fn test_require_storable() {
        assert!(require_storable("quantity", dec!(99999999999999.9999)).is_ok());
        assert!(require_storable("quantity", dec!(12.5000000)).is_ok());
        assert!(require_storable("quantity", dec!(-3.25)).is_ok());
        assert_eq!(
            require_storable("quantity", dec!(1000000000000000)),
            Err(ValidationError::UnstorableQuantity {
                field: "quantity",
                value: dec!(1000000000000000),
            })
        );
        assert!(require_storable("quantity", dec!(0.00001)).is_err());
        assert!(require_storable("quantity", Decimal::MAX).is_err());
    }

    #[test]
    fn test_add_to_total() {
        assert_eq!(add_to_total("totalIndent", dec!(10), dec!(15)), Ok(dec!(25)));
        assert_eq!(
            add_to_total("totalIndent", MAX_STORED_QUANTITY, dec!(0.0001)),
            Err(ValidationError::QuantityOverflow {
                field: "totalIndent",
                added: dec!(0.0001),
            })
        );
        assert!(add_to_total("quantity", Decimal::MAX, Decimal::MAX).is_err());
    }

    #[test]
    fn test_require_positive() {
        assert!(require_positive("quantity", dec!(0.5)).is_ok());
        assert!(require_positive("quantity", Decimal::ZERO).is_err());
        assert!(require_positive("quantity", dec!(-2)).is_err());
    }
}
