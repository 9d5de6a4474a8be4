//! Batch numbering and the batch execution state machine.
//!
//! A batch is addressed either by its 1-based ordinal or by its display label
//! (`BATNO01`, `BATNO02`, ...). Status and achieved quantity are derived from
//! the recorded measurements on every change; there is no transition log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::types::{BatchStatus, clamp_non_negative, require_non_negative, require_storable};

/// Prefix of every batch display label.
pub const BATCH_LABEL_PREFIX: &str = "BATNO";

/// A 1-based batch ordinal within one (tenant, item, day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchNumber(i32);

impl BatchNumber {
    /// The default batch targeted when none is specified.
    pub const FIRST: Self = Self(1);

    /// Create a batch number from an ordinal.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidBatchNumber` for ordinals below 1.
    pub fn new(ordinal: i32) -> Result<Self, ValidationError> {
        if ordinal < 1 {
            return Err(ValidationError::InvalidBatchNumber {
                value: ordinal.to_string(),
            });
        }
        Ok(Self(ordinal))
    }

    /// Parse either an ordinal (`"2"`) or a label (`"BATNO02"`, any case).
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidBatchNumber` if the input is neither.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let digits = if trimmed.len() > BATCH_LABEL_PREFIX.len()
            && trimmed
                .get(..BATCH_LABEL_PREFIX.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(BATCH_LABEL_PREFIX))
        {
            trimmed.get(BATCH_LABEL_PREFIX.len()..).unwrap_or_default()
        } else {
            trimmed
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidBatchNumber {
                value: input.to_string(),
            });
        }

        digits
            .parse::<i32>()
            .map_err(|_| ValidationError::InvalidBatchNumber {
                value: input.to_string(),
            })
            .and_then(Self::new)
    }

    /// The ordinal value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// The display label, zero-padded to two digits.
    #[must_use]
    pub fn label(self) -> String {
        format!("{BATCH_LABEL_PREFIX}{:02}", self.0)
    }

    /// The following batch number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for BatchNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl std::fmt::Display for BatchNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for BatchNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for BatchNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Ordinal(i64),
            Label(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Ordinal(n) => i32::try_from(n)
                .map_err(|_| ValidationError::InvalidBatchNumber {
                    value: n.to_string(),
                })
                .and_then(Self::new),
            Raw::Label(label) => Self::parse(&label),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// The single-field write accepted by the batch record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum BatchField {
    /// Start of the physical batch; `null` clears it.
    MouldingTime(Option<DateTime<Utc>>),
    /// End of the physical batch; `null` clears it.
    UnloadingTime(Option<DateTime<Utc>>),
    /// Units lost during the batch.
    ProductionLoss(Decimal),
    /// Nominal units assigned to the batch.
    QtyPerBatch(Decimal),
}

impl BatchField {
    /// Wire name of the field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MouldingTime(_) => "mouldingTime",
            Self::UnloadingTime(_) => "unloadingTime",
            Self::ProductionLoss(_) => "productionLoss",
            Self::QtyPerBatch(_) => "qtyPerBatch",
        }
    }
}

/// The operator-recorded values of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMeasurements {
    pub moulding_time: Option<DateTime<Utc>>,
    pub unloading_time: Option<DateTime<Utc>>,
    pub production_loss: Decimal,
    pub qty_per_batch: Decimal,
}

impl BatchMeasurements {
    /// Fresh measurements for a new batch.
    #[must_use]
    pub fn with_qty_per_batch(qty_per_batch: Decimal) -> Self {
        Self {
            qty_per_batch: clamp_non_negative(qty_per_batch),
            ..Self::default()
        }
    }

    /// Return a copy with one field changed.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for negative or unstorable quantities, or
    /// when the result would have the batch unloaded before it was moulded.
    pub fn with_field(&self, field: &BatchField) -> Result<Self, ValidationError> {
        let mut next = *self;
        match field {
            BatchField::MouldingTime(value) => next.moulding_time = *value,
            BatchField::UnloadingTime(value) => next.unloading_time = *value,
            BatchField::ProductionLoss(value) => {
                next.production_loss = require_non_negative("productionLoss", *value)
                    .and_then(|v| require_storable("productionLoss", v))?;
            }
            BatchField::QtyPerBatch(value) => {
                next.qty_per_batch = require_non_negative("qtyPerBatch", *value)
                    .and_then(|v| require_storable("qtyPerBatch", v))?;
            }
        }

        if let (Some(moulding_time), Some(unloading_time)) = (next.moulding_time, next.unloading_time)
            && unloading_time < moulding_time
        {
            return Err(ValidationError::UnloadingBeforeMoulding {
                moulding_time,
                unloading_time,
            });
        }

        Ok(next)
    }

    /// Units actually achieved: `max(0, qtyPerBatch - productionLoss)`.
    #[must_use]
    pub fn qty_achieved(&self) -> Decimal {
        clamp_non_negative(self.qty_per_batch.saturating_sub(self.production_loss))
    }

    /// Status derived from the timestamps.
    #[must_use]
    pub const fn status(&self) -> BatchStatus {
        BatchStatus::from_timestamps(self.moulding_time.as_ref(), self.unloading_time.as_ref())
    }
}
