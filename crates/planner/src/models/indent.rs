//! Order approval events and the aggregation report.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use prodplan_core::{OrderId, ProductId, SalesPersonId, TenantId, ValidationError};

use super::DailySummary;

/// An order transitioning to approved.
///
/// The tenant is supplied by the request context, never by the payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderApproval {
    pub order_id: OrderId,
    pub order_date: DateTime<Utc>,
    #[serde(default)]
    pub sales_person_id: Option<SalesPersonId>,
    pub line_items: Vec<OrderLine>,
}

/// One line of an approved order, as received.
///
/// The product reference is kept raw so a blank reference fails only its own line.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    #[serde(default)]
    pub product_id: String,
    pub quantity: Decimal,
}

/// One order's demand for one product on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentContribution {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub sales_person_id: Option<SalesPersonId>,
}

/// Result of recording a contribution against the daily summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributionOutcome {
    /// The quantity was added; carries the recomputed summary.
    Applied(DailySummary),
    /// This order already contributed to the product's day; nothing changed.
    AlreadyCounted,
}

/// Why a single order line was not aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum LineError {
    #[error(transparent)]
    Validation(ValidationError),

    #[error("product {0} not found")]
    NotFound(ProductId),
}

/// Lines merged into one product contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedLine {
    pub line_indexes: Vec<usize>,
    pub product_id: ProductId,
    pub quantity: Decimal,
    /// Product's indent for the day after this contribution.
    pub total_indent: Decimal,
}

/// Lines skipped because the order already contributed to the product's day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountedLine {
    pub line_indexes: Vec<usize>,
    pub product_id: ProductId,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedLine {
    pub line_index: usize,
    pub product_id: String,
    pub message: String,
    pub error: LineError,
}

impl FailedLine {
    #[must_use]
    pub fn new(line_index: usize, product_id: impl Into<String>, error: LineError) -> Self {
        Self {
            line_index,
            product_id: product_id.into(),
            message: error.to_string(),
            error,
        }
    }
}

/// Outcome of aggregating one order approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationReport {
    pub order_id: OrderId,
    pub date: NaiveDate,
    pub applied: Vec<AppliedLine>,
    pub already_counted: Vec<CountedLine>,
    pub failed: Vec<FailedLine>,
}

impl AggregationReport {
    #[must_use]
    pub const fn new(order_id: OrderId, date: NaiveDate) -> Self {
        Self {
            order_id,
            date,
            applied: Vec::new(),
            already_counted: Vec::new(),
            failed: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}
