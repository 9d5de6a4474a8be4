//! Indent aggregation: the single write path for daily demand.
//!
//! An approved order is split into per-product contributions for the calendar
//! day of the order. Each contribution is recorded atomically by the summary
//! store, keyed by order so a re-delivered approval never double counts. Lines
//! that cannot be aggregated are reported individually and do not affect the
//! others.

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use prodplan_core::{
    BusinessCalendar, ProductId, TenantId, ValidationError, add_to_total, require_positive,
    require_storable,
};

use crate::db::{ItemCatalog, RepositoryError, SummaryStore};
use crate::error::AppError;
use crate::models::{
    AggregationReport, AppliedLine, ContributionOutcome, CountedLine, FailedLine,
    IndentContribution, LineError, OrderApproval,
};

/// Lines of one order merged by product, in first-appearance order.
struct ProductDemand {
    product_id: ProductId,
    line_indexes: Vec<usize>,
    quantity: Decimal,
    /// Set once the merged quantity leaves the storable range.
    rejected: Option<ValidationError>,
}

/// Aggregates approved orders into daily summaries.
pub struct IndentAggregator<'a> {
    summaries: &'a dyn SummaryStore,
    catalog: &'a dyn ItemCatalog,
    calendar: BusinessCalendar,
}

impl<'a> IndentAggregator<'a> {
    #[must_use]
    pub const fn new(
        summaries: &'a dyn SummaryStore,
        catalog: &'a dyn ItemCatalog,
        calendar: BusinessCalendar,
    ) -> Self {
        Self {
            summaries,
            catalog,
            calendar,
        }
    }

    /// Aggregate one approved order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails. Invalid, unknown or
    /// out-of-range lines are reported in the returned report instead.
    #[instrument(skip(self, approval), fields(tenant = %tenant_id, order = %approval.order_id))]
    pub async fn approve(
        &self,
        tenant_id: &TenantId,
        approval: &OrderApproval,
    ) -> Result<AggregationReport, AppError> {
        let date = self.calendar.day_of(approval.order_date);
        let mut report = AggregationReport::new(approval.order_id.clone(), date);

        let demands = merge_lines(approval, &mut report);

        let products: Vec<ProductId> = demands.iter().map(|d| d.product_id.clone()).collect();
        let known = self.catalog.known_items(tenant_id, &products).await?;

        for demand in demands {
            if let Some(error) = &demand.rejected {
                reject_demand(&mut report, &demand, error);
                continue;
            }
            if !known.contains(&demand.product_id) {
                fail_demand(&mut report, &demand);
                continue;
            }

            let contribution = IndentContribution {
                tenant_id: tenant_id.clone(),
                order_id: approval.order_id.clone(),
                product_id: demand.product_id.clone(),
                date,
                quantity: demand.quantity,
                sales_person_id: approval.sales_person_id.clone(),
            };

            match self.summaries.record_contribution(&contribution).await {
                Ok(ContributionOutcome::Applied(summary)) => {
                    report.applied.push(AppliedLine {
                        line_indexes: demand.line_indexes,
                        product_id: demand.product_id,
                        quantity: demand.quantity,
                        total_indent: summary.total_indent,
                    });
                }
                Ok(ContributionOutcome::AlreadyCounted) => {
                    info!(product = %demand.product_id, "Order already counted for product");
                    report.already_counted.push(CountedLine {
                        line_indexes: demand.line_indexes,
                        product_id: demand.product_id,
                        quantity: demand.quantity,
                    });
                }
                // Removed from the catalog between the lookup and the write.
                Err(RepositoryError::NotFound) => fail_demand(&mut report, &demand),
                Err(RepositoryError::Rejected(error)) => {
                    reject_demand(&mut report, &demand, &error);
                }
                Err(e) => return Err(e.into()),
            }
        }

        report.failed.sort_by_key(|line| line.line_index);

        info!(
            date = %date,
            applied = report.applied.len(),
            already_counted = report.already_counted.len(),
            failed = report.failed.len(),
            "Aggregated order approval"
        );

        Ok(report)
    }
}

/// Validate every line and merge valid ones by product.
fn merge_lines(approval: &OrderApproval, report: &mut AggregationReport) -> Vec<ProductDemand> {
    let mut demands: Vec<ProductDemand> = Vec::new();

    for (index, line) in approval.line_items.iter().enumerate() {
        let parsed = ProductId::parse(&line.product_id)
            .map_err(|_| ValidationError::MissingField { field: "productId" })
            .and_then(|product_id| {
                require_positive("quantity", line.quantity)
                    .and_then(|q| require_storable("quantity", q))
                    .map(|q| (product_id, q))
            });

        let (product_id, quantity) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(line = index, error = %e, "Rejected order line");
                report.failed.push(FailedLine::new(
                    index,
                    line.product_id.trim(),
                    LineError::Validation(e),
                ));
                continue;
            }
        };

        if let Some(demand) = demands.iter_mut().find(|d| d.product_id == product_id) {
            demand.line_indexes.push(index);
            if demand.rejected.is_none() {
                match add_to_total("quantity", demand.quantity, quantity) {
                    Ok(total) => demand.quantity = total,
                    Err(e) => demand.rejected = Some(e),
                }
            }
        } else {
            demands.push(ProductDemand {
                product_id,
                line_indexes: vec![index],
                quantity,
                rejected: None,
            });
        }
    }

    demands
}

fn fail_demand(report: &mut AggregationReport, demand: &ProductDemand) {
    warn!(product = %demand.product_id, "Unknown product on order line");
    for &index in &demand.line_indexes {
        report.failed.push(FailedLine::new(
            index,
            demand.product_id.as_str(),
            LineError::NotFound(demand.product_id.clone()),
        ));
    }
}

/// Fail every line of a demand whose merged quantity cannot be recorded.
fn reject_demand(
    report: &mut AggregationReport,
    demand: &ProductDemand,
    error: &ValidationError,
) {
    warn!(product = %demand.product_id, error = %error, "Rejected merged order lines");
    for &index in &demand.line_indexes {
        report.failed.push(FailedLine::new(
            index,
            demand.product_id.as_str(),
            LineError::Validation(error.clone()),
        ));
    }
}
