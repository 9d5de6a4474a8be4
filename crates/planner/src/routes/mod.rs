//! HTTP route handlers for the planner.
//!
//! # Route Structure
//!
//! ```text
//! # Indent aggregation
//! POST   /api/indent/approvals                       - Aggregate an approved order
//!
//! # Daily summaries
//! GET    /api/daily-summaries                        - List a day's summaries
//! GET    /api/daily-summaries/{product_id}/{date}    - Get one summary
//! PATCH  /api/daily-summaries/{product_id}/{date}    - Edit planning inputs
//!
//! # Production batches (writes target today)
//! GET    /api/production-batches                     - Production sheet for a day
//! POST   /api/production-batches/today               - Get or create today's batch
//! POST   /api/production-batches/next                - Allocate the next batch
//! PATCH  /api/production-batches/field               - Record one batch field
//!
//! # Production groups
//! GET    /api/production-groups                      - List groups
//! POST   /api/production-groups                      - Create group
//! GET    /api/production-groups/{id}                 - Get group
//! PUT    /api/production-groups/{id}                 - Update group
//! DELETE /api/production-groups/{id}                 - Delete group
//! GET    /api/production-groups/sheet                - Grouped sheet for a day
//! GET    /api/production-groups/ungrouped-items      - Ungrouped sheet for a day
//! GET    /api/production-groups/ungrouped-item-group - Same data as ungrouped-items
//! ```
//!
//! Every route requires the `X-Tenant-Id` header; batch and group writes also
//! require `X-User-Id`.

pub mod daily_summaries;
pub mod indent;
pub mod production_batches;
pub mod production_groups;

use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::state::AppState;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(indent::router())
        .merge(daily_summaries::router())
        .merge(production_batches::router())
        .merge(production_groups::router())
}

/// `?date=` query shared by the sheet routes; defaults to the current business day.
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

impl DateQuery {
    #[must_use]
    pub fn date_or_today(&self, state: &AppState) -> NaiveDate {
        self.date.unwrap_or_else(|| state.calendar().today())
    }
}
