//! Business logic services for the planner.
//!
//! # Services
//!
//! - `indent` - Order approval aggregation into daily summaries
//! - `daily_summary` - Planner reads and planning-input writes
//! - `production_batch` - Batch allocation, field writes and the production sheet
//! - `production_group` - Group membership and consolidated sheets

pub mod daily_summary;
pub mod indent;
pub mod production_batch;
pub mod production_group;

pub use daily_summary::{DailySummaryService, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
pub use indent::IndentAggregator;
pub use production_batch::BatchTrackingService;
pub use production_group::{ProductionGroupService, UNGROUPED_NAME};
