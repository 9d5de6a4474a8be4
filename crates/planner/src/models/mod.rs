//! Domain models for the planner.

pub mod daily_summary;
pub mod indent;
pub mod production_batch;
pub mod production_group;

pub use daily_summary::{DailySummary, SalesBreakdownEntry, SummaryFilter, SummaryKey};
pub use indent::{
    AggregationReport, AppliedLine, ContributionOutcome, CountedLine, FailedLine,
    IndentContribution, LineError, OrderApproval, OrderLine,
};
pub use production_batch::{BatchKey, ItemBatchSheet, ProductionBatch, ProductionSheet};
pub use production_group::{
    GroupInput, GroupView, NewProductionGroup, ProductionGroup, ProductionGroupSheet,
};
