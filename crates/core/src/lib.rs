//! Prodplan Core - Production planning domain library.
//!
//! This crate provides the types and rules shared by every prodplan component:
//! - `planner` - Indent aggregation, planning, batch tracking and grouping service
//! - `cli` - Command-line tools for migrations and event replay
//!
//! # Architecture
//!
//! The core crate contains only types, formulas and validation - no I/O, no
//! database access, no HTTP. Storage backends call into it so that derived
//! values are computed in exactly one place.
//!
//! # Modules
//!
//! - [`types`] - Newtype identifiers, statuses and quantity helpers
//! - [`planning`] - Daily summary planning inputs and derived quantities
//! - [`batch`] - Batch numbering and the batch state machine
//! - [`group`] - Production-group membership and qty/batch consolidation
//! - [`calendar`] - Business-day truncation
//! - [`error`] - Validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod batch;
pub mod calendar;
pub mod error;
pub mod group;
pub mod planning;
pub mod types;

pub use batch::{BATCH_LABEL_PREFIX, BatchField, BatchMeasurements, BatchNumber};
pub use calendar::BusinessCalendar;
pub use error::ValidationError;
pub use group::{ItemBatchQuantity, consolidate_qty_per_batch, validate_members};
pub use planning::{DerivedQuantities, PlanningInputs, PlanningUpdate};
pub use types::*;
