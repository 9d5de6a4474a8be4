//! Core types for production planning.
//!
//! This module provides type-safe wrappers for identifiers, statuses and quantities.

pub mod id;
pub mod quantity;
pub mod status;

pub use id::*;
pub use quantity::{
    MAX_STORED_QUANTITY, MAX_STORED_SCALE, add_to_total, clamp_non_negative, require_non_negative,
    require_positive, require_storable,
};
pub use status::*;
