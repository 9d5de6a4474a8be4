//! CLI subcommands.

pub mod approve;
pub mod migrate;
