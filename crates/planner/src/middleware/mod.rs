//! Request extractors for the planner.

pub mod tenant;

pub use tenant::{TENANT_HEADER, TenantContext, TenantRejection, USER_HEADER};
