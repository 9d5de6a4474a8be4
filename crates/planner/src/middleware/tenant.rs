//! Tenant and acting-user extraction.
//!
//! Tenant resolution and authentication happen upstream; the gateway forwards
//! the resolved identities as headers.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use prodplan_core::{TenantId, UserId};

use crate::error::AppError;

/// Header carrying the resolved tenant.
pub const TENANT_HEADER: &str = "x-tenant-id";
/// Header carrying the acting user.
pub const USER_HEADER: &str = "x-user-id";

/// Identities of the caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(tenant: TenantContext) -> impl IntoResponse {
///     let user = tenant.require_user()?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub user_id: Option<UserId>,
}

impl TenantContext {
    /// The acting user, required for writes that record an audit trail.
    ///
    /// # Errors
    ///
    /// Returns `TenantRejection::MissingUser` if no user header was sent.
    pub fn require_user(&self) -> Result<&UserId, TenantRejection> {
        self.user_id.as_ref().ok_or(TenantRejection::MissingUser)
    }
}

/// Error returned when the caller's identities are missing or malformed.
#[derive(Debug)]
pub enum TenantRejection {
    MissingTenant,
    MissingUser,
}

impl IntoResponse for TenantRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::MissingTenant => "missing or empty X-Tenant-Id header",
            Self::MissingUser => "missing or empty X-User-Id header",
        };
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
    }
}

impl From<TenantRejection> for AppError {
    fn from(rejection: TenantRejection) -> Self {
        match rejection {
            TenantRejection::MissingTenant => Self::Unauthorized("tenant".to_string()),
            TenantRejection::MissingUser => Self::Unauthorized("acting user".to_string()),
        }
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = TenantRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };

        let tenant_id = header(TENANT_HEADER)
            .and_then(|raw| TenantId::parse(raw).ok())
            .ok_or(TenantRejection::MissingTenant)?;
        let user_id = header(USER_HEADER).and_then(|raw| UserId::parse(raw).ok());

        Ok(Self { tenant_id, user_id })
    }
}
