//! Integration test harness for the production planner.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory HTTP tests
//! cargo test -p prodplan-integration-tests
//!
//! # PostgreSQL round-trip tests
//! PLANNER_DATABASE_URL=postgres://... cargo test -p prodplan-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `indent_aggregation` - Order approval intake
//! - `daily_summaries` - Planning edits and derived fields
//! - `production_batches` - Batch allocation and the status machine
//! - `production_groups` - Group validation and the grouped/ungrouped sheets
//! - `postgres_stores` - Store semantics against a live database

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::str::FromStr;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use prodplan_core::{BusinessCalendar, ItemId, TenantId};
use prodplan_planner::app;
use prodplan_planner::db::MemoryStore;
use prodplan_planner::middleware::{TENANT_HEADER, USER_HEADER};
use prodplan_planner::state::AppState;
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

/// Tenant used by [`TestApp`] requests.
pub const TENANT: &str = "T1";

/// Acting user used by [`TestApp`] requests.
pub const USER: &str = "operator-1";

/// The planner router over an in-memory store.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    /// Build an app whose catalog holds `items` for [`TENANT`].
    ///
    /// # Panics
    ///
    /// Panics if an item id is blank.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn with_items(items: &[&str]) -> Self {
        let tenant = TenantId::parse(TENANT).unwrap();
        let store = MemoryStore::new().with_items(
            &tenant,
            items.iter().map(|item| ItemId::parse(item).unwrap()),
        );
        let state = AppState::in_memory(store, BusinessCalendar::utc());
        Self {
            router: app(state.clone(), Duration::from_secs(5)),
            state,
        }
    }

    /// Shared state behind the router.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Send a request as [`TENANT`]/[`USER`].
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.send_with(method, uri, body, Some(TENANT), Some(USER))
            .await
    }

    /// Send a request with explicit tenant and user headers.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    #[allow(clippy::unwrap_used)]
    pub async fn send_with(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        tenant: Option<&str>,
        user: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tenant) = tenant {
            builder = builder.header(TENANT_HEADER, tenant);
        }
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Response { status, body }
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> Response {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> Response {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.send(Method::DELETE, uri, None).await
    }

    /// Approve an order dated now with `(product, quantity)` lines.
    pub async fn approve(&self, order_id: &str, lines: &[(&str, i64)]) -> Response {
        let line_items: Vec<Value> = lines
            .iter()
            .map(|(product, quantity)| {
                serde_json::json!({ "productId": product, "quantity": quantity })
            })
            .collect();
        self.post(
            "/api/indent/approvals",
            serde_json::json!({
                "orderId": order_id,
                "orderDate": chrono::Utc::now(),
                "salesPersonId": "SP1",
                "lineItems": line_items,
            }),
        )
        .await
    }

    /// Set today's planning inputs for `product`.
    pub async fn plan(&self, product: &str, inputs: Value) -> Response {
        let today = self.state.calendar().today();
        self.patch(&format!("/api/daily-summaries/{product}/{today}"), inputs)
            .await
    }
}

/// A buffered response.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl Response {
    /// Read a decimal field (serialized as a string) at a JSON pointer.
    ///
    /// # Panics
    ///
    /// Panics if the pointer is missing or not a decimal.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn decimal(&self, pointer: &str) -> Decimal {
        decimal_at(&self.body, pointer).unwrap()
    }
}

/// Parse the decimal found at `pointer` in `value`.
#[must_use]
pub fn decimal_at(value: &Value, pointer: &str) -> Option<Decimal> {
    match value.pointer(pointer)? {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}
