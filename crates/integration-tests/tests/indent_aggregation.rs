//! Order approval intake over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use prodplan_integration_tests::{TestApp, USER, decimal_at};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn test_two_orders_accumulate_into_one_summary() {
    let app = TestApp::with_items(&["I1"]);

    let first = app.approve("SO-1", &[("I1", 10)]).await;
    assert_eq!(first.status, StatusCode::OK);
    let second = app.approve("SO-2", &[("I1", 15)]).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.decimal("/applied/0/totalIndent"), dec!(25));

    let list = app.get("/api/daily-summaries?product_id=I1").await;
    assert_eq!(list.status, StatusCode::OK);
    let summaries = list.body.as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(decimal_at(&list.body, "/0/totalIndent"), Some(dec!(25)));

    let breakdown = &list.body[0]["salesBreakdown"];
    assert_eq!(breakdown[0]["salesPersonId"], "SP1");
    assert_eq!(breakdown[0]["orderCount"], 2);
}

#[tokio::test]
async fn test_reapproval_is_reported_as_already_counted() {
    let app = TestApp::with_items(&["I1"]);

    app.approve("SO-1", &[("I1", 10)]).await;
    let again = app.approve("SO-1", &[("I1", 10)]).await;

    assert_eq!(again.status, StatusCode::OK);
    assert!(again.body["applied"].as_array().unwrap().is_empty());
    assert_eq!(again.body["alreadyCounted"][0]["productId"], "I1");

    let list = app.get("/api/daily-summaries").await;
    assert_eq!(decimal_at(&list.body, "/0/totalIndent"), Some(dec!(10)));
}

#[tokio::test]
async fn test_bad_lines_fail_without_blocking_good_ones() {
    let app = TestApp::with_items(&["I1", "I2"]);

    let report = app
        .approve("SO-1", &[("I1", 5), ("GHOST", 3), ("I2", -2), ("I2", 4)])
        .await;

    assert_eq!(report.status, StatusCode::OK);
    let applied = report.body["applied"].as_array().unwrap();
    assert_eq!(applied.len(), 2);

    let failed = report.body["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0]["lineIndex"], 1);
    assert_eq!(failed[0]["error"]["kind"], "not_found");
    assert_eq!(failed[1]["lineIndex"], 2);
    assert_eq!(failed[1]["error"]["kind"], "validation");

    let list = app.get("/api/daily-summaries").await;
    let products: Vec<&str> = list
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["productId"].as_str().unwrap())
        .collect();
    assert_eq!(products, ["I1", "I2"]);
    assert_eq!(decimal_at(&list.body, "/1/totalIndent"), Some(dec!(4)));
}

#[tokio::test]
async fn test_repeated_product_lines_merge() {
    let app = TestApp::with_items(&["I1"]);

    let report = app.approve("SO-1", &[("I1", 4), ("I1", 6)]).await;

    assert_eq!(report.body["applied"][0]["lineIndexes"], json!([0, 1]));
    assert_eq!(report.decimal("/applied/0/quantity"), dec!(10));
}

#[tokio::test]
async fn test_merged_lines_exceeding_range_fail_alone() {
    let app = TestApp::with_items(&["I1", "I2"]);

    let report = app
        .post(
            "/api/indent/approvals",
            json!({
                "orderId": "SO-1",
                "orderDate": chrono::Utc::now(),
                "lineItems": [
                    { "productId": "I1", "quantity": "50000000000000000000000000000" },
                    { "productId": "I1", "quantity": "50000000000000000000000000000" },
                    { "productId": "I2", "quantity": "60000000000000" },
                    { "productId": "I2", "quantity": "60000000000000" },
                    { "productId": "I1", "quantity": "7" },
                ],
            }),
        )
        .await;

    assert_eq!(report.status, StatusCode::OK);
    let failed = report.body["failed"].as_array().unwrap();
    let kinds: Vec<(u64, &str)> = failed
        .iter()
        .map(|f| {
            (
                f["lineIndex"].as_u64().unwrap(),
                f["error"]["details"]["kind"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        kinds,
        [
            (0, "unstorable_quantity"),
            (1, "unstorable_quantity"),
            (2, "quantity_overflow"),
            (3, "quantity_overflow"),
        ]
    );

    assert_eq!(report.body["applied"][0]["productId"], "I1");
    assert_eq!(report.body["applied"][0]["lineIndexes"], json!([4]));
    assert_eq!(report.decimal("/applied/0/totalIndent"), dec!(7));

    let list = app.get("/api/daily-summaries").await;
    assert_eq!(list.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_overly_precise_quantity_is_a_line_failure() {
    let app = TestApp::with_items(&["I1", "I2"]);

    let report = app
        .post(
            "/api/indent/approvals",
            json!({
                "orderId": "SO-1",
                "orderDate": chrono::Utc::now(),
                "lineItems": [
                    { "productId": "I1", "quantity": "0.00001" },
                    { "productId": "I2", "quantity": "2.5" },
                ],
            }),
        )
        .await;

    assert_eq!(report.status, StatusCode::OK);
    assert_eq!(report.body["failed"][0]["lineIndex"], 0);
    assert_eq!(
        report.body["failed"][0]["error"]["details"]["field"],
        "quantity"
    );
    assert_eq!(report.body["applied"][0]["productId"], "I2");
}

#[tokio::test]
async fn test_total_indent_overflow_rejects_only_the_new_order() {
    let app = TestApp::with_items(&["I1"]);
    let big = |order: &str| {
        json!({
            "orderId": order,
            "orderDate": chrono::Utc::now(),
            "lineItems": [{ "productId": "I1", "quantity": "60000000000000" }],
        })
    };

    let first = app.post("/api/indent/approvals", big("SO-1")).await;
    assert_eq!(first.body["applied"].as_array().unwrap().len(), 1);

    let second = app.post("/api/indent/approvals", big("SO-2")).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(
        second.body["failed"][0]["error"]["details"]["kind"],
        "quantity_overflow"
    );

    let list = app.get("/api/daily-summaries").await;
    assert_eq!(
        decimal_at(&list.body, "/0/totalIndent"),
        Some(dec!(60000000000000))
    );

    // SO-2 was never counted, so a smaller resubmission under that id applies.
    let retry = app.approve("SO-2", &[("I1", 1)]).await;
    assert_eq!(retry.body["applied"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_new_summary_starts_with_zero_planning_inputs() {
    let app = TestApp::with_items(&["I1"]);

    app.approve("SO-1", &[("I1", 40)]).await;
    let list = app.get("/api/daily-summaries").await;

    assert_eq!(decimal_at(&list.body, "/0/physicalStock"), Some(dec!(0)));
    assert_eq!(decimal_at(&list.body, "/0/qtyPerBatch"), Some(dec!(0)));
    assert_eq!(decimal_at(&list.body, "/0/toBeProducedDay"), Some(dec!(40)));
    assert_eq!(decimal_at(&list.body, "/0/toBeProducedBatches"), Some(dec!(0)));
}

#[tokio::test]
async fn test_approval_requires_tenant_header() {
    let app = TestApp::with_items(&["I1"]);

    let response = app
        .send_with(
            Method::POST,
            "/api/indent/approvals",
            Some(json!({
                "orderId": "SO-1",
                "orderDate": "2026-03-01T08:00:00Z",
                "lineItems": [{ "productId": "I1", "quantity": 1 }],
            })),
            None,
            Some(USER),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let app = TestApp::with_items(&["I1"]);
    app.approve("SO-1", &[("I1", 10)]).await;

    let other = app
        .send_with(
            Method::GET,
            "/api/daily-summaries",
            None,
            Some("T2"),
            None,
        )
        .await;

    assert_eq!(other.status, StatusCode::OK);
    assert!(other.body.as_array().unwrap().is_empty());
}
