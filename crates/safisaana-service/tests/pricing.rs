//! Pricing plan integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};

async fn create_plan(harness: &TestHarness, body: Value) -> Value {
    let response = harness
        .server
        .post("/v1/admin/pricing")
        .add_header("authorization", harness.admin_auth_header())
        .json(&body)
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn public_list_shows_only_active_plans() {
    let harness = TestHarness::new().await;

    let active = create_plan(
        &harness,
        json!({ "name": "Starter", "type": "product", "price": 10, "features": ["One plugin"] }),
    )
    .await;
    assert_eq!(active["active"], true);
    assert_eq!(active["popular"], false);

    create_plan(
        &harness,
        json!({ "name": "Legacy", "type": "bundle", "price": 50, "active": false, "includes": ["a", "b"] }),
    )
    .await;

    let response = harness.server.get("/v1/pricing").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Starter");

    let response = harness
        .server
        .get("/v1/admin/pricing")
        .add_header("authorization", harness.admin_auth_header())
        .await;
    let body: Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admin_updates_and_deletes_plan() {
    let harness = TestHarness::new().await;
    let plan = create_plan(
        &harness,
        json!({ "name": "Pro", "type": "bundle", "price": 99, "originalPrice": 149 }),
    )
    .await;
    let id = plan["id"].as_str().unwrap();

    let response = harness
        .server
        .put(&format!("/v1/admin/pricing/{id}"))
        .add_header("authorization", harness.admin_auth_header())
        .json(&json!({ "popular": true, "active": false }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["popular"], true);
    assert_eq!(body["name"], "Pro");

    let body: Value = harness.server.get("/v1/pricing").await.json();
    assert!(body.as_array().unwrap().is_empty());

    harness
        .server
        .delete(&format!("/v1/admin/pricing/{id}"))
        .add_header("authorization", harness.admin_auth_header())
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn invalid_plan_is_rejected() {
    let harness = TestHarness::new().await;

    harness
        .server
        .post("/v1/admin/pricing")
        .add_header("authorization", harness.admin_auth_header())
        .json(&json!({ "name": "", "type": "product", "price": 10 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn buyers_cannot_manage_plans() {
    let harness = TestHarness::new().await;

    harness
        .server
        .post("/v1/admin/pricing")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "name": "Sneaky", "type": "product", "price": 1 }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
