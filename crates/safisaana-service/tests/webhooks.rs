//! IntaSend webhook integration tests.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{FailingPurchaseStore, HarnessOptions, TestHarness, WEBHOOK_PASSWORD};
use safisaana_core::{InvoiceId, ProductId, PurchaseStatus, UnknownStatePolicy, UserId};
use safisaana_store::{user_owns_product, Collection, Store};
use serde_json::{json, Value};

fn payload(invoice_id: &str, state: &str) -> Value {
    json!({
        "invoice_id": invoice_id,
        "state": state,
        "value": "29.99",
        "currency": "KES",
        "account": "254712345678",
        "charges": "0.87",
        "net_amount": "29.12",
        "mpesa_reference": "QWE123RTY",
        "productId": "p1",
        "userId": "u1",
    })
}

async fn deliver(harness: &TestHarness, body: &Value) -> Value {
    let response = harness
        .server
        .post("/api/intasend/webhook")
        .add_header("x-intasend-signature", WEBHOOK_PASSWORD)
        .json(body)
        .await;
    response.assert_status_ok();
    response.json()
}

fn invoice(id: &str) -> InvoiceId {
    id.parse().unwrap()
}

fn u1() -> UserId {
    "u1".parse().unwrap()
}

fn p1() -> ProductId {
    "p1".parse().unwrap()
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn wrong_credential_is_rejected() {
    let harness = TestHarness::new().await;

    for header in ["wrong", "", "test-webhook-passwor", "TEST-WEBHOOK-PASSWORD"] {
        let response = harness
            .server
            .post("/api/intasend/webhook")
            .add_header("x-intasend-signature", header)
            .json(&payload("INV1", "COMPLETE"))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"], "Unauthorized");
    }

    assert!(harness.store.get_payment(&invoice("INV1")).await.unwrap().is_none());
}

#[tokio::test]
async fn missing_credential_is_rejected_for_any_body() {
    let harness = TestHarness::new().await;

    for body in [json!({}), json!([1, 2]), payload("INV1", "COMPLETE")] {
        harness
            .server
            .post("/api/intasend/webhook")
            .json(&body)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn authorization_header_is_accepted_as_fallback() {
    let harness = TestHarness::new().await;

    harness
        .server
        .post("/api/intasend/webhook")
        .add_header("authorization", WEBHOOK_PASSWORD)
        .json(&payload("INV1", "PENDING"))
        .await
        .assert_status_ok();

    assert!(harness.store.get_payment(&invoice("INV1")).await.unwrap().is_some());
}

#[tokio::test]
async fn empty_signature_header_falls_back_to_authorization() {
    let harness = TestHarness::new().await;

    harness
        .server
        .post("/api/intasend/webhook")
        .add_header("x-intasend-signature", "")
        .add_header("authorization", WEBHOOK_PASSWORD)
        .json(&payload("INV1", "PENDING"))
        .await
        .assert_status_ok();

    assert!(harness.store.get_payment(&invoice("INV1")).await.unwrap().is_some());
}

#[tokio::test]
async fn unconfigured_password_rejects_everything() {
    let harness = TestHarness::configured(|c| c.intasend_webhook_password = None).await;

    harness
        .server
        .post("/api/intasend/webhook")
        .add_header("x-intasend-signature", WEBHOOK_PASSWORD)
        .json(&payload("INV1", "COMPLETE"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Status buckets
// ============================================================================

#[tokio::test]
async fn success_records_payment_and_purchase() {
    let harness = TestHarness::new().await;

    for state in ["COMPLETE", "SUCCESS"] {
        let id = format!("INV-{state}");
        let body = deliver(&harness, &payload(&id, state)).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Webhook processed successfully");
        assert_eq!(body["transaction_id"], id.as_str());
        assert_eq!(body["status"], state);

        let payment = harness.store.get_payment(&invoice(&id)).await.unwrap().unwrap();
        assert_eq!(payment.status, state);
        assert_eq!(payment.mpesa_reference.as_deref(), Some("QWE123RTY"));
    }

    let purchase = harness.store.get_purchase(&u1(), &p1()).await.unwrap().unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Completed);
    assert!(user_owns_product(harness.store.as_ref(), "u1", "p1").await.unwrap());
}

#[tokio::test]
async fn pending_states_are_normalized_without_purchase() {
    let harness = TestHarness::new().await;

    for state in ["PENDING", "PROCESSING"] {
        let id = format!("INV-{state}");
        let body = deliver(&harness, &payload(&id, state)).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], state);

        let payment = harness.store.get_payment(&invoice(&id)).await.unwrap().unwrap();
        assert_eq!(payment.status, "PENDING");
    }

    assert!(harness.store.get_purchase(&u1(), &p1()).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_states_are_normalized_without_purchase() {
    let harness = TestHarness::new().await;

    for state in ["FAILED", "RETRY"] {
        let id = format!("INV-{state}");
        deliver(&harness, &payload(&id, state)).await;

        let payment = harness.store.get_payment(&invoice(&id)).await.unwrap().unwrap();
        assert_eq!(payment.status, "FAILED");
    }

    assert!(harness.store.get_purchase(&u1(), &p1()).await.unwrap().is_none());
}

#[tokio::test]
async fn identifiers_are_read_from_metadata() {
    let harness = TestHarness::new().await;

    deliver(
        &harness,
        &json!({
            "invoice_id": "INV9",
            "state": "COMPLETE",
            "value": 10,
            "metadata": { "userId": "u1", "productId": "p1", "productName": "Guide" },
        }),
    )
    .await;

    let purchase = harness.store.get_purchase(&u1(), &p1()).await.unwrap().unwrap();
    assert_eq!(purchase.product_name, "Guide");
}

#[tokio::test]
async fn identifiers_are_read_from_api_ref() {
    let harness = TestHarness::new().await;

    deliver(
        &harness,
        &json!({
            "invoice_id": "INV10",
            "state": "COMPLETE",
            "value": "29.99",
            "api_ref": "u1_p1_1700000000000",
        }),
    )
    .await;

    let purchase = harness.store.get_purchase(&u1(), &p1()).await.unwrap().unwrap();
    assert_eq!(purchase.product_name, "Product");
    assert_eq!(purchase.transaction_id.as_str(), "INV10");
}

#[tokio::test]
async fn underscore_ids_grant_only_the_purchased_pair() {
    let harness = TestHarness::new().await;

    deliver(
        &harness,
        &json!({
            "invoice_id": "INV11",
            "state": "COMPLETE",
            "value": "29.99",
            "userId": "a_b",
            "productId": "c",
        }),
    )
    .await;

    assert!(user_owns_product(harness.store.as_ref(), "a_b", "c").await.unwrap());
    assert!(!user_owns_product(harness.store.as_ref(), "a", "b_c").await.unwrap());
}

// ============================================================================
// Idempotence and ordering
// ============================================================================

#[tokio::test]
async fn duplicate_success_delivery_leaves_one_purchase() {
    let harness = TestHarness::new().await;

    deliver(&harness, &payload("INV1", "COMPLETE")).await;
    deliver(&harness, &payload("INV1", "COMPLETE")).await;

    let purchases = harness.store.list_documents(Collection::Purchases).await.unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].0, "u1_p1");

    let payments = harness.store.list_documents(Collection::Payments).await.unwrap();
    assert_eq!(payments.len(), 1);
}

#[tokio::test]
async fn later_delivery_merges_into_payment_record() {
    let harness = TestHarness::new().await;

    deliver(&harness, &payload("INV1", "PENDING")).await;
    deliver(
        &harness,
        &json!({ "invoice_id": "INV1", "state": "FAILED", "failed_reason": "Cancelled" }),
    )
    .await;

    let payment = harness.store.get_payment(&invoice("INV1")).await.unwrap().unwrap();
    assert_eq!(payment.status, "FAILED");
    assert_eq!(payment.failed_reason.as_deref(), Some("Cancelled"));
    assert_eq!(payment.mpesa_reference.as_deref(), Some("QWE123RTY"));
}

#[tokio::test]
async fn stale_pending_after_complete_keeps_purchase() {
    let harness = TestHarness::new().await;

    deliver(&harness, &payload("INV1", "COMPLETE")).await;
    deliver(&harness, &payload("INV1", "PENDING")).await;

    // Last write wins on the payment record.
    let payment = harness.store.get_payment(&invoice("INV1")).await.unwrap().unwrap();
    assert_eq!(payment.status, "PENDING");
    assert!(user_owns_product(harness.store.as_ref(), "u1", "p1").await.unwrap());
}

// ============================================================================
// Failures still answer 200
// ============================================================================

#[tokio::test]
async fn unparseable_body_answers_200_with_error() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/api/intasend/webhook")
        .add_header("x-intasend-signature", WEBHOOK_PASSWORD)
        .content_type("application/json")
        .text("{broken")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Error processing webhook");
    assert!(body["details"].is_string());
    assert_eq!(harness.alerts.kinds(), ["payment_not_recorded"]);
}

#[tokio::test]
async fn payload_without_ids_answers_200_with_error() {
    let harness = TestHarness::new().await;

    let body = deliver(&harness, &json!({ "state": "COMPLETE", "value": 5 })).await;

    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Error processing webhook");
    assert!(harness.store.list_documents(Collection::Payments).await.unwrap().is_empty());
    assert_eq!(harness.alerts.kinds(), ["payment_not_recorded"]);
}

#[tokio::test]
async fn purchase_write_failure_still_succeeds_and_alerts() {
    let harness = TestHarness::with_options(HarnessOptions {
        store: Arc::new(FailingPurchaseStore::default()),
        ..HarnessOptions::default()
    })
    .await;

    let body = deliver(&harness, &payload("INV1", "COMPLETE")).await;

    assert_eq!(body["success"], true);
    assert!(harness.store.get_payment(&invoice("INV1")).await.unwrap().is_some());
    assert!(!user_owns_product(harness.store.as_ref(), "u1", "p1").await.unwrap());
    assert_eq!(harness.alerts.kinds(), ["entitlement_not_granted"]);
}

// ============================================================================
// Unknown states
// ============================================================================

#[tokio::test]
async fn unknown_state_is_ignored_by_default() {
    let harness = TestHarness::new().await;

    let body = deliver(&harness, &payload("INV1", "REFUNDED")).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Unrecognized payment state ignored");
    assert!(harness.store.get_payment(&invoice("INV1")).await.unwrap().is_none());
    assert_eq!(harness.alerts.kinds(), ["unknown_payment_state"]);
}

#[tokio::test]
async fn states_are_case_sensitive() {
    let harness = TestHarness::new().await;

    deliver(&harness, &payload("INV1", "complete")).await;

    assert!(harness.store.get_payment(&invoice("INV1")).await.unwrap().is_none());
    assert!(harness.store.get_purchase(&u1(), &p1()).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_state_can_be_recorded() {
    let harness =
        TestHarness::configured(|c| c.unknown_state_policy = UnknownStatePolicy::RecordAsUnknown)
            .await;

    let body = deliver(&harness, &payload("INV1", "REFUNDED")).await;

    assert_eq!(body["success"], true);
    let payment = harness.store.get_payment(&invoice("INV1")).await.unwrap().unwrap();
    assert_eq!(payment.status, "REFUNDED");
    assert!(harness.store.get_purchase(&u1(), &p1()).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_state_can_be_rejected() {
    let harness =
        TestHarness::configured(|c| c.unknown_state_policy = UnknownStatePolicy::Reject).await;

    let body = deliver(&harness, &payload("INV1", "REFUNDED")).await;

    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unrecognized payment state");
    assert!(harness.store.get_payment(&invoice("INV1")).await.unwrap().is_none());
}

#[tokio::test]
async fn get_is_method_not_allowed() {
    let harness = TestHarness::new().await;

    harness
        .server
        .get("/api/intasend/webhook")
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}
