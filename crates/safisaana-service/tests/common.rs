//! Common test utilities for safisaana integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;

use safisaana_core::UserId;
use safisaana_service::{
    create_router, Alert, AlertSink, AppState, AuthError, CheckoutParams, CheckoutSession,
    GatewayError, PaymentGateway, ServiceConfig, TokenVerifier, VerifiedToken,
};
use safisaana_store::{Collection, MemoryStore, Result as StoreResult, Store, StoreError};

/// Webhook password the harness configures.
pub const WEBHOOK_PASSWORD: &str = "test-webhook-password";

/// Prefix of bearer tokens the static verifier accepts.
const TOKEN_PREFIX: &str = "user:";

// ============================================================================
// Fakes
// ============================================================================

/// Gateway that records every request and answers with sequential invoices.
#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<CheckoutParams>>,
    counter: AtomicUsize,
    fail_with: Option<String>,
}

impl FakeGateway {
    /// A gateway whose every call fails with an IntaSend-shaped error body.
    pub fn failing(body: &str) -> Self {
        Self {
            fail_with: Some(body.to_string()),
            ..Self::default()
        }
    }

    pub fn last_request(&self) -> Option<CheckoutParams> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, GatewayError> {
        self.requests.lock().unwrap().push(params.clone());

        if let Some(body) = &self.fail_with {
            return Err(GatewayError::Api {
                status: 400,
                body: body.clone(),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CheckoutSession {
            url: format!("https://sandbox.intasend.com/checkout/S{n}/express/"),
            invoice_id: format!("INV{n}"),
            signature: Some(format!("sig{n}")),
        })
    }
}

/// Accepts `user:<id>` tokens.
pub struct StaticVerifier;

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let user_id = token
            .strip_prefix(TOKEN_PREFIX)
            .and_then(|id| id.parse::<UserId>().ok())
            .ok_or_else(|| AuthError::InvalidToken("not a test token".into()))?;
        Ok(VerifiedToken {
            user_id,
            email: None,
        })
    }
}

/// Collects alerts for assertions.
#[derive(Default)]
pub struct RecordingAlerts(pub Mutex<Vec<Alert>>);

impl RecordingAlerts {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().iter().map(Alert::kind).collect()
    }
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn notify(&self, alert: Alert) {
        self.0.lock().unwrap().push(alert);
    }
}

/// A memory store whose purchase writes always fail.
#[derive(Default)]
pub struct FailingPurchaseStore(pub MemoryStore);

#[async_trait]
impl Store for FailingPurchaseStore {
    async fn get_document(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        self.0.get_document(collection, key).await
    }

    async fn put_document(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<()> {
        self.0.put_document(collection, key, doc).await
    }

    async fn merge_document(
        &self,
        collection: Collection,
        key: &str,
        patch: Value,
    ) -> StoreResult<Value> {
        if collection == Collection::Purchases {
            return Err(StoreError::Database("purchases unavailable".into()));
        }
        self.0.merge_document(collection, key, patch).await
    }

    async fn delete_document(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        self.0.delete_document(collection, key).await
    }

    async fn list_documents(&self, collection: Collection) -> StoreResult<Vec<(String, Value)>> {
        self.0.list_documents(collection).await
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server.
    pub store: Arc<dyn Store>,
    /// The fake gateway, when one is installed.
    pub gateway: Arc<FakeGateway>,
    /// Alerts raised while handling requests.
    pub alerts: Arc<RecordingAlerts>,
    /// Upload directory (kept alive for test duration).
    pub _upload_dir: TempDir,
    /// A buyer.
    pub test_user_id: UserId,
    /// A user with the admin marker.
    pub admin_user_id: UserId,
}

/// Harness options.
pub struct HarnessOptions {
    pub store: Arc<dyn Store>,
    pub gateway: Option<Arc<FakeGateway>>,
    pub configure: fn(&mut ServiceConfig),
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            gateway: Some(Arc::new(FakeGateway::default())),
            configure: |_| {},
        }
    }
}

impl TestHarness {
    /// Create a new test harness with a fresh in-memory store.
    pub async fn new() -> Self {
        Self::with_options(HarnessOptions::default()).await
    }

    /// Create a harness whose checkout has no gateway configured.
    pub async fn without_gateway() -> Self {
        Self::with_options(HarnessOptions {
            gateway: None,
            ..HarnessOptions::default()
        })
        .await
    }

    /// Create a harness with a specific gateway.
    pub async fn with_gateway(gateway: FakeGateway) -> Self {
        Self::with_options(HarnessOptions {
            gateway: Some(Arc::new(gateway)),
            ..HarnessOptions::default()
        })
        .await
    }

    /// Create a harness with a config tweak.
    pub async fn configured(configure: fn(&mut ServiceConfig)) -> Self {
        Self::with_options(HarnessOptions {
            configure,
            ..HarnessOptions::default()
        })
        .await
    }

    pub async fn with_options(options: HarnessOptions) -> Self {
        let upload_dir = TempDir::new().expect("Failed to create temp directory");

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            app_url: "https://shop.example".into(),
            intasend_webhook_password: Some(WEBHOOK_PASSWORD.into()),
            upload_dir: upload_dir.path().to_string_lossy().to_string(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            ..ServiceConfig::default()
        };
        (options.configure)(&mut config);

        let admin_user_id: UserId = "admin-1".parse().unwrap();
        options
            .store
            .grant_admin(&admin_user_id)
            .await
            .expect("Failed to grant admin");

        let alerts = Arc::new(RecordingAlerts::default());
        let gateway = options.gateway.clone().unwrap_or_default();

        let mut state = AppState::new(options.store.clone(), config)
            .without_gateway()
            .with_verifier(Arc::new(StaticVerifier))
            .with_alerts(alerts.clone());
        if let Some(gateway) = options.gateway {
            state = state.with_gateway(gateway);
        }

        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store: options.store,
            gateway,
            alerts,
            _upload_dir: upload_dir,
            test_user_id: "user-1".parse().unwrap(),
            admin_user_id,
        }
    }

    /// Authorization header for the test buyer.
    pub fn user_auth_header(&self) -> String {
        auth_header(&self.test_user_id)
    }

    /// Authorization header for the admin.
    pub fn admin_auth_header(&self) -> String {
        auth_header(&self.admin_user_id)
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_user_auth_header() -> String {
        format!("Bearer {TOKEN_PREFIX}someone-else")
    }
}

pub fn auth_header(user_id: &UserId) -> String {
    format!("Bearer {TOKEN_PREFIX}{user_id}")
}
