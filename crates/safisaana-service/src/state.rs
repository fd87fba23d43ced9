//! Application state.

use std::sync::Arc;

use safisaana_store::Store;

use crate::alerts::{AlertSink, TracingAlertSink};
use crate::auth::{JwksVerifier, TokenVerifier};
use crate::config::ServiceConfig;
use crate::intasend::{IntaSendClient, PaymentGateway};
use crate::storage::{LocalObjectStore, ObjectStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Payment gateway (optional; checkout answers 500 without it).
    pub gateway: Option<Arc<dyn PaymentGateway>>,

    /// ID token verifier (optional; authenticated routes answer 401 without it).
    pub verifier: Option<Arc<dyn TokenVerifier>>,

    /// Operational alert destination.
    pub alerts: Arc<dyn AlertSink>,

    /// Uploaded object storage.
    pub objects: Arc<dyn ObjectStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        // Create IntaSend client if configured
        let gateway = config
            .intasend_publishable_key
            .as_ref()
            .zip(config.intasend_secret_key.as_ref())
            .map(|(pk, sk)| {
                let client = IntaSendClient::new(pk, sk, config.intasend_test_mode);
                tracing::info!(
                    base_url = %client.base_url(),
                    test_mode = %config.intasend_test_mode,
                    "IntaSend integration enabled"
                );
                Arc::new(client) as Arc<dyn PaymentGateway>
            });

        if gateway.is_none() {
            tracing::warn!("IntaSend not configured - checkout will not be available");
        }

        if config.intasend_webhook_password.is_none() {
            tracing::warn!(
                "INTASEND_WEBHOOK_PASSWORD not set - all webhook deliveries will be rejected"
            );
        }

        // Create ID token verifier if configured
        let verifier = config.auth_jwks_url.as_ref().map(|url| {
            tracing::info!(jwks_url = %url, "ID token verification enabled");
            Arc::new(JwksVerifier::new(
                url.clone(),
                config.auth_issuer.clone(),
                config.auth_audience.clone(),
            )) as Arc<dyn TokenVerifier>
        });

        if verifier.is_none() {
            tracing::warn!("AUTH_JWKS_URL not set - authenticated routes will reject every request");
        }

        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(
            config.upload_dir.clone(),
            config.public_upload_base_url.clone(),
        ));

        Self {
            store,
            config,
            gateway,
            verifier,
            alerts: Arc::new(TracingAlertSink),
            objects,
        }
    }

    /// Replace the payment gateway.
    #[must_use]
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Remove the payment gateway.
    #[must_use]
    pub fn without_gateway(mut self) -> Self {
        self.gateway = None;
        self
    }

    /// Replace the token verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Replace the alert sink.
    #[must_use]
    pub fn with_alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    /// Replace the object store.
    #[must_use]
    pub fn with_objects(mut self, objects: Arc<dyn ObjectStore>) -> Self {
        self.objects = objects;
        self
    }
}
