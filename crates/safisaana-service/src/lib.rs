//! Safisaana HTTP API Service.
//!
//! This crate provides the HTTP API of the safisaana marketplace, including:
//!
//! - Hosted checkout initiation against IntaSend
//! - The IntaSend payment webhook and purchase reconciliation
//! - Ownership queries gating product downloads
//! - Admin management of products, pricing plans and images
//!
//! # Authentication
//!
//! 1. **ID tokens** - Bearer tokens from the authentication provider, verified
//!    against its JWKS. Admin routes additionally require an admin marker.
//! 2. **Webhook password** - a static shared secret IntaSend sends with each
//!    delivery.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for axum

pub mod alerts;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod intasend;
pub mod reconcile;
pub mod routes;
pub mod state;
pub mod storage;

pub use alerts::{Alert, AlertSink, TracingAlertSink};
pub use auth::{AuthError, JwksVerifier, TokenVerifier, VerifiedToken};
pub use config::{ServiceConfig, StoreBackend};
pub use error::ApiError;
pub use intasend::{CheckoutParams, CheckoutSession, GatewayError, IntaSendClient, PaymentGateway};
pub use reconcile::{Entitlement, ReconcileOutcome, Reconciler};
pub use routes::create_router;
pub use state::AppState;
pub use storage::{LocalObjectStore, ObjectStore, StorageError};
