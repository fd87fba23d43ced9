//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    checkout, health, method_not_allowed, payments, pricing, products, purchases, uploads,
    webhooks,
};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent checkout initiations.
/// Each one holds an outbound call to the gateway open.
const CHECKOUT_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/products[?type=]` - Catalogue
/// - `GET /v1/products/:id` - One product (no file link)
/// - `GET /v1/pricing` - Active pricing plans
/// - `GET /uploads/*` - Uploaded images
///
/// ## Buyer (Bearer ID token)
/// - `GET /v1/products/:id/access` - File link of an owned product
/// - `GET /v1/purchases` - Owned product ids
/// - `GET /v1/purchases/:product_id` - Ownership of one product
///
/// ## Admin (Bearer ID token + admin marker)
/// - `GET|POST /v1/admin/products`, `PUT|DELETE /v1/admin/products/:id`
/// - `GET|POST /v1/admin/pricing`, `PUT|DELETE /v1/admin/pricing/:id`
/// - `GET /v1/admin/payments/:invoice_id` - Payment record
/// - `POST /v1/admin/uploads?filename=` - Image upload
///
/// ## Payments
/// - `POST /api/payments/initiate` - Open a hosted checkout (rate-limited)
/// - `POST /api/intasend/webhook` - IntaSend webhooks (shared password)
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;
    let upload_dir = state.config.upload_dir.clone();

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let admin_routes = Router::new()
        .route(
            "/products",
            get(products::admin_list_products).post(products::create_product),
        )
        .route(
            "/products/:id",
            put(products::update_product).delete(products::delete_product),
        )
        .route(
            "/pricing",
            get(pricing::admin_list_pricing).post(pricing::create_pricing),
        )
        .route(
            "/pricing/:id",
            put(pricing::update_pricing).delete(pricing::delete_pricing),
        )
        .route("/payments/:invoice_id", get(payments::get_payment))
        .route("/uploads", post(uploads::upload_image));

    let api_routes = Router::new()
        // Storefront
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id/access", get(products::get_product_access))
        .route("/pricing", get(pricing::list_pricing))
        // Buyer
        .route("/purchases", get(purchases::list_owned_products))
        .route("/purchases/:product_id", get(purchases::get_ownership))
        // Admin
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    let checkout_routes = Router::new()
        .route(
            "/initiate",
            post(checkout::initiate_payment).fallback(method_not_allowed),
        )
        .layer(ConcurrencyLimitLayer::new(CHECKOUT_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        .nest("/api/payments", checkout_routes)
        // Webhooks (no rate limit - controlled by the gateway)
        .route(
            "/api/intasend/webhook",
            post(webhooks::intasend_webhook).fallback(method_not_allowed),
        )
        .nest_service("/uploads", ServeDir::new(upload_dir))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
