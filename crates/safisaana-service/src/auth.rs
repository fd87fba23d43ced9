//! Authentication and extractors.
//!
//! This module provides:
//! - `TokenVerifier` - the seam to the authentication provider
//! - `JwksVerifier` - RS256 ID token validation against a JWKS endpoint
//! - `AuthUser` - a signed-in buyer (Bearer ID token)
//! - `AdminUser` - a signed-in user with an admin marker

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use safisaana_core::UserId;
use safisaana_store::Store;

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Constants
// ============================================================================

/// How long to cache JWKS keys before refreshing.
const JWKS_CACHE_DURATION: Duration = Duration::from_secs(3600); // 1 hour

/// Timeout for JWKS fetch requests.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from token verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token is malformed, expired, or signed by an unknown key.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Signing keys could not be fetched.
    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(reason) => {
                tracing::debug!(reason = %reason, "Rejected ID token");
                Self::Unauthorized
            }
            AuthError::KeyFetch(_) => {
                Self::ExternalService("Failed to fetch authentication keys".into())
            }
        }
    }
}

/// Identity carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// The user ID (token subject).
    pub user_id: UserId,
    /// Email claim, when present.
    pub email: Option<String>,
}

/// Verifies bearer tokens issued by the authentication provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a raw bearer token.
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError>;
}

// ============================================================================
// Extractors
// ============================================================================

/// An authenticated user extracted from a Bearer ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
    /// Email claim, when present.
    pub email: Option<String>,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let Some(verifier) = state.verifier.as_ref() else {
            tracing::warn!("Authentication provider not configured - rejecting request");
            return Err(ApiError::Unauthorized);
        };

        let verified = verifier.verify(token).await?;

        Ok(AuthUser {
            user_id: verified.user_id,
            email: verified.email,
        })
    }
}

/// An authenticated user holding an admin marker.
#[derive(Debug, Clone)]
pub struct AdminUser {
    /// The admin's user ID (for audit logging).
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        if !state.store.is_admin(&user.user_id).await? {
            tracing::warn!(user_id = %user.user_id, "Non-admin attempted admin access");
            return Err(ApiError::Forbidden);
        }

        tracing::info!(admin_id = %user.user_id, "Admin authenticated");

        Ok(AdminUser {
            user_id: user.user_id,
        })
    }
}

// ============================================================================
// JWKS Client and JWT Validation
// ============================================================================

/// JWT claims of a provider ID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Audience (can be string or array).
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Issuer.
    pub iss: String,
    /// Expiration time.
    pub exp: i64,
    /// Issued at.
    #[serde(default)]
    pub iat: i64,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
}

/// JWKS (JSON Web Key Set) response structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    /// List of JWK keys.
    pub keys: Vec<Jwk>,
}

/// Single JSON Web Key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA").
    pub kty: String,
    /// Key ID.
    pub kid: Option<String>,
    /// RSA public key modulus (base64url encoded).
    pub n: Option<String>,
    /// RSA public key exponent (base64url encoded).
    pub e: Option<String>,
}

/// Cached decoding keys.
struct KeyCache {
    /// Cached keys mapped by kid.
    keys: HashMap<String, DecodingKey>,
    /// Default key (for tokens without kid).
    default_key: Option<DecodingKey>,
    /// When the cache was last updated.
    last_updated: Instant,
}

impl KeyCache {
    fn empty() -> Self {
        Self {
            keys: HashMap::new(),
            default_key: None,
            // Force initial fetch
            last_updated: Instant::now()
                .checked_sub(JWKS_CACHE_DURATION)
                .unwrap_or_else(Instant::now),
        }
    }

    fn is_expired(&self) -> bool {
        self.last_updated.elapsed() >= JWKS_CACHE_DURATION
    }

    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(kid) => self.keys.get(kid).cloned(),
            None => self.default_key.clone(),
        }
    }
}

/// Validates RS256 ID tokens against a JWKS endpoint.
pub struct JwksVerifier {
    client: reqwest::Client,
    jwks_url: String,
    issuer: Option<String>,
    audience: Option<String>,
    cache: RwLock<KeyCache>,
}

impl JwksVerifier {
    /// Create a verifier. Issuer and audience are checked when given.
    pub fn new(
        jwks_url: impl Into<String>,
        issuer: Option<String>,
        audience: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            jwks_url: jwks_url.into(),
            issuer,
            audience,
            cache: RwLock::new(KeyCache::empty()),
        }
    }

    /// Get a decoding key from cache or fetch from the JWKS endpoint.
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if !cache.is_expired() {
                if let Some(key) = cache.lookup(kid) {
                    return Ok(key);
                }
            }
        }

        // Cache miss or expired - fetch JWKS
        let jwks = self.fetch_jwks().await?;

        let mut cache = self.cache.write().await;
        cache.keys.clear();
        cache.default_key = None;
        cache.last_updated = Instant::now();

        for jwk in &jwks.keys {
            if let Some(decoding_key) = jwk_to_decoding_key(jwk) {
                if let Some(ref key_kid) = jwk.kid {
                    cache.keys.insert(key_kid.clone(), decoding_key.clone());
                }
                if cache.default_key.is_none() {
                    cache.default_key = Some(decoding_key);
                }
            }
        }

        cache
            .lookup(kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown key id: {kid:?}")))
    }

    async fn fetch_jwks(&self) -> Result<Jwks, AuthError> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self.client.get(&self.jwks_url).send().await.map_err(|e| {
            tracing::error!(error = %e, url = %self.jwks_url, "Failed to fetch JWKS");
            AuthError::KeyFetch(e.to_string())
        })?;

        if !response.status().is_success() {
            tracing::error!(
                status = %response.status(),
                url = %self.jwks_url,
                "JWKS fetch returned non-success status"
            );
            return Err(AuthError::KeyFetch(format!("HTTP {}", response.status())));
        }

        let jwks: Jwks = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JWKS response");
            AuthError::KeyFetch(e.to_string())
        })?;

        tracing::info!(keys_count = %jwks.keys.len(), "JWKS fetched successfully");

        Ok(jwks)
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let decoding_key = self.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }

        let claims = decode::<JwtClaims>(token, &decoding_key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;

        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(VerifiedToken {
            user_id,
            email: claims.email,
        })
    }
}

/// Convert a JWK to a `DecodingKey`.
fn jwk_to_decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    // Only support RSA keys for now
    if jwk.kty != "RSA" {
        tracing::debug!(kty = %jwk.kty, "Skipping non-RSA JWK");
        return None;
    }

    let n = jwk.n.as_ref()?;
    let e = jwk.e.as_ref()?;

    DecodingKey::from_rsa_components(n, e).ok()
}
