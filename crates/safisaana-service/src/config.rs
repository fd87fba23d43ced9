//! Service configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use safisaana_core::UnknownStatePolicy;

/// Default public URL of the storefront, used for checkout redirects.
const DEFAULT_APP_URL: &str = "https://safisaana.com";

/// Which [`Store`](safisaana_store::Store) backend the binary opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Process-local, lost on restart.
    Memory,
    /// `RocksDB` under `data_dir` (feature `rocksdb-backend`).
    RocksDb,
    /// PostgreSQL at `database_url`.
    #[default]
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" | "rocks" => Ok(Self::RocksDb),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::RocksDb => "rocksdb",
            Self::Postgres => "postgres",
        })
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Storage backend (default: postgres).
    pub store_backend: StoreBackend,

    /// Path to `RocksDB` data directory (default: "/data/safisaana").
    pub data_dir: String,

    /// PostgreSQL connection string.
    pub database_url: Option<String>,

    /// Public storefront URL; checkout redirects land on `{app_url}/payment/success`.
    pub app_url: String,

    /// IntaSend publishable key.
    pub intasend_publishable_key: Option<String>,

    /// IntaSend secret key.
    pub intasend_secret_key: Option<String>,

    /// Use the IntaSend sandbox.
    pub intasend_test_mode: bool,

    /// Shared secret IntaSend sends with every webhook delivery.
    pub intasend_webhook_password: Option<String>,

    /// What to do with webhook states outside the known vocabulary.
    pub unknown_state_policy: UnknownStatePolicy,

    /// JWKS endpoint of the authentication provider.
    pub auth_jwks_url: Option<String>,

    /// Expected ID token issuer.
    pub auth_issuer: Option<String>,

    /// Expected ID token audience.
    pub auth_audience: Option<String>,

    /// Users granted the admin marker at startup.
    pub admin_user_ids: Vec<String>,

    /// Directory uploaded images are written to.
    pub upload_dir: String,

    /// URL prefix uploaded objects are served from.
    pub public_upload_base_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// IntaSend secrets file structure.
#[derive(Debug, Deserialize)]
struct IntaSendSecrets {
    publishable_key: String,
    secret_key: String,
    #[serde(default)]
    webhook_password: Option<String>,
    #[serde(default)]
    test_mode: Option<bool>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let intasend = load_intasend_secrets();
        let defaults = Self::default();

        Self {
            listen_addr: env_or("LISTEN_ADDR", defaults.listen_addr),
            store_backend: std::env::var("STORE_BACKEND")
                .ok()
                .and_then(|s| {
                    s.parse::<StoreBackend>()
                        .map_err(|e| tracing::warn!(error = %e, "Ignoring STORE_BACKEND"))
                        .ok()
                })
                .unwrap_or(defaults.store_backend),
            data_dir: env_or("DATA_DIR", defaults.data_dir),
            database_url: std::env::var("DATABASE_URL").ok(),
            app_url: env_or("APP_URL", defaults.app_url)
                .trim_end_matches('/')
                .to_string(),
            intasend_publishable_key: intasend.publishable_key,
            intasend_secret_key: intasend.secret_key,
            intasend_test_mode: intasend.test_mode,
            intasend_webhook_password: intasend.webhook_password,
            unknown_state_policy: std::env::var("UNKNOWN_STATE_POLICY")
                .ok()
                .and_then(|s| {
                    s.parse::<UnknownStatePolicy>()
                        .map_err(|e| tracing::warn!(error = %e, "Ignoring UNKNOWN_STATE_POLICY"))
                        .ok()
                })
                .unwrap_or_default(),
            auth_jwks_url: std::env::var("AUTH_JWKS_URL").ok(),
            auth_issuer: std::env::var("AUTH_ISSUER").ok(),
            auth_audience: std::env::var("AUTH_AUDIENCE").ok(),
            admin_user_ids: std::env::var("ADMIN_USER_IDS")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
            upload_dir: env_or("UPLOAD_DIR", defaults.upload_dir),
            public_upload_base_url: env_or("PUBLIC_UPLOAD_BASE_URL", defaults.public_upload_base_url),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }

    /// Checkout redirect target.
    #[must_use]
    pub fn payment_redirect_url(&self) -> String {
        format!("{}/payment/success", self.app_url)
    }
}

/// Gateway credentials after resolving the secrets file and the environment.
#[derive(Debug, Default)]
struct IntaSendSettings {
    publishable_key: Option<String>,
    secret_key: Option<String>,
    webhook_password: Option<String>,
    test_mode: bool,
}

/// Load IntaSend secrets from file or environment.
fn load_intasend_secrets() -> IntaSendSettings {
    let secret_paths = [
        ".secrets/intasend.json",
        "safisaana/.secrets/intasend.json",
        "../.secrets/intasend.json",
    ];

    let env_test_mode = std::env::var("INTASEND_TEST_MODE").is_ok_and(|v| v == "true");
    let env_webhook_password = non_empty_env("INTASEND_WEBHOOK_PASSWORD");

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<IntaSendSecrets>(path) {
            tracing::info!(path = %path, "Loaded IntaSend secrets from file");
            return IntaSendSettings {
                publishable_key: Some(secrets.publishable_key),
                secret_key: Some(secrets.secret_key),
                webhook_password: secrets.webhook_password.or(env_webhook_password),
                test_mode: secrets.test_mode.unwrap_or(env_test_mode),
            };
        }
    }

    tracing::debug!("IntaSend secrets file not found, using environment variables");
    IntaSendSettings {
        publishable_key: non_empty_env("INTASEND_PUBLISHABLE_KEY"),
        secret_key: non_empty_env("INTASEND_SECRET_KEY"),
        webhook_password: env_webhook_password,
        test_mode: env_test_mode,
    }
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            store_backend: StoreBackend::default(),
            data_dir: "/data/safisaana".into(),
            database_url: None,
            app_url: DEFAULT_APP_URL.into(),
            intasend_publishable_key: None,
            intasend_secret_key: None,
            intasend_test_mode: false,
            intasend_webhook_password: None,
            unknown_state_policy: UnknownStatePolicy::default(),
            auth_jwks_url: None,
            auth_issuer: None,
            auth_audience: None,
            admin_user_ids: Vec::new(),
            upload_dir: "/data/safisaana/uploads".into(),
            public_upload_base_url: "/uploads".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 5 * 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
