//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use tsunagu_shared::constants::{APP_NAME, DEFAULT_HTTP_PORT, MAX_ATTACHMENT_BATCH_BYTES};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite database.
    /// Env: `DB_PATH`
    /// Default: `./data/tsunagu.db`
    pub db_path: PathBuf,

    /// Filesystem path where attachment blobs are stored.
    /// Env: `BLOB_STORAGE_PATH`
    /// Default: `./attachments`
    pub blob_storage_path: PathBuf,

    /// Base URL under which stored attachments are publicly reachable,
    /// without a trailing slash. Baked into the URLs returned by the
    /// upload endpoint.
    /// Env: `PUBLIC_BASE_URL`
    /// Default: `http://localhost:8080`
    pub public_base_url: String,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Tsunagu"`
    pub instance_name: String,

    /// Per-file attachment size ceiling in bytes. The aggregate batch
    /// ceiling is client-enforced before upload; this is the server-side
    /// backstop per uploaded file.
    pub max_attachment_bytes: usize,

    /// Sustained requests per second allowed per identity.
    /// Env: `RATE_LIMIT_PER_SEC`
    /// Default: `10`
    pub rate_limit_per_sec: f64,

    /// Burst capacity of the per-identity rate limit bucket.
    /// Env: `RATE_LIMIT_BURST`
    /// Default: `30`
    pub rate_limit_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            db_path: PathBuf::from("./data/tsunagu.db"),
            blob_storage_path: PathBuf::from("./attachments"),
            public_base_url: format!("http://localhost:{DEFAULT_HTTP_PORT}"),
            instance_name: APP_NAME.to_string(),
            max_attachment_bytes: MAX_ATTACHMENT_BATCH_BYTES,
            rate_limit_per_sec: 10.0,
            rate_limit_burst: 30.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("BLOB_STORAGE_PATH") {
            config.blob_storage_path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_PER_SEC") {
            if let Ok(n) = val.parse::<f64>() {
                config.rate_limit_per_sec = n;
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_BURST") {
            if let Ok(n) = val.parse::<f64>() {
                config.rate_limit_burst = n;
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
