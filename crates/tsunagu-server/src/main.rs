//! # tsunagu-server
//!
//! HTTP API for the Tsunagu room-based messaging engine.
//!
//! This binary provides:
//! - **Room directory**: role-scoped room listing with unread counters
//! - **Message log**: ordered retrieval and the append path (with reply
//!   detection and last-message caching)
//! - **Read reconciliation**: snapshot-based SENT -> READ transitions that
//!   never undercount against a concurrent send
//! - **Attachment storage**: size-capped uploads served back under
//!   filename-preserving public URLs
//! - **Per-identity rate limiting** to protect against abuse
//!
//! Authentication is handled upstream; requests arrive with verified
//! `x-user-id` / `x-user-role` headers.

mod api;
mod blob_store;
mod config;
mod error;
mod identity;
mod rate_limit;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tsunagu_store::Database;

use crate::api::AppState;
use crate::blob_store::BlobStore;
use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tsunagu_server=debug")),
        )
        .init();

    info!("Starting Tsunagu messaging server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Database (runs migrations on open)
    let db = Database::open_at(&config.db_path)?;

    // Attachment store (creates directory if missing)
    let blob_store = Arc::new(
        BlobStore::new(config.blob_storage_path.clone(), config.max_attachment_bytes).await?,
    );

    // Per-identity rate limiter
    let rate_limiter = RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst);

    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        blob_store,
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    let rl = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale(600.0).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    let http_addr = config.http_addr;
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
