//! # Outreach API Server
//!
//! ## Usage
//!
//! ```bash
//! SESSION_SECRET=... SENDING_DOMAIN=mail.example.com DATABASE_URL=postgres://... \
//!     cargo run -p outreach-api
//! ```
//!
//! `STORE_BACKEND=memory` runs without a database. `LOG_FORMAT=json` switches
//! to structured log lines.

use outreach_api::{
    app::{build_router, AppState},
    config::{Config, StoreBackend},
};
use outreach_shared::{
    db::{
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
    },
    store::{MemoryStore, PgStore, Store},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing();

    tracing::info!(
        "Outreach API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let store: Arc<dyn Store> = match config.database.backend {
        StoreBackend::Postgres => {
            let url = config
                .database
                .url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

            let pool = create_pool(DatabaseConfig {
                url,
                max_connections: config.database.max_connections,
                ..DatabaseConfig::default()
            })
            .await?;
            run_migrations(&pool).await?;

            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    if config.api.production && !config.cors_allows_credentials() {
        tracing::warn!(
            "CORS_ORIGINS is `*`; cross-origin dashboards cannot send the session cookie"
        );
    }

    let addr = config.bind_address();
    let app = build_router(AppState::from_config(config, store));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "outreach_api=debug,outreach_shared=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
