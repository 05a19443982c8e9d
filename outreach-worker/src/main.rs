//! # Outreach Worker
//!
//! Delivers scheduled emails. Several workers may run against the same
//! database; row locks keep each email to a single attempt.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://... SENDING_DOMAIN=mail.example.com RESEND_API_KEY=re_... \
//!     cargo run -p outreach-worker
//! ```

use outreach_shared::{
    db::pool::{close_pool, create_pool, DatabaseConfig},
    provider::ResendClient,
    store::PgStore,
};
use outreach_worker::{config::WorkerConfig, dispatcher::Dispatcher};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;

    init_tracing();

    tracing::info!(
        "Outreach Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(DatabaseConfig {
        url: config.database_url.clone(),
        max_connections: config.max_connections,
        ..DatabaseConfig::default()
    })
    .await?;

    let email = Arc::new(ResendClient::new(
        &config.resend_base_url,
        &config.resend_api_key,
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?,
    ));

    let dispatcher = Dispatcher::new(Arc::new(PgStore::new(pool.clone())), email, config.dispatcher);

    let shutdown = dispatcher.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received, finishing current batch...");
        shutdown.cancel();
    });

    dispatcher.run().await;

    close_pool(pool).await;
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "outreach_worker=debug,outreach_shared=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
