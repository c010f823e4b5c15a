mod applications;
mod auth;
mod billing;
mod config;
mod copilot;
mod db;
mod errors;
mod models;
mod routes;
mod state;
mod users;
mod validation;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::billing::gateway::StripeClient;
use crate::config::Config;
use crate::copilot::store::PgConfigStore;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Copilot API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url, config.database_max_connections).await?;

    // Initialize billing gateway client
    let billing = StripeClient::new(&config)?;
    info!("Billing client initialized ({})", config.stripe_api_base);

    if config.gateway_secret.is_none() {
        warn!("GATEWAY_SECRET is not set; forwarded identities are trusted as-is");
    }

    // Build app state
    let state = AppState {
        configs: Arc::new(PgConfigStore::new(db.clone())),
        db,
        billing,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the web app origin once it is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
