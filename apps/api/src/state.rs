use std::sync::Arc;

use sqlx::PgPool;

use crate::billing::gateway::StripeClient;
use crate::config::Config;
use crate::copilot::store::ConfigStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Copilot configuration storage. Production: `PgConfigStore` over `db`.
    pub configs: Arc<dyn ConfigStore>,
    pub billing: StripeClient,
    pub config: Config,
}
