use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::pipeline::Pipeline;

/// Shared application state injected into all route handlers via axum
/// extractors. The pipeline carries its own collaborators (object store,
/// record store, extraction/tailoring adapters) behind trait objects.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub pipeline: Arc<Pipeline>,
}
