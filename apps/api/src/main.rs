mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod pipeline;
mod records;
mod render;
mod routes;
mod sanitize;
mod scoring;
mod state;
mod storage;
mod tailoring;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::extraction::AnthropicExtractor;
use crate::llm_client::LlmClient;
use crate::pipeline::Pipeline;
use crate::records::PgRecords;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3Store;
use crate::tailoring::AnthropicTailor;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter(&config.rust_log))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Wire the pipeline behind its collaborator traits
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(S3Store::new(s3, config.s3_endpoint.clone())),
        Arc::new(PgRecords::new(db.clone())),
        Arc::new(AnthropicExtractor::new(llm.clone())),
        Arc::new(AnthropicTailor::new(llm)),
        config.s3_bucket.clone(),
        config.s3_fallback_bucket.clone(),
    ));

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        pipeline,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Default filter when `RUST_LOG` is unset. Tracing targets are rooted at
/// the binary's module path (`api`), not the package name, so the directive
/// must use the former.
fn default_log_filter(level: &str) -> String {
    format!("api={level}")
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "tailor-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer};

    struct CountingLayer(std::sync::Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for CountingLayer {
        fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_default_filter_delivers_crate_logs() {
        let delivered = std::sync::Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new(default_log_filter("info")))
            .with(CountingLayer(delivered.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("startup line");
        });

        assert!(
            delivered.load(Ordering::SeqCst) > 0,
            "default filter must match events emitted from this crate"
        );
    }

    #[test]
    fn test_default_filter_respects_level() {
        let delivered = std::sync::Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new(default_log_filter("warn")))
            .with(CountingLayer(delivered.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("too quiet to pass");
            tracing::error!("loud enough");
        });

        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }
}
