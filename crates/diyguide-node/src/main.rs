//! # DIY Guide Node
//!
//! HTTP server that collects project preferences, runs the guide pipeline
//! and serves the resulting guide.

use std::path::Path;

use axum::{
    routing::{get, post},
    Router,
};
use diyguide_pipeline::GuidePipeline;
use diyguide_providers::Providers;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

mod api;
mod config;
mod logging;
mod state;

use config::NodeConfig;
use state::AppState;

/// Run the node server.
pub async fn run_server(config: NodeConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    info!("🚀 DIY Guide Node starting...");

    let providers = Providers::connect(&config.provider_config())?;
    let pipeline = GuidePipeline::new(
        providers.search,
        providers.reasoning,
        config.pipeline_config(),
    );

    let credentials = config::credentials_from_env();
    if credentials.reasoning.is_none() || credentials.search.is_none() {
        warn!("API keys not fully configured; set them with PUT /api/v1/credentials");
    }

    let state = AppState::new(pipeline, credentials);
    let app = create_router(state);

    info!("🌐 Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router.
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health::health_check))
        .route("/api/v1/options", get(api::options::get_options))
        .route(
            "/api/v1/credentials",
            get(api::credentials::get_credentials)
                .put(api::credentials::set_credentials)
                .delete(api::credentials::clear_credentials),
        )
        .route(
            "/api/v1/guide",
            post(api::guide::generate_guide)
                .get(api::guide::get_guide)
                .delete(api::guide::delete_guide),
        )
        .route("/api/v1/guide/download", get(api::guide::download_guide))
        .route("/api/v1/status", get(api::guide::get_status))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = NodeConfig::load(Path::new(config::CONFIG_FILE))
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {}", e))?;
    logging::init_logging(&config.log_filter)?;

    run_server(config).await
}
