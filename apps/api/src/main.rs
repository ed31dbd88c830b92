mod config;
mod document;
mod errors;
mod image_client;
mod llm_client;
mod routes;
mod screenplay;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::image_client::ImageClient;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::screenplay::session::SessionStore;
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

    info!("Starting Screenplay API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize upstream clients
    let llm = LlmClient::new(&config)?;
    info!("LLM client initialized (model: {})", llm.model());

    let images = ImageClient::new(&config)?;
    info!("Image client initialized (model: {})", images.model());

    let bounds = config.prompt_bounds();
    info!(
        "Prompt bounds: {}, {}",
        bounds.scene_rule(),
        bounds.shot_rule()
    );

    // Build app state
    let state = AppState {
        llm: Arc::new(llm),
        images: Arc::new(images),
        config: config.clone(),
        sessions: SessionStore::default(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the form front end has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
