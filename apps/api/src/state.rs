use std::sync::Arc;

use crate::config::Config;
use crate::image_client::ImageGenerator;
use crate::llm_client::TextGenerator;
use crate::screenplay::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Hosted text generation. `LlmClient` in production.
    pub llm: Arc<dyn TextGenerator>,
    /// Hosted image generation. `ImageClient` in production.
    pub images: Arc<dyn ImageGenerator>,
    pub config: Config,
    pub sessions: SessionStore,
}
