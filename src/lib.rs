pub mod config;
pub mod error;
pub mod gemini;
pub mod intent;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod proposer;
pub mod retry;
pub mod scraper;
pub mod server;
pub mod transport;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::gemini::GeminiClient;
use crate::intent::GeminiIntent;
use crate::pipeline::StylePipeline;
use crate::proposer::{GroqProposer, OpenAiProposer};
use crate::retry::RetryPolicy;
use crate::scraper::FallbackSearch;
use crate::server::AppState;
use crate::transport::{GroqTransport, Transport};

/// Build the long-lived provider handles once and wire them into the app.
pub fn build_state(cfg: &Config) -> Result<AppState> {
    let timeout = cfg.request_timeout();
    let retry = RetryPolicy::new(cfg.providers.max_attempts);

    let gemini = Arc::new(GeminiClient::new(
        cfg.gemini.api_key.clone(),
        cfg.gemini.base_url.clone(),
        timeout,
        retry,
    )?);
    let intent = Arc::new(GeminiIntent::new(gemini, cfg.gemini.model.clone()));

    let openai = Arc::new(OpenAiProposer::new(
        cfg.openai.api_key.clone(),
        cfg.openai.model.clone(),
        timeout,
        cfg.providers.max_attempts,
    )?);

    let transport = Arc::new(GroqTransport::new(
        cfg.groq.api_key.clone(),
        cfg.groq.base_url.clone(),
        timeout,
        retry,
    )?);
    let groq = Arc::new(GroqProposer::new(
        transport as Arc<dyn Transport>,
        cfg.groq.model.clone(),
    ));

    let pipeline = StylePipeline::new(intent, openai, groq)
        .with_intent_as_merge_fallback(cfg.pipeline.intent_as_merge_fallback);

    let products = FallbackSearch::from_config(&cfg.scraper, timeout)?;

    Ok(AppState {
        pipeline: Arc::new(pipeline),
        products: Arc::new(products),
        default_limit: cfg.scraper.default_limit,
    })
}
