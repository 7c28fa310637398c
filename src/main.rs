use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use seven_stylist::build_state;
use seven_stylist::config::Config;
use seven_stylist::server::create_router;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();
    // Missing proposer credentials are fatal at startup.
    config.validate()?;

    let bind: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {} (expected host:port)", config.server.bind))?;

    let state = build_state(&config)?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        %bind,
        openai_model = %config.openai.model,
        groq_model = %config.groq.model,
        gemini_model = %config.gemini.model,
        "Starting styling backend"
    );

    axum::serve(listener, router).await?;
    Ok(())
}
