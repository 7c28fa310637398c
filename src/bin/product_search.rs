use anyhow::{Context, Result};

use seven_stylist::config::Config;
use seven_stylist::scraper::{FallbackSearch, ProductSearch};

// Usage: product_search [query] [limit]
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();

    let mut args = std::env::args().skip(1);
    let query = args.next().unwrap_or_else(|| "white t-shirt".to_string());
    let limit = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("limit must be a positive integer, got {raw}"))?,
        None => config.scraper.default_limit,
    };

    let search = FallbackSearch::from_config(&config.scraper, config.request_timeout())?;
    tracing::info!(strategies = ?search.strategy_names(), %query, limit, "Searching products");

    let products = search.search(&query, limit).await?;
    if products.is_empty() {
        eprintln!("No products found for '{query}'");
    }
    for product in &products {
        println!("{}", serde_json::to_string(product)?);
    }
    Ok(())
}
