use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{ResponseRecord, StyleRequest};
use crate::pipeline::StylePipeline;
use crate::scraper::ProductSearch;

const DEFAULT_PRODUCT_QUERY: &str = "white t-shirt";
const MAX_PRODUCT_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<StylePipeline>,
    pub products: Arc<dyn ProductSearch>,
    pub default_limit: usize,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(|| async { "ok" }))
        .route("/style", post(style))
        .route("/products", get(products))
        .with_state(state)
}

async fn home() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "SÉVEN Backend Running" }))
}

async fn style(
    State(state): State<AppState>,
    Json(request): Json<StyleRequest>,
) -> Result<Json<ResponseRecord>, ApiError> {
    match state.pipeline.handle(&request.text).await {
        Ok(response) => Ok(Json(response)),
        // Already logged with its request id by the pipeline.
        Err(_) => Err(ApiError::Styling),
    }
}

#[derive(Debug, Deserialize)]
struct ProductQuery {
    q: Option<String>,
    limit: Option<usize>,
}

async fn products(
    State(state): State<AppState>,
    Query(params): Query<ProductQuery>,
) -> impl IntoResponse {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PRODUCT_QUERY.to_string());
    let limit = params
        .limit
        .unwrap_or(state.default_limit)
        .clamp(1, MAX_PRODUCT_LIMIT);

    let products = match state.products.search(&query, limit).await {
        Ok(products) => products,
        Err(e) => {
            tracing::error!(query = %query, "Product search error: {}", e);
            Vec::new()
        }
    };

    Json(serde_json::json!({
        "query": query,
        "products": products,
    }))
}
