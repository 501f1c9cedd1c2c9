use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::analyze;
use crate::engine::RecommendationEngine;
use crate::ingest::types::{Article, NewsProvider};
use crate::recommendation::{MarketOverview, Recommendation};

const MAX_SYMBOL_LEN: usize = 10;
const DEFAULT_SYMBOL_NEWS_LIMIT: usize = 10;
const DEFAULT_MARKET_NEWS_LIMIT: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub news: Arc<dyn NewsProvider>,
    /// Symbols covered by the market overview, in display order.
    pub watchlist: Arc<Vec<String>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/news", get(market_news))
        .route("/api/news/general/market", get(general_market_news))
        .route("/api/news/{symbol}", get(symbol_news))
        .route("/api/sentiment/general/market", get(general_market_sentiment))
        .route("/api/sentiment/{symbol}", get(symbol_sentiment))
        .route("/api/sentiment/{symbol}/summary", get(symbol_sentiment_summary))
        .route("/api/recommendations/market/overview", get(market_overview))
        .route("/api/recommendations/{symbol}", get(recommendation))
        .route("/api/recommendations/{symbol}/summary", get(recommendation_summary))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    InvalidSymbol(String),
    NoNews { symbol: Option<String> },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidSymbol(symbol) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid stock symbol", "symbol": symbol })),
            )
                .into_response(),
            ApiError::NoNews { symbol: Some(symbol) } => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "No news found for the specified symbol", "symbol": symbol })),
            )
                .into_response(),
            ApiError::NoNews { symbol: None } => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "No market news found" })),
            )
                .into_response(),
        }
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

/// 1..=10 chars from `[A-Za-z0-9.-]`; returned uppercased.
pub fn validate_symbol(raw: &str) -> Result<String, ApiError> {
    let ok = !raw.is_empty()
        && raw.len() <= MAX_SYMBOL_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if ok {
        Ok(raw.to_ascii_uppercase())
    } else {
        Err(ApiError::InvalidSymbol(raw.to_string()))
    }
}

/// Provider errors degrade to an empty batch.
async fn fetch_or_empty(news: &dyn NewsProvider, symbol: Option<&str>) -> Vec<Article> {
    match news.fetch(symbol).await {
        Ok(v) => v,
        Err(e) => {
            warn!(error = ?e, symbol = ?symbol, provider = news.name(), "news fetch failed");
            Vec::new()
        }
    }
}

fn newest_first(mut articles: Vec<Article>, limit: usize) -> Vec<Article> {
    articles.sort_by(|a, b| b.datetime.cmp(&a.datetime));
    articles.truncate(limit);
    articles
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "Market Sentiment API is running" }))
}

async fn symbol_news(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(q): Query<LimitQuery>,
) -> ApiResult {
    let symbol = validate_symbol(&symbol)?;
    let news = fetch_or_empty(state.news.as_ref(), Some(symbol.as_str())).await;
    if news.is_empty() {
        return Err(ApiError::NoNews {
            symbol: Some(symbol),
        });
    }
    let news = newest_first(news, q.limit.unwrap_or(DEFAULT_SYMBOL_NEWS_LIMIT));
    Ok(Json(json!({
        "symbol": symbol,
        "count": news.len(),
        "news": news,
        "lastUpdated": Utc::now(),
    })))
}

async fn market_news(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> Json<Value> {
    let news = fetch_or_empty(state.news.as_ref(), None).await;
    let news = newest_first(news, q.limit.unwrap_or(DEFAULT_MARKET_NEWS_LIMIT));
    Json(json!({
        "count": news.len(),
        "news": news,
        "lastUpdated": Utc::now(),
    }))
}

async fn general_market_news(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<Value> {
    let news = fetch_or_empty(state.news.as_ref(), None).await;
    let news = newest_first(news, q.limit.unwrap_or(DEFAULT_MARKET_NEWS_LIMIT));
    Json(json!({
        "market": "General",
        "count": news.len(),
        "news": news,
        "lastUpdated": Utc::now(),
    }))
}

async fn symbol_sentiment(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    let symbol = validate_symbol(&symbol)?;
    let news = fetch_or_empty(state.news.as_ref(), Some(symbol.as_str())).await;
    if news.is_empty() {
        return Err(ApiError::NoNews {
            symbol: Some(symbol),
        });
    }
    let annotated = state.engine.annotate(news);
    let overall = analyze::aggregate(&annotated);
    Ok(Json(json!({
        "symbol": symbol,
        "overallSentiment": overall,
        "newsCount": annotated.len(),
        "news": annotated,
        "lastUpdated": Utc::now(),
    })))
}

async fn symbol_sentiment_summary(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult {
    let symbol = validate_symbol(&symbol)?;
    let news = fetch_or_empty(state.news.as_ref(), Some(symbol.as_str())).await;
    if news.is_empty() {
        return Err(ApiError::NoNews {
            symbol: Some(symbol),
        });
    }
    let annotated = state.engine.annotate(news);
    let overall = analyze::aggregate(&annotated);
    Ok(Json(json!({
        "symbol": symbol,
        "overallSentiment": overall,
        "newsCount": annotated.len(),
        "lastUpdated": Utc::now(),
    })))
}

async fn general_market_sentiment(State(state): State<AppState>) -> ApiResult {
    let news = fetch_or_empty(state.news.as_ref(), None).await;
    if news.is_empty() {
        return Err(ApiError::NoNews { symbol: None });
    }
    let annotated = state.engine.annotate(news);
    let overall = analyze::aggregate(&annotated);
    Ok(Json(json!({
        "market": "General",
        "overallSentiment": overall,
        "newsCount": annotated.len(),
        "news": annotated,
        "lastUpdated": Utc::now(),
    })))
}

async fn recommendation(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Recommendation>, ApiError> {
    let symbol = validate_symbol(&symbol)?;
    let news = fetch_or_empty(state.news.as_ref(), Some(symbol.as_str())).await;
    Ok(Json(state.engine.recommend(&symbol, news).await))
}

async fn recommendation_summary(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult {
    let symbol = validate_symbol(&symbol)?;
    let news = fetch_or_empty(state.news.as_ref(), Some(symbol.as_str())).await;
    let rec = state.engine.recommend(&symbol, news).await;
    Ok(Json(json!({
        "symbol": rec.symbol,
        "recommendation": rec.recommendation,
        "confidence": rec.confidence,
        "llmOpinion": rec.llm_opinion,
        "lastUpdated": rec.last_updated,
    })))
}

async fn market_overview(State(state): State<AppState>) -> Json<MarketOverview> {
    let overview = state
        .engine
        .market_overview(Arc::clone(&state.news), &state.watchlist)
        .await;
    Json(overview)
}
