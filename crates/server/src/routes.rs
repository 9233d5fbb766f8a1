use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use mirrorlens_core::error::ApiError;
use mirrorlens_core::types::Provider;
use mirrorlens_posters::store::PosterCache;
use mirrorlens_providers::client::{CatalogApi, ProviderClient};
use mirrorlens_providers::feed::fetch_poster_feed;
use mirrorlens_providers::normalize::{normalize_detail, normalize_episodes};
use mirrorlens_providers::search::AggregatedResult;
use mirrorlens_providers::{ContentMetadata, Episode, SearchHit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;
use crate::notify::{NewPostersNotice, spawn_notify};
use crate::state::AppState;
use crate::validation::{normalize_ids, validate_content_id};

/// Provider whose homepage feed populates the poster cache.
pub const POSTER_FEED_PROVIDER: Provider = Provider::AmazonPrime;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        // Search
        .route("/search", get(search_all))
        .route("/search/{provider}", get(search_one))
        // Episodes
        .route("/episodes", get(get_episodes))
        // Posters
        .route("/posters", get(get_posters))
        .route("/posters/refresh", post(refresh_posters))
        .route("/posters/mark", post(mark_posters))
        // Session cookie
        .route("/cookie", get(get_cookie))
        .route("/cookie/status", get(cookie_status))
        // Detail, keyed by provider slug
        .route("/{provider}", get(get_detail))
}

fn parse_provider(slug: &str) -> Result<Provider, AppError> {
    Provider::from_slug(slug)
        .ok_or_else(|| ApiError::NotFound(format!("unknown provider: {slug}")).into())
}

fn client_for(state: &AppState, provider: Provider) -> Result<&Arc<ProviderClient>, AppError> {
    state
        .client(provider)
        .ok_or_else(|| ApiError::Internal(format!("provider not configured: {provider}")).into())
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search_all(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<AggregatedResult>, AppError> {
    let Query(params) = query?;
    let result = state
        .search
        .search(params.q.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(result))
}

#[derive(Serialize)]
struct ProviderSearchResponse {
    query: String,
    provider: Provider,
    results: Vec<SearchHit>,
    count: usize,
}

async fn search_one(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<ProviderSearchResponse>, AppError> {
    let provider = parse_provider(&slug)?;
    let Query(params) = query?;
    let q = params.q.unwrap_or_default();

    let results = state.search.search_provider(provider, &q).await?;
    Ok(Json(ProviderSearchResponse {
        query: q,
        provider,
        count: results.len(),
        results,
    }))
}

// ---------------------------------------------------------------------------
// Detail
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct DetailQuery {
    id: Option<String>,
}

async fn get_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    query: Result<Query<DetailQuery>, QueryRejection>,
) -> Result<Json<ContentMetadata>, AppError> {
    let provider = parse_provider(&slug)?;
    let Query(params) = query?;
    let id = validate_content_id("id", params.id.as_deref())?;

    let client = client_for(&state, provider)?;
    let raw = client.fetch_detail(id).await?;
    let metadata = normalize_detail(&**client, id, &raw).await?;
    Ok(Json(metadata))
}

// ---------------------------------------------------------------------------
// Episodes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodesQuery {
    series_id: Option<String>,
    season_id: Option<String>,
    service: Option<String>,
}

#[derive(Serialize)]
struct EpisodesResponse {
    episodes: Vec<Episode>,
}

async fn get_episodes(
    State(state): State<AppState>,
    query: Result<Query<EpisodesQuery>, QueryRejection>,
) -> Result<Json<EpisodesResponse>, AppError> {
    let Query(params) = query?;
    let series_id = validate_content_id("seriesId", params.series_id.as_deref())?;
    let season_id = validate_content_id("seasonId", params.season_id.as_deref())?;

    let provider = match params.service.as_deref().map(str::trim) {
        None | Some("") => Provider::Netflix,
        Some(slug) => Provider::from_slug(slug)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown service: {slug}")))?,
    };

    let client = client_for(&state, provider)?;
    let raw = client.fetch_episodes(series_id, season_id).await?;
    let episodes = normalize_episodes(&raw)?;
    Ok(Json(EpisodesResponse { episodes }))
}

// ---------------------------------------------------------------------------
// Posters
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostersResponse {
    success: bool,
    #[serde(flatten)]
    cache: PosterCache,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_count: Option<usize>,
}

async fn get_posters(State(state): State<AppState>) -> Json<PostersResponse> {
    Json(PostersResponse {
        success: true,
        cache: state.posters.load().await,
        new_count: None,
    })
}

async fn refresh_posters(
    State(state): State<AppState>,
) -> Result<Json<PostersResponse>, AppError> {
    let client = client_for(&state, POSTER_FEED_PROVIDER)?;
    let feed = fetch_poster_feed(client).await.ok_or_else(|| {
        ApiError::Internal(format!("{POSTER_FEED_PROVIDER} publishes no poster feed"))
    })??;

    if feed.slider.is_empty() && feed.items.is_empty() {
        return Err(ApiError::Internal("poster feed contained no entries".into()).into());
    }

    let outcome = state.posters.refresh(feed.slider, feed.items).await;
    if outcome.new_count > 0 {
        let ids = outcome
            .cache
            .items
            .iter()
            .filter(|e| !e.seen)
            .map(|e| e.id.clone())
            .collect();
        spawn_notify(
            state.notifier.clone(),
            NewPostersNotice {
                new_count: outcome.new_count,
                ids,
            },
        );
    }

    Ok(Json(PostersResponse {
        success: true,
        cache: outcome.cache,
        new_count: Some(outcome.new_count),
    }))
}

#[derive(Deserialize)]
struct MarkRequest {
    ids: Vec<String>,
}

#[derive(Serialize)]
struct MarkResponse {
    success: bool,
    items: Vec<mirrorlens_posters::store::PosterCacheEntry>,
}

async fn mark_posters(
    State(state): State<AppState>,
    body: Result<Json<MarkRequest>, JsonRejection>,
) -> Result<Json<MarkResponse>, AppError> {
    let Json(body) = body?;
    let ids = normalize_ids(&body.ids);
    let cache = state.posters.mark_seen(&ids).await;
    Ok(Json(MarkResponse {
        success: true,
        items: cache.items,
    }))
}

// ---------------------------------------------------------------------------
// Session cookie
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CookieResponse {
    success: bool,
    t_hash: String,
}

async fn get_cookie(State(state): State<AppState>) -> Result<Json<CookieResponse>, AppError> {
    let credential = state.tokens.get_token().await?;
    info!(len = credential.value.len(), "session cookie served");
    Ok(Json(CookieResponse {
        success: true,
        t_hash: credential.value,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CookieStatusResponse {
    status: &'static str,
    /// This call came back with a cookie.
    has_cookie: bool,
    /// A fresh cookie was already held, so no handshake was needed.
    cached: bool,
}

/// Reuses a fresh cookie; only handshakes when none is cached.
async fn cookie_status(State(state): State<AppState>) -> Json<CookieStatusResponse> {
    let cached = state.tokens.cached().is_some();
    let has_cookie = state.tokens.get_token().await.is_ok();
    Json(CookieStatusResponse {
        status: if has_cookie { "success" } else { "failed" },
        has_cookie,
        cached,
    })
}
