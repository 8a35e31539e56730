use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::debug;

use crate::api::{app_state::AppState, dto::search_dto::*};

#[derive(Deserialize)]
pub struct SearchQueryParams {
    pub q: Option<String>,
    pub user_id: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> impl IntoResponse {
    state.metrics.record_http_request();
    debug!("Search request: query='{}'", request.query);

    let response = state
        .search_service
        .search_with_metadata(&request.query, request.user_id.as_deref())
        .await;

    state.metrics.record_search(
        response.metadata.processing_time_ms,
        response.metadata.cache_hit,
        response.metadata.result_count,
    );

    Json(SearchResponseBody::from_response(&response))
}

pub async fn search_by_params(
    State(state): State<AppState>,
    Query(params): Query<SearchQueryParams>,
) -> impl IntoResponse {
    state.metrics.record_http_request();
    let query = params.q.unwrap_or_default();
    debug!("Search request (GET): query='{}'", query);

    let response = state
        .search_service
        .search_with_metadata(&query, params.user_id.as_deref())
        .await;

    state.metrics.record_search(
        response.metadata.processing_time_ms,
        response.metadata.cache_hit,
        response.metadata.result_count,
    );

    Json(SearchResponseBody::from_response(&response))
}

pub async fn list_games(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.record_http_request();

    let games = state.search_service.get_all_games().await;
    let items: Vec<GameItem> = games
        .iter()
        .map(|game| GameItem::from_game(game, 0.0))
        .collect();

    let total = items.len();
    Json(GameListResponse {
        games: items,
        total,
    })
}

pub async fn flush_cache(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.record_http_request();
    state.search_service.flush_caches();
    debug!("Caches flushed");

    Json(CacheFlushResponse { flushed: true })
}
