//! Search Routes
//!
//! 定义搜索相关的 API 路由。

use crate::api::handlers::search_handler::*;
use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::api::app_state::AppState;

/// 创建搜索路由器
pub fn create_search_router() -> Router<AppState> {
    Router::new()
        .route("/search", post(search).get(search_by_params))
        .route("/games", get(list_games))
        .route("/cache", delete(flush_cache))
}
