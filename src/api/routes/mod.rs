//! API 路由模块

pub mod search_routes;
