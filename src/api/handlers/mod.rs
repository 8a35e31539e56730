//! API 处理器模块

pub mod search_handler;
