//! GameScout - 独立游戏发现搜索服务
//!
//! 将自由文本查询转化为排序后的游戏结果：意图分类、嵌入检索与查询扩展、
//! 硬过滤、LLM 重排序、多策略并发合并，以及多级 TTL 缓存。

pub mod api;
pub mod cache;
pub mod config;
pub mod corpus;
pub mod error;
pub mod index;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;
