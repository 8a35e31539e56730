//! 搜索 DTO
//!
//! 定义搜索相关的请求和响应数据结构。
//! 响应侧做显式映射，嵌入向量等内部字段不出现在线上。

use serde::{Deserialize, Serialize};

use crate::models::game::GameRecord;
use crate::models::search::{RankedGame, SearchResponse};

/// 搜索请求
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    /// 搜索查询
    pub query: String,
    /// 用户标识
    pub user_id: Option<String>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            user_id: None,
        }
    }
}

/// 游戏结果项
#[derive(Debug, Clone, Serialize)]
pub struct GameItem {
    /// Steam app id
    pub app_id: String,
    /// 标题
    pub title: String,
    /// 描述
    pub description: String,
    /// 标签
    pub tags: Vec<String>,
    /// 游玩模式
    pub play_modes: Vec<String>,
    /// 价格展示文本
    pub price: String,
    /// 是否免费
    pub is_free: bool,
    /// 头图
    pub header_image: Option<String>,
    /// 相关性分数
    pub score: f32,
}

impl GameItem {
    pub fn from_ranked(ranked: &RankedGame) -> Self {
        Self::from_game(&ranked.game, ranked.score)
    }

    pub fn from_game(game: &GameRecord, score: f32) -> Self {
        Self {
            app_id: game.app_id.clone(),
            title: game.title.clone(),
            description: game.description.clone(),
            tags: game.metadata.tags.clone(),
            play_modes: game.metadata.play_modes.clone(),
            price: game.metadata.price.clone(),
            is_free: game.metadata.is_free,
            header_image: game.media.header_image.clone(),
            score,
        }
    }
}

/// 参照游戏信息
#[derive(Debug, Serialize)]
pub struct ReferenceGameItem {
    /// 用户提到的名字
    pub name: String,
    /// 语料库中匹配的记录
    pub game: Option<GameItem>,
}

/// 搜索响应
#[derive(Debug, Serialize)]
pub struct SearchResponseBody {
    /// 回显查询
    pub query: String,
    /// 意图类型
    pub intent_type: String,
    /// 意图置信度
    pub confidence: f32,
    /// 执行策略
    pub strategy: String,
    /// 结果列表
    pub results: Vec<GameItem>,
    /// 结果数量
    pub total_results: usize,
    /// 耗时（毫秒）
    pub took_ms: u64,
    /// 是否命中缓存
    pub cache_hit: bool,
    /// 参照游戏
    pub reference_game: Option<ReferenceGameItem>,
    /// 查询建议
    pub suggestions: Option<Vec<String>>,
}

impl SearchResponseBody {
    pub fn from_response(response: &SearchResponse) -> Self {
        Self {
            query: response.metadata.query.clone(),
            intent_type: response.metadata.intent.intent_type.to_string(),
            confidence: response.metadata.intent.confidence,
            strategy: response.metadata.strategy.clone(),
            results: response.results.iter().map(GameItem::from_ranked).collect(),
            total_results: response.metadata.result_count,
            took_ms: response.metadata.processing_time_ms,
            cache_hit: response.metadata.cache_hit,
            reference_game: response.reference_game.as_ref().map(|r| ReferenceGameItem {
                name: r.name.clone(),
                game: r.game.as_ref().map(|g| GameItem::from_game(g, 1.0)),
            }),
            suggestions: response.suggestions.clone(),
        }
    }
}

/// 游戏列表响应
#[derive(Debug, Serialize)]
pub struct GameListResponse {
    /// 游戏列表
    pub games: Vec<GameItem>,
    /// 总数
    pub total: usize,
}

/// 缓存清空响应
#[derive(Debug, Serialize)]
pub struct CacheFlushResponse {
    /// 是否已清空
    pub flushed: bool,
}
