//! 搜索请求与响应数据模型

use serde::{Deserialize, Serialize};

use crate::models::game::GameRecord;
use crate::models::intent::SearchIntent;

/// 用户偏好（预留字段，当前策略不消费）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserPreferences {
    /// 偏好类型列表
    pub favorite_genres: Vec<String>,
    /// 排除类型列表
    pub excluded_genres: Vec<String>,
    /// 价格区间（美元）
    pub price_range: Option<(f32, f32)>,
    /// 发行年份区间
    pub release_year_range: Option<(u16, u16)>,
}

/// 搜索上下文：一次检索的完整输入
#[derive(Debug, Clone)]
pub struct SearchContext {
    /// 原始查询（已裁剪、非空）
    pub query: String,
    /// 分类后的意图
    pub intent: SearchIntent,
    /// 用户标识
    pub user_id: Option<String>,
    /// 用户偏好
    pub preferences: Option<UserPreferences>,
}

impl SearchContext {
    /// 创建新搜索上下文
    pub fn new(query: &str, intent: SearchIntent) -> Self {
        Self {
            query: query.trim().to_string(),
            intent,
            user_id: None,
            preferences: None,
        }
    }

    /// 附加用户标识
    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }
}

/// 带分数的游戏结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedGame {
    /// 游戏记录
    pub game: GameRecord,
    /// 本次查询下的相似度/相关性分数
    pub score: f32,
}

impl RankedGame {
    pub fn new(game: GameRecord, score: f32) -> Self {
        Self { game, score }
    }
}

/// 响应元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// 回显的查询
    pub query: String,
    /// 分类意图
    pub intent: SearchIntent,
    /// 实际执行的策略名
    pub strategy: String,
    /// 处理耗时（毫秒）
    pub processing_time_ms: u64,
    /// 结果数量
    pub result_count: usize,
    /// 是否命中响应缓存（反映本次查找，而非存储时的状态）
    pub cache_hit: bool,
}

/// 参照游戏信息（similar 查询附带）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceGameInfo {
    /// 用户提到的游戏名
    pub name: String,
    /// 语料库中匹配到的记录
    pub game: Option<GameRecord>,
}

/// 搜索响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// 排序后的结果列表
    pub results: Vec<RankedGame>,
    /// 元数据
    pub metadata: SearchMetadata,
    /// 参照游戏信息
    pub reference_game: Option<ReferenceGameInfo>,
    /// 查询建议
    pub suggestions: Option<Vec<String>>,
}

impl SearchResponse {
    /// 空结果的错误形响应（绝不向调用方抛出异常）
    pub fn empty_error(query: &str, processing_time_ms: u64) -> Self {
        let mut intent = SearchIntent::semantic_fallback();
        intent.confidence = 0.0;
        Self {
            results: Vec::new(),
            metadata: SearchMetadata {
                query: query.to_string(),
                intent,
                strategy: "none".to_string(),
                processing_time_ms,
                result_count: 0,
                cache_hit: false,
            },
            reference_game: None,
            suggestions: None,
        }
    }
}
