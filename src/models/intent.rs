//! 搜索意图数据模型
//!
//! 意图分类器的输出：查询类型、置信度、抽取实体、推荐策略。

use serde::{Deserialize, Serialize};

/// 意图类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IntentType {
    /// 自由语义查询
    #[serde(rename = "semantic")]
    #[default]
    Semantic,

    /// "类似某游戏" 查询
    #[serde(rename = "similar")]
    Similar,

    /// 类型/题材查询
    #[serde(rename = "genre")]
    Genre,

    /// 氛围/情绪查询
    #[serde(rename = "mood")]
    Mood,

    /// 特性/玩法查询
    #[serde(rename = "feature")]
    Feature,

    /// 多信号混合查询
    #[serde(rename = "hybrid")]
    Hybrid,
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentType::Semantic => write!(f, "semantic"),
            IntentType::Similar => write!(f, "similar"),
            IntentType::Genre => write!(f, "genre"),
            IntentType::Mood => write!(f, "mood"),
            IntentType::Feature => write!(f, "feature"),
            IntentType::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// 意图实体包
///
/// 实体仅为建议性信息：即使类型匹配，实体也可能为空，
/// 此时策略退化为纯语义行为。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IntentEntities {
    /// 参照游戏名（similar 类型）
    pub reference_game: Option<String>,
    /// 类型关键词列表
    pub genres: Vec<String>,
    /// 特性关键词列表
    pub features: Vec<String>,
    /// 氛围描述
    pub mood: Option<String>,
    /// 游玩模式列表
    pub play_modes: Vec<String>,
}

impl IntentEntities {
    /// 非空实体字段数（hybrid 多信号启发式依据）
    pub fn non_empty_fields(&self) -> usize {
        let mut count = 0;
        if self.reference_game.as_deref().is_some_and(|s| !s.is_empty()) {
            count += 1;
        }
        if !self.genres.is_empty() {
            count += 1;
        }
        if !self.features.is_empty() {
            count += 1;
        }
        if self.mood.as_deref().is_some_and(|s| !s.is_empty()) {
            count += 1;
        }
        if !self.play_modes.is_empty() {
            count += 1;
        }
        count
    }

    /// 实体包是否为空
    pub fn is_empty(&self) -> bool {
        self.non_empty_fields() == 0
    }
}

/// 分类后的搜索意图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIntent {
    /// 意图类型
    #[serde(rename = "type")]
    pub intent_type: IntentType,

    /// 置信度 [0,1]
    pub confidence: f32,

    /// 抽取的实体
    pub entities: IntentEntities,

    /// 推荐策略名
    pub strategy: String,

    /// 分类依据说明
    pub reasoning: Option<String>,
}

impl SearchIntent {
    /// 创建新意图，置信度收敛到 [0,1]
    pub fn new(intent_type: IntentType, confidence: f32, entities: IntentEntities) -> Self {
        let strategy = default_strategy_for(intent_type).to_string();
        Self {
            intent_type,
            confidence: confidence.clamp(0.0, 1.0),
            entities,
            strategy,
            reasoning: None,
        }
    }

    /// 兜底语义意图（分类完全失败时使用）
    pub fn semantic_fallback() -> Self {
        Self::new(IntentType::Semantic, 0.6, IntentEntities::default())
    }
}

impl Default for SearchIntent {
    fn default() -> Self {
        Self::semantic_fallback()
    }
}

/// 意图类型对应的默认策略名
pub fn default_strategy_for(intent_type: IntentType) -> &'static str {
    match intent_type {
        IntentType::Semantic | IntentType::Mood => "semantic-search",
        IntentType::Similar => "similar-games",
        IntentType::Genre => "genre-search",
        IntentType::Feature => "feature-search",
        IntentType::Hybrid => "hybrid-search",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped() {
        let intent = SearchIntent::new(IntentType::Semantic, 1.7, IntentEntities::default());
        assert_eq!(intent.confidence, 1.0);

        let intent = SearchIntent::new(IntentType::Semantic, -0.3, IntentEntities::default());
        assert_eq!(intent.confidence, 0.0);
    }

    #[test]
    fn test_non_empty_fields_count() {
        let mut entities = IntentEntities::default();
        assert_eq!(entities.non_empty_fields(), 0);
        assert!(entities.is_empty());

        entities.genres.push("puzzle".to_string());
        entities.play_modes.push("co-op".to_string());
        assert_eq!(entities.non_empty_fields(), 2);

        // 空字符串不计数
        entities.reference_game = Some(String::new());
        assert_eq!(entities.non_empty_fields(), 2);
    }

    #[test]
    fn test_intent_type_serde_names() {
        let json = serde_json::to_string(&IntentType::Similar).unwrap();
        assert_eq!(json, "\"similar\"");

        let parsed: IntentType = serde_json::from_str("\"genre\"").unwrap();
        assert_eq!(parsed, IntentType::Genre);
    }
}
