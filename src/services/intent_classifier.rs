//! 意图分类服务
//!
//! 主路径为结构化 LLM 调用；调用失败时使用确定性的正则/关键词回退分类器。
//! 回退分类器绝不失败，classify 因此总能返回合法意图。

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::llm::TextGenerator;
use crate::models::intent::{IntentEntities, IntentType, SearchIntent, default_strategy_for};

/// 分类结果缓存 TTL：5 分钟
pub const INTENT_CACHE_TTL: Duration = Duration::from_secs(300);

/// 回退规则的固定置信度
const SIMILAR_FALLBACK_CONFIDENCE: f32 = 0.8;
const FEATURE_FALLBACK_CONFIDENCE: f32 = 0.7;
const GENRE_FALLBACK_CONFIDENCE: f32 = 0.75;
const SEMANTIC_FALLBACK_CONFIDENCE: f32 = 0.6;

/// 回退规则识别的类型关键词
pub const GENRE_KEYWORDS: [&str; 10] = [
    "roguelike",
    "platformer",
    "puzzle",
    "rpg",
    "strategy",
    "shooter",
    "racing",
    "simulation",
    "adventure",
    "action",
];

static SIMILAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\bgames?\s+)?\b(?:like|similar\s+to)\s+(.+)").unwrap());

static COOP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(co-?op|co\s+op|multiplayer|split-?screen|split\s+screen)\b").unwrap()
});

static GENRE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(roguelike|platformer|puzzle|rpg|strategy|shooter|racing|simulation|adventure|action)\b",
    )
    .unwrap()
});

/// 意图分类器
pub struct IntentClassifier {
    generator: Arc<dyn TextGenerator>,
    cache: Arc<TtlCache<SearchIntent>>,
}

#[derive(serde::Deserialize)]
struct LlmIntentPayload {
    #[serde(rename = "type")]
    intent_type: IntentType,
    confidence: f32,
    #[serde(default)]
    entities: IntentEntities,
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

impl IntentClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            cache: Arc::new(TtlCache::new(INTENT_CACHE_TTL)),
        }
    }

    /// 分类缓存句柄（后台清扫任务用）
    pub fn intent_cache(&self) -> Arc<TtlCache<SearchIntent>> {
        self.cache.clone()
    }

    /// 分类查询意图。任何上游失败都回退到确定性分类器，绝不报错。
    pub async fn classify(&self, query: &str) -> SearchIntent {
        let key = format!("intent:{}", query.trim().to_lowercase());

        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let intent = match self.classify_with_llm(query).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!("Intent classification failed, using fallback: {}", e);
                fallback_classify(query)
            }
        };

        self.cache.set(&key, intent.clone());
        intent
    }

    async fn classify_with_llm(&self, query: &str) -> crate::error::Result<SearchIntent> {
        let schema = intent_schema();
        let system_prompt = "You classify queries for an indie-game discovery engine. \
Label the query with its intent type, extracted entities, a confidence score and the \
strategy best suited to answer it. Respond with JSON matching the schema exactly.";
        let user_prompt = format!("Query: {}", query.trim());

        let value = self
            .generator
            .generate_structured(&schema, system_prompt, &user_prompt)
            .await?;

        let payload: LlmIntentPayload = serde_json::from_value(value)?;

        let mut intent = SearchIntent::new(
            payload.intent_type,
            payload.confidence,
            payload.entities,
        );
        if let Some(strategy) = payload.strategy.filter(|s| is_known_strategy(s)) {
            intent.strategy = strategy;
        }
        intent.reasoning = payload.reasoning;

        debug!(
            "Classified '{}' as {} (confidence {:.2})",
            query, intent.intent_type, intent.confidence
        );
        Ok(intent)
    }

    /// 清空分类缓存（测试与运维接口）
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn intent_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "type": {
                "type": "string",
                "enum": ["semantic", "similar", "genre", "mood", "feature", "hybrid"]
            },
            "confidence": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "entities": {
                "type": "object",
                "properties": {
                    "reference_game": {"type": ["string", "null"]},
                    "genres": {"type": "array", "items": {"type": "string"}},
                    "features": {"type": "array", "items": {"type": "string"}},
                    "mood": {"type": ["string", "null"]},
                    "play_modes": {"type": "array", "items": {"type": "string"}}
                }
            },
            "strategy": {"type": "string"},
            "reasoning": {"type": "string"}
        },
        "required": ["type", "confidence"]
    })
}

fn is_known_strategy(name: &str) -> bool {
    matches!(
        name,
        "semantic-search" | "similar-games" | "genre-search" | "feature-search" | "hybrid-search"
    )
}

/// 确定性回退分类器
///
/// 规则按顺序匹配：similar 模式 → 联机特性词 → 类型关键词 → 纯语义。
pub fn fallback_classify(query: &str) -> SearchIntent {
    let trimmed = query.trim();

    if let Some(caps) = SIMILAR_PATTERN.captures(trimmed) {
        let reference = strip_filler(caps.get(1).map(|m| m.as_str()).unwrap_or(""));
        if !reference.is_empty() {
            let entities = IntentEntities {
                reference_game: Some(reference),
                ..Default::default()
            };
            return SearchIntent::new(IntentType::Similar, SIMILAR_FALLBACK_CONFIDENCE, entities);
        }
    }

    if COOP_PATTERN.is_match(trimmed) {
        let play_modes: Vec<String> = COOP_PATTERN
            .find_iter(trimmed)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        let entities = IntentEntities {
            play_modes,
            ..Default::default()
        };
        return SearchIntent::new(IntentType::Feature, FEATURE_FALLBACK_CONFIDENCE, entities);
    }

    let genres: Vec<String> = GENRE_PATTERN
        .find_iter(trimmed)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    if !genres.is_empty() {
        let entities = IntentEntities {
            genres,
            ..Default::default()
        };
        return SearchIntent::new(IntentType::Genre, GENRE_FALLBACK_CONFIDENCE, entities);
    }

    SearchIntent::new(
        IntentType::Semantic,
        SEMANTIC_FALLBACK_CONFIDENCE,
        IntentEntities::default(),
    )
}

/// 去除参照游戏名首尾的填充词与标点
fn strip_filler(raw: &str) -> String {
    let mut words: Vec<&str> = raw
        .trim()
        .trim_matches(|c: char| ",.!?\"'".contains(c))
        .split_whitespace()
        .collect();

    while words
        .first()
        .is_some_and(|w| matches!(w.to_lowercase().as_str(), "the" | "a" | "an"))
    {
        words.remove(0);
    }
    while words
        .last()
        .is_some_and(|w| matches!(w.to_lowercase().as_str(), "game" | "games" | "please"))
    {
        words.pop();
    }

    words.join(" ")
}

/// 创建意图分类服务
pub fn create_intent_classifier(generator: Arc<dyn TextGenerator>) -> Arc<IntentClassifier> {
    Arc::new(IntentClassifier::new(generator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _s: &str, _u: &str, _t: f32) -> Result<String> {
            Err(AppError::Generation("offline".to_string()))
        }
        async fn generate_structured(
            &self,
            _schema: &serde_json::Value,
            _s: &str,
            _u: &str,
        ) -> Result<serde_json::Value> {
            Err(AppError::Generation("offline".to_string()))
        }
    }

    struct CountingStructuredGenerator {
        calls: AtomicUsize,
        payload: serde_json::Value,
    }

    #[async_trait]
    impl TextGenerator for CountingStructuredGenerator {
        async fn generate(&self, _s: &str, _u: &str, _t: f32) -> Result<String> {
            Ok(String::new())
        }
        async fn generate_structured(
            &self,
            _schema: &serde_json::Value,
            _s: &str,
            _u: &str,
        ) -> Result<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    #[test]
    fn test_fallback_similar_pattern() {
        let intent = fallback_classify("games like Hades");
        assert_eq!(intent.intent_type, IntentType::Similar);
        assert_eq!(intent.confidence, 0.8);
        assert_eq!(intent.entities.reference_game.as_deref(), Some("Hades"));
    }

    #[test]
    fn test_fallback_similar_strips_filler() {
        let intent = fallback_classify("something similar to the Hollow Knight game");
        assert_eq!(intent.intent_type, IntentType::Similar);
        assert_eq!(
            intent.entities.reference_game.as_deref(),
            Some("Hollow Knight")
        );
    }

    #[test]
    fn test_fallback_coop_tokens() {
        let intent = fallback_classify("split-screen party chaos");
        assert_eq!(intent.intent_type, IntentType::Feature);
        assert_eq!(intent.confidence, 0.7);
        assert!(!intent.entities.play_modes.is_empty());
    }

    #[test]
    fn test_fallback_genre_keywords_collects_all() {
        let intent = fallback_classify("roguelike puzzle madness");
        assert_eq!(intent.intent_type, IntentType::Genre);
        assert_eq!(intent.confidence, 0.75);
        assert_eq!(intent.entities.genres, vec!["roguelike", "puzzle"]);
    }

    #[test]
    fn test_fallback_semantic_default() {
        let intent = fallback_classify("something short and emotional");
        assert_eq!(intent.intent_type, IntentType::Semantic);
        assert_eq!(intent.confidence, 0.6);
        assert!(intent.entities.is_empty());
    }

    #[test]
    fn test_fallback_never_leaves_confidence_range() {
        for query in ["", "   ", "like", "co-op rpg like Hades"] {
            let intent = fallback_classify(query);
            assert!((0.0..=1.0).contains(&intent.confidence));
        }
    }

    #[tokio::test]
    async fn test_classify_uses_fallback_on_llm_failure() {
        let classifier = IntentClassifier::new(Arc::new(FailingGenerator));
        let intent = classifier.classify("games like Hades").await;
        assert_eq!(intent.intent_type, IntentType::Similar);
        assert_eq!(intent.entities.reference_game.as_deref(), Some("Hades"));
    }

    #[tokio::test]
    async fn test_classify_parses_structured_payload() {
        let generator = CountingStructuredGenerator {
            calls: AtomicUsize::new(0),
            payload: serde_json::json!({
                "type": "genre",
                "confidence": 0.92,
                "entities": {"genres": ["puzzle"]},
                "strategy": "genre-search",
                "reasoning": "explicit genre keyword"
            }),
        };
        let classifier = IntentClassifier::new(Arc::new(generator));

        let intent = classifier.classify("puzzle games").await;
        assert_eq!(intent.intent_type, IntentType::Genre);
        assert_eq!(intent.confidence, 0.92);
        assert_eq!(intent.entities.genres, vec!["puzzle"]);
        assert_eq!(intent.strategy, "genre-search");
    }

    #[tokio::test]
    async fn test_classify_clamps_out_of_range_confidence() {
        let generator = CountingStructuredGenerator {
            calls: AtomicUsize::new(0),
            payload: serde_json::json!({"type": "semantic", "confidence": 3.5}),
        };
        let classifier = IntentClassifier::new(Arc::new(generator));

        let intent = classifier.classify("whatever").await;
        assert_eq!(intent.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_classification_cached_five_minutes() {
        let generator = Arc::new(CountingStructuredGenerator {
            calls: AtomicUsize::new(0),
            payload: serde_json::json!({"type": "semantic", "confidence": 0.5}),
        });
        let classifier = IntentClassifier::new(generator.clone());

        classifier.classify("cozy games").await;
        classifier.classify("Cozy Games ").await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_strategy_name_replaced_with_default() {
        let generator = CountingStructuredGenerator {
            calls: AtomicUsize::new(0),
            payload: serde_json::json!({
                "type": "feature",
                "confidence": 0.8,
                "strategy": "made-up-strategy"
            }),
        };
        let classifier = IntentClassifier::new(Arc::new(generator));

        let intent = classifier.classify("co-op stuff").await;
        assert_eq!(intent.strategy, default_strategy_for(IntentType::Feature));
    }
}
