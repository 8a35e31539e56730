//! 搜索编排服务
//!
//! 入口状态机：校验 → 查缓存 → 意图分类 → 选策略 → 执行 → 组装响应 → 写缓存。
//! 对调用方永远返回完整的 SearchResponse，任何内部失败都降级为空结果响应。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::corpus::CorpusService;
use crate::models::game::GameRecord;
use crate::models::intent::{IntentType, SearchIntent};
use crate::models::search::{
    RankedGame, ReferenceGameInfo, SearchContext, SearchMetadata, SearchResponse,
};
use crate::services::intent_classifier::IntentClassifier;
use crate::services::strategies::SearchStrategy;

/// 响应缓存基准 TTL：5 分钟
pub const RESPONSE_TTL_BASE: Duration = Duration::from_secs(300);

/// 高置信度意图的结果更稳定，TTL 翻倍
pub const HIGH_CONFIDENCE: f32 = 0.8;

/// 结果过少说明语料覆盖差，TTL 减半以便尽快吸收新数据
pub const SPARSE_RESULT_COUNT: usize = 5;

/// similar 查询对新鲜度敏感，TTL 封顶 2 分钟
pub const SIMILAR_TTL_CAP: Duration = Duration::from_secs(120);

/// 全量列表缓存 TTL：10 分钟
pub const ALL_GAMES_TTL: Duration = Duration::from_secs(600);

/// 全量列表使用的宽泛兜底查询
const ALL_GAMES_QUERY: &str = "indie games of every genre and style";

const ALL_GAMES_CACHE_KEY: &str = "search:all-games";

/// 低置信度查询附带的建议（来自回退分类器的类型关键词）
const LOW_CONFIDENCE_SUGGESTIONS: [&str; 3] =
    ["roguelike games", "co-op puzzle games", "cozy simulation games"];

/// 搜索服务 trait
#[async_trait]
pub trait SearchService: Send + Sync {
    /// 主入口：返回排序结果，绝不向调用方抛错
    async fn search(&self, query: &str, user_id: Option<&str>) -> SearchResponse;

    /// 与 search 相同，但完整元数据信封是文档化契约而非实现细节
    async fn search_with_metadata(&self, query: &str, user_id: Option<&str>) -> SearchResponse;

    /// 全量列表：宽泛查询的语义搜索，缓存 10 分钟
    async fn get_all_games(&self) -> Vec<GameRecord>;

    /// 清空响应与分类缓存（运维接口）
    fn flush_caches(&self);
}

/// 搜索编排器
///
/// 无静态全局状态：所有依赖显式注入，测试可构造隔离实例。
pub struct SearchOrchestrator {
    classifier: Arc<IntentClassifier>,
    /// 固定声明顺序：semantic, similar, genre, feature, hybrid
    strategies: Vec<Arc<dyn SearchStrategy>>,
    /// 无策略匹配时的默认策略（语义）
    default_strategy: Arc<dyn SearchStrategy>,
    corpus: Arc<CorpusService>,
    response_cache: Arc<TtlCache<SearchResponse>>,
}

impl SearchOrchestrator {
    pub fn new(
        classifier: Arc<IntentClassifier>,
        strategies: Vec<Arc<dyn SearchStrategy>>,
        default_strategy: Arc<dyn SearchStrategy>,
        corpus: Arc<CorpusService>,
    ) -> Self {
        Self {
            classifier,
            strategies,
            default_strategy,
            corpus,
            response_cache: Arc::new(TtlCache::new(RESPONSE_TTL_BASE)),
        }
    }

    /// 响应缓存句柄（后台清扫任务与监控用）
    pub fn response_cache(&self) -> Arc<TtlCache<SearchResponse>> {
        self.response_cache.clone()
    }

    fn cache_key(query: &str, user_id: Option<&str>) -> String {
        let base = format!("search:{}", query.trim().to_lowercase());
        match user_id {
            Some(id) => format!("{}:user:{}", base, id),
            None => base,
        }
    }

    /// 缓存写入 TTL 策略
    fn cache_ttl(intent: &SearchIntent, result_count: usize) -> Duration {
        let mut ttl = RESPONSE_TTL_BASE;

        if intent.confidence > HIGH_CONFIDENCE {
            ttl *= 2;
        }
        if result_count < SPARSE_RESULT_COUNT {
            ttl /= 2;
        }
        if intent.intent_type == IntentType::Similar {
            ttl = ttl.min(SIMILAR_TTL_CAP);
        }

        ttl
    }

    fn select_strategy(&self, intent: &SearchIntent) -> Arc<dyn SearchStrategy> {
        self.strategies
            .iter()
            .find(|strategy| strategy.can_handle(intent))
            .cloned()
            .unwrap_or_else(|| self.default_strategy.clone())
    }

    /// similar 查询的参照游戏信息：在语料库中找标题模糊匹配的记录。
    /// 查找失败不致命，降级为只带名字。
    async fn reference_info(&self, intent: &SearchIntent) -> Option<ReferenceGameInfo> {
        if intent.intent_type != IntentType::Similar {
            return None;
        }
        let name = intent
            .entities
            .reference_game
            .as_deref()
            .filter(|n| !n.trim().is_empty())?;

        let matched = match self.corpus.ready_games().await {
            Ok(games) => games
                .iter()
                .find(|game| {
                    crate::services::strategies::fuzzy_contains(&game.title, name)
                })
                .cloned(),
            Err(e) => {
                warn!("Reference game lookup failed: {}", e);
                None
            }
        };

        Some(ReferenceGameInfo {
            name: name.to_string(),
            game: matched,
        })
    }

    fn suggestions_for(intent: &SearchIntent) -> Option<Vec<String>> {
        if intent.confidence < 0.7 {
            Some(
                LOW_CONFIDENCE_SUGGESTIONS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            )
        } else {
            None
        }
    }

    async fn execute_search(&self, query: &str, user_id: Option<&str>) -> SearchResponse {
        let started = Instant::now();
        let trimmed = query.trim();

        // validate
        if trimmed.is_empty() {
            debug!("Rejected empty query");
            return SearchResponse::empty_error(query, started.elapsed().as_millis() as u64);
        }

        // cache-check：命中时翻转 cache_hit 标志，内容不变
        let key = Self::cache_key(trimmed, user_id);
        if let Some(mut cached) = self.response_cache.get(&key) {
            debug!("Response cache hit for '{}'", trimmed);
            cached.metadata.cache_hit = true;
            return cached;
        }

        // classify-intent（绝不失败）
        let intent = self.classifier.classify(trimmed).await;

        // select-strategy
        let strategy = self.select_strategy(&intent);
        debug!(
            "Query '{}' classified as {} -> strategy {}",
            trimmed, intent.intent_type, strategy.name()
        );

        // execute
        let mut context = SearchContext::new(trimmed, intent.clone());
        if let Some(id) = user_id {
            context = context.with_user(id);
        }

        let results: Vec<RankedGame> = match strategy.execute(&context).await {
            Ok(results) => results,
            Err(e) => {
                // 策略失败降级为空结果错误响应，不写缓存
                warn!("Strategy {} failed for '{}': {}", strategy.name(), trimmed, e);
                let mut response =
                    SearchResponse::empty_error(trimmed, started.elapsed().as_millis() as u64);
                response.metadata.intent = intent;
                response.metadata.strategy = strategy.name().to_string();
                return response;
            }
        };

        // assemble-response
        let reference_game = self.reference_info(&intent).await;
        let response = SearchResponse {
            suggestions: Self::suggestions_for(&intent),
            metadata: SearchMetadata {
                query: trimmed.to_string(),
                intent: intent.clone(),
                strategy: strategy.name().to_string(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                result_count: results.len(),
                cache_hit: false,
            },
            results,
            reference_game,
        };

        // cache-write
        let ttl = Self::cache_ttl(&intent, response.metadata.result_count);
        let mut cache_meta = std::collections::HashMap::new();
        cache_meta.insert("strategy".to_string(), strategy.name().to_string());
        self.response_cache
            .set_with_metadata(&key, response.clone(), ttl, cache_meta);

        info!(
            "Search '{}' -> {} results via {} in {}ms",
            trimmed, response.metadata.result_count, response.metadata.strategy,
            response.metadata.processing_time_ms
        );
        response
    }
}

#[async_trait]
impl SearchService for SearchOrchestrator {
    async fn search(&self, query: &str, user_id: Option<&str>) -> SearchResponse {
        self.execute_search(query, user_id).await
    }

    async fn search_with_metadata(&self, query: &str, user_id: Option<&str>) -> SearchResponse {
        self.execute_search(query, user_id).await
    }

    async fn get_all_games(&self) -> Vec<GameRecord> {
        if let Some(cached) = self.response_cache.get(ALL_GAMES_CACHE_KEY) {
            return cached.results.into_iter().map(|r| r.game).collect();
        }

        let intent = SearchIntent::semantic_fallback();
        let context = SearchContext::new(ALL_GAMES_QUERY, intent);
        let results = match self.default_strategy.execute(&context).await {
            Ok(results) => results,
            Err(e) => {
                warn!("All-games listing failed: {}", e);
                return Vec::new();
            }
        };

        let response = SearchResponse {
            metadata: SearchMetadata {
                query: ALL_GAMES_QUERY.to_string(),
                intent: SearchIntent::semantic_fallback(),
                strategy: self.default_strategy.name().to_string(),
                processing_time_ms: 0,
                result_count: results.len(),
                cache_hit: false,
            },
            results,
            reference_game: None,
            suggestions: None,
        };
        self.response_cache
            .set_with_ttl(ALL_GAMES_CACHE_KEY, response.clone(), ALL_GAMES_TTL);

        response.results.into_iter().map(|r| r.game).collect()
    }

    fn flush_caches(&self) {
        self.response_cache.clear();
        self.classifier.clear_cache();
        self.corpus.invalidate();
    }
}

/// 创建搜索编排服务（固定策略顺序）
pub fn create_search_service(
    classifier: Arc<IntentClassifier>,
    semantic: Arc<dyn SearchStrategy>,
    similar: Arc<dyn SearchStrategy>,
    genre: Arc<dyn SearchStrategy>,
    feature: Arc<dyn SearchStrategy>,
    hybrid: Arc<dyn SearchStrategy>,
    corpus: Arc<CorpusService>,
) -> Arc<SearchOrchestrator> {
    let strategies: Vec<Arc<dyn SearchStrategy>> = vec![
        semantic.clone(),
        similar,
        genre,
        feature,
        hybrid,
    ];
    Arc::new(SearchOrchestrator::new(
        classifier,
        strategies,
        semantic,
        corpus,
    ))
}
