// Integration tests for the search orchestration service
//
// Tests cover:
// - The full validate -> classify -> strategy -> response pipeline
// - Response caching and the cache_hit flag contract
// - Fallback intent classification without LLM access
// - Strategy routing per intent type
// - Deduplication and error-shaped responses

use async_trait::async_trait;
use std::sync::Arc;

use gamescout::corpus::{CorpusService, StaticCorpusLoader};
use gamescout::error::{AppError, Result};
use gamescout::index::embedding::{EmbeddingModel, SimpleEmbeddingModel};
use gamescout::llm::TextGenerator;
use gamescout::models::game::GameRecord;
use gamescout::models::intent::IntentType;
use gamescout::services::orchestrator::SearchService;
use gamescout::services::{
    FeatureStrategy, GenreStrategy, HybridStrategy, SemanticStrategy, SimilarGamesStrategy,
    create_intent_classifier, create_search_service,
};

/// LLM 不可用：分类走确定性回退，HyDE 静默跳过
struct OfflineGenerator;

#[async_trait]
impl TextGenerator for OfflineGenerator {
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

/// 固定返回同一结构化意图的生成器
struct PayloadGenerator {
    payload: serde_json::Value,
}

#[async_trait]
impl TextGenerator for PayloadGenerator {
    async fn generate(&self, _s: &str, _u: &str, _t: f32) -> Result<String> {
        Ok(String::new())
    }
    async fn generate_structured(
        &self,
        _schema: &serde_json::Value,
        _s: &str,
        _u: &str,
    ) -> Result<serde_json::Value> {
        Ok(self.payload.clone())
    }
}

async fn game(
    embedder: &SimpleEmbeddingModel,
    app_id: &str,
    title: &str,
    description: &str,
    tags: &[&str],
    play_modes: &[&str],
) -> GameRecord {
    let mut game = GameRecord::new(app_id, title, description);
    game.metadata.tags = tags.iter().map(|s| s.to_string()).collect();
    game.metadata.play_modes = play_modes.iter().map(|s| s.to_string()).collect();
    game.embedding = Some(embedder.encode(description).await.unwrap());
    game
}

async fn test_corpus(embedder: &SimpleEmbeddingModel) -> Vec<GameRecord> {
    vec![
        game(
            embedder,
            "100",
            "Hades",
            "fast roguelike underworld action combat",
            &["roguelike", "action"],
            &["single-player"],
        )
        .await,
        game(
            embedder,
            "200",
            "Grim Harvest",
            "fast roguelike underworld action inspired by hades",
            &["rogue-lite", "action"],
            &["single-player"],
        )
        .await,
        game(
            embedder,
            "300",
            "Potion Partners",
            "chaotic co-op kitchen alchemy party brewing",
            &["party", "co-op"],
            &["co-op", "multiplayer"],
        )
        .await,
        game(
            embedder,
            "400",
            "Ember Vale",
            "cozy farming village simulation with fire spirits",
            &["farming", "simulation"],
            &["single-player"],
        )
        .await,
        game(
            embedder,
            "600",
            "Catalog Anchor",
            "a genre blending indie style collection of games",
            &["variety"],
            &["single-player"],
        )
        .await,
    ]
}

fn build_service(
    generator: Arc<dyn TextGenerator>,
    embedder: Arc<SimpleEmbeddingModel>,
    games: Vec<GameRecord>,
) -> Arc<dyn SearchService> {
    let corpus = Arc::new(CorpusService::new(Arc::new(StaticCorpusLoader::new(games))));
    let classifier = create_intent_classifier(generator);

    let semantic = Arc::new(SemanticStrategy::new(
        embedder.clone(),
        corpus.clone(),
        None,
        None,
    ));
    let similar = Arc::new(SimilarGamesStrategy::new(embedder.clone(), corpus.clone()));
    let genre = Arc::new(GenreStrategy::new(embedder.clone(), corpus.clone()));
    let feature = Arc::new(FeatureStrategy::new(embedder.clone(), corpus.clone()));
    let hybrid = Arc::new(HybridStrategy::new(
        semantic.clone(),
        similar.clone(),
        genre.clone(),
        feature.clone(),
    ));

    create_search_service(classifier, semantic, similar, genre, feature, hybrid, corpus)
}

async fn offline_service() -> Arc<dyn SearchService> {
    let embedder = Arc::new(SimpleEmbeddingModel::new(256));
    let games = test_corpus(&embedder).await;
    build_service(Arc::new(OfflineGenerator), embedder, games)
}

#[tokio::test]
async fn test_empty_query_returns_error_shaped_response() {
    let service = offline_service().await;

    let response = service.search("", None).await;
    assert!(response.results.is_empty());
    assert_eq!(response.metadata.result_count, 0);
    assert_eq!(response.metadata.intent.confidence, 0.0);

    let response = service.search("   ", None).await;
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn test_similar_query_via_fallback_classifier() {
    let service = offline_service().await;

    let response = service.search("games like Hades", None).await;
    assert_eq!(response.metadata.intent.intent_type, IntentType::Similar);
    assert_eq!(response.metadata.intent.confidence, 0.8);
    assert_eq!(response.metadata.strategy, "similar-games");

    // 参照游戏信息随 similar 响应返回
    let reference = response.reference_game.expect("reference info expected");
    assert_eq!(reference.name, "Hades");
    assert_eq!(reference.game.expect("corpus match").app_id, "100");

    // 参照游戏自身不出现在结果里
    assert!(response.results.iter().all(|r| r.game.app_id != "100"));
    // 描述提及 hades 的记录作为近邻返回
    assert!(response.results.iter().any(|r| r.game.app_id == "200"));
}

#[tokio::test]
async fn test_repeat_search_hits_cache_with_identical_ordering() {
    let service = offline_service().await;

    let first = service.search("cozy farming village simulation", None).await;
    assert!(!first.metadata.cache_hit);
    assert!(!first.results.is_empty());

    let second = service.search("cozy farming village simulation", None).await;
    assert!(second.metadata.cache_hit);

    let first_ids: Vec<&str> = first.results.iter().map(|r| r.game.app_id.as_str()).collect();
    let second_ids: Vec<&str> = second.results.iter().map(|r| r.game.app_id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn test_cache_key_distinguishes_users() {
    let service = offline_service().await;

    service.search("cozy farming village", Some("alice")).await;
    let other_user = service.search("cozy farming village", Some("bob")).await;
    assert!(!other_user.metadata.cache_hit);

    let same_user = service.search("cozy farming village", Some("alice")).await;
    assert!(same_user.metadata.cache_hit);
}

#[tokio::test]
async fn test_genre_query_routed_to_genre_strategy() {
    let service = offline_service().await;

    let response = service.search("roguelike games", None).await;
    assert_eq!(response.metadata.intent.intent_type, IntentType::Genre);
    assert_eq!(response.metadata.strategy, "genre-search");

    let ids: Vec<&str> = response
        .results
        .iter()
        .map(|r| r.game.app_id.as_str())
        .collect();
    // "rogue-lite" 标签经同义词表命中 "roguelike"
    assert!(ids.contains(&"200"));
    // 无相关标签的不入选
    assert!(!ids.contains(&"400"));
}

#[tokio::test]
async fn test_coop_query_routed_to_feature_strategy() {
    let service = offline_service().await;

    let response = service.search("chaotic co-op kitchen party", None).await;
    assert_eq!(response.metadata.intent.intent_type, IntentType::Feature);
    assert_eq!(response.metadata.strategy, "feature-search");

    let ids: Vec<&str> = response
        .results
        .iter()
        .map(|r| r.game.app_id.as_str())
        .collect();
    assert_eq!(ids, vec!["300"]);
}

#[tokio::test]
async fn test_hybrid_intent_routed_and_merged() {
    let embedder = Arc::new(SimpleEmbeddingModel::new(256));
    let games = test_corpus(&embedder).await;
    let generator = Arc::new(PayloadGenerator {
        payload: serde_json::json!({
            "type": "hybrid",
            "confidence": 0.85,
            "entities": {
                "genres": ["party"],
                "play_modes": ["co-op"]
            }
        }),
    });
    let service = build_service(generator, embedder, games);

    let response = service.search("co-op party games", None).await;
    assert_eq!(response.metadata.intent.intent_type, IntentType::Hybrid);
    assert_eq!(response.metadata.strategy, "hybrid-search");

    let ids: Vec<&str> = response
        .results
        .iter()
        .map(|r| r.game.app_id.as_str())
        .collect();
    // 同时满足 genre(party) 与 feature(co-op) 的记录领跑合并结果
    assert_eq!(ids.first(), Some(&"300"));
}

#[tokio::test]
async fn test_results_deduplicated_by_app_id() {
    let embedder = Arc::new(SimpleEmbeddingModel::new(256));
    // 查询不含类型关键词，走纯语义路径
    let description = "cozy village escape with gentle chores";
    let duplicate_a = game(&embedder, "500", "Same Game", description, &[], &[]).await;
    let duplicate_b = game(&embedder, "500", "Same Game Again", description, &[], &[]).await;
    let service = build_service(
        Arc::new(OfflineGenerator),
        embedder,
        vec![duplicate_a, duplicate_b],
    );

    let response = service.search(description, None).await;
    let ids: Vec<&str> = response
        .results
        .iter()
        .map(|r| r.game.app_id.as_str())
        .collect();
    assert_eq!(ids, vec!["500"]);
}

#[tokio::test]
async fn test_get_all_games_cached() {
    let service = offline_service().await;

    let first = service.get_all_games().await;
    assert!(first.iter().any(|g| g.app_id == "600"));

    let second = service.get_all_games().await;
    let first_ids: Vec<&str> = first.iter().map(|g| g.app_id.as_str()).collect();
    let second_ids: Vec<&str> = second.iter().map(|g| g.app_id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn test_flush_caches_resets_cache_hit() {
    let service = offline_service().await;

    service.search("cozy farming village", None).await;
    service.flush_caches();

    let after_flush = service.search("cozy farming village", None).await;
    assert!(!after_flush.metadata.cache_hit);
}

#[tokio::test]
async fn test_malformed_llm_payload_degrades_to_fallback() {
    let embedder = Arc::new(SimpleEmbeddingModel::new(256));
    let games = test_corpus(&embedder).await;
    let generator = Arc::new(PayloadGenerator {
        payload: serde_json::json!({"type": "nonsense-type", "confidence": "not a number"}),
    });
    let service = build_service(generator, embedder, games);

    // 结构化输出不合法：回退分类器接手，搜索照常完成
    let response = service.search("games like Hades", None).await;
    assert_eq!(response.metadata.intent.intent_type, IntentType::Similar);
    assert_eq!(response.metadata.intent.confidence, 0.8);
}
