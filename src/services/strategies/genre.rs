//! 类型检索策略
//!
//! 处理带类型实体的 genre 意图：记录必须经同义词感知匹配命中
//! 至少一个请求类型才有资格入选，命中数量换算为加性分数提升。

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::corpus::CorpusService;
use crate::error::Result;
use crate::index::embedding::EmbeddingModel;
use crate::index::similarity::cosine_similarity;
use crate::models::intent::{IntentType, SearchIntent};
use crate::models::search::{RankedGame, SearchContext};
use crate::services::strategies::{MAX_RESULTS, SearchStrategy, fuzzy_contains, rank_and_cap};

/// 类型检索阈值（类型过滤已保证相关性，语义阈值放宽）
pub const GENRE_THRESHOLD: f32 = 0.15;

/// 每命中一个请求类型的加性提升
pub const GENRE_BOOST_PER_MATCH: f32 = 0.1;

/// 加性提升上限
pub const GENRE_BOOST_CAP: f32 = 0.3;

/// 固定同义词表：同组词视为同一类型
///
/// 表驱动排序质量，增删需回归验证，不可随手"清理"。
const GENRE_SYNONYMS: &[&[&str]] = &[
    &["roguelike", "rogue-like", "roguelite", "rogue-lite"],
    &["rpg", "role-playing", "role playing", "jrpg", "crpg"],
    &["platformer", "platform", "platforming"],
    &["shooter", "fps", "shmup", "shoot 'em up"],
    &["strategy", "rts", "turn-based", "tactics", "4x"],
    &["simulation", "sim", "simulator"],
    &["puzzle", "puzzler"],
    &["racing", "driving"],
    &["adventure", "point-and-click", "point & click"],
    &["action", "hack and slash", "beat 'em up"],
];

/// 同义词感知的类型匹配：双向子串直接命中，或两词落在同一同义词组
pub fn genre_matches(requested: &str, tag: &str) -> bool {
    if fuzzy_contains(requested, tag) {
        return true;
    }

    GENRE_SYNONYMS.iter().any(|group| {
        group.iter().any(|term| fuzzy_contains(requested, term))
            && group.iter().any(|term| fuzzy_contains(tag, term))
    })
}

pub struct GenreStrategy {
    embedder: Arc<dyn EmbeddingModel>,
    corpus: Arc<CorpusService>,
}

impl GenreStrategy {
    pub fn new(embedder: Arc<dyn EmbeddingModel>, corpus: Arc<CorpusService>) -> Self {
        Self { embedder, corpus }
    }
}

#[async_trait]
impl SearchStrategy for GenreStrategy {
    fn name(&self) -> &'static str {
        "genre-search"
    }

    fn can_handle(&self, intent: &SearchIntent) -> bool {
        intent.intent_type == IntentType::Genre && !intent.entities.genres.is_empty()
    }

    async fn execute(&self, context: &SearchContext) -> Result<Vec<RankedGame>> {
        let requested = &context.intent.entities.genres;

        let query_embedding = self.embedder.encode(&context.query).await?;
        let games = self.corpus.ready_games().await?;

        let mut results: Vec<RankedGame> = Vec::new();
        for game in games.iter() {
            // 无结构化元数据的记录不参与类型过滤
            if game.metadata.tags.is_empty() {
                continue;
            }

            let matched = requested
                .iter()
                .filter(|genre| {
                    game.metadata
                        .tags
                        .iter()
                        .any(|tag| genre_matches(genre, tag))
                })
                .count();
            if matched == 0 {
                continue;
            }

            let Some(embedding) = game.usable_embedding() else {
                continue;
            };
            if embedding.len() != query_embedding.len() {
                continue;
            }

            let similarity = cosine_similarity(&query_embedding, embedding);
            if similarity < GENRE_THRESHOLD {
                continue;
            }

            let boost = (GENRE_BOOST_PER_MATCH * matched as f32).min(GENRE_BOOST_CAP);
            let score = (similarity + boost).min(1.0);
            results.push(RankedGame::new(game.clone(), score));
        }

        let ranked = rank_and_cap(results, MAX_RESULTS);
        debug!(
            "Genre strategy matched {} games for genres {:?}",
            ranked.len(),
            requested
        );
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::StaticCorpusLoader;
    use crate::index::embedding::SimpleEmbeddingModel;
    use crate::models::game::GameRecord;
    use crate::models::intent::IntentEntities;
    use rstest::rstest;

    fn genre_intent(genres: &[&str]) -> SearchIntent {
        SearchIntent::new(
            IntentType::Genre,
            0.75,
            IntentEntities {
                genres: genres.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        )
    }

    async fn tagged_game(
        embedder: &SimpleEmbeddingModel,
        app_id: &str,
        title: &str,
        description: &str,
        tags: &[&str],
    ) -> GameRecord {
        let mut game = GameRecord::new(app_id, title, description);
        game.metadata.tags = tags.iter().map(|s| s.to_string()).collect();
        game.embedding = Some(embedder.encode(description).await.unwrap());
        game
    }

    #[rstest]
    #[case("roguelike", "rogue-lite", true)]
    #[case("roguelike", "roguelite", true)]
    #[case("rpg", "role-playing", true)]
    #[case("platformer", "platforming", true)]
    #[case("shooter", "fps", true)]
    #[case("puzzle", "puzzler", true)]
    #[case("racing", "puzzle", false)]
    #[case("strategy", "cozy", false)]
    fn test_genre_synonym_matching(
        #[case] requested: &str,
        #[case] tag: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(genre_matches(requested, tag), expected);
    }

    #[test]
    fn test_direct_substring_match_either_direction() {
        assert!(genre_matches("rogue", "roguelike"));
        assert!(genre_matches("action roguelike", "roguelike"));
    }

    #[tokio::test]
    async fn test_roguelike_query_matches_rogue_lite_tag() {
        let embedder = Arc::new(SimpleEmbeddingModel::new(128));
        let games = vec![
            tagged_game(
                &embedder,
                "1",
                "Grim Harvest",
                "roguelike games with scythes",
                &["rogue-lite"],
            )
            .await,
        ];
        let corpus = Arc::new(CorpusService::new(Arc::new(StaticCorpusLoader::new(games))));
        let strategy = GenreStrategy::new(embedder, corpus);

        let context = SearchContext::new("roguelike games", genre_intent(&["roguelike"]));
        let results = strategy.execute(&context).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].game.app_id, "1");
    }

    #[tokio::test]
    async fn test_untagged_records_excluded() {
        let embedder = Arc::new(SimpleEmbeddingModel::new(128));
        let mut untagged = GameRecord::new("2", "No Tags", "roguelike games dungeon");
        untagged.embedding = Some(embedder.encode("roguelike games dungeon").await.unwrap());

        let corpus = Arc::new(CorpusService::new(Arc::new(StaticCorpusLoader::new(vec![
            untagged,
        ]))));
        let strategy = GenreStrategy::new(embedder, corpus);

        let context = SearchContext::new("roguelike games", genre_intent(&["roguelike"]));
        let results = strategy.execute(&context).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_boost_capped_and_clamped() {
        let embedder = Arc::new(SimpleEmbeddingModel::new(128));
        // 描述与查询完全一致：相似度 1.0，提升后必须停在 1.0
        let games = vec![
            tagged_game(
                &embedder,
                "1",
                "Everything Game",
                "roguelike rpg puzzle action adventure",
                &["roguelike", "rpg", "puzzle", "action", "adventure"],
            )
            .await,
        ];
        let corpus = Arc::new(CorpusService::new(Arc::new(StaticCorpusLoader::new(games))));
        let strategy = GenreStrategy::new(embedder, corpus);

        let context = SearchContext::new(
            "roguelike rpg puzzle action adventure",
            genre_intent(&["roguelike", "rpg", "puzzle", "action", "adventure"]),
        );
        let results = strategy.execute(&context).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);
    }

    #[tokio::test]
    async fn test_more_genre_matches_rank_higher() {
        // 固定向量让两条记录的原始相似度一致，命中数成为唯一差异
        let ones = [1.0f32; 4];
        let embedder = Arc::new(
            SimpleEmbeddingModel::new(4)
                .with_word_embedding("dungeon", &ones)
                .with_word_embedding("crawler", &ones),
        );

        let one_match = tagged_game(&embedder, "one", "A", "dungeon crawler", &["roguelike"]).await;
        let two_match = tagged_game(
            &embedder,
            "two",
            "B",
            "dungeon crawler",
            &["roguelike", "rpg"],
        )
        .await;

        let corpus = Arc::new(CorpusService::new(Arc::new(StaticCorpusLoader::new(vec![
            one_match, two_match,
        ]))));
        let strategy = GenreStrategy::new(embedder, corpus);

        let context = SearchContext::new("dungeon crawler", genre_intent(&["roguelike", "rpg"]));
        let results = strategy.execute(&context).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].game.app_id, "two");
        assert!(results[0].score > results[1].score);
    }
}
