//! 特性检索策略
//!
//! 处理带特性/游玩模式实体的 feature 意图。资格规则：
//! (a) 请求了游玩模式时，记录必须有模糊匹配的游玩模式；
//! (b) 请求了特性时，若特性属联机类且游玩模式检查已通过则放行，
//!     否则必须有特性与记录标签的子串匹配。

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::corpus::CorpusService;
use crate::error::Result;
use crate::index::embedding::EmbeddingModel;
use crate::index::similarity::cosine_similarity;
use crate::models::game::GameRecord;
use crate::models::intent::{IntentType, SearchIntent};
use crate::models::search::{RankedGame, SearchContext};
use crate::services::strategies::{MAX_RESULTS, SearchStrategy, fuzzy_contains, rank_and_cap};

/// 特性检索阈值
pub const FEATURE_THRESHOLD: f32 = 0.2;

/// 联机类特性词：这类特性由游玩模式字段承载，标签上往往缺失
const COOP_LIKE_FEATURES: [&str; 7] = [
    "co-op",
    "coop",
    "co op",
    "multiplayer",
    "split-screen",
    "split screen",
    "online",
];

fn is_coop_like(feature: &str) -> bool {
    COOP_LIKE_FEATURES
        .iter()
        .any(|token| fuzzy_contains(feature, token))
}

/// 资格判定，规则见模块注释。请求实体全空时放行（退化为纯语义行为）。
pub fn is_eligible(game: &GameRecord, play_modes: &[String], features: &[String]) -> bool {
    let modes_requested = !play_modes.is_empty();
    let modes_ok = modes_requested
        && play_modes.iter().any(|requested| {
            game.metadata
                .play_modes
                .iter()
                .any(|mode| fuzzy_contains(requested, mode))
        });

    if modes_requested && !modes_ok {
        return false;
    }

    if !features.is_empty() {
        let coop_waived = modes_ok && features.iter().any(|f| is_coop_like(f));
        let tag_matched = features.iter().any(|requested| {
            game.metadata
                .tags
                .iter()
                .any(|tag| fuzzy_contains(requested, tag))
        });

        if !coop_waived && !tag_matched {
            return false;
        }
    }

    true
}

pub struct FeatureStrategy {
    embedder: Arc<dyn EmbeddingModel>,
    corpus: Arc<CorpusService>,
}

impl FeatureStrategy {
    pub fn new(embedder: Arc<dyn EmbeddingModel>, corpus: Arc<CorpusService>) -> Self {
        Self { embedder, corpus }
    }
}

#[async_trait]
impl SearchStrategy for FeatureStrategy {
    fn name(&self) -> &'static str {
        "feature-search"
    }

    fn can_handle(&self, intent: &SearchIntent) -> bool {
        intent.intent_type == IntentType::Feature
            && (!intent.entities.features.is_empty() || !intent.entities.play_modes.is_empty())
    }

    async fn execute(&self, context: &SearchContext) -> Result<Vec<RankedGame>> {
        let play_modes = &context.intent.entities.play_modes;
        let features = &context.intent.entities.features;

        let query_embedding = self.embedder.encode(&context.query).await?;
        let games = self.corpus.ready_games().await?;

        let mut results: Vec<RankedGame> = Vec::new();
        for game in games.iter() {
            // 无结构化元数据的记录不参与特性过滤
            if !game.metadata.is_filterable() {
                continue;
            }
            if !is_eligible(game, play_modes, features) {
                continue;
            }

            let Some(embedding) = game.usable_embedding() else {
                continue;
            };
            if embedding.len() != query_embedding.len() {
                continue;
            }

            let similarity = cosine_similarity(&query_embedding, embedding);
            if similarity >= FEATURE_THRESHOLD {
                results.push(RankedGame::new(game.clone(), similarity));
            }
        }

        let ranked = rank_and_cap(results, MAX_RESULTS);
        debug!(
            "Feature strategy matched {} games (modes {:?}, features {:?})",
            ranked.len(),
            play_modes,
            features
        );
        Ok(ranked)
    }
}
