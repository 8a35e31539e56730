//! 相似游戏检索策略
//!
//! 处理带参照游戏实体的 similar 意图：以参照游戏名本身（而非整句查询）
//! 作为相似度锚点，并剔除标题与参照名互相包含的记录，避免回显参照游戏。

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

/// 相似游戏阈值
pub const SIMILAR_THRESHOLD: f32 = 0.2;

pub struct SimilarGamesStrategy {
    embedder: Arc<dyn EmbeddingModel>,
    corpus: Arc<CorpusService>,
}

impl SimilarGamesStrategy {
    pub fn new(embedder: Arc<dyn EmbeddingModel>, corpus: Arc<CorpusService>) -> Self {
        Self { embedder, corpus }
    }
}

#[async_trait]
impl SearchStrategy for SimilarGamesStrategy {
    fn name(&self) -> &'static str {
        "similar-games"
    }

    fn can_handle(&self, intent: &SearchIntent) -> bool {
        intent.intent_type == IntentType::Similar
            && intent
                .entities
                .reference_game
                .as_deref()
                .is_some_and(|name| !name.trim().is_empty())
    }

    async fn execute(&self, context: &SearchContext) -> Result<Vec<RankedGame>> {
        // 实体为空时退化为纯语义行为：用整句查询作锚点
        let anchor = context
            .intent
            .entities
            .reference_game
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(context.query.as_str());

        let anchor_embedding = self.embedder.encode(anchor).await?;
        let records = self.corpus.embedded_corpus().await?;

        let mut results: Vec<RankedGame> = Vec::new();
        for record in records.iter() {
            // 参照游戏自身不出现在结果里
            if fuzzy_contains(&record.game.title, anchor) {
                continue;
            }

            let Some(embedding) = record.usable_embedding() else {
                continue;
            };
            if embedding.len() != anchor_embedding.len() {
                continue;
            }

            let similarity = cosine_similarity(&anchor_embedding, embedding);
            if similarity >= SIMILAR_THRESHOLD {
                results.push(RankedGame::new(record.game.clone(), similarity));
            }
        }

        let ranked = rank_and_cap(results, MAX_RESULTS);
        debug!(
            "Similar-games strategy matched {} games for anchor '{}'",
            ranked.len(),
            anchor
        );
        Ok(ranked)
    }
}
