//! 语义检索策略
//!
//! 处理 semantic 与 mood 两类意图：查询向量对全量语料做余弦扫描。
//! 短查询先经 HyDE 扩展；配置启用时对头部候选做 LLM 重排序。

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::corpus::CorpusService;
use crate::error::Result;
use crate::index::embedding::EmbeddingModel;
use crate::index::similarity::cosine_similarity;
use crate::models::intent::{IntentType, SearchIntent};
use crate::models::search::{RankedGame, SearchContext};
use crate::services::hyde::HydeExpander;
use crate::services::reranker::Reranker;
use crate::services::strategies::{MAX_RESULTS, SearchStrategy, rank_and_cap};

/// 极短查询（≤5 字符）信号弱，放宽阈值换召回
pub const SHORT_QUERY_THRESHOLD: f32 = 0.15;
pub const SHORT_QUERY_MAX_CHARS: usize = 5;

/// mood 查询语义漂移大，收紧阈值保精度
pub const MOOD_THRESHOLD: f32 = 0.30;

/// 常规语义阈值
pub const BASE_THRESHOLD: f32 = 0.25;

pub struct SemanticStrategy {
    embedder: Arc<dyn EmbeddingModel>,
    corpus: Arc<CorpusService>,
    hyde: Option<Arc<HydeExpander>>,
    reranker: Option<Arc<Reranker>>,
}

impl SemanticStrategy {
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        corpus: Arc<CorpusService>,
        hyde: Option<Arc<HydeExpander>>,
        reranker: Option<Arc<Reranker>>,
    ) -> Self {
        Self {
            embedder,
            corpus,
            hyde,
            reranker,
        }
    }

    fn threshold_for(query: &str, intent: &SearchIntent) -> f32 {
        if query.chars().count() <= SHORT_QUERY_MAX_CHARS {
            SHORT_QUERY_THRESHOLD
        } else if intent.intent_type == IntentType::Mood {
            MOOD_THRESHOLD
        } else {
            BASE_THRESHOLD
        }
    }
}

#[async_trait]
impl SearchStrategy for SemanticStrategy {
    fn name(&self) -> &'static str {
        "semantic-search"
    }

    fn can_handle(&self, intent: &SearchIntent) -> bool {
        matches!(
            intent.intent_type,
            IntentType::Semantic | IntentType::Mood
        )
    }

    async fn execute(&self, context: &SearchContext) -> Result<Vec<RankedGame>> {
        let threshold = Self::threshold_for(&context.query, &context.intent);

        let raw_embedding = self.embedder.encode(&context.query).await?;

        let query_vector = match &self.hyde {
            Some(hyde) if hyde.should_expand(&context.query) => {
                hyde.expand(&context.query, &raw_embedding).await
            }
            _ => raw_embedding,
        };

        let records = self.corpus.embedded_corpus().await?;

        let mut results: Vec<RankedGame> = Vec::new();
        for record in records.iter() {
            let Some(embedding) = record.usable_embedding() else {
                continue;
            };
            if embedding.len() != query_vector.len() {
                continue;
            }

            let similarity = cosine_similarity(&query_vector, embedding);
            if similarity >= threshold {
                results.push(RankedGame::new(record.game.clone(), similarity));
            }
        }

        let ranked = rank_and_cap(results, MAX_RESULTS);
        debug!(
            "Semantic strategy matched {} games (threshold {:.2})",
            ranked.len(),
            threshold
        );

        match &self.reranker {
            Some(reranker) => reranker.rerank(&context.query, ranked).await,
            None => Ok(ranked),
        }
    }
}
