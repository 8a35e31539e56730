//! LLM 重排序服务
//!
//! 对语义检索的头部候选做一轮高成本相关性打分。
//! 打分按 (查询, 候选) 无限期缓存，只有未缓存的候选才会发送给模型。

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::llm::TextGenerator;
use crate::models::search::RankedGame;

/// 进入重排序的最大候选数
pub const RERANK_CANDIDATES: usize = 40;

/// 重排序保留阈值
pub const RERANK_THRESHOLD: f32 = 0.4;

/// 重排序后的最大结果数
pub const RERANK_MAX_RESULTS: usize = 20;

const RERANK_SYSTEM_PROMPT: &str = "You score indie games for relevance to a search query. \
For each numbered game return one relevance score between 0 and 1. Respond with a JSON array \
of numbers, one per game, in the order given. No other output.";

/// LLM 重排序器
///
/// 打分缓存进程生命周期内不驱逐（键空间 = 查询 × 候选，
/// 对单进程部署规模可接受，属有意取舍）。
pub struct Reranker {
    generator: Arc<dyn TextGenerator>,
    score_cache: DashMap<String, f32>,
}

impl Reranker {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            score_cache: DashMap::new(),
        }
    }

    /// 重排序候选列表。
    ///
    /// 上游结构化打分失败不做静默恢复：错误向上传播，
    /// 由 Hybrid 合并边界或 Orchestrator 边界降级处理。
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RankedGame>,
    ) -> Result<Vec<RankedGame>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let normalized_query = query.trim().to_lowercase();
        let mut shortlist: Vec<RankedGame> = candidates;
        shortlist.truncate(RERANK_CANDIDATES);

        // 只把未缓存的候选发给模型，提交顺序即列表顺序
        let mut uncached: Vec<usize> = Vec::new();
        for (idx, candidate) in shortlist.iter().enumerate() {
            let key = cache_key(&normalized_query, &candidate.game.app_id);
            if !self.score_cache.contains_key(&key) {
                uncached.push(idx);
            }
        }

        if !uncached.is_empty() {
            let scores = self.score_batch(query, &shortlist, &uncached).await?;
            for (pos, idx) in uncached.iter().enumerate() {
                let key = cache_key(&normalized_query, &shortlist[*idx].game.app_id);
                self.score_cache.insert(key, scores[pos]);
            }
        }

        let mut scored: Vec<(RankedGame, f32)> = shortlist
            .into_iter()
            .map(|candidate| {
                let key = cache_key(&normalized_query, &candidate.game.app_id);
                let score = self
                    .score_cache
                    .get(&key)
                    .map(|entry| *entry)
                    .unwrap_or(0.0);
                (candidate, score)
            })
            .collect();

        // 阈值过滤后按打分降序；平分依次按原始相似度、标识字典序，保证确定性
        scored.retain(|(_, score)| *score >= RERANK_THRESHOLD);
        scored.sort_by(|(a, score_a), (b, score_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.game.app_id.cmp(&b.game.app_id))
        });
        scored.truncate(RERANK_MAX_RESULTS);

        debug!(
            "Rerank kept {} candidates for query '{}'",
            scored.len(),
            query
        );

        Ok(scored
            .into_iter()
            .map(|(candidate, score)| RankedGame::new(candidate.game, score))
            .collect())
    }

    async fn score_batch(
        &self,
        query: &str,
        shortlist: &[RankedGame],
        uncached: &[usize],
    ) -> Result<Vec<f32>> {
        let mut listing = String::new();
        for (pos, idx) in uncached.iter().enumerate() {
            let game = &shortlist[*idx].game;
            listing.push_str(&format!(
                "{}. {} — {}\n",
                pos + 1,
                game.title,
                truncate(&game.description, 200)
            ));
        }

        let schema = serde_json::json!({
            "type": "array",
            "items": {"type": "number", "minimum": 0.0, "maximum": 1.0}
        });
        let user_prompt = format!("Query: {}\n\nGames:\n{}", query, listing);

        let value = self
            .generator
            .generate_structured(&schema, RERANK_SYSTEM_PROMPT, &user_prompt)
            .await?;

        let scores: Vec<f32> = serde_json::from_value(value)
            .map_err(|e| AppError::Rerank(format!("score array parse failed: {}", e)))?;

        if scores.len() != uncached.len() {
            return Err(AppError::Rerank(format!(
                "expected {} scores, got {}",
                uncached.len(),
                scores.len()
            )));
        }

        Ok(scores.into_iter().map(|s| s.clamp(0.0, 1.0)).collect())
    }

    /// 缓存条目数（监控用）
    pub fn cached_scores(&self) -> usize {
        self.score_cache.len()
    }
}

fn cache_key(normalized_query: &str, app_id: &str) -> String {
    format!("rerank:{}:{}", normalized_query, app_id)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect::<String>() + "..."
    }
}
