//! 混合检索策略
//!
//! 处理 hybrid 意图及多信号实体包：并发执行所有适用的子策略，
//! 按游戏键累积 (策略, 排名分, 权重) 合并。单个子策略失败降级为
//! 空贡献，绝不中断整次搜索。

use async_trait::async_trait;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::game::GameRecord;
use crate::models::intent::{IntentType, SearchIntent};
use crate::models::search::{RankedGame, SearchContext};
use crate::services::strategies::{MAX_RESULTS, SearchStrategy, rank_and_cap};

/// 排名分构成：位置项与原始相似度项的权重
pub const RANK_POSITION_WEIGHT: f32 = 0.4;
pub const RAW_SCORE_WEIGHT: f32 = 0.6;

/// 多策略奖励：每多出现一次 +0.1，封顶 +0.2
pub const MULTI_STRATEGY_BONUS_STEP: f32 = 0.1;
pub const MULTI_STRATEGY_BONUS_CAP: f32 = 0.2;

/// 策略权重：实体信号存在时对应策略加权
pub const DEFAULT_STRATEGY_WEIGHT: f32 = 1.0;
pub const GENRE_WEIGHT_BOOST: f32 = 1.3;
pub const FEATURE_WEIGHT_BOOST: f32 = 1.3;
pub const SIMILAR_WEIGHT_BOOST: f32 = 1.5;
pub const SEMANTIC_WEIGHT_BOOST: f32 = 1.2;

/// 语义策略加权的置信度门槛
pub const LOW_CONFIDENCE: f32 = 0.7;

pub struct HybridStrategy {
    semantic: Arc<dyn SearchStrategy>,
    similar: Arc<dyn SearchStrategy>,
    genre: Arc<dyn SearchStrategy>,
    feature: Arc<dyn SearchStrategy>,
}

struct MergedEntry {
    game: GameRecord,
    weighted_total: f32,
    appearances: usize,
}

impl HybridStrategy {
    pub fn new(
        semantic: Arc<dyn SearchStrategy>,
        similar: Arc<dyn SearchStrategy>,
        genre: Arc<dyn SearchStrategy>,
        feature: Arc<dyn SearchStrategy>,
    ) -> Self {
        Self {
            semantic,
            similar,
            genre,
            feature,
        }
    }

    /// 按实体信号挑选子策略；没有任何实体信号或意图本就是
    /// 语义/氛围类时，退回纯语义子策略。
    fn applicable(&self, intent: &SearchIntent) -> Vec<Arc<dyn SearchStrategy>> {
        let entities = &intent.entities;
        let mut selected: Vec<Arc<dyn SearchStrategy>> = Vec::new();

        if entities
            .reference_game
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
        {
            selected.push(self.similar.clone());
        }
        if !entities.genres.is_empty() {
            selected.push(self.genre.clone());
        }
        if !entities.features.is_empty() || !entities.play_modes.is_empty() {
            selected.push(self.feature.clone());
        }

        let semantic_signal = matches!(
            intent.intent_type,
            IntentType::Semantic | IntentType::Mood
        ) || entities.mood.as_deref().is_some_and(|m| !m.is_empty());

        if selected.is_empty() || semantic_signal {
            selected.push(self.semantic.clone());
        }

        selected
    }

    fn strategy_weight(name: &str, intent: &SearchIntent) -> f32 {
        let entities = &intent.entities;
        match name {
            "genre-search" if !entities.genres.is_empty() => GENRE_WEIGHT_BOOST,
            "feature-search"
                if !entities.features.is_empty() || !entities.play_modes.is_empty() =>
            {
                FEATURE_WEIGHT_BOOST
            }
            "similar-games"
                if entities
                    .reference_game
                    .as_deref()
                    .is_some_and(|n| !n.trim().is_empty()) =>
            {
                SIMILAR_WEIGHT_BOOST
            }
            "semantic-search" if intent.confidence < LOW_CONFIDENCE => SEMANTIC_WEIGHT_BOOST,
            _ => DEFAULT_STRATEGY_WEIGHT,
        }
    }

    /// 合并子策略结果。分数按游戏键累积，与子策略完成顺序无关。
    fn merge(
        contributions: Vec<(&'static str, Vec<RankedGame>)>,
        intent: &SearchIntent,
    ) -> Vec<RankedGame> {
        let mut merged: HashMap<String, MergedEntry> = HashMap::new();

        for (strategy_name, results) in contributions {
            let weight = Self::strategy_weight(strategy_name, intent);
            let count = results.len();

            for (rank, ranked) in results.into_iter().enumerate() {
                // 排名分 = 位置项 + 原始相似度项
                let rank_score = RANK_POSITION_WEIGHT * (1.0 - rank as f32 / count as f32)
                    + RAW_SCORE_WEIGHT * ranked.score;

                let entry = merged
                    .entry(ranked.game.app_id.clone())
                    .or_insert_with(|| MergedEntry {
                        game: ranked.game,
                        weighted_total: 0.0,
                        appearances: 0,
                    });
                entry.weighted_total += rank_score * weight;
                entry.appearances += 1;
            }
        }

        let results: Vec<RankedGame> = merged
            .into_values()
            .map(|entry| {
                let bonus = (MULTI_STRATEGY_BONUS_STEP * (entry.appearances - 1) as f32)
                    .min(MULTI_STRATEGY_BONUS_CAP);
                RankedGame::new(entry.game, entry.weighted_total + bonus)
            })
            .collect();

        rank_and_cap(results, MAX_RESULTS)
    }
}

#[async_trait]
impl SearchStrategy for HybridStrategy {
    fn name(&self) -> &'static str {
        "hybrid-search"
    }

    fn can_handle(&self, intent: &SearchIntent) -> bool {
        intent.intent_type == IntentType::Hybrid || intent.entities.non_empty_fields() > 1
    }

    async fn execute(&self, context: &SearchContext) -> Result<Vec<RankedGame>> {
        let strategies = self.applicable(&context.intent);
        debug!(
            "Hybrid fan-out to {} strategies for '{}'",
            strategies.len(),
            context.query
        );

        let executions = strategies.iter().map(|strategy| {
            let name = strategy.name();
            async move { (name, strategy.execute(context).await) }
        });

        let mut contributions: Vec<(&'static str, Vec<RankedGame>)> = Vec::new();
        for (name, outcome) in join_all(executions).await {
            match outcome {
                Ok(results) => contributions.push((name, results)),
                Err(e) => {
                    // 失败的子策略贡献空结果，不中断整次搜索
                    warn!("Hybrid sub-strategy {} failed: {}", name, e);
                    contributions.push((name, Vec::new()));
                }
            }
        }

        Ok(Self::merge(contributions, &context.intent))
    }
}
