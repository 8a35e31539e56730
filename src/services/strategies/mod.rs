//! 检索策略模块
//!
//! 每个策略针对一种意图类型实现"检索 + 本地排序"。
//! Orchestrator 持有固定顺序的策略列表，取第一个 can_handle 的策略执行。

pub mod feature;
pub mod genre;
pub mod hybrid;
pub mod semantic;
pub mod similar;

pub use feature::FeatureStrategy;
pub use genre::GenreStrategy;
pub use hybrid::HybridStrategy;
pub use semantic::SemanticStrategy;
pub use similar::SimilarGamesStrategy;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::Result;
use crate::models::search::{RankedGame, SearchContext};

/// 单策略最大结果数
pub const MAX_RESULTS: usize = 50;

/// 检索策略能力接口
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    /// 策略名（出现在响应元数据与混合合并权重表中）
    fn name(&self) -> &'static str;

    /// 是否能处理该意图
    fn can_handle(&self, intent: &crate::models::intent::SearchIntent) -> bool;

    /// 执行检索并返回本地排序后的结果
    async fn execute(&self, context: &SearchContext) -> Result<Vec<RankedGame>>;
}

/// 通用收尾：按分数降序（平分按 app_id 字典序）、按标识去重
/// （首次出现者保留）、截断到上限。
pub fn rank_and_cap(mut results: Vec<RankedGame>, cap: usize) -> Vec<RankedGame> {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.game.app_id.cmp(&b.game.app_id))
    });

    let mut seen: HashSet<String> = HashSet::with_capacity(results.len());
    results.retain(|r| seen.insert(r.game.app_id.clone()));
    results.truncate(cap);
    results
}

/// 大小写不敏感的双向子串匹配（特性/游玩模式/标题的模糊比对共用）
pub fn fuzzy_contains(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::GameRecord;

    fn ranked(app_id: &str, score: f32) -> RankedGame {
        RankedGame::new(GameRecord::new(app_id, app_id, ""), score)
    }

    #[test]
    fn test_rank_and_cap_sorts_descending() {
        let results = rank_and_cap(vec![ranked("a", 0.2), ranked("b", 0.9), ranked("c", 0.5)], 50);
        let ids: Vec<&str> = results.iter().map(|r| r.game.app_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_rank_and_cap_dedup_first_wins() {
        let results = rank_and_cap(vec![ranked("a", 0.9), ranked("a", 0.5)], 50);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 0.9);
    }

    #[test]
    fn test_rank_and_cap_tie_break_deterministic() {
        let results = rank_and_cap(vec![ranked("z", 0.5), ranked("a", 0.5)], 50);
        let ids: Vec<&str> = results.iter().map(|r| r.game.app_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z"]);
    }

    #[test]
    fn test_rank_and_cap_truncates() {
        let many: Vec<RankedGame> = (0..80).map(|i| ranked(&format!("{:03}", i), 0.5)).collect();
        assert_eq!(rank_and_cap(many, MAX_RESULTS).len(), MAX_RESULTS);
    }

    #[test]
    fn test_fuzzy_contains_both_directions() {
        assert!(fuzzy_contains("Co-Op", "co-op campaign"));
        assert!(fuzzy_contains("local co-op", "CO-OP"));
        assert!(!fuzzy_contains("racing", "puzzle"));
    }
}
