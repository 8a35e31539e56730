//! HyDE 查询扩展服务
//!
//! 短查询（≤2 词）的原始向量过于稀疏，召回质量差。
//! 通过 LLM 合成一段描述性短文，将其向量与原始查询向量线性混合。
//! 任何生成/编码失败都静默回退到未混合的原始向量，绝不向调用方报错。

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::index::embedding::EmbeddingModel;
use crate::llm::TextGenerator;

/// 触发扩展的最大词数
pub const SHORT_QUERY_MAX_TOKENS: usize = 2;

/// 混合权重。合成短文承载主要语义信号，原始查询保底。
/// 权重经线上调参固定，不可改动。
pub const RAW_QUERY_WEIGHT: f32 = 0.35;
pub const HYDE_PASSAGE_WEIGHT: f32 = 0.65;

/// 合成短文的采样温度
const HYDE_TEMPERATURE: f32 = 0.7;

const HYDE_SYSTEM_PROMPT: &str = "You describe indie games. Given a search query, write one \
descriptive passage of at most 24 words capturing what such a game plays like. Emphasize \
mechanics and visual style over vague mood words. Output only the passage.";

/// HyDE 查询扩展器
///
/// 合成短文的向量按规范化查询无限期缓存（进程生命周期内不驱逐；
/// 键空间远小于进程生命周期内的查询量，属有意取舍）。
pub struct HydeExpander {
    generator: Arc<dyn TextGenerator>,
    embedder: Arc<dyn EmbeddingModel>,
    passage_cache: DashMap<String, Vec<f32>>,
}

impl HydeExpander {
    pub fn new(generator: Arc<dyn TextGenerator>, embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            generator,
            embedder,
            passage_cache: DashMap::new(),
        }
    }

    /// 查询是否需要扩展（词数 ≤ 2）
    pub fn should_expand(&self, query: &str) -> bool {
        query.split_whitespace().count() <= SHORT_QUERY_MAX_TOKENS
    }

    /// 返回混合向量；失败时返回原始向量的拷贝
    pub async fn expand(&self, query: &str, raw_embedding: &[f32]) -> Vec<f32> {
        let key = query.trim().to_lowercase();

        let passage_embedding = match self.passage_cache.get(&key) {
            Some(cached) => cached.clone(),
            None => match self.synthesize_embedding(&key).await {
                Some(embedding) => {
                    self.passage_cache.insert(key.clone(), embedding.clone());
                    embedding
                }
                None => {
                    debug!("HyDE expansion skipped for query '{}'", key);
                    return raw_embedding.to_vec();
                }
            },
        };

        if passage_embedding.len() != raw_embedding.len() {
            warn!(
                "HyDE passage embedding dimension mismatch: {} vs {}",
                passage_embedding.len(),
                raw_embedding.len()
            );
            return raw_embedding.to_vec();
        }

        raw_embedding
            .iter()
            .zip(passage_embedding.iter())
            .map(|(raw, passage)| RAW_QUERY_WEIGHT * raw + HYDE_PASSAGE_WEIGHT * passage)
            .collect()
    }

    async fn synthesize_embedding(&self, query: &str) -> Option<Vec<f32>> {
        let passage = self
            .generator
            .generate(HYDE_SYSTEM_PROMPT, query, HYDE_TEMPERATURE)
            .await
            .ok()?;

        self.embedder.encode(&passage).await.ok()
    }
}
