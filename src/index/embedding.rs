//! 嵌入模型服务
//!
//! 外部协作者：将文本编码为固定维度的稠密向量。
//! 提供 HTTP 客户端实现和进程内确定性实现（开发/测试用）。

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::config::EmbeddingConfig;
use crate::error::{AppError, Result};

#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;
    async fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
    fn dimension(&self) -> usize;
}

/// 进程内确定性嵌入模型
///
/// 相同文本恒产出相同向量：词经 FNV-1a 哈希映射到若干维度，
/// 文本向量为词向量均值。共享词汇的文本因此具有正相似度，
/// 足以支撑不依赖网络的开发与测试。
pub struct SimpleEmbeddingModel {
    overrides: HashMap<String, Vec<f32>>,
    dimension: usize,
}

impl SimpleEmbeddingModel {
    pub fn new(dimension: usize) -> Self {
        Self {
            overrides: HashMap::new(),
            dimension,
        }
    }

    /// 注册固定词向量（测试中用于构造已知的相似度关系）
    pub fn with_word_embedding(mut self, word: &str, embedding: &[f32]) -> Self {
        if embedding.len() == self.dimension {
            self.overrides
                .insert(word.to_lowercase(), embedding.to_vec());
        }
        self
    }

    fn word_vector(&self, word: &str) -> Vec<f32> {
        if let Some(v) = self.overrides.get(word) {
            return v.clone();
        }

        // FNV-1a 哈希展开为稀疏确定性向量
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }

        let mut vector = vec![0.0; self.dimension];
        for i in 0..4u64 {
            let idx = (hash.rotate_left((i * 16) as u32) as usize) % self.dimension;
            vector[idx] = 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingModel for SimpleEmbeddingModel {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let words: Vec<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();

        if words.is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let mut sum = vec![0.0; self.dimension];
        for word in &words {
            let embedding = self.word_vector(word);
            for (i, val) in embedding.iter().enumerate() {
                sum[i] += val;
            }
        }

        for val in &mut sum {
            *val /= words.len() as f32;
        }

        Ok(sum)
    }

    async fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for text in texts {
            let embedding = self.encode(text).await?;
            embeddings.push(embedding);
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// HTTP Embedding 模型客户端（Ollama 兼容接口）
pub struct HttpEmbeddingModel {
    client: reqwest::Client,
    model_name: String,
    base_url: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl HttpEmbeddingModel {
    pub fn new(base_url: &str, model_name: &str, dimension: usize, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Embedding(e.to_string()))?;

        Ok(Self {
            client,
            model_name: model_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            dimension,
        })
    }

    async fn embed(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&serde_json::json!({
                "model": self.model_name,
                "input": texts,
                "truncate": true
            }))
            .send()
            .await
            .map_err(|e| AppError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "embedding request failed: {}",
                error_text
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(e.to_string()))?;
        Ok(embed_response.embeddings)
    }
}

#[async_trait]
impl EmbeddingModel for HttpEmbeddingModel {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed(vec![text]).await?;
        Ok(embeddings
            .into_iter()
            .next()
            .unwrap_or_else(|| vec![0.0; self.dimension]))
    }

    async fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        // 分批处理，避免单次请求过大
        let batch_size = 32;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(batch_size) {
            let chunk_vec: Vec<&str> = chunk.to_vec();
            let embeddings = self.embed(chunk_vec).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// 根据配置创建嵌入模型
pub fn create_embedding_model(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingModel>> {
    match config.backend.as_str() {
        "http" => {
            let model = HttpEmbeddingModel::new(
                &config.base_url,
                &config.model_name,
                config.dimension,
                config.timeout,
            )?;
            Ok(Arc::new(model))
        }
        _ => {
            let model = SimpleEmbeddingModel::new(config.dimension);
            Ok(Arc::new(model))
        }
    }
}
