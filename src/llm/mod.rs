//! 文本生成模型服务
//!
//! 外部协作者：意图分类、HyDE 扩展和重排序共用的生成接口。
//! 结构化变体要求输出严格匹配给定 JSON Schema，否则报错。

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::config::LlmConfig;
use crate::error::{AppError, Result};

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 自由文本生成
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String>;

    /// 结构化生成：输出必须解析为符合 schema 的 JSON，失败即报错
    async fn generate_structured(
        &self,
        schema: &serde_json::Value,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<serde_json::Value>;
}

/// 进程内确定性生成器（开发/测试用）
///
/// 自由生成回显提示词尾部并附加固定措辞；结构化生成始终报错，
/// 让调用方走各自的确定性回退路径。
pub struct SimpleTextGenerator;

#[async_trait]
impl TextGenerator for SimpleTextGenerator {
    async fn generate(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _temperature: f32,
    ) -> Result<String> {
        Ok(format!(
            "{} with tight mechanics and a distinctive visual style",
            user_prompt.trim()
        ))
    }

    async fn generate_structured(
        &self,
        _schema: &serde_json::Value,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<serde_json::Value> {
        Err(AppError::Generation(
            "simple backend does not support structured output".to_string(),
        ))
    }
}

/// HTTP 文本生成客户端（Ollama 兼容 chat 接口）
pub struct HttpTextGenerator {
    client: reqwest::Client,
    model_name: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

impl HttpTextGenerator {
    pub fn new(base_url: &str, model_name: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Generation(e.to_string()))?;

        Ok(Self {
            client,
            model_name: model_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn chat(&self, body: serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "chat request failed: {}",
                error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;
        Ok(chat_response.message.content)
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String> {
        self.chat(serde_json::json!({
            "model": self.model_name,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "stream": false,
            "options": {"temperature": temperature}
        }))
        .await
    }

    async fn generate_structured(
        &self,
        schema: &serde_json::Value,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<serde_json::Value> {
        let content = self
            .chat(serde_json::json!({
                "model": self.model_name,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt}
                ],
                "stream": false,
                // 结构化输出需要确定性，温度固定接近零
                "options": {"temperature": 0.0},
                "format": schema
            }))
            .await?;

        serde_json::from_str(&content)
            .map_err(|e| AppError::Generation(format!("structured output parse failed: {}", e)))
    }
}

/// 根据配置创建文本生成器
pub fn create_text_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.backend.as_str() {
        "http" => {
            let generator =
                HttpTextGenerator::new(&config.base_url, &config.model_name, config.timeout)?;
            Ok(Arc::new(generator))
        }
        _ => Ok(Arc::new(SimpleTextGenerator)),
    }
}
