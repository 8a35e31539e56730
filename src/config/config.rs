use serde::{Deserialize, Serialize};

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
    /// 请求超时（秒）
    pub request_timeout: u64,
    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
}

/// 嵌入模型配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// 模型名称
    pub model_name: String,
    /// 向量维度
    pub dimension: usize,
    /// Embedding 后端类型: "http" 或 "simple"
    pub backend: String,
    /// Embedding 服务地址
    pub base_url: String,
    /// 请求超时（秒）
    pub timeout: u64,
}

/// 文本生成模型配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// 模型名称
    pub model_name: String,
    /// 后端类型: "http" 或 "simple"
    pub backend: String,
    /// 服务地址
    pub base_url: String,
    /// 请求超时（秒）
    pub timeout: u64,
    /// 采样温度（分类和打分需要接近 0 的确定性输出）
    pub temperature: f32,
}

/// 游戏语料库配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorpusConfig {
    /// 后端类型: "http" 或 "static"
    pub backend: String,
    /// 数据服务地址
    pub base_url: String,
    /// 请求超时（秒）
    pub timeout: u64,
}

/// 搜索行为配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// 是否启用 LLM 重排序（语义策略）
    pub rerank_enabled: bool,
    /// 是否启用 HyDE 查询扩展
    pub hyde_enabled: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rerank_enabled: true,
            hyde_enabled: true,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 嵌入模型配置
    pub embedding: EmbeddingConfig,
    /// 文本生成模型配置
    pub llm: LlmConfig,
    /// 游戏语料库配置
    pub corpus: CorpusConfig,
    /// 搜索行为配置
    pub search: SearchConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
                request_timeout: 30,
                max_request_size: 1024 * 1024,
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: true,
            },
            embedding: EmbeddingConfig {
                model_name: "text-embedding-3-small".into(),
                dimension: 384,
                backend: "simple".into(),
                base_url: "http://localhost:11434".into(),
                timeout: 60,
            },
            llm: LlmConfig {
                model_name: "gpt-4o-mini".into(),
                backend: "simple".into(),
                base_url: "http://localhost:11434".into(),
                timeout: 60,
                temperature: 0.1,
            },
            corpus: CorpusConfig {
                backend: "static".into(),
                base_url: "http://localhost:9000".into(),
                timeout: 30,
            },
            // simple 后端不支持结构化输出，开发环境默认关闭重排序
            search: SearchConfig {
                rerank_enabled: false,
                hyde_enabled: true,
            },
            app_name: "gamescout".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.embedding.backend = "http".into();
        config.llm.backend = "http".into();
        config.corpus.backend = "http".into();
        config.search.rerank_enabled = true;
        config
    }
}
