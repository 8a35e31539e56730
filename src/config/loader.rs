use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use std::path::PathBuf;

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 搜索路径：
    /// 1. ./gamescout.toml
    /// 2. 环境变量
    pub fn load() -> Result<AppConfig, figment::Error> {
        let figment = Figment::from(figment::providers::Serialized::defaults(
            AppConfig::development(),
        ))
        .merge(Toml::file("gamescout.toml"))
        .merge(Env::prefixed("GAMESCOUT_").split("_").global());

        figment.extract()
    }

    /// 从指定路径加载配置
    pub fn load_from(path: PathBuf) -> Result<AppConfig, figment::Error> {
        let figment = Figment::from(figment::providers::Serialized::defaults(
            AppConfig::development(),
        ))
        .merge(Toml::file(path))
        .merge(Env::prefixed("GAMESCOUT_").split("_").global());

        figment.extract()
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.embedding.dimension == 0 {
            return Err(ConfigValidationError::InvalidDimension);
        }

        if config.corpus.backend == "http" && config.corpus.base_url.is_empty() {
            return Err(ConfigValidationError::MissingCorpusUrl);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("向量维度无效，必须大于 0")]
    InvalidDimension,

    #[error("语料库数据服务 URL 未配置")]
    MissingCorpusUrl,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("gamescout.toml")
}
