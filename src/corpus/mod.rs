//! 游戏语料库模块
//!
//! 外部协作者：可查询的游戏记录集合。核心只读，
//! 通过 TTL 快照缓存避免每次请求重新拉取。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::TtlCache;
use crate::config::config::CorpusConfig;
use crate::error::{AppError, Result};
use crate::models::game::{DiscoverySource, EnrichedRecord, GameMetadata, GameRecord};

/// 语料库快照 TTL：5 分钟
pub const CORPUS_SNAPSHOT_TTL: Duration = Duration::from_secs(300);

const READY_GAMES_KEY: &str = "corpus:ready";
const EMBEDDED_CORPUS_KEY: &str = "corpus:embedded";

/// 语料库加载接口
///
/// 两种形态服务不同策略：ready 视图按 Steam 元数据组织，
/// embedded 视图按发现来源组织。
#[async_trait]
pub trait CorpusLoader: Send + Sync {
    async fn load_ready_games(&self) -> Result<Vec<GameRecord>>;
    async fn load_embedded_corpus(&self) -> Result<Vec<EnrichedRecord>>;
}

/// HTTP 语料库加载器（数据服务客户端）
pub struct HttpCorpusLoader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCorpusLoader {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Corpus(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| AppError::Corpus(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Corpus(format!(
                "corpus request failed with status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Corpus(e.to_string()))
    }
}

#[async_trait]
impl CorpusLoader for HttpCorpusLoader {
    async fn load_ready_games(&self) -> Result<Vec<GameRecord>> {
        self.fetch("/games/ready").await
    }

    async fn load_embedded_corpus(&self) -> Result<Vec<EnrichedRecord>> {
        self.fetch("/games/embedded").await
    }
}

/// 静态语料库加载器（开发/测试用）
pub struct StaticCorpusLoader {
    games: Vec<GameRecord>,
}

impl StaticCorpusLoader {
    pub fn new(games: Vec<GameRecord>) -> Self {
        Self { games }
    }
}

#[async_trait]
impl CorpusLoader for StaticCorpusLoader {
    async fn load_ready_games(&self) -> Result<Vec<GameRecord>> {
        Ok(self.games.clone())
    }

    async fn load_embedded_corpus(&self) -> Result<Vec<EnrichedRecord>> {
        Ok(self
            .games
            .iter()
            .map(|game| EnrichedRecord {
                source: game.source.clone(),
                embedding: game.embedding.clone().unwrap_or_default(),
                game: game.clone(),
            })
            .collect())
    }
}

/// 语料库服务：加载器 + 快照缓存
///
/// 快照以 Arc 存储，缓存命中只付指针克隆的代价。
pub struct CorpusService {
    loader: Arc<dyn CorpusLoader>,
    ready_cache: TtlCache<Arc<Vec<GameRecord>>>,
    embedded_cache: TtlCache<Arc<Vec<EnrichedRecord>>>,
}

impl CorpusService {
    pub fn new(loader: Arc<dyn CorpusLoader>) -> Self {
        Self {
            loader,
            ready_cache: TtlCache::new(CORPUS_SNAPSHOT_TTL),
            embedded_cache: TtlCache::new(CORPUS_SNAPSHOT_TTL),
        }
    }

    /// Steam 元数据视图（快照缓存 5 分钟）
    pub async fn ready_games(&self) -> Result<Arc<Vec<GameRecord>>> {
        if let Some(snapshot) = self.ready_cache.get(READY_GAMES_KEY) {
            return Ok(snapshot);
        }

        let games = Arc::new(self.loader.load_ready_games().await?);
        debug!("Corpus snapshot loaded: {} ready games", games.len());
        self.ready_cache.set(READY_GAMES_KEY, games.clone());
        Ok(games)
    }

    /// 发现来源视图（快照缓存 5 分钟）
    pub async fn embedded_corpus(&self) -> Result<Arc<Vec<EnrichedRecord>>> {
        if let Some(snapshot) = self.embedded_cache.get(EMBEDDED_CORPUS_KEY) {
            return Ok(snapshot);
        }

        let records = Arc::new(self.loader.load_embedded_corpus().await?);
        debug!(
            "Corpus snapshot loaded: {} embedded records",
            records.len()
        );
        self.embedded_cache.set(EMBEDDED_CORPUS_KEY, records.clone());
        Ok(records)
    }

    /// 失效快照，下次访问重新拉取
    pub fn invalidate(&self) {
        self.ready_cache.clear();
        self.embedded_cache.clear();
    }
}

/// 根据配置创建语料库加载器
pub fn create_corpus_loader(config: &CorpusConfig) -> Result<Arc<dyn CorpusLoader>> {
    match config.backend.as_str() {
        "http" => {
            let loader = HttpCorpusLoader::new(&config.base_url, config.timeout)?;
            Ok(Arc::new(loader))
        }
        _ => Ok(Arc::new(StaticCorpusLoader::new(sample_games()))),
    }
}

/// 开发环境内置样例目录（无嵌入向量，启动时由调用方编码）
pub fn sample_games() -> Vec<GameRecord> {
    let entries: [(&str, &str, &str, &[&str], &[&str], &str, bool); 6] = [
        (
            "2300320",
            "Ember Vale",
            "A cozy farming sim where you restore a volcanic valley, grow rare crops and befriend fire spirits.",
            &["farming", "simulation", "cozy", "relaxing"],
            &["single-player"],
            "$14.99",
            false,
        ),
        (
            "2318790",
            "Circuit Breakers",
            "Fast-paced roguelike deckbuilder about overclocking robots in procedurally generated arenas.",
            &["roguelike", "deckbuilder", "strategy"],
            &["single-player"],
            "$19.99",
            false,
        ),
        (
            "2287350",
            "Moth Light",
            "Atmospheric metroidvania platformer set in a decaying cathedral of living light.",
            &["metroidvania", "platformer", "atmospheric"],
            &["single-player"],
            "$9.99",
            false,
        ),
        (
            "2401180",
            "Potion Partners",
            "Chaotic co-op alchemy where two to four brewers race absurd orders in a shared kitchen.",
            &["co-op", "party", "casual"],
            &["co-op", "multiplayer", "local co-op"],
            "Free To Play",
            true,
        ),
        (
            "2355520",
            "Starlane Tycoon",
            "Build interplanetary trade routes and out-negotiate rival corporations in this strategy sim.",
            &["strategy", "simulation", "economy"],
            &["single-player", "multiplayer"],
            "$24.99",
            false,
        ),
        (
            "2390010",
            "Grim Harvest",
            "Action roguelite about a scythe-wielding farmhand reaping cursed fields by night.",
            &["roguelite", "action", "dark"],
            &["single-player"],
            "$12.99",
            false,
        ),
    ];

    entries
        .into_iter()
        .map(|(app_id, title, description, tags, play_modes, price, is_free)| {
            let mut game = GameRecord::new(app_id, title, description);
            game.metadata = GameMetadata {
                tags: tags.iter().map(|s| s.to_string()).collect(),
                play_modes: play_modes.iter().map(|s| s.to_string()).collect(),
                price: price.to_string(),
                is_free,
                release_status: Default::default(),
            };
            game.source = DiscoverySource::default();
            game
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CorpusLoader for CountingLoader {
        async fn load_ready_games(&self) -> Result<Vec<GameRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_games())
        }

        async fn load_embedded_corpus(&self) -> Result<Vec<EnrichedRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_snapshot_cached_across_calls() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let service = CorpusService::new(loader.clone());

        let first = service.ready_games().await.unwrap();
        let second = service.ready_games().await.unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let service = CorpusService::new(loader.clone());

        service.ready_games().await.unwrap();
        service.invalidate();
        service.ready_games().await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    struct FailingLoader;

    #[async_trait]
    impl CorpusLoader for FailingLoader {
        async fn load_ready_games(&self) -> Result<Vec<GameRecord>> {
            Err(AppError::Corpus("data store unreachable".to_string()))
        }

        async fn load_embedded_corpus(&self) -> Result<Vec<EnrichedRecord>> {
            Err(AppError::Corpus("data store unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_load_failure_propagates() {
        let service = CorpusService::new(Arc::new(FailingLoader));
        let err = service.ready_games().await.unwrap_err();
        assert!(matches!(err, AppError::Corpus(_)));
    }

    #[tokio::test]
    async fn test_static_loader_builds_embedded_view() {
        let mut games = sample_games();
        games[0].embedding = Some(vec![0.5; 8]);
        let loader = StaticCorpusLoader::new(games);

        let records = loader.load_embedded_corpus().await.unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].embedding.len(), 8);
    }
}
