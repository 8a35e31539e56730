//! TTL 缓存模块
//!
//! 通用键值缓存：意图分类结果、策略响应、语料库快照共用。
//! 条目带绝对过期时间；读取时惰性驱逐，另有每分钟一次的后台清扫。

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// 默认 TTL：60 秒
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// 后台清扫间隔：60 秒
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// 缓存条目
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// 绝对过期时间
    expires_at: Instant,
    metadata: Option<HashMap<String, String>>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration, metadata: Option<HashMap<String, String>>) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
            metadata,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// 缓存统计
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// 带 TTL 的并发键值缓存
///
/// DashMap 保证多请求并发读写安全；同键写竞争为 last-write-wins，
/// 对相同计算结果无害。
pub struct TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V> Default for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// 读取。过期条目在读取时被驱逐，绝不返回过期值。
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.entries.remove(key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry.value.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// 写入（默认 TTL）
    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// 写入（指定 TTL）
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl, None));
    }

    /// 写入（指定 TTL 与附加元信息）
    pub fn set_with_metadata(
        &self,
        key: &str,
        value: V,
        ttl: Duration,
        metadata: HashMap<String, String>,
    ) {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl, Some(metadata)));
    }

    /// 键是否存在且未过期（过期条目同样惰性驱逐）
    pub fn has(&self, key: &str) -> bool {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.entries.remove(key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            return true;
        }
        false
    }

    /// 读取条目元信息
    pub fn metadata(&self, key: &str) -> Option<HashMap<String, String>> {
        self.entries
            .get(key)
            .filter(|e| !e.is_expired())
            .and_then(|e| e.metadata.clone())
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 清除所有已过期条目，返回驱逐数量
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            self.evictions.fetch_add(purged as u64, Ordering::Relaxed);
        }
        purged
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    /// 周期清扫任务，调用方负责 spawn
    pub async fn sweep_task(self: Arc<Self>) {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let purged = self.purge_expired();
            debug!(
                "Cache sweep: {} purged, {} entries remain",
                purged,
                self.entries.len()
            );
        }
    }
}
