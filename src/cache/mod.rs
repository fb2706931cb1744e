use anyhow::Result;
use md5::{Digest, Md5};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::CacheConfig;

/// 生成输入指纹（MD5哈希）
pub fn fingerprint(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 缓存键：阶段名 + 输入指纹 + 并发设置
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub stage: &'static str,
    pub fingerprint: String,
    pub concurrency: usize,
}

impl CacheKey {
    pub fn new(stage: &'static str, fingerprint: String, concurrency: usize) -> Self {
        Self {
            stage,
            fingerprint,
            concurrency,
        }
    }
}

/// 缓存条目
struct CacheSlot {
    value: Value,
    created_at: Instant,
}

/// 缓存统计
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub writes: usize,
}

/// 进程级时间盒缓存
///
/// 昂贵的阶段计算（搜索、抓取）按复合键记忆化，过期条目视为不存在，
/// 在下一次未命中时被覆盖，不做后台清理。失败的计算永远不会入缓存。
pub struct CacheStore {
    config: CacheConfig,
    entries: RwLock<HashMap<CacheKey, CacheSlot>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    writes: AtomicUsize,
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// 配置的默认缓存有效期
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_seconds)
    }

    /// 读取命中缓存则直接返回，否则执行计算并在成功时写入
    ///
    /// 相同键的并发未命中可能各自计算一次（至少一次语义），后写覆盖前写。
    pub async fn get_or_compute<T, F, Fut>(&self, key: CacheKey, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.config.enabled {
            return compute().await;
        }

        if let Some(value) = self.lookup::<T>(&key, ttl).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // 失败直接向上传播，不写入任何条目
        let value = compute().await?;

        let serialized = serde_json::to_value(&value)?;
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheSlot {
                value: serialized,
                created_at: Instant::now(),
            },
        );
        self.writes.fetch_add(1, Ordering::Relaxed);

        Ok(value)
    }

    /// 查找未过期的条目，过期条目视为不存在
    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey, ttl: Duration) -> Option<T> {
        let entries = self.entries.read().await;
        let slot = entries.get(key)?;
        if slot.created_at.elapsed() >= ttl {
            return None;
        }
        serde_json::from_value(slot.value.clone()).ok()
    }

    /// 获取缓存统计
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    /// 测试专用：把某个条目的创建时间向过去推移，模拟TTL流逝
    #[cfg(test)]
    pub(crate) async fn backdate(&self, key: &CacheKey, by: Duration) {
        let mut entries = self.entries.write().await;
        if let Some(slot) = entries.get_mut(key) {
            slot.created_at = slot.created_at.checked_sub(by).expect("backdate underflow");
        }
    }
}
