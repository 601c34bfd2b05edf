use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tracing::debug;

use crate::warehouse::{Row, SqlParam, Warehouse, WarehouseError};

/// Bounded memo with an explicit time-to-live per entry.
pub struct TtlCache<K: Hash + Eq, V: Clone> {
    entries: LruCache<K, (Instant, V)>,
    ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            ttl,
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some((stored_at, value)) if now.duration_since(*stored_at) < self.ttl => {
                return Some(value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.pop(key);
        }
        None
    }

    fn insert_at(&mut self, key: K, value: V, now: Instant) {
        self.entries.put(key, (now, value));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Memoizes read queries of the wrapped warehouse. Writes pass through and
/// drop every cached read, since any of them may now be stale.
pub struct CachedWarehouse<W: Warehouse> {
    inner: W,
    cache: Mutex<TtlCache<String, Vec<Row>>>,
}

impl<W: Warehouse> CachedWarehouse<W> {
    pub fn new(inner: W, capacity: usize, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Mutex::new(TtlCache::new(capacity, ttl)),
        }
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }

    fn lookup(&self, key: &str) -> Option<Vec<Row>> {
        self.cache.lock().ok()?.get(&key.to_string())
    }

    fn store(&self, key: String, rows: &[Row]) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, rows.to_vec());
            debug!(entries = cache.len(), "query result cached");
        }
    }

    fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

// The same statement with different bound values is a different read.
fn cache_key(sql: &str, params: &[SqlParam]) -> String {
    format!("{sql}\u{0}{params:?}")
}

#[async_trait]
impl<W: Warehouse> Warehouse for CachedWarehouse<W> {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, WarehouseError> {
        let key = cache_key(sql, params);
        if let Some(rows) = self.lookup(&key) {
            debug!(rows = rows.len(), "query cache hit");
            return Ok(rows);
        }

        debug!("query cache miss");
        let rows = self.inner.query(sql, params).await?;
        self.store(key, &rows);
        Ok(rows)
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, WarehouseError> {
        let affected = self.inner.execute(sql, params).await?;
        self.invalidate();
        Ok(affected)
    }
}
