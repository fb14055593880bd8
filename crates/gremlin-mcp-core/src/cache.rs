//! Schema cache with time-based expiry
//!
//! Holds at most one generated schema. Entries are replaced wholesale and the
//! lock is only held for the swap itself, never while a generation runs, so
//! concurrent `get` calls that both see a stale entry may each generate.
//!
//! Every `invalidate` bumps an epoch. A generation that was already running
//! when the epoch moved still answers its own caller but is not stored, since
//! it may describe the graph as it was before the change.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::Result;
use crate::schema::GraphSchema;

struct CacheEntry {
    schema: Arc<GraphSchema>,
    timestamp: Instant,
}

/// Single-slot cache for the generated schema
pub struct SchemaCache {
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
    epoch: AtomicU64,
}

impl SchemaCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached schema if it is younger than the TTL, otherwise run
    /// `generate` and store its result.
    ///
    /// A failed generation leaves the cache as it was, and so does one that
    /// overlapped an [`invalidate`](Self::invalidate).
    pub async fn get<F, Fut>(&self, generate: F) -> Result<Arc<GraphSchema>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<GraphSchema>>,
    {
        if let Some(schema) = self.fresh() {
            tracing::debug!("Serving schema from cache");
            return Ok(schema);
        }

        tracing::debug!("Schema cache miss, generating");
        let started = self.epoch.load(Ordering::SeqCst);
        let schema = Arc::new(generate().await?);

        let mut entry = self.write();
        if self.epoch.load(Ordering::SeqCst) == started {
            *entry = Some(CacheEntry {
                schema: schema.clone(),
                timestamp: Instant::now(),
            });
        } else {
            tracing::debug!("Cache invalidated during generation, result not stored");
        }
        Ok(schema)
    }

    /// The cached schema regardless of age. Never generates.
    pub fn peek(&self) -> Option<Arc<GraphSchema>> {
        self.read().as_ref().map(|entry| entry.schema.clone())
    }

    /// Drop the cached schema.
    pub fn invalidate(&self) {
        let mut entry = self.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if entry.take().is_some() {
            tracing::info!("Schema cache invalidated");
        }
    }

    /// Force a new generation regardless of freshness.
    pub async fn refresh<F, Fut>(&self, generate: F) -> Result<Arc<GraphSchema>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<GraphSchema>>,
    {
        self.invalidate();
        self.get(generate).await
    }

    /// Time since the cached schema was stored.
    pub fn age(&self) -> Option<Duration> {
        self.read().as_ref().map(|entry| entry.timestamp.elapsed())
    }

    fn fresh(&self) -> Option<Arc<GraphSchema>> {
        self.read()
            .as_ref()
            .filter(|entry| entry.timestamp.elapsed() < self.ttl)
            .map(|entry| entry.schema.clone())
    }

    // A panic while holding the lock cannot leave a half-written entry, since
    // writes are single assignments, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Option<CacheEntry>> {
        self.entry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<CacheEntry>> {
        self.entry.write().unwrap_or_else(|e| e.into_inner())
    }
}
