//! In-memory capability statement store with lazy expiry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::app::models::{CapabilityDocument, ServerId};

use super::clock::{Clock, SystemClock};
use super::config::CacheConfig;

/// A cached document and when it was fetched
#[derive(Debug, Clone)]
struct CacheEntry {
    document: Arc<CapabilityDocument>,
    fetched_at: DateTime<Utc>,
}

/// One capability statement per server, valid for the configured window
///
/// Staleness is checked on read; a stale entry is evicted and reported as
/// absent, exactly like a server that was never fetched.
#[derive(Debug)]
pub struct CapabilityCache {
    entries: RwLock<HashMap<ServerId, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CapabilityCache {
    /// Create a cache driven by the wall clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit time source
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: config.ttl,
            clock,
        }
    }

    /// Fresh document for `server_id`, or `None` if missing or expired
    pub async fn get(&self, server_id: &ServerId) -> Option<Arc<CapabilityDocument>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(server_id) {
                None => return None,
                Some(entry) if self.is_fresh(entry, now) => {
                    return Some(Arc::clone(&entry.document));
                }
                Some(_) => {}
            }
        }

        // Stale: evict, unless a writer replaced it in the meantime
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(server_id) {
            if self.is_fresh(entry, now) {
                return Some(Arc::clone(&entry.document));
            }
            entries.remove(server_id);
            debug!("Evicted stale capability statement for {}", server_id);
        }
        None
    }

    /// Store `document`, replacing any previous entry and resetting its age
    pub async fn put(
        &self,
        server_id: ServerId,
        document: CapabilityDocument,
    ) -> Arc<CapabilityDocument> {
        let document = Arc::new(document);
        let entry = CacheEntry {
            document: Arc::clone(&document),
            fetched_at: self.clock.now(),
        };
        self.entries.write().await.insert(server_id, entry);
        document
    }

    /// Drop the entry for `server_id`; returns whether one existed
    pub async fn invalidate(&self, server_id: &ServerId) -> bool {
        self.entries.write().await.remove(server_id).is_some()
    }

    /// Drop every entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// When the current entry for `server_id` was fetched, if it is still fresh
    pub async fn fetched_at(&self, server_id: &ServerId) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries
            .get(server_id)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.fetched_at)
    }

    /// Number of stored entries, stale ones included until they are read
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // A clock that stepped backwards yields a negative age; treat as brand new
        let age = (now - entry.fetched_at).to_std().unwrap_or(Duration::ZERO);
        age < self.ttl
    }
}

impl Default for CapabilityCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
