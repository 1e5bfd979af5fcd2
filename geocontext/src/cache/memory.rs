//! In-memory spatial cache store.
//!
//! Entries are bucketed per service in a `DashMap`; a lookup scans the
//! service's bucket for the nearest unexpired entry. The store can be saved
//! to and restored from a JSON snapshot so a cache survives between runs.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::entry::CacheEntry;
use super::traits::{BoxFuture, CacheError, CacheStats, CacheStore};
use crate::coord::QueryPoint;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: Vec<CacheEntry>,
}

/// Spatial cache store held in memory.
#[derive(Default)]
pub struct MemoryCacheStore {
    buckets: DashMap<String, Vec<CacheEntry>>,
    next_id: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn nearest(&self, service_key: &str, point: &QueryPoint, distance: f64) -> Option<CacheEntry> {
        let bucket = self.buckets.get(service_key)?;
        let now = Utc::now();

        let mut best: Option<(&CacheEntry, f64)> = None;
        for entry in bucket.iter().filter(|e| !e.is_expired_at(now)) {
            let Ok(d) = entry.geometry.distance_to(point) else {
                continue;
            };
            if d <= distance && best.map_or(true, |(_, current)| d < current) {
                best = Some((entry, d));
            }
        }
        best.map(|(entry, _)| entry.clone())
    }

    fn store(&self, mut entry: CacheEntry) -> CacheEntry {
        let id = match entry.id {
            Some(id) => {
                self.next_id.fetch_max(id.saturating_add(1), Ordering::Relaxed);
                id
            }
            None => self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        entry.id = Some(id);
        self.buckets
            .entry(entry.service_key.clone())
            .or_default()
            .push(entry.clone());
        entry
    }

    /// Writes every unexpired entry to a JSON snapshot.
    ///
    /// Missing parent directories are created.
    pub async fn save_snapshot(&self, path: &Path) -> Result<usize, CacheError> {
        let now = Utc::now();
        let entries: Vec<CacheEntry> = self
            .buckets
            .iter()
            .flat_map(|bucket| {
                bucket
                    .value()
                    .iter()
                    .filter(|e| !e.is_expired_at(now))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        let count = entries.len();

        let json = serde_json::to_vec(&Snapshot {
            version: SNAPSHOT_VERSION,
            entries,
        })?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;

        info!(path = %path.display(), entries = count, "Saved cache snapshot");
        Ok(count)
    }

    /// Loads entries from a JSON snapshot, skipping expired ones.
    ///
    /// A missing file loads nothing.
    pub async fn load_snapshot(&self, path: &Path) -> Result<usize, CacheError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cache snapshot");
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CacheError::Store(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let now = Utc::now();
        let mut loaded = 0;
        for entry in snapshot.entries {
            if !entry.is_expired_at(now) {
                self.store(entry);
                loaded += 1;
            }
        }

        debug!(path = %path.display(), entries = loaded, "Loaded cache snapshot");
        Ok(loaded)
    }
}

impl CacheStore for MemoryCacheStore {
    fn find(
        &self,
        service_key: &str,
        point: &QueryPoint,
        distance: f64,
    ) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>> {
        let found = self.nearest(service_key, point, distance);
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        Box::pin(async move { Ok(found) })
    }

    fn insert(&self, entry: CacheEntry) -> BoxFuture<'_, Result<CacheEntry, CacheError>> {
        Box::pin(async move {
            let entry = self.store(entry);
            self.inserts.fetch_add(1, Ordering::Relaxed);
            Ok(entry)
        })
    }

    fn purge_expired(&self) -> BoxFuture<'_, Result<usize, CacheError>> {
        Box::pin(async move {
            let now = Utc::now();
            let mut removed = 0;
            for mut bucket in self.buckets.iter_mut() {
                let before = bucket.len();
                bucket.retain(|e| !e.is_expired_at(now));
                removed += before - bucket.len();
            }
            self.buckets.retain(|_, bucket| !bucket.is_empty());
            Ok(removed)
        })
    }

    fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len()).sum()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
        }
    }
}
