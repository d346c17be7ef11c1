//! Persistent per-repository cache that decides skip vs. process.
//!
//! The store is shared by every worker thread. All reads and writes go through
//! one mutex, and [`CacheStore::record`] rewrites the whole file (temp file +
//! rename) before releasing it, so a record that returned is on disk.
//!
//! An unreadable or corrupt file at startup yields an empty (cold) cache and a
//! warning; it never aborts the run.

use crate::core::error::{Result, SweeperError};
use crate::core::state::{CacheEntry, CacheResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Hit/miss counters for the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: BTreeMap<String, CacheEntry>,
    hits: usize,
    misses: usize,
}

#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    ttl_days: i64,
    state: Mutex<CacheState>,
}

/// True iff `entry.sha == current_sha` and the entry is at most `ttl_days` old.
pub fn is_fresh(
    entry: Option<&CacheEntry>,
    current_sha: &str,
    ttl_days: i64,
    now: DateTime<Utc>,
) -> bool {
    let Some(entry) = entry else {
        return false;
    };
    if entry.sha != current_sha {
        return false;
    }
    let age_days = (now.timestamp() - entry.timestamp) as f64 / SECONDS_PER_DAY;
    age_days <= ttl_days as f64
}

impl CacheStore {
    /// Load the cache at `path`; missing or corrupt files start cold.
    pub fn open(path: impl Into<PathBuf>, ttl_days: i64) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        log::debug!("loaded {} cache entries from {}", entries.len(), path.display());

        Self {
            path,
            ttl_days,
            state: Mutex::new(CacheState {
                entries,
                ..Default::default()
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl_days(&self) -> i64 {
        self.ttl_days
    }

    // Every write leaves the map consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn lookup(&self, key: &str) -> Option<CacheEntry> {
        self.lock().entries.get(key).cloned()
    }

    /// Skip decision for `key` at `current_sha`, counted as a hit or miss.
    ///
    /// Entries whose last result was an error are never a hit, so a failed
    /// repository is retried next run even when its SHA did not move.
    pub fn should_skip(&self, key: &str, current_sha: &str, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        let entry = state.entries.get(key);
        let hit = entry.is_some_and(|e| e.result != CacheResult::Error)
            && is_fresh(entry, current_sha, self.ttl_days, now);

        if hit {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        hit
    }

    /// Update (or create) the entry for `key` and persist the whole cache.
    pub fn record(
        &self,
        key: &str,
        sha: &str,
        result: CacheResult,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.lock();
        let ts = timestamp.timestamp();

        state
            .entries
            .entry(key.to_string())
            .and_modify(|entry| {
                entry.sha = sha.to_string();
                entry.timestamp = ts;
                entry.result = result;
                entry.ttl_days = self.ttl_days;
            })
            .or_insert_with(|| CacheEntry {
                sha: sha.to_string(),
                timestamp: ts,
                result,
                ttl_days: self.ttl_days,
                first_seen: ts,
            });

        self.persist(&state.entries)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            total: state.hits + state.misses,
        }
    }

    pub fn entries(&self) -> BTreeMap<String, CacheEntry> {
        self.lock().entries.clone()
    }

    /// Drop every entry and delete the backing file.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        state.entries.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SweeperError::cache_write_failed(&self.path, e)),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .map_err(|e| SweeperError::cache_directory_creation_failed(dir, e))?;
            }
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| SweeperError::cache_write_failed(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| SweeperError::cache_write_failed(&self.path, e))
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, CacheEntry> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            log::warn!(
                "cannot read cache file '{}': {e}; starting with an empty cache",
                path.display()
            );
            return BTreeMap::new();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|e| {
        log::warn!(
            "cache file '{}' is corrupt: {e}; starting with an empty cache",
            path.display()
        );
        BTreeMap::new()
    })
}
