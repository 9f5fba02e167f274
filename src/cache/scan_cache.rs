// Tue Jan 13 2026 - Alex

use crate::cache::entry::CacheEntry;
use crate::cache::error::CacheError;
use crate::cache::fingerprint::{FileSystemProbe, FingerprintProbe, ModuleFingerprint};
use crate::config::CacheConfig;
use crate::metrics::{CacheOperation, MetricsCollector};
use crate::model::{Module, RegistrationRecord};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

const PERSISTED_VERSION: u32 = 1;

/// Result of looking a module up, distinguishing an absent entry from one that
/// was present but no longer valid.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Vec<RegistrationRecord>),
    Miss,
    /// An entry existed but its module changed, aged out, or could not be probed.
    Stale,
}

impl CacheLookup {
    pub fn into_records(self) -> Option<Vec<RegistrationRecord>> {
        match self {
            CacheLookup::Hit(records) => Some(records),
            CacheLookup::Miss | CacheLookup::Stale => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub entry_count: usize,
    pub total_cached_records: usize,
    pub estimated_bytes: usize,
    pub evictions: u64,
    pub validation_errors: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        crate::utils::ratio(self.hits, self.requests)
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedCache {
    version: u32,
    entries: Vec<CacheEntry>,
}

struct CacheInner {
    lru: LruCache<String, Arc<CacheEntry>>,
    bytes: usize,
}

impl CacheInner {
    fn insert(&mut self, entry: Arc<CacheEntry>) {
        self.bytes += entry.estimated_bytes();
        if let Some(old) = self.lru.put(entry.module.clone(), entry) {
            self.bytes = self.bytes.saturating_sub(old.estimated_bytes());
        }
    }

    fn remove(&mut self, key: &str) -> Option<Arc<CacheEntry>> {
        let removed = self.lru.pop(key)?;
        self.bytes = self.bytes.saturating_sub(removed.estimated_bytes());
        Some(removed)
    }
}

/// Per-module memo of scan results, validated against the module fingerprint on
/// every read and bounded by LRU eviction.
///
/// Entries are immutable once inserted and shared as `Arc`s, so readers never
/// observe a partially written entry. Validation runs outside the lock.
///
/// A module whose fingerprint cannot be read is treated as changed: the entry
/// is dropped, counted as a validation error, and the lookup misses.
pub struct ScanCache {
    config: CacheConfig,
    probe: Arc<dyn FingerprintProbe>,
    inner: Mutex<CacheInner>,
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    validation_errors: AtomicU64,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ScanCache {
    pub fn new(config: CacheConfig) -> Self {
        let probe = Arc::new(FileSystemProbe::new(config.fingerprint_mode));
        Self::with_probe(config, probe)
    }

    pub fn with_probe(config: CacheConfig, probe: Arc<dyn FingerprintProbe>) -> Self {
        Self {
            config,
            probe,
            inner: Mutex::new(CacheInner {
                lru: LruCache::unbounded(),
                bytes: 0,
            }),
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            validation_errors: AtomicU64::new(0),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn probe(&self) -> &Arc<dyn FingerprintProbe> {
        &self.probe
    }

    pub fn try_get(&self, module: &Module) -> Option<Vec<RegistrationRecord>> {
        self.lookup(module).into_records()
    }

    pub fn lookup(&self, module: &Module) -> CacheLookup {
        let start = Instant::now();
        self.requests.fetch_add(1, Ordering::Relaxed);

        let key = module.identity();
        let entry = self.inner.lock().lru.get(&key).cloned();

        let outcome = match entry {
            None => CacheLookup::Miss,
            Some(entry) => {
                if self.is_valid(module, &entry) {
                    CacheLookup::Hit(entry.records.clone())
                } else {
                    self.remove_if_same(&key, &entry);
                    CacheLookup::Stale
                }
            }
        };

        let hit = matches!(outcome, CacheLookup::Hit(_));
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        self.record_operation(CacheOperation::Get, start, hit);

        outcome
    }

    fn is_valid(&self, module: &Module, entry: &CacheEntry) -> bool {
        if entry.dynamic || module.is_dynamic() {
            return true;
        }

        if entry.is_expired(self.config.max_age) {
            log::debug!("Cache entry for {} expired after {:?}", entry.module, entry.age());
            return false;
        }

        match self.probe.probe(module) {
            Ok(current) => {
                let same = current == entry.fingerprint;
                if !same {
                    log::debug!("Module {} changed since it was cached", entry.module);
                }
                same
            }
            Err(e) => {
                log::warn!("Cache validation failed, rescanning: {}", e);
                self.validation_errors.fetch_add(1, Ordering::Relaxed);
                if let Some(metrics) = &self.metrics {
                    metrics.record_error("cache_validation");
                }
                false
            }
        }
    }

    /// Removes the entry only if it is still the one that was validated, so a
    /// concurrent `put` of fresh results is not lost.
    fn remove_if_same(&self, key: &str, stale: &Arc<CacheEntry>) {
        let mut inner = self.inner.lock();
        let same = inner.lru.peek(key).map_or(false, |current| Arc::ptr_eq(current, stale));
        if same {
            inner.remove(key);
        }
    }

    /// Fingerprints the module now and caches `records` under it. Prefer
    /// `fingerprint` before scanning plus `put_with_fingerprint` when the module
    /// may change while it is being scanned.
    pub fn put(&self, module: &Module, records: Vec<RegistrationRecord>) -> Result<(), CacheError> {
        let fingerprint = self.fingerprint(module)?;
        self.put_with_fingerprint(module, fingerprint, records);
        Ok(())
    }

    /// Current fingerprint of `module`. Dynamic modules have none.
    pub fn fingerprint(&self, module: &Module) -> Result<ModuleFingerprint, CacheError> {
        if module.is_dynamic() {
            return Ok(ModuleFingerprint::default());
        }
        self.probe.probe(module).map_err(|e| {
            if let Some(metrics) = &self.metrics {
                metrics.record_error("cache_put");
            }
            e
        })
    }

    /// Caches `records` under a fingerprint taken before they were scanned. If
    /// the module changed in between, the next lookup sees the mismatch.
    pub fn put_with_fingerprint(&self, module: &Module, fingerprint: ModuleFingerprint, records: Vec<RegistrationRecord>) {
        let start = Instant::now();

        let entry = Arc::new(CacheEntry::new(module.identity(), fingerprint, module.is_dynamic(), records));
        let evicted = {
            let mut inner = self.inner.lock();
            inner.insert(entry);
            self.evict_if_needed(&mut inner)
        };

        self.record_operation(CacheOperation::Put, start, true);
        if evicted > 0 {
            log::debug!("Evicted {} cache entries", evicted);
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            self.record_operation(CacheOperation::Evict, start, true);
        }
    }

    /// Shrinks to the low-water mark once either limit is exceeded.
    fn evict_if_needed(&self, inner: &mut CacheInner) -> usize {
        let max_entries = self.config.max_entries;
        let max_bytes = self.config.max_estimated_bytes;

        if inner.lru.len() <= max_entries && inner.bytes <= max_bytes {
            return 0;
        }

        let ratio = self.config.low_water_ratio.clamp(0.0, 1.0);
        let target_entries = ((max_entries as f64 * ratio).floor() as usize).max(max_entries.min(1));
        let target_bytes = (max_bytes as f64 * ratio).floor() as usize;

        let mut evicted = 0;
        while inner.lru.len() > target_entries || inner.bytes > target_bytes {
            match inner.lru.pop_lru() {
                Some((_, entry)) => {
                    inner.bytes = inner.bytes.saturating_sub(entry.estimated_bytes());
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }

    pub fn invalidate(&self, module: &Module) -> bool {
        let start = Instant::now();
        let removed = self.inner.lock().remove(&module.identity()).is_some();
        self.record_operation(CacheOperation::Invalidate, start, removed);
        removed
    }

    pub fn contains(&self, module: &Module) -> bool {
        self.inner.lock().lru.contains(&module.identity())
    }

    pub fn clear(&self) {
        let start = Instant::now();
        {
            let mut inner = self.inner.lock();
            inner.lru.clear();
            inner.bytes = 0;
        }
        self.record_operation(CacheOperation::Clear, start, true);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let (entry_count, total_cached_records, estimated_bytes) = {
            let inner = self.inner.lock();
            (
                inner.lru.len(),
                inner.lru.iter().map(|(_, e)| e.records.len()).sum(),
                inner.bytes,
            )
        };

        CacheStats {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
            total_cached_records,
            estimated_bytes,
            evictions: self.evictions.load(Ordering::Relaxed),
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
        }
    }

    /// Writes every file-backed entry as JSON, least recently used first, and
    /// returns how many were written. Dynamic modules are left out: their
    /// entries are only valid in the process that loaded them.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<usize, CacheError> {
        let start = Instant::now();
        let path = path.as_ref();

        let entries: Vec<CacheEntry> = {
            let inner = self.inner.lock();
            inner
                .lru
                .iter()
                .rev()
                .filter(|(_, e)| !e.dynamic)
                .map(|(_, e)| e.as_ref().clone())
                .collect()
        };

        let persisted = PersistedCache {
            version: PERSISTED_VERSION,
            entries,
        };
        let contents = serde_json::to_string(&persisted)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents)?;

        self.record_operation(CacheOperation::Save, start, true);
        log::info!("Saved {} cache entries to {}", persisted.entries.len(), path.display());
        Ok(persisted.entries.len())
    }

    /// Merges entries from a file written by `save_to`. Loaded entries are
    /// validated lazily on their first lookup. Dynamic entries are ignored.
    pub fn load_from<P: AsRef<Path>>(&self, path: P) -> Result<usize, CacheError> {
        let start = Instant::now();
        let path = path.as_ref();

        let contents = fs::read_to_string(path)?;
        let persisted: PersistedCache = serde_json::from_str(&contents)?;
        if persisted.version != PERSISTED_VERSION {
            return Err(CacheError::UnsupportedVersion {
                found: persisted.version,
                expected: PERSISTED_VERSION,
            });
        }

        let mut count = 0;
        let evicted = {
            let mut inner = self.inner.lock();
            for entry in persisted.entries.into_iter().filter(|e| !e.dynamic) {
                inner.insert(Arc::new(entry));
                count += 1;
            }
            self.evict_if_needed(&mut inner)
        };
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);

        self.record_operation(CacheOperation::Load, start, true);
        log::info!("Loaded {} cache entries from {}", count, path.display());
        Ok(count)
    }

    fn record_operation(&self, operation: CacheOperation, start: Instant, hit: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_operation(operation, start.elapsed(), hit);
        }
    }
}

impl Default for ScanCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
