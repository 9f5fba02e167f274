// Tue Jan 13 2026 - Alex

use crate::metrics::snapshot::{
    CacheOperationStats, CustomMetricStats, MetricsSnapshot, ModuleScanStats, PluginStats, RegistrationStats,
};
use crate::utils::ratio;
use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Get,
    Put,
    Evict,
    Invalidate,
    Clear,
    Load,
    Save,
}

impl CacheOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOperation::Get => "get",
            CacheOperation::Put => "put",
            CacheOperation::Evict => "evict",
            CacheOperation::Invalidate => "invalidate",
            CacheOperation::Clear => "clear",
            CacheOperation::Load => "load",
            CacheOperation::Save => "save",
        }
    }
}

#[derive(Debug, Default)]
struct OperationCounters {
    count: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    items: AtomicU64,
    total_nanos: AtomicU64,
}

impl OperationCounters {
    fn record(&self, duration: Duration, success: bool, items: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.items.fetch_add(items, Ordering::Relaxed);
        self.total_nanos
            .fetch_add(duration.as_nanos().min(u64::MAX as u128) as u64, Ordering::Relaxed);
    }

    fn load(&self) -> (u64, u64, u64, u64, f64) {
        (
            self.count.load(Ordering::Relaxed),
            self.successes.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed),
            self.items.load(Ordering::Relaxed),
            self.total_nanos.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        )
    }
}

#[derive(Debug, Default)]
struct CustomCounters {
    count: AtomicU64,
    sum_bits: AtomicU64,
    last_bits: AtomicU64,
}

impl CustomCounters {
    fn record(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .sum_bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
        self.last_bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

type CounterMap<T> = RwLock<AHashMap<String, Arc<T>>>;

fn counter<T: Default>(map: &CounterMap<T>, key: &str) -> Arc<T> {
    if let Some(existing) = map.read().get(key) {
        return existing.clone();
    }
    map.write().entry(key.to_string()).or_default().clone()
}

/// Aggregates counts and durations from scanner workers, cache operations and
/// plugin execution. Recording only touches atomics once a key exists.
pub struct MetricsCollector {
    modules: CounterMap<OperationCounters>,
    cache_operations: CounterMap<OperationCounters>,
    plugins: CounterMap<OperationCounters>,
    custom: CounterMap<CustomCounters>,
    errors: CounterMap<AtomicU64>,
    registrations_total: AtomicU64,
    registrations_failed: AtomicU64,
    started: Mutex<Instant>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(AHashMap::new()),
            cache_operations: RwLock::new(AHashMap::new()),
            plugins: RwLock::new(AHashMap::new()),
            custom: RwLock::new(AHashMap::new()),
            errors: RwLock::new(AHashMap::new()),
            registrations_total: AtomicU64::new(0),
            registrations_failed: AtomicU64::new(0),
            started: Mutex::new(Instant::now()),
        }
    }

    pub fn record_module_scan(&self, module: &str, duration: Duration, success: bool, records: usize) {
        counter(&self.modules, module).record(duration, success, records as u64);
    }

    /// For `Get`, `hit` is whether the lookup was served from cache; other
    /// operations pass whether they succeeded.
    pub fn record_cache_operation(&self, operation: CacheOperation, duration: Duration, hit: bool) {
        counter(&self.cache_operations, operation.as_str()).record(duration, hit, 0);
    }

    pub fn record_plugin_execution(&self, plugin: &str, duration: Duration, success: bool, records: usize) {
        counter(&self.plugins, plugin).record(duration, success, records as u64);
    }

    pub fn record_service_registration(&self, registered: usize, failed: usize) {
        self.registrations_total
            .fetch_add((registered + failed) as u64, Ordering::Relaxed);
        self.registrations_failed.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn record_custom_metric(&self, name: &str, value: f64) {
        counter(&self.custom, name).record(value);
    }

    pub fn record_error(&self, kind: &str) {
        counter(&self.errors, kind).fetch_add(1, Ordering::Relaxed);
    }

    pub fn error_count(&self, kind: &str) -> u64 {
        self.errors
            .read()
            .get(kind)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    pub fn summary(&self) -> MetricsSnapshot {
        let modules = self
            .modules
            .read()
            .iter()
            .map(|(name, c)| {
                let (count, successes, failures, records, total_ms) = c.load();
                let stats = ModuleScanStats {
                    scans: count,
                    successes,
                    failures,
                    records,
                    total_duration_ms: total_ms,
                    average_duration_ms: average(total_ms, count),
                    success_rate: ratio(successes, count),
                };
                (name.clone(), stats)
            })
            .collect();

        let cache_operations = self
            .cache_operations
            .read()
            .iter()
            .map(|(name, c)| {
                let (count, hits, misses, _, total_ms) = c.load();
                let stats = CacheOperationStats {
                    count,
                    hits,
                    misses,
                    hit_rate: ratio(hits, count),
                    total_duration_ms: total_ms,
                    average_duration_ms: average(total_ms, count),
                };
                (name.clone(), stats)
            })
            .collect();

        let plugins = self
            .plugins
            .read()
            .iter()
            .map(|(name, c)| {
                let (count, successes, failures, records, total_ms) = c.load();
                let stats = PluginStats {
                    executions: count,
                    successes,
                    failures,
                    records,
                    total_duration_ms: total_ms,
                    average_duration_ms: average(total_ms, count),
                    success_rate: ratio(successes, count),
                    error_rate: ratio(failures, count),
                };
                (name.clone(), stats)
            })
            .collect();

        let custom = self
            .custom
            .read()
            .iter()
            .map(|(name, c)| {
                let count = c.count.load(Ordering::Relaxed);
                let sum = f64::from_bits(c.sum_bits.load(Ordering::Relaxed));
                let stats = CustomMetricStats {
                    count,
                    sum,
                    average: average(sum, count),
                    last: f64::from_bits(c.last_bits.load(Ordering::Relaxed)),
                };
                (name.clone(), stats)
            })
            .collect();

        let errors: BTreeMap<String, u64> = self
            .errors
            .read()
            .iter()
            .map(|(kind, c)| (kind.clone(), c.load(Ordering::Relaxed)))
            .collect();

        let total = self.registrations_total.load(Ordering::Relaxed);
        let failed = self.registrations_failed.load(Ordering::Relaxed);

        MetricsSnapshot {
            uptime_ms: self.started.lock().elapsed().as_secs_f64() * 1000.0,
            modules,
            cache_operations,
            plugins,
            registrations: RegistrationStats {
                total,
                failed,
                failure_rate: ratio(failed, total),
            },
            custom,
            errors,
        }
    }

    pub fn reset(&self) {
        self.modules.write().clear();
        self.cache_operations.write().clear();
        self.plugins.write().clear();
        self.custom.write().clear();
        self.errors.write().clear();
        self.registrations_total.store(0, Ordering::Relaxed);
        self.registrations_failed.store(0, Ordering::Relaxed);
        *self.started.lock() = Instant::now();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn average(total: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_module_scan_summary() {
        let metrics = MetricsCollector::new();
        metrics.record_module_scan("Shop@1.0.0", Duration::from_millis(10), true, 3);
        metrics.record_module_scan("Shop@1.0.0", Duration::from_millis(30), false, 0);

        let summary = metrics.summary();
        let shop = &summary.modules["Shop@1.0.0"];
        assert_eq!(shop.scans, 2);
        assert_eq!(shop.records, 3);
        assert_eq!(shop.success_rate, 0.5);
        assert!((shop.average_duration_ms - 20.0).abs() < 0.001);
    }

    #[test]
    fn test_cache_hit_rate() {
        let metrics = MetricsCollector::new();
        metrics.record_cache_operation(CacheOperation::Get, Duration::from_micros(5), true);
        metrics.record_cache_operation(CacheOperation::Get, Duration::from_micros(5), true);
        metrics.record_cache_operation(CacheOperation::Get, Duration::from_micros(5), false);

        let summary = metrics.summary();
        let get = &summary.cache_operations["get"];
        assert_eq!(get.count, 3);
        assert!((get.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_plugin_error_rate_and_registrations() {
        let metrics = MetricsCollector::new();
        metrics.record_plugin_execution("handlers", Duration::from_millis(1), true, 4);
        metrics.record_plugin_execution("handlers", Duration::from_millis(1), false, 0);
        metrics.record_service_registration(9, 1);

        let summary = metrics.summary();
        assert_eq!(summary.plugins["handlers"].error_rate, 0.5);
        assert_eq!(summary.registrations.total, 10);
        assert!((summary.registrations.failure_rate - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = Arc::new(MetricsCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_module_scan("Core@1.0.0", Duration::from_nanos(10), true, 1);
                        metrics.record_custom_metric("batch", 1.0);
                        metrics.record_error("module_load");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = metrics.summary();
        assert_eq!(summary.modules["Core@1.0.0"].scans, 8000);
        assert_eq!(summary.custom["batch"].count, 8000);
        assert_eq!(summary.custom["batch"].sum, 8000.0);
        assert_eq!(metrics.error_count("module_load"), 8000);
    }

    #[test]
    fn test_reset() {
        let metrics = MetricsCollector::new();
        metrics.record_module_scan("A@1", Duration::from_millis(1), true, 1);
        metrics.record_service_registration(1, 0);
        metrics.record_error("cache_validation");
        metrics.reset();

        let summary = metrics.summary();
        assert!(summary.modules.is_empty());
        assert_eq!(summary.registrations.total, 0);
        assert_eq!(summary.total_errors(), 0);
    }
}
