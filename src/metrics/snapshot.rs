// Tue Jan 13 2026 - Alex

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleScanStats {
    pub scans: u64,
    pub successes: u64,
    pub failures: u64,
    pub records: u64,
    pub total_duration_ms: f64,
    pub average_duration_ms: f64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheOperationStats {
    pub count: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub total_duration_ms: f64,
    pub average_duration_ms: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PluginStats {
    pub executions: u64,
    pub successes: u64,
    pub failures: u64,
    pub records: u64,
    pub total_duration_ms: f64,
    pub average_duration_ms: f64,
    pub success_rate: f64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationStats {
    pub total: u64,
    pub failed: u64,
    pub failure_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomMetricStats {
    pub count: u64,
    pub sum: f64,
    pub average: f64,
    pub last: f64,
}

/// Point-in-time aggregate of every counter the collector owns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_ms: f64,
    pub modules: BTreeMap<String, ModuleScanStats>,
    pub cache_operations: BTreeMap<String, CacheOperationStats>,
    pub plugins: BTreeMap<String, PluginStats>,
    pub registrations: RegistrationStats,
    pub custom: BTreeMap<String, CustomMetricStats>,
    pub errors: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn total_scans(&self) -> u64 {
        self.modules.values().map(|m| m.scans).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.errors.values().sum()
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let (hits, misses) = self
            .cache_operations
            .values()
            .fold((0u64, 0u64), |(h, m), op| (h + op.hits, m + op.misses));
        crate::utils::ratio(hits, hits + misses)
    }
}
