// Tue Jan 13 2026 - Alex

use crate::model::{Diagnostic, RegistrationRecord, Severity};
use crate::orchestration::aggregator::AggregationStatistics;
use crate::plugin::PluginExecutionResult;
use serde::Serialize;
use std::time::{Duration, SystemTime};

/// Everything a registration sink needs: the ordered, deduplicated records and
/// a report of how they were obtained.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryResult {
    pub records: Vec<RegistrationRecord>,
    pub cache_hits: usize,
    pub freshly_scanned: usize,
    pub failed_modules: usize,
    /// Modules never scanned because the operation budget ran out.
    pub skipped_modules: usize,
    pub plugin_result: Option<PluginExecutionResult>,
    pub statistics: AggregationStatistics,
    pub filtered_out: usize,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(with = "crate::config::duration_millis")]
    pub duration: Duration,
    pub success: bool,
    pub error: Option<String>,
    pub timed_out: bool,
}

impl DiscoveryResult {
    pub fn modules_processed(&self) -> usize {
        self.cache_hits + self.freshly_scanned
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    pub fn find(&self, target: &str) -> Vec<&RegistrationRecord> {
        self.records.iter().filter(|r| r.target == target).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IncrementalDiscoveryResult {
    pub result: DiscoveryResult,
    pub baseline: SystemTime,
    pub changed_modules: Vec<String>,
    pub unchanged_modules: usize,
    /// Changed modules over all modules considered.
    pub change_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreloadReport {
    pub requested: usize,
    pub already_cached: usize,
    pub warmed: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(with = "crate::config::duration_millis")]
    pub duration: Duration,
}
