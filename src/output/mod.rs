// Tue Jan 13 2026 - Alex

pub mod json;
pub mod text;

use crate::cache::CacheStats;
use crate::metrics::MetricsSnapshot;
use crate::orchestration::{DiscoveryResult, IncrementalDiscoveryResult, PreloadReport};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (expected text or json)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IncrementalSummary {
    pub baseline: SystemTime,
    pub changed_modules: Vec<String>,
    pub unchanged_modules: usize,
    pub change_ratio: f64,
}

impl From<&IncrementalDiscoveryResult> for IncrementalSummary {
    fn from(incremental: &IncrementalDiscoveryResult) -> Self {
        Self {
            baseline: incremental.baseline,
            changed_modules: incremental.changed_modules.clone(),
            unchanged_modules: incremental.unchanged_modules,
            change_ratio: incremental.change_ratio,
        }
    }
}

/// Everything the CLI prints after a run.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport<'a> {
    pub result: &'a DiscoveryResult,
    pub incremental: Option<IncrementalSummary>,
    pub preload: Option<&'a PreloadReport>,
    pub cache: Option<CacheStats>,
    pub metrics: Option<MetricsSnapshot>,
}

impl<'a> DiscoveryReport<'a> {
    pub fn new(result: &'a DiscoveryResult) -> Self {
        Self {
            result,
            incremental: None,
            preload: None,
            cache: None,
            metrics: None,
        }
    }

    pub fn with_incremental(mut self, incremental: &IncrementalDiscoveryResult) -> Self {
        self.incremental = Some(IncrementalSummary::from(incremental));
        self
    }

    pub fn with_preload(mut self, preload: &'a PreloadReport) -> Self {
        self.preload = Some(preload);
        self
    }

    pub fn with_cache_stats(mut self, stats: Option<CacheStats>) -> Self {
        self.cache = stats;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsSnapshot) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Text => Ok(text::render(self)),
            OutputFormat::Json => json::render(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
