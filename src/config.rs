// Tue Jan 13 2026 - Alex

use crate::model::Lifetime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub enable_caching: bool,
    pub enable_parallel: bool,
    /// Cache misses at or below this count are scanned on the calling thread.
    pub parallel_threshold: usize,
    pub max_parallelism: usize,
    pub enable_plugins: bool,
    #[serde(with = "optional_millis")]
    pub operation_timeout: Option<Duration>,
    #[serde(with = "optional_millis")]
    pub plugin_timeout: Option<Duration>,
    pub active_profile: Option<String>,
    pub test_mode: bool,
    /// Skip candidates whose target cannot be resolved unambiguously instead of
    /// registering them under their own type.
    pub strict_conventions: bool,
    pub conventions: Vec<ConventionRule>,
    pub suffix_rules: Vec<SuffixRule>,
    pub cache: CacheConfig,
}

/// A regex naming rule registered as an extra convention strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConventionRule {
    pub name: String,
    pub priority: i32,
    pub pattern: String,
    pub template: String,
}

/// Registers metadata-free types whose name ends with `suffix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuffixRule {
    pub suffix: String,
    #[serde(default)]
    pub lifetime: Lifetime,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FingerprintMode {
    /// File size plus last-write time.
    Metadata,
    /// FNV-1a over the file contents.
    ContentHash,
}

impl Default for FingerprintMode {
    fn default() -> Self {
        FingerprintMode::Metadata
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub max_estimated_bytes: usize,
    /// Fraction of the limits that eviction shrinks the cache down to.
    pub low_water_ratio: f64,
    #[serde(with = "optional_millis")]
    pub max_age: Option<Duration>,
    pub fingerprint_mode: FingerprintMode,
    pub persist_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            max_estimated_bytes: 64 * 1024 * 1024,
            low_water_ratio: 0.75,
            max_age: Some(Duration::from_secs(3600)),
            fingerprint_mode: FingerprintMode::Metadata,
            persist_path: None,
        }
    }
}

impl CacheConfig {
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_fingerprint_mode(mut self, mode: FingerprintMode) -> Self {
        self.fingerprint_mode = mode;
        self
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enable_caching: true,
            enable_parallel: true,
            parallel_threshold: 4,
            max_parallelism: num_cpus::get(),
            enable_plugins: true,
            operation_timeout: None,
            plugin_timeout: Some(Duration::from_secs(30)),
            active_profile: None,
            test_mode: false,
            strict_conventions: false,
            conventions: Vec::new(),
            suffix_rules: Vec::new(),
            cache: CacheConfig::default(),
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.enable_caching = enabled;
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.enable_parallel = enabled;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn with_max_parallelism(mut self, max: usize) -> Self {
        self.max_parallelism = max;
        self
    }

    pub fn with_plugins(mut self, enabled: bool) -> Self {
        self.enable_plugins = enabled;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    pub fn with_plugin_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.plugin_timeout = timeout;
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.active_profile = Some(profile.into());
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn with_strict_conventions(mut self, strict: bool) -> Self {
        self.strict_conventions = strict;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallelism == 0 {
            return Err(ConfigError::Validation("max_parallelism must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.cache.low_water_ratio) {
            return Err(ConfigError::Validation(
                "cache.low_water_ratio must be between 0.0 and 1.0".to_string(),
            ));
        }
        for rule in &self.conventions {
            if rule.pattern.is_empty() {
                return Err(ConfigError::Validation(format!("convention '{}' has an empty pattern", rule.name)));
            }
        }
        if self.suffix_rules.iter().any(|r| r.suffix.is_empty()) {
            return Err(ConfigError::Validation("suffix rules need a non-empty suffix".to_string()));
        }
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: DiscoveryConfig = match ext.to_lowercase().as_str() {
            "json" => serde_json::from_str(&contents)?,
            _ => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, contents)?;
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        let millis: Option<u64> = Option::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

/// Report fields: durations as fractional milliseconds.
pub(crate) mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(DiscoveryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let config = DiscoveryConfig::new().with_max_parallelism(0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"enable_plugins": false, "operation_timeout": 1500, "cache": {"max_entries": 8}}"#;
        let config: DiscoveryConfig = serde_json::from_str(json).unwrap();
        assert!(!config.enable_plugins);
        assert!(config.enable_caching);
        assert_eq!(config.operation_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.cache.max_entries, 8);
        assert_eq!(config.cache.low_water_ratio, 0.75);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discovery.json");
        let config = DiscoveryConfig::new().with_profile("staging").with_parallel_threshold(2);
        config.save(&path).unwrap();

        let loaded = DiscoveryConfig::load(&path).unwrap();
        assert_eq!(loaded.active_profile.as_deref(), Some("staging"));
        assert_eq!(loaded.parallel_threshold, 2);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discovery.yaml");
        fs::write(&path, "enable_plugins: false").unwrap();
        assert!(matches!(DiscoveryConfig::load(&path), Err(ConfigError::UnsupportedFormat(_))));
    }
}
