// Tue Jan 13 2026 - Alex

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::introspection::IntrospectionError;
use crate::plugin::PluginError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Introspection error: {0}")]
    Introspection(#[from] IntrospectionError),
    #[error("Invalid convention {name}: {source}")]
    Convention {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
    #[error("Operation budget of {0:?} exceeded")]
    Timeout(Duration),
    #[error("Discovery panicked: {0}")]
    Panicked(String),
}

impl DiscoveryError {
    pub fn metric_kind(&self) -> &'static str {
        match self {
            DiscoveryError::Timeout(_) => "discovery_timeout",
            _ => "discovery_fatal",
        }
    }
}
