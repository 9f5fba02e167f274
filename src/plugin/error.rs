// Tue Jan 13 2026 - Alex

use crate::introspection::IntrospectionError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin {plugin} failed to discover: {reason}")]
    Discovery { plugin: String, reason: String },
    #[error("Plugin {plugin} failed validation: {reason}")]
    Validation { plugin: String, reason: String },
    #[error("Plugin {plugin} exceeded {timeout:?} during {phase}")]
    Timeout {
        plugin: String,
        phase: &'static str,
        timeout: Duration,
    },
    #[error("Plugin {plugin} panicked during {phase}: {message}")]
    Panicked {
        plugin: String,
        phase: &'static str,
        message: String,
    },
    #[error("A plugin named {0} is already registered")]
    DuplicatePlugin(String),
    #[error("Could not start plugin worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Introspection error: {0}")]
    Introspection(#[from] IntrospectionError),
}

impl PluginError {
    pub fn metric_kind(&self) -> &'static str {
        match self {
            PluginError::Discovery { .. } | PluginError::Introspection(_) => "plugin_discover",
            PluginError::Validation { .. } => "plugin_validate",
            PluginError::Timeout { .. } => "plugin_timeout",
            PluginError::Panicked { .. } => "plugin_panic",
            PluginError::DuplicatePlugin(_) => "plugin_registration",
            PluginError::Spawn(_) => "plugin_spawn",
        }
    }
}
