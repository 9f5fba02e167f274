// Tue Jan 13 2026 - Alex

use crate::model::{Diagnostic, RegistrationRecord};
use crate::plugin::ValidationResult;
use serde::Serialize;
use std::time::Duration;

/// Final state of one (plugin, module) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PairState {
    /// `can_process` declined the module.
    Ineligible,
    Done,
    Failed,
    /// Not started because the operation budget ran out.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleOutcome {
    pub module: String,
    pub state: PairState,
    pub records: usize,
    #[serde(with = "crate::config::duration_millis")]
    pub duration: Duration,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PluginStatus {
    Done,
    /// Some modules failed; the rest contributed.
    Degraded,
    /// Discovery failed everywhere or validation rejected the contribution.
    Failed,
    Skipped,
}

impl PluginStatus {
    pub fn contributes(&self) -> bool {
        matches!(self, PluginStatus::Done | PluginStatus::Degraded)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginResult {
    pub name: String,
    pub priority: i32,
    pub status: PluginStatus,
    pub modules: Vec<ModuleOutcome>,
    /// Records contributed to the merged set. Empty when the plugin failed.
    pub records: Vec<RegistrationRecord>,
    pub validation: Option<ValidationResult>,
    #[serde(with = "crate::config::duration_millis")]
    pub duration: Duration,
    pub error: Option<String>,
}

impl PluginResult {
    pub fn failed_modules(&self) -> usize {
        self.modules.iter().filter(|m| m.state == PairState::Failed).count()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PluginExecutionResult {
    pub per_plugin: Vec<PluginResult>,
    pub all_records: Vec<RegistrationRecord>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(with = "crate::config::duration_millis")]
    pub total_duration: Duration,
    pub timed_out: bool,
}

impl PluginExecutionResult {
    pub fn plugin(&self, name: &str) -> Option<&PluginResult> {
        self.per_plugin.iter().find(|p| p.name == name)
    }

    pub fn failed_plugins(&self) -> usize {
        self.per_plugin
            .iter()
            .filter(|p| p.status == PluginStatus::Failed)
            .count()
    }
}
