// Tue Jan 13 2026 - Alex

use crate::config::DiscoveryConfig;
use crate::metrics::MetricsCollector;
use crate::plugin::call_pool::CallPool;
use crate::model::{Diagnostic, Module, RecordSource, RegistrationRecord};
use crate::plugin::{
    DiscoveryPlugin, ModuleOutcome, PairState, PluginError, PluginExecutionResult, PluginRegistry, PluginResult,
    PluginStatus, ValidationResult,
};
use crate::utils::{deadline_passed, panic_message, remaining};
use indexmap::IndexMap;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

const COMPONENT: &str = "plugins";

struct PluginDiscovery {
    plugin: Arc<dyn DiscoveryPlugin>,
    outcomes: Vec<ModuleOutcome>,
    records: Vec<RegistrationRecord>,
    duration: Duration,
}

impl PluginDiscovery {
    fn status(&self) -> PluginStatus {
        let attempted = self
            .outcomes
            .iter()
            .filter(|o| matches!(o.state, PairState::Done | PairState::Failed))
            .count();
        let failed = self.outcomes.iter().filter(|o| o.state == PairState::Failed).count();

        if attempted == 0 {
            PluginStatus::Skipped
        } else if failed == attempted {
            PluginStatus::Failed
        } else if failed > 0 {
            PluginStatus::Degraded
        } else {
            PluginStatus::Done
        }
    }
}

/// Runs discovery plugins in ascending priority. A failure, panic or timeout is
/// confined to its (plugin, module) pair. Cross-plugin validation starts only
/// after every plugin has finished discovering.
pub struct PluginCoordinator {
    plugins: RwLock<Vec<Arc<dyn DiscoveryPlugin>>>,
    metrics: Option<Arc<MetricsCollector>>,
    calls: CallPool,
}

impl PluginCoordinator {
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
            metrics: None,
            calls: CallPool::new("plugin-call"),
        }
    }

    pub fn from_registry(registry: PluginRegistry) -> Self {
        let mut plugins = registry.into_plugins();
        plugins.sort_by_key(|p| p.priority());
        Self {
            plugins: RwLock::new(plugins),
            metrics: None,
            calls: CallPool::new("plugin-call"),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn register<P: DiscoveryPlugin + 'static>(&self, plugin: P) -> Result<(), PluginError> {
        self.register_arc(Arc::new(plugin))
    }

    pub fn register_arc(&self, plugin: Arc<dyn DiscoveryPlugin>) -> Result<(), PluginError> {
        let mut plugins = self.plugins.write();
        if plugins.iter().any(|p| p.name() == plugin.name()) {
            return Err(PluginError::DuplicatePlugin(plugin.name().to_string()));
        }
        log::debug!("Registered plugin {} (priority {})", plugin.name(), plugin.priority());
        plugins.push(plugin);
        plugins.sort_by_key(|p| p.priority());
        Ok(())
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.read().iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    /// Threads started so far for timed plugin calls.
    pub fn call_threads(&self) -> usize {
        self.calls.spawned()
    }

    pub fn execute(&self, modules: &[Module], config: &DiscoveryConfig) -> PluginExecutionResult {
        self.execute_until(modules, config, None)
    }

    /// Like `execute`, but pairs not started before `deadline` are skipped.
    pub fn execute_until(
        &self,
        modules: &[Module],
        config: &DiscoveryConfig,
        deadline: Option<Instant>,
    ) -> PluginExecutionResult {
        let start = Instant::now();
        let plugins = self.plugins.read().clone();
        let config = Arc::new(config.clone());
        let mut result = PluginExecutionResult::default();

        let discoveries: Vec<PluginDiscovery> = plugins
            .iter()
            .map(|plugin| self.discover_plugin(plugin, modules, &config, deadline, &mut result.diagnostics))
            .collect();

        result.timed_out = discoveries
            .iter()
            .any(|d| d.outcomes.iter().any(|o| o.state == PairState::Skipped));

        // Barrier: every plugin has discovered before any validates.
        let all: Arc<Vec<RegistrationRecord>> =
            Arc::new(discoveries.iter().flat_map(|d| d.records.iter().cloned()).collect());

        for discovery in discoveries {
            let plugin_result = self.validate_plugin(discovery, &all, &config, &mut result.diagnostics);
            result.all_records.extend(plugin_result.records.iter().cloned());
            result.per_plugin.push(plugin_result);
        }

        Self::check_overlaps(&result.per_plugin, &mut result.diagnostics);
        result.total_duration = start.elapsed();

        log::debug!(
            "Ran {} plugins: {} records, {} failed, in {:?}",
            result.per_plugin.len(),
            result.all_records.len(),
            result.failed_plugins(),
            result.total_duration
        );

        result
    }

    fn discover_plugin(
        &self,
        plugin: &Arc<dyn DiscoveryPlugin>,
        modules: &[Module],
        config: &Arc<DiscoveryConfig>,
        deadline: Option<Instant>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> PluginDiscovery {
        let start = Instant::now();
        let run = |module: &Module| self.discover_pair(plugin, module, config, deadline);

        let pairs: Vec<(ModuleOutcome, Vec<RegistrationRecord>)> = if config.enable_parallel && modules.len() > 1 {
            modules.par_iter().map(run).collect()
        } else {
            modules.iter().map(run).collect()
        };

        let name = plugin.name();
        let mut outcomes = Vec::with_capacity(pairs.len());
        let mut records = Vec::new();

        for (outcome, discovered) in pairs {
            if let Some(error) = &outcome.error {
                diagnostics.push(Diagnostic::error(COMPONENT, error.clone()).for_module(outcome.module.clone()));
            }

            for record in discovered {
                if !record.is_well_formed() {
                    diagnostics.push(
                        Diagnostic::error(COMPONENT, format!("plugin {} returned a malformed record: {}", name, record))
                            .for_module(outcome.module.clone()),
                    );
                    self.count_error("plugin_record");
                    continue;
                }

                let record = record.with_source(RecordSource::Plugin(name.to_string()));
                let record = if record.module.is_none() {
                    record.from_module(outcome.module.clone())
                } else {
                    record
                };
                records.push(record);
            }

            outcomes.push(outcome);
        }

        PluginDiscovery {
            plugin: plugin.clone(),
            outcomes,
            records,
            duration: start.elapsed(),
        }
    }

    fn discover_pair(
        &self,
        plugin: &Arc<dyn DiscoveryPlugin>,
        module: &Module,
        config: &Arc<DiscoveryConfig>,
        deadline: Option<Instant>,
    ) -> (ModuleOutcome, Vec<RegistrationRecord>) {
        let name = plugin.name();
        let mut outcome = ModuleOutcome {
            module: module.identity(),
            state: PairState::Skipped,
            records: 0,
            duration: Duration::ZERO,
            error: None,
        };

        if deadline_passed(deadline) {
            return (outcome, Vec::new());
        }

        let eligible = panic::catch_unwind(AssertUnwindSafe(|| plugin.can_process(module))).map_err(|payload| {
            PluginError::Panicked {
                plugin: name.to_string(),
                phase: "can_process",
                message: panic_message(payload.as_ref()),
            }
        });

        let start = Instant::now();
        let discovered = match eligible {
            Ok(false) => {
                outcome.state = PairState::Ineligible;
                return (outcome, Vec::new());
            }
            Ok(true) => {
                let (p, m, c) = (plugin.clone(), module.clone(), config.clone());
                guarded(&self.calls, name, "discover", call_timeout(config.plugin_timeout, deadline), move || {
                    p.discover(&m, &c)
                })
            }
            Err(e) => Err(e),
        };
        outcome.duration = start.elapsed();

        let records = match discovered {
            Ok(records) => {
                outcome.state = PairState::Done;
                outcome.records = records.len();
                records
            }
            Err(e) => {
                log::warn!("{} (module {})", e, module);
                self.count_error(e.metric_kind());
                outcome.state = PairState::Failed;
                outcome.error = Some(e.to_string());
                Vec::new()
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_plugin_execution(name, outcome.duration, outcome.state == PairState::Done, outcome.records);
        }

        (outcome, records)
    }

    fn validate_plugin(
        &self,
        discovery: PluginDiscovery,
        all: &Arc<Vec<RegistrationRecord>>,
        config: &Arc<DiscoveryConfig>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> PluginResult {
        let name = discovery.plugin.name().to_string();
        let mut status = discovery.status();
        let mut outcomes = discovery.outcomes;
        let mut error = None;
        let mut validation = None;
        let start = Instant::now();

        if status.contributes() {
            let (p, own, everything, c) = (
                discovery.plugin.clone(),
                discovery.records.clone(),
                all.clone(),
                config.clone(),
            );
            let checked: Result<ValidationResult, PluginError> =
                guarded(&self.calls, &name, "validate", config.plugin_timeout, move || p.validate(&own, &everything, &c));

            match checked {
                Ok(v) => {
                    for warning in &v.warnings {
                        diagnostics.push(Diagnostic::warning(COMPONENT, format!("{}: {}", name, warning)));
                    }
                    for info in &v.info {
                        diagnostics.push(Diagnostic::info(COMPONENT, format!("{}: {}", name, info)));
                    }
                    if !v.is_valid {
                        let reason = if v.errors.is_empty() {
                            "validation rejected the contribution".to_string()
                        } else {
                            v.errors.join("; ")
                        };
                        let e = PluginError::Validation {
                            plugin: name.clone(),
                            reason,
                        };
                        self.count_error(e.metric_kind());
                        error = Some(e.to_string());
                        status = PluginStatus::Failed;
                    }
                    validation = Some(v);
                }
                Err(e) => {
                    self.count_error(e.metric_kind());
                    error = Some(e.to_string());
                    status = PluginStatus::Failed;
                }
            }
        } else if status == PluginStatus::Failed {
            error = outcomes.iter().find_map(|o| o.error.clone());
        }

        if let Some(message) = &error {
            log::warn!("Plugin {} withheld: {}", name, message);
            diagnostics.push(Diagnostic::error(COMPONENT, message.clone()));
        }

        let records = if status.contributes() {
            discovery.records
        } else {
            for outcome in outcomes.iter_mut().filter(|o| o.state == PairState::Done) {
                outcome.state = PairState::Failed;
            }
            Vec::new()
        };

        PluginResult {
            name,
            priority: discovery.plugin.priority(),
            status,
            modules: outcomes,
            records,
            validation,
            duration: discovery.duration + start.elapsed(),
            error,
        }
    }

    /// Warns when one abstraction is claimed by more than one plugin.
    fn check_overlaps(results: &[PluginResult], diagnostics: &mut Vec<Diagnostic>) {
        let mut claims: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for result in results {
            for record in &result.records {
                let owners = claims.entry(record.target.as_str()).or_default();
                if !owners.contains(&result.name.as_str()) {
                    owners.push(result.name.as_str());
                }
            }
        }

        for (target, owners) in claims.into_iter().filter(|(_, owners)| owners.len() > 1) {
            diagnostics.push(Diagnostic::warning(
                COMPONENT,
                format!("{} is registered by plugins {}", target, owners.join(", ")),
            ));
        }
    }

    fn count_error(&self, kind: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_error(kind);
        }
    }
}

impl Default for PluginCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

fn call_timeout(plugin_timeout: Option<Duration>, deadline: Option<Instant>) -> Option<Duration> {
    match (plugin_timeout, remaining(deadline)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Runs a plugin callback with panics caught. With a timeout the call runs on
/// a pool worker, which is left behind if it does not answer in time.
fn guarded<T, F>(
    calls: &CallPool,
    plugin: &str,
    phase: &'static str,
    timeout: Option<Duration>,
    call: F,
) -> Result<T, PluginError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PluginError> + Send + 'static,
{
    let panicked = |payload: Box<dyn std::any::Any + Send>| PluginError::Panicked {
        plugin: plugin.to_string(),
        phase,
        message: panic_message(payload.as_ref()),
    };

    let Some(timeout) = timeout else {
        return panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| Err(panicked(payload)));
    };

    let rx = calls.submit(call)?;
    match rx.recv_timeout(timeout) {
        Ok(Ok(result)) => result,
        Ok(Err(payload)) => Err(panicked(payload)),
        Err(RecvTimeoutError::Timeout) => Err(PluginError::Timeout {
            plugin: plugin.to_string(),
            phase,
            timeout,
        }),
        Err(RecvTimeoutError::Disconnected) => Err(PluginError::Panicked {
            plugin: plugin.to_string(),
            phase,
            message: "worker exited without a result".to_string(),
        }),
    }
}
