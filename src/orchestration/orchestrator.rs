// Tue Jan 13 2026 - Alex

use crate::cache::{CacheError, CacheLookup, FileSystemProbe, FingerprintProbe, ModuleFingerprint, ScanCache};
use crate::config::DiscoveryConfig;
use crate::convention::{ConventionResolver, PatternConvention};
use crate::introspection::ModuleIntrospector;
use crate::metrics::MetricsCollector;
use crate::model::{Diagnostic, Module, RegistrationRecord};
use crate::orchestration::aggregator::ResultAggregator;
use crate::orchestration::error::DiscoveryError;
use crate::orchestration::filter::{PredicateEvaluator, RegistrationFilter};
use crate::orchestration::result::{DiscoveryResult, IncrementalDiscoveryResult, PreloadReport};
use crate::orchestration::scheduler::{ScanScheduler, Scheduled};
use crate::plugin::{DiscoveryPlugin, PluginCoordinator, PluginExecutionResult, PluginRegistry, SuffixRegistrationPlugin};
use crate::scanner::{ModuleScanReport, ModuleScanner, ScanStatus};
use crate::utils::logging::scoped_timer;
use crate::utils::{deadline_passed, panic_message, ratio};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

const COMPONENT: &str = "orchestrator";

/// Progress of one discovery run. Survives a failure part way through so the
/// partial result can still be returned.
#[derive(Default)]
struct RunState {
    by_module: BTreeMap<usize, Vec<RegistrationRecord>>,
    cache_hits: usize,
    freshly_scanned: usize,
    failed_modules: usize,
    skipped_modules: usize,
    plugin_result: Option<PluginExecutionResult>,
    diagnostics: Vec<Diagnostic>,
}

pub struct DiscoveryOrchestratorBuilder {
    introspector: Arc<dyn ModuleIntrospector>,
    config: DiscoveryConfig,
    resolver: Option<Arc<ConventionResolver>>,
    cache: Option<Arc<ScanCache>>,
    metrics: Option<Arc<MetricsCollector>>,
    plugins: Vec<Arc<dyn DiscoveryPlugin>>,
    evaluator: Option<Arc<dyn PredicateEvaluator>>,
}

impl DiscoveryOrchestratorBuilder {
    pub fn new(introspector: Arc<dyn ModuleIntrospector>) -> Self {
        Self {
            introspector,
            config: DiscoveryConfig::default(),
            resolver: None,
            cache: None,
            metrics: None,
            plugins: Vec::new(),
            evaluator: None,
        }
    }

    pub fn with_config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<ConventionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Shares an existing cache instead of creating one from the config.
    pub fn with_cache(mut self, cache: Arc<ScanCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_plugin<P: DiscoveryPlugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn with_predicate_evaluator(mut self, evaluator: Arc<dyn PredicateEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn build(self) -> Result<DiscoveryOrchestrator, DiscoveryError> {
        let config = self.config;
        config.validate()?;

        let metrics = self.metrics.unwrap_or_else(|| Arc::new(MetricsCollector::new()));

        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(ConventionResolver::with_defaults()));
        for rule in &config.conventions {
            let strategy = PatternConvention::new(&rule.name, rule.priority, &rule.pattern, &rule.template).map_err(
                |source| DiscoveryError::Convention {
                    name: rule.name.clone(),
                    source,
                },
            )?;
            resolver.register(strategy);
        }

        let cache = match self.cache {
            Some(cache) => Some(cache),
            None if config.enable_caching => {
                let cache = ScanCache::new(config.cache.clone()).with_metrics(metrics.clone());
                if let Some(path) = &config.cache.persist_path {
                    if path.exists() {
                        if let Err(e) = cache.load_from(path) {
                            log::warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                            metrics.record_error("cache_load");
                        }
                    }
                }
                Some(Arc::new(cache))
            }
            None => None,
        };

        let probe: Arc<dyn FingerprintProbe> = match &cache {
            Some(cache) => cache.probe().clone(),
            None => Arc::new(FileSystemProbe::new(config.cache.fingerprint_mode)),
        };

        let mut registry = PluginRegistry::new();
        if !config.suffix_rules.is_empty() {
            registry.register(SuffixRegistrationPlugin::new(
                self.introspector.clone(),
                resolver.clone(),
                config.suffix_rules.clone(),
            ))?;
        }
        for plugin in self.plugins {
            registry.register_arc(plugin)?;
        }

        let scanner = ModuleScanner::new(self.introspector.clone(), resolver)
            .with_metrics(metrics.clone())
            .with_strict_conventions(config.strict_conventions);

        Ok(DiscoveryOrchestrator {
            scheduler: ScanScheduler::new(&config),
            plugins: registry.build().with_metrics(metrics.clone()),
            introspector: self.introspector,
            aggregator: ResultAggregator::new(),
            evaluator: self.evaluator,
            scanner,
            cache,
            probe,
            metrics,
            config,
        })
    }
}

/// Runs a full discovery: cache partition, fresh scanning, plugins, then
/// merge and filtering.
pub struct DiscoveryOrchestrator {
    config: DiscoveryConfig,
    introspector: Arc<dyn ModuleIntrospector>,
    scanner: ModuleScanner,
    cache: Option<Arc<ScanCache>>,
    probe: Arc<dyn FingerprintProbe>,
    plugins: PluginCoordinator,
    metrics: Arc<MetricsCollector>,
    scheduler: ScanScheduler,
    aggregator: ResultAggregator,
    evaluator: Option<Arc<dyn PredicateEvaluator>>,
}

impl DiscoveryOrchestrator {
    pub fn builder(introspector: Arc<dyn ModuleIntrospector>) -> DiscoveryOrchestratorBuilder {
        DiscoveryOrchestratorBuilder::new(introspector)
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn cache(&self) -> Option<&Arc<ScanCache>> {
        self.cache.as_ref()
    }

    pub fn plugins(&self) -> &PluginCoordinator {
        &self.plugins
    }

    pub fn scanner(&self) -> &ModuleScanner {
        &self.scanner
    }

    /// Discovers every module the introspector knows about.
    pub fn discover_all(&self) -> DiscoveryResult {
        match self.introspector.enumerate_modules() {
            Ok(modules) => self.discover(&modules),
            Err(e) => self.failed(DiscoveryError::from(e)),
        }
    }

    pub fn discover(&self, modules: &[Module]) -> DiscoveryResult {
        self.discover_with_config(modules, &self.config)
    }

    /// Discovery with per-call settings. The worker pool stays as built.
    pub fn discover_with_config(&self, modules: &[Module], config: &DiscoveryConfig) -> DiscoveryResult {
        let start = Instant::now();
        let deadline = config.operation_timeout.map(|budget| start + budget);
        let mut state = RunState::default();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_phases(modules, config, deadline, &mut state)));
        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(payload) => Some(DiscoveryError::Panicked(panic_message(payload.as_ref()))),
        };

        self.finalize(state, config, error, start)
    }

    fn run_phases(
        &self,
        modules: &[Module],
        config: &DiscoveryConfig,
        deadline: Option<Instant>,
        state: &mut RunState,
    ) -> Result<(), DiscoveryError> {
        let to_scan = {
            let _timer = scoped_timer("discovery.cache_partition");
            self.partition_by_cache(modules, config, deadline, state)
        };

        {
            let _timer = scoped_timer("discovery.scan");
            self.scan_fresh(modules, &to_scan, config, deadline, state);
        }

        if state.skipped_modules > 0 || deadline_passed(deadline) {
            return Err(self.budget_exceeded(config));
        }

        if config.enable_plugins && !self.plugins.is_empty() {
            let _timer = scoped_timer("discovery.plugins");
            let plugin_result = self
                .scheduler
                .install(|| self.plugins.execute_until(modules, config, deadline));
            let timed_out = plugin_result.timed_out;
            state.plugin_result = Some(plugin_result);
            if timed_out {
                return Err(self.budget_exceeded(config));
            }
        }

        Ok(())
    }

    /// Splits modules into cache hits and indices that need a fresh scan.
    fn partition_by_cache(
        &self,
        modules: &[Module],
        config: &DiscoveryConfig,
        deadline: Option<Instant>,
        state: &mut RunState,
    ) -> Vec<usize> {
        let Some(cache) = self.active_cache(config) else {
            return (0..modules.len()).collect();
        };

        let lookups = self.scheduler.run(modules, config, deadline, |module| cache.lookup(module));

        let mut to_scan = Vec::new();
        for (index, lookup) in lookups.into_iter().enumerate() {
            match lookup {
                Scheduled::Completed(CacheLookup::Hit(records)) => {
                    state.cache_hits += 1;
                    state.by_module.insert(index, records);
                }
                Scheduled::Completed(CacheLookup::Stale) => {
                    self.scanner.forget_module(&modules[index]);
                    to_scan.push(index);
                }
                Scheduled::Completed(CacheLookup::Miss) | Scheduled::Skipped => to_scan.push(index),
            }
        }

        to_scan
    }

    fn scan_fresh(
        &self,
        modules: &[Module],
        to_scan: &[usize],
        config: &DiscoveryConfig,
        deadline: Option<Instant>,
        state: &mut RunState,
    ) {
        let cache = self.active_cache(config);
        let reports = self.scheduler.run(to_scan, config, deadline, |&index| {
            let module = &modules[index];
            let fingerprint = cache.map(|cache| cache.fingerprint(module));
            (fingerprint, self.scanner.scan_module(module))
        });

        for (&index, scheduled) in to_scan.iter().zip(reports) {
            let Scheduled::Completed((fingerprint, report)) = scheduled else {
                state.skipped_modules += 1;
                continue;
            };

            state.freshly_scanned += 1;
            if report.status == ScanStatus::Failed {
                state.failed_modules += 1;
            }
            if let (Some(cache), Some(fingerprint)) = (cache, fingerprint) {
                self.write_back(cache, &modules[index], fingerprint, &report, state);
            }
            state.diagnostics.extend(report.diagnostics);
            state.by_module.insert(index, report.records);
        }
    }

    fn active_cache(&self, config: &DiscoveryConfig) -> Option<&Arc<ScanCache>> {
        self.cache.as_ref().filter(|_| config.enable_caching)
    }

    /// Only complete scans are cached, so transient failures are retried next
    /// run. The fingerprint is the one taken before the scan started.
    fn write_back(
        &self,
        cache: &ScanCache,
        module: &Module,
        fingerprint: Result<ModuleFingerprint, CacheError>,
        report: &ModuleScanReport,
        state: &mut RunState,
    ) {
        if !matches!(report.status, ScanStatus::Complete | ScanStatus::Skipped) {
            return;
        }

        match fingerprint {
            Ok(fingerprint) => cache.put_with_fingerprint(module, fingerprint, report.records.clone()),
            Err(e) => {
                log::warn!("Could not cache {}: {}", module, e);
                state
                    .diagnostics
                    .push(Diagnostic::warning("cache", e.to_string()).for_module(module.identity()));
            }
        }
    }

    fn budget_exceeded(&self, config: &DiscoveryConfig) -> DiscoveryError {
        DiscoveryError::Timeout(config.operation_timeout.unwrap_or_default())
    }

    fn finalize(
        &self,
        state: RunState,
        config: &DiscoveryConfig,
        error: Option<DiscoveryError>,
        start: Instant,
    ) -> DiscoveryResult {
        let RunState {
            by_module,
            cache_hits,
            freshly_scanned,
            failed_modules,
            skipped_modules,
            plugin_result,
            mut diagnostics,
        } = state;

        let plugin_records = plugin_result
            .as_ref()
            .map(|p| p.all_records.clone())
            .unwrap_or_default();
        if let Some(plugin_result) = &plugin_result {
            diagnostics.extend(plugin_result.diagnostics.iter().cloned());
        }

        // Records that do not apply to this run are dropped before dedup, so an
        // inactive record never hides an applicable duplicate.
        let filter = RegistrationFilter::from_config(config).with_evaluator(self.evaluator.clone());
        let filtered = filter.apply(by_module.into_values().flatten().chain(plugin_records).collect());
        diagnostics.extend(filtered.diagnostics);

        let aggregation = self.aggregator.aggregate(filtered.kept);
        diagnostics.extend(aggregation.diagnostics);

        self.metrics
            .record_service_registration(aggregation.records.len(), aggregation.statistics.malformed_rejected);

        let timed_out = matches!(error, Some(DiscoveryError::Timeout(_)));
        let error = error.map(|e| {
            log::error!("Discovery did not complete: {}", e);
            self.metrics.record_error(e.metric_kind());
            diagnostics.push(Diagnostic::error(COMPONENT, e.to_string()));
            e.to_string()
        });

        let duration = start.elapsed();
        self.metrics
            .record_custom_metric("discovery.duration_ms", duration.as_secs_f64() * 1000.0);

        log::info!(
            "Discovered {} registrations ({} cached, {} scanned) in {:?}",
            aggregation.records.len(),
            cache_hits,
            freshly_scanned,
            duration
        );

        DiscoveryResult {
            records: aggregation.records,
            cache_hits,
            freshly_scanned,
            failed_modules,
            skipped_modules,
            plugin_result,
            statistics: aggregation.statistics,
            filtered_out: filtered.removed.len(),
            diagnostics,
            duration,
            success: error.is_none(),
            error,
            timed_out,
        }
    }

    fn failed(&self, error: DiscoveryError) -> DiscoveryResult {
        self.finalize(RunState::default(), &self.config, Some(error), Instant::now())
    }

    /// Re-discovers after a baseline time. Modules written since the baseline
    /// are invalidated and rescanned; the rest are served from the cache.
    pub fn discover_incremental(&self, modules: &[Module], since: SystemTime) -> IncrementalDiscoveryResult {
        let mut changed_modules = Vec::new();

        for module in modules {
            if self.changed_since(module, since) {
                if let Some(cache) = &self.cache {
                    cache.invalidate(module);
                }
                self.scanner.forget_module(module);
                changed_modules.push(module.identity());
            }
        }

        log::info!(
            "{} of {} modules changed since the baseline",
            changed_modules.len(),
            modules.len()
        );

        let result = self.discover(modules);
        IncrementalDiscoveryResult {
            unchanged_modules: modules.len() - changed_modules.len(),
            change_ratio: ratio(changed_modules.len() as u64, modules.len() as u64),
            changed_modules,
            baseline: since,
            result,
        }
    }

    /// A module whose write time cannot be read counts as changed.
    fn changed_since(&self, module: &Module, since: SystemTime) -> bool {
        match self.probe.last_modified(module) {
            Ok(Some(modified)) => modified > since,
            Ok(None) => false,
            Err(e) => {
                log::warn!("Treating {} as changed: {}", module, e);
                self.metrics.record_error("cache_validation");
                true
            }
        }
    }

    /// Scans and caches every module that is not already cached.
    pub fn preload(&self, modules: &[Module]) -> PreloadReport {
        let start = Instant::now();
        let mut report = PreloadReport {
            requested: modules.len(),
            ..PreloadReport::default()
        };

        let Some(cache) = &self.cache else {
            log::warn!("Preload requested with caching disabled");
            report.skipped = modules.len();
            return report;
        };

        let deadline = self.config.operation_timeout.map(|budget| start + budget);
        let outcomes = self.scheduler.run(modules, &self.config, deadline, |module| {
            match cache.lookup(module) {
                CacheLookup::Hit(_) => return PreloadOutcome::AlreadyCached,
                CacheLookup::Stale => self.scanner.forget_module(module),
                CacheLookup::Miss => {}
            }

            let fingerprint = match cache.fingerprint(module) {
                Ok(fingerprint) => fingerprint,
                Err(e) => {
                    log::warn!("Could not preload {}: {}", module, e);
                    return PreloadOutcome::Failed;
                }
            };
            let scan = self.scanner.scan_module(module);
            if !matches!(scan.status, ScanStatus::Complete | ScanStatus::Skipped) {
                return PreloadOutcome::Failed;
            }
            cache.put_with_fingerprint(module, fingerprint, scan.records);
            PreloadOutcome::Warmed
        });

        for outcome in outcomes {
            match outcome {
                Scheduled::Completed(PreloadOutcome::AlreadyCached) => report.already_cached += 1,
                Scheduled::Completed(PreloadOutcome::Warmed) => report.warmed += 1,
                Scheduled::Completed(PreloadOutcome::Failed) => report.failed += 1,
                Scheduled::Skipped => report.skipped += 1,
            }
        }

        report.duration = start.elapsed();
        log::info!(
            "Preloaded {} modules ({} already cached, {} failed)",
            report.warmed,
            report.already_cached,
            report.failed
        );
        report
    }

    /// Writes the cache to its configured file, if there is one.
    pub fn save_cache(&self) -> Result<Option<usize>, DiscoveryError> {
        match (&self.cache, &self.config.cache.persist_path) {
            (Some(cache), Some(path)) => Ok(Some(cache.save_to(path)?)),
            _ => Ok(None),
        }
    }
}

enum PreloadOutcome {
    AlreadyCached,
    Warmed,
    Failed,
}
