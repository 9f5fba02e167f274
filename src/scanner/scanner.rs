// Tue Jan 13 2026 - Alex

use crate::convention::ConventionResolver;
use crate::introspection::ModuleIntrospector;
use crate::metrics::MetricsCollector;
use crate::model::{Diagnostic, Module, RecordSource, RegistrationRecord, TypeCandidate, TypeDescriptor};
use crate::scanner::error::ScanError;
use crate::scanner::filter::TypeFilter;
use crate::scanner::metadata_cache::{CachedTypeInfo, MetadataCache};
use crate::utils::panic_message;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

const COMPONENT: &str = "scanner";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Complete,
    /// Some types could not be loaded or read; the rest were scanned.
    Partial,
    Failed,
    /// Rejected by the module-level check.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanCounts {
    pub types_seen: usize,
    pub structural_candidates: usize,
    pub metadata_candidates: usize,
    pub records: usize,
}

#[derive(Debug, Clone)]
pub struct ModuleScanReport {
    pub module: String,
    pub records: Vec<RegistrationRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub counts: ScanCounts,
    pub status: ScanStatus,
    pub duration: Duration,
}

impl ModuleScanReport {
    fn new(module: &Module) -> Self {
        Self {
            module: module.identity(),
            records: Vec::new(),
            diagnostics: Vec::new(),
            counts: ScanCounts::default(),
            status: ScanStatus::Complete,
            duration: Duration::ZERO,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status != ScanStatus::Failed
    }

    fn degrade(&mut self) {
        if self.status == ScanStatus::Complete {
            self.status = ScanStatus::Partial;
        }
    }
}

/// Extracts registration records from modules. Filtering runs cheapest first:
/// the module-level check, then type flags, then declared metadata for the
/// survivors only.
pub struct ModuleScanner {
    introspector: Arc<dyn ModuleIntrospector>,
    resolver: Arc<ConventionResolver>,
    metadata_cache: MetadataCache,
    metrics: Option<Arc<MetricsCollector>>,
    strict_conventions: bool,
}

impl ModuleScanner {
    pub fn new(introspector: Arc<dyn ModuleIntrospector>, resolver: Arc<ConventionResolver>) -> Self {
        Self {
            introspector,
            resolver,
            metadata_cache: MetadataCache::new(),
            metrics: None,
            strict_conventions: false,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_strict_conventions(mut self, strict: bool) -> Self {
        self.strict_conventions = strict;
        self
    }

    pub fn introspector(&self) -> &Arc<dyn ModuleIntrospector> {
        &self.introspector
    }

    pub fn resolver(&self) -> &Arc<ConventionResolver> {
        &self.resolver
    }

    pub fn metadata_cache(&self) -> &MetadataCache {
        &self.metadata_cache
    }

    /// Drops cached per-type metadata for a module whose content changed.
    pub fn forget_module(&self, module: &Module) {
        let dropped = self.metadata_cache.forget_module(&module.identity());
        if dropped > 0 {
            log::debug!("Dropped {} cached type entries for {}", dropped, module);
        }
    }

    pub fn scan(&self, modules: &[Module]) -> Vec<RegistrationRecord> {
        modules
            .iter()
            .flat_map(|module| self.scan_module(module).records)
            .collect()
    }

    /// Scans one module. Never panics and never returns an error: failures end
    /// up in the report's status and diagnostics.
    pub fn scan_module(&self, module: &Module) -> ModuleScanReport {
        let start = Instant::now();

        let mut report = match panic::catch_unwind(AssertUnwindSafe(|| self.scan_module_inner(module))) {
            Ok(report) => report,
            Err(payload) => {
                let mut report = ModuleScanReport::new(module);
                report.status = ScanStatus::Failed;
                self.report_error(
                    &mut report,
                    ScanError::Panicked {
                        module: module.identity(),
                        message: panic_message(payload.as_ref()),
                    },
                );
                report
            }
        };

        report.duration = start.elapsed();
        report.counts.records = report.records.len();

        if let Some(metrics) = &self.metrics {
            metrics.record_module_scan(&report.module, report.duration, report.succeeded(), report.records.len());
        }

        log::debug!(
            "Scanned {}: {:?}, {} types, {} records in {:?}",
            report.module,
            report.status,
            report.counts.types_seen,
            report.records.len(),
            report.duration
        );

        report
    }

    fn scan_module_inner(&self, module: &Module) -> ModuleScanReport {
        let mut report = ModuleScanReport::new(module);

        if !TypeFilter::module_may_contain_candidates(self.introspector.as_ref(), module) {
            report.status = ScanStatus::Skipped;
            return report;
        }

        let enumeration = match self.introspector.enumerate_types(module) {
            Ok(enumeration) => enumeration,
            Err(source) => {
                report.status = ScanStatus::Failed;
                self.report_error(
                    &mut report,
                    ScanError::ModuleLoad {
                        module: module.identity(),
                        source,
                    },
                );
                return report;
            }
        };

        for failure in &enumeration.load_failures {
            report.degrade();
            report.diagnostics.push(
                Diagnostic::warning(
                    COMPONENT,
                    format!("type {} could not be loaded: {}", failure.type_name, failure.reason),
                )
                .for_module(module.identity()),
            );
            self.count_error("type_load");
        }

        report.counts.types_seen = enumeration.types.len() + enumeration.load_failures.len();

        let candidates = TypeFilter::concrete_candidates(&enumeration.types);
        report.counts.structural_candidates = candidates.len();

        for ty in candidates {
            let info = match self.type_info(ty) {
                Ok(Some(info)) => info,
                Ok(None) => continue,
                Err(err) => {
                    report.degrade();
                    self.report_error(&mut report, err);
                    continue;
                }
            };

            report.counts.metadata_candidates += 1;
            if let Some(record) = self.build_record(ty, &info, &mut report) {
                report.records.push(record.from_module(module.identity()));
            }
        }

        report
    }

    fn type_info(&self, ty: &TypeDescriptor) -> Result<Option<Arc<CachedTypeInfo>>, ScanError> {
        self.metadata_cache
            .get_or_load(&ty.id, || {
                let Some(metadata) = self.introspector.declared_metadata(ty)? else {
                    return Ok(None);
                };
                let abstractions =
                    TypeFilter::without_system_abstractions(self.introspector.implemented_abstractions(ty));
                Ok(Some(CachedTypeInfo { metadata, abstractions }))
            })
            .map_err(|source| ScanError::CandidateMetadata {
                type_name: ty.full_name(),
                source,
            })
    }

    fn build_record(
        &self,
        ty: &TypeDescriptor,
        info: &CachedTypeInfo,
        report: &mut ModuleScanReport,
    ) -> Option<RegistrationRecord> {
        let metadata = &info.metadata;

        let (target, source) = match &metadata.target {
            Some(explicit) => (explicit.clone(), RecordSource::Explicit),
            None => {
                let candidate = TypeCandidate::new(ty.clone(), info.abstractions.clone(), metadata.clone());
                let resolution = self.resolver.resolve(&candidate, &info.abstractions);

                for (strategy, message) in &resolution.failed_strategies {
                    let err = ScanError::ConventionPanicked {
                        strategy: strategy.clone(),
                        type_name: ty.full_name(),
                        message: message.clone(),
                    };
                    self.count_error(err.metric_kind());
                    report.degrade();
                    report
                        .diagnostics
                        .push(Diagnostic::warning(COMPONENT, err.to_string()).for_module(report.module.clone()));
                }

                if resolution.ambiguous {
                    let err = ScanError::AmbiguousTarget {
                        type_name: ty.full_name(),
                        count: info.abstractions.len(),
                    };
                    self.count_error(err.metric_kind());

                    if self.strict_conventions {
                        report.diagnostics.push(
                            Diagnostic::warning(COMPONENT, format!("{}; candidate skipped", err))
                                .for_module(report.module.clone()),
                        );
                        return None;
                    }
                    report
                        .diagnostics
                        .push(Diagnostic::info(COMPONENT, err.to_string()).for_module(report.module.clone()));
                }

                (resolution.target, RecordSource::Convention)
            }
        };

        let mut record = RegistrationRecord::new(target, ty.full_name())
            .with_lifetime(metadata.lifetime)
            .with_order(metadata.order)
            .with_ignore_in_tests(metadata.ignore_in_tests)
            .with_predicates(metadata.predicates.clone())
            .with_source(source);
        record.profile = metadata.profile.clone();

        Some(record)
    }

    fn report_error(&self, report: &mut ModuleScanReport, err: ScanError) {
        log::warn!("{}", err);
        self.count_error(err.metric_kind());
        report
            .diagnostics
            .push(Diagnostic::error(COMPONENT, err.to_string()).for_module(report.module.clone()));
    }

    fn count_error(&self, kind: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_error(kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspection::{
        IntrospectionError, Manifest, ManifestIntrospector, ManifestModule, ManifestType, TypeEnumeration,
    };
    use crate::convention::ConventionStrategy;
    use crate::model::{Lifetime, RawMetadata, Severity};

    fn shop_module() -> ManifestModule {
        ManifestModule::new("Shop", "1.0.0")
            .with_type(
                ManifestType::class("Widget")
                    .in_namespace("shop")
                    .implements("shop::IWidget")
                    .implements("shop::IComponent")
                    .implements("std::fmt::Debug")
                    .with_metadata(RawMetadata::new(Lifetime::Singleton).with_order(2)),
            )
            .with_type(
                ManifestType::class("Clock")
                    .in_namespace("shop")
                    .implements("shop::ITimeSource")
                    .with_metadata(RawMetadata::new(Lifetime::Transient).with_target("shop::IClock")),
            )
            .with_type(
                ManifestType::class("BaseWidget")
                    .in_namespace("shop")
                    .abstract_class()
                    .with_metadata(RawMetadata::default()),
            )
            .with_type(ManifestType::interface("IWidget").in_namespace("shop"))
            .with_type(ManifestType::class("Helper").in_namespace("shop"))
    }

    fn scanner_for(modules: Vec<ManifestModule>) -> (ModuleScanner, Arc<MetricsCollector>) {
        let introspector = Arc::new(ManifestIntrospector::from_manifest(Manifest { modules }));
        let metrics = Arc::new(MetricsCollector::new());
        let scanner = ModuleScanner::new(introspector, Arc::new(ConventionResolver::with_defaults()))
            .with_metrics(metrics.clone());
        (scanner, metrics)
    }

    #[test]
    fn test_scan_module_builds_records() {
        let (scanner, metrics) = scanner_for(vec![shop_module()]);
        let report = scanner.scan_module(&Module::new("Shop", "1.0.0"));

        assert_eq!(report.status, ScanStatus::Complete);
        assert_eq!(report.counts.types_seen, 5);
        assert_eq!(report.counts.structural_candidates, 3);
        assert_eq!(report.counts.metadata_candidates, 2);
        assert_eq!(report.records.len(), 2);

        let widget = report.records.iter().find(|r| r.implementation == "shop::Widget").unwrap();
        assert_eq!(widget.target, "shop::IWidget");
        assert_eq!(widget.lifetime, Lifetime::Singleton);
        assert_eq!(widget.order, 2);
        assert_eq!(widget.source, RecordSource::Convention);
        assert_eq!(widget.module.as_deref(), Some("Shop@1.0.0"));

        let clock = report.records.iter().find(|r| r.implementation == "shop::Clock").unwrap();
        assert_eq!(clock.target, "shop::IClock");
        assert_eq!(clock.source, RecordSource::Explicit);

        assert_eq!(metrics.summary().modules["Shop@1.0.0"].scans, 1);
    }

    #[test]
    fn test_metadata_is_cached_across_scans() {
        let (scanner, _) = scanner_for(vec![shop_module()]);
        let module = Module::new("Shop", "1.0.0");

        scanner.scan_module(&module);
        let misses = scanner.metadata_cache().misses();
        scanner.scan_module(&module);

        assert_eq!(scanner.metadata_cache().misses(), misses);
        assert!(scanner.metadata_cache().hits() >= 3);

        scanner.forget_module(&module);
        assert!(scanner.metadata_cache().is_empty());
    }

    #[test]
    fn test_module_without_discovery_reference_is_skipped() {
        let (scanner, _) = scanner_for(vec![shop_module().without_discovery_reference()]);
        let report = scanner.scan_module(&Module::new("Shop", "1.0.0"));

        assert_eq!(report.status, ScanStatus::Skipped);
        assert!(report.records.is_empty());
        assert!(scanner.metadata_cache().is_empty());
    }

    #[test]
    fn test_total_load_failure_is_reported() {
        let (scanner, metrics) = scanner_for(vec![ManifestModule::new("Bad", "0.1.0").failing("corrupt image")]);
        let report = scanner.scan_module(&Module::new("Bad", "0.1.0"));

        assert_eq!(report.status, ScanStatus::Failed);
        assert!(report.records.is_empty());
        assert!(report.diagnostics.iter().any(|d| d.severity == Severity::Error));
        assert_eq!(metrics.error_count("module_load"), 1);
        assert!(scanner.scan(&[Module::new("Bad", "0.1.0")]).is_empty());
    }

    #[test]
    fn test_partial_load_keeps_loadable_types() {
        let module = shop_module()
            .with_type(ManifestType::class("Missing").unloadable("dependency not found"))
            .with_type(
                ManifestType::class("Corrupt")
                    .implements("ICorrupt")
                    .with_malformed_metadata("lifetime 'forever' is unknown"),
            );
        let (scanner, metrics) = scanner_for(vec![module]);
        let report = scanner.scan_module(&Module::new("Shop", "1.0.0"));

        assert_eq!(report.status, ScanStatus::Partial);
        assert_eq!(report.records.len(), 2);
        assert_eq!(metrics.error_count("type_load"), 1);
        assert_eq!(metrics.error_count("candidate_metadata"), 1);
    }

    #[test]
    fn test_ambiguous_fallback() {
        let module = ManifestModule::new("Media", "1.0.0").with_type(
            ManifestType::class("Mixer")
                .implements("IAudio")
                .implements("IVideo")
                .with_metadata(RawMetadata::default()),
        );

        let (lenient, metrics) = scanner_for(vec![module.clone()]);
        let report = lenient.scan_module(&Module::new("Media", "1.0.0"));
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].target, "Mixer");
        assert!(report.diagnostics.iter().any(|d| d.severity == Severity::Info));
        assert_eq!(metrics.error_count("convention_ambiguity"), 1);

        let (strict, _) = scanner_for(vec![module]);
        let strict = strict.with_strict_conventions(true);
        let report = strict.scan_module(&Module::new("Media", "1.0.0"));
        assert!(report.records.is_empty());
        assert!(report.diagnostics.iter().any(|d| d.severity == Severity::Warning));
    }

    struct PanicsOnBad;

    impl ConventionStrategy for PanicsOnBad {
        fn name(&self) -> &str {
            "PanicsOnBad"
        }

        fn priority(&self) -> i32 {
            1
        }

        fn can_apply(&self, _candidate: &TypeCandidate) -> bool {
            true
        }

        fn resolve(&self, candidate: &TypeCandidate, _abstractions: &[String]) -> Option<String> {
            if candidate.full_name() == "app::Bad" {
                panic!("cannot name Bad");
            }
            None
        }
    }

    #[test]
    fn test_strategy_panic_only_costs_that_candidate_its_convention() {
        let module = ManifestModule::new("M", "1.0.0")
            .with_type(
                ManifestType::class("Good")
                    .in_namespace("app")
                    .implements("app::IGood")
                    .with_metadata(RawMetadata::default()),
            )
            .with_type(
                ManifestType::class("Bad")
                    .in_namespace("app")
                    .implements("app::IBad")
                    .with_metadata(RawMetadata::default()),
            );
        let introspector = Arc::new(ManifestIntrospector::from_manifest(Manifest { modules: vec![module] }));
        let resolver = Arc::new(ConventionResolver::with_defaults());
        resolver.register(PanicsOnBad);
        let metrics = Arc::new(MetricsCollector::new());
        let scanner = ModuleScanner::new(introspector, resolver).with_metrics(metrics.clone());

        let report = scanner.scan_module(&Module::new("M", "1.0.0"));

        assert_eq!(report.status, ScanStatus::Partial);
        assert_eq!(report.records.len(), 2);
        assert!(report.records.iter().any(|r| r.target == "app::IGood"));
        assert!(report.records.iter().any(|r| r.target == "app::IBad"));
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning && d.message.contains("cannot name Bad")));
        assert_eq!(metrics.error_count("convention_panic"), 1);
        assert_eq!(metrics.error_count("scanner_panic"), 0);
    }

    struct PanickingIntrospector;

    impl ModuleIntrospector for PanickingIntrospector {
        fn enumerate_modules(&self) -> Result<Vec<Module>, IntrospectionError> {
            Ok(Vec::new())
        }

        fn enumerate_types(&self, _module: &Module) -> Result<TypeEnumeration, IntrospectionError> {
            panic!("introspector blew up");
        }

        fn implemented_abstractions(&self, _ty: &TypeDescriptor) -> Vec<String> {
            Vec::new()
        }

        fn declared_metadata(&self, _ty: &TypeDescriptor) -> Result<Option<RawMetadata>, IntrospectionError> {
            Ok(None)
        }
    }

    #[test]
    fn test_introspector_panic_is_contained() {
        let metrics = Arc::new(MetricsCollector::new());
        let scanner = ModuleScanner::new(Arc::new(PanickingIntrospector), Arc::new(ConventionResolver::new()))
            .with_metrics(metrics.clone());

        let report = scanner.scan_module(&Module::new("Any", "1"));
        assert_eq!(report.status, ScanStatus::Failed);
        assert!(report.diagnostics[0].message.contains("introspector blew up"));
        assert_eq!(metrics.error_count("scanner_panic"), 1);
    }
}
