// Tue Jan 13 2026 - Alex

use crate::config::{DiscoveryConfig, SuffixRule};
use crate::convention::ConventionResolver;
use crate::introspection::ModuleIntrospector;
use crate::model::{Module, RawMetadata, RegistrationRecord, TypeCandidate};
use crate::plugin::{DiscoveryPlugin, PluginError, ValidationResult};
use crate::scanner::TypeFilter;
use std::sync::Arc;

/// Registers undecorated types by naming rule, e.g. every `*Repository` as scoped.
///
/// Types that declare discovery metadata are left to the scanner.
pub struct SuffixRegistrationPlugin {
    introspector: Arc<dyn ModuleIntrospector>,
    resolver: Arc<ConventionResolver>,
    rules: Vec<SuffixRule>,
    priority: i32,
}

impl SuffixRegistrationPlugin {
    pub const NAME: &'static str = "suffix-rules";

    pub fn new(
        introspector: Arc<dyn ModuleIntrospector>,
        resolver: Arc<ConventionResolver>,
        rules: Vec<SuffixRule>,
    ) -> Self {
        Self {
            introspector,
            resolver,
            rules,
            priority: 50,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn rule_for(&self, type_name: &str) -> Option<&SuffixRule> {
        self.rules
            .iter()
            .find(|r| type_name.len() > r.suffix.len() && type_name.ends_with(&r.suffix))
    }
}

impl DiscoveryPlugin for SuffixRegistrationPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn can_process(&self, module: &Module) -> bool {
        !self.rules.is_empty() && self.introspector.may_contain_candidates(module)
    }

    fn discover(&self, module: &Module, _config: &DiscoveryConfig) -> Result<Vec<RegistrationRecord>, PluginError> {
        let enumeration = self.introspector.enumerate_types(module)?;
        let mut records = Vec::new();

        for ty in TypeFilter::concrete_candidates(&enumeration.types) {
            let Some(rule) = self.rule_for(&ty.name) else {
                continue;
            };
            // Unreadable metadata is reported by the scanner.
            if !matches!(self.introspector.declared_metadata(ty), Ok(None)) {
                continue;
            }

            let abstractions = TypeFilter::without_system_abstractions(self.introspector.implemented_abstractions(ty));
            let metadata = RawMetadata::new(rule.lifetime).with_order(rule.order);
            let candidate = TypeCandidate::new(ty.clone(), abstractions, metadata);
            let target = self.resolver.resolve(&candidate, &candidate.abstractions).target;

            records.push(
                RegistrationRecord::new(target, ty.full_name())
                    .with_lifetime(rule.lifetime)
                    .with_order(rule.order),
            );
        }

        Ok(records)
    }

    fn validate(
        &self,
        own: &[RegistrationRecord],
        _all: &[RegistrationRecord],
        _config: &DiscoveryConfig,
    ) -> Result<ValidationResult, PluginError> {
        let mut result = ValidationResult::valid().with_info(format!("{} types matched naming rules", own.len()));
        for record in own.iter().filter(|r| r.target == r.implementation) {
            result = result.with_warning(format!("{} has no abstraction and registers as itself", record.implementation));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspection::{Manifest, ManifestIntrospector, ManifestModule, ManifestType};
    use crate::model::Lifetime;

    fn plugin(rules: Vec<SuffixRule>) -> SuffixRegistrationPlugin {
        let introspector = Arc::new(ManifestIntrospector::from_manifest(Manifest {
            modules: vec![ManifestModule::new("Data", "2.0.0")
                .with_type(
                    ManifestType::class("OrderRepository")
                        .in_namespace("data")
                        .implements("data::IOrderRepository"),
                )
                .with_type(
                    ManifestType::class("UserRepository")
                        .in_namespace("data")
                        .implements("data::IUserRepository")
                        .with_metadata(RawMetadata::new(Lifetime::Singleton)),
                )
                .with_type(ManifestType::class("AuditRepository").in_namespace("data"))
                .with_type(ManifestType::class("Repository").in_namespace("data"))
                .with_type(ManifestType::class("BaseRepository").in_namespace("data").abstract_class())],
        }));
        SuffixRegistrationPlugin::new(introspector, Arc::new(ConventionResolver::with_defaults()), rules)
    }

    fn repository_rule() -> SuffixRule {
        SuffixRule {
            suffix: "Repository".to_string(),
            lifetime: Lifetime::Scoped,
            order: 5,
        }
    }

    #[test]
    fn test_matches_undecorated_types_only() {
        let plugin = plugin(vec![repository_rule()]);
        let module = Module::new("Data", "2.0.0");
        assert!(plugin.can_process(&module));

        let records = plugin.discover(&module, &DiscoveryConfig::default()).unwrap();
        let implementations: Vec<_> = records.iter().map(|r| r.implementation.as_str()).collect();
        assert_eq!(implementations, vec!["data::OrderRepository", "data::AuditRepository"]);

        assert_eq!(records[0].target, "data::IOrderRepository");
        assert_eq!(records[0].lifetime, Lifetime::Scoped);
        assert_eq!(records[0].order, 5);
        assert_eq!(records[1].target, "data::AuditRepository");

        let validation = plugin.validate(&records, &records, &DiscoveryConfig::default()).unwrap();
        assert!(validation.is_valid);
        assert_eq!(validation.warnings.len(), 1);
    }

    #[test]
    fn test_without_rules_nothing_is_eligible() {
        let plugin = plugin(Vec::new());
        assert!(!plugin.can_process(&Module::new("Data", "2.0.0")));
    }

    #[test]
    fn test_unknown_module_is_an_error() {
        let plugin = plugin(vec![repository_rule()]);
        let result = plugin.discover(&Module::new("Missing", "1"), &DiscoveryConfig::default());
        assert!(matches!(result, Err(PluginError::Introspection(_))));
    }
}
