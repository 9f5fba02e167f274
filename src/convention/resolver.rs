// Tue Jan 13 2026 - Alex

use crate::convention::strategy::{ConventionStrategy, ImplSuffixConvention, StandardConvention};
use crate::model::TypeCandidate;
use crate::utils::panic_message;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    Strategy(String),
    SingleAbstraction,
    ImplementationType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub target: String,
    pub source: ResolutionSource,
    /// Set when the implementation type was used although several abstractions existed.
    pub ambiguous: bool,
    /// Strategies that panicked on this candidate, with the panic message.
    /// They were skipped and the chain continued.
    pub failed_strategies: Vec<(String, String)>,
}

/// Priority-ordered chain of convention strategies. Always produces a target.
pub struct ConventionResolver {
    strategies: RwLock<Vec<Arc<dyn ConventionStrategy>>>,
}

impl ConventionResolver {
    pub fn new() -> Self {
        Self {
            strategies: RwLock::new(Vec::new()),
        }
    }

    pub fn with_defaults() -> Self {
        let resolver = Self::new();
        resolver.register(StandardConvention::new());
        resolver.register(ImplSuffixConvention::new());
        resolver
    }

    pub fn register<S: ConventionStrategy + 'static>(&self, strategy: S) {
        self.register_arc(Arc::new(strategy));
    }

    pub fn register_arc(&self, strategy: Arc<dyn ConventionStrategy>) {
        let mut strategies = self.strategies.write();
        log::debug!("Registered convention {} (priority {})", strategy.name(), strategy.priority());
        strategies.push(strategy);
        strategies.sort_by_key(|s| s.priority());
    }

    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies.read().iter().map(|s| s.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.read().is_empty()
    }

    /// Runs the chain, then falls back to the single abstraction, then to the
    /// implementation type itself. A strategy that panics counts as no match.
    pub fn resolve(&self, candidate: &TypeCandidate, abstractions: &[String]) -> Resolution {
        let mut failed_strategies = Vec::new();

        if let Some((name, target)) = self.resolve_with_strategies(candidate, abstractions, &mut failed_strategies) {
            return Resolution {
                target,
                source: ResolutionSource::Strategy(name),
                ambiguous: false,
                failed_strategies,
            };
        }

        if let [single] = abstractions {
            return Resolution {
                target: single.clone(),
                source: ResolutionSource::SingleAbstraction,
                ambiguous: false,
                failed_strategies,
            };
        }

        Resolution {
            target: candidate.full_name(),
            source: ResolutionSource::ImplementationType,
            ambiguous: abstractions.len() > 1,
            failed_strategies,
        }
    }

    fn resolve_with_strategies(
        &self,
        candidate: &TypeCandidate,
        abstractions: &[String],
        failed: &mut Vec<(String, String)>,
    ) -> Option<(String, String)> {
        let strategies = self.strategies.read().clone();

        for strategy in &strategies {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                if strategy.can_apply(candidate) {
                    strategy.resolve(candidate, abstractions)
                } else {
                    None
                }
            }));

            match outcome {
                Ok(Some(target)) => return Some((strategy.name().to_string(), target)),
                Ok(None) => {}
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::warn!(
                        "Convention {} panicked on {}: {}",
                        strategy.name(),
                        candidate.full_name(),
                        message
                    );
                    failed.push((strategy.name().to_string(), message));
                }
            }
        }

        None
    }
}

impl Default for ConventionResolver {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawMetadata, TypeDescriptor, TypeFlags};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn candidate(name: &str, abstractions: &[&str]) -> TypeCandidate {
        TypeCandidate::new(
            TypeDescriptor::new("App@1.0.0", "", name, TypeFlags::default()),
            abstractions.iter().map(|s| s.to_string()).collect(),
            RawMetadata::default(),
        )
    }

    struct Fixed {
        name: &'static str,
        priority: i32,
        target: &'static str,
        resolve_calls: AtomicUsize,
        applies: bool,
    }

    impl Fixed {
        fn new(name: &'static str, priority: i32, target: &'static str) -> Self {
            Self {
                name,
                priority,
                target,
                resolve_calls: AtomicUsize::new(0),
                applies: true,
            }
        }
    }

    impl ConventionStrategy for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn can_apply(&self, _candidate: &TypeCandidate) -> bool {
            self.applies
        }

        fn resolve(&self, _candidate: &TypeCandidate, _abstractions: &[String]) -> Option<String> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            Some(self.target.to_string())
        }
    }

    #[test]
    fn test_lower_priority_wins_regardless_of_registration_order() {
        let resolver = ConventionResolver::new();
        resolver.register(Fixed::new("late", 15, "ILate"));
        resolver.register(Fixed::new("early", 5, "IEarly"));

        let c = candidate("Thing", &["IEarly", "ILate"]);
        let resolution = resolver.resolve(&c, &c.abstractions);
        assert_eq!(resolution.target, "IEarly");
        assert_eq!(resolution.source, ResolutionSource::Strategy("early".to_string()));
        assert_eq!(resolver.strategy_names(), vec!["early", "late"]);
    }

    #[test]
    fn test_can_apply_gates_resolve() {
        let resolver = ConventionResolver::new();
        let skipped = Arc::new(Fixed {
            applies: false,
            ..Fixed::new("skipped", 1, "ISkipped")
        });
        resolver.register_arc(skipped.clone());
        resolver.register(Fixed::new("used", 2, "IUsed"));

        let c = candidate("Thing", &[]);
        assert_eq!(resolver.resolve(&c, &c.abstractions).target, "IUsed");
        assert_eq!(skipped.resolve_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_widget_resolves_through_standard_convention() {
        let resolver = ConventionResolver::with_defaults();
        let c = candidate("Widget", &["IWidget", "IComponent"]);
        let resolution = resolver.resolve(&c, &c.abstractions);
        assert_eq!(resolution.target, "IWidget");
        assert_eq!(
            resolution.source,
            ResolutionSource::Strategy("StandardConvention".to_string())
        );
    }

    #[test]
    fn test_single_abstraction_fallback() {
        let resolver = ConventionResolver::with_defaults();
        let c = candidate("SystemClock", &["IClock"]);
        let resolution = resolver.resolve(&c, &c.abstractions);
        assert_eq!(resolution.target, "IClock");
        assert_eq!(resolution.source, ResolutionSource::SingleAbstraction);
    }

    #[test]
    fn test_implementation_fallback_marks_ambiguity() {
        let resolver = ConventionResolver::with_defaults();

        let none = candidate("Standalone", &[]);
        let resolution = resolver.resolve(&none, &none.abstractions);
        assert_eq!(resolution.target, "Standalone");
        assert!(!resolution.ambiguous);

        let many = candidate("Mixer", &["IAudio", "IVideo"]);
        let resolution = resolver.resolve(&many, &many.abstractions);
        assert_eq!(resolution.target, "Mixer");
        assert_eq!(resolution.source, ResolutionSource::ImplementationType);
        assert!(resolution.ambiguous);
    }

    struct Explosive;

    impl ConventionStrategy for Explosive {
        fn name(&self) -> &str {
            "explosive"
        }

        fn priority(&self) -> i32 {
            1
        }

        fn can_apply(&self, candidate: &TypeCandidate) -> bool {
            candidate.full_name() != "Fragile"
        }

        fn resolve(&self, _candidate: &TypeCandidate, _abstractions: &[String]) -> Option<String> {
            panic!("strategy exploded");
        }
    }

    #[test]
    fn test_panicking_strategy_is_skipped() {
        let resolver = ConventionResolver::with_defaults();
        resolver.register(Explosive);

        let widget = candidate("Widget", &["IWidget", "IComponent"]);
        let resolution = resolver.resolve(&widget, &widget.abstractions);
        assert_eq!(resolution.target, "IWidget");
        assert_eq!(resolution.failed_strategies.len(), 1);
        assert_eq!(resolution.failed_strategies[0].0, "explosive");
        assert!(resolution.failed_strategies[0].1.contains("strategy exploded"));

        let fragile = candidate("Fragile", &["IFragile"]);
        let resolution = resolver.resolve(&fragile, &fragile.abstractions);
        assert_eq!(resolution.target, "IFragile");
        assert!(resolution.failed_strategies.is_empty());
    }
}
