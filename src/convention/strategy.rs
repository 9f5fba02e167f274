// Tue Jan 13 2026 - Alex

use crate::model::{simple_type_name, TypeCandidate};
use regex::Regex;

/// Maps an implementation type to the abstraction it should be registered under.
///
/// `can_apply` is a cheap pre-check; `resolve` is only called when it passes.
/// Strategies see candidates by shared reference and are called from several
/// scanner workers at once.
pub trait ConventionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Lower values are evaluated first.
    fn priority(&self) -> i32;

    fn can_apply(&self, candidate: &TypeCandidate) -> bool;

    fn resolve(&self, candidate: &TypeCandidate, abstractions: &[String]) -> Option<String>;
}

fn find_by_simple_name(abstractions: &[String], wanted: &str) -> Option<String> {
    abstractions
        .iter()
        .find(|a| simple_type_name(a) == wanted)
        .cloned()
}

/// `Widget` implements `IWidget`.
pub struct StandardConvention {
    priority: i32,
}

impl StandardConvention {
    pub const DEFAULT_PRIORITY: i32 = 10;

    pub fn new() -> Self {
        Self {
            priority: Self::DEFAULT_PRIORITY,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Default for StandardConvention {
    fn default() -> Self {
        Self::new()
    }
}

impl ConventionStrategy for StandardConvention {
    fn name(&self) -> &str {
        "StandardConvention"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn can_apply(&self, candidate: &TypeCandidate) -> bool {
        !candidate.abstractions.is_empty()
    }

    fn resolve(&self, candidate: &TypeCandidate, abstractions: &[String]) -> Option<String> {
        find_by_simple_name(abstractions, &format!("I{}", candidate.name()))
    }
}

/// `WidgetImpl` implements `Widget` or `IWidget`.
pub struct ImplSuffixConvention {
    priority: i32,
}

impl ImplSuffixConvention {
    pub const DEFAULT_PRIORITY: i32 = 20;
    const SUFFIX: &'static str = "Impl";

    pub fn new() -> Self {
        Self {
            priority: Self::DEFAULT_PRIORITY,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Default for ImplSuffixConvention {
    fn default() -> Self {
        Self::new()
    }
}

impl ConventionStrategy for ImplSuffixConvention {
    fn name(&self) -> &str {
        "ImplSuffixConvention"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn can_apply(&self, candidate: &TypeCandidate) -> bool {
        let name = candidate.name();
        name.len() > Self::SUFFIX.len() && name.ends_with(Self::SUFFIX)
    }

    fn resolve(&self, candidate: &TypeCandidate, abstractions: &[String]) -> Option<String> {
        let base = candidate.name().strip_suffix(Self::SUFFIX)?;
        find_by_simple_name(abstractions, base).or_else(|| find_by_simple_name(abstractions, &format!("I{}", base)))
    }
}

/// Regex rule: when the implementation name matches `pattern`, the abstraction
/// named by expanding `template` (e.g. `I${base}`) is chosen if implemented.
pub struct PatternConvention {
    name: String,
    priority: i32,
    pattern: Regex,
    template: String,
}

impl PatternConvention {
    pub fn new(name: &str, priority: i32, pattern: &str, template: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            priority,
            pattern: Regex::new(pattern)?,
            template: template.to_string(),
        })
    }
}

impl ConventionStrategy for PatternConvention {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn can_apply(&self, candidate: &TypeCandidate) -> bool {
        self.pattern.is_match(candidate.name())
    }

    fn resolve(&self, candidate: &TypeCandidate, abstractions: &[String]) -> Option<String> {
        let captures = self.pattern.captures(candidate.name())?;
        let mut expected = String::new();
        captures.expand(&self.template, &mut expected);
        find_by_simple_name(abstractions, &expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawMetadata, TypeDescriptor, TypeFlags};

    fn candidate(name: &str, abstractions: &[&str]) -> TypeCandidate {
        TypeCandidate::new(
            TypeDescriptor::new("App@1.0.0", "app", name, TypeFlags::default()),
            abstractions.iter().map(|s| s.to_string()).collect(),
            RawMetadata::default(),
        )
    }

    #[test]
    fn test_standard_convention() {
        let c = candidate("Widget", &["app::IWidget", "app::IDisposable"]);
        let strategy = StandardConvention::new();
        assert!(strategy.can_apply(&c));
        assert_eq!(strategy.resolve(&c, &c.abstractions), Some("app::IWidget".to_string()));

        let other = candidate("Gadget", &["app::IWidget"]);
        assert_eq!(strategy.resolve(&other, &other.abstractions), None);
    }

    #[test]
    fn test_impl_suffix_convention() {
        let strategy = ImplSuffixConvention::new();

        let plain = candidate("RepositoryImpl", &["Repository"]);
        assert!(strategy.can_apply(&plain));
        assert_eq!(strategy.resolve(&plain, &plain.abstractions), Some("Repository".to_string()));

        let prefixed = candidate("RepositoryImpl", &["data::IRepository"]);
        assert_eq!(
            strategy.resolve(&prefixed, &prefixed.abstractions),
            Some("data::IRepository".to_string())
        );

        assert!(!strategy.can_apply(&candidate("Impl", &["X"])));
    }

    #[test]
    fn test_pattern_convention() {
        let strategy = PatternConvention::new("handlers", 30, r"^(?P<base>\w+)Handler$", "I${base}Handler").unwrap();
        let c = candidate("OrderPlacedHandler", &["events::IOrderPlacedHandler", "events::IHandler"]);
        assert!(strategy.can_apply(&c));
        assert_eq!(
            strategy.resolve(&c, &c.abstractions),
            Some("events::IOrderPlacedHandler".to_string())
        );
        assert!(!strategy.can_apply(&candidate("OrderService", &[])));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(PatternConvention::new("bad", 1, "(", "x").is_err());
    }
}
