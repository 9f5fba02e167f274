// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifetime {
    Singleton,
    Scoped,
    Transient,
}

impl Default for Lifetime {
    fn default() -> Self {
        Lifetime::Transient
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "singleton"),
            Lifetime::Scoped => write!(f, "scoped"),
            Lifetime::Transient => write!(f, "transient"),
        }
    }
}

/// Opaque condition attached to a record. The core carries it through;
/// an external evaluator decides whether it holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionalPredicate {
    pub kind: String,
    pub expression: String,
}

impl ConditionalPredicate {
    pub fn new(kind: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            expression: expression.into(),
        }
    }
}

/// Which path produced a record. Breaks `order` ties: explicit, then convention, then plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordSource {
    Explicit,
    Convention,
    Plugin(String),
}

impl RecordSource {
    pub fn precedence(&self) -> u8 {
        match self {
            RecordSource::Explicit => 0,
            RecordSource::Convention => 1,
            RecordSource::Plugin(_) => 2,
        }
    }
}

impl Default for RecordSource {
    fn default() -> Self {
        RecordSource::Convention
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub target: String,
    pub implementation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub target: String,
    pub implementation: String,
    pub lifetime: Lifetime,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub ignore_in_tests: bool,
    #[serde(default)]
    pub predicates: Vec<ConditionalPredicate>,
    #[serde(default)]
    pub source: RecordSource,
    #[serde(default)]
    pub module: Option<String>,
}

impl RegistrationRecord {
    pub fn new(target: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            implementation: implementation.into(),
            lifetime: Lifetime::default(),
            order: 0,
            profile: None,
            ignore_in_tests: false,
            predicates: Vec::new(),
            source: RecordSource::default(),
            module: None,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_ignore_in_tests(mut self, ignore: bool) -> Self {
        self.ignore_in_tests = ignore;
        self
    }

    pub fn with_predicates(mut self, predicates: Vec<ConditionalPredicate>) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn with_source(mut self, source: RecordSource) -> Self {
        self.source = source;
        self
    }

    pub fn from_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            target: self.target.clone(),
            implementation: self.implementation.clone(),
        }
    }

    /// A record the container could never satisfy.
    pub fn is_well_formed(&self) -> bool {
        !self.target.trim().is_empty() && !self.implementation.trim().is_empty()
    }

    /// Rough heap footprint, used for cache sizing.
    pub fn estimated_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.target.len()
            + self.implementation.len()
            + self.profile.as_ref().map_or(0, |p| p.len())
            + self.module.as_ref().map_or(0, |m| m.len())
            + self
                .predicates
                .iter()
                .map(|p| std::mem::size_of::<ConditionalPredicate>() + p.kind.len() + p.expression.len())
                .sum::<usize>()
    }
}

impl fmt::Display for RegistrationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({}, order {})", self.target, self.implementation, self.lifetime, self.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_precedence() {
        assert!(RecordSource::Explicit.precedence() < RecordSource::Convention.precedence());
        assert!(RecordSource::Convention.precedence() < RecordSource::Plugin("x".into()).precedence());
    }

    #[test]
    fn test_well_formed() {
        assert!(RegistrationRecord::new("IWidget", "Widget").is_well_formed());
        assert!(!RegistrationRecord::new("", "Widget").is_well_formed());
        assert!(!RegistrationRecord::new("IWidget", "  ").is_well_formed());
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let json = r#"{"target":"IClock","implementation":"SystemClock","lifetime":"Singleton"}"#;
        let record: RegistrationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.order, 0);
        assert_eq!(record.lifetime, Lifetime::Singleton);
        assert_eq!(record.source, RecordSource::Convention);
        assert!(record.predicates.is_empty());
    }
}
