// Tue Jan 13 2026 - Alex

use crate::config::DiscoveryConfig;
use crate::model::{ConditionalPredicate, Diagnostic, RegistrationRecord};
use crate::utils::panic_message;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PredicateContext {
    pub active_profile: Option<String>,
    pub test_mode: bool,
}

/// Host-supplied evaluation of conditional predicates. The discovery core
/// never interprets predicate expressions itself.
pub trait PredicateEvaluator: Send + Sync {
    fn evaluate(&self, predicate: &ConditionalPredicate, context: &PredicateContext) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FilterReason {
    Profile(String),
    TestMode,
    Predicate(String),
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub kept: Vec<RegistrationRecord>,
    pub removed: Vec<(RegistrationRecord, FilterReason)>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Drops records that do not apply to the current run: another profile,
/// excluded from tests, or a predicate that evaluates false.
pub struct RegistrationFilter {
    context: PredicateContext,
    evaluator: Option<Arc<dyn PredicateEvaluator>>,
}

impl RegistrationFilter {
    pub fn new(context: PredicateContext) -> Self {
        Self {
            context,
            evaluator: None,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(PredicateContext {
            active_profile: config.active_profile.clone(),
            test_mode: config.test_mode,
        })
    }

    pub fn with_evaluator(mut self, evaluator: Option<Arc<dyn PredicateEvaluator>>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn apply(&self, records: Vec<RegistrationRecord>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for record in records {
            match self.reject_reason(&record, &mut outcome.diagnostics) {
                None => outcome.kept.push(record),
                Some(reason) => {
                    log::debug!("Filtered {}: {:?}", record, reason);
                    outcome.removed.push((record, reason));
                }
            }
        }

        outcome
    }

    fn reject_reason(&self, record: &RegistrationRecord, diagnostics: &mut Vec<Diagnostic>) -> Option<FilterReason> {
        if let (Some(active), Some(profile)) = (&self.context.active_profile, &record.profile) {
            if active != profile {
                return Some(FilterReason::Profile(profile.clone()));
            }
        }

        if self.context.test_mode && record.ignore_in_tests {
            return Some(FilterReason::TestMode);
        }

        let evaluator = self.evaluator.as_ref()?;
        for predicate in &record.predicates {
            let passed = panic::catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(predicate, &self.context)))
                .unwrap_or_else(|payload| {
                    diagnostics.push(Diagnostic::error(
                        "filter",
                        format!(
                            "predicate {} on {} panicked: {}",
                            predicate.expression,
                            record.implementation,
                            panic_message(payload.as_ref())
                        ),
                    ));
                    false
                });
            if !passed {
                return Some(FilterReason::Predicate(predicate.expression.clone()));
            }
        }

        None
    }
}
