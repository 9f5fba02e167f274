// Tue Jan 13 2026 - Alex

use crate::introspection::IntrospectionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Module {module} could not be enumerated: {source}")]
    ModuleLoad {
        module: String,
        #[source]
        source: IntrospectionError,
    },
    #[error("Metadata for {type_name} is unreadable: {source}")]
    CandidateMetadata {
        type_name: String,
        #[source]
        source: IntrospectionError,
    },
    #[error("Ambiguous target for {type_name}: {count} abstractions and no convention matched")]
    AmbiguousTarget { type_name: String, count: usize },
    #[error("Convention {strategy} panicked on {type_name}: {message}")]
    ConventionPanicked {
        strategy: String,
        type_name: String,
        message: String,
    },
    #[error("Scanner panicked on module {module}: {message}")]
    Panicked { module: String, message: String },
}

impl ScanError {
    /// Key under which the error is counted in metrics.
    pub fn metric_kind(&self) -> &'static str {
        match self {
            ScanError::ModuleLoad { .. } => "module_load",
            ScanError::CandidateMetadata { .. } => "candidate_metadata",
            ScanError::AmbiguousTarget { .. } => "convention_ambiguity",
            ScanError::ConventionPanicked { .. } => "convention_panic",
            ScanError::Panicked { .. } => "scanner_panic",
        }
    }
}
