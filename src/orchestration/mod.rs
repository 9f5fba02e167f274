// Tue Jan 13 2026 - Alex

pub mod aggregator;
pub mod error;
pub mod filter;
pub mod orchestrator;
pub mod result;
pub mod scheduler;

pub use aggregator::{Aggregation, AggregationStatistics, ResultAggregator};
pub use error::DiscoveryError;
pub use filter::{FilterOutcome, FilterReason, PredicateContext, PredicateEvaluator, RegistrationFilter};
pub use orchestrator::{DiscoveryOrchestrator, DiscoveryOrchestratorBuilder};
pub use result::{DiscoveryResult, IncrementalDiscoveryResult, PreloadReport};
pub use scheduler::{ScanScheduler, Scheduled};
