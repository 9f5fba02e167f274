// Tue Jan 13 2026 - Alex

pub mod collector;
pub mod snapshot;

pub use collector::{CacheOperation, MetricsCollector};
pub use snapshot::{
    CacheOperationStats, CustomMetricStats, MetricsSnapshot, ModuleScanStats, PluginStats, RegistrationStats,
};
