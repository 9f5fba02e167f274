// Tue Jan 13 2026 - Alex

pub mod cache;
pub mod config;
pub mod convention;
pub mod introspection;
pub mod metrics;
pub mod model;
pub mod orchestration;
pub mod output;
pub mod plugin;
pub mod scanner;
pub mod utils;

pub use cache::ScanCache;
pub use config::DiscoveryConfig;
pub use convention::ConventionResolver;
pub use introspection::{ManifestIntrospector, ModuleIntrospector};
pub use metrics::MetricsCollector;
pub use model::{Lifetime, Module, RegistrationRecord};
pub use orchestration::{DiscoveryOrchestrator, DiscoveryResult};
pub use plugin::{DiscoveryPlugin, PluginCoordinator};
pub use scanner::ModuleScanner;
