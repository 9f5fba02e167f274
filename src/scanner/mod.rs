// Tue Jan 13 2026 - Alex

pub mod error;
pub mod filter;
pub mod metadata_cache;
pub mod scanner;

pub use error::ScanError;
pub use filter::TypeFilter;
pub use metadata_cache::{CachedTypeInfo, MetadataCache};
pub use scanner::{ModuleScanReport, ModuleScanner, ScanCounts, ScanStatus};
