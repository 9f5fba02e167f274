// Tue Jan 13 2026 - Alex

pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod scan_cache;

pub use entry::CacheEntry;
pub use error::CacheError;
pub use fingerprint::{FileSystemProbe, FingerprintProbe, ModuleFingerprint};
pub use scan_cache::{CacheLookup, CacheStats, ScanCache};
