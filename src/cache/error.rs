// Tue Jan 13 2026 - Alex

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cannot fingerprint module {module}: {source}")]
    Fingerprint {
        module: String,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Unsupported cache file version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}
