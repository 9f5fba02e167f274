// Tue Jan 13 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntrospectionError {
    #[error("Module not found: {0}")]
    ModuleNotFound(String),
    #[error("Failed to load module {module}: {reason}")]
    ModuleLoad { module: String, reason: String },
    #[error("Malformed metadata on {type_name}: {reason}")]
    MalformedMetadata { type_name: String, reason: String },
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
