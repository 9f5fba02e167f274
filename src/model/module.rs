// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a module's code lives. File-backed modules can be fingerprinted;
/// dynamic ones cannot be rebuilt independently and are always considered current.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleLocation {
    File(PathBuf),
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Module {
    name: String,
    version: String,
    location: ModuleLocation,
}

impl Module {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            location: ModuleLocation::Dynamic,
        }
    }

    pub fn from_file(name: impl Into<String>, version: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            location: ModuleLocation::File(path.into()),
        }
    }

    pub fn with_location(mut self, location: ModuleLocation) -> Self {
        self.location = location;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn location(&self) -> &ModuleLocation {
        &self.location
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            ModuleLocation::File(path) => Some(path),
            ModuleLocation::Dynamic => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.location, ModuleLocation::Dynamic)
    }

    /// Stable key used by the scan cache and the metadata cache.
    pub fn identity(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_includes_version() {
        let a = Module::new("Billing", "1.0.0");
        let b = Module::new("Billing", "1.1.0");
        assert_ne!(a.identity(), b.identity());
        assert_eq!(a.identity(), "Billing@1.0.0");
    }

    #[test]
    fn test_location() {
        let dynamic = Module::new("Generated", "0.1.0");
        assert!(dynamic.is_dynamic());
        assert!(dynamic.path().is_none());

        let file = Module::from_file("Billing", "1.0.0", "/opt/modules/billing.so");
        assert!(!file.is_dynamic());
        assert_eq!(file.path(), Some(Path::new("/opt/modules/billing.so")));
    }
}
