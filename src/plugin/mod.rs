// Tue Jan 13 2026 - Alex

pub mod builtin;
pub mod call_pool;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod result;

pub use builtin::SuffixRegistrationPlugin;
pub use call_pool::CallPool;
pub use coordinator::PluginCoordinator;
pub use error::PluginError;
pub use registry::PluginRegistry;
pub use result::{ModuleOutcome, PairState, PluginExecutionResult, PluginResult, PluginStatus};

use crate::config::DiscoveryConfig;
use crate::model::{Module, RegistrationRecord};
use serde::Serialize;

/// An independently authored source of registration records.
///
/// Plugins are called from worker threads and may be abandoned mid-call when
/// they exceed their time budget, so they must not hold locks shared with the
/// host across `discover` or `validate`.
pub trait DiscoveryPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Lower values run first.
    fn priority(&self) -> i32 {
        100
    }

    fn can_process(&self, module: &Module) -> bool;

    fn discover(&self, module: &Module, config: &DiscoveryConfig) -> Result<Vec<RegistrationRecord>, PluginError>;

    /// Called once every plugin has finished discovering. `own` is what this
    /// plugin contributed, `all` is every plugin's contribution.
    fn validate(
        &self,
        _own: &[RegistrationRecord],
        _all: &[RegistrationRecord],
        _config: &DiscoveryConfig,
    ) -> Result<ValidationResult, PluginError> {
        Ok(ValidationResult::valid())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            ..Self::default()
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![error.into()],
            ..Self::default()
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info.push(info.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.is_valid = false;
        self.errors.push(error.into());
        self
    }
}
