// Tue Jan 13 2026 - Alex

use crate::plugin::{DiscoveryPlugin, PluginCoordinator, PluginError};
use std::sync::Arc;

/// Startup-time list of plugins. Names must be unique.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn DiscoveryPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: DiscoveryPlugin + 'static>(&mut self, plugin: P) -> Result<&mut Self, PluginError> {
        self.register_arc(Arc::new(plugin))
    }

    pub fn register_arc(&mut self, plugin: Arc<dyn DiscoveryPlugin>) -> Result<&mut Self, PluginError> {
        if self.contains(plugin.name()) {
            return Err(PluginError::DuplicatePlugin(plugin.name().to_string()));
        }
        self.plugins.push(plugin);
        Ok(self)
    }

    pub fn with_plugin<P: DiscoveryPlugin + 'static>(mut self, plugin: P) -> Result<Self, PluginError> {
        self.register(plugin)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn into_plugins(self) -> Vec<Arc<dyn DiscoveryPlugin>> {
        self.plugins
    }

    pub fn build(self) -> PluginCoordinator {
        PluginCoordinator::from_registry(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryConfig;
    use crate::model::{Module, RegistrationRecord};

    struct Named(&'static str);

    impl DiscoveryPlugin for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn can_process(&self, _module: &Module) -> bool {
            true
        }

        fn discover(&self, _module: &Module, _config: &DiscoveryConfig) -> Result<Vec<RegistrationRecord>, PluginError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = PluginRegistry::new();
        registry.register(Named("a")).unwrap().register(Named("b")).unwrap();
        assert!(matches!(registry.register(Named("a")), Err(PluginError::DuplicatePlugin(name)) if name == "a"));
        assert_eq!(registry.len(), 2);

        let coordinator = registry.build();
        assert_eq!(coordinator.plugin_names(), vec!["a", "b"]);
    }
}
