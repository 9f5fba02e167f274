// Tue Jan 13 2026 - Alex

use crate::introspection::{IntrospectionError, ModuleIntrospector, TypeEnumeration, TypeLoadFailure};
use crate::model::{Module, RawMetadata, TypeDescriptor, TypeFlags, TypeId};
use ahash::AHashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub modules: Vec<ManifestModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestModule {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// False when the module does not reference the discovery metadata at all.
    #[serde(default = "default_true")]
    pub references_discovery: bool,
    #[serde(default)]
    pub load_error: Option<String>,
    #[serde(default)]
    pub types: Vec<ManifestType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
}

impl Default for TypeKind {
    fn default() -> Self {
        TypeKind::Class
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestType {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub generic_definition: bool,
    #[serde(default)]
    pub nested: bool,
    #[serde(default = "default_true")]
    pub public: bool,
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub metadata: Option<RawMetadata>,
    #[serde(default)]
    pub malformed_metadata: Option<String>,
    #[serde(default)]
    pub load_error: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ManifestModule {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            path: None,
            references_discovery: true,
            load_error: None,
            types: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_type(mut self, ty: ManifestType) -> Self {
        self.types.push(ty);
        self
    }

    pub fn without_discovery_reference(mut self) -> Self {
        self.references_discovery = false;
        self
    }

    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.load_error = Some(reason.into());
        self
    }

    pub fn identity(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    pub fn to_module(&self) -> Module {
        match &self.path {
            Some(path) => Module::from_file(&self.name, &self.version, path),
            None => Module::new(&self.name, &self.version),
        }
    }
}

impl ManifestType {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            kind: TypeKind::Class,
            is_abstract: false,
            generic_definition: false,
            nested: false,
            public: true,
            implements: Vec::new(),
            metadata: None,
            malformed_metadata: None,
            load_error: None,
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Interface,
            ..Self::class(name)
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn implements(mut self, abstraction: impl Into<String>) -> Self {
        self.implements.push(abstraction.into());
        self
    }

    pub fn with_metadata(mut self, metadata: RawMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn generic_definition(mut self) -> Self {
        self.generic_definition = true;
        self
    }

    pub fn nested_private(mut self) -> Self {
        self.nested = true;
        self.public = false;
        self
    }

    pub fn with_malformed_metadata(mut self, reason: impl Into<String>) -> Self {
        self.malformed_metadata = Some(reason.into());
        self
    }

    pub fn unloadable(mut self, reason: impl Into<String>) -> Self {
        self.load_error = Some(reason.into());
        self
    }

    pub fn flags(&self) -> TypeFlags {
        let mut flags = TypeFlags::empty();
        if matches!(self.kind, TypeKind::Class | TypeKind::Struct) {
            flags |= TypeFlags::CLASS;
        }
        if self.is_abstract {
            flags |= TypeFlags::ABSTRACT;
        }
        if self.generic_definition {
            flags |= TypeFlags::GENERIC_DEFINITION;
        }
        if self.nested {
            flags |= TypeFlags::NESTED;
        }
        if self.public {
            flags |= TypeFlags::PUBLIC;
        }
        flags
    }

    fn descriptor(&self, module_identity: &str) -> TypeDescriptor {
        TypeDescriptor::new(module_identity, &self.namespace, &self.name, self.flags())
    }
}

struct ManifestState {
    modules: IndexMap<String, ManifestModule>,
    types: AHashMap<TypeId, ManifestType>,
}

impl ManifestState {
    fn insert(&mut self, module: ManifestModule) {
        let identity = module.identity();
        self.types.retain(|id, _| !id.belongs_to(&identity));
        for ty in &module.types {
            self.types.insert(ty.descriptor(&identity).id, ty.clone());
        }
        self.modules.insert(identity, module);
    }
}

/// Introspector backed by a declarative JSON manifest of modules and their types.
pub struct ManifestIntrospector {
    state: RwLock<ManifestState>,
}

impl ManifestIntrospector {
    pub fn from_manifest(manifest: Manifest) -> Self {
        let mut state = ManifestState {
            modules: IndexMap::new(),
            types: AHashMap::new(),
        };
        for module in manifest.modules {
            state.insert(module);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, IntrospectionError> {
        let manifest: Manifest = serde_json::from_str(json)?;
        Self::check(&manifest)?;
        Ok(Self::from_manifest(manifest))
    }

    /// Loads a manifest file. Relative module paths resolve against the manifest's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IntrospectionError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut manifest: Manifest = serde_json::from_str(&contents)?;
        Self::check(&manifest)?;

        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        for module in &mut manifest.modules {
            if let Some(module_path) = &module.path {
                if module_path.is_relative() {
                    module.path = Some(base.join(module_path));
                }
            }
        }

        log::debug!("Loaded manifest {} with {} modules", path.display(), manifest.modules.len());
        Ok(Self::from_manifest(manifest))
    }

    fn check(manifest: &Manifest) -> Result<(), IntrospectionError> {
        for module in &manifest.modules {
            if module.name.trim().is_empty() {
                return Err(IntrospectionError::InvalidManifest("module with empty name".to_string()));
            }
            if let Some(ty) = module.types.iter().find(|t| t.name.trim().is_empty()) {
                return Err(IntrospectionError::InvalidManifest(format!(
                    "module {} lists a type with an empty name (namespace '{}')",
                    module.name, ty.namespace
                )));
            }
        }
        Ok(())
    }

    /// Replaces (or adds) a module, as happens when it is rebuilt.
    pub fn upsert_module(&self, module: ManifestModule) {
        self.state.write().insert(module);
    }

    pub fn module_count(&self) -> usize {
        self.state.read().modules.len()
    }
}

impl ModuleIntrospector for ManifestIntrospector {
    fn enumerate_modules(&self) -> Result<Vec<Module>, IntrospectionError> {
        Ok(self.state.read().modules.values().map(ManifestModule::to_module).collect())
    }

    fn may_contain_candidates(&self, module: &Module) -> bool {
        self.state
            .read()
            .modules
            .get(&module.identity())
            .map_or(true, |m| m.references_discovery)
    }

    fn enumerate_types(&self, module: &Module) -> Result<TypeEnumeration, IntrospectionError> {
        let state = self.state.read();
        let identity = module.identity();
        let entry = state
            .modules
            .get(&identity)
            .ok_or_else(|| IntrospectionError::ModuleNotFound(identity.clone()))?;

        if let Some(reason) = &entry.load_error {
            return Err(IntrospectionError::ModuleLoad {
                module: identity,
                reason: reason.clone(),
            });
        }

        let mut enumeration = TypeEnumeration::default();
        for ty in &entry.types {
            match &ty.load_error {
                Some(reason) => enumeration.load_failures.push(TypeLoadFailure {
                    type_name: ty.name.clone(),
                    reason: reason.clone(),
                }),
                None => enumeration.types.push(ty.descriptor(&identity)),
            }
        }

        Ok(enumeration)
    }

    fn implemented_abstractions(&self, ty: &TypeDescriptor) -> Vec<String> {
        self.state
            .read()
            .types
            .get(&ty.id)
            .map(|t| t.implements.clone())
            .unwrap_or_default()
    }

    fn declared_metadata(&self, ty: &TypeDescriptor) -> Result<Option<RawMetadata>, IntrospectionError> {
        let state = self.state.read();
        let Some(entry) = state.types.get(&ty.id) else {
            return Ok(None);
        };

        if let Some(reason) = &entry.malformed_metadata {
            return Err(IntrospectionError::MalformedMetadata {
                type_name: ty.full_name(),
                reason: reason.clone(),
            });
        }

        Ok(entry.metadata.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Lifetime;

    fn sample() -> ManifestIntrospector {
        ManifestIntrospector::from_manifest(Manifest {
            modules: vec![ManifestModule::new("Shop", "1.0.0")
                .with_type(
                    ManifestType::class("OrderService")
                        .in_namespace("shop")
                        .implements("shop::IOrderService")
                        .with_metadata(RawMetadata::new(Lifetime::Scoped)),
                )
                .with_type(ManifestType::interface("IOrderService").in_namespace("shop"))
                .with_type(ManifestType::class("Broken").unloadable("missing dependency"))],
        })
    }

    #[test]
    fn test_enumerate_types_reports_partial_load() {
        let introspector = sample();
        let module = Module::new("Shop", "1.0.0");
        let enumeration = introspector.enumerate_types(&module).unwrap();

        assert_eq!(enumeration.types.len(), 2);
        assert!(enumeration.is_partial());
        assert_eq!(enumeration.load_failures[0].type_name, "Broken");
    }

    #[test]
    fn test_metadata_and_abstractions() {
        let introspector = sample();
        let module = Module::new("Shop", "1.0.0");
        let enumeration = introspector.enumerate_types(&module).unwrap();
        let service = enumeration.types.iter().find(|t| t.name == "OrderService").unwrap();

        let metadata = introspector.declared_metadata(service).unwrap().unwrap();
        assert_eq!(metadata.lifetime, Lifetime::Scoped);
        assert_eq!(introspector.implemented_abstractions(service), vec!["shop::IOrderService"]);

        let interface = enumeration.types.iter().find(|t| t.name == "IOrderService").unwrap();
        assert!(introspector.declared_metadata(interface).unwrap().is_none());
        assert!(!interface.flags.contains(TypeFlags::CLASS));
    }

    #[test]
    fn test_unknown_module() {
        let introspector = sample();
        let result = introspector.enumerate_types(&Module::new("Missing", "1.0.0"));
        assert!(matches!(result, Err(IntrospectionError::ModuleNotFound(_))));
    }

    #[test]
    fn test_upsert_replaces_types() {
        let introspector = sample();
        introspector.upsert_module(ManifestModule::new("Shop", "1.0.0").with_type(ManifestType::class("Only")));

        let enumeration = introspector.enumerate_types(&Module::new("Shop", "1.0.0")).unwrap();
        assert_eq!(enumeration.types.len(), 1);
        assert_eq!(introspector.module_count(), 1);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "modules": [{
                "name": "Clock",
                "version": "2.0.0",
                "types": [{
                    "name": "SystemClock",
                    "implements": ["IClock"],
                    "metadata": {"lifetime": "Singleton", "order": 3}
                }]
            }]
        }"#;
        let introspector = ManifestIntrospector::from_json(json).unwrap();
        let modules = introspector.enumerate_modules().unwrap();
        assert_eq!(modules.len(), 1);
        assert!(modules[0].is_dynamic());

        let types = introspector.enumerate_types(&modules[0]).unwrap().types;
        let metadata = introspector.declared_metadata(&types[0]).unwrap().unwrap();
        assert_eq!(metadata.order, 3);
        assert_eq!(metadata.lifetime, Lifetime::Singleton);
    }

    #[test]
    fn test_empty_type_name_rejected() {
        let json = r#"{"modules": [{"name": "Bad", "version": "1", "types": [{"name": ""}]}]}"#;
        assert!(matches!(
            ManifestIntrospector::from_json(json),
            Err(IntrospectionError::InvalidManifest(_))
        ));
    }
}
