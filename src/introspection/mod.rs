// Tue Jan 13 2026 - Alex

pub mod error;
pub mod manifest;

pub use error::IntrospectionError;
pub use manifest::{Manifest, ManifestIntrospector, ManifestModule, ManifestType, TypeKind};

use crate::model::{Module, RawMetadata, TypeDescriptor};

/// A type that was listed by a module but could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLoadFailure {
    pub type_name: String,
    pub reason: String,
}

/// Types a module exposed. Partial loads keep what could be read.
#[derive(Debug, Clone, Default)]
pub struct TypeEnumeration {
    pub types: Vec<TypeDescriptor>,
    pub load_failures: Vec<TypeLoadFailure>,
}

impl TypeEnumeration {
    pub fn is_partial(&self) -> bool {
        !self.load_failures.is_empty()
    }
}

/// Source of type information for modules. Implementations substitute their own
/// type model (parsed manifests, static tables, IDL registries) behind this seam.
pub trait ModuleIntrospector: Send + Sync {
    fn enumerate_modules(&self) -> Result<Vec<Module>, IntrospectionError>;

    /// Cheap module-level check run before any type is enumerated.
    fn may_contain_candidates(&self, _module: &Module) -> bool {
        true
    }

    fn enumerate_types(&self, module: &Module) -> Result<TypeEnumeration, IntrospectionError>;

    fn implemented_abstractions(&self, ty: &TypeDescriptor) -> Vec<String>;

    /// `Ok(None)` when the type declares no discovery metadata.
    fn declared_metadata(&self, ty: &TypeDescriptor) -> Result<Option<RawMetadata>, IntrospectionError>;
}
