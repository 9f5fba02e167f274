// Tue Jan 13 2026 - Alex

use crate::model::record::{ConditionalPredicate, Lifetime};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Cheap structural facts about a type, readable without touching its metadata.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeFlags: u32 {
        const CLASS = 1 << 0;
        const ABSTRACT = 1 << 1;
        const GENERIC_DEFINITION = 1 << 2;
        const NESTED = 1 << 3;
        const PUBLIC = 1 << 4;
    }
}

impl Default for TypeFlags {
    fn default() -> Self {
        TypeFlags::CLASS | TypeFlags::PUBLIC
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(String);

impl TypeId {
    pub fn new(module_identity: &str, full_name: &str) -> Self {
        Self(format!("{}/{}", module_identity, full_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn belongs_to(&self, module_identity: &str) -> bool {
        self.0
            .strip_prefix(module_identity)
            .map_or(false, |rest| rest.starts_with('/'))
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub id: TypeId,
    pub module: String,
    pub name: String,
    pub namespace: String,
    pub flags: TypeFlags,
}

impl TypeDescriptor {
    pub fn new(module_identity: &str, namespace: &str, name: &str, flags: TypeFlags) -> Self {
        let full_name = qualified_name(namespace, name);
        Self {
            id: TypeId::new(module_identity, &full_name),
            module: module_identity.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            flags,
        }
    }

    pub fn full_name(&self) -> String {
        qualified_name(&self.namespace, &self.name)
    }
}

/// Discovery metadata declared on a type. Absent for types that are not candidates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMetadata {
    pub lifetime: Lifetime,
    pub target: Option<String>,
    pub order: i32,
    pub profile: Option<String>,
    pub ignore_in_tests: bool,
    pub predicates: Vec<ConditionalPredicate>,
}

impl RawMetadata {
    pub fn new(lifetime: Lifetime) -> Self {
        Self {
            lifetime,
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn ignored_in_tests(mut self) -> Self {
        self.ignore_in_tests = true;
        self
    }

    pub fn with_predicate(mut self, predicate: ConditionalPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }
}

/// A type that survived every filter layer, with its non-system abstractions.
#[derive(Debug, Clone)]
pub struct TypeCandidate {
    pub descriptor: TypeDescriptor,
    pub abstractions: Vec<String>,
    pub metadata: RawMetadata,
}

impl TypeCandidate {
    pub fn new(descriptor: TypeDescriptor, abstractions: Vec<String>, metadata: RawMetadata) -> Self {
        Self {
            descriptor,
            abstractions,
            metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn namespace(&self) -> &str {
        &self.descriptor.namespace
    }

    pub fn full_name(&self) -> String {
        self.descriptor.full_name()
    }
}

fn qualified_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", namespace, name)
    }
}

/// Last path segment of a type name, accepting `::` and `.` separators.
pub fn simple_type_name(full: &str) -> &str {
    let after_colons = full.rsplit("::").next().unwrap_or(full);
    after_colons.rsplit('.').next().unwrap_or(after_colons)
}
