// Tue Jan 13 2026 - Alex

use crate::introspection::ModuleIntrospector;
use crate::model::{Module, TypeDescriptor, TypeFlags};
use once_cell::sync::Lazy;
use regex::Regex;

static SYSTEM_ABSTRACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(std|core|alloc|System|Microsoft)(::|\.)").expect("system abstraction pattern is valid")
});

/// The first two of the scanner's three filter layers. The third (declared
/// metadata) lives in the scanner next to the metadata cache.
pub struct TypeFilter;

impl TypeFilter {
    /// Layer 1: module-level check, no type enumeration.
    pub fn module_may_contain_candidates(introspector: &dyn ModuleIntrospector, module: &Module) -> bool {
        introspector.may_contain_candidates(module)
    }

    /// Layer 2: structural check on flags only.
    pub fn is_concrete_candidate(ty: &TypeDescriptor) -> bool {
        let flags = ty.flags;
        flags.contains(TypeFlags::CLASS)
            && !flags.contains(TypeFlags::ABSTRACT)
            && !flags.contains(TypeFlags::GENERIC_DEFINITION)
            && !(flags.contains(TypeFlags::NESTED) && !flags.contains(TypeFlags::PUBLIC))
    }

    pub fn concrete_candidates(types: &[TypeDescriptor]) -> Vec<&TypeDescriptor> {
        types.iter().filter(|t| Self::is_concrete_candidate(t)).collect()
    }

    pub fn is_system_abstraction(name: &str) -> bool {
        SYSTEM_ABSTRACTION.is_match(name)
    }

    pub fn without_system_abstractions(abstractions: Vec<String>) -> Vec<String> {
        abstractions
            .into_iter()
            .filter(|a| !Self::is_system_abstraction(a))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(flags: TypeFlags) -> TypeDescriptor {
        TypeDescriptor::new("M@1", "", "T", flags)
    }

    #[test]
    fn test_concrete_candidate_flags() {
        assert!(TypeFilter::is_concrete_candidate(&ty(TypeFlags::CLASS | TypeFlags::PUBLIC)));
        assert!(TypeFilter::is_concrete_candidate(&ty(TypeFlags::CLASS)));
        assert!(TypeFilter::is_concrete_candidate(&ty(
            TypeFlags::CLASS | TypeFlags::NESTED | TypeFlags::PUBLIC
        )));

        assert!(!TypeFilter::is_concrete_candidate(&ty(TypeFlags::PUBLIC)));
        assert!(!TypeFilter::is_concrete_candidate(&ty(TypeFlags::CLASS | TypeFlags::ABSTRACT)));
        assert!(!TypeFilter::is_concrete_candidate(&ty(
            TypeFlags::CLASS | TypeFlags::GENERIC_DEFINITION
        )));
        assert!(!TypeFilter::is_concrete_candidate(&ty(TypeFlags::CLASS | TypeFlags::NESTED)));
    }

    #[test]
    fn test_system_abstractions() {
        assert!(TypeFilter::is_system_abstraction("std::fmt::Debug"));
        assert!(TypeFilter::is_system_abstraction("System.IDisposable"));
        assert!(!TypeFilter::is_system_abstraction("app::IWidget"));
        assert!(!TypeFilter::is_system_abstraction("Systematic.IThing"));

        let kept = TypeFilter::without_system_abstractions(vec!["core::clone::Clone".into(), "IWidget".into()]);
        assert_eq!(kept, vec!["IWidget"]);
    }
}
