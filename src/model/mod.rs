// Tue Jan 13 2026 - Alex

pub mod diagnostic;
pub mod module;
pub mod record;
pub mod types;

pub use diagnostic::{Diagnostic, Severity};
pub use module::{Module, ModuleLocation};
pub use record::{ConditionalPredicate, Lifetime, RecordKey, RecordSource, RegistrationRecord};
pub use types::{simple_type_name, RawMetadata, TypeCandidate, TypeDescriptor, TypeFlags, TypeId};
