// Tue Jan 13 2026 - Alex

pub mod resolver;
pub mod strategy;

pub use resolver::{ConventionResolver, Resolution, ResolutionSource};
pub use strategy::{ConventionStrategy, ImplSuffixConvention, PatternConvention, StandardConvention};
