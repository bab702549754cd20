//! URL handling module for Hostwatch
//!
//! Seed URL normalization and the domain derivation used by the resolver.

mod domain;
mod normalize;

pub use domain::domain_of;
pub use normalize::normalize_seed;
