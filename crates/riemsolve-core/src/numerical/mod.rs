//! Numerical diagnostics.

pub mod validation;

pub use validation::*;
