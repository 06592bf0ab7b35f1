//! Core traits and types for Riemannian optimization.

pub mod derivatives;
pub mod error;
pub mod manifold;
pub mod problem;
pub mod types;

// Re-export core types
pub use derivatives::*;
pub use error::*;
pub use manifold::*;
pub use problem::*;
pub use types::*;
