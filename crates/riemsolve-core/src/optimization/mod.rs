//! Solver scaffolding shared by the optimizers.

pub mod callback;
pub mod line_search;
pub mod log;
pub mod optimizer;

// Re-export optimization components
pub use callback::*;
pub use line_search::*;
pub use log::*;
pub use optimizer::*;
