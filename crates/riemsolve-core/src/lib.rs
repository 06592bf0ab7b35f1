//! Core traits and types for Riemannian optimization.
//!
//! This crate holds everything the solvers share: the [`Manifold`] capability
//! interface, the [`Problem`] that bundles a cost with its derivatives, the
//! stopping-criterion evaluator, line searches, and the observers that build
//! the optimization log.
//!
//! # Modules
//!
//! - [`manifold`]: Core manifold trait
//! - [`problem`]: Cost function, derivatives and their memoized derivation
//! - [`derivatives`]: Differentiators producing Euclidean derivatives
//! - [`optimizer`]: Results, termination reasons and the stopping evaluator
//! - [`line_search`]: Adaptive and backtracking line searches
//! - [`callback`]: Solver observers
//! - [`log`]: Structured optimization log
//! - [`numerical`]: Gradient consistency check
//! - [`error`]: Error types
//! - [`types`]: Scalar trait and vector aliases

pub mod core;
pub mod numerical;
pub mod optimization;
pub mod utils;

// Flat paths for the most used modules
pub use self::core::{derivatives, error, manifold, problem, types};
pub use self::optimization::{callback, line_search, log, optimizer};

#[cfg(any(test, feature = "test-utils"))]
pub use self::utils::test_manifolds;

pub use self::core::error::{ManifoldError, OptimizerError, OptimizerResult, Result};
pub use self::core::manifold::Manifold;
pub use self::core::problem::Problem;

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use riemsolve_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::callback::{
        NoOpCallback, ObserverSet, OptimizationCallback, OptimizationLogger, ProgressReporter,
    };
    pub use crate::derivatives::{Differentiator, FiniteDifference};
    pub use crate::error::{ManifoldError, OptimizerError, OptimizerResult, Result};
    pub use crate::line_search::{
        AdaptiveLineSearch, AdaptiveLineSearchParams, BacktrackingLineSearch, BacktrackingParams,
        LineSearch, LineSearchResult,
    };
    pub use crate::log::{FinalValues, IterationRecord, OptimizationLog};
    pub use crate::manifold::Manifold;
    pub use crate::numerical::{check_gradient, GradientCheck};
    pub use crate::optimizer::{
        ConvergenceChecker, IterationProgress, OptimizationResult, Optimizer, StoppingCriterion,
        TerminationReason,
    };
    pub use crate::problem::{CostFn, GradientFn, Problem, TangentOperatorFn};
    pub use crate::types::{DVector, Scalar};
}
