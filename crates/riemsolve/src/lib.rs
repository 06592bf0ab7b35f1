//! riemsolve - Riemannian optimization in Rust.
//!
//! This crate gathers the workspace behind one dependency:
//!
//! - [`core`]: the manifold interface, problems, line searches, stopping
//!   criteria and the optimization log
//! - [`manifolds`]: Euclidean space and the unit sphere
//! - [`optim`]: the conjugate-gradient and particle-swarm solvers
//!
//! # Example
//!
//! ```
//! use riemsolve::prelude::*;
//!
//! let plane = Euclidean::new(2).unwrap();
//! let target = DVector::from_vec(vec![3.0, 4.0]);
//! let cost = move |x: &DVector<f64>| (x - &target).norm_squared();
//! let problem = Problem::<f64, _>::new(&plane, cost)
//!     .with_differentiator(FiniteDifference::new())
//!     .with_verbosity(0);
//!
//! let cg = ConjugateGradient::new(CGConfig::fletcher_reeves().with_log_verbosity(1)).unwrap();
//! let result = cg.solve(&problem, Some(DVector::zeros(2))).unwrap();
//! assert_eq!(result.termination_reason, TerminationReason::Converged);
//! assert!(result.log.is_some());
//! ```

pub use riemsolve_core as core;
pub use riemsolve_manifolds as manifolds;
pub use riemsolve_optim as optim;

pub use nalgebra;

pub use riemsolve_core::{Manifold, OptimizerError, OptimizerResult, Problem};
pub use riemsolve_manifolds::{Euclidean, Sphere};
pub use riemsolve_optim::{
    CGConfig, ConjugateGradient, ConjugateGradientMethod, ParticleSwarm, ParticleSwarmConfig,
};

/// Everything needed to set up and solve a problem.
pub mod prelude {
    pub use riemsolve_core::prelude::*;
    pub use riemsolve_manifolds::{Euclidean, Sphere};
    pub use riemsolve_optim::{
        CGConfig, ConjugateGradient, ConjugateGradientMethod, ParticleSwarm, ParticleSwarmConfig,
        ResolvedSwarmConfig,
    };
}
