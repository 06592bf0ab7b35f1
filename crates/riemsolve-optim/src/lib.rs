//! riemsolve optimization - solvers for Riemannian manifolds.
//!
//! This crate provides the solvers built on the `riemsolve-core` scaffolding:
//! a gradient-based and a derivative-free method.
//!
//! # Available Optimizers
//!
//! - **Conjugate gradient**: Fletcher-Reeves, Polak-Ribière, Hestenes-Stiefel
//!   and Hager-Zhang rules with Powell's restart and an adaptive line search
//! - **Particle swarm**: population-based search driven by the logarithmic map
//!
//! # Examples
//!
//! ```rust
//! use riemsolve_core::{optimizer::StoppingCriterion, problem::Problem, types::DVector};
//! use riemsolve_manifolds::Sphere;
//! use riemsolve_optim::{CGConfig, ConjugateGradient};
//!
//! // Smallest eigenvalue of diag(3, 2, 1) as a Rayleigh quotient on S^2.
//! let sphere = Sphere::new(3).unwrap();
//! let a = DVector::from_vec(vec![3.0, 2.0, 1.0]);
//! let grad_a = a.clone();
//! let cost = move |x: &DVector<f64>| x.dot(&a.component_mul(x));
//! let problem = Problem::<f64, _>::new(&sphere, cost)
//!     .with_euclidean_gradient(move |x: &DVector<f64>| grad_a.component_mul(x).scale(2.0))
//!     .with_verbosity(0);
//!
//! let cg = ConjugateGradient::new(
//!     CGConfig::polak_ribiere()
//!         .with_stopping_criterion(StoppingCriterion::new().with_min_gradient_norm(1e-8)),
//! )
//! .unwrap();
//! let x0 = DVector::from_vec(vec![1.0, 1.0, 1.0]).normalize();
//! let result = cg.solve(&problem, Some(x0)).unwrap();
//! assert!((result.value - 1.0).abs() < 1e-8);
//! ```

pub mod conjugate_gradient;
pub mod particle_swarm;
mod utils;

pub use conjugate_gradient::{CGConfig, ConjugateGradient, ConjugateGradientMethod};
pub use particle_swarm::{ParticleSwarm, ParticleSwarmConfig, ResolvedSwarmConfig};

// Re-export commonly used items from core
pub use riemsolve_core::{
    line_search::{AdaptiveLineSearch, BacktrackingLineSearch, LineSearch},
    optimizer::{Optimizer, OptimizationResult, StoppingCriterion, TerminationReason},
};
