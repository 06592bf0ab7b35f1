//! riemsolve manifolds - concrete geometries for the riemsolve solvers.
//!
//! Both geometries represent points and tangent vectors as dense
//! [`DVector`](riemsolve_core::types::DVector)s and implement
//! [`Manifold<T>`](riemsolve_core::manifold::Manifold) for every scalar type.

pub mod euclidean;
pub mod sphere;
mod utils;

// Re-export main manifolds for convenience
pub use euclidean::Euclidean;
pub use sphere::Sphere;
