//! Core manifold trait.
//!
//! This module defines the `Manifold` capability interface that every geometry
//! must implement to be optimized over. Solvers are generic over this trait and
//! never inspect which geometry they received.
//!
//! # Mathematical Background
//!
//! A Riemannian manifold (ℳ, g) consists of:
//! - A smooth manifold ℳ
//! - A Riemannian metric g that assigns an inner product to each tangent space
//!
//! Key concepts:
//! - **Tangent space**: T_x ℳ is the linear approximation of ℳ at point x
//! - **Retraction**: A smooth map R_x: T_x ℳ → ℳ with R_x(0) = x and dR_x(0) = id
//! - **Riemannian gradient**: The unique vector in T_x ℳ representing the derivative
//! - **Vector transport**: Moving tangent vectors between tangent spaces

use crate::{
    error::{ManifoldError, Result},
    types::Scalar,
};
use num_traits::Float;
use rand::RngCore;
use std::fmt::Debug;

/// Trait for Riemannian manifolds.
///
/// Points and tangent vectors are opaque associated types. A tangent vector is
/// only meaningful together with its base point: combining vectors with
/// different base points requires an explicit [`parallel_transport`].
///
/// Every operation assumes its arguments were produced by the same manifold
/// instance. Implementations may check shapes and return
/// [`ManifoldError::DimensionMismatch`], but callers must not rely on it.
///
/// ## Mathematical Properties
///
/// 1. **Retraction constraint**: R_x(0) = x
/// 2. **Metric**: ⟨·,·⟩_x is symmetric, bilinear, and positive definite
/// 3. **Exp/Log**: where available, exp_x(log_x(y)) = y and log_x(exp_x(u)) = u
///
/// [`parallel_transport`]: Manifold::parallel_transport
pub trait Manifold<T: Scalar>: Debug + Send + Sync {
    /// Point on the manifold.
    type Point: Clone + Debug + Send + Sync;
    /// Tangent vector at a point.
    type TangentVector: Clone + Debug + Send + Sync;

    /// Human-readable name of the geometry.
    fn name(&self) -> &str;

    /// Intrinsic real dimension.
    fn dimension(&self) -> usize;

    /// Characteristic length scale, e.g. the diameter for compact manifolds.
    fn typical_distance(&self) -> T;

    /// Checks whether `point` satisfies the manifold constraints up to `tolerance`.
    fn is_point_on_manifold(&self, point: &Self::Point, tolerance: T) -> bool;

    /// Draws a random point from `rng`, uniformly distributed where that
    /// makes sense.
    fn random_point_with(&self, rng: &mut dyn RngCore) -> Self::Point;

    /// Draws a random tangent vector of unit norm at `point` from `rng`.
    fn random_tangent_with(
        &self,
        point: &Self::Point,
        rng: &mut dyn RngCore,
    ) -> Result<Self::TangentVector>;

    /// Draws a random point from the thread-local generator.
    fn random_point(&self) -> Self::Point {
        self.random_point_with(&mut rand::thread_rng())
    }

    /// Draws a random unit tangent vector at `point` from the thread-local
    /// generator.
    fn random_tangent(&self, point: &Self::Point) -> Result<Self::TangentVector> {
        self.random_tangent_with(point, &mut rand::thread_rng())
    }

    /// Riemannian inner product ⟨u, v⟩_x.
    fn inner_product(
        &self,
        point: &Self::Point,
        u: &Self::TangentVector,
        v: &Self::TangentVector,
    ) -> Result<T>;

    /// Norm induced by the metric.
    fn norm(&self, point: &Self::Point, vector: &Self::TangentVector) -> Result<T> {
        self.inner_product(point, vector, vector)
            .map(<T as Float>::sqrt)
    }

    /// Orthogonal projection of an ambient vector onto T_x ℳ.
    fn project_tangent(
        &self,
        point: &Self::Point,
        vector: &Self::TangentVector,
    ) -> Result<Self::TangentVector>;

    /// Retraction R_x(u).
    fn retract(&self, point: &Self::Point, tangent: &Self::TangentVector) -> Result<Self::Point>;

    /// Transports `vector` from T_from ℳ to T_to ℳ.
    ///
    /// The default projects onto the target tangent space, which is a valid
    /// vector transport for embedded submanifolds.
    fn parallel_transport(
        &self,
        from: &Self::Point,
        to: &Self::Point,
        vector: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        let _ = from;
        self.project_tangent(to, vector)
    }

    /// Whether [`exp_map`](Manifold::exp_map) and [`log_map`](Manifold::log_map)
    /// are the true geodesic maps.
    fn has_exact_exp_log(&self) -> bool {
        false
    }

    /// Exponential map exp_x(u).
    fn exp_map(&self, point: &Self::Point, tangent: &Self::TangentVector) -> Result<Self::Point> {
        let _ = (point, tangent);
        Err(ManifoldError::not_implemented(format!(
            "exponential map on {}",
            self.name()
        )))
    }

    /// Logarithmic map log_x(y), the inverse of the exponential map.
    fn log_map(&self, point: &Self::Point, other: &Self::Point) -> Result<Self::TangentVector> {
        let _ = (point, other);
        Err(ManifoldError::not_implemented(format!(
            "logarithmic map on {}",
            self.name()
        )))
    }

    /// Geodesic distance, ||log_x(y)||_x by default.
    fn distance(&self, x: &Self::Point, y: &Self::Point) -> Result<T> {
        let v = self.log_map(x, y)?;
        self.norm(x, &v)
    }

    /// Geodesic midpoint exp_x(log_x(y) / 2).
    fn pair_mean(&self, x: &Self::Point, y: &Self::Point) -> Result<Self::Point> {
        let v = self.log_map(x, y)?;
        let half = self.scale_tangent(x, <T as Scalar>::from_f64(0.5), &v)?;
        self.exp_map(x, &half)
    }

    /// Converts a Euclidean gradient into the Riemannian gradient at `point`.
    fn euclidean_to_riemannian_gradient(
        &self,
        point: &Self::Point,
        euclidean_grad: &Self::TangentVector,
    ) -> Result<Self::TangentVector>;

    /// Converts a Euclidean Hessian-vector product into the Riemannian one.
    ///
    /// `euclidean_hvp` is the Euclidean Hessian applied to `direction`.
    fn euclidean_to_riemannian_hessian(
        &self,
        point: &Self::Point,
        euclidean_grad: &Self::TangentVector,
        euclidean_hvp: &Self::TangentVector,
        direction: &Self::TangentVector,
    ) -> Result<Self::TangentVector>;

    /// The zero vector of T_x ℳ.
    fn zero_tangent(&self, point: &Self::Point) -> Self::TangentVector;

    /// Computes a * u.
    fn scale_tangent(
        &self,
        point: &Self::Point,
        scalar: T,
        tangent: &Self::TangentVector,
    ) -> Result<Self::TangentVector>;

    /// Computes u + v for two vectors sharing the base point.
    fn add_tangents(
        &self,
        point: &Self::Point,
        u: &Self::TangentVector,
        v: &Self::TangentVector,
    ) -> Result<Self::TangentVector>;

    /// Computes a * u + v.
    fn axpy_tangent(
        &self,
        point: &Self::Point,
        scalar: T,
        u: &Self::TangentVector,
        v: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        let scaled = self.scale_tangent(point, scalar, u)?;
        self.add_tangents(point, &scaled, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_manifolds::{NoLogManifold, TestEuclideanManifold};
    use crate::types::DVector;

    #[test]
    fn test_manifold_basic_properties() {
        let manifold = TestEuclideanManifold::new(10);
        assert_eq!(Manifold::<f64>::name(&manifold), "TestEuclidean");
        assert_eq!(Manifold::<f64>::dimension(&manifold), 10);
        assert!(Manifold::<f64>::has_exact_exp_log(&manifold));
    }

    #[test]
    fn test_default_implementations() {
        let manifold = TestEuclideanManifold::new(3);
        let point = DVector::<f64>::zeros(3);
        let vector = DVector::from_vec(vec![3.0, 4.0, 0.0]);

        assert_eq!(manifold.norm(&point, &vector).unwrap(), 5.0);

        let other = DVector::from_vec(vec![0.0, 2.0, 0.0]);
        let transported = manifold.parallel_transport(&point, &other, &vector).unwrap();
        assert_eq!(transported, vector);

        assert_eq!(manifold.distance(&point, &other).unwrap(), 2.0);
        let mid = manifold.pair_mean(&point, &other).unwrap();
        assert_eq!(mid, DVector::from_vec(vec![0.0, 1.0, 0.0]));

        let u = DVector::from_vec(vec![1.0, 1.0, 1.0]);
        let axpy = manifold.axpy_tangent(&point, 2.0, &u, &vector).unwrap();
        assert_eq!(axpy, DVector::from_vec(vec![5.0, 6.0, 2.0]));
    }

    #[test]
    fn test_missing_exp_log_reports_not_implemented() {
        let manifold = NoLogManifold::new(2);
        let x = DVector::<f64>::zeros(2);
        let err = manifold.log_map(&x, &x).unwrap_err();
        assert!(matches!(err, ManifoldError::NotImplemented { .. }));
        assert!(manifold.distance(&x, &x).is_err());
    }

    #[test]
    fn test_manifold_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TestEuclideanManifold>();
    }
}
