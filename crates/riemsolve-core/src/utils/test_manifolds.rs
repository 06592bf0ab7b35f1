//! Common test manifolds for use in unit tests.
//!
//! This module provides small geometries that the core crate and downstream
//! test suites can use without depending on a manifold crate.

#![cfg(any(test, feature = "test-utils"))]

use crate::{
    error::{ManifoldError, Result},
    manifold::Manifold,
    types::{DVector, Scalar},
};
use num_traits::Float;
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ManifoldError::dimension_mismatch(expected, actual))
    }
}

fn random_vector<T: Scalar>(dim: usize, rng: &mut dyn RngCore) -> DVector<T> {
    DVector::from_fn(dim, |_, _| {
        let sample: f64 = StandardNormal.sample(&mut *rng);
        <T as Scalar>::from_f64(sample)
    })
}

/// A simple Euclidean manifold for testing.
///
/// Flat space where projection and transport are the identity and the
/// exponential map coincides with the retraction.
#[derive(Debug, Clone)]
pub struct TestEuclideanManifold {
    dim: usize,
}

impl TestEuclideanManifold {
    /// Creates R^dim.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl<T: Scalar> Manifold<T> for TestEuclideanManifold {
    type Point = DVector<T>;
    type TangentVector = DVector<T>;

    fn name(&self) -> &str {
        "TestEuclidean"
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn typical_distance(&self) -> T {
        <T as Float>::sqrt(<T as Scalar>::from_usize(self.dim))
    }

    fn is_point_on_manifold(&self, point: &Self::Point, _tolerance: T) -> bool {
        point.len() == self.dim
    }

    fn random_point_with(&self, rng: &mut dyn RngCore) -> Self::Point {
        random_vector(self.dim, rng)
    }

    fn random_tangent_with(
        &self,
        _point: &Self::Point,
        rng: &mut dyn RngCore,
    ) -> Result<Self::TangentVector> {
        let v: DVector<T> = random_vector(self.dim, rng);
        let norm = v.norm();
        if norm > T::zero() {
            Ok(v.unscale(norm))
        } else {
            Err(ManifoldError::numerical_error("zero random vector"))
        }
    }

    fn inner_product(
        &self,
        _point: &Self::Point,
        u: &Self::TangentVector,
        v: &Self::TangentVector,
    ) -> Result<T> {
        check_len(u.len(), v.len())?;
        Ok(u.dot(v))
    }

    fn project_tangent(
        &self,
        _point: &Self::Point,
        vector: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        Ok(vector.clone())
    }

    fn retract(&self, point: &Self::Point, tangent: &Self::TangentVector) -> Result<Self::Point> {
        check_len(point.len(), tangent.len())?;
        Ok(point + tangent)
    }

    fn has_exact_exp_log(&self) -> bool {
        true
    }

    fn exp_map(&self, point: &Self::Point, tangent: &Self::TangentVector) -> Result<Self::Point> {
        self.retract(point, tangent)
    }

    fn log_map(&self, point: &Self::Point, other: &Self::Point) -> Result<Self::TangentVector> {
        check_len(point.len(), other.len())?;
        Ok(other - point)
    }

    fn euclidean_to_riemannian_gradient(
        &self,
        _point: &Self::Point,
        euclidean_grad: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        Ok(euclidean_grad.clone())
    }

    fn euclidean_to_riemannian_hessian(
        &self,
        _point: &Self::Point,
        _euclidean_grad: &Self::TangentVector,
        euclidean_hvp: &Self::TangentVector,
        _direction: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        Ok(euclidean_hvp.clone())
    }

    fn zero_tangent(&self, _point: &Self::Point) -> Self::TangentVector {
        DVector::zeros(self.dim)
    }

    fn scale_tangent(
        &self,
        _point: &Self::Point,
        scalar: T,
        tangent: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        Ok(tangent.scale(scalar))
    }

    fn add_tangents(
        &self,
        _point: &Self::Point,
        u: &Self::TangentVector,
        v: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        check_len(u.len(), v.len())?;
        Ok(u + v)
    }
}

/// Euclidean space that only provides the required operations.
///
/// Used to exercise the provided defaults of [`Manifold`], in particular the
/// `NotImplemented` exponential and logarithmic maps.
#[derive(Debug, Clone)]
pub struct NoLogManifold {
    inner: TestEuclideanManifold,
}

impl NoLogManifold {
    /// Creates R^dim without exp/log.
    pub fn new(dim: usize) -> Self {
        Self {
            inner: TestEuclideanManifold::new(dim),
        }
    }
}

impl<T: Scalar> Manifold<T> for NoLogManifold {
    type Point = DVector<T>;
    type TangentVector = DVector<T>;

    fn name(&self) -> &str {
        "NoLog"
    }

    fn dimension(&self) -> usize {
        Manifold::<T>::dimension(&self.inner)
    }

    fn typical_distance(&self) -> T {
        self.inner.typical_distance()
    }

    fn is_point_on_manifold(&self, point: &Self::Point, tolerance: T) -> bool {
        self.inner.is_point_on_manifold(point, tolerance)
    }

    fn random_point_with(&self, rng: &mut dyn RngCore) -> Self::Point {
        self.inner.random_point_with(rng)
    }

    fn random_tangent_with(
        &self,
        point: &Self::Point,
        rng: &mut dyn RngCore,
    ) -> Result<Self::TangentVector> {
        self.inner.random_tangent_with(point, rng)
    }

    fn inner_product(
        &self,
        point: &Self::Point,
        u: &Self::TangentVector,
        v: &Self::TangentVector,
    ) -> Result<T> {
        self.inner.inner_product(point, u, v)
    }

    fn project_tangent(
        &self,
        point: &Self::Point,
        vector: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        self.inner.project_tangent(point, vector)
    }

    fn retract(&self, point: &Self::Point, tangent: &Self::TangentVector) -> Result<Self::Point> {
        self.inner.retract(point, tangent)
    }

    fn euclidean_to_riemannian_gradient(
        &self,
        point: &Self::Point,
        euclidean_grad: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        self.inner.euclidean_to_riemannian_gradient(point, euclidean_grad)
    }

    fn euclidean_to_riemannian_hessian(
        &self,
        point: &Self::Point,
        euclidean_grad: &Self::TangentVector,
        euclidean_hvp: &Self::TangentVector,
        direction: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        self.inner
            .euclidean_to_riemannian_hessian(point, euclidean_grad, euclidean_hvp, direction)
    }

    fn zero_tangent(&self, point: &Self::Point) -> Self::TangentVector {
        self.inner.zero_tangent(point)
    }

    fn scale_tangent(
        &self,
        point: &Self::Point,
        scalar: T,
        tangent: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        self.inner.scale_tangent(point, scalar, tangent)
    }

    fn add_tangents(
        &self,
        point: &Self::Point,
        u: &Self::TangentVector,
        v: &Self::TangentVector,
    ) -> Result<Self::TangentVector> {
        self.inner.add_tangents(point, u, v)
    }
}
