//! Euclidean space R^n as a (flat) Riemannian manifold.

use crate::utils::{check_dimension, standard_normal};
use num_traits::Float;
use rand::RngCore;
use riemsolve_core::{
    error::{ManifoldError, Result},
    manifold::Manifold,
    types::{DVector, Scalar},
};

/// Euclidean space R^n with the standard inner product.
///
/// Retraction, exponential map and transport are all exact and trivial:
/// R_x(u) = exp_x(u) = x + u, log_x(y) = y - x, transport is the identity.
#[derive(Debug, Clone)]
pub struct Euclidean {
    dim: usize,
}

impl Euclidean {
    /// Creates R^n.
    ///
    /// # Errors
    /// Returns an error if `dim` is zero.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(ManifoldError::invalid_point(
                "Euclidean space requires dimension >= 1",
            ));
        }
        Ok(Self { dim })
    }

    fn check(&self, v: &DVector<impl Scalar>) -> Result<()> {
        check_dimension(self.dim, v.len())
    }
}

impl<T: Scalar> Manifold<T> for Euclidean {
    type Point = DVector<T>;
    type TangentVector = DVector<T>;

    fn name(&self) -> &str {
        "Euclidean"
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn typical_distance(&self) -> T {
        <T as Float>::sqrt(<T as Scalar>::from_usize(self.dim))
    }

    fn is_point_on_manifold(&self, point: &DVector<T>, _tolerance: T) -> bool {
        point.len() == self.dim && point.iter().all(|v| <T as Float>::is_finite(*v))
    }

    fn random_point_with(&self, rng: &mut dyn RngCore) -> DVector<T> {
        standard_normal(self.dim, rng)
    }

    fn random_tangent_with(
        &self,
        _point: &DVector<T>,
        rng: &mut dyn RngCore,
    ) -> Result<DVector<T>> {
        let v: DVector<T> = standard_normal(self.dim, rng);
        let norm = v.norm();
        if norm > T::zero() {
            Ok(v.unscale(norm))
        } else {
            Err(ManifoldError::numerical_error("zero random vector"))
        }
    }

    fn inner_product(&self, point: &DVector<T>, u: &DVector<T>, v: &DVector<T>) -> Result<T> {
        self.check(point)?;
        self.check(u)?;
        self.check(v)?;
        Ok(u.dot(v))
    }

    fn project_tangent(&self, point: &DVector<T>, vector: &DVector<T>) -> Result<DVector<T>> {
        self.check(point)?;
        self.check(vector)?;
        Ok(vector.clone())
    }

    fn retract(&self, point: &DVector<T>, tangent: &DVector<T>) -> Result<DVector<T>> {
        self.check(point)?;
        self.check(tangent)?;
        Ok(point + tangent)
    }

    fn parallel_transport(
        &self,
        _from: &DVector<T>,
        to: &DVector<T>,
        vector: &DVector<T>,
    ) -> Result<DVector<T>> {
        self.project_tangent(to, vector)
    }

    fn has_exact_exp_log(&self) -> bool {
        true
    }

    fn exp_map(&self, point: &DVector<T>, tangent: &DVector<T>) -> Result<DVector<T>> {
        self.retract(point, tangent)
    }

    fn log_map(&self, point: &DVector<T>, other: &DVector<T>) -> Result<DVector<T>> {
        self.check(point)?;
        self.check(other)?;
        Ok(other - point)
    }

    fn distance(&self, x: &DVector<T>, y: &DVector<T>) -> Result<T> {
        self.check(x)?;
        self.check(y)?;
        Ok((x - y).norm())
    }

    fn pair_mean(&self, x: &DVector<T>, y: &DVector<T>) -> Result<DVector<T>> {
        self.check(x)?;
        self.check(y)?;
        Ok((x + y).scale(<T as Scalar>::from_f64(0.5)))
    }

    fn euclidean_to_riemannian_gradient(
        &self,
        point: &DVector<T>,
        euclidean_grad: &DVector<T>,
    ) -> Result<DVector<T>> {
        self.project_tangent(point, euclidean_grad)
    }

    fn euclidean_to_riemannian_hessian(
        &self,
        point: &DVector<T>,
        _euclidean_grad: &DVector<T>,
        euclidean_hvp: &DVector<T>,
        _direction: &DVector<T>,
    ) -> Result<DVector<T>> {
        self.project_tangent(point, euclidean_hvp)
    }

    fn zero_tangent(&self, _point: &DVector<T>) -> DVector<T> {
        DVector::zeros(self.dim)
    }

    fn scale_tangent(
        &self,
        _point: &DVector<T>,
        scalar: T,
        tangent: &DVector<T>,
    ) -> Result<DVector<T>> {
        self.check(tangent)?;
        Ok(tangent.scale(scalar))
    }

    fn add_tangents(
        &self,
        _point: &DVector<T>,
        u: &DVector<T>,
        v: &DVector<T>,
    ) -> Result<DVector<T>> {
        self.check(u)?;
        self.check(v)?;
        Ok(u + v)
    }
}
