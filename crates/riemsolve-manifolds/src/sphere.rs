//! Sphere manifold S^{n-1} = {x in R^n : ||x|| = 1}
//!
//! The unit sphere appears in eigenvalue problems (the Rayleigh quotient),
//! PCA, ICA and sparse coding with unit-norm constraints.

use crate::utils::{check_dimension, standard_normal};
use num_traits::Float;
use rand::RngCore;
use riemsolve_core::{
    error::{ManifoldError, Result},
    manifold::Manifold,
    types::{DVector, Scalar},
};

/// The unit sphere S^{n-1} in R^n with the metric inherited from R^n.
///
/// # Mathematical Properties
///
/// - **Dimension**: n-1
/// - **Tangent space**: T_x S^{n-1} = {v in R^n : x^T v = 0}
/// - **Retraction**: R_x(v) = (x + v) / ||x + v||
/// - **Exponential map**: exp_x(v) = cos(||v||) x + sin(||v||) v/||v||
/// - **Logarithmic map**: log_x(y) = θ P_x(y - x) / ||P_x(y - x)||, θ = arccos(x^T y)
/// - **Transport**: projection onto the target tangent space
#[derive(Debug, Clone)]
pub struct Sphere {
    /// Ambient dimension (n)
    ambient_dim: usize,
}

impl Sphere {
    /// Creates a new sphere S^{n-1} embedded in R^n.
    ///
    /// # Errors
    /// Returns an error if `ambient_dim` < 2
    pub fn new(ambient_dim: usize) -> Result<Self> {
        if ambient_dim < 2 {
            return Err(ManifoldError::invalid_point(
                "Sphere requires ambient dimension >= 2",
            ));
        }
        Ok(Self { ambient_dim })
    }

    /// Returns the ambient dimension (n)
    pub fn ambient_dimension(&self) -> usize {
        self.ambient_dim
    }

    fn check(&self, v: &DVector<impl Scalar>) -> Result<()> {
        check_dimension(self.ambient_dim, v.len())
    }

    fn normalize<T: Scalar>(&self, v: DVector<T>) -> Result<DVector<T>> {
        let norm = v.norm();
        if norm > T::zero() && <T as Float>::is_finite(norm) {
            Ok(v.unscale(norm))
        } else {
            Err(ManifoldError::numerical_error(
                "cannot normalize a zero vector onto the sphere",
            ))
        }
    }

    /// Angle between two unit vectors, robust to round-off outside [-1, 1].
    fn angle<T: Scalar>(x: &DVector<T>, y: &DVector<T>) -> T {
        let cos = <T as Float>::max(<T as Float>::min(x.dot(y), T::one()), -T::one());
        <T as Float>::acos(cos)
    }
}

impl<T: Scalar> Manifold<T> for Sphere {
    type Point = DVector<T>;
    type TangentVector = DVector<T>;

    fn name(&self) -> &str {
        "Sphere"
    }

    fn dimension(&self) -> usize {
        self.ambient_dim - 1
    }

    fn typical_distance(&self) -> T {
        <T as Scalar>::from_f64(std::f64::consts::PI)
    }

    fn is_point_on_manifold(&self, point: &DVector<T>, tolerance: T) -> bool {
        point.len() == self.ambient_dim && <T as Float>::abs(point.norm() - T::one()) < tolerance
    }

    fn random_point_with(&self, rng: &mut dyn RngCore) -> DVector<T> {
        loop {
            let candidate: DVector<T> = standard_normal(self.ambient_dim, rng);
            if let Ok(point) = self.normalize(candidate) {
                return point;
            }
        }
    }

    fn random_tangent_with(&self, point: &DVector<T>, rng: &mut dyn RngCore) -> Result<DVector<T>> {
        let v = self.project_tangent(point, &standard_normal(self.ambient_dim, rng))?;
        self.normalize(v)
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
        Ok(vector - point.scale(point.dot(vector)))
    }

    fn retract(&self, point: &DVector<T>, tangent: &DVector<T>) -> Result<DVector<T>> {
        self.check(point)?;
        self.check(tangent)?;
        self.normalize(point + tangent)
    }

    fn has_exact_exp_log(&self) -> bool {
        true
    }

    fn exp_map(&self, point: &DVector<T>, tangent: &DVector<T>) -> Result<DVector<T>> {
        self.check(point)?;
        self.check(tangent)?;
        let norm = tangent.norm();
        if norm == T::zero() {
            return Ok(point.clone());
        }
        Ok(point.scale(<T as Float>::cos(norm)) + tangent.scale(<T as Float>::sin(norm) / norm))
    }

    fn log_map(&self, point: &DVector<T>, other: &DVector<T>) -> Result<DVector<T>> {
        let v = self.project_tangent(point, &(other - point))?;
        let theta = Self::angle(point, other);
        let v_norm = v.norm();
        if v_norm > T::zero() {
            return Ok(v.scale(theta / v_norm));
        }
        if theta < <T as Scalar>::from_f64(std::f64::consts::FRAC_PI_2) {
            // Coincident points
            return Ok(v);
        }
        // Antipodal points: every direction is a minimizing geodesic.
        let direction = self.random_tangent(point)?;
        Ok(direction.scale(theta))
    }

    fn distance(&self, x: &DVector<T>, y: &DVector<T>) -> Result<T> {
        self.check(x)?;
        self.check(y)?;
        Ok(Self::angle(x, y))
    }

    fn pair_mean(&self, x: &DVector<T>, y: &DVector<T>) -> Result<DVector<T>> {
        self.check(x)?;
        self.check(y)?;
        self.normalize(x + y)
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
        euclidean_grad: &DVector<T>,
        euclidean_hvp: &DVector<T>,
        direction: &DVector<T>,
    ) -> Result<DVector<T>> {
        // Hess f(x)[u] = P_x(∇²f(x)[u]) - <x, ∇f(x)> u
        let projected = self.project_tangent(point, euclidean_hvp)?;
        Ok(projected - direction.scale(point.dot(euclidean_grad)))
    }

    fn zero_tangent(&self, _point: &DVector<T>) -> DVector<T> {
        DVector::zeros(self.ambient_dim)
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
