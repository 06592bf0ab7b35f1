//! Derivation collaborators.
//!
//! A [`Differentiator`] turns a cost function into Euclidean derivative
//! callables. [`Problem`](crate::problem::Problem) asks it at most once per
//! derivative and caches the result.

use crate::{
    error::{OptimizerError, OptimizerResult},
    problem::{CostFn, GradientFn, TangentOperatorFn},
    types::{DVector, Scalar},
};
use num_traits::Float;
use std::sync::Arc;

/// Produces Euclidean derivatives of a cost function.
pub trait Differentiator<T, P, V>: Send + Sync {
    /// Euclidean gradient x ↦ ∇f(x).
    fn euclidean_gradient(&self, cost: &CostFn<T, P>) -> OptimizerResult<GradientFn<P, V>>;

    /// Euclidean Hessian-vector product (x, u) ↦ ∇²f(x)[u].
    fn euclidean_hessian(&self, cost: &CostFn<T, P>) -> OptimizerResult<TangentOperatorFn<P, V>> {
        let _ = cost;
        Err(OptimizerError::missing_derivative("hessian"))
    }
}

/// Central finite differences for vector-valued points.
///
/// The gradient uses per-coordinate steps h_i = ε^(1/3) max(1, |x_i|); the
/// Hessian-vector product differentiates that gradient along u with a step
/// ε^(1/4) max(1, ||x||) / ||u||. Cost calls made here bypass the problem's
/// evaluation counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiniteDifference<T> {
    relative_step: Option<T>,
}

impl<T: Scalar> FiniteDifference<T> {
    /// Uses the default step sizes.
    pub fn new() -> Self {
        Self {
            relative_step: None,
        }
    }

    /// Overrides the relative gradient step.
    pub fn with_relative_step(mut self, step: T) -> Self {
        self.relative_step = Some(step);
        self
    }

    fn gradient_step(&self) -> T {
        self.relative_step
            .unwrap_or_else(|| <T as Float>::cbrt(<T as Scalar>::EPSILON))
    }
}

fn central_gradient<T: Scalar>(
    cost: &dyn Fn(&DVector<T>) -> T,
    x: &DVector<T>,
    step: T,
) -> DVector<T> {
    let two = <T as Scalar>::from_f64(2.0);
    let mut grad = DVector::zeros(x.len());
    let mut probe = x.clone();
    for i in 0..x.len() {
        let h = step * <T as Float>::max(T::one(), <T as Float>::abs(x[i]));
        probe[i] = x[i] + h;
        let forward = cost(&probe);
        probe[i] = x[i] - h;
        let backward = cost(&probe);
        probe[i] = x[i];
        grad[i] = (forward - backward) / (two * h);
    }
    grad
}

impl<T: Scalar> Differentiator<T, DVector<T>, DVector<T>> for FiniteDifference<T> {
    fn euclidean_gradient(
        &self,
        cost: &CostFn<T, DVector<T>>,
    ) -> OptimizerResult<GradientFn<DVector<T>, DVector<T>>> {
        let cost = Arc::clone(cost);
        let step = self.gradient_step();
        Ok(Arc::new(move |x: &DVector<T>| central_gradient(&*cost, x, step)))
    }

    fn euclidean_hessian(
        &self,
        cost: &CostFn<T, DVector<T>>,
    ) -> OptimizerResult<TangentOperatorFn<DVector<T>, DVector<T>>> {
        let cost = Arc::clone(cost);
        let gradient_step = self.gradient_step();
        let step = <T as Float>::sqrt(<T as Float>::sqrt(<T as Scalar>::EPSILON));
        Ok(Arc::new(move |x: &DVector<T>, u: &DVector<T>| {
            let u_norm = u.norm();
            if u_norm == T::zero() {
                return DVector::zeros(x.len());
            }
            let h = step * <T as Float>::max(T::one(), x.norm()) / u_norm;
            let forward = central_gradient(&*cost, &(x + u.scale(h)), gradient_step);
            let backward = central_gradient(&*cost, &(x - u.scale(h)), gradient_step);
            (forward - backward).unscale(<T as Scalar>::from_f64(2.0) * h)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rosenbrock() -> CostFn<f64, DVector<f64>> {
        Arc::new(|x: &DVector<f64>| {
            (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
        })
    }

    #[test]
    fn test_gradient_matches_analytic() {
        let fd = FiniteDifference::<f64>::new();
        let grad = fd.euclidean_gradient(&rosenbrock()).unwrap();
        let x = DVector::from_vec(vec![-1.2, 1.0]);
        let expected = DVector::from_vec(vec![
            -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0] * x[0]),
            200.0 * (x[1] - x[0] * x[0]),
        ]);
        assert_relative_eq!(grad(&x), expected, epsilon = 1e-5, max_relative = 1e-6);
    }

    #[test]
    fn test_hessian_vector_product() {
        let fd = FiniteDifference::<f64>::new();
        let hess = fd.euclidean_hessian(&rosenbrock()).unwrap();
        let x = DVector::from_vec(vec![1.0, 1.0]);
        // Hessian at the minimizer is [[802, -400], [-400, 200]]
        let hv = hess(&x, &DVector::from_vec(vec![1.0, 0.0]));
        assert_relative_eq!(hv, DVector::from_vec(vec![802.0, -400.0]), max_relative = 1e-3);
        let zero = hess(&x, &DVector::zeros(2));
        assert_eq!(zero, DVector::zeros(2));
    }

    #[test]
    fn test_default_hessian_is_missing() {
        struct GradientOnly;
        impl Differentiator<f64, DVector<f64>, DVector<f64>> for GradientOnly {
            fn euclidean_gradient(
                &self,
                _cost: &CostFn<f64, DVector<f64>>,
            ) -> OptimizerResult<GradientFn<DVector<f64>, DVector<f64>>> {
                Ok(Arc::new(|x: &DVector<f64>| x.clone()))
            }
        }
        let err = GradientOnly.euclidean_hessian(&rosenbrock()).err().unwrap();
        assert!(matches!(err, OptimizerError::MissingDerivative { .. }));
    }
}
