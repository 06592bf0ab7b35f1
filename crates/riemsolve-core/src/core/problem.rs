//! Optimization problem definition.
//!
//! A [`Problem`] bundles a manifold with the cost function and whatever
//! derivatives the caller can provide. Missing derivatives are obtained from a
//! [`Differentiator`] the first time a solver asks for them and memoized for
//! the lifetime of the problem.
//!
//! Resolution order for the Riemannian gradient:
//!
//! 1. a Riemannian gradient given with [`Problem::with_gradient`];
//! 2. a Euclidean gradient, either given with [`Problem::with_euclidean_gradient`]
//!    or produced once by the differentiator, converted with
//!    [`Manifold::euclidean_to_riemannian_gradient`].
//!
//! The Hessian-vector product is resolved the same way through
//! [`Manifold::euclidean_to_riemannian_hessian`].

use crate::{
    derivatives::Differentiator,
    error::{OptimizerError, OptimizerResult},
    manifold::Manifold,
    types::Scalar,
};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cost function f: ℳ → ℝ. Must be a pure function of the point.
pub type CostFn<T, P> = Arc<dyn Fn(&P) -> T + Send + Sync>;

/// Gradient callable x ↦ grad f(x).
pub type GradientFn<P, V> = Arc<dyn Fn(&P) -> V + Send + Sync>;

/// Linear operator on a tangent space, (x, u) ↦ A(x)[u].
///
/// Used for Hessian-vector products and preconditioners.
pub type TangentOperatorFn<P, V> = Arc<dyn Fn(&P, &V) -> V + Send + Sync>;

type Point<T, M> = <M as Manifold<T>>::Point;
type Tangent<T, M> = <M as Manifold<T>>::TangentVector;

/// A cost function on a manifold together with its derivatives.
pub struct Problem<'m, T, M>
where
    T: Scalar,
    M: Manifold<T>,
{
    manifold: &'m M,
    cost: CostFn<T, Point<T, M>>,
    gradient: Option<GradientFn<Point<T, M>, Tangent<T, M>>>,
    hessian: Option<TangentOperatorFn<Point<T, M>, Tangent<T, M>>>,
    euclidean_gradient: OnceCell<GradientFn<Point<T, M>, Tangent<T, M>>>,
    euclidean_hessian: OnceCell<TangentOperatorFn<Point<T, M>, Tangent<T, M>>>,
    preconditioner: Option<TangentOperatorFn<Point<T, M>, Tangent<T, M>>>,
    differentiator: Option<Box<dyn Differentiator<T, Point<T, M>, Tangent<T, M>>>>,
    verbosity: usize,
    cost_evaluations: AtomicUsize,
}

impl<'m, T, M> Problem<'m, T, M>
where
    T: Scalar,
    M: Manifold<T>,
{
    /// Default progress verbosity.
    pub const DEFAULT_VERBOSITY: usize = 2;

    /// Creates a problem from a manifold and a cost function.
    pub fn new<F>(manifold: &'m M, cost: F) -> Self
    where
        F: Fn(&Point<T, M>) -> T + Send + Sync + 'static,
    {
        Self {
            manifold,
            cost: Arc::new(cost),
            gradient: None,
            hessian: None,
            euclidean_gradient: OnceCell::new(),
            euclidean_hessian: OnceCell::new(),
            preconditioner: None,
            differentiator: None,
            verbosity: Self::DEFAULT_VERBOSITY,
            cost_evaluations: AtomicUsize::new(0),
        }
    }

    /// Sets the Riemannian gradient.
    pub fn with_gradient<F>(mut self, gradient: F) -> Self
    where
        F: Fn(&Point<T, M>) -> Tangent<T, M> + Send + Sync + 'static,
    {
        self.gradient = Some(Arc::new(gradient));
        self
    }

    /// Sets the Euclidean gradient, converted on use.
    pub fn with_euclidean_gradient<F>(self, gradient: F) -> Self
    where
        F: Fn(&Point<T, M>) -> Tangent<T, M> + Send + Sync + 'static,
    {
        let gradient: GradientFn<_, _> = Arc::new(gradient);
        Self {
            euclidean_gradient: OnceCell::with_value(gradient),
            ..self
        }
    }

    /// Sets the Riemannian Hessian-vector product.
    pub fn with_hessian<F>(mut self, hessian: F) -> Self
    where
        F: Fn(&Point<T, M>, &Tangent<T, M>) -> Tangent<T, M> + Send + Sync + 'static,
    {
        self.hessian = Some(Arc::new(hessian));
        self
    }

    /// Sets the Euclidean Hessian-vector product, converted on use.
    pub fn with_euclidean_hessian<F>(self, hessian: F) -> Self
    where
        F: Fn(&Point<T, M>, &Tangent<T, M>) -> Tangent<T, M> + Send + Sync + 'static,
    {
        let hessian: TangentOperatorFn<_, _> = Arc::new(hessian);
        Self {
            euclidean_hessian: OnceCell::with_value(hessian),
            ..self
        }
    }

    /// Sets a preconditioner. It must be symmetric positive-definite on every
    /// tangent space.
    pub fn with_preconditioner<F>(mut self, preconditioner: F) -> Self
    where
        F: Fn(&Point<T, M>, &Tangent<T, M>) -> Tangent<T, M> + Send + Sync + 'static,
    {
        self.preconditioner = Some(Arc::new(preconditioner));
        self
    }

    /// Sets the collaborator used to derive missing Euclidean derivatives.
    pub fn with_differentiator<D>(mut self, differentiator: D) -> Self
    where
        D: Differentiator<T, Point<T, M>, Tangent<T, M>> + 'static,
    {
        self.differentiator = Some(Box::new(differentiator));
        self
    }

    /// Sets the progress verbosity (0 silent, 1 summary, 2 per iteration).
    pub fn with_verbosity(mut self, verbosity: usize) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// The manifold this problem lives on.
    pub fn manifold(&self) -> &'m M {
        self.manifold
    }

    /// Progress verbosity.
    pub fn verbosity(&self) -> usize {
        self.verbosity
    }

    /// Number of cost evaluations made through this problem so far.
    pub fn cost_evaluations(&self) -> usize {
        self.cost_evaluations.load(Ordering::Relaxed)
    }

    /// Evaluates the cost at `point`.
    pub fn cost(&self, point: &Point<T, M>) -> T {
        self.cost_evaluations.fetch_add(1, Ordering::Relaxed);
        (self.cost)(point)
    }

    /// Riemannian gradient at `point`.
    pub fn gradient(&self, point: &Point<T, M>) -> OptimizerResult<Tangent<T, M>> {
        if let Some(gradient) = &self.gradient {
            return Ok(gradient(point));
        }
        let egrad_fn = self.resolved_euclidean_gradient()?;
        let egrad = egrad_fn(point);
        Ok(self
            .manifold
            .euclidean_to_riemannian_gradient(point, &egrad)?)
    }

    /// Riemannian Hessian applied to `direction`.
    pub fn hessian_vector_product(
        &self,
        point: &Point<T, M>,
        direction: &Tangent<T, M>,
    ) -> OptimizerResult<Tangent<T, M>> {
        if let Some(hessian) = &self.hessian {
            return Ok(hessian(point, direction));
        }
        let ehess = self.euclidean_hessian.get_or_try_init(|| {
            let differentiator = self
                .differentiator
                .as_ref()
                .ok_or_else(|| OptimizerError::missing_derivative("hessian"))?;
            debug!(manifold = self.manifold.name(), "deriving Euclidean Hessian");
            differentiator.euclidean_hessian(&self.cost)
        })?;
        let egrad_fn = self.resolved_euclidean_gradient()?;
        let egrad = egrad_fn(point);
        let ehvp = ehess(point, direction);
        Ok(self
            .manifold
            .euclidean_to_riemannian_hessian(point, &egrad, &ehvp, direction)?)
    }

    /// Applies the preconditioner, or the identity if none was given.
    pub fn precondition(
        &self,
        point: &Point<T, M>,
        tangent: &Tangent<T, M>,
    ) -> Tangent<T, M> {
        match &self.preconditioner {
            Some(preconditioner) => preconditioner(point, tangent),
            None => tangent.clone(),
        }
    }

    fn resolved_euclidean_gradient(
        &self,
    ) -> OptimizerResult<&GradientFn<Point<T, M>, Tangent<T, M>>> {
        self.euclidean_gradient.get_or_try_init(|| {
            let differentiator = self
                .differentiator
                .as_ref()
                .ok_or_else(|| OptimizerError::missing_derivative("gradient"))?;
            debug!(manifold = self.manifold.name(), "deriving Euclidean gradient");
            differentiator.euclidean_gradient(&self.cost)
        })
    }
}

impl<T, M> fmt::Debug for Problem<'_, T, M>
where
    T: Scalar,
    M: Manifold<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Problem")
            .field("manifold", &self.manifold.name())
            .field("has_gradient", &self.gradient.is_some())
            .field("has_euclidean_gradient", &self.euclidean_gradient.get().is_some())
            .field("has_hessian", &self.hessian.is_some())
            .field("has_preconditioner", &self.preconditioner.is_some())
            .field("has_differentiator", &self.differentiator.is_some())
            .field("verbosity", &self.verbosity)
            .field("cost_evaluations", &self.cost_evaluations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivatives::FiniteDifference;
    use crate::test_manifolds::TestEuclideanManifold;
    use crate::types::DVector;
    use approx::assert_relative_eq;

    type V = DVector<f64>;

    fn shifted_quadratic(x: &V) -> f64 {
        let c = V::from_vec(vec![3.0, 4.0]);
        (x - c).norm_squared()
    }

    #[derive(Debug, Default)]
    struct CountingDifferentiator {
        gradient_calls: Arc<AtomicUsize>,
    }

    impl Differentiator<f64, V, V> for CountingDifferentiator {
        fn euclidean_gradient(&self, _cost: &CostFn<f64, V>) -> OptimizerResult<GradientFn<V, V>> {
            self.gradient_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(|x: &V| (x - V::from_vec(vec![3.0, 4.0])).scale(2.0)))
        }
    }

    #[test]
    fn test_cost_counts_evaluations() {
        let manifold = TestEuclideanManifold::new(2);
        let problem = Problem::<f64, _>::new(&manifold, shifted_quadratic);
        assert_eq!(problem.cost_evaluations(), 0);
        let value = problem.cost(&V::zeros(2));
        assert_eq!(value, 25.0);
        problem.cost(&V::zeros(2));
        assert_eq!(problem.cost_evaluations(), 2);
    }

    #[test]
    fn test_gradient_derived_exactly_once() {
        let manifold = TestEuclideanManifold::new(2);
        let calls = Arc::new(AtomicUsize::new(0));
        let problem = Problem::<f64, _>::new(&manifold, shifted_quadratic).with_differentiator(
            CountingDifferentiator {
                gradient_calls: Arc::clone(&calls),
            },
        );

        let g1 = problem.gradient(&V::zeros(2)).unwrap();
        let g2 = problem.gradient(&V::from_vec(vec![1.0, 1.0])).unwrap();
        assert_eq!(g1, V::from_vec(vec![-6.0, -8.0]));
        assert_eq!(g2, V::from_vec(vec![-4.0, -6.0]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_gradient_skips_differentiator() {
        let manifold = TestEuclideanManifold::new(2);
        let calls = Arc::new(AtomicUsize::new(0));
        let problem = Problem::<f64, _>::new(&manifold, shifted_quadratic)
            .with_gradient(|x: &V| x.scale(2.0))
            .with_differentiator(CountingDifferentiator {
                gradient_calls: Arc::clone(&calls),
            });

        let g = problem.gradient(&V::from_vec(vec![1.0, 2.0])).unwrap();
        assert_eq!(g, V::from_vec(vec![2.0, 4.0]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_gradient_fails_at_first_use() {
        let manifold = TestEuclideanManifold::new(2);
        // Construction succeeds without any derivative
        let problem = Problem::<f64, _>::new(&manifold, shifted_quadratic);
        let err = problem.gradient(&V::zeros(2)).unwrap_err();
        assert!(matches!(err, OptimizerError::MissingDerivative { ref derivative } if derivative == "gradient"));
    }

    #[test]
    fn test_missing_hessian_fails_at_first_use() {
        let manifold = TestEuclideanManifold::new(2);
        let problem = Problem::<f64, _>::new(&manifold, shifted_quadratic)
            .with_differentiator(CountingDifferentiator::default());
        assert!(problem.gradient(&V::zeros(2)).is_ok());
        let err = problem
            .hessian_vector_product(&V::zeros(2), &V::zeros(2))
            .unwrap_err();
        assert!(matches!(err, OptimizerError::MissingDerivative { ref derivative } if derivative == "hessian"));
    }

    #[test]
    fn test_euclidean_hessian_is_converted() {
        let manifold = TestEuclideanManifold::new(2);
        let problem = Problem::<f64, _>::new(&manifold, shifted_quadratic)
            .with_euclidean_gradient(|x: &V| (x - V::from_vec(vec![3.0, 4.0])).scale(2.0))
            .with_euclidean_hessian(|_x: &V, u: &V| u.scale(2.0));
        let hv = problem
            .hessian_vector_product(&V::zeros(2), &V::from_vec(vec![1.0, -1.0]))
            .unwrap();
        assert_eq!(hv, V::from_vec(vec![2.0, -2.0]));
    }

    #[test]
    fn test_preconditioner_defaults_to_identity() {
        let manifold = TestEuclideanManifold::new(2);
        let problem = Problem::<f64, _>::new(&manifold, shifted_quadratic);
        let u = V::from_vec(vec![1.0, 2.0]);
        assert_eq!(problem.precondition(&V::zeros(2), &u), u);

        let problem = problem.with_preconditioner(|_x: &V, u: &V| u.scale(0.5));
        assert_eq!(problem.precondition(&V::zeros(2), &u), V::from_vec(vec![0.5, 1.0]));
    }

    #[test]
    fn test_finite_difference_differentiator() {
        let manifold = TestEuclideanManifold::new(2);
        let problem = Problem::<f64, _>::new(&manifold, shifted_quadratic)
            .with_differentiator(FiniteDifference::new());
        let g = problem.gradient(&V::from_vec(vec![1.0, 1.0])).unwrap();
        assert_relative_eq!(g, V::from_vec(vec![-4.0, -6.0]), epsilon = 1e-6);
        let hv = problem
            .hessian_vector_product(&V::from_vec(vec![1.0, 1.0]), &V::from_vec(vec![1.0, 0.0]))
            .unwrap();
        assert_relative_eq!(hv, V::from_vec(vec![2.0, 0.0]), epsilon = 1e-4);
    }

    #[test]
    fn test_problem_is_sync() {
        fn assert_sync<S: Sync>(_: &S) {}
        let manifold = TestEuclideanManifold::new(2);
        let problem = Problem::<f64, _>::new(&manifold, shifted_quadratic);
        assert_sync(&problem);
    }
}
