//! Line searches along a tangent direction.
//!
//! Given a point x, a search direction η ∈ T_x ℳ and the directional
//! derivative df0 = ⟨grad f(x), η⟩_x < 0, a line search picks α > 0 and moves
//! to y = R_x(α η). Both searches here only test the Armijo condition
//!
//! f(R_x(α η)) ≤ f(x) + c₁ α df0
//!
//! and shrink α geometrically until it holds or the backtracking budget runs
//! out. They differ in how the first trial step is chosen:
//!
//! - [`AdaptiveLineSearch`] remembers the accepted α of the previous call and
//!   speeds up when the last search did not need exactly one backtrack.
//! - [`BacktrackingLineSearch`] extrapolates from the previous cost decrease,
//!   assuming the next decrease will be similar.
//!
//! Searches are stateful. Solvers clone a fresh instance per run so the
//! memory of one run never leaks into the next.

use crate::{
    error::{OptimizerError, OptimizerResult, Result},
    manifold::Manifold,
    types::Scalar,
};
use num_traits::Float;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of one line search.
#[derive(Debug, Clone)]
pub struct LineSearchResult<T, P> {
    /// Length of the step taken, α ||η||. Zero when no step was taken.
    pub step_size: T,
    /// The accepted point, or a copy of the start point when no step was taken
    pub new_point: P,
    /// Cost at `new_point`
    pub new_value: T,
    /// Cost evaluations performed by this search
    pub function_evals: usize,
    /// Whether the Armijo condition held for the accepted step
    pub sufficient_decrease: bool,
}

/// Interface shared by the line searches.
pub trait LineSearch<T: Scalar>: Debug + Send {
    /// Searches along `direction` from `point`.
    ///
    /// `value` must be the cost at `point` and `directional_derivative` the
    /// inner product of the gradient with `direction`. Calls with a
    /// non-negative derivative or a zero direction take no step and do not
    /// evaluate the cost.
    #[allow(clippy::too_many_arguments)]
    fn search<M>(
        &mut self,
        cost: &dyn Fn(&M::Point) -> T,
        manifold: &M,
        point: &M::Point,
        direction: &M::TangentVector,
        value: T,
        directional_derivative: T,
    ) -> Result<LineSearchResult<T, M::Point>>
    where
        M: Manifold<T>;

    /// Name used in logs.
    fn name(&self) -> &str;

    /// Parameters as strings, for the optimization log.
    fn parameters(&self) -> BTreeMap<String, String>;

    /// Forgets everything remembered from earlier calls.
    fn reset(&mut self);
}

/// Parameters of [`AdaptiveLineSearch`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdaptiveLineSearchParams<T> {
    /// Factor applied to α after each failed trial, in (0, 1)
    pub contraction_factor: T,
    /// Armijo constant c₁, in (0, 1)
    pub sufficient_decrease: T,
    /// Maximum number of contractions per call
    pub max_backtracks: usize,
    /// Length of the first trial step; the manifold's typical distance if unset
    pub initial_step_size: Option<T>,
}

impl<T: Scalar> Default for AdaptiveLineSearchParams<T> {
    fn default() -> Self {
        Self {
            contraction_factor: <T as Scalar>::from_f64(0.5),
            sufficient_decrease: <T as Scalar>::from_f64(0.5),
            max_backtracks: 10,
            initial_step_size: None,
        }
    }
}

impl<T: Scalar> AdaptiveLineSearchParams<T> {
    /// Checks parameter ranges.
    pub fn validate(&self) -> OptimizerResult<()> {
        validate_unit_interval(self.contraction_factor, "contraction_factor")?;
        validate_unit_interval(self.sufficient_decrease, "sufficient_decrease")?;
        if let Some(step) = self.initial_step_size {
            validate_positive(step, "initial_step_size")?;
        }
        Ok(())
    }
}

/// Armijo backtracking that adapts its first trial to the previous call.
///
/// The first trial uses α = initial_step / ||η||. Afterwards each call starts
/// from the α accepted last time, doubled unless that search needed exactly
/// one backtrack. If even the smallest trial does not decrease the cost, no
/// step is taken.
#[derive(Debug, Clone)]
pub struct AdaptiveLineSearch<T> {
    params: AdaptiveLineSearchParams<T>,
    previous_alpha: Option<T>,
}

impl<T: Scalar> AdaptiveLineSearch<T> {
    /// Creates a search with default parameters.
    pub fn new() -> Self {
        Self::with_params(AdaptiveLineSearchParams::default())
    }

    /// Creates a search with the given parameters.
    pub fn with_params(params: AdaptiveLineSearchParams<T>) -> Self {
        Self {
            params,
            previous_alpha: None,
        }
    }

    /// Creates a search after validating `params`.
    pub fn try_with_params(params: AdaptiveLineSearchParams<T>) -> OptimizerResult<Self> {
        params.validate()?;
        Ok(Self::with_params(params))
    }

    /// The parameters in use.
    pub fn params(&self) -> &AdaptiveLineSearchParams<T> {
        &self.params
    }

    /// The α the next call will start from, if any.
    pub fn remembered_alpha(&self) -> Option<T> {
        self.previous_alpha
    }
}

impl<T: Scalar> Default for AdaptiveLineSearch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> LineSearch<T> for AdaptiveLineSearch<T> {
    fn search<M>(
        &mut self,
        cost: &dyn Fn(&M::Point) -> T,
        manifold: &M,
        point: &M::Point,
        direction: &M::TangentVector,
        value: T,
        directional_derivative: T,
    ) -> Result<LineSearchResult<T, M::Point>>
    where
        M: Manifold<T>,
    {
        let direction_norm = manifold.norm(point, direction)?;
        if is_degenerate(direction_norm, directional_derivative) {
            return Ok(no_step(point, value));
        }

        let initial_step = self
            .params
            .initial_step_size
            .unwrap_or_else(|| manifold.typical_distance());
        let alpha = match self.previous_alpha {
            Some(alpha) if alpha > T::zero() && <T as Float>::is_finite(alpha) => alpha,
            _ => initial_step / direction_norm,
        };

        let outcome = backtrack(
            cost,
            manifold,
            point,
            direction,
            value,
            directional_derivative,
            alpha,
            self.params.contraction_factor,
            self.params.sufficient_decrease,
            self.params.max_backtracks,
        )?;

        // Keep pace after a single backtrack, speed up otherwise.
        let two = <T as Scalar>::from_f64(2.0);
        self.previous_alpha = Some(if outcome.evaluations == 2 {
            outcome.alpha
        } else {
            two * outcome.alpha
        });

        debug!(
            alpha = <T as Scalar>::to_f64(outcome.alpha),
            evaluations = outcome.evaluations,
            sufficient_decrease = outcome.sufficient_decrease,
            "adaptive line search"
        );

        Ok(outcome.into_result(direction_norm))
    }

    fn name(&self) -> &str {
        "Adaptive"
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(
            "contraction_factor".to_string(),
            format!("{}", self.params.contraction_factor),
        );
        map.insert(
            "sufficient_decrease".to_string(),
            format!("{}", self.params.sufficient_decrease),
        );
        map.insert(
            "max_backtracks".to_string(),
            self.params.max_backtracks.to_string(),
        );
        map.insert(
            "initial_step_size".to_string(),
            self.params
                .initial_step_size
                .map_or_else(|| "typical_distance".to_string(), |s| format!("{s}")),
        );
        map
    }

    fn reset(&mut self) {
        self.previous_alpha = None;
    }
}

/// Parameters of [`BacktrackingLineSearch`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BacktrackingParams<T> {
    /// Factor applied to α after each failed trial, in (0, 1)
    pub contraction_factor: T,
    /// Multiplier on the extrapolated first trial, at least 1
    pub optimism: T,
    /// Armijo constant c₁, in (0, 1)
    pub sufficient_decrease: T,
    /// Maximum number of contractions per call
    pub max_backtracks: usize,
    /// Length of the first trial step of the first call
    pub initial_step_size: T,
}

impl<T: Scalar> Default for BacktrackingParams<T> {
    fn default() -> Self {
        Self {
            contraction_factor: <T as Scalar>::from_f64(0.5),
            optimism: <T as Scalar>::from_f64(2.0),
            sufficient_decrease: <T as Scalar>::from_f64(1e-4),
            max_backtracks: 25,
            initial_step_size: T::one(),
        }
    }
}

impl<T: Scalar> BacktrackingParams<T> {
    /// Checks parameter ranges.
    pub fn validate(&self) -> OptimizerResult<()> {
        validate_unit_interval(self.contraction_factor, "contraction_factor")?;
        validate_unit_interval(self.sufficient_decrease, "sufficient_decrease")?;
        validate_positive(self.initial_step_size, "initial_step_size")?;
        if !(self.optimism >= T::one()) {
            return Err(OptimizerError::invalid_configuration(
                "must be at least 1",
                "optimism",
                format!("{}", self.optimism),
            ));
        }
        Ok(())
    }
}

/// Armijo backtracking with an extrapolated first trial.
///
/// After the first call the first trial is α = optimism · 2 (f(x) − f_prev) / df0,
/// the step that would reproduce the last decrease on a quadratic model.
#[derive(Debug, Clone)]
pub struct BacktrackingLineSearch<T> {
    params: BacktrackingParams<T>,
    previous_value: Option<T>,
}

impl<T: Scalar> BacktrackingLineSearch<T> {
    /// Creates a search with default parameters.
    pub fn new() -> Self {
        Self::with_params(BacktrackingParams::default())
    }

    /// Creates a search with the given parameters.
    pub fn with_params(params: BacktrackingParams<T>) -> Self {
        Self {
            params,
            previous_value: None,
        }
    }

    /// Creates a search after validating `params`.
    pub fn try_with_params(params: BacktrackingParams<T>) -> OptimizerResult<Self> {
        params.validate()?;
        Ok(Self::with_params(params))
    }

    /// The parameters in use.
    pub fn params(&self) -> &BacktrackingParams<T> {
        &self.params
    }
}

impl<T: Scalar> Default for BacktrackingLineSearch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> LineSearch<T> for BacktrackingLineSearch<T> {
    fn search<M>(
        &mut self,
        cost: &dyn Fn(&M::Point) -> T,
        manifold: &M,
        point: &M::Point,
        direction: &M::TangentVector,
        value: T,
        directional_derivative: T,
    ) -> Result<LineSearchResult<T, M::Point>>
    where
        M: Manifold<T>,
    {
        let direction_norm = manifold.norm(point, direction)?;
        if is_degenerate(direction_norm, directional_derivative) {
            return Ok(no_step(point, value));
        }

        let two = <T as Scalar>::from_f64(2.0);
        let fallback = self.params.initial_step_size / direction_norm;
        let alpha = match self.previous_value {
            Some(previous) => {
                let extrapolated =
                    self.params.optimism * two * (value - previous) / directional_derivative;
                if extrapolated > T::zero() && <T as Float>::is_finite(extrapolated) {
                    extrapolated
                } else {
                    fallback
                }
            }
            None => fallback,
        };

        let outcome = backtrack(
            cost,
            manifold,
            point,
            direction,
            value,
            directional_derivative,
            alpha,
            self.params.contraction_factor,
            self.params.sufficient_decrease,
            self.params.max_backtracks,
        )?;
        self.previous_value = Some(value);

        debug!(
            alpha = <T as Scalar>::to_f64(outcome.alpha),
            evaluations = outcome.evaluations,
            sufficient_decrease = outcome.sufficient_decrease,
            "backtracking line search"
        );

        Ok(outcome.into_result(direction_norm))
    }

    fn name(&self) -> &str {
        "Backtracking"
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(
            "contraction_factor".to_string(),
            format!("{}", self.params.contraction_factor),
        );
        map.insert("optimism".to_string(), format!("{}", self.params.optimism));
        map.insert(
            "sufficient_decrease".to_string(),
            format!("{}", self.params.sufficient_decrease),
        );
        map.insert(
            "max_backtracks".to_string(),
            self.params.max_backtracks.to_string(),
        );
        map.insert(
            "initial_step_size".to_string(),
            format!("{}", self.params.initial_step_size),
        );
        map
    }

    fn reset(&mut self) {
        self.previous_value = None;
    }
}

struct Backtracked<T, P> {
    alpha: T,
    point: P,
    value: T,
    evaluations: usize,
    sufficient_decrease: bool,
}

impl<T: Scalar, P> Backtracked<T, P> {
    fn into_result(self, direction_norm: T) -> LineSearchResult<T, P> {
        LineSearchResult {
            step_size: self.alpha * direction_norm,
            new_point: self.point,
            new_value: self.value,
            function_evals: self.evaluations,
            sufficient_decrease: self.sufficient_decrease,
        }
    }
}

fn is_degenerate<T: Scalar>(direction_norm: T, directional_derivative: T) -> bool {
    !(directional_derivative < T::zero())
        || !(direction_norm > T::zero())
        || !<T as Float>::is_finite(direction_norm)
}

fn no_step<T: Scalar, P: Clone>(point: &P, value: T) -> LineSearchResult<T, P> {
    debug!("line search skipped: not a descent direction");
    LineSearchResult {
        step_size: T::zero(),
        new_point: point.clone(),
        new_value: value,
        function_evals: 0,
        sufficient_decrease: false,
    }
}

/// Contracts α from `alpha` until the Armijo condition holds or
/// `max_backtracks` contractions were tried.
///
/// When the budget runs out the best trial is kept if it lowers the cost;
/// otherwise α is zero and the start point is returned.
#[allow(clippy::too_many_arguments)]
fn backtrack<T, M>(
    cost: &dyn Fn(&M::Point) -> T,
    manifold: &M,
    point: &M::Point,
    direction: &M::TangentVector,
    value: T,
    directional_derivative: T,
    mut alpha: T,
    contraction_factor: T,
    sufficient_decrease: T,
    max_backtracks: usize,
) -> Result<Backtracked<T, M::Point>>
where
    T: Scalar,
    M: Manifold<T>,
{
    let armijo =
        |alpha: T, trial: T| trial <= value + sufficient_decrease * alpha * directional_derivative;

    let step = manifold.scale_tangent(point, alpha, direction)?;
    let mut trial_point = manifold.retract(point, &step)?;
    let mut trial_value = cost(&trial_point);
    let mut evaluations = 1;
    let mut best = (alpha, trial_value, trial_point.clone());

    while !armijo(alpha, trial_value) && evaluations <= max_backtracks {
        alpha = contraction_factor * alpha;
        let step = manifold.scale_tangent(point, alpha, direction)?;
        trial_point = manifold.retract(point, &step)?;
        trial_value = cost(&trial_point);
        evaluations += 1;
        if trial_value < best.1 {
            best = (alpha, trial_value, trial_point.clone());
        }
    }

    if armijo(alpha, trial_value) {
        return Ok(Backtracked {
            alpha,
            point: trial_point,
            value: trial_value,
            evaluations,
            sufficient_decrease: true,
        });
    }

    let (best_alpha, best_value, best_point) = best;
    if best_value < value {
        return Ok(Backtracked {
            alpha: best_alpha,
            point: best_point,
            value: best_value,
            evaluations,
            sufficient_decrease: false,
        });
    }

    Ok(Backtracked {
        alpha: T::zero(),
        point: point.clone(),
        value,
        evaluations,
        sufficient_decrease: false,
    })
}

fn validate_unit_interval<T: Scalar>(value: T, parameter: &str) -> OptimizerResult<()> {
    if value > T::zero() && value < T::one() {
        Ok(())
    } else {
        Err(OptimizerError::invalid_configuration(
            "must lie in (0, 1)",
            parameter,
            format!("{value}"),
        ))
    }
}

fn validate_positive<T: Scalar>(value: T, parameter: &str) -> OptimizerResult<()> {
    if value > T::zero() && <T as Float>::is_finite(value) {
        Ok(())
    } else {
        Err(OptimizerError::invalid_configuration(
            "must be positive and finite",
            parameter,
            format!("{value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_manifolds::TestEuclideanManifold;
    use crate::types::DVector;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn quadratic(x: &DVector<f64>) -> f64 {
        x.norm_squared()
    }

    /// Steepest descent from (1, 1): f = 2, d = -grad = (-2, -2), df0 = -8.
    fn start() -> (DVector<f64>, DVector<f64>, f64, f64) {
        let x = DVector::from_vec(vec![1.0, 1.0]);
        let d = DVector::from_vec(vec![-2.0, -2.0]);
        (x, d, 2.0, -8.0)
    }

    #[test]
    fn test_adaptive_first_step_uses_typical_distance() {
        let manifold = TestEuclideanManifold::new(2);
        let (x, d, f0, df0) = start();
        let mut ls = AdaptiveLineSearch::<f64>::new();

        let result = ls.search(&quadratic, &manifold, &x, &d, f0, df0).unwrap();
        // alpha = sqrt(2) / ||d|| = 0.5 lands on the minimizer at once
        assert_eq!(result.function_evals, 1);
        assert!(result.sufficient_decrease);
        assert_relative_eq!(result.step_size, 2.0f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(result.new_value, 0.0, epsilon = 1e-12);
        assert_relative_eq!(ls.remembered_alpha().unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_adaptive_keeps_pace_after_one_backtrack() {
        let manifold = TestEuclideanManifold::new(2);
        let (x, d, f0, df0) = start();
        let mut ls = AdaptiveLineSearch::with_params(AdaptiveLineSearchParams {
            initial_step_size: Some(2.0 * 8.0f64.sqrt()),
            ..AdaptiveLineSearchParams::default()
        });

        // alpha = 2 gives f = 18, alpha = 1 gives f = 2, alpha = 0.5 hits 0
        let result = ls.search(&quadratic, &manifold, &x, &d, f0, df0).unwrap();
        assert_eq!(result.function_evals, 3);
        assert!(result.sufficient_decrease);
        assert_relative_eq!(ls.remembered_alpha().unwrap(), 1.0, epsilon = 1e-12);

        let mut ls = AdaptiveLineSearch::with_params(AdaptiveLineSearchParams {
            initial_step_size: Some(8.0f64.sqrt()),
            ..AdaptiveLineSearchParams::default()
        });
        let result = ls.search(&quadratic, &manifold, &x, &d, f0, df0).unwrap();
        assert_eq!(result.function_evals, 2);
        assert_relative_eq!(ls.remembered_alpha().unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_direction_takes_no_step() {
        let manifold = TestEuclideanManifold::new(2);
        let x = DVector::from_vec(vec![1.0, 0.0]);
        let calls = Cell::new(0);
        let cost = |p: &DVector<f64>| {
            calls.set(calls.get() + 1);
            quadratic(p)
        };
        let mut ls = AdaptiveLineSearch::<f64>::new();

        let ascent = DVector::from_vec(vec![1.0, 0.0]);
        let result = ls.search(&cost, &manifold, &x, &ascent, 1.0, 2.0).unwrap();
        assert_eq!(result.step_size, 0.0);
        assert_eq!(result.new_point, x);

        let zero = DVector::zeros(2);
        let result = ls.search(&cost, &manifold, &x, &zero, 1.0, -1.0).unwrap();
        assert_eq!(result.function_evals, 0);
        assert_eq!(calls.get(), 0);
        assert!(ls.remembered_alpha().is_none());
    }

    #[test]
    fn test_exhausted_budget_without_decrease_stays_put() {
        let manifold = TestEuclideanManifold::new(1);
        let x = DVector::from_vec(vec![0.0]);
        let d = DVector::from_vec(vec![1.0]);
        // Derivative claims descent but every move increases the cost.
        let cost = |p: &DVector<f64>| p[0].abs();
        let mut ls = AdaptiveLineSearch::<f64>::new();

        let result = ls.search(&cost, &manifold, &x, &d, 0.0, -1.0).unwrap();
        assert_eq!(result.function_evals, 11);
        assert!(!result.sufficient_decrease);
        assert_eq!(result.step_size, 0.0);
        assert_eq!(result.new_point, x);
        assert_eq!(result.new_value, 0.0);
    }

    #[test]
    fn test_exhausted_budget_keeps_best_trial() {
        let manifold = TestEuclideanManifold::new(1);
        let x = DVector::from_vec(vec![0.0]);
        let d = DVector::from_vec(vec![1.0]);
        // Minimum at 0.3, derivative overstated so Armijo never holds
        let cost = |p: &DVector<f64>| (p[0] - 0.3).powi(2) - 0.09;
        let mut ls = AdaptiveLineSearch::with_params(AdaptiveLineSearchParams {
            initial_step_size: Some(1.0),
            max_backtracks: 3,
            ..AdaptiveLineSearchParams::default()
        });

        let result = ls.search(&cost, &manifold, &x, &d, 0.0, -100.0).unwrap();
        assert_eq!(result.function_evals, 4);
        assert!(!result.sufficient_decrease);
        // Trials at 1, 0.5, 0.25, 0.125; 0.25 is closest to 0.3
        assert_relative_eq!(result.new_point[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(result.step_size, 0.25, epsilon = 1e-12);
        assert!(result.new_value < 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// A weighted quadratic searched along its negative gradient, with
        /// the slope reported `overstatement` times too steep so that the
        /// Armijo test sometimes cannot be met.
        #[test]
        fn prop_adaptive_accepts_armijo_or_best_decrease(
            x in prop::collection::vec(-5.0..5.0f64, 2),
            center in prop::collection::vec(-5.0..5.0f64, 2),
            weights in prop::collection::vec(0.1..10.0f64, 2),
            overstatement in 0.5..50.0f64,
            warm_start in 0.01..100.0f64,
        ) {
            let manifold = TestEuclideanManifold::new(2);
            let x = DVector::from_vec(x);
            let center = DVector::from_vec(center);
            let weights = DVector::from_vec(weights);
            let cost = |p: &DVector<f64>| {
                let offset = p - &center;
                offset.component_mul(&offset).dot(&weights)
            };
            let grad = (&x - &center).component_mul(&weights).scale(2.0);
            let d = -&grad;
            let f0 = cost(&x);
            let df0 = -overstatement * grad.norm_squared();

            let mut ls = AdaptiveLineSearch::<f64>::new();
            // A second call starts from the remembered step, so both paths are covered.
            ls.search(&cost, &manifold, &x, &d.scale(warm_start), f0, df0 * warm_start)
                .unwrap();
            let result = ls.search(&cost, &manifold, &x, &d, f0, df0).unwrap();

            prop_assert!(result.function_evals <= 11);
            prop_assert_eq!(result.new_value, cost(&result.new_point));
            let d_norm = d.norm();
            if d_norm == 0.0 {
                prop_assert_eq!(result.function_evals, 0);
                prop_assert_eq!(result.step_size, 0.0);
            } else if result.sufficient_decrease {
                let alpha = result.step_size / d_norm;
                let bound = f0 + 0.5 * alpha * df0;
                prop_assert!(result.new_value <= bound + 1e-12 * (1.0 + f0.abs()));
                let expected = &x + d.scale(alpha);
                prop_assert!((&result.new_point - expected).norm() <= 1e-9 * (1.0 + x.norm()));
            } else {
                prop_assert_eq!(result.function_evals, 11);
                if result.step_size == 0.0 {
                    prop_assert_eq!(&result.new_point, &x);
                    prop_assert_eq!(result.new_value, f0);
                } else {
                    prop_assert!(result.new_value < f0);
                }
            }
        }
    }

    #[test]
    fn test_reset_forgets_memory() {
        let manifold = TestEuclideanManifold::new(2);
        let (x, d, f0, df0) = start();
        let mut ls = AdaptiveLineSearch::<f64>::new();
        ls.search(&quadratic, &manifold, &x, &d, f0, df0).unwrap();
        assert!(ls.remembered_alpha().is_some());
        ls.reset();
        assert!(ls.remembered_alpha().is_none());
    }

    #[test]
    fn test_backtracking_extrapolates_from_last_decrease() {
        let manifold = TestEuclideanManifold::new(2);
        let mut ls = BacktrackingLineSearch::<f64>::new();

        let x = DVector::from_vec(vec![2.0, 0.0]);
        let d = DVector::from_vec(vec![-4.0, 0.0]);
        let first = ls.search(&quadratic, &manifold, &x, &d, 4.0, -16.0).unwrap();
        // alpha = 1 / 4 halves x
        assert_eq!(first.function_evals, 1);
        assert_relative_eq!(first.new_point[0], 1.0, epsilon = 1e-12);

        let y = first.new_point;
        let dy = DVector::from_vec(vec![-2.0, 0.0]);
        let second = ls.search(&quadratic, &manifold, &y, &dy, 1.0, -4.0).unwrap();
        // alpha = 2 * 2 * (1 - 4) / -4 = 3 overshoots; two contractions reach 0.75
        assert!(second.sufficient_decrease);
        assert_eq!(second.function_evals, 3);
        assert_relative_eq!(second.new_value, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_parameter_validation() {
        assert!(AdaptiveLineSearchParams::<f64>::default().validate().is_ok());
        assert!(BacktrackingParams::<f64>::default().validate().is_ok());

        let bad = AdaptiveLineSearchParams {
            contraction_factor: 1.5,
            ..AdaptiveLineSearchParams::<f64>::default()
        };
        assert!(matches!(
            AdaptiveLineSearch::try_with_params(bad),
            Err(OptimizerError::InvalidConfiguration { .. })
        ));

        let bad = BacktrackingParams {
            optimism: 0.5,
            ..BacktrackingParams::<f64>::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_parameters_listing() {
        let ls = AdaptiveLineSearch::<f64>::new();
        let params = ls.parameters();
        assert_eq!(params["max_backtracks"], "10");
        assert_eq!(params["initial_step_size"], "typical_distance");
        assert_eq!(LineSearch::<f64>::name(&ls), "Adaptive");
    }
}
