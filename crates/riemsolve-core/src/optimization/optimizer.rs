//! Solver results, termination reasons and the stopping-criterion evaluator.
//!
//! Every solver in the workspace stops through the same pure evaluator,
//! [`ConvergenceChecker::check`], which is called once per completed outer
//! iteration with an [`IterationProgress`] snapshot.
//!
//! # Priority order
//!
//! When several criteria hold at once, the reported reason is the first one in
//! this list:
//!
//! 1. wall-clock time `elapsed >= max_time`
//! 2. gradient norm `||grad f(x)|| < min_gradient_norm` (only when the solver
//!    tracks a gradient)
//! 3. iterations `iteration >= max_iterations`
//! 4. cost evaluations `cost_evaluations >= max_cost_evaluations`
//! 5. step size `step < min_step_size` (only after a step was taken)
//!
//! # Example
//!
//! ```
//! use riemsolve_core::optimizer::{
//!     ConvergenceChecker, IterationProgress, StoppingCriterion, TerminationReason,
//! };
//! use std::time::Duration;
//!
//! let criterion = StoppingCriterion::<f64>::new()
//!     .with_max_iterations(10)
//!     .with_min_gradient_norm(1e-8);
//!
//! let progress = IterationProgress::new(Duration::from_secs(1), 10, 25)
//!     .with_gradient_norm(1e-9);
//!
//! // Both the gradient and the iteration criteria hold: the gradient wins.
//! assert_eq!(
//!     ConvergenceChecker::check(&progress, &criterion),
//!     Some(TerminationReason::Converged)
//! );
//! ```

use crate::{
    error::{OptimizerError, OptimizerResult},
    optimization::log::OptimizationLog,
    types::Scalar,
};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of a solver run.
///
/// `log` is only present when the solver was configured with a positive log
/// verbosity.
#[derive(Debug, Clone)]
pub struct OptimizationResult<T, P>
where
    T: Scalar,
{
    /// The final point found by the solver
    pub point: P,

    /// The cost at the final point
    pub value: T,

    /// The Riemannian gradient norm at the final point, for gradient-based solvers
    pub gradient_norm: Option<T>,

    /// Number of completed outer iterations
    pub iterations: usize,

    /// Cost evaluations made during the run
    pub function_evaluations: usize,

    /// Gradient evaluations made during the run
    pub gradient_evaluations: usize,

    /// Wall-clock time of the run
    pub duration: Duration,

    /// Why the solver stopped
    pub termination_reason: TerminationReason,

    /// True if the gradient-norm criterion triggered
    pub converged: bool,

    /// Structured log, when requested
    pub log: Option<OptimizationLog<T, P>>,
}

impl<T, P> OptimizationResult<T, P>
where
    T: Scalar,
{
    /// Creates a new optimization result.
    pub fn new(
        point: P,
        value: T,
        iterations: usize,
        duration: Duration,
        termination_reason: TerminationReason,
    ) -> Self {
        Self {
            point,
            value,
            gradient_norm: None,
            iterations,
            function_evaluations: 0,
            gradient_evaluations: 0,
            duration,
            termination_reason,
            converged: termination_reason == TerminationReason::Converged,
            log: None,
        }
    }

    /// Sets the gradient norm at the final point.
    pub fn with_gradient_norm(mut self, norm: Option<T>) -> Self {
        self.gradient_norm = norm;
        self
    }

    /// Sets the function evaluation count.
    pub fn with_function_evaluations(mut self, count: usize) -> Self {
        self.function_evaluations = count;
        self
    }

    /// Sets the gradient evaluation count.
    pub fn with_gradient_evaluations(mut self, count: usize) -> Self {
        self.gradient_evaluations = count;
        self
    }

    /// Attaches the structured log.
    pub fn with_log(mut self, log: Option<OptimizationLog<T, P>>) -> Self {
        self.log = log;
        self
    }

    /// Human-readable stopping message.
    pub fn message(&self) -> String {
        self.termination_reason
            .message(self.iterations, self.duration)
    }
}

/// Reasons for solver termination, listed in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// Wall-clock time limit exceeded
    MaxTime,
    /// Gradient norm fell below the threshold
    Converged,
    /// Iteration budget exhausted
    MaxIterations,
    /// Cost evaluation budget exhausted
    MaxFunctionEvaluations,
    /// Step size fell below the threshold
    StepSizeTooSmall,
}

impl TerminationReason {
    /// Full stopping message including the run statistics.
    pub fn message(&self, iterations: usize, elapsed: Duration) -> String {
        let seconds = elapsed.as_secs_f64();
        match self {
            Self::MaxTime => {
                format!("Terminated - max time reached after {iterations} iterations.")
            }
            Self::Converged => format!(
                "Terminated - min grad norm reached after {iterations} iterations, {seconds:.2} seconds."
            ),
            Self::MaxIterations => {
                format!("Terminated - max iterations reached after {seconds:.2} seconds.")
            }
            Self::MaxFunctionEvaluations => {
                format!("Terminated - max cost evals reached after {seconds:.2} seconds.")
            }
            Self::StepSizeTooSmall => format!(
                "Terminated - min stepsize reached after {iterations} iterations, {seconds:.2} seconds."
            ),
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MaxTime => "max time reached",
            Self::Converged => "min grad norm reached",
            Self::MaxIterations => "max iterations reached",
            Self::MaxFunctionEvaluations => "max cost evals reached",
            Self::StepSizeTooSmall => "min stepsize reached",
        };
        f.write_str(text)
    }
}

/// Thresholds that stop a solver. `None` disables a criterion.
///
/// Defaults: 1000 s, 1000 iterations, gradient norm 1e-6, step size 1e-10,
/// 5000 cost evaluations. A criterion set with every threshold disabled never
/// stops; that is a caller error.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoppingCriterion<T> {
    /// Maximum number of outer iterations
    pub max_iterations: Option<usize>,

    /// Maximum wall-clock time
    pub max_time: Option<Duration>,

    /// Stop when the gradient norm drops below this value
    pub min_gradient_norm: Option<T>,

    /// Stop when the last step was shorter than this value
    pub min_step_size: Option<T>,

    /// Maximum number of cost evaluations
    pub max_cost_evaluations: Option<usize>,
}

impl<T> Default for StoppingCriterion<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self {
            max_iterations: Some(1000),
            max_time: Some(Duration::from_secs(1000)),
            min_gradient_norm: Some(<T as Scalar>::from_f64(1e-6)),
            min_step_size: Some(<T as Scalar>::from_f64(1e-10)),
            max_cost_evaluations: Some(5000),
        }
    }
}

impl<T> StoppingCriterion<T>
where
    T: Scalar,
{
    /// Creates a new stopping criterion with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A criterion with every threshold disabled.
    pub fn unbounded() -> Self {
        Self {
            max_iterations: None,
            max_time: None,
            min_gradient_norm: None,
            min_step_size: None,
            max_cost_evaluations: None,
        }
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = Some(max_iter);
        self
    }

    /// Sets the maximum optimization time.
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    /// Sets the gradient-norm threshold.
    pub fn with_min_gradient_norm(mut self, tol: T) -> Self {
        self.min_gradient_norm = Some(tol);
        self
    }

    /// Sets the step-size threshold.
    pub fn with_min_step_size(mut self, tol: T) -> Self {
        self.min_step_size = Some(tol);
        self
    }

    /// Sets the cost-evaluation budget.
    pub fn with_max_cost_evaluations(mut self, max_evals: usize) -> Self {
        self.max_cost_evaluations = Some(max_evals);
        self
    }

    /// Rejects negative or NaN tolerances.
    pub fn validate(&self) -> OptimizerResult<()> {
        let tolerances = [
            ("min_gradient_norm", self.min_gradient_norm),
            ("min_step_size", self.min_step_size),
        ];
        for (name, value) in tolerances {
            if let Some(v) = value {
                if <T as num_traits::Float>::is_nan(v) || v < T::zero() {
                    return Err(OptimizerError::invalid_configuration(
                        "tolerance must be non-negative",
                        name,
                        v.to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Parameters for the optimization log.
    pub fn to_parameters(&self) -> BTreeMap<String, String> {
        fn show<V: fmt::Debug>(v: &Option<V>) -> String {
            v.as_ref()
                .map_or_else(|| "none".to_string(), |v| format!("{v:?}"))
        }
        BTreeMap::from([
            ("max_iterations".to_string(), show(&self.max_iterations)),
            ("max_time".to_string(), show(&self.max_time)),
            ("min_gradient_norm".to_string(), show(&self.min_gradient_norm)),
            ("min_step_size".to_string(), show(&self.min_step_size)),
            (
                "max_cost_evaluations".to_string(),
                show(&self.max_cost_evaluations),
            ),
        ])
    }
}

/// Inputs of the stopping-criterion evaluator at the end of an iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationProgress<T> {
    /// Time since the solver started
    pub elapsed: Duration,
    /// Completed outer iterations
    pub iteration: usize,
    /// Cost evaluations since the solver started
    pub cost_evaluations: usize,
    /// Current gradient norm, for gradient-based solvers
    pub gradient_norm: Option<T>,
    /// Length of the last step, once one was taken
    pub step_size: Option<T>,
}

impl<T: Scalar> IterationProgress<T> {
    /// Progress without gradient or step information.
    pub fn new(elapsed: Duration, iteration: usize, cost_evaluations: usize) -> Self {
        Self {
            elapsed,
            iteration,
            cost_evaluations,
            gradient_norm: None,
            step_size: None,
        }
    }

    /// Adds the gradient norm.
    pub fn with_gradient_norm(mut self, norm: T) -> Self {
        self.gradient_norm = Some(norm);
        self
    }

    /// Adds the last step size, if any.
    pub fn with_step_size(mut self, step: Option<T>) -> Self {
        self.step_size = step;
        self
    }
}

/// Stateless stopping-criterion evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvergenceChecker;

impl ConvergenceChecker {
    /// Returns the highest-priority criterion that holds, or `None` to continue.
    pub fn check<T: Scalar>(
        progress: &IterationProgress<T>,
        criterion: &StoppingCriterion<T>,
    ) -> Option<TerminationReason> {
        if let Some(max_time) = criterion.max_time {
            if progress.elapsed >= max_time {
                return Some(TerminationReason::MaxTime);
            }
        }

        if let (Some(tol), Some(norm)) = (criterion.min_gradient_norm, progress.gradient_norm) {
            if norm < tol {
                return Some(TerminationReason::Converged);
            }
        }

        if let Some(max_iter) = criterion.max_iterations {
            if progress.iteration >= max_iter {
                return Some(TerminationReason::MaxIterations);
            }
        }

        if let Some(max_evals) = criterion.max_cost_evaluations {
            if progress.cost_evaluations >= max_evals {
                return Some(TerminationReason::MaxFunctionEvaluations);
            }
        }

        if let (Some(tol), Some(step)) = (criterion.min_step_size, progress.step_size) {
            if step < tol {
                return Some(TerminationReason::StepSizeTooSmall);
            }
        }

        None
    }
}

/// Common interface of the solvers.
pub trait Optimizer<T>: Debug
where
    T: Scalar,
{
    /// Human-readable name, e.g. "Riemannian CG-HS".
    fn name(&self) -> &str;

    /// Solver parameters as reported in the optimization log.
    fn parameters(&self) -> BTreeMap<String, String>;

    /// The stopping thresholds the solver was built with.
    fn stopping_criterion(&self) -> &StoppingCriterion<T>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_true() -> (IterationProgress<f64>, StoppingCriterion<f64>) {
        let criterion = StoppingCriterion::new()
            .with_max_time(Duration::from_secs(1))
            .with_min_gradient_norm(1.0)
            .with_max_iterations(5)
            .with_max_cost_evaluations(5)
            .with_min_step_size(1.0);
        let progress = IterationProgress::new(Duration::from_secs(2), 5, 5)
            .with_gradient_norm(0.5)
            .with_step_size(Some(0.5));
        (progress, criterion)
    }

    #[test]
    fn test_priority_order() {
        let (mut progress, criterion) = all_true();
        assert_eq!(
            ConvergenceChecker::check(&progress, &criterion),
            Some(TerminationReason::MaxTime)
        );
        progress.elapsed = Duration::ZERO;
        assert_eq!(
            ConvergenceChecker::check(&progress, &criterion),
            Some(TerminationReason::Converged)
        );
        progress.gradient_norm = None;
        assert_eq!(
            ConvergenceChecker::check(&progress, &criterion),
            Some(TerminationReason::MaxIterations)
        );
        progress.iteration = 0;
        assert_eq!(
            ConvergenceChecker::check(&progress, &criterion),
            Some(TerminationReason::MaxFunctionEvaluations)
        );
        progress.cost_evaluations = 0;
        assert_eq!(
            ConvergenceChecker::check(&progress, &criterion),
            Some(TerminationReason::StepSizeTooSmall)
        );
        progress.step_size = None;
        assert_eq!(ConvergenceChecker::check(&progress, &criterion), None);
    }

    #[test]
    fn test_thresholds_are_strict_for_tolerances() {
        let criterion = StoppingCriterion::unbounded()
            .with_min_gradient_norm(1e-6)
            .with_min_step_size(1e-10);
        let progress = IterationProgress::new(Duration::ZERO, 0, 0)
            .with_gradient_norm(1e-6)
            .with_step_size(Some(1e-10));
        assert_eq!(ConvergenceChecker::check(&progress, &criterion), None);
    }

    #[test]
    fn test_unbounded_never_stops() {
        let criterion = StoppingCriterion::<f64>::unbounded();
        let progress = IterationProgress::new(Duration::from_secs(1_000_000), usize::MAX, usize::MAX)
            .with_gradient_norm(0.0)
            .with_step_size(Some(0.0));
        assert_eq!(ConvergenceChecker::check(&progress, &criterion), None);
    }

    #[test]
    fn test_defaults() {
        let criterion = StoppingCriterion::<f64>::default();
        assert_eq!(criterion.max_iterations, Some(1000));
        assert_eq!(criterion.max_time, Some(Duration::from_secs(1000)));
        assert_eq!(criterion.min_gradient_norm, Some(1e-6));
        assert_eq!(criterion.min_step_size, Some(1e-10));
        assert_eq!(criterion.max_cost_evaluations, Some(5000));
        assert!(criterion.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_tolerance() {
        let criterion = StoppingCriterion::<f64>::new().with_min_step_size(-1.0);
        let err = criterion.validate().unwrap_err();
        assert!(err.to_string().contains("min_step_size"));
    }

    #[test]
    fn test_messages() {
        let msg = TerminationReason::Converged.message(12, Duration::from_millis(1500));
        assert_eq!(
            msg,
            "Terminated - min grad norm reached after 12 iterations, 1.50 seconds."
        );
        assert_eq!(TerminationReason::MaxIterations.to_string(), "max iterations reached");
    }

    #[test]
    fn test_result_converged_flag() {
        let result = OptimizationResult::<f64, f64>::new(
            1.0,
            0.0,
            3,
            Duration::ZERO,
            TerminationReason::Converged,
        );
        assert!(result.converged);
        assert!(result.log.is_none());
        let result = OptimizationResult::<f64, f64>::new(
            1.0,
            0.0,
            3,
            Duration::ZERO,
            TerminationReason::MaxIterations,
        );
        assert!(!result.converged);
        assert!(result.message().contains("max iterations"));
    }
}
