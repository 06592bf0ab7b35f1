//! Structured optimization log.
//!
//! The log is filled by [`OptimizationLogger`](crate::callback::OptimizationLogger),
//! an observer the solvers attach when their log verbosity is positive. With
//! verbosity 1 only the header and the final values are kept; with verbosity 2
//! every outer iteration adds an [`IterationRecord`].

use crate::{
    optimization::optimizer::{StoppingCriterion, TerminationReason},
    types::Scalar,
};
use std::collections::BTreeMap;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// State of the solver at the start of one outer iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IterationRecord<T, P> {
    /// Completed iterations before this one
    pub iteration: usize,
    /// Time since the solver started
    pub elapsed: Duration,
    /// Current point (best point for population methods)
    pub point: P,
    /// Cost at `point`
    pub cost: T,
    /// Gradient norm at `point`, for gradient-based solvers
    pub gradient_norm: Option<T>,
    /// Length of the step that led to `point`
    pub step_size: Option<T>,
    /// Cost evaluations so far
    pub cost_evaluations: usize,
    /// Whether the line search behind the last step met its sufficient
    /// decrease condition
    pub sufficient_decrease: Option<bool>,
}

/// Values at termination.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FinalValues<T, P> {
    /// Terminal point
    pub point: P,
    /// Cost at the terminal point
    pub cost: T,
    /// Gradient norm at the terminal point, for gradient-based solvers
    pub gradient_norm: Option<T>,
    /// Last step size
    pub step_size: Option<T>,
    /// Completed outer iterations
    pub iterations: usize,
    /// Cost evaluations during the run
    pub cost_evaluations: usize,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

/// Structured log of one solver run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationLog<T, P> {
    /// Solver name
    pub solver: String,
    /// Solver parameters
    pub solver_parameters: BTreeMap<String, String>,
    /// Stopping thresholds in effect
    pub stopping_criterion: StoppingCriterion<T>,
    /// Per-iteration records (log verbosity 2 only)
    pub iterations: Vec<IterationRecord<T, P>>,
    /// Why the solver stopped
    pub termination_reason: Option<TerminationReason>,
    /// Human-readable stopping message
    pub stopping_message: Option<String>,
    /// Values at termination
    pub final_values: Option<FinalValues<T, P>>,
}

impl<T: Scalar, P> OptimizationLog<T, P> {
    /// Creates an empty log for a run.
    pub fn new(
        solver: impl Into<String>,
        solver_parameters: BTreeMap<String, String>,
        stopping_criterion: StoppingCriterion<T>,
    ) -> Self {
        Self {
            solver: solver.into(),
            solver_parameters,
            stopping_criterion,
            iterations: Vec::new(),
            termination_reason: None,
            stopping_message: None,
            final_values: None,
        }
    }

    /// Appends a per-iteration record.
    pub fn push(&mut self, record: IterationRecord<T, P>) {
        self.iterations.push(record);
    }

    /// Records the terminal state.
    pub fn finalize(&mut self, final_values: FinalValues<T, P>, reason: TerminationReason) {
        self.stopping_message = Some(reason.message(final_values.iterations, final_values.elapsed));
        self.termination_reason = Some(reason);
        self.final_values = Some(final_values);
    }

    /// Whether the run finished.
    pub fn is_finalized(&self) -> bool {
        self.final_values.is_some()
    }

    /// Elapsed time of the run, once finalized.
    pub fn elapsed(&self) -> Option<Duration> {
        self.final_values.as_ref().map(|f| f.elapsed)
    }

    /// Completed iterations, once finalized.
    pub fn iteration_count(&self) -> Option<usize> {
        self.final_values.as_ref().map(|f| f.iterations)
    }

    /// Costs of the recorded iterations, in order.
    pub fn cost_history(&self) -> Vec<T> {
        self.iterations.iter().map(|r| r.cost).collect()
    }

    /// Number of steps whose line search exhausted its budget.
    pub fn degraded_steps(&self) -> usize {
        self.iterations
            .iter()
            .filter(|r| r.sufficient_decrease == Some(false))
            .count()
    }
}
