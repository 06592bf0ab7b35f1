//! Observers of a solver run.
//!
//! Solvers call an [`OptimizationCallback`] at fixed extension points and
//! never branch on logging levels themselves. Accumulating the structured log
//! ([`OptimizationLogger`]) and printing progress ([`ProgressReporter`]) are
//! both observers; callers can add their own through the solvers'
//! `solve_with_observer` entry points.

use crate::{
    optimization::{
        log::{FinalValues, IterationRecord, OptimizationLog},
        optimizer::{StoppingCriterion, TerminationReason},
    },
    types::Scalar,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

/// Static description of a run, passed once at start.
#[derive(Debug, Clone)]
pub struct SolverInfo<T> {
    /// Solver name
    pub solver: String,
    /// Solver parameters
    pub parameters: BTreeMap<String, String>,
    /// Stopping thresholds in effect
    pub stopping_criterion: StoppingCriterion<T>,
}

/// Snapshot of the solver state at an iteration boundary.
#[derive(Debug, Clone)]
pub struct IterationEvent<'a, T, P> {
    /// Completed iterations
    pub iteration: usize,
    /// Time since the solver started
    pub elapsed: Duration,
    /// Current point (best point for population methods)
    pub point: &'a P,
    /// Cost at `point`
    pub cost: T,
    /// Gradient norm at `point`, for gradient-based solvers
    pub gradient_norm: Option<T>,
    /// Length of the step that led to `point`
    pub step_size: Option<T>,
    /// Cost evaluations so far
    pub cost_evaluations: usize,
    /// Whether the last line search met its sufficient decrease condition
    pub sufficient_decrease: Option<bool>,
}

impl<T: Copy, P: Clone> IterationEvent<'_, T, P> {
    /// Owned copy for the log.
    pub fn to_record(&self) -> IterationRecord<T, P> {
        IterationRecord {
            iteration: self.iteration,
            elapsed: self.elapsed,
            point: self.point.clone(),
            cost: self.cost,
            gradient_norm: self.gradient_norm,
            step_size: self.step_size,
            cost_evaluations: self.cost_evaluations,
            sufficient_decrease: self.sufficient_decrease,
        }
    }
}

/// Trait for solver observers.
///
/// All hooks default to doing nothing. Observers cannot influence the run.
pub trait OptimizationCallback<T, P> {
    /// Called once before the first iteration.
    fn on_optimization_start(&mut self, info: &SolverInfo<T>) {
        let _ = info;
    }

    /// Called at the top of every outer iteration, before the stopping check.
    /// The last call describes the terminal state.
    fn on_iteration_start(&mut self, event: &IterationEvent<'_, T, P>) {
        let _ = event;
    }

    /// Called after every completed step.
    fn on_iteration_end(&mut self, event: &IterationEvent<'_, T, P>) {
        let _ = event;
    }

    /// Called once when the solver stops.
    fn on_optimization_end(&mut self, final_values: &FinalValues<T, P>, reason: TerminationReason) {
        let _ = (final_values, reason);
    }
}

/// A no-op observer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl<T, P> OptimizationCallback<T, P> for NoOpCallback {}

/// Builds the [`OptimizationLog`] of a run.
#[derive(Debug, Clone)]
pub struct OptimizationLogger<T, P> {
    verbosity: usize,
    log: Option<OptimizationLog<T, P>>,
}

impl<T: Scalar, P: Clone> OptimizationLogger<T, P> {
    /// Log verbosity: 0 keeps nothing, 1 header and final values,
    /// 2 also every iteration.
    pub fn new(verbosity: usize) -> Self {
        Self {
            verbosity,
            log: None,
        }
    }

    /// The accumulated log, `None` at verbosity 0.
    pub fn into_log(self) -> Option<OptimizationLog<T, P>> {
        self.log
    }
}

impl<T: Scalar, P: Clone> OptimizationCallback<T, P> for OptimizationLogger<T, P> {
    fn on_optimization_start(&mut self, info: &SolverInfo<T>) {
        if self.verbosity > 0 {
            self.log = Some(OptimizationLog::new(
                info.solver.clone(),
                info.parameters.clone(),
                info.stopping_criterion.clone(),
            ));
        }
    }

    fn on_iteration_start(&mut self, event: &IterationEvent<'_, T, P>) {
        if self.verbosity >= 2 {
            if let Some(log) = self.log.as_mut() {
                log.push(event.to_record());
            }
        }
    }

    fn on_optimization_end(&mut self, final_values: &FinalValues<T, P>, reason: TerminationReason) {
        if let Some(log) = self.log.as_mut() {
            log.finalize(final_values.clone(), reason);
        }
    }
}

/// Emits progress through `tracing`.
///
/// Verbosity 1 reports start and termination, verbosity 2 adds one row per
/// iteration.
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    verbosity: usize,
}

impl ProgressReporter {
    /// Creates a reporter for the given problem verbosity.
    pub fn new(verbosity: usize) -> Self {
        Self { verbosity }
    }
}

impl<T: Scalar, P> OptimizationCallback<T, P> for ProgressReporter {
    fn on_optimization_start(&mut self, info: &SolverInfo<T>) {
        if self.verbosity >= 1 {
            info!(solver = %info.solver, "optimizing");
        }
    }

    fn on_iteration_start(&mut self, event: &IterationEvent<'_, T, P>) {
        if self.verbosity >= 2 {
            info!(
                iteration = event.iteration,
                cost = <T as Scalar>::to_f64(event.cost),
                gradient_norm = event.gradient_norm.map(<T as Scalar>::to_f64),
                cost_evaluations = event.cost_evaluations,
                "iteration"
            );
        }
    }

    fn on_optimization_end(&mut self, final_values: &FinalValues<T, P>, reason: TerminationReason) {
        if self.verbosity >= 1 {
            info!(
                cost = <T as Scalar>::to_f64(final_values.cost),
                "{}",
                reason.message(final_values.iterations, final_values.elapsed)
            );
        }
    }
}

/// Fans every hook out to several observers, in insertion order.
pub struct ObserverSet<'a, T, P> {
    observers: Vec<&'a mut dyn OptimizationCallback<T, P>>,
}

impl<'a, T, P> ObserverSet<'a, T, P> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Adds an observer.
    pub fn with(mut self, observer: &'a mut dyn OptimizationCallback<T, P>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl<T, P> Default for ObserverSet<'_, T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> OptimizationCallback<T, P> for ObserverSet<'_, T, P> {
    fn on_optimization_start(&mut self, info: &SolverInfo<T>) {
        for observer in &mut self.observers {
            observer.on_optimization_start(info);
        }
    }

    fn on_iteration_start(&mut self, event: &IterationEvent<'_, T, P>) {
        for observer in &mut self.observers {
            observer.on_iteration_start(event);
        }
    }

    fn on_iteration_end(&mut self, event: &IterationEvent<'_, T, P>) {
        for observer in &mut self.observers {
            observer.on_iteration_end(event);
        }
    }

    fn on_optimization_end(&mut self, final_values: &FinalValues<T, P>, reason: TerminationReason) {
        for observer in &mut self.observers {
            observer.on_optimization_end(final_values, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> SolverInfo<f64> {
        SolverInfo {
            solver: "test".to_string(),
            parameters: BTreeMap::new(),
            stopping_criterion: StoppingCriterion::new(),
        }
    }

    fn event(point: &f64, iteration: usize) -> IterationEvent<'_, f64, f64> {
        IterationEvent {
            iteration,
            elapsed: Duration::ZERO,
            point,
            cost: point * point,
            gradient_norm: Some(2.0 * point),
            step_size: None,
            cost_evaluations: iteration,
            sufficient_decrease: None,
        }
    }

    fn finish(observer: &mut dyn OptimizationCallback<f64, f64>) {
        observer.on_optimization_start(&info());
        for (i, p) in [3.0, 2.0, 1.0].iter().enumerate() {
            observer.on_iteration_start(&event(p, i));
            observer.on_iteration_end(&event(p, i));
        }
        let final_values = FinalValues {
            point: 1.0,
            cost: 1.0,
            gradient_norm: Some(2.0),
            step_size: None,
            iterations: 2,
            cost_evaluations: 2,
            elapsed: Duration::ZERO,
        };
        observer.on_optimization_end(&final_values, TerminationReason::MaxIterations);
    }

    #[test]
    fn test_logger_verbosity_levels() {
        let mut silent = OptimizationLogger::<f64, f64>::new(0);
        finish(&mut silent);
        assert!(silent.into_log().is_none());

        let mut summary = OptimizationLogger::<f64, f64>::new(1);
        finish(&mut summary);
        let log = summary.into_log().unwrap();
        assert!(log.iterations.is_empty());
        assert_eq!(log.iteration_count(), Some(2));

        let mut full = OptimizationLogger::<f64, f64>::new(2);
        finish(&mut full);
        let log = full.into_log().unwrap();
        assert_eq!(log.cost_history(), vec![9.0, 4.0, 1.0]);
        assert_eq!(log.termination_reason, Some(TerminationReason::MaxIterations));
    }

    #[derive(Default)]
    struct Counter {
        starts: usize,
        ends: usize,
        finished: bool,
    }

    impl OptimizationCallback<f64, f64> for Counter {
        fn on_iteration_start(&mut self, _event: &IterationEvent<'_, f64, f64>) {
            self.starts += 1;
        }
        fn on_iteration_end(&mut self, _event: &IterationEvent<'_, f64, f64>) {
            self.ends += 1;
        }
        fn on_optimization_end(&mut self, _final: &FinalValues<f64, f64>, _reason: TerminationReason) {
            self.finished = true;
        }
    }

    #[test]
    fn test_observer_set_fans_out() {
        let mut a = Counter::default();
        let mut b = Counter::default();
        let mut reporter = ProgressReporter::new(2);
        {
            let mut set = ObserverSet::new().with(&mut a).with(&mut reporter).with(&mut b);
            finish(&mut set);
        }
        assert_eq!((a.starts, a.ends, a.finished), (3, 3, true));
        assert_eq!((b.starts, b.ends, b.finished), (3, 3, true));
    }
}
