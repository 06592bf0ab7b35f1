//! Plumbing shared by the solvers.
//!
//! Every run attaches the same observers: the log builder, the progress
//! reporter and an optional caller observer. The solver body only sees one
//! fanned-out observer and hands back a [`RunOutcome`].

use riemsolve_core::{
    callback::{ObserverSet, OptimizationCallback, OptimizationLogger, ProgressReporter},
    error::{OptimizerResult, Result},
    log::FinalValues,
    manifold::Manifold,
    optimizer::{OptimizationResult, TerminationReason},
    types::Scalar,
};

/// What a solver body reports when it stops.
#[derive(Debug)]
pub(crate) struct RunOutcome<T, P> {
    pub final_values: FinalValues<T, P>,
    pub reason: TerminationReason,
    pub gradient_evaluations: usize,
}

/// Runs `body` with the observers of one solve and assembles the result.
pub(crate) fn observe_run<T, P, F>(
    log_verbosity: usize,
    verbosity: usize,
    observer: Option<&mut dyn OptimizationCallback<T, P>>,
    body: F,
) -> OptimizerResult<OptimizationResult<T, P>>
where
    T: Scalar,
    P: Clone,
    F: FnOnce(&mut dyn OptimizationCallback<T, P>) -> OptimizerResult<RunOutcome<T, P>>,
{
    let mut logger = OptimizationLogger::new(log_verbosity);
    let mut reporter = ProgressReporter::new(verbosity);
    let outcome = {
        let mut observers = ObserverSet::new().with(&mut logger).with(&mut reporter);
        if let Some(observer) = observer {
            observers = observers.with(observer);
        }
        body(&mut observers)?
    };

    let RunOutcome {
        final_values,
        reason,
        gradient_evaluations,
    } = outcome;
    Ok(OptimizationResult::new(
        final_values.point,
        final_values.cost,
        final_values.iterations,
        final_values.elapsed,
        reason,
    )
    .with_gradient_norm(final_values.gradient_norm)
    .with_function_evaluations(final_values.cost_evaluations)
    .with_gradient_evaluations(gradient_evaluations)
    .with_log(logger.into_log()))
}

/// -v
pub(crate) fn negate<T, M>(
    manifold: &M,
    point: &M::Point,
    v: &M::TangentVector,
) -> Result<M::TangentVector>
where
    T: Scalar,
    M: Manifold<T>,
{
    manifold.scale_tangent(point, -T::one(), v)
}

/// u - v
pub(crate) fn difference<T, M>(
    manifold: &M,
    point: &M::Point,
    u: &M::TangentVector,
    v: &M::TangentVector,
) -> Result<M::TangentVector>
where
    T: Scalar,
    M: Manifold<T>,
{
    manifold.axpy_tangent(point, -T::one(), v, u)
}
