//! Riemannian conjugate gradient method.
//!
//! Conjugate gradient methods combine the current (preconditioned) gradient
//! with the previous search direction:
//!
//! η_{k+1} = -P grad f(x_{k+1}) + β_k T(η_k)
//!
//! where T transports the old direction to the new tangent space and β_k is
//! given by one of the classical rules. With g = grad f(x_{k+1}),
//! g_old = T(grad f(x_k)), y = g - g_old and P the preconditioner:
//!
//! - **Fletcher-Reeves**: β = ⟨g, Pg⟩ / ⟨g_old, P g_old⟩
//! - **Polak-Ribière**: β = max(0, ⟨Pg, y⟩ / ⟨g_old, P g_old⟩)
//! - **Hestenes-Stiefel**: β = max(0, ⟨Pg, y⟩ / ⟨y, η⟩)
//! - **Hager-Zhang**: β = (⟨y, Pg⟩ - 2 ⟨y, Py⟩ ⟨η, g⟩ / ⟨y, η⟩) / ⟨y, η⟩,
//!   bounded below by -1 / (||η|| min(0.01, ||g_old||))
//!
//! Powell's restart drops the memory (β = 0) when successive gradients lose
//! orthogonality: |⟨T(grad f(x_k)), P g⟩| / ⟨g, Pg⟩ ≥ `orth_value`.
//!
//! The preconditioner must be symmetric positive-definite; the restart test
//! divides by ⟨g, Pg⟩.
//!
//! # References
//!
//! - Hager & Zhang, "A survey of nonlinear conjugate gradient methods" (2006)
//! - Sato, "Riemannian conjugate gradient methods" (2022)

use crate::utils::{difference, negate, observe_run, RunOutcome};
use num_traits::Float;
use riemsolve_core::{
    callback::{IterationEvent, OptimizationCallback, SolverInfo},
    error::{OptimizerError, OptimizerResult, Result},
    line_search::{AdaptiveLineSearch, LineSearch},
    log::FinalValues,
    manifold::Manifold,
    optimizer::{
        ConvergenceChecker, IterationProgress, OptimizationResult, Optimizer, StoppingCriterion,
    },
    problem::Problem,
    types::Scalar,
};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rule for the conjugate-gradient coefficient β.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConjugateGradientMethod {
    /// Fletcher-Reeves
    FletcherReeves,
    /// Polak-Ribière, clipped at zero
    PolakRibiere,
    /// Hestenes-Stiefel, clipped at zero
    HestenesStiefel,
    /// Hager-Zhang with its robustness bound
    HagerZhang,
}

impl ConjugateGradientMethod {
    /// Every rule, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::FletcherReeves,
        Self::PolakRibiere,
        Self::HestenesStiefel,
        Self::HagerZhang,
    ];

    /// Full rule name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FletcherReeves => "FletcherReeves",
            Self::PolakRibiere => "PolakRibiere",
            Self::HestenesStiefel => "HestenesStiefel",
            Self::HagerZhang => "HagerZhang",
        }
    }

    fn abbreviation(&self) -> &'static str {
        match self {
            Self::FletcherReeves => "FR",
            Self::PolakRibiere => "PR",
            Self::HestenesStiefel => "HS",
            Self::HagerZhang => "HZ",
        }
    }
}

impl fmt::Display for ConjugateGradientMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ConjugateGradientMethod {
    type Err = OptimizerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| OptimizerError::UnknownBetaType {
                given: s.to_string(),
                valid: Self::ALL.iter().map(|m| m.as_str().to_string()).collect(),
            })
    }
}

/// Configuration for the conjugate gradient solver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CGConfig<T> {
    /// Rule for β
    pub method: ConjugateGradientMethod,
    /// Powell restart threshold; infinity disables restarts
    pub orth_value: T,
    /// When to stop
    pub stopping_criterion: StoppingCriterion<T>,
    /// 0 returns no log, 1 a summary, 2 also every iteration
    pub log_verbosity: usize,
}

impl<T: Scalar> Default for CGConfig<T> {
    fn default() -> Self {
        Self {
            method: ConjugateGradientMethod::HestenesStiefel,
            orth_value: <T as Float>::infinity(),
            stopping_criterion: StoppingCriterion::default(),
            log_verbosity: 0,
        }
    }
}

impl<T: Scalar> CGConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the β rule.
    pub fn with_method(mut self, method: ConjugateGradientMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the β rule by name.
    ///
    /// # Errors
    /// Returns [`OptimizerError::UnknownBetaType`] listing the valid names.
    pub fn with_beta_type(self, name: &str) -> OptimizerResult<Self> {
        Ok(self.with_method(name.parse()?))
    }

    /// Sets the Powell restart threshold.
    pub fn with_orth_value(mut self, orth_value: T) -> Self {
        self.orth_value = orth_value;
        self
    }

    /// Sets the stopping criterion.
    pub fn with_stopping_criterion(mut self, criterion: StoppingCriterion<T>) -> Self {
        self.stopping_criterion = criterion;
        self
    }

    /// Sets the log verbosity.
    pub fn with_log_verbosity(mut self, verbosity: usize) -> Self {
        self.log_verbosity = verbosity;
        self
    }

    /// Creates a configuration for Fletcher-Reeves.
    pub fn fletcher_reeves() -> Self {
        Self::new().with_method(ConjugateGradientMethod::FletcherReeves)
    }

    /// Creates a configuration for Polak-Ribière.
    pub fn polak_ribiere() -> Self {
        Self::new().with_method(ConjugateGradientMethod::PolakRibiere)
    }

    /// Creates a configuration for Hestenes-Stiefel.
    pub fn hestenes_stiefel() -> Self {
        Self::new().with_method(ConjugateGradientMethod::HestenesStiefel)
    }

    /// Creates a configuration for Hager-Zhang.
    pub fn hager_zhang() -> Self {
        Self::new().with_method(ConjugateGradientMethod::HagerZhang)
    }

    /// Checks the configuration.
    pub fn validate(&self) -> OptimizerResult<()> {
        if <T as Float>::is_nan(self.orth_value) || self.orth_value <= T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "Powell restart threshold must be positive",
                "orth_value",
                self.orth_value.to_string(),
            ));
        }
        self.stopping_criterion.validate()
    }
}

/// Gradient quantities at one iterate.
#[derive(Debug, Clone)]
struct GradientState<T, V> {
    grad: V,
    precond_grad: V,
    norm: T,
    grad_precond_grad: T,
}

fn gradient_state<T, M>(
    problem: &Problem<'_, T, M>,
    point: &M::Point,
) -> OptimizerResult<GradientState<T, M::TangentVector>>
where
    T: Scalar,
    M: Manifold<T>,
{
    let manifold = problem.manifold();
    let grad = problem.gradient(point)?;
    let norm = manifold.norm(point, &grad)?;
    let precond_grad = problem.precondition(point, &grad);
    let grad_precond_grad = manifold.inner_product(point, &grad, &precond_grad)?;
    Ok(GradientState {
        grad,
        precond_grad,
        norm,
        grad_precond_grad,
    })
}

/// Next search direction and the β that produced it.
#[derive(Debug, Clone)]
struct DirectionUpdate<T, V> {
    beta: T,
    direction: V,
}

/// Riemannian conjugate gradient solver.
///
/// The line search is a prototype: [`solve`](Self::solve) runs on a fresh
/// clone of it, so nothing one run learns carries over to the next.
#[derive(Debug, Clone)]
pub struct ConjugateGradient<T: Scalar, L = AdaptiveLineSearch<T>> {
    config: CGConfig<T>,
    line_search: L,
    name: String,
}

impl<T: Scalar> ConjugateGradient<T> {
    /// Creates a solver with the adaptive line search.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: CGConfig<T>) -> OptimizerResult<Self> {
        config.validate()?;
        let name = format!("Riemannian CG-{}", config.method.abbreviation());
        Ok(Self {
            config,
            line_search: AdaptiveLineSearch::new(),
            name,
        })
    }
}

impl<T, L> ConjugateGradient<T, L>
where
    T: Scalar,
    L: LineSearch<T> + Clone,
{
    /// Replaces the line search prototype.
    pub fn with_line_search<L2>(self, line_search: L2) -> ConjugateGradient<T, L2>
    where
        L2: LineSearch<T> + Clone,
    {
        ConjugateGradient {
            config: self.config,
            line_search,
            name: self.name,
        }
    }

    /// The configuration.
    pub fn config(&self) -> &CGConfig<T> {
        &self.config
    }

    /// The line search prototype.
    pub fn line_search(&self) -> &L {
        &self.line_search
    }

    /// Minimizes the problem from `x0`, or from a random point if `None`.
    pub fn solve<M>(
        &self,
        problem: &Problem<'_, T, M>,
        x0: Option<M::Point>,
    ) -> OptimizerResult<OptimizationResult<T, M::Point>>
    where
        M: Manifold<T>,
    {
        let mut line_search = self.line_search.clone();
        line_search.reset();
        self.run(problem, x0, &mut line_search, None)
    }

    /// Like [`solve`](Self::solve), with a caller-held line search whose
    /// memory carries over between runs.
    pub fn solve_with_line_search<M, L2>(
        &self,
        problem: &Problem<'_, T, M>,
        x0: Option<M::Point>,
        line_search: &mut L2,
    ) -> OptimizerResult<OptimizationResult<T, M::Point>>
    where
        M: Manifold<T>,
        L2: LineSearch<T>,
    {
        self.run(problem, x0, line_search, None)
    }

    /// Like [`solve`](Self::solve), also notifying `observer`.
    pub fn solve_with_observer<M>(
        &self,
        problem: &Problem<'_, T, M>,
        x0: Option<M::Point>,
        observer: &mut dyn OptimizationCallback<T, M::Point>,
    ) -> OptimizerResult<OptimizationResult<T, M::Point>>
    where
        M: Manifold<T>,
    {
        let mut line_search = self.line_search.clone();
        line_search.reset();
        self.run(problem, x0, &mut line_search, Some(observer))
    }

    fn run<M, L2>(
        &self,
        problem: &Problem<'_, T, M>,
        x0: Option<M::Point>,
        line_search: &mut L2,
        observer: Option<&mut dyn OptimizationCallback<T, M::Point>>,
    ) -> OptimizerResult<OptimizationResult<T, M::Point>>
    where
        M: Manifold<T>,
        L2: LineSearch<T>,
    {
        let info = SolverInfo {
            solver: self.name.clone(),
            parameters: self.parameters_with(line_search),
            stopping_criterion: self.config.stopping_criterion.clone(),
        };
        observe_run(
            self.config.log_verbosity,
            problem.verbosity(),
            observer,
            |observers| {
                observers.on_optimization_start(&info);
                self.iterate(problem, x0, line_search, observers)
            },
        )
    }

    fn iterate<M, L2>(
        &self,
        problem: &Problem<'_, T, M>,
        x0: Option<M::Point>,
        line_search: &mut L2,
        observers: &mut dyn OptimizationCallback<T, M::Point>,
    ) -> OptimizerResult<RunOutcome<T, M::Point>>
    where
        M: Manifold<T>,
        L2: LineSearch<T>,
    {
        let manifold = problem.manifold();
        let start = Instant::now();
        let evals_before = problem.cost_evaluations();

        let mut x = x0.unwrap_or_else(|| manifold.random_point());
        let mut cost = problem.cost(&x);
        let mut current = gradient_state(problem, &x)?;
        let mut gradient_evaluations = 1;
        let mut desc_dir = negate(manifold, &x, &current.precond_grad)?;

        let mut iteration = 0;
        let mut step_size = None;
        let mut sufficient_decrease = None;

        let reason = loop {
            let cost_evaluations = problem.cost_evaluations() - evals_before;
            observers.on_iteration_start(&IterationEvent {
                iteration,
                elapsed: start.elapsed(),
                point: &x,
                cost,
                gradient_norm: Some(current.norm),
                step_size,
                cost_evaluations,
                sufficient_decrease,
            });

            let progress = IterationProgress::new(start.elapsed(), iteration, cost_evaluations)
                .with_gradient_norm(current.norm)
                .with_step_size(step_size);
            if let Some(reason) =
                ConvergenceChecker::check(&progress, &self.config.stopping_criterion)
            {
                break reason;
            }

            let mut df0 = manifold.inner_product(&x, &current.grad, &desc_dir)?;
            if df0 >= T::zero() {
                debug!(
                    iteration,
                    df0 = <T as Scalar>::to_f64(df0),
                    "not a descent direction, resetting to steepest descent"
                );
                desc_dir = negate(manifold, &x, &current.precond_grad)?;
                df0 = -current.grad_precond_grad;
            }

            let cost_fn = |p: &M::Point| problem.cost(p);
            let search = line_search.search(&cost_fn, manifold, &x, &desc_dir, cost, df0)?;

            let new_x = search.new_point;
            let next = gradient_state(problem, &new_x)?;
            gradient_evaluations += 1;

            let update = self.next_direction(manifold, &x, &new_x, &current, &next, &desc_dir)?;
            debug!(
                iteration,
                beta = <T as Scalar>::to_f64(update.beta),
                step_size = <T as Scalar>::to_f64(search.step_size),
                "conjugate gradient step"
            );

            x = new_x;
            cost = search.new_value;
            current = next;
            desc_dir = update.direction;
            step_size = Some(search.step_size);
            sufficient_decrease = Some(search.sufficient_decrease);
            iteration += 1;

            observers.on_iteration_end(&IterationEvent {
                iteration,
                elapsed: start.elapsed(),
                point: &x,
                cost,
                gradient_norm: Some(current.norm),
                step_size,
                cost_evaluations: problem.cost_evaluations() - evals_before,
                sufficient_decrease,
            });
        };

        let final_values = FinalValues {
            point: x,
            cost,
            gradient_norm: Some(current.norm),
            step_size,
            iterations: iteration,
            cost_evaluations: problem.cost_evaluations() - evals_before,
            elapsed: start.elapsed(),
        };
        observers.on_optimization_end(&final_values, reason);
        Ok(RunOutcome {
            final_values,
            reason,
            gradient_evaluations,
        })
    }

    /// Builds the next search direction at `new_x` from the old direction at `x`.
    fn next_direction<M>(
        &self,
        manifold: &M,
        x: &M::Point,
        new_x: &M::Point,
        old: &GradientState<T, M::TangentVector>,
        new: &GradientState<T, M::TangentVector>,
        desc_dir: &M::TangentVector,
    ) -> Result<DirectionUpdate<T, M::TangentVector>>
    where
        M: Manifold<T>,
    {
        let old_grad = manifold.parallel_transport(x, new_x, &old.grad)?;
        let orth_grads =
            manifold.inner_product(new_x, &old_grad, &new.precond_grad)? / new.grad_precond_grad;

        if <T as Float>::abs(orth_grads) >= self.config.orth_value {
            debug!(
                orth_grads = <T as Scalar>::to_f64(orth_grads),
                "Powell restart"
            );
            return Ok(DirectionUpdate {
                beta: T::zero(),
                direction: negate(manifold, new_x, &new.precond_grad)?,
            });
        }

        let desc_dir = manifold.parallel_transport(x, new_x, desc_dir)?;
        let beta = match self.config.method {
            ConjugateGradientMethod::FletcherReeves => {
                new.grad_precond_grad / old.grad_precond_grad
            }
            ConjugateGradientMethod::PolakRibiere => {
                let diff = difference(manifold, new_x, &new.grad, &old_grad)?;
                let ip_diff = manifold.inner_product(new_x, &new.precond_grad, &diff)?;
                <T as Float>::max(T::zero(), ip_diff / old.grad_precond_grad)
            }
            ConjugateGradientMethod::HestenesStiefel => {
                let diff = difference(manifold, new_x, &new.grad, &old_grad)?;
                let ip_diff = manifold.inner_product(new_x, &new.precond_grad, &diff)?;
                let denominator = manifold.inner_product(new_x, &diff, &desc_dir)?;
                if denominator == T::zero() {
                    T::one()
                } else {
                    <T as Float>::max(T::zero(), ip_diff / denominator)
                }
            }
            ConjugateGradientMethod::HagerZhang => {
                let diff = difference(manifold, new_x, &new.grad, &old_grad)?;
                let old_precond_grad = manifold.parallel_transport(x, new_x, &old.precond_grad)?;
                let precond_diff =
                    difference(manifold, new_x, &new.precond_grad, &old_precond_grad)?;
                let denominator = manifold.inner_product(new_x, &diff, &desc_dir)?;
                if denominator == T::zero() {
                    debug!("Hager-Zhang denominator vanished, restarting");
                    T::zero()
                } else {
                    let two = <T as Scalar>::from_f64(2.0);
                    let numerator = manifold.inner_product(new_x, &diff, &new.precond_grad)?
                        - two
                            * manifold.inner_product(new_x, &diff, &precond_diff)?
                            * manifold.inner_product(new_x, &desc_dir, &new.grad)?
                            / denominator;
                    let beta = numerator / denominator;
                    let desc_dir_norm = manifold.norm(new_x, &desc_dir)?;
                    let cap = <T as Float>::min(<T as Scalar>::from_f64(0.01), old.norm);
                    let eta = -T::one() / (desc_dir_norm * cap);
                    <T as Float>::max(beta, eta)
                }
            }
        };

        let steepest = negate(manifold, new_x, &new.precond_grad)?;
        let direction = manifold.axpy_tangent(new_x, beta, &desc_dir, &steepest)?;
        Ok(DirectionUpdate { beta, direction })
    }

    fn parameters_with<L2: LineSearch<T>>(&self, line_search: &L2) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("beta_type".to_string(), self.config.method.to_string());
        params.insert("orth_value".to_string(), format!("{}", self.config.orth_value));
        params.insert("linesearch".to_string(), line_search.name().to_string());
        for (key, value) in line_search.parameters() {
            params.insert(format!("linesearch.{key}"), value);
        }
        params
    }
}

impl<T, L> Optimizer<T> for ConjugateGradient<T, L>
where
    T: Scalar,
    L: LineSearch<T> + Clone,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        self.parameters_with(&self.line_search)
    }

    fn stopping_criterion(&self) -> &StoppingCriterion<T> {
        &self.config.stopping_criterion
    }
}
