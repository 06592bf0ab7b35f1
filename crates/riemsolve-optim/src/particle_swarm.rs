//! Riemannian particle swarm optimization.
//!
//! A derivative-free population method. Each particle i keeps a position
//! x_i, a velocity v_i ∈ T_{x_i} ℳ and its personal best y_i; the swarm keeps
//! the global best x*. One iteration updates every velocity with
//!
//! v_i ← w T(v_i) + r₁ c_n log_{x_i}(y_i) + r₂ c_s log_{x_i}(x*)
//!
//! where T transports the old velocity from the previous position, r₁, r₂ are
//! uniform in [0, 1), c_n is the nostalgia and c_s the social weight. The
//! inertia w decreases linearly from 0.9 to 0.4 over the iteration budget.
//! Particles then move with x_i ← R_{x_i}(v_i).
//!
//! The manifold must provide a logarithmic map.
//!
//! A seeded run draws the initial particles, the initial velocities and the
//! coefficients r₁, r₂ from one generator, so it is reproducible.
//!
//! # References
//!
//! - Borckmans, Ishteva & Absil, "A modified particle swarm optimization
//!   algorithm for the best low multilinear rank approximation of higher-order
//!   tensors" (2010)

use crate::utils::{observe_run, RunOutcome};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use riemsolve_core::{
    callback::{IterationEvent, OptimizationCallback, SolverInfo},
    error::{OptimizerError, OptimizerResult},
    log::FinalValues,
    manifold::Manifold,
    optimizer::{
        ConvergenceChecker, IterationProgress, OptimizationResult, Optimizer, StoppingCriterion,
    },
    problem::Problem,
    types::Scalar,
};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the particle swarm solver.
///
/// The budgets and the population size depend on the manifold dimension when
/// left unset; they are fixed once per run by [`resolve`](Self::resolve).
/// An iteration or evaluation budget may be given either here or in the
/// stopping criterion, but not as two different values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParticleSwarmConfig<T> {
    /// Cost evaluation budget, `max(5000, 2 dim)` if unset
    pub max_cost_evaluations: Option<usize>,
    /// Iteration budget, `max(500, 4 dim)` if unset
    pub max_iterations: Option<usize>,
    /// Number of particles, `min(40, 10 dim)` if unset
    pub population_size: Option<usize>,
    /// Pull towards the personal best
    pub nostalgia: T,
    /// Pull towards the global best
    pub social: T,
    /// Seed of every random draw of a run; entropy if unset
    pub seed: Option<u64>,
    /// Remaining stopping thresholds. Defaults to the 1000 s time budget
    /// only.
    pub stopping_criterion: StoppingCriterion<T>,
    /// 0 returns no log, 1 a summary, 2 also every iteration
    pub log_verbosity: usize,
    /// Evaluate the particles' costs in parallel
    pub parallel_evaluation: bool,
}

impl<T: Scalar> Default for ParticleSwarmConfig<T> {
    fn default() -> Self {
        Self {
            max_cost_evaluations: None,
            max_iterations: None,
            population_size: None,
            nostalgia: <T as Scalar>::from_f64(1.4),
            social: <T as Scalar>::from_f64(1.4),
            seed: None,
            stopping_criterion: StoppingCriterion {
                max_time: StoppingCriterion::<T>::default().max_time,
                ..StoppingCriterion::unbounded()
            },
            log_verbosity: 0,
            parallel_evaluation: false,
        }
    }
}

impl<T: Scalar> ParticleSwarmConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cost evaluation budget.
    pub fn with_max_cost_evaluations(mut self, max_evals: usize) -> Self {
        self.max_cost_evaluations = Some(max_evals);
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = Some(max_iter);
        self
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = Some(size);
        self
    }

    /// Sets the nostalgia weight.
    pub fn with_nostalgia(mut self, nostalgia: T) -> Self {
        self.nostalgia = nostalgia;
        self
    }

    /// Sets the social weight.
    pub fn with_social(mut self, social: T) -> Self {
        self.social = social;
        self
    }

    /// Seeds the run for reproducible results.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
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

    /// Evaluates particle costs on the rayon thread pool. Without the
    /// `parallel` feature evaluation stays sequential.
    pub fn with_parallel_evaluation(mut self, parallel: bool) -> Self {
        self.parallel_evaluation = parallel;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> OptimizerResult<()> {
        for (name, weight) in [("nostalgia", self.nostalgia), ("social", self.social)] {
            if !<T as num_traits::Float>::is_finite(weight) || weight < T::zero() {
                return Err(OptimizerError::invalid_configuration(
                    "weight must be finite and non-negative",
                    name,
                    weight.to_string(),
                ));
            }
        }
        let counts = [
            ("max_cost_evaluations", self.max_cost_evaluations),
            ("max_iterations", self.max_iterations),
            ("population_size", self.population_size),
        ];
        for (name, count) in counts {
            if count == Some(0) {
                return Err(OptimizerError::invalid_configuration(
                    "must be positive",
                    name,
                    "0",
                ));
            }
        }
        self.stopping_criterion.validate()?;
        self.resolve(1).map(|_| ())
    }

    /// Fills the unset budgets from the manifold dimension.
    ///
    /// The resolved budgets drive both the stopping criterion and the
    /// inertia schedule.
    ///
    /// # Errors
    /// Returns an error if a budget is given in the configuration and in the
    /// stopping criterion with different values.
    pub fn resolve(&self, dimension: usize) -> OptimizerResult<ResolvedSwarmConfig<T>> {
        let criterion = &self.stopping_criterion;
        let max_cost_evaluations = single_budget(
            "max_cost_evaluations",
            self.max_cost_evaluations,
            criterion.max_cost_evaluations,
        )?
        .unwrap_or_else(|| 5000_usize.max(2 * dimension));
        let max_iterations =
            single_budget("max_iterations", self.max_iterations, criterion.max_iterations)?
                .unwrap_or_else(|| 500_usize.max(4 * dimension));
        let population_size = self
            .population_size
            .unwrap_or_else(|| 40_usize.min(10 * dimension).max(1));

        let mut stopping_criterion = criterion.clone();
        stopping_criterion.max_iterations = Some(max_iterations);
        stopping_criterion.max_cost_evaluations = Some(max_cost_evaluations);

        Ok(ResolvedSwarmConfig {
            max_cost_evaluations,
            max_iterations,
            population_size,
            nostalgia: self.nostalgia,
            social: self.social,
            stopping_criterion,
        })
    }
}

fn single_budget(
    name: &str,
    configured: Option<usize>,
    in_criterion: Option<usize>,
) -> OptimizerResult<Option<usize>> {
    match (configured, in_criterion) {
        (Some(a), Some(b)) if a != b => Err(OptimizerError::invalid_configuration(
            "budget given twice with different values",
            name,
            format!("{a} in the configuration, {b} in the stopping criterion"),
        )),
        (Some(0), _) | (None, Some(0)) => Err(OptimizerError::invalid_configuration(
            "must be positive",
            name,
            "0",
        )),
        (budget @ Some(_), _) | (None, budget) => Ok(budget),
    }
}

/// Particle swarm parameters fixed for one run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResolvedSwarmConfig<T> {
    /// Cost evaluation budget
    pub max_cost_evaluations: usize,
    /// Iteration budget, also the horizon of the inertia schedule
    pub max_iterations: usize,
    /// Number of particles
    pub population_size: usize,
    /// Pull towards the personal best
    pub nostalgia: T,
    /// Pull towards the global best
    pub social: T,
    /// Stopping thresholds including the resolved budgets
    pub stopping_criterion: StoppingCriterion<T>,
}

impl<T: Scalar> ResolvedSwarmConfig<T> {
    /// Inertia weight for the iteration after `completed` ones.
    pub fn inertia(&self, completed: usize) -> T {
        let progress = <T as Scalar>::from_usize(completed + 1)
            / <T as Scalar>::from_usize(self.max_iterations);
        <T as Scalar>::from_f64(0.4) + <T as Scalar>::from_f64(0.5) * (T::one() - progress)
    }

    fn to_parameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "max_cost_evaluations".to_string(),
                self.max_cost_evaluations.to_string(),
            ),
            ("max_iterations".to_string(), self.max_iterations.to_string()),
            ("population_size".to_string(), self.population_size.to_string()),
            ("nostalgia".to_string(), format!("{}", self.nostalgia)),
            ("social".to_string(), format!("{}", self.social)),
        ])
    }
}

/// Particle swarm solver.
#[derive(Debug, Clone)]
pub struct ParticleSwarm<T: Scalar> {
    config: ParticleSwarmConfig<T>,
}

impl<T: Scalar> ParticleSwarm<T> {
    /// Creates a solver.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ParticleSwarmConfig<T>) -> OptimizerResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration.
    pub fn config(&self) -> &ParticleSwarmConfig<T> {
        &self.config
    }

    /// Minimizes the problem starting from `population`, or from random
    /// particles if `None`.
    ///
    /// A population whose size differs from the configured one replaces it.
    ///
    /// # Errors
    /// Returns [`OptimizerError::InvalidInitialPopulation`] for an empty
    /// population, and propagates manifold errors.
    pub fn solve<M>(
        &self,
        problem: &Problem<'_, T, M>,
        population: Option<Vec<M::Point>>,
    ) -> OptimizerResult<OptimizationResult<T, M::Point>>
    where
        M: Manifold<T>,
    {
        self.run(problem, population, None)
    }

    /// Like [`solve`](Self::solve), also notifying `observer`.
    pub fn solve_with_observer<M>(
        &self,
        problem: &Problem<'_, T, M>,
        population: Option<Vec<M::Point>>,
        observer: &mut dyn OptimizationCallback<T, M::Point>,
    ) -> OptimizerResult<OptimizationResult<T, M::Point>>
    where
        M: Manifold<T>,
    {
        self.run(problem, population, Some(observer))
    }

    fn run<M>(
        &self,
        problem: &Problem<'_, T, M>,
        population: Option<Vec<M::Point>>,
        observer: Option<&mut dyn OptimizationCallback<T, M::Point>>,
    ) -> OptimizerResult<OptimizationResult<T, M::Point>>
    where
        M: Manifold<T>,
    {
        let manifold = problem.manifold();
        let mut resolved = self.config.resolve(manifold.dimension())?;
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let x = match population {
            Some(x) if x.is_empty() => {
                return Err(OptimizerError::invalid_population(
                    "the initial population is empty",
                ))
            }
            Some(x) => {
                if x.len() != resolved.population_size {
                    warn!(
                        configured = resolved.population_size,
                        given = x.len(),
                        "population size forced to the size of the given initial population"
                    );
                    resolved.population_size = x.len();
                }
                x
            }
            None => (0..resolved.population_size)
                .map(|_| manifold.random_point_with(&mut rng))
                .collect(),
        };

        let info = SolverInfo {
            solver: self.name().to_string(),
            parameters: resolved.to_parameters(),
            stopping_criterion: resolved.stopping_criterion.clone(),
        };
        observe_run(
            self.config.log_verbosity,
            problem.verbosity(),
            observer,
            |observers| {
                observers.on_optimization_start(&info);
                self.iterate(problem, &resolved, x, &mut rng, observers)
            },
        )
    }

    fn iterate<M>(
        &self,
        problem: &Problem<'_, T, M>,
        resolved: &ResolvedSwarmConfig<T>,
        x: Vec<M::Point>,
        rng: &mut StdRng,
        observers: &mut dyn OptimizationCallback<T, M::Point>,
    ) -> OptimizerResult<RunOutcome<T, M::Point>>
    where
        M: Manifold<T>,
    {
        let start = Instant::now();
        let evals_before = problem.cost_evaluations();
        let parallel = self.config.parallel_evaluation;
        let mut swarm = Swarm::new(problem, x, rng, parallel)?;

        let mut iteration = 0;
        let reason = loop {
            let cost_evaluations = problem.cost_evaluations() - evals_before;
            observers.on_iteration_start(&IterationEvent {
                iteration,
                elapsed: start.elapsed(),
                point: &swarm.x_best,
                cost: swarm.f_best,
                gradient_norm: None,
                step_size: None,
                cost_evaluations,
                sufficient_decrease: None,
            });

            let progress = IterationProgress::new(start.elapsed(), iteration, cost_evaluations);
            if let Some(reason) =
                ConvergenceChecker::check(&progress, &resolved.stopping_criterion)
            {
                break reason;
            }

            if swarm.step(problem, resolved, resolved.inertia(iteration), rng, parallel)? {
                debug!(
                    iteration,
                    cost = <T as Scalar>::to_f64(swarm.f_best),
                    "new global best"
                );
            }
            iteration += 1;

            observers.on_iteration_end(&IterationEvent {
                iteration,
                elapsed: start.elapsed(),
                point: &swarm.x_best,
                cost: swarm.f_best,
                gradient_norm: None,
                step_size: None,
                cost_evaluations: problem.cost_evaluations() - evals_before,
                sufficient_decrease: None,
            });
        };

        let final_values = FinalValues {
            point: swarm.x_best,
            cost: swarm.f_best,
            gradient_norm: None,
            step_size: None,
            iterations: iteration,
            cost_evaluations: problem.cost_evaluations() - evals_before,
            elapsed: start.elapsed(),
        };
        observers.on_optimization_end(&final_values, reason);
        Ok(RunOutcome {
            final_values,
            reason,
            gradient_evaluations: 0,
        })
    }
}

/// Population state of one run.
///
/// After every update `fy[i]` is the lowest cost particle `i` has reached,
/// attained at `y[i]`, and `f_best` is the lowest of them, attained at
/// `x_best`.
struct Swarm<T: Scalar, M: Manifold<T>> {
    x: Vec<M::Point>,
    x_prev: Vec<M::Point>,
    v: Vec<M::TangentVector>,
    y: Vec<M::Point>,
    fy: Vec<T>,
    x_best: M::Point,
    f_best: T,
}

impl<T: Scalar, M: Manifold<T>> Swarm<T, M> {
    fn new(
        problem: &Problem<'_, T, M>,
        x: Vec<M::Point>,
        rng: &mut dyn RngCore,
        parallel: bool,
    ) -> OptimizerResult<Self> {
        let manifold = problem.manifold();
        let v = x
            .iter()
            .map(|xi| manifold.random_tangent_with(xi, &mut *rng))
            .collect::<Result<Vec<_>, _>>()?;
        let fy = evaluate(problem, &x, parallel);

        let mut best = 0;
        for (i, fi) in fy.iter().enumerate() {
            if *fi < fy[best] {
                best = i;
            }
        }

        Ok(Self {
            x_prev: x.clone(),
            y: x.clone(),
            x_best: x[best].clone(),
            f_best: fy[best],
            v,
            fy,
            x,
        })
    }

    /// Moves every particle once. Returns whether the global best improved.
    fn step(
        &mut self,
        problem: &Problem<'_, T, M>,
        resolved: &ResolvedSwarmConfig<T>,
        w: T,
        rng: &mut dyn RngCore,
        parallel: bool,
    ) -> OptimizerResult<bool> {
        let manifold = problem.manifold();
        for i in 0..self.x.len() {
            let xi = &self.x[i];
            let inertia = manifold.parallel_transport(&self.x_prev[i], xi, &self.v[i])?;
            let inertia = manifold.scale_tangent(xi, w, &inertia)?;

            let r1 = <T as Scalar>::from_f64(rng.gen::<f64>());
            let to_personal = manifold.log_map(xi, &self.y[i])?;
            let velocity =
                manifold.axpy_tangent(xi, r1 * resolved.nostalgia, &to_personal, &inertia)?;

            let r2 = <T as Scalar>::from_f64(rng.gen::<f64>());
            let to_global = manifold.log_map(xi, &self.x_best)?;
            self.v[i] = manifold.axpy_tangent(xi, r2 * resolved.social, &to_global, &velocity)?;
        }

        self.x_prev.clone_from(&self.x);
        for i in 0..self.x.len() {
            self.x[i] = manifold.retract(&self.x_prev[i], &self.v[i])?;
        }

        let mut improved = false;
        let costs = evaluate(problem, &self.x, parallel);
        for (i, fx) in costs.into_iter().enumerate() {
            if fx < self.fy[i] {
                self.fy[i] = fx;
                self.y[i] = self.x[i].clone();
                if fx < self.f_best {
                    self.f_best = fx;
                    self.x_best = self.x[i].clone();
                    improved = true;
                }
            }
        }
        Ok(improved)
    }
}

/// Costs of every particle, in index order.
fn evaluate<T, M>(problem: &Problem<'_, T, M>, x: &[M::Point], parallel: bool) -> Vec<T>
where
    T: Scalar,
    M: Manifold<T>,
{
    #[cfg(feature = "parallel")]
    if parallel {
        return x.par_iter().map(|xi| problem.cost(xi)).collect();
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;
    x.iter().map(|xi| problem.cost(xi)).collect()
}

impl<T: Scalar> Optimizer<T> for ParticleSwarm<T> {
    fn name(&self) -> &str {
        "Particle Swarm"
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        let show = |v: Option<usize>| v.map_or_else(|| "auto".to_string(), |v| v.to_string());
        params.insert(
            "max_cost_evaluations".to_string(),
            show(self.config.max_cost_evaluations),
        );
        params.insert("max_iterations".to_string(), show(self.config.max_iterations));
        params.insert("population_size".to_string(), show(self.config.population_size));
        params.insert("nostalgia".to_string(), format!("{}", self.config.nostalgia));
        params.insert("social".to_string(), format!("{}", self.config.social));
        params
    }

    fn stopping_criterion(&self) -> &StoppingCriterion<T> {
        &self.config.stopping_criterion
    }
}
