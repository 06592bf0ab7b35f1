//! Gradient consistency check.
//!
//! Along a unit tangent direction d the first-order model
//!
//! f(R_x(t d)) ≈ f(x) + t ⟨grad f(x), d⟩_x
//!
//! has an error of order t² when the gradient is correct and of order t
//! otherwise. [`check_gradient`] samples t on a logarithmic grid, fits the
//! log-log slope of the model error over a middle window where neither
//! truncation nor round-off dominates, and reports it together with how far
//! the gradient is from the tangent space.

use crate::{
    error::{ManifoldError, OptimizerResult},
    manifold::Manifold,
    problem::Problem,
    types::Scalar,
};
use num_traits::Float;
use tracing::info;

/// Sampling grid of [`check_gradient_with_config`].
#[derive(Debug, Clone)]
pub struct GradientCheckConfig<T> {
    /// Smallest t sampled
    pub min_step: T,
    /// Largest t sampled
    pub max_step: T,
    /// Number of log-spaced samples
    pub num_steps: usize,
    /// Lower end of the slope-fitting window
    pub fit_min: T,
    /// Upper end of the slope-fitting window
    pub fit_max: T,
}

impl<T: Scalar> Default for GradientCheckConfig<T> {
    fn default() -> Self {
        Self {
            min_step: <T as Scalar>::from_f64(1e-8),
            max_step: T::one(),
            num_steps: 51,
            fit_min: <T as Scalar>::from_f64(1e-5),
            fit_max: <T as Scalar>::from_f64(1e-1),
        }
    }
}

/// Outcome of a gradient check.
#[derive(Debug, Clone)]
pub struct GradientCheck<T> {
    /// Sampled t values, increasing
    pub step_sizes: Vec<T>,
    /// |f(R_x(t d)) - f(x) - t ⟨grad, d⟩| for each t
    pub model_errors: Vec<T>,
    /// ⟨grad f(x), d⟩ at the checked point
    pub directional_derivative: T,
    /// Fitted log-log slope of the model error; `None` when the cost is affine
    /// along d and every error in the window vanished
    pub slope: Option<T>,
    /// Goodness of the slope fit
    pub r_squared: T,
    /// ||grad - proj_x(grad)||, zero for a tangent gradient
    pub tangency_residual: T,
}

impl<T: Scalar> GradientCheck<T> {
    /// Whether the slope is within `tolerance` of 2 and the gradient is
    /// tangent up to `tolerance`.
    pub fn is_consistent(&self, tolerance: T) -> bool {
        let two = <T as Scalar>::from_f64(2.0);
        let slope_ok = self
            .slope
            .map_or(true, |s| <T as Float>::abs(s - two) <= tolerance);
        slope_ok && self.tangency_residual <= tolerance
    }
}

/// Checks the gradient of `problem` at `point` with the default grid.
///
/// A random unit tangent direction is drawn when `direction` is `None`.
/// Cost evaluations made here count towards the problem's total.
pub fn check_gradient<T, M>(
    problem: &Problem<'_, T, M>,
    point: &M::Point,
    direction: Option<&M::TangentVector>,
) -> OptimizerResult<GradientCheck<T>>
where
    T: Scalar,
    M: Manifold<T>,
{
    check_gradient_with_config(problem, point, direction, &GradientCheckConfig::default())
}

/// [`check_gradient`] with an explicit sampling grid.
pub fn check_gradient_with_config<T, M>(
    problem: &Problem<'_, T, M>,
    point: &M::Point,
    direction: Option<&M::TangentVector>,
    config: &GradientCheckConfig<T>,
) -> OptimizerResult<GradientCheck<T>>
where
    T: Scalar,
    M: Manifold<T>,
{
    let manifold = problem.manifold();
    let direction = match direction {
        Some(d) => {
            let norm = manifold.norm(point, d)?;
            if !(norm > T::zero()) {
                return Err(ManifoldError::invalid_tangent("zero direction").into());
            }
            manifold.scale_tangent(point, T::one() / norm, d)?
        }
        None => manifold.random_tangent(point)?,
    };

    let gradient = problem.gradient(point)?;
    let projected = manifold.project_tangent(point, &gradient)?;
    let residual = manifold.axpy_tangent(point, -T::one(), &projected, &gradient)?;
    let tangency_residual = manifold.norm(point, &residual)?;

    let f0 = problem.cost(point);
    let df0 = manifold.inner_product(point, &gradient, &direction)?;

    let step_sizes = log_space(config.min_step, config.max_step, config.num_steps);
    let mut model_errors = Vec::with_capacity(step_sizes.len());
    for &t in &step_sizes {
        let step = manifold.scale_tangent(point, t, &direction)?;
        let moved = manifold.retract(point, &step)?;
        let error = <T as Float>::abs(problem.cost(&moved) - f0 - t * df0);
        model_errors.push(error);
    }

    let (log_t, log_e): (Vec<T>, Vec<T>) = step_sizes
        .iter()
        .zip(&model_errors)
        .filter(|(t, e)| **t >= config.fit_min && **t <= config.fit_max && **e > T::zero())
        .map(|(t, e)| (<T as Float>::ln(*t), <T as Float>::ln(*e)))
        .unzip();
    let (slope, r_squared) = match fit_line(&log_t, &log_e) {
        Some((slope, r_squared)) => (Some(slope), r_squared),
        None => (None, T::one()),
    };

    info!(
        slope = slope.map(<T as Scalar>::to_f64),
        tangency_residual = <T as Scalar>::to_f64(tangency_residual),
        "gradient check"
    );

    Ok(GradientCheck {
        step_sizes,
        model_errors,
        directional_derivative: df0,
        slope,
        r_squared,
        tangency_residual,
    })
}

fn log_space<T: Scalar>(min: T, max: T, count: usize) -> Vec<T> {
    if count < 2 {
        return vec![max];
    }
    let (lo, hi) = (<T as Float>::ln(min), <T as Float>::ln(max));
    let last = <T as Scalar>::from_usize(count - 1);
    (0..count)
        .map(|i| {
            let w = <T as Scalar>::from_usize(i) / last;
            <T as Float>::exp(lo * (T::one() - w) + hi * w)
        })
        .collect()
}

/// Least-squares line through (x, y): returns the slope and R².
fn fit_line<T: Scalar>(x: &[T], y: &[T]) -> Option<(T, T)> {
    if x.len() < 2 {
        return None;
    }
    let n = <T as Scalar>::from_usize(x.len());
    let mean_x = x.iter().fold(T::zero(), |acc, &v| acc + v) / n;
    let mean_y = y.iter().fold(T::zero(), |acc, &v| acc + v) / n;

    let mut sxy = T::zero();
    let mut sxx = T::zero();
    for (&xi, &yi) in x.iter().zip(y) {
        sxy += (xi - mean_x) * (yi - mean_y);
        sxx += (xi - mean_x) * (xi - mean_x);
    }
    if !(sxx > T::zero()) {
        return None;
    }
    let slope = sxy / sxx;

    let mut ss_res = T::zero();
    let mut ss_tot = T::zero();
    for (&xi, &yi) in x.iter().zip(y) {
        let predicted = mean_y + slope * (xi - mean_x);
        ss_res += (yi - predicted) * (yi - predicted);
        ss_tot += (yi - mean_y) * (yi - mean_y);
    }
    let r_squared = if ss_tot > T::zero() {
        T::one() - ss_res / ss_tot
    } else {
        T::one()
    };
    Some((slope, r_squared))
}
