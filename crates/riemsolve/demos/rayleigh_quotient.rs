//! Dominant eigenvector of a symmetric matrix on the sphere.
//!
//! Run with: cargo run --example rayleigh_quotient

use riemsolve::core::numerical::check_gradient;
use riemsolve::nalgebra::DMatrix;
use riemsolve::prelude::*;

fn main() -> OptimizerResult<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let n = 20;
    let b = DMatrix::<f64>::from_fn(n, n, |i, j| ((i * 7 + j * 3) % 11) as f64 / 11.0 - 0.5);
    let a = &b + b.transpose();
    let a_cost = a.clone();
    let a_grad = a.clone();

    // Maximize x^T A x by minimizing its negative.
    let sphere = Sphere::new(n)?;
    let problem = Problem::<f64, _>::new(&sphere, move |x: &DVector<f64>| -x.dot(&(&a_cost * x)))
        .with_euclidean_gradient(move |x: &DVector<f64>| (&a_grad * x).scale(-2.0))
        .with_verbosity(1);

    let x0: DVector<f64> = sphere.random_point();
    let check = check_gradient(&problem, &x0, None)?;
    println!(
        "gradient check: slope {:?}, tangency residual {:.2e}",
        check.slope, check.tangency_residual
    );

    for method in ConjugateGradientMethod::ALL {
        let cg = ConjugateGradient::new(
            CGConfig::new()
                .with_method(method)
                .with_log_verbosity(2)
                .with_stopping_criterion(StoppingCriterion::new().with_min_gradient_norm(1e-8)),
        )?;
        let result = cg.solve(&problem, Some(x0.clone()))?;
        let degraded = result.log.as_ref().map_or(0, OptimizationLog::degraded_steps);
        println!(
            "{:<16} eigenvalue {:.10}  iterations {:>4}  cost evals {:>5}  degraded steps {}",
            method.as_str(),
            -result.value,
            result.iterations,
            result.function_evaluations,
            degraded
        );
    }

    let pso = ParticleSwarm::new(
        ParticleSwarmConfig::new()
            .with_seed(0)
            .with_parallel_evaluation(true),
    )?;
    let result = pso.solve(&problem, None)?;
    println!(
        "particle swarm   eigenvalue {:.10}  iterations {:>4}  cost evals {:>5}",
        -result.value, result.iterations, result.function_evaluations
    );

    let eigen = a.symmetric_eigen();
    println!("reference        eigenvalue {:.10}", eigen.eigenvalues.max());
    Ok(())
}
