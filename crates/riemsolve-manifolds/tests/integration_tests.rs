//! Integration tests for riemsolve-manifolds
//!
//! Geometric identities every geometry must satisfy, checked on random
//! inputs through the core trait only.

use proptest::prelude::*;
use riemsolve_core::{manifold::Manifold, types::DVector};
use riemsolve_manifolds::{Euclidean, Sphere};

const TOL: f64 = 1e-9;

fn vector(dim: usize) -> impl Strategy<Value = DVector<f64>> {
    prop::collection::vec(-3.0..3.0f64, dim).prop_map(DVector::from_vec)
}

/// A point on S^3 and an ambient vector, away from the degenerate origin.
fn sphere_input() -> impl Strategy<Value = (DVector<f64>, DVector<f64>)> {
    (vector(4), vector(4))
        .prop_filter("non-zero point", |(x, _)| x.norm() > 1e-3)
        .prop_map(|(x, v)| (x.normalize(), v))
}

fn retraction_is_centered<M>(manifold: &M, x: &DVector<f64>)
where
    M: Manifold<f64, Point = DVector<f64>, TangentVector = DVector<f64>>,
{
    let zero = manifold.zero_tangent(x);
    let retracted = manifold.retract(x, &zero).unwrap();
    assert!((retracted - x).norm() < TOL);
    let exp = manifold.exp_map(x, &zero).unwrap();
    assert!((exp - x).norm() < TOL);
}

proptest! {
    #[test]
    fn sphere_retraction_stays_on_sphere((x, v) in sphere_input()) {
        let sphere = Sphere::new(4).unwrap();
        let u = sphere.project_tangent(&x, &v).unwrap();
        prop_assert!(x.dot(&u).abs() < TOL);
        let y = sphere.retract(&x, &u).unwrap();
        prop_assert!(sphere.is_point_on_manifold(&y, TOL));
        retraction_is_centered(&sphere, &x);
    }

    #[test]
    fn sphere_log_inverts_exp((x, v) in sphere_input()) {
        let sphere = Sphere::new(4).unwrap();
        let u = sphere.project_tangent(&x, &v).unwrap();
        // Stay inside the injectivity radius.
        prop_assume!(u.norm() < 3.0);
        let y = sphere.exp_map(&x, &u).unwrap();
        let back = sphere.log_map(&x, &y).unwrap();
        prop_assert!((back - &u).norm() < 1e-7);
        prop_assert!((sphere.distance(&x, &y).unwrap() - u.norm()).abs() < 1e-7);
    }

    #[test]
    fn sphere_exp_inverts_log(((x, _), (y, _)) in (sphere_input(), sphere_input())) {
        let sphere = Sphere::new(4).unwrap();
        prop_assume!(x.dot(&y) > -0.99);
        let u = sphere.log_map(&x, &y).unwrap();
        let back = sphere.exp_map(&x, &u).unwrap();
        prop_assert!((back - &y).norm() < 1e-7);
    }

    #[test]
    fn sphere_transport_is_tangent(((x, v), (y, _)) in (sphere_input(), sphere_input())) {
        let sphere = Sphere::new(4).unwrap();
        let u = sphere.project_tangent(&x, &v).unwrap();
        let moved = sphere.parallel_transport(&x, &y, &u).unwrap();
        prop_assert!(y.dot(&moved).abs() < TOL);
    }

    #[test]
    fn euclidean_maps_are_inverse(x in vector(3), y in vector(3)) {
        let space = Euclidean::new(3).unwrap();
        let u = space.log_map(&x, &y).unwrap();
        let back = space.exp_map(&x, &u).unwrap();
        prop_assert!((back - &y).norm() < TOL);
        retraction_is_centered(&space, &x);
    }
}

#[test]
fn test_manifolds_are_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Sphere>();
    assert_send_sync::<Euclidean>();
}
