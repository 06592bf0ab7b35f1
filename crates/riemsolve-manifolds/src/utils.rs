//! Helpers shared by the vector geometries.

use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use riemsolve_core::{
    error::{ManifoldError, Result},
    types::{DVector, Scalar},
};

/// Rejects operands whose length differs from the ambient dimension.
#[inline]
pub(crate) fn check_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ManifoldError::dimension_mismatch(expected, actual))
    }
}

/// Vector with independent standard normal entries.
pub(crate) fn standard_normal<T: Scalar>(len: usize, rng: &mut dyn RngCore) -> DVector<T> {
    DVector::from_fn(len, |_, _| {
        let sample: f64 = StandardNormal.sample(&mut *rng);
        <T as Scalar>::from_f64(sample)
    })
}
