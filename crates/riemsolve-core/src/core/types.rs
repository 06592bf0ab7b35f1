//! Type definitions and aliases for Riemannian optimization.
//!
//! This module provides the scalar trait shared by every crate in the workspace
//! and the vector aliases used by the bundled geometries.

use nalgebra::{Dyn, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// This trait combines all the necessary numeric traits required
/// for Riemannian optimization algorithms.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Tolerance for checking if a point is on the manifold.
    const MANIFOLD_TOLERANCE: Self;

    /// Convert from f64 (for constants).
    ///
    /// Values outside the representable range become NaN.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).unwrap_or_else(<Self as Float>::nan)
    }

    /// Convert to f64 (for logging/display).
    fn to_f64(self) -> f64 {
        num_traits::cast(self).unwrap_or(f64::NAN)
    }

    /// Convert from usize (for iteration counts).
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).unwrap_or_else(<Self as Float>::infinity)
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const MANIFOLD_TOLERANCE: Self = 1e-5;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const MANIFOLD_TOLERANCE: Self = 1e-10;
}

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;
