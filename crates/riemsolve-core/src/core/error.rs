//! Error types for Riemannian manifold operations and solvers.
//!
//! Geometric failures are reported as [`ManifoldError`]; everything a solver or
//! a problem can raise is an [`OptimizerError`], which wraps manifold errors.

use thiserror::Error;

/// Errors that can occur during manifold operations.
#[derive(Debug, Clone, Error)]
pub enum ManifoldError {
    /// Point is not on the manifold.
    ///
    /// This error occurs when a point fails to satisfy the manifold constraints
    /// within numerical tolerance.
    #[error("Point is not on the manifold: {reason}")]
    InvalidPoint {
        /// Description of why the point is invalid
        reason: String,
    },

    /// Vector is not in the tangent space.
    #[error("Vector is not in the tangent space: {reason}")]
    InvalidTangent {
        /// Description of why the tangent vector is invalid
        reason: String,
    },

    /// Dimension mismatch between operands.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Numerical instability detected.
    ///
    /// This error occurs when numerical operations become unstable,
    /// such as division by near-zero values or loss of precision.
    #[error("Numerical instability detected: {reason}")]
    NumericalError {
        /// Description of the numerical issue
        reason: String,
    },

    /// Method or feature not implemented.
    ///
    /// Used by the optional operations of [`Manifold`](crate::manifold::Manifold),
    /// such as the exponential and logarithmic maps.
    #[error("Feature not implemented: {feature}")]
    NotImplemented {
        /// Name of the unimplemented feature
        feature: String,
    },
}

impl ManifoldError {
    /// Create an InvalidPoint error with a custom reason.
    pub fn invalid_point<S: Into<String>>(reason: S) -> Self {
        Self::InvalidPoint {
            reason: reason.into(),
        }
    }

    /// Create an InvalidTangent error with a custom reason.
    pub fn invalid_tangent<S: Into<String>>(reason: S) -> Self {
        Self::InvalidTangent {
            reason: reason.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a NumericalError with a custom reason.
    pub fn numerical_error<S: Into<String>>(reason: S) -> Self {
        Self::NumericalError {
            reason: reason.into(),
        }
    }

    /// Create a NotImplemented error for a specific feature.
    pub fn not_implemented<S: Into<String>>(feature: S) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }
}

/// Errors that can occur while configuring or running a solver.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Invalid solver, line-search or stopping configuration.
    #[error("Invalid optimizer configuration: {reason} ({parameter} = {value})")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// A conjugate-gradient rule name that does not exist.
    #[error("Unknown beta_type '{given}'; valid rules are: {}", valid.join(", "))]
    UnknownBetaType {
        /// The rejected name
        given: String,
        /// Every accepted rule name
        valid: Vec<String>,
    },

    /// A derivative was requested that neither the caller nor the
    /// differentiator can provide.
    #[error("Missing derivative: no {derivative} available for this problem")]
    MissingDerivative {
        /// Which derivative is missing ("gradient", "hessian")
        derivative: String,
    },

    /// The initial particle population cannot be used.
    #[error("Invalid initial population: {reason}")]
    InvalidInitialPopulation {
        /// Description of the problem
        reason: String,
    },

    /// Propagated manifold error.
    #[error("Manifold operation failed: {0}")]
    ManifoldError(#[from] ManifoldError),
}

impl OptimizerError {
    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Create a MissingDerivative error.
    pub fn missing_derivative<S: Into<String>>(derivative: S) -> Self {
        Self::MissingDerivative {
            derivative: derivative.into(),
        }
    }

    /// Create an InvalidInitialPopulation error.
    pub fn invalid_population<S: Into<String>>(reason: S) -> Self {
        Self::InvalidInitialPopulation {
            reason: reason.into(),
        }
    }
}

/// Result type alias for operations that can produce ManifoldError.
pub type Result<T> = std::result::Result<T, ManifoldError>;

/// Result type alias for optimizer operations.
pub type OptimizerResult<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ManifoldError::invalid_point("not unit norm");
        assert!(matches!(err, ManifoldError::InvalidPoint { .. }));
        assert_eq!(err.to_string(), "Point is not on the manifold: not unit norm");

        let err = ManifoldError::dimension_mismatch(3, 4);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 4");
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            ManifoldError::invalid_point("not unit norm"),
            ManifoldError::invalid_tangent("not orthogonal to point"),
            ManifoldError::dimension_mismatch("5", "4"),
            ManifoldError::numerical_error("antipodal points"),
            ManifoldError::not_implemented("logarithmic map"),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_unknown_beta_type_lists_valid_rules() {
        let err = OptimizerError::UnknownBetaType {
            given: "Bogus".to_string(),
            valid: vec!["FletcherReeves".to_string(), "HagerZhang".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Bogus"));
        assert!(msg.contains("FletcherReeves, HagerZhang"));
    }

    #[test]
    fn test_optimizer_error_creation() {
        let err = OptimizerError::invalid_configuration("must be positive", "nostalgia", "-1");
        assert!(matches!(err, OptimizerError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("nostalgia = -1"));

        let err = OptimizerError::missing_derivative("hessian");
        assert!(err.to_string().contains("no hessian available"));
    }

    #[test]
    fn test_manifold_error_propagation() {
        let manifold_err = ManifoldError::invalid_point("not on sphere");
        let optimizer_err: OptimizerError = manifold_err.into();

        assert!(matches!(optimizer_err, OptimizerError::ManifoldError(_)));
        assert!(optimizer_err.to_string().contains("Manifold operation failed"));
        assert!(optimizer_err.to_string().contains("not on sphere"));
    }
}
