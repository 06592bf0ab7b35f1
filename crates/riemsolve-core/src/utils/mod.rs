//! Test helpers.

#[cfg(any(test, feature = "test-utils"))]
pub mod test_manifolds;
