//! Aggregation errors.

use thiserror::Error;

/// Errors raised when configuring the aggregation engine.
///
/// Degenerate data never produces an error; only invalid parameters do.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    /// A Beta shape parameter is not strictly positive and finite.
    #[error("Invalid Beta shape for {direction}: alpha={alpha}, beta={beta} ({reason})")]
    InvalidBetaShape {
        /// Side the policy applies to.
        direction: &'static str,
        /// Alpha shape parameter.
        alpha: f64,
        /// Beta shape parameter.
        beta: f64,
        /// Underlying reason reported by the distribution.
        reason: String,
    },
}
