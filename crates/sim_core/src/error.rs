//! Error types for structured error handling.
//!
//! This module provides:
//! - `SimulationError`: Errors from simulation, analytics and scenario runs
//! - `ErrorClass`: Coarse classification so callers can separate bad input
//!   from bad numerics from interrupted work

use thiserror::Error;

/// Coarse classification of a [`SimulationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The caller supplied inconsistent or invalid inputs.
    Input,
    /// The inputs were accepted but the numerics degenerated.
    Numeric,
    /// The run was stopped before completion.
    Interrupted,
}

/// Categorised simulation errors.
///
/// # Variants
/// - `ShapeMismatch`: Dimension mismatch between `mu`, `sigma` and `weights`
/// - `InvalidInput`: Non-finite values or out-of-range parameters
/// - `DegenerateCovariance`: Covariance could not be factorised even after repair
/// - `NumericDivergence`: NaN/Inf in final aggregate statistics
/// - `Cancelled`: Cooperative cancellation observed between path batches
///
/// # Examples
/// ```
/// use sim_core::error::{ErrorClass, SimulationError};
///
/// let err = SimulationError::shape_mismatch("weights", 3, 2);
/// assert_eq!(err.class(), ErrorClass::Input);
/// assert_eq!(format!("{}", err), "Shape mismatch for weights: expected 3, got 2");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Dimension mismatch between inputs.
    #[error("Shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Name of the offending input
        what: &'static str,
        /// Expected length or dimension
        expected: usize,
        /// Length or dimension actually supplied
        got: usize,
    },

    /// Invalid input data or parameters.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Covariance matrix could not be repaired into a usable factor.
    #[error("Degenerate covariance: {0}")]
    DegenerateCovariance(String),

    /// NaN or infinite value in final statistics.
    #[error("Numeric divergence: {0}")]
    NumericDivergence(String),

    /// Run stopped by a cancellation flag.
    #[error("Simulation cancelled")]
    Cancelled,
}

impl SimulationError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(what: &'static str, expected: usize, got: usize) -> Self {
        Self::ShapeMismatch {
            what,
            expected,
            got,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a numeric divergence error.
    pub fn divergence(msg: impl Into<String>) -> Self {
        Self::NumericDivergence(msg.into())
    }

    /// Returns the failure class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ShapeMismatch { .. } | Self::InvalidInput(_) => ErrorClass::Input,
            Self::DegenerateCovariance(_) | Self::NumericDivergence(_) => ErrorClass::Numeric,
            Self::Cancelled => ErrorClass::Interrupted,
        }
    }
}

/// Result alias used throughout the simulation crates.
pub type SimResult<T> = Result<T, SimulationError>;
