//! Numerical building blocks.
//!
//! - `covariance`: Covariance matrices, Cholesky factorisation and repair
//! - `stats`: NaN-safe descriptive statistics and quantiles

pub mod covariance;
pub mod stats;
