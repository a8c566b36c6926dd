//! # sim_core: Foundation for Portfolio Path Simulation
//!
//! ## Layer 1 (Foundation) Role
//!
//! sim_core is the bottom layer of the simulation workspace, providing:
//! - Error types: `SimulationError`, `ErrorClass` (`error`)
//! - Parameter types: `AssetParameters`, `PortfolioWeights` (`types`)
//! - Covariance algebra with Cholesky repair (`math::covariance`)
//! - NaN-safe descriptive statistics (`math::stats`)
//! - Run context with seed, cancellation and an optional cache (`context`, `cache`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other sim_* crates, with minimal external dependencies:
//! - nalgebra: Symmetric eigen decomposition for covariance repair
//! - thiserror: Error derivation
//! - tracing: Repair diagnostics
//! - serde: Serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use sim_core::types::{AssetParameters, PortfolioWeights};
//!
//! let params = AssetParameters::from_rows(
//!     vec![0.10, 0.08],
//!     &[vec![0.04, 0.01], vec![0.01, 0.03]],
//! ).unwrap();
//! let weights = PortfolioWeights::new(vec![0.6, 0.4]).unwrap();
//!
//! params.check_weights(&weights).unwrap();
//! assert_eq!(params.n_assets(), 2);
//! assert!((weights.sum() - 1.0).abs() < 1e-12);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for parameter and covariance types

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod cache;
pub mod context;
pub mod error;
pub mod math;
pub mod types;

pub use error::{ErrorClass, SimResult, SimulationError};
