//! Core parameter types for portfolio simulation.
//!
//! This module provides:
//! - `AssetParameters`: Expected returns and covariance of the asset universe
//! - `PortfolioWeights`: Target weights held under continuous rebalancing

mod params;

pub use params::{AssetParameters, PortfolioWeights};
