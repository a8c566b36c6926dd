//! # Random Number Generation
//!
//! Seeded pseudo-random number generation for the simulation engine.
//!
//! ## Reproducibility
//!
//! - `rand` 0.8 `StdRng` seeded through `seed_from_u64`
//! - Standard normals from `rand_distr::StandardNormal` (Ziggurat)
//! - Batch fills consume the stream in slice order, so a shock matrix filled
//!   row by row is identical to one filled in a single call
//!
//! ## Usage Example
//!
//! ```rust
//! use sim_engine::rng::SimRng;
//!
//! let mut rng = SimRng::from_seed(12345);
//! let mut shocks = vec![0.0; 1000];
//! rng.fill_normal(&mut shocks);
//! ```

mod prng;

pub use prng::SimRng;
