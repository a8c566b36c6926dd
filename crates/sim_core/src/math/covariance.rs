//! Covariance matrices with Cholesky factorisation and eigenvalue repair.
//!
//! This module provides infrastructure for correlating asset shocks using the
//! Cholesky factor of a covariance matrix.
//!
//! ## Mathematical Background
//!
//! Given `n` independent standard normal variables `Z`, correlated shocks are
//! obtained as
//!
//! ```text
//! W = L * Z,    Σ = L * Lᵀ
//! ```
//!
//! ## Factorisation Pipeline
//!
//! [`CovarianceMatrix::factorise`] composes three attempts and returns a tagged
//! [`Factorisation`] describing which one succeeded:
//!
//! 1. PSD-tolerant Cholesky on the input matrix
//! 2. Eigenvalue floor: negative eigenvalues replaced by [`EIGEN_FLOOR`]
//! 3. Diagonal shift by `|λ_min| × 1.1`
//!
//! If all three fail the error is [`SimulationError::DegenerateCovariance`].
//! A factor containing NaN is never returned.
//!
//! ## Usage
//!
//! ```
//! use sim_core::math::covariance::CovarianceMatrix;
//!
//! let cov = CovarianceMatrix::from_rows(&[
//!     vec![0.04, 0.01],
//!     vec![0.01, 0.03],
//! ]).unwrap();
//!
//! let factorisation = cov.factorise().unwrap();
//! assert!(!factorisation.is_repaired());
//!
//! let z = [0.5_f64, -0.8];
//! let w = factorisation.factor().transform(&z);
//! assert_eq!(w.len(), 2);
//! ```

use nalgebra::{DMatrix, Dyn, SymmetricEigen};
use tracing::warn;

use crate::error::{SimResult, SimulationError};

/// Replacement value for negative eigenvalues during repair.
pub const EIGEN_FLOOR: f64 = 1e-10;

/// Multiplier applied to `|λ_min|` for the diagonal-shift fallback.
pub const DIAGONAL_SHIFT_FACTOR: f64 = 1.1;

/// Relative tolerance for symmetry checks.
const SYMMETRY_TOL: f64 = 1e-10;

/// Symmetric covariance matrix stored in row-major order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CovarianceMatrix {
    /// Matrix elements (row-major)
    data: Vec<f64>,
    /// Matrix dimension
    dim: usize,
}

impl CovarianceMatrix {
    /// Create a covariance matrix from a flat row-major slice.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` if `data.len() != dim * dim`
    /// - `InvalidInput` if the matrix is empty, contains non-finite values,
    ///   has a negative diagonal entry or is not symmetric
    pub fn new(data: &[f64], dim: usize) -> SimResult<Self> {
        if dim == 0 {
            return Err(SimulationError::invalid_input(
                "covariance matrix must have at least one asset",
            ));
        }
        if data.len() != dim * dim {
            return Err(SimulationError::shape_mismatch(
                "sigma elements",
                dim * dim,
                data.len(),
            ));
        }

        let matrix = Self {
            data: data.to_vec(),
            dim,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Create a covariance matrix from nested rows.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if any row length differs from the row count, plus the
    /// conditions listed on [`CovarianceMatrix::new`].
    pub fn from_rows(rows: &[Vec<f64>]) -> SimResult<Self> {
        let dim = rows.len();
        let mut data = Vec::with_capacity(dim * dim);
        for row in rows {
            if row.len() != dim {
                return Err(SimulationError::shape_mismatch("sigma columns", dim, row.len()));
            }
            data.extend_from_slice(row);
        }
        Self::new(&data, dim)
    }

    /// Create a diagonal covariance matrix from variances.
    pub fn diagonal(variances: &[f64]) -> SimResult<Self> {
        let dim = variances.len();
        let mut data = vec![0.0; dim * dim];
        for (i, &v) in variances.iter().enumerate() {
            data[i * dim + i] = v;
        }
        Self::new(&data, dim)
    }

    fn validate(&self) -> SimResult<()> {
        let n = self.dim;
        if let Some(pos) = self.data.iter().position(|v| !v.is_finite()) {
            return Err(SimulationError::invalid_input(format!(
                "covariance entry ({}, {}) is not finite",
                pos / n,
                pos % n
            )));
        }
        for i in 0..n {
            let var = self.get(i, i);
            if var < 0.0 {
                return Err(SimulationError::invalid_input(format!(
                    "variance of asset {} is negative: {}",
                    i, var
                )));
            }
            for j in (i + 1)..n {
                let a = self.get(i, j);
                let b = self.get(j, i);
                let scale = 1.0_f64.max(a.abs() + b.abs());
                if (a - b).abs() > SYMMETRY_TOL * scale {
                    return Err(SimulationError::invalid_input(format!(
                        "covariance is not symmetric at ({}, {}): {} vs {}",
                        i, j, a, b
                    )));
                }
            }
        }
        Ok(())
    }

    /// Get matrix dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Get element at (i, j).
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }

    /// Variance of asset `i`.
    #[inline]
    pub fn variance(&self, i: usize) -> f64 {
        self.get(i, i)
    }

    /// Row-major element slice.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copy into nested rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.dim).map(|row| row.to_vec()).collect()
    }

    /// Implied correlation between assets `i` and `j`.
    ///
    /// Returns 0.0 when either variance is zero.
    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        let denom = (self.variance(i) * self.variance(j)).sqrt();
        if denom > 0.0 {
            self.get(i, j) / denom
        } else {
            0.0
        }
    }

    /// Quadratic form `wᵀ Σ w`.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if `w.len() != dim`.
    pub fn quadratic_form(&self, w: &[f64]) -> SimResult<f64> {
        if w.len() != self.dim {
            return Err(SimulationError::shape_mismatch("weights", self.dim, w.len()));
        }
        let mut total = 0.0;
        for (i, row) in self.data.chunks(self.dim).enumerate() {
            let row_dot: f64 = row.iter().zip(w).map(|(s, wj)| s * wj).sum();
            total += w[i] * row_dot;
        }
        Ok(total)
    }

    /// Uniformly scale every element by `k` (variance inflation).
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `k` is negative or not finite.
    pub fn scaled(&self, k: f64) -> SimResult<Self> {
        if !k.is_finite() || k < 0.0 {
            return Err(SimulationError::invalid_input(format!(
                "covariance multiplier must be finite and non-negative, got {}",
                k
            )));
        }
        Ok(Self {
            data: self.data.iter().map(|v| v * k).collect(),
            dim: self.dim,
        })
    }

    /// Rebuild off-diagonal entries with a constant pairwise correlation.
    ///
    /// Variances are preserved; `σ_ij = ρ · sqrt(σ_ii σ_jj)` for `i != j`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `rho` lies outside `[-1, 1]`.
    pub fn with_constant_correlation(&self, rho: f64) -> SimResult<Self> {
        if !(-1.0..=1.0).contains(&rho) {
            return Err(SimulationError::invalid_input(format!(
                "target correlation must lie in [-1, 1], got {}",
                rho
            )));
        }
        let n = self.dim;
        let mut data = self.data.clone();
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    data[i * n + j] = rho * (self.variance(i) * self.variance(j)).sqrt();
                }
            }
        }
        Ok(Self { data, dim: n })
    }

    /// Minimum eigenvalue of the matrix.
    pub fn min_eigenvalue(&self) -> f64 {
        let eig = SymmetricEigen::new(self.to_dmatrix());
        eig.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Compute the Cholesky factor, repairing the matrix if necessary.
    ///
    /// # Errors
    ///
    /// `DegenerateCovariance` if neither repair produces a finite factor.
    pub fn factorise(&self) -> SimResult<Factorisation> {
        if let Some(factor) = self.cholesky() {
            return Ok(Factorisation::Exact(factor));
        }

        let eig = SymmetricEigen::new(self.to_dmatrix());
        let min_eigenvalue = eig.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);

        let attempts = [
            (RepairMethod::EigenvalueFloor, self.eigenvalue_floored(&eig)),
            (RepairMethod::DiagonalShift, self.diagonal_shifted(min_eigenvalue)),
        ];

        for (method, candidate) in attempts {
            let Some(candidate) = candidate else { continue };
            if let Some(factor) = candidate.cholesky() {
                warn!(
                    dim = self.dim,
                    min_eigenvalue,
                    method = ?method,
                    "Covariance matrix not positive semi-definite; repaired"
                );
                return Ok(Factorisation::Repaired {
                    factor,
                    covariance: candidate,
                    method,
                    min_eigenvalue,
                });
            }
        }

        Err(SimulationError::DegenerateCovariance(format!(
            "repair failed for {}x{} matrix (min eigenvalue {:e})",
            self.dim, self.dim, min_eigenvalue
        )))
    }

    /// PSD-tolerant Cholesky decomposition.
    ///
    /// Returns `None` when a pivot is materially negative or the factor is not
    /// finite. Zero pivots (singular but PSD matrices) yield zero columns.
    pub fn cholesky(&self) -> Option<CholeskyFactor> {
        let n = self.dim;
        let scale = (0..n).map(|i| self.variance(i)).fold(1.0_f64, f64::max);
        let pivot_tol = 1e-12 * scale;
        let residual_tol = 1e-8 * scale;
        let mut lower = vec![0.0; n * n];

        for i in 0..n {
            for j in 0..=i {
                let mut sum = self.get(i, j);
                for k in 0..j {
                    sum -= lower[i * n + k] * lower[j * n + k];
                }

                if i == j {
                    if sum < -pivot_tol {
                        return None;
                    }
                    lower[i * n + i] = sum.max(0.0).sqrt();
                } else {
                    let l_jj = lower[j * n + j];
                    if l_jj > pivot_tol.sqrt() {
                        lower[i * n + j] = sum / l_jj;
                    } else if sum.abs() > residual_tol {
                        // zero pivot with non-zero coupling: not PSD
                        return None;
                    }
                }
            }
        }

        if lower.iter().all(|v| v.is_finite()) {
            Some(CholeskyFactor { data: lower, dim: n })
        } else {
            None
        }
    }

    fn eigenvalue_floored(&self, eig: &SymmetricEigen<f64, Dyn>) -> Option<Self> {
        let floored = eig.eigenvalues.map(|v| v.max(EIGEN_FLOOR));
        let rebuilt = &eig.eigenvectors * DMatrix::from_diagonal(&floored) * eig.eigenvectors.transpose();
        Self::from_dmatrix(&symmetrize(&rebuilt))
    }

    fn diagonal_shifted(&self, min_eigenvalue: f64) -> Option<Self> {
        if !min_eigenvalue.is_finite() {
            return None;
        }
        let shift = min_eigenvalue.abs() * DIAGONAL_SHIFT_FACTOR;
        let mut data = self.data.clone();
        for i in 0..self.dim {
            data[i * self.dim + i] += shift;
        }
        Some(Self {
            data,
            dim: self.dim,
        })
    }

    fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.dim, self.dim, &self.data)
    }

    fn from_dmatrix(m: &DMatrix<f64>) -> Option<Self> {
        let n = m.nrows();
        let mut data = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                data.push(m[(i, j)]);
            }
        }
        if data.iter().all(|v| v.is_finite()) {
            Some(Self { data, dim: n })
        } else {
            None
        }
    }
}

fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    0.5 * (m + m.transpose())
}

/// Repair strategy that produced a usable factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepairMethod {
    /// Negative eigenvalues replaced by [`EIGEN_FLOOR`].
    EigenvalueFloor,
    /// Diagonal shifted by `|λ_min| × 1.1`.
    DiagonalShift,
}

/// Outcome of [`CovarianceMatrix::factorise`].
#[derive(Clone, Debug)]
pub enum Factorisation {
    /// The input matrix factorised directly.
    Exact(CholeskyFactor),
    /// The input had to be repaired first.
    Repaired {
        /// Factor of the repaired matrix
        factor: CholeskyFactor,
        /// The repaired covariance matrix
        covariance: CovarianceMatrix,
        /// Which repair succeeded
        method: RepairMethod,
        /// Minimum eigenvalue of the original input
        min_eigenvalue: f64,
    },
}

impl Factorisation {
    /// The lower-triangular factor.
    pub fn factor(&self) -> &CholeskyFactor {
        match self {
            Self::Exact(factor) => factor,
            Self::Repaired { factor, .. } => factor,
        }
    }

    /// Whether a repair was needed.
    pub fn is_repaired(&self) -> bool {
        matches!(self, Self::Repaired { .. })
    }

    /// The covariance matrix the factor actually represents.
    pub fn effective_covariance<'a>(&'a self, original: &'a CovarianceMatrix) -> &'a CovarianceMatrix {
        match self {
            Self::Exact(_) => original,
            Self::Repaired { covariance, .. } => covariance,
        }
    }
}

/// Lower triangular Cholesky factor of a covariance matrix.
///
/// Used to transform independent standard normals into correlated shocks.
#[derive(Clone, Debug, PartialEq)]
pub struct CholeskyFactor {
    /// Lower triangular matrix elements (row-major)
    data: Vec<f64>,
    /// Matrix dimension
    dim: usize,
}

impl CholeskyFactor {
    /// Get matrix dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Get element at (i, j). Zero above the diagonal.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if j > i {
            0.0
        } else {
            self.data[i * self.dim + j]
        }
    }

    /// Transform independent normals to correlated shocks (`L z`).
    pub fn transform(&self, z: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.dim];
        self.transform_into(z, &mut out);
        out
    }

    /// Transform into a caller-provided buffer.
    pub fn transform_into(&self, z: &[f64], out: &mut [f64]) {
        debug_assert_eq!(z.len(), self.dim);
        debug_assert_eq!(out.len(), self.dim);
        for (i, slot) in out.iter_mut().enumerate() {
            let row = &self.data[i * self.dim..i * self.dim + i + 1];
            *slot = row.iter().zip(z).map(|(l, zj)| l * zj).sum();
        }
    }

    /// Reconstruct `L Lᵀ`.
    pub fn reconstruct(&self) -> Vec<f64> {
        let n = self.dim;
        let mut out = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                out[i * n + j] = (0..=i.min(j)).map(|k| self.get(i, k) * self.get(j, k)).sum();
            }
        }
        out
    }
}
