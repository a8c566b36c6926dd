//! Simulated path ensembles.

use sim_core::{SimResult, SimulationError};

/// Dense `n_paths × n_steps` matrix of simulated capital plus its time grid.
///
/// # Invariants
///
/// Ensembles produced by the driver have column 0 equal to the initial
/// capital and every value at or above
/// [`CAPITAL_FLOOR`](crate::paths::CAPITAL_FLOOR). Ensembles built from
/// external data with [`PathEnsemble::from_rows`] are only checked for shape.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathEnsemble {
    /// Path values (row-major)
    paths: Vec<f64>,
    /// Time grid in years
    time_grid: Vec<f64>,
    n_paths: usize,
    n_steps: usize,
}

impl PathEnsemble {
    pub(crate) fn from_parts(paths: Vec<f64>, time_grid: Vec<f64>, n_paths: usize) -> Self {
        let n_steps = time_grid.len();
        debug_assert_eq!(paths.len(), n_paths * n_steps);
        Self {
            paths,
            time_grid,
            n_paths,
            n_steps,
        }
    }

    /// Build an ensemble from externally supplied rows.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if there are no paths or fewer than two time points
    /// - `ShapeMismatch` if a row length differs from the time grid length
    pub fn from_rows(rows: &[Vec<f64>], time_grid: Vec<f64>) -> SimResult<Self> {
        let n_steps = time_grid.len();
        if rows.is_empty() {
            return Err(SimulationError::invalid_input("path ensemble has no paths"));
        }
        if n_steps < 2 {
            return Err(SimulationError::invalid_input(
                "time grid needs at least two points",
            ));
        }
        let mut paths = Vec::with_capacity(rows.len() * n_steps);
        for row in rows {
            if row.len() != n_steps {
                return Err(SimulationError::shape_mismatch("path length", n_steps, row.len()));
            }
            paths.extend_from_slice(row);
        }
        Ok(Self::from_parts(paths, time_grid, rows.len()))
    }

    /// Number of paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Number of time points per path.
    #[inline]
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Time grid in years.
    #[inline]
    pub fn time_grid(&self) -> &[f64] {
        &self.time_grid
    }

    /// Final time point.
    #[inline]
    pub fn horizon(&self) -> f64 {
        self.time_grid[self.n_steps - 1]
    }

    /// Row-major path matrix.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.paths
    }

    /// Single path.
    #[inline]
    pub fn path(&self, i: usize) -> &[f64] {
        &self.paths[i * self.n_steps..(i + 1) * self.n_steps]
    }

    /// Iterator over paths.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.paths.chunks_exact(self.n_steps)
    }

    /// Value of path `i` at time index `t`.
    #[inline]
    pub fn value(&self, i: usize, t: usize) -> f64 {
        self.paths[i * self.n_steps + t]
    }

    /// Cross-section of all paths at time index `t`.
    pub fn column(&self, t: usize) -> Vec<f64> {
        self.rows().map(|row| row[t]).collect()
    }

    /// Terminal values `X_T` of every path.
    pub fn terminal_values(&self) -> Vec<f64> {
        self.column(self.n_steps - 1)
    }

    /// Time indices `0, stride, 2·stride, …` below `n_steps`.
    pub fn strided_indices(&self, stride: usize) -> Vec<usize> {
        (0..self.n_steps).step_by(stride.max(1)).collect()
    }

    /// Copy into nested rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(|row| row.to_vec()).collect()
    }

    /// Consume the ensemble, returning the row-major matrix and time grid.
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.paths, self.time_grid)
    }
}

/// Per-asset index trajectories, each starting at 1.0.
///
/// Layout is `[asset][path][step]`, row-major.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssetTrajectories {
    data: Vec<f64>,
    n_assets: usize,
    n_paths: usize,
    n_steps: usize,
}

impl AssetTrajectories {
    pub(crate) fn new(n_assets: usize, n_paths: usize, n_steps: usize) -> Self {
        Self {
            data: vec![0.0; n_assets * n_paths * n_steps],
            n_assets,
            n_paths,
            n_steps,
        }
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.n_assets
    }

    /// Number of paths per asset.
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Number of time points per path.
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    fn offset(&self, asset: usize, path: usize) -> usize {
        (asset * self.n_paths + path) * self.n_steps
    }

    /// Index path of `asset` in simulation `path`.
    pub fn path(&self, asset: usize, path: usize) -> &[f64] {
        let start = self.offset(asset, path);
        &self.data[start..start + self.n_steps]
    }

    pub(crate) fn path_mut(&mut self, asset: usize, path: usize) -> &mut [f64] {
        let start = self.offset(asset, path);
        let n_steps = self.n_steps;
        &mut self.data[start..start + n_steps]
    }

    /// Terminal index values of `asset` across paths.
    pub fn terminal_values(&self, asset: usize) -> Vec<f64> {
        (0..self.n_paths)
            .map(|p| self.path(asset, p)[self.n_steps - 1])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PathEnsemble {
        PathEnsemble::from_rows(
            &[vec![1.0, 1.1, 1.2], vec![1.0, 0.9, 0.8]],
            vec![0.0, 0.5, 1.0],
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let e = sample();
        assert_eq!(e.n_paths(), 2);
        assert_eq!(e.n_steps(), 3);
        assert_eq!(e.horizon(), 1.0);
        assert_eq!(e.path(1), &[1.0, 0.9, 0.8]);
        assert_eq!(e.value(0, 2), 1.2);
        assert_eq!(e.column(1), vec![1.1, 0.9]);
        assert_eq!(e.terminal_values(), vec![1.2, 0.8]);
        assert_eq!(e.rows().len(), 2);
        assert_eq!(e.to_rows()[0], vec![1.0, 1.1, 1.2]);
    }

    #[test]
    fn test_strided_indices() {
        let e = sample();
        assert_eq!(e.strided_indices(1), vec![0, 1, 2]);
        assert_eq!(e.strided_indices(2), vec![0, 2]);
        assert_eq!(e.strided_indices(0), vec![0, 1, 2]);
    }

    #[test]
    fn test_from_rows_shape_errors() {
        assert!(PathEnsemble::from_rows(&[], vec![0.0, 1.0]).is_err());
        assert!(PathEnsemble::from_rows(&[vec![1.0]], vec![0.0]).is_err());
        let err = PathEnsemble::from_rows(&[vec![1.0, 2.0], vec![1.0]], vec![0.0, 1.0]).unwrap_err();
        assert_eq!(err, SimulationError::shape_mismatch("path length", 2, 1));
    }

    #[test]
    fn test_asset_trajectories_layout() {
        let mut a = AssetTrajectories::new(2, 3, 4);
        a.path_mut(1, 2).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a.path(1, 2), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a.path(0, 2), &[0.0; 4]);
        assert_eq!(a.terminal_values(1), vec![0.0, 0.0, 4.0]);
    }
}
