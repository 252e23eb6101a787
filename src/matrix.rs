//! Dense upper-triangular QUBO storage.

use crate::error::SolveError;
use rand::Rng;

// ============================================================================
// QuboMatrix
// ============================================================================

/// An `N x N` QUBO cost matrix stored densely in row-major order.
///
/// Representation:
/// - `(i, i)` is the linear bias of variable `i`.
/// - `(i, j)` with `i < j` is the coupling between `i` and `j`.
/// - Entries below the diagonal are stored but never read by the solver.
///
/// The solver always maximizes. Minimization problems are negated before they
/// reach it (see [`QuboMatrix::negated`]).
#[derive(Clone, Debug, PartialEq)]
pub struct QuboMatrix {
    n: usize,
    data: Vec<f64>,
}

impl QuboMatrix {
    /// Creates an all-zero matrix for `n` variables.
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    /// Builds a matrix from its rows.
    ///
    /// # Errors
    /// Returns an error if there are no rows or any row length differs from the row count.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, SolveError> {
        let n = rows.len();
        if n == 0 {
            return Err(SolveError::EmptyProblem);
        }
        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(SolveError::NonSquareMatrix {
                    row: i,
                    expected: n,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { n, data })
    }

    /// Builds a matrix from a list of `(i, j, value)` entries.
    ///
    /// Entries with `i > j` are mirrored into the upper triangle. Repeated entries
    /// overwrite earlier ones.
    ///
    /// # Panics
    /// Panics if an index is out of range.
    pub fn from_entries(n: usize, entries: &[(usize, usize, f64)]) -> Self {
        let mut m = Self::zeros(n);
        for &(i, j, value) in entries {
            m.set(i.min(j), i.max(j), value);
        }
        m
    }

    /// Random upper-triangular matrix with entries uniform in `[-scale, scale]`.
    ///
    /// Each coupling is non-zero with probability `density`; the diagonal is always filled.
    pub fn random<R: Rng>(rng: &mut R, n: usize, density: f64, scale: f64) -> Self {
        debug_assert!((0.0..=1.0).contains(&density), "density must be in [0, 1]");
        let mut m = Self::zeros(n);
        for i in 0..n {
            m.set(i, i, rng.random_range(-scale..=scale));
            for j in (i + 1)..n {
                if rng.random_bool(density) {
                    m.set(i, j, rng.random_range(-scale..=scale));
                }
            }
        }
        m
    }

    /// Number of variables.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.n
    }

    /// Returns entry `(i, j)` as stored.
    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        debug_assert!(i < self.n && j < self.n);
        self.data[i * self.n + j]
    }

    /// Sets entry `(i, j)`.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        debug_assert!(i < self.n && j < self.n);
        self.data[i * self.n + j] = value;
    }

    /// Adds `value` to entry `(i, j)`.
    #[inline]
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        debug_assert!(i < self.n && j < self.n);
        self.data[i * self.n + j] += value;
    }

    /// Coupling between `i` and `j` regardless of argument order, `Q[min][max]`.
    #[inline(always)]
    pub fn pair(&self, i: usize, j: usize) -> f64 {
        if i <= j { self.get(i, j) } else { self.get(j, i) }
    }

    /// Row `i` as a slice (columns `0..N`).
    #[inline(always)]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Linear bias of variable `i`.
    #[inline(always)]
    pub fn diagonal(&self, i: usize) -> f64 {
        self.get(i, i)
    }

    /// Returns a copy with every entry negated (turns a minimization into a maximization).
    pub fn negated(&self) -> Self {
        Self {
            n: self.n,
            data: self.data.iter().map(|v| -v).collect(),
        }
    }

    /// Number of non-zero linear terms and non-zero couplings in the upper triangle.
    pub fn nonzero_counts(&self) -> (usize, usize) {
        let mut nodes = 0;
        let mut couplers = 0;
        for i in 0..self.n {
            if self.get(i, i) != 0.0 {
                nodes += 1;
            }
            couplers += self.row(i)[i + 1..].iter().filter(|v| **v != 0.0).count();
        }
        (nodes, couplers)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn from_rows_rejects_non_square() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert_eq!(
            QuboMatrix::from_rows(&rows),
            Err(SolveError::NonSquareMatrix {
                row: 1,
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn from_rows_rejects_empty() {
        assert_eq!(QuboMatrix::from_rows(&[]), Err(SolveError::EmptyProblem));
    }

    #[test]
    fn pair_is_order_independent() {
        let m = QuboMatrix::from_entries(3, &[(0, 0, 1.0), (2, 1, -4.0), (0, 2, 5.0)]);
        assert_eq!(m.pair(1, 2), -4.0);
        assert_eq!(m.pair(2, 1), -4.0);
        assert_eq!(m.pair(2, 0), 5.0);
        assert_eq!(m.get(2, 1), 0.0, "lower triangle stays empty");
    }

    #[test]
    fn negated_flips_every_entry() {
        let m = QuboMatrix::from_entries(2, &[(0, 0, 2.0), (0, 1, -3.0)]);
        let neg = m.negated();
        assert_eq!(neg.get(0, 0), -2.0);
        assert_eq!(neg.get(0, 1), 3.0);
        assert_eq!(neg.negated(), m);
    }

    #[test]
    fn nonzero_counts_ignore_lower_triangle() {
        let mut m = QuboMatrix::from_entries(3, &[(0, 0, 1.0), (1, 1, 0.0), (0, 1, 2.0), (1, 2, 3.0)]);
        m.set(2, 0, 9.0);
        assert_eq!(m.nonzero_counts(), (1, 2));
    }

    #[test]
    fn random_matrix_is_upper_triangular() {
        let mut rng = SmallRng::seed_from_u64(7);
        let m = QuboMatrix::random(&mut rng, 12, 0.5, 1.0);
        for i in 0..12 {
            for j in 0..i {
                assert_eq!(m.get(i, j), 0.0);
            }
        }
    }
}
