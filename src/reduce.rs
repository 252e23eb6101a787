//! Subproblem extraction.
//!
//! [`reduce`] projects a sorted subset of variables into a smaller QUBO. Every
//! coupling to a variable outside the subset is folded into the diagonal using
//! that variable's current value, so optimizing the subproblem alone is the same
//! as optimizing those variables with the rest held fixed.

use crate::energy::simple_evaluate;
use crate::matrix::QuboMatrix;

/// An extracted subproblem together with the current values of its variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Subproblem {
    /// The clamped `m x m` matrix.
    pub qubo: QuboMatrix,
    /// Current values of the extracted variables, in index order.
    pub solution: Vec<u8>,
}

/// Extracts the variables at `indices` from `qubo`, clamped to `solution`.
///
/// `indices` must be sorted ascending without repeats.
pub fn reduce(indices: &[usize], qubo: &QuboMatrix, solution: &[u8]) -> Subproblem {
    let n = qubo.size();
    let m = indices.len();
    debug_assert_eq!(solution.len(), n);
    debug_assert!(indices.windows(2).all(|w| w[0] < w[1]), "indices must be sorted and unique");
    debug_assert!(indices.last().is_none_or(|&i| i < n));

    let mut extracted = vec![false; n];
    for &i in indices {
        extracted[i] = true;
    }

    let mut sub = QuboMatrix::zeros(m);
    for (a, &i) in indices.iter().enumerate() {
        for (b, &j) in indices.iter().enumerate().skip(a) {
            sub.set(a, b, qubo.get(i, j));
        }
    }

    for (a, &i) in indices.iter().enumerate() {
        let mut clamp = 0.0;
        for j in 0..n {
            if !extracted[j] && solution[j] == 1 {
                clamp += qubo.pair(i, j);
            }
        }
        sub.add(a, a, clamp);
    }

    Subproblem {
        qubo: sub,
        solution: indices.iter().map(|&i| solution[i]).collect(),
    }
}

/// Energy of `solution` with every variable in `indices` cleared.
///
/// This is the constant part left over by [`reduce`]: the full energy equals the
/// subproblem energy plus this value for any setting of the extracted variables.
pub fn fixed_energy(indices: &[usize], qubo: &QuboMatrix, solution: &[u8]) -> f64 {
    let mut rest = solution.to_vec();
    for &i in indices {
        rest[i] = 0;
    }
    simple_evaluate(qubo, &rest)
}
