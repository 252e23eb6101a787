//! Energy evaluation with incremental flip-cost maintenance.
//!
//! `flip_cost[i]` is the exact energy change from flipping bit `i` of the current
//! solution. [`evaluate`] builds it from scratch in \(O(N^2)\); [`evaluate_1bit`]
//! patches it in \(O(N)\) after a single flip.

use crate::matrix::QuboMatrix;
use rayon::prelude::*;

/// Problems at least this large evaluate rows in parallel.
const PARALLEL_EVALUATE_MIN: usize = 512;

/// Energy of `solution` without touching any flip-cost state.
pub fn simple_evaluate(qubo: &QuboMatrix, solution: &[u8]) -> f64 {
    debug_assert_eq!(solution.len(), qubo.size());
    let mut result = 0.0;
    for i in 0..qubo.size() {
        if solution[i] == 1 {
            result += row_sum(qubo, solution, i) + qubo.diagonal(i);
        }
    }
    result
}

/// Evaluates `solution` and rebuilds `flip_cost` from scratch.
///
/// Returns the energy. Must be called before the first [`evaluate_1bit`] on a solution.
pub fn evaluate(qubo: &QuboMatrix, solution: &[u8], flip_cost: &mut [f64]) -> f64 {
    let n = qubo.size();
    debug_assert_eq!(solution.len(), n);
    debug_assert_eq!(flip_cost.len(), n);

    if n >= PARALLEL_EVALUATE_MIN {
        let rows: Vec<(f64, f64)> = (0..n)
            .into_par_iter()
            .map(|i| row_terms(qubo, solution, i))
            .collect();
        // Sequential reduction keeps the sum identical to the serial path.
        let mut result = 0.0;
        for (i, (energy_term, cost)) in rows.into_iter().enumerate() {
            result += energy_term;
            flip_cost[i] = cost;
        }
        return result;
    }

    let mut result = 0.0;
    for i in 0..n {
        let (energy_term, cost) = row_terms(qubo, solution, i);
        result += energy_term;
        flip_cost[i] = cost;
    }
    result
}

/// Flips `bit`, patches every flip cost, and returns the new energy.
///
/// The flipped bit's own cost is recomputed from the updated solution rather than
/// negated, so it never accumulates rounding drift.
pub fn evaluate_1bit(
    qubo: &QuboMatrix,
    energy: f64,
    bit: usize,
    solution: &mut [u8],
    flip_cost: &mut [f64],
) -> f64 {
    let n = qubo.size();
    debug_assert!(bit < n);
    debug_assert_eq!(solution.len(), n);
    debug_assert_eq!(flip_cost.len(), n);

    let result = energy + flip_cost[bit];
    solution[bit] ^= 1;

    // Turning `bit` on raises every neighbour's contribution by Q[k][bit];
    // a set neighbour loses that much when flipped, an unset one gains it.
    let direction = if solution[bit] == 1 { 1.0 } else { -1.0 };
    for k in 0..bit {
        let q = qubo.get(k, bit);
        if solution[k] == 1 {
            flip_cost[k] -= direction * q;
        } else {
            flip_cost[k] += direction * q;
        }
    }
    let row = qubo.row(bit);
    for k in (bit + 1)..n {
        let q = row[k];
        if solution[k] == 1 {
            flip_cost[k] -= direction * q;
        } else {
            flip_cost[k] += direction * q;
        }
    }

    flip_cost[bit] = flip_cost_of(qubo, solution, bit);
    result
}

/// Exact flip cost of `bit` computed from scratch in \(O(N)\).
pub fn flip_cost_of(qubo: &QuboMatrix, solution: &[u8], bit: usize) -> f64 {
    row_terms(qubo, solution, bit).1
}

/// `Σ_{j>i} Q[i][j]·x[j]`
#[inline]
fn row_sum(qubo: &QuboMatrix, solution: &[u8], i: usize) -> f64 {
    let row = qubo.row(i);
    let mut sum = 0.0;
    for j in (i + 1)..qubo.size() {
        if solution[j] == 1 {
            sum += row[j];
        }
    }
    sum
}

/// `Σ_{j<i} Q[j][i]·x[j]`
#[inline]
fn col_sum(qubo: &QuboMatrix, solution: &[u8], i: usize) -> f64 {
    let mut sum = 0.0;
    for j in 0..i {
        if solution[j] == 1 {
            sum += qubo.get(j, i);
        }
    }
    sum
}

/// Returns `(energy contribution, flip cost)` of variable `i`.
#[inline]
fn row_terms(qubo: &QuboMatrix, solution: &[u8], i: usize) -> (f64, f64) {
    let row = row_sum(qubo, solution, i);
    let contrib = row + col_sum(qubo, solution, i) + qubo.diagonal(i);
    if solution[i] == 1 {
        (row + qubo.diagonal(i), -contrib)
    } else {
        (0.0, contrib)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::random_solution;
    use approx::assert_abs_diff_eq;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn assert_costs_match(qubo: &QuboMatrix, solution: &[u8], flip_cost: &[f64]) {
        let mut fresh = vec![0.0; qubo.size()];
        evaluate(qubo, solution, &mut fresh);
        for (a, b) in flip_cost.iter().zip(&fresh) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-7);
        }
    }

    #[test]
    fn two_variable_energy_by_hand() {
        // E(a, b) = 2a + 2ab + 3b
        let q = QuboMatrix::from_entries(2, &[(0, 0, 2.0), (0, 1, 2.0), (1, 1, 3.0)]);
        let mut cost = vec![0.0; 2];
        assert_eq!(evaluate(&q, &[0, 0], &mut cost), 0.0);
        assert_eq!(cost, vec![2.0, 3.0]);
        assert_eq!(evaluate(&q, &[1, 0], &mut cost), 2.0);
        assert_eq!(cost, vec![-2.0, 5.0]);
        assert_eq!(evaluate(&q, &[1, 1], &mut cost), 7.0);
        assert_eq!(cost, vec![-4.0, -5.0]);
    }

    #[test]
    fn flip_cost_is_the_energy_delta() {
        let mut rng = SmallRng::seed_from_u64(11);
        let q = QuboMatrix::random(&mut rng, 30, 0.4, 5.0);
        let solution = random_solution(&mut rng, 30);
        let mut cost = vec![0.0; 30];
        let energy = evaluate(&q, &solution, &mut cost);
        for bit in 0..30 {
            let mut flipped = solution.clone();
            flipped[bit] ^= 1;
            assert_abs_diff_eq!(simple_evaluate(&q, &flipped) - energy, cost[bit], epsilon = 1e-9);
        }
    }

    #[test]
    fn incremental_matches_full_over_many_flips() {
        let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
        let n = 40;
        let q = QuboMatrix::random(&mut rng, n, 0.6, 10.0);
        let mut solution = random_solution(&mut rng, n);
        let mut cost = vec![0.0; n];
        let mut energy = evaluate(&q, &solution, &mut cost);

        for _ in 0..2_000 {
            let bit = rng.random_range(0..n);
            energy = evaluate_1bit(&q, energy, bit, &mut solution, &mut cost);
        }

        assert_abs_diff_eq!(energy, simple_evaluate(&q, &solution), epsilon = 1e-7);
        assert_costs_match(&q, &solution, &cost);
    }

    #[test]
    fn evaluate_is_idempotent() {
        let mut rng = SmallRng::seed_from_u64(3);
        let q = QuboMatrix::random(&mut rng, 25, 0.5, 3.0);
        let solution = random_solution(&mut rng, 25);
        let mut c1 = vec![0.0; 25];
        let mut c2 = vec![0.0; 25];
        let e1 = evaluate(&q, &solution, &mut c1);
        let e2 = evaluate(&q, &solution, &mut c2);
        assert_eq!(e1, e2);
        assert_eq!(c1, c2);
        assert_eq!(e1, simple_evaluate(&q, &solution));
    }

    #[test]
    fn parallel_path_matches_serial_terms() {
        let mut rng = SmallRng::seed_from_u64(99);
        let n = PARALLEL_EVALUATE_MIN + 3;
        let q = QuboMatrix::random(&mut rng, n, 0.01, 1.0);
        let solution = random_solution(&mut rng, n);
        let mut cost = vec![0.0; n];
        let energy = evaluate(&q, &solution, &mut cost);

        let mut serial = 0.0;
        for i in 0..n {
            let (e, c) = row_terms(&q, &solution, i);
            serial += e;
            assert_eq!(cost[i], c);
        }
        assert_eq!(energy, serial);
    }

    #[test]
    fn flipping_twice_restores_energy() {
        let mut rng = SmallRng::seed_from_u64(5);
        let q = QuboMatrix::random(&mut rng, 16, 0.5, 2.0);
        let mut solution = random_solution(&mut rng, 16);
        let original = solution.clone();
        let mut cost = vec![0.0; 16];
        let e0 = evaluate(&q, &solution, &mut cost);
        let e1 = evaluate_1bit(&q, e0, 7, &mut solution, &mut cost);
        let e2 = evaluate_1bit(&q, e1, 7, &mut solution, &mut cost);
        assert_eq!(solution, original);
        assert_abs_diff_eq!(e0, e2, epsilon = 1e-9);
    }
}
