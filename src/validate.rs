//! Exhaustive checks for small problems and re-verification of solve results.

use crate::energy::{evaluate, evaluate_1bit, simple_evaluate};
use crate::matrix::QuboMatrix;
use crate::solver::SolveResult;
use rayon::prelude::*;

/// Largest problem [`brute_force`] accepts.
pub const BRUTE_FORCE_MAX_VARS: usize = 24;

/// Leading bits fixed per parallel task.
const SPLIT_BITS: usize = 6;

// ============================================================================
// Public API
// ============================================================================

/// Maximum energy of `qubo` and one assignment achieving it, by enumeration.
///
/// The assignment space is split on the top bits across threads; each task walks
/// its half-space in Gray-code order so every step is a single incremental flip.
///
/// # Panics
/// Panics if `qubo` has more than [`BRUTE_FORCE_MAX_VARS`] variables.
pub fn brute_force(qubo: &QuboMatrix) -> (f64, Vec<u8>) {
    let n = qubo.size();
    assert!(
        n <= BRUTE_FORCE_MAX_VARS,
        "brute force supports at most {BRUTE_FORCE_MAX_VARS} variables, got {n}"
    );
    if n == 0 {
        return (0.0, Vec::new());
    }

    let high = n.min(SPLIT_BITS);
    let low = n - high;
    let best = (0..1usize << high)
        .into_par_iter()
        .map(|prefix| {
            let mut solution = vec![0u8; n];
            for b in 0..high {
                solution[low + b] = u8::from((prefix >> b) & 1 == 1);
            }
            let mut flip_cost = vec![0.0; n];
            let mut energy = evaluate(qubo, &solution, &mut flip_cost);
            let mut best = (energy, solution.clone());
            for step in 1..(1usize << low) {
                let bit = step.trailing_zeros() as usize;
                energy = evaluate_1bit(qubo, energy, bit, &mut solution, &mut flip_cost);
                if energy > best.0 {
                    best = (energy, solution.clone());
                }
            }
            best
        })
        .reduce_with(|a, b| if b.0 > a.0 { b } else { a });

    match best {
        // Recompute exactly; the walk accumulates rounding.
        Some((_, solution)) => (simple_evaluate(qubo, &solution), solution),
        None => (0.0, Vec::new()),
    }
}

/// Re-checks every entry of `result` against `qubo`.
///
/// `qubo` is the matrix that was solved (already negated for minimization) and
/// `sign` is `+1.0` when maximizing, `-1.0` when minimizing.
///
/// # Errors
/// Returns a message naming the first entry with a malformed assignment, an energy
/// that doesn't match re-evaluation, or that is ranked out of order.
pub fn verify_result(qubo: &QuboMatrix, result: &SolveResult, sign: f64) -> Result<(), String> {
    let n = qubo.size();
    if result.entries.is_empty() {
        return Err("result holds no solutions".to_string());
    }

    for (rank, entry) in result.entries.iter().enumerate() {
        if entry.solution.len() != n {
            return Err(format!(
                "entry {rank}: solution has {} bits, expected {n}",
                entry.solution.len()
            ));
        }
        if let Some(i) = entry.solution.iter().position(|&b| b > 1) {
            return Err(format!("entry {rank}: bit {i} is {}", entry.solution[i]));
        }
        let actual = sign * simple_evaluate(qubo, &entry.solution);
        let tolerance = 1e-6 * actual.abs().max(1.0);
        if (actual - entry.energy).abs() > tolerance {
            return Err(format!(
                "entry {rank}: reported energy {:.6} but solution evaluates to {actual:.6}",
                entry.energy
            ));
        }
    }

    for (rank, pair) in result.entries.windows(2).enumerate() {
        if sign * pair[0].energy < sign * pair[1].energy {
            return Err(format!("entries {rank} and {} are out of order", rank + 1));
        }
    }
    Ok(())
}
