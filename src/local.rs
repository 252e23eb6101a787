//! Greedy single-bit-flip hill climbing.

use crate::energy::{evaluate, evaluate_1bit};
use crate::matrix::QuboMatrix;
use rand::Rng;
use rand::seq::SliceRandom;

/// Flips improving bits until no single flip raises the energy.
///
/// Sweeps alternate direction; the visitation order is reshuffled at the start of
/// every top-to-bottom sweep. Any bit with a strictly positive flip cost is flipped
/// immediately. Assumes `flip_cost` is current for `solution`.
///
/// `bit_flips` counts every candidate examined. Returns the new energy.
pub fn local_search_1bit<R: Rng>(
    qubo: &QuboMatrix,
    mut energy: f64,
    solution: &mut [u8],
    flip_cost: &mut [f64],
    bit_flips: &mut u64,
    rng: &mut R,
) -> f64 {
    let n = qubo.size();
    let mut order: Vec<usize> = (0..n).collect();
    let mut top_down = true;

    let mut improved = true;
    while improved {
        improved = false;

        if top_down {
            order.shuffle(rng);
        }
        for pos in 0..n {
            let bit = if top_down { order[n - 1 - pos] } else { order[pos] };
            *bit_flips += 1;
            if flip_cost[bit] > 0.0 {
                energy = evaluate_1bit(qubo, energy, bit, solution, flip_cost);
                improved = true;
            }
        }
        top_down = !top_down;
    }
    energy
}

/// Evaluates `solution` from scratch, then runs [`local_search_1bit`] on it.
pub fn local_search<R: Rng>(
    qubo: &QuboMatrix,
    solution: &mut [u8],
    flip_cost: &mut [f64],
    bit_flips: &mut u64,
    rng: &mut R,
) -> f64 {
    let energy = evaluate(qubo, solution, flip_cost);
    local_search_1bit(qubo, energy, solution, flip_cost, bit_flips, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::simple_evaluate;
    use crate::solution::random_solution;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn result_is_a_local_optimum() {
        let mut rng = SmallRng::seed_from_u64(17);
        for n in [1, 5, 33, 80] {
            let q = QuboMatrix::random(&mut rng, n, 0.5, 4.0);
            let mut solution = random_solution(&mut rng, n);
            let mut cost = vec![0.0; n];
            let mut flips = 0;
            let energy = local_search(&q, &mut solution, &mut cost, &mut flips, &mut rng);

            assert!(cost.iter().all(|&c| c <= 0.0), "no single flip may improve");
            assert_abs_diff_eq!(energy, simple_evaluate(&q, &solution), epsilon = 1e-7);
            assert!(flips >= n as u64);
        }
    }

    #[test]
    fn never_decreases_energy() {
        let mut rng = SmallRng::seed_from_u64(23);
        let q = QuboMatrix::random(&mut rng, 50, 0.3, 2.0);
        let mut solution = random_solution(&mut rng, 50);
        let start = simple_evaluate(&q, &solution);
        let mut cost = vec![0.0; 50];
        let mut flips = 0;
        let end = local_search(&q, &mut solution, &mut cost, &mut flips, &mut rng);
        assert!(end >= start);
    }

    #[test]
    fn diagonal_problem_reaches_the_optimum() {
        // Independent variables: set exactly the positive biases.
        let q = QuboMatrix::from_entries(4, &[(0, 0, 1.0), (1, 1, -2.0), (2, 2, 3.0), (3, 3, -0.5)]);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut solution = vec![0, 1, 0, 1];
        let mut cost = vec![0.0; 4];
        let mut flips = 0;
        let energy = local_search(&q, &mut solution, &mut cost, &mut flips, &mut rng);
        assert_eq!(solution, vec![1, 0, 1, 0]);
        assert_eq!(energy, 4.0);
    }
}
