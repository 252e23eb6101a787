//! Tabu search over single-bit flips.
//!
//! Each iteration sweeps the variables in flip-cost order. A candidate that beats
//! the best energy seen so far is taken at once and polished with local search;
//! otherwise the best non-tabu neighbour is flipped at the end of the sweep. A
//! flipped variable is forbidden for `tenure ± 1` iterations.

use crate::energy::{evaluate, evaluate_1bit};
use crate::local::{local_search, local_search_1bit};
use crate::matrix::QuboMatrix;
use crate::order::{resort_by_flip_cost, sort_by_flip_cost};
use log::trace;
use rand::Rng;

// ============================================================================
// Tuning constants
// ============================================================================

/// Budget extensions are only granted while less than this fraction of the budget is left.
const EXTEND_BELOW_REMAINING: f64 = 0.80;

/// Maximum number of budget extensions per call.
const MAX_BUDGET_EXTENSIONS: u32 = 900;

/// An improvement smaller than this counts towards the cycle detector.
const CYCLE_DELTA: f64 = 1e-8;

/// Cycle score at which an improving move ends the sweep early.
const CYCLE_SWEEP_LIMIT: u32 = 4;

/// Cycle score at which the whole search stops.
const CYCLE_STOP_LIMIT: u32 = 6;

// ============================================================================
// Tenure
// ============================================================================

/// Default tabu tenure for a problem with `n` variables.
pub fn tenure_for_size(n: usize) -> usize {
    match n {
        0..100 => 10,
        100..250 => 12,
        250..500 => 13,
        500..1000 => 21,
        1000..2500 => 29,
        2500..8000 => 34,
        _ => 35,
    }
}

// ============================================================================
// Tabu List
// ============================================================================

/// Remaining forbidden turns per variable.
#[derive(Clone, Debug, Default)]
pub struct TabuList {
    remaining: Vec<u32>,
}

impl TabuList {
    /// Creates a list for `n` variables with nothing forbidden.
    pub fn new(n: usize) -> Self {
        Self {
            remaining: vec![0; n],
        }
    }

    /// Returns whether `bit` is currently forbidden.
    #[inline(always)]
    pub fn is_tabu(&self, bit: usize) -> bool {
        self.remaining[bit] != 0
    }

    /// Forbids `bit` for the next `turns` iterations.
    #[inline]
    pub fn forbid(&mut self, bit: usize, turns: u32) {
        self.remaining[bit] = turns;
    }

    /// Counts every variable one turn closer to being allowed again.
    #[inline]
    pub fn decay(&mut self) {
        for t in &mut self.remaining {
            *t = t.saturating_sub(1);
        }
    }

    /// Clears the list and resizes it to `n` variables.
    pub fn reset(&mut self, n: usize) {
        self.remaining.clear();
        self.remaining.resize(n, 0);
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Per-call tabu search parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct TabuParams {
    /// Stop once the shared `bit_flips` counter reaches this value (may be extended).
    pub iter_max: u64,
    /// Stop as soon as the best energy reaches this value (maximization units).
    pub target: Option<f64>,
    /// Fixed tenure; `None` uses [`tenure_for_size`]. Capped at `n + 1`.
    pub tenure: Option<usize>,
}

impl TabuParams {
    /// Budget of `iterations` candidate flips on top of `bit_flips` already spent.
    pub fn with_budget(bit_flips: u64, iterations: u64) -> Self {
        Self {
            iter_max: bit_flips.saturating_add(iterations),
            target: None,
            tenure: None,
        }
    }

    fn tenure_for(&self, n: usize) -> u32 {
        let tenure = match self.tenure {
            Some(t) => t.min(n + 1),
            None => tenure_for_size(n),
        };
        u32::try_from(tenure).unwrap_or(u32::MAX).max(1)
    }

    #[inline]
    fn reached_target(&self, energy: f64) -> bool {
        self.target.is_some_and(|t| energy >= t)
    }
}

// ============================================================================
// Tabu Search
// ============================================================================

/// Reusable tabu search workspace.
///
/// Keeps the tabu list, the ranked order and the best-so-far buffer between calls so
/// repeated passes over the same problem don't reallocate. After [`TabuSearch::run`]
/// the order is ranked for the returned solution.
#[derive(Clone, Debug, Default)]
pub struct TabuSearch {
    tabu: TabuList,
    order: Vec<usize>,
    best: Vec<u8>,
}

impl TabuSearch {
    /// Creates a workspace for `n` variables.
    pub fn new(n: usize) -> Self {
        Self {
            tabu: TabuList::new(n),
            order: (0..n).collect(),
            best: vec![0; n],
        }
    }

    /// Variables ranked by descending flip cost of the last returned solution.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Re-ranks the order from `flip_cost`, shuffling ties.
    pub fn rank<R: Rng>(&mut self, flip_cost: &[f64], rng: &mut R) {
        sort_by_flip_cost(&mut self.order, flip_cost, rng);
    }

    /// Runs tabu search starting from `solution`.
    ///
    /// On return `solution` holds the best assignment found and `flip_cost` is freshly
    /// evaluated for it. `bit_flips` is the running candidate counter shared with the
    /// caller. Returns the energy of `solution`.
    pub fn run<R: Rng>(
        &mut self,
        qubo: &QuboMatrix,
        solution: &mut [u8],
        flip_cost: &mut [f64],
        bit_flips: &mut u64,
        params: &TabuParams,
        rng: &mut R,
    ) -> f64 {
        let n = qubo.size();
        debug_assert_eq!(solution.len(), n);
        debug_assert_eq!(flip_cost.len(), n);
        if n == 0 {
            return 0.0;
        }

        let tenure = params.tenure_for(n);
        let mut best_energy = local_search(qubo, solution, flip_cost, bit_flips, rng);
        sort_by_flip_cost(&mut self.order, flip_cost, rng);

        let mut iter_max = params.iter_max;
        let mut this_iter = iter_max.saturating_sub(*bit_flips).max(1);
        let increase_iter = this_iter / 2;
        let mut extensions_left = MAX_BUDGET_EXTENSIONS;
        let mut current = best_energy;

        self.best.clear();
        self.best.extend_from_slice(solution);
        self.tabu.reset(n);

        let mut last_bit = 0usize;
        let mut cycle_1 = n;
        let mut cycle_2 = n;
        let mut cycle_score = 0u32;
        let mut best_first = true;

        while *bit_flips < iter_max && !params.reached_target(best_energy) {
            let mut neighbour_best = f64::NEG_INFINITY;
            let mut fallback = None;
            let mut improved = false;

            for pos in 0..n {
                let bit = if best_first { self.order[pos] } else { self.order[n - 1 - pos] };
                if self.tabu.is_tabu(bit) {
                    continue;
                }
                *bit_flips += 1;
                let new_energy = current + flip_cost[bit];

                if new_energy > best_energy && bit != cycle_1 {
                    improved = true;
                    last_bit = bit;
                    let delta = new_energy - best_energy;

                    let flipped = evaluate_1bit(qubo, current, bit, solution, flip_cost);
                    current = local_search_1bit(qubo, flipped, solution, flip_cost, bit_flips, rng);
                    resort_by_flip_cost(&mut self.order, flip_cost);
                    best_energy = current;
                    self.best.copy_from_slice(solution);

                    let how_far = iter_max.saturating_sub(*bit_flips) as f64 / this_iter as f64;
                    trace!(
                        "tabu new best {current:.6} bit={bit} cycle=({cycle_1},{cycle_2},{cycle_score}) flips={} remaining={how_far:.3}",
                        *bit_flips
                    );
                    if params.reached_target(current) {
                        break;
                    }

                    // Tiny gains and flips bouncing between the same few bits are a cycle.
                    if delta <= CYCLE_DELTA {
                        cycle_score += 1;
                    }
                    if cycle_2 == cycle_1 {
                        cycle_score += 1;
                    }
                    if cycle_2 == last_bit {
                        cycle_score += 1;
                    }
                    if cycle_score > CYCLE_SWEEP_LIMIT {
                        break;
                    }
                    cycle_2 = cycle_1;
                    cycle_1 = last_bit;

                    if how_far < EXTEND_BELOW_REMAINING && extensions_left > 0 {
                        trace!("tabu budget {iter_max} -> {}", iter_max + increase_iter);
                        iter_max += increase_iter;
                        this_iter += increase_iter;
                        extensions_left -= 1;
                    }
                    break;
                }

                if new_energy > neighbour_best {
                    neighbour_best = new_energy;
                    fallback = Some(bit);
                }
            }

            if params.reached_target(current) || cycle_score > CYCLE_STOP_LIMIT {
                break;
            }

            if !improved && let Some(bit) = fallback {
                last_bit = bit;
                current = evaluate_1bit(qubo, current, bit, solution, flip_cost);
            }

            self.tabu.decay();
            // Tenure shifts by one with the value of the last variable.
            let turns = if solution[n - 1] == 0 { tenure + 1 } else { tenure - 1 };
            self.tabu.forbid(last_bit, turns);
            best_first = !best_first;
        }

        solution.copy_from_slice(&self.best);
        // Clean evaluation removes any drift from the incremental updates.
        let final_energy = evaluate(qubo, solution, flip_cost);
        sort_by_flip_cost(&mut self.order, flip_cost, rng);
        final_energy
    }
}

// ============================================================================
// Tests
// ============================================================================
