//! Sub-sampler dispatch.
//!
//! A [`SubSampler`] improves the solution of one extracted subproblem. The
//! decomposition loop doesn't care how: [`TabuSampler`] runs the tabu search in
//! this crate, [`ExternalSampler`] hands the subproblem to a caller-supplied
//! closure (an annealer, a remote service, another solver).

use crate::error::SolveError;
use crate::local::local_search;
use crate::matrix::QuboMatrix;
use crate::reduce::reduce;
use crate::tabu::{TabuParams, TabuSearch};
use log::trace;
use rand::rngs::SmallRng;

/// Minimum tabu budget for a subproblem.
const SUB_TABU_MIN_ITERATIONS: u64 = 3_000;

/// Tabu budget per subproblem variable.
const SUB_TABU_ITERATIONS_PER_VAR: u64 = 20_000;

// ============================================================================
// Trait
// ============================================================================

/// Something that can improve the solution of a (maximizing) subproblem.
pub trait SubSampler {
    /// Returns an improved assignment for `sub`, starting from `current`.
    ///
    /// The result must have `sub.size()` entries, each `0` or `1`.
    fn sample(&mut self, sub: &QuboMatrix, current: &[u8], rng: &mut SmallRng) -> Vec<u8>;

    /// Short name used in logs and error messages.
    fn name(&self) -> &str;
}

// ============================================================================
// Tabu sampler
// ============================================================================

/// Solves subproblems with [`TabuSearch`].
#[derive(Clone, Debug, Default)]
pub struct TabuSampler {
    search: TabuSearch,
    tenure: Option<usize>,
    bit_flips: u64,
}

impl TabuSampler {
    /// Creates a sampler using the size-derived tenure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sampler with a fixed tabu tenure.
    pub fn with_tenure(tenure: Option<usize>) -> Self {
        Self {
            tenure,
            ..Self::default()
        }
    }

    /// Fixed tenure, if any; `None` derives it from each subproblem's size.
    pub fn tenure(&self) -> Option<usize> {
        self.tenure
    }

    /// Candidate flips spent across every subproblem so far.
    pub fn bit_flips(&self) -> u64 {
        self.bit_flips
    }
}

impl SubSampler for TabuSampler {
    fn sample(&mut self, sub: &QuboMatrix, current: &[u8], rng: &mut SmallRng) -> Vec<u8> {
        let m = sub.size();
        let mut solution = current.to_vec();
        let mut flip_cost = vec![0.0; m];
        let mut flips = 0;
        let params = TabuParams {
            iter_max: SUB_TABU_MIN_ITERATIONS.max(SUB_TABU_ITERATIONS_PER_VAR * m as u64),
            target: None,
            tenure: self.tenure,
        };
        if self.search.order().len() != m {
            self.search = TabuSearch::new(m);
        }
        self.search
            .run(sub, &mut solution, &mut flip_cost, &mut flips, &params, rng);
        self.bit_flips += flips;
        solution
    }

    fn name(&self) -> &str {
        "tabu"
    }
}

// ============================================================================
// External sampler
// ============================================================================

/// Wraps a closure `(subproblem, current) -> solution`.
///
/// When `polish` is set, a valid result is run through local search so that small
/// precision losses on the external side don't leave obvious single-bit gains.
pub struct ExternalSampler<F> {
    name: String,
    sample_fn: F,
    polish: bool,
}

impl<F> ExternalSampler<F>
where
    F: FnMut(&QuboMatrix, &[u8]) -> Vec<u8>,
{
    /// Wraps `sample_fn` under `name`, with local-search polishing enabled.
    pub fn new(name: impl Into<String>, sample_fn: F) -> Self {
        Self {
            name: name.into(),
            sample_fn,
            polish: true,
        }
    }

    /// Enables or disables the local-search polish.
    #[must_use]
    pub fn polish(mut self, polish: bool) -> Self {
        self.polish = polish;
        self
    }
}

impl<F> SubSampler for ExternalSampler<F>
where
    F: FnMut(&QuboMatrix, &[u8]) -> Vec<u8>,
{
    fn sample(&mut self, sub: &QuboMatrix, current: &[u8], rng: &mut SmallRng) -> Vec<u8> {
        let mut solution = (self.sample_fn)(sub, current);
        // Malformed results are rejected by the caller; only polish what can be evaluated.
        if self.polish && solution.len() == sub.size() && solution.iter().all(|&b| b <= 1) {
            let mut flip_cost = vec![0.0; sub.size()];
            let mut flips = 0;
            local_search(sub, &mut solution, &mut flip_cost, &mut flips, rng);
        }
        solution
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Extracts `indices`, lets `sampler` improve them, and writes the result back.
///
/// Returns how many bits of `solution` changed.
///
/// # Errors
/// Fails if the sampler returns a vector of the wrong length or a non-binary entry;
/// `solution` is left untouched in that case.
pub fn reduce_solve_project(
    indices: &[usize],
    qubo: &QuboMatrix,
    solution: &mut [u8],
    sampler: &mut dyn SubSampler,
    rng: &mut SmallRng,
) -> Result<usize, SolveError> {
    let sub = reduce(indices, qubo, solution);
    let result = sampler.sample(&sub.qubo, &sub.solution, rng);

    if result.len() != indices.len() {
        return Err(SolveError::SamplerContract {
            sampler: sampler.name().to_string(),
            expected: indices.len(),
            got: result.len(),
        });
    }
    if let Some(index) = result.iter().position(|&b| b > 1) {
        return Err(SolveError::SamplerNonBinary {
            sampler: sampler.name().to_string(),
            index,
            value: result[index],
        });
    }

    let mut changed = 0;
    for (&i, &bit) in indices.iter().zip(&result) {
        if solution[i] != bit {
            solution[i] = bit;
            changed += 1;
        }
    }
    trace!("{} sampled {} vars, {changed} changed", sampler.name(), indices.len());
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::simple_evaluate;
    use crate::solution::random_solution;
    use rand::SeedableRng;

    #[test]
    fn tabu_sampler_never_worsens_the_full_solution() {
        let mut rng = SmallRng::seed_from_u64(12);
        let q = QuboMatrix::random(&mut rng, 40, 0.3, 3.0);
        let mut solution = random_solution(&mut rng, 40);
        let before = simple_evaluate(&q, &solution);
        let indices: Vec<usize> = (5..25).collect();
        let mut sampler = TabuSampler::new();

        reduce_solve_project(&indices, &q, &mut solution, &mut sampler, &mut rng).unwrap();
        assert!(simple_evaluate(&q, &solution) >= before - 1e-9);
        assert!(sampler.bit_flips() > 0);
    }

    #[test]
    fn only_indexed_bits_change() {
        let mut rng = SmallRng::seed_from_u64(3);
        let q = QuboMatrix::random(&mut rng, 30, 0.5, 1.0);
        let mut solution = random_solution(&mut rng, 30);
        let original = solution.clone();
        let indices = vec![2, 9, 17, 28];
        let mut sampler = ExternalSampler::new("invert", |_: &QuboMatrix, cur: &[u8]| {
            cur.iter().map(|b| 1 - b).collect()
        })
        .polish(false);

        let changed = reduce_solve_project(&indices, &q, &mut solution, &mut sampler, &mut rng).unwrap();
        assert_eq!(changed, 4);
        for i in 0..30 {
            if indices.contains(&i) {
                assert_ne!(solution[i], original[i]);
            } else {
                assert_eq!(solution[i], original[i]);
            }
        }
    }

    #[test]
    fn external_result_is_polished() {
        // Diagonal-only subproblem: the optimum sets exactly the positive biases.
        let q = QuboMatrix::from_entries(3, &[(0, 0, 1.0), (1, 1, -1.0), (2, 2, 2.0)]);
        let mut rng = SmallRng::seed_from_u64(0);
        let mut sampler = ExternalSampler::new("zeros", |sub: &QuboMatrix, _: &[u8]| vec![0; sub.size()]);
        assert_eq!(sampler.sample(&q, &[0, 0, 0], &mut rng), vec![1, 0, 1]);
    }

    #[test]
    fn wrong_length_is_a_contract_violation() {
        let mut rng = SmallRng::seed_from_u64(1);
        let q = QuboMatrix::random(&mut rng, 10, 0.5, 1.0);
        let mut solution = vec![0; 10];
        let mut sampler = ExternalSampler::new("short", |_: &QuboMatrix, _: &[u8]| vec![1]);
        let err = reduce_solve_project(&[1, 2, 3], &q, &mut solution, &mut sampler, &mut rng).unwrap_err();
        assert_eq!(
            err,
            SolveError::SamplerContract {
                sampler: "short".into(),
                expected: 3,
                got: 1
            }
        );
        assert_eq!(solution, vec![0; 10]);
    }

    #[test]
    fn non_binary_is_a_contract_violation() {
        let mut rng = SmallRng::seed_from_u64(1);
        let q = QuboMatrix::random(&mut rng, 10, 0.5, 1.0);
        let mut solution = vec![0; 10];
        let mut sampler = ExternalSampler::new("bad", |_: &QuboMatrix, _: &[u8]| vec![0, 3]);
        let err = reduce_solve_project(&[4, 7], &q, &mut solution, &mut sampler, &mut rng).unwrap_err();
        assert!(matches!(err, SolveError::SamplerNonBinary { index: 1, value: 3, .. }));
    }
}
