//! Outer decomposition loop.
//!
//! One solve alternates two phases until a stop condition holds:
//!
//! 1. **Partition**: split the variables into chunks of `sub_size`, extract each
//!    chunk as a clamped subproblem, let the sub-sampler improve it, and project the
//!    result back.
//! 2. **Full tabu**: run tabu search over all variables and record the result in
//!    the archive.
//!
//! The archive classification drives restarts (too many passes without progress)
//! and termination (too many passes without a new best).

use crate::archive::{ArchiveEntry, RecordCode, SolutionArchive};
use crate::energy::evaluate;
use crate::error::SolveError;
use crate::local::local_search;
use crate::matrix::QuboMatrix;
use crate::sampler::{SubSampler, TabuSampler, reduce_solve_project};
use crate::solution::{check_binary, flip_biased_by_index, randomize, random_solution};
use crate::tabu::{TabuParams, TabuSearch};
use log::{debug, info, trace};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

// ============================================================================
// Tuning constants
// ============================================================================

/// Passes without progress before a full random restart.
const PROGRESS_CHECK: u32 = 12;

/// Fraction of the variables covered by one "original" partition pass.
const SUB_MATRIX_SPAN: f64 = 0.214;

/// Initial tabu budget per variable.
const INITIAL_TABU_PASS_FACTOR: u64 = 6_500;

/// Per-iteration full tabu budget per variable.
const TABU_PASS_FACTOR: u64 = 1_700;

/// Problems this small skip partitioning and run full tabu only.
const MIN_PARTITION_SIZE: usize = 20;

/// A partition pass changing this many bits or fewer counts as degenerate.
const DEGENERATE_CHANGE: usize = 2;

/// Maximum random seeding passes when priming the diversity archive.
const DIVERSITY_SEED_PASSES: usize = 40;

/// Disagreement tolerance when building a start from the archive population.
const POPULATION_BIAS: usize = 10;

/// Duplicates ranked below this archive position trigger a random kick.
const KICK_POSITION: usize = 4;

/// Duplicates seen more often than this trigger a random kick.
const KICK_COUNT: u32 = 8;

/// One month, the default wall-clock budget.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2_592_000);

// ============================================================================
// Configuration
// ============================================================================

/// How each partition pass picks its variables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Algorithm {
    /// Chunks of the flip-cost ranking, least impactful first.
    #[default]
    EnergyImpact,
    /// Chunks of the columns on which archived solutions disagree.
    SolutionDiversity,
}

impl Algorithm {
    /// Archive capacity used when the configuration doesn't set one.
    pub fn default_archive_capacity(self) -> usize {
        match self {
            Self::EnergyImpact => 20,
            Self::SolutionDiversity => 75,
        }
    }

    /// Single-letter code (`o` or `d`).
    pub fn code(self) -> &'static str {
        match self {
            Self::EnergyImpact => "o",
            Self::SolutionDiversity => "d",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "o" | "original" => Ok(Self::EnergyImpact),
            "d" | "diversity" => Ok(Self::SolutionDiversity),
            other => Err(format!("unknown algorithm '{other}' (expected 'o' or 'd')")),
        }
    }
}

/// Configuration for a solve.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Passes without a new best before giving up.
    pub repeats: usize,
    /// Variables per subproblem. Zero, or `>= N`, disables partitioning.
    pub sub_size: usize,
    /// Stop once the best energy reaches this value (in the caller's min/max sense).
    pub target: Option<f64>,
    /// Wall-clock budget.
    pub timeout: Duration,
    /// Fixed tabu tenure; `None` derives it from the problem size.
    pub tabu_tenure: Option<usize>,
    /// Whether the caller is maximizing. Only affects the sign of reported energies.
    pub find_max: bool,
    /// Partition strategy.
    pub algorithm: Algorithm,
    /// RNG seed; `None` draws one at random.
    pub seed: Option<u64>,
    /// Starting solution; `None` starts from a random one.
    pub initial_solution: Option<Vec<u8>>,
    /// Archive size; `None` uses the algorithm's default.
    pub archive_capacity: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            repeats: 50,
            sub_size: 47,
            target: None,
            timeout: DEFAULT_TIMEOUT,
            tabu_tenure: None,
            find_max: false,
            algorithm: Algorithm::EnergyImpact,
            seed: None,
            initial_solution: None,
            archive_capacity: None,
        }
    }
}

impl SolverConfig {
    /// `+1.0` when maximizing, `-1.0` when minimizing.
    pub fn sign(&self) -> f64 {
        if self.find_max { 1.0 } else { -1.0 }
    }
}

// ============================================================================
// Result
// ============================================================================

/// Why the outer loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The best energy reached the configured target.
    TargetReached,
    /// `repeats` passes in a row produced no new best.
    RepeatLimit,
    /// The wall-clock budget ran out.
    Timeout,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetReached => write!(f, "target reached"),
            Self::RepeatLimit => write!(f, "repeat limit"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Outcome of a solve.
///
/// Energies are reported in the caller's sense: negated back for minimization.
#[derive(Clone, Debug)]
pub struct SolveResult {
    /// Distinct solutions, best first.
    pub entries: Vec<ArchiveEntry>,
    /// Candidate flips examined by full-problem tabu and local search.
    pub bit_flips: u64,
    /// Subproblems handed to the sub-sampler.
    pub partition_calls: u64,
    /// Outer loop iterations run after initialization.
    pub outer_iterations: u64,
    /// Full random restarts after too many passes without progress.
    pub restarts: u64,
    /// Random kicks after a repeatedly found duplicate.
    pub kicks: u64,
    /// Wall-clock time spent.
    pub elapsed: Duration,
    /// Why the loop stopped.
    pub termination: Termination,
}

impl SolveResult {
    /// The best solution found.
    pub fn best(&self) -> &ArchiveEntry {
        &self.entries[0]
    }

    /// The best solution's assignment.
    pub fn best_solution(&self) -> &[u8] {
        &self.best().solution
    }

    /// The best solution's energy.
    pub fn best_energy(&self) -> f64 {
        self.best().energy
    }
}

// ============================================================================
// Solver
// ============================================================================

/// Decomposing QUBO solver with an injectable sub-sampler.
pub struct Solver {
    config: SolverConfig,
    sampler: Box<dyn SubSampler>,
}

impl Solver {
    /// Creates a solver that solves subproblems with tabu search.
    ///
    /// A fixed `tabu_tenure` only applies to the full problem; subproblems always
    /// derive their tenure from their own size.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            sampler: Box::new(default_sampler()),
        }
    }

    /// Replaces the sub-sampler.
    #[must_use]
    pub fn with_sampler(mut self, sampler: Box<dyn SubSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Maximizes `qubo`.
    ///
    /// Minimization problems must be negated first (see [`QuboMatrix::negated`]) with
    /// `find_max` left unset so energies are reported in the original sense.
    ///
    /// # Errors
    /// Fails on an empty problem, a malformed initial solution, a zero archive
    /// capacity, or a sub-sampler that breaks its contract.
    pub fn solve(&mut self, qubo: &QuboMatrix) -> Result<SolveResult, SolveError> {
        let n = qubo.size();
        if n == 0 {
            return Err(SolveError::EmptyProblem);
        }
        if let Some(initial) = &self.config.initial_solution {
            if initial.len() != n {
                return Err(SolveError::InitialSolutionLength {
                    expected: n,
                    got: initial.len(),
                });
            }
            check_binary(initial)?;
        }
        let capacity = self
            .config
            .archive_capacity
            .unwrap_or_else(|| self.config.algorithm.default_archive_capacity());
        let archive = SolutionArchive::new(capacity)?;
        let seed = self.config.seed.unwrap_or_else(rand::random);
        debug!(
            "solve: n={n} sub={} algo={} repeats={} archive={capacity} seed={seed}",
            self.config.sub_size, self.config.algorithm, self.config.repeats
        );

        let mut run = Run {
            qubo,
            config: &self.config,
            sampler: self.sampler.as_mut(),
            rng: SmallRng::seed_from_u64(seed),
            archive,
            solution: vec![0; n],
            flip_cost: vec![0.0; n],
            tabu: TabuSearch::new(n),
            target: self.config.target.map(|t| self.config.sign() * t),
            start: Instant::now(),
            bit_flips: 0,
            partition_calls: 0,
            outer_iterations: 0,
            restarts: 0,
            kicks: 0,
        };
        run.execute()
    }
}

fn default_sampler() -> TabuSampler {
    TabuSampler::new()
}

/// Solves `qubo` with the tabu sub-sampler.
///
/// # Errors
/// See [`Solver::solve`].
pub fn solve(qubo: &QuboMatrix, config: &SolverConfig) -> Result<SolveResult, SolveError> {
    Solver::new(config.clone()).solve(qubo)
}

// ============================================================================
// Run state
// ============================================================================

struct Run<'a> {
    qubo: &'a QuboMatrix,
    config: &'a SolverConfig,
    sampler: &'a mut dyn SubSampler,
    rng: SmallRng,
    archive: SolutionArchive,
    solution: Vec<u8>,
    flip_cost: Vec<f64>,
    tabu: TabuSearch,
    /// Target in maximization units.
    target: Option<f64>,
    start: Instant,
    bit_flips: u64,
    partition_calls: u64,
    outer_iterations: u64,
    restarts: u64,
    kicks: u64,
}

impl Run<'_> {
    fn execute(mut self) -> Result<SolveResult, SolveError> {
        match self.config.algorithm {
            Algorithm::EnergyImpact => self.init_energy_impact(),
            Algorithm::SolutionDiversity => self.init_solution_diversity(),
        }
        info!(
            "initial best {:.5} after {} flips",
            self.archive.best_energy() * self.config.sign(),
            self.bit_flips
        );

        let n = self.qubo.size();
        let sub = self.config.sub_size;
        let partition = n > MIN_PARTITION_SIZE && sub > 0 && sub < n;
        let mut repeat = 0usize;
        let mut no_progress = 0u32;

        let termination = loop {
            if let Some(reason) = self.should_stop(repeat) {
                break reason;
            }
            self.outer_iterations += 1;

            if partition {
                if no_progress % PROGRESS_CHECK == PROGRESS_CHECK - 1 {
                    debug!(
                        "restart: no progress for {no_progress} passes (repeat {repeat}/{})",
                        self.config.repeats
                    );
                    randomize(&mut self.rng, &mut self.solution);
                    self.restarts += 1;
                } else {
                    self.partition_pass()?;
                }
            }

            let params = self.tabu_params(TABU_PASS_FACTOR * n as u64);
            let energy = self.tabu.run(
                self.qubo,
                &mut self.solution,
                &mut self.flip_cost,
                &mut self.bit_flips,
                &params,
                &mut self.rng,
            );
            let outcome = self.archive.record(&self.solution, energy);
            trace!("record {energy:.5}: {outcome:?}");

            match outcome.code {
                RecordCode::NewHigh => {
                    repeat = 0;
                    info!(
                        "new best {:.5} (iteration {}, {} partition calls, {:.3}s)",
                        energy * self.config.sign(),
                        self.outer_iterations,
                        self.partition_calls,
                        self.start.elapsed().as_secs_f64()
                    );
                }
                RecordCode::DuplicateEnergy | RecordCode::DuplicateHighest => {
                    if outcome.pos > KICK_POSITION || outcome.count > KICK_COUNT {
                        debug!("kick: duplicate at rank {} seen {} times", outcome.pos, outcome.count);
                        randomize(&mut self.rng, &mut self.solution);
                        self.kicks += 1;
                    }
                    repeat += 1;
                    if outcome.code == RecordCode::DuplicateEnergy {
                        no_progress += 1;
                    }
                }
                RecordCode::Nothing => {
                    repeat += 1;
                    no_progress += 1;
                }
                RecordCode::DuplicateEnergyUnique | RecordCode::NewEnergyUnique => {
                    repeat += 1;
                }
            }
            debug!(
                "iteration {}: latest {:.5}, best {:.5}, flips {}",
                self.outer_iterations,
                energy * self.config.sign(),
                self.archive.best_energy() * self.config.sign(),
                self.bit_flips
            );
        };

        info!(
            "stopped ({termination}) after {} iterations, {} restarts, {} kicks; {}",
            self.outer_iterations,
            self.restarts,
            self.kicks,
            self.archive.stats()
        );
        let sign = self.config.sign();
        let entries = self
            .archive
            .into_entries()
            .into_iter()
            .map(|mut e| {
                e.energy *= sign;
                e
            })
            .collect();
        Ok(SolveResult {
            entries,
            bit_flips: self.bit_flips,
            partition_calls: self.partition_calls,
            outer_iterations: self.outer_iterations,
            restarts: self.restarts,
            kicks: self.kicks,
            elapsed: self.start.elapsed(),
            termination,
        })
    }

    fn should_stop(&self, repeat: usize) -> Option<Termination> {
        if self.target.is_some_and(|t| self.archive.best_energy() >= t) {
            Some(Termination::TargetReached)
        } else if repeat >= self.config.repeats {
            Some(Termination::RepeatLimit)
        } else if self.start.elapsed() >= self.config.timeout {
            Some(Termination::Timeout)
        } else {
            None
        }
    }

    fn tabu_params(&self, iterations: u64) -> TabuParams {
        TabuParams {
            target: self.target,
            tenure: self.config.tabu_tenure,
            ..TabuParams::with_budget(self.bit_flips, iterations)
        }
    }

    fn seed_solution(&mut self) {
        match &self.config.initial_solution {
            Some(initial) => self.solution.copy_from_slice(initial),
            None => self.solution = random_solution(&mut self.rng, self.qubo.size()),
        }
    }

    /// One long tabu pass from the seed solution.
    fn init_energy_impact(&mut self) {
        let n = self.qubo.size() as u64;
        self.seed_solution();
        let params = self.tabu_params((INITIAL_TABU_PASS_FACTOR * n).max(400));
        let energy = self.tabu.run(
            self.qubo,
            &mut self.solution,
            &mut self.flip_cost,
            &mut self.bit_flips,
            &params,
            &mut self.rng,
        );
        self.archive.record(&self.solution, energy);
    }

    /// Fills the archive with local optima until their disagreements span a
    /// subproblem, then starts tabu from their population.
    fn init_solution_diversity(&mut self) {
        let n = self.qubo.size();
        let wanted = self.config.sub_size.min(n / 2);
        let mut pass = 0;
        self.seed_solution();
        while self.archive.diff_columns(0).len() < wanted {
            if pass > 0 {
                randomize(&mut self.rng, &mut self.solution);
            }
            local_search(
                self.qubo,
                &mut self.solution,
                &mut self.flip_cost,
                &mut self.bit_flips,
                &mut self.rng,
            );
            // The archive dedups on exact energy; incremental updates can drift.
            let energy = evaluate(self.qubo, &self.solution, &mut self.flip_cost);
            self.archive.record(&self.solution, energy);
            pass += 1;
            if pass > DIVERSITY_SEED_PASSES {
                break;
            }
        }
        debug!(
            "diversity seeding: {pass} passes, {} disputed columns",
            self.archive.diff_columns(0).len()
        );

        if !self.archive.is_empty() {
            self.solution = self.archive.population(POPULATION_BIAS);
        }
        let params = self.tabu_params((INITIAL_TABU_PASS_FACTOR * n as u64 / 2).max(40));
        let energy = self.tabu.run(
            self.qubo,
            &mut self.solution,
            &mut self.flip_cost,
            &mut self.bit_flips,
            &params,
            &mut self.rng,
        );
        self.archive.record(&self.solution, energy);
    }

    /// Solves every chunk of one partition pass, perturbing if almost nothing changed.
    fn partition_pass(&mut self) -> Result<(), SolveError> {
        let n = self.qubo.size();
        let sub = self.config.sub_size;
        let mut change = 0;

        let chunks = match self.config.algorithm {
            Algorithm::EnergyImpact => self.energy_impact_chunks(),
            Algorithm::SolutionDiversity => self.diversity_chunks(),
        };
        for chunk in &chunks {
            trace!("chunk {chunk:?}");
            change += reduce_solve_project(chunk, self.qubo, &mut self.solution, &mut *self.sampler, &mut self.rng)?;
            self.partition_calls += 1;
        }

        if change <= DEGENERATE_CHANGE {
            let perturbed = match self.config.algorithm {
                Algorithm::EnergyImpact => {
                    let covered = (chunks.len() * sub).min(n);
                    self.tabu.order()[..covered].to_vec()
                }
                Algorithm::SolutionDiversity => self.archive.diff_columns(0),
            };
            debug!("degenerate pass ({change} bits changed): perturbing {} bits", perturbed.len());
            flip_biased_by_index(&mut self.rng, &mut self.solution, &perturbed);
        } else {
            trace!("partition pass changed {change} bits");
        }
        Ok(())
    }

    /// Consecutive `sub_size` slices of the flip-cost ranking.
    fn energy_impact_chunks(&self) -> Vec<Vec<usize>> {
        let n = self.qubo.size();
        let sub = self.config.sub_size;
        let span = (sub + 1).max((SUB_MATRIX_SPAN * n as f64) as usize);
        let l_max = (n - sub).min(span);
        let order = self.tabu.order();

        (0..l_max)
            .step_by(sub)
            .map(|l| {
                let mut chunk = order[l..l + sub].to_vec();
                chunk.sort_unstable();
                chunk
            })
            .collect()
    }

    /// `sub_size` slices of the disputed columns, padded from the ranking when
    /// there are too few; the last slice backs up so every chunk is full.
    fn diversity_chunks(&self) -> Vec<Vec<usize>> {
        let n = self.qubo.size();
        let sub = self.config.sub_size;
        let mut backbone = self.archive.diff_columns(0);

        if backbone.len() < sub {
            let mut present = vec![false; n];
            for &i in &backbone {
                present[i] = true;
            }
            for &i in self.tabu.order() {
                if backbone.len() >= sub {
                    break;
                }
                if !present[i] {
                    present[i] = true;
                    backbone.push(i);
                }
            }
        }

        let len = backbone.len();
        (0..len)
            .step_by(sub)
            .map(|l| {
                let start = if l + sub > len { len - sub } else { l };
                let mut chunk = backbone[start..start + sub].to_vec();
                chunk.sort_unstable();
                chunk
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
