//! # qbsolv
//!
//! A decomposing solver for large QUBO (quadratic unconstrained binary
//! optimization) problems.
//!
//! This crate provides:
//! - A dense QUBO energy model with **incremental** O(N) flip-cost maintenance.
//! - Greedy local search and a tabu search with adaptive budget and cycle detection.
//! - Subproblem extraction that clamps the rest of the solution into the diagonal,
//!   so any sub-sampler (the built-in tabu search or an external one) can work on a
//!   small piece of a large problem.
//! - An outer decomposition loop driven by a bounded archive of distinct solutions.
//!
//! ## Quick Start
//!
//! ```
//! use qbsolv::prelude::*;
//!
//! // Maximize 2a + 2ab + 3b: every bit set.
//! let q = QuboMatrix::from_entries(2, &[(0, 0, 2.0), (0, 1, 2.0), (1, 1, 3.0)]);
//! let config = SolverConfig {
//!     find_max: true,
//!     seed: Some(7),
//!     repeats: 5,
//!     ..Default::default()
//! };
//! let result = solve(&q, &config).unwrap();
//! assert_eq!(result.best_solution(), &[1, 1]);
//! assert_eq!(result.best_energy(), 7.0);
//! ```
//!
//! ## Minimizing
//!
//! The solver always maximizes. Negate a minimization problem before solving and
//! leave `find_max` unset; reported energies come back in the original sense.
//!
//! ```
//! use qbsolv::prelude::*;
//!
//! let q = QuboMatrix::from_entries(2, &[(0, 0, 1.0), (1, 1, -2.0), (0, 1, 3.0)]);
//! let config = SolverConfig { seed: Some(1), repeats: 5, ..Default::default() };
//! let result = solve(&q.negated(), &config).unwrap();
//! assert_eq!(result.best_energy(), -2.0);
//! ```
//!
//! ## External Sub-samplers
//!
//! ```
//! use qbsolv::prelude::*;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::SmallRng::seed_from_u64(3);
//! let q = QuboMatrix::random(&mut rng, 64, 0.1, 1.0);
//! // Stand-in for an annealer: returns the subproblem's current solution unchanged.
//! let sampler = ExternalSampler::new("identity", |_: &QuboMatrix, current: &[u8]| current.to_vec());
//! let config = SolverConfig { sub_size: 16, repeats: 2, seed: Some(3), find_max: true, ..Default::default() };
//! let result = Solver::new(config).with_sampler(Box::new(sampler)).solve(&q).unwrap();
//! assert!(result.partition_calls > 0);
//! ```
//!
//! ## Modules
//!
//! - [`matrix`]: Dense upper-triangular QUBO storage.
//! - [`energy`]: Full and incremental energy / flip-cost evaluation.
//! - [`order`], [`local`], [`tabu`]: Variable ranking, hill climbing and tabu search.
//! - [`reduce`], [`sampler`]: Subproblem extraction and sub-sampler dispatch.
//! - [`archive`]: Bounded store of distinct solutions.
//! - [`solver`]: The outer decomposition loop.
//! - [`qubo_file`], [`report`]: `.qubo` file I/O and result output.
//! - [`validate`]: Brute force for small problems and result re-verification.
//!
//! ## Performance Notes
//!
//! - The matrix is dense: memory is N² `f64`s.
//! - Full evaluation is O(N²) and runs rows in parallel for large N; every single
//!   flip after that is O(N).
//! - For maximum performance, compile with: `RUSTFLAGS="-C target-cpu=native" cargo build --release`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::inline_always)] // Intentional for hot-path code
#![allow(clippy::many_single_char_names)] // Mathematical variable names
#![allow(clippy::needless_range_loop)] // Often clearer for matrix indexing
#![allow(clippy::doc_markdown)]
#![allow(clippy::float_cmp)] // Exact energy ties are meaningful in the archive
#![allow(clippy::multiple_crate_versions)] // Cargo.lock management is external

pub mod archive;
pub mod energy;
pub mod error;
pub mod local;
pub mod matrix;
pub mod order;
pub mod qubo_file;
pub mod reduce;
pub mod report;
pub mod sampler;
pub mod solution;
pub mod solver;
pub mod tabu;
pub mod validate;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::archive::{ArchiveEntry, RecordCode, RecordOutcome, SolutionArchive};
    pub use crate::energy::{evaluate, evaluate_1bit, simple_evaluate};
    pub use crate::error::SolveError;
    pub use crate::matrix::QuboMatrix;
    pub use crate::qubo_file::{QuboParseError, QuboProblem, parse_qubo, write_qubo};
    pub use crate::sampler::{ExternalSampler, SubSampler, TabuSampler};
    pub use crate::solver::{Algorithm, SolveResult, Solver, SolverConfig, Termination, solve};
    pub use crate::validate::{brute_force, verify_result};
}
