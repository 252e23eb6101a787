//! Errors raised while setting up or running a solve.

use std::fmt;

/// Errors that abort a solve.
///
/// There is no partial-result recovery: any of these ends the run and the
/// caller receives no archive.
#[derive(Clone, Debug, PartialEq)]
pub enum SolveError {
    /// The problem has no variables.
    EmptyProblem,
    /// A matrix row has the wrong number of columns.
    NonSquareMatrix {
        /// Row index with the wrong length.
        row: usize,
        /// Expected length (number of rows).
        expected: usize,
        /// Actual length.
        got: usize,
    },
    /// A supplied solution vector does not match the problem size.
    InitialSolutionLength {
        /// Number of variables in the problem.
        expected: usize,
        /// Length of the supplied vector.
        got: usize,
    },
    /// A supplied solution vector contains something other than `0`/`1`.
    NonBinaryValue {
        /// Position of the offending entry.
        index: usize,
        /// The offending value.
        value: u8,
    },
    /// A sub-sampler returned a solution of the wrong length.
    SamplerContract {
        /// Name of the sampler that broke the contract.
        sampler: String,
        /// Size of the subproblem it was given.
        expected: usize,
        /// Length of the vector it returned.
        got: usize,
    },
    /// A sub-sampler returned a non-binary entry.
    SamplerNonBinary {
        /// Name of the sampler that broke the contract.
        sampler: String,
        /// Position of the offending entry in the sub-solution.
        index: usize,
        /// The offending value.
        value: u8,
    },
    /// The solution archive cannot hold any entries.
    InvalidArchiveCapacity,
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::EmptyProblem => write!(f, "QUBO has no variables"),
            SolveError::NonSquareMatrix { row, expected, got } => write!(
                f,
                "QUBO matrix is not square: row {row} has length {got}, expected {expected}"
            ),
            SolveError::InitialSolutionLength { expected, got } => write!(
                f,
                "initial solution has {got} entries, problem has {expected} variables"
            ),
            SolveError::NonBinaryValue { index, value } => {
                write!(f, "solution entry {index} is {value} (expected 0 or 1)")
            }
            SolveError::SamplerContract {
                sampler,
                expected,
                got,
            } => write!(
                f,
                "sub-sampler {sampler:?} returned {got} values for a subproblem of size {expected}"
            ),
            SolveError::SamplerNonBinary {
                sampler,
                index,
                value,
            } => write!(
                f,
                "sub-sampler {sampler:?} returned {value} at position {index} (expected 0 or 1)"
            ),
            SolveError::InvalidArchiveCapacity => {
                write!(f, "solution archive capacity must be at least 1")
            }
        }
    }
}

impl std::error::Error for SolveError {}
