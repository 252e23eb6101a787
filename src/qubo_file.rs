//! Reading and writing the `.qubo` text format.
//!
//! ```text
//! c comment lines start with 'c'
//! p qubo <topology> <maxNodes> <nNodes> <nCouplers>
//! 0 0 3.4        node: i == j
//! 0 1 2.2        coupler: i < j
//! ```

use crate::matrix::QuboMatrix;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Description of the `.qubo` format, printed by `qbsolv -q`.
pub const FORMAT_HELP: &str = "\
A .qubo file describes an unconstrained quadratic binary optimization
problem. It is an ASCII file made of four kinds of lines:

1) Comments, with a 'c' in column 1. They may appear anywhere and are
   ignored.

2) One program line, starting with 'p'. It must be the first non-comment
   line and has six fields separated by spaces:

     p  qubo  topology  maxNodes  nNodes  nCouplers

   topology   a string naming the topology, \"0\" or \"unconstrained\"
              for unconstrained problems
   maxNodes   number of nodes in the topology; node numbers are in
              0..maxNodes
   nNodes     number of node (linear) lines that follow
   nCouplers  number of coupler (quadratic) lines that follow

3) nNodes node lines 'i i value': the node number twice and its weight.

4) nCouplers coupler lines 'i j value' with i < j: the two node numbers
   and the coupling strength.

Example with 4 nodes and 6 couplers:

  c  sample .qubo file
  p  qubo  0  4  4  6
  0  0   3.4
  1  1   4.5
  2  2   2.1
  3  3   -2.4
  0  1   2.2
  0  2   3.4
  1  2   4.5
  0  3   -2
  1  3   4.5678
  2  3   -3.22
";

// ============================================================================
// Errors
// ============================================================================

/// Errors while reading a `.qubo` file or a solution file.
#[derive(Clone, Debug, PartialEq)]
pub enum QuboParseError {
    /// No `p` line was found.
    MissingHeader,
    /// The `p` line doesn't have the six expected fields.
    InvalidHeader {
        /// 1-based line number.
        line: usize,
    },
    /// The `p` line names a problem type other than `qubo`.
    NotQubo {
        /// 1-based line number.
        line: usize,
        /// The problem type found.
        found: String,
    },
    /// A coupler line has `i > j`.
    CouplerOrder {
        /// 1-based line number.
        line: usize,
        /// First index.
        i: usize,
        /// Second index.
        j: usize,
    },
    /// An index is outside `0..maxNodes`.
    OutOfRange {
        /// 1-based line number.
        line: usize,
        /// First index.
        i: usize,
        /// Second index.
        j: usize,
        /// Declared number of nodes in the topology.
        max_nodes: usize,
    },
    /// More node lines than the header declared.
    TooManyNodes {
        /// 1-based line number.
        line: usize,
        /// Declared count.
        declared: usize,
    },
    /// More coupler lines than the header declared.
    TooManyCouplers {
        /// 1-based line number.
        line: usize,
        /// Declared count.
        declared: usize,
    },
    /// Fewer node lines than the header declared.
    TooFewNodes {
        /// Declared count.
        declared: usize,
        /// Lines found.
        found: usize,
    },
    /// Fewer coupler lines than the header declared.
    TooFewCouplers {
        /// Declared count.
        declared: usize,
        /// Lines found.
        found: usize,
    },
    /// A solution file has no line of `expected` `0`/`1` characters.
    NoSolutionLine {
        /// Number of variables.
        expected: usize,
    },
    /// An I/O error.
    Io(String),
}

impl fmt::Display for QuboParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "no 'p qubo' program line found"),
            Self::InvalidHeader { line } => write!(
                f,
                "line {line}: program line must be 'p qubo <topology> <maxNodes> <nNodes> <nCouplers>'"
            ),
            Self::NotQubo { line, found } => {
                write!(f, "line {line}: program line is not a qubo, it lists as '{found}'")
            }
            Self::CouplerOrder { line, i, j } => {
                write!(f, "line {line}: coupler indices must have i < j, got {i} > {j}")
            }
            Self::OutOfRange { line, i, j, max_nodes } => write!(
                f,
                "line {line}: coordinates ({i}, {j}) out of bounds (0 to {})",
                max_nodes.saturating_sub(1)
            ),
            Self::TooManyNodes { line, declared } => {
                write!(f, "line {line}: more than the {declared} declared nodes")
            }
            Self::TooManyCouplers { line, declared } => {
                write!(f, "line {line}: more than the {declared} declared couplers")
            }
            Self::TooFewNodes { declared, found } => {
                write!(f, "number of nodes too small: found {found}, declared {declared}")
            }
            Self::TooFewCouplers { declared, found } => {
                write!(f, "number of couplers too small: found {found}, declared {declared}")
            }
            Self::NoSolutionLine { expected } => {
                write!(f, "no line of {expected} '0'/'1' characters found")
            }
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for QuboParseError {}

// ============================================================================
// Parsed problem
// ============================================================================

/// A parsed `.qubo` file.
#[derive(Clone, Debug, PartialEq)]
pub struct QuboProblem {
    /// Topology tag from the program line.
    pub topology: String,
    /// Number of variables.
    pub max_nodes: usize,
    /// Linear terms `(i, value)`.
    pub nodes: Vec<(usize, f64)>,
    /// Quadratic terms `(i, j, value)` with `i < j`.
    pub couplers: Vec<(usize, usize, f64)>,
}

impl QuboProblem {
    /// Builds the dense matrix the solver maximizes.
    ///
    /// Minimization problems (`find_max == false`) are negated. A repeated entry
    /// overwrites the earlier one.
    pub fn to_matrix(&self, find_max: bool) -> QuboMatrix {
        let sign = if find_max { 1.0 } else { -1.0 };
        let mut m = QuboMatrix::zeros(self.max_nodes);
        for &(i, value) in &self.nodes {
            m.set(i, i, sign * value);
        }
        for &(i, j, value) in &self.couplers {
            m.set(i, j, sign * value);
        }
        m
    }

    /// Loads and parses a `.qubo` file.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or isn't valid.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, QuboParseError> {
        let text = fs::read_to_string(path).map_err(|e| QuboParseError::Io(e.to_string()))?;
        parse_qubo(&text)
    }
}

fn parse_header(line_no: usize, line: &str) -> Result<(String, usize, usize, usize), QuboParseError> {
    let mut fields = line.split_whitespace().skip(1);
    let kind = fields.next().ok_or(QuboParseError::InvalidHeader { line: line_no })?;
    if !kind.starts_with("qubo") {
        return Err(QuboParseError::NotQubo {
            line: line_no,
            found: kind.to_string(),
        });
    }
    let invalid = || QuboParseError::InvalidHeader { line: line_no };
    let topology = fields.next().ok_or_else(invalid)?.to_string();
    let mut count = || -> Result<usize, QuboParseError> {
        fields.next().and_then(|s| s.parse().ok()).ok_or_else(invalid)
    };
    let max_nodes = count()?;
    let n_nodes = count()?;
    let n_couplers = count()?;
    Ok((topology, max_nodes, n_nodes, n_couplers))
}

fn parse_entry(line: &str) -> Option<(usize, usize, f64)> {
    let mut fields = line.split_whitespace();
    let i = fields.next()?.parse().ok()?;
    let j = fields.next()?.parse().ok()?;
    let value = fields.next()?.parse().ok()?;
    Some((i, j, value))
}

/// Parses `.qubo` text.
///
/// Lines before the program line that aren't comments are skipped, as are lines
/// after it that don't start with `i j value`.
///
/// # Errors
/// See [`QuboParseError`].
pub fn parse_qubo(text: &str) -> Result<QuboProblem, QuboParseError> {
    let mut topology = String::new();
    let mut counts: Option<(usize, usize, usize)> = None;
    let mut nodes = Vec::new();
    let mut couplers = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.starts_with(['c', 'C']) {
            continue;
        }
        let Some((max_nodes, n_nodes, n_couplers)) = counts else {
            if line.starts_with(['p', 'P']) {
                let (tag, max_nodes, n_nodes, n_couplers) = parse_header(line_no, line)?;
                topology = tag;
                counts = Some((max_nodes, n_nodes, n_couplers));
            }
            continue;
        };
        let Some((i, j, value)) = parse_entry(line) else {
            continue;
        };

        if i == j {
            if nodes.len() >= n_nodes {
                return Err(QuboParseError::TooManyNodes {
                    line: line_no,
                    declared: n_nodes,
                });
            }
        } else {
            if i > j {
                return Err(QuboParseError::CouplerOrder { line: line_no, i, j });
            }
            if couplers.len() >= n_couplers {
                return Err(QuboParseError::TooManyCouplers {
                    line: line_no,
                    declared: n_couplers,
                });
            }
        }
        if i >= max_nodes || j >= max_nodes {
            return Err(QuboParseError::OutOfRange {
                line: line_no,
                i,
                j,
                max_nodes,
            });
        }
        if i == j {
            nodes.push((i, value));
        } else {
            couplers.push((i, j, value));
        }
    }

    let (max_nodes, n_nodes, n_couplers) = counts.ok_or(QuboParseError::MissingHeader)?;
    if couplers.len() != n_couplers {
        return Err(QuboParseError::TooFewCouplers {
            declared: n_couplers,
            found: couplers.len(),
        });
    }
    if nodes.len() != n_nodes {
        return Err(QuboParseError::TooFewNodes {
            declared: n_nodes,
            found: nodes.len(),
        });
    }
    Ok(QuboProblem {
        topology,
        max_nodes,
        nodes,
        couplers,
    })
}

// ============================================================================
// Writing
// ============================================================================

/// Writes the non-zero upper-triangular entries of `qubo` in `.qubo` format.
///
/// # Errors
/// Propagates write errors.
pub fn write_qubo<W: Write>(qubo: &QuboMatrix, out: &mut W) -> io::Result<()> {
    let n = qubo.size();
    let (nodes, couplers) = qubo.nonzero_counts();
    writeln!(out, "p qubo 0 {n} {nodes} {couplers}")?;
    for i in 0..n {
        let v = qubo.diagonal(i);
        if v != 0.0 {
            writeln!(out, "{i} {i} {v:.6}")?;
        }
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let v = qubo.get(i, j);
            if v != 0.0 {
                writeln!(out, "{i} {j} {v:.6}")?;
            }
        }
    }
    Ok(())
}

// ============================================================================
// Solution files
// ============================================================================

/// Finds the first line made only of `n` `0`/`1` characters.
///
/// # Errors
/// Returns [`QuboParseError::NoSolutionLine`] if there is none.
pub fn parse_solution(text: &str, n: usize) -> Result<Vec<u8>, QuboParseError> {
    text.lines()
        .map(str::trim)
        .find(|l| l.len() == n && l.bytes().all(|b| b == b'0' || b == b'1'))
        .map(|l| l.bytes().map(|b| b - b'0').collect())
        .ok_or(QuboParseError::NoSolutionLine { expected: n })
}

/// Reads a starting solution for `n` variables from a file.
///
/// # Errors
/// Returns an error if the file can't be read or holds no matching line.
pub fn load_solution_file(path: impl AsRef<Path>, n: usize) -> Result<Vec<u8>, QuboParseError> {
    let text = fs::read_to_string(path).map_err(|e| QuboParseError::Io(e.to_string()))?;
    parse_solution(&text, n)
}
