//! Result output in the classic qbsolv layout.
//!
//! Everything here writes to a caller-supplied sink; diagnostics go through `log`.

use crate::matrix::QuboMatrix;
use crate::solution::to_bit_string;
use crate::solver::{SolveResult, SolverConfig};
use std::io::{self, Write};

/// The run options, e.g. `64 bits,  find Min, SubMatrix= 47, -a o, timeout= 2592000.0 sec`.
pub fn options_line(n: usize, config: &SolverConfig) -> String {
    let goal = if config.find_max { "Max" } else { "Min" };
    let mut line = format!(
        "{n} bits,  find {goal}, SubMatrix= {}, -a {},",
        config.sub_size, config.algorithm
    );
    if let Some(target) = config.target {
        line.push_str(&format!(" Target of {target:8.5},"));
    }
    line.push_str(&format!(" timeout={:9.1} sec", config.timeout.as_secs_f64()));
    line
}

/// Writes the summary for the best solution: options, bits, energy, call count, time.
///
/// # Errors
/// Propagates write errors.
pub fn write_summary<W: Write>(out: &mut W, config: &SolverConfig, result: &SolveResult) -> io::Result<()> {
    let best = result.best();
    writeln!(out, "{}", options_line(best.solution.len(), config))?;
    writeln!(out, "{}", to_bit_string(&best.solution))?;
    writeln!(out, "{:8.5} Energy of solution", best.energy)?;
    writeln!(
        out,
        "{} Number of Partitioned calls, {} output sample ",
        result.partition_calls,
        result.entries.len()
    )?;
    write!(out, "{:8.5} seconds of classic cpu time", result.elapsed.as_secs_f64())?;
    match config.target {
        Some(target) => writeln!(out, " ,Target of {target:8.5}"),
        None => writeln!(out),
    }
}

/// Writes every archived solution, worst first, with its distance from the best.
///
/// # Errors
/// Propagates write errors.
pub fn write_archive<W: Write>(out: &mut W, result: &SolveResult) -> io::Result<()> {
    writeln!(
        out,
        "delta energy  Energy of solution\tnfound\t i\t number of unique solutions {}",
        result.entries.len()
    )?;
    let top = result.best_energy();
    for (rank, entry) in result.entries.iter().enumerate().rev() {
        writeln!(
            out,
            "{:8.5} \t  {:8.5} \t {} \t {rank} \t{}",
            (top - entry.energy).abs(),
            entry.energy,
            entry.count,
            to_bit_string(&entry.solution)
        )?;
    }
    Ok(())
}

/// Writes the matrix next to `solution` as CSV, then the terms the solution activates.
///
/// `qubo` is the solved (maximizing) matrix; `sign` turns it back into the caller's sense.
///
/// # Errors
/// Propagates write errors.
pub fn write_solution_csv<W: Write>(
    out: &mut W,
    qubo: &QuboMatrix,
    solution: &[u8],
    sign: f64,
) -> io::Result<()> {
    write_csv_table(out, qubo, solution, |_, _, v| v * sign)?;
    write!(out, "  Values that have a Q of 1 ")?;
    write_csv_table(out, qubo, solution, |i, j, v| {
        if solution[i] == 1 && solution[j] == 1 { v * sign } else { 0.0 }
    })
}

fn write_csv_table<W: Write>(
    out: &mut W,
    qubo: &QuboMatrix,
    solution: &[u8],
    value: impl Fn(usize, usize, f64) -> f64,
) -> io::Result<()> {
    let n = qubo.size();
    write!(out, "ij, ")?;
    for i in 0..n {
        write!(out, ",{i}")?;
    }
    writeln!(out)?;
    write!(out, "Q,")?;
    for bit in solution {
        write!(out, ",{bit}")?;
    }
    writeln!(out)?;

    for i in 0..n {
        write!(out, "{i},{},", solution[i])?;
        for _ in 0..i {
            write!(out, ",")?;
        }
        for j in i..n {
            let v = value(i, j, qubo.get(i, j));
            if v == 0.0 {
                write!(out, ",")?;
            } else {
                write!(out, "{v:6.4},")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
