use clap::Parser;
use log::{LevelFilter, info};
use qbsolv::qubo_file::{FORMAT_HELP, QuboProblem, load_solution_file};
use qbsolv::report::{write_archive, write_solution_csv, write_summary};
use qbsolv::solver::{Algorithm, Solver, SolverConfig};
use qbsolv::validate::verify_result;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Decomposing solver for QUBO problems in `.qubo` format.
#[derive(Parser, Debug)]
#[command(name = "qbsolv", version)]
#[command(
    about = "Finds the bit vector minimizing (or maximizing) a QUBO by splitting it into subproblems",
    long_about = None
)]
struct Args {
    /// The `.qubo` file to solve
    #[arg(short, long, required_unless_present = "qubo_format")]
    input: Option<PathBuf>,

    /// Write results here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Find the maximum instead of the minimum
    #[arg(short, long)]
    max: bool,

    /// Stop as soon as this energy is reached
    #[arg(short = 'T', long)]
    target: Option<f64>,

    /// Wall-clock budget in seconds
    #[arg(short, long, default_value_t = 2_592_000.0)]
    timeout: f64,

    /// Outer passes without a new best before stopping
    #[arg(short = 'n', long, default_value_t = 50)]
    repeats: usize,

    /// Subproblem size (0 disables partitioning)
    #[arg(short = 'S', long, default_value_t = 47)]
    sub_size: usize,

    /// Fixed tabu tenure (default: derived from problem size)
    #[arg(short = 'l', long)]
    tabu_tenure: Option<usize>,

    /// RNG seed
    #[arg(short = 'r', long)]
    seed: Option<u64>,

    /// Partition algorithm: o (energy impact) or d (solution diversity)
    #[arg(short, long, default_value = "o")]
    algorithm: Algorithm,

    /// File whose first line of N 0/1 characters is the starting solution
    #[arg(short = 's', long)]
    initial_solution: Option<PathBuf>,

    /// Print the matrix and the best solution as CSV
    #[arg(short, long)]
    write_matrix: bool,

    /// Verbosity (-v info and every archived solution, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Describe the .qubo file format and exit
    #[arg(short, long)]
    qubo_format: bool,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let Some(input) = &args.input else {
        return Err("no input file (-i) given".into());
    };
    let problem = QuboProblem::load_from_file(input).map_err(|e| format!("{}: {e}", input.display()))?;
    let n = problem.max_nodes;
    info!(
        "{}: {n} variables, {} nodes, {} couplers, topology {}",
        input.display(),
        problem.nodes.len(),
        problem.couplers.len(),
        problem.topology
    );

    let initial_solution = match &args.initial_solution {
        Some(path) => Some(load_solution_file(path, n).map_err(|e| format!("{}: {e}", path.display()))?),
        None => None,
    };
    let timeout =
        Duration::try_from_secs_f64(args.timeout).map_err(|e| format!("invalid timeout {}: {e}", args.timeout))?;

    let config = SolverConfig {
        repeats: args.repeats,
        sub_size: args.sub_size,
        target: args.target,
        timeout,
        tabu_tenure: args.tabu_tenure,
        find_max: args.max,
        algorithm: args.algorithm,
        seed: args.seed,
        initial_solution,
        archive_capacity: None,
    };

    let qubo = problem.to_matrix(config.find_max);
    let result = Solver::new(config.clone()).solve(&qubo)?;
    verify_result(&qubo, &result, config.sign())?;
    info!(
        "{} after {} iterations, {} bit flips, {:.3}s",
        result.termination,
        result.outer_iterations,
        result.bit_flips,
        result.elapsed.as_secs_f64()
    );

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(|e| format!("{}: {e}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    if args.verbose > 0 {
        write_archive(&mut out, &result)?;
    }
    if args.write_matrix {
        write_solution_csv(&mut out, &qubo, result.best_solution(), config.sign())?;
    }
    write_summary(&mut out, &config, &result)?;
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.qubo_format {
        print!("{FORMAT_HELP}");
        return ExitCode::SUCCESS;
    }
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("qbsolv: {e}");
            ExitCode::FAILURE
        }
    }
}
