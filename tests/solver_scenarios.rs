//! End-to-end solver scenarios through the public API.

use approx::assert_abs_diff_eq;
use qbsolv::prelude::*;
use qbsolv::qubo_file::load_solution_file;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

fn seeded(seed: u64) -> SolverConfig {
    SolverConfig {
        seed: Some(seed),
        repeats: 10,
        find_max: true,
        ..SolverConfig::default()
    }
}

#[test]
fn diagonal_problem_matches_brute_force() {
    let q = QuboMatrix::from_entries(4, &[(0, 0, 1.5), (1, 1, -2.0), (2, 2, 0.25), (3, 3, -0.75)]);
    let (optimum, best) = brute_force(&q);
    assert_eq!(optimum, 1.75);

    let result = solve(&q, &seeded(1)).unwrap();
    assert_eq!(result.best_energy(), optimum);
    assert_eq!(result.best_solution(), best.as_slice());
    assert!(verify_result(&q, &result, 1.0).is_ok());
}

#[test]
fn minimization_of_a_parsed_file() {
    let text = "\
c triangle with a penalty on picking both ends
p qubo 0 3 3 2
0 0 -1
1 1 -1
2 2 -1
0 1 2
1 2 2
";
    let problem = parse_qubo(text).unwrap();
    let qubo = problem.to_matrix(false);
    let config = SolverConfig {
        find_max: false,
        ..seeded(4)
    };
    let result = solve(&qubo, &config).unwrap();
    assert_eq!(result.best_solution(), &[1, 0, 1]);
    assert_eq!(result.best_energy(), -2.0);
    assert!(verify_result(&qubo, &result, config.sign()).is_ok());
}

#[test]
fn target_met_by_seed_stops_before_the_outer_loop() {
    // Every bias is negative, so the given all-zero start is the optimum.
    let q = QuboMatrix::from_entries(3, &[(0, 0, -1.0), (1, 1, -1.0), (2, 2, -1.0)]);
    let config = SolverConfig {
        target: Some(0.0),
        initial_solution: Some(vec![0, 0, 0]),
        repeats: 1_000,
        ..seeded(2)
    };
    let result = solve(&q, &config).unwrap();
    assert_eq!(result.termination, Termination::TargetReached);
    assert_eq!(result.outer_iterations, 0);
    assert_eq!(result.best_energy(), 0.0);
}

#[test]
fn random_problem_reaches_brute_force_optimum_with_partitioning() {
    let mut rng = SmallRng::seed_from_u64(0xABCD);
    let q = QuboMatrix::random(&mut rng, 22, 0.4, 2.0);
    let (optimum, _) = brute_force(&q);
    let config = SolverConfig {
        sub_size: 10,
        ..seeded(5)
    };
    let result = solve(&q, &config).unwrap();
    assert!(result.partition_calls > 0);
    assert_abs_diff_eq!(result.best_energy(), optimum, epsilon = 1e-9);
    assert!(verify_result(&q, &result, 1.0).is_ok());
}

#[test]
fn external_sampler_is_called_for_every_partition() {
    let mut rng = SmallRng::seed_from_u64(8);
    let q = QuboMatrix::random(&mut rng, 60, 0.15, 1.0);
    let calls = Rc::new(Cell::new(0u64));
    let seen = Rc::clone(&calls);
    let mut inner = TabuSampler::new();
    let mut inner_rng = SmallRng::seed_from_u64(9);
    let sampler = ExternalSampler::new("wrapped-tabu", move |sub: &QuboMatrix, current: &[u8]| {
        seen.set(seen.get() + 1);
        assert!(sub.size() == 12);
        inner.sample(sub, current, &mut inner_rng)
    });
    let config = SolverConfig {
        sub_size: 12,
        repeats: 3,
        ..seeded(6)
    };

    let result = Solver::new(config).with_sampler(Box::new(sampler)).solve(&q).unwrap();
    assert!(result.partition_calls > 0);
    assert_eq!(calls.get(), result.partition_calls);
    assert!(verify_result(&q, &result, 1.0).is_ok());
}

#[test]
fn sampler_returning_wrong_size_aborts_the_solve() {
    let mut rng = SmallRng::seed_from_u64(10);
    let q = QuboMatrix::random(&mut rng, 40, 0.2, 1.0);
    let sampler = ExternalSampler::new("broken", |_: &QuboMatrix, current: &[u8]| current[1..].to_vec());
    let config = SolverConfig {
        sub_size: 10,
        ..seeded(7)
    };
    let err = Solver::new(config).with_sampler(Box::new(sampler)).solve(&q).unwrap_err();
    assert_eq!(
        err,
        SolveError::SamplerContract {
            sampler: "broken".to_string(),
            expected: 10,
            got: 9
        }
    );
    assert!(err.to_string().contains("broken"));
}

#[test]
fn zero_timeout_still_returns_the_initial_result() {
    let mut rng = SmallRng::seed_from_u64(12);
    let q = QuboMatrix::random(&mut rng, 30, 0.3, 1.0);
    let config = SolverConfig {
        timeout: Duration::ZERO,
        algorithm: Algorithm::SolutionDiversity,
        ..seeded(12)
    };
    let result = solve(&q, &config).unwrap();
    assert_eq!(result.termination, Termination::Timeout);
    assert_eq!(result.outer_iterations, 0);
    assert!(!result.entries.is_empty());
    assert!(verify_result(&q, &result, 1.0).is_ok());
}

#[test]
fn same_seed_same_answer() {
    let mut rng = SmallRng::seed_from_u64(13);
    let q = QuboMatrix::random(&mut rng, 35, 0.2, 1.0);
    let config = SolverConfig {
        sub_size: 12,
        repeats: 4,
        ..seeded(99)
    };
    let a = solve(&q, &config).unwrap();
    let b = solve(&q, &config).unwrap();
    assert_eq!(a.entries, b.entries);
    assert_eq!(a.bit_flips, b.bit_flips);
}

#[test]
fn initial_solution_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "c starting point").unwrap();
    writeln!(file, "0110").unwrap();
    let start = load_solution_file(file.path(), 4).unwrap();

    let q = QuboMatrix::from_entries(4, &[(0, 0, -1.0), (1, 1, 1.0), (2, 2, 1.0), (3, 3, -1.0), (1, 2, 1.0)]);
    let config = SolverConfig {
        initial_solution: Some(start),
        target: Some(3.0),
        ..seeded(3)
    };
    let result = solve(&q, &config).unwrap();
    assert_eq!(result.termination, Termination::TargetReached);
    assert_eq!(result.best_solution(), &[0, 1, 1, 0]);
}
