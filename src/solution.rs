//! Helpers for binary solution vectors: seeding, perturbation and validation.

use crate::error::SolveError;
use rand::Rng;

/// Uniformly random `0/1` vector of length `n`.
pub fn random_solution<R: Rng>(rng: &mut R, n: usize) -> Vec<u8> {
    (0..n).map(|_| u8::from(rng.random_bool(0.5))).collect()
}

/// Overwrites every bit of `solution` with a fresh coin flip.
pub fn randomize<R: Rng>(rng: &mut R, solution: &mut [u8]) {
    for bit in solution.iter_mut() {
        *bit = u8::from(rng.random_bool(0.5));
    }
}

/// Flip-biased perturbation of the bits at `indices`.
///
/// A set bit is cleared with probability 1/2; everything else ends up set. This
/// pushes a stuck region towards ones while still breaking it up.
pub fn flip_biased_by_index<R: Rng>(rng: &mut R, solution: &mut [u8], indices: &[usize]) {
    for &i in indices {
        solution[i] = if solution[i] == 1 && rng.random_bool(0.5) { 0 } else { 1 };
    }
}

/// Checks that every entry is `0` or `1`.
///
/// # Errors
/// Returns the first offending position.
pub fn check_binary(solution: &[u8]) -> Result<(), SolveError> {
    match solution.iter().position(|&v| v > 1) {
        Some(index) => Err(SolveError::NonBinaryValue {
            index,
            value: solution[index],
        }),
        None => Ok(()),
    }
}

/// Number of positions where `a` and `b` differ.
#[inline]
pub fn hamming_distance(a: &[u8], b: &[u8]) -> usize {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).filter(|(x, y)| x != y).count()
}

/// Renders a solution as a string of `0`/`1` characters.
pub fn to_bit_string(solution: &[u8]) -> String {
    solution.iter().map(|&b| if b == 1 { '1' } else { '0' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    #[test]
    fn random_solution_is_binary() {
        let mut rng = XorShiftRng::seed_from_u64(1);
        let s = random_solution(&mut rng, 500);
        assert_eq!(s.len(), 500);
        assert!(check_binary(&s).is_ok());
        let ones = s.iter().filter(|&&b| b == 1).count();
        assert!(ones > 150 && ones < 350, "coin flips should be roughly balanced, got {ones}");
    }

    #[test]
    fn flip_biased_only_touches_indexed_bits() {
        let mut rng = XorShiftRng::seed_from_u64(2);
        let mut s = vec![0u8; 10];
        flip_biased_by_index(&mut rng, &mut s, &[1, 4, 7]);
        assert_eq!(s, vec![0, 1, 0, 0, 1, 0, 0, 1, 0, 0], "zeros always become ones");

        let mut ones = vec![1u8; 200];
        let idx: Vec<usize> = (0..200).collect();
        flip_biased_by_index(&mut rng, &mut ones, &idx);
        let cleared = ones.iter().filter(|&&b| b == 0).count();
        assert!(cleared > 50 && cleared < 150);
    }

    #[test]
    fn check_binary_reports_position() {
        assert_eq!(
            check_binary(&[0, 1, 2, 1]),
            Err(SolveError::NonBinaryValue { index: 2, value: 2 })
        );
    }

    #[test]
    fn hamming_distance_to_self_is_zero() {
        let s = [1, 0, 1, 1];
        assert_eq!(hamming_distance(&s, &s), 0);
        assert_eq!(hamming_distance(&s, &[0, 0, 1, 0]), 2);
    }

    #[test]
    fn bit_string_rendering() {
        assert_eq!(to_bit_string(&[1, 0, 0, 1]), "1001");
    }
}
