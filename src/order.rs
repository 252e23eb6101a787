//! Visitation order over variables, ranked by flip cost.

use rand::Rng;
use rand::seq::SliceRandom;
use std::cmp::Ordering;

/// Fills `order` with `0..n`, shuffles it, then stable-sorts by descending flip cost.
///
/// The shuffle randomizes the order among equal costs so repeated sweeps don't cycle.
pub fn sort_by_flip_cost<R: Rng>(order: &mut Vec<usize>, flip_cost: &[f64], rng: &mut R) {
    reset(order, flip_cost.len());
    order.shuffle(rng);
    order.sort_by(|&a, &b| descending(flip_cost[a], flip_cost[b]));
}

/// Like [`sort_by_flip_cost`] but without the shuffle; ties stay in index order.
pub fn resort_by_flip_cost(order: &mut Vec<usize>, flip_cost: &[f64]) {
    reset(order, flip_cost.len());
    order.sort_by(|&a, &b| descending(flip_cost[a], flip_cost[b]));
}

/// Returns `true` if `order` is a permutation ranked by non-increasing flip cost.
pub fn is_ranked(order: &[usize], flip_cost: &[f64]) -> bool {
    order.len() == flip_cost.len() && order.windows(2).all(|w| flip_cost[w[0]] >= flip_cost[w[1]])
}

#[inline]
fn reset(order: &mut Vec<usize>, n: usize) {
    order.clear();
    order.extend(0..n);
}

#[inline]
fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
