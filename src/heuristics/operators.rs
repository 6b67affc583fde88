//! Route operators.
//!
//! Stateless transformations used as mutations (GA) and neighbour moves
//! (SA, TS): swap, inversion, scramble, displacement, plus Order Crossover.
//! Every operator takes the route by reference and returns a new [`Route`],
//! so the caller's route is never modified.
//!
//! Window bounds are two independent draws in `[0, n)` sorted ascending.
//! Scramble, displacement and crossover use the half-open window
//! `[start, end)`; inversion reverses the inclusive window `[start, end]`.
//! Equal draws give a degenerate window and the move is a no-op.

use crate::solution::Route;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Mutation / neighbourhood operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationType {
    /// Swap the cities at two random positions
    Swap,
    /// Reverse a random segment
    Inversion,
    /// Shuffle a random segment
    Scramble,
    /// Cut a random segment and reinsert it elsewhere
    Displacement,
}

impl MutationType {
    pub const ALL: [MutationType; 4] = [
        MutationType::Swap,
        MutationType::Inversion,
        MutationType::Scramble,
        MutationType::Displacement,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MutationType::Swap => "swap",
            MutationType::Inversion => "inversion",
            MutationType::Scramble => "scramble",
            MutationType::Displacement => "displacement",
        }
    }

    /// Apply the operator to a copy of `route`
    pub fn apply<R: Rng + ?Sized>(&self, route: &Route, rng: &mut R) -> Route {
        if route.is_empty() {
            return route.clone();
        }
        let mut tour = route.as_slice().to_vec();
        match self {
            MutationType::Swap => swap(&mut tour, rng),
            MutationType::Inversion => invert(&mut tour, rng),
            MutationType::Scramble => scramble(&mut tour, rng),
            MutationType::Displacement => displace(&mut tour, rng),
        }
        Route::from_vec_unchecked(tour)
    }
}

impl std::fmt::Display for MutationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Two independent positions in `[0, n)`, sorted ascending
fn window<R: Rng + ?Sized>(n: usize, rng: &mut R) -> (usize, usize) {
    let a = rng.gen_range(0..n);
    let b = rng.gen_range(0..n);
    (a.min(b), a.max(b))
}

// Positions are drawn independently; equal draws leave the tour unchanged.
fn swap<R: Rng + ?Sized>(tour: &mut [usize], rng: &mut R) {
    let n = tour.len();
    let i = rng.gen_range(0..n);
    let j = rng.gen_range(0..n);
    tour.swap(i, j);
}

fn invert<R: Rng + ?Sized>(tour: &mut [usize], rng: &mut R) {
    let (start, end) = window(tour.len(), rng);
    tour[start..=end].reverse();
}

fn scramble<R: Rng + ?Sized>(tour: &mut [usize], rng: &mut R) {
    let (start, end) = window(tour.len(), rng);
    tour[start..end].shuffle(rng);
}

fn displace<R: Rng + ?Sized>(tour: &mut Vec<usize>, rng: &mut R) {
    let (start, end) = window(tour.len(), rng);
    let segment: Vec<usize> = tour.drain(start..end).collect();
    // end < n, so at least one city is left behind
    let insert_at = rng.gen_range(0..tour.len());
    let tail = tour.split_off(insert_at);
    tour.extend(segment);
    tour.extend(tail);
}

/// Order Crossover (OX)
///
/// Copies the window `[start, end)` of `parent1` into the child at the same
/// positions, then fills the remaining positions left to right with the
/// cities of `parent2` that are not yet in the child, in `parent2` order.
pub fn order_crossover<R: Rng + ?Sized>(parent1: &Route, parent2: &Route, rng: &mut R) -> Route {
    let n = parent1.len();
    debug_assert_eq!(n, parent2.len());
    if n == 0 {
        return parent1.clone();
    }

    let (start, end) = window(n, rng);
    Route::from_vec_unchecked(order_crossover_with_window(parent1, parent2, start, end))
}

fn order_crossover_with_window(parent1: &[usize], parent2: &[usize], start: usize, end: usize) -> Vec<usize> {
    let n = parent1.len();
    let mut child = vec![usize::MAX; n];
    let mut taken = vec![false; n];

    for i in start..end {
        child[i] = parent1[i];
        taken[parent1[i]] = true;
    }

    // Exactly n - (end - start) cities of parent2 are untaken, one per free slot
    let mut fill = parent2.iter().copied().filter(|&city| !taken[city]);
    for slot in child.iter_mut() {
        if *slot == usize::MAX {
            if let Some(city) = fill.next() {
                *slot = city;
            }
        }
    }

    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::is_permutation;
    use proptest::prelude::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_operators_do_not_touch_input() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let route = Route::identity(10);
        for op in MutationType::ALL {
            for _ in 0..50 {
                let out = op.apply(&route, &mut rng);
                assert!(is_permutation(&out), "{} broke the permutation", op);
            }
            assert_eq!(route, Route::identity(10));
        }
    }

    #[test]
    fn test_single_city_is_noop() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let route = Route::identity(1);
        for op in MutationType::ALL {
            assert_eq!(op.apply(&route, &mut rng), route);
        }
        let child = order_crossover(&route, &route, &mut rng);
        assert_eq!(child, route);
    }

    #[test]
    fn test_swap_allows_degenerate_draw() {
        // With two cities, half of the draws pick the same position twice.
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let route = Route::identity(2);
        let unchanged = (0..400)
            .filter(|_| MutationType::Swap.apply(&route, &mut rng) == route)
            .count();
        assert!(unchanged > 100 && unchanged < 300, "unchanged = {}", unchanged);
    }

    #[test]
    fn test_order_crossover_known_window() {
        let p1 = [0, 1, 2, 3, 4, 5, 6, 7];
        let p2 = [7, 6, 5, 4, 3, 2, 1, 0];
        let child = order_crossover_with_window(&p1, &p2, 2, 5);

        assert_eq!(&child[2..5], &[2, 3, 4]);
        assert_eq!(child, vec![7, 6, 2, 3, 4, 5, 1, 0]);
    }

    #[test]
    fn test_order_crossover_empty_window_copies_parent2() {
        let p1 = [0, 1, 2, 3];
        let p2 = [3, 1, 0, 2];
        assert_eq!(order_crossover_with_window(&p1, &p2, 2, 2), p2.to_vec());
    }

    #[test]
    fn test_mutation_type_serde_names() {
        let json = serde_json::to_string(&MutationType::Displacement).unwrap();
        assert_eq!(json, "\"displacement\"");
        let op: MutationType = serde_json::from_str("\"inversion\"").unwrap();
        assert_eq!(op, MutationType::Inversion);
    }

    fn permutation() -> impl Strategy<Value = Vec<usize>> {
        (1usize..60).prop_flat_map(|n| Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
    }

    fn parents() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
        (1usize..60).prop_flat_map(|n| {
            let base: Vec<usize> = (0..n).collect();
            (Just(base.clone()).prop_shuffle(), Just(base).prop_shuffle())
        })
    }

    proptest! {
        #[test]
        fn every_operator_preserves_the_permutation(tour in permutation(), seed in any::<u64>()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let route = Route::new(tour).unwrap();
            for op in MutationType::ALL {
                let out = op.apply(&route, &mut rng);
                prop_assert_eq!(out.len(), route.len());
                prop_assert!(is_permutation(&out));
            }
        }

        #[test]
        fn order_crossover_is_closed((p1, p2) in parents(), seed in any::<u64>()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let p1 = Route::new(p1).unwrap();
            let p2 = Route::new(p2).unwrap();
            let child = order_crossover(&p1, &p2, &mut rng);
            prop_assert_eq!(child.len(), p1.len());
            prop_assert!(is_permutation(&child));
        }

        #[test]
        fn order_crossover_keeps_parent1_window((p1, p2) in parents(), a in 0usize..60, b in 0usize..60) {
            let n = p1.len();
            let (start, end) = ((a % n).min(b % n), (a % n).max(b % n));
            let child = order_crossover_with_window(&p1, &p2, start, end);
            prop_assert_eq!(&child[start..end], &p1[start..end]);
            prop_assert!(is_permutation(&child));
        }
    }
}
