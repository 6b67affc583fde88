//! Construction heuristics for initial tours.

use crate::instance::DistanceMatrix;
use crate::solution::Route;
use ordered_float::OrderedFloat;
use rand::prelude::*;

pub trait ConstructionHeuristic {
    fn construct<R: Rng + ?Sized>(&self, matrix: &DistanceMatrix, rng: &mut R) -> Route;
    fn name(&self) -> &str;
}

/// Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly visiting the nearest unvisited city.
/// Ties go to the lowest city index.
#[derive(Debug, Clone, Copy)]
pub struct NearestNeighborHeuristic {
    /// Fixed start city; `None` starts from a random city.
    /// Must be below the city count; release builds clamp it to the last city.
    pub start: Option<usize>,
}

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic { start: Some(0) }
    }

    pub fn from_city(start: usize) -> Self {
        NearestNeighborHeuristic { start: Some(start) }
    }

    pub fn random_start() -> Self {
        NearestNeighborHeuristic { start: None }
    }

    fn find_nearest(&self, matrix: &DistanceMatrix, current: usize, visited: &[bool]) -> Option<usize> {
        matrix
            .row(current)
            .iter()
            .enumerate()
            .filter(|&(city, _)| !visited[city])
            .min_by_key(|&(_, &d)| OrderedFloat(d))
            .map(|(city, _)| city)
    }
}

impl Default for NearestNeighborHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct<R: Rng + ?Sized>(&self, matrix: &DistanceMatrix, rng: &mut R) -> Route {
        let n = matrix.len();
        if n == 0 {
            return Route::identity(0);
        }

        let start = match self.start {
            Some(city) => {
                debug_assert!(city < n, "start city {} out of range for {} cities", city, n);
                city.min(n - 1)
            }
            None => rng.gen_range(0..n),
        };

        let mut tour = Vec::with_capacity(n);
        let mut visited = vec![false; n];
        tour.push(start);
        visited[start] = true;

        let mut current = start;
        while let Some(next) = self.find_nearest(matrix, current, &visited) {
            tour.push(next);
            visited[next] = true;
            current = next;
        }

        Route::from_vec_unchecked(tour)
    }

    fn name(&self) -> &str {
        match self.start {
            Some(_) => "NearestNeighbor",
            None => "NearestNeighbor-RandomStart",
        }
    }
}

/// Uniformly random tour
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTour;

impl ConstructionHeuristic for RandomTour {
    fn construct<R: Rng + ?Sized>(&self, matrix: &DistanceMatrix, rng: &mut R) -> Route {
        Route::random(matrix.len(), rng)
    }

    fn name(&self) -> &str {
        "Random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Point;
    use crate::solution::is_permutation;
    use rand_chacha::ChaCha8Rng;

    fn line_matrix() -> DistanceMatrix {
        let points: Vec<Point> = [0.0, 5.0, 1.0, 3.0, 10.0]
            .iter()
            .map(|&x| Point::new(x, 0.0))
            .collect();
        DistanceMatrix::from_points(&points).unwrap()
    }

    #[test]
    fn test_nearest_neighbor_fixed_start() {
        let matrix = line_matrix();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let route = NearestNeighborHeuristic::new().construct(&matrix, &mut rng);

        // x: 0 -> 1 -> 3 -> 5 -> 10
        assert_eq!(route.as_slice(), &[0, 2, 3, 1, 4]);
    }

    #[test]
    fn test_nearest_neighbor_random_start_is_permutation() {
        let matrix = line_matrix();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let heuristic = NearestNeighborHeuristic::random_start();
        for _ in 0..20 {
            let route = heuristic.construct(&matrix, &mut rng);
            assert_eq!(route.len(), 5);
            assert!(is_permutation(&route));
        }
    }

    #[test]
    fn test_nearest_neighbor_single_city() {
        let matrix = DistanceMatrix::from_points(&[Point::new(1.0, 1.0)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let route = NearestNeighborHeuristic::from_city(0).construct(&matrix, &mut rng);
        assert_eq!(route.as_slice(), &[0]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn test_nearest_neighbor_start_out_of_range() {
        let matrix = line_matrix();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        NearestNeighborHeuristic::from_city(5).construct(&matrix, &mut rng);
    }

    #[test]
    fn test_random_tour() {
        let matrix = line_matrix();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let route = RandomTour.construct(&matrix, &mut rng);
        assert!(is_permutation(&route));
        assert_eq!(RandomTour.name(), "Random");
    }
}
