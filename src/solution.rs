//! Route and solution representation.
//!
//! A [`Route`] is an open permutation of `[0, n)`; the closing edge back to
//! the first city is implied. A [`Solution`] is what every strategy returns:
//! the closed best route, its length and the progress trace of the run.

use crate::error::{Result, TspError};
use crate::instance::DistanceMatrix;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Ordered visit sequence containing each city index exactly once
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Route(Vec<usize>);

impl Route {
    /// Validate and wrap a permutation of `[0, tour.len())`
    pub fn new(tour: Vec<usize>) -> Result<Self> {
        if !is_permutation(&tour) {
            return Err(TspError::InvalidRoute(format!(
                "{:?} is not a permutation of 0..{}", tour, tour.len()
            )));
        }
        Ok(Route(tour))
    }

    /// Validate a route against a matrix of `dimension` cities
    pub fn for_matrix(tour: Vec<usize>, matrix: &DistanceMatrix) -> Result<Self> {
        if tour.len() != matrix.len() {
            return Err(TspError::InvalidRoute(format!(
                "route visits {} cities, matrix has {}", tour.len(), matrix.len()
            )));
        }
        Route::new(tour)
    }

    /// Operators build their output from a valid input, so they skip the check
    pub(crate) fn from_vec_unchecked(tour: Vec<usize>) -> Self {
        debug_assert!(is_permutation(&tour));
        Route(tour)
    }

    /// `[0, 1, ..., n-1]`
    pub fn identity(n: usize) -> Self {
        Route((0..n).collect())
    }

    /// Uniformly random permutation of `n` cities
    pub fn random<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let mut tour: Vec<usize> = (0..n).collect();
        tour.shuffle(rng);
        Route(tour)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }

    /// Route with the start city repeated at the end
    pub fn closed(&self) -> Vec<usize> {
        let mut tour = self.0.clone();
        if let Some(&first) = tour.first() {
            tour.push(first);
        }
        tour
    }

    /// Closed tour length under the given matrix
    pub fn length(&self, matrix: &DistanceMatrix) -> f64 {
        matrix.tour_length(&self.0)
    }
}

impl TryFrom<Vec<usize>> for Route {
    type Error = TspError;

    fn try_from(tour: Vec<usize>) -> Result<Self> {
        Route::new(tour)
    }
}

impl From<Route> for Vec<usize> {
    fn from(route: Route) -> Self {
        route.0
    }
}

impl std::ops::Deref for Route {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

/// Check that `tour` holds every index of `[0, tour.len())` exactly once
pub fn is_permutation(tour: &[usize]) -> bool {
    let mut seen = vec![false; tour.len()];
    for &city in tour {
        if city >= tour.len() || seen[city] {
            return false;
        }
        seen[city] = true;
    }
    true
}

/// Result of one strategy run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Best tour, with the start city repeated at the end
    pub route: Vec<usize>,
    /// Length of the best tour
    pub distance: f64,
    /// Best distance found so far, one entry per iteration/stage/generation
    pub progress: Vec<f64>,
    /// Number of iterations, stages or generations executed
    pub iterations: usize,
    /// Computation time in seconds
    pub computation_time: f64,
}

impl Solution {
    /// Create a solution from the best route of a run
    pub fn from_route(matrix: &DistanceMatrix, route: &Route, progress: Vec<f64>, algorithm: &str) -> Self {
        Solution {
            algorithm: algorithm.to_string(),
            route: route.closed(),
            distance: route.length(matrix),
            iterations: progress.len(),
            progress,
            computation_time: 0.0,
        }
    }

    /// The route without the repeated start city
    pub fn open_route(&self) -> &[usize] {
        match self.route.len() {
            0 => &self.route,
            len => &self.route[..len - 1],
        }
    }

    /// Check that the route visits all `n` cities once and closes on its start
    pub fn is_complete(&self, n: usize) -> bool {
        self.route.len() == n + 1
            && self.route.first() == self.route.last()
            && is_permutation(self.open_route())
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Distance: {:.2}", self.distance)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        let tour: Vec<String> = self.route.iter().map(|c| c.to_string()).collect();
        writeln!(f, "  Tour: {}", tour.join(" -> "))
    }
}
