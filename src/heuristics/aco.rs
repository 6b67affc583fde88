//! Ant Colony Optimization for the TSP.
//!
//! One ant per city walks a full tour each generation, choosing the next city
//! with probability proportional to `pheromone^alpha * (1/d)^beta`. After all
//! ants finish, the pheromone matrix evaporates by `(1 - rho)` and every ant
//! deposits `q / length` on each edge of its closed tour, in both directions.

use crate::error::{Result, TspError};
use crate::instance::DistanceMatrix;
use crate::solution::{Route, Solution};
use log::{debug, info};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// ACO configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ACOConfig {
    /// Pheromone importance (alpha)
    pub alpha: f64,
    /// Heuristic importance (beta)
    pub beta: f64,
    /// Evaporation rate (rho)
    pub rho: f64,
    /// Pheromone deposit factor
    pub q_constant: f64,
    /// Number of generations
    pub num_generations: usize,
    /// Initial pheromone level
    pub initial_pheromone: f64,
    /// Build the ants' tours with rayon
    pub parallel: bool,
    /// Random seed
    pub seed: u64,
}

impl Default for ACOConfig {
    fn default() -> Self {
        ACOConfig {
            alpha: 1.0,
            beta: 2.0,
            rho: 0.5,
            q_constant: 100.0,
            num_generations: 100,
            initial_pheromone: 1.0,
            parallel: false,
            seed: 42,
        }
    }
}

impl ACOConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha.is_finite() && self.alpha >= 0.0) || !(self.beta.is_finite() && self.beta >= 0.0) {
            return Err(TspError::config("alpha and beta must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.rho) {
            return Err(TspError::config(format!("rho must lie in [0, 1], got {}", self.rho)));
        }
        if !(self.q_constant.is_finite() && self.q_constant > 0.0) {
            return Err(TspError::config("q_constant must be positive"));
        }
        if !(self.initial_pheromone.is_finite() && self.initial_pheromone > 0.0) {
            return Err(TspError::config("initial_pheromone must be positive"));
        }
        if self.num_generations == 0 {
            return Err(TspError::config("num_generations must be positive"));
        }
        Ok(())
    }
}

/// Ant Colony Optimization solver
pub struct AntColonyOptimization<'a> {
    config: ACOConfig,
    matrix: &'a DistanceMatrix,
    pheromone: Vec<Vec<f64>>,
    heuristic: Vec<Vec<f64>>,
    best_tour: Option<Route>,
    best_cost: f64,
    rng: ChaCha8Rng,
}

impl<'a> AntColonyOptimization<'a> {
    pub fn new(matrix: &'a DistanceMatrix, config: ACOConfig) -> Result<Self> {
        config.validate()?;
        let n = matrix.len();

        // Initialize pheromone matrix
        let pheromone = vec![vec![config.initial_pheromone; n]; n];

        // Initialize heuristic information (inverse distance)
        let mut heuristic = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let dist = matrix.distance(i, j);
                    heuristic[i][j] = if dist > 0.0 { 1.0 / dist } else { 1e6 };
                }
            }
        }

        let rng = ChaCha8Rng::seed_from_u64(config.seed);

        Ok(AntColonyOptimization {
            config,
            matrix,
            pheromone,
            heuristic,
            best_tour: None,
            best_cost: f64::INFINITY,
            rng,
        })
    }

    /// Current pheromone levels
    pub fn pheromone(&self) -> &[Vec<f64>] {
        &self.pheromone
    }

    /// Tour of one ant starting at `start`
    fn construct_tour<R: Rng + ?Sized>(&self, start: usize, rng: &mut R) -> Route {
        let n = self.matrix.len();
        let mut tour = Vec::with_capacity(n);
        let mut visited = vec![false; n];
        tour.push(start);
        visited[start] = true;

        let mut current = start;
        while tour.len() < n {
            let next = self.select_next_city(current, &visited, rng);
            tour.push(next);
            visited[next] = true;
            current = next;
        }

        Route::from_vec_unchecked(tour)
    }

    /// Roulette wheel over the unvisited cities
    fn select_next_city<R: Rng + ?Sized>(&self, current: usize, visited: &[bool], rng: &mut R) -> usize {
        let candidates: Vec<(usize, f64)> = (0..visited.len())
            .filter(|&j| !visited[j])
            .map(|j| {
                let tau = self.pheromone[current][j].powf(self.config.alpha);
                let eta = self.heuristic[current][j].powf(self.config.beta);
                (j, tau * eta)
            })
            .collect();

        let total: f64 = candidates.iter().map(|&(_, w)| w).sum();
        if !(total.is_finite() && total > 0.0) {
            // Pheromone fully evaporated or overflowed: pick uniformly
            return candidates[rng.gen_range(0..candidates.len())].0;
        }

        let mut pick = rng.gen::<f64>() * total;
        for &(j, weight) in &candidates {
            pick -= weight;
            if pick <= 0.0 {
                return j;
            }
        }

        candidates[candidates.len() - 1].0
    }

    /// Evaporate, then let every ant deposit on its closed tour
    fn update_pheromone(&mut self, tours: &[(Route, f64)]) {
        let evaporation = 1.0 - self.config.rho;
        for row in self.pheromone.iter_mut() {
            for tau in row.iter_mut() {
                *tau *= evaporation;
            }
        }

        for (tour, cost) in tours {
            if *cost <= 0.0 {
                continue;
            }
            let delta = self.config.q_constant / cost;
            let m = tour.len();
            for i in 0..m {
                let from = tour[i];
                let to = tour[(i + 1) % m];
                if from == to {
                    continue;
                }
                self.pheromone[from][to] += delta;
                self.pheromone[to][from] += delta;
            }
        }
    }

    /// Run ACO algorithm
    pub fn run(&mut self) -> Solution {
        let start = std::time::Instant::now();
        let n = self.matrix.len();
        let mut progress = Vec::with_capacity(self.config.num_generations);

        for row in self.pheromone.iter_mut() {
            row.fill(self.config.initial_pheromone);
        }
        self.best_tour = None;
        self.best_cost = f64::INFINITY;

        info!(
            "[ACO] Start: {} cities, {} ants, {} generations",
            n, n, self.config.num_generations
        );

        for generation in 0..self.config.num_generations {
            // Seeds are drawn up front so both modes see the same streams
            let seeds: Vec<u64> = (0..n).map(|_| self.rng.gen()).collect();

            let colony = &*self;
            let build = |(ant, seed): (usize, u64)| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let tour = colony.construct_tour(ant, &mut rng);
                let cost = tour.length(colony.matrix);
                (tour, cost)
            };
            let tours: Vec<(Route, f64)> = if self.config.parallel {
                seeds.into_par_iter().enumerate().map(build).collect()
            } else {
                seeds.into_iter().enumerate().map(build).collect()
            };

            if let Some((tour, cost)) = tours.iter().min_by(|a, b| a.1.total_cmp(&b.1)) {
                if *cost < self.best_cost {
                    self.best_cost = *cost;
                    self.best_tour = Some(tour.clone());
                }
            }

            self.update_pheromone(&tours);
            progress.push(self.best_cost);

            debug!("[ACO] Gen {}  Best {:.3}", generation, self.best_cost);
        }

        let best_tour = self.best_tour.clone().unwrap_or_else(|| Route::identity(n));
        let mut solution = Solution::from_route(self.matrix, &best_tour, progress, "AntColonyOptimization");
        solution.computation_time = start.elapsed().as_secs_f64();

        info!(
            "[ACO] Done: best {:.3} after {} generations, {:.2}s",
            solution.distance, self.config.num_generations, solution.computation_time
        );

        solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Point;

    fn random_matrix(n: usize, seed: u64) -> DistanceMatrix {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let points: Vec<Point> = (0..n)
            .map(|_| Point::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)))
            .collect();
        DistanceMatrix::from_points(&points).unwrap()
    }

    #[test]
    fn test_aco() {
        let matrix = random_matrix(12, 1);
        let config = ACOConfig { num_generations: 20, ..Default::default() };

        let mut aco = AntColonyOptimization::new(&matrix, config).unwrap();
        let solution = aco.run();

        assert!(solution.is_complete(12));
        assert_eq!(solution.progress.len(), 20);
        assert!(solution.progress.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_invalid_configurations() {
        let matrix = random_matrix(5, 0);
        let invalid = [
            ACOConfig { rho: 1.5, ..Default::default() },
            ACOConfig { alpha: -1.0, ..Default::default() },
            ACOConfig { q_constant: 0.0, ..Default::default() },
            ACOConfig { initial_pheromone: 0.0, ..Default::default() },
            ACOConfig { num_generations: 0, ..Default::default() },
        ];
        for config in invalid {
            assert!(matches!(AntColonyOptimization::new(&matrix, config), Err(TspError::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn test_pheromone_stays_non_negative_and_symmetric() {
        let matrix = random_matrix(10, 2);
        for rho in [0.0, 0.3, 1.0] {
            let config = ACOConfig { rho, num_generations: 15, ..Default::default() };
            let mut aco = AntColonyOptimization::new(&matrix, config).unwrap();
            aco.run();

            let pheromone = aco.pheromone();
            for i in 0..10 {
                for j in 0..10 {
                    assert!(pheromone[i][j] >= 0.0);
                    assert!((pheromone[i][j] - pheromone[j][i]).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_single_update_matches_formula() {
        let matrix = DistanceMatrix::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 4.0),
        ])
        .unwrap();
        let config = ACOConfig { rho: 0.5, q_constant: 12.0, num_generations: 1, ..Default::default() };
        let mut aco = AntColonyOptimization::new(&matrix, config).unwrap();
        aco.run();

        // Every tour of a triangle uses all three edges; 3 ants deposit 12/12 each
        let expected = 0.5 * 1.0 + 3.0 * (12.0 / 12.0);
        assert!((aco.pheromone()[0][1] - expected).abs() < 1e-12);
        assert!((aco.pheromone()[1][2] - expected).abs() < 1e-12);
        assert!((aco.pheromone()[0][0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_run_starts_from_fresh_colony() {
        let matrix = DistanceMatrix::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 4.0),
        ])
        .unwrap();
        let config = ACOConfig { rho: 0.5, q_constant: 12.0, num_generations: 1, ..Default::default() };
        let mut aco = AntColonyOptimization::new(&matrix, config).unwrap();
        aco.run();

        // Leftovers from an earlier run must not leak into the next one
        aco.pheromone[0][1] = 1e9;
        aco.best_cost = -1.0;
        aco.best_tour = Some(Route::identity(3));

        let solution = aco.run();
        let expected = 0.5 * 1.0 + 3.0 * (12.0 / 12.0);
        assert!((aco.pheromone()[0][1] - expected).abs() < 1e-12);
        assert_eq!(solution.progress, vec![12.0]);
        assert_eq!(solution.distance, 12.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let matrix = random_matrix(15, 3);
        let config = ACOConfig { num_generations: 10, ..Default::default() };
        let a = AntColonyOptimization::new(&matrix, config.clone()).unwrap().run();
        let b = AntColonyOptimization::new(&matrix, ACOConfig { parallel: true, ..config }).unwrap().run();
        assert_eq!(a.route, b.route);
        assert_eq!(a.progress, b.progress);
    }

    #[test]
    fn test_single_city() {
        let matrix = DistanceMatrix::from_points(&[Point::new(1.0, 2.0)]).unwrap();
        let mut aco = AntColonyOptimization::new(&matrix, ACOConfig { num_generations: 3, ..Default::default() }).unwrap();
        let solution = aco.run();
        assert_eq!(solution.route, vec![0, 0]);
        assert_eq!(solution.distance, 0.0);
    }
}
