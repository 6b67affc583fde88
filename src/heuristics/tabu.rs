//! Tabu Search for the TSP.
//!
//! Starts from a nearest-neighbour tour and, at every iteration, moves to the
//! best sampled neighbour that is not in the tabu memory. A tabu neighbour is
//! still allowed when it beats the best distance found so far (aspiration).

use crate::error::{Result, TspError};
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
use crate::heuristics::operators::MutationType;
use crate::instance::DistanceMatrix;
use crate::solution::{Route, Solution};
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Tabu Search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabuConfig {
    /// Capacity of the tabu memory
    pub tabu_size: usize,
    /// Number of iterations
    pub max_iter: usize,
    /// Neighbours sampled per iteration
    pub neighborhood_size: usize,
    /// Operator used to generate neighbours
    pub operator: MutationType,
    /// First city of the nearest-neighbour start tour
    pub start_city: usize,
    /// Non-improving iterations before diversifying
    pub stagnation_limit: usize,
    pub diversification_enabled: bool,
    pub max_diversifications: usize,
    /// Random seed
    pub seed: u64,
}

impl Default for TabuConfig {
    fn default() -> Self {
        TabuConfig {
            tabu_size: 50,
            max_iter: 500,
            neighborhood_size: 50,
            operator: MutationType::Swap,
            start_city: 0,
            stagnation_limit: 100,
            diversification_enabled: false,
            max_diversifications: 10,
            seed: 42,
        }
    }
}

impl TabuConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tabu_size == 0 {
            return Err(TspError::config("tabu_size must be positive"));
        }
        if self.max_iter == 0 {
            return Err(TspError::config("max_iter must be positive"));
        }
        if self.neighborhood_size == 0 {
            return Err(TspError::config("neighborhood_size must be positive"));
        }
        if self.diversification_enabled && self.stagnation_limit == 0 {
            return Err(TspError::config("stagnation_limit must be positive when diversification is enabled"));
        }
        Ok(())
    }
}

/// Bounded FIFO memory of recently visited routes
#[derive(Debug, Clone)]
pub struct TabuList {
    queue: VecDeque<Route>,
    counts: HashMap<Route, usize>,
    capacity: usize,
}

impl TabuList {
    pub fn new(capacity: usize) -> Self {
        TabuList {
            queue: VecDeque::with_capacity(capacity + 1),
            counts: HashMap::new(),
            capacity,
        }
    }

    /// Remember `route`, evicting the oldest entry once over capacity
    pub fn push(&mut self, route: Route) {
        if self.capacity == 0 {
            return;
        }
        *self.counts.entry(route.clone()).or_insert(0) += 1;
        self.queue.push_back(route);

        while self.queue.len() > self.capacity {
            if let Some(oldest) = self.queue.pop_front() {
                if let Some(count) = self.counts.get_mut(&oldest) {
                    *count -= 1;
                    if *count == 0 {
                        self.counts.remove(&oldest);
                    }
                }
            }
        }
    }

    pub fn contains(&self, route: &Route) -> bool {
        self.counts.contains_key(route)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// First candidate, in the given order, that is not tabu or that beats
/// `best_distance` (aspiration).
pub fn select_move(candidates: Vec<(f64, Route)>, tabu: &TabuList, best_distance: f64) -> Option<(f64, Route)> {
    candidates
        .into_iter()
        .find(|(distance, route)| !tabu.contains(route) || *distance < best_distance)
}

/// Tabu Search solver
pub struct TabuSearch<'a> {
    config: TabuConfig,
    matrix: &'a DistanceMatrix,
    rng: ChaCha8Rng,
    tabu: TabuList,
    diversifications: usize,
}

impl<'a> TabuSearch<'a> {
    pub fn new(matrix: &'a DistanceMatrix, config: TabuConfig) -> Result<Self> {
        config.validate()?;
        if config.start_city >= matrix.len() {
            return Err(TspError::config(format!(
                "start_city {} is out of range for {} cities",
                config.start_city,
                matrix.len()
            )));
        }

        Ok(TabuSearch {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            tabu: TabuList::new(config.tabu_size),
            config,
            matrix,
            diversifications: 0,
        })
    }

    pub fn tabu_list(&self) -> &TabuList {
        &self.tabu
    }

    pub fn diversifications(&self) -> usize {
        self.diversifications
    }

    /// Sample the neighbourhood of `route`, sorted by ascending distance
    fn neighborhood(&mut self, route: &Route) -> Vec<(f64, Route)> {
        let mut candidates: Vec<(f64, Route)> = (0..self.config.neighborhood_size)
            .map(|_| {
                let neighbor = self.config.operator.apply(route, &mut self.rng);
                (neighbor.length(self.matrix), neighbor)
            })
            .collect();
        candidates.sort_by_key(|(distance, _)| OrderedFloat(*distance));
        candidates
    }

    /// Run the search for `max_iter` iterations
    pub fn run(&mut self) -> Solution {
        let start = std::time::Instant::now();
        let matrix = self.matrix;

        let mut current = NearestNeighborHeuristic::from_city(self.config.start_city)
            .construct(matrix, &mut self.rng);
        let mut current_distance = current.length(matrix);
        let mut best = current.clone();
        let mut best_distance = current_distance;

        let mut progress = Vec::with_capacity(self.config.max_iter);
        let mut stagnation = 0;
        let mut cap_reported = false;
        self.tabu = TabuList::new(self.config.tabu_size);
        self.diversifications = 0;

        info!(
            "[TS] Start: {} cities, initial distance {:.3}, tabu size {}",
            matrix.len(),
            current_distance,
            self.config.tabu_size
        );

        for iteration in 0..self.config.max_iter {
            let candidates = self.neighborhood(&current);
            // Without an admissible candidate the search stays where it is
            if let Some((distance, route)) = select_move(candidates, &self.tabu, best_distance) {
                current = route;
                current_distance = distance;
            }
            self.tabu.push(current.clone());

            if current_distance < best_distance {
                best = current.clone();
                best_distance = current_distance;
                stagnation = 0;
            } else {
                stagnation += 1;
            }

            if self.config.diversification_enabled && stagnation >= self.config.stagnation_limit {
                if self.diversifications < self.config.max_diversifications {
                    current = MutationType::Scramble.apply(&best, &mut self.rng);
                    current_distance = current.length(matrix);
                    self.diversifications += 1;
                    stagnation = 0;
                    debug!("[TS] Iter {}  Diversified from best {:.3}", iteration, best_distance);
                } else if !cap_reported {
                    warn!(
                        "[TS] Diversification cap {} reached, continuing without diversification",
                        self.config.max_diversifications
                    );
                    cap_reported = true;
                }
            }

            progress.push(best_distance);
            if iteration % 100 == 0 {
                debug!(
                    "[TS] Iter {}  Current {:.3}  Best {:.3}  Tabu {}",
                    iteration,
                    current_distance,
                    best_distance,
                    self.tabu.len()
                );
            }
        }

        let mut solution = Solution::from_route(matrix, &best, progress, "TabuSearch");
        solution.computation_time = start.elapsed().as_secs_f64();

        info!(
            "[TS] Done: best {:.3} after {} iterations, {} diversifications, {:.2}s",
            solution.distance, solution.iterations, self.diversifications, solution.computation_time
        );

        solution
    }
}
