//! Simulated Annealing for the TSP.
//!
//! A single current route is perturbed by randomly chosen operators. Improving
//! neighbours are always accepted and worse ones pass the Metropolis test
//! `u < exp((current - neighbour) / T)`. After each stage of
//! `neighborhood_size` evaluations the temperature is lowered by a fixed
//! factor or by an adaptive rule driven by the spread of the distances seen
//! during the stage.

use crate::error::{Result, TspError};
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
use crate::heuristics::operators::MutationType;
use crate::instance::DistanceMatrix;
use crate::solution::{Route, Solution};
use log::{debug, info, warn};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// How the starting temperature is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialTemperature {
    Fixed(f64),
    /// `T0 = -(movement_percentage * d0) / ln(worse_solution_probability)`,
    /// where `d0` is the length of the initial route: a move that worsens the
    /// tour by `movement_percentage` of its length is accepted with the given
    /// probability at the first stage.
    Derived {
        movement_percentage: f64,
        worse_solution_probability: f64,
    },
}

impl InitialTemperature {
    fn validate(&self) -> Result<()> {
        match *self {
            InitialTemperature::Fixed(t) if !(t.is_finite() && t > 0.0) => {
                Err(TspError::config(format!("initial temperature must be positive, got {}", t)))
            }
            InitialTemperature::Derived { movement_percentage, .. }
                if !(movement_percentage.is_finite() && movement_percentage > 0.0) =>
            {
                Err(TspError::config("movement_percentage must be positive"))
            }
            InitialTemperature::Derived { worse_solution_probability: p, .. } if !(p > 0.0 && p < 1.0) => {
                Err(TspError::config("worse_solution_probability must lie in (0, 1)"))
            }
            _ => Ok(()),
        }
    }

    /// Temperature for a run whose initial route has length `initial_distance`
    pub fn resolve(&self, initial_distance: f64) -> f64 {
        match *self {
            InitialTemperature::Fixed(t) => t,
            InitialTemperature::Derived { movement_percentage, worse_solution_probability } => {
                let t0 = -(movement_percentage * initial_distance) / worse_solution_probability.ln();
                // Zero-length tours (one city, coincident points) give T0 = 0
                if t0.is_finite() && t0 > 0.0 {
                    t0
                } else {
                    1.0
                }
            }
        }
    }
}

/// Temperature reduction rule applied after every stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cooling {
    /// `T <- beta * T`
    Fixed { beta: f64 },
    /// `T <- T / exp(lambda * T / sigma)` with `sigma` the population standard
    /// deviation of the distances evaluated during the stage; falls back to
    /// `beta` when `sigma` is zero
    Adaptive { lambda: f64, beta: f64 },
}

impl Cooling {
    fn validate(&self) -> Result<()> {
        let beta = match *self {
            Cooling::Fixed { beta } => beta,
            Cooling::Adaptive { lambda, beta } => {
                if !(lambda.is_finite() && lambda > 0.0) {
                    return Err(TspError::config("adaptive cooling lambda must be positive"));
                }
                beta
            }
        };
        if !(beta > 0.0 && beta < 1.0) {
            return Err(TspError::config(format!("cooling factor beta must lie in (0, 1), got {}", beta)));
        }
        Ok(())
    }

    fn next_temperature(&self, temperature: f64, stage_distances: &[f64]) -> f64 {
        let next = match *self {
            Cooling::Fixed { beta } => beta * temperature,
            Cooling::Adaptive { lambda, beta } => {
                let sigma = stage_distances.iter().population_std_dev();
                if sigma.is_finite() && sigma > 0.0 {
                    temperature / (lambda * temperature / sigma).exp()
                } else {
                    beta * temperature
                }
            }
        };
        next.max(f64::MIN_POSITIVE)
    }
}

/// When the annealing stops
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Run exactly this many stages
    Stages(usize),
    /// Run until the temperature drops to `min_temperature`, at most `max_stages` stages
    MinTemperature { min_temperature: f64, max_stages: usize },
}

/// Simulated Annealing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SAConfig {
    pub initial_temperature: InitialTemperature,
    pub cooling: Cooling,
    pub termination: Termination,
    /// Neighbour evaluations per temperature stage
    pub neighborhood_size: usize,
    /// Operators drawn uniformly for each neighbour
    pub operators: Vec<MutationType>,
    /// Consecutive non-improving evaluations before restarting from a shuffle of the best route
    pub restart_threshold: Option<usize>,
    pub max_restarts: usize,
    /// Start here instead of a nearest-neighbour tour
    pub initial_route: Option<Route>,
    /// Random seed
    pub seed: u64,
}

impl Default for SAConfig {
    fn default() -> Self {
        SAConfig {
            initial_temperature: InitialTemperature::Derived {
                movement_percentage: 0.15,
                worse_solution_probability: 0.05,
            },
            cooling: Cooling::Fixed { beta: 0.9 },
            termination: Termination::Stages(100),
            neighborhood_size: 100,
            operators: vec![MutationType::Swap, MutationType::Inversion],
            restart_threshold: None,
            max_restarts: 10,
            initial_route: None,
            seed: 42,
        }
    }
}

impl SAConfig {
    pub fn validate(&self) -> Result<()> {
        self.initial_temperature.validate()?;
        self.cooling.validate()?;
        match self.termination {
            Termination::Stages(0) => return Err(TspError::config("at least one stage is required")),
            Termination::MinTemperature { min_temperature, max_stages } => {
                if !(min_temperature.is_finite() && min_temperature > 0.0) {
                    return Err(TspError::config("min_temperature must be positive"));
                }
                if max_stages == 0 {
                    return Err(TspError::config("max_stages must be positive"));
                }
            }
            Termination::Stages(_) => {}
        }
        if self.neighborhood_size == 0 {
            return Err(TspError::config("neighborhood_size must be positive"));
        }
        if self.operators.is_empty() {
            return Err(TspError::config("at least one neighbourhood operator is required"));
        }
        if self.restart_threshold == Some(0) {
            return Err(TspError::config("restart_threshold must be positive"));
        }
        Ok(())
    }
}

/// Simulated Annealing solver
pub struct SimulatedAnnealing<'a> {
    config: SAConfig,
    matrix: &'a DistanceMatrix,
    rng: ChaCha8Rng,
    initial_route: Route,
    initial_temperature: f64,
    temperature_history: Vec<f64>,
    restarts: usize,
}

impl<'a> SimulatedAnnealing<'a> {
    /// Validate the configuration, build the starting route and its temperature
    pub fn new(matrix: &'a DistanceMatrix, config: SAConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let initial_route = match &config.initial_route {
            Some(route) if route.len() != matrix.len() => {
                return Err(TspError::InvalidRoute(format!(
                    "initial route visits {} cities, matrix has {}",
                    route.len(),
                    matrix.len()
                )));
            }
            Some(route) => route.clone(),
            None => NearestNeighborHeuristic::random_start().construct(matrix, &mut rng),
        };

        let initial_temperature = config.initial_temperature.resolve(initial_route.length(matrix));
        if let Termination::MinTemperature { min_temperature, .. } = config.termination {
            if min_temperature >= initial_temperature {
                return Err(TspError::config(format!(
                    "min_temperature {} is not below the initial temperature {:.4}",
                    min_temperature, initial_temperature
                )));
            }
        }

        Ok(SimulatedAnnealing {
            config,
            matrix,
            rng,
            initial_route,
            initial_temperature,
            temperature_history: Vec::new(),
            restarts: 0,
        })
    }

    pub fn initial_temperature(&self) -> f64 {
        self.initial_temperature
    }

    /// Temperature used during each completed stage
    pub fn temperature_history(&self) -> &[f64] {
        &self.temperature_history
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }

    fn should_stop(&self, stage: usize, temperature: f64) -> bool {
        match self.config.termination {
            Termination::Stages(stages) => stage >= stages,
            Termination::MinTemperature { min_temperature, max_stages } => {
                if temperature <= min_temperature {
                    return true;
                }
                if stage >= max_stages {
                    warn!(
                        "[SA] Stage cap {} reached at temperature {:.6} (target {})",
                        max_stages, temperature, min_temperature
                    );
                    return true;
                }
                false
            }
        }
    }

    /// Run the annealing schedule
    pub fn run(&mut self) -> Solution {
        let start = std::time::Instant::now();
        let matrix = self.matrix;

        let mut current = self.initial_route.clone();
        let mut current_distance = current.length(matrix);
        let mut best = current.clone();
        let mut best_distance = current_distance;

        let mut temperature = self.initial_temperature;
        let mut progress = Vec::new();
        let mut stagnation = 0;
        let mut cap_reported = false;
        self.temperature_history.clear();
        self.restarts = 0;

        info!(
            "[SA] Start: {} cities, initial distance {:.3}, T0 {:.4}",
            matrix.len(),
            current_distance,
            temperature
        );

        let mut stage = 0;
        while !self.should_stop(stage, temperature) {
            let mut stage_distances = Vec::with_capacity(self.config.neighborhood_size);

            for _ in 0..self.config.neighborhood_size {
                let op = self.config.operators[self.rng.gen_range(0..self.config.operators.len())];
                let neighbor = op.apply(&current, &mut self.rng);
                let neighbor_distance = neighbor.length(matrix);
                stage_distances.push(neighbor_distance);

                let accept = neighbor_distance < current_distance || {
                    let u: f64 = self.rng.gen();
                    u < ((current_distance - neighbor_distance) / temperature).exp()
                };
                if accept {
                    current = neighbor;
                    current_distance = neighbor_distance;
                }

                if current_distance < best_distance {
                    best = current.clone();
                    best_distance = current_distance;
                    stagnation = 0;
                } else {
                    stagnation += 1;
                }

                if let Some(threshold) = self.config.restart_threshold {
                    if stagnation >= threshold {
                        if self.restarts < self.config.max_restarts {
                            let mut tour = best.as_slice().to_vec();
                            tour.shuffle(&mut self.rng);
                            current = Route::from_vec_unchecked(tour);
                            current_distance = current.length(matrix);
                            self.restarts += 1;
                            stagnation = 0;
                        } else if !cap_reported {
                            warn!("[SA] Restart cap {} reached, continuing without restarts", self.config.max_restarts);
                            cap_reported = true;
                        }
                    }
                }
            }

            self.temperature_history.push(temperature);
            progress.push(best_distance);
            debug!(
                "[SA] Stage {}  T {:.6}  Current {:.3}  Best {:.3}",
                stage, temperature, current_distance, best_distance
            );

            temperature = self.config.cooling.next_temperature(temperature, &stage_distances);
            stage += 1;
        }

        let mut solution = Solution::from_route(matrix, &best, progress, "SimulatedAnnealing");
        solution.computation_time = start.elapsed().as_secs_f64();

        info!(
            "[SA] Done: best {:.3} after {} stages, {} restarts, {:.2}s",
            solution.distance, stage, self.restarts, solution.computation_time
        );

        solution
    }
}
