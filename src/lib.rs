//! TSP Metaheuristics Library
//!
//! Searches for short closed tours over a set of 2D or 3D points with four
//! interchangeable strategies sharing one distance model.
//!
//! # Features
//!
//! - Distance model with Euclidean and truncated-Euclidean metrics
//! - Route operators (swap, inversion, scramble, displacement, order crossover)
//! - Trajectory search (Simulated Annealing, Tabu Search)
//! - Population-based methods (Genetic Algorithm, Ant Colony Optimization)
//! - Benchmarking over seeds with CSV export
//!
//! Every run is reproducible from its configuration seed.
//!
//! # Example
//!
//! ```no_run
//! use tsp_metaheuristics::heuristics::tabu::TabuConfig;
//! use tsp_metaheuristics::instance::{load_points, DistanceMatrix};
//! use tsp_metaheuristics::solver::{solve, StrategyConfig};
//!
//! let points = load_points("cities.txt").unwrap();
//! let matrix = DistanceMatrix::from_points(&points).unwrap();
//!
//! let config = StrategyConfig::Tabu(TabuConfig { max_iter: 1000, ..Default::default() });
//! let solution = solve(&matrix, &config).unwrap();
//!
//! println!("Tour length: {:.2}", solution.distance);
//! ```

pub mod error;
pub mod instance;
pub mod solution;
pub mod heuristics;
pub mod solver;
pub mod benchmark;

pub use error::{Result, TspError};
pub use instance::{DistanceMatrix, Metric, Point};
pub use solution::{Route, Solution};
pub use solver::{solve, solve_points, StrategyConfig};
