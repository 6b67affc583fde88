//! Single entry point over the four strategies.
//!
//! A [`StrategyConfig`] names the strategy and carries its configuration, so a
//! whole run can be described by one JSON document:
//!
//! ```json
//! {"strategy": "tabu", "tabu_size": 20, "max_iter": 1000, "seed": 7}
//! ```

use crate::error::Result;
use crate::heuristics::aco::{ACOConfig, AntColonyOptimization};
use crate::heuristics::annealing::{SAConfig, SimulatedAnnealing};
use crate::heuristics::genetic::{GAConfig, GeneticAlgorithm};
use crate::heuristics::tabu::{TabuConfig, TabuSearch};
use crate::instance::{DistanceMatrix, Metric, Point};
use crate::solution::Solution;
use serde::{Deserialize, Serialize};

/// Strategy selection plus its configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StrategyConfig {
    Genetic(GAConfig),
    Annealing(SAConfig),
    Tabu(TabuConfig),
    AntColony(ACOConfig),
}

impl StrategyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyConfig::Genetic(_) => "GeneticAlgorithm",
            StrategyConfig::Annealing(_) => "SimulatedAnnealing",
            StrategyConfig::Tabu(_) => "TabuSearch",
            StrategyConfig::AntColony(_) => "AntColonyOptimization",
        }
    }

    pub fn seed(&self) -> u64 {
        match self {
            StrategyConfig::Genetic(c) => c.seed,
            StrategyConfig::Annealing(c) => c.seed,
            StrategyConfig::Tabu(c) => c.seed,
            StrategyConfig::AntColony(c) => c.seed,
        }
    }

    /// Same configuration with another seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        match &mut self {
            StrategyConfig::Genetic(c) => c.seed = seed,
            StrategyConfig::Annealing(c) => c.seed = seed,
            StrategyConfig::Tabu(c) => c.seed = seed,
            StrategyConfig::AntColony(c) => c.seed = seed,
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyConfig::Genetic(c) => c.validate(),
            StrategyConfig::Annealing(c) => c.validate(),
            StrategyConfig::Tabu(c) => c.validate(),
            StrategyConfig::AntColony(c) => c.validate(),
        }
    }
}

/// Run the configured strategy on a distance matrix
pub fn solve(matrix: &DistanceMatrix, config: &StrategyConfig) -> Result<Solution> {
    let solution = match config {
        StrategyConfig::Genetic(c) => GeneticAlgorithm::new(matrix, c.clone())?.run(),
        StrategyConfig::Annealing(c) => SimulatedAnnealing::new(matrix, c.clone())?.run(),
        StrategyConfig::Tabu(c) => TabuSearch::new(matrix, c.clone())?.run(),
        StrategyConfig::AntColony(c) => AntColonyOptimization::new(matrix, c.clone())?.run(),
    };
    Ok(solution)
}

/// Build the distance matrix from `points`, then [`solve`]
pub fn solve_points(points: &[Point], metric: Metric, config: &StrategyConfig) -> Result<Solution> {
    let matrix = DistanceMatrix::with_metric(points, metric)?;
    solve(&matrix, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TspError;

    #[test]
    fn test_tagged_config_from_json() {
        let config: StrategyConfig =
            serde_json::from_str(r#"{"strategy": "tabu", "tabu_size": 20, "seed": 7}"#).unwrap();
        match &config {
            StrategyConfig::Tabu(c) => {
                assert_eq!(c.tabu_size, 20);
                assert_eq!(c.max_iter, TabuConfig::default().max_iter);
            }
            other => panic!("unexpected strategy {:?}", other),
        }
        assert_eq!(config.seed(), 7);

        let json = serde_json::to_value(&StrategyConfig::AntColony(ACOConfig::default())).unwrap();
        assert_eq!(json["strategy"], "ant_colony");

        assert!(serde_json::from_str::<StrategyConfig>(r#"{"strategy": "hill_climbing"}"#).is_err());
    }

    #[test]
    fn test_with_seed() {
        let config = StrategyConfig::Genetic(GAConfig::default()).with_seed(99);
        assert_eq!(config.seed(), 99);
        assert_eq!(config.name(), "GeneticAlgorithm");
    }

    #[test]
    fn test_solve_points_reports_input_errors() {
        let config = StrategyConfig::Tabu(TabuConfig::default());
        assert!(matches!(solve_points(&[], Metric::Euclidean, &config), Err(TspError::EmptyInput)));

        let mixed = [Point::new(0.0, 0.0), Point::new_3d(1.0, 1.0, 1.0)];
        assert!(matches!(
            solve_points(&mixed, Metric::Euclidean, &config),
            Err(TspError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_solve_rejects_invalid_configuration() {
        let matrix = DistanceMatrix::from_points(&[Point::new(0.0, 0.0), Point::new(1.0, 0.0)]).unwrap();
        let config = StrategyConfig::Genetic(GAConfig { elite_size: 500, ..Default::default() });
        assert!(config.validate().is_err());
        assert!(matches!(solve(&matrix, &config), Err(TspError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_solve_dispatches_by_name() {
        let points: Vec<Point> = (0..6).map(|i| Point::new(i as f64, (i * i) as f64)).collect();
        let matrix = DistanceMatrix::from_points(&points).unwrap();
        let configs = [
            StrategyConfig::Genetic(GAConfig { population_size: 10, num_generations: 5, ..Default::default() }),
            StrategyConfig::Annealing(SAConfig::default()),
            StrategyConfig::Tabu(TabuConfig { max_iter: 20, ..Default::default() }),
            StrategyConfig::AntColony(ACOConfig { num_generations: 5, ..Default::default() }),
        ];
        for config in &configs {
            let solution = solve(&matrix, config).unwrap();
            assert_eq!(solution.algorithm, config.name());
            assert!(solution.is_complete(6));
        }
    }
}
