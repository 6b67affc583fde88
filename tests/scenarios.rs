use tsp_metaheuristics::heuristics::aco::ACOConfig;
use tsp_metaheuristics::heuristics::annealing::SAConfig;
use tsp_metaheuristics::heuristics::genetic::GAConfig;
use tsp_metaheuristics::heuristics::tabu::TabuConfig;
use tsp_metaheuristics::{solve, solve_points, DistanceMatrix, Metric, Point, StrategyConfig, TspError};

fn unit_square() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(1.0, 0.0),
        Point::new(1.0, 1.0),
        Point::new(0.0, 1.0),
    ]
}

fn all_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::Genetic(GAConfig { population_size: 50, num_generations: 50, ..Default::default() }),
        StrategyConfig::Annealing(SAConfig::default()),
        StrategyConfig::Tabu(TabuConfig { max_iter: 200, ..Default::default() }),
        StrategyConfig::AntColony(ACOConfig { num_generations: 50, ..Default::default() }),
    ]
}

#[test]
fn unit_square_is_solved_optimally_by_every_strategy() {
    let matrix = DistanceMatrix::from_points(&unit_square()).unwrap();

    for config in all_strategies() {
        let solution = solve(&matrix, &config).unwrap();
        assert!(
            solution.distance <= 4.0 + 1e-6,
            "{} returned {}",
            config.name(),
            solution.distance
        );
        assert!(solution.is_complete(4), "{} returned {:?}", config.name(), solution.route);
        assert_eq!(solution.route.first(), solution.route.last());
    }
}

#[test]
fn single_point_has_zero_tour_length() {
    let matrix = DistanceMatrix::from_points(&[Point::new(3.0, 7.0)]).unwrap();
    assert_eq!(matrix.tour_length(&[0]), 0.0);

    for config in all_strategies() {
        let solution = solve(&matrix, &config).unwrap();
        assert_eq!(solution.distance, 0.0);
        assert_eq!(solution.route, vec![0, 0]);
    }
}

#[test]
fn empty_input_is_rejected() {
    assert!(matches!(DistanceMatrix::from_points(&[]), Err(TspError::EmptyInput)));
    for config in all_strategies() {
        assert!(matches!(solve_points(&[], Metric::Euclidean, &config), Err(TspError::EmptyInput)));
    }
}

#[test]
fn genetic_algorithm_is_reproducible() {
    let points = tsp_metaheuristics::instance::random_points(25, 11);
    let config = StrategyConfig::Genetic(GAConfig {
        population_size: 40,
        num_generations: 30,
        seed: 1234,
        ..Default::default()
    });

    let first = solve_points(&points, Metric::Euclidean, &config).unwrap();
    let second = solve_points(&points, Metric::Euclidean, &config).unwrap();
    assert_eq!(first.progress, second.progress);
    assert_eq!(first.route, second.route);
    assert_eq!(first.distance, second.distance);
}

#[test]
fn solutions_serialize_to_json() {
    let config = StrategyConfig::Tabu(TabuConfig { max_iter: 10, ..Default::default() });
    let solution = solve_points(&unit_square(), Metric::Euclidean, &config).unwrap();

    let json = serde_json::to_value(&solution).unwrap();
    assert_eq!(json["algorithm"], "TabuSearch");
    assert_eq!(json["route"].as_array().unwrap().len(), 5);
    assert_eq!(json["progress"].as_array().unwrap().len(), 10);
}
