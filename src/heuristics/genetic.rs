//! Genetic Algorithm for the TSP.
//!
//! Each generation is ranked by fitness (`1 / tour length`), the elites are
//! carried over unchanged, and the rest of the next generation is bred with
//! Order Crossover from tournament winners, then mutated.

use crate::error::{Result, TspError};
use crate::heuristics::operators::{order_crossover, MutationType};
use crate::instance::DistanceMatrix;
use crate::solution::{Route, Solution};
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;

/// Individual in the genetic algorithm population
#[derive(Debug, Clone, Serialize)]
pub struct Being {
    /// Run-local identity, increasing in creation order
    pub id: usize,
    pub route: Route,
    /// Tour length, set on evaluation
    pub distance: Option<f64>,
    /// `1 / distance`, set on evaluation
    pub fitness: Option<f64>,
    /// Ids of both parents; `None` for the initial population
    pub parents: Option<(usize, usize)>,
    /// Generation that created this being
    pub born_on: usize,
    pub mutation_count: usize,
    pub mutation_history: Vec<MutationType>,
}

impl Being {
    fn new(id: usize, route: Route, parents: Option<(usize, usize)>, born_on: usize) -> Self {
        Being {
            id,
            route,
            distance: None,
            fitness: None,
            parents,
            born_on,
            mutation_count: 0,
            mutation_history: Vec::new(),
        }
    }

    /// Compute distance and fitness if not done yet
    pub fn evaluate(&mut self, matrix: &DistanceMatrix) {
        if self.fitness.is_some() {
            return;
        }
        let distance = self.route.length(matrix);
        self.distance = Some(distance);
        // Zero-length tours are unbeatable
        self.fitness = Some(if distance > 0.0 { 1.0 / distance } else { f64::INFINITY });
    }

    fn rank_key(&self) -> Reverse<OrderedFloat<f64>> {
        Reverse(OrderedFloat(self.fitness.unwrap_or(0.0)))
    }

    fn mutate<R: Rng + ?Sized>(&mut self, op: MutationType, rng: &mut R) {
        self.route = op.apply(&self.route, rng);
        self.distance = None;
        self.fitness = None;
        self.mutation_count += 1;
        self.mutation_history.push(op);
    }
}

/// Genetic Algorithm configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GAConfig {
    /// Population size
    pub population_size: usize,
    /// Number of generations
    pub num_generations: usize,
    /// Success probability of each mutation trial
    pub mutation_rate: f64,
    /// Beings drawn per tournament
    pub tournament_size: usize,
    /// Best beings copied unchanged into the next generation
    pub elite_size: usize,
    /// Independent mutation trials per child
    pub mutation_trials: usize,
    /// Operators drawn uniformly on a successful trial
    pub mutation_operators: Vec<MutationType>,
    /// Regenerations of a duplicate child before it is accepted anyway
    pub max_duplicate_retries: usize,
    /// Evaluate fitness with rayon
    pub parallel: bool,
    /// Random seed
    pub seed: u64,
}

impl Default for GAConfig {
    fn default() -> Self {
        GAConfig {
            population_size: 100,
            num_generations: 100,
            mutation_rate: 0.01,
            tournament_size: 5,
            elite_size: 5,
            mutation_trials: 10,
            mutation_operators: vec![MutationType::Swap, MutationType::Inversion, MutationType::Scramble],
            max_duplicate_retries: 10,
            parallel: false,
            seed: 42,
        }
    }
}

impl GAConfig {
    pub fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(TspError::config("population_size must be at least 2"));
        }
        if self.num_generations == 0 {
            return Err(TspError::config("num_generations must be positive"));
        }
        if self.elite_size > self.population_size {
            return Err(TspError::config(format!(
                "elite_size {} exceeds population_size {}",
                self.elite_size, self.population_size
            )));
        }
        if self.tournament_size == 0 || self.tournament_size > self.population_size {
            return Err(TspError::config(format!(
                "tournament_size must lie in 1..={}, got {}",
                self.population_size, self.tournament_size
            )));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(TspError::config("mutation_rate must lie in [0, 1]"));
        }
        if self.mutation_operators.is_empty() {
            return Err(TspError::config("at least one mutation operator is required"));
        }
        Ok(())
    }
}

/// Genetic Algorithm implementation
pub struct GeneticAlgorithm<'a> {
    config: GAConfig,
    matrix: &'a DistanceMatrix,
    population: Vec<Being>,
    best: Option<Being>,
    rng: ChaCha8Rng,
    generation: usize,
    next_id: usize,
}

impl<'a> GeneticAlgorithm<'a> {
    pub fn new(matrix: &'a DistanceMatrix, config: GAConfig) -> Result<Self> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);

        Ok(GeneticAlgorithm {
            config,
            matrix,
            population: Vec::new(),
            best: None,
            rng,
            generation: 0,
            next_id: 0,
        })
    }

    fn new_being(&mut self, route: Route, parents: Option<(usize, usize)>) -> Being {
        let being = Being::new(self.next_id, route, parents, self.generation);
        self.next_id += 1;
        being
    }

    /// Fill generation 0 with random routes, evaluated and ranked
    pub fn initialize_population(&mut self) {
        self.generation = 0;
        self.next_id = 0;
        self.best = None;

        let n = self.matrix.len();
        let mut population = Vec::with_capacity(self.config.population_size);
        for _ in 0..self.config.population_size {
            let route = Route::random(n, &mut self.rng);
            population.push(self.new_being(route, None));
        }
        self.population = population;

        self.evaluate_and_rank();
    }

    fn evaluate_and_rank(&mut self) {
        let matrix = self.matrix;
        if self.config.parallel {
            self.population.par_iter_mut().for_each(|being| being.evaluate(matrix));
        } else {
            self.population.iter_mut().for_each(|being| being.evaluate(matrix));
        }

        // Stable sort keeps the previous order among equal fitness
        self.population.sort_by_key(Being::rank_key);

        if let Some(leader) = self.population.first() {
            let improved = match &self.best {
                Some(best) => leader.fitness > best.fitness,
                None => true,
            };
            if improved {
                self.best = Some(leader.clone());
            }
        }
    }

    /// Tournament selection over the ranked population; returns the winner's rank
    fn tournament_select(&mut self) -> usize {
        index::sample(&mut self.rng, self.population.len(), self.config.tournament_size)
            .iter()
            .min()
            .unwrap_or(0)
    }

    fn mutate(&mut self, being: &mut Being) {
        let operators = &self.config.mutation_operators;
        for _ in 0..self.config.mutation_trials {
            if self.rng.gen::<f64>() < self.config.mutation_rate {
                let op = operators[self.rng.gen_range(0..operators.len())];
                being.mutate(op, &mut self.rng);
            }
        }
    }

    /// Breed, mutate and rank the next generation
    pub fn next_generation(&mut self) {
        if self.population.is_empty() {
            self.initialize_population();
        }

        let size = self.population.len();
        let elite = self.config.elite_size.min(size);
        self.generation += 1;

        let mut mating_pool: Vec<usize> = (0..elite).collect();
        for _ in elite..size {
            let winner = self.tournament_select();
            mating_pool.push(winner);
        }
        let mut pool = mating_pool;
        pool.shuffle(&mut self.rng);

        let mut next: Vec<Being> = self.population[..elite].to_vec();
        let mut seen: HashSet<Route> = next.iter().map(|being| being.route.clone()).collect();
        let mut accepted_duplicates = 0;

        for i in elite..size {
            let (a, b) = (pool[i - elite], pool[size - i - 1]);
            let mut route = order_crossover(&self.population[a].route, &self.population[b].route, &mut self.rng);

            let mut retries = 0;
            while seen.contains(&route) && retries < self.config.max_duplicate_retries {
                route = order_crossover(&self.population[a].route, &self.population[b].route, &mut self.rng);
                retries += 1;
            }
            if seen.contains(&route) {
                accepted_duplicates += 1;
            }
            seen.insert(route.clone());

            let parents = (self.population[a].id, self.population[b].id);
            let mut child = self.new_being(route, Some(parents));
            self.mutate(&mut child);
            next.push(child);
        }

        if accepted_duplicates > 0 {
            warn!(
                "[GA] Gen {}: {} children still duplicated after {} retries, accepted",
                self.generation, accepted_duplicates, self.config.max_duplicate_retries
            );
        }

        self.population = next;
        self.evaluate_and_rank();
    }

    /// Run the genetic algorithm
    pub fn run(&mut self) -> Solution {
        let start = std::time::Instant::now();

        info!(
            "[GA] Start: {} cities, population {}, {} generations",
            self.matrix.len(),
            self.config.population_size,
            self.config.num_generations
        );

        self.initialize_population();
        let mut progress = Vec::with_capacity(self.config.num_generations);

        while self.generation < self.config.num_generations {
            self.next_generation();

            let best_distance = self.best.as_ref().and_then(|b| b.distance).unwrap_or(f64::INFINITY);
            progress.push(best_distance);
            debug!(
                "[GA] Gen {}  Best {:.3}  Diversity {:.2}",
                self.generation,
                best_distance,
                self.population_diversity()
            );
        }

        let best_route = match &self.best {
            Some(best) => best.route.clone(),
            None => Route::identity(self.matrix.len()),
        };
        let mut solution = Solution::from_route(self.matrix, &best_route, progress, "GeneticAlgorithm");
        solution.computation_time = start.elapsed().as_secs_f64();

        info!(
            "[GA] Done: best {:.3} after {} generations, {:.2}s",
            solution.distance, self.generation, solution.computation_time
        );

        solution
    }

    /// Current population, best first
    pub fn population(&self) -> &[Being] {
        &self.population
    }

    /// Best being seen so far
    pub fn best_being(&self) -> Option<&Being> {
        self.best.as_ref()
    }

    /// Get current generation
    pub fn current_generation(&self) -> usize {
        self.generation
    }

    /// Share of distinct routes in the population
    pub fn population_diversity(&self) -> f64 {
        if self.population.is_empty() {
            return 0.0;
        }
        let distinct: HashSet<&Route> = self.population.iter().map(|being| &being.route).collect();
        distinct.len() as f64 / self.population.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Point;
    use crate::solution::is_permutation;

    fn random_matrix(n: usize, seed: u64) -> DistanceMatrix {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let points: Vec<Point> = (0..n)
            .map(|_| Point::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)))
            .collect();
        DistanceMatrix::from_points(&points).unwrap()
    }

    fn small_config() -> GAConfig {
        GAConfig {
            population_size: 30,
            num_generations: 20,
            mutation_rate: 0.05,
            tournament_size: 4,
            elite_size: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_configurations() {
        let matrix = random_matrix(6, 0);
        let invalid = [
            GAConfig { population_size: 1, ..small_config() },
            GAConfig { num_generations: 0, ..small_config() },
            GAConfig { elite_size: 31, ..small_config() },
            GAConfig { tournament_size: 0, ..small_config() },
            GAConfig { tournament_size: 31, ..small_config() },
            GAConfig { mutation_rate: 1.5, ..small_config() },
            GAConfig { mutation_operators: vec![], ..small_config() },
        ];
        for config in invalid {
            assert!(matches!(GeneticAlgorithm::new(&matrix, config), Err(TspError::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn test_genetic_algorithm() {
        let matrix = random_matrix(12, 1);
        let mut ga = GeneticAlgorithm::new(&matrix, small_config()).unwrap();
        let solution = ga.run();

        assert!(solution.is_complete(12));
        assert_eq!(solution.progress.len(), 20);
        assert!(solution.progress.windows(2).all(|w| w[1] <= w[0]));
        assert!((matrix.tour_length(solution.open_route()) - solution.distance).abs() < 1e-9);
    }

    #[test]
    fn test_population_size_is_constant() {
        let matrix = random_matrix(10, 2);
        let mut ga = GeneticAlgorithm::new(&matrix, small_config()).unwrap();
        ga.initialize_population();

        for _ in 0..10 {
            ga.next_generation();
            assert_eq!(ga.population().len(), 30);
            assert!(ga.population().iter().all(|b| is_permutation(&b.route) && b.fitness.is_some()));
        }
    }

    fn elite_fitness(ga: &GeneticAlgorithm<'_>, elite: usize) -> Vec<f64> {
        ga.population()[..elite].iter().map(|b| b.fitness.unwrap()).collect()
    }

    #[test]
    fn test_elite_fitness_never_drops() {
        let matrix = random_matrix(15, 3);
        let config = small_config();
        let elite = config.elite_size;
        let mut ga = GeneticAlgorithm::new(&matrix, config).unwrap();
        ga.initialize_population();

        let mut previous = elite_fitness(&ga, elite);
        for _ in 0..15 {
            ga.next_generation();
            let current = elite_fitness(&ga, elite);
            for (now, before) in current.iter().zip(&previous) {
                assert!(now >= before);
            }
            previous = current;
        }
    }

    #[test]
    fn test_lineage_and_ids() {
        let matrix = random_matrix(8, 4);
        let mut ga = GeneticAlgorithm::new(&matrix, small_config()).unwrap();
        ga.initialize_population();
        assert!(ga.population().iter().all(|b| b.parents.is_none() && b.born_on == 0));

        ga.next_generation();
        let children: Vec<&Being> = ga.population().iter().filter(|b| b.born_on == 1).collect();
        assert_eq!(children.len(), 30 - 3);
        for child in &children {
            let (p1, p2) = child.parents.unwrap();
            assert!(p1 < 30 && p2 < 30);
            assert!(child.id >= 30);
        }

        let ids: HashSet<usize> = ga.population().iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), 30);
    }

    #[test]
    fn test_mutation_trials() {
        let matrix = random_matrix(8, 5);
        let config = GAConfig { mutation_rate: 1.0, mutation_trials: 4, ..small_config() };
        let mut ga = GeneticAlgorithm::new(&matrix, config).unwrap();
        ga.initialize_population();
        ga.next_generation();

        for being in ga.population() {
            if being.born_on == 1 {
                assert_eq!(being.mutation_count, 4);
                assert_eq!(being.mutation_history.len(), 4);
            } else {
                assert_eq!(being.mutation_count, 0);
            }
        }

        let config = GAConfig { mutation_rate: 0.0, ..small_config() };
        let mut ga = GeneticAlgorithm::new(&matrix, config).unwrap();
        ga.initialize_population();
        ga.next_generation();
        assert!(ga.population().iter().all(|b| b.mutation_count == 0));
    }

    #[test]
    fn test_duplicate_retries_terminate_on_tiny_instance() {
        // Only 6 distinct routes exist for 3 cities
        let matrix = random_matrix(3, 6);
        let config = GAConfig { population_size: 40, max_duplicate_retries: 3, ..small_config() };
        let mut ga = GeneticAlgorithm::new(&matrix, config).unwrap();
        let solution = ga.run();
        assert!(solution.is_complete(3));
    }

    #[test]
    fn test_same_seed_same_result() {
        let matrix = random_matrix(15, 7);
        let a = GeneticAlgorithm::new(&matrix, small_config()).unwrap().run();
        let b = GeneticAlgorithm::new(&matrix, small_config()).unwrap().run();
        assert_eq!(a.route, b.route);
        assert_eq!(a.progress, b.progress);

        let parallel = GAConfig { parallel: true, ..small_config() };
        let c = GeneticAlgorithm::new(&matrix, parallel).unwrap().run();
        assert_eq!(a.route, c.route);
        assert_eq!(a.progress, c.progress);
    }
}
