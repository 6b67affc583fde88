//! Benchmarking and experimentation module.
//!
//! Runs strategies over several seeds, collects per-run results, aggregates
//! them per algorithm and exports CSV files and a text report. Also hosts the
//! annealing orchestrator that reruns SA until a target distance is beaten.

use crate::error::{Result, TspError};
use crate::heuristics::annealing::{SAConfig, SimulatedAnnealing};
use crate::instance::DistanceMatrix;
use crate::solution::Solution;
use crate::solver::{solve, StrategyConfig};

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::path::Path;

/// Result of running a single algorithm once on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Algorithm name
    pub algorithm: String,
    /// Instance name
    pub instance: String,
    /// Number of cities
    pub dimension: usize,
    /// Run index
    pub run: usize,
    /// Seed used for this run
    pub seed: u64,
    /// Best tour length
    pub distance: f64,
    /// Computation time in seconds
    pub time: f64,
    /// Iterations, stages or generations executed
    pub iterations: usize,
    /// Gap to the reference distance in percent (if available)
    pub gap_to_reference: Option<f64>,
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    /// Algorithm name
    pub algorithm: String,
    /// Number of runs aggregated
    pub num_runs: usize,
    /// Average distance
    pub avg_distance: f64,
    /// Best distance
    pub best_distance: f64,
    /// Worst distance
    pub worst_distance: f64,
    /// Population standard deviation of the distance
    pub std_distance: f64,
    /// Average time
    pub avg_time: f64,
    /// Total time
    pub total_time: f64,
    /// Average gap to the reference distance
    pub avg_gap: Option<f64>,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of runs per algorithm, each with its own seed
    pub num_runs: usize,
    /// Run the seeds of one algorithm in parallel
    pub parallel: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            parallel: true,
        }
    }
}

/// Relative gap of `distance` over `reference`, in percent
pub fn gap_percent(distance: f64, reference: f64) -> f64 {
    (distance - reference) / reference * 100.0
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<AlgorithmResult>,
    reference: HashMap<String, f64>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            reference: HashMap::new(),
        }
    }

    /// Set a reference distance (e.g. from an exact solver) for an instance
    pub fn set_reference(&mut self, instance_name: &str, distance: f64) {
        self.reference.insert(instance_name.to_string(), distance);
    }

    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }

    /// Run one strategy `num_runs` times with seeds `seed, seed + 1, ...`
    pub fn run_strategy(
        &mut self,
        instance_name: &str,
        matrix: &DistanceMatrix,
        strategy: &StrategyConfig,
    ) -> Result<()> {
        if self.config.num_runs == 0 {
            return Err(TspError::config("num_runs must be positive"));
        }
        strategy.validate()?;

        let base_seed = strategy.seed();
        let runs: Vec<(usize, u64)> = (0..self.config.num_runs)
            .map(|run| (run, base_seed.wrapping_add(run as u64)))
            .collect();

        let run_one = |&(run, seed): &(usize, u64)| -> Result<(usize, u64, Solution)> {
            let solution = solve(matrix, &strategy.clone().with_seed(seed))?;
            Ok((run, seed, solution))
        };
        let solutions: Vec<(usize, u64, Solution)> = if self.config.parallel {
            runs.par_iter().map(run_one).collect::<Result<_>>()?
        } else {
            runs.iter().map(run_one).collect::<Result<_>>()?
        };

        for (run, seed, solution) in solutions {
            self.record_result(instance_name, matrix.len(), run, seed, &solution);
        }

        info!(
            "Benchmarked {} on {} ({} runs)",
            strategy.name(),
            instance_name,
            self.config.num_runs
        );
        Ok(())
    }

    /// Run every strategy in turn
    pub fn run_strategies(
        &mut self,
        instance_name: &str,
        matrix: &DistanceMatrix,
        strategies: &[StrategyConfig],
    ) -> Result<()> {
        for strategy in strategies {
            self.run_strategy(instance_name, matrix, strategy)?;
        }
        Ok(())
    }

    /// Record a result
    fn record_result(&mut self, instance_name: &str, dimension: usize, run: usize, seed: u64, solution: &Solution) {
        let gap_to_reference = self
            .reference
            .get(instance_name)
            .filter(|&&reference| reference > 0.0)
            .map(|&reference| gap_percent(solution.distance, reference));

        self.results.push(AlgorithmResult {
            algorithm: solution.algorithm.clone(),
            instance: instance_name.to_string(),
            dimension,
            run,
            seed,
            distance: solution.distance,
            time: solution.computation_time,
            iterations: solution.iterations,
            gap_to_reference,
        });
    }

    /// Compute statistics for each algorithm, best average first
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut stats_map: HashMap<&str, Vec<&AlgorithmResult>> = HashMap::new();
        for result in &self.results {
            stats_map.entry(result.algorithm.as_str()).or_default().push(result);
        }

        let mut statistics: Vec<AlgorithmStatistics> = stats_map
            .into_iter()
            .map(|(algorithm, results)| {
                let distances: Vec<f64> = results.iter().map(|r| r.distance).collect();
                let times: Vec<f64> = results.iter().map(|r| r.time).collect();
                let gaps: Vec<f64> = results.iter().filter_map(|r| r.gap_to_reference).collect();

                AlgorithmStatistics {
                    algorithm: algorithm.to_string(),
                    num_runs: results.len(),
                    avg_distance: Statistics::mean(&distances),
                    best_distance: Statistics::min(&distances),
                    worst_distance: Statistics::max(&distances),
                    std_distance: Statistics::population_std_dev(&distances),
                    avg_time: Statistics::mean(&times),
                    total_time: times.iter().sum(),
                    avg_gap: if gaps.is_empty() { None } else { Some(Statistics::mean(&gaps)) },
                }
            })
            .collect();

        statistics.sort_by(|a, b| {
            a.avg_distance
                .total_cmp(&b.avg_distance)
                .then_with(|| a.algorithm.cmp(&b.algorithm))
        });
        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for result in &self.results {
            writer.serialize(result)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("       TSP Metaheuristics Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!("Generated: {}\n\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));

        let stats = self.compute_statistics();

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(92).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<25} {:>6} {:>12} {:>12} {:>12} {:>10} {:>10}\n",
            "Algorithm", "Runs", "Avg Dist", "Best Dist", "Std Dev", "Avg Gap%", "Avg Time"
        ));
        report.push_str("-".repeat(92).as_str());
        report.push('\n');

        for stat in &stats {
            let gap_str = stat
                .avg_gap
                .map(|g| format!("{:.2}%", g))
                .unwrap_or_else(|| "-".to_string());

            report.push_str(&format!(
                "{:<25} {:>6} {:>12.2} {:>12.2} {:>12.2} {:>10} {:>10.4}\n",
                stat.algorithm,
                stat.num_runs,
                stat.avg_distance,
                stat.best_distance,
                stat.std_distance,
                gap_str,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(92).as_str());
        report.push('\n');

        report.push_str("\nBest Solutions per Instance:\n");
        let mut instance_best: Vec<(&str, &AlgorithmResult)> = Vec::new();
        for result in &self.results {
            match instance_best.iter_mut().find(|(name, _)| *name == result.instance) {
                Some(entry) if result.distance < entry.1.distance => entry.1 = result,
                Some(_) => {}
                None => instance_best.push((result.instance.as_str(), result)),
            }
        }
        for (instance, best) in instance_best {
            report.push_str(&format!(
                "  {}: {:.2} ({}, seed {})\n",
                instance, best.distance, best.algorithm, best.seed
            ));
        }

        report
    }
}

/// Outcome of [`anneal_until`]
#[derive(Debug, Clone)]
pub struct AnnealingOutcome {
    /// Best run over all attempts
    pub solution: Solution,
    /// Number of SA runs performed
    pub attempts: usize,
    /// Whether the best run is strictly below the target
    pub beat_target: bool,
}

/// Rerun Simulated Annealing with seeds `seed, seed + 1, ...` until a run is
/// strictly shorter than `target` or `max_attempts` runs were made.
pub fn anneal_until(
    matrix: &DistanceMatrix,
    config: &SAConfig,
    target: f64,
    max_attempts: usize,
) -> Result<AnnealingOutcome> {
    if max_attempts == 0 {
        return Err(TspError::config("max_attempts must be positive"));
    }
    config.validate()?;

    let mut best: Option<Solution> = None;
    let mut attempts = 0;

    while attempts < max_attempts {
        let attempt_config = SAConfig {
            seed: config.seed.wrapping_add(attempts as u64),
            ..config.clone()
        };
        let solution = SimulatedAnnealing::new(matrix, attempt_config)?.run();
        attempts += 1;

        info!("[SA] Attempt {}/{}: {:.3} (target {:.3})", attempts, max_attempts, solution.distance, target);

        let beat_target = solution.distance < target;
        if best.as_ref().map_or(true, |b| solution.distance < b.distance) {
            best = Some(solution);
        }
        if beat_target {
            break;
        }
    }

    let solution = best.ok_or_else(|| TspError::config("no annealing run was performed"))?;
    let beat_target = solution.distance < target;
    if !beat_target {
        warn!(
            "[SA] Target {:.3} not beaten after {} attempts, best {:.3}",
            target, attempts, solution.distance
        );
    }

    Ok(AnnealingOutcome {
        solution,
        attempts,
        beat_target,
    })
}
