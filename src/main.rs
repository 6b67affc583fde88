//! TSP Metaheuristics - Command Line Interface
//!
//! Solves a Traveling Salesman instance with a genetic algorithm, simulated
//! annealing, tabu search or ant colony optimization.

use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tsp_metaheuristics::benchmark::{anneal_until, Benchmark, BenchmarkConfig};
use tsp_metaheuristics::heuristics::aco::ACOConfig;
use tsp_metaheuristics::heuristics::annealing::SAConfig;
use tsp_metaheuristics::heuristics::genetic::GAConfig;
use tsp_metaheuristics::heuristics::tabu::TabuConfig;
use tsp_metaheuristics::instance::{load_points, random_points, DistanceMatrix, Metric};
use tsp_metaheuristics::solution::Solution;
use tsp_metaheuristics::solver::{solve, StrategyConfig};

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "tsp-metaheuristics")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Metaheuristics (GA, SA, Tabu, ACO) for the Traveling Salesman Problem")]
struct Cli {
    /// Verbose output (debug logs)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Points file: a line of x values, a line of y values, optionally a line of z values
    #[arg(short, long, required_unless_present = "random")]
    input: Option<PathBuf>,

    /// Generate this many random points in [0, 1000]^2 instead of reading a file
    #[arg(long, conflicts_with = "input")]
    random: Option<usize>,

    /// Seed for random point generation
    #[arg(long, default_value = "0")]
    points_seed: u64,

    /// Distance metric
    #[arg(long, value_enum, default_value = "euclidean")]
    metric: MetricArg,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance with one strategy
    Solve {
        #[command(flatten)]
        input: InputArgs,

        /// Algorithm to use (ignored when --config is given)
        #[arg(short, long, value_enum, default_value = "ga")]
        algorithm: Algorithm,

        /// JSON strategy configuration, e.g. {"strategy": "tabu", "tabu_size": 20}
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Random seed (overrides the configuration)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output solution to JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare all strategies over several seeds
    Compare {
        #[command(flatten)]
        input: InputArgs,

        /// Number of runs per algorithm
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// First seed; run k uses seed + k
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Reference distance used to report gaps
        #[arg(long)]
        reference: Option<f64>,

        /// Output directory for results.csv, statistics.csv and report.txt
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rerun simulated annealing until a target distance is beaten
    Anneal {
        #[command(flatten)]
        input: InputArgs,

        /// JSON simulated annealing configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Distance to beat
        #[arg(short, long)]
        target: f64,

        /// Maximum number of annealing runs
        #[arg(short, long, default_value = "10")]
        max_attempts: usize,

        /// Seed of the first attempt
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output solution to JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Genetic Algorithm
    Ga,
    /// Simulated Annealing
    Sa,
    /// Tabu Search
    Tabu,
    /// Ant Colony Optimization
    Aco,
}

impl Algorithm {
    fn default_config(self) -> StrategyConfig {
        match self {
            Algorithm::Ga => StrategyConfig::Genetic(GAConfig::default()),
            Algorithm::Sa => StrategyConfig::Annealing(SAConfig::default()),
            Algorithm::Tabu => StrategyConfig::Tabu(TabuConfig::default()),
            Algorithm::Aco => StrategyConfig::AntColony(ACOConfig::default()),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum MetricArg {
    /// Euclidean distance
    Euclidean,
    /// Euclidean distance truncated to an integer
    Truncated,
}

impl From<MetricArg> for Metric {
    fn from(metric: MetricArg) -> Self {
        match metric {
            MetricArg::Euclidean => Metric::Euclidean,
            MetricArg::Truncated => Metric::TruncatedEuclidean,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Solve { input, algorithm, config, seed, output } => {
            solve_instance(&input, algorithm, config, seed, output);
        }

        Commands::Compare { input, runs, seed, reference, output } => {
            compare_algorithms(&input, runs, seed, reference, output);
        }

        Commands::Anneal { input, config, target, max_attempts, seed, output } => {
            anneal_instance(&input, config, target, max_attempts, seed, output);
        }
    }
}

fn exit_with(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, error);
    std::process::exit(1);
}

fn load_input(input: &InputArgs) -> (String, DistanceMatrix) {
    let (name, points) = match (&input.input, input.random) {
        (Some(path), _) => {
            println!("Loading points from {:?}...", path);
            let points = load_points(path).unwrap_or_else(|e| exit_with("Error loading points", e));
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "instance".to_string());
            (name, points)
        }
        (None, Some(n)) => (format!("random{}", n), random_points(n, input.points_seed)),
        (None, None) => exit_with("Error", "either --input or --random is required"),
    };

    let matrix = DistanceMatrix::with_metric(&points, input.metric.into())
        .unwrap_or_else(|e| exit_with("Error building distance matrix", e));

    (name, matrix)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> T {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| exit_with("Error reading configuration", e));
    serde_json::from_str(&text).unwrap_or_else(|e| exit_with("Error parsing configuration", e))
}

fn write_solution(solution: &Solution, path: &Path) {
    let json = serde_json::to_string_pretty(solution).unwrap_or_else(|e| exit_with("Error serializing solution", e));
    std::fs::write(path, json).unwrap_or_else(|e| exit_with("Error writing solution", e));
    println!("\nSolution saved to {:?}", path);
}

fn solve_instance(
    input: &InputArgs,
    algorithm: Algorithm,
    config: Option<PathBuf>,
    seed: Option<u64>,
    output: Option<PathBuf>,
) {
    let (name, matrix) = load_input(input);
    println!("Instance {}", name);
    print!("{}", matrix.statistics());

    let mut strategy = match config {
        Some(path) => read_json::<StrategyConfig>(&path),
        None => algorithm.default_config(),
    };
    if let Some(seed) = seed {
        strategy = strategy.with_seed(seed);
    }

    println!("Solving with {}...", strategy.name());
    let solution = solve(&matrix, &strategy).unwrap_or_else(|e| exit_with("Error", e));

    println!("\n========== Results ==========");
    print!("{}", solution);

    if let Some(out_path) = output {
        write_solution(&solution, &out_path);
    }
}

fn compare_algorithms(
    input: &InputArgs,
    runs: usize,
    seed: u64,
    reference: Option<f64>,
    output: Option<PathBuf>,
) {
    let (name, matrix) = load_input(input);
    println!("Comparing algorithms on {} (n={})...\n", name, matrix.len());

    let strategies: Vec<StrategyConfig> = [Algorithm::Ga, Algorithm::Sa, Algorithm::Tabu, Algorithm::Aco]
        .iter()
        .map(|algorithm| algorithm.default_config().with_seed(seed))
        .collect();

    let mut benchmark = Benchmark::new(BenchmarkConfig { num_runs: runs, parallel: true });
    if let Some(reference) = reference {
        benchmark.set_reference(&name, reference);
    }

    let progress = ProgressBar::new(strategies.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    for strategy in &strategies {
        progress.set_message(strategy.name());
        benchmark
            .run_strategy(&name, &matrix, strategy)
            .unwrap_or_else(|e| exit_with("Error", e));
        progress.inc(1);
    }
    progress.finish_with_message("done");

    let report = benchmark.generate_report();
    println!("\n{}", report);

    if let Some(output) = output {
        std::fs::create_dir_all(&output).unwrap_or_else(|e| exit_with("Error creating output directory", e));

        let results_path = output.join("results.csv");
        benchmark.export_to_csv(&results_path).unwrap_or_else(|e| exit_with("Error exporting results", e));
        println!("Results exported to {:?}", results_path);

        let stats_path = output.join("statistics.csv");
        benchmark
            .export_statistics_csv(&stats_path)
            .unwrap_or_else(|e| exit_with("Error exporting statistics", e));
        println!("Statistics exported to {:?}", stats_path);

        let report_path = output.join("report.txt");
        std::fs::write(&report_path, &report).unwrap_or_else(|e| exit_with("Error saving report", e));
        println!("Report saved to {:?}", report_path);
    }
}

fn anneal_instance(
    input: &InputArgs,
    config: Option<PathBuf>,
    target: f64,
    max_attempts: usize,
    seed: Option<u64>,
    output: Option<PathBuf>,
) {
    let (name, matrix) = load_input(input);

    let mut sa_config = match config {
        Some(path) => read_json::<SAConfig>(&path),
        None => SAConfig::default(),
    };
    if let Some(seed) = seed {
        sa_config.seed = seed;
    }

    println!("Annealing {} (n={}) until distance < {:.2}...", name, matrix.len(), target);
    let outcome = anneal_until(&matrix, &sa_config, target, max_attempts).unwrap_or_else(|e| exit_with("Error", e));

    println!("\n========== Results ==========");
    println!("Attempts: {}", outcome.attempts);
    println!("Target beaten: {}", outcome.beat_target);
    print!("{}", outcome.solution);

    if let Some(out_path) = output {
        write_solution(&outcome.solution, &out_path);
    }
}
