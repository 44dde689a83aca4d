//! TTP Solver - Command Line Interface

use clap::{Parser, Subcommand, ValueEnum};
use ttp_solver::engine::{Engine, EngineConfig, SelectionKind};
use ttp_solver::genotype::{CrossoverKind, MutationKind};
use ttp_solver::instance::TtpInstance;
use ttp_solver::knapsack::{GreedyCriterion, KnapsackKind};
use ttp_solver::sweep::{Sweep, SweepConfig};
use ttp_solver::visualization::Visualizer;
use ttp_solver::Result;

use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "ttp-solver")]
#[command(version = "1.0")]
#[command(about = "A genetic-algorithm solver for the Traveling Thief Problem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a TTP instance with the genetic engine
    Solve {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Population size
        #[arg(short, long, default_value = "100")]
        population_size: usize,

        /// Number of generations
        #[arg(short, long, default_value = "200")]
        generations: usize,

        /// Stop early once the best fitness reaches this value
        #[arg(long)]
        target_fitness: Option<f64>,

        /// Mutation probability in [0, 1]
        #[arg(long, default_value = "0.1")]
        mutation_rate: f64,

        /// Fraction of the population copied forward unchanged
        #[arg(long, default_value = "0")]
        survival_rate: f64,

        /// Disable elitism (the best individual is still tracked separately)
        #[arg(long)]
        no_keep_best: bool,

        /// Selection method
        #[arg(long, value_enum, default_value = "tournament")]
        selection: Selection,

        /// Crossover operator
        #[arg(long, value_enum, default_value = "pmx")]
        crossover: Crossover,

        /// Mutation operator
        #[arg(long, value_enum, default_value = "inverse")]
        mutation: Mutation,

        /// Knapsack strategy
        #[arg(long, value_enum, default_value = "greedy-static")]
        knapsack: Knapsack,

        /// Greedy ordering criterion
        #[arg(long, value_enum, default_value = "ratio")]
        criterion: Criterion,

        /// Tournament size (tournament selection only)
        #[arg(long, default_value = "30")]
        tournament_size: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Write the run summary as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Generate an SVG visualization of the best tour
        #[arg(long)]
        visualize: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Sweep one engine parameter across a list of values
    Sweep {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Engine parameter to vary (e.g. mutation_rate, crossover_method)
        #[arg(short, long)]
        param: String,

        /// Comma-separated list of values to try
        #[arg(long, value_delimiter = ',')]
        values: Vec<String>,

        /// Runs per value
        #[arg(long, default_value = "10")]
        sample: usize,

        /// Generations per run
        #[arg(short, long, default_value = "200")]
        generations: usize,

        /// Population size per run
        #[arg(long, default_value = "100")]
        population_size: usize,

        /// Output directory for CSV results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Skip the run-time estimation probe
        #[arg(long)]
        skip_estimate: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Selection {
    Roulette,
    Tournament,
    RandomSearch,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Crossover {
    Simple,
    Ox,
    Cx,
    Pmx,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Mutation {
    Swap,
    Inverse,
    Shuffle,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Knapsack {
    GreedyStatic,
    GreedyDynamic,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Criterion {
    Ratio,
    Value,
    Weight,
}

impl From<Selection> for SelectionKind {
    fn from(s: Selection) -> Self {
        match s {
            Selection::Roulette => SelectionKind::Roulette,
            Selection::Tournament => SelectionKind::Tournament,
            Selection::RandomSearch => SelectionKind::RandomSearch,
        }
    }
}

impl From<Crossover> for CrossoverKind {
    fn from(c: Crossover) -> Self {
        match c {
            Crossover::Simple => CrossoverKind::Simple,
            Crossover::Ox => CrossoverKind::Order,
            Crossover::Cx => CrossoverKind::Cycle,
            Crossover::Pmx => CrossoverKind::PartiallyMapped,
        }
    }
}

impl From<Mutation> for MutationKind {
    fn from(m: Mutation) -> Self {
        match m {
            Mutation::Swap => MutationKind::Swap,
            Mutation::Inverse => MutationKind::Inverse,
            Mutation::Shuffle => MutationKind::Shuffle,
        }
    }
}

impl From<Knapsack> for KnapsackKind {
    fn from(k: Knapsack) -> Self {
        match k {
            Knapsack::GreedyStatic => KnapsackKind::GreedyStatic,
            Knapsack::GreedyDynamic => KnapsackKind::GreedyDynamic,
        }
    }
}

impl From<Criterion> for GreedyCriterion {
    fn from(c: Criterion) -> Self {
        match c {
            Criterion::Ratio => GreedyCriterion::Ratio,
            Criterion::Value => GreedyCriterion::Value,
            Criterion::Weight => GreedyCriterion::Weight,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Solve {
            instance,
            population_size,
            generations,
            target_fitness,
            mutation_rate,
            survival_rate,
            no_keep_best,
            selection,
            crossover,
            mutation,
            knapsack,
            criterion,
            tournament_size,
            seed,
            output,
            visualize,
            verbose,
        } => solve_instance(SolveArgs {
            instance,
            population_size,
            generations,
            target_fitness,
            mutation_rate,
            survival_rate,
            no_keep_best,
            selection,
            crossover,
            mutation,
            knapsack,
            criterion,
            tournament_size,
            seed,
            output,
            visualize,
            verbose,
        }),

        Commands::Analyze { instance } => analyze_instance(&instance),

        Commands::Sweep {
            instance,
            param,
            values,
            sample,
            generations,
            population_size,
            output,
            skip_estimate,
        } => run_sweep(
            &instance,
            &param,
            values,
            sample,
            generations,
            population_size,
            &output,
            skip_estimate,
        ),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct SolveArgs {
    instance: PathBuf,
    population_size: usize,
    generations: usize,
    target_fitness: Option<f64>,
    mutation_rate: f64,
    survival_rate: f64,
    no_keep_best: bool,
    selection: Selection,
    crossover: Crossover,
    mutation: Mutation,
    knapsack: Knapsack,
    criterion: Criterion,
    tournament_size: usize,
    seed: u64,
    output: Option<PathBuf>,
    visualize: bool,
    verbose: bool,
}

fn solve_instance(args: SolveArgs) -> Result<()> {
    println!("Loading instance from {:?}...", args.instance);
    let instance = TtpInstance::from_file(&args.instance)?;

    if args.verbose {
        println!("{}", instance.statistics());
    }

    let config = EngineConfig {
        population_size: args.population_size,
        mutation_rate: args.mutation_rate,
        keep_best: !args.no_keep_best,
        survival_rate: args.survival_rate,
        selection: args.selection.into(),
        crossover: args.crossover.into(),
        mutation: args.mutation.into(),
        knapsack: args.knapsack.into(),
        greedy_criterion: args.criterion.into(),
        tournament_size: args.tournament_size,
        generations: Some(args.generations),
        target_fitness: args.target_fitness,
        seed: args.seed,
        ..Default::default()
    };

    println!(
        "Solving with selection={:?} crossover={:?} mutation={:?} knapsack={:?}...",
        args.selection, args.crossover, args.mutation, args.knapsack
    );

    let start = Instant::now();
    let mut engine = Engine::new(instance, config)?;
    let summary = engine.run()?;
    let elapsed = start.elapsed();

    println!("\n========== Results ==========");
    println!("Best fitness: {:.3}", summary.best_fitness);
    println!("Generations: {}", summary.generations);
    println!("Evaluations: {}", summary.evaluations);
    println!("Time: {:.4}s", elapsed.as_secs_f64());

    if args.verbose {
        println!("\nBest tour: {:?}", summary.best_order);
        let snapshot = engine.snapshot();
        println!("Distinct fitness values: {}", snapshot.distinct_fitness_values);
    }

    if let Some(out_path) = &args.output {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| ttp_solver::SolverError::Data(format!("json write: {}", e)))?;
        std::fs::write(out_path, json)
            .map_err(|e| ttp_solver::SolverError::Data(format!("write {:?}: {}", out_path, e)))?;
        println!("\nSummary saved to {:?}", out_path);
    }

    if args.visualize {
        if let Some(report) = engine.best_report() {
            let viz = Visualizer::new();
            let svg = viz.generate_svg(engine.instance(), &report);
            let svg_path = args.instance.with_extension("svg");
            viz.save_svg(&svg, &svg_path)
                .map_err(|e| ttp_solver::SolverError::Data(format!("save svg: {}", e)))?;
            println!("Visualization saved to {:?}", svg_path);
        }
    }

    Ok(())
}

fn analyze_instance(path: &PathBuf) -> Result<()> {
    let instance = TtpInstance::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let items_per_city = instance.item_count() as f64 / instance.dimension.max(1) as f64;
    println!("  Items per city: {:.2}", items_per_city);
    if instance.capacity > 0 {
        println!(
            "  Weight/capacity ratio: {:.2}",
            instance.total_item_weight() as f64 / instance.capacity as f64
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_sweep(
    path: &PathBuf,
    param: &str,
    values: Vec<String>,
    sample: usize,
    generations: usize,
    population_size: usize,
    output: &PathBuf,
    skip_estimate: bool,
) -> Result<()> {
    let instance = TtpInstance::from_file(path)?;

    let base = EngineConfig {
        population_size,
        generations: Some(generations),
        ..Default::default()
    };

    let mut sweep = Sweep::new(SweepConfig {
        param: param.to_string(),
        values,
        sample,
        base,
    });

    println!(
        "Sweeping '{}' on {} ({} trials)...",
        param,
        instance.name,
        sweep.trial_count()
    );

    if !skip_estimate {
        let total = sweep.estimate_time(&instance)?;
        let h = (total / 3600.0) as u64;
        let m = ((total % 3600.0) / 60.0) as u64;
        let s = (total % 60.0) as u64;
        println!("Estimated time: {:02}:{:02}:{:02}", h, m, s);
    }

    sweep.run(&instance)?;

    std::fs::create_dir_all(output)
        .map_err(|e| ttp_solver::SolverError::Data(format!("create {:?}: {}", output, e)))?;

    let base_name = sweep.timestamped_name();

    let results_path = output.join(format!("{}.csv", base_name));
    sweep.export_results_csv(&results_path)?;
    println!("Results exported to {:?}", results_path);

    let curves_path = output.join(format!("{}.curves.csv", base_name));
    sweep.export_curves_csv(&curves_path)?;
    println!("Curves exported to {:?}", curves_path);

    println!("\n{}", sweep.report());

    Ok(())
}
