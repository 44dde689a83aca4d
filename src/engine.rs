//! Generational engine driving the genetic search.
//!
//! Holds the population, runs the evaluate/sort/select loop, and exposes
//! per-generation statistics, a configuration snapshot and the best tour to
//! the outside world.

use crate::entity::Entity;
use crate::error::{Result, SolverError};
use crate::fitness::FitnessEvaluator;
use crate::genotype::{CrossoverKind, MutationKind};
use crate::instance::TtpInstance;
use crate::knapsack::{GreedyCriterion, KnapsackKind};
use log::{debug, info};
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::str::FromStr;

/// Selection method kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// Parents drawn proportionally to a softmax of fitness
    Roulette,
    /// Each parent is the fittest of a uniform random sample
    Tournament,
    /// Baseline control: keep the best, replace everyone else randomly
    RandomSearch,
}

impl FromStr for SelectionKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "roulette" => Ok(SelectionKind::Roulette),
            "tournament" => Ok(SelectionKind::Tournament),
            "random-search" => Ok(SelectionKind::RandomSearch),
            other => Err(SolverError::Configuration(format!(
                "unknown selection method '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SelectionKind::Roulette => "roulette",
            SelectionKind::Tournament => "tournament",
            SelectionKind::RandomSearch => "random-search",
        };
        write!(f, "{}", name)
    }
}

/// Engine configuration, validated at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Population size
    pub population_size: usize,
    /// Probability of mutating a freshly mated child, in [0, 1]
    pub mutation_rate: f64,
    /// Carry the best entity forward unchanged as slot 0
    pub keep_best: bool,
    /// Fraction of the prior population copied forward unchanged, in [0, 1]
    pub survival_rate: f64,
    /// Selection method
    pub selection: SelectionKind,
    /// Crossover operator
    pub crossover: CrossoverKind,
    /// Mutation operator
    pub mutation: MutationKind,
    /// Knapsack strategy
    pub knapsack: KnapsackKind,
    /// Greedy ordering criterion for the knapsack
    pub greedy_criterion: GreedyCriterion,
    /// Sample size per parent draw (tournament selection only)
    pub tournament_size: usize,
    /// Number of generations to run; `None` runs until the target is hit
    pub generations: Option<usize>,
    /// Stop as soon as the best fitness reaches this value
    pub target_fitness: Option<f64>,
    /// Log statistics at info level every this many generations
    pub log_every: usize,
    /// Seed for the run's single random source
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            population_size: 100,
            mutation_rate: 0.1,
            keep_best: true,
            survival_rate: 0.0,
            selection: SelectionKind::Tournament,
            crossover: CrossoverKind::PartiallyMapped,
            mutation: MutationKind::Inverse,
            knapsack: KnapsackKind::GreedyStatic,
            greedy_criterion: GreedyCriterion::Ratio,
            tournament_size: 30,
            generations: Some(100),
            target_fitness: None,
            log_every: 10,
            seed: 42,
        }
    }
}

impl EngineConfig {
    /// Check parameter ranges. Methods themselves are typed, so only the
    /// numeric fields can be out of range.
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(SolverError::Configuration(
                "population_size must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(SolverError::Configuration(format!(
                "mutation_rate {} outside [0, 1]",
                self.mutation_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.survival_rate) {
            return Err(SolverError::Configuration(format!(
                "survival_rate {} outside [0, 1]",
                self.survival_rate
            )));
        }
        if self.selection == SelectionKind::Tournament && self.tournament_size == 0 {
            return Err(SolverError::Configuration(
                "tournament_size must be positive for tournament selection".into(),
            ));
        }
        if self.log_every == 0 {
            return Err(SolverError::Configuration("log_every must be positive".into()));
        }
        Ok(())
    }

    /// Update one recognized option by name. Unrecognized names fail instead
    /// of silently creating untracked state.
    pub fn set_param(&mut self, name: &str, value: &str) -> Result<()> {
        let bad_value = |what: &str| {
            SolverError::Configuration(format!("invalid {} value '{}'", what, value))
        };

        match name {
            "population_size" => {
                self.population_size = value.parse().map_err(|_| bad_value(name))?
            }
            "mutation_rate" => self.mutation_rate = value.parse().map_err(|_| bad_value(name))?,
            "keep_best" => self.keep_best = value.parse().map_err(|_| bad_value(name))?,
            "survival_rate" => self.survival_rate = value.parse().map_err(|_| bad_value(name))?,
            "selection_method" => self.selection = value.parse()?,
            "crossover_method" => self.crossover = value.parse()?,
            "mutation_method" => self.mutation = value.parse()?,
            "knapsack_method" => self.knapsack = value.parse()?,
            "greedy_criterion" => self.greedy_criterion = value.parse()?,
            "tournament_size" => {
                self.tournament_size = value.parse().map_err(|_| bad_value(name))?
            }
            "generations" => self.generations = Some(value.parse().map_err(|_| bad_value(name))?),
            "target_fitness" => {
                self.target_fitness = Some(value.parse().map_err(|_| bad_value(name))?)
            }
            "log_every" => self.log_every = value.parse().map_err(|_| bad_value(name))?,
            "seed" => self.seed = value.parse().map_err(|_| bad_value(name))?,
            other => {
                return Err(SolverError::Configuration(format!(
                    "unknown engine parameter '{}'",
                    other
                )))
            }
        }

        self.validate()
    }
}

/// Fitness statistics of one evaluated generation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub min_fitness: f64,
    pub avg_fitness: f64,
    pub max_fitness: f64,
}

/// Configuration snapshot for experiment logging.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub population_size: usize,
    pub mutation_rate: f64,
    pub keep_best: bool,
    pub survival_rate: f64,
    pub selection_method: String,
    pub crossover_method: String,
    pub mutation_method: String,
    pub knapsack_method: String,
    pub greedy_criterion: String,
    pub tournament_size: usize,
    pub generations_run: usize,
    pub distinct_fitness_values: usize,
}

/// Best tour in the form the visualization collaborator consumes.
#[derive(Debug, Clone, Serialize)]
pub struct TourReport {
    /// Directed edges of the decoded tour
    pub edges: Vec<(usize, usize)>,
    /// Per city: whether any of its items is carried
    pub carried: Vec<bool>,
    pub fitness: f64,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub best_order: Vec<usize>,
    pub best_fitness: f64,
    pub generations: usize,
    pub evaluations: usize,
}

/// The generational engine. Owns the population, the evaluator and the run's
/// single random source.
pub struct Engine {
    config: EngineConfig,
    instance: TtpInstance,
    population: Vec<Entity>,
    evaluator: FitnessEvaluator,
    /// Snapshot of the best individual ever seen; kept when elitism is off so
    /// selection pressure cannot lose the true best.
    best_ever: Option<Entity>,
    history: Vec<GenerationStats>,
    rng: ChaCha8Rng,
}

impl Engine {
    /// Validate the configuration and set up the evaluator. The static
    /// knapsack strategy runs its single selection pass here, before any
    /// population exists.
    pub fn new(instance: TtpInstance, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let evaluator =
            FitnessEvaluator::new(&instance, config.knapsack, config.greedy_criterion);
        let rng = ChaCha8Rng::seed_from_u64(config.seed);

        Ok(Engine {
            config,
            instance,
            population: Vec::new(),
            evaluator,
            best_ever: None,
            history: Vec::new(),
            rng,
        })
    }

    /// Generate the initial random population, clearing any previous run
    /// state including the fitness cache.
    pub fn initialize(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.evaluator.reset();
        self.best_ever = None;
        self.history.clear();

        self.population = (0..self.config.population_size)
            .map(|_| Entity::random(self.instance.dimension, &mut self.rng))
            .collect();
    }

    /// Run the generational loop until a stop condition triggers. With
    /// neither a generation cap nor a target fitness configured this loops
    /// until externally stopped.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.initialize();

        loop {
            self.evaluate()?;
            self.record_stats();

            if self.terminated() {
                break;
            }

            self.select()?;
        }

        let best = self
            .best()
            .ok_or_else(|| SolverError::InvariantViolation("empty population".into()))?;

        Ok(RunSummary {
            best_order: best.genotype.order().to_vec(),
            best_fitness: best.fitness.unwrap_or(f64::NEG_INFINITY),
            generations: self.history.len(),
            evaluations: self.evaluator.evaluations(),
        })
    }

    /// Score every entity lacking a fitness, then sort descending. Survivors
    /// keep their cached score and are skipped.
    fn evaluate(&mut self) -> Result<()> {
        for entity in self.population.iter_mut() {
            if entity.fitness.is_none() {
                entity.fitness = Some(self.evaluator.evaluate(&entity.genotype, &self.instance)?);
            }
        }

        // Stable sort: ties keep their input order.
        self.population
            .sort_by_key(|e| OrderedFloat(-e.fitness.unwrap_or(f64::NEG_INFINITY)));

        if !self.config.keep_best {
            let top = &self.population[0];
            let improved = self
                .best_ever
                .as_ref()
                .map_or(true, |b| top.fitness > b.fitness);
            if improved {
                self.best_ever = Some(top.clone());
            }
        }

        Ok(())
    }

    fn record_stats(&mut self) {
        let fitnesses: Vec<f64> = self
            .population
            .iter()
            .filter_map(|e| e.fitness)
            .collect();
        let min = fitnesses.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = fitnesses.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let avg = fitnesses.iter().sum::<f64>() / fitnesses.len() as f64;

        let stats = GenerationStats {
            generation: self.history.len(),
            min_fitness: min,
            avg_fitness: avg,
            max_fitness: max,
        };

        if stats.generation % self.config.log_every == 0 {
            info!(
                "gen {}  min {:.3}  avg {:.3}  max {:.3}",
                stats.generation, stats.min_fitness, stats.avg_fitness, stats.max_fitness
            );
        } else {
            debug!(
                "gen {}  min {:.3}  avg {:.3}  max {:.3}",
                stats.generation, stats.min_fitness, stats.avg_fitness, stats.max_fitness
            );
        }

        self.history.push(stats);
    }

    fn terminated(&self) -> bool {
        if let Some(cap) = self.config.generations {
            if self.history.len() >= cap {
                return true;
            }
        }
        if let Some(target) = self.config.target_fitness {
            if let Some(stats) = self.history.last() {
                if stats.max_fitness >= target {
                    return true;
                }
            }
        }
        false
    }

    /// Build the next generation: elite, survivors, then mating fill.
    fn select(&mut self) -> Result<()> {
        let size = self.config.population_size;

        if self.config.selection == SelectionKind::RandomSearch {
            // Control condition: only the best survives, everyone else is
            // replaced by a fresh random genotype.
            let mut next = Vec::with_capacity(size);
            next.push(self.population[0].clone());
            while next.len() < size {
                next.push(Entity::random(self.instance.dimension, &mut self.rng));
            }
            self.population = next;
            return Ok(());
        }

        let mut next = Vec::with_capacity(size);

        if self.config.keep_best {
            next.push(self.population[0].clone());
        }

        let survivor_count = ((self.config.survival_rate * size as f64).floor() as usize)
            .min(size - next.len());
        if survivor_count > 0 {
            let pool = if self.config.keep_best {
                &self.population[1..]
            } else {
                &self.population[..]
            };
            next.extend(
                pool.choose_multiple(&mut self.rng, survivor_count)
                    .cloned(),
            );
        }

        // Roulette weights cover the entire prior population.
        let weights = match self.config.selection {
            SelectionKind::Roulette => {
                let fitnesses: Vec<f64> = self
                    .population
                    .iter()
                    .map(|e| e.fitness.unwrap_or(f64::NEG_INFINITY))
                    .collect();
                Some(softmax_weights(&fitnesses))
            }
            _ => None,
        };

        while next.len() < size {
            let a = self.parent_index(weights.as_deref());
            let b = self.parent_index(weights.as_deref());
            let child = self.population[a].mate(
                &self.population[b],
                self.config.mutation_rate,
                self.config.crossover,
                self.config.mutation,
                &mut self.rng,
            );
            next.push(child);
        }

        self.population = next;
        Ok(())
    }

    fn parent_index(&mut self, weights: Option<&[f64]>) -> usize {
        match self.config.selection {
            SelectionKind::Roulette => {
                let weights = weights.expect("roulette weights prepared in select");
                let total: f64 = weights.iter().sum();
                let mut pick = self.rng.gen::<f64>() * total;
                for (i, &w) in weights.iter().enumerate() {
                    pick -= w;
                    if pick <= 0.0 {
                        return i;
                    }
                }
                weights.len() - 1
            }
            SelectionKind::Tournament => {
                let n = self.population.len();
                let mut best = self.rng.gen_range(0..n);
                for _ in 1..self.config.tournament_size {
                    let idx = self.rng.gen_range(0..n);
                    if self.population[idx].fitness > self.population[best].fitness {
                        best = idx;
                    }
                }
                best
            }
            SelectionKind::RandomSearch => unreachable!("random-search bypasses mating"),
        }
    }

    /// The best individual seen so far: the current top of the population, or
    /// the best-ever snapshot when elitism is off and it is still ahead.
    pub fn best(&self) -> Option<&Entity> {
        let top = self.population.first();
        match (top, self.best_ever.as_ref()) {
            (Some(t), Some(b)) => {
                if b.fitness > t.fitness {
                    Some(b)
                } else {
                    Some(t)
                }
            }
            (Some(t), None) => Some(t),
            (None, b) => b,
        }
    }

    /// Best tour in the shape the visualization collaborator consumes.
    pub fn best_report(&self) -> Option<TourReport> {
        let best = self.best()?;
        let fitness = best.fitness?;
        let selection = self.evaluator.selection_for(&best.genotype, &self.instance);
        let carried = (0..self.instance.dimension)
            .map(|city| selection.carries_from(&self.instance, city))
            .collect();

        Some(TourReport {
            edges: best.genotype.decode(),
            carried,
            fitness,
        })
    }

    /// Per-generation statistics recorded so far.
    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    /// Configuration snapshot for experiment logging.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            population_size: self.config.population_size,
            mutation_rate: self.config.mutation_rate,
            keep_best: self.config.keep_best,
            survival_rate: self.config.survival_rate,
            selection_method: self.config.selection.to_string(),
            crossover_method: self.config.crossover.to_string(),
            mutation_method: self.config.mutation.to_string(),
            knapsack_method: self.config.knapsack.to_string(),
            greedy_criterion: self.config.greedy_criterion.to_string(),
            tournament_size: self.config.tournament_size,
            generations_run: self.history.len(),
            distinct_fitness_values: self.evaluator.distinct_fitness_count(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn instance(&self) -> &TtpInstance {
        &self.instance
    }
}

/// Numerically stable softmax weights: the maximum fitness is subtracted
/// before exponentiating so large fitness values cannot overflow.
fn softmax_weights(fitnesses: &[f64]) -> Vec<f64> {
    let max = fitnesses.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    fitnesses.iter().map(|&f| (f - max).exp()).collect()
}
