//! Parameter-sweep experiment harness.
//!
//! Varies exactly one engine parameter across a list of values, running each
//! setting several times with distinct seeds, and collects per-trial results
//! and per-generation fitness curves for CSV export. Every trial gets a fresh
//! engine, so fitness caches never leak between configurations.

use crate::engine::{Engine, EngineConfig};
use crate::error::Result;
use crate::instance::TtpInstance;
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// Sweep configuration: one mutable parameter, a value list and a sample
/// count per value.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Engine parameter to vary (a name `EngineConfig::set_param` accepts)
    pub param: String,
    /// Values to try, parsed per trial
    pub values: Vec<String>,
    /// Repetitions per value, each with its own seed
    pub sample: usize,
    /// Base configuration shared by all trials
    pub base: EngineConfig,
}

/// Outcome of one trial.
#[derive(Debug, Clone, Serialize)]
pub struct TrialResult {
    pub instance: String,
    pub param: String,
    pub value: String,
    pub run: usize,
    pub best_fitness: f64,
    pub generations: usize,
    pub evaluations: usize,
    pub time: f64,
}

/// One generation of one trial's fitness curve.
#[derive(Debug, Clone, Serialize)]
pub struct CurvePoint {
    pub param: String,
    pub value: String,
    pub run: usize,
    pub generation: usize,
    pub min_fitness: f64,
    pub avg_fitness: f64,
    pub max_fitness: f64,
}

/// Sweep driver collecting trial results and fitness curves.
pub struct Sweep {
    config: SweepConfig,
    results: Vec<TrialResult>,
    curves: Vec<CurvePoint>,
}

impl Sweep {
    pub fn new(config: SweepConfig) -> Self {
        Sweep {
            config,
            results: Vec::new(),
            curves: Vec::new(),
        }
    }

    /// Number of trials this sweep will run.
    pub fn trial_count(&self) -> usize {
        self.config.values.len() * self.config.sample
    }

    /// Build the engine configuration for one trial. Each run gets its own
    /// seed so samples are independent but reproducible.
    fn trial_config(&self, value: &str, run: usize) -> Result<EngineConfig> {
        let mut config = self.config.base.clone();
        config.set_param(&self.config.param, value)?;
        config.seed = self.config.base.seed.wrapping_add(run as u64);
        Ok(config)
    }

    /// Estimate the total wall-clock time by timing a single probe trial and
    /// scaling by the trial count.
    pub fn estimate_time(&self, instance: &TtpInstance) -> Result<f64> {
        let value = match self.config.values.first() {
            Some(v) => v,
            None => return Ok(0.0),
        };

        let config = self.trial_config(value, 0)?;
        let mut engine = Engine::new(instance.clone(), config)?;

        let start = Instant::now();
        engine.run()?;
        let per_trial = start.elapsed().as_secs_f64();

        Ok(per_trial * self.trial_count() as f64)
    }

    /// Execute every trial, collecting results and curves.
    pub fn run(&mut self, instance: &TtpInstance) -> Result<()> {
        let bar = ProgressBar::new(self.trial_count() as u64);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for value in self.config.values.clone() {
            bar.set_message(format!("{}={}", self.config.param, value));

            for run in 0..self.config.sample {
                let config = self.trial_config(&value, run)?;
                let mut engine = Engine::new(instance.clone(), config)?;

                let start = Instant::now();
                let summary = engine.run()?;
                let elapsed = start.elapsed().as_secs_f64();

                self.results.push(TrialResult {
                    instance: instance.name.clone(),
                    param: self.config.param.clone(),
                    value: value.clone(),
                    run,
                    best_fitness: summary.best_fitness,
                    generations: summary.generations,
                    evaluations: summary.evaluations,
                    time: elapsed,
                });

                for stats in engine.history() {
                    self.curves.push(CurvePoint {
                        param: self.config.param.clone(),
                        value: value.clone(),
                        run,
                        generation: stats.generation,
                        min_fitness: stats.min_fitness,
                        avg_fitness: stats.avg_fitness,
                        max_fitness: stats.max_fitness,
                    });
                }

                bar.inc(1);
            }
        }

        bar.finish_and_clear();
        Ok(())
    }

    pub fn results(&self) -> &[TrialResult] {
        &self.results
    }

    /// Export per-trial results to CSV.
    pub fn export_results_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| crate::error::SolverError::Data(format!("csv write: {}", e)))?;
        for row in &self.results {
            writer
                .serialize(row)
                .map_err(|e| crate::error::SolverError::Data(format!("csv write: {}", e)))?;
        }
        writer
            .flush()
            .map_err(|e| crate::error::SolverError::Data(format!("csv write: {}", e)))?;
        Ok(())
    }

    /// Export per-generation fitness curves to CSV.
    pub fn export_curves_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| crate::error::SolverError::Data(format!("csv write: {}", e)))?;
        for row in &self.curves {
            writer
                .serialize(row)
                .map_err(|e| crate::error::SolverError::Data(format!("csv write: {}", e)))?;
        }
        writer
            .flush()
            .map_err(|e| crate::error::SolverError::Data(format!("csv write: {}", e)))?;
        Ok(())
    }

    /// Human-readable summary: per value, average and best of the best
    /// fitnesses across runs.
    pub fn report(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Sweep over '{}'\n", self.config.param));
        out.push_str(&format!(
            "{:<15} {:>12} {:>12} {:>8}\n",
            "value", "avg best", "best", "runs"
        ));

        for value in &self.config.values {
            let best_fitnesses: Vec<f64> = self
                .results
                .iter()
                .filter(|r| &r.value == value)
                .map(|r| r.best_fitness)
                .collect();
            if best_fitnesses.is_empty() {
                continue;
            }
            let avg = best_fitnesses.iter().sum::<f64>() / best_fitnesses.len() as f64;
            let best = best_fitnesses
                .iter()
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max);
            out.push_str(&format!(
                "{:<15} {:>12.3} {:>12.3} {:>8}\n",
                value,
                avg,
                best,
                best_fitnesses.len()
            ));
        }

        out
    }

    /// Base file name carrying the sweep parameter and a timestamp. Called
    /// once per export batch so every derived file shares the same stamp.
    pub fn timestamped_name(&self) -> String {
        format!(
            "sweep_{}_{}",
            self.config.param,
            Local::now().format("%Y%m%d_%H%M%S")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;

    fn unit_square() -> TtpInstance {
        let cities = vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 1.0, 0.0),
            City::new(2, 1.0, 1.0),
            City::new(3, 0.0, 1.0),
        ];
        TtpInstance::new("square", cities, Vec::new(), 10, 1.0, 1.0).unwrap()
    }

    fn small_base() -> EngineConfig {
        EngineConfig {
            population_size: 10,
            generations: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_sweep_collects_all_trials() {
        let mut sweep = Sweep::new(SweepConfig {
            param: "mutation_rate".to_string(),
            values: vec!["0.0".to_string(), "0.5".to_string()],
            sample: 3,
            base: small_base(),
        });

        sweep.run(&unit_square()).unwrap();

        assert_eq!(sweep.results().len(), 6);
        // Two generations per trial.
        assert_eq!(sweep.curves.len(), 12);

        let report = sweep.report();
        assert!(report.contains("mutation_rate"));
        assert!(report.contains("0.5"));
    }

    #[test]
    fn test_sweep_rejects_unknown_parameter() {
        let mut sweep = Sweep::new(SweepConfig {
            param: "colony_size".to_string(),
            values: vec!["1".to_string()],
            sample: 1,
            base: small_base(),
        });

        assert!(sweep.run(&unit_square()).is_err());
    }

    #[test]
    fn test_timestamped_name_is_a_shared_base() {
        let sweep = Sweep::new(SweepConfig {
            param: "mutation_rate".to_string(),
            values: vec!["0.1".to_string()],
            sample: 1,
            base: small_base(),
        });

        // One base name per export batch; extensions are appended by callers.
        let name = sweep.timestamped_name();
        assert!(name.starts_with("sweep_mutation_rate_"));
        let stamp = name.strip_prefix("sweep_mutation_rate_").unwrap();
        assert_eq!(stamp.len(), "20260826_120000".len());
        assert!(!name.ends_with(".csv"));
    }

    #[test]
    fn test_sweep_over_methods() {
        let mut sweep = Sweep::new(SweepConfig {
            param: "crossover_method".to_string(),
            values: ["simple", "ox", "cx", "pmx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sample: 2,
            base: small_base(),
        });

        sweep.run(&unit_square()).unwrap();
        assert_eq!(sweep.results().len(), 8);
    }
}
