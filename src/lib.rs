//! TTP Solver Library
//!
//! A genetic-algorithm solver for the Traveling Thief Problem (TTP): a
//! combined routing and knapsack optimization where a thief visits every city
//! exactly once, optionally collects items into a capacity-limited knapsack,
//! and travels slower the heavier the knapsack gets.
//!
//! # Features
//!
//! - Permutation genotypes with four crossover operators (simple, OX, CX, PMX)
//!   and three mutations (swap, inverse, shuffle)
//! - Static and dynamic greedy knapsack selection (ratio/value/weight)
//! - Memoized fitness evaluation (value minus load-dependent travel time)
//! - Roulette, tournament and random-search selection with elitism and
//!   survivor retention
//! - Parameter-sweep harness with CSV export and SVG tour visualization
//!
//! # Example
//!
//! ```no_run
//! use ttp_solver::engine::{Engine, EngineConfig};
//! use ttp_solver::instance::TtpInstance;
//!
//! let instance = TtpInstance::from_file("instance.ttp").unwrap();
//!
//! let config = EngineConfig {
//!     population_size: 100,
//!     generations: Some(200),
//!     ..Default::default()
//! };
//!
//! let mut engine = Engine::new(instance, config).unwrap();
//! let summary = engine.run().unwrap();
//!
//! println!("Best fitness: {:.2}", summary.best_fitness);
//! ```

pub mod engine;
pub mod entity;
pub mod error;
pub mod fitness;
pub mod genotype;
pub mod instance;
pub mod knapsack;
pub mod sweep;
pub mod visualization;

pub use engine::{Engine, EngineConfig};
pub use error::{Result, SolverError};
pub use instance::TtpInstance;
