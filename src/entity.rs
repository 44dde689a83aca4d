//! An individual of the population: genotype plus cached fitness.

use crate::genotype::{CrossoverKind, Genotype, MutationKind};
use rand::prelude::*;

/// One individual. `fitness` is `None` until the evaluator scores it.
#[derive(Debug, Clone)]
pub struct Entity {
    pub genotype: Genotype,
    pub fitness: Option<f64>,
}

impl Entity {
    /// Wrap a genotype as an unevaluated entity.
    pub fn new(genotype: Genotype) -> Self {
        Entity { genotype, fitness: None }
    }

    /// An unevaluated entity with a uniformly random genotype.
    pub fn random(size: usize, rng: &mut impl Rng) -> Self {
        Entity::new(Genotype::random(size, rng))
    }

    /// Produce a child: crossover with the partner, then mutation with
    /// probability `mutation_rate`. The child starts unevaluated.
    pub fn mate(
        &self,
        other: &Entity,
        mutation_rate: f64,
        crossover: CrossoverKind,
        mutation: MutationKind,
        rng: &mut impl Rng,
    ) -> Entity {
        let mut child = self.genotype.crossover(&other.genotype, crossover, rng);
        if rng.gen::<f64>() < mutation_rate {
            child.mutate(mutation, rng);
        }
        Entity::new(child)
    }
}
