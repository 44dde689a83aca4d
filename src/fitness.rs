//! Fitness evaluation for TTP genotypes.
//!
//! Decodes a genotype into a tour, simulates item pickup and the resulting
//! speed degradation, and scores it as collected value minus travel time.
//! Results are memoized by permutation key: elites and re-sampled individuals
//! are byte-identical across generations, so cache hits dominate.

use crate::error::{Result, SolverError};
use crate::genotype::Genotype;
use crate::instance::TtpInstance;
use crate::knapsack::{GreedyCriterion, KnapsackKind, KnapsackSelection, KnapsackSelector};
use std::collections::HashMap;

/// Memoizing fitness evaluator, scoped to one engine configuration.
#[derive(Debug)]
pub struct FitnessEvaluator {
    knapsack: KnapsackKind,
    selector: KnapsackSelector,
    /// Selection computed once before population initialization (static only)
    static_selection: Option<KnapsackSelection>,
    cache: HashMap<Vec<usize>, f64>,
    evaluations: usize,
}

impl FitnessEvaluator {
    /// Build an evaluator; the static strategy runs its single global
    /// selection pass here.
    pub fn new(instance: &TtpInstance, knapsack: KnapsackKind, criterion: GreedyCriterion) -> Self {
        let selector = KnapsackSelector::new(criterion);
        let static_selection = match knapsack {
            KnapsackKind::GreedyStatic => Some(selector.select_static(instance)),
            KnapsackKind::GreedyDynamic => None,
        };

        FitnessEvaluator {
            knapsack,
            selector,
            static_selection,
            cache: HashMap::new(),
            evaluations: 0,
        }
    }

    /// Score a genotype, consulting the cache first. On a hit the stored
    /// scalar is reused and nothing is recomputed.
    pub fn evaluate(&mut self, genotype: &Genotype, instance: &TtpInstance) -> Result<f64> {
        if genotype.len() != instance.dimension {
            return Err(SolverError::InvariantViolation(format!(
                "genotype length {} does not match city count {}",
                genotype.len(),
                instance.dimension
            )));
        }

        if let Some(&fitness) = self.cache.get(genotype.key()) {
            return Ok(fitness);
        }

        let selection = self.selection_for(genotype, instance);
        let fitness = self.walk(genotype, instance, &selection);

        self.evaluations += 1;
        self.cache.insert(genotype.key().to_vec(), fitness);
        Ok(fitness)
    }

    /// The item selection this evaluator would use for a genotype.
    pub fn selection_for(&self, genotype: &Genotype, instance: &TtpInstance) -> KnapsackSelection {
        match self.knapsack {
            KnapsackKind::GreedyStatic => self
                .static_selection
                .clone()
                .unwrap_or_else(|| KnapsackSelection::empty(instance.item_count())),
            KnapsackKind::GreedyDynamic => {
                self.selector.select_dynamic(instance, genotype.order())
            }
        }
    }

    /// Walk the decoded tour edge by edge: pick up the selected items at each
    /// source city, then pay the edge's travel time at the degraded speed.
    fn walk(
        &self,
        genotype: &Genotype,
        instance: &TtpInstance,
        selection: &KnapsackSelection,
    ) -> f64 {
        let mut weight = 0i64;
        let mut value = 0i64;
        let mut time = 0.0f64;

        for (from, to) in genotype.decode() {
            for &item_idx in &instance.cities[from].items {
                if selection.is_selected(item_idx) {
                    let item = &instance.items[item_idx];
                    value += item.value;
                    weight += item.weight;
                }
            }
            time += instance.distance(from, to) / self.speed(instance, weight);
        }

        value as f64 - time
    }

    /// Travel speed for the current carried weight: linear from `max_speed`
    /// (empty) down to `min_speed` (at capacity).
    fn speed(&self, instance: &TtpInstance, weight: i64) -> f64 {
        if instance.capacity == 0 {
            return instance.max_speed;
        }
        let load = (weight as f64 / instance.capacity as f64).min(1.0);
        instance.max_speed - load * (instance.max_speed - instance.min_speed)
    }

    /// How many full evaluations have run (cache hits excluded).
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Number of distinct fitness values observed so far.
    pub fn distinct_fitness_count(&self) -> usize {
        let mut bits: Vec<u64> = self.cache.values().map(|f| f.to_bits()).collect();
        bits.sort_unstable();
        bits.dedup();
        bits.len()
    }

    /// Drop all memoized results and reset the counter. Required between
    /// independent runs that reinterpret the same genotypes.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.evaluations = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{City, Item};

    fn unit_square() -> TtpInstance {
        let cities = vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 1.0, 0.0),
            City::new(2, 1.0, 1.0),
            City::new(3, 0.0, 1.0),
        ];
        TtpInstance::new("square", cities, Vec::new(), 10, 1.0, 1.0).unwrap()
    }

    #[test]
    fn test_square_tour_without_items() {
        let instance = unit_square();
        let mut evaluator =
            FitnessEvaluator::new(&instance, KnapsackKind::GreedyStatic, GreedyCriterion::Ratio);

        // Any Hamiltonian cycle on the square's corners walking the perimeter
        // costs exactly 4 at unit speed.
        let genotype = Genotype::from_order(vec![0, 1, 2, 3]).unwrap();
        let fitness = evaluator.evaluate(&genotype, &instance).unwrap();
        assert!((fitness - (-4.0)).abs() < 1e-10);

        let rotated = Genotype::from_order(vec![2, 3, 0, 1]).unwrap();
        let fitness = evaluator.evaluate(&rotated, &instance).unwrap();
        assert!((fitness - (-4.0)).abs() < 1e-10);
    }

    #[test]
    fn test_two_city_item_pickup() {
        // One item (value 10, weight 1) at city 0, second city at distance 1,
        // constant speed 1. The item is picked up at the start, both edges
        // cost 1 each: fitness = 10 - 2.
        let cities = vec![City::new(0, 0.0, 0.0), City::new(1, 1.0, 0.0)];
        let items = vec![Item { id: 0, value: 10, weight: 1, city: 0 }];
        let instance = TtpInstance::new("pair", cities, items, 10, 1.0, 1.0).unwrap();

        let mut evaluator =
            FitnessEvaluator::new(&instance, KnapsackKind::GreedyStatic, GreedyCriterion::Ratio);
        let selection = evaluator.selection_for(
            &Genotype::from_order(vec![0, 1]).unwrap(),
            &instance,
        );
        assert!(selection.is_selected(0));

        let genotype = Genotype::from_order(vec![0, 1]).unwrap();
        let fitness = evaluator.evaluate(&genotype, &instance).unwrap();
        assert!((fitness - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_speed_degradation() {
        // Item weight fills half the capacity: speed after pickup drops to
        // max - 0.5 * (max - min) = 1.0 - 0.5 * 0.8 = 0.6.
        let cities = vec![City::new(0, 0.0, 0.0), City::new(1, 3.0, 0.0)];
        let items = vec![Item { id: 0, value: 100, weight: 5, city: 0 }];
        let instance = TtpInstance::new("loaded", cities, items, 10, 0.2, 1.0).unwrap();

        let mut evaluator =
            FitnessEvaluator::new(&instance, KnapsackKind::GreedyStatic, GreedyCriterion::Ratio);
        let genotype = Genotype::from_order(vec![0, 1]).unwrap();
        let fitness = evaluator.evaluate(&genotype, &instance).unwrap();

        let expected = 100.0 - (3.0 / 0.6 + 3.0 / 0.6);
        assert!((fitness - expected).abs() < 1e-10);
    }

    #[test]
    fn test_cache_idempotence() {
        let instance = unit_square();
        let mut evaluator =
            FitnessEvaluator::new(&instance, KnapsackKind::GreedyStatic, GreedyCriterion::Ratio);

        let g1 = Genotype::from_order(vec![0, 1, 2, 3]).unwrap();
        let first = evaluator.evaluate(&g1, &instance).unwrap();
        assert_eq!(evaluator.evaluations(), 1);

        // A different instance with an equal permutation hits the cache.
        let g2 = Genotype::from_order(vec![0, 1, 2, 3]).unwrap();
        let second = evaluator.evaluate(&g2, &instance).unwrap();
        assert_eq!(first, second);
        assert_eq!(evaluator.evaluations(), 1);

        evaluator.reset();
        evaluator.evaluate(&g1, &instance).unwrap();
        assert_eq!(evaluator.evaluations(), 1);
    }

    #[test]
    fn test_length_mismatch_is_invariant_violation() {
        let instance = unit_square();
        let mut evaluator =
            FitnessEvaluator::new(&instance, KnapsackKind::GreedyStatic, GreedyCriterion::Ratio);

        let short = Genotype::from_order(vec![0, 1, 2]).unwrap();
        let err = evaluator.evaluate(&short, &instance).unwrap_err();
        assert!(matches!(err, SolverError::InvariantViolation(_)));
    }

    #[test]
    fn test_dynamic_reselects_per_genotype() {
        // Two identical items at opposite corners; dynamic selection picks the
        // one whose city comes later in the tour, so reversing the tour flips
        // the choice.
        let cities = vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 1.0, 0.0),
            City::new(2, 1.0, 1.0),
            City::new(3, 0.0, 1.0),
        ];
        let items = vec![
            Item { id: 0, value: 10, weight: 4, city: 1 },
            Item { id: 1, value: 10, weight: 4, city: 3 },
        ];
        let instance = TtpInstance::new("corners", cities, items, 4, 1.0, 1.0).unwrap();

        let evaluator =
            FitnessEvaluator::new(&instance, KnapsackKind::GreedyDynamic, GreedyCriterion::Ratio);

        let forward = Genotype::from_order(vec![0, 1, 2, 3]).unwrap();
        let sel = evaluator.selection_for(&forward, &instance);
        assert!(sel.is_selected(1));
        assert!(!sel.is_selected(0));

        let backward = Genotype::from_order(vec![0, 3, 2, 1]).unwrap();
        let sel = evaluator.selection_for(&backward, &instance);
        assert!(sel.is_selected(0));
        assert!(!sel.is_selected(1));
    }
}
