//! Greedy knapsack item selection.
//!
//! Two strategies decide which items the thief carries: a static pass over the
//! global item list, run once per engine configuration, and a dynamic pass
//! recomputed per genotype that weights each item by how far its city is from
//! the end of the decoded tour.

use crate::error::{Result, SolverError};
use crate::instance::TtpInstance;
use ordered_float::OrderedFloat;
use std::str::FromStr;

/// Greedy ordering criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreedyCriterion {
    /// Descending value/weight ratio
    Ratio,
    /// Descending value
    Value,
    /// Ascending weight
    Weight,
}

impl FromStr for GreedyCriterion {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ratio" => Ok(GreedyCriterion::Ratio),
            "value" => Ok(GreedyCriterion::Value),
            "weight" => Ok(GreedyCriterion::Weight),
            other => Err(SolverError::Configuration(format!(
                "unknown greedy criterion '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for GreedyCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GreedyCriterion::Ratio => "ratio",
            GreedyCriterion::Value => "value",
            GreedyCriterion::Weight => "weight",
        };
        write!(f, "{}", name)
    }
}

/// Knapsack strategy kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnapsackKind {
    /// One global greedy pass before population initialization
    GreedyStatic,
    /// A fresh greedy pass per genotype evaluation
    GreedyDynamic,
}

impl FromStr for KnapsackKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "greedy-static" => Ok(KnapsackKind::GreedyStatic),
            "greedy-dynamic" => Ok(KnapsackKind::GreedyDynamic),
            other => Err(SolverError::Configuration(format!(
                "unknown knapsack method '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for KnapsackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KnapsackKind::GreedyStatic => "greedy-static",
            KnapsackKind::GreedyDynamic => "greedy-dynamic",
        };
        write!(f, "{}", name)
    }
}

/// The outcome of one selection pass: which items are carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnapsackSelection {
    selected: Vec<bool>,
}

impl KnapsackSelection {
    /// A selection carrying nothing.
    pub fn empty(item_count: usize) -> Self {
        KnapsackSelection { selected: vec![false; item_count] }
    }

    /// Whether the given item is carried.
    #[inline]
    pub fn is_selected(&self, item: usize) -> bool {
        self.selected[item]
    }

    /// Number of selected items.
    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|&&s| s).count()
    }

    /// Total weight of the selected items.
    pub fn total_weight(&self, instance: &TtpInstance) -> i64 {
        instance
            .items
            .iter()
            .filter(|it| self.selected[it.id])
            .map(|it| it.weight)
            .sum()
    }

    /// Total value of the selected items.
    pub fn total_value(&self, instance: &TtpInstance) -> i64 {
        instance
            .items
            .iter()
            .filter(|it| self.selected[it.id])
            .map(|it| it.value)
            .sum()
    }

    /// Whether any item located at the given city is carried.
    pub fn carries_from(&self, instance: &TtpInstance, city: usize) -> bool {
        instance.cities[city]
            .items
            .iter()
            .any(|&item| self.selected[item])
    }
}

/// Greedy item selector.
#[derive(Debug, Clone, Copy)]
pub struct KnapsackSelector {
    criterion: GreedyCriterion,
}

impl KnapsackSelector {
    pub fn new(criterion: GreedyCriterion) -> Self {
        KnapsackSelector { criterion }
    }

    pub fn criterion(&self) -> GreedyCriterion {
        self.criterion
    }

    /// Static strategy: one greedy pass over the global item list.
    pub fn select_static(&self, instance: &TtpInstance) -> KnapsackSelection {
        let mut order: Vec<usize> = (0..instance.item_count()).collect();
        match self.criterion {
            GreedyCriterion::Ratio => {
                order.sort_by_key(|&i| OrderedFloat(-instance.items[i].ratio()));
            }
            GreedyCriterion::Value => {
                order.sort_by_key(|&i| -instance.items[i].value);
            }
            GreedyCriterion::Weight => {
                order.sort_by_key(|&i| instance.items[i].weight);
            }
        }

        self.fill(instance, &order)
    }

    /// Dynamic strategy: weight each item's criterion by how close its city is
    /// to the end of the given tour, then run the same greedy fill.
    ///
    /// Suffix distances are accumulated by scanning the tour in reverse
    /// (closing edge included), normalized by the total tour distance and
    /// shifted by +1, so cities visited late score in (1, 2] and get their
    /// items picked first.
    pub fn select_dynamic(&self, instance: &TtpInstance, tour: &[usize]) -> KnapsackSelection {
        let n = tour.len();
        let mut suffix = vec![0.0f64; n];
        if n >= 2 {
            suffix[n - 1] = instance.distance(tour[n - 1], tour[0]);
            for i in (0..n - 1).rev() {
                suffix[i] = instance.distance(tour[i], tour[i + 1]) + suffix[i + 1];
            }
        }
        let total = suffix.first().copied().unwrap_or(0.0);

        let mut scale = vec![1.0f64; instance.dimension];
        for (pos, &city) in tour.iter().enumerate() {
            let normalized = if total > 0.0 { suffix[pos] / total } else { 0.0 };
            scale[city] = (1.0 - normalized) + 1.0;
        }

        let mut order: Vec<usize> = (0..instance.item_count()).collect();
        match self.criterion {
            GreedyCriterion::Ratio => {
                order.sort_by_key(|&i| {
                    let it = &instance.items[i];
                    OrderedFloat(-(it.ratio() * scale[it.city]))
                });
            }
            GreedyCriterion::Value => {
                order.sort_by_key(|&i| {
                    let it = &instance.items[i];
                    OrderedFloat(-(it.value as f64 * scale[it.city]))
                });
            }
            GreedyCriterion::Weight => {
                order.sort_by_key(|&i| {
                    let it = &instance.items[i];
                    OrderedFloat(it.weight as f64 / scale[it.city])
                });
            }
        }

        self.fill(instance, &order)
    }

    /// Greedy capacity fill over a pre-sorted item order.
    fn fill(&self, instance: &TtpInstance, order: &[usize]) -> KnapsackSelection {
        let mut selection = KnapsackSelection::empty(instance.item_count());
        let mut weight = 0i64;

        for &i in order {
            let item = &instance.items[i];
            if weight + item.weight <= instance.capacity {
                selection.selected[i] = true;
                weight += item.weight;
                if weight == instance.capacity {
                    break;
                }
            }
        }

        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{City, Item};

    fn line_instance(capacity: i64, item_specs: &[(i64, i64, usize)]) -> TtpInstance {
        let cities = vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 1.0, 0.0),
            City::new(2, 2.0, 0.0),
            City::new(3, 3.0, 0.0),
        ];
        let items = item_specs
            .iter()
            .enumerate()
            .map(|(id, &(value, weight, city))| Item { id, value, weight, city })
            .collect();
        TtpInstance::new("line", cities, items, capacity, 0.1, 1.0).unwrap()
    }

    #[test]
    fn test_static_respects_capacity() {
        let instance = line_instance(50, &[(10, 30, 1), (20, 30, 2), (5, 10, 3)]);
        let selector = KnapsackSelector::new(GreedyCriterion::Value);
        let selection = selector.select_static(&instance);

        assert!(selection.total_weight(&instance) <= instance.capacity);
        // Value order: item 1 (20/30) first, item 0 no longer fits, item 2 does.
        assert!(selection.is_selected(1));
        assert!(!selection.is_selected(0));
        assert!(selection.is_selected(2));
    }

    #[test]
    fn test_static_ratio_order() {
        let instance = line_instance(40, &[(10, 20, 1), (30, 20, 2), (12, 20, 3)]);
        let selector = KnapsackSelector::new(GreedyCriterion::Ratio);
        let selection = selector.select_static(&instance);

        // Ratios: 0.5, 1.5, 0.6 -> items 1 and 2 fill the capacity.
        assert!(selection.is_selected(1));
        assert!(selection.is_selected(2));
        assert!(!selection.is_selected(0));
    }

    #[test]
    fn test_static_weight_order_prefers_light_items() {
        let instance = line_instance(25, &[(1, 20, 1), (1, 10, 2), (1, 5, 3)]);
        let selector = KnapsackSelector::new(GreedyCriterion::Weight);
        let selection = selector.select_static(&instance);

        assert!(selection.is_selected(2));
        assert!(selection.is_selected(1));
        assert!(!selection.is_selected(0));
    }

    #[test]
    fn test_stops_exactly_at_capacity() {
        let instance = line_instance(30, &[(10, 20, 1), (10, 10, 2), (10, 1, 3)]);
        let selector = KnapsackSelector::new(GreedyCriterion::Value);
        let selection = selector.select_static(&instance);

        assert_eq!(selection.total_weight(&instance), 30);
        assert!(!selection.is_selected(2));
    }

    #[test]
    fn test_capacity_monotonicity() {
        let specs: &[(i64, i64, usize)] = &[(10, 30, 1), (20, 30, 2), (5, 10, 3)];
        let selector = KnapsackSelector::new(GreedyCriterion::Ratio);

        let mut prev_value = 0;
        for capacity in 0..=80 {
            let instance = line_instance(capacity, specs);
            let selection = selector.select_static(&instance);
            let value = selection.total_value(&instance);
            assert!(
                value >= prev_value,
                "value dropped from {} to {} at capacity {}",
                prev_value,
                value,
                capacity
            );
            assert!(selection.total_weight(&instance) <= capacity);
            prev_value = value;
        }
    }

    #[test]
    fn test_dynamic_respects_capacity() {
        let instance = line_instance(40, &[(10, 30, 1), (20, 30, 2), (5, 10, 3)]);
        let selector = KnapsackSelector::new(GreedyCriterion::Ratio);
        let selection = selector.select_dynamic(&instance, &[0, 1, 2, 3]);

        assert!(selection.total_weight(&instance) <= instance.capacity);
    }

    #[test]
    fn test_dynamic_prefers_late_cities_on_ties() {
        // Identical items at city 1 (visited early) and city 3 (visited late);
        // only one fits. The late city has the smaller remaining distance, so
        // its item wins.
        let instance = line_instance(10, &[(10, 10, 1), (10, 10, 3)]);
        let selector = KnapsackSelector::new(GreedyCriterion::Ratio);
        let selection = selector.select_dynamic(&instance, &[0, 1, 2, 3]);

        assert!(selection.is_selected(1));
        assert!(!selection.is_selected(0));
    }

    #[test]
    fn test_carries_from() {
        let instance = line_instance(10, &[(10, 10, 1), (10, 10, 3)]);
        let selector = KnapsackSelector::new(GreedyCriterion::Ratio);
        let selection = selector.select_dynamic(&instance, &[0, 1, 2, 3]);

        assert!(selection.carries_from(&instance, 3));
        assert!(!selection.carries_from(&instance, 1));
        assert!(!selection.carries_from(&instance, 0));
    }

    #[test]
    fn test_unknown_criterion_name() {
        assert!("density".parse::<GreedyCriterion>().is_err());
        assert!("genetic".parse::<KnapsackKind>().is_err());
    }
}
