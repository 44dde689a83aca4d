//! Permutation genotype and its genetic operators.
//!
//! A genotype is a permutation of city indices encoding a closed tour. Every
//! operator here preserves the permutation invariant: crossovers return fresh
//! valid children without touching their parents, mutations perturb in place.

use crate::error::{Result, SolverError};
use rand::prelude::*;
use std::str::FromStr;

/// Mutation operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Exchange the values at two distinct random positions
    Swap,
    /// Reverse a random subsequence in place
    Inverse,
    /// Reshuffle a random contiguous window uniformly at random
    Shuffle,
}

impl FromStr for MutationKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "swap" => Ok(MutationKind::Swap),
            "inverse" => Ok(MutationKind::Inverse),
            "shuffle" => Ok(MutationKind::Shuffle),
            other => Err(SolverError::Configuration(format!(
                "unknown mutation method '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MutationKind::Swap => "swap",
            MutationKind::Inverse => "inverse",
            MutationKind::Shuffle => "shuffle",
        };
        write!(f, "{}", name)
    }
}

/// Crossover operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverKind {
    /// Single cut point with duplicate repair
    Simple,
    /// Order Crossover (OX)
    Order,
    /// Cycle Crossover (CX)
    Cycle,
    /// Partially Mapped Crossover (PMX)
    PartiallyMapped,
}

impl FromStr for CrossoverKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simple" => Ok(CrossoverKind::Simple),
            "ox" => Ok(CrossoverKind::Order),
            "cx" => Ok(CrossoverKind::Cycle),
            "pmx" => Ok(CrossoverKind::PartiallyMapped),
            other => Err(SolverError::Configuration(format!(
                "unknown crossover method '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for CrossoverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CrossoverKind::Simple => "simple",
            CrossoverKind::Order => "ox",
            CrossoverKind::Cycle => "cx",
            CrossoverKind::PartiallyMapped => "pmx",
        };
        write!(f, "{}", name)
    }
}

/// A permutation of city indices encoding the visiting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genotype {
    order: Vec<usize>,
}

impl Genotype {
    /// Create a uniformly random permutation of `0..size`.
    pub fn random(size: usize, rng: &mut impl Rng) -> Self {
        let mut order: Vec<usize> = (0..size).collect();
        order.shuffle(rng);
        Genotype { order }
    }

    /// Wrap an explicit visiting order, validating the permutation invariant.
    pub fn from_order(order: Vec<usize>) -> Result<Self> {
        if !is_permutation(&order) {
            return Err(SolverError::InvariantViolation(format!(
                "sequence of length {} is not a permutation",
                order.len()
            )));
        }
        Ok(Genotype { order })
    }

    /// The visiting order.
    #[inline]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Number of cities in the tour.
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Deterministic fitness-cache key: equal permutations compare and hash
    /// identically regardless of which `Genotype` instance produced them.
    #[inline]
    pub fn key(&self) -> &[usize] {
        &self.order
    }

    /// Decode the genotype into the ordered sequence of directed edges forming
    /// a closed tour, including the wrap-around edge back to the first city.
    pub fn decode(&self) -> Vec<(usize, usize)> {
        let n = self.order.len();
        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            edges.push((self.order[i], self.order[(i + 1) % n]));
        }
        edges
    }

    /// Mutate in place. The permutation invariant is preserved by every kind.
    pub fn mutate(&mut self, kind: MutationKind, rng: &mut impl Rng) {
        let n = self.order.len();
        if n < 2 {
            return;
        }

        match kind {
            MutationKind::Swap => {
                let i = rng.gen_range(0..n);
                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                self.order.swap(i, j);
            }
            MutationKind::Inverse => {
                let (i, j) = distinct_ordered_pair(n, rng);
                self.order[i..=j].reverse();
            }
            MutationKind::Shuffle => {
                let (i, j) = distinct_ordered_pair(n, rng);
                self.order[i..=j].shuffle(rng);
            }
        }

        debug_assert!(is_permutation(&self.order));
    }

    /// Produce a child genotype without mutating either parent.
    pub fn crossover(&self, other: &Genotype, kind: CrossoverKind, rng: &mut impl Rng) -> Genotype {
        debug_assert_eq!(self.len(), other.len());
        if self.len() < 2 {
            return self.clone();
        }

        let child = match kind {
            CrossoverKind::Simple => self.crossover_simple(other, rng),
            CrossoverKind::Order => self.crossover_order(other, rng),
            CrossoverKind::Cycle => self.crossover_cycle(other),
            CrossoverKind::PartiallyMapped => self.crossover_pmx(other, rng),
        };

        debug_assert!(is_permutation(&child.order));
        child
    }

    /// Single cut point: prefix from self, suffix from other, then repair
    /// duplicates left-to-right with the still-missing cities in random order.
    fn crossover_simple(&self, other: &Genotype, rng: &mut impl Rng) -> Genotype {
        let n = self.order.len();
        let cut = rng.gen_range(0..=n);

        let mut child: Vec<usize> = Vec::with_capacity(n);
        child.extend_from_slice(&self.order[..cut]);
        child.extend_from_slice(&other.order[cut..]);

        let mut seen = vec![false; n];
        let mut missing: Vec<usize> = Vec::new();
        for city in 0..n {
            if !child.contains(&city) {
                missing.push(city);
            }
        }
        missing.shuffle(rng);

        let mut next_missing = missing.into_iter();
        for slot in child.iter_mut() {
            if seen[*slot] {
                // Duplicate: substitute the first still-missing city.
                *slot = next_missing
                    .next()
                    .unwrap_or(*slot);
            }
            seen[*slot] = true;
        }

        Genotype { order: child }
    }

    /// Order Crossover (OX): transplant `[p1, p2)` from self, fill the rest
    /// with the remaining cities in the relative order of `other` starting
    /// from `p2`.
    fn crossover_order(&self, other: &Genotype, rng: &mut impl Rng) -> Genotype {
        let n = self.order.len();
        let (p1, p2) = cut_points(n, rng);

        let transplant = &self.order[p1..p2];
        let mut in_transplant = vec![false; n];
        for &city in transplant {
            in_transplant[city] = true;
        }

        // Work from other's order rotated to start at p2, drop transplanted
        // cities, prepend the transplant, then rotate back so the transplant
        // sits at positions p1..p2.
        let mut seq: Vec<usize> = Vec::with_capacity(n);
        seq.extend_from_slice(transplant);
        seq.extend(
            other.order[p2..]
                .iter()
                .chain(other.order[..p2].iter())
                .filter(|&&city| !in_transplant[city]),
        );
        seq.rotate_right(p1);

        Genotype { order: seq }
    }

    /// Cycle Crossover (CX): alternate cycles between parents; the first
    /// cycle inherits from self.
    fn crossover_cycle(&self, other: &Genotype) -> Genotype {
        let n = self.order.len();
        let mut pos_in_other = vec![0usize; n];
        for (i, &city) in other.order.iter().enumerate() {
            pos_in_other[city] = i;
        }

        let mut child = vec![usize::MAX; n];
        let mut visited = vec![false; n];
        let mut cycle = 0usize;

        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut pos = start;
            loop {
                visited[pos] = true;
                child[pos] = if cycle % 2 == 0 {
                    self.order[pos]
                } else {
                    other.order[pos]
                };
                pos = pos_in_other[self.order[pos]];
                if pos == start {
                    break;
                }
            }
            cycle += 1;
        }

        Genotype { order: child }
    }

    /// Partially Mapped Crossover (PMX): self's window verbatim, displaced
    /// window cities of other relocated via the mapping chain, other's values
    /// everywhere else.
    fn crossover_pmx(&self, other: &Genotype, rng: &mut impl Rng) -> Genotype {
        let n = self.order.len();
        let (p1, p2) = cut_points(n, rng);

        let mut pos_in_other = vec![0usize; n];
        for (i, &city) in other.order.iter().enumerate() {
            pos_in_other[city] = i;
        }

        let mut child = vec![usize::MAX; n];
        let mut in_window = vec![false; n];
        for i in p1..p2 {
            child[i] = self.order[i];
            in_window[self.order[i]] = true;
        }

        for i in p1..p2 {
            let city = other.order[i];
            if in_window[city] {
                continue;
            }
            // Chase the mapping self -> other until a slot outside the window
            // is free for this city.
            let mut pos = i;
            loop {
                pos = pos_in_other[self.order[pos]];
                if pos < p1 || pos >= p2 {
                    break;
                }
            }
            child[pos] = city;
        }

        for i in 0..n {
            if child[i] == usize::MAX {
                child[i] = other.order[i];
            }
        }

        Genotype { order: child }
    }
}

/// Pick two cut points `p1 < p2` in `0..=n` bounding a non-empty, proper
/// window.
fn cut_points(n: usize, rng: &mut impl Rng) -> (usize, usize) {
    let p1 = rng.gen_range(0..n);
    let p2 = rng.gen_range(p1 + 1..=n);
    (p1, p2)
}

/// Pick two distinct positions returned in ascending order.
fn distinct_ordered_pair(n: usize, rng: &mut impl Rng) -> (usize, usize) {
    let i = rng.gen_range(0..n);
    let mut j = rng.gen_range(0..n - 1);
    if j >= i {
        j += 1;
    }
    (i.min(j), i.max(j))
}

/// Check that a sequence visits every index `0..len` exactly once.
pub(crate) fn is_permutation(order: &[usize]) -> bool {
    let n = order.len();
    let mut seen = vec![false; n];
    for &city in order {
        if city >= n || seen[city] {
            return false;
        }
        seen[city] = true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn test_random_is_permutation() {
        let mut rng = rng(1);
        for n in 2..40 {
            let g = Genotype::random(n, &mut rng);
            assert!(is_permutation(g.order()));
        }
    }

    #[test]
    fn test_decode_closed_tour() {
        let mut rng = rng(2);
        for n in 2..20 {
            let g = Genotype::random(n, &mut rng);
            let edges = g.decode();
            assert_eq!(edges.len(), n);

            // Consecutive edges chain and the last one wraps to the first.
            for w in edges.windows(2) {
                assert_eq!(w[0].1, w[1].0);
            }
            assert_eq!(edges[n - 1].1, edges[0].0);

            // Each city appears exactly once as a source.
            let sources: Vec<usize> = edges.iter().map(|&(a, _)| a).collect();
            assert!(is_permutation(&sources));
        }
    }

    #[test]
    fn test_all_crossovers_preserve_permutation() {
        let kinds = [
            CrossoverKind::Simple,
            CrossoverKind::Order,
            CrossoverKind::Cycle,
            CrossoverKind::PartiallyMapped,
        ];
        let mut rng = rng(3);

        for n in [2, 3, 5, 10, 31, 64] {
            for trial in 0..50 {
                let p1 = Genotype::random(n, &mut rng);
                let p2 = Genotype::random(n, &mut rng);
                for kind in kinds {
                    let child = p1.crossover(&p2, kind, &mut rng);
                    assert!(
                        is_permutation(child.order()),
                        "{:?} broke the permutation for n={} trial={}",
                        kind,
                        n,
                        trial
                    );
                    // Parents must be untouched.
                    assert!(is_permutation(p1.order()));
                    assert!(is_permutation(p2.order()));
                }
            }
        }
    }

    #[test]
    fn test_ox_preserves_relative_order() {
        // With identical parents OX must reproduce the parent.
        let mut rng = rng(4);
        for _ in 0..20 {
            let p = Genotype::random(12, &mut rng);
            let child = p.crossover(&p.clone(), CrossoverKind::Order, &mut rng);
            assert_eq!(child.order(), p.order());
        }
    }

    #[test]
    fn test_cx_child_positions_come_from_parents() {
        let mut rng = rng(5);
        for _ in 0..50 {
            let p1 = Genotype::random(10, &mut rng);
            let p2 = Genotype::random(10, &mut rng);
            let child = p1.crossover(&p2, CrossoverKind::Cycle, &mut rng);
            for i in 0..10 {
                let c = child.order()[i];
                assert!(c == p1.order()[i] || c == p2.order()[i]);
            }
        }
    }

    #[test]
    fn test_swap_changes_exactly_two_positions() {
        let mut rng = rng(6);
        for _ in 0..50 {
            let mut g = Genotype::random(15, &mut rng);
            let before = g.order().to_vec();
            g.mutate(MutationKind::Swap, &mut rng);
            assert!(is_permutation(g.order()));

            let changed: Vec<usize> = (0..15).filter(|&i| g.order()[i] != before[i]).collect();
            assert_eq!(changed.len(), 2);
            let (a, b) = (changed[0], changed[1]);
            assert_eq!(g.order()[a], before[b]);
            assert_eq!(g.order()[b], before[a]);
        }
    }

    #[test]
    fn test_inverse_is_involution_with_same_bounds() {
        let mut master = rng(7);
        for _ in 0..50 {
            let mut g = Genotype::random(15, &mut master);
            let before = g.order().to_vec();

            // Re-seeding draws the same bounds both times.
            let mut r1 = rng(99);
            g.mutate(MutationKind::Inverse, &mut r1);
            assert!(is_permutation(g.order()));
            let mut r2 = rng(99);
            g.mutate(MutationKind::Inverse, &mut r2);

            assert_eq!(g.order(), &before[..]);
        }
    }

    #[test]
    fn test_shuffle_preserves_permutation() {
        let mut rng = rng(8);
        for _ in 0..50 {
            let mut g = Genotype::random(15, &mut rng);
            g.mutate(MutationKind::Shuffle, &mut rng);
            assert!(is_permutation(g.order()));
        }
    }

    #[test]
    fn test_key_equality_across_instances() {
        let g1 = Genotype::from_order(vec![2, 0, 1, 3]).unwrap();
        let g2 = Genotype::from_order(vec![2, 0, 1, 3]).unwrap();
        assert_eq!(g1.key(), g2.key());
    }

    #[test]
    fn test_from_order_rejects_non_permutation() {
        assert!(Genotype::from_order(vec![0, 0, 1]).is_err());
        assert!(Genotype::from_order(vec![0, 3, 1]).is_err());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!("pmx".parse::<CrossoverKind>().unwrap(), CrossoverKind::PartiallyMapped);
        assert_eq!("inverse".parse::<MutationKind>().unwrap(), MutationKind::Inverse);
        assert!("unknown".parse::<CrossoverKind>().is_err());
        assert!("unknown".parse::<MutationKind>().is_err());
    }
}
