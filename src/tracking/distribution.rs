// Sparse discrete distributions used for beliefs and transition policies

use rand::distr::weighted::WeightedIndex;
use rand::Rng;
use std::collections::HashMap;
use std::hash::Hash;

/// Tolerance used when checking that a distribution is normalized
pub const NORMALIZATION_EPSILON: f64 = 1e-9;

/// A map from outcomes to non-negative weights
///
/// Missing keys have weight zero. Nothing forces the weights to sum to one;
/// call [`Distribution::normalize`] when probabilities are needed.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution<K: Eq + Hash> {
    weights: HashMap<K, f64>,
}

impl<K: Eq + Hash> Default for Distribution<K> {
    fn default() -> Self {
        Distribution {
            weights: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> Distribution<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A distribution with all mass on one outcome
    pub fn point(key: K) -> Self {
        let mut dist = Self::new();
        dist.add(key, 1.0);
        dist
    }

    /// Adds weight to an outcome
    pub fn add(&mut self, key: K, weight: f64) {
        *self.weights.entry(key).or_insert(0.0) += weight;
    }

    pub fn get(&self, key: &K) -> f64 {
        self.weights.get(key).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &f64)> {
        self.weights.iter()
    }

    /// Scales the weights so they sum to one. An empty or all-zero
    /// distribution is left untouched.
    pub fn normalize(&mut self) {
        let total = self.total();
        if total <= 0.0 {
            return;
        }
        for weight in self.weights.values_mut() {
            *weight /= total;
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

impl<K: Eq + Hash + Ord + Clone> Distribution<K> {
    /// Outcome with the largest weight; ties go to the smallest key so the
    /// answer does not depend on hash order
    pub fn arg_max(&self) -> Option<K> {
        self.weights
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .max_by(|(ka, wa), (kb, wb)| wa.total_cmp(wb).then_with(|| kb.cmp(ka)))
            .map(|(k, _)| k.clone())
    }

    /// Entries sorted by key
    pub fn sorted(&self) -> Vec<(K, f64)> {
        let mut entries: Vec<(K, f64)> = self
            .weights
            .iter()
            .map(|(k, w)| (k.clone(), *w))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Draws one outcome proportionally to its weight
    ///
    /// Returns `None` when there is no positive weight to draw from.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<K> {
        let entries = self.sorted();
        let index = WeightedIndex::new(entries.iter().map(|(_, w)| *w)).ok()?;
        Some(entries[rng.sample(&index)].0.clone())
    }
}

impl<K: Eq + Hash> FromIterator<(K, f64)> for Distribution<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut dist = Distribution::new();
        for (key, weight) in iter {
            dist.add(key, weight);
        }
        dist
    }
}
