//! Foreign-key value sampling over completed parent tables.

use std::collections::HashMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use tdg_core::{Distribution, GeneratedValue};

use crate::errors::{GenerationError, Result};
use crate::planner::ForeignKeyPlan;

/// Key tuples of one parent table in registration order, with precomputed sampling weights.
#[derive(Debug, Clone)]
struct KeySet {
    tuples: Vec<Vec<GeneratedValue>>,
    zipf: Vec<f64>,
    normal: Vec<f64>,
}

impl KeySet {
    fn new(tuples: Vec<Vec<GeneratedValue>>) -> Self {
        let n = tuples.len();
        let mid = (n as f64 + 1.0) / 2.0;
        let zipf = cumulative((1..=n).map(|rank| 1.0 / rank as f64));
        let normal = cumulative((1..=n).map(|rank| 1.0 / (1.0 + (rank as f64 - mid).abs())));
        Self {
            tuples,
            zipf,
            normal,
        }
    }

    fn sample(&self, distribution: Distribution, rng: &mut ChaCha8Rng) -> Option<&[GeneratedValue]> {
        if self.tuples.is_empty() {
            return None;
        }
        let index = match distribution {
            Distribution::Uniform => rng.random_range(0..self.tuples.len()),
            Distribution::Zipf => weighted_index(&self.zipf, rng),
            Distribution::Normal => weighted_index(&self.normal, rng),
        };
        self.tuples.get(index).map(Vec::as_slice)
    }
}

fn cumulative(weights: impl Iterator<Item = f64>) -> Vec<f64> {
    weights
        .scan(0.0, |total, weight| {
            *total += weight;
            Some(*total)
        })
        .collect()
}

fn weighted_index(cumulative: &[f64], rng: &mut ChaCha8Rng) -> usize {
    let total = cumulative.last().copied().unwrap_or(0.0);
    let target = rng.random::<f64>() * total;
    cumulative
        .partition_point(|&bound| bound <= target)
        .min(cumulative.len().saturating_sub(1))
}

/// Per-run cache of parent key sets, keyed by table and field list.
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    sets: HashMap<(String, Vec<String>), KeySet>,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the key tuples of a completed table. Tuples with a null member are skipped.
    pub fn register(&mut self, table: &str, fields: &[String], tuples: Vec<Vec<GeneratedValue>>) {
        let tuples: Vec<Vec<GeneratedValue>> = tuples
            .into_iter()
            .filter(|tuple| !tuple.iter().any(GeneratedValue::is_null))
            .collect();
        self.sets
            .insert((table.to_string(), fields.to_vec()), KeySet::new(tuples));
    }

    pub fn key_count(&self, table: &str, fields: &[String]) -> usize {
        self.sets
            .get(&(table.to_string(), fields.to_vec()))
            .map_or(0, |set| set.tuples.len())
    }

    /// Sample one parent key tuple for `fk`, requested by rows of `table`.
    pub fn resolve(
        &self,
        table: &str,
        fk: &ForeignKeyPlan,
        rng: &mut ChaCha8Rng,
    ) -> Result<&[GeneratedValue]> {
        self.sets
            .get(&(fk.target_table.clone(), fk.target_fields.clone()))
            .and_then(|set| set.sample(fk.distribution, rng))
            .ok_or_else(|| GenerationError::EmptyReferenceSet {
                table: table.to_string(),
                target_table: fk.target_table.clone(),
            })
    }
}
