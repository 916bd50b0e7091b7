//! Emitted-key tracking for primary keys and unique constraints.

use std::collections::HashSet;

use parking_lot::RwLock;

use tdg_core::GeneratedValue;

use crate::planner::KeySetPlan;

/// Keys emitted so far for each key set of the table being generated.
///
/// Row sampling only reads; rows are committed one at a time in row order.
#[derive(Debug)]
pub struct UniqueTracker {
    key_sets: Vec<KeySetPlan>,
    seen: RwLock<Vec<HashSet<String>>>,
}

impl UniqueTracker {
    pub fn new(key_sets: &[KeySetPlan]) -> Self {
        Self {
            key_sets: key_sets.to_vec(),
            seen: RwLock::new(vec![HashSet::new(); key_sets.len()]),
        }
    }

    /// Composite key of `values` for one key set; `None` when a member is null.
    fn key_for(set: &KeySetPlan, values: &[GeneratedValue]) -> Option<String> {
        let mut parts = Vec::with_capacity(set.fields.len());
        for &index in &set.fields {
            let value = values.get(index)?;
            if value.is_null() {
                return None;
            }
            parts.push(value.key());
        }
        Some(parts.join("|"))
    }

    /// First key set whose key is already taken.
    pub fn conflict(&self, values: &[GeneratedValue]) -> Option<&KeySetPlan> {
        let seen = self.seen.read();
        self.key_sets
            .iter()
            .zip(seen.iter())
            .find(|(set, keys)| {
                Self::key_for(set, values).is_some_and(|key| keys.contains(&key))
            })
            .map(|(set, _)| set)
    }

    /// Record every key of a row, or none of them if any is taken.
    pub fn try_insert(&self, values: &[GeneratedValue]) -> Result<(), &KeySetPlan> {
        let mut seen = self.seen.write();
        let keys: Vec<Option<String>> = self
            .key_sets
            .iter()
            .map(|set| Self::key_for(set, values))
            .collect();
        for ((set, key), existing) in self.key_sets.iter().zip(&keys).zip(seen.iter()) {
            if key.as_ref().is_some_and(|key| existing.contains(key)) {
                return Err(set);
            }
        }
        for (key, existing) in keys.into_iter().zip(seen.iter_mut()) {
            if let Some(key) = key {
                existing.insert(key);
            }
        }
        Ok(())
    }

    pub fn len(&self, key_set: usize) -> usize {
        self.seen.read().get(key_set).map_or(0, HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.key_sets.is_empty()
    }

    pub fn key_sets(&self) -> &[KeySetPlan] {
        &self.key_sets
    }
}
