use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::semantic::ValidatedSchema;

/// Summary of graph structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Ordering report for diagnostics output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphReport {
    pub summary: GraphSummary,
    pub order: Option<Vec<String>>,
    pub cycle: Option<Vec<String>>,
}

/// Foreign-key dependency graph. An edge parent -> child means the parent is generated first.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    tables: Vec<String>,
    children: BTreeMap<usize, BTreeSet<usize>>,
    parents: BTreeMap<usize, BTreeSet<usize>>,
}

impl DependencyGraph {
    pub fn from_validated(schema: &ValidatedSchema) -> Self {
        Self::build(schema.tables.iter().map(|table| {
            let targets = table
                .foreign_keys
                .iter()
                .map(|fk| fk.target_table.as_str())
                .collect();
            (table.name.as_str(), targets)
        }))
    }

    fn build<'a>(tables: impl Iterator<Item = (&'a str, Vec<&'a str>)>) -> Self {
        let tables: Vec<(&str, Vec<&str>)> = tables.collect();
        let mut graph = Self::default();
        let mut index: BTreeMap<&str, usize> = BTreeMap::new();
        for (name, _) in &tables {
            if !index.contains_key(name) {
                index.insert(*name, graph.tables.len());
                graph.tables.push(name.to_string());
            }
        }
        for (name, targets) in &tables {
            let child = index[name];
            for target in targets {
                let Some(&parent) = index.get(target) else {
                    continue;
                };
                graph.children.entry(parent).or_default().insert(child);
                graph.parents.entry(child).or_default().insert(parent);
            }
        }
        graph
    }

    /// Table names in declaration order.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn edge_count(&self) -> usize {
        self.children.values().map(BTreeSet::len).sum()
    }

    /// Tables the given table references.
    pub fn dependencies_of(&self, table: &str) -> Vec<&str> {
        let Some(position) = self.tables.iter().position(|name| name == table) else {
            return Vec::new();
        };
        self.parents
            .get(&position)
            .map(|parents| {
                parents
                    .iter()
                    .map(|&parent| self.tables[parent].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Topological order; ties resolve to declaration order.
    pub fn order(&self) -> Result<Vec<String>> {
        let mut indegree: Vec<usize> = (0..self.tables.len())
            .map(|node| self.parents.get(&node).map_or(0, BTreeSet::len))
            .collect();
        let mut ready: BTreeSet<usize> = indegree
            .iter()
            .enumerate()
            .filter_map(|(node, count)| (*count == 0).then_some(node))
            .collect();

        let mut order = Vec::with_capacity(self.tables.len());
        while let Some(node) = ready.pop_first() {
            order.push(self.tables[node].clone());
            if let Some(children) = self.children.get(&node) {
                for &child in children {
                    indegree[child] = indegree[child].saturating_sub(1);
                    if indegree[child] == 0 {
                        ready.insert(child);
                    }
                }
            }
        }

        if order.len() == self.tables.len() {
            Ok(order)
        } else {
            Err(Error::CircularDependency {
                cycle: self.find_cycle(&indegree),
            })
        }
    }

    pub fn report(&self) -> GraphReport {
        let summary = GraphSummary {
            nodes: self.tables.len(),
            edges: self.edge_count(),
        };
        match self.order() {
            Ok(order) => GraphReport {
                summary,
                order: Some(order),
                cycle: None,
            },
            Err(Error::CircularDependency { cycle }) => GraphReport {
                summary,
                order: None,
                cycle: Some(cycle),
            },
            Err(_) => GraphReport {
                summary,
                order: None,
                cycle: None,
            },
        }
    }

    /// Walk referenced tables from the first blocked node until one repeats.
    /// Every blocked node keeps at least one blocked parent, so the walk always closes.
    fn find_cycle(&self, indegree: &[usize]) -> Vec<String> {
        let blocked = |node: usize| indegree[node] > 0;
        let Some(start) = (0..self.tables.len()).find(|&node| blocked(node)) else {
            return Vec::new();
        };

        let mut path: Vec<usize> = Vec::new();
        let mut current = start;
        loop {
            if let Some(position) = path.iter().position(|&node| node == current) {
                return path[position..]
                    .iter()
                    .map(|&node| self.tables[node].clone())
                    .collect();
            }
            path.push(current);
            let next = self
                .parents
                .get(&current)
                .and_then(|parents| parents.iter().copied().find(|&parent| blocked(parent)));
            match next {
                Some(parent) => current = parent,
                None => {
                    return path.iter().map(|&node| self.tables[node].clone()).collect();
                }
            }
        }
    }
}
