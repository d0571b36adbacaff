//! Dependency queries over a [`Graph`].

use super::Graph;
use crate::error::Result;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// One node of an execution plan, in topological position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanEntry<N> {
    /// Position in the supplied sort
    pub position: usize,
    /// The node itself
    pub node: N,
    /// Nodes already visited before this one in the sort
    pub predecessors: Vec<N>,
    /// Direct dependencies (incoming edges)
    pub dependencies: Vec<N>,
    /// Transitive dependencies
    pub ancestors: Vec<N>,
    /// Whether the node could run concurrently with its siblings
    pub parallelizable: bool,
}

impl<N> Graph<N>
where
    N: Clone + Eq + Hash + Ord + fmt::Display,
{
    /// All transitive predecessors of `node`, in depth-first discovery order.
    pub fn ancestors(&self, node: &N) -> Result<Vec<N>> {
        let start = self.index_of(node)?;
        let mut visited = HashSet::from([start]);
        let mut found = Vec::new();
        let mut stack = vec![(start, self.neighbours(start, Direction::Incoming), 0usize)];

        while let Some((_, preds, pos)) = stack.last_mut() {
            if *pos >= preds.len() {
                stack.pop();
                continue;
            }
            let pred = preds[*pos];
            *pos += 1;
            if visited.insert(pred) {
                found.push(self.node_at(pred).clone());
                stack.push((pred, self.neighbours(pred, Direction::Incoming), 0));
            }
        }

        Ok(found)
    }

    /// Direct predecessors of `node`, ordered by their position in `sort`.
    ///
    /// Predecessors missing from `sort` come last, in edge insertion order.
    pub fn dependencies(&self, sort: &[N], node: &N) -> Result<Vec<N>> {
        let idx = self.index_of(node)?;
        let positions: HashMap<&N, usize> = sort.iter().enumerate().map(|(i, n)| (n, i)).collect();

        let mut seen = HashSet::new();
        let mut deps: Vec<N> = self
            .neighbours(idx, Direction::Incoming)
            .into_iter()
            .filter(|n| seen.insert(*n))
            .map(|n| self.node_at(n).clone())
            .collect();

        // stable sort keeps edge order for nodes outside the sort
        deps.sort_by_key(|n| positions.get(n).copied().unwrap_or(usize::MAX));
        Ok(deps)
    }

    /// Returns false if any direct dependency of `node` is a root of the
    /// graph (has no incoming edges).
    pub fn is_parallelizable(&self, node: &N) -> Result<bool> {
        let idx = self.index_of(node)?;
        Ok(self
            .neighbours(idx, Direction::Incoming)
            .into_iter()
            .all(|pred| !self.neighbours(pred, Direction::Incoming).is_empty()))
    }

    /// Walks `sort` and describes each node's position relative to the rest.
    ///
    /// Nodes in `sort` that are not part of the graph are skipped.
    pub fn execution_plan(&self, sort: &[N]) -> Vec<PlanEntry<N>> {
        let mut predecessors: Vec<N> = Vec::new();
        let mut plan = Vec::with_capacity(sort.len());

        for node in sort {
            let (Ok(dependencies), Ok(ancestors), Ok(parallelizable)) = (
                self.dependencies(sort, node),
                self.ancestors(node),
                self.is_parallelizable(node),
            ) else {
                continue;
            };

            plan.push(PlanEntry {
                position: plan.len(),
                node: node.clone(),
                predecessors: predecessors.clone(),
                dependencies,
                ancestors,
                parallelizable,
            });
            predecessors.push(node.clone());
        }

        plan
    }
}
