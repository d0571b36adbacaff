//! Directed graph with depth-first DAG algorithms.
//!
//! Nodes and edges keep their insertion order. Every traversal visits roots in
//! node insertion order and neighbours in edge insertion order, so the results
//! of [`Graph::topological_sort`] and [`Graph::find_cycles`] are deterministic
//! for a given construction sequence.
//!
//! # Example
//!
//! ```ignore
//! use cellkit_core::Graph;
//!
//! let mut graph = Graph::new();
//! graph.add_node("load");
//! graph.add_node("transform");
//! graph.add_edge("load", "transform");
//!
//! assert!(!graph.is_cyclic());
//! assert_eq!(graph.topological_sort(), vec!["load", "transform"]);
//! ```

pub mod diagram;
mod queries;

pub use queries::PlanEntry;

use crate::error::{GraphError, Result};
use crate::types::compare_identities;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// A directed edge `from -> to`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge<N> {
    /// Source node (executes first)
    pub from: N,
    /// Target node (executes after `from`)
    pub to: N,
}

impl<N> Edge<N> {
    /// Creates a new edge.
    pub fn new(from: N, to: N) -> Self {
        Self { from, to }
    }
}

impl<N: fmt::Display> fmt::Display for Edge<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// A cycle found by [`Graph::find_cycles`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cycle<N> {
    /// Nodes of the cycle, starting at the smallest node
    pub nodes: Vec<N>,
    /// Edges closing the cycle, in traversal order
    pub edges: Vec<Edge<N>>,
}

impl<N: fmt::Display> Cycle<N> {
    /// Renders the cycle as `a -> b -> a`.
    pub fn path(&self) -> String {
        let mut parts: Vec<String> = self.nodes.iter().map(|n| n.to_string()).collect();
        if let Some(first) = self.nodes.first() {
            parts.push(first.to_string());
        }
        parts.join(" -> ")
    }
}

/// Directed graph over node identities of type `N`.
///
/// Stored as a petgraph `DiGraph` with a side map from identity to
/// `NodeIndex`. Edges whose endpoints are unknown are never inserted; they
/// are kept in [`invalid_edges`](Self::invalid_edges) instead.
#[derive(Clone, Debug)]
pub struct Graph<N> {
    graph: DiGraph<N, ()>,
    node_map: HashMap<N, NodeIndex>,
    invalid_edges: Vec<Edge<N>>,
}

impl<N> Graph<N>
where
    N: Clone + Eq + Hash + Ord + fmt::Display,
{
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            invalid_edges: Vec::new(),
        }
    }

    /// Builds a graph from explicit nodes and edges.
    ///
    /// Edges referring to nodes outside `nodes` land in
    /// [`invalid_edges`](Self::invalid_edges).
    pub fn from_parts(
        nodes: impl IntoIterator<Item = N>,
        edges: impl IntoIterator<Item = Edge<N>>,
    ) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node);
        }
        for edge in edges {
            graph.add_edge(edge.from, edge.to);
        }
        graph
    }

    /// Builds a graph from edges alone, inferring nodes from the endpoints in
    /// order of first appearance.
    pub fn from_edges(edges: impl IntoIterator<Item = Edge<N>>) -> Self {
        let edges: Vec<Edge<N>> = edges.into_iter().collect();
        let mut graph = Self::new();
        for edge in &edges {
            graph.add_node(edge.from.clone());
            graph.add_node(edge.to.clone());
        }
        for edge in edges {
            graph.add_edge(edge.from, edge.to);
        }
        graph
    }

    /// Adds a node, returning its index. Adding a known node is a no-op.
    pub fn add_node(&mut self, node: impl Into<N>) -> NodeIndex {
        let node = node.into();
        if let Some(&idx) = self.node_map.get(&node) {
            return idx;
        }
        let idx = self.graph.add_node(node.clone());
        self.node_map.insert(node, idx);
        idx
    }

    /// Adds the edge `from -> to`.
    ///
    /// Returns `false` when either endpoint is unknown; the edge is then
    /// recorded as invalid and not inserted.
    pub fn add_edge(&mut self, from: impl Into<N>, to: impl Into<N>) -> bool {
        let from = from.into();
        let to = to.into();
        match (self.node_map.get(&from), self.node_map.get(&to)) {
            (Some(&a), Some(&b)) => {
                self.graph.add_edge(a, b, ());
                true
            }
            _ => {
                self.invalid_edges.push(Edge::new(from, to));
                false
            }
        }
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> Vec<N> {
        self.graph.node_indices().map(|idx| self.graph[idx].clone()).collect()
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> Vec<Edge<N>> {
        self.graph
            .edge_references()
            .map(|e| Edge::new(self.graph[e.source()].clone(), self.graph[e.target()].clone()))
            .collect()
    }

    /// Edges rejected because an endpoint was unknown.
    pub fn invalid_edges(&self) -> &[Edge<N>] {
        &self.invalid_edges
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of (valid) edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Checks if a node exists.
    pub fn contains(&self, node: &N) -> bool {
        self.node_map.contains_key(node)
    }

    /// Direct successors of `node` in edge insertion order.
    pub fn outgoing(&self, node: &N) -> Vec<N> {
        self.node_map
            .get(node)
            .map(|&idx| {
                self.neighbours(idx, Direction::Outgoing)
                    .into_iter()
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Direct predecessors of `node` in edge insertion order.
    pub fn incoming(&self, node: &N) -> Vec<N> {
        self.node_map
            .get(node)
            .map(|&idx| {
                self.neighbours(idx, Direction::Incoming)
                    .into_iter()
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns true if `node` is the source of at least one edge.
    pub fn has_outgoing(&self, node: &N) -> bool {
        self.node_map
            .get(node)
            .map(|&idx| self.graph.edges_directed(idx, Direction::Outgoing).next().is_some())
            .unwrap_or(false)
    }

    /// Returns true if `node` is the target of at least one edge.
    pub fn has_incoming(&self, node: &N) -> bool {
        self.node_map
            .get(node)
            .map(|&idx| self.graph.edges_directed(idx, Direction::Incoming).next().is_some())
            .unwrap_or(false)
    }

    /// Returns true if the graph contains a cycle (self-loops included).
    ///
    /// Depth-first search from every unvisited node, tracking the current
    /// path; reaching a node that is on the path is a back-edge.
    pub fn is_cyclic(&self) -> bool {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        self.graph
            .node_indices()
            .any(|idx| marks[idx.index()] == Mark::Unvisited && self.cyclic_from(idx, &mut marks))
    }

    fn cyclic_from(&self, root: NodeIndex, marks: &mut [Mark]) -> bool {
        marks[root.index()] = Mark::OnStack;
        let mut stack = vec![self.frame(root)];

        while let Some(frame) = stack.last_mut() {
            let Some(next) = frame.advance() else {
                marks[frame.idx.index()] = Mark::Done;
                stack.pop();
                continue;
            };
            match marks[next.index()] {
                Mark::OnStack => return true,
                Mark::Unvisited => {
                    marks[next.index()] = Mark::OnStack;
                    stack.push(self.frame(next));
                }
                Mark::Done => {}
            }
        }
        false
    }

    /// Enumerates cycles, at most one per depth-first root.
    ///
    /// Each cycle is rotated to start at its smallest node so reports do not
    /// depend on where the traversal entered the cycle.
    pub fn find_cycles(&self) -> Vec<Cycle<N>> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut cycles = Vec::new();

        for root in self.graph.node_indices() {
            if marks[root.index()] != Mark::Unvisited {
                continue;
            }
            if let Some(cycle) = self.cycle_from(root, &mut marks) {
                cycles.push(cycle);
            }
        }

        cycles
    }

    fn cycle_from(&self, root: NodeIndex, marks: &mut [Mark]) -> Option<Cycle<N>> {
        marks[root.index()] = Mark::OnStack;
        let mut stack = vec![self.frame(root)];

        while let Some(frame) = stack.last_mut() {
            let Some(next) = frame.advance() else {
                marks[frame.idx.index()] = Mark::Done;
                stack.pop();
                continue;
            };
            match marks[next.index()] {
                Mark::OnStack => {
                    let path: Vec<NodeIndex> = stack.iter().map(|f| f.idx).collect();
                    // the traversal stops early; release what is still on the path
                    for idx in &path {
                        marks[idx.index()] = Mark::Done;
                    }
                    return Some(self.cycle_on_path(&path, next));
                }
                Mark::Unvisited => {
                    marks[next.index()] = Mark::OnStack;
                    stack.push(self.frame(next));
                }
                Mark::Done => {}
            }
        }
        None
    }

    fn cycle_on_path(&self, path: &[NodeIndex], start: NodeIndex) -> Cycle<N> {
        let begin = path.iter().position(|&n| n == start).unwrap_or(0);
        let mut nodes: Vec<N> = path[begin..].iter().map(|&n| self.graph[n].clone()).collect();

        if let Some(min_pos) = nodes
            .iter()
            .enumerate()
            .min_by(|a, b| compare_identities(a.1, b.1))
            .map(|(pos, _)| pos)
        {
            nodes.rotate_left(min_pos);
        }

        let edges = nodes
            .iter()
            .zip(nodes.iter().cycle().skip(1))
            .map(|(from, to)| Edge::new(from.clone(), to.clone()))
            .collect();

        Cycle { nodes, edges }
    }

    /// Topological order: depth-first postorder, reversed.
    ///
    /// Roots are visited in node insertion order and neighbours in edge
    /// insertion order. On a cyclic graph this still terminates, but the
    /// order does not respect every edge; use
    /// [`try_topological_sort`](Self::try_topological_sort) to refuse
    /// cyclic input.
    pub fn topological_sort(&self) -> Vec<N> {
        let mut visited = vec![false; self.graph.node_count()];
        let mut postorder = Vec::with_capacity(self.graph.node_count());

        for root in self.graph.node_indices() {
            if !visited[root.index()] {
                self.postorder_from(root, &mut visited, &mut postorder);
            }
        }

        postorder.reverse();
        postorder.into_iter().map(|idx| self.graph[idx].clone()).collect()
    }

    fn postorder_from(&self, root: NodeIndex, visited: &mut [bool], postorder: &mut Vec<NodeIndex>) {
        visited[root.index()] = true;
        let mut stack = vec![self.frame(root)];

        while let Some(frame) = stack.last_mut() {
            match frame.advance() {
                Some(next) if !visited[next.index()] => {
                    visited[next.index()] = true;
                    stack.push(self.frame(next));
                }
                Some(_) => {}
                None => {
                    postorder.push(frame.idx);
                    stack.pop();
                }
            }
        }
    }

    /// Depth-first frame over the outgoing neighbours of `idx`.
    fn frame(&self, idx: NodeIndex) -> Frame {
        Frame {
            idx,
            next: self.neighbours(idx, Direction::Outgoing),
            cursor: 0,
        }
    }

    /// Topological order, or [`GraphError::CycleDetected`] for cyclic graphs.
    pub fn try_topological_sort(&self) -> Result<Vec<N>> {
        if let Some(cycle) = self.find_cycles().into_iter().next() {
            return Err(GraphError::CycleDetected { path: cycle.path() });
        }
        Ok(self.topological_sort())
    }

    pub(crate) fn index_of(&self, node: &N) -> Result<NodeIndex> {
        self.node_map
            .get(node)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(node.to_string()))
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &N {
        &self.graph[idx]
    }

    /// Neighbours in edge insertion order.
    ///
    /// petgraph walks adjacency lists newest-first, so sort by edge index.
    pub(crate) fn neighbours(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.id(), other)
            })
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, n)| n).collect()
    }
}

impl<N> Default for Graph<N>
where
    N: Clone + Eq + Hash + Ord + fmt::Display,
{
    fn default() -> Self {
        Self::new()
    }
}

/// One level of an explicit depth-first stack.
struct Frame {
    idx: NodeIndex,
    next: Vec<NodeIndex>,
    cursor: usize,
}

impl Frame {
    fn advance(&mut self) -> Option<NodeIndex> {
        let next = self.next.get(self.cursor).copied();
        self.cursor += 1;
        next
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}
