//! Integration tests for graph ordering and cycle detection.

use cellkit_core::{compare_identities, Edge, Graph, StepId};
use petgraph::graph::DiGraph;

/// Small deterministic generator so the graph shapes are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn random_graph(seed: u64, nodes: usize, edges: usize, forward_only: bool) -> Graph<StepId> {
    let mut rng = Lcg(seed);
    let mut graph = Graph::new();
    for i in 0..nodes {
        graph.add_node(StepId::new(format!("n{}", i)));
    }
    for _ in 0..edges {
        let a = rng.below(nodes as u64) as usize;
        let b = rng.below(nodes as u64) as usize;
        let (from, to) = if forward_only {
            if a == b {
                continue;
            }
            (a.min(b), a.max(b))
        } else {
            (a, b)
        };
        graph.add_edge(StepId::new(format!("n{}", from)), StepId::new(format!("n{}", to)));
    }
    graph
}

fn position(order: &[StepId], node: &StepId) -> usize {
    order.iter().position(|n| n == node).unwrap()
}

#[test]
fn test_sort_respects_every_edge_on_acyclic_graphs() {
    for seed in 0..50 {
        let graph = random_graph(seed, 12, 20, true);
        assert!(!graph.is_cyclic(), "seed {}", seed);

        let order = graph.topological_sort();
        assert_eq!(order.len(), graph.node_count());
        for Edge { from, to } in graph.edges() {
            assert!(
                position(&order, &from) < position(&order, &to),
                "seed {}: {} must precede {}",
                seed,
                from,
                to
            );
        }
    }
}

#[test]
fn test_cycle_detection_agrees_with_petgraph() {
    for seed in 100..200 {
        let graph = random_graph(seed, 8, 10, false);

        let mut mirror: DiGraph<StepId, ()> = DiGraph::new();
        let indices: Vec<_> = graph.nodes().into_iter().map(|n| mirror.add_node(n)).collect();
        let nodes = graph.nodes();
        for edge in graph.edges() {
            let a = indices[position(&nodes, &edge.from)];
            let b = indices[position(&nodes, &edge.to)];
            mirror.add_edge(a, b, ());
        }

        let expected = petgraph::algo::is_cyclic_directed(&mirror);
        assert_eq!(graph.is_cyclic(), expected, "seed {}", seed);
        assert_eq!(!graph.find_cycles().is_empty(), expected, "seed {}", seed);
    }
}

#[test]
fn test_found_cycles_are_real() {
    for seed in 300..350 {
        let graph = random_graph(seed, 8, 12, false);
        let edges = graph.edges();
        for cycle in graph.find_cycles() {
            assert!(!cycle.nodes.is_empty());
            let smallest = cycle.nodes.iter().min_by(|a, b| compare_identities(*a, *b));
            assert_eq!(smallest, cycle.nodes.first());
            for edge in &cycle.edges {
                assert!(edges.contains(edge), "seed {}: {} is not a graph edge", seed, edge);
            }
        }
    }
}

#[test]
fn test_sort_is_deterministic() {
    let first = random_graph(7, 15, 25, true).topological_sort();
    for _ in 0..5 {
        assert_eq!(random_graph(7, 15, 25, true).topological_sort(), first);
    }
}

#[test]
fn test_chained_cells_sort() {
    let cells: Vec<StepId> = (1..=5).map(|i| StepId::new(format!("cell{}", i))).collect();
    let edges = vec![
        Edge::new(cells[2].clone(), cells[0].clone()),
        Edge::new(cells[0].clone(), cells[1].clone()),
        Edge::new(cells[1].clone(), cells[3].clone()),
        Edge::new(cells[3].clone(), cells[4].clone()),
    ];
    let graph = Graph::from_parts(cells.clone(), edges);

    assert!(!graph.is_cyclic());
    assert_eq!(
        graph.topological_sort(),
        vec![
            cells[2].clone(),
            cells[0].clone(),
            cells[1].clone(),
            cells[3].clone(),
            cells[4].clone(),
        ]
    );
}

#[test]
fn test_numeric_identities() {
    let graph: Graph<StepId> = Graph::from_edges(vec![
        Edge::new(StepId::Index(10), StepId::Index(2)),
        Edge::new(StepId::Index(2), StepId::Index(10)),
    ]);
    let cycles = graph.find_cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].nodes, vec![StepId::Index(2), StepId::Index(10)]);
}

#[test]
fn test_long_chain_is_walked_without_recursion() {
    let nodes: Vec<StepId> = (0..100_000).map(StepId::Index).collect();
    let edges: Vec<Edge<StepId>> = nodes
        .windows(2)
        .map(|pair| Edge::new(pair[0].clone(), pair[1].clone()))
        .collect();
    let graph = Graph::from_parts(nodes.clone(), edges);

    assert!(!graph.is_cyclic());
    assert!(graph.find_cycles().is_empty());
    assert_eq!(graph.topological_sort(), nodes);
}

#[test]
fn test_long_chain_closing_back_is_cyclic() {
    let mut graph: Graph<StepId> = Graph::new();
    for i in 0..=100_000 {
        graph.add_node(StepId::Index(i));
    }
    for i in 0..100_000 {
        graph.add_edge(StepId::Index(i), StepId::Index(i + 1));
    }
    graph.add_edge(StepId::Index(100_000), StepId::Index(0));

    assert!(graph.is_cyclic());
    let cycles = graph.find_cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].nodes.len(), 100_001);
    assert_eq!(cycles[0].nodes.first(), Some(&StepId::Index(0)));
}
