//! PlantUML renderings of graphs and execution plans.

use super::{Edge, Graph};
use std::fmt;
use std::hash::Hash;

/// How a node is rendered: its declaration text plus optional features.
#[derive(Clone, Debug, Default)]
pub struct PumlNode {
    pub text: String,
    pub features: Option<String>,
}

/// How an edge is rendered.
#[derive(Clone, Debug, Default)]
pub struct PumlEdge {
    pub from_text: String,
    pub to_text: String,
    pub features: Option<String>,
}

/// Rendering options for [`graph_puml`].
pub struct PumlOptions<'a, N> {
    /// Lines emitted right after `@startuml`
    pub diagram_features: Option<String>,
    pub node: Box<dyn Fn(&N) -> PumlNode + 'a>,
    pub edge: Box<dyn Fn(&Edge<N>) -> PumlEdge + 'a>,
}

/// Renders an arbitrary graph with caller-supplied node and edge text.
pub fn graph_puml<N>(graph: &Graph<N>, options: &PumlOptions<'_, N>) -> String
where
    N: Clone + Eq + Hash + Ord + fmt::Display,
{
    let node_lines: Vec<String> = graph
        .nodes()
        .iter()
        .map(|node| {
            let rendered = (options.node)(node);
            with_features(rendered.text, rendered.features)
        })
        .collect();

    let edge_lines: Vec<String> = graph
        .edges()
        .iter()
        .map(|edge| {
            let rendered = (options.edge)(edge);
            with_features(format!("{} --> {}", rendered.from_text, rendered.to_text), rendered.features)
        })
        .collect();

    let header = match &options.diagram_features {
        Some(features) => format!("@startuml\n{}", features),
        None => "@startuml".to_string(),
    };

    format!("{}\n{}\n{}\n@enduml", header, node_lines.join("\n"), edge_lines.join("\n"))
}

/// Left-to-right diagram with one rectangle per node.
pub fn typical_puml<N>(graph: &Graph<N>) -> String
where
    N: Clone + Eq + Hash + Ord + fmt::Display,
{
    let options = PumlOptions {
        diagram_features: Some("left to right direction\n".to_string()),
        node: Box::new(|node: &N| PumlNode {
            text: format!("rectangle {}", node),
            features: None,
        }),
        edge: Box::new(|edge: &Edge<N>| PumlEdge {
            from_text: edge.from.to_string(),
            to_text: edge.to.to_string(),
            features: None,
        }),
    };
    graph_puml(graph, &options)
}

/// Renders the execution order next to the raw graph.
///
/// The top half chains nodes in topological order (`label` for
/// parallelizable nodes, `queue` otherwise); the bottom half draws every
/// edge of the graph.
pub fn execution_plan_puml<N>(graph: &Graph<N>) -> String
where
    N: Clone + Eq + Hash + Ord + fmt::Display,
{
    let sort = graph.topological_sort();
    let mut node_lines = Vec::new();
    let mut edge_lines = Vec::new();

    for node in &sort {
        let kind = if graph.is_parallelizable(node).unwrap_or(false) {
            "label"
        } else {
            "queue"
        };
        node_lines.push(format!("{} dag{} as \"{}\"", kind, node, node));
    }

    if sort.len() > 1 {
        edge_lines.push(format!("DAG --> dag{}", sort[0]));
        for pair in sort.windows(2) {
            edge_lines.push(format!("dag{} --> dag{}", pair[0], pair[1]));
        }
    }

    for node in graph.nodes() {
        node_lines.push(format!("rectangle g{} as \"{}\"", node, node));
    }

    for (i, edge) in graph.edges().iter().enumerate() {
        if i == 0 {
            edge_lines.push(format!("Graph --> g{}", edge.from));
        }
        edge_lines.push(format!("g{} --> g{}", edge.from, edge.to));
    }

    format!(
        "@startuml\nleft to right direction\n{}\n{}\n@enduml",
        node_lines.join("\n"),
        edge_lines.join("\n")
    )
}

fn with_features(text: String, features: Option<String>) -> String {
    match features {
        Some(f) if !f.is_empty() => format!("{} {}", text, f),
        _ => text,
    }
}
