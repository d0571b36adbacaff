//! cellkit core - step identities and depth-first DAG algorithms
//!
//! This crate holds the graph layer of cellkit. It knows nothing about
//! workflows or execution; the kernel crate builds on it.
//!
//! # Overview
//!
//! - **Identities**: [`StepId`] with a total tie-break ordering
//! - **Graph**: [`Graph`] with cycle detection, cycle enumeration and
//!   topological sort, all depth-first and insertion-order deterministic
//! - **Queries**: ancestors, dependencies, parallelizability, execution plan
//! - **Diagrams**: PlantUML renderings in [`graph::diagram`]
//!
//! # Quick Start
//!
//! ```rust
//! use cellkit_core::{Graph, StepId};
//!
//! let mut graph: Graph<StepId> = Graph::new();
//! graph.add_node("cell1");
//! graph.add_node("cell3");
//! graph.add_edge("cell3", "cell1");
//!
//! assert!(!graph.is_cyclic());
//! assert_eq!(graph.topological_sort(), vec![StepId::from("cell3"), StepId::from("cell1")]);
//! ```
//!
//! # Modules
//!
//! - [`types`]: Step identities and the tie-break comparator
//! - [`error`]: Error types for graph queries
//! - [`graph`]: Graph storage, algorithms, queries and diagrams

pub mod error;
pub mod graph;
pub mod types;

// Re-export commonly used types
pub use error::{GraphError, Result};
pub use graph::{Cycle, Edge, Graph, PlanEntry};
pub use types::{compare_identities, StepId};
