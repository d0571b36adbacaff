//! Error types for cellkit core.

/// Errors raised by graph queries that need a known node or an acyclic graph.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node is not part of the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Graph contains a cycle.
    #[error("Cycle detected in graph: {path}")]
    CycleDetected {
        /// Human-readable cycle path, e.g. `a -> b -> a`
        path: String,
    },
}

/// Type alias for Result with GraphError.
pub type Result<T> = std::result::Result<T, GraphError>;
