//! Error types for the kernel.

use crate::workflow::registry::WorkflowTag;
use cellkit_core::StepId;

/// Errors that refuse a run before any step executes.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// The step graph is cyclic.
    #[error("Invalid workflow graph, cycles: {cycles}")]
    InvalidGraph {
        /// Rendered cycle paths
        cycles: String,
    },

    /// The instance was produced by another workflow definition.
    #[error("Workflow instance mismatch: expected {expected}, found {found}")]
    InstanceMismatch {
        expected: WorkflowTag,
        found: WorkflowTag,
    },

    /// Strict lint mode and the DAG has lint messages.
    #[error("Lint rejected ({} messages): {}", .0.len(), .0.join("; "))]
    LintRejected(Vec<String>),

    /// A step selection names a step outside the DAG.
    #[error("Unknown step: {0}")]
    UnknownStep(StepId),
}

/// Type alias for Result with KernelError.
pub type Result<T> = std::result::Result<T, KernelError>;
