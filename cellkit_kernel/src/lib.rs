//! cellkit kernel - runs notebook-style workflows step by step.
//!
//! This crate executes the steps of a workflow instance sequentially, in an
//! order derived from declared dependencies:
//!
//! - Definition: declare steps on a [`WorkflowDefinition`]
//! - Registration: dependencies, disregarded steps, initializers, finalizers
//! - Assembly: DAG construction, fallback chaining, lint, cycle detection
//! - Execution: the [`Kernel`] pipes each step's result into the next one
//! - Inspection: a [`RunState`] records what every step did
//!
//! Graph algorithms and step identities live in `cellkit_core`.

pub mod config;
pub mod error;
pub mod observe;
pub mod workflow;

pub use cellkit_core::StepId;
pub use config::{ConfigError, KernelConfig};
pub use error::{KernelError, Result};
pub use observe::TracingHooks;
pub use workflow::{
    CancellationToken, CancellationTokenSource, ErrorDirective, Extensions, InitDirective, Kernel,
    KernelHooks, LintKind, LintMessage, NoopHooks, RegistrationLog, RunContext, RunState, RunStatus,
    RunSummary, StepContext, StepDirective, StepError, StepExecutionState, StepOperation,
    StepRegistry, StepResult, WorkflowDefinition, WorkflowInstance,
};
