//! Workflow definition and sequential execution.
//!
//! A workflow is a plain value `W` plus a set of named steps that operate on
//! it. Steps are declared on a [`WorkflowDefinition`], ordering constraints
//! and lifecycle roles on a [`StepRegistry`], and the [`Kernel`] runs them:
//!
//! - [`WorkflowDefinition`](registry::WorkflowDefinition): step declarations, in order
//! - [`StepRegistry`](registry::StepRegistry): `depends_on`, `disregard`, `init`, `finalize`
//! - [`AssembledDag`](dag::AssembledDag): nodes, edges, fallback chain, lint
//! - [`Kernel`](kernel::Kernel): the run loop and its hooks
//!
//! # Example
//!
//! ```ignore
//! use cellkit_kernel::workflow::{Kernel, StepRegistry, WorkflowDefinition};
//!
//! let definition = WorkflowDefinition::new("notebook")
//!     .step_fn("cell1", cell1)
//!     .step_fn("cell2", cell2)
//!     .step_fn("cell3", cell3);
//! let log = StepRegistry::new().depends_on("cell1", "cell3").build();
//!
//! let mut instance = definition.instantiate(Notebook::default());
//! let state = Kernel::new(definition, log).run(&mut instance).await?;
//! ```
//!
//! # Step ordering
//!
//! Explicit dependencies become edges `prerequisite -> dependent`. Steps
//! left without a successor are then chained to the next step in declaration
//! order, so a workflow with no dependencies at all runs top to bottom.
//! Steps execute in depth-first topological order; a cyclic graph refuses to
//! run.

pub mod cancellation;
pub mod context;
pub mod dag;
pub mod hooks;
pub mod kernel;
pub mod registry;
pub mod state;
pub mod step;
pub mod steps;
pub mod timeout;
pub mod validate;

pub use cancellation::{CancellationToken, CancellationTokenSource};
pub use context::{Extensions, RunContext, StepContext, StepPhase};
pub use dag::AssembledDag;
pub use hooks::{ErrorDirective, InitDirective, KernelHooks, NoopHooks, StepDirective};
pub use kernel::Kernel;
pub use registry::{
    Dependency, LifecycleStep, LintKind, LintMessage, RegistrationLog, StepRegistry,
    WorkflowDefinition, WorkflowInstance, WorkflowTag,
};
pub use state::{
    LifecycleFailure, RunState, RunStatus, RunSummary, StepExecutionState, StepRecord, StepSummary,
};
pub use step::{StepError, StepOperation, StepResult};
pub use steps::{FunctionStep, StepCall, SyncStep};
pub use timeout::TimeoutStep;
pub use validate::{DagValidator, ValidationReport};
