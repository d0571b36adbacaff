//! Lifecycle hooks observed and steered by the caller.
//!
//! The kernel calls into a [`KernelHooks`] implementation at fixed points of
//! a run. Every method has a no-op default, so implementors override only the
//! events they care about.
//!
//! | Event | Can steer |
//! |---|---|
//! | `init_workflow` | abort before anything runs |
//! | `before_step` | interrupt the run |
//! | `after_interrupt` | - |
//! | `after_error` | abort or continue |
//! | `after_step` | - |
//! | `finalize_workflow` | - |

use crate::workflow::context::{RunContext, StepContext};
use crate::workflow::state::{RunState, StepExecutionState};
use crate::workflow::step::StepError;
use async_trait::async_trait;

/// Decision returned by [`KernelHooks::init_workflow`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitDirective {
    /// Start the run
    Continue,
    /// Stop before any step runs
    Abort,
}

/// Decision returned by [`KernelHooks::before_step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepDirective {
    /// Execute the step
    Proceed,
    /// Stop the run gracefully; finalizers still run
    Interrupt,
}

/// Decision returned by [`KernelHooks::after_error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorDirective {
    /// Mark the step indeterminate and keep going
    Continue,
    /// Mark the step aborted and stop the run
    Abort,
}

/// Hook set for a kernel run.
#[async_trait]
pub trait KernelHooks<W>: Send + Sync
where
    W: Send + Sync,
{
    /// Called once before initializers run.
    async fn init_workflow(&self, _workflow: &W, _run: &RunContext) -> InitDirective {
        InitDirective::Continue
    }

    /// Called before each DAG step.
    async fn before_step(&self, _ctx: &StepContext, _state: &RunState) -> StepDirective {
        StepDirective::Proceed
    }

    /// Called right after the run was interrupted at `ctx.current`.
    async fn after_interrupt(&self, _ctx: &StepContext, _state: &RunState) {}

    /// Called when a DAG step returns an error.
    async fn after_error(&self, _error: &StepError, _ctx: &StepContext, _state: &RunState) -> ErrorDirective {
        ErrorDirective::Continue
    }

    /// Called after a step that ended successful or indeterminate.
    async fn after_step(&self, _outcome: &StepExecutionState, _ctx: &StepContext, _state: &RunState) {}

    /// Called last, after finalizers, whatever the outcome.
    async fn finalize_workflow(&self, _workflow: &W, _run: &RunContext, _state: &RunState) {}
}

/// Hook set that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl<W> KernelHooks<W> for NoopHooks where W: Send + Sync {}
