//! Structured logging for kernel runs.
//!
//! [`TracingHooks`] wraps another hook set and emits `tracing` events at
//! every kernel boundary before delegating. Directives returned by the
//! wrapped hooks pass through unchanged.
//!
//! # Example
//!
//! ```ignore
//! let kernel = Kernel::new(definition, log)
//!     .with_hooks(TracingHooks::new(MyHooks::default()));
//! ```

use crate::workflow::context::{RunContext, StepContext};
use crate::workflow::hooks::{ErrorDirective, InitDirective, KernelHooks, NoopHooks, StepDirective};
use crate::workflow::state::{RunState, StepExecutionState};
use crate::workflow::step::StepError;
use async_trait::async_trait;

/// Hook decorator that logs run and step events.
#[derive(Clone, Debug, Default)]
pub struct TracingHooks<H = NoopHooks> {
    inner: H,
}

impl<H> TracingHooks<H> {
    /// Wraps `inner`.
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    /// Returns the wrapped hooks.
    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Unwraps into the wrapped hooks.
    pub fn into_inner(self) -> H {
        self.inner
    }
}

#[async_trait]
impl<W, H> KernelHooks<W> for TracingHooks<H>
where
    W: Send + Sync,
    H: KernelHooks<W>,
{
    async fn init_workflow(&self, workflow: &W, run: &RunContext) -> InitDirective {
        tracing::info!(
            workflow = %run.workflow_name,
            run_id = %run.run_id,
            steps = run.ordered_steps.len(),
            "Workflow run started"
        );
        let directive = self.inner.init_workflow(workflow, run).await;
        if directive == InitDirective::Abort {
            tracing::warn!(
                workflow = %run.workflow_name,
                run_id = %run.run_id,
                "Workflow run aborted during initialization"
            );
        }
        directive
    }

    async fn before_step(&self, ctx: &StepContext, state: &RunState) -> StepDirective {
        tracing::debug!(
            workflow = %ctx.workflow_name(),
            run_id = %ctx.run_id(),
            step = %ctx.current,
            index = ctx.index,
            "Step starting"
        );
        self.inner.before_step(ctx, state).await
    }

    async fn after_interrupt(&self, ctx: &StepContext, state: &RunState) {
        tracing::warn!(
            workflow = %ctx.workflow_name(),
            run_id = %ctx.run_id(),
            step = %ctx.current,
            index = ctx.index,
            "Workflow run interrupted"
        );
        self.inner.after_interrupt(ctx, state).await
    }

    async fn after_error(&self, error: &StepError, ctx: &StepContext, state: &RunState) -> ErrorDirective {
        let directive = self.inner.after_error(error, ctx, state).await;
        tracing::warn!(
            workflow = %ctx.workflow_name(),
            run_id = %ctx.run_id(),
            step = %ctx.current,
            index = ctx.index,
            directive = ?directive,
            "Step failed: {}",
            error
        );
        directive
    }

    async fn after_step(&self, outcome: &StepExecutionState, ctx: &StepContext, state: &RunState) {
        tracing::debug!(
            workflow = %ctx.workflow_name(),
            run_id = %ctx.run_id(),
            step = %ctx.current,
            index = ctx.index,
            outcome = outcome.label(),
            "Step finished"
        );
        self.inner.after_step(outcome, ctx, state).await
    }

    async fn finalize_workflow(&self, workflow: &W, run: &RunContext, state: &RunState) {
        tracing::info!(
            workflow = %run.workflow_name,
            run_id = %run.run_id,
            status = ?state.status,
            executed = state.executed.len(),
            finalize_errors = state.finalize_errors.len(),
            "Workflow run finished"
        );
        self.inner.finalize_workflow(workflow, run, state).await
    }
}
