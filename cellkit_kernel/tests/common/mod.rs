//! Common test utilities for kernel integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use cellkit_kernel::{
    ErrorDirective, InitDirective, KernelHooks, RunContext, RunState, StepContext, StepDirective,
    StepError, StepExecutionState, StepId, StepResult,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Workflow instance used across tests; records what its steps saw.
#[derive(Debug, Default)]
pub struct Notebook {
    pub calls: Vec<String>,
    pub seen: Vec<(String, Option<StepResult>)>,
}

impl Notebook {
    /// Previous result handed to `step`.
    pub fn previous_of(&self, step: &str) -> Option<StepResult> {
        self.seen
            .iter()
            .find(|(name, _)| name == step)
            .and_then(|(_, previous)| previous.clone())
    }
}

/// Step that records its call and returns its own name.
pub fn cell(
    name: &'static str,
) -> impl Fn(&mut Notebook, &StepContext, &RunState, Option<StepResult>) -> StepResult + Send + Sync + 'static
{
    move |nb, _ctx, _state, previous| {
        nb.calls.push(name.to_string());
        nb.seen.push((name.to_string(), previous));
        Ok(json!(name))
    }
}

/// Step that records its call and fails.
pub fn failing(
    name: &'static str,
) -> impl Fn(&mut Notebook, &StepContext, &RunState, Option<StepResult>) -> StepResult + Send + Sync + 'static
{
    move |nb, _ctx, _state, previous| {
        nb.calls.push(name.to_string());
        nb.seen.push((name.to_string(), previous));
        Err(StepError::failed(format!("{} broke", name)))
    }
}

/// Hook set that records every event and can be told to steer the run.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
    pub abort_init: bool,
    pub interrupt_at: Option<StepId>,
    pub abort_on_error: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort_init(mut self) -> Self {
        self.abort_init = true;
        self
    }

    pub fn interrupt_at(mut self, step: impl Into<StepId>) -> Self {
        self.interrupt_at = Some(step.into());
        self
    }

    pub fn abort_on_error(mut self) -> Self {
        self.abort_on_error = true;
        self
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl<W> KernelHooks<W> for Recorder
where
    W: Send + Sync,
{
    async fn init_workflow(&self, _workflow: &W, _run: &RunContext) -> InitDirective {
        self.push("init".to_string());
        if self.abort_init {
            InitDirective::Abort
        } else {
            InitDirective::Continue
        }
    }

    async fn before_step(&self, ctx: &StepContext, _state: &RunState) -> StepDirective {
        self.push(format!("before {}", ctx.current));
        if self.interrupt_at.as_ref() == Some(&ctx.current) {
            StepDirective::Interrupt
        } else {
            StepDirective::Proceed
        }
    }

    async fn after_interrupt(&self, ctx: &StepContext, _state: &RunState) {
        self.push(format!("interrupt {}", ctx.current));
    }

    async fn after_error(&self, error: &StepError, ctx: &StepContext, _state: &RunState) -> ErrorDirective {
        self.push(format!("error {}: {}", ctx.current, error));
        if self.abort_on_error {
            ErrorDirective::Abort
        } else {
            ErrorDirective::Continue
        }
    }

    async fn after_step(&self, outcome: &StepExecutionState, ctx: &StepContext, _state: &RunState) {
        self.push(format!("after {}: {}", ctx.current, outcome.label()));
    }

    async fn finalize_workflow(&self, _workflow: &W, _run: &RunContext, state: &RunState) {
        self.push(format!("finalize {:?}", state.status));
    }
}

/// Step ids from names.
pub fn ids(names: &[&str]) -> Vec<StepId> {
    names.iter().map(|n| StepId::from(*n)).collect()
}
