//! Built-in step implementations wrapping closures.
//!
//! [`SyncStep`] wraps a plain closure that may mutate the workflow instance.
//! [`FunctionStep`] wraps an async closure that owns its inputs and never
//! touches the instance, which keeps the returned future `'static`.

use crate::workflow::context::StepContext;
use crate::workflow::state::RunState;
use crate::workflow::step::{StepOperation, StepResult};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

type SyncFn<W> =
    dyn Fn(&mut W, &StepContext, &RunState, Option<StepResult>) -> StepResult + Send + Sync;
type BoxedFuture = Pin<Box<dyn Future<Output = StepResult> + Send>>;

/// Step that wraps a synchronous closure.
///
/// # Example
///
/// ```ignore
/// use cellkit_kernel::workflow::steps::SyncStep;
///
/// let step = SyncStep::new(|wf: &mut Report, _ctx, _state, _previous| {
///     wf.rows += 1;
///     Ok(serde_json::json!(wf.rows))
/// });
/// ```
pub struct SyncStep<W> {
    f: Box<SyncFn<W>>,
}

impl<W> SyncStep<W> {
    /// Creates a new SyncStep from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut W, &StepContext, &RunState, Option<StepResult>) -> StepResult
            + Send
            + Sync
            + 'static,
    {
        Self { f: Box::new(f) }
    }
}

#[async_trait]
impl<W> StepOperation<W> for SyncStep<W>
where
    W: Send + Sync,
{
    async fn execute(
        &self,
        workflow: &mut W,
        ctx: &StepContext,
        state: &RunState,
        previous: Option<StepResult>,
    ) -> StepResult {
        (self.f)(workflow, ctx, state, previous)
    }
}

/// Owned inputs of a [`FunctionStep`] invocation.
#[derive(Clone, Debug)]
pub struct StepCall {
    /// Context of the invocation
    pub ctx: StepContext,
    /// Snapshot of the run state when the step started
    pub state: RunState,
    /// Result of the previous step
    pub previous: Option<StepResult>,
}

/// Step that wraps an async function.
///
/// Useful for steps that only transform the previous result or talk to
/// something outside the workflow instance.
///
/// # Example
///
/// ```ignore
/// use cellkit_kernel::workflow::steps::FunctionStep;
///
/// let step = FunctionStep::new(|call| async move {
///     let rows = call.previous.unwrap_or(Ok(json!(0)))?;
///     Ok(json!({ "rows": rows }))
/// });
/// ```
pub struct FunctionStep {
    f: Box<dyn Fn(StepCall) -> BoxedFuture + Send + Sync>,
}

impl FunctionStep {
    /// Creates a new FunctionStep from an async function.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(StepCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepResult> + Send + 'static,
    {
        Self {
            f: Box::new(move |call| Box::pin(f(call)) as BoxedFuture),
        }
    }
}

#[async_trait]
impl<W> StepOperation<W> for FunctionStep
where
    W: Send + Sync,
{
    async fn execute(
        &self,
        _workflow: &mut W,
        ctx: &StepContext,
        state: &RunState,
        previous: Option<StepResult>,
    ) -> StepResult {
        (self.f)(StepCall {
            ctx: ctx.clone(),
            state: state.clone(),
            previous,
        })
        .await
    }
}
