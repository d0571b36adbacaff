//! Per-step time limits.
//!
//! The kernel itself never preempts a step. Callers who want a deadline wrap
//! the operation in a [`TimeoutStep`], which races it against
//! `tokio::time::timeout` and turns an elapsed deadline into
//! [`StepError::Timeout`]. The error then goes through the normal error hook.

use crate::workflow::context::StepContext;
use crate::workflow::state::RunState;
use crate::workflow::step::{StepError, StepOperation, StepResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Step wrapper enforcing a time limit on the inner operation.
///
/// # Example
///
/// ```ignore
/// use cellkit_kernel::workflow::{SyncStep, TimeoutStep};
///
/// let definition = WorkflowDefinition::new("etl")
///     .step("fetch", TimeoutStep::from_secs(FetchStep::new(url), 30));
/// ```
pub struct TimeoutStep<W> {
    inner: Arc<dyn StepOperation<W>>,
    timeout: Duration,
}

impl<W> TimeoutStep<W>
where
    W: Send + Sync + 'static,
{
    /// Wraps `inner` with the given time limit.
    pub fn new(inner: impl StepOperation<W> + 'static, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
        }
    }

    /// Wraps `inner` with a limit in seconds.
    pub fn from_secs(inner: impl StepOperation<W> + 'static, secs: u64) -> Self {
        Self::new(inner, Duration::from_secs(secs))
    }

    /// Wraps `inner` with a limit in milliseconds.
    pub fn from_millis(inner: impl StepOperation<W> + 'static, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    /// Returns the time limit.
    pub fn duration(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<W> StepOperation<W> for TimeoutStep<W>
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
        let inner = self.inner.execute(workflow, ctx, state, previous);
        match tokio::time::timeout(self.timeout, inner).await {
            Ok(result) => result,
            Err(_) => Err(StepError::Timeout {
                step: ctx.current.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::context::{RunContext, StepPhase};
    use crate::workflow::steps::{FunctionStep, StepCall};
    use cellkit_core::StepId;
    use serde_json::json;
    use uuid::Uuid;

    fn ctx() -> StepContext {
        let run = Arc::new(RunContext::new("wf", vec![StepId::from("slow")]));
        let steps = run.ordered_steps.clone();
        StepContext::at(run, &steps, 0, StepPhase::Main).unwrap()
    }

    fn state() -> RunState {
        RunState::new(Uuid::new_v4(), "wf")
    }

    fn sleeper(millis: u64) -> FunctionStep {
        FunctionStep::new(move |_call: StepCall| async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(json!("finished"))
        })
    }

    #[tokio::test]
    async fn test_step_within_limit() {
        let step: TimeoutStep<()> = TimeoutStep::from_millis(sleeper(5), 1000);
        assert_eq!(step.duration(), Duration::from_millis(1000));

        let result = step.execute(&mut (), &ctx(), &state(), None).await;
        assert_eq!(result, Ok(json!("finished")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_exceeding_limit() {
        let step: TimeoutStep<()> = TimeoutStep::from_millis(sleeper(5_000), 50);

        let result = step.execute(&mut (), &ctx(), &state(), None).await;
        assert_eq!(
            result,
            Err(StepError::Timeout {
                step: "slow".to_string(),
                timeout: Duration::from_millis(50),
            })
        );
    }
}
