//! Step abstraction and execution trait.
//!
//! A step is one invocable unit of a workflow (a notebook "cell"). Steps
//! receive the workflow instance, a [`StepContext`], the [`RunState`] so
//! far and the previous step's result, and return a JSON value or a
//! [`StepError`].

use crate::workflow::context::StepContext;
use crate::workflow::state::RunState;
use async_trait::async_trait;
use std::time::Duration;

/// Error types for step execution.
///
/// Clone so a failed result can be piped into the next step as a value.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StepError {
    /// Step execution failed with a message
    #[error("Step execution failed: {0}")]
    ExecutionFailed(String),

    /// Step exceeded its time limit
    #[error("Step {step} exceeded timeout limit of {timeout:?}")]
    Timeout {
        step: String,
        timeout: Duration,
    },

    /// Step observed cancellation and stopped
    #[error("Step cancelled: {0}")]
    Cancelled(String),

    /// Generic error wrapper
    #[error("Step error: {0}")]
    Other(String),
}

impl StepError {
    /// Creates an ExecutionFailed error.
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::ExecutionFailed(message.into())
    }
}

impl From<anyhow::Error> for StepError {
    fn from(err: anyhow::Error) -> Self {
        StepError::Other(format!("{:#}", err))
    }
}

impl From<std::io::Error> for StepError {
    fn from(err: std::io::Error) -> Self {
        StepError::Other(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for StepError {
    fn from(err: serde_json::Error) -> Self {
        StepError::Other(format!("JSON error: {}", err))
    }
}

/// Outcome of one step: a JSON value or an error.
pub type StepResult = Result<serde_json::Value, StepError>;

/// Trait for workflow step execution.
///
/// Implemented by every operation registered in a
/// [`WorkflowDefinition`](crate::workflow::registry::WorkflowDefinition).
/// Steps run one at a time, so an operation gets exclusive access to the
/// workflow instance for its whole duration.
#[async_trait]
pub trait StepOperation<W>: Send + Sync {
    /// Executes the step.
    ///
    /// # Arguments
    ///
    /// * `workflow` - The workflow instance being run
    /// * `ctx` - Position of the step within the run plus run metadata
    /// * `state` - Records of the steps executed so far in this run
    /// * `previous` - Result of the step that ran before, `None` for the first
    ///
    /// # Returns
    ///
    /// `Ok(value)` on success, `Err(StepError)` on failure. Errors are not
    /// fatal by themselves; the kernel's error hook decides.
    async fn execute(
        &self,
        workflow: &mut W,
        ctx: &StepContext,
        state: &RunState,
        previous: Option<StepResult>,
    ) -> StepResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_display() {
        let err = StepError::failed("boom");
        assert_eq!(err.to_string(), "Step execution failed: boom");

        let err = StepError::Timeout {
            step: "load".to_string(),
            timeout: Duration::from_millis(50),
        };
        assert_eq!(err.to_string(), "Step load exceeded timeout limit of 50ms");
    }

    #[test]
    fn test_step_error_from_anyhow() {
        let err: StepError = anyhow::anyhow!("bad input").context("parsing").into();
        assert_eq!(err, StepError::Other("parsing: bad input".to_string()));
    }

    #[test]
    fn test_step_error_is_cloneable() {
        let err = StepError::Cancelled("stop".to_string());
        let piped: StepResult = Err(err.clone());
        assert_eq!(piped, Err(err));
    }
}
