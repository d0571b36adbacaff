//! Run state inspection API.
//!
//! A [`RunState`] is created fresh for every kernel run, appended to as steps
//! execute, and handed back to the caller when the run ends. [`RunSummary`]
//! is its serializable snapshot for external monitoring.

use crate::workflow::step::{StepError, StepResult};
use cellkit_core::StepId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Outcome of a single step within a run.
#[derive(Clone, Debug, PartialEq)]
pub enum StepExecutionState {
    /// Step record created, not yet decided
    Initial,
    /// Step returned a value
    Successful(Value),
    /// Run was interrupted before this step executed
    Interrupted,
    /// Step failed and the error hook chose to abort
    Aborted(StepError),
    /// Step failed and the error hook chose to continue
    Indeterminate(StepError),
}

impl StepExecutionState {
    /// The result handed to the following step, if this state carries one.
    ///
    /// Errors are passed on as values.
    pub fn as_result(&self) -> Option<StepResult> {
        match self {
            StepExecutionState::Successful(value) => Some(Ok(value.clone())),
            StepExecutionState::Aborted(err) | StepExecutionState::Indeterminate(err) => {
                Some(Err(err.clone()))
            }
            StepExecutionState::Initial | StepExecutionState::Interrupted => None,
        }
    }

    /// Short status label.
    pub fn label(&self) -> &'static str {
        match self {
            StepExecutionState::Initial => "initial",
            StepExecutionState::Successful(_) => "successful",
            StepExecutionState::Interrupted => "interrupted",
            StepExecutionState::Aborted(_) => "aborted",
            StepExecutionState::Indeterminate(_) => "indeterminate",
        }
    }

    /// Returns the error for failed states.
    pub fn error(&self) -> Option<&StepError> {
        match self {
            StepExecutionState::Aborted(err) | StepExecutionState::Indeterminate(err) => Some(err),
            _ => None,
        }
    }
}

/// One step's execution within a run.
#[derive(Clone, Debug)]
pub struct StepRecord {
    /// Position in the executed plan
    pub index: usize,
    /// Step id
    pub step: StepId,
    /// Current state
    pub state: StepExecutionState,
    /// When the record was created
    pub started_at: DateTime<Utc>,
    /// When the state was decided
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepRecord {
    pub(crate) fn new(index: usize, step: StepId) -> Self {
        Self {
            index,
            step,
            state: StepExecutionState::Initial,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn finish(&mut self, state: StepExecutionState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }
}

/// Status of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run has not begun
    NotStarted,
    /// Run is executing steps
    Running,
    /// Every planned step was attempted
    Completed,
    /// Run stopped at an interrupt
    Interrupted,
    /// Run stopped at an aborting error or a refused initialization
    Aborted,
}

/// An initializer or finalizer that returned an error.
#[derive(Clone, Debug, PartialEq)]
pub struct LifecycleFailure {
    pub step: StepId,
    pub error: StepError,
}

impl fmt::Display for LifecycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.error)
    }
}

/// State of one kernel run.
#[derive(Clone, Debug)]
pub struct RunState {
    /// Unique id of the run
    pub run_id: Uuid,
    /// Workflow name
    pub workflow_name: String,
    /// Current status
    pub status: RunStatus,
    /// Step records in execution order
    pub executed: Vec<StepRecord>,
    /// Step at which the run was interrupted
    pub interrupted_at: Option<StepId>,
    /// Step whose error aborted the run
    pub errored_out_at: Option<StepId>,
    /// Whether initialization refused to start the run
    pub init_aborted: bool,
    /// Initializer error that aborted the run
    pub init_failure: Option<LifecycleFailure>,
    /// Errors returned by finalizers
    pub finalize_errors: Vec<LifecycleFailure>,
    /// Run start time
    pub started_at: DateTime<Utc>,
    /// Run end time
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunState {
    /// Creates a new RunState.
    pub fn new(run_id: Uuid, workflow_name: impl Into<String>) -> Self {
        Self {
            run_id,
            workflow_name: workflow_name.into(),
            status: RunStatus::NotStarted,
            executed: Vec::new(),
            interrupted_at: None,
            errored_out_at: None,
            init_aborted: false,
            init_failure: None,
            finalize_errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Returns the record for `step`, if it was reached.
    pub fn record(&self, step: &StepId) -> Option<&StepRecord> {
        self.executed.iter().find(|r| &r.step == step)
    }

    /// Returns the state of `step`, if it was reached.
    pub fn outcome(&self, step: &StepId) -> Option<&StepExecutionState> {
        self.record(step).map(|r| &r.state)
    }

    /// Result of the most recent step, as piped into the next one.
    pub fn last_result(&self) -> Option<StepResult> {
        self.executed.last().and_then(|r| r.state.as_result())
    }

    /// Ids of steps that returned a value.
    pub fn successful_steps(&self) -> Vec<StepId> {
        self.executed
            .iter()
            .filter(|r| matches!(r.state, StepExecutionState::Successful(_)))
            .map(|r| r.step.clone())
            .collect()
    }

    /// Returns true if the run finished with every step attempted.
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut StepRecord> {
        self.executed.last_mut()
    }

    pub(crate) fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// Serializable snapshot of this run.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            workflow_name: self.workflow_name.clone(),
            status: self.status,
            steps: self
                .executed
                .iter()
                .map(|r| StepSummary {
                    index: r.index,
                    step: r.step.clone(),
                    state: r.state.label().to_string(),
                    value: match &r.state {
                        StepExecutionState::Successful(v) => Some(v.clone()),
                        _ => None,
                    },
                    error: r.state.error().map(|e| e.to_string()),
                    started_at: r.started_at,
                    finished_at: r.finished_at,
                })
                .collect(),
            interrupted_at: self.interrupted_at.clone(),
            errored_out_at: self.errored_out_at.clone(),
            init_aborted: self.init_aborted,
            init_failure: self.init_failure.as_ref().map(|f| f.to_string()),
            finalize_errors: self
                .finalize_errors
                .iter()
                .map(|f| f.to_string())
                .collect(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// Summary of one step record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepSummary {
    pub index: usize,
    pub step: StepId,
    pub state: String,
    pub value: Option<Value>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Serializable snapshot of a [`RunState`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub workflow_name: String,
    pub status: RunStatus,
    pub steps: Vec<StepSummary>,
    pub interrupted_at: Option<StepId>,
    pub errored_out_at: Option<StepId>,
    pub init_aborted: bool,
    pub init_failure: Option<String>,
    pub finalize_errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
