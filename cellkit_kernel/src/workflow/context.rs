//! Run and step contexts handed to steps and hooks.

use cellkit_core::StepId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Caller-supplied data attached to a run or step context.
///
/// Keys are free-form; values are JSON so they can carry anything the caller
/// can serialize.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extensions(HashMap<String, Value>);

impl Extensions {
    /// Creates an empty extension map.
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Inserts a value, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns the raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Deserializes the value for `key` into `T`.
    ///
    /// Returns `None` if the key is absent or the value has another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Checks if a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, Value>> for Extensions {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

/// Per-run context, built once at the start of [`Kernel::run`](crate::Kernel::run).
#[derive(Clone, Debug)]
pub struct RunContext {
    /// Steps in the order they will execute
    pub ordered_steps: Vec<StepId>,
    /// Index of the last step, `None` for an empty plan
    pub last_index: Option<usize>,
    /// Unique id of this run
    pub run_id: Uuid,
    /// Workflow name
    pub workflow_name: String,
    /// Run-level caller data
    pub extensions: Extensions,
}

impl RunContext {
    /// Creates a run context for the given plan.
    pub fn new(workflow_name: impl Into<String>, ordered_steps: Vec<StepId>) -> Self {
        let last_index = ordered_steps.len().checked_sub(1);
        Self {
            ordered_steps,
            last_index,
            run_id: Uuid::new_v4(),
            workflow_name: workflow_name.into(),
            extensions: Extensions::new(),
        }
    }

    /// Sets the run-level extensions.
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }
}

/// Which part of a run a step belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepPhase {
    /// Initializer, before the DAG
    Init,
    /// Regular DAG step
    Main,
    /// Finalizer, after the DAG
    Finalize,
}

/// Context for a single step invocation.
///
/// Cheap to clone: run-level data is shared behind an `Arc`.
#[derive(Clone, Debug)]
pub struct StepContext {
    /// Step that ran before this one in the plan
    pub previous: Option<StepId>,
    /// This step
    pub current: StepId,
    /// Step that runs after this one in the plan
    pub next: Option<StepId>,
    /// Position of this step in its phase
    pub index: usize,
    /// Phase of the run
    pub phase: StepPhase,
    /// Shared run context
    pub run: Arc<RunContext>,
    /// Step-level caller data
    pub extensions: Extensions,
}

impl StepContext {
    /// Builds the context for position `index` within `steps`.
    ///
    /// Returns `None` if `index` is out of range. Handy for exercising a step
    /// outside a kernel.
    pub fn at(run: Arc<RunContext>, steps: &[StepId], index: usize, phase: StepPhase) -> Option<Self> {
        let current = steps.get(index)?.clone();
        Some(Self::new(run, steps, index, current, phase))
    }

    pub(crate) fn new(
        run: Arc<RunContext>,
        steps: &[StepId],
        index: usize,
        current: StepId,
        phase: StepPhase,
    ) -> Self {
        Self {
            previous: index.checked_sub(1).and_then(|i| steps.get(i)).cloned(),
            current,
            next: steps.get(index + 1).cloned(),
            index,
            phase,
            run,
            extensions: Extensions::new(),
        }
    }

    /// Sets the step-level extensions.
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// Returns true if this is the first step of its phase.
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    /// Returns true if this is the last step of its phase.
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }

    /// Looks up an extension, step-level first, then run-level.
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key).or_else(|| self.run.extensions.get(key))
    }

    /// Typed variant of [`extension`](Self::extension).
    pub fn extension_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.extension(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Unique id of the run this step belongs to.
    pub fn run_id(&self) -> Uuid {
        self.run.run_id
    }

    /// Name of the workflow being run.
    pub fn workflow_name(&self) -> &str {
        &self.run.workflow_name
    }
}
