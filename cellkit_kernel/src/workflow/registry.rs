//! Workflow definitions and step registration.
//!
//! A [`WorkflowDefinition`] is the ordered set of steps a workflow type
//! declares. A [`StepRegistry`] collects the structural facts about those
//! steps (dependencies, disregarded steps, initializers, finalizers) and
//! freezes them into an immutable [`RegistrationLog`].
//!
//! # Example
//!
//! ```ignore
//! let definition = WorkflowDefinition::new("etl")
//!     .step("extract", SyncStep::new(extract))
//!     .step("load", SyncStep::new(load))
//!     .step("setup", SyncStep::new(setup));
//!
//! let log = StepRegistry::new()
//!     .depends_on("load", "extract")
//!     .init("setup", None)
//!     .build();
//! ```

use crate::workflow::context::StepContext;
use crate::workflow::state::RunState;
use crate::workflow::step::{StepOperation, StepResult};
use crate::workflow::steps::SyncStep;
use cellkit_core::StepId;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use uuid::Uuid;

/// Identity of a workflow definition.
///
/// Stamped on every instance produced by
/// [`WorkflowDefinition::instantiate`]; the kernel refuses instances carrying
/// another definition's tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowTag(Uuid);

impl WorkflowTag {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for WorkflowTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A workflow value bound to the definition that produced it.
#[derive(Debug)]
pub struct WorkflowInstance<W> {
    tag: WorkflowTag,
    inner: W,
}

impl<W> WorkflowInstance<W> {
    /// Tag of the producing definition.
    pub fn tag(&self) -> WorkflowTag {
        self.tag
    }

    /// Consumes the instance and returns the workflow value.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W> Deref for WorkflowInstance<W> {
    type Target = W;

    fn deref(&self) -> &W {
        &self.inner
    }
}

impl<W> DerefMut for WorkflowInstance<W> {
    fn deref_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

/// Ordered map from step id to operation for one workflow type.
///
/// Declaration order matters: steps without explicit dependencies run in
/// the order they were declared.
pub struct WorkflowDefinition<W> {
    name: String,
    tag: WorkflowTag,
    steps: IndexMap<StepId, Arc<dyn StepOperation<W>>>,
    duplicates: Vec<StepId>,
}

impl<W> WorkflowDefinition<W>
where
    W: Send + Sync + 'static,
{
    /// Creates an empty definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: WorkflowTag::new(),
            steps: IndexMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Declares a step, builder style.
    pub fn step(mut self, id: impl Into<StepId>, operation: impl StepOperation<W> + 'static) -> Self {
        self.add_step(id, Arc::new(operation));
        self
    }

    /// Declares a step backed by a synchronous closure.
    pub fn step_fn<F>(self, id: impl Into<StepId>, f: F) -> Self
    where
        F: Fn(&mut W, &StepContext, &RunState, Option<StepResult>) -> StepResult
            + Send
            + Sync
            + 'static,
    {
        self.step(id, SyncStep::new(f))
    }

    /// Declares a step.
    ///
    /// Re-declaring an id replaces the operation but keeps the original
    /// position; the id is remembered so assembly can report it.
    pub fn add_step(&mut self, id: impl Into<StepId>, operation: Arc<dyn StepOperation<W>>) {
        let id = id.into();
        if self.steps.insert(id.clone(), operation).is_some() {
            self.duplicates.push(id);
        }
    }

    /// Wraps a workflow value so the kernel can check where it came from.
    pub fn instantiate(&self, value: W) -> WorkflowInstance<W> {
        WorkflowInstance {
            tag: self.tag,
            inner: value,
        }
    }

    /// Returns the definition name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the definition tag.
    pub fn tag(&self) -> WorkflowTag {
        self.tag
    }

    /// Step ids in declaration order.
    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.keys().cloned().collect()
    }

    /// Returns the operation registered for `id`.
    pub fn operation(&self, id: &StepId) -> Option<Arc<dyn StepOperation<W>>> {
        self.steps.get(id).cloned()
    }

    /// Checks if a step is declared.
    pub fn contains(&self, id: &StepId) -> bool {
        self.steps.contains_key(id)
    }

    /// Ids declared more than once.
    pub fn duplicates(&self) -> &[StepId] {
        &self.duplicates
    }

    /// Number of declared steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no steps are declared.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A recorded ordering dependency: `step` runs after `depends_on`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub step: StepId,
    pub depends_on: StepId,
}

/// An initializer or finalizer registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleStep {
    pub step: StepId,
    pub priority: i64,
}

/// Category of a lint message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LintKind {
    /// A step depends on itself
    SelfDependency,
    /// A dependency names a step that is not part of the graph
    InvalidDependency,
    /// An init/finalize registration names an undeclared step
    InvalidLifecycleStep,
    /// A step id was declared more than once
    DuplicateStep,
    /// The dependency graph is cyclic
    CyclesDetected,
}

/// Non-fatal structural warning from registration or assembly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintMessage {
    pub kind: LintKind,
    pub step: Option<StepId>,
    pub message: String,
}

impl LintMessage {
    /// Creates a new lint message.
    pub fn new(kind: LintKind, step: Option<StepId>, message: impl Into<String>) -> Self {
        Self {
            kind,
            step,
            message: message.into(),
        }
    }

    pub(crate) fn self_dependency(step: &StepId, depends_on: &StepId) -> Self {
        Self::new(
            LintKind::SelfDependency,
            Some(step.clone()),
            format!("[dependsOn] circular dependency detected in {}: {}", step, depends_on),
        )
    }

    pub(crate) fn invalid_dependency(step: &StepId, depends_on: &StepId) -> Self {
        Self::new(
            LintKind::InvalidDependency,
            Some(step.clone()),
            format!("invalid dependency: {} in {}", depends_on, step),
        )
    }

    pub(crate) fn invalid_lifecycle_step(step: &StepId, role: &str) -> Self {
        Self::new(
            LintKind::InvalidLifecycleStep,
            Some(step.clone()),
            format!("{} step {} is not declared in the workflow", role, step),
        )
    }

    pub(crate) fn duplicate_step(step: &StepId) -> Self {
        Self::new(
            LintKind::DuplicateStep,
            Some(step.clone()),
            format!("step {} declared more than once, last declaration wins", step),
        )
    }

    pub(crate) fn cycles_detected() -> Self {
        Self::new(LintKind::CyclesDetected, None, "Cycles detected in graph")
    }
}

impl fmt::Display for LintMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Collects registrations for one workflow type.
///
/// Consumed by [`build`](Self::build), which produces the immutable
/// [`RegistrationLog`].
#[derive(Clone, Debug, Default)]
pub struct StepRegistry {
    dependencies: Vec<Dependency>,
    disregarded: IndexSet<StepId>,
    init_steps: Vec<LifecycleStep>,
    finalize_steps: Vec<LifecycleStep>,
    lint_results: Vec<LintMessage>,
}

impl StepRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `step` must run after `depends_on`.
    ///
    /// A step depending on itself is linted, and the dependency is still
    /// recorded (so the assembled graph will be cyclic).
    pub fn depends_on(mut self, step: impl Into<StepId>, depends_on: impl Into<StepId>) -> Self {
        let step = step.into();
        let depends_on = depends_on.into();
        if step == depends_on {
            self.lint_results.push(LintMessage::self_dependency(&step, &depends_on));
        }
        self.dependencies.push(Dependency { step, depends_on });
        self
    }

    /// Excludes a step from the DAG and from execution.
    pub fn disregard(mut self, step: impl Into<StepId>) -> Self {
        self.disregarded.insert(step.into());
        self
    }

    /// Registers an initializer, run before the DAG.
    ///
    /// Initializers run in ascending priority; ties keep registration order.
    /// Without an explicit priority, the number of initializers registered so
    /// far is used. The step is implicitly disregarded.
    pub fn init(mut self, step: impl Into<StepId>, priority: Option<i64>) -> Self {
        let step = step.into();
        let priority = priority.unwrap_or(self.init_steps.len() as i64);
        self.disregarded.insert(step.clone());
        self.init_steps.push(LifecycleStep { step, priority });
        self
    }

    /// Registers a finalizer, run after the DAG no matter how it ended.
    ///
    /// Same ordering rules as [`init`](Self::init).
    pub fn finalize(mut self, step: impl Into<StepId>, priority: Option<i64>) -> Self {
        let step = step.into();
        let priority = priority.unwrap_or(self.finalize_steps.len() as i64);
        self.disregarded.insert(step.clone());
        self.finalize_steps.push(LifecycleStep { step, priority });
        self
    }

    /// Freezes the registrations.
    pub fn build(self) -> RegistrationLog {
        RegistrationLog {
            dependencies: self.dependencies,
            disregarded: self.disregarded,
            init_steps: self.init_steps,
            finalize_steps: self.finalize_steps,
            lint_results: self.lint_results,
        }
    }
}

/// Immutable result of [`StepRegistry::build`].
#[derive(Clone, Debug, Default)]
pub struct RegistrationLog {
    dependencies: Vec<Dependency>,
    disregarded: IndexSet<StepId>,
    init_steps: Vec<LifecycleStep>,
    finalize_steps: Vec<LifecycleStep>,
    lint_results: Vec<LintMessage>,
}

/// Steps of a definition that take part in the DAG.
pub struct Introspection<W> {
    /// Participating step ids in declaration order
    pub steps: Vec<StepId>,
    /// Operation lookup
    pub by_id: HashMap<StepId, Arc<dyn StepOperation<W>>>,
}

impl RegistrationLog {
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn disregarded(&self) -> &IndexSet<StepId> {
        &self.disregarded
    }

    pub fn is_disregarded(&self, step: &StepId) -> bool {
        self.disregarded.contains(step)
    }

    pub fn init_steps(&self) -> &[LifecycleStep] {
        &self.init_steps
    }

    pub fn finalize_steps(&self) -> &[LifecycleStep] {
        &self.finalize_steps
    }

    pub fn lint_results(&self) -> &[LintMessage] {
        &self.lint_results
    }

    /// Initializer ids in execution order.
    pub fn init_order(&self) -> Vec<StepId> {
        by_priority(&self.init_steps)
    }

    /// Finalizer ids in execution order.
    pub fn finalize_order(&self) -> Vec<StepId> {
        by_priority(&self.finalize_steps)
    }

    /// Lists the declared steps that take part in the DAG, in declaration
    /// order. Disregarded steps (initializers and finalizers included) are
    /// left out.
    pub fn introspect<W>(&self, definition: &WorkflowDefinition<W>) -> Introspection<W>
    where
        W: Send + Sync + 'static,
    {
        let mut steps = Vec::new();
        let mut by_id = HashMap::new();
        for id in definition.step_ids() {
            if self.is_disregarded(&id) {
                continue;
            }
            if let Some(op) = definition.operation(&id) {
                by_id.insert(id.clone(), op);
                steps.push(id);
            }
        }
        Introspection { steps, by_id }
    }
}

fn by_priority(steps: &[LifecycleStep]) -> Vec<StepId> {
    let mut ordered: Vec<&LifecycleStep> = steps.iter().collect();
    // stable: equal priorities keep registration order
    ordered.sort_by_key(|s| s.priority);
    ordered.into_iter().map(|s| s.step.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop(_: &mut (), _: &StepContext, _: &RunState, _: Option<StepResult>) -> StepResult {
        Ok(json!(null))
    }

    #[test]
    fn test_definition_keeps_declaration_order() {
        let def = WorkflowDefinition::new("wf")
            .step_fn("b", noop)
            .step_fn("a", noop)
            .step_fn(3i64, noop);
        assert_eq!(def.step_ids(), vec![StepId::from("b"), StepId::from("a"), StepId::Index(3)]);
        assert_eq!(def.len(), 3);
        assert!(def.duplicates().is_empty());
    }

    #[test]
    fn test_redeclaration_replaces_in_place() {
        let def = WorkflowDefinition::new("wf")
            .step_fn("a", noop)
            .step_fn("b", noop)
            .step_fn("a", noop);
        assert_eq!(def.step_ids(), vec![StepId::from("a"), StepId::from("b")]);
        assert_eq!(def.duplicates(), &[StepId::from("a")]);
    }

    #[test]
    fn test_instantiate_stamps_tag() {
        let def: WorkflowDefinition<u8> = WorkflowDefinition::new("wf");
        let other: WorkflowDefinition<u8> = WorkflowDefinition::new("wf");
        let instance = def.instantiate(7);
        assert_eq!(instance.tag(), def.tag());
        assert_ne!(instance.tag(), other.tag());
        assert_eq!(*instance, 7);
    }

    #[test]
    fn test_self_dependency_is_linted_and_kept() {
        let log = StepRegistry::new().depends_on("x", "x").build();
        assert_eq!(log.dependencies().len(), 1);
        assert_eq!(log.lint_results().len(), 1);
        assert_eq!(log.lint_results()[0].kind, LintKind::SelfDependency);
        assert_eq!(
            log.lint_results()[0].message,
            "[dependsOn] circular dependency detected in x: x"
        );
    }

    #[test]
    fn test_lifecycle_priorities() {
        let log = StepRegistry::new()
            .init("second", None)
            .init("first", Some(-1))
            .init("third", None)
            .finalize("close", Some(5))
            .finalize("flush", None)
            .build();

        // defaults: second -> 0, third -> 2
        assert_eq!(
            log.init_order(),
            vec![StepId::from("first"), StepId::from("second"), StepId::from("third")]
        );
        assert_eq!(log.finalize_order(), vec![StepId::from("flush"), StepId::from("close")]);
        assert!(log.is_disregarded(&StepId::from("first")));
        assert!(log.is_disregarded(&StepId::from("close")));
    }

    #[test]
    fn test_equal_priorities_keep_registration_order() {
        let log = StepRegistry::new()
            .init("a", Some(1))
            .init("b", Some(1))
            .init("c", Some(0))
            .build();
        assert_eq!(log.init_order(), vec![StepId::from("c"), StepId::from("a"), StepId::from("b")]);
    }

    #[test]
    fn test_introspect_skips_disregarded() {
        let def = WorkflowDefinition::new("wf")
            .step_fn("setup", noop)
            .step_fn("a", noop)
            .step_fn("skip", noop)
            .step_fn("b", noop)
            .step_fn("teardown", noop);
        let log = StepRegistry::new()
            .init("setup", None)
            .finalize("teardown", None)
            .disregard("skip")
            .build();

        let found = log.introspect(&def);
        assert_eq!(found.steps, vec![StepId::from("a"), StepId::from("b")]);
        assert!(found.by_id.contains_key(&StepId::from("a")));
        assert!(!found.by_id.contains_key(&StepId::from("setup")));
    }

    #[test]
    fn test_lint_message_serializes() {
        let lint = LintMessage::invalid_dependency(&StepId::from("b"), &StepId::from("zz"));
        let value = serde_json::to_value(&lint).unwrap();
        assert_eq!(
            value,
            json!({"kind": "InvalidDependency", "step": "b", "message": "invalid dependency: zz in b"})
        );
    }
}
