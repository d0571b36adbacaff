//! Sequential execution kernel.
//!
//! Runs the steps of an assembled DAG one at a time, piping each step's
//! result (or error) into the next and consulting the hooks at every
//! boundary.
//!
//! # Run model
//!
//! 1. Refuse to start on a cyclic graph, a foreign instance, strict lint or an
//!    unknown selected step
//! 2. `init_workflow`, then initializers in priority order; either may abort
//! 3. Steps in topological order (or the selection override):
//!    cancellation and `before_step` may interrupt, `after_error` decides
//!    between abort and continue
//! 4. Finalizers in priority order, always
//! 5. `finalize_workflow`, then the [`RunState`] goes back to the caller
//!
//! The kernel itself never logs. Wrap the hooks in
//! [`TracingHooks`](crate::observe::TracingHooks) for structured events.

use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::workflow::cancellation::CancellationToken;
use crate::workflow::context::{Extensions, RunContext, StepContext, StepPhase};
use crate::workflow::dag::AssembledDag;
use crate::workflow::hooks::{ErrorDirective, InitDirective, KernelHooks, NoopHooks, StepDirective};
use crate::workflow::registry::{LintMessage, RegistrationLog, WorkflowDefinition, WorkflowInstance};
use crate::workflow::state::{LifecycleFailure, RunState, RunStatus, StepExecutionState, StepRecord};
use crate::workflow::step::{StepError, StepResult};
use crate::workflow::validate::{DagValidator, ValidationReport};
use cellkit_core::StepId;
use std::sync::Arc;

type RunContextFn = Box<dyn Fn(&RunContext) -> Extensions + Send + Sync>;
type StepContextFn = Box<dyn Fn(&StepContext) -> Extensions + Send + Sync>;
type StepSelectionFn = Box<dyn Fn(&AssembledDag) -> Vec<StepId> + Send + Sync>;

/// Execution kernel for one workflow definition.
///
/// # Example
///
/// ```ignore
/// let definition = WorkflowDefinition::new("report")
///     .step_fn("load", load)
///     .step_fn("render", render);
/// let mut instance = definition.instantiate(Report::default());
///
/// let kernel = Kernel::new(definition, StepRegistry::new().build());
/// let state = kernel.run(&mut instance).await?;
/// assert!(state.is_completed());
/// ```
pub struct Kernel<W>
where
    W: Send + Sync + 'static,
{
    definition: WorkflowDefinition<W>,
    dag: AssembledDag,
    hooks: Arc<dyn KernelHooks<W>>,
    config: KernelConfig,
    cancellation: Option<CancellationToken>,
    run_context_fn: Option<RunContextFn>,
    step_context_fn: Option<StepContextFn>,
    step_selection_fn: Option<StepSelectionFn>,
}

impl<W> Kernel<W>
where
    W: Send + Sync + 'static,
{
    /// Creates a kernel, assembling the DAG once.
    pub fn new(definition: WorkflowDefinition<W>, log: RegistrationLog) -> Self {
        let dag = AssembledDag::assemble(&definition, &log);
        Self {
            definition,
            dag,
            hooks: Arc::new(NoopHooks),
            config: KernelConfig::default(),
            cancellation: None,
            run_context_fn: None,
            step_context_fn: None,
            step_selection_fn: None,
        }
    }

    /// Sets the hook set.
    pub fn with_hooks(mut self, hooks: impl KernelHooks<W> + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Sets a shared hook set.
    pub fn with_shared_hooks(mut self, hooks: Arc<dyn KernelHooks<W>>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the token polled between steps.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Supplies run-level extensions, computed once per run.
    pub fn with_run_context<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunContext) -> Extensions + Send + Sync + 'static,
    {
        self.run_context_fn = Some(Box::new(f));
        self
    }

    /// Supplies step-level extensions, computed for every step.
    pub fn with_step_context<F>(mut self, f: F) -> Self
    where
        F: Fn(&StepContext) -> Extensions + Send + Sync + 'static,
    {
        self.step_context_fn = Some(Box::new(f));
        self
    }

    /// Replaces the topological order with a caller-chosen list of steps.
    ///
    /// Evaluated once per run, before the first step. Every selected id must
    /// be part of the DAG.
    pub fn with_step_selection<F>(mut self, f: F) -> Self
    where
        F: Fn(&AssembledDag) -> Vec<StepId> + Send + Sync + 'static,
    {
        self.step_selection_fn = Some(Box::new(f));
        self
    }

    /// Returns the workflow definition.
    pub fn definition(&self) -> &WorkflowDefinition<W> {
        &self.definition
    }

    /// Returns the assembled DAG.
    pub fn dag(&self) -> &AssembledDag {
        &self.dag
    }

    /// Returns the configuration.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Returns false iff the step graph is cyclic.
    pub fn is_valid(&self) -> bool {
        !self.dag.is_cyclic()
    }

    /// Lint messages from registration and assembly.
    pub fn lint(&self) -> &[LintMessage] {
        &self.dag.lint
    }

    /// Validation report for the assembled DAG.
    pub fn validate(&self) -> ValidationReport {
        DagValidator::validate(&self.dag)
    }

    /// PlantUML diagram of the execution plan, for diagnostics.
    pub fn diagram(&self) -> String {
        self.dag.diagram()
    }

    /// Name reported in run state.
    pub fn workflow_name(&self) -> &str {
        self.config
            .workflow_name
            .as_deref()
            .unwrap_or_else(|| self.definition.name())
    }

    /// Runs the workflow against `instance`.
    ///
    /// # Returns
    ///
    /// - `Ok(RunState)` once the run ended, whatever the outcome of its steps
    /// - `Err(KernelError)` if the run was refused; no step ran
    pub async fn run(&self, instance: &mut WorkflowInstance<W>) -> Result<RunState> {
        let order = self.preflight(instance)?;

        let mut run = RunContext::new(self.workflow_name(), order);
        if let Some(f) = &self.run_context_fn {
            let extensions = f(&run);
            run = run.with_extensions(extensions);
        }
        let run = Arc::new(run);

        let mut state = RunState::new(run.run_id, run.workflow_name.clone());
        state.status = RunStatus::Running;
        let workflow: &mut W = instance;

        if self.hooks.init_workflow(workflow, &run).await == InitDirective::Abort {
            state.init_aborted = true;
            state.finish(RunStatus::Aborted);
            return Ok(state);
        }

        if let Some(failure) = self.run_initializers(workflow, &run, &state).await {
            state.init_aborted = true;
            state.init_failure = Some(failure);
            state.finish(RunStatus::Aborted);
            return Ok(state);
        }

        let status = self.run_steps(workflow, &run, &mut state).await;

        let finalize_errors = self.run_finalizers(workflow, &run, &state).await;
        state.finalize_errors = finalize_errors;
        state.finish(status);

        self.hooks.finalize_workflow(workflow, &run, &state).await;
        Ok(state)
    }

    /// Checks everything that refuses a run and returns the step order.
    fn preflight(&self, instance: &WorkflowInstance<W>) -> Result<Vec<StepId>> {
        let report = self.validate();
        if !report.is_valid() {
            return Err(KernelError::InvalidGraph {
                cycles: report.cycle_paths(),
            });
        }

        if instance.tag() != self.definition.tag() {
            return Err(KernelError::InstanceMismatch {
                expected: self.definition.tag(),
                found: instance.tag(),
            });
        }

        if self.config.strict_lint && !report.lint().is_empty() {
            return Err(KernelError::LintRejected(
                report.lint().iter().map(|l| l.message.clone()).collect(),
            ));
        }

        match &self.step_selection_fn {
            Some(select) => {
                let selection = select(&self.dag);
                let report = DagValidator::validate_selection(&self.dag, &selection);
                if let Some(unknown) = report.unknown_steps().first() {
                    return Err(KernelError::UnknownStep(unknown.clone()));
                }
                Ok(selection)
            }
            None => Ok(self.dag.topological_order.clone()),
        }
    }

    fn step_context(&self, run: &Arc<RunContext>, steps: &[StepId], index: usize, phase: StepPhase) -> StepContext {
        let ctx = StepContext::new(run.clone(), steps, index, steps[index].clone(), phase);
        match &self.step_context_fn {
            Some(f) => {
                let extensions = f(&ctx);
                ctx.with_extensions(extensions)
            }
            None => ctx,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.config.honor_cancellation
            && self.cancellation.as_ref().is_some_and(|t| t.is_cancelled())
    }

    async fn execute(
        &self,
        workflow: &mut W,
        ctx: &StepContext,
        state: &RunState,
        previous: Option<StepResult>,
    ) -> StepResult {
        match self.definition.operation(&ctx.current) {
            Some(op) => op.execute(workflow, ctx, state, previous).await,
            None => Err(StepError::failed(format!("no operation registered for {}", ctx.current))),
        }
    }

    /// Runs initializers; the first error stops them.
    async fn run_initializers(
        &self,
        workflow: &mut W,
        run: &Arc<RunContext>,
        state: &RunState,
    ) -> Option<LifecycleFailure> {
        let steps = &self.dag.init_steps;
        for index in 0..steps.len() {
            let ctx = self.step_context(run, steps, index, StepPhase::Init);
            if let Err(error) = self.execute(workflow, &ctx, state, None).await {
                return Some(LifecycleFailure {
                    step: ctx.current,
                    error,
                });
            }
        }
        None
    }

    /// Runs the DAG steps and returns the terminal run status.
    async fn run_steps(&self, workflow: &mut W, run: &Arc<RunContext>, state: &mut RunState) -> RunStatus {
        let steps = &run.ordered_steps;

        for index in 0..steps.len() {
            let ctx = self.step_context(run, steps, index, StepPhase::Main);
            let previous = state.executed.last().and_then(|r| r.state.as_result());
            state.executed.push(StepRecord::new(index, ctx.current.clone()));

            let interrupted = self.is_cancelled()
                || self.hooks.before_step(&ctx, state).await == StepDirective::Interrupt;
            if interrupted {
                if let Some(record) = state.current_mut() {
                    record.finish(StepExecutionState::Interrupted);
                }
                state.interrupted_at = Some(ctx.current.clone());
                self.hooks.after_interrupt(&ctx, state).await;
                return RunStatus::Interrupted;
            }

            let outcome = match self.execute(workflow, &ctx, state, previous).await {
                Ok(value) => StepExecutionState::Successful(value),
                Err(error) => {
                    let directive = self.hooks.after_error(&error, &ctx, state).await;
                    if directive == ErrorDirective::Abort {
                        if let Some(record) = state.current_mut() {
                            record.finish(StepExecutionState::Aborted(error));
                        }
                        state.errored_out_at = Some(ctx.current.clone());
                        return RunStatus::Aborted;
                    }
                    StepExecutionState::Indeterminate(error)
                }
            };

            if let Some(record) = state.current_mut() {
                record.finish(outcome.clone());
            }
            self.hooks.after_step(&outcome, &ctx, state).await;
        }

        RunStatus::Completed
    }

    /// Runs every finalizer once, collecting errors.
    async fn run_finalizers(
        &self,
        workflow: &mut W,
        run: &Arc<RunContext>,
        state: &RunState,
    ) -> Vec<LifecycleFailure> {
        let steps = &self.dag.finalize_steps;
        let mut failures = Vec::new();
        for index in 0..steps.len() {
            let ctx = self.step_context(run, steps, index, StepPhase::Finalize);
            if let Err(error) = self.execute(workflow, &ctx, state, None).await {
                failures.push(LifecycleFailure {
                    step: ctx.current,
                    error,
                });
            }
        }
        failures
    }
}
