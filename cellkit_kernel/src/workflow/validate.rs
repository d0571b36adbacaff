//! Pre-run validation of an assembled DAG.
//!
//! Gathers everything that decides whether a kernel may run: cycles, lint
//! messages and the steps a selection override asked for.

use crate::workflow::dag::AssembledDag;
use crate::workflow::registry::{LintKind, LintMessage};
use cellkit_core::{Cycle, StepId};

/// Validation report for an assembled DAG.
#[derive(Clone, Debug)]
pub struct ValidationReport {
    /// Cycles in the step graph
    cycles: Vec<Cycle<StepId>>,
    /// All lint messages
    lint: Vec<LintMessage>,
    /// Selected steps that are not part of the DAG
    unknown_steps: Vec<StepId>,
}

impl ValidationReport {
    /// Returns whether the DAG can run. Lint alone never invalidates it.
    pub fn is_valid(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Returns the cycles detected.
    pub fn cycles(&self) -> &[Cycle<StepId>] {
        &self.cycles
    }

    /// Returns every lint message.
    pub fn lint(&self) -> &[LintMessage] {
        &self.lint
    }

    /// Returns lint messages of one kind.
    pub fn lint_of(&self, kind: LintKind) -> Vec<&LintMessage> {
        self.lint.iter().filter(|l| l.kind == kind).collect()
    }

    /// Returns the selected steps missing from the DAG.
    pub fn unknown_steps(&self) -> &[StepId] {
        &self.unknown_steps
    }

    /// Renders the cycles as `a -> b -> a; c -> c`.
    pub fn cycle_paths(&self) -> String {
        self.cycles
            .iter()
            .map(|c| c.path())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validator for assembled DAGs.
pub struct DagValidator;

impl DagValidator {
    /// Validates the DAG alone.
    pub fn validate(dag: &AssembledDag) -> ValidationReport {
        ValidationReport {
            cycles: dag.cycles.clone(),
            lint: dag.lint.clone(),
            unknown_steps: Vec::new(),
        }
    }

    /// Validates the DAG together with an explicit step selection.
    pub fn validate_selection(dag: &AssembledDag, selection: &[StepId]) -> ValidationReport {
        let mut report = Self::validate(dag);
        report.unknown_steps = selection
            .iter()
            .filter(|s| !dag.contains(s))
            .cloned()
            .collect();
        report
    }
}
