//! DAG assembly from a workflow definition and its registrations.
//!
//! Assembly runs once per kernel construction:
//! 1. One node per participating step, in declaration order
//! 2. One edge `depends_on -> step` per valid dependency
//! 3. A fallback chain linking steps that have no outgoing edge yet
//! 4. Cycle detection and a cached topological order
//!
//! Every structural problem found along the way becomes a lint message; none
//! of them stop assembly.

use crate::workflow::registry::{LintMessage, RegistrationLog, WorkflowDefinition};
use cellkit_core::graph::diagram;
use cellkit_core::{Cycle, Graph, PlanEntry, StepId};

/// Result of DAG assembly.
#[derive(Clone, Debug)]
pub struct AssembledDag {
    /// Step graph, edges pointing from prerequisite to dependent
    pub graph: Graph<StepId>,
    /// Cached execution order; only meaningful when acyclic
    pub topological_order: Vec<StepId>,
    /// Cycles found in the graph
    pub cycles: Vec<Cycle<StepId>>,
    /// Registration lint followed by assembly lint
    pub lint: Vec<LintMessage>,
    /// Valid initializers in execution order
    pub init_steps: Vec<StepId>,
    /// Valid finalizers in execution order
    pub finalize_steps: Vec<StepId>,
}

impl AssembledDag {
    /// Assembles the DAG for `definition` under `log`.
    pub fn assemble<W>(definition: &WorkflowDefinition<W>, log: &RegistrationLog) -> Self
    where
        W: Send + Sync + 'static,
    {
        let mut lint: Vec<LintMessage> = log.lint_results().to_vec();

        for dup in definition.duplicates() {
            lint.push(LintMessage::duplicate_step(dup));
        }

        let steps = log.introspect(definition).steps;
        let mut graph: Graph<StepId> = Graph::new();
        for step in &steps {
            graph.add_node(step.clone());
        }

        for dep in log.dependencies() {
            if graph.contains(&dep.step) && graph.contains(&dep.depends_on) {
                graph.add_edge(dep.depends_on.clone(), dep.step.clone());
            } else {
                lint.push(LintMessage::invalid_dependency(&dep.step, &dep.depends_on));
            }
        }

        chain_unlinked_steps(&mut graph, &steps);

        let cycles = graph.find_cycles();
        if graph.is_cyclic() {
            lint.push(LintMessage::cycles_detected());
        }
        let topological_order = graph.topological_sort();

        let init_steps = lifecycle_steps(definition, log.init_order(), "init", &mut lint);
        let finalize_steps = lifecycle_steps(definition, log.finalize_order(), "finalize", &mut lint);

        tracing::debug!(
            workflow = definition.name(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            cyclic = !cycles.is_empty(),
            lint = lint.len(),
            "Assembled workflow DAG"
        );
        for message in &lint {
            tracing::warn!(workflow = definition.name(), kind = ?message.kind, "{}", message.message);
        }

        Self {
            graph,
            topological_order,
            cycles,
            lint,
            init_steps,
            finalize_steps,
        }
    }

    /// Returns true if the step graph contains a cycle.
    pub fn is_cyclic(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Checks if a step is part of the DAG.
    pub fn contains(&self, step: &StepId) -> bool {
        self.graph.contains(step)
    }

    /// Execution plan over the cached topological order.
    pub fn execution_plan(&self) -> Vec<PlanEntry<StepId>> {
        self.graph.execution_plan(&self.topological_order)
    }

    /// PlantUML rendering of the execution plan next to the raw graph.
    pub fn diagram(&self) -> String {
        diagram::execution_plan_puml(&self.graph)
    }
}

/// Links every step that is not yet the source of an edge to the next such
/// step in declaration order.
///
/// "Source" is re-checked as edges are added, so a synthetic edge counts for
/// later steps.
fn chain_unlinked_steps(graph: &mut Graph<StepId>, steps: &[StepId]) {
    for (i, step) in steps.iter().enumerate() {
        if graph.has_outgoing(step) {
            continue;
        }
        if let Some(next) = steps[i + 1..].iter().find(|n| !graph.has_outgoing(n)) {
            graph.add_edge(step.clone(), next.clone());
        }
    }
}

fn lifecycle_steps<W>(
    definition: &WorkflowDefinition<W>,
    ordered: Vec<StepId>,
    role: &str,
    lint: &mut Vec<LintMessage>,
) -> Vec<StepId>
where
    W: Send + Sync + 'static,
{
    ordered
        .into_iter()
        .filter(|step| {
            let known = definition.contains(step);
            if !known {
                lint.push(LintMessage::invalid_lifecycle_step(step, role));
            }
            known
        })
        .collect()
}
