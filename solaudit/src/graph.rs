//! Pipeline topology: stage registry, transition table, and validation.
//!
//! The audit pipeline is a small directed acyclic graph. [`AuditGraphBuilder`]
//! collects stage implementations and transitions, and [`AuditGraphBuilder::compile`]
//! validates the whole topology up front so that a run can never reach a
//! stage with no registered implementation or no outgoing transition.
//! Validation failures are construction-time errors; the runner only ever
//! sees a well-formed [`AuditGraph`].

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::capabilities::ReasoningCapability;
use crate::capabilities::static_analysis::StaticAnalyzer;
use crate::router::RouterVerdict;
use crate::schema::OutputValidator;
use crate::stage::Stage;
use crate::stages::{DetectStage, ReportStage, SummarizeStage};

/// Identity of a pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    Summarize,
    Detect,
    Report,
}

impl StageKind {
    /// All stage kinds, in pipeline order.
    pub const ALL: [StageKind; 3] = [StageKind::Summarize, StageKind::Detect, StageKind::Report];
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Summarize => write!(f, "summarize"),
            StageKind::Detect => write!(f, "detect"),
            StageKind::Report => write!(f, "report"),
        }
    }
}

/// Where a transition leads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Continue to another stage.
    Stage(StageKind),
    /// End the run.
    Terminated,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Stage(stage) => write!(f, "{stage}"),
            Target::Terminated => write!(f, "terminated"),
        }
    }
}

/// Outgoing transitions of one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageTransitions {
    /// The stage always hands off to the same target.
    Unconditional(Target),
    /// The router picks the target after the stage completes.
    Routed {
        continue_to_report: Target,
        terminate: Target,
    },
}

impl StageTransitions {
    /// Resolve this transition for a router verdict.
    ///
    /// Unconditional transitions ignore the verdict.
    #[must_use]
    pub fn resolve(&self, verdict: RouterVerdict) -> Target {
        match self {
            StageTransitions::Unconditional(target) => *target,
            StageTransitions::Routed {
                continue_to_report,
                terminate,
            } => match verdict {
                RouterVerdict::ContinueToReport => *continue_to_report,
                RouterVerdict::Terminate => *terminate,
            },
        }
    }

    fn targets(&self) -> Vec<Target> {
        match self {
            StageTransitions::Unconditional(target) => vec![*target],
            StageTransitions::Routed {
                continue_to_report,
                terminate,
            } => vec![*continue_to_report, *terminate],
        }
    }
}

/// Topology defects detected at compile time.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("stage '{stage}' has transitions but no registered implementation")]
    #[diagnostic(code(solaudit::graph::missing_stage))]
    MissingStage { stage: StageKind },

    #[error("stage '{stage}' has no outgoing transition")]
    #[diagnostic(
        code(solaudit::graph::missing_transition),
        help("Every registered stage needs an unconditional or routed transition.")
    )]
    MissingTransition { stage: StageKind },

    #[error("transition from '{from}' targets unregistered stage '{to}'")]
    #[diagnostic(code(solaudit::graph::unregistered_target))]
    UnregisteredTarget { from: StageKind, to: StageKind },

    #[error("transition from '{from}' re-enters the entry stage")]
    #[diagnostic(
        code(solaudit::graph::back_edge_to_entry),
        help("The pipeline is forward-only; the entry stage runs exactly once.")
    )]
    BackEdgeToEntry { from: StageKind },

    #[error("transition graph contains a cycle through '{stage}'")]
    #[diagnostic(code(solaudit::graph::cycle))]
    CycleDetected { stage: StageKind },

    #[error("stage '{stage}' is unreachable from the entry stage")]
    #[diagnostic(code(solaudit::graph::unreachable_stage))]
    UnreachableStage { stage: StageKind },

    #[error("no path from the entry stage reaches termination")]
    #[diagnostic(code(solaudit::graph::no_terminal))]
    NoTerminal,
}

/// Builder for [`AuditGraph`].
///
/// Collects stages and transitions in any order; all structural checks run
/// in [`compile`](Self::compile).
#[derive(Default)]
pub struct AuditGraphBuilder {
    stages: FxHashMap<StageKind, Arc<dyn Stage>>,
    transitions: FxHashMap<StageKind, StageTransitions>,
}

impl AuditGraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the implementation for a stage. Last registration wins.
    #[must_use]
    pub fn add_stage(mut self, kind: StageKind, stage: Arc<dyn Stage>) -> Self {
        self.stages.insert(kind, stage);
        self
    }

    /// Register an unconditional transition out of `from`.
    #[must_use]
    pub fn add_transition(mut self, from: StageKind, to: Target) -> Self {
        self.transitions
            .insert(from, StageTransitions::Unconditional(to));
        self
    }

    /// Register a routed transition out of `from`, with one target per
    /// router verdict.
    #[must_use]
    pub fn add_routed_transition(
        mut self,
        from: StageKind,
        continue_to_report: Target,
        terminate: Target,
    ) -> Self {
        self.transitions.insert(
            from,
            StageTransitions::Routed {
                continue_to_report,
                terminate,
            },
        );
        self
    }

    /// Validate the topology and produce an executable graph.
    ///
    /// Checks, in order: every stage with transitions has an implementation,
    /// every registered stage has an outgoing transition, all targets are
    /// registered, nothing re-enters the entry stage, the graph is acyclic,
    /// every stage is reachable from the entry, and at least one path
    /// terminates.
    pub fn compile(self) -> Result<AuditGraph, GraphError> {
        let entry = AuditGraph::ENTRY;

        for stage in self.transitions.keys() {
            if !self.stages.contains_key(stage) {
                return Err(GraphError::MissingStage { stage: *stage });
            }
        }
        for stage in self.stages.keys() {
            if !self.transitions.contains_key(stage) {
                return Err(GraphError::MissingTransition { stage: *stage });
            }
        }
        if !self.stages.contains_key(&entry) {
            return Err(GraphError::UnreachableStage { stage: entry });
        }

        for (from, transitions) in &self.transitions {
            for target in transitions.targets() {
                if let Target::Stage(to) = target {
                    if !self.stages.contains_key(&to) {
                        return Err(GraphError::UnregisteredTarget { from: *from, to });
                    }
                    if to == entry {
                        return Err(GraphError::BackEdgeToEntry { from: *from });
                    }
                }
            }
        }

        self.check_acyclic(entry)?;
        self.check_reachability(entry)?;
        Ok(AuditGraph {
            stages: self.stages,
            transitions: self.transitions,
        })
    }

    fn successors(&self, stage: StageKind) -> Vec<StageKind> {
        self.transitions
            .get(&stage)
            .map(|transitions| {
                transitions
                    .targets()
                    .into_iter()
                    .filter_map(|target| match target {
                        Target::Stage(next) => Some(next),
                        Target::Terminated => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check_acyclic(&self, entry: StageKind) -> Result<(), GraphError> {
        // Iterative DFS with an explicit on-path set.
        let mut visited = FxHashSet::default();
        let mut on_path = FxHashSet::default();
        let mut stack = vec![(entry, false)];
        while let Some((stage, children_done)) = stack.pop() {
            if children_done {
                on_path.remove(&stage);
                continue;
            }
            if on_path.contains(&stage) {
                return Err(GraphError::CycleDetected { stage });
            }
            if !visited.insert(stage) {
                continue;
            }
            on_path.insert(stage);
            stack.push((stage, true));
            for next in self.successors(stage) {
                if on_path.contains(&next) {
                    return Err(GraphError::CycleDetected { stage: next });
                }
                stack.push((next, false));
            }
        }
        Ok(())
    }

    fn check_reachability(&self, entry: StageKind) -> Result<(), GraphError> {
        let mut reachable = FxHashSet::default();
        let mut can_terminate = false;
        let mut frontier = vec![entry];
        while let Some(stage) = frontier.pop() {
            if !reachable.insert(stage) {
                continue;
            }
            if let Some(transitions) = self.transitions.get(&stage) {
                for target in transitions.targets() {
                    match target {
                        Target::Stage(next) => frontier.push(next),
                        Target::Terminated => can_terminate = true,
                    }
                }
            }
        }
        for stage in self.stages.keys() {
            if !reachable.contains(stage) {
                return Err(GraphError::UnreachableStage { stage: *stage });
            }
        }
        if !can_terminate {
            return Err(GraphError::NoTerminal);
        }
        Ok(())
    }
}

/// Compiled, validated pipeline topology.
///
/// Immutable after compilation; the runner holds it for the lifetime of the
/// engine and shares it across runs.
pub struct AuditGraph {
    stages: FxHashMap<StageKind, Arc<dyn Stage>>,
    transitions: FxHashMap<StageKind, StageTransitions>,
}

impl AuditGraph {
    /// The fixed entry stage of every run.
    pub const ENTRY: StageKind = StageKind::Summarize;

    /// The implementation registered for a stage, if any.
    #[must_use]
    pub fn stage(&self, kind: StageKind) -> Option<&Arc<dyn Stage>> {
        self.stages.get(&kind)
    }

    /// The outgoing transitions of a stage, if any.
    #[must_use]
    pub fn transitions_for(&self, kind: StageKind) -> Option<StageTransitions> {
        self.transitions.get(&kind).copied()
    }

    /// The standard three-stage audit topology.
    ///
    /// Summarize always hands off to Detect; Detect is routed (report when
    /// there is material worth reporting, terminate otherwise); Report ends
    /// the run. The topology is fixed, so this cannot fail validation.
    #[must_use]
    pub fn standard(
        reasoner: Arc<dyn ReasoningCapability>,
        analyzer: Arc<dyn StaticAnalyzer>,
        validator: OutputValidator,
    ) -> Self {
        let built = AuditGraphBuilder::new()
            .add_stage(
                StageKind::Summarize,
                Arc::new(SummarizeStage::new(Arc::clone(&reasoner))),
            )
            .add_stage(
                StageKind::Detect,
                Arc::new(DetectStage::new(Arc::clone(&reasoner), analyzer, validator)),
            )
            .add_stage(StageKind::Report, Arc::new(ReportStage::new(reasoner)))
            .add_transition(StageKind::Summarize, Target::Stage(StageKind::Detect))
            .add_routed_transition(
                StageKind::Detect,
                Target::Stage(StageKind::Report),
                Target::Terminated,
            )
            .add_transition(StageKind::Report, Target::Terminated)
            .compile();
        match built {
            Ok(graph) => graph,
            // Unreachable: the standard topology is statically well-formed.
            Err(error) => unreachable!("standard topology failed validation: {error}"),
        }
    }
}

impl fmt::Debug for AuditGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditGraph")
            .field("stages", &self.stages.keys().collect::<Vec<_>>())
            .field("transitions", &self.transitions)
            .finish()
    }
}
