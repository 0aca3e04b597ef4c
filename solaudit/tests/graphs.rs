//! Topology validation through the public builder API.

use std::sync::Arc;

use solaudit::capabilities::{HeuristicAnalyzer, ScriptedReasoner};
use solaudit::graph::{AuditGraph, AuditGraphBuilder, GraphError, StageKind, Target};
use solaudit::schema::OutputValidator;

#[test]
fn standard_topology_exposes_all_three_stages() {
    let graph = AuditGraph::standard(
        Arc::new(ScriptedReasoner::new()),
        Arc::new(HeuristicAnalyzer::new()),
        OutputValidator::default(),
    );
    for kind in StageKind::ALL {
        assert!(graph.stage(kind).is_some(), "missing stage {kind}");
        assert!(
            graph.transitions_for(kind).is_some(),
            "missing transitions for {kind}"
        );
    }
    assert_eq!(AuditGraph::ENTRY, StageKind::Summarize);
}

#[test]
fn empty_builder_is_rejected() {
    let err = AuditGraphBuilder::new().compile().unwrap_err();
    assert!(matches!(
        err,
        GraphError::UnreachableStage {
            stage: StageKind::Summarize
        }
    ));
}

#[test]
fn graph_without_termination_is_rejected() {
    // Summarize loops into Detect and back: cyclic and non-terminating.
    let reasoner: Arc<dyn solaudit::capabilities::ReasoningCapability> =
        Arc::new(ScriptedReasoner::new());
    let summarize = Arc::new(solaudit::stages::SummarizeStage::new(Arc::clone(&reasoner)));
    let err = AuditGraphBuilder::new()
        .add_stage(StageKind::Summarize, summarize)
        .add_transition(StageKind::Summarize, Target::Stage(StageKind::Summarize))
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphError::BackEdgeToEntry { .. }));
}
