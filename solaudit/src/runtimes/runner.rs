//! The audit runner: drives one contract through the compiled pipeline.

use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::capabilities::{ReasoningCapability, StaticAnalyzer};
use crate::graph::{AuditGraph, StageKind, StageTransitions, Target};
use crate::router;
use crate::schema::OutputValidator;
use crate::stage::{StageContext, StageError};
use crate::state::AuditState;

use super::AuditConfig;

/// How a completed run ended.
#[derive(Debug)]
pub enum AuditOutcome {
    /// The run produced a report.
    Reported(AuditState),
    /// Detection found nothing worth reporting; no report was drafted.
    Clean(AuditState),
}

impl AuditOutcome {
    /// The final state regardless of outcome.
    #[must_use]
    pub fn state(&self) -> &AuditState {
        match self {
            AuditOutcome::Reported(state) | AuditOutcome::Clean(state) => state,
        }
    }

    /// The drafted report, present only for [`AuditOutcome::Reported`].
    #[must_use]
    pub fn final_report(&self) -> Option<&str> {
        self.state().final_report.as_deref()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        matches!(self, AuditOutcome::Clean(_))
    }
}

/// Fatal errors a run can end with.
#[derive(Debug, Error, Diagnostic)]
pub enum AuditError {
    /// A stage failed; the run stops at that stage.
    #[error("audit stage '{stage}' failed")]
    #[diagnostic(code(solaudit::run::stage_failed))]
    Stage {
        stage: StageKind,
        #[source]
        #[diagnostic_source]
        source: StageError,
    },

    /// The run was cancelled before completion.
    #[error("audit run cancelled")]
    #[diagnostic(code(solaudit::run::cancelled))]
    Cancelled,
}

/// Executes audit runs over a compiled [`AuditGraph`].
///
/// One runner serves many runs; each `run_*` call owns a fresh
/// [`AuditState`] and nothing is shared between runs except the graph and
/// config.
pub struct AuditRunner {
    graph: Arc<AuditGraph>,
    config: AuditConfig,
}

impl AuditRunner {
    #[must_use]
    pub fn new(graph: Arc<AuditGraph>, config: AuditConfig) -> Self {
        Self { graph, config }
    }

    /// Runner over the standard three-stage topology with the given
    /// capabilities.
    #[must_use]
    pub fn standard(
        reasoner: Arc<dyn ReasoningCapability>,
        analyzer: Arc<dyn StaticAnalyzer>,
        config: AuditConfig,
    ) -> Self {
        let validator = OutputValidator::new(config.schema_retry_budget());
        let graph = Arc::new(AuditGraph::standard(reasoner, analyzer, validator));
        Self::new(graph, config)
    }

    /// Audit a contract to completion.
    pub async fn run(&self, contract_code: impl Into<String>) -> Result<AuditOutcome, AuditError> {
        self.run_with_cancellation(contract_code, CancellationToken::new())
            .await
    }

    /// Audit a contract, stopping early if the token is cancelled.
    ///
    /// Cancellation is honored at every stage boundary and inside every
    /// capability call; a cancelled run never commits the interrupted
    /// stage's partial output.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn run_with_cancellation(
        &self,
        contract_code: impl Into<String>,
        cancellation: CancellationToken,
    ) -> Result<AuditOutcome, AuditError> {
        let run_id = self
            .config
            .run_id()
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::Span::current().record("run_id", run_id.as_str());

        let mut state = AuditState::new(contract_code);
        let mut current = AuditGraph::ENTRY;
        let mut step: u64 = 0;
        let mut reported = false;

        tracing::info!(code_len = state.contract_code.len(), "audit run started");

        loop {
            if cancellation.is_cancelled() {
                tracing::warn!(stage = %current, step, "run cancelled at stage boundary");
                return Err(AuditError::Cancelled);
            }

            // compile() guarantees both lookups succeed for every reachable stage.
            let Some(stage) = self.graph.stage(current) else {
                unreachable!("compiled graph lost stage '{current}'");
            };
            let Some(transitions) = self.graph.transitions_for(current) else {
                unreachable!("compiled graph lost transitions for '{current}'");
            };

            let ctx = StageContext::new(
                current,
                step,
                run_id.clone(),
                cancellation.clone(),
                self.config.capability_timeout(),
            );
            let update = stage
                .run(state.clone(), ctx)
                .await
                .map_err(|source| match source {
                    StageError::Cancelled => AuditError::Cancelled,
                    other => AuditError::Stage {
                        stage: current,
                        source: other,
                    },
                })?;

            let written = state.apply(update);
            tracing::debug!(stage = %current, step, fields = ?written, "stage committed");
            if current == StageKind::Report {
                reported = true;
            }

            let next = match transitions {
                StageTransitions::Unconditional(target) => target,
                StageTransitions::Routed { .. } => {
                    let verdict = router::route(&state);
                    tracing::info!(stage = %current, %verdict, "router verdict");
                    transitions.resolve(verdict)
                }
            };
            match next {
                Target::Stage(kind) => {
                    current = kind;
                    step += 1;
                }
                Target::Terminated => break,
            }
        }

        tracing::info!(
            steps = step + 1,
            findings = state.vulnerability_findings.len(),
            reported,
            "audit run finished"
        );
        if reported {
            Ok(AuditOutcome::Reported(state))
        } else {
            Ok(AuditOutcome::Clean(state))
        }
    }
}
