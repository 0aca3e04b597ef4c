//! Stage execution contract for the audit pipeline.
//!
//! A stage is one unit of pipeline work: it reads part of the shared
//! [`AuditState`](crate::state::AuditState), performs external capability
//! calls, and returns a state delta. Stages are stateless between runs and
//! never call each other; all data flows through the shared state.

use async_trait::async_trait;
use miette::Diagnostic;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::capabilities::CapabilityError;
use crate::graph::StageKind;
use crate::schema::SchemaValidationError;
use crate::state::{AuditState, AuditStateUpdate};

/// Core trait for executable pipeline stages.
///
/// Stages receive an owned snapshot of the current state and must only
/// populate the update fields they are the contractual writer for. Fatal
/// conditions are returned as [`StageError`]; there is no partial-success
/// channel, because an audit that silently skipped a stage would be
/// misleading about contract safety.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Execute this stage against a snapshot of the run state.
    async fn run(
        &self,
        snapshot: AuditState,
        ctx: StageContext,
    ) -> Result<AuditStateUpdate, StageError>;
}

/// Execution context handed to a stage by the runner.
///
/// Bundles the stage's identity for tracing with the run-wide cancellation
/// token and the per-invocation capability deadline.
#[derive(Clone, Debug)]
pub struct StageContext {
    /// Which stage is executing.
    pub stage: StageKind,
    /// Zero-based position of this stage in the run.
    pub step: u64,
    /// Identifier of the enclosing audit run.
    pub run_id: String,
    cancellation: CancellationToken,
    capability_timeout: Duration,
}

impl StageContext {
    /// Normally constructed by the runner; public so embedders and tests can
    /// drive a stage directly.
    #[must_use]
    pub fn new(
        stage: StageKind,
        step: u64,
        run_id: String,
        cancellation: CancellationToken,
        capability_timeout: Duration,
    ) -> Self {
        Self {
            stage,
            step,
            run_id,
            cancellation,
            capability_timeout,
        }
    }

    /// Deadline applied to each capability invocation.
    #[must_use]
    pub fn capability_timeout(&self) -> Duration {
        self.capability_timeout
    }

    /// True once the run has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Drive a capability invocation under this context's policy.
    ///
    /// Races the call against the run's cancellation token and the
    /// configured deadline. Cancellation drops the in-flight future and
    /// surfaces [`StageError::Cancelled`]; a deadline miss is reported as a
    /// capability failure, identical in consequence to a transport error.
    pub async fn capability_call<T, F>(
        &self,
        capability: &'static str,
        call: F,
    ) -> Result<T, StageError>
    where
        F: Future<Output = Result<T, CapabilityError>> + Send,
    {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {
                tracing::warn!(stage = %self.stage, capability, "capability call cancelled");
                Err(StageError::Cancelled)
            }
            outcome = tokio::time::timeout(self.capability_timeout, call) => match outcome {
                Err(_) => Err(StageError::Capability {
                    capability,
                    source: CapabilityError::Timeout {
                        seconds: self.capability_timeout.as_secs(),
                    },
                }),
                Ok(result) => result.map_err(|source| StageError::Capability { capability, source }),
            },
        }
    }
}

/// Fatal errors surfaced by stage execution.
#[derive(Debug, Error, Diagnostic)]
pub enum StageError {
    /// A predecessor stage's output is missing from the snapshot.
    ///
    /// Indicates an executor-ordering bug, not bad input: the fixed
    /// topology guarantees each stage runs after its writers.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(solaudit::stage::missing_input),
        help("Check that the pipeline ran the stage responsible for writing this field.")
    )]
    MissingInput { what: &'static str },

    /// A required capability invocation failed or timed out.
    #[error("capability '{capability}' unavailable")]
    #[diagnostic(code(solaudit::stage::capability_unavailable))]
    Capability {
        capability: &'static str,
        #[source]
        source: CapabilityError,
    },

    /// The reasoning output never conformed to the analysis schema.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaValidationError),

    /// The run was cancelled while this stage was executing.
    #[error("stage cancelled")]
    #[diagnostic(code(solaudit::stage::cancelled))]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(timeout: Duration, cancellation: CancellationToken) -> StageContext {
        StageContext::new(
            StageKind::Summarize,
            0,
            "run-test".to_string(),
            cancellation,
            timeout,
        )
    }

    #[tokio::test]
    async fn capability_call_passes_through_success() {
        let ctx = ctx(Duration::from_secs(5), CancellationToken::new());
        let result: Result<u32, _> = ctx.capability_call("reasoning", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn capability_call_maps_timeouts_to_capability_failure() {
        let ctx = ctx(Duration::from_millis(5), CancellationToken::new());
        let result: Result<u32, _> = ctx
            .capability_call("reasoning", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(1)
            })
            .await;
        assert!(matches!(
            result,
            Err(StageError::Capability {
                source: CapabilityError::Timeout { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn capability_call_honors_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = ctx(Duration::from_secs(5), token);
        let result: Result<u32, _> = ctx
            .capability_call("reasoning", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(1)
            })
            .await;
        assert!(matches!(result, Err(StageError::Cancelled)));
    }
}
