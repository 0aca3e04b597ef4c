//! Detection stage: run static analysis, then the structured audit prompt.

use async_trait::async_trait;
use std::sync::Arc;

use crate::capabilities::ReasoningCapability;
use crate::capabilities::static_analysis::{NO_WARNINGS, StaticAnalyzer};
use crate::prompts;
use crate::schema::OutputValidator;
use crate::stage::{Stage, StageContext, StageError};
use crate::state::{AuditState, AuditStateUpdate};

/// Second stage. Writes `vulnerability_findings` and `needs_recheck`.
///
/// Requires `initial_analysis` from the summarization stage; its absence is
/// an executor-ordering bug and fails the run. The static-analysis signal is
/// strictly auxiliary: every analyzer failure, timeout included, degrades to
/// the [`NO_WARNINGS`] sentinel and the audit proceeds on reasoning alone.
pub struct DetectStage {
    reasoner: Arc<dyn ReasoningCapability>,
    analyzer: Arc<dyn StaticAnalyzer>,
    validator: OutputValidator,
}

impl DetectStage {
    #[must_use]
    pub fn new(
        reasoner: Arc<dyn ReasoningCapability>,
        analyzer: Arc<dyn StaticAnalyzer>,
        validator: OutputValidator,
    ) -> Self {
        Self {
            reasoner,
            analyzer,
            validator,
        }
    }

    async fn static_warnings(&self, ctx: &StageContext, source: &str) -> String {
        let scan = tokio::time::timeout(ctx.capability_timeout(), self.analyzer.scan(source));
        match scan.await {
            Ok(Ok(warnings)) if !warnings.trim().is_empty() => warnings,
            Ok(Ok(_)) => NO_WARNINGS.to_string(),
            Ok(Err(error)) => {
                tracing::warn!(
                    stage = %ctx.stage,
                    %error,
                    "static analyzer failed; continuing without its signal"
                );
                NO_WARNINGS.to_string()
            }
            Err(_) => {
                tracing::warn!(
                    stage = %ctx.stage,
                    "static analyzer timed out; continuing without its signal"
                );
                NO_WARNINGS.to_string()
            }
        }
    }
}

#[async_trait]
impl Stage for DetectStage {
    async fn run(
        &self,
        snapshot: AuditState,
        ctx: StageContext,
    ) -> Result<AuditStateUpdate, StageError> {
        let summary = snapshot
            .initial_analysis
            .as_deref()
            .ok_or(StageError::MissingInput {
                what: "initial_analysis",
            })?;

        let warnings = self.static_warnings(&ctx, &snapshot.contract_code).await;
        let messages = prompts::detect_messages(summary, &warnings, &snapshot.contract_code);
        let analysis = self
            .validator
            .request_analysis(self.reasoner.as_ref(), &ctx, messages)
            .await?;

        tracing::debug!(
            stage = %ctx.stage,
            findings = analysis.findings.len(),
            recheck_needed = analysis.recheck_needed,
            "detection complete"
        );
        Ok(AuditStateUpdate::new()
            .with_findings(analysis.findings)
            .with_needs_recheck(analysis.recheck_needed))
    }
}
