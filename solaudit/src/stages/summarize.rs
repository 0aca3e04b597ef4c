//! Summarization stage: turn raw contract source into a working overview.

use async_trait::async_trait;
use std::sync::Arc;

use crate::capabilities::{CompletionRequest, ReasoningCapability};
use crate::prompts;
use crate::stage::{Stage, StageContext, StageError};
use crate::state::{AuditState, AuditStateUpdate};

/// First stage of every run. Writes `initial_analysis`.
pub struct SummarizeStage {
    reasoner: Arc<dyn ReasoningCapability>,
}

impl SummarizeStage {
    #[must_use]
    pub fn new(reasoner: Arc<dyn ReasoningCapability>) -> Self {
        Self { reasoner }
    }
}

#[async_trait]
impl Stage for SummarizeStage {
    async fn run(
        &self,
        snapshot: AuditState,
        ctx: StageContext,
    ) -> Result<AuditStateUpdate, StageError> {
        let messages = prompts::summarize_messages(&snapshot.contract_code);
        let response = ctx
            .capability_call(
                "reasoning",
                self.reasoner.complete(CompletionRequest::new(messages)),
            )
            .await?;

        let summary = extract_summary(&response.content);
        tracing::debug!(
            stage = %ctx.stage,
            summary_len = summary.len(),
            "contract summarized"
        );
        Ok(AuditStateUpdate::new().with_initial_analysis(summary))
    }
}

/// Normalize the capability reply into summary text.
///
/// Some capabilities wrap the summary in a JSON object with a `summary`
/// field; unwrap that, otherwise take the reply verbatim.
fn extract_summary(content: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(content.trim()) {
        if let Some(summary) = value.get("summary").and_then(|s| s.as_str()) {
            return summary.to_string();
        }
    }
    content.trim().to_string()
}
