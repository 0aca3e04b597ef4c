//! Report stage: draft the final audit document.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::capabilities::{CompletionRequest, ReasoningCapability};
use crate::findings::Finding;
use crate::prompts;
use crate::stage::{Stage, StageContext, StageError};
use crate::state::{AuditState, AuditStateUpdate};

/// Findings text handed to the report writer when detection found nothing
/// concrete but flagged residual uncertainty.
pub const NO_FINDINGS_SENTINEL: &str =
    "No high-risk findings were identified during this audit.";

/// Final stage. Writes `final_report` and clears `needs_recheck`.
///
/// Clearing the recheck flag marks the residual uncertainty as addressed:
/// the report exists precisely because the flag (or the findings) asked for
/// it, and a finished run must not look like it still owes work.
pub struct ReportStage {
    reasoner: Arc<dyn ReasoningCapability>,
}

impl ReportStage {
    #[must_use]
    pub fn new(reasoner: Arc<dyn ReasoningCapability>) -> Self {
        Self { reasoner }
    }
}

#[async_trait]
impl Stage for ReportStage {
    async fn run(
        &self,
        snapshot: AuditState,
        ctx: StageContext,
    ) -> Result<AuditStateUpdate, StageError> {
        let summary = snapshot.initial_analysis.as_deref().unwrap_or("(no summary)");
        let rendered = render_findings(&snapshot.vulnerability_findings);
        let messages = prompts::report_messages(summary, &rendered, &snapshot.contract_code);
        let response = ctx
            .capability_call(
                "reasoning",
                self.reasoner.complete(CompletionRequest::new(messages)),
            )
            .await?;

        tracing::debug!(
            stage = %ctx.stage,
            findings = snapshot.vulnerability_findings.len(),
            report_len = response.content.len(),
            "report drafted"
        );
        Ok(AuditStateUpdate::new()
            .with_final_report(response.content)
            .with_needs_recheck(false))
    }
}

/// Render findings as the plain-text block fed to the report prompt.
///
/// Empty findings render as [`NO_FINDINGS_SENTINEL`]; unlocated findings
/// print "unlocated" instead of a line number.
#[must_use]
pub fn render_findings(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return NO_FINDINGS_SENTINEL.to_string();
    }

    let mut out = String::new();
    for (index, finding) in findings.iter().enumerate() {
        let _ = write!(
            out,
            "{}. [{}] {} (line ",
            index + 1,
            finding.severity,
            finding.vulnerability_type
        );
        if finding.is_located() {
            let _ = write!(out, "{}", finding.code_line);
        } else {
            out.push_str("unlocated");
        }
        let _ = writeln!(out, "): {}", finding.description);
        if let Some(recommendation) = &finding.recommendation {
            let _ = writeln!(out, "   Recommendation: {recommendation}");
        }
    }
    out
}
