//! Structured-output validation for the detection stage.
//!
//! The reasoning capability is free-form by nature; this module is the sole
//! boundary that turns its raw replies into a typed [`AnalysisResult`].
//! Non-conformant replies trigger a bounded number of corrective retries;
//! exhausting the budget surfaces [`SchemaValidationError`]. The validator
//! never substitutes defaults for missing required fields — a defaulted
//! `findings` or `recheck_needed` would misrepresent audit completeness.

use miette::Diagnostic;
use thiserror::Error;

use crate::capabilities::{CompletionRequest, ReasoningCapability};
use crate::findings::AnalysisResult;
use crate::message::Message;
use crate::prompts;
use crate::stage::{StageContext, StageError};

/// Raised when the reasoning output never conformed to the analysis schema
/// within the retry budget.
#[derive(Debug, Error, Diagnostic)]
#[error("reasoning output did not conform to the analysis schema after {attempts} attempts: {last_error}")]
#[diagnostic(
    code(solaudit::schema::validation),
    help("The model kept omitting or mistyping `findings`/`recheck_needed`. Consider a capability with native structured output.")
)]
pub struct SchemaValidationError {
    /// Total completion attempts made (initial call plus retries).
    pub attempts: u32,
    /// Parse failure from the final attempt.
    pub last_error: String,
}

/// Validator with a fixed retry budget.
#[derive(Clone, Copy, Debug)]
pub struct OutputValidator {
    retry_budget: u32,
}

impl OutputValidator {
    /// Default number of corrective retries after the initial attempt.
    pub const DEFAULT_RETRY_BUDGET: u32 = 2;

    #[must_use]
    pub fn new(retry_budget: u32) -> Self {
        Self { retry_budget }
    }

    /// Request an [`AnalysisResult`] from the reasoning capability.
    ///
    /// Sends the given messages with a schema hint attached; on a
    /// non-conformant reply, appends a corrective instruction and retries
    /// up to the budget. Capability failures (transport, auth, rejection,
    /// timeout) abort immediately — they are not schema failures and
    /// retrying them here would mask a different problem.
    pub async fn request_analysis(
        &self,
        reasoner: &dyn ReasoningCapability,
        ctx: &StageContext,
        mut messages: Vec<Message>,
    ) -> Result<AnalysisResult, StageError> {
        let mut last_error = String::new();

        for attempt in 0..=self.retry_budget {
            if attempt > 0 {
                tracing::warn!(
                    stage = %ctx.stage,
                    attempt,
                    error = %last_error,
                    "detection output failed validation; retrying with corrective instruction"
                );
                messages.push(Message::system(prompts::SCHEMA_REPAIR_INSTRUCTIONS));
            }

            let request = CompletionRequest::new(messages.clone())
                .with_response_schema(AnalysisResult::response_schema());
            let response = ctx
                .capability_call("reasoning", reasoner.complete(request))
                .await?;

            match parse_analysis(&response.content) {
                Ok(analysis) => return Ok(analysis),
                Err(reason) => last_error = reason,
            }
        }

        Err(StageError::Schema(SchemaValidationError {
            attempts: self.retry_budget + 1,
            last_error,
        }))
    }
}

impl Default for OutputValidator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RETRY_BUDGET)
    }
}

/// Parse a raw capability reply as an [`AnalysisResult`].
///
/// Accepts a bare JSON document, a fenced ```json block, or the first
/// balanced object embedded in surrounding prose. Returns the parse
/// failure as a string so the caller can feed it into the retry loop.
pub fn parse_analysis(content: &str) -> Result<AnalysisResult, String> {
    let direct = serde_json::from_str::<AnalysisResult>(content.trim());
    match direct {
        Ok(analysis) => Ok(analysis),
        Err(direct_err) => {
            if let Some(embedded) = extract_json(content) {
                serde_json::from_str::<AnalysisResult>(embedded).map_err(|e| e.to_string())
            } else {
                Err(direct_err.to_string())
            }
        }
    }
}

/// Locate a JSON document inside free-form model output.
fn extract_json(text: &str) -> Option<&str> {
    // Fenced code block first.
    if let Some(fence_start) = text.find("```json") {
        let body = &text[fence_start + 7..];
        if let Some(fence_end) = body.find("```") {
            return Some(body[..fence_end].trim());
        }
    }

    // Otherwise the first balanced top-level object.
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escape_next = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Severity;

    #[test]
    fn parses_bare_json() {
        let analysis =
            parse_analysis(r#"{"findings": [], "recheck_needed": true}"#).unwrap();
        assert!(analysis.findings.is_empty());
        assert!(analysis.recheck_needed);
    }

    #[test]
    fn parses_fenced_json() {
        let reply = "Here is my analysis:\n```json\n{\"findings\": [], \"recheck_needed\": false}\n```\nDone.";
        let analysis = parse_analysis(reply).unwrap();
        assert!(!analysis.recheck_needed);
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let reply = concat!(
            "After review: {\"findings\": [{\"vulnerability_type\": \"Reentrancy\", ",
            "\"severity\": \"High\", \"code_line\": 9, ",
            "\"description\": \"call before state update\"}], ",
            "\"recheck_needed\": false} — that is all."
        );
        let analysis = parse_analysis(reply).unwrap();
        assert_eq!(analysis.findings.len(), 1);
        assert_eq!(analysis.findings[0].severity, Severity::High);
    }

    #[test]
    fn rejects_missing_recheck_flag() {
        assert!(parse_analysis(r#"{"findings": []}"#).is_err());
    }

    #[test]
    fn rejects_non_json_prose() {
        assert!(parse_analysis("the contract looks fine to me").is_err());
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_extraction() {
        let reply = r#"note: {"findings": [{"vulnerability_type": "Logic {brace}", "severity": "Low", "code_line": 1, "description": "d"}], "recheck_needed": false}"#;
        let analysis = parse_analysis(reply).unwrap();
        assert_eq!(analysis.findings[0].vulnerability_type, "Logic {brace}");
    }
}
