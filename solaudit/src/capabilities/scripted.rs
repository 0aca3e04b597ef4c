//! Deterministic scripted reasoning capability.
//!
//! Answers prompts from a fixed script instead of a live service, which
//! makes it the workhorse for tests and offline pipeline runs. Two modes
//! compose:
//!
//! - **Queued replies** take precedence: each call pops the next queued
//!   `Result`, which is how tests script validation-retry sequences and
//!   transport failures.
//! - **Pattern rules** otherwise: the first rule whose pattern occurs in
//!   the combined prompt text wins. The default rule set recognizes the
//!   three stage instructions and produces a plausible summary, detection
//!   JSON (reentrancy-shaped code yields a High finding), and report text.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::prompts;

use super::{CapabilityError, CompletionRequest, CompletionResponse, ReasoningCapability};

/// Detection reply for contracts with no noteworthy issues.
pub const CLEAN_ANALYSIS_JSON: &str = r#"{"findings": [], "recheck_needed": false}"#;

/// Detection reply for the classic unprotected external-call pattern.
pub const REENTRANCY_ANALYSIS_JSON: &str = r#"{
  "findings": [
    {
      "vulnerability_type": "Reentrancy",
      "severity": "High",
      "code_line": 12,
      "description": "External call transfers Ether before the caller's balance bookkeeping is final.",
      "recommendation": "Apply the checks-effects-interactions pattern or a reentrancy guard."
    }
  ],
  "recheck_needed": false
}"#;

struct Rule {
    pattern: String,
    response: String,
}

/// Scripted implementation of [`ReasoningCapability`].
pub struct ScriptedReasoner {
    rules: Vec<Rule>,
    queue: Mutex<VecDeque<Result<String, CapabilityError>>>,
    call_count: AtomicUsize,
    fail_with: Option<CapabilityError>,
}

impl Default for ScriptedReasoner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedReasoner {
    /// Reasoner with the default stage-aware rule set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Self::default_rules(),
            queue: Mutex::new(VecDeque::new()),
            call_count: AtomicUsize::new(0),
            fail_with: None,
        }
    }

    /// Reasoner that fails every call with a transport error.
    #[must_use]
    pub fn failing() -> Self {
        let mut reasoner = Self::new();
        reasoner.fail_with = Some(CapabilityError::Transport(
            "scripted reasoner configured to fail".to_string(),
        ));
        reasoner
    }

    /// Reasoner that answers calls in order from the given script, then
    /// falls back to the rule set.
    #[must_use]
    pub fn from_script(replies: Vec<Result<String, CapabilityError>>) -> Self {
        let reasoner = Self::new();
        reasoner
            .queue
            .lock()
            .expect("scripted reply queue poisoned")
            .extend(replies);
        reasoner
    }

    /// Adds a pattern rule checked before the defaults.
    #[must_use]
    pub fn with_rule(mut self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.insert(
            0,
            Rule {
                pattern: pattern.into(),
                response: response.into(),
            },
        );
        self
    }

    /// Number of completed `complete` invocations so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn default_rules() -> Vec<Rule> {
        vec![
            // Summarize and report prompts carry the contract code too, so
            // their instruction rules must precede the code-shape rule.
            Rule {
                pattern: prompts::SUMMARIZER_INSTRUCTIONS.to_string(),
                response: "This contract manages per-address Ether balances with deposit \
                           and withdrawal entry points."
                    .to_string(),
            },
            Rule {
                pattern: prompts::REPORTER_INSTRUCTIONS.to_string(),
                response: "# Audit Report\n\nThe audit reviewed the contract end to end; \
                           findings and remediation advice are listed below."
                    .to_string(),
            },
            Rule {
                pattern: "call{value:".to_string(),
                response: REENTRANCY_ANALYSIS_JSON.to_string(),
            },
            Rule {
                pattern: prompts::AUDITOR_INSTRUCTIONS.to_string(),
                response: CLEAN_ANALYSIS_JSON.to_string(),
            },
        ]
    }

    fn scripted_reply(&self) -> Option<Result<String, CapabilityError>> {
        self.queue
            .lock()
            .expect("scripted reply queue poisoned")
            .pop_front()
    }

    fn rule_reply(&self, prompt: &str) -> String {
        for rule in &self.rules {
            if prompt.contains(&rule.pattern) {
                return rule.response.clone();
            }
        }
        CLEAN_ANALYSIS_JSON.to_string()
    }
}

#[async_trait]
impl ReasoningCapability for ScriptedReasoner {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CapabilityError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        if let Some(reply) = self.scripted_reply() {
            return reply.map(CompletionResponse::new);
        }

        let prompt = request.combined_text();
        Ok(CompletionResponse::new(self.rule_reply(&prompt)))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn detect_request(code: &str) -> CompletionRequest {
        CompletionRequest::new(crate::prompts::detect_messages("summary", "none", code))
    }

    #[tokio::test]
    async fn reentrancy_shaped_code_yields_high_finding() {
        let reasoner = ScriptedReasoner::new();
        let response = reasoner
            .complete(detect_request("msg.sender.call{value: amount}(\"\")"))
            .await
            .unwrap();
        assert!(response.content.contains("Reentrancy"));
        assert_eq!(reasoner.call_count(), 1);
    }

    #[tokio::test]
    async fn clean_code_yields_empty_analysis() {
        let reasoner = ScriptedReasoner::new();
        let response = reasoner
            .complete(detect_request("function get() public view returns (uint) {}"))
            .await
            .unwrap();
        assert_eq!(response.content, CLEAN_ANALYSIS_JSON);
    }

    #[tokio::test]
    async fn queued_replies_take_precedence() {
        let reasoner = ScriptedReasoner::from_script(vec![
            Ok("first".to_string()),
            Err(CapabilityError::Rejected("second".to_string())),
        ]);
        let first = reasoner
            .complete(CompletionRequest::new(vec![Message::user("x")]))
            .await
            .unwrap();
        assert_eq!(first.content, "first");
        assert!(
            reasoner
                .complete(CompletionRequest::new(vec![Message::user("x")]))
                .await
                .is_err()
        );
        assert_eq!(reasoner.call_count(), 2);
    }

    #[tokio::test]
    async fn failing_reasoner_errors_every_call() {
        let reasoner = ScriptedReasoner::failing();
        let result = reasoner
            .complete(CompletionRequest::new(vec![Message::user("x")]))
            .await;
        assert!(matches!(result, Err(CapabilityError::Transport(_))));
    }
}
