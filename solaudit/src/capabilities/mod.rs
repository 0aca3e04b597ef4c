//! External capability boundaries consumed by the audit stages.
//!
//! The pipeline treats both collaborators as black boxes behind traits:
//! the reasoning capability ([`ReasoningCapability`]) accepts a role-tagged
//! message sequence and returns text, and the static-analysis capability
//! ([`static_analysis::StaticAnalyzer`]) turns contract source into a
//! coarse warning string. How either service is hosted or authenticated is
//! a caller concern; the crate only ships the traits, a heuristic analyzer,
//! and a deterministic scripted reasoner for tests and offline runs.

pub mod scripted;
pub mod static_analysis;

pub use scripted::ScriptedReasoner;
pub use static_analysis::{HeuristicAnalyzer, StaticAnalyzer};

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::message::Message;

/// A single invocation of the reasoning capability.
///
/// Carries the ordered message sequence and an optional JSON-schema hint.
/// Capabilities that can natively constrain their output (structured-output
/// modes) should honor the hint; others may ignore it, in which case the
/// structured-output validator parses and polices the response text.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    /// Ordered system instructions and user content.
    pub messages: Vec<Message>,
    /// Optional schema the response should conform to.
    pub response_schema: Option<serde_json::Value>,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            response_schema: None,
        }
    }

    #[must_use]
    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Concatenated message contents, used by scripted capabilities to match
    /// prompts and by tests to assert what a stage sent.
    #[must_use]
    pub fn combined_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The reasoning capability's answer.
#[derive(Clone, Debug)]
pub struct CompletionResponse {
    /// Free text or a JSON document, depending on the request.
    pub content: String,
}

impl CompletionResponse {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Failure modes a capability invocation can surface to the pipeline.
///
/// All of these are fatal for the invoking stage; the distinction exists so
/// diagnostics can tell an unreachable service from a rejected request.
#[derive(Clone, Debug, Error, Diagnostic)]
pub enum CapabilityError {
    /// Network or transport failure reaching the service.
    #[error("capability transport failure: {0}")]
    #[diagnostic(
        code(solaudit::capability::transport),
        help("Check connectivity to the reasoning or static-analysis service.")
    )]
    Transport(String),

    /// The service rejected the caller's credentials.
    #[error("capability authentication failure: {0}")]
    #[diagnostic(code(solaudit::capability::auth))]
    Auth(String),

    /// The service accepted the connection but rejected the request.
    #[error("capability rejected the request: {0}")]
    #[diagnostic(code(solaudit::capability::rejected))]
    Rejected(String),

    /// The invocation exceeded its deadline.
    #[error("capability invocation timed out after {seconds}s")]
    #[diagnostic(
        code(solaudit::capability::timeout),
        help("Raise the capability timeout in AuditConfig or check service latency.")
    )]
    Timeout { seconds: u64 },
}

/// The external large-language-model service consulted for summarization,
/// detection, and report drafting.
#[async_trait]
pub trait ReasoningCapability: Send + Sync {
    /// Submit a message sequence and await the service's reply.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CapabilityError>;

    /// Identifier of the backing model, for tracing.
    fn model_name(&self) -> &str {
        "unspecified"
    }
}
