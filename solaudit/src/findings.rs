//! Finding and analysis schema for the detection stage.
//!
//! The reasoning capability is asked to answer the detection prompt with a
//! JSON document shaped like [`AnalysisResult`]. The structured-output
//! validator ([`crate::schema`]) is the only place that turns raw capability
//! text into these types; every stage downstream of it only ever sees
//! already-validated values.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Sentinel line number meaning "the finding could not be located".
pub const UNLOCATED_LINE: u32 = 0;

/// Severity of a single vulnerability finding.
///
/// Values follow the conventional audit scale. Deserialization accepts the
/// lowercase spellings some models emit, but the canonical form is
/// capitalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[serde(alias = "informational", alias = "INFORMATIONAL", alias = "info")]
    Informational,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
            Self::Informational => write!(f, "Informational"),
        }
    }
}

/// One reported issue. Immutable once created.
///
/// `code_line` is an approximate source location; [`UNLOCATED_LINE`] marks a
/// finding the model could not pin to a line. Raw capability output may carry
/// a negative or missing line number; deserialization repairs those to the
/// unlocated sentinel instead of failing the whole analysis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Free-text category, e.g. "Reentrancy" or "Access Control".
    pub vulnerability_type: String,
    /// Audit severity of the issue.
    pub severity: Severity,
    /// Approximate line number, `UNLOCATED_LINE` when unknown.
    #[serde(default, deserialize_with = "de_code_line")]
    pub code_line: u32,
    /// Short description of the issue and its potential impact.
    pub description: String,
    /// Optional remediation advice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Finding {
    /// Returns true if the finding carries a usable source location.
    #[must_use]
    pub fn is_located(&self) -> bool {
        self.code_line != UNLOCATED_LINE
    }
}

/// Accept signed or missing line numbers from raw model output and clamp
/// anything non-positive to the unlocated sentinel.
fn de_code_line<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw
        .filter(|line| *line > 0)
        .map(|line| u32::try_from(line).unwrap_or(u32::MAX))
        .unwrap_or(UNLOCATED_LINE))
}

/// The required shape of the detection stage's structured output.
///
/// `findings` preserves detection order and may be empty. `recheck_needed`
/// is the detection stage's own signal that its analysis is incomplete or
/// uncertain. Both fields are required: a document missing either one does
/// not deserialize, which is exactly the rejection the validator relies on.
/// Produced once per run and never mutated after acceptance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Detected issues in detection order.
    pub findings: Vec<Finding>,
    /// True when the analyst judges the analysis incomplete or uncertain.
    pub recheck_needed: bool,
}

impl AnalysisResult {
    /// JSON-schema hint handed to capabilities that can natively constrain
    /// their output shape.
    #[must_use]
    pub fn response_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["findings", "recheck_needed"],
            "properties": {
                "findings": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["vulnerability_type", "severity", "description"],
                        "properties": {
                            "vulnerability_type": { "type": "string" },
                            "severity": {
                                "type": "string",
                                "enum": ["High", "Medium", "Low", "Informational"]
                            },
                            "code_line": { "type": "integer" },
                            "description": { "type": "string" },
                            "recommendation": { "type": "string" }
                        }
                    }
                },
                "recheck_needed": { "type": "boolean" }
            }
        })
    }
}
