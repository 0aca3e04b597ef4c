//! Prompt assembly for the three audit stages.
//!
//! The literal wording here is presentation, not contract: the orchestration
//! engine only depends on the message *layering* (instruction, accumulated
//! context, code) that each builder produces. Tests and scripted
//! capabilities key off the instruction constants to recognize which stage
//! is speaking.

use crate::message::Message;

/// System instruction for the summarization stage.
pub const SUMMARIZER_INSTRUCTIONS: &str = "You are a senior smart-contract project manager. \
Summarize the purpose, functionality, and core logic of the provided Solidity contract \
(for example: a token contract, a voting system, or a staking vault).";

/// System instruction for the vulnerability-detection stage.
pub const AUDITOR_INSTRUCTIONS: &str = "You are a professional smart-contract security audit \
expert. Carefully review the provided Solidity code for common vulnerabilities such as \
reentrancy, integer overflow, access control flaws, and tx.origin misuse. You must answer \
with a single JSON object containing `findings` (an array of findings, each with \
`vulnerability_type`, `severity`, `code_line`, `description`, and optionally \
`recommendation`) and `recheck_needed` (a boolean). Set `recheck_needed` to true if you \
believe serious issues may remain undiscovered.";

/// System instruction for the report-writing stage.
pub const REPORTER_INSTRUCTIONS: &str = "You are a professional security report writer. \
Organize the provided audit findings into a polished report containing a summary, the list \
of findings with type, severity, and line number, and professional remediation advice.";

/// Corrective instruction appended when a detection reply failed validation.
pub const SCHEMA_REPAIR_INSTRUCTIONS: &str = "Your previous reply did not conform to the \
required output format. Respond with exactly one JSON object with two fields: `findings` \
(an array, possibly empty) and `recheck_needed` (a boolean). Do not include any prose \
outside the JSON object.";

/// Messages for the summarization stage: instruction plus the raw code.
#[must_use]
pub fn summarize_messages(contract_code: &str) -> Vec<Message> {
    vec![
        Message::system(SUMMARIZER_INSTRUCTIONS),
        Message::user(&format!(
            "Analyze the following contract code and summarize it:\n\n{contract_code}"
        )),
    ]
}

/// Messages for the detection stage: instruction, accumulated context
/// (summary and static-analysis warning), then the code.
#[must_use]
pub fn detect_messages(summary: &str, warning: &str, contract_code: &str) -> Vec<Message> {
    vec![
        Message::system(AUDITOR_INSTRUCTIONS),
        Message::system(&format!("Contract overview: {summary}")),
        Message::system(&format!("Static analysis warnings: {warning}")),
        Message::user(&format!(
            "Perform a security audit of the following code and answer strictly in the \
             required JSON format:\n\n{contract_code}"
        )),
    ]
}

/// Messages for the report stage: instruction, summary, rendered findings,
/// and the code for reference.
#[must_use]
pub fn report_messages(summary: &str, rendered_findings: &str, contract_code: &str) -> Vec<Message> {
    vec![
        Message::system(REPORTER_INSTRUCTIONS),
        Message::system(&format!("Contract overview: {summary}")),
        Message::user(&format!(
            "Write a professional audit report from the following findings.\n\n\
             Findings:\n{rendered_findings}\n\nAudited code for reference:\n{contract_code}"
        )),
    ]
}
