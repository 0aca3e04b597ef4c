//! Post-detection routing decision.
//!
//! A single pure function decides whether a run proceeds to report writing
//! or terminates early. Keeping it free of I/O and side effects makes the
//! branching behavior trivially testable in isolation from the executor.

use crate::state::AuditState;

/// Outcome of evaluating the routing predicate after detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouterVerdict {
    /// Detection produced material worth reporting.
    ContinueToReport,
    /// Nothing to report; end the run without a report.
    Terminate,
}

impl std::fmt::Display for RouterVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterVerdict::ContinueToReport => write!(f, "continue_to_report"),
            RouterVerdict::Terminate => write!(f, "terminate"),
        }
    }
}

/// Decide where the run goes after the detection stage.
///
/// The report is worth writing when detection either produced findings or
/// flagged that serious issues may remain (`needs_recheck`). The recheck
/// flag alone is sufficient: a report documenting residual uncertainty is
/// more useful than silence.
#[must_use]
pub fn route(state: &AuditState) -> RouterVerdict {
    if !state.vulnerability_findings.is_empty() || state.needs_recheck {
        RouterVerdict::ContinueToReport
    } else {
        RouterVerdict::Terminate
    }
}
