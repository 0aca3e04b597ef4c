//! Shared audit state threaded through every stage of a run.
//!
//! A run holds exactly one [`AuditState`]. Stages receive a snapshot of it
//! and return an [`AuditStateUpdate`] describing only the fields they
//! changed; the runner owns the authoritative instance and applies merges
//! sequentially. Each field has exactly one legitimate writer per run
//! (except `needs_recheck`, which the detection stage sets and the report
//! stage clears), so field replacement is conflict-free by construction.

use crate::findings::Finding;

/// The single shared record for one audit run.
///
/// Constructible from just the contract source; every other field starts
/// empty and is filled in by the stage contractually responsible for it:
///
/// - `initial_analysis` — written by Summarize, read by Detect and Report
/// - `vulnerability_findings` — written by Detect, read by the router and Report
/// - `needs_recheck` — written by Detect, consumed by the router, cleared by Report
/// - `final_report` — written by Report, absent on runs that terminate clean
///
/// # Examples
///
/// ```
/// use solaudit::state::AuditState;
///
/// let state = AuditState::new("contract Vault {}");
/// assert!(state.initial_analysis.is_none());
/// assert!(state.vulnerability_findings.is_empty());
/// assert!(!state.needs_recheck);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditState {
    /// Immutable contract source, set once before the run starts.
    pub contract_code: String,
    /// Free-text summary of the contract's purpose and core logic.
    pub initial_analysis: Option<String>,
    /// Findings in detection order; empty until Detect runs.
    pub vulnerability_findings: Vec<Finding>,
    /// Detection stage's "analysis may be incomplete" signal.
    pub needs_recheck: bool,
    /// The drafted audit report; absent until Report runs.
    pub final_report: Option<String>,
}

impl AuditState {
    /// Creates the initial state for a run.
    #[must_use]
    pub fn new(contract_code: impl Into<String>) -> Self {
        Self {
            contract_code: contract_code.into(),
            initial_analysis: None,
            vulnerability_findings: Vec::new(),
            needs_recheck: false,
            final_report: None,
        }
    }

    /// Creates a builder for constructing arbitrary states.
    ///
    /// Primarily useful in tests that exercise the router or individual
    /// stages against states a full run would produce.
    #[must_use]
    pub fn builder(contract_code: impl Into<String>) -> AuditStateBuilder {
        AuditStateBuilder {
            state: Self::new(contract_code),
        }
    }

    /// Merges a stage's partial update into this state by field replacement.
    ///
    /// Returns the names of the fields that were written, in a stable order,
    /// so the runner can log what each stage changed.
    pub fn apply(&mut self, update: AuditStateUpdate) -> Vec<&'static str> {
        let mut written = Vec::new();
        if let Some(analysis) = update.initial_analysis {
            self.initial_analysis = Some(analysis);
            written.push("initial_analysis");
        }
        if let Some(findings) = update.vulnerability_findings {
            self.vulnerability_findings = findings;
            written.push("vulnerability_findings");
        }
        if let Some(recheck) = update.needs_recheck {
            self.needs_recheck = recheck;
            written.push("needs_recheck");
        }
        if let Some(report) = update.final_report {
            self.final_report = Some(report);
            written.push("final_report");
        }
        written
    }
}

/// Partial state update returned by stage execution.
///
/// All fields are optional; a stage only populates the fields it is the
/// writer for. `contract_code` is deliberately absent — no stage may touch
/// the input source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditStateUpdate {
    pub initial_analysis: Option<String>,
    pub vulnerability_findings: Option<Vec<Finding>>,
    pub needs_recheck: Option<bool>,
    pub final_report: Option<String>,
}

impl AuditStateUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_initial_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.initial_analysis = Some(analysis.into());
        self
    }

    #[must_use]
    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.vulnerability_findings = Some(findings);
        self
    }

    #[must_use]
    pub fn with_needs_recheck(mut self, needs_recheck: bool) -> Self {
        self.needs_recheck = Some(needs_recheck);
        self
    }

    #[must_use]
    pub fn with_final_report(mut self, report: impl Into<String>) -> Self {
        self.final_report = Some(report.into());
        self
    }

    /// Returns true if this update writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.initial_analysis.is_none()
            && self.vulnerability_findings.is_none()
            && self.needs_recheck.is_none()
            && self.final_report.is_none()
    }
}

/// Fluent builder for [`AuditState`], mirroring the update surface.
#[derive(Debug)]
pub struct AuditStateBuilder {
    state: AuditState,
}

impl AuditStateBuilder {
    #[must_use]
    pub fn with_initial_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.state.initial_analysis = Some(analysis.into());
        self
    }

    #[must_use]
    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.state.vulnerability_findings = findings;
        self
    }

    #[must_use]
    pub fn with_needs_recheck(mut self, needs_recheck: bool) -> Self {
        self.state.needs_recheck = needs_recheck;
        self
    }

    #[must_use]
    pub fn with_final_report(mut self, report: impl Into<String>) -> Self {
        self.state.final_report = Some(report.into());
        self
    }

    #[must_use]
    pub fn build(self) -> AuditState {
        self.state
    }
}
