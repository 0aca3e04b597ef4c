//! The three built-in audit stages.

mod detect;
mod report;
mod summarize;

pub use detect::DetectStage;
pub use report::{NO_FINDINGS_SENTINEL, ReportStage, render_findings};
pub use summarize::SummarizeStage;
