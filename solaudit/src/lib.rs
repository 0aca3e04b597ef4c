//! # solaudit
//!
//! An orchestration engine for multi-stage smart-contract audits.
//!
//! A run threads one [`state::AuditState`] through three fixed stages —
//! summarize, detect, report — over a validated transition graph. Detection
//! output is policed by a structured-output validator with a bounded retry
//! budget; a router decides after detection whether a report is worth
//! writing. External collaborators (the reasoning model and the static
//! analyzer) sit behind traits in [`capabilities`], so the engine itself is
//! deterministic and fully testable offline.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use solaudit::capabilities::{HeuristicAnalyzer, ScriptedReasoner};
//! use solaudit::runtimes::{AuditConfig, AuditRunner};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = AuditRunner::standard(
//!     Arc::new(ScriptedReasoner::new()),
//!     Arc::new(HeuristicAnalyzer::new()),
//!     AuditConfig::default(),
//! );
//!
//! let outcome = runner
//!     .run("function withdraw() public { msg.sender.call{value: 1}(\"\"); }")
//!     .await?;
//! assert!(outcome.final_report().is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module map
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`state`] | Shared run state and stage deltas |
//! | [`findings`] | Finding schema and the structured analysis shape |
//! | [`capabilities`] | Reasoning and static-analysis trait boundaries |
//! | [`prompts`] | Message assembly for the three stages |
//! | [`schema`] | Structured-output validation and retry policy |
//! | [`stage`] | Stage trait, execution context, error taxonomy |
//! | [`stages`] | The built-in summarize/detect/report stages |
//! | [`router`] | Post-detection branching predicate |
//! | [`graph`] | Topology builder and compile-time validation |
//! | [`runtimes`] | Config and the run executor |
//! | [`telemetry`] | Tracing subscriber setup |

pub mod capabilities;
pub mod findings;
pub mod graph;
pub mod message;
pub mod prompts;
pub mod router;
pub mod runtimes;
pub mod schema;
pub mod stage;
pub mod stages;
pub mod state;
pub mod telemetry;
