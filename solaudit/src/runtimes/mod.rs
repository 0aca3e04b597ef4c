//! Run-level orchestration: configuration and the stage executor.

mod config;
mod runner;

pub use config::AuditConfig;
pub use runner::{AuditError, AuditOutcome, AuditRunner};
