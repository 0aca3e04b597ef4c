//! Runtime configuration for audit runs.

use std::time::Duration;

/// Tunables applied to every run executed by one runner.
///
/// Environment resolution follows the usual layering: explicit builder
/// values win, then process environment (after a best-effort `.env` load),
/// then the defaults below.
///
/// | Variable | Meaning | Default |
/// |----------|---------|---------|
/// | `SOLAUDIT_SCHEMA_RETRIES` | Corrective retries after a non-conformant detection reply | `2` |
/// | `SOLAUDIT_CAPABILITY_TIMEOUT_SECS` | Per-invocation capability deadline | `60` |
#[derive(Clone, Debug)]
pub struct AuditConfig {
    schema_retry_budget: u32,
    capability_timeout: Duration,
    run_id: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            schema_retry_budget: 2,
            capability_timeout: Duration::from_secs(60),
            run_id: None,
        }
    }
}

impl AuditConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from the process environment.
    ///
    /// Loads `.env` if present; unparsable values fall back to defaults
    /// rather than failing startup.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("SOLAUDIT_SCHEMA_RETRIES") {
            if let Ok(retries) = raw.trim().parse() {
                config.schema_retry_budget = retries;
            }
        }
        if let Ok(raw) = std::env::var("SOLAUDIT_CAPABILITY_TIMEOUT_SECS") {
            if let Ok(seconds) = raw.trim().parse() {
                config.capability_timeout = Duration::from_secs(seconds);
            }
        }
        config
    }

    /// Corrective retries allowed after a non-conformant detection reply.
    #[must_use]
    pub fn with_schema_retry_budget(mut self, retries: u32) -> Self {
        self.schema_retry_budget = retries;
        self
    }

    /// Deadline applied to each capability invocation.
    #[must_use]
    pub fn with_capability_timeout(mut self, timeout: Duration) -> Self {
        self.capability_timeout = timeout;
        self
    }

    /// Fixed run identifier instead of a generated one. Useful for
    /// correlating logs across systems.
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    #[must_use]
    pub fn schema_retry_budget(&self) -> u32 {
        self.schema_retry_budget
    }

    #[must_use]
    pub fn capability_timeout(&self) -> Duration {
        self.capability_timeout
    }

    #[must_use]
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AuditConfig::default();
        assert_eq!(config.schema_retry_budget(), 2);
        assert_eq!(config.capability_timeout(), Duration::from_secs(60));
        assert!(config.run_id().is_none());
    }

    #[test]
    fn builders_override_defaults() {
        let config = AuditConfig::new()
            .with_schema_retry_budget(5)
            .with_capability_timeout(Duration::from_secs(10))
            .with_run_id("audit-42");
        assert_eq!(config.schema_retry_budget(), 5);
        assert_eq!(config.capability_timeout(), Duration::from_secs(10));
        assert_eq!(config.run_id(), Some("audit-42"));
    }
}
