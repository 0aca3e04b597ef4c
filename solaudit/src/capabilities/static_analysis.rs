//! Static-analysis capability boundary and the built-in heuristic analyzer.
//!
//! The detection stage uses this signal as auxiliary context only; its
//! correctness never depends on it. Any analyzer error is swallowed at the
//! stage boundary and replaced with [`NO_WARNINGS`].

use async_trait::async_trait;

use super::CapabilityError;

/// Sentinel warning string meaning the analyzer found nothing noteworthy.
pub const NO_WARNINGS: &str = "No obvious warnings from static analysis.";

/// The external tool producing a coarse warning signal from source text.
#[async_trait]
pub trait StaticAnalyzer: Send + Sync {
    /// Scan contract source and return a warning string.
    ///
    /// Implementations may fail; the detection stage treats every failure
    /// as "no warnings" rather than aborting the run.
    async fn scan(&self, source: &str) -> Result<String, CapabilityError>;
}

/// Lightweight pattern-based analyzer shipped as the default implementation.
///
/// Flags the handful of Solidity constructs that most commonly accompany
/// exploitable bugs: low-level value transfers (reentrancy surface),
/// `tx.origin` authentication, and block-timestamp dependence. A production
/// deployment would put a real tool such as Slither behind the same trait.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StaticAnalyzer for HeuristicAnalyzer {
    async fn scan(&self, source: &str) -> Result<String, CapabilityError> {
        let mut warnings = Vec::new();

        if source.contains(".call{value:")
            || source.contains(".call.value(")
            || source.contains(".send(")
            || source.contains(".transfer(")
        {
            warnings.push(
                "Possible low-level call or Ether transfer detected. Check for reentrancy.",
            );
        }
        if source.contains("tx.origin") {
            warnings.push("tx.origin used for authorization. Prefer msg.sender.");
        }
        if source.contains("block.timestamp") || source.contains("block.number") {
            warnings.push("Block metadata dependence detected. Miners can influence it.");
        }
        if source.contains("delegatecall") {
            warnings.push("delegatecall detected. Verify the target is trusted.");
        }

        if warnings.is_empty() {
            Ok(NO_WARNINGS.to_string())
        } else {
            Ok(warnings.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flags_low_level_value_transfer() {
        let source = r#"(bool ok, ) = msg.sender.call{value: amount}("");"#;
        let warning = HeuristicAnalyzer::new().scan(source).await.unwrap();
        assert!(warning.contains("reentrancy"));
    }

    #[tokio::test]
    async fn flags_tx_origin() {
        let warning = HeuristicAnalyzer::new()
            .scan("require(tx.origin == owner);")
            .await
            .unwrap();
        assert!(warning.contains("tx.origin"));
    }

    #[tokio::test]
    async fn clean_source_yields_sentinel() {
        let warning = HeuristicAnalyzer::new()
            .scan("function totalSupply() public view returns (uint256) { return supply; }")
            .await
            .unwrap();
        assert_eq!(warning, NO_WARNINGS);
    }
}
