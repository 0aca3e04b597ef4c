//! Shared fixtures for the integration suite.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use solaudit::capabilities::{
    CapabilityError, CompletionRequest, CompletionResponse, HeuristicAnalyzer,
    ReasoningCapability, ScriptedReasoner,
};
use solaudit::runtimes::{AuditConfig, AuditRunner};

/// A withdrawal contract with the classic unprotected external call.
pub const VULNERABLE_CONTRACT: &str = r#"
pragma solidity ^0.8.0;

contract Vault {
    mapping(address => uint256) public balances;

    function deposit() public payable {
        balances[msg.sender] += msg.value;
    }

    function withdraw(uint256 amount) public {
        require(balances[msg.sender] >= amount);
        (bool ok, ) = msg.sender.call{value: amount}("");
        require(ok);
        balances[msg.sender] -= amount;
    }
}
"#;

/// A trivial read-only contract that should audit clean.
pub const CLEAN_CONTRACT: &str = r#"
pragma solidity ^0.8.0;

contract Counter {
    uint256 private count;

    function current() public view returns (uint256) {
        return count;
    }
}
"#;

/// Wraps a reasoner and records every request it receives.
pub struct RecordingReasoner {
    inner: ScriptedReasoner,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl RecordingReasoner {
    pub fn new(inner: ScriptedReasoner) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.call_count()
    }
}

#[async_trait]
impl ReasoningCapability for RecordingReasoner {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CapabilityError> {
        self.requests.lock().unwrap().push(request.clone());
        self.inner.complete(request).await
    }
}

/// Standard runner over a scripted reasoner and the heuristic analyzer.
pub fn scripted_runner(reasoner: Arc<dyn ReasoningCapability>) -> AuditRunner {
    AuditRunner::standard(
        reasoner,
        Arc::new(HeuristicAnalyzer::new()),
        AuditConfig::default(),
    )
}
