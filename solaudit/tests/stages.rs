//! Cross-stage behavior observed through the prompts each stage sends.

mod common;

use solaudit::capabilities::ScriptedReasoner;
use solaudit::capabilities::static_analysis::NO_WARNINGS;
use solaudit::prompts;

use common::{CLEAN_CONTRACT, RecordingReasoner, VULNERABLE_CONTRACT, scripted_runner};
use std::sync::Arc;

#[tokio::test]
async fn detect_prompt_carries_the_summary_and_static_warnings() {
    let reasoner = Arc::new(RecordingReasoner::new(ScriptedReasoner::new()));
    let runner = scripted_runner(reasoner.clone());
    runner.run(VULNERABLE_CONTRACT).await.unwrap();

    let requests = reasoner.requests();
    let detect = requests
        .iter()
        .find(|r| r.combined_text().contains(prompts::AUDITOR_INSTRUCTIONS))
        .expect("no detection request sent");
    let text = detect.combined_text();
    // Summary produced by the previous stage flows into the prompt.
    assert!(text.contains("Ether balances"));
    // The vulnerable contract trips the reentrancy heuristic.
    assert!(text.contains("reentrancy"));
    assert!(!text.contains(NO_WARNINGS));
}

#[tokio::test]
async fn clean_contract_detect_prompt_carries_the_no_warnings_sentinel() {
    let reasoner = Arc::new(RecordingReasoner::new(ScriptedReasoner::new()));
    let runner = scripted_runner(reasoner.clone());
    runner.run(CLEAN_CONTRACT).await.unwrap();

    let requests = reasoner.requests();
    let detect = requests
        .iter()
        .find(|r| r.combined_text().contains(prompts::AUDITOR_INSTRUCTIONS))
        .expect("no detection request sent");
    assert!(detect.combined_text().contains(NO_WARNINGS));
}

#[tokio::test]
async fn report_prompt_lists_the_rendered_findings() {
    let reasoner = Arc::new(RecordingReasoner::new(ScriptedReasoner::new()));
    let runner = scripted_runner(reasoner.clone());
    runner.run(VULNERABLE_CONTRACT).await.unwrap();

    let requests = reasoner.requests();
    let report = requests
        .iter()
        .find(|r| r.combined_text().contains(prompts::REPORTER_INSTRUCTIONS))
        .expect("no report request sent");
    let text = report.combined_text();
    assert!(text.contains("[High] Reentrancy"));
    assert!(text.contains("line 12"));
}

#[tokio::test]
async fn only_the_detect_request_asks_for_structured_output() {
    let reasoner = Arc::new(RecordingReasoner::new(ScriptedReasoner::new()));
    let runner = scripted_runner(reasoner.clone());
    runner.run(VULNERABLE_CONTRACT).await.unwrap();

    for request in reasoner.requests() {
        let is_detect = request
            .combined_text()
            .contains(prompts::AUDITOR_INSTRUCTIONS);
        assert_eq!(request.response_schema.is_some(), is_detect);
    }
}
