//! Property coverage for the routing predicate.

use proptest::prelude::*;
use solaudit::findings::{Finding, Severity};
use solaudit::router::{RouterVerdict, route};
use solaudit::state::AuditState;

fn finding(line: u32) -> Finding {
    Finding {
        vulnerability_type: "Reentrancy".to_string(),
        severity: Severity::Medium,
        code_line: line,
        description: "synthetic".to_string(),
        recommendation: None,
    }
}

proptest! {
    #[test]
    fn verdict_matches_the_predicate(
        finding_count in 0usize..5,
        needs_recheck in any::<bool>(),
        has_summary in any::<bool>(),
    ) {
        let mut builder = AuditState::builder("contract A {}")
            .with_findings((0..finding_count).map(|i| finding(i as u32)).collect())
            .with_needs_recheck(needs_recheck);
        if has_summary {
            builder = builder.with_initial_analysis("a contract");
        }
        let state = builder.build();

        let expected = if finding_count > 0 || needs_recheck {
            RouterVerdict::ContinueToReport
        } else {
            RouterVerdict::Terminate
        };
        prop_assert_eq!(route(&state), expected);
    }

    // The verdict depends only on findings and the recheck flag.
    #[test]
    fn unrelated_fields_never_change_the_verdict(
        needs_recheck in any::<bool>(),
        report in "[a-z]{0,12}",
    ) {
        let bare = AuditState::builder("contract A {}")
            .with_needs_recheck(needs_recheck)
            .build();
        let decorated = AuditState::builder("contract A {}")
            .with_needs_recheck(needs_recheck)
            .with_initial_analysis("summary")
            .with_final_report(report)
            .build();
        prop_assert_eq!(route(&bare), route(&decorated));
    }
}
