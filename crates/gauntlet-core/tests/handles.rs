// crates/gauntlet-core/tests/handles.rs
// ============================================================================
// Module: Report Handle Tests
// Description: Determinism and collision-freedom of report handles.
// ============================================================================

//! Report handles are deterministic for identical components and disjoint
//! across workflow identifiers.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    missing_docs,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

use gauntlet_core::WorkflowId;
use gauntlet_core::report_handle;
use proptest::prelude::*;

#[test]
fn handle_has_the_documented_shape() {
    let handle =
        report_handle(&WorkflowId::new("wf-1"), "trend_rider", "sweep", Some("0")).unwrap();
    let mut parts = handle.rsplitn(2, '_');
    let hash = parts.next().unwrap();
    let prefix = parts.next().unwrap();
    assert_eq!(prefix, "trend_rider_sweep");
    assert_eq!(hash.len(), 8);
    assert!(hash.chars().all(|ch| ch.is_ascii_hexdigit()));
}

#[test]
fn handles_are_deterministic() {
    let a = report_handle(&WorkflowId::new("wf-1"), "ea", "backtest", Some("7")).unwrap();
    let b = report_handle(&WorkflowId::new("wf-1"), "ea", "backtest", Some("7")).unwrap();
    assert_eq!(a, b);
}

proptest! {
    #[test]
    fn workflow_identity_separates_handles(
        stem in "[a-z]{1,10}",
        tag in "[a-z]{1,8}",
        disambiguator in proptest::option::of("[0-9]{1,4}"),
    ) {
        let a = report_handle(
            &WorkflowId::new("wf-a"),
            &stem,
            &tag,
            disambiguator.as_deref(),
        ).unwrap();
        let b = report_handle(
            &WorkflowId::new("wf-b"),
            &stem,
            &tag,
            disambiguator.as_deref(),
        ).unwrap();
        prop_assert_ne!(a, b);
    }

    #[test]
    fn disambiguators_separate_handles(
        stem in "[a-z]{1,10}",
        first in 0u32..10_000,
        second in 0u32..10_000,
    ) {
        prop_assume!(first != second);
        let id = WorkflowId::new("wf-1");
        let a = report_handle(&id, &stem, "backtest", Some(&first.to_string())).unwrap();
        let b = report_handle(&id, &stem, "backtest", Some(&second.to_string())).unwrap();
        prop_assert_ne!(a, b);
    }
}
