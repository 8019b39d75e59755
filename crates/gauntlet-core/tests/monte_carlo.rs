// crates/gauntlet-core/tests/monte_carlo.rs
// ============================================================================
// Module: Monte-Carlo Simulation Tests
// Description: Permutation invariance, ruin detection, and edge cases.
// ============================================================================

//! Monte-Carlo properties: outcomes are invariant under permutation of the
//! input trade order, ruin is detected against the running peak, and the
//! empty trade list degrades to zero confidence and zero ruin.

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

use gauntlet_core::MonteCarloConfig;
use gauntlet_core::runtime::simulate;
use proptest::prelude::*;

fn config(iterations: u64) -> MonteCarloConfig {
    MonteCarloConfig {
        iterations,
        ruin_threshold: 0.5,
        seed: 42,
    }
}

#[test]
fn empty_trade_list_degrades_cleanly() {
    let result = simulate(&[], 10_000.0, &config(1_000), true);
    assert!(result.ruin_probability.abs() < f64::EPSILON);
    assert!(result.confidence.abs() < f64::EPSILON);
    assert!(result.estimated_trades);
    assert!(result.profit_percentiles.is_empty());
}

#[test]
fn all_winning_trades_never_ruin() {
    let profits = vec![25.0; 200];
    let result = simulate(&profits, 10_000.0, &config(2_000), false);
    assert!((result.confidence - 100.0).abs() < f64::EPSILON);
    assert!(result.ruin_probability.abs() < f64::EPSILON);
    let p50 = result.profit_percentiles.get("p50").copied().unwrap();
    assert!((p50 - 5_000.0).abs() < 1e-6);
}

#[test]
fn catastrophic_sequence_always_ruins() {
    // One trade wipes out more than half of any achievable peak.
    let profits = vec![100.0, 100.0, -8_000.0, 50.0];
    let result = simulate(&profits, 10_000.0, &config(500), false);
    assert!((result.ruin_probability - 100.0).abs() < f64::EPSILON);
    assert!(result.confidence.abs() < f64::EPSILON);
}

#[test]
fn percentiles_are_monotonic() {
    let profits: Vec<f64> = (0..100).map(|i| f64::from(i) - 50.0).collect();
    let result = simulate(&profits, 10_000.0, &config(1_000), false);
    let labels = ["p05", "p10", "p25", "p50", "p75", "p90", "p95"];
    let values: Vec<f64> =
        labels.iter().map(|label| result.profit_percentiles[*label]).collect();
    for pair in values.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn outcomes_are_invariant_under_input_permutation(
        profits in proptest::collection::vec(-200.0..200.0f64, 5..40),
        rotation in 0usize..40,
    ) {
        let mut rotated = profits.clone();
        let split = rotation % rotated.len().max(1);
        rotated.rotate_left(split);

        let base = simulate(&profits, 10_000.0, &config(300), false);
        let permuted = simulate(&rotated, 10_000.0, &config(300), false);
        prop_assert!((base.ruin_probability - permuted.ruin_probability).abs() < f64::EPSILON);
        prop_assert!((base.confidence - permuted.confidence).abs() < f64::EPSILON);
    }
}
