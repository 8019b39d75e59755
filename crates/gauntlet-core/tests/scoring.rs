// crates/gauntlet-core/tests/scoring.rs
// ============================================================================
// Module: Composite Score Tests
// Description: Bounds, monotonicity, and bonus behavior of the Go-Live Score.
// ============================================================================

//! Composite score properties: range, monotonicity, and the consistency
//! bonus.

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

use gauntlet_core::ScoreInputs;
use gauntlet_core::composite_score;
use proptest::prelude::*;

fn inputs(
    back: f64,
    forward: f64,
    total: f64,
    trades: u64,
    pf: f64,
    dd: f64,
) -> ScoreInputs {
    ScoreInputs {
        profit_back: back,
        profit_forward: forward,
        total_profit: total,
        trades,
        profit_factor: pf,
        max_drawdown_pct: dd,
    }
}

#[test]
fn perfect_inputs_hit_the_cap() {
    let score = composite_score(&inputs(3_000.0, 3_000.0, 6_000.0, 250, 3.5, 0.0));
    assert!((score - 10.0).abs() < 1e-9);
}

#[test]
fn worthless_inputs_score_zero() {
    let score = composite_score(&inputs(-100.0, -50.0, -150.0, 0, 0.0, 80.0));
    assert!(score.abs() < 1e-9);
}

#[test]
fn consistency_is_zeroed_when_either_window_loses() {
    let mixed = composite_score(&inputs(2_000.0, -1.0, 2_000.0, 100, 2.0, 10.0));
    let both = composite_score(&inputs(2_000.0, 2_000.0, 2_000.0, 100, 2.0, 10.0));
    // The losing forward window forfeits the consistency component and the
    // bonus.
    assert!(both > mixed + 0.5);
}

#[test]
fn bonus_applies_only_when_both_windows_profit() {
    let with_bonus = composite_score(&inputs(1.0, 1.0, 0.0, 0, 1.0, 30.0));
    let without = composite_score(&inputs(1.0, 0.0, 0.0, 0, 1.0, 30.0));
    assert!((with_bonus - without - 0.5).abs() < 1e-6);
}

proptest! {
    #[test]
    fn score_is_always_within_bounds(
        back in -10_000.0..10_000.0f64,
        forward in -10_000.0..10_000.0f64,
        total in -10_000.0..10_000.0f64,
        trades in 0u64..1_000,
        pf in 0.0..100.0f64,
        dd in 0.0..100.0f64,
    ) {
        let score = composite_score(&inputs(back, forward, total, trades, pf, dd));
        prop_assert!((0.0..=10.0).contains(&score));
    }

    #[test]
    fn score_is_non_decreasing_in_profit(
        total in -5_000.0..5_000.0f64,
        delta in 0.0..5_000.0f64,
    ) {
        let lo = composite_score(&inputs(100.0, 100.0, total, 100, 2.0, 15.0));
        let hi = composite_score(&inputs(100.0, 100.0, total + delta, 100, 2.0, 15.0));
        prop_assert!(hi >= lo);
    }

    #[test]
    fn score_is_non_decreasing_in_trades_up_to_the_cap(
        trades in 0u64..200,
        extra in 0u64..100,
    ) {
        let lo = composite_score(&inputs(100.0, 100.0, 1_000.0, trades, 2.0, 15.0));
        let hi = composite_score(&inputs(100.0, 100.0, 1_000.0, trades + extra, 2.0, 15.0));
        prop_assert!(hi >= lo);
    }

    #[test]
    fn score_is_non_increasing_in_drawdown(
        dd in 0.0..100.0f64,
        extra in 0.0..50.0f64,
    ) {
        let lo = composite_score(&inputs(100.0, 100.0, 1_000.0, 100, 2.0, dd + extra));
        let hi = composite_score(&inputs(100.0, 100.0, 1_000.0, 100, 2.0, dd));
        prop_assert!(hi >= lo);
    }
}
