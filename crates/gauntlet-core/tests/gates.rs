// crates/gauntlet-core/tests/gates.rs
// ============================================================================
// Module: Gate Evaluation Tests
// Description: Gate soundness, boundary passes, and diagnosis strings.
// ============================================================================

//! Gate properties: `passed` always agrees with the comparison, boundary
//! values pass, and failed gates carry a diagnosis.

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

use gauntlet_core::GATE_MAX_DRAWDOWN;
use gauntlet_core::GATE_MC_CONFIDENCE;
use gauntlet_core::GATE_MINIMUM_TRADES;
use gauntlet_core::GATE_PROFIT_FACTOR;
use gauntlet_core::GateOp;
use gauntlet_core::GateResult;
use gauntlet_core::diagnose;
use gauntlet_core::profit_factor_from_gross;
use proptest::prelude::*;

#[test]
fn boundary_values_pass_their_gates() {
    assert!(GateResult::evaluate(GATE_MINIMUM_TRADES, 50.0, 50.0, GateOp::Gte).passed);
    assert!(GateResult::evaluate(GATE_PROFIT_FACTOR, 1.5, 1.5, GateOp::Gte).passed);
    assert!(GateResult::evaluate(GATE_MAX_DRAWDOWN, 30.0, 30.0, GateOp::Lte).passed);
}

#[test]
fn just_beyond_boundary_fails() {
    assert!(!GateResult::evaluate(GATE_MINIMUM_TRADES, 49.0, 50.0, GateOp::Gte).passed);
    assert!(!GateResult::evaluate(GATE_PROFIT_FACTOR, 1.499, 1.5, GateOp::Gte).passed);
    assert!(!GateResult::evaluate(GATE_MAX_DRAWDOWN, 30.01, 30.0, GateOp::Lte).passed);
}

#[test]
fn zero_gross_loss_yields_profit_factor_99() {
    assert!((profit_factor_from_gross(1_000.0, 0.0) - 99.0).abs() < f64::EPSILON);
    assert!(profit_factor_from_gross(0.0, 0.0).abs() < f64::EPSILON);
    assert!((profit_factor_from_gross(300.0, 200.0) - 1.5).abs() < 1e-12);
}

#[test]
fn failed_gates_carry_a_diagnosis() {
    let gate = GateResult::evaluate(GATE_PROFIT_FACTOR, 1.2, 1.5, GateOp::Gte);
    let diagnosis = diagnose(&gate);
    assert!(diagnosis.contains("1.2"));
    assert!(diagnosis.contains("1.5"));

    let passed = GateResult::evaluate(GATE_MC_CONFIDENCE, 85.0, 70.0, GateOp::Gte);
    assert!(diagnose(&passed).is_empty());
}

proptest! {
    #[test]
    fn passed_agrees_with_the_comparison(
        observed in -1_000.0..1_000.0f64,
        threshold in -1_000.0..1_000.0f64,
    ) {
        for op in [GateOp::Gte, GateOp::Lte, GateOp::Eq] {
            let gate = GateResult::evaluate("check", observed, threshold, op);
            prop_assert_eq!(gate.passed, op.holds(observed, threshold));
            prop_assert_eq!(gate.passed, op.holds(gate.observed, gate.threshold));
        }
    }

    #[test]
    fn gate_results_round_trip_through_serde(
        observed in -1_000.0..1_000.0f64,
        threshold in -1_000.0..1_000.0f64,
    ) {
        let gate = GateResult::evaluate("check", observed, threshold, GateOp::Gte);
        let encoded = serde_json::to_string(&gate).unwrap();
        let decoded: GateResult = serde_json::from_str(&encoded).unwrap();
        prop_assert_eq!(gate, decoded);
    }
}
