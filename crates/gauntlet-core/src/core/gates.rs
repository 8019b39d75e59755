// crates/gauntlet-core/src/core/gates.rs
// ============================================================================
// Module: Gauntlet Gates
// Description: Named pass/fail checks with thresholds and comparison operators.
// Purpose: Provide the single gate-evaluation path used by every stage.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A gate compares an observed value against a threshold under one of three
//! operators. [`GateResult::evaluate`] is the only constructor that sets the
//! `passed` flag, so `passed` always agrees with the comparison. Boundary
//! values pass: a trade count exactly at the minimum, a profit factor of
//! exactly 1.5, and a drawdown of exactly 30% all satisfy their gates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Gate Vocabulary
// ============================================================================

/// Gate name: EA source file exists.
pub const GATE_FILE_EXISTS: &str = "file-exists";
/// Gate name: compilation error count.
pub const GATE_COMPILATION_ERRORS: &str = "compilation-errors";
/// Gate name: extracted parameter count.
pub const GATE_PARAMS_FOUND: &str = "params-found";
/// Gate name: minimum trade count.
pub const GATE_MINIMUM_TRADES: &str = "minimum-trades";
/// Gate name: profit factor floor.
pub const GATE_PROFIT_FACTOR: &str = "profit-factor";
/// Gate name: maximum drawdown ceiling.
pub const GATE_MAX_DRAWDOWN: &str = "max-drawdown";
/// Gate name: Monte-Carlo confidence floor.
pub const GATE_MC_CONFIDENCE: &str = "mc-confidence";
/// Gate name: Monte-Carlo ruin ceiling.
pub const GATE_MC_RUIN: &str = "mc-ruin";
/// Gate name: sweep produced at least one pass.
pub const GATE_PASSES_FOUND: &str = "passes-found";

// ============================================================================
// SECTION: Gate Operator
// ============================================================================

/// Comparison operator for gate evaluation.
///
/// # Invariants
/// - Variants are stable for serialization and report consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOp {
    /// Observed value must be greater than or equal to the threshold.
    Gte,
    /// Observed value must be less than or equal to the threshold.
    Lte,
    /// Observed value must equal the threshold.
    Eq,
}

impl GateOp {
    /// Applies the comparison to an observed value and threshold.
    #[must_use]
    pub fn holds(self, observed: f64, threshold: f64) -> bool {
        match self {
            Self::Gte => observed >= threshold,
            Self::Lte => observed <= threshold,
            Self::Eq => (observed - threshold).abs() <= f64::EPSILON,
        }
    }
}

impl fmt::Display for GateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Eq => "==",
        };
        f.write_str(symbol)
    }
}

// ============================================================================
// SECTION: Gate Result
// ============================================================================

/// Outcome of one gate evaluation.
///
/// # Invariants
/// - `passed` holds iff `op.holds(observed, threshold)`; guaranteed by
///   construction through [`GateResult::evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate name from the well-known vocabulary.
    pub name: String,
    /// Whether the comparison held.
    pub passed: bool,
    /// Observed value.
    pub observed: f64,
    /// Threshold compared against.
    pub threshold: f64,
    /// Comparison operator.
    pub op: GateOp,
    /// Human-readable outcome message.
    pub message: String,
}

impl GateResult {
    /// Evaluates a gate, deriving `passed` and the outcome message.
    #[must_use]
    pub fn evaluate(name: &str, observed: f64, threshold: f64, op: GateOp) -> Self {
        let passed = op.holds(observed, threshold);
        let verdict = if passed { "pass" } else { "fail" };
        Self {
            name: name.to_string(),
            passed,
            observed,
            threshold,
            op,
            message: format!("{name}: observed {observed} {op} {threshold} -> {verdict}"),
        }
    }
}

// ============================================================================
// SECTION: Failure Diagnosis
// ============================================================================

/// Derives an operator-facing diagnosis string for a failed gate.
///
/// Passed gates yield an empty diagnosis. The wording mirrors the failure
/// context surfaced in reports so operators can act without reading raw
/// metric tables.
#[must_use]
pub fn diagnose(gate: &GateResult) -> String {
    if gate.passed {
        return String::new();
    }
    match gate.name.as_str() {
        GATE_FILE_EXISTS => "EA source file was not found at the supplied path".to_string(),
        GATE_COMPILATION_ERRORS => format!(
            "compilation produced {} error(s); the source requires a repair patch",
            gate.observed
        ),
        GATE_PARAMS_FOUND => {
            "no input parameters were extracted; the EA exposes nothing to optimize".to_string()
        }
        GATE_MINIMUM_TRADES => format!(
            "only {} trades against a floor of {}; entries may be blocked by a filter or session toggle",
            gate.observed, gate.threshold
        ),
        GATE_PROFIT_FACTOR => format!(
            "profit factor observed {} vs required {} - winners and losers similarly sized, consider exit improvements",
            gate.observed, gate.threshold
        ),
        GATE_MAX_DRAWDOWN => format!(
            "max drawdown {}% exceeds the {}% ceiling; position sizing or stops are too loose",
            gate.observed, gate.threshold
        ),
        GATE_MC_CONFIDENCE => format!(
            "only {}% of shuffled sequences ended profitable (floor {}%); the edge is order-dependent",
            gate.observed, gate.threshold
        ),
        GATE_MC_RUIN => format!(
            "{}% of shuffled sequences hit the ruin threshold (ceiling {}%)",
            gate.observed, gate.threshold
        ),
        GATE_PASSES_FOUND => "the optimization sweep produced no passes".to_string(),
        _ => format!("gate {} failed: observed {} vs {}", gate.name, gate.observed, gate.threshold),
    }
}
