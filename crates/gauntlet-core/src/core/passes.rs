// crates/gauntlet-core/src/core/passes.rs
// ============================================================================
// Module: Gauntlet Pass Records
// Description: Sweep rows, scored rows, and backtested pass records.
// Purpose: Carry per-pass data from the sweep artifact through selection.
// Dependencies: crate::core::{gates, metrics, params}, serde
// ============================================================================

//! ## Overview
//! A pass is one row of the sweep result: a parameter assignment plus its
//! back-window, forward-window, and combined metrics. Passes survive the
//! adaptive trade filter as scored passes, and the selected subset is
//! re-evaluated into backtested passes carrying full metrics and per-pass
//! gates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::gates::GateResult;
use crate::core::metrics::TradeMetrics;
use crate::core::params::ParamValue;

// ============================================================================
// SECTION: Sweep Pass
// ============================================================================

/// One merged row of the sweep result.
///
/// # Invariants
/// - `index` is the stable pass index from the sweep artifact.
/// - `inputs` is the exact parameter assignment the runner exercised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pass {
    /// Stable pass index within the sweep artifact.
    pub index: u32,
    /// Back-window profit.
    pub profit_back: f64,
    /// Forward-window profit.
    pub profit_forward: f64,
    /// Combined profit over the full period.
    pub profit_combined: f64,
    /// Custom optimization criterion value.
    pub custom_criterion: f64,
    /// Back-window trade count.
    pub trades: u64,
    /// Exact input assignment used for the pass.
    pub inputs: BTreeMap<String, ParamValue>,
}

/// A pass annotated with its composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPass {
    /// Underlying sweep row.
    pub pass: Pass,
    /// Composite score in [0, 10].
    pub score: f64,
}

// ============================================================================
// SECTION: Backtested Pass
// ============================================================================

/// A selected pass after its confirmation backtest.
///
/// # Invariants
/// - `gates` holds the per-pass gate outcomes in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestedPass {
    /// Stable pass index within the sweep artifact.
    pub index: u32,
    /// Input assignment re-run for confirmation.
    pub inputs: BTreeMap<String, ParamValue>,
    /// Full-period metrics from the confirmation run.
    pub metrics: TradeMetrics,
    /// Composite score from the confirmation run.
    pub score: f64,
    /// Per-pass gate outcomes (profit factor, drawdown, trade count).
    pub gates: Vec<GateResult>,
}

impl BacktestedPass {
    /// Returns true when every per-pass gate passed.
    #[must_use]
    pub fn gates_passed(&self) -> bool {
        self.gates.iter().all(|gate| gate.passed)
    }
}

// ============================================================================
// SECTION: Month Stamp
// ============================================================================

/// Year-month key for tick-archive coverage checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthStamp {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u8,
}

impl MonthStamp {
    /// Creates a month stamp.
    #[must_use]
    pub const fn new(year: i32, month: u8) -> Self {
        Self {
            year,
            month,
        }
    }
}
