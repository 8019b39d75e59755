// crates/gauntlet-core/src/core/simulation.rs
// ============================================================================
// Module: Gauntlet Simulation Records
// Description: Monte-Carlo, stress-scenario, and forward-window result records.
// Purpose: Provide the serializable outputs of the statistical post stages.
// Dependencies: crate::core::{metrics, time}, serde
// ============================================================================

//! ## Overview
//! These records capture the statistical post-processing outputs: shuffle
//! simulations over the best pass's trade sequence, stress runs over shorter
//! windows and alternative data models, post-hoc cost overlays, and offline
//! forward-window slices.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::metrics::TradeMetrics;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Data Model
// ============================================================================

/// Price data model used by the runner.
///
/// # Invariants
/// - Wire codes match the runner's configuration encoding: 1 = OHLC, 0 = tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataModel {
    /// Coarse bar model built from OHLC points.
    Ohlc,
    /// Fine model replaying recorded ticks.
    Tick,
}

impl DataModel {
    /// Returns the runner configuration code for the model.
    #[must_use]
    pub const fn ini_code(self) -> u8 {
        match self {
            Self::Ohlc => 1,
            Self::Tick => 0,
        }
    }

    /// Returns the stable lowercase model name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ohlc => "ohlc",
            Self::Tick => "tick",
        }
    }
}

impl std::fmt::Display for DataModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Monte-Carlo
// ============================================================================

/// Result of the Monte-Carlo shuffle simulation.
///
/// # Invariants
/// - `ruin_probability` and `confidence` are percentages in [0, 100].
/// - Percentile keys are the percentile labels ("p05" .. "p95").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    /// Number of shuffles performed.
    pub iterations: u64,
    /// Percentage of shuffles that hit the ruin threshold.
    pub ruin_probability: f64,
    /// Percentage of shuffles ending with positive profit.
    pub confidence: f64,
    /// Final-profit percentiles keyed by label.
    pub profit_percentiles: std::collections::BTreeMap<String, f64>,
    /// Peak drawdown percentiles keyed by label, percent of peak.
    pub drawdown_percentiles: std::collections::BTreeMap<String, f64>,
    /// True when the trade list was estimated from summary statistics.
    pub estimated_trades: bool,
}

// ============================================================================
// SECTION: Stress Scenarios
// ============================================================================

/// Label and bounds of one evaluation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowBounds {
    /// Human-readable window label.
    pub label: String,
    /// Inclusive window start.
    pub start: Timestamp,
    /// Inclusive window end.
    pub end: Timestamp,
}

/// Outcome of one stress scenario run.
///
/// # Invariants
/// - Exactly one of `metrics` / `error` is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenarioResult {
    /// Window evaluated.
    pub window: WindowBounds,
    /// Data model used for the run.
    pub model: DataModel,
    /// Execution latency in milliseconds, for tick-model latency variants.
    pub latency_ms: Option<u32>,
    /// Metrics from the run, when it succeeded.
    pub metrics: Option<TradeMetrics>,
    /// Error message, when the run failed.
    pub error: Option<String>,
}

/// Post-hoc execution-cost overlay applied to the best pass's trade list.
///
/// # Invariants
/// - Computed offline; no additional runner invocations are involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostOverlayResult {
    /// Spread assumption in pips.
    pub spread_pips: f64,
    /// Slippage assumption in pips per side.
    pub slippage_pips: f64,
    /// Net profit after subtracting the overlay cost from every trade.
    pub adjusted_profit: f64,
}

/// Aggregate output of the stress-scenario stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StressReport {
    /// Window and model scenario outcomes.
    pub scenarios: Vec<StressScenarioResult>,
    /// Cost-overlay grid outcomes.
    pub overlays: Vec<CostOverlayResult>,
    /// Months with no tick archive present, surfaced as warnings.
    pub missing_tick_months: Vec<crate::core::passes::MonthStamp>,
}

// ============================================================================
// SECTION: Forward Windows
// ============================================================================

/// Offline metric slice of the best pass's trade list.
///
/// # Invariants
/// - `starting_balance` equals the deposit plus the net profit of all trades
///   closed before the window opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardWindowResult {
    /// Window sliced.
    pub window: WindowBounds,
    /// Balance at the window open.
    pub starting_balance: f64,
    /// Number of trades closing inside the window.
    pub trades_in_window: u64,
    /// Metrics computed from the filtered trades.
    pub metrics: TradeMetrics,
}
