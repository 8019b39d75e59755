// crates/gauntlet-core/src/core/scoring.rs
// ============================================================================
// Module: Gauntlet Composite Score
// Description: Go-Live Score combining five normalized components.
// Purpose: Provide the single scoring path used by ranking and reports.
// Dependencies: crate::core::{metrics, passes}, serde
// ============================================================================

//! ## Overview
//! The composite score is a scalar in [0, 10]: five components, each
//! normalized to [0, 1] by piecewise-linear clamping, weighted-summed and
//! scaled by 10, plus a +0.5 consistency bonus (capped at 10) when both the
//! back and forward windows are strictly profitable. The score is
//! non-decreasing in profit, non-decreasing in trade count up to the cap,
//! and non-increasing in max drawdown.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::metrics::TradeMetrics;
use crate::core::passes::Pass;

// ============================================================================
// SECTION: Normalization Ranges
// ============================================================================

/// Consistency component weight.
const WEIGHT_CONSISTENCY: f64 = 0.25;
/// Total-profit component weight.
const WEIGHT_PROFIT: f64 = 0.25;
/// Trade-count component weight.
const WEIGHT_TRADES: f64 = 0.20;
/// Profit-factor component weight.
const WEIGHT_PROFIT_FACTOR: f64 = 0.15;
/// Drawdown component weight.
const WEIGHT_DRAWDOWN: f64 = 0.15;

/// Consistency normalization ceiling, account currency.
const CONSISTENCY_CAP: f64 = 2_000.0;
/// Profit normalization ceiling, account currency.
const PROFIT_CAP: f64 = 5_000.0;
/// Trade-count normalization floor.
const TRADES_FLOOR: f64 = 50.0;
/// Trade-count normalization ceiling.
const TRADES_CAP: f64 = 200.0;
/// Profit-factor normalization floor.
const PROFIT_FACTOR_FLOOR: f64 = 1.0;
/// Profit-factor normalization ceiling.
const PROFIT_FACTOR_CAP: f64 = 3.0;
/// Drawdown normalization ceiling, percent.
const DRAWDOWN_CAP: f64 = 30.0;

/// Consistency bonus added when both windows are strictly profitable.
const CONSISTENCY_BONUS: f64 = 0.5;

// ============================================================================
// SECTION: Score Inputs
// ============================================================================

/// Inputs to the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    /// Back-window profit.
    pub profit_back: f64,
    /// Forward-window profit.
    pub profit_forward: f64,
    /// Total profit over the full period.
    pub total_profit: f64,
    /// Total trade count.
    pub trades: u64,
    /// Profit factor.
    pub profit_factor: f64,
    /// Maximum drawdown, percent.
    pub max_drawdown_pct: f64,
}

impl ScoreInputs {
    /// Builds score inputs from a merged sweep pass.
    #[must_use]
    pub fn from_pass(pass: &Pass) -> Self {
        Self {
            profit_back: pass.profit_back,
            profit_forward: pass.profit_forward,
            total_profit: pass.profit_combined,
            trades: pass.trades,
            // Sweep rows carry profits only; neutral placeholders keep the
            // ranking driven by the profit components until the
            // confirmation backtest supplies full metrics.
            profit_factor: PROFIT_FACTOR_FLOOR,
            max_drawdown_pct: DRAWDOWN_CAP,
        }
    }

    /// Builds score inputs from confirmation-run metrics plus window profits.
    #[must_use]
    pub fn from_metrics(metrics: &TradeMetrics, profit_back: f64, profit_forward: f64) -> Self {
        Self {
            profit_back,
            profit_forward,
            total_profit: metrics.profit,
            trades: metrics.total_trades,
            profit_factor: metrics.profit_factor,
            max_drawdown_pct: metrics.max_drawdown_pct,
        }
    }
}

// ============================================================================
// SECTION: Composite Score
// ============================================================================

/// Computes the Go-Live composite score in [0, 10].
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Trade counts fit f64 mantissa range.")]
pub fn composite_score(inputs: &ScoreInputs) -> f64 {
    let consistency_raw = if inputs.profit_back <= 0.0 || inputs.profit_forward <= 0.0 {
        0.0
    } else {
        inputs.profit_back.min(inputs.profit_forward)
    };

    let consistency = normalize(consistency_raw, 0.0, CONSISTENCY_CAP);
    let profit = normalize(inputs.total_profit, 0.0, PROFIT_CAP);
    let trades = normalize(inputs.trades as f64, TRADES_FLOOR, TRADES_CAP);
    let profit_factor = normalize(inputs.profit_factor, PROFIT_FACTOR_FLOOR, PROFIT_FACTOR_CAP);
    let drawdown = 1.0 - normalize(inputs.max_drawdown_pct, 0.0, DRAWDOWN_CAP);

    let weighted = consistency * WEIGHT_CONSISTENCY
        + profit * WEIGHT_PROFIT
        + trades * WEIGHT_TRADES
        + profit_factor * WEIGHT_PROFIT_FACTOR
        + drawdown * WEIGHT_DRAWDOWN;

    let mut score = weighted * 10.0;
    if inputs.profit_back > 0.0 && inputs.profit_forward > 0.0 {
        score += CONSISTENCY_BONUS;
    }
    score.clamp(0.0, 10.0)
}

/// Clamps a value into [0, 1] over a linear range.
fn normalize(value: f64, floor: f64, cap: f64) -> f64 {
    if cap <= floor {
        return 0.0;
    }
    ((value - floor) / (cap - floor)).clamp(0.0, 1.0)
}
