// crates/gauntlet-core/src/core/metrics.rs
// ============================================================================
// Module: Gauntlet Trade Metrics
// Description: Per-run trade summaries and trade-list derived statistics.
// Purpose: Provide the immutable metric records consumed by gates and reports.
// Dependencies: crate::core::time, serde
// ============================================================================

//! ## Overview
//! `TradeMetrics` summarizes one evaluation run. The profit-factor edge rule
//! is encoded in a single constructor so every producer agrees: 99 when
//! gross loss is zero and gross profit positive, 0 when both are zero.
//! Window slicing (forward-window analysis) recomputes metrics from filtered
//! trade lists with an explicit starting balance so in-window drawdown is
//! realistic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Trades
// ============================================================================

/// Direction of a closed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    /// Long position.
    Buy,
    /// Short position.
    Sell,
}

/// One closed trade from a single-run artifact.
///
/// # Invariants
/// - `close_time >= open_time`.
/// - `net_profit` includes commission and swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Position open time.
    pub open_time: Timestamp,
    /// Position close time.
    pub close_time: Timestamp,
    /// Trade direction.
    pub direction: TradeDirection,
    /// Traded volume in lots.
    pub volume: f64,
    /// Open price.
    pub open_price: f64,
    /// Close price.
    pub close_price: f64,
    /// Commission charged, account currency.
    pub commission: f64,
    /// Swap charged, account currency.
    pub swap: f64,
    /// Net profit including commission and swap, account currency.
    pub net_profit: f64,
}

// ============================================================================
// SECTION: Trade Metrics
// ============================================================================

/// Immutable summary of one evaluation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeMetrics {
    /// Net profit, account currency.
    pub profit: f64,
    /// Gross profit divided by gross loss (see [`profit_factor_from_gross`]).
    pub profit_factor: f64,
    /// Maximum peak-to-trough drawdown, percent of peak balance.
    pub max_drawdown_pct: f64,
    /// Total closed trades.
    pub total_trades: u64,
    /// Fraction of winning trades in [0, 1].
    pub win_rate: f64,
    /// Annualized Sharpe ratio.
    pub sharpe: f64,
    /// Annualized Sortino ratio.
    pub sortino: f64,
    /// Calmar ratio.
    pub calmar: f64,
    /// Mean net profit per trade.
    pub expected_payoff: f64,
    /// Net profit divided by maximum drawdown amount.
    pub recovery_factor: f64,
    /// Balance curve sampled per closed trade, when available.
    pub equity_curve: Option<Vec<f64>>,
    /// Errors observed while producing the metrics.
    pub errors: Vec<String>,
}

/// Computes the profit factor with the zero-loss edge rule.
///
/// Returns 99 when gross loss is zero and gross profit positive, 0 when both
/// are zero, and the plain ratio otherwise.
#[must_use]
pub fn profit_factor_from_gross(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss <= f64::EPSILON {
        if gross_profit > 0.0 { 99.0 } else { 0.0 }
    } else {
        gross_profit / gross_loss
    }
}

/// Recomputes run metrics from a closed-trade list.
///
/// `starting_balance` seeds the balance curve so drawdown within a window
/// reflects the balance actually at risk when the window opens. Ratio
/// metrics that need per-bar returns (Sharpe, Sortino) are computed over
/// per-trade returns against the running balance, which is the best
/// available granularity offline.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Trade counts fit f64 mantissa range.")]
pub fn metrics_from_trades(trades: &[Trade], starting_balance: f64) -> TradeMetrics {
    if trades.is_empty() {
        return TradeMetrics::default();
    }

    let mut balance = starting_balance;
    let mut peak = starting_balance;
    let mut max_drawdown_amount = 0.0_f64;
    let mut max_drawdown_pct = 0.0_f64;
    let mut gross_profit = 0.0_f64;
    let mut gross_loss = 0.0_f64;
    let mut winners = 0_u64;
    let mut curve = Vec::with_capacity(trades.len());
    let mut returns = Vec::with_capacity(trades.len());

    for trade in trades {
        let base = if balance.abs() > f64::EPSILON { balance } else { 1.0 };
        returns.push(trade.net_profit / base);
        balance += trade.net_profit;
        curve.push(balance);
        if trade.net_profit > 0.0 {
            gross_profit += trade.net_profit;
            winners += 1;
        } else {
            gross_loss += -trade.net_profit;
        }
        if balance > peak {
            peak = balance;
        }
        let drawdown = peak - balance;
        if drawdown > max_drawdown_amount {
            max_drawdown_amount = drawdown;
        }
        if peak > 0.0 {
            let pct = drawdown / peak * 100.0;
            if pct > max_drawdown_pct {
                max_drawdown_pct = pct;
            }
        }
    }

    let total = trades.len() as f64;
    let profit = balance - starting_balance;
    let mean_return = returns.iter().sum::<f64>() / total;
    let variance =
        returns.iter().map(|value| (value - mean_return).powi(2)).sum::<f64>() / total;
    let downside_variance = returns
        .iter()
        .map(|value| if *value < 0.0 { value.powi(2) } else { 0.0 })
        .sum::<f64>()
        / total;
    let sharpe = if variance > 0.0 { mean_return / variance.sqrt() } else { 0.0 };
    let sortino =
        if downside_variance > 0.0 { mean_return / downside_variance.sqrt() } else { 0.0 };
    let calmar = if max_drawdown_pct > 0.0 { profit / starting_balance.max(1.0) / (max_drawdown_pct / 100.0) } else { 0.0 };

    TradeMetrics {
        profit,
        profit_factor: profit_factor_from_gross(gross_profit, gross_loss),
        max_drawdown_pct,
        total_trades: trades.len() as u64,
        win_rate: winners as f64 / total,
        sharpe,
        sortino,
        calmar,
        expected_payoff: profit / total,
        recovery_factor: if max_drawdown_amount > 0.0 { profit / max_drawdown_amount } else { 0.0 },
        equity_curve: Some(curve),
        errors: Vec::new(),
    }
}
