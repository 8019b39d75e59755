// crates/gauntlet-core/src/runtime/stages/monte_carlo.rs
// ============================================================================
// Module: Gauntlet Monte-Carlo Stage
// Description: Shuffle simulation over the best pass's trade sequence.
// Purpose: Estimate ruin probability and confidence under order permutation.
// Dependencies: crate::{core, interfaces, runtime}, rand
// ============================================================================

//! ## Overview
//! The best pass's realized trades are shuffled N times with a seeded RNG.
//! Each shuffle replays sequentially against a running balance from the
//! configured deposit; a shuffle is ruined when drawdown reaches the ruin
//! threshold of the running peak. Ruin probability and confidence are
//! invariant under permutation of the input trade order. When the trade
//! list is unavailable the stage estimates uniform winners and losers from
//! summary statistics and flags the result as estimated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::core::GATE_MC_CONFIDENCE;
use crate::core::GATE_MC_RUIN;
use crate::core::GateOp;
use crate::core::GateResult;
use crate::core::MonteCarloConfig;
use crate::core::MonteCarloResult;
use crate::core::StageName;
use crate::core::StageResult;
use crate::core::Trade;
use crate::core::TradeMetrics;
use crate::core::WorkflowState;
use crate::interfaces::Runner;
use crate::runtime::stage::Stage;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageOutput;
use crate::runtime::stage::StateEffect;

// ============================================================================
// SECTION: monte-carlo
// ============================================================================

/// Percentile labels reported for profits and drawdowns.
const PERCENTILES: [(u32, &str); 7] =
    [(5, "p05"), (10, "p10"), (25, "p25"), (50, "p50"), (75, "p75"), (90, "p90"), (95, "p95")];

/// Shuffle-simulates the best pass's trade sequence.
pub struct MonteCarlo;

impl<R: Runner> Stage<R> for MonteCarlo {
    fn name(&self) -> StageName {
        StageName::MonteCarlo
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::BacktestSelected]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        if state.best_pass.is_some() {
            Ok(())
        } else {
            Err(vec!["no best pass is recorded".to_string()])
        }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let Some(best) = state.best_pass.as_ref() else {
            return StageOutput::completed(StageResult::failure(
                StageName::MonteCarlo,
                "no best pass is recorded",
            ));
        };

        let (profits, estimated) = trade_profits(state.best_pass_trades_path.as_deref(), &best.metrics);
        let simulation = simulate(
            &profits,
            ctx.config.account.deposit,
            &ctx.config.monte_carlo,
            estimated,
        );

        let confidence_gate = GateResult::evaluate(
            GATE_MC_CONFIDENCE,
            simulation.confidence,
            ctx.config.gates.mc_confidence_min,
            GateOp::Gte,
        );
        let ruin_gate = GateResult::evaluate(
            GATE_MC_RUIN,
            simulation.ruin_probability,
            ctx.config.gates.mc_ruin_max,
            GateOp::Lte,
        );

        let result = StageResult::success(StageName::MonteCarlo)
            .with_data("iterations", serde_json::json!(simulation.iterations))
            .with_data("estimated_trades", serde_json::json!(simulation.estimated_trades))
            .with_gate(confidence_gate)
            .with_gate(ruin_gate);
        StageOutput::completed(result).with_effects(vec![StateEffect::SetMonteCarlo(simulation)])
    }
}

// ============================================================================
// SECTION: Trade Extraction
// ============================================================================

/// Loads the best-pass trade profits, falling back to estimation.
///
/// Estimation derives winning and losing counts from the total trade count
/// and win rate, then assigns every winner the mean gross profit and every
/// loser the mean gross loss. The second return value reports whether
/// estimation was used.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Trade counts fit f64 mantissa range.")]
pub fn trade_profits(trades_path: Option<&Path>, metrics: &TradeMetrics) -> (Vec<f64>, bool) {
    if let Some(path) = trades_path
        && let Ok(text) = fs::read_to_string(path)
        && let Ok(trades) = serde_json::from_str::<Vec<Trade>>(&text)
        && !trades.is_empty()
    {
        return (trades.iter().map(|trade| trade.net_profit).collect(), false);
    }

    if metrics.total_trades == 0 {
        return (Vec::new(), true);
    }

    let total = metrics.total_trades;
    let winners = win_count(total, metrics.win_rate);
    let losers = total - winners;
    let (gross_profit, gross_loss) = estimate_gross(metrics);
    let mut profits = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
    if winners > 0 {
        let win_size = gross_profit / winners as f64;
        profits.extend(std::iter::repeat_n(win_size, usize::try_from(winners).unwrap_or(0)));
    }
    if losers > 0 {
        let loss_size = -(gross_loss / losers as f64);
        profits.extend(std::iter::repeat_n(loss_size, usize::try_from(losers).unwrap_or(0)));
    }
    (profits, true)
}

/// Derives the winning-trade count from total trades and win rate.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Win rate is clamped to [0, 1] and counts fit f64 mantissa range."
)]
fn win_count(total: u64, win_rate: f64) -> u64 {
    let rate = win_rate.clamp(0.0, 1.0);
    ((total as f64 * rate).round() as u64).min(total)
}

/// Reconstructs gross profit and loss from net profit and profit factor.
fn estimate_gross(metrics: &TradeMetrics) -> (f64, f64) {
    let pf = metrics.profit_factor;
    let profit = metrics.profit;
    if (pf - 1.0).abs() <= f64::EPSILON {
        let magnitude = profit.abs().max(1.0);
        return (magnitude, magnitude);
    }
    if pf <= f64::EPSILON {
        return (0.0, profit.abs());
    }
    let gross_loss = (profit / (pf - 1.0)).abs();
    (pf * gross_loss, gross_loss)
}

// ============================================================================
// SECTION: Simulation
// ============================================================================

/// Runs the shuffle simulation over per-trade profits.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Iteration counts fit f64 mantissa range.")]
pub fn simulate(
    profits: &[f64],
    deposit: f64,
    config: &MonteCarloConfig,
    estimated_trades: bool,
) -> MonteCarloResult {
    if profits.is_empty() {
        return MonteCarloResult {
            iterations: config.iterations,
            ruin_probability: 0.0,
            confidence: 0.0,
            profit_percentiles: BTreeMap::new(),
            drawdown_percentiles: BTreeMap::new(),
            estimated_trades,
        };
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    // Canonicalize the starting order so outcomes depend only on the trade
    // multiset and the seed, never on artifact row order.
    let mut sequence: Vec<f64> = profits.to_vec();
    sequence.sort_by(f64::total_cmp);
    let mut final_profits = Vec::with_capacity(usize::try_from(config.iterations).unwrap_or(0));
    let mut peak_drawdowns = Vec::with_capacity(usize::try_from(config.iterations).unwrap_or(0));
    let mut ruined = 0_u64;
    let mut profitable = 0_u64;

    for _ in 0..config.iterations {
        sequence.shuffle(&mut rng);
        let mut balance = deposit;
        let mut peak = deposit;
        let mut worst_drawdown_pct = 0.0_f64;
        let mut hit_ruin = false;
        for profit in &sequence {
            balance += profit;
            if balance > peak {
                peak = balance;
            }
            let drawdown = peak - balance;
            if peak > 0.0 {
                let pct = drawdown / peak * 100.0;
                if pct > worst_drawdown_pct {
                    worst_drawdown_pct = pct;
                }
                if drawdown >= config.ruin_threshold * peak {
                    hit_ruin = true;
                }
            }
        }
        if hit_ruin {
            ruined += 1;
        }
        if balance > deposit {
            profitable += 1;
        }
        final_profits.push(balance - deposit);
        peak_drawdowns.push(worst_drawdown_pct);
    }

    let iterations = config.iterations.max(1) as f64;
    MonteCarloResult {
        iterations: config.iterations,
        ruin_probability: ruined as f64 / iterations * 100.0,
        confidence: profitable as f64 / iterations * 100.0,
        profit_percentiles: percentile_map(&mut final_profits),
        drawdown_percentiles: percentile_map(&mut peak_drawdowns),
        estimated_trades,
    }
}

/// Builds the labeled percentile map from a sample set.
fn percentile_map(samples: &mut [f64]) -> BTreeMap<String, f64> {
    samples.sort_by(f64::total_cmp);
    let mut out = BTreeMap::new();
    for (pct, label) in PERCENTILES {
        out.insert(label.to_string(), percentile(samples, pct));
    }
    out
}

/// Returns the nearest-rank percentile of a sorted sample set.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Sample counts fit f64 mantissa range and the rank is clamped."
)]
fn percentile(sorted: &[f64], pct: u32) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (f64::from(pct) / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}
