// crates/gauntlet-core/src/runtime/stages/backtest.rs
// ============================================================================
// Module: Gauntlet Confirmation Backtest Stage
// Description: Re-runs each selected pass and picks the best one.
// Purpose: Confirm sweep results with full-period runs and per-pass gates.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Each selected pass re-runs over the full period with the pinned safety
//! defaults. Per-pass gates check profit factor, drawdown, and trade count;
//! the best pass is chosen by the configured selection metric among the
//! passes that met their gates. The stage is gate-fatal: when no pass meets
//! the gates the workflow fails, though reports are still generated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::BacktestedPass;
use crate::core::BestPassMetric;
use crate::core::GATE_MAX_DRAWDOWN;
use crate::core::GATE_MINIMUM_TRADES;
use crate::core::GATE_PROFIT_FACTOR;
use crate::core::GateOp;
use crate::core::GateResult;
use crate::core::ScoreInputs;
use crate::core::StageName;
use crate::core::StageResult;
use crate::core::WorkflowState;
use crate::core::composite_score;
use crate::core::report_handle;
use crate::interfaces::Runner;
use crate::interfaces::SingleRunRequest;
use crate::runtime::stage::Stage;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageOutput;
use crate::runtime::stage::StateEffect;
use crate::runtime::stages::period_dates;
use crate::runtime::stages::source_stem;
use crate::runtime::stages::with_pinned_safety;

// ============================================================================
// SECTION: backtest-selected
// ============================================================================

/// Re-runs each selected pass over the full period.
pub struct BacktestSelected;

impl<R: Runner> Stage<R> for BacktestSelected {
    fn name(&self) -> StageName {
        StageName::BacktestSelected
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::SelectPasses]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        let mut reasons = Vec::new();
        if state.selected_passes.is_empty() {
            reasons.push("no passes are selected".to_string());
        }
        if state.compiled_path.is_none() {
            reasons.push("no compiled EA is recorded".to_string());
        }
        if reasons.is_empty() { Ok(()) } else { Err(reasons) }
    }

    #[allow(
        clippy::too_many_lines,
        reason = "Single linear flow over the selected passes keeps run accounting auditable."
    )]
    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let Some(dates) = period_dates(state, ctx.config) else {
            return StageOutput::completed(StageResult::failure(
                StageName::BacktestSelected,
                "workflow creation time is not a representable date",
            ));
        };
        let Some(compiled) = state.compiled_path.clone() else {
            return StageOutput::completed(StageResult::failure(
                StageName::BacktestSelected,
                "no compiled EA is recorded",
            ));
        };

        let stem = source_stem(state);
        let mut backtested = Vec::new();
        let mut run_errors = Vec::new();

        for entry in &state.selected_passes {
            let disambiguator = entry.pass.index.to_string();
            let handle = match report_handle(
                &state.workflow_id,
                &stem,
                "backtest",
                Some(&disambiguator),
            ) {
                Ok(handle) => handle,
                Err(err) => {
                    run_errors.push(format!("pass {}: {err}", entry.pass.index));
                    continue;
                }
            };
            let request = SingleRunRequest {
                ea_path: compiled.clone(),
                symbol: state.symbol.clone(),
                timeframe: state.timeframe.clone(),
                inputs: with_pinned_safety(&entry.pass.inputs),
                period_start: dates.start,
                period_end: dates.end,
                latency_ms: ctx.config.data.execution_latency_ms,
                model: ctx.config.data.model,
                report_handle: handle,
                deposit: ctx.config.account.deposit,
                currency: ctx.config.account.currency.clone(),
                leverage: ctx.config.account.leverage,
                timeout_secs: ctx.config.optimization.sweep_timeout_secs / 10,
            };
            let run = match ctx.runner.run_single(&request) {
                Ok(run) => run,
                Err(err) => {
                    run_errors.push(format!("pass {}: {err}", entry.pass.index));
                    continue;
                }
            };

            let gates = per_pass_gates(&run.metrics, ctx.config);
            let score = composite_score(&ScoreInputs::from_metrics(
                &run.metrics,
                entry.pass.profit_back,
                entry.pass.profit_forward,
            ));
            let pass = BacktestedPass {
                index: entry.pass.index,
                inputs: entry.pass.inputs.clone(),
                metrics: run.metrics,
                score,
                gates,
            };
            backtested.push((pass, run.trades));
        }

        let metric = ctx.config.selection.best_pass_metric;
        let best = backtested
            .iter()
            .filter(|(pass, _)| pass.gates_passed())
            .max_by(|(a, _), (b, _)| selection_value(a, metric).total_cmp(&selection_value(b, metric)))
            .map(|(pass, trades)| (pass.clone(), trades.clone()));

        let passes: Vec<BacktestedPass> = backtested.into_iter().map(|(pass, _)| pass).collect();
        let passing = passes.iter().filter(|pass| pass.gates_passed()).count();

        let mut result = StageResult::success(StageName::BacktestSelected)
            .with_data("backtested", serde_json::json!(passes.len()))
            .with_data("passing", serde_json::json!(passing));
        result.errors.extend(run_errors);

        let Some((best_pass, trades)) = best else {
            result.success = false;
            result.errors.push("no backtested pass met the gates".to_string());
            return StageOutput::completed(result).with_effects(vec![
                StateEffect::SetBacktested {
                    passes,
                    best: None,
                    trades_path: None,
                },
            ]);
        };

        let trades_json = match serde_json::to_value(&trades) {
            Ok(value) => value,
            Err(err) => {
                result.success = false;
                result.errors.push(format!("serialize best-pass trades: {err}"));
                return StageOutput::completed(result);
            }
        };
        let trades_path = match ctx.sink.write_json("backtest/best_trades.json", &trades_json) {
            Ok(path) => Some(path),
            Err(err) => {
                result.errors.push(err.to_string());
                None
            }
        };

        result = result
            .with_data("best_index", serde_json::json!(best_pass.index))
            .with_data("best_score", serde_json::json!(best_pass.score))
            .with_data("best_profit", serde_json::json!(best_pass.metrics.profit));
        StageOutput::completed(result).with_effects(vec![StateEffect::SetBacktested {
            passes,
            best: Some(best_pass),
            trades_path,
        }])
    }
}

/// Evaluates the per-pass gates over confirmation metrics.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Trade counts fit f64 mantissa range.")]
pub fn per_pass_gates(
    metrics: &crate::core::TradeMetrics,
    config: &crate::core::GauntletConfig,
) -> Vec<GateResult> {
    vec![
        GateResult::evaluate(
            GATE_PROFIT_FACTOR,
            metrics.profit_factor,
            config.gates.min_profit_factor,
            GateOp::Gte,
        ),
        GateResult::evaluate(
            GATE_MAX_DRAWDOWN,
            metrics.max_drawdown_pct,
            config.gates.max_drawdown_pct,
            GateOp::Lte,
        ),
        GateResult::evaluate(
            GATE_MINIMUM_TRADES,
            metrics.total_trades as f64,
            config.gates.min_trades as f64,
            GateOp::Gte,
        ),
    ]
}

/// Returns the configured selection value for a backtested pass.
fn selection_value(pass: &BacktestedPass, metric: BestPassMetric) -> f64 {
    match metric {
        BestPassMetric::Score => pass.score,
        BestPassMetric::Profit => pass.metrics.profit,
    }
}
