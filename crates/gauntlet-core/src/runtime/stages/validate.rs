// crates/gauntlet-core/src/runtime/stages/validate.rs
// ============================================================================
// Module: Gauntlet Validation Stages
// Description: validate-trades and repair-ea stages.
// Purpose: Prove the EA trades under wide parameters; accept repair patches.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! `validate-trades` runs the EA once over the full period with the agent's
//! wide parameters, forcing permissive safety limits for this run only, and
//! gates on the minimum trade count. While the shared repair budget lasts,
//! a failed gate parks the workflow awaiting a patched source. `repair-ea`
//! is the out-of-band pause stage: it backs up the true original once,
//! writes the patch, and asks the engine to restart the pipeline with
//! counters preserved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::AgentInput;
use crate::core::GATE_MINIMUM_TRADES;
use crate::core::GateOp;
use crate::core::GateResult;
use crate::core::MAX_FIX_ATTEMPTS;
use crate::core::ParamValue;
use crate::core::SAFETY_MAX_SLIPPAGE;
use crate::core::SAFETY_MAX_SPREAD;
use crate::core::SAFETY_PERMISSIVE_PIPS;
use crate::core::StageName;
use crate::core::StageResult;
use crate::core::WorkflowState;
use crate::core::report_handle;
use crate::interfaces::Runner;
use crate::interfaces::SingleRunRequest;
use crate::runtime::stage::Stage;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageOutput;
use crate::runtime::stage::StateEffect;
use crate::runtime::stage::Suspension;
use crate::runtime::stages::period_dates;
use crate::runtime::stages::source_stem;

// ============================================================================
// SECTION: validate-trades
// ============================================================================

/// Runs the wide-parameter validation backtest.
pub struct ValidateTrades;

impl<R: Runner> Stage<R> for ValidateTrades {
    fn name(&self) -> StageName {
        StageName::ValidateTrades
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::RecordAnalyzedParams]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        let mut reasons = Vec::new();
        if state.compiled_path.is_none() {
            reasons.push("no compiled EA is recorded".to_string());
        }
        if state.wide_validation_params.is_empty() {
            reasons.push("no wide-validation parameters are recorded".to_string());
        }
        if reasons.is_empty() { Ok(()) } else { Err(reasons) }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let Some(dates) = period_dates(state, ctx.config) else {
            return StageOutput::completed(StageResult::failure(
                StageName::ValidateTrades,
                "workflow creation time is not a representable date",
            ));
        };
        let Some(compiled) = state.compiled_path.clone() else {
            return StageOutput::completed(StageResult::failure(
                StageName::ValidateTrades,
                "no compiled EA is recorded",
            ));
        };

        // Permissive safety overrides apply to this run only.
        let mut inputs = state.wide_validation_params.clone();
        inputs.insert(SAFETY_MAX_SPREAD.to_string(), ParamValue::Real(SAFETY_PERMISSIVE_PIPS));
        inputs.insert(SAFETY_MAX_SLIPPAGE.to_string(), ParamValue::Real(SAFETY_PERMISSIVE_PIPS));

        let attempt = state.fix_attempts.to_string();
        let handle = match report_handle(
            &state.workflow_id,
            &source_stem(state),
            "validate",
            Some(&attempt),
        ) {
            Ok(handle) => handle,
            Err(err) => {
                return StageOutput::completed(StageResult::failure(
                    StageName::ValidateTrades,
                    err.to_string(),
                ));
            }
        };

        let request = SingleRunRequest {
            ea_path: compiled,
            symbol: state.symbol.clone(),
            timeframe: state.timeframe.clone(),
            inputs,
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
                return StageOutput::completed(StageResult::failure(
                    StageName::ValidateTrades,
                    err.to_string(),
                ));
            }
        };

        let trades = run.metrics.total_trades;
        let gate = GateResult::evaluate(
            GATE_MINIMUM_TRADES,
            approximate_count(trades),
            approximate_count(ctx.config.gates.min_trades),
            GateOp::Gte,
        );
        let passed = gate.passed;
        let result = StageResult::success(StageName::ValidateTrades)
            .with_data("trades", serde_json::json!(trades))
            .with_data("profit", serde_json::json!(run.metrics.profit))
            .with_gate(gate);
        let output = StageOutput::completed(result)
            .with_effects(vec![StateEffect::SetValidationMetrics(run.metrics)]);

        if passed {
            return output;
        }
        if state.fix_attempts < MAX_FIX_ATTEMPTS {
            tracing::warn!(
                workflow = %state.workflow_id,
                trades,
                attempts = state.fix_attempts,
                "validation under-traded, awaiting repair patch"
            );
            return output.and_suspend(Suspension::AwaitFix);
        }
        output
    }
}

// ============================================================================
// SECTION: repair-ea
// ============================================================================

/// Accepts a patched source and restarts the pipeline.
pub struct RepairEa;

impl<R: Runner> Stage<R> for RepairEa {
    fn name(&self) -> StageName {
        StageName::RepairEa
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        if matches!(state.pending_input, Some(AgentInput::PatchedSource { .. })) {
            Ok(())
        } else {
            Err(vec!["no patched source is pending".to_string()])
        }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let Some(AgentInput::PatchedSource {
            content,
        }) = state.pending_input.clone()
        else {
            return StageOutput::completed(StageResult::failure(
                StageName::RepairEa,
                "no patched source is pending",
            ));
        };

        let mut effects = vec![StateEffect::ResetForRestart];
        let stem = source_stem(state);

        // The true original is preserved exactly once per workflow.
        if state.backup_source_path.is_none() {
            match std::fs::read_to_string(&state.ea_source_path) {
                Ok(original) => {
                    match ctx.sink.write_text(&format!("source/{stem}_original.bak"), &original) {
                        Ok(path) => effects.push(StateEffect::SetBackupSource(path)),
                        Err(err) => {
                            return StageOutput::completed(StageResult::failure(
                                StageName::RepairEa,
                                err.to_string(),
                            ));
                        }
                    }
                }
                Err(err) => {
                    return StageOutput::completed(StageResult::failure(
                        StageName::RepairEa,
                        format!("backup {}: {err}", state.ea_source_path.display()),
                    ));
                }
            }
        }

        let attempt = state.fix_attempts;
        let name = format!("source/{stem}_patched_{attempt}.mq5");
        match ctx.sink.write_text(&name, &content) {
            Ok(path) => {
                effects.push(StateEffect::SetActiveSource(path));
                effects.push(StateEffect::ClearPendingInput);
                let result = StageResult::success(StageName::RepairEa)
                    .with_data("attempt", serde_json::json!(attempt));
                StageOutput::completed(result).with_effects(effects)
            }
            Err(err) => StageOutput::completed(StageResult::failure(
                StageName::RepairEa,
                err.to_string(),
            )),
        }
    }
}

/// Converts a count to the f64 observed-value domain of gates.
#[allow(clippy::cast_precision_loss, reason = "Trade counts fit f64 mantissa range.")]
fn approximate_count(count: u64) -> f64 {
    count as f64
}
