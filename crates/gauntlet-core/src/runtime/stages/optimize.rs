// crates/gauntlet-core/src/runtime/stages/optimize.rs
// ============================================================================
// Module: Gauntlet Optimization Stages
// Description: create-ini and run-optimization stages.
// Purpose: Emit the sweep configuration and drive the long-running sweep.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! `create-ini` translates the active optimization ranges into the runner's
//! configuration file, deriving period dates from the workflow creation
//! date. `run-optimization` executes the sweep under the hard timeout with
//! heartbeat reporting, gates on pass count, and spills the normalized pass
//! table so parse-results can resume across a checkpoint boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::GATE_PASSES_FOUND;
use crate::core::GateOp;
use crate::core::GateResult;
use crate::core::StageName;
use crate::core::StageResult;
use crate::core::WorkflowState;
use crate::core::ini::SessionSettings;
use crate::core::ini::emit_sweep_ini;
use crate::core::ini::timeframe_minutes;
use crate::core::ini_date;
use crate::core::report_handle;
use crate::interfaces::Runner;
use crate::interfaces::SweepRequest;
use crate::runtime::stage::Stage;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageOutput;
use crate::runtime::stage::StateEffect;
use crate::runtime::stages::period_dates;
use crate::runtime::stages::source_stem;

// ============================================================================
// SECTION: create-ini
// ============================================================================

/// Emits the runner configuration file for the current sweep iteration.
pub struct CreateIni;

impl<R: Runner> Stage<R> for CreateIni {
    fn name(&self) -> StageName {
        StageName::CreateIni
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::ValidateTrades]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        let mut reasons = Vec::new();
        if state.optimization_ranges.is_empty() {
            reasons.push("no optimization ranges are recorded".to_string());
        }
        if state.compiled_path.is_none() {
            reasons.push("no compiled EA is recorded".to_string());
        }
        if reasons.is_empty() { Ok(()) } else { Err(reasons) }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let Some(dates) = period_dates(state, ctx.config) else {
            return StageOutput::completed(StageResult::failure(
                StageName::CreateIni,
                "workflow creation time is not a representable date",
            ));
        };
        let Some(period_minutes) = timeframe_minutes(&state.timeframe) else {
            return StageOutput::completed(StageResult::failure(
                StageName::CreateIni,
                format!("unknown timeframe token `{}`", state.timeframe),
            ));
        };
        let Some(handle) = sweep_handle(state) else {
            return StageOutput::completed(StageResult::failure(
                StageName::CreateIni,
                "could not derive the sweep report handle",
            ));
        };
        let expert = state
            .compiled_path
            .as_ref()
            .and_then(|path| path.file_name())
            .map_or_else(|| "expert.ex5".to_string(), |name| name.to_string_lossy().into_owned());

        let session = SessionSettings {
            expert,
            symbol: state.symbol.clone(),
            period_minutes,
            from_date: dates.start,
            to_date: dates.end,
            forward_date: dates.forward,
            model: ctx.config.data.model,
            latency_ms: ctx.config.data.execution_latency_ms,
            report_handle: handle.clone(),
            deposit: ctx.config.account.deposit,
            currency: ctx.config.account.currency.clone(),
            leverage: ctx.config.account.leverage,
        };
        let ini = emit_sweep_ini(&session, &state.optimization_ranges);
        let name = format!("ini/sweep_{}.ini", state.refine_iterations);
        match ctx.sink.write_text(&name, &ini) {
            Ok(path) => {
                let result = StageResult::success(StageName::CreateIni)
                    .with_data("report_handle", serde_json::json!(handle))
                    .with_data("from", serde_json::json!(ini_date(dates.start)))
                    .with_data("forward", serde_json::json!(ini_date(dates.forward)))
                    .with_data("to", serde_json::json!(ini_date(dates.end)));
                StageOutput::completed(result).with_effects(vec![StateEffect::SetIniPath(path)])
            }
            Err(err) => StageOutput::completed(StageResult::failure(
                StageName::CreateIni,
                err.to_string(),
            )),
        }
    }
}

/// Derives the deterministic report handle for the current sweep iteration.
fn sweep_handle(state: &WorkflowState) -> Option<String> {
    let iteration = state.refine_iterations.to_string();
    report_handle(&state.workflow_id, &source_stem(state), "sweep", Some(&iteration)).ok()
}

// ============================================================================
// SECTION: run-optimization
// ============================================================================

/// Executes the optimization sweep.
pub struct RunOptimization;

impl<R: Runner> Stage<R> for RunOptimization {
    fn name(&self) -> StageName {
        StageName::RunOptimization
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::CreateIni]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        if state.ini_path.is_some() {
            Ok(())
        } else {
            Err(vec!["no sweep configuration file is recorded".to_string()])
        }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let Some(dates) = period_dates(state, ctx.config) else {
            return StageOutput::completed(StageResult::failure(
                StageName::RunOptimization,
                "workflow creation time is not a representable date",
            ));
        };
        let Some(compiled) = state.compiled_path.clone() else {
            return StageOutput::completed(StageResult::failure(
                StageName::RunOptimization,
                "no compiled EA is recorded",
            ));
        };
        let Some(handle) = sweep_handle(state) else {
            return StageOutput::completed(StageResult::failure(
                StageName::RunOptimization,
                "could not derive the sweep report handle",
            ));
        };

        let request = SweepRequest {
            ea_path: compiled,
            symbol: state.symbol.clone(),
            timeframe: state.timeframe.clone(),
            ranges: state.optimization_ranges.clone(),
            period_start: dates.start,
            forward_date: dates.forward,
            period_end: dates.end,
            model: ctx.config.data.model,
            latency_ms: ctx.config.data.execution_latency_ms,
            report_handle: handle,
            deposit: ctx.config.account.deposit,
            currency: ctx.config.account.currency.clone(),
            leverage: ctx.config.account.leverage,
            timeout_secs: ctx.config.optimization.sweep_timeout_secs,
            heartbeat_secs: ctx.config.optimization.heartbeat_secs,
        };

        tracing::info!(
            workflow = %state.workflow_id,
            iteration = state.refine_iterations,
            timeout_secs = request.timeout_secs,
            "starting optimization sweep"
        );
        let sweep = match ctx.runner.run_sweep(&request, ctx.progress) {
            Ok(sweep) => sweep,
            Err(err) => {
                return StageOutput::completed(StageResult::failure(
                    StageName::RunOptimization,
                    err.to_string(),
                ));
            }
        };

        let gate = GateResult::evaluate(
            GATE_PASSES_FOUND,
            approximate_count(sweep.pass_count),
            1.0,
            GateOp::Gte,
        );
        let table_json = match serde_json::to_value(&sweep.passes) {
            Ok(value) => value,
            Err(err) => {
                return StageOutput::completed(StageResult::failure(
                    StageName::RunOptimization,
                    format!("serialize pass table: {err}"),
                ));
            }
        };
        let table_name = format!("sweep/passes_{}.json", state.refine_iterations);
        match ctx.sink.write_json(&table_name, &table_json) {
            Ok(table) => {
                let result = StageResult::success(StageName::RunOptimization)
                    .with_data("pass_count", serde_json::json!(sweep.pass_count))
                    .with_gate(gate);
                StageOutput::completed(result).with_effects(vec![
                    StateEffect::SetSweepArtifacts {
                        artifact: sweep.artifact_path,
                        table,
                    },
                ])
            }
            Err(err) => StageOutput::completed(StageResult::failure(
                StageName::RunOptimization,
                err.to_string(),
            )),
        }
    }
}

/// Converts a count to the f64 observed-value domain of gates.
#[allow(clippy::cast_precision_loss, reason = "Pass counts fit f64 mantissa range.")]
fn approximate_count(count: u64) -> f64 {
    count as f64
}
