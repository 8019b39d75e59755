// crates/gauntlet-core/src/runtime/stages/source.rs
// ============================================================================
// Module: Gauntlet Source Stages
// Description: load-ea, inject-instrumentation, and inject-safety stages.
// Purpose: Verify the EA source and produce the instrumented working copy.
// Dependencies: crate::{core, runtime, source}
// ============================================================================

//! ## Overview
//! The source stages verify the EA file exists, append the custom
//! optimization criterion, and inject the safety guards. Both injections are
//! idempotent, so a pipeline restarted after a repair patch re-applies them
//! to the patched source without duplicating code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use crate::core::GATE_FILE_EXISTS;
use crate::core::GateOp;
use crate::core::GateResult;
use crate::core::StageName;
use crate::core::StageResult;
use crate::core::WorkflowState;
use crate::interfaces::Runner;
use crate::runtime::stage::Stage;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageOutput;
use crate::runtime::stage::StateEffect;
use crate::runtime::stages::source_stem;
use crate::source::inject_instrumentation;
use crate::source::inject_safety;

// ============================================================================
// SECTION: load-ea
// ============================================================================

/// Verifies the EA source file exists.
pub struct LoadEa;

impl<R: Runner> Stage<R> for LoadEa {
    fn name(&self) -> StageName {
        StageName::LoadEa
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[]
    }

    fn preconditions(&self, _state: &WorkflowState) -> Result<(), Vec<String>> {
        Ok(())
    }

    fn execute(&self, state: &WorkflowState, _ctx: &StageContext<'_, R>) -> StageOutput {
        let source = state.working_source();
        let exists = source.is_file();
        let gate = GateResult::evaluate(
            GATE_FILE_EXISTS,
            if exists { 1.0 } else { 0.0 },
            1.0,
            GateOp::Eq,
        );
        let result = StageResult::success(StageName::LoadEa)
            .with_data("source", serde_json::json!(source.display().to_string()))
            .with_gate(gate);
        StageOutput::completed(result)
    }
}

// ============================================================================
// SECTION: inject-instrumentation
// ============================================================================

/// Appends the custom optimization criterion to the working source.
pub struct InjectInstrumentation;

impl<R: Runner> Stage<R> for InjectInstrumentation {
    fn name(&self) -> StageName {
        StageName::InjectInstrumentation
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::LoadEa]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        if state.stage_done(StageName::LoadEa) {
            Ok(())
        } else {
            Err(vec!["load-ea has not completed".to_string()])
        }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let source_path = state.working_source();
        let text = match fs::read_to_string(source_path) {
            Ok(text) => text,
            Err(err) => {
                return StageOutput::completed(StageResult::failure(
                    StageName::InjectInstrumentation,
                    format!("read {}: {err}", source_path.display()),
                ));
            }
        };

        let (instrumented, changed) =
            inject_instrumentation(&text, ctx.config.gates.exploration_min_trades);
        let extension = source_path
            .extension()
            .map_or_else(|| "mq5".to_string(), |ext| ext.to_string_lossy().into_owned());
        let name = format!("source/{}_gauntlet.{extension}", source_stem(state));
        match ctx.sink.write_text(&name, &instrumented) {
            Ok(path) => {
                let result = StageResult::success(StageName::InjectInstrumentation)
                    .with_data("changed", serde_json::json!(changed))
                    .with_data("path", serde_json::json!(path.display().to_string()));
                StageOutput::completed(result)
                    .with_effects(vec![StateEffect::SetActiveSource(path)])
            }
            Err(err) => StageOutput::completed(StageResult::failure(
                StageName::InjectInstrumentation,
                err.to_string(),
            )),
        }
    }
}

// ============================================================================
// SECTION: inject-safety
// ============================================================================

/// Injects spread/slippage guards and disables foreign side effects.
pub struct InjectSafety;

impl<R: Runner> Stage<R> for InjectSafety {
    fn name(&self) -> StageName {
        StageName::InjectSafety
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::InjectInstrumentation]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        if state.active_source_path.is_some() {
            Ok(())
        } else {
            Err(vec!["no instrumented working copy is recorded".to_string()])
        }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let source_path = state.working_source();
        let text = match fs::read_to_string(source_path) {
            Ok(text) => text,
            Err(err) => {
                return StageOutput::completed(StageResult::failure(
                    StageName::InjectSafety,
                    format!("read {}: {err}", source_path.display()),
                ));
            }
        };

        let (guarded, changed) = inject_safety(&text);
        let name = match source_path.strip_prefix(&ctx.dirs.workflow_dir) {
            Ok(relative) => relative.to_string_lossy().into_owned(),
            Err(_) => format!("source/{}_gauntlet.mq5", source_stem(state)),
        };
        match ctx.sink.write_text(&name, &guarded) {
            Ok(path) => {
                let result = StageResult::success(StageName::InjectSafety)
                    .with_data("changed", serde_json::json!(changed));
                StageOutput::completed(result)
                    .with_effects(vec![StateEffect::SetActiveSource(path)])
            }
            Err(err) => StageOutput::completed(StageResult::failure(
                StageName::InjectSafety,
                err.to_string(),
            )),
        }
    }
}
