// crates/gauntlet-core/src/runtime/stages/compile.rs
// ============================================================================
// Module: Gauntlet Compile Stage
// Description: Compiles the instrumented source through the runner.
// Purpose: Gate the pipeline on a clean build, feeding the fix loop on errors.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The compile stage invokes the runner's compiler on the working source.
//! Compiler errors fail the `compilation-errors` gate; while the shared
//! repair budget lasts, the workflow parks awaiting a patched source instead
//! of failing outright.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::GATE_COMPILATION_ERRORS;
use crate::core::GateOp;
use crate::core::GateResult;
use crate::core::MAX_FIX_ATTEMPTS;
use crate::core::StageName;
use crate::core::StageResult;
use crate::core::WorkflowState;
use crate::interfaces::Runner;
use crate::runtime::stage::Stage;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageOutput;
use crate::runtime::stage::StateEffect;
use crate::runtime::stage::Suspension;

// ============================================================================
// SECTION: compile
// ============================================================================

/// Compiles the working source through the runner.
pub struct Compile;

impl<R: Runner> Stage<R> for Compile {
    fn name(&self) -> StageName {
        StageName::Compile
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::InjectSafety]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        if state.active_source_path.is_some() {
            Ok(())
        } else {
            Err(vec!["no working source is recorded".to_string()])
        }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let source = state.working_source();
        let compile = match ctx.runner.compile(source) {
            Ok(compile) => compile,
            Err(err) => {
                return StageOutput::completed(StageResult::failure(
                    StageName::Compile,
                    err.to_string(),
                ));
            }
        };

        let error_count = compile.errors.len();
        let gate = GateResult::evaluate(
            GATE_COMPILATION_ERRORS,
            approximate_count(error_count),
            0.0,
            GateOp::Eq,
        );

        let errors_json: Vec<serde_json::Value> = compile
            .errors
            .iter()
            .map(|message| {
                serde_json::json!({ "line": message.line, "text": message.text })
            })
            .collect();
        let mut result = StageResult::success(StageName::Compile)
            .with_data("errors", serde_json::Value::Array(errors_json))
            .with_data("warnings", serde_json::json!(compile.warnings.len()))
            .with_gate(gate);

        if compile.success && error_count == 0 {
            let effects = compile
                .compiled_path
                .map(|path| vec![StateEffect::SetCompiledPath(path)])
                .unwrap_or_default();
            return StageOutput::completed(result).with_effects(effects);
        }

        if state.fix_attempts < MAX_FIX_ATTEMPTS {
            tracing::warn!(
                workflow = %state.workflow_id,
                errors = error_count,
                attempts = state.fix_attempts,
                "compile failed, awaiting repair patch"
            );
            return StageOutput::completed(result).and_suspend(Suspension::AwaitFix);
        }

        result.errors.push("repair budget exhausted".to_string());
        StageOutput::completed(result)
    }
}

/// Converts a count to the f64 observed-value domain of gates.
#[allow(clippy::cast_precision_loss, reason = "Compiler error counts are small.")]
fn approximate_count(count: usize) -> f64 {
    count as f64
}
