// crates/gauntlet-core/src/runtime/stages/reports.rs
// ============================================================================
// Module: Gauntlet Report Stage
// Description: Produces report artifacts and the go-live verdict.
// Purpose: Guarantee every finished workflow leaves evidence behind.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The report stage always runs, whatever the upstream gates decided. It
//! derives the go-live verdict (every critical gate passed and a best pass
//! exists), publishes the per-workflow dashboard, and refreshes the
//! cross-workflow boards from the peer states the engine supplies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::StageName;
use crate::core::StageResult;
use crate::core::WorkflowState;
use crate::interfaces::Runner;
use crate::runtime::stage::Stage;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageOutput;
use crate::runtime::stage::StateEffect;

// ============================================================================
// SECTION: generate-reports
// ============================================================================

/// Produces the report artifacts and the go-live verdict.
pub struct GenerateReports;

impl<R: Runner> Stage<R> for GenerateReports {
    fn name(&self) -> StageName {
        StageName::GenerateReports
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[]
    }

    fn preconditions(&self, _state: &WorkflowState) -> Result<(), Vec<String>> {
        Ok(())
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let score = state.best_pass.as_ref().map(|best| best.score);
        let go_live = verdict(state);

        // Publish from a preview carrying the verdict the effects will record.
        let mut preview = state.clone();
        preview.composite_score = score;
        preview.go_live = Some(go_live);

        let mut result = StageResult::success(StageName::GenerateReports)
            .with_data("go_live", serde_json::json!(go_live))
            .with_data("score", serde_json::json!(score));

        match ctx.reports.publish(&preview, &ctx.dirs.reports_dir) {
            Ok(artifacts) => {
                let paths: Vec<String> =
                    artifacts.iter().map(|path| path.display().to_string()).collect();
                result = result.with_data("artifacts", serde_json::json!(paths));
            }
            Err(err) => {
                result.success = false;
                result.errors.push(err.to_string());
                return StageOutput::completed(result);
            }
        }

        let mut boards_input: Vec<WorkflowState> = ctx
            .peers
            .iter()
            .filter(|peer| peer.workflow_id != state.workflow_id)
            .cloned()
            .collect();
        boards_input.push(preview);
        if let Err(err) = ctx.reports.publish_boards(&boards_input, &ctx.dirs.reports_dir) {
            // Board refresh failures never invalidate the workflow's own report.
            tracing::warn!(workflow = %state.workflow_id, error = %err, "board refresh failed");
            result.errors.push(err.to_string());
        }

        StageOutput::completed(result).with_effects(vec![StateEffect::SetVerdict {
            score,
            go_live,
        }])
    }
}

/// Derives the go-live verdict: a best pass exists and every recorded
/// critical gate passed, including the best pass's own gates.
#[must_use]
pub fn verdict(state: &WorkflowState) -> bool {
    let Some(best) = state.best_pass.as_ref() else {
        return false;
    };
    let critical_ok = state.gates().iter().all(|gate| gate.passed);
    critical_ok && best.gates_passed()
}
