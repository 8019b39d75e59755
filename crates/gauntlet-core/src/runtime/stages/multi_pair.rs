// crates/gauntlet-core/src/runtime/stages/multi_pair.rs
// ============================================================================
// Module: Gauntlet Multi-Pair Stage
// Description: Requests sequential child workflows for additional symbols.
// Purpose: Evaluate the patched EA on other instruments, failure-isolated.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! The stage validates the multi-pair configuration and asks the engine to
//! spawn one child workflow per configured extra symbol, sequentially to
//! avoid contention on a single runner. Children start at the first stage
//! with the parent's working source and analysis parameters pre-seeded, and
//! with their own recursion disabled. Per-symbol failure is isolated; the
//! stage is informational.

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
// SECTION: multi-pair
// ============================================================================

/// Requests child workflows for the configured extra symbols.
pub struct MultiPair;

impl<R: Runner> Stage<R> for MultiPair {
    fn name(&self) -> StageName {
        StageName::MultiPair
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
        if !state.allow_multi_pair {
            let result = StageResult::success(StageName::MultiPair)
                .with_data("skipped", serde_json::json!("recursion disabled"));
            return StageOutput::completed(result);
        }

        let symbols: Vec<String> = ctx
            .config
            .multi_pair
            .symbols
            .iter()
            .filter(|symbol| !symbol.eq_ignore_ascii_case(&state.symbol))
            .cloned()
            .collect();
        if symbols.is_empty() {
            let result = StageResult::success(StageName::MultiPair)
                .with_data("skipped", serde_json::json!("no extra symbols configured"));
            return StageOutput::completed(result);
        }

        let result = StageResult::success(StageName::MultiPair)
            .with_data("symbols", serde_json::json!(symbols.clone()));
        StageOutput::completed(result).with_effects(vec![StateEffect::SpawnChildren(symbols)])
    }
}
