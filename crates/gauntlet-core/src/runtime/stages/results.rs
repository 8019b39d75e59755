// crates/gauntlet-core/src/runtime/stages/results.rs
// ============================================================================
// Module: Gauntlet Result Stages
// Description: parse-results, analyze-and-refine, and select-passes stages.
// Purpose: Filter and score the sweep, drive refinement, and pick passes.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! `parse-results` loads the spilled pass table, applies the adaptive
//! minimum-trades filter, scores and sorts survivors. `analyze-and-refine`
//! computes toggle dominance and numeric clustering over the top passes and
//! either proceeds, parks for a decision, or archives the iteration and
//! re-enters the sweep with refined ranges (hard cap of two refinements).
//! `select-passes` picks the confirmation set autonomously or from an
//! external selection, deduplicating identical parameter assignments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::AgentInput;
use crate::core::ClusterAnalysis;
use crate::core::ClusterRecommendation;
use crate::core::GauntletConfig;
use crate::core::OptimizationRange;
use crate::core::ParamAnalysis;
use crate::core::ParamKind;
use crate::core::Pass;
use crate::core::RangeDirective;
use crate::core::RefineDecision;
use crate::core::RefinementAnalysis;
use crate::core::ScoreInputs;
use crate::core::ScoredPass;
use crate::core::StageName;
use crate::core::StageResult;
use crate::core::ToggleAnalysis;
use crate::core::ToggleRecommendation;
use crate::core::WorkflowState;
use crate::core::composite_score;
use crate::interfaces::Runner;
use crate::runtime::stage::Stage;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageOutput;
use crate::runtime::stage::StateEffect;
use crate::runtime::stage::Suspension;

// ============================================================================
// SECTION: parse-results
// ============================================================================

/// Filters, scores, and sorts the sweep passes.
pub struct ParseResults;

impl<R: Runner> Stage<R> for ParseResults {
    fn name(&self) -> StageName {
        StageName::ParseResults
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::RunOptimization]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        if state.pass_table_path.is_some() {
            Ok(())
        } else {
            Err(vec!["no spilled pass table is recorded".to_string()])
        }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let Some(table_path) = state.pass_table_path.clone() else {
            return StageOutput::completed(StageResult::failure(
                StageName::ParseResults,
                "no spilled pass table is recorded",
            ));
        };
        let passes = match load_passes(&table_path) {
            Ok(passes) => passes,
            Err(err) => {
                return StageOutput::completed(StageResult::failure(StageName::ParseResults, err));
            }
        };

        let threshold = adaptive_min_trades(state.validation_trades(), ctx.config);
        let total = passes.len();
        let mut scored: Vec<ScoredPass> = passes
            .into_iter()
            .filter(|pass| pass.trades >= threshold)
            .map(|pass| {
                let score = composite_score(&ScoreInputs::from_pass(&pass));
                ScoredPass {
                    pass,
                    score,
                }
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score.total_cmp(&a.score).then_with(|| a.pass.index.cmp(&b.pass.index))
        });

        if scored.is_empty() {
            return StageOutput::completed(StageResult::failure(
                StageName::ParseResults,
                format!("no pass met the adaptive trade floor of {threshold}"),
            ));
        }

        let kept = scored.len() as u64;
        let scored_json = match serde_json::to_value(&scored) {
            Ok(value) => value,
            Err(err) => {
                return StageOutput::completed(StageResult::failure(
                    StageName::ParseResults,
                    format!("serialize scored table: {err}"),
                ));
            }
        };
        let name = format!("sweep/scored_{}.json", state.refine_iterations);
        match ctx.sink.write_json(&name, &scored_json) {
            Ok(path) => {
                let result = StageResult::success(StageName::ParseResults)
                    .with_data("total", serde_json::json!(total))
                    .with_data("kept", serde_json::json!(kept))
                    .with_data("min_trades", serde_json::json!(threshold));
                StageOutput::completed(result).with_effects(vec![StateEffect::SetScoredTable {
                    path,
                    kept,
                }])
            }
            Err(err) => StageOutput::completed(StageResult::failure(
                StageName::ParseResults,
                err.to_string(),
            )),
        }
    }
}

/// Derives the adaptive minimum-trades floor for pass filtering.
///
/// The floor tracks the validation run: an EA that naturally trades less on
/// the target instrument is not rejected wholesale. Falls back to the
/// configured gate floor when no validation trade count is recorded.
#[must_use]
pub fn adaptive_min_trades(validation_trades: Option<u64>, config: &GauntletConfig) -> u64 {
    let floor = config.gates.min_trades;
    let exploration = config.gates.exploration_min_trades;
    validation_trades.map_or(floor, |observed| {
        let scaled = observed * 4 / 5;
        floor.min(exploration.max(scaled))
    })
}

/// Loads the spilled pass table.
fn load_passes(path: &Path) -> Result<Vec<Pass>, String> {
    let text = fs::read_to_string(path).map_err(|err| format!("read {}: {err}", path.display()))?;
    serde_json::from_str(&text).map_err(|err| format!("parse {}: {err}", path.display()))
}

/// Loads the spilled scored table.
fn load_scored(path: &Path) -> Result<Vec<ScoredPass>, String> {
    let text = fs::read_to_string(path).map_err(|err| format!("read {}: {err}", path.display()))?;
    serde_json::from_str(&text).map_err(|err| format!("parse {}: {err}", path.display()))
}

// ============================================================================
// SECTION: analyze-and-refine
// ============================================================================

/// Analyzes top passes and decides on range refinement.
pub struct AnalyzeAndRefine;

impl<R: Runner> Stage<R> for AnalyzeAndRefine {
    fn name(&self) -> StageName {
        StageName::AnalyzeAndRefine
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::ParseResults]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        if state.scored_table_path.is_some() {
            Ok(())
        } else {
            Err(vec!["no scored pass table is recorded".to_string()])
        }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        // An externally-supplied decision takes precedence over re-analysis.
        if let Some(AgentInput::Refine {
            decision,
        }) = state.pending_input.clone()
        {
            return apply_decision(state, decision);
        }

        let Some(scored_path) = state.scored_table_path.clone() else {
            return StageOutput::completed(StageResult::failure(
                StageName::AnalyzeAndRefine,
                "no scored pass table is recorded",
            ));
        };
        let scored = match load_scored(&scored_path) {
            Ok(scored) => scored,
            Err(err) => {
                return StageOutput::completed(StageResult::failure(
                    StageName::AnalyzeAndRefine,
                    err,
                ));
            }
        };

        let analysis = analyze_passes(&scored, state, ctx.config);
        if analysis.recommend_refine {
            let suggested = analysis.suggested_ranges.clone();
            if ctx.config.behavior.auto_refine_decision {
                let result = StageResult::success(StageName::AnalyzeAndRefine)
                    .with_data("decision", serde_json::json!("refine"))
                    .with_data("iteration", serde_json::json!(state.refine_iterations + 1));
                return StageOutput::completed(result).with_effects(vec![
                    StateEffect::SetRefinement(analysis),
                    StateEffect::ApplyRefinedRanges(suggested),
                ]);
            }
            return StageOutput::suspended(Suspension::AwaitRefineDecision)
                .with_effects(vec![StateEffect::SetRefinement(analysis)]);
        }

        let decision = if analysis.forced_proceed { "forced-proceed" } else { "proceed" };
        let result = StageResult::success(StageName::AnalyzeAndRefine)
            .with_data("decision", serde_json::json!(decision));
        StageOutput::completed(result).with_effects(vec![StateEffect::SetRefinement(analysis)])
    }
}

/// Applies an externally-supplied refine decision.
fn apply_decision(state: &WorkflowState, decision: RefineDecision) -> StageOutput {
    match decision {
        RefineDecision::Proceed => {
            let result = StageResult::success(StageName::AnalyzeAndRefine)
                .with_data("decision", serde_json::json!("proceed"));
            StageOutput::completed(result).with_effects(vec![StateEffect::ClearPendingInput])
        }
        RefineDecision::Refine {
            ranges,
        } => {
            if state.refine_iterations >= crate::core::MAX_REFINE_ITERATIONS {
                let result = StageResult::success(StageName::AnalyzeAndRefine)
                    .with_data("decision", serde_json::json!("forced-proceed"));
                return StageOutput::completed(result)
                    .with_effects(vec![StateEffect::ClearPendingInput]);
            }
            let result = StageResult::success(StageName::AnalyzeAndRefine)
                .with_data("decision", serde_json::json!("refine"))
                .with_data("iteration", serde_json::json!(state.refine_iterations + 1));
            StageOutput::completed(result).with_effects(vec![
                StateEffect::ClearPendingInput,
                StateEffect::ApplyRefinedRanges(ranges),
            ])
        }
    }
}

// ============================================================================
// SECTION: Analysis
// ============================================================================

/// Computes the per-parameter refinement analysis over the scored passes.
#[must_use]
pub fn analyze_passes(
    scored: &[ScoredPass],
    state: &WorkflowState,
    config: &GauntletConfig,
) -> RefinementAnalysis {
    let top_n = config.optimization.top_n_display.min(scored.len());
    let top = &scored[..top_n];
    let enough = scored.len() as u64 >= config.refinement.min_valid_passes;

    let mut params = Vec::new();
    let mut suggested = Vec::new();
    for range in &state.optimization_ranges {
        if !range.optimize() {
            suggested.push(range.clone());
            continue;
        }
        let kind = state
            .parameters
            .iter()
            .find(|param| param.name == range.name)
            .map_or(ParamKind::Real, |param| param.kind);

        if kind == ParamKind::Boolean {
            let analysis =
                analyze_toggle(&range.name, top, scored, config.refinement.toggle_dominance_threshold);
            suggested.push(apply_toggle(range, analysis.recommendation));
            params.push(ParamAnalysis {
                name: range.name.clone(),
                toggle: Some(analysis),
                cluster: None,
            });
        } else {
            let analysis =
                analyze_cluster(range, top, scored, config.refinement.clustering_cv_threshold);
            suggested.push(apply_cluster(range, &analysis.recommendation));
            params.push(ParamAnalysis {
                name: range.name.clone(),
                toggle: None,
                cluster: Some(analysis),
            });
        }
    }

    let any_change = params.iter().any(ParamAnalysis::recommends_change);
    let budget_left = state.refine_iterations < config.refinement.max_iterations.min(crate::core::MAX_REFINE_ITERATIONS);
    RefinementAnalysis {
        params,
        recommend_refine: any_change && budget_left && enough,
        forced_proceed: any_change && !budget_left,
        suggested_ranges: suggested,
    }
}

/// Analyzes value dominance for one boolean toggle.
fn analyze_toggle(
    name: &str,
    top: &[ScoredPass],
    all: &[ScoredPass],
    dominance: f64,
) -> ToggleAnalysis {
    let top_share = share_true(name, top);
    let all_share = share_true(name, all);
    let recommendation = if top_share >= dominance {
        ToggleRecommendation::FixTrue
    } else if 1.0 - top_share >= dominance {
        ToggleRecommendation::FixFalse
    } else {
        ToggleRecommendation::Keep
    };
    ToggleAnalysis {
        top_share_true: top_share,
        all_share_true: all_share,
        recommendation,
    }
}

/// Fraction of passes with the toggle set, over a pass slice.
#[allow(clippy::cast_precision_loss, reason = "Pass counts fit f64 mantissa range.")]
fn share_true(name: &str, passes: &[ScoredPass]) -> f64 {
    if passes.is_empty() {
        return 0.0;
    }
    let set = passes
        .iter()
        .filter(|entry| {
            entry
                .pass
                .inputs
                .get(name)
                .and_then(|value| value.as_f64())
                .is_some_and(|value| value >= 0.5)
        })
        .count();
    set as f64 / passes.len() as f64
}

/// Analyzes clustering for one numeric parameter.
#[allow(clippy::cast_precision_loss, reason = "Pass counts fit f64 mantissa range.")]
fn analyze_cluster(
    range: &OptimizationRange,
    top: &[ScoredPass],
    all: &[ScoredPass],
    cv_threshold: f64,
) -> ClusterAnalysis {
    let top_values = numeric_values(&range.name, top);
    let all_values = numeric_values(&range.name, all);
    let distinct = distinct_count(&all_values);

    if top_values.is_empty() {
        return ClusterAnalysis {
            mean: 0.0,
            stddev: 0.0,
            cv: 0.0,
            distinct_values: distinct,
            recommendation: ClusterRecommendation::Keep,
        };
    }

    let mean = top_values.iter().sum::<f64>() / top_values.len() as f64;
    let variance = top_values.iter().map(|value| (value - mean).powi(2)).sum::<f64>()
        / top_values.len() as f64;
    let stddev = variance.sqrt();
    let cv = if mean.abs() > f64::EPSILON { stddev / mean.abs() } else { 0.0 };

    let recommendation = if distinct <= 2 {
        ClusterRecommendation::Widen
    } else if cv < cv_threshold {
        narrow_recommendation(range, &top_values)
    } else {
        ClusterRecommendation::Keep
    };

    ClusterAnalysis {
        mean,
        stddev,
        cv,
        distinct_values: distinct,
        recommendation,
    }
}

/// Builds the narrowed-range recommendation from the top-N value span.
fn narrow_recommendation(range: &OptimizationRange, values: &[f64]) -> ClusterRecommendation {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let current_step = match &range.directive {
        RangeDirective::Sweep {
            step, ..
        } => *step,
        RangeDirective::Fixed {
            ..
        } => 1.0,
    };
    let step = (current_step / 2.0).max(f64::EPSILON);
    if max - min < step {
        return ClusterRecommendation::Keep;
    }
    ClusterRecommendation::Narrow {
        start: min,
        step,
        stop: max,
    }
}

/// Extracts numeric values for a parameter across passes.
fn numeric_values(name: &str, passes: &[ScoredPass]) -> Vec<f64> {
    passes
        .iter()
        .filter_map(|entry| entry.pass.inputs.get(name).and_then(|value| value.as_f64()))
        .collect()
}

/// Counts distinct values with bitwise f64 identity.
fn distinct_count(values: &[f64]) -> u64 {
    let mut seen: Vec<u64> = Vec::new();
    for value in values {
        let bits = value.to_bits();
        if !seen.contains(&bits) {
            seen.push(bits);
        }
    }
    seen.len() as u64
}

/// Applies a toggle recommendation to its range.
fn apply_toggle(
    range: &OptimizationRange,
    recommendation: ToggleRecommendation,
) -> OptimizationRange {
    match recommendation {
        ToggleRecommendation::FixTrue => OptimizationRange::fixed(
            range.name.clone(),
            crate::core::ParamValue::Boolean(true),
        ),
        ToggleRecommendation::FixFalse => OptimizationRange::fixed(
            range.name.clone(),
            crate::core::ParamValue::Boolean(false),
        ),
        ToggleRecommendation::Keep => range.clone(),
    }
}

/// Applies a clustering recommendation to its range.
fn apply_cluster(
    range: &OptimizationRange,
    recommendation: &ClusterRecommendation,
) -> OptimizationRange {
    match recommendation {
        ClusterRecommendation::Narrow {
            start,
            step,
            stop,
        } => OptimizationRange::sweep(range.name.clone(), *start, *step, *stop),
        ClusterRecommendation::Widen => match &range.directive {
            RangeDirective::Sweep {
                start,
                step,
                stop,
            } => {
                let span = (stop - start).max(*step);
                let widened_start = if *start >= 0.0 { (start - span).max(0.0) } else { start - span };
                OptimizationRange::sweep(range.name.clone(), widened_start, *step, stop + span)
            }
            RangeDirective::Fixed {
                ..
            } => range.clone(),
        },
        ClusterRecommendation::Keep => range.clone(),
    }
}

// ============================================================================
// SECTION: select-passes
// ============================================================================

/// Selects the confirmation backtest set.
pub struct SelectPasses;

impl<R: Runner> Stage<R> for SelectPasses {
    fn name(&self) -> StageName {
        StageName::SelectPasses
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::AnalyzeAndRefine]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        if state.scored_table_path.is_some() {
            Ok(())
        } else {
            Err(vec!["no scored pass table is recorded".to_string()])
        }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let Some(scored_path) = state.scored_table_path.clone() else {
            return StageOutput::completed(StageResult::failure(
                StageName::SelectPasses,
                "no scored pass table is recorded",
            ));
        };
        let scored = match load_scored(&scored_path) {
            Ok(scored) => scored,
            Err(err) => {
                return StageOutput::completed(StageResult::failure(StageName::SelectPasses, err));
            }
        };

        if let Some(AgentInput::Selection {
            indices,
        }) = state.pending_input.clone()
        {
            let mut selected = Vec::new();
            for index in &indices {
                let Some(entry) = scored.iter().find(|entry| entry.pass.index == *index) else {
                    return StageOutput::completed(StageResult::failure(
                        StageName::SelectPasses,
                        format!("selection refers to unknown pass index {index}"),
                    ));
                };
                selected.push(entry.clone());
            }
            let result = StageResult::success(StageName::SelectPasses)
                .with_data("selected", serde_json::json!(selected.len()))
                .with_data("mode", serde_json::json!("external"));
            return StageOutput::completed(result).with_effects(vec![
                StateEffect::SetSelectedPasses(selected),
                StateEffect::ClearPendingInput,
            ]);
        }

        if !ctx.config.behavior.auto_selection {
            return StageOutput::suspended(Suspension::AwaitSelection);
        }

        let selected = dedupe_by_inputs(&scored, ctx.config.optimization.top_n_backtest);
        let result = StageResult::success(StageName::SelectPasses)
            .with_data("selected", serde_json::json!(selected.len()))
            .with_data("mode", serde_json::json!("auto"));
        StageOutput::completed(result)
            .with_effects(vec![StateEffect::SetSelectedPasses(selected)])
    }
}

/// Takes the top passes by score, skipping duplicate parameter assignments.
#[must_use]
pub fn dedupe_by_inputs(scored: &[ScoredPass], limit: usize) -> Vec<ScoredPass> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for entry in scored {
        let key = assignment_key(&entry.pass.inputs);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(entry.clone());
        if out.len() == limit {
            break;
        }
    }
    out
}

/// Canonical string key for an input assignment.
fn assignment_key(inputs: &BTreeMap<String, crate::core::ParamValue>) -> String {
    let mut key = String::new();
    for (name, value) in inputs {
        key.push_str(name);
        key.push('=');
        key.push_str(&value.ini_value());
        key.push(';');
    }
    key
}
