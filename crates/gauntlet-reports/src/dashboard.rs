// crates/gauntlet-reports/src/dashboard.rs
// ============================================================================
// Module: Dashboard Builder
// Description: Per-workflow dashboard and cross-workflow board artifacts.
// Purpose: Render evidence for the go/no-go decision.
// Dependencies: gauntlet-core, serde_json
// ============================================================================

//! ## Overview
//! `DashboardSink` implements the report contract with three artifact
//! families: `dashboard.json` plus `dashboard.md` per workflow,
//! `leaderboard.json` ranking every workflow by composite score, and
//! `summary.json` with aggregate counts. Failed workflows get the same
//! treatment as completed ones; their dashboards lead with the failed gates
//! and a diagnosis line per gate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use gauntlet_core::WorkflowState;
use gauntlet_core::WorkflowStatus;
use gauntlet_core::diagnose;
use gauntlet_core::interfaces::ReportError;
use gauntlet_core::interfaces::ReportSink;

// ============================================================================
// SECTION: Dashboard Sink
// ============================================================================

/// Full report builder.
#[derive(Debug, Default, Clone, Copy)]
pub struct DashboardSink;

impl ReportSink for DashboardSink {
    fn publish(
        &self,
        state: &WorkflowState,
        reports_dir: &Path,
    ) -> Result<Vec<PathBuf>, ReportError> {
        let dir = reports_dir.join(state.workflow_id.as_str());
        fs::create_dir_all(&dir)
            .map_err(|err| ReportError::Build(format!("create {}: {err}", dir.display())))?;

        let json_path = dir.join("dashboard.json");
        write_bytes(&json_path, &dashboard_json(state)?)?;
        let md_path = dir.join("dashboard.md");
        write_bytes(&md_path, dashboard_markdown(state).as_bytes())?;
        Ok(vec![json_path, md_path])
    }

    fn publish_boards(
        &self,
        states: &[WorkflowState],
        reports_dir: &Path,
    ) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(reports_dir).map_err(|err| {
            ReportError::Build(format!("create {}: {err}", reports_dir.display()))
        })?;

        let mut ranked: Vec<&WorkflowState> = states.iter().collect();
        ranked.sort_by(|a, b| {
            let score_a = a.composite_score.unwrap_or(0.0);
            let score_b = b.composite_score.unwrap_or(0.0);
            score_b.total_cmp(&score_a)
        });

        let leaderboard: Vec<serde_json::Value> = ranked
            .iter()
            .map(|state| {
                serde_json::json!({
                    "workflow_id": state.workflow_id.as_str(),
                    "symbol": state.symbol,
                    "timeframe": state.timeframe,
                    "status": state.status,
                    "score": state.composite_score,
                    "go_live": state.go_live,
                    "best_profit": state.best_pass.as_ref().map(|best| best.metrics.profit),
                })
            })
            .collect();
        let leaderboard_path = reports_dir.join("leaderboard.json");
        write_json(&leaderboard_path, &serde_json::Value::Array(leaderboard))?;

        let summary = serde_json::json!({
            "workflows": states.len(),
            "completed": count_status(states, WorkflowStatus::Completed),
            "failed": count_status(states, WorkflowStatus::Failed),
            "go_live": states.iter().filter(|state| state.go_live == Some(true)).count(),
        });
        let summary_path = reports_dir.join("summary.json");
        write_json(&summary_path, &summary)?;

        Ok(vec![leaderboard_path, summary_path])
    }
}

/// Counts workflows in a given status.
fn count_status(states: &[WorkflowState], status: WorkflowStatus) -> usize {
    states.iter().filter(|state| state.status == status).count()
}

// ============================================================================
// SECTION: JSON Dashboard
// ============================================================================

/// Renders the JSON dashboard record.
fn dashboard_json(state: &WorkflowState) -> Result<Vec<u8>, ReportError> {
    let gates: Vec<serde_json::Value> = state
        .gates()
        .iter()
        .map(|gate| {
            serde_json::json!({
                "name": gate.name,
                "passed": gate.passed,
                "observed": gate.observed,
                "threshold": gate.threshold,
                "op": gate.op,
                "diagnosis": if gate.passed { String::new() } else { diagnose(gate) },
            })
        })
        .collect();

    let record = serde_json::json!({
        "workflow_id": state.workflow_id.as_str(),
        "symbol": state.symbol,
        "timeframe": state.timeframe,
        "runner_handle": state.runner_handle.as_str(),
        "status": state.status,
        "go_live": state.go_live,
        "composite_score": state.composite_score,
        "fix_attempts": state.fix_attempts,
        "refine_iterations": state.refine_iterations,
        "gates": gates,
        "best_pass": state.best_pass,
        "monte_carlo": state.monte_carlo,
        "stress": state.stress,
        "forward_windows": state.forward_windows,
        "children": state.child_workflows,
        "errors": state.errors,
        "stages": state.stage_results,
        "optimization_history": state.optimization_history.len(),
    });
    serde_json::to_vec_pretty(&record)
        .map_err(|err| ReportError::Build(format!("serialize dashboard: {err}")))
}

// ============================================================================
// SECTION: Markdown Dashboard
// ============================================================================

/// Renders the operator-facing markdown digest.
#[must_use]
pub fn dashboard_markdown(state: &WorkflowState) -> String {
    let mut out = String::new();
    let verdict = match state.go_live {
        Some(true) => "GO",
        Some(false) => "NO-GO",
        None => "UNDECIDED",
    };
    let _ = writeln!(out, "# {} [{verdict}]", state.workflow_id);
    let _ = writeln!(out);
    let _ = writeln!(out, "- Symbol: {} {}", state.symbol, state.timeframe);
    let _ = writeln!(out, "- Status: {}", state.status);
    if let Some(score) = state.composite_score {
        let _ = writeln!(out, "- Go-Live Score: {score:.1} / 10");
    }
    let _ = writeln!(
        out,
        "- Repairs used: {} / 3, refinements used: {} / 2",
        state.fix_attempts, state.refine_iterations
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "## Gates");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Gate | Observed | Threshold | Outcome |");
    let _ = writeln!(out, "|---|---|---|---|");
    for gate in state.gates() {
        let outcome = if gate.passed { "pass" } else { "FAIL" };
        let _ = writeln!(
            out,
            "| {} | {:.2} | {} {:.2} | {outcome} |",
            gate.name, gate.observed, gate.op, gate.threshold
        );
    }
    let failed: Vec<_> = state.gates().into_iter().filter(|gate| !gate.passed).cloned().collect();
    if !failed.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Diagnosis");
        let _ = writeln!(out);
        for gate in &failed {
            let _ = writeln!(out, "- {}", diagnose(gate));
        }
    }

    if let Some(best) = &state.best_pass {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Best pass #{}", best.index);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "profit {:.2}, profit factor {:.2}, drawdown {:.1}%, trades {}, score {:.1}",
            best.metrics.profit,
            best.metrics.profit_factor,
            best.metrics.max_drawdown_pct,
            best.metrics.total_trades,
            best.score
        );
    }

    if let Some(mc) = &state.monte_carlo {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Monte-Carlo");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} shuffles: confidence {:.1}%, ruin {:.1}%{}",
            mc.iterations,
            mc.confidence,
            mc.ruin_probability,
            if mc.estimated_trades { " (trade list estimated)" } else { "" }
        );
        if let Some(p50) = mc.profit_percentiles.get("p50") {
            let _ = writeln!(out, "median shuffled profit {p50:.2}");
        }
    }

    if let Some(stress) = &state.stress {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Stress scenarios");
        let _ = writeln!(out);
        for scenario in &stress.scenarios {
            match (&scenario.metrics, &scenario.error) {
                (Some(metrics), _) => {
                    let _ = writeln!(
                        out,
                        "- {} ({}): profit {:.2}, drawdown {:.1}%",
                        scenario.window.label, scenario.model, metrics.profit, metrics.max_drawdown_pct
                    );
                }
                (None, Some(error)) => {
                    let _ = writeln!(out, "- {} ({}): failed: {error}", scenario.window.label, scenario.model);
                }
                (None, None) => {}
            }
        }
        for missing in &stress.missing_tick_months {
            let _ = writeln!(
                out,
                "- warning: no tick archive for {:04}-{:02}",
                missing.year, missing.month
            );
        }
    }

    if !state.child_workflows.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Multi-pair children");
        let _ = writeln!(out);
        for child in &state.child_workflows {
            let score = child
                .score
                .map_or_else(|| "n/a".to_string(), |score| format!("{score:.1}"));
            let _ = writeln!(out, "- {} ({}): score {score}", child.workflow_id, child.symbol);
        }
    }

    out
}

// ============================================================================
// SECTION: File Helpers
// ============================================================================

/// Writes a JSON artifact atomically.
fn write_json(path: &Path, value: &serde_json::Value) -> Result<(), ReportError> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| ReportError::Build(format!("serialize {}: {err}", path.display())))?;
    write_bytes(path, &bytes)
}

/// Writes bytes through a temp file and rename.
fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)
        .map_err(|err| ReportError::Build(format!("write {}: {err}", tmp.display())))?;
    fs::rename(&tmp, path)
        .map_err(|err| ReportError::Build(format!("rename {}: {err}", path.display())))
}
