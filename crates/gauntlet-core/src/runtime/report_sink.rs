// crates/gauntlet-core/src/runtime/report_sink.rs
// ============================================================================
// Module: Gauntlet JSON Report Sink
// Description: Minimal JSON report sink for tests and headless runs.
// Purpose: Guarantee a report artifact exists even without the full builder.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! The JSON report sink writes one dashboard record per workflow plus plain
//! leaderboard and summary boards. The full artifact builder with per-pass
//! tables lives in `gauntlet-reports`; this sink keeps the engine's
//! always-produce-a-report guarantee intact for tests and minimal installs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use crate::core::WorkflowState;
use crate::core::diagnose;
use crate::interfaces::ReportError;
use crate::interfaces::ReportSink;

// ============================================================================
// SECTION: JSON Report Sink
// ============================================================================

/// Minimal JSON report sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReportSink;

impl ReportSink for JsonReportSink {
    fn publish(
        &self,
        state: &WorkflowState,
        reports_dir: &Path,
    ) -> Result<Vec<PathBuf>, ReportError> {
        let dir = reports_dir.join(state.workflow_id.as_str());
        fs::create_dir_all(&dir)
            .map_err(|err| ReportError::Build(format!("create {}: {err}", dir.display())))?;

        let failed_gates: Vec<serde_json::Value> = state
            .gates()
            .iter()
            .filter(|gate| !gate.passed)
            .map(|gate| {
                serde_json::json!({
                    "name": gate.name,
                    "observed": gate.observed,
                    "threshold": gate.threshold,
                    "diagnosis": diagnose(gate),
                })
            })
            .collect();
        let dashboard = serde_json::json!({
            "workflow_id": state.workflow_id.as_str(),
            "symbol": state.symbol,
            "timeframe": state.timeframe,
            "status": state.status,
            "go_live": state.go_live,
            "composite_score": state.composite_score,
            "fix_attempts": state.fix_attempts,
            "refine_iterations": state.refine_iterations,
            "failed_gates": failed_gates,
            "stages": state.stage_results,
        });

        let path = dir.join("dashboard.json");
        write_json(&path, &dashboard)?;
        Ok(vec![path])
    }

    fn publish_boards(
        &self,
        states: &[WorkflowState],
        reports_dir: &Path,
    ) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(reports_dir).map_err(|err| {
            ReportError::Build(format!("create {}: {err}", reports_dir.display()))
        })?;

        let mut rows: Vec<serde_json::Value> = states
            .iter()
            .map(|state| {
                serde_json::json!({
                    "workflow_id": state.workflow_id.as_str(),
                    "symbol": state.symbol,
                    "status": state.status,
                    "score": state.composite_score,
                    "go_live": state.go_live,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            let score_a = a.get("score").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
            let score_b = b.get("score").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
            score_b.total_cmp(&score_a)
        });

        let leaderboard = reports_dir.join("leaderboard.json");
        write_json(&leaderboard, &serde_json::Value::Array(rows.clone()))?;

        let completed = states
            .iter()
            .filter(|state| state.status == crate::core::WorkflowStatus::Completed)
            .count();
        let summary = serde_json::json!({
            "workflows": states.len(),
            "completed": completed,
            "go_live": states.iter().filter(|state| state.go_live == Some(true)).count(),
        });
        let summary_path = reports_dir.join("summary.json");
        write_json(&summary_path, &summary)?;

        Ok(vec![leaderboard, summary_path])
    }
}

/// Writes a JSON artifact through a temp file and rename.
fn write_json(path: &Path, value: &serde_json::Value) -> Result<(), ReportError> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| ReportError::Build(format!("serialize {}: {err}", path.display())))?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)
        .map_err(|err| ReportError::Build(format!("write {}: {err}", tmp.display())))?;
    fs::rename(&tmp, path)
        .map_err(|err| ReportError::Build(format!("rename {}: {err}", path.display())))
}
