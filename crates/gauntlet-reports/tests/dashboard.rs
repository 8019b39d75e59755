// crates/gauntlet-reports/tests/dashboard.rs
// ============================================================================
// Module: Dashboard Builder Tests
// Description: Artifact generation for completed and failed workflows.
// ============================================================================

//! Report behavior: every terminal workflow gets artifacts, failed gates
//! surface with diagnoses, and the boards rank workflows by score.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    missing_docs,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::PathBuf;

use gauntlet_core::GateOp;
use gauntlet_core::GateResult;
use gauntlet_core::RunnerHandle;
use gauntlet_core::StageName;
use gauntlet_core::StageResult;
use gauntlet_core::Timestamp;
use gauntlet_core::WorkflowId;
use gauntlet_core::WorkflowState;
use gauntlet_core::WorkflowStatus;
use gauntlet_core::interfaces::ReportSink;
use gauntlet_reports::DashboardSink;
use gauntlet_reports::dashboard::dashboard_markdown;

fn state(id: &str, status: WorkflowStatus, score: Option<f64>) -> WorkflowState {
    let mut state = WorkflowState::new(
        WorkflowId::new(id),
        PathBuf::from("ea/trend_rider.mq5"),
        "EURUSD",
        "H1",
        RunnerHandle::new("terminal-1"),
        Timestamp::from_unix_millis(1_700_000_000_000),
    );
    state.status = status;
    state.composite_score = score;
    state.go_live = score.map(|value| value >= 7.0);
    state
}

#[test]
fn publish_writes_json_and_markdown() {
    let tmp = tempfile::tempdir().unwrap();
    let workflow = state("wf-1", WorkflowStatus::Completed, Some(7.5));
    let artifacts = DashboardSink.publish(&workflow, tmp.path()).unwrap();
    assert_eq!(artifacts.len(), 2);
    for path in &artifacts {
        assert!(path.is_file());
    }

    let json_text = std::fs::read_to_string(&artifacts[0]).unwrap();
    let record: serde_json::Value = serde_json::from_str(&json_text).unwrap();
    assert_eq!(record["workflow_id"], "wf-1");
    assert_eq!(record["go_live"], true);
}

#[test]
fn failed_workflow_report_states_the_failed_gates() {
    let mut workflow = state("wf-fail", WorkflowStatus::Failed, None);
    workflow.stage_results.push(
        StageResult::success(StageName::ValidateTrades)
            .with_gate(GateResult::evaluate("minimum-trades", 11.0, 50.0, GateOp::Gte)),
    );

    let markdown = dashboard_markdown(&workflow);
    assert!(markdown.contains("NO-GO") || markdown.contains("UNDECIDED"));
    assert!(markdown.contains("minimum-trades"));
    assert!(markdown.contains("FAIL"));
    // The diagnosis section explains the failed gate.
    assert!(markdown.contains("Diagnosis"));
    assert!(markdown.contains("11"));
}

#[test]
fn boards_rank_workflows_by_score() {
    let tmp = tempfile::tempdir().unwrap();
    let states = vec![
        state("wf-low", WorkflowStatus::Completed, Some(4.0)),
        state("wf-high", WorkflowStatus::Completed, Some(9.0)),
        state("wf-failed", WorkflowStatus::Failed, None),
    ];
    let artifacts = DashboardSink.publish_boards(&states, tmp.path()).unwrap();
    assert_eq!(artifacts.len(), 2);

    let leaderboard: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&artifacts[0]).unwrap()).unwrap();
    let rows = leaderboard.as_array().unwrap();
    assert_eq!(rows[0]["workflow_id"], "wf-high");
    assert_eq!(rows[1]["workflow_id"], "wf-low");

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&artifacts[1]).unwrap()).unwrap();
    assert_eq!(summary["workflows"], 3);
    assert_eq!(summary["completed"], 2);
    assert_eq!(summary["failed"], 1);
}
