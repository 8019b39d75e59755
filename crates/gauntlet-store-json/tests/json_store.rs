// crates/gauntlet-store-json/tests/json_store.rs
// ============================================================================
// Module: JSON Store Tests
// Description: Round trips, atomicity leftovers, and integrity verification.
// ============================================================================

//! Store behavior: save/load round trips, corruption fails closed, version
//! mismatches are rejected, and listing enumerates persisted workflows.

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

use gauntlet_core::RunnerHandle;
use gauntlet_core::StageName;
use gauntlet_core::StageResult;
use gauntlet_core::Timestamp;
use gauntlet_core::WorkflowId;
use gauntlet_core::WorkflowState;
use gauntlet_core::interfaces::StoreError;
use gauntlet_core::interfaces::WorkflowStore;
use gauntlet_store_json::JsonWorkflowStore;

fn state(id: &str) -> WorkflowState {
    let mut state = WorkflowState::new(
        WorkflowId::new(id),
        PathBuf::from("ea/trend_rider.mq5"),
        "EURUSD",
        "H1",
        RunnerHandle::new("terminal-1"),
        Timestamp::from_unix_millis(1_700_000_000_000),
    );
    state.stage_results.push(
        StageResult::success(StageName::LoadEa).with_data("source", serde_json::json!("x")),
    );
    state
}

#[test]
fn save_load_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    let store = JsonWorkflowStore::open(tmp.path()).unwrap();

    let original = state("wf-1");
    store.save(&original).unwrap();
    let loaded = store.load(&WorkflowId::new("wf-1")).unwrap().unwrap();
    assert_eq!(original, loaded);

    // No temp files are left behind by the atomic write.
    let leftovers: Vec<_> = std::fs::read_dir(tmp.path().join("state"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn missing_workflow_loads_as_none() {
    let tmp = tempfile::tempdir().unwrap();
    let store = JsonWorkflowStore::open(tmp.path()).unwrap();
    assert!(store.load(&WorkflowId::new("nope")).unwrap().is_none());
}

#[test]
fn corrupted_snapshot_fails_closed() {
    let tmp = tempfile::tempdir().unwrap();
    let store = JsonWorkflowStore::open(tmp.path()).unwrap();
    store.save(&state("wf-1")).unwrap();

    let path = tmp.path().join("state").join("wf-1.json");
    let text = std::fs::read_to_string(&path).unwrap();
    let tampered = text.replace("EURUSD", "GBPUSD");
    std::fs::write(&path, tampered).unwrap();

    let err = store.load(&WorkflowId::new("wf-1")).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

#[test]
fn schema_version_mismatch_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let store = JsonWorkflowStore::open(tmp.path()).unwrap();
    store.save(&state("wf-1")).unwrap();

    let path = tmp.path().join("state").join("wf-1.json");
    let text = std::fs::read_to_string(&path).unwrap();
    let tampered = text.replace("\"schema_version\": 1", "\"schema_version\": 99");
    std::fs::write(&path, tampered).unwrap();

    let err = store.load(&WorkflowId::new("wf-1")).unwrap_err();
    assert!(matches!(err, StoreError::VersionMismatch(_)));
}

#[test]
fn unsafe_workflow_ids_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let store = JsonWorkflowStore::open(tmp.path()).unwrap();
    let err = store.load(&WorkflowId::new("../escape")).unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}

#[test]
fn list_enumerates_saved_workflows() {
    let tmp = tempfile::tempdir().unwrap();
    let store = JsonWorkflowStore::open(tmp.path()).unwrap();
    for id in ["wf-b", "wf-a", "wf-c"] {
        store.save(&state(id)).unwrap();
    }
    let ids: Vec<String> =
        store.list().unwrap().iter().map(|id| id.as_str().to_string()).collect();
    assert_eq!(ids, vec!["wf-a", "wf-b", "wf-c"]);
}

#[test]
fn resave_overwrites_the_previous_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let store = JsonWorkflowStore::open(tmp.path()).unwrap();
    let mut record = state("wf-1");
    store.save(&record).unwrap();

    record.fix_attempts = 2;
    store.save(&record).unwrap();
    let loaded = store.load(&WorkflowId::new("wf-1")).unwrap().unwrap();
    assert_eq!(loaded.fix_attempts, 2);
}
