// crates/gauntlet-core/tests/orchestrator.rs
// ============================================================================
// Module: Pipeline Orchestrator Tests
// Description: End-to-end pipeline scenarios over the dry-run runner.
// Purpose: Validate pause/resume, budgets, refinement, and verdicts.
// ============================================================================

//! Orchestrator scenarios: happy path, fix loop, refinement loop and cap,
//! budget exhaustion, handle disjointness, and resume semantics.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    missing_docs,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

use gauntlet_core::CompileResult;
use gauntlet_core::DryRunRunner;
use gauntlet_core::GauntletConfig;
use gauntlet_core::InMemoryWorkflowStore;
use gauntlet_core::JsonReportSink;
use gauntlet_core::OptimizationRange;
use gauntlet_core::ParamValue;
use gauntlet_core::Pass;
use gauntlet_core::Pipeline;
use gauntlet_core::PipelineError;
use gauntlet_core::RunResult;
use gauntlet_core::RunnerHandle;
use gauntlet_core::ScoreInputs;
use gauntlet_core::StageName;
use gauntlet_core::StartRequest;
use gauntlet_core::Timestamp;
use gauntlet_core::Trade;
use gauntlet_core::TradeDirection;
use gauntlet_core::TradeMetrics;
use gauntlet_core::WorkflowId;
use gauntlet_core::WorkflowState;
use gauntlet_core::WorkflowStatus;
use gauntlet_core::composite_score;
use gauntlet_core::interfaces::SweepResult;
use gauntlet_core::interfaces::WorkflowStore;
use gauntlet_core::runtime::RunnerCall;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const EA_SOURCE: &str = r"
input double Lots = 0.1; // lot size
input bool UseFilter = true;
input int MagicNumber = 123; // identifier
";

/// 2024-03-01T00:00:00Z, a fixed anchor so period dates are deterministic.
const NOW: Timestamp = Timestamp::from_unix_millis(1_709_251_200_000);

struct Fixture {
    pipeline: Pipeline<DryRunRunner, InMemoryWorkflowStore>,
    runner: DryRunRunner,
    store: InMemoryWorkflowStore,
    ea_path: PathBuf,
    _tmp: tempfile::TempDir,
}

fn fixture(mutate: impl FnOnce(&mut GauntletConfig)) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let ea_path = tmp.path().join("trend_rider.mq5");
    std::fs::write(&ea_path, EA_SOURCE).unwrap();

    let mut config = GauntletConfig::default();
    config.paths.runs_dir = tmp.path().join("runs");
    config.behavior.auto_stress = false;
    config.behavior.auto_forward_windows = false;
    config.behavior.auto_multi_pair = false;
    mutate(&mut config);

    let runner = DryRunRunner::new();
    let store = InMemoryWorkflowStore::new();
    let pipeline =
        Pipeline::new(config, runner.clone(), store.clone(), Box::new(JsonReportSink));
    Fixture {
        pipeline,
        runner,
        store,
        ea_path,
        _tmp: tmp,
    }
}

fn start_request(fix: &Fixture, id: &str) -> StartRequest {
    StartRequest {
        workflow_id: WorkflowId::new(id),
        ea_source_path: fix.ea_path.clone(),
        symbol: "EURUSD".to_string(),
        timeframe: "H1".to_string(),
        runner_handle: RunnerHandle::new("terminal-1"),
        seeded_params: None,
        allow_multi_pair: true,
    }
}

fn good_compile() -> CompileResult {
    CompileResult {
        success: true,
        compiled_path: Some(PathBuf::from("trend_rider.ex5")),
        errors: Vec::new(),
        warnings: Vec::new(),
    }
}

fn metrics(profit: f64, pf: f64, dd: f64, trades: u64) -> TradeMetrics {
    TradeMetrics {
        profit,
        profit_factor: pf,
        max_drawdown_pct: dd,
        total_trades: trades,
        win_rate: 0.55,
        sharpe: 1.2,
        sortino: 1.6,
        calmar: 0.8,
        expected_payoff: if trades > 0 { profit / trades as f64 } else { 0.0 },
        recovery_factor: 2.0,
        equity_curve: None,
        errors: Vec::new(),
    }
}

fn trade(close_millis: i64, profit: f64) -> Trade {
    Trade {
        open_time: Timestamp::from_unix_millis(close_millis - 3_600_000),
        close_time: Timestamp::from_unix_millis(close_millis),
        direction: TradeDirection::Buy,
        volume: 0.1,
        open_price: 1.1,
        close_price: 1.2,
        commission: -0.5,
        swap: 0.0,
        net_profit: profit,
    }
}

fn run_result(m: TradeMetrics, trade_count: usize) -> RunResult {
    let trades = (0..trade_count)
        .map(|i| trade(1_600_000_000_000 + i as i64 * 3_600_000, m.profit / trade_count.max(1) as f64))
        .collect();
    RunResult {
        metrics: m,
        trades,
        report_path: PathBuf::from("report.xml"),
    }
}

fn pass(index: u32, lots: f64, filter: bool, back: f64, forward: f64, trades: u64) -> Pass {
    let mut inputs = BTreeMap::new();
    inputs.insert("Lots".to_string(), ParamValue::Real(lots));
    inputs.insert("UseFilter".to_string(), ParamValue::Boolean(filter));
    Pass {
        index,
        profit_back: back,
        profit_forward: forward,
        profit_combined: back + forward,
        custom_criterion: back / 10.0,
        trades,
        inputs,
    }
}

fn sweep_result(passes: Vec<Pass>) -> SweepResult {
    SweepResult {
        pass_count: passes.len() as u64,
        passes,
        artifact_path: PathBuf::from("sweep.xml"),
    }
}

fn analysis_payload() -> (BTreeMap<String, ParamValue>, Vec<OptimizationRange>) {
    let mut wide = BTreeMap::new();
    wide.insert("Lots".to_string(), ParamValue::Real(0.1));
    wide.insert("UseFilter".to_string(), ParamValue::Boolean(true));
    wide.insert("MaxSpreadPips".to_string(), ParamValue::Real(500.0));
    wide.insert("MaxSlippagePips".to_string(), ParamValue::Real(500.0));
    let ranges = vec![
        OptimizationRange::sweep("Lots", 0.1, 0.1, 0.5),
        OptimizationRange::toggle("UseFilter"),
        OptimizationRange::fixed("MaxSpreadPips", ParamValue::Real(20.0)),
        OptimizationRange::fixed("MaxSlippagePips", ParamValue::Real(5.0)),
    ];
    (wide, ranges)
}

/// Diverse passes that trigger no refinement recommendation.
fn diverse_passes() -> Vec<Pass> {
    vec![
        pass(1, 0.1, true, 1_200.0, 900.0, 150),
        pass(2, 0.3, false, 1_000.0, 700.0, 140),
        pass(3, 0.5, true, 800.0, 500.0, 130),
    ]
}

fn sweep_count(runner: &DryRunRunner) -> usize {
    runner
        .calls()
        .into_iter()
        .filter(|call| matches!(call, RunnerCall::Sweep { .. }))
        .count()
}

// ============================================================================
// SECTION: Happy Path
// ============================================================================

#[test]
fn happy_path_with_autonomous_decisions() {
    let fix = fixture(|_| {});
    fix.runner.push_compile(Ok(good_compile()));

    let state = fix.pipeline.start(start_request(&fix, "wf-happy"), NOW).unwrap();
    assert_eq!(state.status, WorkflowStatus::AwaitingParams);
    assert!(state.stage_done(StageName::ExtractParams));
    assert!(!state.stage_done(StageName::RecordAnalyzedParams));
    assert_eq!(state.parameters.len(), 5);

    // Validation run, sweep, then one confirmation run per selected pass.
    fix.runner.push_single(Ok(run_result(metrics(1_500.0, 1.8, 12.0, 180), 0)));
    fix.runner.push_sweep(Ok(sweep_result(diverse_passes())));
    for _ in 0..3 {
        fix.runner.push_single(Ok(run_result(metrics(2_500.0, 2.1, 18.0, 150), 150)));
    }

    let (wide, ranges) = analysis_payload();
    let state = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-happy"), wide, ranges, NOW)
        .unwrap();

    assert_eq!(state.status, WorkflowStatus::Completed);
    assert_eq!(state.refine_iterations, 0);
    assert_eq!(state.fix_attempts, 0);
    assert_eq!(state.backtested_passes.len(), 3);
    let best = state.best_pass.as_ref().unwrap();
    assert!(best.gates_passed());

    let mc = state.monte_carlo.as_ref().unwrap();
    assert!(mc.confidence >= 70.0);
    assert!(mc.ruin_probability <= 5.0);

    let expected = composite_score(&ScoreInputs::from_metrics(
        &metrics(2_500.0, 2.1, 18.0, 150),
        1_200.0,
        900.0,
    ));
    assert!((state.composite_score.unwrap() - expected).abs() < 1e-9);
    assert_eq!(state.go_live, Some(true));

    // The report stage ran last and produced its artifact.
    let report = state.stage_result(StageName::GenerateReports).unwrap();
    assert!(report.success);
    assert!(report.data.contains_key("artifacts"));
}

#[test]
fn optional_stages_are_skipped_when_disabled() {
    let fix = fixture(|_| {});
    fix.runner.push_compile(Ok(good_compile()));
    fix.pipeline.start(start_request(&fix, "wf-skip"), NOW).unwrap();

    fix.runner.push_single(Ok(run_result(metrics(1_500.0, 1.8, 12.0, 180), 0)));
    fix.runner.push_sweep(Ok(sweep_result(diverse_passes())));
    for _ in 0..3 {
        fix.runner.push_single(Ok(run_result(metrics(2_500.0, 2.1, 18.0, 150), 150)));
    }
    let (wide, ranges) = analysis_payload();
    let state = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-skip"), wide, ranges, NOW)
        .unwrap();

    for stage in [StageName::StressScenarios, StageName::ForwardWindows, StageName::MultiPair] {
        let result = state.stage_result(stage).unwrap();
        assert_eq!(result.data.get("skipped"), Some(&serde_json::json!(true)));
    }
}

// ============================================================================
// SECTION: Fix Loop
// ============================================================================

#[test]
fn validation_failure_enters_fix_loop_and_recovers() {
    let fix = fixture(|_| {});
    fix.runner.push_compile(Ok(good_compile()));
    fix.pipeline.start(start_request(&fix, "wf-fix"), NOW).unwrap();

    // First validation run under-trades.
    fix.runner.push_single(Ok(run_result(metrics(50.0, 1.1, 5.0, 11), 0)));
    let (wide, ranges) = analysis_payload();
    let state = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-fix"), wide, ranges, NOW)
        .unwrap();
    assert_eq!(state.status, WorkflowStatus::AwaitingFix);
    assert_eq!(state.fix_attempts, 1);

    // The patch restarts the pipeline from the top; the retained analysis
    // payload means no second parameter pause.
    fix.runner.push_compile(Ok(good_compile()));
    fix.runner.push_single(Ok(run_result(metrics(1_500.0, 1.8, 12.0, 120), 0)));
    fix.runner.push_sweep(Ok(sweep_result(diverse_passes())));
    for _ in 0..3 {
        fix.runner.push_single(Ok(run_result(metrics(2_500.0, 2.1, 18.0, 150), 150)));
    }
    let patched = format!("{EA_SOURCE}\ninput bool AllowEntries = true;\n");
    let state = fix
        .pipeline
        .resume_with_patched_source(&WorkflowId::new("wf-fix"), patched, NOW)
        .unwrap();

    assert_eq!(state.status, WorkflowStatus::Completed);
    assert_eq!(state.fix_attempts, 1);
    assert!(state.backup_source_path.is_some());
    let validation = state.validation_metrics.as_ref().unwrap();
    assert_eq!(validation.total_trades, 120);
}

#[test]
fn fix_budget_exhaustion_fails_with_report() {
    let fix = fixture(|_| {});
    fix.runner.push_compile(Ok(good_compile()));
    fix.pipeline.start(start_request(&fix, "wf-exhaust"), NOW).unwrap();

    fix.runner.push_single(Ok(run_result(metrics(50.0, 1.1, 5.0, 11), 0)));
    let (wide, ranges) = analysis_payload();
    let state = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-exhaust"), wide, ranges, NOW)
        .unwrap();
    assert_eq!(state.status, WorkflowStatus::AwaitingFix);

    // Three patches, each still under-trading.
    for attempt in 1_u8..=3 {
        fix.runner.push_compile(Ok(good_compile()));
        fix.runner.push_single(Ok(run_result(metrics(50.0, 1.1, 5.0, 11 + u64::from(attempt)), 0)));
        let state = fix
            .pipeline
            .resume_with_patched_source(
                &WorkflowId::new("wf-exhaust"),
                format!("{EA_SOURCE}\n// patch {attempt}\n"),
                NOW,
            )
            .unwrap();
        if attempt < 3 {
            assert_eq!(state.status, WorkflowStatus::AwaitingFix);
            assert_eq!(state.fix_attempts, attempt + 1);
        } else {
            // Fourth validation failure lands on an exhausted budget.
            assert_eq!(state.status, WorkflowStatus::Failed);
            assert_eq!(state.fix_attempts, 3);
            assert!(state.stage_done(StageName::GenerateReports));
        }
    }
}

// ============================================================================
// SECTION: Refinement Loop
// ============================================================================

/// Clustered passes: one distinct Lots value and a dominant toggle.
fn clustered_passes() -> Vec<Pass> {
    vec![
        pass(1, 0.2, true, 1_200.0, 900.0, 150),
        pass(2, 0.2, true, 1_100.0, 850.0, 140),
        pass(3, 0.2, true, 1_000.0, 800.0, 130),
    ]
}

#[test]
fn refinement_converges_after_one_iteration() {
    let fix = fixture(|config| config.refinement.min_valid_passes = 1);
    fix.runner.push_compile(Ok(good_compile()));
    fix.pipeline.start(start_request(&fix, "wf-refine"), NOW).unwrap();

    fix.runner.push_single(Ok(run_result(metrics(1_500.0, 1.8, 12.0, 180), 0)));
    fix.runner.push_sweep(Ok(sweep_result(clustered_passes())));
    fix.runner.push_sweep(Ok(sweep_result(diverse_passes())));
    for _ in 0..3 {
        fix.runner.push_single(Ok(run_result(metrics(2_500.0, 2.1, 18.0, 150), 150)));
    }

    let (wide, ranges) = analysis_payload();
    let state = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-refine"), wide, ranges, NOW)
        .unwrap();

    assert_eq!(state.status, WorkflowStatus::Completed);
    assert_eq!(state.refine_iterations, 1);
    assert_eq!(sweep_count(&fix.runner), 2);
    assert_eq!(state.optimization_history.len(), 1);
    let archived = &state.optimization_history[0];
    assert_eq!(archived.iteration, 0);
    assert!(archived.stage_results.iter().any(|result| result.stage == StageName::RunOptimization));
}

#[test]
fn refinement_cap_forces_proceed() {
    let fix = fixture(|config| config.refinement.min_valid_passes = 1);
    fix.runner.push_compile(Ok(good_compile()));
    fix.pipeline.start(start_request(&fix, "wf-cap"), NOW).unwrap();

    fix.runner.push_single(Ok(run_result(metrics(1_500.0, 1.8, 12.0, 180), 0)));
    // Every sweep stays clustered, so refinement is always recommended.
    for _ in 0..3 {
        fix.runner.push_sweep(Ok(sweep_result(clustered_passes())));
    }
    for _ in 0..3 {
        fix.runner.push_single(Ok(run_result(metrics(2_500.0, 2.1, 18.0, 150), 150)));
    }

    let (wide, ranges) = analysis_payload();
    let state = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-cap"), wide, ranges, NOW)
        .unwrap();

    assert_eq!(state.status, WorkflowStatus::Completed);
    assert_eq!(state.refine_iterations, 2);
    assert_eq!(sweep_count(&fix.runner), 3);
    let analysis = state.refinement.as_ref().unwrap();
    assert!(analysis.forced_proceed);
    assert!(!analysis.recommend_refine);
}

#[test]
fn manual_refine_decision_pauses_and_resumes() {
    let fix = fixture(|config| {
        config.refinement.min_valid_passes = 1;
        config.behavior.auto_refine_decision = false;
    });
    fix.runner.push_compile(Ok(good_compile()));
    fix.pipeline.start(start_request(&fix, "wf-manual"), NOW).unwrap();

    fix.runner.push_single(Ok(run_result(metrics(1_500.0, 1.8, 12.0, 180), 0)));
    fix.runner.push_sweep(Ok(sweep_result(clustered_passes())));
    let (wide, ranges) = analysis_payload();
    let state = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-manual"), wide, ranges, NOW)
        .unwrap();
    assert_eq!(state.status, WorkflowStatus::AwaitingRefineDecision);
    assert!(state.refinement.is_some());
    assert!(!state.stage_done(StageName::AnalyzeAndRefine));

    for _ in 0..3 {
        fix.runner.push_single(Ok(run_result(metrics(2_500.0, 2.1, 18.0, 150), 150)));
    }
    let state = fix
        .pipeline
        .resume_with_refine_decision(
            &WorkflowId::new("wf-manual"),
            gauntlet_core::RefineDecision::Proceed,
            NOW,
        )
        .unwrap();
    assert_eq!(state.status, WorkflowStatus::Completed);
    assert_eq!(state.refine_iterations, 0);
    assert_eq!(sweep_count(&fix.runner), 1);
}

// ============================================================================
// SECTION: Selection Pause
// ============================================================================

#[test]
fn external_selection_pauses_and_honors_indices() {
    let fix = fixture(|config| config.behavior.auto_selection = false);
    fix.runner.push_compile(Ok(good_compile()));
    fix.pipeline.start(start_request(&fix, "wf-select"), NOW).unwrap();

    fix.runner.push_single(Ok(run_result(metrics(1_500.0, 1.8, 12.0, 180), 0)));
    fix.runner.push_sweep(Ok(sweep_result(diverse_passes())));
    let (wide, ranges) = analysis_payload();
    let state = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-select"), wide, ranges, NOW)
        .unwrap();
    assert_eq!(state.status, WorkflowStatus::AwaitingSelection);

    fix.runner.push_single(Ok(run_result(metrics(2_500.0, 2.1, 18.0, 150), 150)));
    let state = fix
        .pipeline
        .resume_with_selection(&WorkflowId::new("wf-select"), vec![2], NOW)
        .unwrap();
    assert_eq!(state.status, WorkflowStatus::Completed);
    assert_eq!(state.backtested_passes.len(), 1);
    assert_eq!(state.backtested_passes[0].index, 2);
}

// ============================================================================
// SECTION: Handles and Resume Semantics
// ============================================================================

#[test]
fn report_handles_are_disjoint_across_workflows() {
    let fix = fixture(|_| {});
    for id in ["wf-a", "wf-b"] {
        fix.runner.push_compile(Ok(good_compile()));
        fix.pipeline.start(start_request(&fix, id), NOW).unwrap();
        fix.runner.push_single(Ok(run_result(metrics(1_500.0, 1.8, 12.0, 180), 0)));
        fix.runner.push_sweep(Ok(sweep_result(diverse_passes())));
        for _ in 0..3 {
            fix.runner.push_single(Ok(run_result(metrics(2_500.0, 2.1, 18.0, 150), 150)));
        }
        let (wide, ranges) = analysis_payload();
        fix.pipeline.resume_with_params(&WorkflowId::new(id), wide, ranges, NOW).unwrap();
    }

    let handles = fix.runner.report_handles();
    let a: BTreeSet<&String> =
        handles.iter().filter(|handle| handle_of(handle.as_str(), &fix, "wf-a")).collect();
    let b: BTreeSet<&String> =
        handles.iter().filter(|handle| handle_of(handle.as_str(), &fix, "wf-b")).collect();
    assert!(!a.is_empty());
    assert!(!b.is_empty());
    assert!(a.is_disjoint(&b));

    // Handles are unique within each workflow as well.
    let unique: BTreeSet<&String> = handles.iter().collect();
    assert_eq!(unique.len(), handles.len());
}

fn handle_of(handle: &str, fix: &Fixture, workflow: &str) -> bool {
    // Recompute the workflow's handle set from the call ordering: the
    // per-workflow calls are contiguous because the runs were sequential.
    let calls = fix.runner.calls();
    let mut owner = None;
    let mut current = None;
    for call in calls {
        match call {
            RunnerCall::Compile(_) => {
                current = Some(if current.is_none() { "wf-a" } else { "wf-b" });
            }
            RunnerCall::Single {
                report_handle, ..
            }
            | RunnerCall::Sweep {
                report_handle,
            } => {
                if report_handle == handle {
                    owner = current;
                }
            }
            RunnerCall::TickArchive(_) => {}
        }
    }
    owner == Some(workflow)
}

#[test]
fn resume_on_terminal_workflow_is_rejected() {
    let fix = fixture(|_| {});
    fix.runner.push_compile(Ok(good_compile()));
    fix.pipeline.start(start_request(&fix, "wf-done"), NOW).unwrap();
    fix.runner.push_single(Ok(run_result(metrics(1_500.0, 1.8, 12.0, 180), 0)));
    fix.runner.push_sweep(Ok(sweep_result(diverse_passes())));
    for _ in 0..3 {
        fix.runner.push_single(Ok(run_result(metrics(2_500.0, 2.1, 18.0, 150), 150)));
    }
    let (wide, ranges) = analysis_payload();
    let done = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-done"), wide.clone(), ranges.clone(), NOW)
        .unwrap();
    assert_eq!(done.status, WorkflowStatus::Completed);

    let before = fix.store.load(&WorkflowId::new("wf-done")).unwrap().unwrap();
    let err = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-done"), wide, ranges, NOW)
        .unwrap_err();
    assert!(matches!(err, PipelineError::WorkflowFinished(WorkflowStatus::Completed)));
    let after = fix.store.load(&WorkflowId::new("wf-done")).unwrap().unwrap();
    assert_eq!(before, after);
}

#[test]
fn invalid_params_payload_is_rejected_without_mutation() {
    let fix = fixture(|_| {});
    fix.runner.push_compile(Ok(good_compile()));
    fix.pipeline.start(start_request(&fix, "wf-invalid"), NOW).unwrap();

    let (wide, mut ranges) = analysis_payload();
    ranges.push(OptimizationRange::sweep("NoSuchParam", 1.0, 1.0, 5.0));
    let err = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-invalid"), wide, ranges, NOW)
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));

    let state = fix.store.load(&WorkflowId::new("wf-invalid")).unwrap().unwrap();
    assert_eq!(state.status, WorkflowStatus::AwaitingParams);
    assert!(state.pending_input.is_none());
}

#[test]
fn sweep_with_zero_passes_fails_the_workflow() {
    let fix = fixture(|_| {});
    fix.runner.push_compile(Ok(good_compile()));
    fix.pipeline.start(start_request(&fix, "wf-zero"), NOW).unwrap();

    fix.runner.push_single(Ok(run_result(metrics(1_500.0, 1.8, 12.0, 180), 0)));
    fix.runner.push_sweep(Ok(sweep_result(Vec::new())));
    let (wide, ranges) = analysis_payload();
    let state = fix
        .pipeline
        .resume_with_params(&WorkflowId::new("wf-zero"), wide, ranges, NOW)
        .unwrap();

    assert_eq!(state.status, WorkflowStatus::Failed);
    let sweep = state.stage_result(StageName::RunOptimization).unwrap();
    assert!(!sweep.success);
    assert!(sweep.gates.iter().any(|gate| gate.name == "passes-found" && !gate.passed));
    // Reports are still produced for failed workflows.
    assert!(state.stage_done(StageName::GenerateReports));
}

#[test]
fn stage_results_survive_store_round_trip() {
    let fix = fixture(|_| {});
    fix.runner.push_compile(Ok(good_compile()));
    let state = fix.pipeline.start(start_request(&fix, "wf-roundtrip"), NOW).unwrap();

    let loaded = fix.store.load(&WorkflowId::new("wf-roundtrip")).unwrap().unwrap();
    assert_eq!(state, loaded);

    let encoded = serde_json::to_string(&loaded).unwrap();
    let decoded: WorkflowState = serde_json::from_str(&encoded).unwrap();
    assert_eq!(loaded, decoded);
}
