// crates/gauntlet-core/src/runtime/engine.rs
// ============================================================================
// Module: Gauntlet Pipeline Engine
// Description: Sequences stages, persists checkpoints, manages pause/resume.
// Purpose: Execute the evaluation pipeline with deterministic suspension.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The pipeline engine is the single canonical execution path for Gauntlet
//! workflows. Stages run sequentially on one thread; after every stage the
//! engine applies the stage's typed effects, appends its result, and saves a
//! checkpoint. Suspension is pure state-machine: the engine returns with the
//! workflow parked in an awaiting status, and a dedicated entry point per
//! pause type attaches the agent's input and re-enters the loop. On resume
//! no stage with a recorded result is re-executed; the repair path restarts
//! from the first stage by clearing results with counters preserved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::AgentInput;
use crate::core::ChildWorkflowRecord;
use crate::core::ErrorKind;
use crate::core::ErrorRecord;
use crate::core::GauntletConfig;
use crate::core::MAX_FIX_ATTEMPTS;
use crate::core::OptimizationIteration;
use crate::core::OptimizationRange;
use crate::core::ParamValue;
use crate::core::RefineDecision;
use crate::core::RunnerHandle;
use crate::core::StageCategory;
use crate::core::StageName;
use crate::core::StageResult;
use crate::core::Timestamp;
use crate::core::WorkflowId;
use crate::core::WorkflowState;
use crate::core::WorkflowStatus;
use crate::core::safety_parameter_names;
use crate::core::validate_ranges;
use crate::interfaces::ArtifactError;
use crate::interfaces::LogProgressSink;
use crate::interfaces::ProgressSink;
use crate::interfaces::ReportSink;
use crate::interfaces::Runner;
use crate::interfaces::StoreError;
use crate::interfaces::WorkflowStore;
use crate::runtime::artifacts::FsPathSink;
use crate::runtime::stage::Stage;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageOutput;
use crate::runtime::stage::StateEffect;
use crate::runtime::stage::Suspension;
use crate::runtime::stage::WorkflowDirs;
use crate::runtime::stages;

// ============================================================================
// SECTION: Pipeline Order
// ============================================================================

/// Total stage order; `repair-ea` runs out-of-band on the fix path.
const PIPELINE_ORDER: [StageName; 18] = [
    StageName::LoadEa,
    StageName::InjectInstrumentation,
    StageName::InjectSafety,
    StageName::Compile,
    StageName::ExtractParams,
    StageName::RecordAnalyzedParams,
    StageName::ValidateTrades,
    StageName::CreateIni,
    StageName::RunOptimization,
    StageName::ParseResults,
    StageName::AnalyzeAndRefine,
    StageName::SelectPasses,
    StageName::BacktestSelected,
    StageName::MonteCarlo,
    StageName::StressScenarios,
    StageName::ForwardWindows,
    StageName::MultiPair,
    StageName::GenerateReports,
];

/// Stage results archived when a refinement re-enters the sweep.
const REFINE_SCOPE: [StageName; 4] = [
    StageName::CreateIni,
    StageName::RunOptimization,
    StageName::ParseResults,
    StageName::AnalyzeAndRefine,
];

// ============================================================================
// SECTION: Start Request
// ============================================================================

/// Request to start a new workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRequest {
    /// Workflow identifier; must not collide with a persisted workflow.
    pub workflow_id: WorkflowId,
    /// EA source path.
    pub ea_source_path: PathBuf,
    /// Target symbol.
    pub symbol: String,
    /// Target timeframe token.
    pub timeframe: String,
    /// Runner installation handle.
    pub runner_handle: RunnerHandle,
    /// Pre-seeded analysis payload; used by multi-pair children so they run
    /// through without pausing at the parameter gate.
    pub seeded_params: Option<SeededParams>,
    /// Whether this workflow may spawn multi-pair children.
    pub allow_multi_pair: bool,
}

/// Pre-seeded analysis payload for child workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeededParams {
    /// Wide-validation values.
    pub wide_params: BTreeMap<String, ParamValue>,
    /// Sweep directives.
    pub ranges: Vec<OptimizationRange>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Pipeline engine errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A workflow with the identifier already exists.
    #[error("workflow already exists: {0}")]
    WorkflowExists(String),
    /// No workflow with the identifier is persisted.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),
    /// The workflow reached a terminal status.
    #[error("workflow is finished with status {0:?}")]
    WorkflowFinished(WorkflowStatus),
    /// The entry point does not match the workflow's pause status.
    #[error("workflow status is {actual:?}, expected {expected:?}")]
    UnexpectedStatus {
        /// Status the entry point requires.
        expected: WorkflowStatus,
        /// Status found in the persisted record.
        actual: WorkflowStatus,
    },
    /// Agent-supplied payload failed its contract.
    #[error("invalid agent input: {0}")]
    InvalidInput(String),
    /// Workflow store error.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Artifact spill error.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// The Gauntlet pipeline engine.
pub struct Pipeline<R: Runner, S: WorkflowStore> {
    /// Effective configuration.
    config: GauntletConfig,
    /// Runner implementation.
    runner: R,
    /// Durable workflow store.
    store: S,
    /// Heartbeat sink.
    progress: Box<dyn ProgressSink>,
    /// Report builder.
    reports: Box<dyn ReportSink>,
}

impl<R: Runner, S: WorkflowStore> Pipeline<R, S> {
    /// Creates a pipeline engine.
    #[must_use]
    pub fn new(config: GauntletConfig, runner: R, store: S, reports: Box<dyn ReportSink>) -> Self {
        Self {
            config,
            runner,
            store,
            progress: Box::new(LogProgressSink),
            reports,
        }
    }

    /// Replaces the heartbeat sink.
    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Returns the workflow store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Starts a new workflow and runs until completion or suspension.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::WorkflowExists`] on identifier collision and
    /// store/artifact errors encountered while running.
    pub fn start(
        &self,
        request: StartRequest,
        now: Timestamp,
    ) -> Result<WorkflowState, PipelineError> {
        if self.store.load(&request.workflow_id)?.is_some() {
            return Err(PipelineError::WorkflowExists(request.workflow_id.to_string()));
        }

        let mut state = WorkflowState::new(
            request.workflow_id,
            request.ea_source_path,
            request.symbol,
            request.timeframe,
            request.runner_handle,
            now,
        );
        state.allow_multi_pair = request.allow_multi_pair;
        if let Some(seeded) = request.seeded_params {
            state.pending_input = Some(AgentInput::Params {
                wide_params: seeded.wide_params,
                ranges: seeded.ranges,
            });
        }
        self.store.save(&state)?;
        tracing::info!(workflow = %state.workflow_id, symbol = %state.symbol, "workflow started");
        self.run_loop(state, &self.config, now)
    }

    /// Resumes an `awaiting-params` workflow with the agent's analysis.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] without mutating state when
    /// the payload fails validation, plus the usual load/status errors.
    pub fn resume_with_params(
        &self,
        workflow_id: &WorkflowId,
        wide_params: BTreeMap<String, ParamValue>,
        ranges: Vec<OptimizationRange>,
        now: Timestamp,
    ) -> Result<WorkflowState, PipelineError> {
        let mut state = self.load_awaiting(workflow_id, WorkflowStatus::AwaitingParams)?;

        let violations =
            validate_ranges(&state.parameters, &ranges, &wide_params, &safety_parameter_names());
        if !violations.is_empty() {
            return Err(PipelineError::InvalidInput(violations.join("; ")));
        }

        state.pending_input = Some(AgentInput::Params {
            wide_params,
            ranges,
        });
        self.run_loop(state, &self.config, now)
    }

    /// Resumes an `awaiting-fix` workflow with a patched source.
    ///
    /// # Errors
    ///
    /// Returns load/status errors; repair housekeeping failures fail the
    /// workflow through the normal fatal path.
    pub fn resume_with_patched_source(
        &self,
        workflow_id: &WorkflowId,
        content: String,
        now: Timestamp,
    ) -> Result<WorkflowState, PipelineError> {
        let mut state = self.load_awaiting(workflow_id, WorkflowStatus::AwaitingFix)?;
        state.pending_input = Some(AgentInput::PatchedSource {
            content,
        });
        state.status = WorkflowStatus::Running;

        let dirs = self.dirs(&state.workflow_id)?;
        let sink = FsPathSink::new(&dirs.workflow_dir);
        let config = self.config.clone();
        let output = {
            let ctx = self.context(&config, &dirs, &sink, &[], now);
            stages::validate::RepairEa.execute(&state, &ctx)
        };
        let failed = output.result.as_ref().is_some_and(|result| !result.success);
        self.apply_output(&mut state, output, &config, now);
        if failed {
            return self.finish_failed(state, &dirs, &sink, &config, now);
        }
        self.store.save(&state)?;
        self.run_loop(state, &config, now)
    }

    /// Resumes an `awaiting-refine-decision` workflow.
    ///
    /// # Errors
    ///
    /// Returns load/status errors and store/artifact errors while running.
    pub fn resume_with_refine_decision(
        &self,
        workflow_id: &WorkflowId,
        decision: RefineDecision,
        now: Timestamp,
    ) -> Result<WorkflowState, PipelineError> {
        let mut state =
            self.load_awaiting(workflow_id, WorkflowStatus::AwaitingRefineDecision)?;
        if let RefineDecision::Refine {
            ranges,
        } = &decision
        {
            let violations =
                validate_ranges(&state.parameters, ranges, &state.wide_validation_params, &[]);
            if !violations.is_empty() {
                return Err(PipelineError::InvalidInput(violations.join("; ")));
            }
        }
        state.pending_input = Some(AgentInput::Refine {
            decision,
        });
        self.run_loop(state, &self.config, now)
    }

    /// Resumes an `awaiting-selection` workflow with pass indices.
    ///
    /// # Errors
    ///
    /// Returns load/status errors and store/artifact errors while running.
    pub fn resume_with_selection(
        &self,
        workflow_id: &WorkflowId,
        indices: Vec<u32>,
        now: Timestamp,
    ) -> Result<WorkflowState, PipelineError> {
        let mut state = self.load_awaiting(workflow_id, WorkflowStatus::AwaitingSelection)?;
        if indices.is_empty() {
            return Err(PipelineError::InvalidInput("selection is empty".to_string()));
        }
        state.pending_input = Some(AgentInput::Selection {
            indices,
        });
        self.run_loop(state, &self.config, now)
    }

    /// Returns the persisted state of a workflow.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::WorkflowNotFound`] when no record exists.
    pub fn status(&self, workflow_id: &WorkflowId) -> Result<WorkflowState, PipelineError> {
        self.store
            .load(workflow_id)?
            .ok_or_else(|| PipelineError::WorkflowNotFound(workflow_id.to_string()))
    }

    // ------------------------------------------------------------------
    // Stage loop
    // ------------------------------------------------------------------

    /// Runs the stage loop until completion, failure, or suspension.
    #[allow(
        clippy::too_many_lines,
        reason = "Single linear loop keeps checkpoint ordering auditable."
    )]
    fn run_loop(
        &self,
        mut state: WorkflowState,
        config: &GauntletConfig,
        now: Timestamp,
    ) -> Result<WorkflowState, PipelineError> {
        state.status = WorkflowStatus::Running;
        self.store.save(&state)?;
        let dirs = self.dirs(&state.workflow_id)?;
        let sink = FsPathSink::new(&dirs.workflow_dir);

        loop {
            let Some(stage) = next_pending_stage(&state) else {
                break;
            };

            if skip_stage(stage, config) {
                state
                    .stage_results
                    .push(StageResult::success(stage).with_data("skipped", serde_json::json!(true)));
                self.store.save(&state)?;
                continue;
            }

            let peers = if stage == StageName::GenerateReports {
                self.load_peers(&state.workflow_id)?
            } else {
                Vec::new()
            };

            let output = {
                let ctx = self.context(config, &dirs, &sink, &peers, now);
                execute_stage(stage, &state, &ctx)
            };
            tracing::info!(
                workflow = %state.workflow_id,
                stage = %stage,
                success = output.result.as_ref().map(|result| result.success),
                suspend = output.suspend.is_some(),
                "stage executed"
            );

            let recorded_failure = output
                .result
                .as_ref()
                .is_some_and(|result| !result.success && output.suspend.is_none());
            let failure_result = if recorded_failure { output.result.clone() } else { None };
            let suspend = output.suspend;
            self.apply_output(&mut state, output, config, now);

            if let Some(suspension) = suspend {
                apply_suspension(&mut state, suspension);
                self.store.save(&state)?;
                return Ok(state);
            }

            if let Some(result) = failure_result {
                let kind = failure_kind(stage, &result, &state);
                state.errors.push(ErrorRecord {
                    stage: Some(stage),
                    kind,
                    message: result.errors.join("; "),
                    at: now,
                });
                match stage.category() {
                    StageCategory::Fatal | StageCategory::GateFatal => {
                        return self.finish_failed(state, &dirs, &sink, config, now);
                    }
                    StageCategory::Always => {
                        state.status = WorkflowStatus::Failed;
                        self.store.save(&state)?;
                        return Ok(state);
                    }
                    StageCategory::Informational => {
                        tracing::warn!(
                            workflow = %state.workflow_id,
                            stage = %stage,
                            "informational stage failed, continuing"
                        );
                    }
                }
            }

            // The parameter pause sits between extraction and recording.
            if stage == StageName::ExtractParams
                && state.wide_validation_params.is_empty()
                && state.pending_input.is_none()
            {
                state.status = WorkflowStatus::AwaitingParams;
                self.store.save(&state)?;
                return Ok(state);
            }

            if stage == StageName::GenerateReports && state.status != WorkflowStatus::Failed {
                state.status = WorkflowStatus::Completed;
                self.store.save(&state)?;
                return Ok(state);
            }

            self.store.save(&state)?;
        }

        Ok(state)
    }

    /// Applies a stage output: children, effects, and the result record.
    fn apply_output(
        &self,
        state: &mut WorkflowState,
        output: StageOutput,
        config: &GauntletConfig,
        now: Timestamp,
    ) {
        let mut result = output.result;
        let mut archive_result = false;

        for effect in output.effects {
            match effect {
                StateEffect::SpawnChildren(symbols) => {
                    let records = self.spawn_children(state, &symbols, config, now);
                    if let Some(inner) = result.as_mut() {
                        let summary: Vec<serde_json::Value> = records
                            .iter()
                            .map(|child| {
                                serde_json::json!({
                                    "workflow_id": child.workflow_id.as_str(),
                                    "symbol": child.symbol,
                                    "score": child.score,
                                })
                            })
                            .collect();
                        inner.data.insert(
                            "children".to_string(),
                            serde_json::Value::Array(summary),
                        );
                    }
                    state.child_workflows.extend(records);
                }
                StateEffect::ApplyRefinedRanges(ranges) => {
                    archive_result = true;
                    apply_refined_ranges(state, ranges);
                }
                other => apply_effect(state, other),
            }
        }

        if let Some(result) = result {
            if archive_result {
                if let Some(iteration) = state.optimization_history.last_mut() {
                    iteration.stage_results.push(result);
                }
            } else {
                state.stage_results.push(result);
            }
        }
    }

    /// Runs the report stage best-effort and marks the workflow failed.
    fn finish_failed(
        &self,
        mut state: WorkflowState,
        dirs: &WorkflowDirs,
        sink: &FsPathSink,
        config: &GauntletConfig,
        now: Timestamp,
    ) -> Result<WorkflowState, PipelineError> {
        if !state.stage_done(StageName::GenerateReports) {
            let peers = self.load_peers(&state.workflow_id).unwrap_or_default();
            let output = {
                let ctx = self.context(config, dirs, sink, &peers, now);
                execute_stage(StageName::GenerateReports, &state, &ctx)
            };
            self.apply_output(&mut state, output, config, now);
        }
        state.status = WorkflowStatus::Failed;
        self.store.save(&state)?;
        tracing::warn!(workflow = %state.workflow_id, "workflow failed");
        Ok(state)
    }

    /// Spawns sequential child workflows, isolating per-symbol failures.
    fn spawn_children(
        &self,
        state: &WorkflowState,
        symbols: &[String],
        config: &GauntletConfig,
        now: Timestamp,
    ) -> Vec<ChildWorkflowRecord> {
        let mut child_config = config.clone();
        child_config.behavior.auto_selection = true;
        child_config.behavior.auto_refine_decision = true;
        child_config.behavior.auto_multi_pair = false;

        let mut records = Vec::new();
        for symbol in symbols {
            let child_id = WorkflowId::new(format!(
                "{}-{}",
                state.workflow_id.as_str(),
                symbol.to_ascii_lowercase()
            ));
            let request = StartRequest {
                workflow_id: child_id.clone(),
                ea_source_path: state.working_source().clone(),
                symbol: symbol.clone(),
                timeframe: state.timeframe.clone(),
                runner_handle: state.runner_handle.clone(),
                seeded_params: Some(SeededParams {
                    wide_params: state.wide_validation_params.clone(),
                    ranges: state.optimization_ranges.clone(),
                }),
                allow_multi_pair: false,
            };
            let record = match self.start_child(request, &child_config, now) {
                Ok(child) => ChildWorkflowRecord {
                    workflow_id: child.workflow_id.clone(),
                    symbol: symbol.clone(),
                    status: Some(child.status),
                    score: child.composite_score,
                },
                Err(err) => {
                    tracing::warn!(
                        workflow = %state.workflow_id,
                        child = %child_id,
                        error = %err,
                        "child workflow failed to run"
                    );
                    ChildWorkflowRecord {
                        workflow_id: child_id,
                        symbol: symbol.clone(),
                        status: None,
                        score: None,
                    }
                }
            };
            records.push(record);
        }
        records
    }

    /// Starts a child workflow under an overridden configuration.
    fn start_child(
        &self,
        request: StartRequest,
        config: &GauntletConfig,
        now: Timestamp,
    ) -> Result<WorkflowState, PipelineError> {
        if self.store.load(&request.workflow_id)?.is_some() {
            return Err(PipelineError::WorkflowExists(request.workflow_id.to_string()));
        }
        let mut state = WorkflowState::new(
            request.workflow_id,
            request.ea_source_path,
            request.symbol,
            request.timeframe,
            request.runner_handle,
            now,
        );
        state.allow_multi_pair = false;
        if let Some(seeded) = request.seeded_params {
            state.pending_input = Some(AgentInput::Params {
                wide_params: seeded.wide_params,
                ranges: seeded.ranges,
            });
        }
        self.store.save(&state)?;
        self.run_loop(state, config, now)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Builds a stage context over borrowed engine resources.
    fn context<'a>(
        &'a self,
        config: &'a GauntletConfig,
        dirs: &'a WorkflowDirs,
        sink: &'a FsPathSink,
        peers: &'a [WorkflowState],
        now: Timestamp,
    ) -> StageContext<'a, R> {
        StageContext {
            config,
            runner: &self.runner,
            dirs,
            sink,
            progress: self.progress.as_ref(),
            reports: self.reports.as_ref(),
            peers,
            now,
        }
    }

    /// Loads a workflow parked at the expected pause status.
    fn load_awaiting(
        &self,
        workflow_id: &WorkflowId,
        expected: WorkflowStatus,
    ) -> Result<WorkflowState, PipelineError> {
        let state = self
            .store
            .load(workflow_id)?
            .ok_or_else(|| PipelineError::WorkflowNotFound(workflow_id.to_string()))?;
        if state.status.is_terminal() {
            return Err(PipelineError::WorkflowFinished(state.status));
        }
        if state.status != expected {
            return Err(PipelineError::UnexpectedStatus {
                expected,
                actual: state.status,
            });
        }
        Ok(state)
    }

    /// Resolves and prepares the workflow directory layout.
    fn dirs(&self, workflow_id: &WorkflowId) -> Result<WorkflowDirs, PipelineError> {
        let runs = &self.config.paths.runs_dir;
        let dirs = WorkflowDirs {
            workflow_dir: runs.join("workflows").join(workflow_id.as_str()),
            reports_dir: runs.join("reports"),
        };
        for dir in [&dirs.workflow_dir, &dirs.reports_dir] {
            fs::create_dir_all(dir)
                .map_err(|err| ArtifactError::Sink(format!("create {}: {err}", dir.display())))?;
        }
        Ok(dirs)
    }

    /// Loads peer states for the cross-workflow boards.
    fn load_peers(&self, own_id: &WorkflowId) -> Result<Vec<WorkflowState>, PipelineError> {
        let mut peers = Vec::new();
        for id in self.store.list()? {
            if &id == own_id {
                continue;
            }
            if let Some(peer) = self.store.load(&id)? {
                peers.push(peer);
            }
        }
        Ok(peers)
    }

}

// ============================================================================
// SECTION: Stage Dispatch
// ============================================================================

/// Executes a stage by name, honoring its preconditions.
fn execute_stage<R: Runner>(
    stage: StageName,
    state: &WorkflowState,
    ctx: &StageContext<'_, R>,
) -> StageOutput {
    let unit: &dyn Stage<R> = match stage {
        StageName::LoadEa => &stages::source::LoadEa,
        StageName::InjectInstrumentation => &stages::source::InjectInstrumentation,
        StageName::InjectSafety => &stages::source::InjectSafety,
        StageName::Compile => &stages::compile::Compile,
        StageName::ExtractParams => &stages::params::ExtractParams,
        StageName::RecordAnalyzedParams => &stages::params::RecordAnalyzedParams,
        StageName::ValidateTrades => &stages::validate::ValidateTrades,
        StageName::RepairEa => &stages::validate::RepairEa,
        StageName::CreateIni => &stages::optimize::CreateIni,
        StageName::RunOptimization => &stages::optimize::RunOptimization,
        StageName::ParseResults => &stages::results::ParseResults,
        StageName::AnalyzeAndRefine => &stages::results::AnalyzeAndRefine,
        StageName::SelectPasses => &stages::results::SelectPasses,
        StageName::BacktestSelected => &stages::backtest::BacktestSelected,
        StageName::MonteCarlo => &stages::monte_carlo::MonteCarlo,
        StageName::StressScenarios => &stages::stress::StressScenarios,
        StageName::ForwardWindows => &stages::forward::ForwardWindows,
        StageName::MultiPair => &stages::multi_pair::MultiPair,
        StageName::GenerateReports => &stages::reports::GenerateReports,
    };

    if let Err(reasons) = unit.preconditions(state) {
        let mut result = StageResult::failure(stage, "preconditions not met");
        result.errors.extend(reasons);
        return StageOutput::completed(result);
    }
    unit.execute(state, ctx)
}

// ============================================================================
// SECTION: State Transitions
// ============================================================================

/// Returns true when the configuration disables an optional stage.
const fn skip_stage(stage: StageName, config: &GauntletConfig) -> bool {
    match stage {
        StageName::StressScenarios => !config.behavior.auto_stress,
        StageName::ForwardWindows => !config.behavior.auto_forward_windows,
        StageName::MultiPair => !config.behavior.auto_multi_pair,
        _ => false,
    }
}

/// Returns the first pipeline stage without a recorded result.
fn next_pending_stage(state: &WorkflowState) -> Option<StageName> {
    PIPELINE_ORDER.into_iter().find(|stage| !state.stage_done(*stage))
}

/// Parks the workflow at a suspension's awaiting status.
fn apply_suspension(state: &mut WorkflowState, suspension: Suspension) {
    state.status = match suspension {
        Suspension::AwaitParams => WorkflowStatus::AwaitingParams,
        Suspension::AwaitFix => {
            state.fix_attempts = (state.fix_attempts + 1).min(MAX_FIX_ATTEMPTS);
            WorkflowStatus::AwaitingFix
        }
        Suspension::AwaitRefineDecision => WorkflowStatus::AwaitingRefineDecision,
        Suspension::AwaitSelection => WorkflowStatus::AwaitingSelection,
    };
}

/// Maps a stage failure to its error-taxonomy kind.
fn failure_kind(stage: StageName, result: &StageResult, state: &WorkflowState) -> ErrorKind {
    let gate_failed = result.gates.iter().any(|gate| !gate.passed);
    if stage == StageName::LoadEa {
        return ErrorKind::Preflight;
    }
    if matches!(stage, StageName::Compile | StageName::ValidateTrades)
        && gate_failed
        && state.fix_attempts >= MAX_FIX_ATTEMPTS
    {
        return ErrorKind::Budget;
    }
    if gate_failed {
        return ErrorKind::Gate;
    }
    if matches!(stage, StageName::RecordAnalyzedParams | StageName::SelectPasses) {
        return ErrorKind::Validation;
    }
    ErrorKind::RunnerProtocol
}

/// Archives the current optimization iteration and installs refined ranges.
fn apply_refined_ranges(state: &mut WorkflowState, ranges: Vec<OptimizationRange>) {
    let mut archived = Vec::new();
    state.stage_results.retain(|result| {
        if REFINE_SCOPE.contains(&result.stage) {
            archived.push(result.clone());
            false
        } else {
            true
        }
    });

    let pass_count = archived
        .iter()
        .find(|result| result.stage == StageName::RunOptimization)
        .and_then(|result| result.data.get("pass_count"))
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);

    state.optimization_history.push(OptimizationIteration {
        iteration: state.refine_iterations,
        ranges: state.optimization_ranges.clone(),
        pass_count,
        kept_passes: state.kept_pass_count,
        analysis: state.refinement.clone(),
        stage_results: archived,
    });

    state.optimization_ranges = ranges;
    state.refine_iterations += 1;
    state.ini_path = None;
    state.sweep_artifact_path = None;
    state.pass_table_path = None;
    state.scored_table_path = None;
    state.kept_pass_count = 0;
    state.refinement = None;
}

/// Applies one simple state effect.
#[allow(clippy::too_many_lines, reason = "One arm per effect keeps mutation auditable.")]
fn apply_effect(state: &mut WorkflowState, effect: StateEffect) {
    match effect {
        StateEffect::SetActiveSource(path) => state.active_source_path = Some(path),
        StateEffect::SetBackupSource(path) => state.backup_source_path = Some(path),
        StateEffect::SetCompiledPath(path) => state.compiled_path = Some(path),
        StateEffect::SetParameters(parameters) => state.parameters = parameters,
        StateEffect::SetAnalyzedParams {
            wide,
            ranges,
        } => {
            state.wide_validation_params = wide;
            state.optimization_ranges = ranges;
        }
        StateEffect::SetValidationMetrics(metrics) => state.validation_metrics = Some(metrics),
        StateEffect::SetIniPath(path) => state.ini_path = Some(path),
        StateEffect::SetSweepArtifacts {
            artifact,
            table,
        } => {
            state.sweep_artifact_path = Some(artifact);
            state.pass_table_path = Some(table);
        }
        StateEffect::SetScoredTable {
            path,
            kept,
        } => {
            state.scored_table_path = Some(path);
            state.kept_pass_count = kept;
        }
        StateEffect::SetRefinement(analysis) => state.refinement = Some(analysis),
        StateEffect::SetSelectedPasses(selected) => state.selected_passes = selected,
        StateEffect::SetBacktested {
            passes,
            best,
            trades_path,
        } => {
            state.backtested_passes = passes;
            state.best_pass = best;
            state.best_pass_trades_path = trades_path;
        }
        StateEffect::SetMonteCarlo(result) => state.monte_carlo = Some(result),
        StateEffect::SetStress(report) => state.stress = Some(report),
        StateEffect::SetForwardWindows(windows) => state.forward_windows = windows,
        StateEffect::SetVerdict {
            score,
            go_live,
        } => {
            state.composite_score = score;
            state.go_live = Some(go_live);
        }
        StateEffect::ClearPendingInput => state.pending_input = None,
        StateEffect::ResetForRestart => reset_for_restart(state),
        StateEffect::SpawnChildren(_) | StateEffect::ApplyRefinedRanges(_) => {
            // Handled by the engine before simple effects are applied.
        }
    }
}

/// Clears stage results and derived artifacts for a repair restart.
///
/// Counters, the analysis payload, the optimization history, and the source
/// backup survive the restart.
fn reset_for_restart(state: &mut WorkflowState) {
    state.stage_results.clear();
    state.active_source_path = None;
    state.compiled_path = None;
    state.parameters.clear();
    state.validation_metrics = None;
    state.ini_path = None;
    state.sweep_artifact_path = None;
    state.pass_table_path = None;
    state.scored_table_path = None;
    state.kept_pass_count = 0;
    state.refinement = None;
    state.selected_passes.clear();
    state.backtested_passes.clear();
    state.best_pass = None;
    state.best_pass_trades_path = None;
    state.monte_carlo = None;
    state.stress = None;
    state.forward_windows.clear();
    state.composite_score = None;
    state.go_live = None;
}
