// crates/gauntlet-core/src/core/state.rs
// ============================================================================
// Module: Gauntlet Workflow State
// Description: The root workflow record: status, stage results, artifacts.
// Purpose: Capture deterministic workflow evolution for checkpointing and resume.
// Dependencies: crate::core::{gates, identifiers, metrics, params, passes,
// ranges, refinement, simulation, stage, time}, serde
// ============================================================================

//! ## Overview
//! The workflow state is owned exclusively by the pipeline engine and
//! persisted after every stage. Stages read a snapshot and return results;
//! the engine is the single mutation point. Stage results are append-only
//! and ordered by execution. Large auxiliary data (full pass tables, raw
//! result XML) is spilled to sibling artifacts under the workflow directory
//! and referenced here by path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::core::gates::GateResult;
use crate::core::identifiers::RunnerHandle;
use crate::core::identifiers::WorkflowId;
use crate::core::metrics::TradeMetrics;
use crate::core::params::ParamValue;
use crate::core::params::Parameter;
use crate::core::passes::BacktestedPass;
use crate::core::passes::ScoredPass;
use crate::core::ranges::OptimizationRange;
use crate::core::refinement::RefineDecision;
use crate::core::refinement::RefinementAnalysis;
use crate::core::simulation::ForwardWindowResult;
use crate::core::simulation::MonteCarloResult;
use crate::core::simulation::StressReport;
use crate::core::stage::StageName;
use crate::core::stage::StageResult;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Budgets
// ============================================================================

/// Maximum repair patches accepted across both fix-loop trigger sources.
pub const MAX_FIX_ATTEMPTS: u8 = 3;
/// Maximum range-refinement sweeps after the initial one.
pub const MAX_REFINE_ITERATIONS: u8 = 2;

// ============================================================================
// SECTION: Workflow Status
// ============================================================================

/// Workflow lifecycle status.
///
/// # Invariants
/// - Variants are stable for serialization and resume dispatch.
/// - `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStatus {
    /// Created but not yet started.
    Pending,
    /// Stage loop in progress.
    Running,
    /// Parked until the agent supplies validation params and ranges.
    AwaitingParams,
    /// Parked until the agent supplies a patched source.
    AwaitingFix,
    /// Parked until the agent supplies a pass selection.
    AwaitingSelection,
    /// Parked until the agent decides on range refinement.
    AwaitingRefineDecision,
    /// Terminal: report stage finished.
    Completed,
    /// Terminal: fatal error or exhausted budget.
    Failed,
}

impl WorkflowStatus {
    /// Returns true for terminal statuses.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the stable kebab-case status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::AwaitingParams => "awaiting-params",
            Self::AwaitingFix => "awaiting-fix",
            Self::AwaitingSelection => "awaiting-selection",
            Self::AwaitingRefineDecision => "awaiting-refine-decision",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Error Records
// ============================================================================

/// Error taxonomy for recorded failures.
///
/// # Invariants
/// - Variants are stable for serialization and report consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing file, missing runner binary, malformed configuration.
    Preflight,
    /// Runner non-zero exit, timeout, unreadable or mismatched artifact.
    RunnerProtocol,
    /// Gate threshold not met.
    Gate,
    /// Agent-supplied payload failed its contract.
    Validation,
    /// Fix-attempt or refinement budget exhausted.
    Budget,
    /// Transient I/O or cleanup error, swallowed with a warning.
    Intermittent,
}

/// One recorded failure in the workflow error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Stage the error occurred in, when attributable.
    pub stage: Option<StageName>,
    /// Error taxonomy kind.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Time the error was recorded.
    pub at: Timestamp,
}

// ============================================================================
// SECTION: Agent Input
// ============================================================================

/// Payload supplied by the external agent at a pause point.
///
/// # Invariants
/// - Attached by a resume entry point and consumed by exactly one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentInput {
    /// Wide-validation parameters plus optimization ranges.
    Params {
        /// Name-to-value map for the wide validation run.
        wide_params: BTreeMap<String, ParamValue>,
        /// Sweep directives.
        ranges: Vec<OptimizationRange>,
    },
    /// Patched EA source content.
    PatchedSource {
        /// Full replacement source text.
        content: String,
    },
    /// Decision at the refinement pause point.
    Refine {
        /// Proceed or refine with new ranges.
        decision: RefineDecision,
    },
    /// Pass indices selected for confirmation backtests.
    Selection {
        /// Selected pass indices.
        indices: Vec<u32>,
    },
}

// ============================================================================
// SECTION: Optimization History
// ============================================================================

/// Archived record of one optimization iteration.
///
/// When a refinement decision re-runs the sweep, the stage results of the
/// superseded iteration move here so re-execution never touches a stage
/// whose result is still recorded in the live map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationIteration {
    /// Zero-based iteration number.
    pub iteration: u8,
    /// Ranges the iteration swept.
    pub ranges: Vec<OptimizationRange>,
    /// Passes the sweep produced.
    pub pass_count: u64,
    /// Passes surviving the adaptive trade filter.
    pub kept_passes: u64,
    /// Refinement analysis of the iteration, when reached.
    pub analysis: Option<RefinementAnalysis>,
    /// Stage results superseded by the next iteration.
    pub stage_results: Vec<StageResult>,
}

// ============================================================================
// SECTION: Child Workflows
// ============================================================================

/// Record of one child workflow spawned by the multi-pair stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildWorkflowRecord {
    /// Child workflow identifier.
    pub workflow_id: WorkflowId,
    /// Symbol the child evaluates.
    pub symbol: String,
    /// Child's final status, when it finished.
    pub status: Option<WorkflowStatus>,
    /// Child's final composite score, when available.
    pub score: Option<f64>,
}

// ============================================================================
// SECTION: Workflow State
// ============================================================================

/// Root workflow record persisted after every stage.
///
/// # Invariants
/// - `stage_results` is append-only; insertion order equals execution order.
/// - `fix_attempts <= MAX_FIX_ATTEMPTS`; `refine_iterations <= MAX_REFINE_ITERATIONS`.
/// - `AwaitingParams` implies `extract-params` completed and no later stage started.
/// - `Completed` implies `generate-reports` produced an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Workflow identifier.
    pub workflow_id: WorkflowId,
    /// Original EA source path supplied at start.
    pub ea_source_path: PathBuf,
    /// Target symbol.
    pub symbol: String,
    /// Target timeframe token (for example `H1`).
    pub timeframe: String,
    /// Runner installation handle.
    pub runner_handle: RunnerHandle,
    /// Creation time; period dates derive from this.
    pub created_at: Timestamp,
    /// Lifecycle status.
    pub status: WorkflowStatus,
    /// Append-only stage results in execution order.
    pub stage_results: Vec<StageResult>,
    /// Source currently driven through the pipeline (instrumented or patched).
    pub active_source_path: Option<PathBuf>,
    /// Backup of the true original source, written once before the first patch.
    pub backup_source_path: Option<PathBuf>,
    /// Compiled EA artifact path.
    pub compiled_path: Option<PathBuf>,
    /// Parameters extracted from the active source.
    pub parameters: Vec<Parameter>,
    /// Agent-supplied wide-validation parameter values.
    pub wide_validation_params: BTreeMap<String, ParamValue>,
    /// Active optimization ranges (after carry-over and refinement).
    pub optimization_ranges: Vec<OptimizationRange>,
    /// Metrics from the wide-parameter validation run.
    pub validation_metrics: Option<TradeMetrics>,
    /// Runner configuration file for the current sweep.
    pub ini_path: Option<PathBuf>,
    /// Raw sweep artifact path for the current iteration.
    pub sweep_artifact_path: Option<PathBuf>,
    /// Spilled full pass table path for the current iteration.
    pub pass_table_path: Option<PathBuf>,
    /// Spilled scored-and-sorted pass table path for the current iteration.
    pub scored_table_path: Option<PathBuf>,
    /// Count of passes surviving the adaptive trade filter.
    pub kept_pass_count: u64,
    /// Refinement analysis of the current iteration.
    pub refinement: Option<RefinementAnalysis>,
    /// Archived optimization iterations, oldest first.
    pub optimization_history: Vec<OptimizationIteration>,
    /// Passes selected for confirmation backtests.
    pub selected_passes: Vec<ScoredPass>,
    /// Confirmation backtest outcomes.
    pub backtested_passes: Vec<BacktestedPass>,
    /// Best pass by the configured selection metric.
    pub best_pass: Option<BacktestedPass>,
    /// Best pass's closed-trade list, spilled to an artifact.
    pub best_pass_trades_path: Option<PathBuf>,
    /// Monte-Carlo simulation result.
    pub monte_carlo: Option<MonteCarloResult>,
    /// Stress-scenario outcomes.
    pub stress: Option<StressReport>,
    /// Forward-window slices.
    pub forward_windows: Vec<ForwardWindowResult>,
    /// Child workflows spawned by the multi-pair stage.
    pub child_workflows: Vec<ChildWorkflowRecord>,
    /// Repair patches consumed, 0..=3.
    pub fix_attempts: u8,
    /// Refinement sweeps consumed, 0..=2.
    pub refine_iterations: u8,
    /// Whether this workflow may spawn multi-pair children.
    pub allow_multi_pair: bool,
    /// Pending agent input awaiting consumption by its stage.
    pub pending_input: Option<AgentInput>,
    /// Ordered error log.
    pub errors: Vec<ErrorRecord>,
    /// Composite score of the best pass, set by the report stage.
    pub composite_score: Option<f64>,
    /// Go-live verdict, set by the report stage.
    pub go_live: Option<bool>,
}

impl WorkflowState {
    /// Creates a pending workflow record.
    #[must_use]
    pub fn new(
        workflow_id: WorkflowId,
        ea_source_path: PathBuf,
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        runner_handle: RunnerHandle,
        created_at: Timestamp,
    ) -> Self {
        Self {
            workflow_id,
            ea_source_path,
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            runner_handle,
            created_at,
            status: WorkflowStatus::Pending,
            stage_results: Vec::new(),
            active_source_path: None,
            backup_source_path: None,
            compiled_path: None,
            parameters: Vec::new(),
            wide_validation_params: BTreeMap::new(),
            optimization_ranges: Vec::new(),
            validation_metrics: None,
            ini_path: None,
            sweep_artifact_path: None,
            pass_table_path: None,
            scored_table_path: None,
            kept_pass_count: 0,
            refinement: None,
            optimization_history: Vec::new(),
            selected_passes: Vec::new(),
            backtested_passes: Vec::new(),
            best_pass: None,
            best_pass_trades_path: None,
            monte_carlo: None,
            stress: None,
            forward_windows: Vec::new(),
            child_workflows: Vec::new(),
            fix_attempts: 0,
            refine_iterations: 0,
            allow_multi_pair: true,
            pending_input: None,
            errors: Vec::new(),
            composite_score: None,
            go_live: None,
        }
    }

    /// Returns the recorded result for a stage, if any.
    #[must_use]
    pub fn stage_result(&self, stage: StageName) -> Option<&StageResult> {
        self.stage_results.iter().find(|result| result.stage == stage)
    }

    /// Returns true when the stage has a recorded result.
    #[must_use]
    pub fn stage_done(&self, stage: StageName) -> bool {
        self.stage_result(stage).is_some()
    }

    /// Collects every gate outcome recorded across stage results.
    #[must_use]
    pub fn gates(&self) -> Vec<&GateResult> {
        self.stage_results.iter().flat_map(|result| result.gates.iter()).collect()
    }

    /// Returns the source path the pipeline currently drives.
    #[must_use]
    pub fn working_source(&self) -> &PathBuf {
        self.active_source_path.as_ref().unwrap_or(&self.ea_source_path)
    }

    /// Returns the trade count observed by the validation run, if recorded.
    #[must_use]
    pub fn validation_trades(&self) -> Option<u64> {
        self.validation_metrics.as_ref().map(|metrics| metrics.total_trades)
    }
}
