// crates/gauntlet-core/src/runtime/stage.rs
// ============================================================================
// Module: Gauntlet Stage Contract
// Description: The per-stage contract and the effect vocabulary stages emit.
// Purpose: Keep stages read-only over state; the engine is the single mutator.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! A stage reads a state snapshot and returns a [`StageOutput`]: a result
//! record, a list of typed state effects, and an optional suspension. Stages
//! never mutate the state they are handed; the engine applies effects,
//! appends results, and persists a checkpoint after every stage. A stage
//! that suspends is re-executed after resume with the agent's input attached
//! to the state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::GauntletConfig;
use crate::core::MonteCarloResult;
use crate::core::OptimizationRange;
use crate::core::ParamValue;
use crate::core::Parameter;
use crate::core::RefinementAnalysis;
use crate::core::ScoredPass;
use crate::core::StageName;
use crate::core::StageResult;
use crate::core::StressReport;
use crate::core::Timestamp;
use crate::core::TradeMetrics;
use crate::core::WorkflowState;
use crate::core::passes::BacktestedPass;
use crate::core::simulation::ForwardWindowResult;
use crate::interfaces::PathSink;
use crate::interfaces::ProgressSink;
use crate::interfaces::ReportSink;
use crate::interfaces::Runner;

// ============================================================================
// SECTION: Suspension
// ============================================================================

/// Pause point a stage may park the workflow at.
///
/// # Invariants
/// - Each variant maps 1:1 to an awaiting status and a resume entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspension {
    /// Await wide-validation params and optimization ranges.
    AwaitParams,
    /// Await a patched source.
    AwaitFix,
    /// Await a refinement decision.
    AwaitRefineDecision,
    /// Await a pass selection.
    AwaitSelection,
}

// ============================================================================
// SECTION: State Effects
// ============================================================================

/// Typed state mutation requested by a stage.
///
/// The engine applies effects in order; stages themselves never touch the
/// root record.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEffect {
    /// Point the pipeline at a new working source file.
    SetActiveSource(PathBuf),
    /// Record the one-time backup of the true original source.
    SetBackupSource(PathBuf),
    /// Record the compiled EA artifact.
    SetCompiledPath(PathBuf),
    /// Record the extracted parameter set.
    SetParameters(Vec<Parameter>),
    /// Record validated agent-supplied parameters and ranges.
    SetAnalyzedParams {
        /// Wide-validation values.
        wide: BTreeMap<String, ParamValue>,
        /// Ranges after the boolean carry-over rule.
        ranges: Vec<OptimizationRange>,
    },
    /// Record the validation-run metrics.
    SetValidationMetrics(TradeMetrics),
    /// Record the sweep configuration file.
    SetIniPath(PathBuf),
    /// Record the raw sweep artifact and spilled pass table.
    SetSweepArtifacts {
        /// Raw artifact path written by the runner.
        artifact: PathBuf,
        /// Spilled normalized pass table.
        table: PathBuf,
    },
    /// Record the scored table and the surviving pass count.
    SetScoredTable {
        /// Spilled scored-and-sorted pass table.
        path: PathBuf,
        /// Passes surviving the adaptive trade filter.
        kept: u64,
    },
    /// Record the refinement analysis.
    SetRefinement(RefinementAnalysis),
    /// Archive the current optimization iteration and sweep refined ranges.
    ApplyRefinedRanges(Vec<OptimizationRange>),
    /// Record the selected passes.
    SetSelectedPasses(Vec<ScoredPass>),
    /// Record confirmation backtest outcomes.
    SetBacktested {
        /// All backtested passes.
        passes: Vec<BacktestedPass>,
        /// Best pass by the configured metric, when any met the gates.
        best: Option<BacktestedPass>,
        /// Spilled best-pass trade list.
        trades_path: Option<PathBuf>,
    },
    /// Record the Monte-Carlo result.
    SetMonteCarlo(MonteCarloResult),
    /// Record the stress report.
    SetStress(StressReport),
    /// Record the forward-window slices.
    SetForwardWindows(Vec<ForwardWindowResult>),
    /// Ask the engine to spawn sequential child workflows.
    SpawnChildren(Vec<String>),
    /// Record the final verdict.
    SetVerdict {
        /// Composite score of the best pass.
        score: Option<f64>,
        /// Go-live verdict.
        go_live: bool,
    },
    /// Consume the pending agent input.
    ClearPendingInput,
    /// Clear stage results and derived artifacts for a repair restart.
    ResetForRestart,
}

// ============================================================================
// SECTION: Stage Output
// ============================================================================

/// Complete output of one stage execution.
///
/// # Invariants
/// - `result` is `None` only when the stage suspends and will re-execute.
#[derive(Debug)]
pub struct StageOutput {
    /// Result record to append, when the stage completed.
    pub result: Option<StageResult>,
    /// Typed state effects, applied in order.
    pub effects: Vec<StateEffect>,
    /// Suspension request, when the workflow must park.
    pub suspend: Option<Suspension>,
}

impl StageOutput {
    /// Creates an output that records a result and continues.
    #[must_use]
    pub fn completed(result: StageResult) -> Self {
        Self {
            result: Some(result),
            effects: Vec::new(),
            suspend: None,
        }
    }

    /// Attaches effects to the output.
    #[must_use]
    pub fn with_effects(mut self, effects: Vec<StateEffect>) -> Self {
        self.effects = effects;
        self
    }

    /// Creates an output that parks the workflow without recording a result.
    #[must_use]
    pub fn suspended(suspension: Suspension) -> Self {
        Self {
            result: None,
            effects: Vec::new(),
            suspend: Some(suspension),
        }
    }

    /// Marks a completed output as also parking the workflow.
    #[must_use]
    pub fn and_suspend(mut self, suspension: Suspension) -> Self {
        self.suspend = Some(suspension);
        self
    }
}

// ============================================================================
// SECTION: Stage Context
// ============================================================================

/// Per-workflow directory layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDirs {
    /// Directory for workflow artifacts and spilled tables.
    pub workflow_dir: PathBuf,
    /// Directory for report artifacts.
    pub reports_dir: PathBuf,
}

/// Read-only context handed to stages by the engine.
pub struct StageContext<'a, R: Runner> {
    /// Effective configuration for this workflow.
    pub config: &'a GauntletConfig,
    /// Runner implementation.
    pub runner: &'a R,
    /// Workflow directory layout.
    pub dirs: &'a WorkflowDirs,
    /// Spill sink rooted at the workflow directory.
    pub sink: &'a dyn PathSink,
    /// Heartbeat sink for long-running operations.
    pub progress: &'a dyn ProgressSink,
    /// Report builder.
    pub reports: &'a dyn ReportSink,
    /// Peer workflow states, populated for the report stage only.
    pub peers: &'a [WorkflowState],
    /// Entry-point timestamp.
    pub now: Timestamp,
}

// ============================================================================
// SECTION: Stage Trait
// ============================================================================

/// Named pipeline unit.
///
/// Neither method mutates the state passed in. `preconditions` returns the
/// reasons the stage cannot run; the engine converts them into a failed
/// result rather than panicking.
pub trait Stage<R: Runner> {
    /// Returns the stage's static name.
    fn name(&self) -> StageName;

    /// Returns the stages whose results this stage reads.
    fn dependencies(&self) -> &'static [StageName];

    /// Checks that required prior outputs are present.
    ///
    /// # Errors
    ///
    /// Returns the list of missing-precondition reasons.
    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>>;

    /// Executes the stage against a state snapshot.
    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput;
}
