// crates/gauntlet-core/src/interfaces/mod.rs
// ============================================================================
// Module: Gauntlet Interfaces
// Description: Backend-agnostic interfaces for the runner, storage, and sinks.
// Purpose: Define the contract surfaces used by the Gauntlet pipeline engine.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Gauntlet integrates with the external evaluation
//! terminal, durable storage, and report consumers without embedding
//! backend-specific details. Implementations must be deterministic given
//! identical inputs and fail closed on missing or invalid data. No test of
//! the pipeline engine may invoke a real runner implementation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Date;

use crate::core::MonthStamp;
use crate::core::OptimizationRange;
use crate::core::ParamValue;
use crate::core::Pass;
use crate::core::Trade;
use crate::core::TradeMetrics;
use crate::core::WorkflowId;
use crate::core::WorkflowState;
use crate::core::simulation::DataModel;

// ============================================================================
// SECTION: Runner Requests
// ============================================================================

/// Request for a single evaluation run.
///
/// # Invariants
/// - `report_handle` is unique within the workflow's output directory.
/// - Identical requests must produce identical results.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleRunRequest {
    /// Compiled EA path.
    pub ea_path: PathBuf,
    /// Target symbol.
    pub symbol: String,
    /// Timeframe token.
    pub timeframe: String,
    /// Exact input assignment for the run.
    pub inputs: BTreeMap<String, ParamValue>,
    /// Inclusive period start.
    pub period_start: Date,
    /// Inclusive period end.
    pub period_end: Date,
    /// Simulated execution latency, milliseconds.
    pub latency_ms: u32,
    /// Price data model.
    pub model: DataModel,
    /// Report handle the artifact is written under.
    pub report_handle: String,
    /// Initial deposit.
    pub deposit: f64,
    /// Account currency code.
    pub currency: String,
    /// Account leverage.
    pub leverage: u32,
    /// Stage-local timeout in seconds.
    pub timeout_secs: u64,
}

/// Request for an optimization sweep.
///
/// # Invariants
/// - `report_handle` is unique within the workflow's output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRequest {
    /// Compiled EA path.
    pub ea_path: PathBuf,
    /// Target symbol.
    pub symbol: String,
    /// Timeframe token.
    pub timeframe: String,
    /// Sweep directives.
    pub ranges: Vec<OptimizationRange>,
    /// Inclusive period start.
    pub period_start: Date,
    /// Forward-split date.
    pub forward_date: Date,
    /// Inclusive period end.
    pub period_end: Date,
    /// Price data model.
    pub model: DataModel,
    /// Simulated execution latency, milliseconds.
    pub latency_ms: u32,
    /// Report handle the artifact is written under.
    pub report_handle: String,
    /// Initial deposit.
    pub deposit: f64,
    /// Account currency code.
    pub currency: String,
    /// Account leverage.
    pub leverage: u32,
    /// Hard sweep timeout in seconds.
    pub timeout_secs: u64,
    /// Heartbeat interval for the progress sink, seconds.
    pub heartbeat_secs: u64,
}

// ============================================================================
// SECTION: Runner Results
// ============================================================================

/// One compiler message with optional source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileMessage {
    /// 1-based source line, when the compiler reported one.
    pub line: Option<u32>,
    /// Message text.
    pub text: String,
}

/// Result of a compile invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    /// Whether compilation succeeded.
    pub success: bool,
    /// Compiled artifact path on success.
    pub compiled_path: Option<PathBuf>,
    /// Compiler errors.
    pub errors: Vec<CompileMessage>,
    /// Compiler warnings.
    pub warnings: Vec<String>,
}

/// Result of a single evaluation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Run metrics.
    pub metrics: TradeMetrics,
    /// Closed-trade list from the run artifact.
    pub trades: Vec<Trade>,
    /// Report artifact path.
    pub report_path: PathBuf,
}

/// Result of an optimization sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    /// Number of passes the sweep produced.
    pub pass_count: u64,
    /// Merged pass table.
    pub passes: Vec<Pass>,
    /// Raw sweep artifact path.
    pub artifact_path: PathBuf,
}

// ============================================================================
// SECTION: Runner Errors
// ============================================================================

/// Runner protocol errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling and error taxonomy
///   mapping.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Runner or editor binary missing; fatal preflight failure.
    #[error("runner binary missing: {0}")]
    BinaryMissing(PathBuf),
    /// Operation exceeded its timeout; cleanup was attempted.
    #[error("runner operation timed out after {seconds}s")]
    Timeout {
        /// Timeout that expired, seconds.
        seconds: u64,
    },
    /// Output artifact could not be read.
    #[error("runner artifact unreadable: {0}")]
    ArtifactUnreadable(String),
    /// Output artifact did not match the expected schema.
    #[error("runner artifact schema mismatch: {0}")]
    SchemaMismatch(String),
    /// Subprocess failed to launch or exited abnormally.
    #[error("runner process error: {0}")]
    Process(String),
    /// Filesystem error while preparing or collecting a run.
    #[error("runner io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Abstract contract for the external evaluation engine.
pub trait Runner {
    /// Compiles an EA source file.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] for binary-missing or unreadable-log
    /// failures; compile diagnostics are reported through [`CompileResult`].
    fn compile(&self, source: &Path) -> Result<CompileResult, RunnerError>;

    /// Executes a single deterministic evaluation run.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the run fails or times out.
    fn run_single(&self, request: &SingleRunRequest) -> Result<RunResult, RunnerError>;

    /// Executes an optimization sweep, reporting liveness via the sink.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the sweep fails or exceeds its timeout.
    fn run_sweep(
        &self,
        request: &SweepRequest,
        progress: &dyn ProgressSink,
    ) -> Result<SweepResult, RunnerError>;

    /// Lists the months covered by installed tick archives for a symbol.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the archive directory cannot be probed.
    fn tick_archive_months(&self, symbol: &str) -> Result<Vec<MonthStamp>, RunnerError>;
}

// ============================================================================
// SECTION: Progress Sink
// ============================================================================

/// Liveness event emitted during long-running sweeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Report handle of the sweep being watched.
    pub report_handle: String,
    /// Seconds elapsed since the sweep started.
    pub elapsed_secs: u64,
    /// Passes completed so far, when the runner reports them.
    pub passes_completed: Option<u64>,
}

/// Heartbeat sink guarding against silent sweep hangs.
pub trait ProgressSink {
    /// Records one liveness event.
    fn heartbeat(&self, event: &ProgressEvent);
}

/// Progress sink that logs heartbeats through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn heartbeat(&self, event: &ProgressEvent) {
        tracing::info!(
            sweep = %event.report_handle,
            elapsed_secs = event.elapsed_secs,
            passes = event.passes_completed,
            "sweep heartbeat"
        );
    }
}

// ============================================================================
// SECTION: Process Janitor
// ============================================================================

/// Process-cleanup errors.
#[derive(Debug, Error)]
pub enum JanitorError {
    /// Enumeration or termination failed.
    #[error("process cleanup error: {0}")]
    Cleanup(String),
}

/// Kills stray runner processes before and after sweeps.
pub trait ProcessJanitor {
    /// Terminates every process whose executable matches the given path.
    ///
    /// Returns the number of processes terminated.
    ///
    /// # Errors
    ///
    /// Returns [`JanitorError`] when enumeration or termination fails.
    fn kill_matching(&self, executable: &Path) -> Result<u32, JanitorError>;
}

// ============================================================================
// SECTION: Workflow Store
// ============================================================================

/// Workflow store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("workflow store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("workflow store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("workflow store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("workflow store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("workflow store error: {0}")]
    Store(String),
}

/// Durable workflow state store.
pub trait WorkflowStore {
    /// Loads a workflow state by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load(&self, workflow_id: &WorkflowId) -> Result<Option<WorkflowState>, StoreError>;

    /// Saves a workflow state snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn save(&self, state: &WorkflowState) -> Result<(), StoreError>;

    /// Lists every persisted workflow identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list(&self) -> Result<Vec<WorkflowId>, StoreError>;
}

// ============================================================================
// SECTION: Artifact Spill Sink
// ============================================================================

/// Artifact spill errors.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Spill sink reported an error.
    #[error("artifact error: {0}")]
    Sink(String),
}

/// Sink through which stages spill large auxiliary data.
///
/// Stages receive a sink from the engine and reference spilled files by the
/// returned path in their results; they never write into the shared output
/// directory themselves.
pub trait PathSink {
    /// Writes a JSON artifact under the workflow directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when writing fails.
    fn write_json(
        &self,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<PathBuf, ArtifactError>;

    /// Writes a text artifact under the workflow directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when writing fails.
    fn write_text(&self, name: &str, content: &str) -> Result<PathBuf, ArtifactError>;
}

// ============================================================================
// SECTION: Report Sink
// ============================================================================

/// Report generation errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Report builder reported an error.
    #[error("report error: {0}")]
    Build(String),
}

/// Builder for report artifacts.
pub trait ReportSink {
    /// Publishes the per-workflow dashboard artifact set.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when writing fails.
    fn publish(
        &self,
        state: &WorkflowState,
        reports_dir: &Path,
    ) -> Result<Vec<PathBuf>, ReportError>;

    /// Publishes the cross-workflow leaderboard and summary boards.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when writing fails.
    fn publish_boards(
        &self,
        states: &[WorkflowState],
        reports_dir: &Path,
    ) -> Result<Vec<PathBuf>, ReportError>;
}
