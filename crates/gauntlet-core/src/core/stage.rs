// crates/gauntlet-core/src/core/stage.rs
// ============================================================================
// Module: Gauntlet Stage Vocabulary
// Description: Stage names, failure categories, and stage result records.
// Purpose: Provide the well-known stage vocabulary shared by engine and reports.
// Dependencies: crate::core::gates, serde
// ============================================================================

//! ## Overview
//! Stage names form a closed vocabulary with stable kebab-case wire forms.
//! Every stage belongs to a failure category that the engine consults when a
//! stage fails: fatal stages end the workflow, the gate-fatal backtest stage
//! ends it only when no pass meets its gates, and informational stages record
//! their errors and let the pipeline continue. The report stage always runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::gates::GateResult;

// ============================================================================
// SECTION: Stage Names
// ============================================================================

/// Closed vocabulary of pipeline stage names.
///
/// # Invariants
/// - Wire forms are stable kebab-case strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    /// Verify the EA source file exists.
    LoadEa,
    /// Append the custom optimization criterion to the source.
    InjectInstrumentation,
    /// Inject spread/slippage limits and disable foreign side effects.
    InjectSafety,
    /// Compile the modified source.
    Compile,
    /// Extract input parameters from the modified source.
    ExtractParams,
    /// Record and validate agent-supplied parameters and ranges.
    RecordAnalyzedParams,
    /// Run the wide-parameter validation backtest.
    ValidateTrades,
    /// Accept a patched source and restart the pipeline.
    RepairEa,
    /// Translate ranges into the runner configuration file.
    CreateIni,
    /// Execute the optimization sweep.
    RunOptimization,
    /// Parse, merge, filter, and score the sweep results.
    ParseResults,
    /// Analyze top passes and decide on range refinement.
    AnalyzeAndRefine,
    /// Select passes for confirmation backtests.
    SelectPasses,
    /// Re-run each selected pass over the full period.
    BacktestSelected,
    /// Shuffle-simulate the best pass's trade sequence.
    MonteCarlo,
    /// Run shorter-window and alternative-model stress scenarios.
    StressScenarios,
    /// Compute offline forward-window metric slices.
    ForwardWindows,
    /// Spawn child workflows for additional symbols.
    MultiPair,
    /// Produce report artifacts and the go-live verdict.
    GenerateReports,
}

impl StageName {
    /// Returns the stable kebab-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoadEa => "load-ea",
            Self::InjectInstrumentation => "inject-instrumentation",
            Self::InjectSafety => "inject-safety",
            Self::Compile => "compile",
            Self::ExtractParams => "extract-params",
            Self::RecordAnalyzedParams => "record-analyzed-params",
            Self::ValidateTrades => "validate-trades",
            Self::RepairEa => "repair-ea",
            Self::CreateIni => "create-ini",
            Self::RunOptimization => "run-optimization",
            Self::ParseResults => "parse-results",
            Self::AnalyzeAndRefine => "analyze-and-refine",
            Self::SelectPasses => "select-passes",
            Self::BacktestSelected => "backtest-selected",
            Self::MonteCarlo => "monte-carlo",
            Self::StressScenarios => "stress-scenarios",
            Self::ForwardWindows => "forward-windows",
            Self::MultiPair => "multi-pair",
            Self::GenerateReports => "generate-reports",
        }
    }

    /// Returns the failure category of the stage.
    #[must_use]
    pub const fn category(self) -> StageCategory {
        match self {
            Self::LoadEa
            | Self::InjectInstrumentation
            | Self::InjectSafety
            | Self::Compile
            | Self::ExtractParams
            | Self::RecordAnalyzedParams
            | Self::ValidateTrades
            | Self::RepairEa
            | Self::CreateIni
            | Self::RunOptimization
            | Self::ParseResults
            | Self::AnalyzeAndRefine
            | Self::SelectPasses => StageCategory::Fatal,
            Self::BacktestSelected => StageCategory::GateFatal,
            Self::MonteCarlo | Self::StressScenarios | Self::ForwardWindows | Self::MultiPair => {
                StageCategory::Informational
            }
            Self::GenerateReports => StageCategory::Always,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Failure Categories
// ============================================================================

/// Failure category consulted when a stage reports failure.
///
/// # Invariants
/// - Variants are stable for serialization and engine dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCategory {
    /// Failure ends the workflow (reports still generated).
    Fatal,
    /// Failure ends the workflow only when no pass meets the gates.
    GateFatal,
    /// Failure is recorded and the pipeline continues.
    Informational,
    /// The stage always runs, regardless of upstream outcomes.
    Always,
}

// ============================================================================
// SECTION: Stage Result
// ============================================================================

/// Immutable result record appended after each stage execution.
///
/// # Invariants
/// - Immutable once appended to the workflow state.
/// - Every entry in `gates` reflects a gate check the stage owns; any failed
///   gate marks the result unsuccessful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage that produced the record.
    pub stage: StageName,
    /// Whether the stage completed successfully.
    pub success: bool,
    /// Structured result data for report consumers.
    pub data: BTreeMap<String, serde_json::Value>,
    /// Gate outcomes owned by the stage, in evaluation order.
    pub gates: Vec<GateResult>,
    /// Errors recorded by the stage.
    pub errors: Vec<String>,
}

impl StageResult {
    /// Creates a successful result with empty data.
    #[must_use]
    pub fn success(stage: StageName) -> Self {
        Self {
            stage,
            success: true,
            data: BTreeMap::new(),
            gates: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Creates a failed result carrying one error message.
    #[must_use]
    pub fn failure(stage: StageName, error: impl Into<String>) -> Self {
        Self {
            stage,
            success: false,
            data: BTreeMap::new(),
            gates: Vec::new(),
            errors: vec![error.into()],
        }
    }

    /// Attaches a data entry.
    #[must_use]
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Attaches a gate outcome, marking the result failed on a failed gate.
    #[must_use]
    pub fn with_gate(mut self, gate: GateResult) -> Self {
        if !gate.passed {
            self.success = false;
        }
        self.gates.push(gate);
        self
    }
}
