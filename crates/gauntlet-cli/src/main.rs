// crates/gauntlet-cli/src/main.rs
// ============================================================================
// Module: Gauntlet CLI Entry Point
// Description: Command dispatcher for workflow start, resume, and reporting.
// Purpose: Expose the pipeline entry points to operators and agents.
// Dependencies: clap, gauntlet-config, gauntlet-core, gauntlet-reports,
// gauntlet-runner, gauntlet-store-json, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `gauntlet` binary wires the terminal runner, the JSON workflow store,
//! and the dashboard builder into the pipeline engine, exposing one
//! subcommand per engine entry point plus status and board-refresh
//! utilities. Agent payloads arrive as JSON files matching the pause-point
//! contracts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use gauntlet_config::ConfigError;
use gauntlet_config::load_config;
use gauntlet_config::load_default;
use gauntlet_core::GauntletConfig;
use gauntlet_core::OptimizationRange;
use gauntlet_core::ParamValue;
use gauntlet_core::Pipeline;
use gauntlet_core::PipelineError;
use gauntlet_core::RefineDecision;
use gauntlet_core::RunnerHandle;
use gauntlet_core::StartRequest;
use gauntlet_core::Timestamp;
use gauntlet_core::WorkflowId;
use gauntlet_core::WorkflowState;
use gauntlet_core::interfaces::ReportSink;
use gauntlet_core::interfaces::WorkflowStore;
use gauntlet_reports::DashboardSink;
use gauntlet_runner::TerminalConfig;
use gauntlet_runner::TerminalRunner;
use gauntlet_store_json::JsonWorkflowStore;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "gauntlet", version, arg_required_else_help = true)]
struct Cli {
    /// Optional config file path (defaults to gauntlet.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a new workflow.
    Start(StartCommand),
    /// Resume an awaiting-params workflow with an analysis payload.
    ResumeParams(ResumeParamsCommand),
    /// Resume an awaiting-fix workflow with a patched source file.
    ResumeFix(ResumeFixCommand),
    /// Resume an awaiting-refine-decision workflow.
    ResumeRefine(ResumeRefineCommand),
    /// Resume an awaiting-selection workflow with pass indices.
    ResumeSelect(ResumeSelectCommand),
    /// Print a workflow's persisted state.
    Status(StatusCommand),
    /// Rebuild the cross-workflow leaderboard and summary boards.
    Boards,
}

/// Arguments for `start`.
#[derive(Args, Debug)]
struct StartCommand {
    /// Workflow identifier.
    #[arg(long, value_name = "ID")]
    workflow: String,
    /// EA source path.
    #[arg(long, value_name = "PATH")]
    ea: PathBuf,
    /// Target symbol.
    #[arg(long, value_name = "SYMBOL")]
    symbol: String,
    /// Target timeframe token (M1..MN1).
    #[arg(long, value_name = "TIMEFRAME", default_value = "H1")]
    timeframe: String,
    /// Runner installation handle.
    #[arg(long, value_name = "HANDLE")]
    runner: String,
}

/// Arguments for `resume-params`.
#[derive(Args, Debug)]
struct ResumeParamsCommand {
    /// Workflow identifier.
    #[arg(long, value_name = "ID")]
    workflow: String,
    /// JSON payload file with wide params and ranges.
    #[arg(long, value_name = "PATH")]
    payload: PathBuf,
}

/// Arguments for `resume-fix`.
#[derive(Args, Debug)]
struct ResumeFixCommand {
    /// Workflow identifier.
    #[arg(long, value_name = "ID")]
    workflow: String,
    /// Patched source file.
    #[arg(long, value_name = "PATH")]
    source: PathBuf,
}

/// Arguments for `resume-refine`.
#[derive(Args, Debug)]
struct ResumeRefineCommand {
    /// Workflow identifier.
    #[arg(long, value_name = "ID")]
    workflow: String,
    /// Proceed to selection instead of refining.
    #[arg(long, conflicts_with = "ranges")]
    proceed: bool,
    /// JSON file with refined ranges.
    #[arg(long, value_name = "PATH")]
    ranges: Option<PathBuf>,
}

/// Arguments for `resume-select`.
#[derive(Args, Debug)]
struct ResumeSelectCommand {
    /// Workflow identifier.
    #[arg(long, value_name = "ID")]
    workflow: String,
    /// Selected pass indices.
    #[arg(long, value_name = "INDEX", num_args = 1.., required = true)]
    passes: Vec<u32>,
}

/// Arguments for `status`.
#[derive(Args, Debug)]
struct StatusCommand {
    /// Workflow identifier.
    #[arg(long, value_name = "ID")]
    workflow: String,
}

// ============================================================================
// SECTION: Payload Schemas
// ============================================================================

/// JSON payload for `resume-params`.
#[derive(Debug, Deserialize)]
struct ParamsPayload {
    /// Wide-validation values keyed by parameter name.
    wide_params: BTreeMap<String, ParamValue>,
    /// Sweep directives.
    ranges: Vec<OptimizationRange>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI-level errors.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Engine rejected the operation.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] gauntlet_core::interfaces::StoreError),
    /// Report builder failed.
    #[error(transparent)]
    Report(#[from] gauntlet_core::interfaces::ReportError),
    /// A payload file could not be read or parsed.
    #[error("payload error: {0}")]
    Payload(String),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

/// Dispatches the parsed command.
fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_default()?,
    };
    let now = system_now();

    match cli.command {
        Commands::Start(cmd) => {
            let pipeline = build_pipeline(&config)?;
            let state = pipeline.start(
                StartRequest {
                    workflow_id: WorkflowId::new(cmd.workflow),
                    ea_source_path: cmd.ea,
                    symbol: cmd.symbol,
                    timeframe: cmd.timeframe,
                    runner_handle: RunnerHandle::new(cmd.runner),
                    seeded_params: None,
                    allow_multi_pair: true,
                },
                now,
            )?;
            summarize(&state);
            Ok(())
        }
        Commands::ResumeParams(cmd) => {
            let payload: ParamsPayload = read_json(&cmd.payload)?;
            let pipeline = build_pipeline(&config)?;
            let state = pipeline.resume_with_params(
                &WorkflowId::new(cmd.workflow),
                payload.wide_params,
                payload.ranges,
                now,
            )?;
            summarize(&state);
            Ok(())
        }
        Commands::ResumeFix(cmd) => {
            let content = fs::read_to_string(&cmd.source).map_err(|err| {
                CliError::Payload(format!("read {}: {err}", cmd.source.display()))
            })?;
            let pipeline = build_pipeline(&config)?;
            let state = pipeline.resume_with_patched_source(
                &WorkflowId::new(cmd.workflow),
                content,
                now,
            )?;
            summarize(&state);
            Ok(())
        }
        Commands::ResumeRefine(cmd) => {
            let decision = if cmd.proceed {
                RefineDecision::Proceed
            } else {
                let path = cmd.ranges.ok_or_else(|| {
                    CliError::Payload("either --proceed or --ranges is required".to_string())
                })?;
                RefineDecision::Refine {
                    ranges: read_json(&path)?,
                }
            };
            let pipeline = build_pipeline(&config)?;
            let state =
                pipeline.resume_with_refine_decision(&WorkflowId::new(cmd.workflow), decision, now)?;
            summarize(&state);
            Ok(())
        }
        Commands::ResumeSelect(cmd) => {
            let pipeline = build_pipeline(&config)?;
            let state = pipeline.resume_with_selection(
                &WorkflowId::new(cmd.workflow),
                cmd.passes,
                now,
            )?;
            summarize(&state);
            Ok(())
        }
        Commands::Status(cmd) => {
            let store = JsonWorkflowStore::open(&config.paths.runs_dir)?;
            let state = store
                .load(&WorkflowId::new(cmd.workflow.clone()))?
                .ok_or(PipelineError::WorkflowNotFound(cmd.workflow))?;
            summarize(&state);
            Ok(())
        }
        Commands::Boards => {
            let store = JsonWorkflowStore::open(&config.paths.runs_dir)?;
            let mut states = Vec::new();
            for id in store.list()? {
                if let Some(state) = store.load(&id)? {
                    states.push(state);
                }
            }
            let reports_dir = config.paths.runs_dir.join("reports");
            let written = DashboardSink.publish_boards(&states, &reports_dir)?;
            for path in written {
                tracing::info!(artifact = %path.display(), "board written");
            }
            Ok(())
        }
    }
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Builds the pipeline over the terminal runner and JSON store.
fn build_pipeline(
    config: &GauntletConfig,
) -> Result<Pipeline<TerminalRunner, JsonWorkflowStore>, CliError> {
    let runner = TerminalRunner::new(TerminalConfig {
        terminal_binary: config.paths.terminal_binary.clone(),
        editor_binary: config.paths.editor_binary.clone(),
        output_dir: config.paths.runs_dir.join("terminal"),
        tick_data_dir: config.paths.tick_data_dir.clone(),
    });
    let store = JsonWorkflowStore::open(&config.paths.runs_dir)?;
    Ok(Pipeline::new(config.clone(), runner, store, Box::new(DashboardSink)))
}

/// Reads and parses a JSON payload file.
fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|err| CliError::Payload(format!("read {}: {err}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|err| CliError::Payload(format!("parse {}: {err}", path.display())))
}

/// Logs a one-line outcome summary for a workflow.
fn summarize(state: &WorkflowState) {
    tracing::info!(
        workflow = %state.workflow_id,
        status = %state.status,
        score = state.composite_score,
        go_live = state.go_live,
        fix_attempts = state.fix_attempts,
        refine_iterations = state.refine_iterations,
        "workflow state"
    );
}

/// Returns the wall-clock time as a timestamp.
#[allow(clippy::cast_possible_truncation, reason = "Epoch millis fit i64 for any sane clock.")]
fn system_now() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis() as i64);
    Timestamp::from_unix_millis(millis)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use clap::CommandFactory;

    use super::Cli;
    use super::ParamsPayload;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn params_payload_parses_the_pause_contract() {
        let payload: ParamsPayload = serde_json::from_str(
            r#"{
                "wide_params": {
                    "Lots": { "kind": "real", "value": 0.1 },
                    "UseFilter": { "kind": "boolean", "value": true }
                },
                "ranges": [
                    { "name": "Lots", "directive": { "mode": "sweep", "start": 0.1, "step": 0.1, "stop": 0.5 } },
                    { "name": "UseFilter", "directive": { "mode": "fixed", "value": { "kind": "boolean", "value": true } } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(payload.wide_params.len(), 2);
        assert_eq!(payload.ranges.len(), 2);
        assert!(payload.ranges[0].optimize());
        assert!(!payload.ranges[1].optimize());
    }
}
