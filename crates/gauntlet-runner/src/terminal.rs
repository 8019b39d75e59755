// crates/gauntlet-runner/src/terminal.rs
// ============================================================================
// Module: Terminal Runner
// Description: Drives the trading terminal for compile, run, and sweep.
// Purpose: Implement the Runner contract over real subprocesses.
// Dependencies: crate::{process, xml}, gauntlet-core
// ============================================================================

//! ## Overview
//! `TerminalRunner` launches the editor binary for compilation and the
//! terminal binary for runs and sweeps, each driven by a generated
//! configuration file and collected through its report handle. Sweeps clean
//! up stray terminal processes first, heartbeat through the progress sink,
//! and terminate residual processes on timeout. Artifacts are resolved at
//! `<output>/reports/<handle>.xml`, never by scanning for the newest file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use gauntlet_core::CompileMessage;
use gauntlet_core::CompileResult;
use gauntlet_core::MonthStamp;
use gauntlet_core::OptimizationRange;
use gauntlet_core::ProcessJanitor;
use gauntlet_core::ProgressEvent;
use gauntlet_core::ProgressSink;
use gauntlet_core::RunResult;
use gauntlet_core::Runner;
use gauntlet_core::RunnerError;
use gauntlet_core::SingleRunRequest;
use gauntlet_core::SweepRequest;
use gauntlet_core::SweepResult;
use gauntlet_core::ini::SessionSettings;
use gauntlet_core::ini::emit_sweep_ini;
use gauntlet_core::ini::timeframe_minutes;

use crate::process::CommandJanitor;
use crate::process::WaitOutcome;
use crate::process::wait_with_timeout;
use crate::xml::parse_single_run;
use crate::xml::parse_sweep;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Locations of the terminal installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalConfig {
    /// Terminal executable path.
    pub terminal_binary: PathBuf,
    /// Editor (compiler) executable path.
    pub editor_binary: PathBuf,
    /// Directory the terminal writes configuration and reports into.
    pub output_dir: PathBuf,
    /// Monthly tick-archive directory, when tick data is installed.
    pub tick_data_dir: Option<PathBuf>,
}

// ============================================================================
// SECTION: Terminal Runner
// ============================================================================

/// Runner implementation driving a real terminal installation.
#[derive(Debug, Clone)]
pub struct TerminalRunner {
    /// Installation locations.
    config: TerminalConfig,
    /// Stray-process janitor.
    janitor: CommandJanitor,
}

impl TerminalRunner {
    /// Creates a runner over a terminal installation.
    #[must_use]
    pub const fn new(config: TerminalConfig) -> Self {
        Self {
            config,
            janitor: CommandJanitor,
        }
    }

    /// Returns the artifact path for a report handle.
    fn report_path(&self, handle: &str) -> PathBuf {
        self.config.output_dir.join("reports").join(format!("{handle}.xml"))
    }

    /// Writes a configuration file for the given handle.
    fn write_ini(&self, handle: &str, content: &str) -> Result<PathBuf, RunnerError> {
        let dir = self.config.output_dir.join("ini");
        fs::create_dir_all(&dir)
            .map_err(|err| RunnerError::Io(format!("create {}: {err}", dir.display())))?;
        let path = dir.join(format!("{handle}.ini"));
        fs::write(&path, content)
            .map_err(|err| RunnerError::Io(format!("write {}: {err}", path.display())))?;
        Ok(path)
    }

    /// Reads and parses the artifact written under a handle.
    fn collect_artifact(&self, handle: &str) -> Result<(String, PathBuf), RunnerError> {
        let path = self.report_path(handle);
        let text = fs::read_to_string(&path)
            .map_err(|err| RunnerError::ArtifactUnreadable(format!("{}: {err}", path.display())))?;
        Ok((text, path))
    }

    /// Launches the terminal against a configuration file.
    fn launch_terminal(&self, ini: &Path) -> Result<std::process::Child, RunnerError> {
        if !self.config.terminal_binary.is_file() {
            return Err(RunnerError::BinaryMissing(self.config.terminal_binary.clone()));
        }
        Command::new(&self.config.terminal_binary)
            .arg(format!("/config:{}", ini.display()))
            .spawn()
            .map_err(|err| RunnerError::Process(format!("spawn terminal: {err}")))
    }
}

impl Runner for TerminalRunner {
    fn compile(&self, source: &Path) -> Result<CompileResult, RunnerError> {
        if !self.config.editor_binary.is_file() {
            return Err(RunnerError::BinaryMissing(self.config.editor_binary.clone()));
        }
        let log_path = source.with_extension("log");
        let status = Command::new(&self.config.editor_binary)
            .arg(format!("/compile:{}", source.display()))
            .arg(format!("/log:{}", log_path.display()))
            .status()
            .map_err(|err| RunnerError::Process(format!("spawn editor: {err}")))?;

        let log = fs::read_to_string(&log_path).map_err(|err| {
            RunnerError::ArtifactUnreadable(format!("{}: {err}", log_path.display()))
        })?;
        let (errors, warnings) = parse_compile_log(&log);
        let compiled = source.with_extension("ex5");
        let success = status.success() && errors.is_empty() && compiled.is_file();
        tracing::info!(
            source = %source.display(),
            errors = errors.len(),
            warnings = warnings.len(),
            "compile finished"
        );
        Ok(CompileResult {
            success,
            compiled_path: success.then_some(compiled),
            errors,
            warnings,
        })
    }

    fn run_single(&self, request: &SingleRunRequest) -> Result<RunResult, RunnerError> {
        let period_minutes = timeframe_minutes(&request.timeframe)
            .ok_or_else(|| RunnerError::Process(format!("unknown timeframe {}", request.timeframe)))?;
        let ranges: Vec<OptimizationRange> = request
            .inputs
            .iter()
            .map(|(name, value)| OptimizationRange::fixed(name.clone(), value.clone()))
            .collect();
        let session = SessionSettings {
            expert: expert_name(&request.ea_path),
            symbol: request.symbol.clone(),
            period_minutes,
            from_date: request.period_start,
            to_date: request.period_end,
            forward_date: request.period_end,
            model: request.model,
            latency_ms: request.latency_ms,
            report_handle: request.report_handle.clone(),
            deposit: request.deposit,
            currency: request.currency.clone(),
            leverage: request.leverage,
        };
        let ini = self.write_ini(&request.report_handle, &emit_sweep_ini(&session, &ranges))?;

        let mut child = self.launch_terminal(&ini)?;
        let outcome = wait_with_timeout(
            &mut child,
            Duration::from_secs(request.timeout_secs),
            Duration::from_secs(request.timeout_secs.max(1)),
            |_| {},
        )
        .map_err(RunnerError::Process)?;
        if outcome == WaitOutcome::TimedOut {
            if let Err(err) = self.janitor.kill_matching(&self.config.terminal_binary) {
                tracing::warn!(error = %err, "post-timeout process cleanup failed");
            }
            return Err(RunnerError::Timeout {
                seconds: request.timeout_secs,
            });
        }

        let (text, report_path) = self.collect_artifact(&request.report_handle)?;
        let (metrics, trades) =
            parse_single_run(&text).map_err(|err| RunnerError::SchemaMismatch(err.to_string()))?;
        Ok(RunResult {
            metrics,
            trades,
            report_path,
        })
    }

    fn run_sweep(
        &self,
        request: &SweepRequest,
        progress: &dyn ProgressSink,
    ) -> Result<SweepResult, RunnerError> {
        // Stragglers from a previous sweep hold the data-directory lock.
        if let Err(err) = self.janitor.kill_matching(&self.config.terminal_binary) {
            tracing::warn!(error = %err, "pre-sweep process cleanup failed");
        }

        let period_minutes = timeframe_minutes(&request.timeframe)
            .ok_or_else(|| RunnerError::Process(format!("unknown timeframe {}", request.timeframe)))?;
        let session = SessionSettings {
            expert: expert_name(&request.ea_path),
            symbol: request.symbol.clone(),
            period_minutes,
            from_date: request.period_start,
            to_date: request.period_end,
            forward_date: request.forward_date,
            model: request.model,
            latency_ms: request.latency_ms,
            report_handle: request.report_handle.clone(),
            deposit: request.deposit,
            currency: request.currency.clone(),
            leverage: request.leverage,
        };
        let ini =
            self.write_ini(&request.report_handle, &emit_sweep_ini(&session, &request.ranges))?;

        let mut child = self.launch_terminal(&ini)?;
        let outcome = wait_with_timeout(
            &mut child,
            Duration::from_secs(request.timeout_secs),
            Duration::from_secs(request.heartbeat_secs.max(1)),
            |elapsed| {
                progress.heartbeat(&ProgressEvent {
                    report_handle: request.report_handle.clone(),
                    elapsed_secs: elapsed.as_secs(),
                    passes_completed: None,
                });
            },
        )
        .map_err(RunnerError::Process)?;
        if outcome == WaitOutcome::TimedOut {
            if let Err(err) = self.janitor.kill_matching(&self.config.terminal_binary) {
                tracing::warn!(error = %err, "post-timeout process cleanup failed");
            }
            return Err(RunnerError::Timeout {
                seconds: request.timeout_secs,
            });
        }

        let (text, artifact_path) = self.collect_artifact(&request.report_handle)?;
        let passes =
            parse_sweep(&text).map_err(|err| RunnerError::SchemaMismatch(err.to_string()))?;
        Ok(SweepResult {
            pass_count: passes.len() as u64,
            passes,
            artifact_path,
        })
    }

    fn tick_archive_months(&self, symbol: &str) -> Result<Vec<MonthStamp>, RunnerError> {
        let Some(root) = self.config.tick_data_dir.as_ref() else {
            return Ok(Vec::new());
        };
        let dir = root.join(symbol.to_ascii_uppercase());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(RunnerError::Io(format!("list {}: {err}", dir.display())));
            }
        };

        let mut months = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|err| RunnerError::Io(format!("list {}: {err}", dir.display())))?;
            if let Some(stamp) = month_from_name(&entry.path()) {
                months.push(stamp);
            }
        }
        months.sort();
        months.dedup();
        Ok(months)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the expert filename the terminal loads.
fn expert_name(ea_path: &Path) -> String {
    ea_path
        .file_name()
        .map_or_else(|| "expert.ex5".to_string(), |name| name.to_string_lossy().into_owned())
}

/// Parses a `YYYY-MM` month stamp out of an archive filename.
fn month_from_name(path: &Path) -> Option<MonthStamp> {
    let stem = path.file_stem()?.to_string_lossy();
    let (year, month) = stem.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    (1..=12).contains(&month).then(|| MonthStamp::new(year, month))
}

/// Splits a compiler log into errors and warnings.
fn parse_compile_log(log: &str) -> (Vec<CompileMessage>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for line in log.lines() {
        if line.contains(" : error ") || line.contains(": error") {
            errors.push(CompileMessage {
                line: log_line_number(line),
                text: line.trim().to_string(),
            });
        } else if line.contains(" : warning ") || line.contains(": warning") {
            warnings.push(line.trim().to_string());
        }
    }
    (errors, warnings)
}

/// Extracts the `(line,column)` source location from a compiler message.
fn log_line_number(line: &str) -> Option<u32> {
    let open = line.find('(')?;
    let rest = &line[open + 1..];
    let end = rest.find([',', ')'])?;
    rest[..end].trim().parse().ok()
}
