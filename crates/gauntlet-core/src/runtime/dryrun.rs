// crates/gauntlet-core/src/runtime/dryrun.rs
// ============================================================================
// Module: Gauntlet Dry-Run Runner
// Description: Scripted Runner implementation with an inspectable call log.
// Purpose: Drive pipeline tests without ever touching a real terminal.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! `DryRunRunner` satisfies the [`Runner`] contract with pre-programmed
//! responses, queued per operation, and records every call it receives. All
//! unit and property tests of the pipeline engine use this implementation;
//! none may invoke a real runner.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::MonthStamp;
use crate::interfaces::CompileResult;
use crate::interfaces::ProgressEvent;
use crate::interfaces::ProgressSink;
use crate::interfaces::RunResult;
use crate::interfaces::Runner;
use crate::interfaces::RunnerError;
use crate::interfaces::SingleRunRequest;
use crate::interfaces::SweepRequest;
use crate::interfaces::SweepResult;

// ============================================================================
// SECTION: Call Log
// ============================================================================

/// One recorded runner invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerCall {
    /// Compile invocation with the source path.
    Compile(PathBuf),
    /// Single run with its report handle and symbol.
    Single {
        /// Report handle the run was keyed under.
        report_handle: String,
        /// Symbol evaluated.
        symbol: String,
    },
    /// Sweep with its report handle.
    Sweep {
        /// Report handle the sweep was keyed under.
        report_handle: String,
    },
    /// Tick-archive probe for a symbol.
    TickArchive(String),
}

// ============================================================================
// SECTION: Dry-Run Runner
// ============================================================================

/// Scripted runner for pipeline tests.
///
/// Responses are queued per operation and consumed in order; an exhausted
/// queue yields a process error so tests fail loudly on unscripted calls.
/// Clones share their queues and call log, so a test can keep a handle
/// after moving the runner into the engine.
#[derive(Debug, Default, Clone)]
pub struct DryRunRunner {
    /// Queued compile responses.
    compiles: Arc<Mutex<Vec<Result<CompileResult, RunnerError>>>>,
    /// Queued single-run responses.
    singles: Arc<Mutex<Vec<Result<RunResult, RunnerError>>>>,
    /// Queued sweep responses.
    sweeps: Arc<Mutex<Vec<Result<SweepResult, RunnerError>>>>,
    /// Months reported by the tick-archive probe.
    tick_months: Arc<Mutex<Vec<MonthStamp>>>,
    /// Recorded calls in arrival order.
    calls: Arc<Mutex<Vec<RunnerCall>>>,
}

impl DryRunRunner {
    /// Creates an empty dry-run runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a compile response.
    pub fn push_compile(&self, response: Result<CompileResult, RunnerError>) {
        if let Ok(mut guard) = self.compiles.lock() {
            guard.push(response);
        }
    }

    /// Queues a single-run response.
    pub fn push_single(&self, response: Result<RunResult, RunnerError>) {
        if let Ok(mut guard) = self.singles.lock() {
            guard.push(response);
        }
    }

    /// Queues a sweep response.
    pub fn push_sweep(&self, response: Result<SweepResult, RunnerError>) {
        if let Ok(mut guard) = self.sweeps.lock() {
            guard.push(response);
        }
    }

    /// Sets the months the tick-archive probe reports.
    pub fn set_tick_months(&self, months: Vec<MonthStamp>) {
        if let Ok(mut guard) = self.tick_months.lock() {
            *guard = months;
        }
    }

    /// Returns a copy of the recorded call log.
    #[must_use]
    pub fn calls(&self) -> Vec<RunnerCall> {
        self.calls.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Returns every report handle the runner was invoked with.
    #[must_use]
    pub fn report_handles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RunnerCall::Single {
                    report_handle, ..
                }
                | RunnerCall::Sweep {
                    report_handle,
                } => Some(report_handle),
                RunnerCall::Compile(_) | RunnerCall::TickArchive(_) => None,
            })
            .collect()
    }

    /// Records a call in the log.
    fn record(&self, call: RunnerCall) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call);
        }
    }

    /// Pops the next queued response or reports an unscripted call.
    fn pop<T>(queue: &Mutex<Vec<Result<T, RunnerError>>>, what: &str) -> Result<T, RunnerError> {
        let mut guard =
            queue.lock().map_err(|_| RunnerError::Process("dry-run mutex poisoned".to_string()))?;
        if guard.is_empty() {
            return Err(RunnerError::Process(format!("unscripted dry-run {what} call")));
        }
        Ok(guard.remove(0)?)
    }
}

impl Runner for DryRunRunner {
    fn compile(&self, source: &Path) -> Result<CompileResult, RunnerError> {
        self.record(RunnerCall::Compile(source.to_path_buf()));
        Self::pop(&self.compiles, "compile")
    }

    fn run_single(&self, request: &SingleRunRequest) -> Result<RunResult, RunnerError> {
        self.record(RunnerCall::Single {
            report_handle: request.report_handle.clone(),
            symbol: request.symbol.clone(),
        });
        Self::pop(&self.singles, "single-run")
    }

    fn run_sweep(
        &self,
        request: &SweepRequest,
        progress: &dyn ProgressSink,
    ) -> Result<SweepResult, RunnerError> {
        self.record(RunnerCall::Sweep {
            report_handle: request.report_handle.clone(),
        });
        progress.heartbeat(&ProgressEvent {
            report_handle: request.report_handle.clone(),
            elapsed_secs: 0,
            passes_completed: None,
        });
        Self::pop(&self.sweeps, "sweep")
    }

    fn tick_archive_months(&self, symbol: &str) -> Result<Vec<MonthStamp>, RunnerError> {
        self.record(RunnerCall::TickArchive(symbol.to_string()));
        Ok(self.tick_months.lock().map(|guard| guard.clone()).unwrap_or_default())
    }
}
