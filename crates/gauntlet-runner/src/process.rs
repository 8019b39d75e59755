// crates/gauntlet-runner/src/process.rs
// ============================================================================
// Module: Process Janitor and Timeouts
// Description: Stray-process cleanup and poll-loop subprocess timeouts.
// Purpose: Confine platform process handling to one module.
// Dependencies: gauntlet-core, std::process
// ============================================================================

//! ## Overview
//! The terminal occasionally leaves orphaned processes holding its working
//! directory lock. `CommandJanitor` terminates every process whose
//! executable matches a given path, delegating to the platform's process
//! tools. `wait_with_timeout` runs a child under a deadline, polling its
//! exit status and killing it when the deadline expires.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::process::Child;
use std::process::Command;
use std::time::Duration;
use std::time::Instant;

use gauntlet_core::JanitorError;
use gauntlet_core::ProcessJanitor;

// ============================================================================
// SECTION: Command Janitor
// ============================================================================

/// Process janitor delegating to platform process tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandJanitor;

impl ProcessJanitor for CommandJanitor {
    fn kill_matching(&self, executable: &Path) -> Result<u32, JanitorError> {
        let name = executable
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                JanitorError::Cleanup(format!("no file name in {}", executable.display()))
            })?;

        let status = if cfg!(windows) {
            Command::new("taskkill").args(["/F", "/IM", &name]).status()
        } else {
            Command::new("pkill").args(["-f", "-x", &name]).status()
        };

        match status {
            // pkill exits 1 when nothing matched; that is a clean no-op.
            Ok(status) if status.success() => Ok(1),
            Ok(_) => Ok(0),
            Err(err) => Err(JanitorError::Cleanup(err.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Timeout Wait
// ============================================================================

/// Outcome of waiting on a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The child exited with the given success flag.
    Exited {
        /// Whether the exit status was zero.
        success: bool,
    },
    /// The deadline expired; the child was killed.
    TimedOut,
}

/// Waits for a child under a deadline, invoking `on_tick` at the given
/// interval while the child runs.
///
/// # Errors
///
/// Returns an error string when polling or killing the child fails.
pub fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    tick_interval: Duration,
    mut on_tick: impl FnMut(Duration),
) -> Result<WaitOutcome, String> {
    let started = Instant::now();
    let mut last_tick = started;
    let poll = Duration::from_millis(200);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok(WaitOutcome::Exited {
                    success: status.success(),
                });
            }
            Ok(None) => {}
            Err(err) => return Err(format!("poll child: {err}")),
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            child.kill().map_err(|err| format!("kill child: {err}"))?;
            let _ = child.wait();
            return Ok(WaitOutcome::TimedOut);
        }
        if last_tick.elapsed() >= tick_interval {
            last_tick = Instant::now();
            on_tick(elapsed);
        }
        std::thread::sleep(poll);
    }
}
