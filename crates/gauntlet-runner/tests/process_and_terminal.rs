// crates/gauntlet-runner/tests/process_and_terminal.rs
// ============================================================================
// Module: Process and Terminal Helper Tests
// Description: Timeout waits, compile-log parsing, and archive probing.
// ============================================================================

//! Subprocess timeout behavior and the terminal runner's pure helpers. No
//! test here launches a real terminal; subprocesses are shell no-ops.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    missing_docs,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::time::Duration;

use gauntlet_core::MonthStamp;
use gauntlet_core::Runner;
use gauntlet_runner::TerminalConfig;
use gauntlet_runner::TerminalRunner;
use gauntlet_runner::process::WaitOutcome;
use gauntlet_runner::process::wait_with_timeout;

// ============================================================================
// SECTION: Timeout Waits
// ============================================================================

#[cfg(unix)]
#[test]
fn fast_child_exits_before_the_deadline() {
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let outcome = wait_with_timeout(
        &mut child,
        Duration::from_secs(5),
        Duration::from_secs(5),
        |_| {},
    )
    .unwrap();
    assert_eq!(outcome, WaitOutcome::Exited {
        success: true,
    });
}

#[cfg(unix)]
#[test]
fn slow_child_is_killed_at_the_deadline() {
    let mut child =
        std::process::Command::new("sleep").arg("30").spawn().unwrap();
    let mut ticks = 0_u32;
    let outcome = wait_with_timeout(
        &mut child,
        Duration::from_millis(600),
        Duration::from_millis(200),
        |_| ticks += 1,
    )
    .unwrap();
    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert!(ticks >= 1);
}

#[cfg(unix)]
#[test]
fn failing_child_reports_unsuccessful_exit() {
    let mut child = std::process::Command::new("false").spawn().unwrap();
    let outcome = wait_with_timeout(
        &mut child,
        Duration::from_secs(5),
        Duration::from_secs(5),
        |_| {},
    )
    .unwrap();
    assert_eq!(outcome, WaitOutcome::Exited {
        success: false,
    });
}

// ============================================================================
// SECTION: Tick Archive Probe
// ============================================================================

fn runner_with_ticks(tick_dir: &std::path::Path) -> TerminalRunner {
    TerminalRunner::new(TerminalConfig {
        terminal_binary: std::path::PathBuf::from("/nonexistent/terminal64.exe"),
        editor_binary: std::path::PathBuf::from("/nonexistent/metaeditor64.exe"),
        output_dir: tick_dir.join("out"),
        tick_data_dir: Some(tick_dir.to_path_buf()),
    })
}

#[test]
fn tick_archive_probe_lists_month_stamps() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("EURUSD");
    std::fs::create_dir_all(&dir).unwrap();
    for name in ["2023-11.tkc", "2023-12.tkc", "2024-01.tkc", "notes.txt"] {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    let runner = runner_with_ticks(tmp.path());
    let months = runner.tick_archive_months("eurusd").unwrap();
    assert_eq!(months, vec![
        MonthStamp::new(2023, 11),
        MonthStamp::new(2023, 12),
        MonthStamp::new(2024, 1),
    ]);
}

#[test]
fn missing_archive_directory_yields_no_months() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_ticks(tmp.path());
    assert!(runner.tick_archive_months("GBPUSD").unwrap().is_empty());
}

#[test]
fn missing_terminal_binary_is_a_preflight_error() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_ticks(tmp.path());
    let err = runner.compile(&tmp.path().join("ea.mq5")).unwrap_err();
    assert!(matches!(err, gauntlet_core::RunnerError::BinaryMissing(_)));
}
