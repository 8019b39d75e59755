// crates/gauntlet-core/src/core/ini.rs
// ============================================================================
// Module: Gauntlet Runner Configuration Format
// Description: Emitter for the runner's line-oriented configuration file.
// Purpose: Translate optimization ranges and session settings into INI text.
// Dependencies: crate::core::{config, ranges, simulation, time}, time
// ============================================================================

//! ## Overview
//! The runner consumes a line-oriented configuration file with a session
//! section and an inputs section. One line per parameter takes the form
//! `name=value||start||step||stop||Y` for swept parameters and a trailing
//! `N` for pinned ones. Booleans encode as `0`/`1` in both positions; the
//! runner accepts either `true`/`false` or `0`/`1`, and `0`/`1` is the form
//! every variant of this file uses so the sweep grid stays numeric.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Date;

use crate::core::ranges::OptimizationRange;
use crate::core::ranges::RangeDirective;
use crate::core::simulation::DataModel;
use crate::core::time::ini_date;

// ============================================================================
// SECTION: Session Settings
// ============================================================================

/// Session section of the runner configuration file.
///
/// # Invariants
/// - `from_date <= forward_date <= to_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Expert filename relative to the runner's experts directory.
    pub expert: String,
    /// Target symbol.
    pub symbol: String,
    /// Timeframe expressed in minutes.
    pub period_minutes: u32,
    /// Backtest start date.
    pub from_date: Date,
    /// Backtest end date.
    pub to_date: Date,
    /// Forward-split date.
    pub forward_date: Date,
    /// Price data model.
    pub model: DataModel,
    /// Simulated execution latency, milliseconds.
    pub latency_ms: u32,
    /// Report handle the runner writes its artifact under.
    pub report_handle: String,
    /// Initial deposit.
    pub deposit: f64,
    /// Account currency code.
    pub currency: String,
    /// Account leverage.
    pub leverage: u32,
}

// ============================================================================
// SECTION: Emission
// ============================================================================

/// Renders the complete sweep configuration file.
#[must_use]
pub fn emit_sweep_ini(session: &SessionSettings, ranges: &[OptimizationRange]) -> String {
    let mut out = String::new();
    out.push_str("[Tester]\n");
    out.push_str(&format!("Expert={}\n", session.expert));
    out.push_str(&format!("Symbol={}\n", session.symbol));
    out.push_str(&format!("Period={}\n", session.period_minutes));
    out.push_str(&format!("FromDate={}\n", ini_date(session.from_date)));
    out.push_str(&format!("ToDate={}\n", ini_date(session.to_date)));
    out.push_str("ForwardMode=by-date\n");
    out.push_str(&format!("ForwardDate={}\n", ini_date(session.forward_date)));
    out.push_str(&format!("Model={}\n", session.model.ini_code()));
    out.push_str(&format!("ExecutionMode={}\n", session.latency_ms));
    out.push_str("Optimization=genetic\n");
    out.push_str("OptimizationCriterion=custom\n");
    out.push_str(&format!("Report={}\n", session.report_handle));
    out.push_str(&format!("Deposit={}\n", session.deposit));
    out.push_str(&format!("Currency={}\n", session.currency));
    out.push_str(&format!("Leverage={}\n", session.leverage));
    out.push_str("Visual=0\n");
    out.push_str("ShutdownTerminal=1\n");
    out.push_str("\n[TesterInputs]\n");
    for range in ranges {
        out.push_str(&input_line(range));
        out.push('\n');
    }
    out
}

/// Renders one inputs-section line for a range directive.
#[must_use]
pub fn input_line(range: &OptimizationRange) -> String {
    match &range.directive {
        RangeDirective::Fixed {
            value,
        } => {
            format!("{}={}||0||0||0||N", range.name, value.ini_value())
        }
        RangeDirective::Sweep {
            start,
            step,
            stop,
        } => {
            format!(
                "{}={}||{}||{}||{}||Y",
                range.name,
                format_bound(*start),
                format_bound(*start),
                format_bound(*step),
                format_bound(*stop)
            )
        }
    }
}

/// Renders a numeric bound without trailing zero noise.
fn format_bound(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1.0e15 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Fractional part is zero and magnitude fits i64."
        )]
        let whole = value as i64;
        whole.to_string()
    } else {
        format!("{value}")
    }
}

// ============================================================================
// SECTION: Timeframes
// ============================================================================

/// Maps a timeframe token to its length in minutes.
#[must_use]
pub fn timeframe_minutes(token: &str) -> Option<u32> {
    match token.to_ascii_uppercase().as_str() {
        "M1" => Some(1),
        "M5" => Some(5),
        "M15" => Some(15),
        "M30" => Some(30),
        "H1" => Some(60),
        "H4" => Some(240),
        "D1" => Some(1_440),
        "W1" => Some(10_080),
        "MN1" => Some(43_200),
        _ => None,
    }
}
