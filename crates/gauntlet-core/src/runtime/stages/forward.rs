// crates/gauntlet-core/src/runtime/stages/forward.rs
// ============================================================================
// Module: Gauntlet Forward-Window Stage
// Description: Offline metric slices of the best pass's trade list.
// Purpose: Show how the best pass performed inside every analysis window.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Purely offline: the best-pass trade list is filtered by close time into
//! the stress window set plus segmental windows (full, in-sample, forward)
//! and per-year windows. Each slice recomputes metrics with a starting
//! balance equal to the deposit plus the net profit of all trades closed
//! before the window opens, so in-window drawdown reflects the balance
//! actually at risk. Informational; no runner invocations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use time::Date;

use crate::core::ForwardWindowResult;
use crate::core::StageName;
use crate::core::StageResult;
use crate::core::Trade;
use crate::core::WindowBounds;
use crate::core::WorkflowState;
use crate::core::metrics_from_trades;
use crate::core::time::Timestamp;
use crate::interfaces::Runner;
use crate::runtime::stage::Stage;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageOutput;
use crate::runtime::stage::StateEffect;
use crate::runtime::stages::period_dates;
use crate::runtime::stages::stress::stress_windows;

// ============================================================================
// SECTION: forward-windows
// ============================================================================

/// Computes offline metric slices of the best-pass trade list.
pub struct ForwardWindows;

impl<R: Runner> Stage<R> for ForwardWindows {
    fn name(&self) -> StageName {
        StageName::ForwardWindows
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::BacktestSelected]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        if state.best_pass_trades_path.is_some() {
            Ok(())
        } else {
            Err(vec!["no best-pass trade list is recorded".to_string()])
        }
    }

    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let Some(path) = state.best_pass_trades_path.clone() else {
            return StageOutput::completed(StageResult::failure(
                StageName::ForwardWindows,
                "no best-pass trade list is recorded",
            ));
        };
        let trades: Vec<Trade> = match fs::read_to_string(&path)
            .map_err(|err| format!("read {}: {err}", path.display()))
            .and_then(|text| {
                serde_json::from_str(&text).map_err(|err| format!("parse {}: {err}", path.display()))
            }) {
            Ok(trades) => trades,
            Err(err) => {
                return StageOutput::completed(StageResult::failure(
                    StageName::ForwardWindows,
                    err,
                ));
            }
        };
        let Some(dates) = period_dates(state, ctx.config) else {
            return StageOutput::completed(StageResult::failure(
                StageName::ForwardWindows,
                "workflow creation time is not a representable date",
            ));
        };

        let mut windows: Vec<(String, Date, Date)> = Vec::new();
        windows.push(("full".to_string(), dates.start, dates.end));
        windows.push(("in-sample".to_string(), dates.start, dates.forward));
        windows.push(("forward".to_string(), dates.forward, dates.end));
        for window in stress_windows(dates.end, ctx.config) {
            windows.push((window.label, window.start, window.end));
        }
        for year in dates.start.year()..=dates.end.year() {
            if let (Ok(start), Ok(end)) = (
                Date::from_calendar_date(year, time::Month::January, 1),
                Date::from_calendar_date(year, time::Month::December, 31),
            ) {
                windows.push((format!("year-{year}"), start, end));
            }
        }

        let deposit = ctx.config.account.deposit;
        let slices: Vec<ForwardWindowResult> = windows
            .into_iter()
            .map(|(label, start, end)| slice_window(&trades, deposit, &label, start, end))
            .collect();

        let result = StageResult::success(StageName::ForwardWindows)
            .with_data("windows", serde_json::json!(slices.len()));
        StageOutput::completed(result).with_effects(vec![StateEffect::SetForwardWindows(slices)])
    }
}

// ============================================================================
// SECTION: Window Slicing
// ============================================================================

/// Computes one window slice with its realistic starting balance.
#[must_use]
pub fn slice_window(
    trades: &[Trade],
    deposit: f64,
    label: &str,
    start: Date,
    end: Date,
) -> ForwardWindowResult {
    let start_ts = date_timestamp(start);
    let end_ts = end_of_day_timestamp(end);

    let prior_profit: f64 = trades
        .iter()
        .filter(|trade| trade.close_time < start_ts)
        .map(|trade| trade.net_profit)
        .sum();
    let starting_balance = deposit + prior_profit;

    let in_window: Vec<Trade> = trades
        .iter()
        .filter(|trade| trade.close_time >= start_ts && trade.close_time <= end_ts)
        .cloned()
        .collect();

    ForwardWindowResult {
        window: WindowBounds {
            label: label.to_string(),
            start: start_ts,
            end: end_ts,
        },
        starting_balance,
        trades_in_window: in_window.len() as u64,
        metrics: metrics_from_trades(&in_window, starting_balance),
    }
}

/// Converts a date to a midnight-UTC timestamp.
fn date_timestamp(date: Date) -> Timestamp {
    Timestamp::from_unix_millis(date.midnight().assume_utc().unix_timestamp() * 1_000)
}

/// Converts a date to its last-millisecond-UTC timestamp.
fn end_of_day_timestamp(date: Date) -> Timestamp {
    Timestamp::from_unix_millis(date.midnight().assume_utc().unix_timestamp() * 1_000 + 86_399_999)
}
