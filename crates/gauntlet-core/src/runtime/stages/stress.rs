// crates/gauntlet-core/src/runtime/stages/stress.rs
// ============================================================================
// Module: Gauntlet Stress-Scenario Stage
// Description: Shorter-window, alternative-model, and cost-overlay stress runs.
// Purpose: Probe the best pass outside the conditions that selected it.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! For the best pass, the stage runs rolling-day and calendar-month windows
//! anchored at the workflow end date under each configured data model, with
//! extra latency variants for the tick model. Cost overlays are computed
//! offline from the best-pass trade list, one per (spread, slippage)
//! combination. Tick-model coverage is cross-checked against the installed
//! monthly tick archives and missing months surface as warnings. The stage
//! is informational: per-scenario failures are recorded, never fatal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use time::Date;

use crate::core::CostOverlayResult;
use crate::core::DataModel;
use crate::core::MonthStamp;
use crate::core::StageName;
use crate::core::StageResult;
use crate::core::StressReport;
use crate::core::StressScenarioResult;
use crate::core::Trade;
use crate::core::WindowBounds;
use crate::core::WorkflowState;
use crate::core::days_before;
use crate::core::months_before;
use crate::core::report_handle;
use crate::core::time::Timestamp;
use crate::interfaces::Runner;
use crate::interfaces::SingleRunRequest;
use crate::runtime::stage::Stage;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageOutput;
use crate::runtime::stage::StateEffect;
use crate::runtime::stages::period_dates;
use crate::runtime::stages::source_stem;
use crate::runtime::stages::with_pinned_safety;

// ============================================================================
// SECTION: stress-scenarios
// ============================================================================

/// Runs the stress-scenario matrix for the best pass.
pub struct StressScenarios;

impl<R: Runner> Stage<R> for StressScenarios {
    fn name(&self) -> StageName {
        StageName::StressScenarios
    }

    fn dependencies(&self) -> &'static [StageName] {
        &[StageName::BacktestSelected]
    }

    fn preconditions(&self, state: &WorkflowState) -> Result<(), Vec<String>> {
        if state.best_pass.is_some() {
            Ok(())
        } else {
            Err(vec!["no best pass is recorded".to_string()])
        }
    }

    #[allow(
        clippy::too_many_lines,
        reason = "Single linear pass over the scenario matrix keeps run accounting auditable."
    )]
    fn execute(&self, state: &WorkflowState, ctx: &StageContext<'_, R>) -> StageOutput {
        let Some(best) = state.best_pass.as_ref() else {
            return StageOutput::completed(StageResult::failure(
                StageName::StressScenarios,
                "no best pass is recorded",
            ));
        };
        let Some(dates) = period_dates(state, ctx.config) else {
            return StageOutput::completed(StageResult::failure(
                StageName::StressScenarios,
                "workflow creation time is not a representable date",
            ));
        };
        let Some(compiled) = state.compiled_path.clone() else {
            return StageOutput::completed(StageResult::failure(
                StageName::StressScenarios,
                "no compiled EA is recorded",
            ));
        };

        let windows = stress_windows(dates.end, ctx.config);
        let stem = source_stem(state);
        let mut scenarios = Vec::new();

        for window in &windows {
            for model in &ctx.config.stress.models {
                let latencies: Vec<Option<u32>> = if *model == DataModel::Tick {
                    let mut variants = vec![Some(ctx.config.data.execution_latency_ms)];
                    variants
                        .extend(ctx.config.stress.tick_latencies_ms.iter().copied().map(Some));
                    variants
                } else {
                    vec![None]
                };
                for latency in latencies {
                    scenarios.push(run_scenario(
                        state, ctx, &compiled, &stem, best, window, *model, latency,
                    ));
                }
            }
        }

        let overlays = cost_overlays(state, ctx);
        let missing_tick_months = if ctx.config.stress.models.contains(&DataModel::Tick) {
            missing_months(state, ctx, &windows)
        } else {
            Vec::new()
        };
        for month in &missing_tick_months {
            tracing::warn!(
                workflow = %state.workflow_id,
                year = month.year,
                month = month.month,
                "tick archive missing for covered month"
            );
        }

        let failed = scenarios.iter().filter(|scenario| scenario.error.is_some()).count();
        let report = StressReport {
            scenarios,
            overlays,
            missing_tick_months,
        };
        let result = StageResult::success(StageName::StressScenarios)
            .with_data("scenarios", serde_json::json!(report.scenarios.len()))
            .with_data("failed", serde_json::json!(failed))
            .with_data("overlays", serde_json::json!(report.overlays.len()))
            .with_data(
                "missing_tick_months",
                serde_json::json!(report.missing_tick_months.len()),
            );
        StageOutput::completed(result).with_effects(vec![StateEffect::SetStress(report)])
    }
}

/// Runs one stress scenario, capturing failure instead of propagating it.
#[allow(clippy::too_many_arguments, reason = "Scenario coordinates are independent axes.")]
fn run_scenario<R: Runner>(
    state: &WorkflowState,
    ctx: &StageContext<'_, R>,
    compiled: &std::path::Path,
    stem: &str,
    best: &crate::core::BacktestedPass,
    window: &StressWindow,
    model: DataModel,
    latency: Option<u32>,
) -> StressScenarioResult {
    let latency_ms = latency.unwrap_or(ctx.config.data.execution_latency_ms);
    let disambiguator = match latency {
        Some(value) => format!("{}-{}-{value}", window.label, model.as_str()),
        None => format!("{}-{}", window.label, model.as_str()),
    };
    let bounds = WindowBounds {
        label: window.label.clone(),
        start: date_timestamp(window.start),
        end: date_timestamp(window.end),
    };

    let handle =
        match report_handle(&state.workflow_id, stem, "stress", Some(&disambiguator)) {
            Ok(handle) => handle,
            Err(err) => {
                return StressScenarioResult {
                    window: bounds,
                    model,
                    latency_ms: latency,
                    metrics: None,
                    error: Some(err.to_string()),
                };
            }
        };

    let request = SingleRunRequest {
        ea_path: compiled.to_path_buf(),
        symbol: state.symbol.clone(),
        timeframe: state.timeframe.clone(),
        inputs: with_pinned_safety(&best.inputs),
        period_start: window.start,
        period_end: window.end,
        latency_ms,
        model,
        report_handle: handle,
        deposit: ctx.config.account.deposit,
        currency: ctx.config.account.currency.clone(),
        leverage: ctx.config.account.leverage,
        timeout_secs: ctx.config.optimization.sweep_timeout_secs / 10,
    };
    match ctx.runner.run_single(&request) {
        Ok(run) => StressScenarioResult {
            window: bounds,
            model,
            latency_ms: latency,
            metrics: Some(run.metrics),
            error: None,
        },
        Err(err) => StressScenarioResult {
            window: bounds,
            model,
            latency_ms: latency,
            metrics: None,
            error: Some(err.to_string()),
        },
    }
}

// ============================================================================
// SECTION: Windows
// ============================================================================

/// One labeled stress window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressWindow {
    /// Human-readable label.
    pub label: String,
    /// Inclusive start date.
    pub start: Date,
    /// Inclusive end date.
    pub end: Date,
}

/// Builds the rolling-day and calendar-month stress windows.
#[must_use]
pub fn stress_windows(end: Date, config: &crate::core::GauntletConfig) -> Vec<StressWindow> {
    let mut out = Vec::new();
    for days in &config.stress.rolling_days {
        out.push(StressWindow {
            label: format!("rolling-{days}d"),
            start: days_before(end, i64::from(*days)),
            end,
        });
    }
    for months in &config.stress.calendar_months_ago {
        let anchor = months_before(end, i32::from(*months));
        let start = anchor.replace_day(1).unwrap_or(anchor);
        let month_end = month_last_day(start);
        out.push(StressWindow {
            label: format!("month-{:04}-{:02}", start.year(), u8::from(start.month())),
            start,
            end: month_end,
        });
    }
    out
}

/// Returns the last day of the month containing `date`.
fn month_last_day(date: Date) -> Date {
    let mut day = 31_u8;
    loop {
        match Date::from_calendar_date(date.year(), date.month(), day) {
            Ok(value) => return value,
            Err(_) if day > 28 => day -= 1,
            Err(_) => return date,
        }
    }
}

/// Converts a date to a midnight-UTC timestamp.
fn date_timestamp(date: Date) -> Timestamp {
    let datetime = date.midnight().assume_utc();
    Timestamp::from_unix_millis(datetime.unix_timestamp() * 1_000)
}

// ============================================================================
// SECTION: Cost Overlays
// ============================================================================

/// Computes the post-hoc cost-overlay grid from the best-pass trade list.
fn cost_overlays<R: Runner>(
    state: &WorkflowState,
    ctx: &StageContext<'_, R>,
) -> Vec<CostOverlayResult> {
    let Some(path) = state.best_pass_trades_path.as_ref() else {
        return Vec::new();
    };
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let Ok(trades) = serde_json::from_str::<Vec<Trade>>(&text) else {
        return Vec::new();
    };

    let pip_value = ctx.config.stress.pip_value;
    let mut out = Vec::new();
    for spread in &ctx.config.stress.overlay_spreads {
        for slippage in &ctx.config.stress.overlay_slippages {
            // Entry and exit each pay slippage; the spread is paid once.
            let adjusted: f64 = trades
                .iter()
                .map(|trade| {
                    let cost = (spread + slippage * 2.0) * pip_value * trade.volume;
                    trade.net_profit - cost
                })
                .sum();
            out.push(CostOverlayResult {
                spread_pips: *spread,
                slippage_pips: *slippage,
                adjusted_profit: adjusted,
            });
        }
    }
    out
}

// ============================================================================
// SECTION: Tick Coverage
// ============================================================================

/// Computes the covered months with no installed tick archive.
fn missing_months<R: Runner>(
    state: &WorkflowState,
    ctx: &StageContext<'_, R>,
    windows: &[StressWindow],
) -> Vec<MonthStamp> {
    let installed = match ctx.runner.tick_archive_months(&state.symbol) {
        Ok(months) => months,
        Err(err) => {
            tracing::warn!(workflow = %state.workflow_id, error = %err, "tick archive probe failed");
            return Vec::new();
        }
    };

    let mut required: Vec<MonthStamp> = Vec::new();
    for window in windows {
        let mut cursor = window.start.replace_day(1).unwrap_or(window.start);
        while cursor <= window.end {
            let stamp = MonthStamp::new(cursor.year(), u8::from(cursor.month()));
            if !required.contains(&stamp) {
                required.push(stamp);
            }
            let advanced = next_month(cursor);
            if advanced <= cursor {
                break;
            }
            cursor = advanced;
        }
    }

    required.retain(|stamp| !installed.contains(stamp));
    required.sort();
    required
}

/// Advances a first-of-month date by one month.
fn next_month(date: Date) -> Date {
    let (year, month) = match u8::from(date.month()) {
        12 => (date.year() + 1, 1_u8),
        other => (date.year(), other + 1),
    };
    time::Month::try_from(month)
        .ok()
        .and_then(|month| Date::from_calendar_date(year, month, 1).ok())
        .unwrap_or(date)
}
