// crates/gauntlet-core/src/runtime/stages/mod.rs
// ============================================================================
// Module: Gauntlet Stage Implementations
// Description: The concrete stages realizing the evaluation pipeline.
// Purpose: Group the stage units and their shared derivations.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The concrete stages live here, grouped by pipeline phase. Shared
//! derivations (period dates, source stem, safety pinning) sit in this
//! module so every stage computes them identically; report handles in
//! particular must be reproducible across resume boundaries.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod backtest;
pub mod compile;
pub mod forward;
pub mod monte_carlo;
pub mod multi_pair;
pub mod optimize;
pub mod params;
pub mod reports;
pub mod results;
pub mod source;
pub mod stress;
pub mod validate;

// ============================================================================
// SECTION: Shared Derivations
// ============================================================================

use std::collections::BTreeMap;

use time::Date;

use crate::core::GauntletConfig;
use crate::core::ParamValue;
use crate::core::SAFETY_DEFAULT_SLIPPAGE_PIPS;
use crate::core::SAFETY_DEFAULT_SPREAD_PIPS;
use crate::core::SAFETY_MAX_SLIPPAGE;
use crate::core::SAFETY_MAX_SPREAD;
use crate::core::WorkflowState;
use crate::core::years_before;

/// Backtest period bounds derived from the workflow creation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodDates {
    /// Inclusive period start.
    pub start: Date,
    /// Forward-split date.
    pub forward: Date,
    /// Inclusive period end.
    pub end: Date,
}

/// Derives the period bounds: end = creation date, start = end minus the
/// total span, forward split = end minus the forward span.
#[must_use]
pub fn period_dates(state: &WorkflowState, config: &GauntletConfig) -> Option<PeriodDates> {
    let end = state.created_at.date()?;
    Some(PeriodDates {
        start: years_before(end, i32::from(config.period.total_years)),
        forward: years_before(end, i32::from(config.period.forward_years)),
        end,
    })
}

/// Returns the workflow's source file stem for report-handle construction.
#[must_use]
pub fn source_stem(state: &WorkflowState) -> String {
    state
        .ea_source_path
        .file_stem()
        .map_or_else(|| "ea".to_string(), |stem| stem.to_string_lossy().into_owned())
}

/// Overlays the pinned safety defaults onto an input assignment.
#[must_use]
pub fn with_pinned_safety(
    inputs: &BTreeMap<String, ParamValue>,
) -> BTreeMap<String, ParamValue> {
    let mut out = inputs.clone();
    out.insert(SAFETY_MAX_SPREAD.to_string(), ParamValue::Real(SAFETY_DEFAULT_SPREAD_PIPS));
    out.insert(SAFETY_MAX_SLIPPAGE.to_string(), ParamValue::Real(SAFETY_DEFAULT_SLIPPAGE_PIPS));
    out
}
