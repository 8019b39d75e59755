// crates/gauntlet-core/src/core/ranges.rs
// ============================================================================
// Module: Gauntlet Optimization Ranges
// Description: Per-parameter sweep directives and their validation.
// Purpose: Describe which parameters the sweep explores and over what values.
// Dependencies: crate::core::params, serde
// ============================================================================

//! ## Overview
//! An optimization range either pins a parameter to a fixed value or sweeps
//! it over a `(start, step, stop)` triple. Boolean toggles collapse to the
//! `0..=1` sweep with step 1. Validation returns human-readable errors so
//! agent-supplied payloads can be rejected with actionable messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::params::ParamValue;
use crate::core::params::Parameter;

// ============================================================================
// SECTION: Range Directive
// ============================================================================

/// Sweep directive for a single parameter.
///
/// # Invariants
/// - `Sweep` requires `start <= stop`, `step > 0`, and at least two grid
///   points; [`validate_ranges`] enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RangeDirective {
    /// Parameter is pinned to a single value and excluded from the sweep.
    Fixed {
        /// Pinned value.
        value: ParamValue,
    },
    /// Parameter sweeps over a numeric grid.
    Sweep {
        /// Inclusive grid start.
        start: f64,
        /// Grid step, strictly positive.
        step: f64,
        /// Inclusive grid stop.
        stop: f64,
    },
}

/// Per-parameter directive for the optimization sweep.
///
/// # Invariants
/// - `name` refers to an extracted parameter of the workflow's EA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRange {
    /// Parameter name the directive applies to.
    pub name: String,
    /// Fixed or sweeping directive.
    pub directive: RangeDirective,
}

impl OptimizationRange {
    /// Creates a fixed (non-optimized) range entry.
    #[must_use]
    pub fn fixed(name: impl Into<String>, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            directive: RangeDirective::Fixed {
                value,
            },
        }
    }

    /// Creates a sweeping range entry.
    #[must_use]
    pub fn sweep(name: impl Into<String>, start: f64, step: f64, stop: f64) -> Self {
        Self {
            name: name.into(),
            directive: RangeDirective::Sweep {
                start,
                step,
                stop,
            },
        }
    }

    /// Creates the collapsed boolean sweep covering both toggle values.
    #[must_use]
    pub fn toggle(name: impl Into<String>) -> Self {
        Self::sweep(name, 0.0, 1.0, 1.0)
    }

    /// Returns true when the parameter participates in the sweep.
    #[must_use]
    pub const fn optimize(&self) -> bool {
        matches!(self.directive, RangeDirective::Sweep { .. })
    }

    /// Returns the number of grid points for a sweeping directive.
    #[must_use]
    pub fn grid_points(&self) -> u64 {
        match &self.directive {
            RangeDirective::Fixed {
                ..
            } => 1,
            RangeDirective::Sweep {
                start,
                step,
                stop,
            } => {
                if *step <= 0.0 || stop < start {
                    0
                } else {
                    let span = (stop - start) / step;
                    if span.is_finite() && span >= 0.0 {
                        #[allow(
                            clippy::cast_possible_truncation,
                            clippy::cast_sign_loss,
                            reason = "Span is finite and non-negative by the guard above."
                        )]
                        let points = span.floor() as u64 + 1;
                        points
                    } else {
                        0
                    }
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates agent-supplied ranges and wide-validation parameters.
///
/// Checks, in order: every range name exists among the extracted parameters;
/// sweeping ranges are well-formed (`start <= stop`, `step > 0`, two or more
/// grid points); safety parameters are present in the wide set and pinned
/// (not swept) in the ranges. Returns one human-readable message per
/// violation; an empty list means the payload is acceptable.
#[must_use]
pub fn validate_ranges(
    parameters: &[Parameter],
    ranges: &[OptimizationRange],
    wide_params: &BTreeMap<String, ParamValue>,
    safety_names: &[&str],
) -> Vec<String> {
    let mut errors = Vec::new();

    for entry in wide_params.keys() {
        if !parameters.iter().any(|param| &param.name == entry) {
            errors.push(format!("wide-validation parameter `{entry}` is not a declared input"));
        }
    }

    for range in ranges {
        let Some(param) = parameters.iter().find(|param| param.name == range.name) else {
            errors.push(format!("range refers to unknown parameter `{}`", range.name));
            continue;
        };

        if let RangeDirective::Sweep {
            start,
            step,
            stop,
        } = &range.directive
        {
            if !param.optimizable {
                errors.push(format!("parameter `{}` is not optimizable", range.name));
            }
            if !start.is_finite() || !step.is_finite() || !stop.is_finite() {
                errors.push(format!("range for `{}` contains a non-finite bound", range.name));
                continue;
            }
            if stop < start {
                errors.push(format!(
                    "range for `{}` has start {start} greater than stop {stop}",
                    range.name
                ));
            }
            if *step <= 0.0 {
                errors.push(format!("range for `{}` has non-positive step {step}", range.name));
            }
            if range.grid_points() < 2 {
                errors.push(format!(
                    "range for `{}` covers fewer than two grid points",
                    range.name
                ));
            }
        }
    }

    for name in safety_names {
        if !wide_params.contains_key(*name) {
            errors.push(format!("safety parameter `{name}` missing from wide-validation set"));
        }
        match ranges.iter().find(|range| range.name == *name) {
            None => {
                errors.push(format!("safety parameter `{name}` missing from optimization ranges"));
            }
            Some(range) if range.optimize() => {
                errors.push(format!("safety parameter `{name}` must be pinned, not swept"));
            }
            Some(_) => {}
        }
    }

    errors
}

/// Applies the boolean carry-over rule.
///
/// Any boolean toggle present in the wide-validation set but absent from the
/// ranges is appended as a fixed entry at its wide value. This prevents the
/// runner from silently reverting toggles to source defaults during the
/// sweep, a common cause of zero-trade optimization results.
#[must_use]
pub fn carry_over_toggles(
    parameters: &[Parameter],
    ranges: &[OptimizationRange],
    wide_params: &BTreeMap<String, ParamValue>,
) -> Vec<OptimizationRange> {
    let mut out = ranges.to_vec();
    for (name, value) in wide_params {
        let is_toggle = parameters
            .iter()
            .any(|param| &param.name == name && param.kind == crate::core::params::ParamKind::Boolean);
        let missing = !ranges.iter().any(|range| &range.name == name);
        if is_toggle && missing {
            out.push(OptimizationRange::fixed(name.clone(), value.clone()));
        }
    }
    out
}
