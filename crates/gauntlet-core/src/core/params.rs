// crates/gauntlet-core/src/core/params.rs
// ============================================================================
// Module: Gauntlet Parameter Model
// Description: Parameter descriptors extracted from EA source files.
// Purpose: Provide tagged parameter values with per-kind wire encodings.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A parameter's value belongs to one of a fixed set of scalar kinds
//! determined at extraction time. Values are carried as a tagged variant so
//! the configuration-file emitter and the sweep request builder can dispatch
//! on the declared kind. Booleans encode as `0`/`1` on the runner wire.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Parameter Kind
// ============================================================================

/// Declared type of an EA input parameter.
///
/// # Invariants
/// - Variants are stable for serialization and report consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Whole-number parameter (`int`, `long`, and friends).
    Integer,
    /// Floating-point parameter (`double`, `float`).
    Real,
    /// Boolean toggle.
    Boolean,
    /// Enumeration token.
    Enumeration,
    /// Free-form text.
    Text,
    /// Date-time literal.
    Timestamp,
    /// Color literal.
    Color,
}

impl ParamKind {
    /// Returns true when the kind can participate in a numeric sweep.
    #[must_use]
    pub const fn is_sweepable(self) -> bool {
        matches!(self, Self::Integer | Self::Real | Self::Boolean)
    }
}

// ============================================================================
// SECTION: Parameter Value
// ============================================================================

/// Tagged parameter value keyed by declared kind.
///
/// # Invariants
/// - The variant matches the owning parameter's [`ParamKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    /// Whole-number value.
    Integer(i64),
    /// Floating-point value.
    Real(f64),
    /// Boolean value.
    Boolean(bool),
    /// Enumeration token.
    Enumeration(String),
    /// Free-form text value.
    Text(String),
    /// Date-time literal, verbatim from source.
    Timestamp(String),
    /// Color literal, verbatim from source.
    Color(String),
}

impl ParamValue {
    /// Returns the kind tag of the value.
    #[must_use]
    pub const fn kind(&self) -> ParamKind {
        match self {
            Self::Integer(_) => ParamKind::Integer,
            Self::Real(_) => ParamKind::Real,
            Self::Boolean(_) => ParamKind::Boolean,
            Self::Enumeration(_) => ParamKind::Enumeration,
            Self::Text(_) => ParamKind::Text,
            Self::Timestamp(_) => ParamKind::Timestamp,
            Self::Color(_) => ParamKind::Color,
        }
    }

    /// Returns the value as a float when numerically meaningful.
    ///
    /// Booleans map to `0.0` / `1.0`, matching their wire encoding.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Declared defaults fit f64 mantissa range.")]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Real(value) => Some(*value),
            Self::Boolean(value) => Some(if *value { 1.0 } else { 0.0 }),
            Self::Enumeration(_) | Self::Text(_) | Self::Timestamp(_) | Self::Color(_) => None,
        }
    }

    /// Returns the boolean payload when the value is a toggle.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Renders the value in the runner's configuration-file form.
    ///
    /// Booleans encode as `0` / `1`; all other kinds render verbatim.
    #[must_use]
    pub fn ini_value(&self) -> String {
        match self {
            Self::Integer(value) => value.to_string(),
            Self::Real(value) => format_real(*value),
            Self::Boolean(value) => if *value { "1" } else { "0" }.to_string(),
            Self::Enumeration(value) | Self::Text(value) | Self::Timestamp(value) | Self::Color(value) => {
                value.clone()
            }
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ini_value())
    }
}

/// Renders a real value without trailing zero noise.
fn format_real(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1.0e15 {
        format!("{value:.1}")
    } else {
        let mut out = format!("{value}");
        if !out.contains('.') && !out.contains('e') {
            out.push_str(".0");
        }
        out
    }
}

// ============================================================================
// SECTION: Parameter Record
// ============================================================================

/// Immutable parameter descriptor extracted from the EA source.
///
/// # Invariants
/// - `default.kind()` equals `kind`.
/// - `optimizable` is false for identifiers, debug toggles, injected safety
///   parameters, and non-numeric kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Declared input name.
    pub name: String,
    /// Declared kind.
    pub kind: ParamKind,
    /// Declared default value.
    pub default: ParamValue,
    /// 1-based source line of the declaration.
    pub line: u32,
    /// Inline comment following the declaration, when present.
    pub comment: Option<String>,
    /// Indicates whether the parameter may participate in a sweep.
    pub optimizable: bool,
}
