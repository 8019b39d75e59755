// crates/gauntlet-core/src/source/extract.rs
// ============================================================================
// Module: Gauntlet Parameter Extraction
// Description: Line-based extraction of EA input parameter declarations.
// Purpose: Produce the Parameter records the pipeline validates and sweeps.
// Dependencies: crate::core::params
// ============================================================================

//! ## Overview
//! EA inputs declare as `input <type> <name> = <default>;` with an optional
//! trailing comment. The extractor scans line by line, maps declared types
//! to parameter kinds, and derives the optimizable flag: identifiers, debug
//! toggles, injected safety parameters, and non-numeric kinds are excluded
//! from sweeps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::config::safety_parameter_names;
use crate::core::params::ParamKind;
use crate::core::params::ParamValue;
use crate::core::params::Parameter;

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Extracts input parameter declarations from EA source text.
#[must_use]
pub fn extract_parameters(source: &str) -> Vec<Parameter> {
    let mut out = Vec::new();
    for (offset, raw_line) in source.lines().enumerate() {
        let line = raw_line.trim();
        let Some(rest) = line.strip_prefix("input ") else {
            continue;
        };
        let Some(declaration) = parse_declaration(rest) else {
            continue;
        };
        let line_number = u32::try_from(offset + 1).unwrap_or(u32::MAX);
        out.push(Parameter {
            optimizable: is_optimizable(&declaration.name, declaration.kind),
            name: declaration.name,
            kind: declaration.kind,
            default: declaration.default,
            line: line_number,
            comment: declaration.comment,
        });
    }
    out
}

/// Parsed pieces of one input declaration.
struct Declaration {
    /// Declared input name.
    name: String,
    /// Declared kind.
    kind: ParamKind,
    /// Parsed default value.
    default: ParamValue,
    /// Trailing comment, when present.
    comment: Option<String>,
}

/// Parses the remainder of an `input` line into a declaration.
fn parse_declaration(rest: &str) -> Option<Declaration> {
    let (code, comment) = split_comment(rest);
    let code = code.trim().trim_end_matches(';').trim();
    let (type_token, tail) = code.split_once(char::is_whitespace)?;
    let (name, default_text) = match tail.split_once('=') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => (tail.trim(), ""),
    };
    if name.is_empty() || !name.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
        return None;
    }
    let kind = kind_for_type(type_token);
    let default = parse_default(kind, default_text)?;
    Some(Declaration {
        name: name.to_string(),
        kind,
        default,
        comment,
    })
}

/// Splits a declaration line into code and trailing comment.
fn split_comment(line: &str) -> (&str, Option<String>) {
    line.split_once("//").map_or((line, None), |(code, comment)| {
        let trimmed = comment.trim();
        (code, if trimmed.is_empty() { None } else { Some(trimmed.to_string()) })
    })
}

/// Maps a declared type token to a parameter kind.
fn kind_for_type(token: &str) -> ParamKind {
    match token {
        "int" | "uint" | "long" | "ulong" | "short" | "ushort" | "char" | "uchar" => {
            ParamKind::Integer
        }
        "double" | "float" => ParamKind::Real,
        "bool" => ParamKind::Boolean,
        "string" => ParamKind::Text,
        "datetime" => ParamKind::Timestamp,
        "color" => ParamKind::Color,
        _ => ParamKind::Enumeration,
    }
}

/// Parses the default-value text for a kind.
fn parse_default(kind: ParamKind, text: &str) -> Option<ParamValue> {
    match kind {
        ParamKind::Integer => {
            if text.is_empty() {
                return Some(ParamValue::Integer(0));
            }
            text.parse::<i64>().ok().map(ParamValue::Integer)
        }
        ParamKind::Real => {
            if text.is_empty() {
                return Some(ParamValue::Real(0.0));
            }
            text.parse::<f64>().ok().map(ParamValue::Real)
        }
        ParamKind::Boolean => match text {
            "" | "false" | "0" => Some(ParamValue::Boolean(false)),
            "true" | "1" => Some(ParamValue::Boolean(true)),
            _ => None,
        },
        ParamKind::Enumeration => Some(ParamValue::Enumeration(text.to_string())),
        ParamKind::Text => Some(ParamValue::Text(text.trim_matches('"').to_string())),
        ParamKind::Timestamp => Some(ParamValue::Timestamp(text.trim_matches('\'').to_string())),
        ParamKind::Color => Some(ParamValue::Color(text.to_string())),
    }
}

// ============================================================================
// SECTION: Optimizable Flag
// ============================================================================

/// Name fragments marking identifier-like parameters.
const IDENTIFIER_FRAGMENTS: [&str; 4] = ["magic", "identifier", "comment", "eaname"];
/// Name fragments marking debug toggles.
const DEBUG_FRAGMENTS: [&str; 3] = ["debug", "verbose", "logging"];

/// Derives the optimizable flag for an extracted parameter.
fn is_optimizable(name: &str, kind: ParamKind) -> bool {
    if !kind.is_sweepable() {
        return false;
    }
    let lower = name.to_ascii_lowercase();
    if IDENTIFIER_FRAGMENTS.iter().any(|fragment| lower.contains(fragment)) {
        return false;
    }
    if DEBUG_FRAGMENTS.iter().any(|fragment| lower.contains(fragment)) {
        return false;
    }
    if safety_parameter_names().contains(&name) {
        return false;
    }
    true
}
