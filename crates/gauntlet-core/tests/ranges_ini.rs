// crates/gauntlet-core/tests/ranges_ini.rs
// ============================================================================
// Module: Range Validation and INI Emission Tests
// Description: Range well-formedness, carry-over, and configuration output.
// ============================================================================

//! Range validation errors, the boolean carry-over rule, and the runner
//! configuration file format.

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

use std::collections::BTreeMap;

use gauntlet_core::DataModel;
use gauntlet_core::OptimizationRange;
use gauntlet_core::ParamKind;
use gauntlet_core::ParamValue;
use gauntlet_core::Parameter;
use gauntlet_core::carry_over_toggles;
use gauntlet_core::ini::SessionSettings;
use gauntlet_core::ini::emit_sweep_ini;
use gauntlet_core::ini::input_line;
use gauntlet_core::ini::timeframe_minutes;
use gauntlet_core::validate_ranges;
use proptest::prelude::*;
use time::Date;
use time::Month;

fn param(name: &str, kind: ParamKind, default: ParamValue, optimizable: bool) -> Parameter {
    Parameter {
        name: name.to_string(),
        kind,
        default,
        line: 1,
        comment: None,
        optimizable,
    }
}

fn test_params() -> Vec<Parameter> {
    vec![
        param("Lots", ParamKind::Real, ParamValue::Real(0.1), true),
        param("UseFilter", ParamKind::Boolean, ParamValue::Boolean(true), true),
        param("MaxSpreadPips", ParamKind::Real, ParamValue::Real(20.0), false),
        param("MaxSlippagePips", ParamKind::Real, ParamValue::Real(5.0), false),
    ]
}

fn safety_entries() -> Vec<OptimizationRange> {
    vec![
        OptimizationRange::fixed("MaxSpreadPips", ParamValue::Real(20.0)),
        OptimizationRange::fixed("MaxSlippagePips", ParamValue::Real(5.0)),
    ]
}

fn wide() -> BTreeMap<String, ParamValue> {
    let mut map = BTreeMap::new();
    map.insert("Lots".to_string(), ParamValue::Real(0.1));
    map.insert("UseFilter".to_string(), ParamValue::Boolean(true));
    map.insert("MaxSpreadPips".to_string(), ParamValue::Real(500.0));
    map.insert("MaxSlippagePips".to_string(), ParamValue::Real(500.0));
    map
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[test]
fn well_formed_payload_passes_validation() {
    let mut ranges = vec![
        OptimizationRange::sweep("Lots", 0.1, 0.1, 0.5),
        OptimizationRange::toggle("UseFilter"),
    ];
    ranges.extend(safety_entries());
    let errors = validate_ranges(
        &test_params(),
        &ranges,
        &wide(),
        &["MaxSpreadPips", "MaxSlippagePips"],
    );
    assert!(errors.is_empty(), "unexpected: {errors:?}");
}

#[test]
fn unknown_names_and_bad_triples_are_reported() {
    let mut ranges = vec![
        OptimizationRange::sweep("NoSuchParam", 1.0, 1.0, 5.0),
        OptimizationRange::sweep("Lots", 0.5, 0.1, 0.1),
        OptimizationRange::sweep("UseFilter", 0.0, 0.0, 1.0),
    ];
    ranges.extend(safety_entries());
    let errors = validate_ranges(
        &test_params(),
        &ranges,
        &wide(),
        &["MaxSpreadPips", "MaxSlippagePips"],
    );
    assert!(errors.iter().any(|error| error.contains("NoSuchParam")));
    assert!(errors.iter().any(|error| error.contains("start") && error.contains("stop")));
    assert!(errors.iter().any(|error| error.contains("step")));
}

#[test]
fn swept_safety_parameter_is_rejected() {
    let ranges = vec![
        OptimizationRange::sweep("Lots", 0.1, 0.1, 0.5),
        OptimizationRange::sweep("MaxSpreadPips", 10.0, 10.0, 50.0),
        OptimizationRange::fixed("MaxSlippagePips", ParamValue::Real(5.0)),
    ];
    let errors = validate_ranges(
        &test_params(),
        &ranges,
        &wide(),
        &["MaxSpreadPips", "MaxSlippagePips"],
    );
    assert!(errors.iter().any(|error| error.contains("pinned")));
}

#[test]
fn carry_over_appends_missing_toggles_at_their_wide_value() {
    let mut ranges = vec![OptimizationRange::sweep("Lots", 0.1, 0.1, 0.5)];
    ranges.extend(safety_entries());
    let carried = carry_over_toggles(&test_params(), &ranges, &wide());
    assert_eq!(carried.len(), ranges.len() + 1);
    let appended = carried.iter().find(|range| range.name == "UseFilter").unwrap();
    assert!(!appended.optimize());

    // Idempotent: applying the rule again changes nothing.
    let again = carry_over_toggles(&test_params(), &carried, &wide());
    assert_eq!(again, carried);
}

#[test]
fn grid_points_counts_inclusive_bounds() {
    assert_eq!(OptimizationRange::sweep("x", 0.1, 0.1, 0.5).grid_points(), 5);
    assert_eq!(OptimizationRange::toggle("x").grid_points(), 2);
    assert_eq!(OptimizationRange::fixed("x", ParamValue::Integer(1)).grid_points(), 1);
}

// ============================================================================
// SECTION: INI Emission
// ============================================================================

#[test]
fn boolean_ranges_encode_as_zero_one() {
    let line = input_line(&OptimizationRange::toggle("UseFilter"));
    assert_eq!(line, "UseFilter=0||0||1||1||Y");

    let fixed = input_line(&OptimizationRange::fixed("UseFilter", ParamValue::Boolean(true)));
    assert_eq!(fixed, "UseFilter=1||0||0||0||N");
}

#[test]
fn sweep_ini_carries_session_and_inputs_sections() {
    let session = SessionSettings {
        expert: "trend_rider.ex5".to_string(),
        symbol: "EURUSD".to_string(),
        period_minutes: 60,
        from_date: Date::from_calendar_date(2020, Month::March, 1).unwrap(),
        to_date: Date::from_calendar_date(2024, Month::March, 1).unwrap(),
        forward_date: Date::from_calendar_date(2023, Month::March, 1).unwrap(),
        model: DataModel::Ohlc,
        latency_ms: 10,
        report_handle: "trend_rider_sweep_0a1b2c3d".to_string(),
        deposit: 10_000.0,
        currency: "USD".to_string(),
        leverage: 100,
    };
    let ranges = vec![
        OptimizationRange::sweep("Lots", 0.1, 0.1, 0.5),
        OptimizationRange::fixed("MaxSpreadPips", ParamValue::Real(20.0)),
    ];
    let ini = emit_sweep_ini(&session, &ranges);

    assert!(ini.contains("[Tester]"));
    assert!(ini.contains("Expert=trend_rider.ex5"));
    assert!(ini.contains("FromDate=2020.03.01"));
    assert!(ini.contains("ForwardMode=by-date"));
    assert!(ini.contains("ForwardDate=2023.03.01"));
    assert!(ini.contains("Model=1"));
    assert!(ini.contains("Optimization=genetic"));
    assert!(ini.contains("OptimizationCriterion=custom"));
    assert!(ini.contains("Report=trend_rider_sweep_0a1b2c3d"));
    assert!(ini.contains("Visual=0"));
    assert!(ini.contains("ShutdownTerminal=1"));
    assert!(ini.contains("[TesterInputs]"));
    assert!(ini.contains("Lots=0.1||0.1||0.1||0.5||Y"));
    assert!(ini.contains("MaxSpreadPips=20.0||0||0||0||N"));
}

#[test]
fn timeframe_tokens_map_to_minutes() {
    assert_eq!(timeframe_minutes("M15"), Some(15));
    assert_eq!(timeframe_minutes("h1"), Some(60));
    assert_eq!(timeframe_minutes("D1"), Some(1_440));
    assert_eq!(timeframe_minutes("X9"), None);
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn generated_sweep_lines_are_well_formed(
        start in 0.0..100.0f64,
        span in 0.1..100.0f64,
        step in 0.01..10.0f64,
    ) {
        let range = OptimizationRange::sweep("X", start, step, start + span);
        if range.grid_points() >= 2 {
            let errors = validate_ranges(
                &[param("X", ParamKind::Real, ParamValue::Real(start), true)],
                std::slice::from_ref(&range),
                &BTreeMap::new(),
                &[],
            );
            prop_assert!(errors.is_empty(), "unexpected: {errors:?}");
            let line = input_line(&range);
            prop_assert!(line.ends_with("||Y"));
        }
    }

    #[test]
    fn param_values_round_trip_through_serde(value in prop_oneof![
        any::<i64>().prop_map(ParamValue::Integer),
        (-1.0e12..1.0e12f64).prop_map(ParamValue::Real),
        any::<bool>().prop_map(ParamValue::Boolean),
        "[A-Z_]{1,12}".prop_map(ParamValue::Enumeration),
    ]) {
        let encoded = serde_json::to_string(&value).unwrap();
        let decoded: ParamValue = serde_json::from_str(&encoded).unwrap();
        prop_assert_eq!(value, decoded);
    }
}
