// crates/gauntlet-core/tests/source_toolkit.rs
// ============================================================================
// Module: EA Source Toolkit Tests
// Description: Extraction, instrumentation, and safety-injection behavior.
// ============================================================================

//! Source toolkit properties: extraction maps declared types and the
//! optimizable flag, and both injections are idempotent.

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

use gauntlet_core::ParamKind;
use gauntlet_core::ParamValue;
use gauntlet_core::source::extract_parameters;
use gauntlet_core::source::inject_instrumentation;
use gauntlet_core::source::inject_safety;

const SOURCE: &str = r#"
// trend rider
input double Lots = 0.1; // lot size
input int FastPeriod = 12;
input bool UseFilter = true;
input string TradeComment = "rider"; // order comment
input int MagicNumber = 900123;
input bool DebugMode = false;
input ENUM_TIMEFRAMES SignalTf = PERIOD_H1;

void OnTick()
  {
   MqlTradeRequest request;
   MqlTradeResult result;
   OrderSend(request, result);
  }
"#;

// ============================================================================
// SECTION: Extraction
// ============================================================================

#[test]
fn extraction_maps_types_and_defaults() {
    let params = extract_parameters(SOURCE);
    let by_name = |name: &str| params.iter().find(|param| param.name == name).unwrap();

    assert_eq!(by_name("Lots").kind, ParamKind::Real);
    assert_eq!(by_name("Lots").default, ParamValue::Real(0.1));
    assert_eq!(by_name("Lots").comment.as_deref(), Some("lot size"));
    assert_eq!(by_name("FastPeriod").kind, ParamKind::Integer);
    assert_eq!(by_name("UseFilter").kind, ParamKind::Boolean);
    assert_eq!(by_name("TradeComment").kind, ParamKind::Text);
    assert_eq!(by_name("SignalTf").kind, ParamKind::Enumeration);
}

#[test]
fn non_sweepable_parameters_are_flagged() {
    let params = extract_parameters(SOURCE);
    let optimizable = |name: &str| {
        params.iter().find(|param| param.name == name).unwrap().optimizable
    };

    assert!(optimizable("Lots"));
    assert!(optimizable("FastPeriod"));
    assert!(optimizable("UseFilter"));
    // Identifiers, debug toggles, text, and enums stay out of the sweep.
    assert!(!optimizable("MagicNumber"));
    assert!(!optimizable("DebugMode"));
    assert!(!optimizable("TradeComment"));
    assert!(!optimizable("SignalTf"));
}

#[test]
fn declaration_line_numbers_are_recorded() {
    let params = extract_parameters(SOURCE);
    let lots = params.iter().find(|param| param.name == "Lots").unwrap();
    assert_eq!(lots.line, 3);
}

// ============================================================================
// SECTION: Instrumentation
// ============================================================================

#[test]
fn instrumentation_appends_the_criterion_once() {
    let (first, changed) = inject_instrumentation(SOURCE, 10);
    assert!(changed);
    assert!(first.contains("double OnTester()"));
    assert!(first.contains("trades < 10"));
    assert!(first.contains("-1000000.0"));

    let (second, changed_again) = inject_instrumentation(&first, 10);
    assert!(!changed_again);
    assert_eq!(first, second);
}

// ============================================================================
// SECTION: Safety Injection
// ============================================================================

#[test]
fn safety_injection_adds_inputs_and_guards() {
    let (guarded, changed) = inject_safety(SOURCE);
    assert!(changed);
    assert!(guarded.contains("input double MaxSpreadPips"));
    assert!(guarded.contains("input double MaxSlippagePips"));
    assert!(guarded.contains("GauntletGuardedOrderSend(request, result);"));
    assert!(guarded.contains("#define WebRequest"));
    assert!(guarded.contains("#define FileOpen"));

    let (again, changed_again) = inject_safety(&guarded);
    assert!(!changed_again);
    assert_eq!(guarded, again);
}

#[test]
fn injected_safety_inputs_extract_as_non_optimizable() {
    let (guarded, _) = inject_safety(SOURCE);
    let params = extract_parameters(&guarded);
    for name in ["MaxSpreadPips", "MaxSlippagePips"] {
        let param = params.iter().find(|param| param.name == name).unwrap();
        assert!(!param.optimizable);
        assert_eq!(param.kind, ParamKind::Real);
    }
}

#[test]
fn existing_safety_inputs_are_not_duplicated() {
    let source = format!("input double MaxSpreadPips = 10.0;\n{SOURCE}");
    let (guarded, _) = inject_safety(&source);
    let count = guarded.matches("input double MaxSpreadPips").count();
    assert_eq!(count, 1);
}
