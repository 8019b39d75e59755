// crates/gauntlet-core/src/source/safety.rs
// ============================================================================
// Module: Gauntlet Safety Injection
// Description: Injects spread/slippage guards and disables foreign side effects.
// Purpose: Keep sweeps from trading through unrealistic conditions or
// touching files, the network, or dynamic libraries.
// Dependencies: crate::core::config
// ============================================================================

//! ## Overview
//! The safety transform declares `MaxSpreadPips` and `MaxSlippagePips`
//! inputs when absent, intercepts the order-dispatch call so trades
//! exceeding either limit are rejected, and redefines the file, HTTP, and
//! dynamic-library entry points to no-ops. Injected inputs are marked
//! non-optimizable at extraction. The transform is idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::config::SAFETY_DEFAULT_SLIPPAGE_PIPS;
use crate::core::config::SAFETY_DEFAULT_SPREAD_PIPS;
use crate::core::config::SAFETY_MAX_SLIPPAGE;
use crate::core::config::SAFETY_MAX_SPREAD;

// ============================================================================
// SECTION: Marker
// ============================================================================

/// Marker comment identifying an already-guarded source.
pub const SAFETY_MARKER: &str = "// __gauntlet_safety__";

// ============================================================================
// SECTION: Injection
// ============================================================================

/// Injects the safety guards into the source.
///
/// Returns the transformed text and whether anything changed. Applying the
/// transform to an already-guarded source returns it unchanged.
#[must_use]
pub fn inject_safety(source: &str) -> (String, bool) {
    if source.contains(SAFETY_MARKER) {
        return (source.to_string(), false);
    }

    let mut header = String::new();
    header.push_str(SAFETY_MARKER);
    header.push('\n');
    if !source.contains(&format!("input double {SAFETY_MAX_SPREAD}")) {
        header.push_str(&format!(
            "input double {SAFETY_MAX_SPREAD} = {SAFETY_DEFAULT_SPREAD_PIPS}; // reject entries above this spread\n"
        ));
    }
    if !source.contains(&format!("input double {SAFETY_MAX_SLIPPAGE}")) {
        header.push_str(&format!(
            "input double {SAFETY_MAX_SLIPPAGE} = {SAFETY_DEFAULT_SLIPPAGE_PIPS}; // reject fills beyond this slippage\n"
        ));
    }
    header.push_str(&guard_block());
    header.push('\n');

    let body = source.replace("OrderSend(", "GauntletGuardedOrderSend(");
    (format!("{header}{body}"), true)
}

/// Renders the guard and side-effect lockdown block.
fn guard_block() -> String {
    format!(
        r#"bool GauntletGuardedOrderSend(MqlTradeRequest &request, MqlTradeResult &result)
  {{
   double point = SymbolInfoDouble(request.symbol, SYMBOL_POINT);
   double pip = point * 10.0;
   long spreadPoints = SymbolInfoInteger(request.symbol, SYMBOL_SPREAD);
   if(pip > 0.0 && spreadPoints * point / pip > {SAFETY_MAX_SPREAD})
     {{
      result.retcode = TRADE_RETCODE_REJECT;
      return(false);
     }}
   request.deviation = (ulong)MathMax(1.0, {SAFETY_MAX_SLIPPAGE} * 10.0);
   return(OrderSend(request, result));
  }}

// Foreign side effects are compiled out for evaluation runs.
#define FileOpen(name, flags) (INVALID_HANDLE)
#define WebRequest(method, url, headers, timeout, data, result, headers_out) (-1)
#define DLL_CALLS_DISABLED
"#
    )
}
