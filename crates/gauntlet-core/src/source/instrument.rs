// crates/gauntlet-core/src/source/instrument.rs
// ============================================================================
// Module: Gauntlet Criterion Injection
// Description: Appends the custom optimization criterion to EA source.
// Purpose: Give the sweep a scoring function that rewards smooth, active equity.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The sweep ranks passes by a custom criterion instead of raw profit:
//! profit, scaled by equity-curve linearity (R-squared), trade activity
//! (sqrt of trades over 100), a drawdown factor, and a profit-factor bonus.
//! Passes below the exploration trade minimum or without positive profit
//! return a large negative sentinel so the genetic search abandons them.
//! The transform appends a marked block and is idempotent.

// ============================================================================
// SECTION: Marker
// ============================================================================

/// Marker comment identifying an already-instrumented source.
pub const INSTRUMENTATION_MARKER: &str = "// __gauntlet_criterion__";

// ============================================================================
// SECTION: Injection
// ============================================================================

/// Appends the custom criterion function to the source.
///
/// Returns the transformed text and whether anything changed. Applying the
/// transform to an already-instrumented source returns it unchanged.
#[must_use]
pub fn inject_instrumentation(source: &str, exploration_min_trades: u64) -> (String, bool) {
    if source.contains(INSTRUMENTATION_MARKER) {
        return (source.to_string(), false);
    }
    let mut out = source.to_string();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&criterion_block(exploration_min_trades));
    (out, true)
}

/// Renders the appended criterion block.
fn criterion_block(exploration_min_trades: u64) -> String {
    format!(
        r#"
{INSTRUMENTATION_MARKER}
double OnTester()
  {{
   double trades = TesterStatistics(STAT_TRADES);
   double profit = TesterStatistics(STAT_PROFIT);
   if(trades < {exploration_min_trades} || profit <= 0.0)
      return(-1000000.0);
   double r2 = GauntletEquityR2();
   double activity = MathSqrt(trades / 100.0);
   double dd = TesterStatistics(STAT_EQUITY_DDREL_PERCENT);
   double ddFactor = MathMax(0.0, 1.0 - dd / 50.0);
   double pf = TesterStatistics(STAT_PROFIT_FACTOR);
   double pfBonus = MathMin(pf / 2.0, 1.5);
   return(profit * r2 * activity * ddFactor * pfBonus);
  }}

double GauntletEquityR2()
  {{
   // Least-squares R^2 of the balance curve against its linear fit.
   int total = (int)TesterStatistics(STAT_TRADES);
   if(total < 2)
      return(0.0);
   double sumX = 0, sumY = 0, sumXY = 0, sumXX = 0, sumYY = 0;
   double balance = TesterStatistics(STAT_INITIAL_DEPOSIT);
   HistorySelect(0, TimeCurrent());
   int deals = HistoryDealsTotal();
   int n = 0;
   for(int i = 0; i < deals; i++)
     {{
      ulong ticket = HistoryDealGetTicket(i);
      if(HistoryDealGetInteger(ticket, DEAL_ENTRY) != DEAL_ENTRY_OUT)
         continue;
      balance += HistoryDealGetDouble(ticket, DEAL_PROFIT);
      n++;
      double x = n;
      sumX += x; sumY += balance;
      sumXY += x * balance; sumXX += x * x; sumYY += balance * balance;
     }}
   if(n < 2)
      return(0.0);
   double num = n * sumXY - sumX * sumY;
   double den = (n * sumXX - sumX * sumX) * (n * sumYY - sumY * sumY);
   if(den <= 0.0)
      return(0.0);
   double r = num / MathSqrt(den);
   return(r * r);
  }}
"#
    )
}
