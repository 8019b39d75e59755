// crates/gauntlet-runner/src/xml.rs
// ============================================================================
// Module: Terminal Artifact Parser
// Description: Narrow parser for the terminal's SpreadsheetML-like artifacts.
// Purpose: Extract sweep pass tables and single-run summaries.
// Dependencies: gauntlet-core
// ============================================================================

//! ## Overview
//! The terminal writes Excel-SpreadsheetML-like XML: worksheets containing
//! rows of `<Cell><Data>` values. The observed schema is narrow and stable,
//! so this is a small hand-written scanner rather than a generic XML
//! binding. Sweep artifacts carry a back-window worksheet and an optional
//! forward worksheet merged by pass index; single-run artifacts carry a
//! summary worksheet and a trade-list worksheet.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use gauntlet_core::ParamValue;
use gauntlet_core::Pass;
use gauntlet_core::Timestamp;
use gauntlet_core::Trade;
use gauntlet_core::TradeDirection;
use gauntlet_core::TradeMetrics;
use gauntlet_core::profit_factor_from_gross;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Artifact parsing errors.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A required worksheet is absent.
    #[error("artifact is missing worksheet: {0}")]
    MissingWorksheet(String),
    /// A required column is absent from a worksheet header.
    #[error("worksheet {worksheet} is missing column: {column}")]
    MissingColumn {
        /// Worksheet name.
        worksheet: String,
        /// Column header.
        column: String,
    },
    /// A cell failed to parse under its expected type.
    #[error("malformed cell in {0}: {1}")]
    MalformedCell(String, String),
}

// ============================================================================
// SECTION: Worksheet Scanner
// ============================================================================

/// One scanned worksheet: name plus rows of cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    /// Worksheet name attribute.
    pub name: String,
    /// Rows of cell text, in document order.
    pub rows: Vec<Vec<String>>,
}

/// Scans every worksheet out of a SpreadsheetML-like document.
#[must_use]
pub fn scan_worksheets(document: &str) -> Vec<Worksheet> {
    let mut sheets = Vec::new();
    let mut rest = document;
    while let Some(start) = rest.find("<Worksheet") {
        let after = &rest[start..];
        let Some(end) = after.find("</Worksheet>") else {
            break;
        };
        let body = &after[..end];
        let name = attribute_value(body, "ss:Name").unwrap_or_default();
        sheets.push(Worksheet {
            name,
            rows: scan_rows(body),
        });
        rest = &after[end + "</Worksheet>".len()..];
    }
    sheets
}

/// Scans `<Row>` elements into vectors of cell text.
fn scan_rows(body: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find("<Row") {
        let after = &rest[start..];
        let Some(end) = after.find("</Row>") else {
            break;
        };
        rows.push(scan_cells(&after[..end]));
        rest = &after[end + "</Row>".len()..];
    }
    rows
}

/// Scans `<Data>` payloads out of one row.
fn scan_cells(row: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut rest = row;
    while let Some(start) = rest.find("<Data") {
        let after = &rest[start..];
        let Some(open_end) = after.find('>') else {
            break;
        };
        let Some(close) = after.find("</Data>") else {
            break;
        };
        let text = &after[open_end + 1..close];
        cells.push(unescape(text));
        rest = &after[close + "</Data>".len()..];
    }
    cells
}

/// Extracts a quoted attribute value from an element head.
fn attribute_value(element: &str, attribute: &str) -> Option<String> {
    let needle = format!("{attribute}=\"");
    let start = element.find(&needle)? + needle.len();
    let rest = &element[start..];
    let end = rest.find('"')?;
    Some(unescape(&rest[..end]))
}

/// Resolves the XML entities the terminal emits.
fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ============================================================================
// SECTION: Sweep Artifact
// ============================================================================

/// Back-window worksheet name.
const SHEET_BACK: &str = "Optimization";
/// Forward-window worksheet name.
const SHEET_FORWARD: &str = "Forward";
/// Column headers owned by the sweep schema; the rest are input parameters.
const SWEEP_FIXED_COLUMNS: [&str; 5] = ["Pass", "Result", "Profit", "Custom", "Trades"];

/// Parses a sweep artifact into merged per-pass records.
///
/// The back worksheet supplies the combined result, back profit, custom
/// criterion, trade count, and the input assignment; the forward worksheet
/// supplies forward profit merged by pass index.
///
/// # Errors
///
/// Returns [`ParseError`] when the back worksheet or a required column is
/// missing, or a cell fails to parse.
pub fn parse_sweep(document: &str) -> Result<Vec<Pass>, ParseError> {
    let sheets = scan_worksheets(document);
    let back = sheets
        .iter()
        .find(|sheet| sheet.name == SHEET_BACK)
        .ok_or_else(|| ParseError::MissingWorksheet(SHEET_BACK.to_string()))?;
    let forward = sheets.iter().find(|sheet| sheet.name == SHEET_FORWARD);

    let mut passes = parse_back_sheet(back)?;
    if let Some(forward) = forward {
        let forward_profit = parse_forward_sheet(forward)?;
        for pass in &mut passes {
            if let Some(profit) = forward_profit.get(&pass.index) {
                pass.profit_forward = *profit;
                pass.profit_combined = pass.profit_back + *profit;
            }
        }
    }
    Ok(passes)
}

/// Parses the back worksheet into pass records.
fn parse_back_sheet(sheet: &Worksheet) -> Result<Vec<Pass>, ParseError> {
    let Some((header, body)) = sheet.rows.split_first() else {
        return Ok(Vec::new());
    };
    let column = |name: &str| -> Result<usize, ParseError> {
        header.iter().position(|cell| cell == name).ok_or_else(|| ParseError::MissingColumn {
            worksheet: sheet.name.clone(),
            column: name.to_string(),
        })
    };
    let pass_col = column("Pass")?;
    let result_col = column("Result")?;
    let profit_col = column("Profit")?;
    let custom_col = column("Custom")?;
    let trades_col = column("Trades")?;

    let param_columns: Vec<(usize, &String)> = header
        .iter()
        .enumerate()
        .filter(|(_, name)| !SWEEP_FIXED_COLUMNS.contains(&name.as_str()))
        .collect();

    let mut passes = Vec::new();
    for row in body {
        let index = cell_u32(sheet, row, pass_col)?;
        let mut inputs = BTreeMap::new();
        for (col, name) in &param_columns {
            if let Some(text) = row.get(*col) {
                inputs.insert((*name).clone(), parse_param_value(text));
            }
        }
        passes.push(Pass {
            index,
            profit_back: cell_f64(sheet, row, profit_col)?,
            profit_forward: 0.0,
            profit_combined: cell_f64(sheet, row, result_col)?,
            custom_criterion: cell_f64(sheet, row, custom_col)?,
            trades: cell_u64(sheet, row, trades_col)?,
            inputs,
        });
    }
    Ok(passes)
}

/// Parses the forward worksheet into a pass-index to profit map.
fn parse_forward_sheet(sheet: &Worksheet) -> Result<BTreeMap<u32, f64>, ParseError> {
    let Some((header, body)) = sheet.rows.split_first() else {
        return Ok(BTreeMap::new());
    };
    let pass_col = header.iter().position(|cell| cell == "Pass").ok_or_else(|| {
        ParseError::MissingColumn {
            worksheet: sheet.name.clone(),
            column: "Pass".to_string(),
        }
    })?;
    let profit_col = header.iter().position(|cell| cell == "Profit").ok_or_else(|| {
        ParseError::MissingColumn {
            worksheet: sheet.name.clone(),
            column: "Profit".to_string(),
        }
    })?;

    let mut out = BTreeMap::new();
    for row in body {
        out.insert(cell_u32(sheet, row, pass_col)?, cell_f64(sheet, row, profit_col)?);
    }
    Ok(out)
}

/// Guesses the parameter-value kind from its textual form.
fn parse_param_value(text: &str) -> ParamValue {
    if let Ok(value) = text.parse::<i64>() {
        return ParamValue::Integer(value);
    }
    if let Ok(value) = text.parse::<f64>() {
        return ParamValue::Real(value);
    }
    match text {
        "true" => ParamValue::Boolean(true),
        "false" => ParamValue::Boolean(false),
        other => ParamValue::Enumeration(other.to_string()),
    }
}

// ============================================================================
// SECTION: Single-Run Artifact
// ============================================================================

/// Summary worksheet name.
const SHEET_SUMMARY: &str = "Summary";
/// Trade-list worksheet name.
const SHEET_TRADES: &str = "Trades";

/// Parses a single-run artifact into metrics and the closed-trade list.
///
/// # Errors
///
/// Returns [`ParseError`] when the summary worksheet is missing or a cell
/// fails to parse.
pub fn parse_single_run(document: &str) -> Result<(TradeMetrics, Vec<Trade>), ParseError> {
    let sheets = scan_worksheets(document);
    let summary = sheets
        .iter()
        .find(|sheet| sheet.name == SHEET_SUMMARY)
        .ok_or_else(|| ParseError::MissingWorksheet(SHEET_SUMMARY.to_string()))?;

    let mut values: BTreeMap<String, f64> = BTreeMap::new();
    for row in &summary.rows {
        if let (Some(key), Some(value)) = (row.first(), row.get(1))
            && let Ok(number) = value.parse::<f64>()
        {
            values.insert(key.clone(), number);
        }
    }
    let lookup = |key: &str| values.get(key).copied().unwrap_or(0.0);

    let trades = sheets
        .iter()
        .find(|sheet| sheet.name == SHEET_TRADES)
        .map(parse_trades_sheet)
        .transpose()?
        .unwrap_or_default();

    let gross_profit = lookup("Gross Profit");
    let gross_loss = lookup("Gross Loss").abs();
    let total_trades = to_count(lookup("Total Trades"));
    let metrics = TradeMetrics {
        profit: lookup("Total Net Profit"),
        profit_factor: profit_factor_from_gross(gross_profit, gross_loss),
        max_drawdown_pct: lookup("Balance Drawdown Relative"),
        total_trades,
        win_rate: lookup("Win Rate"),
        sharpe: lookup("Sharpe Ratio"),
        sortino: lookup("Sortino Ratio"),
        calmar: lookup("Calmar Ratio"),
        expected_payoff: lookup("Expected Payoff"),
        recovery_factor: lookup("Recovery Factor"),
        equity_curve: None,
        errors: Vec::new(),
    };
    Ok((metrics, trades))
}

/// Parses the trade-list worksheet.
fn parse_trades_sheet(sheet: &Worksheet) -> Result<Vec<Trade>, ParseError> {
    let Some((header, body)) = sheet.rows.split_first() else {
        return Ok(Vec::new());
    };
    let column = |name: &str| -> Result<usize, ParseError> {
        header.iter().position(|cell| cell == name).ok_or_else(|| ParseError::MissingColumn {
            worksheet: sheet.name.clone(),
            column: name.to_string(),
        })
    };
    let open_col = column("Open Time")?;
    let close_col = column("Close Time")?;
    let type_col = column("Type")?;
    let volume_col = column("Volume")?;
    let open_price_col = column("Open Price")?;
    let close_price_col = column("Close Price")?;
    let commission_col = column("Commission")?;
    let swap_col = column("Swap")?;
    let profit_col = column("Profit")?;

    let mut trades = Vec::new();
    for row in body {
        let direction = match row.get(type_col).map(String::as_str) {
            Some("buy" | "Buy") => TradeDirection::Buy,
            _ => TradeDirection::Sell,
        };
        trades.push(Trade {
            open_time: cell_time(sheet, row, open_col)?,
            close_time: cell_time(sheet, row, close_col)?,
            direction,
            volume: cell_f64(sheet, row, volume_col)?,
            open_price: cell_f64(sheet, row, open_price_col)?,
            close_price: cell_f64(sheet, row, close_price_col)?,
            commission: cell_f64(sheet, row, commission_col)?,
            swap: cell_f64(sheet, row, swap_col)?,
            net_profit: cell_f64(sheet, row, profit_col)?,
        });
    }
    Ok(trades)
}

// ============================================================================
// SECTION: Cell Helpers
// ============================================================================

/// Reads a cell as f64.
fn cell_f64(sheet: &Worksheet, row: &[String], col: usize) -> Result<f64, ParseError> {
    let text = row
        .get(col)
        .ok_or_else(|| ParseError::MalformedCell(sheet.name.clone(), "short row".to_string()))?;
    text.parse::<f64>()
        .map_err(|_| ParseError::MalformedCell(sheet.name.clone(), text.clone()))
}

/// Reads a cell as u64.
fn cell_u64(sheet: &Worksheet, row: &[String], col: usize) -> Result<u64, ParseError> {
    let text = row
        .get(col)
        .ok_or_else(|| ParseError::MalformedCell(sheet.name.clone(), "short row".to_string()))?;
    text.parse::<u64>()
        .map_err(|_| ParseError::MalformedCell(sheet.name.clone(), text.clone()))
}

/// Reads a cell as u32.
fn cell_u32(sheet: &Worksheet, row: &[String], col: usize) -> Result<u32, ParseError> {
    let text = row
        .get(col)
        .ok_or_else(|| ParseError::MalformedCell(sheet.name.clone(), "short row".to_string()))?;
    text.parse::<u32>()
        .map_err(|_| ParseError::MalformedCell(sheet.name.clone(), text.clone()))
}

/// Reads a cell as a `YYYY.MM.DD HH:MM:SS` timestamp.
fn cell_time(sheet: &Worksheet, row: &[String], col: usize) -> Result<Timestamp, ParseError> {
    let text = row
        .get(col)
        .ok_or_else(|| ParseError::MalformedCell(sheet.name.clone(), "short row".to_string()))?;
    parse_terminal_time(text)
        .ok_or_else(|| ParseError::MalformedCell(sheet.name.clone(), text.clone()))
}

/// Parses the terminal's `YYYY.MM.DD HH:MM:SS` time form.
fn parse_terminal_time(text: &str) -> Option<Timestamp> {
    let (date_part, time_part) = text.split_once(' ')?;
    let mut date_fields = date_part.split('.');
    let year: i32 = date_fields.next()?.parse().ok()?;
    let month: u8 = date_fields.next()?.parse().ok()?;
    let day: u8 = date_fields.next()?.parse().ok()?;
    let mut time_fields = time_part.split(':');
    let hour: u8 = time_fields.next()?.parse().ok()?;
    let minute: u8 = time_fields.next()?.parse().ok()?;
    let second: u8 = time_fields.next()?.parse().ok()?;

    let month = time::Month::try_from(month).ok()?;
    let date = time::Date::from_calendar_date(year, month, day).ok()?;
    let time = time::Time::from_hms(hour, minute, second).ok()?;
    let datetime = date.with_time(time).assume_utc();
    Some(Timestamp::from_unix_millis(datetime.unix_timestamp() * 1_000))
}

/// Converts a summary float to a trade count.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Counts in artifacts are small non-negative integers."
)]
fn to_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 { value.round() as u64 } else { 0 }
}
