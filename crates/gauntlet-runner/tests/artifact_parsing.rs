// crates/gauntlet-runner/tests/artifact_parsing.rs
// ============================================================================
// Module: Artifact Parsing Tests
// Description: Sweep and single-run artifact extraction.
// ============================================================================

//! Parser behavior over the terminal's SpreadsheetML-like artifacts: merged
//! back/forward tables, parameter columns, summaries, and trade lists.

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

use gauntlet_core::ParamValue;
use gauntlet_runner::xml::parse_single_run;
use gauntlet_runner::xml::parse_sweep;
use gauntlet_runner::xml::scan_worksheets;

fn row(cells: &[&str]) -> String {
    let mut out = String::from("<Row>");
    for cell in cells {
        out.push_str(&format!("<Cell><Data ss:Type=\"String\">{cell}</Data></Cell>"));
    }
    out.push_str("</Row>");
    out
}

fn worksheet(name: &str, rows: &[String]) -> String {
    format!("<Worksheet ss:Name=\"{name}\"><Table>{}</Table></Worksheet>", rows.concat())
}

fn sweep_document() -> String {
    let back = worksheet(
        "Optimization",
        &[
            row(&["Pass", "Result", "Profit", "Custom", "Trades", "Lots", "UseFilter"]),
            row(&["1", "2100", "1200", "120", "150", "0.1", "true"]),
            row(&["2", "1700", "1000", "100", "140", "0.3", "false"]),
        ],
    );
    let forward = worksheet(
        "Forward",
        &[
            row(&["Pass", "Profit"]),
            row(&["1", "900"]),
            row(&["2", "700"]),
        ],
    );
    format!("<Workbook>{back}{forward}</Workbook>")
}

#[test]
fn sweep_tables_merge_by_pass_index() {
    let passes = parse_sweep(&sweep_document()).unwrap();
    assert_eq!(passes.len(), 2);

    let first = &passes[0];
    assert_eq!(first.index, 1);
    assert!((first.profit_back - 1_200.0).abs() < f64::EPSILON);
    assert!((first.profit_forward - 900.0).abs() < f64::EPSILON);
    assert!((first.profit_combined - 2_100.0).abs() < f64::EPSILON);
    assert_eq!(first.trades, 150);
    assert_eq!(first.inputs.get("Lots"), Some(&ParamValue::Real(0.1)));
    assert_eq!(first.inputs.get("UseFilter"), Some(&ParamValue::Boolean(true)));

    let second = &passes[1];
    assert!((second.profit_forward - 700.0).abs() < f64::EPSILON);
}

#[test]
fn sweep_without_forward_sheet_keeps_back_results() {
    let document = format!(
        "<Workbook>{}</Workbook>",
        worksheet(
            "Optimization",
            &[
                row(&["Pass", "Result", "Profit", "Custom", "Trades", "Lots"]),
                row(&["7", "500", "500", "50", "60", "0.2"]),
            ],
        )
    );
    let passes = parse_sweep(&document).unwrap();
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].index, 7);
    assert!(passes[0].profit_forward.abs() < f64::EPSILON);
}

#[test]
fn missing_back_sheet_is_an_error() {
    let document =
        format!("<Workbook>{}</Workbook>", worksheet("Forward", &[row(&["Pass", "Profit"])]));
    assert!(parse_sweep(&document).is_err());
}

#[test]
fn single_run_summary_and_trades_parse() {
    let summary = worksheet(
        "Summary",
        &[
            row(&["Total Net Profit", "2500"]),
            row(&["Gross Profit", "6000"]),
            row(&["Gross Loss", "3500"]),
            row(&["Balance Drawdown Relative", "18"]),
            row(&["Total Trades", "150"]),
            row(&["Win Rate", "0.55"]),
            row(&["Sharpe Ratio", "1.2"]),
            row(&["Expected Payoff", "16.67"]),
            row(&["Recovery Factor", "2.1"]),
        ],
    );
    let trades = worksheet(
        "Trades",
        &[
            row(&[
                "Open Time", "Close Time", "Type", "Volume", "Open Price", "Close Price",
                "Commission", "Swap", "Profit",
            ]),
            row(&[
                "2023.05.01 10:00:00",
                "2023.05.01 14:30:00",
                "buy",
                "0.1",
                "1.1000",
                "1.1050",
                "-0.5",
                "0",
                "49.5",
            ]),
            row(&[
                "2023.05.02 09:00:00",
                "2023.05.02 11:00:00",
                "sell",
                "0.1",
                "1.1040",
                "1.1080",
                "-0.5",
                "-0.1",
                "-40.6",
            ]),
        ],
    );
    let document = format!("<Workbook>{summary}{trades}</Workbook>");

    let (metrics, trades) = parse_single_run(&document).unwrap();
    assert!((metrics.profit - 2_500.0).abs() < f64::EPSILON);
    assert!((metrics.profit_factor - 6_000.0 / 3_500.0).abs() < 1e-12);
    assert_eq!(metrics.total_trades, 150);
    assert_eq!(trades.len(), 2);
    assert!((trades[0].net_profit - 49.5).abs() < f64::EPSILON);
    assert!(trades[0].close_time > trades[0].open_time);
    assert!(trades[1].close_time > trades[0].close_time);
}

#[test]
fn zero_gross_loss_summary_yields_profit_factor_99() {
    let summary = worksheet(
        "Summary",
        &[
            row(&["Total Net Profit", "800"]),
            row(&["Gross Profit", "800"]),
            row(&["Gross Loss", "0"]),
            row(&["Total Trades", "10"]),
        ],
    );
    let document = format!("<Workbook>{summary}</Workbook>");
    let (metrics, _) = parse_single_run(&document).unwrap();
    assert!((metrics.profit_factor - 99.0).abs() < f64::EPSILON);
}

#[test]
fn scanner_resolves_entities_and_names() {
    let document = format!(
        "<Workbook>{}</Workbook>",
        worksheet("Summary", &[row(&["A &amp; B", "1"])])
    );
    let sheets = scan_worksheets(&document);
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].name, "Summary");
    assert_eq!(sheets[0].rows[0][0], "A & B");
}
