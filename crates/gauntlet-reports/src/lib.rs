// crates/gauntlet-reports/src/lib.rs
// ============================================================================
// Module: Gauntlet Reports
// Description: Dashboard, leaderboard, and summary-board artifact builders.
// Purpose: Turn workflow state into operator-facing evidence.
// Dependencies: gauntlet-core, serde_json
// ============================================================================

//! ## Overview
//! The dashboard builder renders one artifact set per workflow: a JSON
//! record for programmatic consumers plus a markdown digest for operators,
//! including gate outcomes with diagnoses, pass tables, Monte-Carlo
//! percentiles, stress and forward-window summaries, and the go-live
//! verdict. Cross-workflow boards rank every persisted workflow by score.
//! Every workflow that reaches a terminal status gets an artifact,
//! regardless of which gates failed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dashboard;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dashboard::DashboardSink;
