// crates/gauntlet-core/src/runtime/mod.rs
// ============================================================================
// Module: Gauntlet Runtime
// Description: Pipeline engine, stage contract, stages, and test doubles.
// Purpose: Execute Gauntlet workflows against runner and store interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the pipeline engine, the stage contract and its
//! concrete stages, the artifact spill sink, and the deterministic test
//! doubles (dry-run runner, in-memory store, JSON report sink). Every
//! operator surface must call into the same engine entry points to preserve
//! checkpoint and resume semantics.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod artifacts;
pub mod dryrun;
pub mod engine;
pub mod report_sink;
pub mod stage;
pub mod stages;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifacts::FsPathSink;
pub use dryrun::DryRunRunner;
pub use dryrun::RunnerCall;
pub use engine::Pipeline;
pub use engine::PipelineError;
pub use engine::SeededParams;
pub use engine::StartRequest;
pub use report_sink::JsonReportSink;
pub use stage::Stage;
pub use stage::StageContext;
pub use stage::StageOutput;
pub use stage::StateEffect;
pub use stage::Suspension;
pub use stage::WorkflowDirs;
pub use stages::monte_carlo::simulate;
pub use stages::results::adaptive_min_trades;
pub use stages::results::analyze_passes;
pub use stages::results::dedupe_by_inputs;
pub use store::InMemoryWorkflowStore;
