// crates/gauntlet-core/src/core/mod.rs
// ============================================================================
// Module: Gauntlet Core Types
// Description: Canonical Gauntlet domain records and value types.
// Purpose: Provide stable, serializable types for workflow state and results.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Gauntlet core types define parameters, ranges, metrics, gates, passes,
//! simulation records, the workflow state, and the configuration record.
//! These types are the canonical source of truth for the persisted state
//! artifact and every report consumer.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod config;
pub mod gates;
pub mod hashing;
pub mod identifiers;
pub mod ini;
pub mod metrics;
pub mod params;
pub mod passes;
pub mod ranges;
pub mod refinement;
pub mod scoring;
pub mod simulation;
pub mod stage;
pub mod state;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::BehaviorConfig;
pub use config::BestPassMetric;
pub use config::GateThresholds;
pub use config::GauntletConfig;
pub use config::MonteCarloConfig;
pub use config::OptimizationConfig;
pub use config::PathsConfig;
pub use config::RefinementConfig;
pub use config::SAFETY_DEFAULT_SLIPPAGE_PIPS;
pub use config::SAFETY_DEFAULT_SPREAD_PIPS;
pub use config::SAFETY_MAX_SLIPPAGE;
pub use config::SAFETY_MAX_SPREAD;
pub use config::SAFETY_PERMISSIVE_PIPS;
pub use config::StressConfig;
pub use config::safety_parameter_names;
pub use gates::GATE_COMPILATION_ERRORS;
pub use gates::GATE_FILE_EXISTS;
pub use gates::GATE_MAX_DRAWDOWN;
pub use gates::GATE_MC_CONFIDENCE;
pub use gates::GATE_MC_RUIN;
pub use gates::GATE_MINIMUM_TRADES;
pub use gates::GATE_PARAMS_FOUND;
pub use gates::GATE_PASSES_FOUND;
pub use gates::GATE_PROFIT_FACTOR;
pub use gates::GateOp;
pub use gates::GateResult;
pub use gates::diagnose;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use hashing::report_handle;
pub use identifiers::RunnerHandle;
pub use identifiers::WorkflowId;
pub use metrics::Trade;
pub use metrics::TradeDirection;
pub use metrics::TradeMetrics;
pub use metrics::metrics_from_trades;
pub use metrics::profit_factor_from_gross;
pub use params::ParamKind;
pub use params::ParamValue;
pub use params::Parameter;
pub use passes::BacktestedPass;
pub use passes::MonthStamp;
pub use passes::Pass;
pub use passes::ScoredPass;
pub use ranges::OptimizationRange;
pub use ranges::RangeDirective;
pub use ranges::carry_over_toggles;
pub use ranges::validate_ranges;
pub use refinement::ClusterAnalysis;
pub use refinement::ClusterRecommendation;
pub use refinement::ParamAnalysis;
pub use refinement::RefineDecision;
pub use refinement::RefinementAnalysis;
pub use refinement::ToggleAnalysis;
pub use refinement::ToggleRecommendation;
pub use scoring::ScoreInputs;
pub use scoring::composite_score;
pub use simulation::CostOverlayResult;
pub use simulation::DataModel;
pub use simulation::ForwardWindowResult;
pub use simulation::MonteCarloResult;
pub use simulation::StressReport;
pub use simulation::StressScenarioResult;
pub use simulation::WindowBounds;
pub use stage::StageCategory;
pub use stage::StageName;
pub use stage::StageResult;
pub use state::AgentInput;
pub use state::ChildWorkflowRecord;
pub use state::ErrorKind;
pub use state::ErrorRecord;
pub use state::MAX_FIX_ATTEMPTS;
pub use state::MAX_REFINE_ITERATIONS;
pub use state::OptimizationIteration;
pub use state::WorkflowState;
pub use state::WorkflowStatus;
pub use time::Timestamp;
pub use time::days_before;
pub use time::ini_date;
pub use time::months_before;
pub use time::years_before;
