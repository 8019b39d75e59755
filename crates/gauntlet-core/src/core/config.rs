// crates/gauntlet-core/src/core/config.rs
// ============================================================================
// Module: Gauntlet Configuration Model
// Description: Explicit configuration record with the full option surface.
// Purpose: Replace tunable-threshold sprawl with one typed record.
// Dependencies: crate::core::simulation, serde
// ============================================================================

//! ## Overview
//! Every behavior threshold the pipeline consults lives in this record,
//! grouped by concern. Defaults match the documented option surface; the
//! `gauntlet-config` crate layers TOML loading and validation on top.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::core::simulation::DataModel;

// ============================================================================
// SECTION: Option Groups
// ============================================================================

/// Backtest period layout in whole years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodConfig {
    /// Total backtest span ending at the workflow creation date.
    pub total_years: u8,
    /// In-sample span at the start of the period.
    pub in_sample_years: u8,
    /// Forward span at the end of the period.
    pub forward_years: u8,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            total_years: 4,
            in_sample_years: 3,
            forward_years: 1,
        }
    }
}

/// Price data and execution model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Data model for sweeps and confirmation runs.
    pub model: DataModel,
    /// Simulated execution latency in milliseconds.
    pub execution_latency_ms: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            model: DataModel::Ohlc,
            execution_latency_ms: 10,
        }
    }
}

/// Trading account settings passed to the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Initial deposit, account currency.
    pub deposit: f64,
    /// Account currency code.
    pub currency: String,
    /// Account leverage.
    pub leverage: u32,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            deposit: 10_000.0,
            currency: "USD".to_string(),
            leverage: 100,
        }
    }
}

/// Gate thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateThresholds {
    /// Profit-factor floor.
    pub min_profit_factor: f64,
    /// Maximum drawdown ceiling, percent.
    pub max_drawdown_pct: f64,
    /// Minimum trade count for the validation gate.
    pub min_trades: u64,
    /// Exploration minimum used by the injected criterion.
    pub exploration_min_trades: u64,
    /// Monte-Carlo confidence floor, percent.
    pub mc_confidence_min: f64,
    /// Monte-Carlo ruin ceiling, percent.
    pub mc_ruin_max: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            min_profit_factor: 1.5,
            max_drawdown_pct: 30.0,
            min_trades: 50,
            exploration_min_trades: 10,
            mc_confidence_min: 70.0,
            mc_ruin_max: 5.0,
        }
    }
}

/// Monte-Carlo simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Number of shuffles.
    pub iterations: u64,
    /// Ruin threshold as a fraction of peak balance.
    pub ruin_threshold: f64,
    /// Seed for the shuffle RNG; fixed so simulations replay.
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            ruin_threshold: 0.5,
            seed: 0x6741_u64,
        }
    }
}

/// Optimization sweep settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Hard sweep timeout in seconds.
    pub sweep_timeout_secs: u64,
    /// Heartbeat interval for the progress sink, seconds.
    pub heartbeat_secs: u64,
    /// Passes selected for confirmation backtests.
    pub top_n_backtest: usize,
    /// Passes shown in reports.
    pub top_n_display: usize,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            sweep_timeout_secs: 36_000,
            heartbeat_secs: 60,
            top_n_backtest: 20,
            top_n_display: 20,
        }
    }
}

/// Range-refinement loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    /// Maximum refinement sweeps after the initial one.
    pub max_iterations: u8,
    /// Toggle value share in the top-N that forces a FIX recommendation.
    pub toggle_dominance_threshold: f64,
    /// Coefficient-of-variation floor below which ranges narrow.
    pub clustering_cv_threshold: f64,
    /// Minimum filtered passes for the analysis to be meaningful.
    pub min_valid_passes: u64,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            toggle_dominance_threshold: 0.70,
            clustering_cv_threshold: 0.20,
            min_valid_passes: 50,
        }
    }
}

/// Stress-scenario settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Rolling window lengths in days, anchored at the workflow end date.
    pub rolling_days: Vec<u16>,
    /// Calendar-month windows, expressed in whole months before the end date.
    pub calendar_months_ago: Vec<u8>,
    /// Data models exercised per window.
    pub models: Vec<DataModel>,
    /// Extra latency variants for the tick model, milliseconds.
    pub tick_latencies_ms: Vec<u32>,
    /// Spread assumptions for cost overlays, pips.
    pub overlay_spreads: Vec<f64>,
    /// Slippage assumptions for cost overlays, pips.
    pub overlay_slippages: Vec<f64>,
    /// Pip value per lot used by cost overlays, account currency.
    pub pip_value: f64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            rolling_days: vec![30, 90, 180],
            calendar_months_ago: vec![1, 2, 3],
            models: vec![DataModel::Ohlc, DataModel::Tick],
            tick_latencies_ms: vec![50, 100],
            overlay_spreads: vec![1.0, 2.0, 3.0],
            overlay_slippages: vec![0.5, 1.0],
            pip_value: 10.0,
        }
    }
}

/// Autonomy toggles for the optional and pause-point stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Select passes autonomously instead of pausing.
    pub auto_selection: bool,
    /// Decide refinement autonomously instead of pausing.
    pub auto_refine_decision: bool,
    /// Run the stress-scenario stage.
    pub auto_stress: bool,
    /// Run the forward-window stage.
    pub auto_forward_windows: bool,
    /// Run the multi-pair stage.
    pub auto_multi_pair: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            auto_selection: true,
            auto_refine_decision: true,
            auto_stress: true,
            auto_forward_windows: true,
            auto_multi_pair: false,
        }
    }
}

/// Metric used to pick the best pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BestPassMetric {
    /// Composite score.
    #[default]
    Score,
    /// Net profit.
    Profit,
}

/// Pass-selection settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Metric used to pick the best pass.
    pub best_pass_metric: BestPassMetric,
}

/// Filesystem and runner locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root directory for workflow state, artifacts, and reports.
    pub runs_dir: PathBuf,
    /// Terminal executable path.
    pub terminal_binary: PathBuf,
    /// Editor (compiler) executable path.
    pub editor_binary: PathBuf,
    /// Monthly tick-archive directory, when tick data is installed.
    pub tick_data_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            runs_dir: PathBuf::from("runs"),
            terminal_binary: PathBuf::from("terminal64.exe"),
            editor_binary: PathBuf::from("metaeditor64.exe"),
            tick_data_dir: None,
        }
    }
}

/// Multi-pair settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiPairConfig {
    /// Additional symbols evaluated by child workflows.
    pub symbols: Vec<String>,
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Complete Gauntlet configuration record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GauntletConfig {
    /// Backtest period layout.
    pub period: PeriodConfig,
    /// Price data and execution model.
    pub data: DataConfig,
    /// Account settings.
    pub account: AccountConfig,
    /// Gate thresholds.
    pub gates: GateThresholds,
    /// Monte-Carlo settings.
    pub monte_carlo: MonteCarloConfig,
    /// Sweep settings.
    pub optimization: OptimizationConfig,
    /// Refinement settings.
    pub refinement: RefinementConfig,
    /// Stress-scenario settings.
    pub stress: StressConfig,
    /// Autonomy toggles.
    pub behavior: BehaviorConfig,
    /// Pass-selection settings.
    pub selection: SelectionConfig,
    /// Filesystem and runner locations.
    pub paths: PathsConfig,
    /// Multi-pair settings.
    pub multi_pair: MultiPairConfig,
}

// ============================================================================
// SECTION: Safety Parameters
// ============================================================================

/// Injected safety parameter: maximum allowed spread in pips.
pub const SAFETY_MAX_SPREAD: &str = "MaxSpreadPips";
/// Injected safety parameter: maximum allowed slippage in pips.
pub const SAFETY_MAX_SLIPPAGE: &str = "MaxSlippagePips";
/// Permissive override applied to both safety limits during validation runs.
pub const SAFETY_PERMISSIVE_PIPS: f64 = 500.0;
/// Pinned default for the spread limit during sweeps and backtests.
pub const SAFETY_DEFAULT_SPREAD_PIPS: f64 = 20.0;
/// Pinned default for the slippage limit during sweeps and backtests.
pub const SAFETY_DEFAULT_SLIPPAGE_PIPS: f64 = 5.0;

/// Names of the injected safety parameters.
#[must_use]
pub const fn safety_parameter_names() -> [&'static str; 2] {
    [SAFETY_MAX_SPREAD, SAFETY_MAX_SLIPPAGE]
}
