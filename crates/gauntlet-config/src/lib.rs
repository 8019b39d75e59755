// crates/gauntlet-config/src/lib.rs
// ============================================================================
// Module: Gauntlet Config Loader
// Description: TOML loading and validation for GauntletConfig.
// Purpose: Give operators a single, checked configuration surface.
// Dependencies: gauntlet-core, serde, toml
// ============================================================================

//! ## Overview
//! The canonical configuration model lives in `gauntlet-core`; this crate
//! layers file discovery, TOML deserialization, and boundary validation on
//! top. Validation returns every violation at once so operators can fix a
//! config file in one pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use gauntlet_core::GauntletConfig;
use gauntlet_core::MAX_REFINE_ITERATIONS;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename probed in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "gauntlet.toml";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// The configuration file is not valid TOML for the schema.
    #[error("config parse error: {0}")]
    Parse(String),
    /// The configuration violates one or more boundary checks.
    #[error("config validation failed: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads and validates a configuration file.
///
/// # Errors
///
/// Returns [`ConfigError`] on read, parse, or validation failure.
pub fn load_config(path: &Path) -> Result<GauntletConfig, ConfigError> {
    let text = fs::read_to_string(path)
        .map_err(|err| ConfigError::Io(format!("read {}: {err}", path.display())))?;
    let config: GauntletConfig =
        toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?;
    let violations = validate(&config);
    if violations.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Invalid(violations.join("; ")))
    }
}

/// Loads the default config file when present, falling back to defaults.
///
/// # Errors
///
/// Returns [`ConfigError`] when a present file fails to load or validate; a
/// missing file is not an error.
pub fn load_default() -> Result<GauntletConfig, ConfigError> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.is_file() {
        load_config(path)
    } else {
        Ok(GauntletConfig::default())
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates configuration boundaries, returning every violation.
#[must_use]
pub fn validate(config: &GauntletConfig) -> Vec<String> {
    let mut violations = Vec::new();

    if config.period.total_years == 0 {
        violations.push("period.total_years must be at least 1".to_string());
    }
    if config.period.forward_years >= config.period.total_years {
        violations.push("period.forward_years must be less than period.total_years".to_string());
    }
    if config.period.in_sample_years + config.period.forward_years != config.period.total_years {
        violations.push(
            "period.in_sample_years plus period.forward_years must equal period.total_years"
                .to_string(),
        );
    }

    if config.account.deposit <= 0.0 {
        violations.push("account.deposit must be positive".to_string());
    }
    if config.account.leverage == 0 {
        violations.push("account.leverage must be at least 1".to_string());
    }

    if config.gates.min_profit_factor < 1.0 {
        violations.push("gates.min_profit_factor must be at least 1.0".to_string());
    }
    if !(0.0..=100.0).contains(&config.gates.max_drawdown_pct) {
        violations.push("gates.max_drawdown_pct must be within [0, 100]".to_string());
    }
    if config.gates.exploration_min_trades > config.gates.min_trades {
        violations.push(
            "gates.exploration_min_trades must not exceed gates.min_trades".to_string(),
        );
    }
    if !(0.0..=100.0).contains(&config.gates.mc_confidence_min) {
        violations.push("gates.mc_confidence_min must be within [0, 100]".to_string());
    }
    if !(0.0..=100.0).contains(&config.gates.mc_ruin_max) {
        violations.push("gates.mc_ruin_max must be within [0, 100]".to_string());
    }

    if config.monte_carlo.iterations == 0 {
        violations.push("monte_carlo.iterations must be at least 1".to_string());
    }
    if !(0.0..=1.0).contains(&config.monte_carlo.ruin_threshold) {
        violations.push("monte_carlo.ruin_threshold must be within [0, 1]".to_string());
    }

    if config.optimization.sweep_timeout_secs == 0 {
        violations.push("optimization.sweep_timeout_secs must be positive".to_string());
    }
    if config.optimization.heartbeat_secs == 0 {
        violations.push("optimization.heartbeat_secs must be positive".to_string());
    }
    if config.optimization.top_n_backtest == 0 {
        violations.push("optimization.top_n_backtest must be at least 1".to_string());
    }

    if config.refinement.max_iterations > MAX_REFINE_ITERATIONS {
        violations.push(format!(
            "refinement.max_iterations must not exceed {MAX_REFINE_ITERATIONS}"
        ));
    }
    if !(0.5..=1.0).contains(&config.refinement.toggle_dominance_threshold) {
        violations
            .push("refinement.toggle_dominance_threshold must be within [0.5, 1]".to_string());
    }
    if config.refinement.clustering_cv_threshold <= 0.0 {
        violations.push("refinement.clustering_cv_threshold must be positive".to_string());
    }

    if config.stress.models.is_empty() {
        violations.push("stress.models must name at least one data model".to_string());
    }
    if config.stress.pip_value <= 0.0 {
        violations.push("stress.pip_value must be positive".to_string());
    }

    violations
}
