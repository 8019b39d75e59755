// crates/gauntlet-config/tests/boundary_validation.rs
// ============================================================================
// Module: Config Boundary Validation Tests
// Description: Defaults, TOML loading, and boundary violations.
// ============================================================================

//! Configuration behavior: defaults validate cleanly, TOML overrides land in
//! the right groups, and boundary violations are all reported at once.

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

use gauntlet_config::ConfigError;
use gauntlet_config::load_config;
use gauntlet_config::validate;
use gauntlet_core::DataModel;
use gauntlet_core::GauntletConfig;

#[test]
fn defaults_validate_cleanly() {
    let config = GauntletConfig::default();
    assert!(validate(&config).is_empty());
    assert_eq!(config.period.total_years, 4);
    assert_eq!(config.gates.min_trades, 50);
    assert_eq!(config.monte_carlo.iterations, 10_000);
    assert_eq!(config.optimization.sweep_timeout_secs, 36_000);
    assert!(!config.behavior.auto_multi_pair);
}

#[test]
fn toml_overrides_land_in_their_groups() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("gauntlet.toml");
    std::fs::write(
        &path,
        r#"
[period]
total_years = 6
in_sample_years = 5
forward_years = 1

[gates]
min_profit_factor = 2.0

[data]
model = "tick"

[behavior]
auto_selection = false
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.period.total_years, 6);
    assert!((config.gates.min_profit_factor - 2.0).abs() < f64::EPSILON);
    assert_eq!(config.data.model, DataModel::Tick);
    assert!(!config.behavior.auto_selection);
    // Untouched groups keep their defaults.
    assert_eq!(config.optimization.top_n_backtest, 20);
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("gauntlet.toml");
    std::fs::write(&path, "[period\ntotal_years = 4").unwrap();
    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn violations_are_collected_together() {
    let mut config = GauntletConfig::default();
    config.period.forward_years = 4;
    config.account.deposit = 0.0;
    config.gates.exploration_min_trades = 500;
    config.monte_carlo.iterations = 0;
    config.refinement.max_iterations = 5;

    let violations = validate(&config);
    assert!(violations.iter().any(|entry| entry.contains("forward_years")));
    assert!(violations.iter().any(|entry| entry.contains("deposit")));
    assert!(violations.iter().any(|entry| entry.contains("exploration_min_trades")));
    assert!(violations.iter().any(|entry| entry.contains("monte_carlo.iterations")));
    assert!(violations.iter().any(|entry| entry.contains("max_iterations")));
    assert!(violations.len() >= 5);
}

#[test]
fn invalid_file_surfaces_every_violation_in_the_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("gauntlet.toml");
    std::fs::write(
        &path,
        r"
[account]
deposit = -5.0
leverage = 0
",
    )
    .unwrap();
    let err = load_config(&path).unwrap_err();
    let ConfigError::Invalid(message) = err else {
        panic!("expected validation failure");
    };
    assert!(message.contains("deposit"));
    assert!(message.contains("leverage"));
}

#[test]
fn config_round_trips_through_toml() {
    let config = GauntletConfig::default();
    let text = toml::to_string(&config).unwrap();
    let parsed: GauntletConfig = toml::from_str(&text).unwrap();
    assert_eq!(config, parsed);
}
