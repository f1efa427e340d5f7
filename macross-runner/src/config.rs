//! Serializable run configuration.

use anyhow::Context;
use macross_core::engine::EngineConfig;
use macross_core::strategy::StrategyParams;
use serde::{Deserialize, Serialize};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// All knobs for a single backtest run.
///
/// Every field has a default mirroring the reference setup, so a TOML
/// fragment only needs to name what it changes. File reading stays with the
/// caller; this layer only parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub short_period: usize,
    pub long_period: usize,
    pub atr_period: usize,
    pub rsi_period: usize,
    pub commission_rate: f64,
    pub slippage_rate: f64,
    pub initial_cash: f64,
    /// Fraction of equity risked per unit stop distance.
    pub risk_pct: f64,
    /// Stop distance in ATR multiples.
    pub stop_multiplier: f64,
    pub leverage_cap: f64,
    /// Base bars aggregated into one replay bar (1 trades the base
    /// timeframe directly; 1440 replays minute data as daily bars).
    pub replay_compression: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            short_period: 10,
            long_period: 20,
            atr_period: 14,
            rsi_period: 14,
            commission_rate: 0.0005,
            slippage_rate: 0.0001,
            initial_cash: 1_000_000.0,
            risk_pct: 0.02,
            stop_multiplier: 3.0,
            leverage_cap: 2.0,
            replay_compression: 1,
        }
    }
}

impl RunConfig {
    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs get the same RunId, so sweep output
    /// can be tracked content-addressably.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        let hash = blake3::hash(json.as_bytes());
        hash.to_hex().to_string()
    }

    /// Parse from a TOML fragment, filling unspecified fields from defaults.
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        toml::from_str(input).context("failed to parse run configuration")
    }

    pub fn strategy_params(&self) -> StrategyParams {
        StrategyParams {
            short_period: self.short_period,
            long_period: self.long_period,
            atr_period: self.atr_period,
            rsi_period: self.rsi_period,
            risk_pct: self.risk_pct,
            stop_multiplier: self.stop_multiplier,
            leverage_cap: self.leverage_cap,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            initial_cash: self.initial_cash,
            commission_rate: self.commission_rate,
            slippage_rate: self.slippage_rate,
        }
    }

    /// Same config with a different crossover pair (used by the sweep).
    pub fn with_periods(&self, short_period: usize, long_period: usize) -> Self {
        Self {
            short_period,
            long_period,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_setup() {
        let config = RunConfig::default();
        assert_eq!(config.short_period, 10);
        assert_eq!(config.long_period, 20);
        assert_eq!(config.commission_rate, 0.0005);
        assert_eq!(config.initial_cash, 1_000_000.0);
        assert_eq!(config.replay_compression, 1);
    }

    #[test]
    fn run_id_is_deterministic() {
        let a = RunConfig::default();
        let b = RunConfig::default();
        assert_eq!(a.run_id(), b.run_id());
    }

    #[test]
    fn run_id_changes_with_params() {
        let a = RunConfig::default();
        let b = a.with_periods(5, 30);
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn toml_fragment_fills_defaults() {
        let config = RunConfig::from_toml_str(
            r#"
            short_period = 5
            long_period = 60
            replay_compression = 1440
            "#,
        )
        .unwrap();
        assert_eq!(config.short_period, 5);
        assert_eq!(config.long_period, 60);
        assert_eq!(config.replay_compression, 1440);
        // Untouched fields come from defaults.
        assert_eq!(config.atr_period, 14);
        assert_eq!(config.commission_rate, 0.0005);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(RunConfig::from_toml_str("short_period = \"ten\"").is_err());
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = RunConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deser: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deser);
    }
}
