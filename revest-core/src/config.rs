//! Central configuration — every tunable parameter lives here.
//!
//! Defaults match the reference parameter set. Logic modules read values
//! from this struct and never hardcode them, so backtest parameter sweeps
//! only touch config. Loadable from TOML; every section has defaults so a
//! partial file works.

use crate::domain::Universe;
use crate::error::SignalError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How an extreme-panic breadth reading affects the long volume pillar.
///
/// The reference treats capitulation as a contrarian confirmer; `Blocker`
/// makes it a hard block instead. See the tests in `pillars` for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PanicPolicy {
    #[default]
    Contrarian,
    Blocker,
}

/// Indicator windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Simple moving average periods, shortest to longest.
    pub sma_periods: Vec<usize>,
    /// Bollinger band period and width.
    pub bb_period: usize,
    pub bb_std_dev: f64,
    /// Days over which SMA slopes are measured.
    pub slope_lookback: usize,
    /// SMA the relative-strength distance is measured from.
    pub relative_strength_sma: usize,
    /// Wilder ATR period.
    pub atr_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_periods: vec![5, 20, 50, 150, 200],
            bb_period: 20,
            bb_std_dev: 2.0,
            slope_lookback: 20,
            relative_strength_sma: 50,
            atr_period: 14,
        }
    }
}

impl IndicatorConfig {
    /// The longest lookback any indicator needs; below this, snapshots are
    /// undefined.
    pub fn max_lookback(&self) -> usize {
        let longest_sma = self.sma_periods.iter().copied().max().unwrap_or(0);
        // Slopes need the SMA value `slope_lookback` days earlier.
        longest_sma + self.slope_lookback
    }
}

/// VIX classification thresholds and trend windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VixConfig {
    pub low: f64,
    pub normal: f64,
    pub elevated: f64,
    pub high: f64,
    /// Fast/slow SMAs for the VIX trend.
    pub trend_fast: usize,
    pub trend_slow: usize,
    /// Percent daily change that flags a spike.
    pub spike_threshold: f64,
    /// VIX above this and rising forces an emergency exit.
    pub emergency_level: f64,
}

impl Default for VixConfig {
    fn default() -> Self {
        Self {
            low: 15.0,
            normal: 20.0,
            elevated: 30.0,
            high: 40.0,
            trend_fast: 5,
            trend_slow: 20,
            spike_threshold: 20.0,
            emergency_level: 40.0,
        }
    }
}

/// Breadth (advance/decline volume) thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreadthConfig {
    pub panic_threshold: f64,
    pub panic_extreme: f64,
    pub fomo_threshold: f64,
    pub fomo_extreme: f64,
    /// Smoothed FOMO MA at or above this blocks long entries (euphoria).
    pub euphoria_ma_limit: f64,
    /// Smoothing period for the ratio MAs.
    pub ratio_ma_period: usize,
    pub panic_policy: PanicPolicy,
}

impl Default for BreadthConfig {
    fn default() -> Self {
        Self {
            panic_threshold: 3.0,
            panic_extreme: 8.0,
            fomo_threshold: 3.0,
            fomo_extreme: 8.0,
            euphoria_ma_limit: 2.0,
            ratio_ma_period: 20,
            panic_policy: PanicPolicy::Contrarian,
        }
    }
}

/// Stage classification parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Percent slope of the 150-SMA separating flat from trending.
    pub slope_threshold: f64,
    /// Consecutive confirming days before a stage transition takes effect.
    pub confirmation_days: usize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            slope_threshold: 0.5,
            confirmation_days: 3,
        }
    }
}

/// Entry scoring thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    /// Pillar count for a strong signal (all four).
    pub strong_threshold: u8,
    /// Minimum pillar count to qualify for entry.
    pub moderate_threshold: u8,
    /// Minimum satisfied SMA alignment conditions (of 5) for the trend pillar.
    pub trend_min_conditions: usize,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            strong_threshold: 4,
            moderate_threshold: 3,
            trend_min_conditions: 4,
        }
    }
}

/// Stop, target, trailing, and partial-exit parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    /// Initial stop distance for standard long entries.
    pub max_stop_pct: f64,
    /// Initial stop distance for inverse entries (tighter).
    pub max_stop_pct_inverse: f64,
    pub first_target_pct: f64,
    pub first_target_pct_topping: f64,
    pub first_target_pct_inverse: f64,
    pub trailing_stop_pct: f64,
    pub trailing_stop_pct_inverse: f64,
    pub partial_exit_pct: f64,
    pub partial_exit_pct_topping: f64,
    pub partial_exit_pct_inverse: f64,
    /// Target hit within this many business days takes extra size off.
    pub speed_check_days: i64,
    pub speed_check_extra_pct: f64,
    pub speed_check_max_pct: f64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            max_stop_pct: 0.05,
            max_stop_pct_inverse: 0.04,
            first_target_pct: 0.02,
            first_target_pct_topping: 0.015,
            first_target_pct_inverse: 0.015,
            trailing_stop_pct: 0.03,
            trailing_stop_pct_inverse: 0.02,
            partial_exit_pct: 0.25,
            partial_exit_pct_topping: 0.50,
            partial_exit_pct_inverse: 0.25,
            speed_check_days: 2,
            speed_check_extra_pct: 0.25,
            speed_check_max_pct: 0.75,
        }
    }
}

/// ATR-based dynamic initial stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrStopConfig {
    pub enabled: bool,
    /// Stop distance = multiplier × ATR below entry.
    pub multiplier: f64,
    /// The ATR stop is clamped into [min, max] percent of entry price.
    pub max_stop_pct: f64,
    pub min_stop_pct: f64,
}

impl Default for AtrStopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            multiplier: 3.0,
            max_stop_pct: 0.10,
            min_stop_pct: 0.04,
        }
    }
}

/// Backtest-only parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Fraction of equity risked per trade against the stop distance.
    /// Risk ≥ stop% is equivalent to going all-in.
    pub risk_per_trade: f64,
    /// Trading days to wait after any exit before re-entering.
    pub reentry_cooldown_days: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.02,
            reentry_cooldown_days: 1,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RevestConfig {
    pub universe: Universe,
    pub indicators: IndicatorConfig,
    pub vix: VixConfig,
    pub breadth: BreadthConfig,
    pub stage: StageConfig,
    pub entry: EntryConfig,
    pub exits: ExitConfig,
    pub atr_stops: AtrStopConfig,
    pub replay: ReplayConfig,
}

impl RevestConfig {
    /// Load a (possibly partial) TOML config file.
    pub fn load(path: &Path) -> Result<Self, SignalError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SignalError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| SignalError::Config(format!("{}: {e}", path.display())))
    }
}
