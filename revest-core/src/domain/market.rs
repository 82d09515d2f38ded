//! Market-wide state for a single date: VIX regime/trend and breadth.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// VIX regime buckets. Thresholds are fixed by `VixConfig` (15/20/30/40).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VixRegime {
    Low,
    Normal,
    Elevated,
    High,
    Extreme,
}

/// VIX trend: fast SMA vs slow SMA of the VIX itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VixTrend {
    Rising,
    Falling,
}

/// Breadth ratios for one date, plus smoothed variants.
///
/// `panic_ratio` = declining/advancing volume, `fomo_ratio` = the reverse.
/// Ratios at or above the signal threshold (3.0) are meaningful; above the
/// extreme threshold (8.0) they flag capitulation or euphoria.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breadth {
    pub panic_ratio: f64,
    pub fomo_ratio: f64,
    /// 20-day MA of the panic ratio, when enough history exists.
    pub panic_ratio_ma: Option<f64>,
    /// 20-day MA of the FOMO ratio, when enough history exists.
    pub fomo_ratio_ma: Option<f64>,
}

/// Per-date market state consumed by the pillar scorer and exit checks.
///
/// `vix` fields are `None` when the VIX series lacks the history for the
/// trend SMAs — callers must treat that as non-aligned, never as favorable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub date: NaiveDate,
    pub vix_close: f64,
    pub vix_regime: VixRegime,
    pub vix_trend: Option<VixTrend>,
    /// Day-over-day VIX change in percent, when a prior close exists.
    pub vix_daily_change: Option<f64>,
    /// True when the VIX rose more than the spike threshold in one day.
    pub vix_spike: bool,
    /// Breadth is optional: the primary feed may be down and the proxy
    /// unavailable, in which case the volume pillar goes neutral.
    pub breadth: Option<Breadth>,
    /// Whether breadth came from the price-derived proxy instead of a feed.
    pub breadth_from_proxy: bool,
}

impl MarketState {
    /// Emergency condition: VIX above the emergency level and still rising.
    /// Forces a full exit and blocks all entries.
    pub fn vix_emergency(&self, emergency_level: f64) -> bool {
        self.vix_close > emergency_level && self.vix_trend == Some(VixTrend::Rising)
    }
}
