//! VIX readings — regime bucket, trend, daily change, spike flag.
//!
//! Regime thresholds are half-open upward: a close of exactly 20.0 is
//! Elevated, not Normal. Trend compares a fast SMA against a slow SMA
//! of the VIX close; it is undefined until the slow window fills.

use crate::config::VixConfig;
use crate::domain::{Bar, VixRegime, VixTrend};
use crate::indicators::sma::{last_valid, sma_series};

/// A VIX reading assembled from the bars available as of a date.
#[derive(Debug, Clone, PartialEq)]
pub struct VixView {
    pub close: f64,
    pub regime: VixRegime,
    pub trend: Option<VixTrend>,
    pub daily_change_pct: Option<f64>,
    pub spike: bool,
}

/// Bucket a VIX close into its regime.
pub fn classify_regime(close: f64, cfg: &VixConfig) -> VixRegime {
    if close < cfg.low {
        VixRegime::Low
    } else if close < cfg.normal {
        VixRegime::Normal
    } else if close < cfg.elevated {
        VixRegime::Elevated
    } else if close < cfg.high {
        VixRegime::High
    } else {
        VixRegime::Extreme
    }
}

/// Full VIX view from an ordered bar slice. None when the slice is empty.
pub fn vix_view(bars: &[Bar], cfg: &VixConfig) -> Option<VixView> {
    let last = bars.last()?;
    let close = last.close;

    let fast = last_valid(&sma_series(bars, cfg.trend_fast));
    let slow = last_valid(&sma_series(bars, cfg.trend_slow));
    // Trend needs both averages; the slow window gates availability.
    let trend = match (fast, slow) {
        (Some(f), Some(s)) if bars.len() >= cfg.trend_slow => Some(if f > s {
            VixTrend::Rising
        } else {
            VixTrend::Falling
        }),
        _ => None,
    };

    let daily_change_pct = if bars.len() >= 2 {
        let prev = bars[bars.len() - 2].close;
        if prev > 0.0 && !prev.is_nan() && !close.is_nan() {
            Some((close - prev) / prev * 100.0)
        } else {
            None
        }
    } else {
        None
    };

    let spike = daily_change_pct.is_some_and(|chg| chg > cfg.spike_threshold);

    Some(VixView {
        close,
        regime: classify_regime(close, cfg),
        trend,
        daily_change_pct,
        spike,
    })
}
