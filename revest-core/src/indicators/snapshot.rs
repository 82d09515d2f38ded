//! As-of indicator snapshot for one symbol.
//!
//! Bridges the NaN series convention to `Option` fields: a value that has
//! not warmed up yet is absent, never zero or defaulted. Downstream logic
//! (stage classifier, pillars) treats an absent value as "condition not
//! met", so the engine stays conservative during warmup.

use crate::config::IndicatorConfig;
use crate::domain::Bar;
use crate::indicators::{atr_series, bandwidth_series, percent_b_series, sma_series, sma_slope_pct};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub close: f64,
    /// SMA per configured period; absent until warm.
    smas: BTreeMap<usize, f64>,
    /// Slope (percent over the configured lookback) per SMA period.
    slopes: BTreeMap<usize, f64>,
    pub percent_b: Option<f64>,
    pub bandwidth: Option<f64>,
    /// Percent distance of close from the relative-strength SMA.
    pub relative_strength: Option<f64>,
    pub atr: Option<f64>,
}

impl IndicatorSnapshot {
    /// Compute the snapshot for the last bar of an ordered slice.
    /// Returns None when the slice is empty.
    pub fn compute(bars: &[Bar], cfg: &IndicatorConfig) -> Option<Self> {
        let last = bars.last()?;
        let close = last.close;

        let mut smas = BTreeMap::new();
        let mut slopes = BTreeMap::new();
        for &period in &cfg.sma_periods {
            let series = sma_series(bars, period);
            if let Some(&v) = series.last().filter(|v| !v.is_nan()) {
                smas.insert(period, v);
            }
            let slope = sma_slope_pct(&series, cfg.slope_lookback);
            if let Some(&s) = slope.last().filter(|s| !s.is_nan()) {
                slopes.insert(period, s);
            }
        }

        let percent_b = finite_last(&percent_b_series(bars, cfg.bb_period, cfg.bb_std_dev));
        let bandwidth = finite_last(&bandwidth_series(bars, cfg.bb_period, cfg.bb_std_dev));
        let atr = finite_last(&atr_series(bars, cfg.atr_period));

        let relative_strength = smas
            .get(&cfg.relative_strength_sma)
            .filter(|&&sma| sma > 0.0)
            .map(|&sma| (close - sma) / sma * 100.0);

        Some(Self {
            close,
            smas,
            slopes,
            percent_b,
            bandwidth,
            relative_strength,
            atr,
        })
    }

    pub fn sma(&self, period: usize) -> Option<f64> {
        self.smas.get(&period).copied()
    }

    pub fn slope(&self, period: usize) -> Option<f64> {
        self.slopes.get(&period).copied()
    }

    /// True when the longest configured SMA has warmed up.
    pub fn fully_warm(&self, cfg: &IndicatorConfig) -> bool {
        cfg.sma_periods.iter().all(|p| self.smas.contains_key(p))
    }
}

fn finite_last(series: &[f64]) -> Option<f64> {
    series.last().filter(|v| !v.is_nan()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn snapshot_absent_fields_during_warmup() {
        let cfg = IndicatorConfig::default();
        let bars = make_bars(&[100.0; 30]); // enough for 5/20, not 50+
        let snap = IndicatorSnapshot::compute(&bars, &cfg).unwrap();
        assert!(snap.sma(5).is_some());
        assert!(snap.sma(20).is_some());
        assert!(snap.sma(50).is_none());
        assert!(snap.sma(200).is_none());
        assert!(snap.relative_strength.is_none());
        assert!(!snap.fully_warm(&cfg));
    }

    #[test]
    fn snapshot_warm_after_full_lookback() {
        let cfg = IndicatorConfig::default();
        let closes: Vec<f64> = (0..cfg.max_lookback() + 1)
            .map(|i| 100.0 + i as f64 * 0.1)
            .collect();
        let bars = make_bars(&closes);
        let snap = IndicatorSnapshot::compute(&bars, &cfg).unwrap();
        assert!(snap.fully_warm(&cfg));
        assert!(snap.slope(200).is_some());
        assert!(snap.percent_b.is_some());
        assert!(snap.atr.is_some());
    }

    #[test]
    fn relative_strength_is_percent_from_sma() {
        let cfg = IndicatorConfig::default();
        // 50 flat bars at 100, then last close pops to 110.
        let mut closes = vec![100.0; 50];
        closes.push(110.0);
        let bars = make_bars(&closes);
        let snap = IndicatorSnapshot::compute(&bars, &cfg).unwrap();
        let sma50 = snap.sma(50).unwrap();
        let expected = (110.0 - sma50) / sma50 * 100.0;
        assert_approx(snap.relative_strength.unwrap(), expected, DEFAULT_EPSILON);
    }

    #[test]
    fn empty_bars_yield_none() {
        let cfg = IndicatorConfig::default();
        assert!(IndicatorSnapshot::compute(&[], &cfg).is_none());
    }
}
