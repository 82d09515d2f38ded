//! Weinstein stage classification with confirmation debounce.
//!
//! Two layers: `classify_raw` scores one day's indicators against
//! per-stage condition lists (count-based, so one noisy indicator cannot
//! flip the label), and `StageTracker` debounces the raw sequence into an
//! effective stage that only changes after `confirmation_days` consecutive
//! raw readings agree. Transitional days reset the streak but keep the
//! previous effective stage in force.

use crate::config::StageConfig;
use crate::domain::{RawStage, Stage, StageLabel};
use crate::indicators::{IndicatorSnapshot, SlopeDirection};
use std::collections::BTreeMap;

/// Classify one day's indicators into a raw stage.
///
/// Advancing and Declining need 4 of 5 conditions, Topping 3 of 4,
/// Basing 2 of 3. Missing long SMAs or slopes mean Transitional — never
/// a guess.
pub fn classify_raw(snap: &IndicatorSnapshot, cfg: &StageConfig) -> RawStage {
    let close = snap.close;
    let (Some(sma_50), Some(sma_150), Some(sma_200)) =
        (snap.sma(50), snap.sma(150), snap.sma(200))
    else {
        return RawStage::Transitional;
    };
    let (Some(slope_150), Some(slope_200)) = (snap.slope(150), snap.slope(200)) else {
        return RawStage::Transitional;
    };
    let slope_50 = snap.slope(50);

    let t = cfg.slope_threshold;
    let slope_150_dir = SlopeDirection::classify(slope_150, t);

    let advancing = [
        close > sma_150,
        close > sma_200,
        slope_150_dir == SlopeDirection::Rising,
        sma_50 > sma_150 && sma_150 > sma_200,
        slope_200 > -t,
    ];
    if count(&advancing) >= 4 {
        return RawStage::Stage(Stage::Advancing);
    }

    let declining = [
        close < sma_150,
        close < sma_200,
        slope_150_dir == SlopeDirection::Falling,
        sma_50 < sma_150 && sma_150 < sma_200,
        slope_200 < t,
    ];
    if count(&declining) >= 4 {
        return RawStage::Stage(Stage::Declining);
    }

    let topping = [
        // Long average flattening under the wider topping band.
        SlopeDirection::classify(slope_150, t * 2.0) == SlopeDirection::Flat,
        slope_50.is_some_and(|s| s < t),
        sma_50 < sma_150,
        slope_200 > -t,
    ];
    if count(&topping) >= 3 {
        return RawStage::Stage(Stage::Topping);
    }

    let basing = [
        slope_150_dir == SlopeDirection::Flat,
        SlopeDirection::classify(slope_200, t * 1.5) == SlopeDirection::Flat,
        sma_150 > 0.0 && ((close - sma_150) / sma_150 * 100.0).abs() < 3.0,
    ];
    if count(&basing) >= 2 {
        return RawStage::Stage(Stage::Basing);
    }

    RawStage::Transitional
}

fn count(conditions: &[bool]) -> usize {
    conditions.iter().filter(|&&c| c).count()
}

#[derive(Debug, Clone, Default)]
struct SymbolStage {
    prev_raw: Option<RawStage>,
    consecutive: usize,
    effective: Option<Stage>,
}

/// Debounces raw stage sequences per symbol.
///
/// Feed it one raw classification per trading day, in order. The tracker
/// is replayed from history in backtests and rebuilt fresh per run, so its
/// state never leaks across runs.
#[derive(Debug, Clone, Default)]
pub struct StageTracker {
    confirmation_days: usize,
    symbols: BTreeMap<String, SymbolStage>,
}

impl StageTracker {
    pub fn new(cfg: &StageConfig) -> Self {
        Self {
            confirmation_days: cfg.confirmation_days,
            symbols: BTreeMap::new(),
        }
    }

    /// Record today's raw stage for a symbol and return the debounced label.
    pub fn observe(&mut self, symbol: &str, raw: RawStage) -> StageLabel {
        let state = self.symbols.entry(symbol.to_string()).or_default();

        let consecutive = match (state.prev_raw, raw) {
            (Some(prev), r) if prev == r => state.consecutive + 1,
            (_, RawStage::Transitional) => 0,
            _ => 1,
        };

        let (effective, confirmed) = match raw {
            RawStage::Transitional => (state.effective, false),
            RawStage::Stage(s) if state.effective == Some(s) => (Some(s), true),
            RawStage::Stage(s) if consecutive >= self.confirmation_days => (Some(s), true),
            RawStage::Stage(_) => (state.effective, false),
        };

        state.prev_raw = Some(raw);
        state.consecutive = consecutive;
        state.effective = effective;

        StageLabel {
            raw,
            effective,
            consecutive_days: consecutive,
            confirmed,
        }
    }

    /// The current label for a symbol without advancing it, if observed.
    pub fn current(&self, symbol: &str) -> Option<StageLabel> {
        self.symbols.get(symbol).map(|s| StageLabel {
            raw: s.prev_raw.unwrap_or(RawStage::Transitional),
            effective: s.effective,
            consecutive_days: s.consecutive,
            confirmed: s
                .prev_raw
                .is_some_and(|r| matches!(r, RawStage::Stage(st) if Some(st) == s.effective)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndicatorConfig;
    use crate::indicators::make_bars;

    fn snap_for(closes: &[f64]) -> IndicatorSnapshot {
        let bars = make_bars(closes);
        IndicatorSnapshot::compute(&bars, &IndicatorConfig::default()).unwrap()
    }

    fn tracker() -> StageTracker {
        StageTracker::new(&StageConfig::default())
    }

    const ADV: RawStage = RawStage::Stage(Stage::Advancing);
    const DEC: RawStage = RawStage::Stage(Stage::Declining);

    #[test]
    fn insufficient_history_is_transitional() {
        let snap = snap_for(&[100.0; 60]); // no 150/200 SMA yet
        assert_eq!(
            classify_raw(&snap, &StageConfig::default()),
            RawStage::Transitional
        );
    }

    #[test]
    fn steady_uptrend_classifies_advancing() {
        // 300 bars rising 0.3%/day: close > long SMAs, slopes positive,
        // SMAs stacked bullishly.
        let closes: Vec<f64> = (0..300).map(|i| 100.0 * 1.003f64.powi(i)).collect();
        let snap = snap_for(&closes);
        assert_eq!(
            classify_raw(&snap, &StageConfig::default()),
            RawStage::Stage(Stage::Advancing)
        );
    }

    #[test]
    fn steady_downtrend_classifies_declining() {
        let closes: Vec<f64> = (0..300).map(|i| 400.0 * 0.997f64.powi(i)).collect();
        let snap = snap_for(&closes);
        assert_eq!(
            classify_raw(&snap, &StageConfig::default()),
            RawStage::Stage(Stage::Declining)
        );
    }

    #[test]
    fn long_flat_series_classifies_basing() {
        let snap = snap_for(&[100.0; 300]);
        assert_eq!(
            classify_raw(&snap, &StageConfig::default()),
            RawStage::Stage(Stage::Basing)
        );
    }

    #[test]
    fn new_stage_confirms_after_three_days() {
        let mut t = tracker();
        let l1 = t.observe("SPY", ADV);
        assert_eq!(l1.effective, None);
        assert!(!l1.confirmed);
        let l2 = t.observe("SPY", ADV);
        assert_eq!(l2.effective, None);
        let l3 = t.observe("SPY", ADV);
        assert_eq!(l3.effective, Some(Stage::Advancing));
        assert!(l3.confirmed);
        assert_eq!(l3.consecutive_days, 3);
    }

    #[test]
    fn stage_change_needs_fresh_streak() {
        let mut t = tracker();
        for _ in 0..3 {
            t.observe("SPY", ADV);
        }
        // Two declining days: still effectively advancing.
        let l = t.observe("SPY", DEC);
        assert_eq!(l.effective, Some(Stage::Advancing));
        assert!(!l.confirmed);
        t.observe("SPY", DEC);
        let l = t.observe("SPY", DEC);
        assert_eq!(l.effective, Some(Stage::Declining));
        assert!(l.confirmed);
    }

    #[test]
    fn transitional_resets_streak_but_keeps_effective() {
        let mut t = tracker();
        for _ in 0..3 {
            t.observe("SPY", ADV);
        }
        t.observe("SPY", DEC);
        t.observe("SPY", DEC);
        // One transitional day wipes the declining streak.
        let l = t.observe("SPY", RawStage::Transitional);
        assert_eq!(l.effective, Some(Stage::Advancing));
        assert_eq!(l.consecutive_days, 0);
        // Declining has to start over.
        let l = t.observe("SPY", DEC);
        assert_eq!(l.consecutive_days, 1);
        assert_eq!(l.effective, Some(Stage::Advancing));
    }

    #[test]
    fn matching_effective_confirms_immediately() {
        let mut t = tracker();
        for _ in 0..3 {
            t.observe("SPY", ADV);
        }
        t.observe("SPY", RawStage::Transitional);
        // Back to advancing: streak restarts at 1 but it already matches
        // the effective stage, so it is confirmed.
        let l = t.observe("SPY", ADV);
        assert_eq!(l.consecutive_days, 1);
        assert!(l.confirmed);
        assert_eq!(l.effective, Some(Stage::Advancing));
    }

    #[test]
    fn symbols_tracked_independently() {
        let mut t = tracker();
        for _ in 0..3 {
            t.observe("SPY", ADV);
        }
        let l = t.observe("TLT", DEC);
        assert_eq!(l.effective, None);
        assert_eq!(t.current("SPY").unwrap().effective, Some(Stage::Advancing));
    }
}
