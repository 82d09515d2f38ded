//! Four-pillar entry confluence.
//!
//! Each pillar is an independent pure check — stage, trend, volatility,
//! volume — and the score is simply how many agree with the proposed
//! direction. Missing data degrades one pillar at a time: an absent VIX
//! fails the volatility pillar, an absent breadth feed leaves the volume
//! pillar neutral-favorable with a flag, and neither touches the others.

use crate::config::{BreadthConfig, EntryConfig, PanicPolicy};
use crate::domain::{Breadth, Direction, PillarScore, Stage, StageLabel, VixRegime, VixTrend};
use crate::indicators::{IndicatorSnapshot, VixView};

/// Everything the scorer reads for one candidate on one date.
#[derive(Debug, Clone, Copy)]
pub struct PillarInputs<'a> {
    pub stage: &'a StageLabel,
    pub snapshot: &'a IndicatorSnapshot,
    pub vix: Option<&'a VixView>,
    pub breadth: Option<&'a Breadth>,
}

/// Stage pillar: the effective stage must match the trade direction.
pub fn stage_pillar(label: &StageLabel, direction: Direction) -> bool {
    match direction {
        Direction::Long => label.is_effective(Stage::Advancing),
        Direction::Inverse => label.is_effective(Stage::Declining),
    }
}

/// Trend pillar: count of SMA alignment conditions in the trade's favor.
///
/// Five conditions per direction; favorable needs `min_conditions` of
/// them. Any missing SMA fails the pillar outright.
pub fn trend_pillar(snap: &IndicatorSnapshot, direction: Direction, min_conditions: usize) -> (bool, usize) {
    let close = snap.close;
    let (Some(s5), Some(s20), Some(s50), Some(s150), Some(s200)) = (
        snap.sma(5),
        snap.sma(20),
        snap.sma(50),
        snap.sma(150),
        snap.sma(200),
    ) else {
        return (false, 0);
    };

    let conditions = match direction {
        Direction::Long => [
            close > s5,
            s5 > s20,
            close > s50,
            close > s150,
            close > s200,
        ],
        Direction::Inverse => [
            close < s5,
            s5 < s20,
            close < s50,
            close < s150,
            close < s200,
        ],
    };

    let score = conditions.iter().filter(|&&c| c).count();
    (score >= min_conditions, score)
}

/// Volatility pillar: VIX regime/trend gate plus a band-position sanity
/// check for longs.
pub fn volatility_pillar(
    vix: Option<&VixView>,
    percent_b: Option<f64>,
    direction: Direction,
) -> bool {
    let Some(vix) = vix else {
        return false;
    };

    match direction {
        Direction::Long => {
            let vix_ok = matches!(vix.regime, VixRegime::Low | VixRegime::Normal)
                || (vix.regime == VixRegime::Elevated && vix.trend == Some(VixTrend::Falling));
            // Close outside the bands means an extended move; absent %B
            // does not veto.
            let bb_ok = percent_b.map_or(true, |b| (0.0..=1.0).contains(&b));
            vix_ok && bb_ok
        }
        Direction::Inverse => {
            matches!(vix.regime, VixRegime::High | VixRegime::Extreme)
                && vix.trend == Some(VixTrend::Rising)
        }
    }
}

/// Volume pillar: breadth ratios for or against the trade, plus warning
/// flags for extreme readings.
///
/// No breadth data leaves the pillar favorable — the feed is optional —
/// with a flag so the gap is visible in the report.
pub fn volume_pillar(
    breadth: Option<&Breadth>,
    direction: Direction,
    cfg: &BreadthConfig,
) -> (bool, Vec<String>) {
    let mut flags = Vec::new();

    let Some(b) = breadth else {
        flags.push("no breadth data, volume pillar neutral".to_string());
        return (true, flags);
    };

    if b.fomo_ratio >= cfg.fomo_threshold {
        flags.push(format!("FOMO warning: ratio={:.1}", b.fomo_ratio));
    }
    if b.panic_ratio >= cfg.panic_extreme {
        flags.push(format!("extreme panic: ratio={:.1}", b.panic_ratio));
    }

    let favorable = match direction {
        Direction::Long => {
            let no_euphoria = b
                .fomo_ratio_ma
                .is_some_and(|ma| ma < cfg.euphoria_ma_limit);
            match cfg.panic_policy {
                // Washout selling is a contrarian buy setup.
                PanicPolicy::Contrarian => b.panic_ratio >= cfg.panic_threshold || no_euphoria,
                // Treat heavy selling as a reason to stand aside instead.
                PanicPolicy::Blocker => no_euphoria && b.panic_ratio < cfg.panic_extreme,
            }
        }
        Direction::Inverse => b.fomo_ratio >= cfg.fomo_threshold,
    };

    (favorable, flags)
}

/// Score all four pillars for one candidate.
pub fn score(
    symbol: &str,
    direction: Direction,
    inputs: PillarInputs<'_>,
    entry: &EntryConfig,
    breadth_cfg: &BreadthConfig,
) -> PillarScore {
    let stage_aligned = stage_pillar(inputs.stage, direction);
    let (trend_aligned, _trend_score) =
        trend_pillar(inputs.snapshot, direction, entry.trend_min_conditions);
    let volatility_aligned =
        volatility_pillar(inputs.vix, inputs.snapshot.percent_b, direction);
    let (volume_aligned, flags) = volume_pillar(inputs.breadth, direction, breadth_cfg);

    PillarScore {
        symbol: symbol.to_string(),
        direction,
        stage_aligned,
        trend_aligned,
        volatility_aligned,
        volume_aligned,
        relative_strength: inputs.snapshot.relative_strength,
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndicatorConfig;
    use crate::domain::RawStage;
    use crate::indicators::make_bars;

    fn uptrend_snapshot() -> IndicatorSnapshot {
        let closes: Vec<f64> = (0..300).map(|i| 100.0 * 1.003f64.powi(i)).collect();
        let bars = make_bars(&closes);
        IndicatorSnapshot::compute(&bars, &IndicatorConfig::default()).unwrap()
    }

    fn advancing_label() -> StageLabel {
        StageLabel {
            raw: RawStage::Stage(Stage::Advancing),
            effective: Some(Stage::Advancing),
            consecutive_days: 5,
            confirmed: true,
        }
    }

    fn calm_vix() -> VixView {
        VixView {
            close: 14.0,
            regime: VixRegime::Low,
            trend: Some(VixTrend::Falling),
            daily_change_pct: Some(-1.0),
            spike: false,
        }
    }

    fn breadth(panic: f64, fomo: f64, fomo_ma: Option<f64>) -> Breadth {
        Breadth {
            panic_ratio: panic,
            fomo_ratio: fomo,
            panic_ratio_ma: None,
            fomo_ratio_ma: fomo_ma,
        }
    }

    #[test]
    fn stage_pillar_matches_direction() {
        let label = advancing_label();
        assert!(stage_pillar(&label, Direction::Long));
        assert!(!stage_pillar(&label, Direction::Inverse));
        assert!(!stage_pillar(&StageLabel::undefined(), Direction::Long));
    }

    #[test]
    fn trend_pillar_counts_sma_alignment() {
        let snap = uptrend_snapshot();
        let (fav, score) = trend_pillar(&snap, Direction::Long, 4);
        assert!(fav);
        assert_eq!(score, 5);
        let (fav, score) = trend_pillar(&snap, Direction::Inverse, 4);
        assert!(!fav);
        assert_eq!(score, 0);
    }

    #[test]
    fn trend_pillar_fails_without_long_smas() {
        let bars = make_bars(&[100.0; 30]);
        let snap = IndicatorSnapshot::compute(&bars, &IndicatorConfig::default()).unwrap();
        let (fav, score) = trend_pillar(&snap, Direction::Long, 4);
        assert!(!fav);
        assert_eq!(score, 0);
    }

    #[test]
    fn volatility_pillar_long_wants_calm_vix() {
        let vix = calm_vix();
        assert!(volatility_pillar(Some(&vix), Some(0.6), Direction::Long));
        // %B above 1 means close outside the upper band.
        assert!(!volatility_pillar(Some(&vix), Some(1.3), Direction::Long));
        assert!(!volatility_pillar(None, Some(0.5), Direction::Long));
    }

    #[test]
    fn volatility_pillar_elevated_needs_falling_trend() {
        let mut vix = calm_vix();
        vix.close = 24.0;
        vix.regime = VixRegime::Elevated;
        vix.trend = Some(VixTrend::Falling);
        assert!(volatility_pillar(Some(&vix), None, Direction::Long));
        vix.trend = Some(VixTrend::Rising);
        assert!(!volatility_pillar(Some(&vix), None, Direction::Long));
    }

    #[test]
    fn volatility_pillar_inverse_wants_fear() {
        let mut vix = calm_vix();
        vix.close = 34.0;
        vix.regime = VixRegime::High;
        vix.trend = Some(VixTrend::Rising);
        assert!(volatility_pillar(Some(&vix), None, Direction::Inverse));
        vix.trend = Some(VixTrend::Falling);
        assert!(!volatility_pillar(Some(&vix), None, Direction::Inverse));
    }

    #[test]
    fn volume_pillar_neutral_without_data() {
        let cfg = BreadthConfig::default();
        let (fav, flags) = volume_pillar(None, Direction::Long, &cfg);
        assert!(fav);
        assert_eq!(flags.len(), 1);
    }

    #[test]
    fn contrarian_panic_is_favorable_for_longs() {
        let cfg = BreadthConfig::default();
        let b = breadth(4.0, 0.25, Some(3.0)); // heavy panic, euphoric MA
        let (fav, _) = volume_pillar(Some(&b), Direction::Long, &cfg);
        assert!(fav);
    }

    #[test]
    fn blocker_policy_rejects_extreme_panic() {
        let cfg = BreadthConfig {
            panic_policy: PanicPolicy::Blocker,
            ..Default::default()
        };
        let b = breadth(9.0, 0.1, Some(1.0)); // extreme panic, calm MA
        let (fav, flags) = volume_pillar(Some(&b), Direction::Long, &cfg);
        assert!(!fav);
        assert!(flags.iter().any(|f| f.contains("extreme panic")));
    }

    #[test]
    fn euphoria_blocks_longs_without_panic() {
        let cfg = BreadthConfig::default();
        let b = breadth(0.5, 2.0, Some(2.5)); // no panic, euphoric MA
        let (fav, _) = volume_pillar(Some(&b), Direction::Long, &cfg);
        assert!(!fav);
    }

    #[test]
    fn inverse_volume_wants_fomo() {
        let cfg = BreadthConfig::default();
        let b = breadth(0.3, 3.5, Some(2.5));
        let (fav, _) = volume_pillar(Some(&b), Direction::Inverse, &cfg);
        assert!(fav);
    }

    #[test]
    fn full_score_counts_aligned_pillars() {
        let snap = uptrend_snapshot();
        let label = advancing_label();
        let vix = calm_vix();
        let b = breadth(0.8, 1.2, Some(1.1));
        let inputs = PillarInputs {
            stage: &label,
            snapshot: &snap,
            vix: Some(&vix),
            breadth: Some(&b),
        };
        let score = score(
            "SPY",
            Direction::Long,
            inputs,
            &EntryConfig::default(),
            &BreadthConfig::default(),
        );
        // Stage, trend, volume align; volatility depends on %B of the
        // steep synthetic uptrend, which rides the upper band.
        assert!(score.stage_aligned);
        assert!(score.trend_aligned);
        assert!(score.volume_aligned);
        assert!(score.count() >= 3);
    }
}
