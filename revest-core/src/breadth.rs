//! Market breadth — panic/FOMO volume ratios.
//!
//! Breadth comes from NYSE up/down volume when a feed supplies it, or
//! from an equal-weight vs cap-weight divergence proxy when it doesn't.
//! The proxy synthesizes up/down volumes from an equal-weight ETF's
//! return against the benchmark's: equal-weight outperforming means
//! broad participation, cap-weight outperforming means a narrow rally.

use crate::config::BreadthConfig;
use crate::domain::{Bar, Breadth};
use crate::history::MarketHistory;
use chrono::NaiveDate;

/// One day of up/down volume, however sourced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeDay {
    pub date: NaiveDate,
    pub up_volume: f64,
    pub down_volume: f64,
}

/// Supplies daily up/down volume series up to an as-of date.
pub trait BreadthSource {
    fn volume_days(&self, as_of: NaiveDate) -> Vec<VolumeDay>;

    /// Whether this source is a proxy rather than real exchange volume.
    fn is_proxy(&self) -> bool {
        false
    }
}

/// Breadth from a directly supplied up/down volume series.
#[derive(Debug, Clone, Default)]
pub struct FeedBreadth {
    days: Vec<VolumeDay>,
}

impl FeedBreadth {
    pub fn new(mut days: Vec<VolumeDay>) -> Self {
        days.sort_by_key(|d| d.date);
        Self { days }
    }
}

impl BreadthSource for FeedBreadth {
    fn volume_days(&self, as_of: NaiveDate) -> Vec<VolumeDay> {
        self.days.iter().filter(|d| d.date <= as_of).copied().collect()
    }
}

/// Breadth proxied from equal-weight vs cap-weight return divergence.
///
/// Daily: diff = proxy_ret - benchmark_ret. Positive diff inflates the
/// synthetic up volume, negative inflates down volume, both clamped so
/// neither side collapses to zero. Strong benchmark days get a further
/// 1.3x boost on the winning side.
#[derive(Debug, Clone)]
pub struct EquityProxyBreadth<'a> {
    history: &'a MarketHistory,
    benchmark: String,
    proxy: String,
}

impl<'a> EquityProxyBreadth<'a> {
    pub fn new(history: &'a MarketHistory, benchmark: &str, proxy: &str) -> Self {
        Self {
            history,
            benchmark: benchmark.to_string(),
            proxy: proxy.to_string(),
        }
    }
}

impl BreadthSource for EquityProxyBreadth<'_> {
    fn volume_days(&self, as_of: NaiveDate) -> Vec<VolumeDay> {
        synthesize_volume_days(
            self.history.bars_up_to(&self.benchmark, as_of),
            self.history.bars_up_to(&self.proxy, as_of),
        )
    }

    fn is_proxy(&self) -> bool {
        true
    }
}

/// Latest breadth from the first source with data on or before the date.
///
/// Sources are tried in order, so callers list the primary feed ahead of
/// the proxy; a feed with no value for the date falls through. Returns the
/// reading and whether it came from a proxy source.
pub fn resolve_breadth(
    sources: &[&dyn BreadthSource],
    cfg: &BreadthConfig,
    as_of: NaiveDate,
) -> (Option<Breadth>, bool) {
    for source in sources {
        let days = source.volume_days(as_of);
        if !days.is_empty() {
            return (breadth_from_days(&days, cfg), source.is_proxy());
        }
    }
    (None, false)
}

fn synthesize_volume_days(bench: &[Bar], proxy: &[Bar]) -> Vec<VolumeDay> {
    let mut days = Vec::new();
    let mut prev: Option<(&Bar, &Bar)> = None;
    let mut pi = 0usize;

    for b in bench {
        // Align proxy bars by date; unmatched benchmark days are skipped.
        while pi < proxy.len() && proxy[pi].date < b.date {
            pi += 1;
        }
        if pi >= proxy.len() || proxy[pi].date != b.date {
            continue;
        }
        let p = &proxy[pi];

        if let Some((pb, pp)) = prev {
            if pb.close > 0.0 && pp.close > 0.0 {
                let bench_ret = (b.close - pb.close) / pb.close;
                let proxy_ret = (p.close - pp.close) / pp.close;
                let diff = proxy_ret - bench_ret;
                let vol = b.volume as f64;

                let (mut up, mut down) = if diff > 0.0 {
                    (
                        vol * (1.0 + (diff * 100.0).min(2.0)),
                        vol * (1.0 - (diff * 100.0).min(0.7)).max(0.3),
                    )
                } else {
                    (
                        vol * (1.0 + (diff * 100.0).max(-0.7)).max(0.3),
                        vol * (1.0 + (diff.abs() * 100.0).min(2.0)),
                    )
                };

                if bench_ret > 0.01 {
                    up *= 1.3;
                } else if bench_ret < -0.01 {
                    down *= 1.3;
                }

                days.push(VolumeDay {
                    date: b.date,
                    up_volume: up,
                    down_volume: down,
                });
            }
        }
        prev = Some((b, p));
    }

    days
}

/// Assemble the latest breadth reading from a volume-day series.
///
/// Ratios guard against zero denominators; the moving averages need
/// `ratio_ma_period` days and stay absent until then.
pub fn breadth_from_days(days: &[VolumeDay], cfg: &BreadthConfig) -> Option<Breadth> {
    let last = days.last()?;
    let panic_ratio = safe_ratio(last.down_volume, last.up_volume)?;
    let fomo_ratio = safe_ratio(last.up_volume, last.down_volume)?;

    let p = cfg.ratio_ma_period;
    let (panic_ma, fomo_ma) = if days.len() >= p {
        let tail = &days[days.len() - p..];
        let panic: Option<Vec<f64>> = tail
            .iter()
            .map(|d| safe_ratio(d.down_volume, d.up_volume))
            .collect();
        let fomo: Option<Vec<f64>> = tail
            .iter()
            .map(|d| safe_ratio(d.up_volume, d.down_volume))
            .collect();
        (
            panic.map(|v| v.iter().sum::<f64>() / p as f64),
            fomo.map(|v| v.iter().sum::<f64>() / p as f64),
        )
    } else {
        (None, None)
    };

    Some(Breadth {
        panic_ratio,
        fomo_ratio,
        panic_ratio_ma: panic_ma,
        fomo_ratio_ma: fomo_ma,
    })
}

fn safe_ratio(num: f64, den: f64) -> Option<f64> {
    if den > 0.0 && num.is_finite() && den.is_finite() {
        Some(num / den)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn day(d: u32, up: f64, down: f64) -> VolumeDay {
        VolumeDay {
            date: date(d),
            up_volume: up,
            down_volume: down,
        }
    }

    #[test]
    fn panic_and_fomo_ratios() {
        let cfg = BreadthConfig::default();
        let days = vec![day(2, 1_000.0, 4_000.0)];
        let b = breadth_from_days(&days, &cfg).unwrap();
        assert_approx(b.panic_ratio, 4.0, 1e-10);
        assert_approx(b.fomo_ratio, 0.25, 1e-10);
        assert!(b.panic_ratio_ma.is_none());
    }

    #[test]
    fn ratio_ma_appears_after_window_fills() {
        let cfg = BreadthConfig {
            ratio_ma_period: 3,
            ..Default::default()
        };
        let days = vec![
            day(2, 1_000.0, 2_000.0),
            day(3, 1_000.0, 3_000.0),
            day(4, 1_000.0, 4_000.0),
        ];
        let b = breadth_from_days(&days, &cfg).unwrap();
        assert_approx(b.panic_ratio_ma.unwrap(), 3.0, 1e-10);
    }

    #[test]
    fn zero_volume_day_yields_no_reading() {
        let cfg = BreadthConfig::default();
        let days = vec![day(2, 0.0, 5_000.0)];
        assert!(breadth_from_days(&days, &cfg).is_none());
    }

    #[test]
    fn proxy_outperformance_inflates_up_volume() {
        // Benchmark flat, proxy up 1% on day 2.
        let bench = make_bars(&[100.0, 100.0]);
        let mut proxy = make_bars(&[100.0, 101.0]);
        for p in &mut proxy {
            p.symbol = "RSP".into();
        }
        let days = synthesize_volume_days(&bench, &proxy);
        assert_eq!(days.len(), 1);
        assert!(days[0].up_volume > days[0].down_volume);
    }

    #[test]
    fn benchmark_selloff_inflates_down_volume() {
        // Benchmark -2%, proxy -3%: narrow-and-falling.
        let bench = make_bars(&[100.0, 98.0]);
        let proxy = make_bars(&[100.0, 97.0]);
        let days = synthesize_volume_days(&bench, &proxy);
        assert!(days[0].down_volume > days[0].up_volume);
    }

    #[test]
    fn proxy_dates_must_align() {
        let bench = make_bars(&[100.0, 101.0, 102.0]);
        let mut proxy = make_bars(&[100.0, 101.0]);
        proxy[1].date = date(10); // misaligned second bar
        let days = synthesize_volume_days(&bench, &proxy);
        // Only day 1 aligns, and a lone day has no previous close.
        assert!(days.is_empty());
    }

    #[test]
    fn feed_breadth_respects_as_of() {
        let source = FeedBreadth::new(vec![day(4, 1.0, 1.0), day(2, 1.0, 1.0)]);
        let days = source.volume_days(date(3));
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, date(2));
    }

    fn divergent_history() -> MarketHistory {
        // Benchmark flat, proxy rising: broad participation every day.
        let mut history = MarketHistory::new();
        history.insert_bars("SPY", make_bars(&[100.0, 100.0, 100.0, 100.0]));
        history.insert_bars("RSP", make_bars(&[100.0, 101.0, 102.0, 103.0]));
        history
    }

    #[test]
    fn proxy_is_a_breadth_source() {
        let history = divergent_history();
        let source = EquityProxyBreadth::new(&history, "SPY", "RSP");
        assert!(source.is_proxy());
        let days = source.volume_days(date(5));
        assert_eq!(days.len(), 3);
        assert!(days.iter().all(|d| d.up_volume > d.down_volume));
    }

    #[test]
    fn resolver_prefers_feed_when_it_has_data() {
        let history = divergent_history();
        let proxy = EquityProxyBreadth::new(&history, "SPY", "RSP");
        let feed = FeedBreadth::new(vec![day(2, 1_000.0, 4_000.0)]);
        let sources: [&dyn BreadthSource; 2] = [&feed, &proxy];
        let (breadth, from_proxy) = resolve_breadth(&sources, &BreadthConfig::default(), date(5));
        assert!(!from_proxy);
        assert_approx(breadth.unwrap().panic_ratio, 4.0, 1e-10);
    }

    #[test]
    fn resolver_falls_back_to_proxy_for_uncovered_dates() {
        let history = divergent_history();
        let proxy = EquityProxyBreadth::new(&history, "SPY", "RSP");
        // Feed exists but only has data after the as-of date.
        let feed = FeedBreadth::new(vec![day(20, 1_000.0, 4_000.0)]);
        let sources: [&dyn BreadthSource; 2] = [&feed, &proxy];
        let (breadth, from_proxy) = resolve_breadth(&sources, &BreadthConfig::default(), date(5));
        assert!(from_proxy);
        assert!(breadth.unwrap().fomo_ratio > 1.0);
    }

    #[test]
    fn resolver_with_no_data_anywhere_yields_nothing() {
        let history = MarketHistory::new();
        let proxy = EquityProxyBreadth::new(&history, "SPY", "RSP");
        let sources: [&dyn BreadthSource; 1] = [&proxy];
        let (breadth, from_proxy) = resolve_breadth(&sources, &BreadthConfig::default(), date(5));
        assert!(breadth.is_none());
        assert!(!from_proxy);
    }
}
