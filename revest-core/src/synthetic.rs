//! Seeded synthetic market generator for demos and replay tests.
//!
//! Produces a plausible regime-switching market for the whole default
//! universe: correlated equity series with trending phases, an inverse
//! ETF mirroring each equity's daily return, a mean-reverting VIX that
//! jumps when equities fall, and a flat cash proxy. Same seed, same
//! market — the generator is the only place randomness exists in the
//! crate, and it is always explicitly seeded.

use crate::domain::Bar;
use crate::history::MarketHistory;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Trading calendar: consecutive weekdays starting 2022-06-01.
fn trading_days(n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut d = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
    while dates.len() < n {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(d);
        }
        d += Duration::days(1);
    }
    dates
}

fn bars_from_closes(symbol: &str, dates: &[NaiveDate], closes: &[f64], rng: &mut StdRng) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let prev = if i == 0 { close } else { closes[i - 1] };
            let open = prev * (1.0 + rng.gen_range(-0.002..0.002));
            let hi_pad = close.abs().max(0.01) * rng.gen_range(0.001..0.008);
            let lo_pad = close.abs().max(0.01) * rng.gen_range(0.001..0.008);
            Bar {
                symbol: symbol.to_string(),
                date: dates[i],
                open,
                high: open.max(close) + hi_pad,
                low: open.min(close) - lo_pad,
                close,
                volume: rng.gen_range(50_000_000..120_000_000),
            }
        })
        .collect()
}

/// A drifting random walk with regime flips every 60-120 days.
fn regime_walk(rng: &mut StdRng, n: usize, start: f64, vol: f64) -> Vec<f64> {
    let mut closes = Vec::with_capacity(n);
    let mut price = start;
    let mut drift = 0.0005;
    let mut until_flip = rng.gen_range(60..120);
    for _ in 0..n {
        if until_flip == 0 {
            drift = match rng.gen_range(0..3) {
                0 => 0.0012,  // advance
                1 => -0.0010, // decline
                _ => 0.0,     // base/top
            };
            until_flip = rng.gen_range(60..120);
        }
        until_flip -= 1;
        let shock = rng.gen_range(-vol..vol);
        price *= 1.0 + drift + shock;
        price = price.max(1.0);
        closes.push(price);
    }
    closes
}

/// Build a full demo history for the default universe.
pub fn demo_history(seed: u64, days: usize) -> MarketHistory {
    let mut rng = StdRng::seed_from_u64(seed);
    let dates = trading_days(days);
    let mut history = MarketHistory::new();

    // SPY drives the market; QQQ and RSP track it with their own noise.
    let spy = regime_walk(&mut rng, days, 400.0, 0.010);
    let spy_rets: Vec<f64> = spy
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();

    let follow = |rng: &mut StdRng, start: f64, beta: f64, noise: f64| -> Vec<f64> {
        let mut closes = vec![start];
        for r in &spy_rets {
            let prev = *closes.last().unwrap();
            let next = prev * (1.0 + beta * r + rng.gen_range(-noise..noise));
            closes.push(next.max(1.0));
        }
        closes
    };

    let qqq = follow(&mut rng, 300.0, 1.2, 0.004);
    let rsp = follow(&mut rng, 140.0, 0.9, 0.003);
    let sh = follow(&mut rng, 20.0, -1.0, 0.001);
    let psq = follow(&mut rng, 12.0, -1.2, 0.002);

    let tlt = regime_walk(&mut rng, days, 100.0, 0.006);
    let uup = regime_walk(&mut rng, days, 28.0, 0.003);
    let udn = regime_walk(&mut rng, days, 18.0, 0.003);
    let bil: Vec<f64> = (0..days).map(|i| 91.0 + i as f64 * 0.002).collect();

    // VIX: mean-reverting around 18, spiking on equity selloffs.
    let mut vix = Vec::with_capacity(days);
    let mut level = 18.0f64;
    for i in 0..days {
        let equity_shock = if i == 0 { 0.0 } else { -spy_rets[i - 1] * 150.0 };
        level += 0.1 * (18.0 - level) + equity_shock + rng.gen_range(-1.0..1.0);
        level = level.clamp(9.0, 85.0);
        vix.push(level);
    }

    for (symbol, closes) in [
        ("SPY", spy),
        ("QQQ", qqq),
        ("RSP", rsp),
        ("SH", sh),
        ("PSQ", psq),
        ("TLT", tlt),
        ("UUP", uup),
        ("UDN", udn),
        ("BIL", bil),
        ("^VIX", vix),
    ] {
        let bars = bars_from_closes(symbol, &dates, &closes, &mut rng);
        history.insert_bars(symbol, bars);
    }

    history
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_market() {
        let a = demo_history(11, 300);
        let b = demo_history(11, 300);
        let d = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        assert_eq!(
            a.close_as_of("SPY", d).unwrap(),
            b.close_as_of("SPY", d).unwrap()
        );
        assert_eq!(
            a.close_as_of("^VIX", d).unwrap(),
            b.close_as_of("^VIX", d).unwrap()
        );
    }

    #[test]
    fn different_seeds_differ() {
        let a = demo_history(1, 300);
        let b = demo_history(2, 300);
        let d = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        assert_ne!(
            a.close_as_of("SPY", d).unwrap(),
            b.close_as_of("SPY", d).unwrap()
        );
    }

    #[test]
    fn covers_the_whole_universe() {
        let history = demo_history(5, 50);
        for symbol in ["SPY", "QQQ", "RSP", "SH", "PSQ", "TLT", "UUP", "UDN", "BIL", "^VIX"] {
            assert_eq!(history.len(symbol), 50, "missing bars for {symbol}");
        }
    }

    #[test]
    fn bars_are_sane() {
        let history = demo_history(5, 100);
        let d = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        for bar in history.bars_up_to("SPY", d) {
            assert!(bar.is_sane(), "insane bar on {}", bar.date);
        }
    }

    #[test]
    fn calendar_skips_weekends() {
        let dates = trading_days(20);
        for d in dates {
            assert!(!matches!(d.weekday(), Weekday::Sat | Weekday::Sun));
        }
    }
}
