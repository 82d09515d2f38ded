//! Bollinger-derived series — %B and bandwidth.
//!
//! Middle band is SMA(close, period); upper/lower are ±mult population
//! standard deviations. The bands themselves are internal; the outputs
//! are %B (position of close inside the band, 0..1 within the band) and
//! bandwidth ((upper-lower)/middle, a squeeze/expansion measure).
//! Lookback: period - 1.

use crate::domain::Bar;

/// %B series: (close - lower) / (upper - lower).
///
/// Zero-width bands (constant price) yield 0.5 — close sits on the
/// collapsed band rather than producing a division artifact.
pub fn percent_b_series(bars: &[Bar], period: usize, mult: f64) -> Vec<f64> {
    band_series(bars, period, mult, |close, lower, upper, _mid| {
        let width = upper - lower;
        if width == 0.0 {
            0.5
        } else {
            (close - lower) / width
        }
    })
}

/// Bandwidth series: (upper - lower) / middle.
pub fn bandwidth_series(bars: &[Bar], period: usize, mult: f64) -> Vec<f64> {
    band_series(bars, period, mult, |_close, lower, upper, mid| {
        if mid == 0.0 {
            f64::NAN
        } else {
            (upper - lower) / mid
        }
    })
}

fn band_series<F>(bars: &[Bar], period: usize, mult: f64, f: F) -> Vec<f64>
where
    F: Fn(f64, f64, f64, f64) -> f64,
{
    assert!(period >= 1, "band period must be >= 1");
    let n = bars.len();
    let mut result = vec![f64::NAN; n];

    if n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &bars[(i + 1 - period)..=i];

        let mut has_nan = false;
        let mut sum = 0.0;
        for bar in window {
            if bar.close.is_nan() {
                has_nan = true;
                break;
            }
            sum += bar.close;
        }
        if has_nan {
            continue;
        }

        let mean = sum / period as f64;
        let variance: f64 = window
            .iter()
            .map(|bar| {
                let diff = bar.close - mean;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let stddev = variance.sqrt();

        let upper = mean + mult * stddev;
        let lower = mean - mult * stddev;
        result[i] = f(bars[i].close, lower, upper, mean);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn percent_b_midpoint_when_close_equals_mean() {
        // Symmetric window: close 12 is the mean of (10,11,12,13,14)... use
        // a window where the last close is the mean.
        let bars = make_bars(&[10.0, 14.0, 12.0]);
        let pb = percent_b_series(&bars, 3, 2.0);
        assert!(pb[0].is_nan());
        assert!(pb[1].is_nan());
        assert_approx(pb[2], 0.5, DEFAULT_EPSILON);
    }

    #[test]
    fn percent_b_above_one_outside_upper_band() {
        // Flat then jump: the jump bar sits far above the window mean.
        let bars = make_bars(&[100.0, 100.0, 100.0, 100.0, 130.0]);
        let pb = percent_b_series(&bars, 5, 2.0);
        assert!(pb[4] > 1.0, "expected %B > 1 on breakout, got {}", pb[4]);
    }

    #[test]
    fn percent_b_constant_price_is_half() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 100.0]);
        let pb = percent_b_series(&bars, 3, 2.0);
        assert_approx(pb[3], 0.5, DEFAULT_EPSILON);
    }

    #[test]
    fn bandwidth_constant_price_is_zero() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 100.0]);
        let bw = bandwidth_series(&bars, 3, 2.0);
        assert_approx(bw[3], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bandwidth_widens_with_volatility() {
        let calm = make_bars(&[100.0, 100.5, 100.0, 100.5, 100.0]);
        let wild = make_bars(&[100.0, 110.0, 95.0, 112.0, 92.0]);
        let bw_calm = bandwidth_series(&calm, 5, 2.0);
        let bw_wild = bandwidth_series(&wild, 5, 2.0);
        assert!(bw_wild[4] > bw_calm[4]);
    }

    #[test]
    fn nan_propagation() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        bars[2].close = f64::NAN;
        let pb = percent_b_series(&bars, 3, 2.0);
        assert!(pb[2].is_nan());
        assert!(pb[3].is_nan());
    }
}
