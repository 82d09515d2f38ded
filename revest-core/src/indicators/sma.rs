//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! First valid value at index period-1.

use crate::domain::Bar;

/// SMA of closes, NaN until the window fills.
pub fn sma_series(bars: &[Bar], period: usize) -> Vec<f64> {
    assert!(period >= 1, "SMA period must be >= 1");
    let n = bars.len();
    let mut result = vec![f64::NAN; n];

    if n < period {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_in_window = false;
    for bar in bars.iter().take(period) {
        if bar.close.is_nan() {
            nan_in_window = true;
        }
        sum += bar.close;
    }

    if !nan_in_window {
        result[period - 1] = sum / period as f64;
    }

    for i in period..n {
        let leaving = bars[i - period].close;
        let entering = bars[i].close;
        sum = sum - leaving + entering;

        // Rolling add/remove loses track of NaN membership, so rescan the
        // window whenever NaN could be involved.
        if entering.is_nan() || leaving.is_nan() || nan_in_window {
            nan_in_window = false;
            sum = 0.0;
            for bar in &bars[(i + 1 - period)..=i] {
                if bar.close.is_nan() {
                    nan_in_window = true;
                }
                sum += bar.close;
            }
            if nan_in_window {
                result[i] = f64::NAN;
                continue;
            }
        }

        result[i] = sum / period as f64;
    }

    result
}

/// The last non-NaN value of a series, if any.
pub fn last_valid(series: &[f64]) -> Option<f64> {
    series.iter().rev().copied().find(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let result = sma_series(&bars, 5);

        assert_eq!(result.len(), 7);
        for i in 0..4 {
            assert!(result[i].is_nan(), "expected NaN at index {i}");
        }
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
        assert_approx(result[5], 13.0, DEFAULT_EPSILON);
        assert_approx(result[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_close() {
        let bars = make_bars(&[100.0, 200.0, 300.0]);
        let result = sma_series(&bars, 1);
        assert_approx(result[0], 100.0, DEFAULT_EPSILON);
        assert_approx(result[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_nan_propagation() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        bars[2].close = f64::NAN;
        let result = sma_series(&bars, 3);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
        assert_approx(result[5], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_too_few_bars() {
        let bars = make_bars(&[10.0, 11.0]);
        let result = sma_series(&bars, 5);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn last_valid_skips_trailing_nan() {
        assert_eq!(last_valid(&[1.0, 2.0, f64::NAN]), Some(2.0));
        assert_eq!(last_valid(&[f64::NAN, f64::NAN]), None);
        assert_eq!(last_valid(&[]), None);
    }
}
