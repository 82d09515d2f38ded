//! SMA slope — percent change of a moving average over a lookback.
//!
//! slope[t] = (sma[t] - sma[t-lookback]) / sma[t-lookback] * 100.
//! NaN until both endpoints of the comparison are valid.

/// Trend bucket for a slope reading against a flat threshold (percent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeDirection {
    Rising,
    Flat,
    Falling,
}

impl SlopeDirection {
    /// Bucket a slope (percent) with a symmetric flat zone of ±threshold.
    pub fn classify(slope_pct: f64, threshold_pct: f64) -> Self {
        if slope_pct > threshold_pct {
            SlopeDirection::Rising
        } else if slope_pct < -threshold_pct {
            SlopeDirection::Falling
        } else {
            SlopeDirection::Flat
        }
    }
}

/// Percent change of an SMA series over `lookback` steps.
pub fn sma_slope_pct(sma: &[f64], lookback: usize) -> Vec<f64> {
    assert!(lookback >= 1, "slope lookback must be >= 1");
    let n = sma.len();
    let mut result = vec![f64::NAN; n];

    for i in lookback..n {
        let now = sma[i];
        let then = sma[i - lookback];
        if now.is_nan() || then.is_nan() || then == 0.0 {
            continue;
        }
        result[i] = (now - then) / then * 100.0;
    }

    result
}
