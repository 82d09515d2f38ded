//! Indicator primitives.
//!
//! Every series function takes a chronologically ordered bar slice and
//! returns a `Vec<f64>` the same length, NaN-prefixed until the lookback
//! is satisfied. NaN inputs propagate — a NaN anywhere in a window makes
//! that window's output NaN. The `snapshot` module converts the NaN
//! convention into `Option<f64>` at the as-of boundary.

pub mod atr;
pub mod bands;
pub mod slope;
pub mod sma;
pub mod snapshot;
pub mod vix;

pub use atr::{atr_series, true_range, wilder_smooth};
pub use bands::{bandwidth_series, percent_b_series};
pub use slope::{sma_slope_pct, SlopeDirection};
pub use sma::{last_valid, sma_series};
pub use snapshot::IndicatorSnapshot;
pub use vix::{classify_regime, vix_view, VixView};

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar {
                symbol: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
