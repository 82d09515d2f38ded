//! In-memory market history — ordered per-symbol bar series with as-of
//! lookups.
//!
//! This is the engine's view of whatever the persistence/feed collaborators
//! supplied. Lookups are always "on or before the as-of date": a missing
//! bar on the exact date falls back to the last available one, which the
//! caller surfaces as stale rather than failing.

use crate::domain::Bar;
use crate::error::SignalError;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// A bar resolved for an as-of date, with staleness marked.
#[derive(Debug, Clone)]
pub struct AsOfBar<'a> {
    pub bar: &'a Bar,
    /// True when the bar's date is earlier than the requested date.
    pub stale: bool,
}

/// Ordered daily bars for a set of symbols.
#[derive(Debug, Clone, Default)]
pub struct MarketHistory {
    series: BTreeMap<String, Vec<Bar>>,
}

impl MarketHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert bars for a symbol. Bars are sorted by date; a bar for an
    /// existing date replaces the old one (feeds re-deliver corrections).
    pub fn insert_bars(&mut self, symbol: &str, bars: Vec<Bar>) {
        let series = self.series.entry(symbol.to_string()).or_default();
        series.extend(bars);
        series.sort_by_key(|b| b.date);
        series.dedup_by(|a, b| {
            if a.date == b.date {
                // later insert wins
                *b = a.clone();
                true
            } else {
                false
            }
        });
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// All bars for a symbol up to and including the as-of date.
    pub fn bars_up_to(&self, symbol: &str, as_of: NaiveDate) -> &[Bar] {
        let Some(series) = self.series.get(symbol) else {
            return &[];
        };
        let end = series.partition_point(|b| b.date <= as_of);
        &series[..end]
    }

    /// The most recent bar on or before the as-of date, marked stale when
    /// it is older than the requested date.
    pub fn bar_as_of(&self, symbol: &str, as_of: NaiveDate) -> Option<AsOfBar<'_>> {
        let bars = self.bars_up_to(symbol, as_of);
        bars.last().map(|bar| AsOfBar {
            bar,
            stale: bar.date < as_of,
        })
    }

    /// Closing price as of a date, or a refusal when the symbol has no
    /// usable price at all.
    pub fn close_as_of(&self, symbol: &str, as_of: NaiveDate) -> Result<f64, SignalError> {
        self.bar_as_of(symbol, as_of)
            .map(|a| a.bar.close)
            .ok_or_else(|| SignalError::PriceUnavailable {
                symbol: symbol.to_string(),
                date: as_of,
            })
    }

    /// Opening price on an exact date, if a bar exists for it.
    pub fn open_on(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        let bars = self.bars_up_to(symbol, date);
        bars.last().filter(|b| b.date == date).map(|b| b.open)
    }

    /// Trading dates for a symbol within an inclusive range. Gaps in the
    /// series are preserved — dates are never interpolated.
    pub fn trading_dates(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        self.series
            .get(symbol)
            .map(|series| {
                series
                    .iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .map(|b| b.date)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.series.get(symbol).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
