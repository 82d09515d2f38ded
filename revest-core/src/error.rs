//! Structured error types for the signal engine.
//!
//! Recoverable feed problems degrade gracefully inside the engine and
//! never surface here: insufficient history propagates as undefined
//! indicator values, stale data as a flagged narrative, missing breadth
//! as a proxy fallback. These variants cover only the conditions that
//! must refuse or abort a single call.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    /// No usable price for a symbol on or before the as-of date.
    /// Recommendation generation is refused rather than run on partial data.
    #[error("no price data for {symbol} on or before {date}")]
    PriceUnavailable { symbol: String, date: NaiveDate },

    /// More than one open position, an exit with no position, or similar.
    /// Fatal to the triggering call; state is left untouched.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("data error: {0}")]
    Data(String),
}
