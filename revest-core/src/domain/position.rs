//! Position — the single live holding.

use super::instrument::{Direction, Tier};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The one open position. At most one exists at any time; the rotator and
/// the exit state machine jointly enforce that invariant.
///
/// Created on entry, mutated by partial exits and stop updates, destroyed
/// on full exit. Passed explicitly into and out of every state-machine call
/// — never a process-wide singleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Underlying whose stage governs exits (SPY for an SH position).
    pub underlying: String,
    pub direction: Direction,
    pub tier: Tier,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub shares: f64,
    /// Fraction of the original size still held (1.0 until a partial exit).
    pub size_fraction: f64,
    pub stop: f64,
    pub target: f64,
    /// Trail distance applied once the trailing stop is armed.
    pub trailing_pct: f64,
    /// Fraction to sell when the first target is hit.
    pub partial_exit_pct: f64,
    /// Set by the first partial exit; arms the trailing stop and blocks a
    /// second partial for this position.
    pub partial_exited: bool,
    /// Best close seen since entry, the trailing stop's reference.
    pub high_water: f64,
}

impl Position {
    pub fn unrealized_pnl_pct(&self, current_price: f64) -> f64 {
        (current_price - self.entry_price) / self.entry_price * 100.0
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.shares * current_price
    }

    /// Mark-to-market: advance the high-water mark if today's close beats it.
    pub fn update_high_water(&mut self, close: f64) {
        if close > self.high_water {
            self.high_water = close;
        }
    }
}
