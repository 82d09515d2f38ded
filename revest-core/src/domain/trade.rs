//! Trade — an immutable completed round trip.

use super::instrument::{Direction, Tier};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Why a position was (fully) closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// VIX above the emergency level and rising — overrides everything.
    VixEmergency,
    /// Close at or through the stop price.
    StopHit,
    /// Effective stage reversed against the position.
    StageChange,
    /// Open position force-closed at the end of a backtest window.
    BacktestEnd,
}

/// A completed round trip. Appended on full exit, never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub direction: Direction,
    pub tier: Tier,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    /// Whole-position return in percent (entry to final exit price).
    pub pnl_pct: f64,
    pub holding_days: i64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl_pct > 0.0
    }
}
