//! Position lifecycle — trade parameters, stop ratchet, exit priority
//! ladder, and the position book.
//!
//! Every vehicle is held long (inverse exposure comes from inverse ETFs),
//! so stops only ever move up. The exit ladder runs in fixed priority:
//! VIX emergency, hard stop, stage change, first target, trailing update.
//! The first condition that fires wins; nothing below it is considered
//! that day. Hitting the first target banks the partial, moves the stop to
//! breakeven, and arms the trailing stop off the high-water close.

use crate::config::{AtrStopConfig, ExitConfig, VixConfig};
use crate::domain::{Direction, ExitReason, Position, Stage, StageLabel, Tier, Trade};
use crate::error::SignalError;
use crate::indicators::VixView;
use chrono::NaiveDate;

/// Risk parameters stamped onto a position at entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeParams {
    pub initial_stop: f64,
    pub first_target: f64,
    pub trailing_pct: f64,
    pub partial_exit_pct: f64,
}

impl TradeParams {
    /// Derive stop/target/trail for a new entry.
    ///
    /// The initial stop is ATR-based when enabled and an ATR is available
    /// (distance = multiplier x ATR, clamped to the configured percent
    /// band), otherwise the fixed percent for the direction. Topping-stage
    /// entries get the tighter target and the larger partial.
    pub fn for_entry(
        entry_price: f64,
        direction: Direction,
        stage: Option<Stage>,
        atr: Option<f64>,
        exits: &ExitConfig,
        atr_cfg: &AtrStopConfig,
    ) -> Self {
        let atr_stop = |fixed_pct: f64, inverse: bool| -> f64 {
            if atr_cfg.enabled {
                if let Some(atr) = atr.filter(|a| *a > 0.0) {
                    let raw = atr_cfg.multiplier * atr;
                    let max_distance = entry_price
                        * if inverse {
                            exits.max_stop_pct_inverse * 1.5
                        } else {
                            atr_cfg.max_stop_pct
                        };
                    let min_distance = entry_price * atr_cfg.min_stop_pct;
                    return entry_price - raw.clamp(min_distance, max_distance);
                }
            }
            entry_price * (1.0 - fixed_pct)
        };

        match (direction, stage) {
            (Direction::Inverse, _) => Self {
                initial_stop: atr_stop(exits.max_stop_pct_inverse, true),
                first_target: entry_price * (1.0 + exits.first_target_pct_inverse),
                trailing_pct: exits.trailing_stop_pct_inverse,
                partial_exit_pct: exits.partial_exit_pct_inverse,
            },
            (Direction::Long, Some(Stage::Topping)) => Self {
                initial_stop: atr_stop(exits.max_stop_pct, false),
                first_target: entry_price * (1.0 + exits.first_target_pct_topping),
                trailing_pct: exits.trailing_stop_pct,
                partial_exit_pct: exits.partial_exit_pct_topping,
            },
            (Direction::Long, _) => Self {
                initial_stop: atr_stop(exits.max_stop_pct, false),
                first_target: entry_price * (1.0 + exits.first_target_pct),
                trailing_pct: exits.trailing_stop_pct,
                partial_exit_pct: exits.partial_exit_pct,
            },
        }
    }
}

/// Monotone stop: proposed levels may tighten (rise), never loosen.
///
/// Keeps a volatility expansion from widening the stop after a favorable
/// move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopRatchet {
    level: f64,
}

impl StopRatchet {
    pub fn new(initial: f64) -> Self {
        Self { level: initial }
    }

    /// Apply a proposed stop; returns the level actually in force.
    pub fn apply(&mut self, proposed: f64) -> f64 {
        if proposed > self.level {
            self.level = proposed;
        }
        self.level
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}

/// What to do with an open position today.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitAction {
    FullExit { reason: ExitReason, detail: String },
    PartialExit { fraction: f64, detail: String },
    UpdateStop { new_stop: f64 },
    Hold,
}

/// Approximate business days between two dates (5/7 of calendar days,
/// at least 1).
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    ((end - start).num_days() * 5 / 7).max(1)
}

/// Evaluate the exit ladder for an open position at today's close.
///
/// `stage` is the debounced label of the position's underlying; `vix` is
/// today's VIX view (absent VIX skips the emergency rung only).
pub fn check_exits(
    position: &Position,
    close: f64,
    date: NaiveDate,
    stage: Option<&StageLabel>,
    vix: Option<&VixView>,
    exits: &ExitConfig,
    vix_cfg: &VixConfig,
) -> ExitAction {
    // Priority 1: VIX emergency.
    if let Some(vix) = vix {
        if vix.close > vix_cfg.emergency_level
            && vix.trend == Some(crate::domain::VixTrend::Rising)
        {
            return ExitAction::FullExit {
                reason: ExitReason::VixEmergency,
                detail: format!(
                    "VIX {:.1} > {:.0} and rising",
                    vix.close, vix_cfg.emergency_level
                ),
            };
        }
    }

    // Priority 2: hard stop.
    if close <= position.stop {
        return ExitAction::FullExit {
            reason: ExitReason::StopHit,
            detail: format!("close {:.2} <= stop {:.2}", close, position.stop),
        };
    }

    // Priority 3: stage no longer supports the direction.
    if let Some(effective) = stage.and_then(|l| l.effective) {
        let hostile = match position.direction {
            Direction::Long => matches!(effective, Stage::Topping | Stage::Declining),
            Direction::Inverse => matches!(effective, Stage::Basing | Stage::Advancing),
        };
        if hostile {
            return ExitAction::FullExit {
                reason: ExitReason::StageChange,
                detail: format!("{} stage changed to {:?}", position.underlying, effective),
            };
        }
    }

    // Priority 4: first target, once only. A fast hit scales out more.
    if !position.partial_exited && close >= position.target {
        let mut fraction = position.partial_exit_pct;
        if business_days_between(position.entry_date, date) <= exits.speed_check_days {
            fraction = (fraction + exits.speed_check_extra_pct).min(exits.speed_check_max_pct);
        }
        return ExitAction::PartialExit {
            fraction,
            detail: format!(
                "close {:.2} >= target {:.2}, exiting {:.0}%",
                close,
                position.target,
                fraction * 100.0
            ),
        };
    }

    // Priority 5: trailing stop, armed only after the partial. Trails the
    // high-water close, so a pullback never lowers the proposed level.
    if position.partial_exited {
        let new_trail = position.high_water.max(close) * (1.0 - position.trailing_pct);
        if new_trail > position.stop {
            return ExitAction::UpdateStop { new_stop: new_trail };
        }
    }

    ExitAction::Hold
}

/// The single-position book.
///
/// At most one position is open at a time; the book rejects a second
/// entry or an exit without a position instead of silently mangling
/// state. Completed round trips accumulate as trades.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    open: Option<Position>,
    trades: Vec<Trade>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) -> Option<&Position> {
        self.open.as_ref()
    }

    pub fn open_mut(&mut self) -> Option<&mut Position> {
        self.open.as_mut()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }

    /// Record a new entry. Fails if a position is already open.
    #[allow(clippy::too_many_arguments)]
    pub fn log_entry(
        &mut self,
        symbol: &str,
        underlying: &str,
        direction: Direction,
        tier: Tier,
        date: NaiveDate,
        price: f64,
        shares: f64,
        size_fraction: f64,
        params: &TradeParams,
    ) -> Result<&Position, SignalError> {
        if let Some(open) = &self.open {
            return Err(SignalError::InvariantViolation(format!(
                "entry for {symbol} while {} is open",
                open.symbol
            )));
        }
        self.open = Some(Position {
            symbol: symbol.to_string(),
            underlying: underlying.to_string(),
            direction,
            tier,
            entry_date: date,
            entry_price: price,
            shares,
            size_fraction,
            stop: params.initial_stop,
            target: params.first_target,
            trailing_pct: params.trailing_pct,
            partial_exit_pct: params.partial_exit_pct,
            partial_exited: false,
            high_water: price,
        });
        Ok(self.open.as_ref().unwrap())
    }

    /// Reduce the open position after a partial exit fill.
    ///
    /// The remainder rides from breakeven: the stop moves up to the entry
    /// price (never down, if an ATR stop already sat above it).
    pub fn log_partial_exit(&mut self, fraction: f64) -> Result<(), SignalError> {
        let position = self.open.as_mut().ok_or_else(|| {
            SignalError::InvariantViolation("partial exit with no open position".into())
        })?;
        if !(0.0..1.0).contains(&fraction) {
            return Err(SignalError::InvariantViolation(format!(
                "partial exit fraction {fraction} out of range"
            )));
        }
        position.shares *= 1.0 - fraction;
        position.size_fraction *= 1.0 - fraction;
        position.partial_exited = true;
        position.stop = position.stop.max(position.entry_price);
        Ok(())
    }

    /// Close the open position and record the round trip.
    pub fn log_exit(
        &mut self,
        date: NaiveDate,
        price: f64,
        reason: ExitReason,
    ) -> Result<Trade, SignalError> {
        let position = self.open.take().ok_or_else(|| {
            SignalError::InvariantViolation("exit with no open position".into())
        })?;
        let trade = Trade {
            symbol: position.symbol.clone(),
            direction: position.direction,
            tier: position.tier,
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_date: date,
            exit_price: price,
            exit_reason: reason,
            pnl_pct: (price - position.entry_price) / position.entry_price * 100.0,
            holding_days: (date - position.entry_date).num_days(),
        };
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Apply a ratcheted stop update to the open position.
    pub fn update_stop(&mut self, new_stop: f64) -> Result<f64, SignalError> {
        let position = self.open.as_mut().ok_or_else(|| {
            SignalError::InvariantViolation("stop update with no open position".into())
        })?;
        let mut ratchet = StopRatchet::new(position.stop);
        position.stop = ratchet.apply(new_stop);
        Ok(position.stop)
    }
}
