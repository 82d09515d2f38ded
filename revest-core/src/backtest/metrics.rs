//! Performance metrics — pure functions over the equity curve and trade
//! list.
//!
//! Every metric is a pure function: curve and/or trades in, scalar out.
//! Nothing here touches the replay loop or the history store.

use crate::domain::Trade;
use serde::{Deserialize, Serialize};

/// Aggregate statistics for one replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe: f64,
    pub win_rate_pct: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
    pub trade_count: usize,
    pub trades_per_year: f64,
    pub avg_holding_days: f64,
    pub median_holding_days: f64,
    /// Share of replay days spent with no position open, in percent.
    pub cash_days_pct: f64,
}

impl BacktestSummary {
    pub fn compute(equity_curve: &[f64], trades: &[Trade], cash_days: usize) -> Self {
        let days = equity_curve.len();
        Self {
            total_return_pct: total_return_pct(equity_curve),
            max_drawdown_pct: max_drawdown_pct(equity_curve),
            sharpe: sharpe_ratio(equity_curve),
            win_rate_pct: win_rate(trades) * 100.0,
            avg_win_pct: avg_win_pct(trades),
            avg_loss_pct: avg_loss_pct(trades),
            best_trade_pct: trades.iter().map(|t| t.pnl_pct).fold(0.0, f64::max),
            worst_trade_pct: trades.iter().map(|t| t.pnl_pct).fold(0.0, f64::min),
            trade_count: trades.len(),
            trades_per_year: trades_per_year(trades.len(), days),
            avg_holding_days: avg_holding_days(trades),
            median_holding_days: median_holding_days(trades),
            cash_days_pct: if days == 0 {
                0.0
            } else {
                cash_days as f64 / days as f64 * 100.0
            },
        }
    }
}

/// Total return in percent: (final - initial) / initial * 100.
pub fn total_return_pct(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    if initial <= 0.0 {
        return 0.0;
    }
    (equity_curve[equity_curve.len() - 1] - initial) / initial * 100.0
}

/// Deepest peak-to-trough drawdown, in percent (non-negative).
pub fn max_drawdown_pct(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (peak - eq) / peak * 100.0;
            if dd > worst {
                worst = dd;
            }
        }
    }
    worst
}

/// Annualized Sharpe ratio from daily equity returns (rf = 0).
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let var = returns.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>()
        / returns.len() as f64;
    let std = var.sqrt();
    if std < 1e-15 {
        return 0.0;
    }
    mean / std * 252.0f64.sqrt()
}

/// Fraction of trades with positive P&L.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

pub fn avg_win_pct(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.pnl_pct)
        .collect();
    if wins.is_empty() {
        return 0.0;
    }
    wins.iter().sum::<f64>() / wins.len() as f64
}

pub fn avg_loss_pct(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| !t.is_winner())
        .map(|t| t.pnl_pct)
        .collect();
    if losses.is_empty() {
        return 0.0;
    }
    losses.iter().sum::<f64>() / losses.len() as f64
}

/// Trade frequency normalized to a 252-day year.
pub fn trades_per_year(trade_count: usize, trading_days: usize) -> f64 {
    if trading_days == 0 {
        return 0.0;
    }
    trade_count as f64 * 252.0 / trading_days as f64
}

pub fn avg_holding_days(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.holding_days as f64).sum::<f64>() / trades.len() as f64
}

/// Median holding period; the mean of the middle pair for even counts.
pub fn median_holding_days(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let mut days: Vec<i64> = trades.iter().map(|t| t.holding_days).collect();
    days.sort_unstable();
    let n = days.len();
    if n % 2 == 1 {
        days[n / 2] as f64
    } else {
        (days[n / 2 - 1] + days[n / 2]) as f64 / 2.0
    }
}
