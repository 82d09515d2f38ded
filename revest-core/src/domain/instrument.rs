//! The fixed 4-tier instrument universe.
//!
//! Rotation walks tiers in priority order: equities > bonds > currency > cash.
//! The inverse equity and inverse-dollar symbols are traded vehicles for
//! Declining-stage signals on their underlyings; VIX and the breadth-proxy
//! symbols are never traded.

use serde::{Deserialize, Serialize};

/// Priority rank in the instrument-selection hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Equities = 1,
    Bonds = 2,
    Currency = 3,
    Cash = 4,
}

/// Trade direction for a candidate or an open position.
///
/// `Inverse` means "long an inverse vehicle" (e.g. SH against a Declining
/// SPY) — the engine never shorts anything directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Inverse,
}

/// The configured instrument universe.
///
/// Symbols default to the reference universe (SPY/QQQ equities with SH/PSQ
/// inverses, TLT bonds, UUP/UDN dollar, BIL cash) but are plain config so a
/// different ETF set can be substituted without code changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    /// Tier 1 candidates, in preference order for relative-strength ties.
    pub equities: Vec<String>,
    /// Inverse vehicle per equity symbol, aligned by index with `equities`.
    pub equity_inverses: Vec<String>,
    /// Tier 2 bond symbol.
    pub bonds: String,
    /// Tier 3 dollar-long symbol.
    pub dollar_long: String,
    /// Tier 3 dollar-short symbol (held when the dollar is Declining).
    pub dollar_short: String,
    /// Tier 4 cash-equivalent symbol.
    pub cash: String,
    /// Volatility index symbol (classification only, never traded).
    pub vix: String,
    /// Benchmark for relative strength and the backtest calendar.
    pub benchmark: String,
    /// Equal-weight proxy used for the breadth fallback.
    pub breadth_proxy: String,
}

impl Default for Universe {
    fn default() -> Self {
        Self {
            equities: vec!["SPY".into(), "QQQ".into()],
            equity_inverses: vec!["SH".into(), "PSQ".into()],
            bonds: "TLT".into(),
            dollar_long: "UUP".into(),
            dollar_short: "UDN".into(),
            cash: "BIL".into(),
            vix: "^VIX".into(),
            benchmark: "SPY".into(),
            breadth_proxy: "RSP".into(),
        }
    }
}

impl Universe {
    /// Symbols that need stage analysis and full indicator computation.
    pub fn analysis_symbols(&self) -> Vec<&str> {
        let mut syms: Vec<&str> = self.equities.iter().map(String::as_str).collect();
        syms.push(&self.bonds);
        syms.push(&self.dollar_long);
        syms.push(&self.dollar_short);
        syms
    }

    /// Every symbol the engine expects daily price data for.
    pub fn all_symbols(&self) -> Vec<&str> {
        let mut syms = self.analysis_symbols();
        for inv in &self.equity_inverses {
            syms.push(inv);
        }
        syms.push(&self.cash);
        syms.push(&self.vix);
        syms.push(&self.breadth_proxy);
        syms
    }

    /// The inverse vehicle for an equity symbol, if one is configured.
    pub fn inverse_of(&self, equity: &str) -> Option<&str> {
        self.equities
            .iter()
            .position(|s| s == equity)
            .and_then(|i| self.equity_inverses.get(i))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering() {
        assert!(Tier::Equities < Tier::Bonds);
        assert!(Tier::Bonds < Tier::Currency);
        assert!(Tier::Currency < Tier::Cash);
    }

    #[test]
    fn default_universe_symbols() {
        let u = Universe::default();
        assert_eq!(u.analysis_symbols(), vec!["SPY", "QQQ", "TLT", "UUP", "UDN"]);
        assert!(u.all_symbols().contains(&"BIL"));
        assert!(u.all_symbols().contains(&"^VIX"));
    }

    #[test]
    fn inverse_lookup() {
        let u = Universe::default();
        assert_eq!(u.inverse_of("SPY"), Some("SH"));
        assert_eq!(u.inverse_of("QQQ"), Some("PSQ"));
        assert_eq!(u.inverse_of("TLT"), None);
    }
}
