//! Revest Core — rule-based end-of-day asset-rotation engine.
//!
//! This crate contains the whole decision pipeline:
//! - Domain types (bars, stages, pillar scores, positions, trades)
//! - Indicator primitives (SMA family, Bollinger %B, Wilder ATR, VIX views)
//! - Weinstein stage classifier with confirmation debounce
//! - Four-pillar entry scorer and tier-ordered asset rotation
//! - Exit priority ladder with ratcheting stops and the position book
//! - Deterministic day-by-day backtest replay with performance metrics
//!
//! Everything is pure and explicitly stateful: market data comes in as a
//! `MarketHistory`, position state lives in a `PositionBook`, and the same
//! decision path serves both the live end-of-day signal and the replay.

pub mod backtest;
pub mod breadth;
pub mod config;
pub mod domain;
pub mod error;
pub mod exits;
pub mod history;
pub mod indicators;
pub mod pillars;
pub mod rotation;
pub mod signal;
pub mod stage;
pub mod synthetic;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the types shared across threads by callers
    /// (report pipelines, parallel sweeps) are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::StageLabel>();
        require_sync::<domain::StageLabel>();
        require_send::<domain::PillarScore>();
        require_sync::<domain::PillarScore>();
        require_send::<config::RevestConfig>();
        require_sync::<config::RevestConfig>();
        require_send::<history::MarketHistory>();
        require_sync::<history::MarketHistory>();
        require_send::<signal::SignalEngine>();
        require_sync::<signal::SignalEngine>();
        require_send::<exits::PositionBook>();
        require_sync::<exits::PositionBook>();
        require_send::<backtest::BacktestResult>();
        require_sync::<backtest::BacktestResult>();
    }
}
