//! End-of-day signal surface.
//!
//! `MarketView::assemble` pulls one date's worth of snapshots, stage
//! labels, VIX and breadth out of the history; `SignalEngine` turns a
//! view plus the position book into a single piece of advice with a
//! human-readable narrative. The engine holds configuration only — all
//! market and position state comes in as arguments, so the same engine
//! value serves live signals and backtest replay alike.

use crate::breadth::{resolve_breadth, BreadthSource, EquityProxyBreadth, FeedBreadth};
use crate::config::RevestConfig;
use crate::domain::{
    Breadth, Direction, ExitReason, MarketState, SignalStrength, Stage, StageLabel, Tier,
};
use crate::error::SignalError;
use crate::exits::{self, ExitAction, TradeParams};
use crate::history::MarketHistory;
use crate::indicators::{sma_series, vix_view, IndicatorSnapshot, VixView};
use crate::rotation::{self, Rotation, RotationContext};
use crate::stage::{classify_raw, StageTracker};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One date's assembled market inputs.
#[derive(Debug, Clone)]
pub struct MarketView {
    pub date: NaiveDate,
    pub stages: BTreeMap<String, StageLabel>,
    pub snapshots: BTreeMap<String, IndicatorSnapshot>,
    pub vix: Option<VixView>,
    pub breadth: Option<Breadth>,
    pub breadth_from_proxy: bool,
    /// Symbols whose latest bar predates the view date.
    pub stale_symbols: Vec<String>,
}

impl MarketView {
    /// Assemble the view for one date, advancing the stage tracker.
    ///
    /// The tracker must be fed dates in order; callers replaying history
    /// call this once per trading day.
    pub fn assemble(
        history: &MarketHistory,
        tracker: &mut StageTracker,
        breadth_feed: Option<&FeedBreadth>,
        cfg: &RevestConfig,
        date: NaiveDate,
    ) -> Self {
        let mut stages = BTreeMap::new();
        let mut snapshots = BTreeMap::new();
        let mut stale_symbols = Vec::new();

        for symbol in cfg.universe.analysis_symbols() {
            let bars = history.bars_up_to(symbol, date);
            if let Some(last) = bars.last() {
                if last.date < date {
                    stale_symbols.push(symbol.to_string());
                }
            }
            let Some(snapshot) = IndicatorSnapshot::compute(bars, &cfg.indicators) else {
                continue;
            };
            let raw = classify_raw(&snapshot, &cfg.stage);
            stages.insert(symbol.to_string(), tracker.observe(symbol, raw));
            snapshots.insert(symbol.to_string(), snapshot);
        }

        let vix = vix_view(history.bars_up_to(&cfg.universe.vix, date), &cfg.vix);

        // Primary feed first, proxy as the per-date fallback.
        let proxy =
            EquityProxyBreadth::new(history, &cfg.universe.benchmark, &cfg.universe.breadth_proxy);
        let mut sources: Vec<&dyn BreadthSource> = Vec::with_capacity(2);
        if let Some(feed) = breadth_feed {
            sources.push(feed);
        }
        sources.push(&proxy);
        let (breadth, breadth_from_proxy) = resolve_breadth(&sources, &cfg.breadth, date);

        Self {
            date,
            stages,
            snapshots,
            vix,
            breadth,
            breadth_from_proxy,
            stale_symbols,
        }
    }

    /// Condensed market-regime record for reporting and persistence.
    pub fn market_state(&self) -> Option<MarketState> {
        let vix = self.vix.as_ref()?;
        Some(MarketState {
            date: self.date,
            vix_close: vix.close,
            vix_regime: vix.regime,
            vix_trend: vix.trend,
            vix_daily_change: vix.daily_change_pct,
            vix_spike: vix.spike,
            breadth: self.breadth.clone(),
            breadth_from_proxy: self.breadth_from_proxy,
        })
    }

    fn rotation_ctx(&self) -> RotationContext<'_> {
        RotationContext {
            stages: &self.stages,
            snapshots: &self.snapshots,
            vix: self.vix.as_ref(),
            breadth: self.breadth.as_ref(),
        }
    }
}

/// The one thing to do at tomorrow's open.
#[derive(Debug, Clone, PartialEq)]
pub enum Advice {
    Enter {
        symbol: String,
        underlying: String,
        direction: Direction,
        tier: Tier,
        strength: SignalStrength,
        params: TradeParams,
        reference_price: f64,
    },
    ExitAll {
        reason: ExitReason,
        detail: String,
    },
    ScaleOut {
        fraction: f64,
        detail: String,
    },
    RaiseStop {
        new_stop: f64,
    },
    Hold {
        symbol: String,
    },
    Cash {
        reason: String,
    },
}

/// Daily report: the advice plus the narrative that justifies it.
#[derive(Debug, Clone)]
pub struct SignalReport {
    pub date: NaiveDate,
    pub advice: Advice,
    pub narrative: Vec<String>,
    /// True when the view relied on any stale bar.
    pub stale: bool,
}

/// Stateless decision engine over assembled views.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    cfg: RevestConfig,
}

impl SignalEngine {
    pub fn new(cfg: RevestConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &RevestConfig {
        &self.cfg
    }

    /// Compute the signal for an as-of date from scratch.
    ///
    /// Replays the stage tracker over the benchmark calendar so the
    /// debounce state matches what a day-by-day run would have held.
    pub fn compute_signal(
        &self,
        history: &MarketHistory,
        book: &crate::exits::PositionBook,
        breadth_feed: Option<&FeedBreadth>,
        as_of: NaiveDate,
    ) -> Result<SignalReport, SignalError> {
        let dates =
            history.trading_dates(&self.cfg.universe.benchmark, NaiveDate::MIN, as_of);
        if dates.is_empty() {
            return Err(SignalError::PriceUnavailable {
                symbol: self.cfg.universe.benchmark.clone(),
                date: as_of,
            });
        }

        let mut tracker = StageTracker::new(&self.cfg.stage);
        let mut view = None;
        for date in dates {
            view = Some(MarketView::assemble(
                history,
                &mut tracker,
                breadth_feed,
                &self.cfg,
                date,
            ));
        }
        let view = view.expect("dates checked non-empty");

        self.advise(history, &view, book)
    }

    /// Decide today's advice from an already-assembled view.
    pub fn advise(
        &self,
        history: &MarketHistory,
        view: &MarketView,
        book: &crate::exits::PositionBook,
    ) -> Result<SignalReport, SignalError> {
        let mut narrative = Vec::new();

        if let Some(state) = view.market_state() {
            narrative.push(format!(
                "VIX {:.1} ({:?}{}){}",
                state.vix_close,
                state.vix_regime,
                match state.vix_trend {
                    Some(t) => format!(", {t:?}"),
                    None => String::new(),
                },
                if state.vix_spike { ", spike" } else { "" },
            ));
        } else {
            narrative.push("no VIX data".to_string());
        }
        if let Some(b) = &view.breadth {
            narrative.push(format!(
                "breadth{}: panic {:.2}, FOMO {:.2}",
                if view.breadth_from_proxy { " (proxy)" } else { "" },
                b.panic_ratio,
                b.fomo_ratio,
            ));
        }
        for (symbol, label) in &view.stages {
            narrative.push(format!(
                "{symbol}: {}",
                describe_stage(label, self.cfg.stage.confirmation_days)
            ));
        }

        let advice = if let Some(position) = book.open() {
            let close = history.close_as_of(&position.symbol, view.date)?;
            let stage = view.stages.get(&position.underlying);
            let action = exits::check_exits(
                position,
                close,
                view.date,
                stage,
                view.vix.as_ref(),
                &self.cfg.exits,
                &self.cfg.vix,
            );
            match action {
                ExitAction::FullExit { reason, detail } => {
                    narrative.push(format!("exit {}: {detail}", position.symbol));
                    Advice::ExitAll { reason, detail }
                }
                ExitAction::PartialExit { fraction, detail } => {
                    narrative.push(format!("scale out {}: {detail}", position.symbol));
                    Advice::ScaleOut { fraction, detail }
                }
                ExitAction::UpdateStop { new_stop } => {
                    narrative.push(format!(
                        "raise stop {}: {:.2} -> {:.2}",
                        position.symbol, position.stop, new_stop
                    ));
                    Advice::RaiseStop { new_stop }
                }
                ExitAction::Hold => {
                    narrative.push(format!(
                        "hold {} ({:+.2}% unrealized)",
                        position.symbol,
                        position.unrealized_pnl_pct(close)
                    ));
                    Advice::Hold {
                        symbol: position.symbol.clone(),
                    }
                }
            }
        } else {
            match rotation::select(view.rotation_ctx(), &self.cfg) {
                Rotation::Enter {
                    symbol,
                    underlying,
                    direction,
                    tier,
                    strength,
                    score,
                    reason,
                } => {
                    narrative.push(reason);
                    for flag in &score.flags {
                        narrative.push(format!("flag: {flag}"));
                    }
                    if let Some(line) = self.crossover_line(history, &underlying, view.date) {
                        narrative.push(line);
                    }
                    let reference_price = history.close_as_of(&symbol, view.date)?;
                    let stage = view.stages.get(&underlying).and_then(|l| l.effective);
                    let atr = view
                        .snapshots
                        .get(&underlying)
                        .and_then(|s| s.atr)
                        .filter(|_| direction == Direction::Long && symbol == underlying);
                    let params = TradeParams::for_entry(
                        reference_price,
                        direction,
                        stage,
                        atr,
                        &self.cfg.exits,
                        &self.cfg.atr_stops,
                    );
                    narrative.push(format!(
                        "enter {symbol} at next open (ref {reference_price:.2}, stop {:.2}, target {:.2})",
                        params.initial_stop, params.first_target
                    ));
                    Advice::Enter {
                        symbol,
                        underlying,
                        direction,
                        tier,
                        strength,
                        params,
                        reference_price,
                    }
                }
                Rotation::StayInCash { reason } => {
                    narrative.push(reason.clone());
                    Advice::Cash { reason }
                }
            }
        };

        let stale = !view.stale_symbols.is_empty();
        if stale {
            narrative.push(format!("stale data: {}", view.stale_symbols.join(", ")));
        }

        Ok(SignalReport {
            date: view.date,
            advice,
            narrative,
            stale,
        })
    }

    /// Narrative-only 5/20 SMA crossover note for a fresh entry.
    fn crossover_line(
        &self,
        history: &MarketHistory,
        symbol: &str,
        date: NaiveDate,
    ) -> Option<String> {
        let bars = history.bars_up_to(symbol, date);
        if bars.len() < 2 {
            return None;
        }
        let sma5 = sma_series(bars, 5);
        let sma20 = sma_series(bars, 20);
        let n = bars.len();
        let (t5, t20, y5, y20) = (sma5[n - 1], sma20[n - 1], sma5[n - 2], sma20[n - 2]);
        if [t5, t20, y5, y20].iter().any(|v| v.is_nan()) {
            return None;
        }
        if t5 > t20 && y5 <= y20 {
            Some(format!("{symbol}: 5-SMA crossed above 20-SMA"))
        } else if t5 < t20 && y5 >= y20 {
            Some(format!("{symbol}: 5-SMA crossed below 20-SMA"))
        } else {
            None
        }
    }
}

fn describe_stage(label: &StageLabel, confirmation_days: usize) -> String {
    let name = match label.effective {
        Some(Stage::Basing) => "Stage 1 (basing)",
        Some(Stage::Advancing) => "Stage 2 (advancing)",
        Some(Stage::Topping) => "Stage 3 (topping)",
        Some(Stage::Declining) => "Stage 4 (declining)",
        None => "no confirmed stage",
    };
    if label.confirmed {
        format!("{name}, confirmed")
    } else {
        format!(
            "{name} ({}/{} days toward change)",
            label.consecutive_days, confirmation_days
        )
    }
}
