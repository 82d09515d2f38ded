//! Tier-ordered asset rotation.
//!
//! The selector walks the tier hierarchy — equities, bonds, dollar, cash —
//! and stops at the first tier that produces a qualifying candidate. The
//! VIX emergency gate runs before any tier: an Extreme-and-rising VIX
//! means cash, full stop. Within a tier, candidates are ranked by pillar
//! count first, relative strength as the tie-break.

use crate::config::RevestConfig;
use crate::domain::{
    Direction, PillarScore, SignalStrength, Stage, StageLabel, Tier,
};
use crate::indicators::{IndicatorSnapshot, VixView};
use crate::pillars::{self, PillarInputs};
use crate::domain::Breadth;
use std::collections::BTreeMap;

/// The rotation decision for one date.
#[derive(Debug, Clone, PartialEq)]
pub enum Rotation {
    Enter {
        /// The vehicle to buy (an inverse ETF for Inverse direction).
        symbol: String,
        /// The analyzed underlying (equals `symbol` except for inverses).
        underlying: String,
        direction: Direction,
        tier: Tier,
        strength: SignalStrength,
        score: PillarScore,
        reason: String,
    },
    StayInCash {
        reason: String,
    },
}

/// Per-date market view the selector reads. Keys are analysis symbols.
#[derive(Debug, Clone, Copy)]
pub struct RotationContext<'a> {
    pub stages: &'a BTreeMap<String, StageLabel>,
    pub snapshots: &'a BTreeMap<String, IndicatorSnapshot>,
    pub vix: Option<&'a VixView>,
    pub breadth: Option<&'a Breadth>,
}

impl<'a> RotationContext<'a> {
    fn stage_of(&self, symbol: &str) -> Option<&StageLabel> {
        self.stages.get(symbol)
    }

    fn effective(&self, symbol: &str) -> Option<Stage> {
        self.stages.get(symbol).and_then(|l| l.effective)
    }
}

/// Pick today's target asset.
pub fn select(ctx: RotationContext<'_>, cfg: &RevestConfig) -> Rotation {
    // Emergency gate before any tier is considered.
    if let Some(vix) = ctx.vix {
        if vix.close > cfg.vix.emergency_level && vix.trend == Some(crate::domain::VixTrend::Rising)
        {
            return Rotation::StayInCash {
                reason: format!(
                    "VIX emergency ({:.1} > {:.0} and rising), cash only",
                    vix.close, cfg.vix.emergency_level
                ),
            };
        }
    }

    // Tier 1: equities long.
    let long_candidates: Vec<&str> = cfg
        .universe
        .equities
        .iter()
        .map(String::as_str)
        .filter(|s| ctx.effective(s) == Some(Stage::Advancing))
        .collect();
    if let Some(rotation) = best_entry(&long_candidates, Direction::Long, Tier::Equities, ctx, cfg)
    {
        return rotation;
    }

    // Tier 1: equities inverse. Each Declining equity with a configured
    // inverse vehicle is scored on the underlying.
    let inverse_candidates: Vec<&str> = cfg
        .universe
        .equities
        .iter()
        .map(String::as_str)
        .filter(|s| {
            ctx.effective(s) == Some(Stage::Declining) && cfg.universe.inverse_of(s).is_some()
        })
        .collect();
    if let Some(rotation) = best_entry(
        &inverse_candidates,
        Direction::Inverse,
        Tier::Equities,
        ctx,
        cfg,
    ) {
        return rotation;
    }

    // Tier 2: bonds.
    if ctx.effective(&cfg.universe.bonds) == Some(Stage::Advancing) {
        if let Some(rotation) = best_entry(
            &[cfg.universe.bonds.as_str()],
            Direction::Long,
            Tier::Bonds,
            ctx,
            cfg,
        ) {
            return rotation;
        }
    }

    // Tier 3: dollar, long side first; the short side only when the
    // dollar itself is Declining.
    let uup = cfg.universe.dollar_long.as_str();
    let udn = cfg.universe.dollar_short.as_str();
    if ctx.effective(uup) == Some(Stage::Advancing) {
        if let Some(rotation) = best_entry(&[uup], Direction::Long, Tier::Currency, ctx, cfg) {
            return rotation;
        }
    }
    if ctx.effective(uup) == Some(Stage::Declining) && ctx.effective(udn) == Some(Stage::Advancing)
    {
        if let Some(rotation) = best_entry(&[udn], Direction::Long, Tier::Currency, ctx, cfg) {
            return rotation;
        }
    }

    Rotation::StayInCash {
        reason: "no favorable entry, holding cash".to_string(),
    }
}

/// Score a tier's candidates and return the best qualifying entry.
///
/// Ranking: pillar count descending, then relative strength descending
/// (absent relative strength loses ties).
fn best_entry(
    candidates: &[&str],
    direction: Direction,
    tier: Tier,
    ctx: RotationContext<'_>,
    cfg: &RevestConfig,
) -> Option<Rotation> {
    let mut best: Option<PillarScore> = None;

    for &symbol in candidates {
        let (Some(stage), Some(snapshot)) = (ctx.stage_of(symbol), ctx.snapshots.get(symbol))
        else {
            continue;
        };
        let score = pillars::score(
            symbol,
            direction,
            PillarInputs {
                stage,
                snapshot,
                vix: ctx.vix,
                breadth: ctx.breadth,
            },
            &cfg.entry,
            &cfg.breadth,
        );
        if score.strength(cfg.entry.strong_threshold, cfg.entry.moderate_threshold)
            == SignalStrength::None
        {
            continue;
        }
        let better = match &best {
            None => true,
            Some(b) => {
                score.count() > b.count()
                    || (score.count() == b.count()
                        && score.relative_strength.unwrap_or(f64::NEG_INFINITY)
                            > b.relative_strength.unwrap_or(f64::NEG_INFINITY))
            }
        };
        if better {
            best = Some(score);
        }
    }

    let score = best?;
    let strength = score.strength(cfg.entry.strong_threshold, cfg.entry.moderate_threshold);
    let underlying = score.symbol.clone();
    let symbol = match direction {
        Direction::Long => underlying.clone(),
        Direction::Inverse => cfg.universe.inverse_of(&underlying)?.to_string(),
    };
    let reason = match direction {
        Direction::Long => format!("{underlying} Advancing, {}", score.summary()),
        Direction::Inverse => {
            format!("{underlying} Declining, inverse via {symbol}, {}", score.summary())
        }
    };

    Some(Rotation::Enter {
        symbol,
        underlying,
        direction,
        tier,
        strength,
        score,
        reason,
    })
}
