//! The four-pillar entry record.
//!
//! A fixed record of four named booleans computed by four independent pure
//! functions — never an early-exit chain, so the narrative always reports
//! all four verdicts regardless of evaluation order.

use super::instrument::Direction;
use serde::{Deserialize, Serialize};

/// Signal strength derived from the pillar count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStrength {
    /// All four pillars aligned.
    Strong,
    /// At least the moderate threshold (default 3 of 4).
    Moderate,
    /// Below the entry threshold.
    None,
}

/// Per-instrument per-date result of the four entry pillars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarScore {
    pub symbol: String,
    pub direction: Direction,
    pub stage_aligned: bool,
    pub trend_aligned: bool,
    pub volatility_aligned: bool,
    pub volume_aligned: bool,
    /// Relative strength of the underlying, for within-tier tie-breaks.
    pub relative_strength: Option<f64>,
    /// Narrative flags raised during scoring (FOMO warning, extreme panic,
    /// missing breadth, ...).
    pub flags: Vec<String>,
}

impl PillarScore {
    /// Number of satisfied pillars, always in 0..=4.
    pub fn count(&self) -> u8 {
        [
            self.stage_aligned,
            self.trend_aligned,
            self.volatility_aligned,
            self.volume_aligned,
        ]
        .iter()
        .filter(|&&b| b)
        .count() as u8
    }

    pub fn strength(&self, strong_threshold: u8, moderate_threshold: u8) -> SignalStrength {
        let count = self.count();
        if count >= strong_threshold {
            SignalStrength::Strong
        } else if count >= moderate_threshold {
            SignalStrength::Moderate
        } else {
            SignalStrength::None
        }
    }

    /// One-line narrative summary, e.g. `3/4: Stage=Y Trend=Y Vol=N Volume=Y`.
    pub fn summary(&self) -> String {
        fn yn(b: bool) -> char {
            if b {
                'Y'
            } else {
                'N'
            }
        }
        format!(
            "{}/4: Stage={} Trend={} Vol={} Volume={}",
            self.count(),
            yn(self.stage_aligned),
            yn(self.trend_aligned),
            yn(self.volatility_aligned),
            yn(self.volume_aligned),
        )
    }
}
