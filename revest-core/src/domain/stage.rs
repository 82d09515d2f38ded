//! Weinstein stage labels.

use serde::{Deserialize, Serialize};

/// Long-term trend stage (Weinstein classification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Stage 1 — basing / accumulation.
    Basing,
    /// Stage 2 — advancing.
    Advancing,
    /// Stage 3 — topping / distribution.
    Topping,
    /// Stage 4 — declining.
    Declining,
}

/// Raw per-day classification. `Transitional` covers both "between stages"
/// and "insufficient history" — it never confirms and is excluded from
/// pillar scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawStage {
    Stage(Stage),
    Transitional,
}

/// The effective (debounced) label for one instrument on one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageLabel {
    /// Today's raw classification, before confirmation.
    pub raw: RawStage,
    /// The confirmed stage the instrument is treated as being in.
    /// `None` until a first stage has ever confirmed.
    pub effective: Option<Stage>,
    /// Consecutive days the current raw stage has persisted.
    pub consecutive_days: usize,
    /// True when today's raw stage matches (or just became) the effective one.
    pub confirmed: bool,
}

impl StageLabel {
    /// Undefined label for instruments without enough history.
    pub fn undefined() -> Self {
        Self {
            raw: RawStage::Transitional,
            effective: None,
            consecutive_days: 0,
            confirmed: false,
        }
    }

    pub fn is_effective(&self, stage: Stage) -> bool {
        self.effective == Some(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_label_is_not_any_stage() {
        let label = StageLabel::undefined();
        assert!(!label.is_effective(Stage::Advancing));
        assert!(!label.confirmed);
    }
}
