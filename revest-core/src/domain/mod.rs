//! Domain types for the Revest signal engine.

pub mod bar;
pub mod instrument;
pub mod market;
pub mod pillars;
pub mod position;
pub mod stage;
pub mod trade;

pub use bar::Bar;
pub use instrument::{Direction, Tier, Universe};
pub use market::{Breadth, MarketState, VixRegime, VixTrend};
pub use pillars::{PillarScore, SignalStrength};
pub use position::Position;
pub use stage::{RawStage, Stage, StageLabel};
pub use trade::{ExitReason, Trade};

/// Symbol type alias
pub type Symbol = String;
