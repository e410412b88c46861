//! Player actions and the events they produce.
//!
//! Front-ends submit a `GameAction` and render the returned `GameEvent`s;
//! each event's `Display` text is the notification shown to the player.

use crate::game::PurchaseOutcome;
use crate::upgrades::UpgradeKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// All possible actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Tap the coin
    Tap,
    /// Buy one level of an upgrade
    PurchaseUpgrade(UpgradeKind),
    /// One regeneration tick
    RegenerateEnergy,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The coin was tapped
    Tapped { granted: u64, coins: u64, energy: u64 },

    /// Cumulative taps crossed a level boundary
    LeveledUp { level: u64 },

    /// An upgrade was bought
    UpgradePurchased {
        kind: UpgradeKind,
        level: u32,
        cost: u64,
        value: u64,
    },

    /// Energy was restored by a tick
    EnergyRegenerated { energy: u64, restored: u64 },
}

impl From<PurchaseOutcome> for GameEvent {
    fn from(outcome: PurchaseOutcome) -> Self {
        GameEvent::UpgradePurchased {
            kind: outcome.kind,
            level: outcome.level,
            cost: outcome.cost,
            value: outcome.value,
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::Tapped { granted, .. } => write!(f, "+{}", granted),
            GameEvent::LeveledUp { level } => {
                write!(f, "Level Up! You're now level {}!", level)
            }
            GameEvent::UpgradePurchased { kind, .. } => write!(f, "{} upgraded!", kind),
            GameEvent::EnergyRegenerated { restored, .. } => write!(f, "+{} energy", restored),
        }
    }
}
