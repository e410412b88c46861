//! Upgrade kinds, levels and cost growth.
//!
//! This module contains:
//! - `UpgradeKind`, the closed set of purchasable upgrades
//! - `Upgrade`, the level/cost pair tracked per kind
//! - `Upgrades`, the per-kind table stored in the game state

use crate::game::GameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A purchasable, permanent upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeKind {
    /// +1 coin per tap
    TapPower,
    /// +100 max energy and a full refill
    #[serde(alias = "energyBoost")]
    EnergyCapacity,
    /// +1 energy per regeneration tick
    EnergyRegen,
}

impl UpgradeKind {
    /// All upgrade kinds, in display order
    pub const ALL: [UpgradeKind; 3] = [
        UpgradeKind::TapPower,
        UpgradeKind::EnergyCapacity,
        UpgradeKind::EnergyRegen,
    ];

    /// Name used in snapshots and on the wire
    pub fn name(&self) -> &'static str {
        match self {
            UpgradeKind::TapPower => "tapPower",
            UpgradeKind::EnergyCapacity => "energyCapacity",
            UpgradeKind::EnergyRegen => "energyRegen",
        }
    }

    /// Cost of the first purchase
    pub fn base_cost(&self) -> u64 {
        match self {
            UpgradeKind::TapPower => 10,
            UpgradeKind::EnergyCapacity => 25,
            UpgradeKind::EnergyRegen => 50,
        }
    }

    /// Cost growth factor as an exact fraction (numerator, denominator)
    fn growth(&self) -> (u64, u64) {
        match self {
            UpgradeKind::TapPower => (3, 2),
            UpgradeKind::EnergyCapacity => (9, 5),
            UpgradeKind::EnergyRegen => (2, 1),
        }
    }

    /// Cost after one more purchase at `cost`, floored.
    ///
    /// Always strictly greater than `cost` (saturating at `u64::MAX`).
    pub fn next_cost(&self, cost: u64) -> u64 {
        let (num, den) = self.growth();
        let grown = cost.saturating_mul(num) / den;
        grown.max(cost.saturating_add(1))
    }
}

impl fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UpgradeKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tapPower" => Ok(UpgradeKind::TapPower),
            "energyCapacity" | "energyBoost" => Ok(UpgradeKind::EnergyCapacity),
            "energyRegen" => Ok(UpgradeKind::EnergyRegen),
            other => Err(GameError::UnknownUpgradeKind(other.to_string())),
        }
    }
}

/// Level and current price of one upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrade {
    /// Starts at 1, +1 per purchase
    pub level: u32,
    /// Price of the next purchase
    pub cost: u64,
}

impl Upgrade {
    /// Fresh upgrade at level 1 with the kind's base cost
    pub fn base(kind: UpgradeKind) -> Self {
        Self {
            level: 1,
            cost: kind.base_cost(),
        }
    }
}

/// Per-kind upgrade table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrades {
    pub tap_power: Upgrade,
    pub energy_capacity: Upgrade,
    pub energy_regen: Upgrade,
}

impl Default for Upgrades {
    fn default() -> Self {
        Self {
            tap_power: Upgrade::base(UpgradeKind::TapPower),
            energy_capacity: Upgrade::base(UpgradeKind::EnergyCapacity),
            energy_regen: Upgrade::base(UpgradeKind::EnergyRegen),
        }
    }
}

impl Upgrades {
    /// Get the upgrade for a kind
    pub fn get(&self, kind: UpgradeKind) -> &Upgrade {
        match kind {
            UpgradeKind::TapPower => &self.tap_power,
            UpgradeKind::EnergyCapacity => &self.energy_capacity,
            UpgradeKind::EnergyRegen => &self.energy_regen,
        }
    }

    /// Get the upgrade for a kind, mutably
    pub fn get_mut(&mut self, kind: UpgradeKind) -> &mut Upgrade {
        match kind {
            UpgradeKind::TapPower => &mut self.tap_power,
            UpgradeKind::EnergyCapacity => &mut self.energy_capacity,
            UpgradeKind::EnergyRegen => &mut self.energy_regen,
        }
    }

    /// Iterate over (kind, upgrade) pairs in display order
    pub fn iter(&self) -> impl Iterator<Item = (UpgradeKind, &Upgrade)> {
        UpgradeKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}
