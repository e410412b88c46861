//! Core game state and its transitions.
//!
//! This module contains the `GameState` struct and the pure tap, upgrade and
//! regeneration rules. Persistence is layered on top by `GameEngine`.

use crate::upgrades::{UpgradeKind, Upgrades};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Taps needed per level
pub const TAPS_PER_LEVEL: u64 = 100;

/// Energy capacity of a fresh game
pub const DEFAULT_MAX_ENERGY: u64 = 1000;

/// Max energy gained per energy capacity upgrade
pub const ENERGY_CAPACITY_STEP: u64 = 100;

/// Level reached after `total_taps` taps
pub fn level_for_taps(total_taps: u64) -> u64 {
    total_taps / TAPS_PER_LEVEL + 1
}

/// Errors that can occur when applying actions.
///
/// None of these change the state; callers inspect them and carry on.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not enough energy to tap")]
    InsufficientEnergy,

    #[error("Not enough coins: need {cost}, have {coins}")]
    InsufficientFunds { cost: u64, coins: u64 },

    #[error("Unknown upgrade kind: {0}")]
    UnknownUpgradeKind(String),
}

/// Result of a successful tap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapOutcome {
    /// Coin balance after the tap
    pub coins: u64,
    /// Coins granted by this tap
    pub granted: u64,
    /// Energy left after the tap
    pub energy: u64,
    pub total_taps: u64,
    /// New level, if this tap crossed a level boundary
    pub level_up: Option<u64>,
}

/// Result of a successful upgrade purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub kind: UpgradeKind,
    /// Coins paid
    pub spent: u64,
    /// Upgrade level after the purchase
    pub level: u32,
    /// Price of the next purchase
    pub cost: u64,
    /// New effect value (tap power, max energy or regen rate)
    pub value: u64,
}

/// Result of a regeneration tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenOutcome {
    pub energy: u64,
    /// Energy actually restored (0 when already full)
    pub restored: u64,
}

/// The complete game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Coin balance
    pub coins: u64,
    /// Taps ever made; drives leveling
    pub total_taps: u64,
    /// Cached `level_for_taps(total_taps)`
    pub level: u64,
    /// Current energy, never above `max_energy`
    pub energy: u64,
    pub max_energy: u64,
    /// Energy restored per regeneration tick
    pub energy_regen_rate: u64,
    /// Coins granted per tap
    pub tap_power: u64,
    pub upgrades: Upgrades,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            coins: 0,
            total_taps: 0,
            level: 1,
            energy: DEFAULT_MAX_ENERGY,
            max_energy: DEFAULT_MAX_ENERGY,
            energy_regen_rate: 1,
            tap_power: 1,
            upgrades: Upgrades::default(),
        }
    }
}

impl GameState {
    /// Create a fresh game
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a tap would succeed right now
    pub fn can_tap(&self) -> bool {
        self.energy > 0
    }

    /// Whether the next purchase of `kind` is affordable
    pub fn can_afford(&self, kind: UpgradeKind) -> bool {
        self.coins >= self.upgrades.get(kind).cost
    }

    /// Effect value an upgrade currently provides
    pub fn upgrade_value(&self, kind: UpgradeKind) -> u64 {
        match kind {
            UpgradeKind::TapPower => self.tap_power,
            UpgradeKind::EnergyCapacity => self.max_energy,
            UpgradeKind::EnergyRegen => self.energy_regen_rate,
        }
    }

    /// Spend one energy for `tap_power` coins
    pub fn tap(&mut self) -> Result<TapOutcome, GameError> {
        if !self.can_tap() {
            return Err(GameError::InsufficientEnergy);
        }

        self.energy -= 1;
        self.coins = self.coins.saturating_add(self.tap_power);
        self.total_taps = self.total_taps.saturating_add(1);

        let new_level = level_for_taps(self.total_taps);
        let level_up = if new_level > self.level {
            Some(new_level)
        } else {
            None
        };
        self.level = new_level;

        Ok(TapOutcome {
            coins: self.coins,
            granted: self.tap_power,
            energy: self.energy,
            total_taps: self.total_taps,
            level_up,
        })
    }

    /// Buy one level of an upgrade
    pub fn purchase_upgrade(&mut self, kind: UpgradeKind) -> Result<PurchaseOutcome, GameError> {
        let cost = self.upgrades.get(kind).cost;
        if self.coins < cost {
            return Err(GameError::InsufficientFunds {
                cost,
                coins: self.coins,
            });
        }

        self.coins -= cost;

        match kind {
            UpgradeKind::TapPower => {
                self.tap_power = self.tap_power.saturating_add(1);
            }
            UpgradeKind::EnergyCapacity => {
                self.max_energy = self.max_energy.saturating_add(ENERGY_CAPACITY_STEP);
                // Full refill, not proportional
                self.energy = self.max_energy;
            }
            UpgradeKind::EnergyRegen => {
                self.energy_regen_rate = self.energy_regen_rate.saturating_add(1);
            }
        }

        let upgrade = self.upgrades.get_mut(kind);
        upgrade.level = upgrade.level.saturating_add(1);
        upgrade.cost = kind.next_cost(cost);
        let (level, cost_after) = (upgrade.level, upgrade.cost);

        Ok(PurchaseOutcome {
            kind,
            spent: cost,
            level,
            cost: cost_after,
            value: self.upgrade_value(kind),
        })
    }

    /// Restore `energy_regen_rate` energy, capped at `max_energy`
    pub fn regenerate_energy(&mut self) -> RegenOutcome {
        if self.energy >= self.max_energy {
            return RegenOutcome {
                energy: self.energy,
                restored: 0,
            };
        }

        let before = self.energy;
        self.energy = self
            .energy
            .saturating_add(self.energy_regen_rate)
            .min(self.max_energy);

        RegenOutcome {
            energy: self.energy,
            restored: self.energy - before,
        }
    }

    /// Repair a state assembled from outside data.
    ///
    /// Recomputes `level`, clamps `energy` and resets non-positive
    /// multipliers and upgrade entries to their defaults.
    pub(crate) fn enforce_invariants(&mut self) {
        let defaults = GameState::default();
        if self.max_energy == 0 {
            self.max_energy = defaults.max_energy;
        }
        if self.energy_regen_rate == 0 {
            self.energy_regen_rate = defaults.energy_regen_rate;
        }
        if self.tap_power == 0 {
            self.tap_power = defaults.tap_power;
        }
        for kind in UpgradeKind::ALL {
            let upgrade = self.upgrades.get_mut(kind);
            if upgrade.level == 0 {
                upgrade.level = 1;
            }
            if upgrade.cost == 0 {
                upgrade.cost = kind.base_cost();
            }
        }
        self.energy = self.energy.min(self.max_energy);
        self.level = level_for_taps(self.total_taps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrades::Upgrade;

    #[test]
    fn test_default_state() {
        let state = GameState::new();
        assert_eq!(state.coins, 0);
        assert_eq!(state.level, 1);
        assert_eq!(state.energy, 1000);
        assert_eq!(state.max_energy, 1000);
        assert_eq!(state.energy_regen_rate, 1);
        assert_eq!(state.tap_power, 1);
    }

    #[test]
    fn test_level_for_taps() {
        assert_eq!(level_for_taps(0), 1);
        assert_eq!(level_for_taps(99), 1);
        assert_eq!(level_for_taps(100), 2);
        assert_eq!(level_for_taps(250), 3);
    }

    #[test]
    fn test_single_tap() {
        let mut state = GameState::new();
        let outcome = state.tap().unwrap();

        assert_eq!(outcome.coins, 1);
        assert_eq!(outcome.granted, 1);
        assert_eq!(outcome.level_up, None);
        assert_eq!(state.energy, 999);
        assert_eq!(state.total_taps, 1);
        assert_eq!(state.level, 1);
    }

    #[test]
    fn test_tap_without_energy() {
        let mut state = GameState {
            energy: 0,
            coins: 7,
            total_taps: 42,
            ..GameState::default()
        };
        let before = state.clone();

        assert_eq!(state.tap(), Err(GameError::InsufficientEnergy));
        assert_eq!(state, before);
    }

    #[test]
    fn test_level_up_on_hundredth_tap() {
        let mut state = GameState::new();
        for _ in 0..99 {
            assert_eq!(state.tap().unwrap().level_up, None);
        }
        let outcome = state.tap().unwrap();
        assert_eq!(outcome.level_up, Some(2));
        assert_eq!(state.level, 2);
        assert_eq!(state.total_taps, 100);
    }

    #[test]
    fn test_tap_uses_tap_power() {
        let mut state = GameState {
            tap_power: 5,
            ..GameState::default()
        };
        let outcome = state.tap().unwrap();
        assert_eq!(outcome.granted, 5);
        assert_eq!(state.coins, 5);
    }

    #[test]
    fn test_purchase_tap_power() {
        let mut state = GameState {
            coins: 10,
            ..GameState::default()
        };
        let outcome = state.purchase_upgrade(UpgradeKind::TapPower).unwrap();

        assert_eq!(outcome.spent, 10);
        assert_eq!(outcome.value, 2);
        assert_eq!(state.coins, 0);
        assert_eq!(state.tap_power, 2);
        assert_eq!(state.upgrades.tap_power, Upgrade { level: 2, cost: 15 });
    }

    #[test]
    fn test_purchase_energy_capacity_refills() {
        let mut state = GameState {
            coins: 30,
            energy: 500,
            ..GameState::default()
        };
        let outcome = state.purchase_upgrade(UpgradeKind::EnergyCapacity).unwrap();

        assert_eq!(outcome.value, 1100);
        assert_eq!(state.max_energy, 1100);
        assert_eq!(state.energy, 1100);
        assert_eq!(state.coins, 5);
        assert_eq!(state.upgrades.energy_capacity, Upgrade { level: 2, cost: 45 });
    }

    #[test]
    fn test_purchase_energy_regen() {
        let mut state = GameState {
            coins: 50,
            ..GameState::default()
        };
        state.purchase_upgrade(UpgradeKind::EnergyRegen).unwrap();

        assert_eq!(state.energy_regen_rate, 2);
        assert_eq!(state.upgrades.energy_regen, Upgrade { level: 2, cost: 100 });
    }

    #[test]
    fn test_purchase_insufficient_funds() {
        let mut state = GameState {
            coins: 9,
            ..GameState::default()
        };
        let before = state.clone();

        assert_eq!(
            state.purchase_upgrade(UpgradeKind::TapPower),
            Err(GameError::InsufficientFunds { cost: 10, coins: 9 })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_regenerate_caps_at_max() {
        let mut state = GameState {
            energy: 999,
            ..GameState::default()
        };
        assert_eq!(
            state.regenerate_energy(),
            RegenOutcome {
                energy: 1000,
                restored: 1
            }
        );
        assert_eq!(
            state.regenerate_energy(),
            RegenOutcome {
                energy: 1000,
                restored: 0
            }
        );
    }

    #[test]
    fn test_regenerate_does_not_overshoot() {
        let mut state = GameState {
            energy: 995,
            energy_regen_rate: 10,
            ..GameState::default()
        };
        let outcome = state.regenerate_energy();
        assert_eq!(outcome.energy, 1000);
        assert_eq!(outcome.restored, 5);
    }

    #[test]
    fn test_enforce_invariants() {
        let mut state = GameState {
            total_taps: 350,
            level: 1,
            energy: 5000,
            max_energy: 0,
            tap_power: 0,
            ..GameState::default()
        };
        state.upgrades.tap_power = Upgrade { level: 0, cost: 0 };
        state.enforce_invariants();

        assert_eq!(state.level, 4);
        assert_eq!(state.max_energy, 1000);
        assert_eq!(state.energy, 1000);
        assert_eq!(state.tap_power, 1);
        assert_eq!(state.upgrades.tap_power, Upgrade { level: 1, cost: 10 });
    }
}
