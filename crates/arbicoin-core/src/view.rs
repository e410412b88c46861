//! Read model handed to the presentation layer after each operation.

use crate::game::GameState;
use crate::upgrades::UpgradeKind;
use serde::{Deserialize, Serialize};

/// Display data for one upgrade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeView {
    pub kind: UpgradeKind,
    pub level: u32,
    pub cost: u64,
    /// Current effect value (tap power, max energy or regen rate)
    pub value: u64,
    /// `coins >= cost`
    pub affordable: bool,
}

/// Everything a front-end needs to redraw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    pub coins: u64,
    pub level: u64,
    pub total_taps: u64,
    pub energy: u64,
    pub max_energy: u64,
    /// Energy bar fill, 0.0 to 100.0
    pub energy_percent: f64,
    pub energy_regen_rate: u64,
    pub tap_power: u64,
    /// False when out of energy; the tap button should be disabled
    pub can_tap: bool,
    pub upgrades: Vec<UpgradeView>,
}

impl GameView {
    pub fn from_state(state: &GameState) -> Self {
        let upgrades = state
            .upgrades
            .iter()
            .map(|(kind, upgrade)| UpgradeView {
                kind,
                level: upgrade.level,
                cost: upgrade.cost,
                value: state.upgrade_value(kind),
                affordable: state.can_afford(kind),
            })
            .collect();

        let energy_percent = if state.max_energy == 0 {
            0.0
        } else {
            state.energy as f64 / state.max_energy as f64 * 100.0
        };

        Self {
            coins: state.coins,
            level: state.level,
            total_taps: state.total_taps,
            energy: state.energy,
            max_energy: state.max_energy,
            energy_percent,
            energy_regen_rate: state.energy_regen_rate,
            tap_power: state.tap_power,
            can_tap: state.can_tap(),
            upgrades,
        }
    }

    /// View of a single upgrade
    pub fn upgrade(&self, kind: UpgradeKind) -> Option<&UpgradeView> {
        self.upgrades.iter().find(|u| u.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_view() {
        let view = GameView::from_state(&GameState::new());

        assert_eq!(view.energy_percent, 100.0);
        assert!(view.can_tap);
        assert_eq!(view.upgrades.len(), 3);
        assert!(view.upgrades.iter().all(|u| !u.affordable));
    }

    #[test]
    fn test_affordability_and_values() {
        let state = GameState {
            coins: 30,
            energy: 250,
            ..GameState::default()
        };
        let view = GameView::from_state(&state);

        assert_eq!(view.energy_percent, 25.0);
        assert!(view.upgrade(UpgradeKind::TapPower).unwrap().affordable);
        assert!(view.upgrade(UpgradeKind::EnergyCapacity).unwrap().affordable);
        assert!(!view.upgrade(UpgradeKind::EnergyRegen).unwrap().affordable);
        assert_eq!(view.upgrade(UpgradeKind::EnergyCapacity).unwrap().value, 1000);
    }

    #[test]
    fn test_cannot_tap_when_empty() {
        let state = GameState {
            energy: 0,
            ..GameState::default()
        };
        assert!(!GameView::from_state(&state).can_tap);
    }
}
