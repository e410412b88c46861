//! Serializable snapshots of the game state.
//!
//! Every field is optional on decode so that saves written by older builds
//! still load, and a field holding a value of the wrong shape (a string, a
//! negative or fractional number) is dropped on its own instead of
//! discarding the whole save. Only input that is not a JSON object at all is
//! an error. Restoring merges a snapshot over a fresh default state, one
//! field and one upgrade entry at a time, then repairs the invariants.

use crate::game::GameState;
use crate::upgrades::UpgradeKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors from encoding or decoding a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Stored level/cost of one upgrade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeSnapshot {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub cost: Option<u64>,
}

/// Structural copy of a `GameState`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub coins: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub total_taps: Option<u64>,
    /// Written for display only; ignored on restore
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub level: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub energy: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub max_energy: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub energy_regen_rate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub tap_power: Option<u64>,
    /// Keyed by upgrade kind name; unknown names are dropped on restore
    #[serde(skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "lenient_upgrades")]
    pub upgrades: BTreeMap<String, UpgradeSnapshot>,
}

/// Decode one field, mapping a value of the wrong shape to `None`
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match T::deserialize(&value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => {
            debug!(%value, error = %e, "ignoring unreadable snapshot field");
            Ok(None)
        }
    }
}

/// Decode the upgrade table entry by entry; entries that are not objects are dropped
fn lenient_upgrades<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, UpgradeSnapshot>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match Value::deserialize(deserializer)? {
        Value::Object(entries) => entries,
        Value::Null => return Ok(BTreeMap::new()),
        other => {
            debug!(value = %other, "ignoring unreadable upgrade table");
            return Ok(BTreeMap::new());
        }
    };

    let mut upgrades = BTreeMap::new();
    for (name, entry) in entries {
        match UpgradeSnapshot::deserialize(&entry) {
            Ok(stored) => {
                upgrades.insert(name, stored);
            }
            Err(e) => debug!(upgrade = %name, error = %e, "ignoring unreadable upgrade entry"),
        }
    }
    Ok(upgrades)
}

impl Snapshot {
    /// Decode a snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode the snapshot as JSON
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl GameState {
    /// Take a complete snapshot of this state
    pub fn to_snapshot(&self) -> Snapshot {
        let upgrades = self
            .upgrades
            .iter()
            .map(|(kind, upgrade)| {
                (
                    kind.name().to_string(),
                    UpgradeSnapshot {
                        level: Some(upgrade.level),
                        cost: Some(upgrade.cost),
                    },
                )
            })
            .collect();

        Snapshot {
            coins: Some(self.coins),
            total_taps: Some(self.total_taps),
            level: Some(self.level),
            energy: Some(self.energy),
            max_energy: Some(self.max_energy),
            energy_regen_rate: Some(self.energy_regen_rate),
            tap_power: Some(self.tap_power),
            upgrades,
        }
    }

    /// Build a state from a snapshot merged over the defaults
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut state = GameState::default();

        if let Some(coins) = snapshot.coins {
            state.coins = coins;
        }
        if let Some(total_taps) = snapshot.total_taps {
            state.total_taps = total_taps;
        }
        if let Some(max_energy) = snapshot.max_energy {
            state.max_energy = max_energy;
        }
        if let Some(energy) = snapshot.energy {
            state.energy = energy;
        }
        if let Some(rate) = snapshot.energy_regen_rate {
            state.energy_regen_rate = rate;
        }
        if let Some(tap_power) = snapshot.tap_power {
            state.tap_power = tap_power;
        }

        // Merge per kind so a kind missing from an old save keeps its defaults
        for (name, stored) in &snapshot.upgrades {
            let kind: UpgradeKind = match name.parse() {
                Ok(kind) => kind,
                Err(_) => {
                    debug!(upgrade = %name, "dropping unknown upgrade from snapshot");
                    continue;
                }
            };
            let upgrade = state.upgrades.get_mut(kind);
            if let Some(level) = stored.level {
                upgrade.level = level;
            }
            if let Some(cost) = stored.cost {
                upgrade.cost = cost;
            }
        }

        state.enforce_invariants();
        state
    }
}
