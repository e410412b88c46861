//! The game engine: a `GameState` bound to a save slot.
//!
//! The engine is the only owner of live state. Every committed tap or
//! purchase writes a snapshot to the slot; regeneration ticks do not. Callers
//! get copies back (outcomes, events, views, snapshots), never references
//! they could mutate.

use crate::actions::{GameAction, GameEvent};
use crate::game::{GameError, GameState, PurchaseOutcome, RegenOutcome, TapOutcome};
use crate::snapshot::Snapshot;
use crate::storage::{MemoryStorage, SaveSlot, Storage, DEFAULT_SLOT};
use crate::upgrades::UpgradeKind;
use crate::view::GameView;
use tracing::{debug, info};

/// Game state plus the slot it is persisted to
#[derive(Debug)]
pub struct GameEngine<S: Storage = MemoryStorage> {
    state: GameState,
    slot: SaveSlot<S>,
}

impl GameEngine<MemoryStorage> {
    /// Fresh engine backed by memory only
    pub fn new() -> Self {
        Self::open(SaveSlot::new(MemoryStorage::new(), DEFAULT_SLOT))
    }
}

impl Default for GameEngine<MemoryStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Storage> GameEngine<S> {
    /// Create an engine, restoring whatever the slot holds
    pub fn open(slot: SaveSlot<S>) -> Self {
        let state = match slot.load() {
            Some(snapshot) => {
                let state = GameState::from_snapshot(&snapshot);
                info!(
                    slot = slot.key(),
                    coins = state.coins,
                    level = state.level,
                    "restored saved game"
                );
                state
            }
            None => GameState::default(),
        };
        Self { state, slot }
    }

    /// Create an engine starting from `state`, repaired if needed
    pub fn with_state(slot: SaveSlot<S>, mut state: GameState) -> Self {
        state.enforce_invariants();
        Self { state, slot }
    }

    /// Read-only access to the live state
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn slot(&self) -> &SaveSlot<S> {
        &self.slot
    }

    /// Presentation data for the current state
    pub fn view(&self) -> GameView {
        GameView::from_state(&self.state)
    }

    pub fn tap(&mut self) -> Result<TapOutcome, GameError> {
        let outcome = self.state.tap()?;
        if let Some(level) = outcome.level_up {
            debug!(level, "level up");
        }
        self.save();
        Ok(outcome)
    }

    pub fn purchase_upgrade(&mut self, kind: UpgradeKind) -> Result<PurchaseOutcome, GameError> {
        let outcome = self.state.purchase_upgrade(kind)?;
        debug!(%kind, level = outcome.level, cost = outcome.cost, "upgrade purchased");
        self.save();
        Ok(outcome)
    }

    /// Purchase by kind name, as sent by front-ends
    pub fn purchase_upgrade_named(&mut self, name: &str) -> Result<PurchaseOutcome, GameError> {
        let kind: UpgradeKind = name.parse()?;
        self.purchase_upgrade(kind)
    }

    /// One regeneration tick; the caller owns the cadence
    pub fn regenerate_energy(&mut self) -> RegenOutcome {
        self.state.regenerate_energy()
    }

    pub fn to_snapshot(&self) -> Snapshot {
        self.state.to_snapshot()
    }

    /// Replace the live state with `snapshot` merged over the defaults
    pub fn restore_from_snapshot(&mut self, snapshot: &Snapshot) {
        self.state = GameState::from_snapshot(snapshot);
    }

    /// Write the current state to the slot (best-effort)
    pub fn save(&mut self) {
        let snapshot = self.state.to_snapshot();
        self.slot.save(&snapshot);
    }

    /// Apply an action and report what happened
    pub fn apply_action(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();

        match action {
            GameAction::Tap => {
                let outcome = self.tap()?;
                events.push(GameEvent::Tapped {
                    granted: outcome.granted,
                    coins: outcome.coins,
                    energy: outcome.energy,
                });
                if let Some(level) = outcome.level_up {
                    events.push(GameEvent::LeveledUp { level });
                }
            }

            GameAction::PurchaseUpgrade(kind) => {
                events.push(self.purchase_upgrade(kind)?.into());
            }

            GameAction::RegenerateEnergy => {
                let outcome = self.regenerate_energy();
                if outcome.restored > 0 {
                    events.push(GameEvent::EnergyRegenerated {
                        energy: outcome.energy,
                        restored: outcome.restored,
                    });
                }
            }
        }

        Ok(events)
    }
}
