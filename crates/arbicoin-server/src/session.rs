//! Player session management.

use crate::persist::QueuedStorage;
use arbicoin_core::{GameAction, GameEngine, GameError, GameEvent, GameView, SaveSlot};
use thiserror::Error;
use uuid::Uuid;

/// Longest accepted slot key
const MAX_SLOT_KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid player name")]
    InvalidName,

    #[error("Save slot {0} is already in use")]
    SlotInUse(String),

    #[error("Already joined")]
    AlreadyJoined,

    #[error("Not joined")]
    NotJoined,

    #[error(transparent)]
    Game(#[from] GameError),
}

/// Turn a player name into a file-safe slot key.
///
/// Letters and digits are lowercased, runs of anything else become one `_`.
pub fn slot_key(player_name: &str) -> Result<String, SessionError> {
    let mut key = String::new();
    for c in player_name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
        } else if !key.ends_with('_') {
            key.push('_');
        }
    }
    let key = key.trim_matches('_').to_string();

    if key.is_empty() || key.len() > MAX_SLOT_KEY_LEN {
        return Err(SessionError::InvalidName);
    }
    Ok(key)
}

/// One player's live game, bound to a connection.
pub struct PlayerSession {
    pub connection_id: Uuid,
    pub player_name: String,
    engine: GameEngine<QueuedStorage>,
}

impl PlayerSession {
    /// Open the player's save slot; saves go through the background writer
    pub fn open(
        connection_id: Uuid,
        player_name: String,
        storage: QueuedStorage,
    ) -> Result<Self, SessionError> {
        let key = slot_key(&player_name)?;
        let slot = SaveSlot::new(storage, key);

        Ok(Self {
            connection_id,
            player_name,
            engine: GameEngine::open(slot),
        })
    }

    pub fn slot_key(&self) -> &str {
        self.engine.slot().key()
    }

    pub fn view(&self) -> GameView {
        self.engine.view()
    }

    pub fn apply(&mut self, action: GameAction) -> Result<Vec<GameEvent>, SessionError> {
        Ok(self.engine.apply_action(action)?)
    }

    /// Purchase by kind name as sent by the client
    pub fn purchase(&mut self, kind: &str) -> Result<Vec<GameEvent>, SessionError> {
        let outcome = self.engine.purchase_upgrade_named(kind)?;
        Ok(vec![outcome.into()])
    }

    /// Regeneration tick; returns the new view if energy changed
    pub fn tick(&mut self) -> Option<GameView> {
        let outcome = self.engine.regenerate_energy();
        if outcome.restored > 0 {
            Some(self.engine.view())
        } else {
            None
        }
    }

    /// Queue the final state for saving
    pub fn close(mut self) {
        self.engine.save();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{save_queue, SaveRequest};
    use arbicoin_core::{Snapshot, UpgradeKind};
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn queue() -> (TempDir, QueuedStorage, UnboundedReceiver<SaveRequest>) {
        let tmp = TempDir::new().unwrap();
        let (storage, rx) = save_queue(tmp.path());
        (tmp, storage, rx)
    }

    #[test]
    fn test_slot_key() {
        assert_eq!(slot_key("Alice").unwrap(), "alice");
        assert_eq!(slot_key("  Bob the Tapper! ").unwrap(), "bob_the_tapper");
        assert_eq!(slot_key("../../etc/passwd").unwrap(), "etc_passwd");
        assert!(matches!(slot_key("   "), Err(SessionError::InvalidName)));
        assert!(matches!(slot_key("!!!"), Err(SessionError::InvalidName)));
        assert!(matches!(
            slot_key(&"x".repeat(40)),
            Err(SessionError::InvalidName)
        ));
    }

    #[test]
    fn test_session_play_and_resume() {
        let (_tmp, storage, _rx) = queue();

        let mut session =
            PlayerSession::open(Uuid::new_v4(), "Alice".into(), storage.clone()).unwrap();
        assert_eq!(session.slot_key(), "alice");
        for _ in 0..12 {
            session.apply(GameAction::Tap).unwrap();
        }
        let events = session.purchase("tapPower").unwrap();
        assert!(matches!(
            events.as_slice(),
            [GameEvent::UpgradePurchased {
                kind: UpgradeKind::TapPower,
                ..
            }]
        ));
        session.close();

        let resumed = PlayerSession::open(Uuid::new_v4(), "alice".into(), storage).unwrap();
        let view = resumed.view();
        assert_eq!(view.coins, 2);
        assert_eq!(view.tap_power, 2);
        assert_eq!(view.total_taps, 12);
    }

    #[test]
    fn test_purchase_by_legacy_name() {
        let (_tmp, storage, _rx) = queue();
        let mut session = PlayerSession::open(Uuid::new_v4(), "Frank".into(), storage).unwrap();
        for _ in 0..25 {
            session.apply(GameAction::Tap).unwrap();
        }

        let events = session.purchase("energyBoost").unwrap();
        assert_eq!(
            events,
            vec![GameEvent::UpgradePurchased {
                kind: UpgradeKind::EnergyCapacity,
                level: 2,
                cost: 45,
                value: 1100,
            }]
        );
    }

    #[test]
    fn test_actions_queue_saves_instead_of_writing() {
        let (tmp, storage, mut rx) = queue();
        let mut session = PlayerSession::open(Uuid::new_v4(), "Gina".into(), storage).unwrap();

        session.apply(GameAction::Tap).unwrap();
        session.apply(GameAction::Tap).unwrap();

        assert!(!tmp.path().join("gina.json").exists());
        let mut last = None;
        while let Ok(request) = rx.try_recv() {
            assert_eq!(request.key, "gina");
            last = Some(request.json);
        }
        let snapshot = Snapshot::from_json(&last.unwrap()).unwrap();
        assert_eq!(snapshot.coins, Some(2));
    }

    #[test]
    fn test_session_errors() {
        let (_tmp, storage, _rx) = queue();
        let mut session = PlayerSession::open(Uuid::new_v4(), "Carol".into(), storage).unwrap();

        assert!(matches!(
            session.purchase("doubleTap"),
            Err(SessionError::Game(GameError::UnknownUpgradeKind(_)))
        ));
        assert!(matches!(
            session.purchase("energyRegen"),
            Err(SessionError::Game(GameError::InsufficientFunds { .. }))
        ));
    }

    #[test]
    fn test_tick_reports_only_changes() {
        let (_tmp, storage, _rx) = queue();
        let mut session = PlayerSession::open(Uuid::new_v4(), "Dave".into(), storage).unwrap();

        assert!(session.tick().is_none());
        session.apply(GameAction::Tap).unwrap();
        assert_eq!(session.tick().map(|v| v.energy), Some(1000));
    }
}
