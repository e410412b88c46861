//! WebSocket protocol messages for ArbiCoin sessions.

use arbicoin_core::{GameEvent, GameView};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Open (or resume) the save slot for a player
    Join { player_name: String },

    /// Tap the coin
    Tap,

    /// Buy an upgrade by name
    PurchaseUpgrade { kind: String },

    /// Request the current view
    GetState,

    /// Save and close the session
    Leave,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned connection ID
    Welcome { connection_id: Uuid },

    /// Session opened
    Joined { player_name: String, view: GameView },

    /// Current view (after a request or a regeneration tick)
    State { view: GameView },

    /// Outcome of a tap or purchase
    ActionResult {
        success: bool,
        events: Vec<GameEvent>,
        /// Notification texts for the events
        messages: Vec<String>,
        error: Option<String>,
    },

    /// Session closed
    Left,

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

impl ServerMessage {
    pub fn action_ok(events: Vec<GameEvent>) -> Self {
        let messages = events.iter().map(|e| e.to_string()).collect();
        ServerMessage::ActionResult {
            success: true,
            events,
            messages,
            error: None,
        }
    }

    pub fn action_err(error: impl ToString) -> Self {
        ServerMessage::ActionResult {
            success: false,
            events: Vec::new(),
            messages: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}
