//! WebSocket server, connection handling and the regeneration ticker.

use crate::persist::QueuedStorage;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{slot_key, PlayerSession, SessionError};
use arbicoin_core::{GameAction, GameEvent, GameView};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// Live sessions by connection ID
    pub sessions: DashMap<Uuid, PlayerSession>,
    /// Which connection holds each save slot
    pub slots: DashMap<String, Uuid>,
    /// Mapping from connection ID to its message sender
    pub senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Save files, written by the background writer
    pub storage: QueuedStorage,
}

impl ServerState {
    pub fn new(storage: QueuedStorage) -> Self {
        Self {
            sessions: DashMap::new(),
            slots: DashMap::new(),
            senders: DashMap::new(),
            storage,
        }
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, connection_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&connection_id) {
            let _ = sender.send(msg);
        }
    }

    /// Open a session for `player_name` on this connection.
    pub fn join(&self, connection_id: Uuid, player_name: String) -> Result<GameView, SessionError> {
        if self.sessions.contains_key(&connection_id) {
            return Err(SessionError::AlreadyJoined);
        }

        let key = slot_key(&player_name)?;
        match self.slots.entry(key.clone()) {
            Entry::Occupied(_) => return Err(SessionError::SlotInUse(key)),
            Entry::Vacant(entry) => {
                entry.insert(connection_id);
            }
        }

        let session = match PlayerSession::open(connection_id, player_name, self.storage.clone()) {
            Ok(session) => session,
            Err(e) => {
                self.slots.remove(&key);
                return Err(e);
            }
        };
        let view = session.view();
        info!(%connection_id, slot = %key, "session opened");
        self.sessions.insert(connection_id, session);

        Ok(view)
    }

    /// Save and close this connection's session. Returns false if none was open.
    pub fn leave(&self, connection_id: Uuid) -> bool {
        match self.sessions.remove(&connection_id) {
            Some((_, session)) => {
                let key = session.slot_key().to_string();
                session.close();
                self.slots.remove(&key);
                info!(%connection_id, slot = %key, "session closed");
                true
            }
            None => false,
        }
    }

    /// Apply an action to this connection's session
    pub fn apply(
        &self,
        connection_id: Uuid,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, SessionError> {
        let mut session = self
            .sessions
            .get_mut(&connection_id)
            .ok_or(SessionError::NotJoined)?;
        session.apply(action)
    }

    /// Purchase an upgrade by name for this connection's session
    pub fn purchase(&self, connection_id: Uuid, kind: &str) -> Result<Vec<GameEvent>, SessionError> {
        let mut session = self
            .sessions
            .get_mut(&connection_id)
            .ok_or(SessionError::NotJoined)?;
        session.purchase(kind)
    }

    pub fn view(&self, connection_id: Uuid) -> Result<GameView, SessionError> {
        self.sessions
            .get(&connection_id)
            .map(|session| session.view())
            .ok_or(SessionError::NotJoined)
    }

    /// Run one regeneration tick on every session; returns the views that changed
    pub fn tick_all(&self) -> Vec<(Uuid, GameView)> {
        self.sessions
            .iter_mut()
            .filter_map(|mut entry| {
                let connection_id = *entry.key();
                entry.value_mut().tick().map(|view| (connection_id, view))
            })
            .collect()
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("ArbiCoin server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Tick every session on a fixed cadence and push changed views.
pub async fn run_regen_ticker(state: Arc<ServerState>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let updates = state.tick_all();
        if !updates.is_empty() {
            debug!(sessions = updates.len(), "energy regenerated");
        }
        for (connection_id, view) in updates {
            state.send_to(connection_id, ServerMessage::State { view });
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.senders.insert(connection_id, tx);

    let welcome = ServerMessage::Welcome { connection_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text.into())).await?;

    // Forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(connection_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", connection_id, e);
                    state.send_to(
                        connection_id,
                        ServerMessage::Error {
                            message: "Invalid message".to_string(),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", connection_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", connection_id, e);
                break;
            }
            _ => {}
        }
    }

    // Save and free the slot on disconnect
    state.leave(connection_id);
    state.senders.remove(&connection_id);
    send_task.abort();

    info!("Connection closed for {}", connection_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(connection_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::Join { player_name } => {
            let name = player_name.clone();
            match state.join(connection_id, player_name) {
                Ok(view) => state.send_to(
                    connection_id,
                    ServerMessage::Joined {
                        player_name: name,
                        view,
                    },
                ),
                Err(e) => state.send_to(
                    connection_id,
                    ServerMessage::Error {
                        message: e.to_string(),
                    },
                ),
            }
        }

        ClientMessage::Tap => {
            let result = state.apply(connection_id, GameAction::Tap);
            send_action_result(connection_id, result, state);
        }

        ClientMessage::PurchaseUpgrade { kind } => {
            let result = state.purchase(connection_id, &kind);
            send_action_result(connection_id, result, state);
        }

        ClientMessage::GetState => match state.view(connection_id) {
            Ok(view) => state.send_to(connection_id, ServerMessage::State { view }),
            Err(e) => state.send_to(
                connection_id,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            ),
        },

        ClientMessage::Leave => {
            if state.leave(connection_id) {
                state.send_to(connection_id, ServerMessage::Left);
            } else {
                state.send_to(
                    connection_id,
                    ServerMessage::Error {
                        message: SessionError::NotJoined.to_string(),
                    },
                );
            }
        }

        ClientMessage::Ping => {
            state.send_to(connection_id, ServerMessage::Pong);
        }
    }
}

/// Report an action outcome, followed by the fresh view on success.
fn send_action_result(
    connection_id: Uuid,
    result: Result<Vec<GameEvent>, SessionError>,
    state: &Arc<ServerState>,
) {
    match result {
        Ok(events) => {
            state.send_to(connection_id, ServerMessage::action_ok(events));
            if let Ok(view) = state.view(connection_id) {
                state.send_to(connection_id, ServerMessage::State { view });
            }
        }
        Err(e) => state.send_to(connection_id, ServerMessage::action_err(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{save_queue, SaveRequest};
    use arbicoin_core::GameError;
    use tempfile::TempDir;

    struct Fixture {
        state: ServerState,
        rx: mpsc::UnboundedReceiver<SaveRequest>,
        tmp: TempDir,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let (storage, rx) = save_queue(tmp.path());
        Fixture {
            state: ServerState::new(storage),
            rx,
            tmp,
        }
    }

    #[test]
    fn test_join_and_play() {
        let Fixture { state, rx: _rx, tmp: _tmp } = fixture();
        let conn = Uuid::new_v4();

        let view = state.join(conn, "Alice".into()).unwrap();
        assert_eq!(view.energy, 1000);

        let events = state.apply(conn, GameAction::Tap).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(state.view(conn).unwrap().coins, 1);

        assert!(state.leave(conn));
        assert!(!state.leave(conn));
    }

    #[test]
    fn test_slot_exclusive() {
        let Fixture { state, rx: _rx, tmp: _tmp } = fixture();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        state.join(first, "Alice".into()).unwrap();
        assert!(matches!(
            state.join(second, "alice".into()),
            Err(SessionError::SlotInUse(_))
        ));
        assert!(matches!(
            state.join(first, "Bob".into()),
            Err(SessionError::AlreadyJoined)
        ));

        state.leave(first);
        assert!(state.join(second, "alice".into()).is_ok());
    }

    #[test]
    fn test_not_joined() {
        let Fixture { state, rx: _rx, tmp: _tmp } = fixture();
        let conn = Uuid::new_v4();
        assert!(matches!(
            state.apply(conn, GameAction::Tap),
            Err(SessionError::NotJoined)
        ));
        assert!(matches!(state.view(conn), Err(SessionError::NotJoined)));
    }

    #[test]
    fn test_purchase_errors_are_reported() {
        let Fixture { state, rx: _rx, tmp: _tmp } = fixture();
        let conn = Uuid::new_v4();
        state.join(conn, "Erin".into()).unwrap();

        assert!(matches!(
            state.purchase(conn, "tapPower"),
            Err(SessionError::Game(GameError::InsufficientFunds { cost: 10, coins: 0 }))
        ));
    }

    #[test]
    fn test_tick_all_only_reports_changes() {
        let Fixture { state, rx: _rx, tmp: _tmp } = fixture();
        let idle = Uuid::new_v4();
        let busy = Uuid::new_v4();
        state.join(idle, "Idle".into()).unwrap();
        state.join(busy, "Busy".into()).unwrap();

        state.apply(busy, GameAction::Tap).unwrap();
        state.apply(busy, GameAction::Tap).unwrap();

        let updates = state.tick_all();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, busy);
        assert_eq!(updates[0].1.energy, 999);
    }

    #[test]
    fn test_actions_do_not_write_under_session_lock() {
        let Fixture { state, mut rx, tmp } = fixture();
        let conn = Uuid::new_v4();
        state.join(conn, "Hana".into()).unwrap();

        for _ in 0..10 {
            state.apply(conn, GameAction::Tap).unwrap();
        }
        state.purchase(conn, "tapPower").unwrap();

        // Every commit is queued; nothing has reached the disk yet
        assert!(!tmp.path().join("hana.json").exists());
        let mut queued = 0;
        while let Ok(request) = rx.try_recv() {
            assert_eq!(request.key, "hana");
            queued += 1;
        }
        assert_eq!(queued, 11);
    }

    #[tokio::test]
    async fn test_leave_then_rejoin_sees_latest_progress() {
        let Fixture { state, rx, tmp } = fixture();
        let writer = tokio::spawn(state.storage.writer().run(rx));
        let conn = Uuid::new_v4();

        state.join(conn, "Ivy".into()).unwrap();
        for _ in 0..7 {
            state.apply(conn, GameAction::Tap).unwrap();
        }
        assert!(state.leave(conn));

        // Served from the queue or the file, whichever the writer has reached
        let again = Uuid::new_v4();
        assert_eq!(state.join(again, "ivy".into()).unwrap().coins, 7);
        assert!(state.leave(again));

        drop(state);
        writer.await.unwrap();
        let saved = std::fs::read_to_string(tmp.path().join("ivy.json")).unwrap();
        assert!(saved.contains("\"coins\":7"));
    }
}
