//! Coordination Hub
//!
//! Owns the set of live connections and drives the simulation. One
//! task runs [`Hub::run`], handling exactly one command or tick per
//! loop iteration, so the connection set needs no lock of its own.
//!
//! Realtime joins go through the hub too. Seating a player and binding
//! the seat to its connection happen in the same iteration, so an old
//! connection's unregister can never land between the two.
//!
//! Outbound delivery never waits: each connection has a bounded queue
//! and a connection whose queue is full is dropped on the spot.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::core::clock::Clock;
use crate::game::player::PlayerId;
use crate::game::state::{Game, GameError, JoinOutcome};
use crate::game::tick::tick;
use crate::network::protocol::{GameStateUpdate, ServerMessage};

/// Hub-assigned connection identity.
pub type ConnectionId = u64;

/// Capacity of the hub's inbound command queue.
const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Requests handled by the hub loop.
#[derive(Debug)]
pub enum HubCommand {
    /// A connection finished its handshake.
    Register {
        /// Connection
        id: ConnectionId,
        /// Its outbound queue
        sender: mpsc::Sender<String>,
    },
    /// A connection's reader stopped.
    Unregister {
        /// Connection
        id: ConnectionId,
    },
    /// Seat the player and bind the seat to the connection.
    Join {
        /// Connection
        id: ConnectionId,
        /// Requested identity
        player_id: PlayerId,
        /// Display name
        nickname: String,
        /// Receives the game's verdict
        reply: oneshot::Sender<Result<JoinOutcome, GameError>>,
    },
    /// Deliver to every connection.
    Broadcast(ServerMessage),
}

struct Connection {
    sender: mpsc::Sender<String>,
    player_id: Option<PlayerId>,
}

/// Cloneable front door to the hub, handed to every connection task.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    game: Arc<RwLock<Game>>,
    clock: Arc<dyn Clock>,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    /// Allocate a fresh connection id.
    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Shared game aggregate.
    pub fn game(&self) -> &Arc<RwLock<Game>> {
        &self.game
    }

    /// Time source shared with the hub.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Queue a command. Returns false if the hub has stopped.
    pub async fn submit(&self, command: HubCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Register a connection's outbound queue.
    pub async fn register(&self, id: ConnectionId, sender: mpsc::Sender<String>) -> bool {
        self.submit(HubCommand::Register { id, sender }).await
    }

    /// Unregister a connection.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        self.submit(HubCommand::Unregister { id }).await
    }

    /// Join on behalf of a connection. `None` if the hub has stopped.
    pub async fn join(
        &self,
        id: ConnectionId,
        player_id: PlayerId,
        nickname: String,
    ) -> Option<Result<JoinOutcome, GameError>> {
        let (reply, verdict) = oneshot::channel();
        if !self.submit(HubCommand::Join { id, player_id, nickname, reply }).await {
            return None;
        }
        verdict.await.ok()
    }

    /// Fan a message out to every connection.
    pub async fn broadcast(&self, message: ServerMessage) -> bool {
        self.submit(HubCommand::Broadcast(message)).await
    }
}

/// The coordination hub.
pub struct Hub {
    game: Arc<RwLock<Game>>,
    clock: Arc<dyn Clock>,
    connections: BTreeMap<ConnectionId, Connection>,
    commands: mpsc::Receiver<HubCommand>,
    tick_interval: Duration,
}

impl Hub {
    /// Create a hub and the handle connection tasks use to reach it.
    pub fn new(game: Arc<RwLock<Game>>, clock: Arc<dyn Clock>, tick_interval: Duration) -> (Self, HubHandle) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);

        let handle = HubHandle {
            commands: commands_tx,
            game: game.clone(),
            clock: clock.clone(),
            next_id: Arc::new(AtomicU64::new(1)),
        };

        let hub = Self {
            game,
            clock,
            connections: BTreeMap::new(),
            commands: commands_rx,
            tick_interval,
        };

        (hub, handle)
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Run until shutdown is signalled or every handle is dropped.
    #[instrument(skip(self, shutdown))]
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Hub running, tick every {:?}", self.tick_interval);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            info!("All hub handles dropped");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    info!("Hub shutting down");
                    break;
                }
            }
        }

        // Dropping the senders closes every writer
        self.connections.clear();
    }

    async fn handle_command(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { id, sender } => {
                self.connections.insert(id, Connection { sender, player_id: None });
                info!("Connection {} registered ({} live)", id, self.connections.len());
                self.broadcast_player_count();
            }
            HubCommand::Unregister { id } => {
                let Some(connection) = self.connections.remove(&id) else {
                    debug!("Connection {} already gone", id);
                    return;
                };
                info!("Connection {} unregistered ({} live)", id, self.connections.len());
                if let Some(player_id) = connection.player_id {
                    self.player_disconnected(&player_id).await;
                }
                self.broadcast_player_count();
            }
            HubCommand::Join { id, player_id, nickname, reply } => {
                let result = self.join(id, player_id, nickname).await;
                // Reader may have gone away meanwhile
                let _ = reply.send(result);
            }
            HubCommand::Broadcast(message) => self.broadcast(&message),
        }
    }

    async fn join(
        &mut self,
        id: ConnectionId,
        player_id: PlayerId,
        nickname: String,
    ) -> Result<JoinOutcome, GameError> {
        let now = self.clock.now();
        let result = self.game.write().await.join(player_id.clone(), nickname.clone(), now);

        match &result {
            Ok(outcome) => {
                if let Some(connection) = self.connections.get_mut(&id) {
                    connection.player_id = Some(player_id.clone());
                }
                self.send(
                    id,
                    &ServerMessage::JoinAck {
                        nickname: nickname.clone(),
                        player_id: player_id.clone(),
                    },
                );
                self.broadcast(&ServerMessage::PlayerJoinedLobby {
                    player_id,
                    player_name: nickname,
                    player_number: outcome.slot,
                });
            }
            Err(e) => {
                info!("Join refused for {} ({}): {}", nickname, player_id, e);
                self.send(
                    id,
                    &ServerMessage::JoinError {
                        error: e.to_string(),
                        nickname,
                        player_id,
                    },
                );
            }
        }

        result
    }

    /// Start the grace period unless another live connection holds the seat.
    async fn player_disconnected(&mut self, player_id: &PlayerId) {
        let still_connected = self
            .connections
            .values()
            .any(|c| c.player_id.as_ref() == Some(player_id));
        if still_connected {
            debug!("Player {} still has a live connection", player_id);
            return;
        }

        let now = self.clock.now();
        self.game.write().await.mark_disconnected(player_id, now);
    }

    /// Advance the game one step and broadcast the snapshot.
    async fn tick(&mut self) {
        let now = self.clock.now();
        let wall_now = self.clock.wall_now();

        let snapshot = {
            let mut game = self.game.write().await;
            let result = tick(&mut game, now);
            for event in &result.events {
                debug!("{}", event);
            }
            GameStateUpdate::capture(&game, now, wall_now)
        };

        let message = ServerMessage::GameState { state: Box::new(snapshot) };
        match message.to_json() {
            Ok(text) => {
                #[cfg(feature = "debug-tracing")]
                tracing::trace!("Snapshot {} bytes to {} connections", text.len(), self.connections.len());
                self.broadcast_text(&text);
            }
            Err(e) => error!("Failed to serialize game state, skipping broadcast: {}", e),
        }
    }

    fn broadcast_player_count(&mut self) {
        let message = ServerMessage::PlayerCount { count: self.connections.len() };
        self.broadcast(&message);
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        match message.to_json() {
            Ok(text) => self.broadcast_text(&text),
            Err(e) => error!("Failed to serialize broadcast: {}", e),
        }
    }

    fn send(&mut self, id: ConnectionId, message: &ServerMessage) {
        match message.to_json() {
            Ok(text) => self.deliver(id, text),
            Err(e) => error!("Failed to serialize message for {}: {}", id, e),
        }
    }

    fn broadcast_text(&mut self, text: &str) {
        let dropped: Vec<(ConnectionId, &'static str)> = self
            .connections
            .iter()
            .filter_map(|(id, c)| match c.sender.try_send(text.to_string()) {
                Ok(()) => None,
                Err(e) => Some((*id, queue_failure(&e))),
            })
            .collect();

        for (id, reason) in dropped {
            self.drop_connection(id, reason);
        }
    }

    fn deliver(&mut self, id: ConnectionId, text: String) {
        let Some(connection) = self.connections.get(&id) else {
            debug!("Connection {} gone, message discarded", id);
            return;
        };
        if let Err(e) = connection.sender.try_send(text) {
            let reason = queue_failure(&e);
            self.drop_connection(id, reason);
        }
    }

    fn drop_connection(&mut self, id: ConnectionId, reason: &str) {
        if self.connections.remove(&id).is_some() {
            warn!("Dropping connection {}: outbound queue {}", id, reason);
        }
    }
}

fn queue_failure<T>(error: &TrySendError<T>) -> &'static str {
    match error {
        TrySendError::Full(_) => "full",
        TrySendError::Closed(_) => "closed",
    }
}

// =============================================================================
// TESTS
// =============================================================================
