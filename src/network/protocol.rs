//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame carries newline-delimited JSON. Inbound frames are
//! `{type, playerId, payload}` envelopes decoded by tag into a closed
//! set of [`ClientMessage`] variants; outbound messages are flat objects
//! tagged with `type`.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::clock::to_wall_time;
use crate::core::position::Direction;
use crate::game::bomb::{Bomb, Explosion};
use crate::game::map::GameMap;
use crate::game::player::{Player, PlayerId};
use crate::game::powerup::PowerUp;
use crate::game::state::{ErrorKind, Game, SessionPhase};

// =============================================================================
// ERRORS
// =============================================================================

/// Inbound decoding failures. All of them are [`ErrorKind::MalformedInput`].
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Not a JSON envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    /// Envelope tag not recognised.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// Payload does not match the tag's shape.
    #[error("bad {kind} payload: {source}")]
    BadPayload {
        /// Envelope tag
        kind: &'static str,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// Action name not recognised.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// Message needs an identity and carried none.
    #[error("missing playerId")]
    MissingPlayerId,
}

impl ProtocolError {
    /// Taxonomy bucket.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedInput
    }
}

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Raw inbound envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Message tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Sender identity, may be empty
    #[serde(rename = "playerId", default)]
    pub player_id: String,
    /// Tag-specific body
    #[serde(default)]
    pub payload: Value,
}

#[derive(Deserialize)]
struct JoinPayload {
    nickname: String,
}

#[derive(Deserialize)]
struct ChatPayload {
    message: String,
}

#[derive(Deserialize)]
struct ActionPayload {
    #[serde(rename = "playerId", default)]
    player_id: String,
    action: String,
}

/// A discrete player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    /// Move one tile up
    MoveUp,
    /// Move one tile down
    MoveDown,
    /// Move one tile left
    MoveLeft,
    /// Move one tile right
    MoveRight,
    /// Arm a bomb on the current tile
    PlaceBomb,
}

impl PlayerAction {
    /// Movement direction, or `None` for non-movement actions.
    pub fn direction(self) -> Option<Direction> {
        match self {
            PlayerAction::MoveUp => Some(Direction::Up),
            PlayerAction::MoveDown => Some(Direction::Down),
            PlayerAction::MoveLeft => Some(Direction::Left),
            PlayerAction::MoveRight => Some(Direction::Right),
            PlayerAction::PlaceBomb => None,
        }
    }
}

impl FromStr for PlayerAction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move_up" => Ok(PlayerAction::MoveUp),
            "move_down" => Ok(PlayerAction::MoveDown),
            "move_left" => Ok(PlayerAction::MoveLeft),
            "move_right" => Ok(PlayerAction::MoveRight),
            "place_bomb" => Ok(PlayerAction::PlaceBomb),
            other => Err(ProtocolError::UnknownAction(other.to_string())),
        }
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Take (or retake) a seat.
    Join {
        /// Client-chosen identity
        player_id: PlayerId,
        /// Display name
        nickname: String,
    },

    /// Chat line for everyone.
    Chat {
        /// Sender identity from the envelope, may be empty
        player_id: PlayerId,
        /// Text
        message: String,
    },

    /// Gameplay intent.
    Action {
        /// Actor
        player_id: PlayerId,
        /// What to do
        action: PlayerAction,
    },

    /// Ask for a session reset.
    RestartGame {
        /// Requester, may be empty
        player_id: PlayerId,
    },
}

impl ClientMessage {
    /// Decode one envelope.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(s).map_err(ProtocolError::MalformedEnvelope)?;
        Self::from_envelope(envelope)
    }

    /// Dispatch an envelope on its tag and decode the payload.
    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let Envelope { kind, player_id, payload } = envelope;

        match kind.as_str() {
            "join" => {
                let body: JoinPayload = decode_payload("join", payload)?;
                if player_id.is_empty() {
                    return Err(ProtocolError::MissingPlayerId);
                }
                Ok(ClientMessage::Join {
                    player_id: PlayerId(player_id),
                    nickname: body.nickname,
                })
            }
            "chat" => {
                let body: ChatPayload = decode_payload("chat", payload)?;
                Ok(ClientMessage::Chat {
                    player_id: PlayerId(player_id),
                    message: body.message,
                })
            }
            "action" => {
                let body: ActionPayload = decode_payload("action", payload)?;
                let action = body.action.parse::<PlayerAction>()?;
                // Payload identity wins, envelope identity is the fallback
                let actor = if body.player_id.is_empty() { player_id } else { body.player_id };
                if actor.is_empty() {
                    return Err(ProtocolError::MissingPlayerId);
                }
                Ok(ClientMessage::Action {
                    player_id: PlayerId(actor),
                    action,
                })
            }
            "restart_game" => Ok(ClientMessage::RestartGame {
                player_id: PlayerId(player_id),
            }),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

fn decode_payload<T: DeserializeOwned>(kind: &'static str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::BadPayload { kind, source })
}

/// Split a text frame into its non-blank lines.
pub fn split_frame(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Realtime join accepted.
    JoinAck {
        /// Display name
        nickname: String,
        /// Seated identity
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },

    /// Realtime join refused.
    JoinError {
        /// Human-readable reason
        error: String,
        /// Requested display name
        nickname: String,
        /// Requested identity
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },

    /// Chat line.
    Chat {
        /// Sender identity
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        /// Sender display name
        #[serde(rename = "playerName")]
        player_name: String,
        /// Sender seat, 0 if unseated
        #[serde(rename = "playerNumber")]
        player_number: u8,
        /// Text
        message: String,
        /// Server receive time
        timestamp: DateTime<Utc>,
    },

    /// A new seat was taken.
    PlayerJoinedLobby {
        /// Seated identity
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        /// Display name
        #[serde(rename = "playerName")]
        player_name: String,
        /// Seat number
        #[serde(rename = "playerNumber")]
        player_number: u8,
    },

    /// Live connection count.
    PlayerCount {
        /// Connections registered with the hub
        count: usize,
    },

    /// Full snapshot, sent every tick.
    #[serde(rename = "gameState")]
    GameState {
        /// Snapshot body
        state: Box<GameStateUpdate>,
    },
}

impl ServerMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The grid together with the slot-ordered player list.
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    /// Tile grid
    #[serde(flatten)]
    pub grid: GameMap,
    /// Players in slot order
    pub players: Vec<Player>,
}

/// An explosion with its wall-clock creation time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplosionView {
    /// Footprint and owner
    #[serde(flatten)]
    pub explosion: Explosion,
    /// When it went off
    pub created_at: DateTime<Utc>,
}

/// Snapshot of the whole session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateUpdate {
    /// Session phase code
    pub state: SessionPhase,
    /// Players in slot order
    pub players: Vec<Player>,
    /// Armed bombs
    pub bombs: Vec<Bomb>,
    /// Power-ups by id
    pub power_ups: BTreeMap<String, PowerUp>,
    /// Grid plus players
    pub map: MapView,
    /// Explosions still on display
    pub explosions: Vec<ExplosionView>,
    /// Whole seconds left on the countdown (Countdown only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<u64>,
    /// Whole seconds since play started (Running only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<u64>,
    /// Lobby deadline in Unix milliseconds, when armed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lobby_join_end_time: Option<i64>,
    /// Player count at the start of play, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_player_count: Option<usize>,
}

impl GameStateUpdate {
    /// Capture the session as of `now`.
    pub fn capture(game: &Game, now: Instant, wall_now: DateTime<Utc>) -> Self {
        let players: Vec<Player> = game.players_in_slot_order().into_iter().cloned().collect();
        let phase = game.phase();

        let countdown = match phase {
            SessionPhase::Countdown => game.countdown_remaining(now).map(|left| left.as_secs()),
            _ => None,
        };
        let elapsed_time = match phase {
            SessionPhase::Running => game.elapsed(now).map(|elapsed| elapsed.as_secs()),
            _ => None,
        };
        let lobby_join_end_time = game
            .lobby_deadline()
            .map(|deadline| to_wall_time(deadline, now, wall_now).timestamp_millis());
        let initial_player_count = Some(game.initial_player_count()).filter(|count| *count > 0);

        Self {
            state: phase,
            players: players.clone(),
            bombs: game.bombs().cloned().collect(),
            power_ups: game.power_ups().clone(),
            map: MapView {
                grid: game.map().clone(),
                players,
            },
            explosions: game
                .explosions()
                .iter()
                .map(|timed| ExplosionView {
                    explosion: timed.explosion.clone(),
                    created_at: to_wall_time(timed.created_at, now, wall_now),
                })
                .collect(),
            countdown,
            elapsed_time,
            lobby_join_end_time,
            initial_player_count,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
