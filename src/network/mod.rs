//! Network Layer
//!
//! WebSocket and HTTP surface for a single arena session.
//! All rules live in `game/`; this layer only decodes intents and fans out snapshots.

pub mod http;
pub mod hub;
pub mod protocol;
pub mod server;

pub use hub::{ConnectionId, Hub, HubCommand, HubHandle};
pub use protocol::{ClientMessage, GameStateUpdate, PlayerAction, ProtocolError, ServerMessage};
pub use server::{GameServer, ServerConfig, ServerError};
