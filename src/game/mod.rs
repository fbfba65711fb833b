//! Game Logic Module
//!
//! The authoritative session: grid, entities and the state machine.
//! Nothing in here touches the network or reads the system clock.
//!
//! ## Module Structure
//!
//! - `map`: Arena grid and tile classification
//! - `player`: Seated players, spawn table, speed ladder
//! - `bomb`: Armed bombs and explosion records
//! - `explosion`: Blast footprint and its effects
//! - `powerup`: Power-up kinds and drop rolls
//! - `state`: The `Game` aggregate and its intent methods
//! - `tick`: Per-tick step that drives the state machine
//! - `events`: What happened during a tick, for logging

pub mod bomb;
pub mod events;
pub mod explosion;
pub mod map;
pub mod player;
pub mod powerup;
pub mod state;
pub mod tick;

// Re-export key types
pub use bomb::{Bomb, Explosion, TimedExplosion};
pub use events::{EliminationCause, GameEvent, TickResult};
pub use map::{GameMap, TileKind};
pub use player::{Player, PlayerId};
pub use powerup::{PowerUp, PowerUpKind};
pub use state::{ErrorKind, Game, GameError, JoinOutcome, MoveOutcome, SessionPhase};
pub use tick::tick;
