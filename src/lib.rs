//! # Bomberman Arena Server
//!
//! Authoritative real-time core for a 4-player grid arena game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   BOMBERMAN ARENA SERVER                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── position.rs - Grid coordinates and directions           │
//! │  ├── rng.rs      - Seedable Xorshift128+ / scripted rolls    │
//! │  └── clock.rs    - Injectable monotonic + wall clock         │
//! │                                                              │
//! │  game/           - Session rules (no I/O)                    │
//! │  ├── map.rs      - 15x15 arena grid                          │
//! │  ├── player.rs   - Seated players, spawn table               │
//! │  ├── bomb.rs     - Bombs and explosion records               │
//! │  ├── explosion.rs- Blast footprint and effects               │
//! │  ├── powerup.rs  - Power-up drops and effects                │
//! │  ├── state.rs    - Game aggregate and intents                │
//! │  ├── tick.rs     - Per-tick state machine step               │
//! │  └── events.rs   - Tick events for logging                   │
//! │                                                              │
//! │  network/        - Networking                                │
//! │  ├── protocol.rs - JSON envelopes and snapshots              │
//! │  ├── hub.rs      - Connection set, tick loop, fan-out        │
//! │  ├── server.rs   - axum router, WebSocket connections        │
//! │  └── http.rs     - Join / status handlers, CORS layer        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! One hub task owns the connection set and ticks the game every
//! [`TICK_INTERVAL`]. Each connection runs a reader and a writer task
//! that talk to the hub over bounded channels. The [`game::Game`]
//! aggregate sits behind a `tokio::sync::RwLock`, locked for one call
//! at a time and never across an `.await` on the network.
//!
//! Outbound delivery never blocks the hub: a connection whose queue is
//! full is dropped.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

use std::time::Duration;

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::clock::{Clock, ManualClock, SystemClock};
pub use core::position::{Direction, Position};
pub use core::rng::{DeterministicRng, RandomSource};
pub use game::state::{Game, GameError, SessionPhase};
pub use game::player::PlayerId;
pub use network::hub::{Hub, HubHandle};
pub use network::server::{GameServer, ServerConfig, ServerError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation and broadcast period (20 Hz)
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Lobby join window, armed when the second player joins
pub const LOBBY_JOIN_WINDOW: Duration = Duration::from_secs(20);

/// Countdown before play starts
pub const COUNTDOWN: Duration = Duration::from_secs(10);

/// Delay between Finished and the full reset
pub const RESET_COUNTDOWN: Duration = Duration::from_secs(5);

/// Bomb fuse
pub const BOMB_FUSE: Duration = Duration::from_secs(3);

/// How long an explosion stays in snapshots
pub const EXPLOSION_LIFETIME: Duration = Duration::from_millis(500);

/// Seat preserved this long after a disconnect
pub const DISCONNECT_GRACE: Duration = Duration::from_secs(10);

/// Seats per session
pub const MAX_PLAYERS: usize = 4;

/// Lives at spawn
pub const MAX_LIVES: u8 = 3;

/// Chance (percent) that destroyed rubble drops a power-up
pub const POWER_UP_SPAWN_PERCENT: u32 = 30;
