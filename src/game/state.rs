//! Game Aggregate
//!
//! The single session: grid, players, bombs, power-ups, live explosions
//! and the session state machine's deadlines. Phase transitions happen
//! only in [`crate::game::tick::tick`]; the intent methods here validate
//! and mutate entities, and at most arm or clear a deadline.
//!
//! Uses BTreeMap so snapshots and detonation order are stable.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::core::position::{Direction, Position};
use crate::core::rng::{DeterministicRng, RandomSource};
use crate::game::bomb::{Bomb, TimedExplosion};
use crate::game::map::GameMap;
use crate::game::player::{spawn_point, Player, PlayerId};
use crate::game::powerup::{PowerUp, PowerUpKind};
use crate::{LOBBY_JOIN_WINDOW, MAX_LIVES, MAX_PLAYERS, RESET_COUNTDOWN};

// =============================================================================
// SESSION PHASE
// =============================================================================

/// Session state machine.
///
/// `Waiting -> Countdown -> Running -> Finished -> Resetting -> Waiting`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SessionPhase {
    /// Lobby open, accepting joins
    #[default]
    Waiting = 0,
    /// Fixed countdown before play
    Countdown = 1,
    /// Bombs tick, players fight
    Running = 2,
    /// At most one player left; lasts a single tick
    Finished = 3,
    /// Waiting out the reset deadline
    Resetting = 4,
}

impl SessionPhase {
    /// Wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether a transition `self -> next` is one of the documented edges.
    ///
    /// Any phase may move to `Resetting` on an explicit reset request.
    pub fn can_transition_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, next),
            (Waiting, Countdown)
                | (Countdown, Running)
                | (Running, Finished)
                | (Finished, Resetting)
                | (Resetting, Waiting)
                | (Waiting, Resetting)
                | (Countdown, Resetting)
                | (Running, Resetting)
        )
    }
}

impl Serialize for SessionPhase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error taxonomy shared by every surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// No seat or bomb slot available
    Capacity,
    /// Not allowed in the current session state
    State,
    /// Unknown player
    NotFound,
    /// Undecodable input
    MalformedInput,
}

/// Errors returned by the aggregate's intent methods.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// All seats taken.
    #[error("lobby is full")]
    LobbyFull,

    /// Slot counter ran past the spawn table.
    #[error("no slot available")]
    NoSlotAvailable,

    /// Join attempted during Countdown, Running or Finished.
    #[error("game has already started or is finished")]
    AlreadyStarted,

    /// Join attempted while a reset is pending.
    #[error("game is resetting")]
    Resetting,

    /// Lobby deadline passed.
    #[error("lobby join window has closed")]
    JoinWindowClosed,

    /// Action for an unseated player id.
    #[error("player not found")]
    PlayerNotFound,

    /// Armed-bomb count already at the player's limit.
    #[error("cannot place more bombs")]
    BombLimitReached,
}

impl GameError {
    /// Taxonomy bucket.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::LobbyFull | GameError::NoSlotAvailable | GameError::BombLimitReached => {
                ErrorKind::Capacity
            }
            GameError::AlreadyStarted | GameError::Resetting | GameError::JoinWindowClosed => {
                ErrorKind::State
            }
            GameError::PlayerNotFound => ErrorKind::NotFound,
        }
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Successful join.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Seated identity
    pub player_id: PlayerId,
    /// Seat number
    pub slot: u8,
    /// Identity was already seated
    pub rejoined: bool,
}

/// Result of an accepted or refused move.
#[derive(Clone, Debug, PartialEq)]
pub enum MoveOutcome {
    /// Destination out of bounds or not walkable
    Blocked,
    /// Player moved
    Moved {
        /// New tile
        to: Position,
        /// Power-up consumed on arrival
        collected: Option<PowerUpKind>,
    },
}

// =============================================================================
// GAME
// =============================================================================

/// The one game session of this process.
pub struct Game {
    pub(crate) map: GameMap,
    pub(crate) players: BTreeMap<PlayerId, Player>,
    pub(crate) bombs: BTreeMap<String, Bomb>,
    pub(crate) power_ups: BTreeMap<String, PowerUp>,
    pub(crate) explosions: Vec<TimedExplosion>,
    pub(crate) phase: SessionPhase,
    pub(crate) started_at: Option<Instant>,
    pub(crate) lobby_deadline: Option<Instant>,
    pub(crate) countdown_deadline: Option<Instant>,
    pub(crate) reset_deadline: Option<Instant>,
    pub(crate) next_slot: u8,
    pub(crate) initial_player_count: usize,
    pub(crate) rng: Box<dyn RandomSource>,
}

impl Game {
    /// Create a session seeded from entropy.
    pub fn new() -> Self {
        Self::with_rng(Box::new(DeterministicRng::from_entropy()))
    }

    /// Create a session with an explicit random source.
    pub fn with_rng(rng: Box<dyn RandomSource>) -> Self {
        Self {
            map: GameMap::new(),
            players: BTreeMap::new(),
            bombs: BTreeMap::new(),
            power_ups: BTreeMap::new(),
            explosions: Vec::new(),
            phase: SessionPhase::Waiting,
            started_at: None,
            lobby_deadline: None,
            countdown_deadline: None,
            reset_deadline: None,
            next_slot: 1,
            initial_player_count: 0,
            rng,
        }
    }

    // -------------------------------------------------------------------------
    // Intents
    // -------------------------------------------------------------------------

    /// Seat a new player or refresh a returning one.
    ///
    /// A returning identity always succeeds: nickname and connectivity are
    /// refreshed, and during Waiting lives are restored to full.
    pub fn join(&mut self, id: PlayerId, nickname: String, now: Instant) -> Result<JoinOutcome, GameError> {
        if let Some(player) = self.players.get_mut(&id) {
            player.nickname = nickname;
            player.mark_connected();
            if self.phase == SessionPhase::Waiting {
                player.lives = MAX_LIVES;
            }
            info!("Player {} rejoined slot {} ({} lives)", id, player.slot, player.lives);
            return Ok(JoinOutcome {
                player_id: id,
                slot: player.slot,
                rejoined: true,
            });
        }

        match self.phase {
            SessionPhase::Waiting => {}
            SessionPhase::Countdown | SessionPhase::Running | SessionPhase::Finished => {
                return Err(GameError::AlreadyStarted);
            }
            SessionPhase::Resetting => return Err(GameError::Resetting),
        }

        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::LobbyFull);
        }

        if self.lobby_deadline.is_some_and(|deadline| now >= deadline) {
            return Err(GameError::JoinWindowClosed);
        }

        let slot = self.next_slot;
        let spawn = spawn_point(slot).ok_or(GameError::NoSlotAvailable)?;
        self.next_slot += 1;

        let player = Player::new(id.clone(), nickname, slot, spawn);
        info!("Assigned {} ({}) -> slot {} at {:?}", player.nickname, id, slot, spawn);
        self.players.insert(id.clone(), player);

        if self.players.len() == 2 && self.lobby_deadline.is_none() {
            self.lobby_deadline = Some(now + LOBBY_JOIN_WINDOW);
            info!("Lobby join window open for {}s", LOBBY_JOIN_WINDOW.as_secs());
        }

        if self.players.len() == MAX_PLAYERS {
            // Full lobby: the next tick starts the countdown immediately
            self.lobby_deadline = None;
        }

        Ok(JoinOutcome {
            player_id: id,
            slot,
            rejoined: false,
        })
    }

    /// Move a player one tile.
    pub fn move_player(&mut self, id: &PlayerId, direction: Direction) -> Result<MoveOutcome, GameError> {
        let player = self.players.get_mut(id).ok_or(GameError::PlayerNotFound)?;
        let (dx, dy) = direction.delta();
        let to = player.position.offset(dx, dy);

        if !self.map.is_empty(to) {
            return Ok(MoveOutcome::Blocked);
        }

        player.position = to;
        player.direction = Some(direction);

        let collected_id = self
            .power_ups
            .iter()
            .find(|(_, p)| p.position == to)
            .map(|(id, _)| id.clone());

        let collected = collected_id
            .and_then(|pid| self.power_ups.remove(&pid))
            .map(|power_up| {
                player.apply_power_up(power_up.kind);
                debug!("Player {} collected {:?}", id, power_up.kind);
                power_up.kind
            });

        Ok(MoveOutcome::Moved { to, collected })
    }

    /// Arm a bomb at the player's tile. Returns the bomb id.
    pub fn place_bomb(&mut self, id: &PlayerId, now: Instant) -> Result<String, GameError> {
        let player = self.players.get_mut(id).ok_or(GameError::PlayerNotFound)?;
        if !player.arm_bomb() {
            return Err(GameError::BombLimitReached);
        }

        let bomb = Bomb::new(player.position, player.bomb_power, id.clone(), now);
        let bomb_id = bomb.id.clone();
        debug!("Player {} armed bomb {} at {:?}", id, bomb_id, bomb.position);
        self.bombs.insert(bomb_id.clone(), bomb);
        Ok(bomb_id)
    }

    /// Start a seated player's grace period. Returns false if unknown.
    pub fn mark_disconnected(&mut self, id: &PlayerId, now: Instant) -> bool {
        match self.players.get_mut(id) {
            Some(player) => {
                player.mark_disconnected(now);
                info!("Player {} disconnected, grace period started", id);
                true
            }
            None => false,
        }
    }

    /// Ask for a reset. Arms the reset deadline only if none is armed.
    ///
    /// Returns true if this call armed it.
    pub fn request_reset(&mut self, now: Instant) -> bool {
        if self.reset_deadline.is_some() {
            debug!("Reset already pending");
            return false;
        }
        self.reset_deadline = Some(now + RESET_COUNTDOWN);
        info!("Reset requested, session resets in {}s", RESET_COUNTDOWN.as_secs());
        true
    }

    /// Clear every collection and deadline and re-seed the grid.
    pub(crate) fn reset(&mut self) {
        self.map = GameMap::new();
        self.players.clear();
        self.bombs.clear();
        self.power_ups.clear();
        self.explosions.clear();
        self.started_at = None;
        self.lobby_deadline = None;
        self.countdown_deadline = None;
        self.reset_deadline = None;
        self.next_slot = 1;
        self.initial_player_count = 0;
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Seated players, including eliminated and disconnected ones.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Seated players with lives left.
    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.is_alive()).count()
    }

    /// Look up a player.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Players ordered by slot.
    pub fn players_in_slot_order(&self) -> Vec<&Player> {
        let mut ordered: Vec<&Player> = self.players.values().collect();
        ordered.sort_by_key(|p| p.slot);
        ordered
    }

    /// Armed bombs.
    pub fn bombs(&self) -> impl Iterator<Item = &Bomb> {
        self.bombs.values()
    }

    /// Power-ups on the grid, by id.
    pub fn power_ups(&self) -> &BTreeMap<String, PowerUp> {
        &self.power_ups
    }

    /// Explosions still on display.
    pub fn explosions(&self) -> &[TimedExplosion] {
        &self.explosions
    }

    /// The grid.
    pub fn map(&self) -> &GameMap {
        &self.map
    }

    /// Player count recorded when the session entered Running.
    pub fn initial_player_count(&self) -> usize {
        self.initial_player_count
    }

    /// Lobby deadline, if armed.
    pub fn lobby_deadline(&self) -> Option<Instant> {
        self.lobby_deadline
    }

    /// Countdown deadline, if armed.
    pub fn countdown_deadline(&self) -> Option<Instant> {
        self.countdown_deadline
    }

    /// Reset deadline, if armed.
    pub fn reset_deadline(&self) -> Option<Instant> {
        self.reset_deadline
    }

    /// Time left on the countdown.
    pub fn countdown_remaining(&self, now: Instant) -> Option<Duration> {
        self.countdown_deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Time since the session entered Running.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started_at.map(|start| now.saturating_duration_since(start))
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
