//! Player State
//!
//! A seated player and the handful of mutators the rules need.

use std::fmt;
use std::time::Instant;
use serde::Serialize;

use crate::core::position::{Direction, Position};
use crate::game::powerup::PowerUpKind;
use crate::MAX_LIVES;

/// Spawn coordinate for each seat, slot 1 first.
pub const SPAWN_POINTS: [Position; 4] = [
    Position::new(1, 2),
    Position::new(13, 2),
    Position::new(1, 12),
    Position::new(13, 12),
];

/// Discrete speed steps. The last one is the cap.
pub const SPEED_LADDER: [f32; 4] = [1.0, 1.5, 2.0, 2.5];

/// Spawn coordinate of a 1-based slot.
pub fn spawn_point(slot: u8) -> Option<Position> {
    let index = usize::from(slot).checked_sub(1)?;
    SPAWN_POINTS.get(index).copied()
}

/// Client-chosen player identity.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Fresh random identity (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// True for the empty identity.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A seated player.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Identity
    pub id: PlayerId,

    /// Display name
    pub nickname: String,

    /// Current tile
    pub position: Position,

    /// Remaining lives (0 = eliminated)
    pub lives: u8,

    /// Movement speed multiplier
    pub speed: f32,

    /// Max simultaneously armed bombs
    pub max_bombs: u32,

    /// Blast power of newly placed bombs
    pub bomb_power: i32,

    /// Bombs currently armed
    pub active_bombs: u32,

    /// Facing, unset until the first accepted move
    pub direction: Option<Direction>,

    /// Seat number, 1..=4
    #[serde(rename = "number")]
    pub slot: u8,

    /// Has a live connection (server-side only)
    #[serde(skip)]
    pub is_connected: bool,

    /// When the connection dropped, cleared once the grace period fires
    #[serde(skip)]
    pub disconnected_at: Option<Instant>,
}

impl Player {
    /// Create a player with default stats at `position`.
    pub fn new(id: PlayerId, nickname: String, slot: u8, position: Position) -> Self {
        Self {
            id,
            nickname,
            position,
            lives: MAX_LIVES,
            speed: SPEED_LADDER[0],
            max_bombs: 1,
            bomb_power: 1,
            active_bombs: 0,
            direction: None,
            slot,
            is_connected: true,
            disconnected_at: None,
        }
    }

    /// Still in the game.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.lives > 0
    }

    /// Room for another armed bomb.
    #[inline]
    pub fn can_place_bomb(&self) -> bool {
        self.active_bombs < self.max_bombs
    }

    /// Record a newly armed bomb. Returns false at the limit.
    pub fn arm_bomb(&mut self) -> bool {
        if !self.can_place_bomb() {
            return false;
        }
        self.active_bombs += 1;
        true
    }

    /// One of this player's bombs went off.
    pub fn bomb_exploded(&mut self) {
        self.active_bombs = self.active_bombs.saturating_sub(1);
    }

    /// Take one hit. Returns true if this hit eliminated the player.
    pub fn hit(&mut self) -> bool {
        let was_alive = self.is_alive();
        self.lives = self.lives.saturating_sub(1);
        was_alive && !self.is_alive()
    }

    /// Apply a collected power-up. Each application advances one step.
    pub fn apply_power_up(&mut self, kind: PowerUpKind) {
        match kind {
            PowerUpKind::Speed => {
                self.speed = SPEED_LADDER
                    .iter()
                    .copied()
                    .find(|step| *step > self.speed)
                    .unwrap_or(SPEED_LADDER[SPEED_LADDER.len() - 1]);
            }
            PowerUpKind::ExtraBomb => self.max_bombs += 1,
            PowerUpKind::ExtraPower => self.bomb_power += 1,
        }
    }

    /// Mark as disconnected at `now`.
    pub fn mark_disconnected(&mut self, now: Instant) {
        self.is_connected = false;
        self.disconnected_at = Some(now);
    }

    /// Mark as connected again, cancelling any grace timer.
    pub fn mark_connected(&mut self) {
        self.is_connected = true;
        self.disconnected_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_player() -> Player {
        Player::new(PlayerId::from("p1"), "alice".to_string(), 1, SPAWN_POINTS[0])
    }

    #[test]
    fn test_defaults() {
        let player = test_player();
        assert_eq!(player.lives, MAX_LIVES);
        assert_eq!(player.speed, 1.0);
        assert_eq!(player.max_bombs, 1);
        assert_eq!(player.bomb_power, 1);
        assert_eq!(player.active_bombs, 0);
        assert!(player.is_connected);
        assert!(player.direction.is_none());
    }

    #[test]
    fn test_spawn_point_lookup() {
        assert_eq!(spawn_point(1), Some(Position::new(1, 2)));
        assert_eq!(spawn_point(4), Some(Position::new(13, 12)));
        assert_eq!(spawn_point(0), None);
        assert_eq!(spawn_point(5), None);
    }

    #[test]
    fn test_bomb_accounting() {
        let mut player = test_player();
        assert!(player.arm_bomb());
        assert!(!player.arm_bomb());
        assert_eq!(player.active_bombs, 1);

        player.bomb_exploded();
        assert_eq!(player.active_bombs, 0);

        // Never goes negative
        player.bomb_exploded();
        assert_eq!(player.active_bombs, 0);
    }

    #[test]
    fn test_hit_until_eliminated() {
        let mut player = test_player();
        assert!(!player.hit());
        assert!(!player.hit());
        assert!(player.hit());
        assert_eq!(player.lives, 0);
        assert!(!player.is_alive());

        // Further hits do nothing
        assert!(!player.hit());
        assert_eq!(player.lives, 0);
    }

    #[test]
    fn test_speed_ladder_caps() {
        let mut player = test_player();
        let mut seen = Vec::new();
        for _ in 0..6 {
            player.apply_power_up(PowerUpKind::Speed);
            seen.push(player.speed);
        }
        assert_eq!(seen, vec![1.5, 2.0, 2.5, 2.5, 2.5, 2.5]);
    }

    #[test]
    fn test_bomb_and_power_upgrades() {
        let mut player = test_player();
        player.apply_power_up(PowerUpKind::ExtraBomb);
        player.apply_power_up(PowerUpKind::ExtraPower);
        player.apply_power_up(PowerUpKind::ExtraPower);
        assert_eq!(player.max_bombs, 2);
        assert_eq!(player.bomb_power, 3);
    }

    #[test]
    fn test_disconnect_and_reconnect() {
        let mut player = test_player();
        let now = Instant::now();

        player.mark_disconnected(now);
        assert!(!player.is_connected);
        assert_eq!(player.disconnected_at, Some(now));

        player.mark_connected();
        assert!(player.is_connected);
        assert!(player.disconnected_at.is_none());
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(test_player()).unwrap();
        assert_eq!(json["id"], "p1");
        assert_eq!(json["nickname"], "alice");
        assert_eq!(json["number"], 1);
        assert_eq!(json["maxBombs"], 1);
        assert_eq!(json["position"]["x"], 1);
        assert!(json.get("isConnected").is_none());
        assert!(json.get("disconnectedAt").is_none());
    }
}
