//! Bombs and Explosion Records

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::position::Position;
use crate::game::map::GameMap;
use crate::game::explosion::compute_footprint;
use crate::game::player::PlayerId;
use crate::BOMB_FUSE;

/// An armed bomb.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bomb {
    /// Identity
    pub id: String,
    /// Tile it sits on
    pub position: Position,
    /// Blast reach, copied from the owner when placed
    pub power: i32,
    /// Owner
    pub player_id: PlayerId,
    /// When it was placed
    #[serde(skip)]
    pub placed_at: Instant,
    /// Time from placement to detonation
    #[serde(skip)]
    pub fuse: Duration,
}

impl Bomb {
    /// Arm a bomb with the standard fuse.
    pub fn new(position: Position, power: i32, player_id: PlayerId, placed_at: Instant) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            position,
            power,
            player_id,
            placed_at,
            fuse: BOMB_FUSE,
        }
    }

    /// Whether the fuse has run out at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.placed_at) >= self.fuse
    }

    /// Compute this bomb's explosion against the current grid.
    pub fn explode(&self, map: &GameMap) -> Explosion {
        Explosion {
            center: self.position,
            range: self.power,
            tiles: compute_footprint(map, self.position, self.power),
            player_id: self.player_id.clone(),
        }
    }
}

/// The footprint of one detonation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Explosion {
    /// Bomb tile
    pub center: Position,
    /// Blast power
    pub range: i32,
    /// Affected tiles, center first
    pub tiles: Vec<Position>,
    /// Owner of the bomb
    pub player_id: PlayerId,
}

impl Explosion {
    /// Whether `pos` is inside the footprint.
    pub fn covers(&self, pos: Position) -> bool {
        self.tiles.contains(&pos)
    }
}

/// An explosion kept around briefly for display.
#[derive(Clone, Debug)]
pub struct TimedExplosion {
    /// The explosion
    pub explosion: Explosion,
    /// When it went off
    pub created_at: Instant,
}

impl TimedExplosion {
    /// Whether it has outlived `lifetime` at `now`.
    pub fn is_expired(&self, now: Instant, lifetime: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= lifetime
    }
}
