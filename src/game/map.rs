//! Arena Grid
//!
//! Fixed 15x15 tile grid generated from a deterministic template.
//! Border and pillar cells are indestructible, the interior is
//! destructible, and four corner pockets stay open for spawns.

use serde::{Serialize, Serializer};

use crate::core::position::Position;

/// Grid width in tiles.
pub const MAP_WIDTH: i32 = 15;

/// Grid height in tiles.
pub const MAP_HEIGHT: i32 = 15;

/// Template rows: `#` indestructible, `*` destructible, ` ` empty.
const LAYOUT: [&str; MAP_HEIGHT as usize] = [
    "###############",
    "###############",
    "#  *********  #",
    "# #*#*#*#*#*# #",
    "#*************#",
    "#*#*#*#*#*#*#*#",
    "#*************#",
    "#*#*#*#*#*#*#*#",
    "#*************#",
    "#*#*#*#*#*#*#*#",
    "#*************#",
    "# #*#*#*#*#*# #",
    "#  *********  #",
    "###############",
    "###############",
];

/// Classification of a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TileKind {
    /// Walkable, lets blasts through.
    #[default]
    Empty = 0,
    /// Rubble: blocks movement, consumed by a blast.
    DestructibleWall = 2,
    /// Blocks movement and blasts.
    IndestructibleWall = 3,
}

impl TileKind {
    /// Wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    fn from_template(c: char) -> TileKind {
        match c {
            '#' => TileKind::IndestructibleWall,
            '*' => TileKind::DestructibleWall,
            _ => TileKind::Empty,
        }
    }
}

impl Serialize for TileKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// The arena grid, indexed `blocks[y][x]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameMap {
    blocks: Vec<Vec<TileKind>>,
}

impl GameMap {
    /// Generate a fresh grid from the template.
    pub fn new() -> Self {
        let blocks = LAYOUT
            .iter()
            .map(|row| row.chars().map(TileKind::from_template).collect())
            .collect();
        Self { blocks }
    }

    /// Whether `pos` lies inside `[0, width) x [0, height)`.
    #[inline]
    pub fn is_valid_position(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < MAP_WIDTH && pos.y >= 0 && pos.y < MAP_HEIGHT
    }

    /// Tile at `pos`, or `None` when out of bounds.
    pub fn tile(&self, pos: Position) -> Option<TileKind> {
        if !self.is_valid_position(pos) {
            return None;
        }
        Some(self.blocks[pos.y as usize][pos.x as usize])
    }

    /// Overwrite a tile. Out-of-bounds writes are ignored.
    pub fn set_tile(&mut self, pos: Position, kind: TileKind) {
        if self.is_valid_position(pos) {
            self.blocks[pos.y as usize][pos.x as usize] = kind;
        }
    }

    /// In bounds and walkable.
    pub fn is_empty(&self, pos: Position) -> bool {
        self.tile(pos) == Some(TileKind::Empty)
    }

    /// In bounds and rubble.
    pub fn is_destructible(&self, pos: Position) -> bool {
        self.tile(pos) == Some(TileKind::DestructibleWall)
    }

    /// In bounds and solid.
    pub fn is_indestructible(&self, pos: Position) -> bool {
        self.tile(pos) == Some(TileKind::IndestructibleWall)
    }

    /// Turn rubble into an empty tile. Returns false if `pos` was not rubble.
    pub fn destroy_block(&mut self, pos: Position) -> bool {
        if !self.is_destructible(pos) {
            return false;
        }
        self.set_tile(pos, TileKind::Empty);
        true
    }
}

impl Default for GameMap {
    fn default() -> Self {
        Self::new()
    }
}
