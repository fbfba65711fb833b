//! Power-Ups
//!
//! Dropped with a fixed chance when rubble is destroyed,
//! consumed when a player steps onto them.

use serde::Serialize;

use crate::core::position::Position;
use crate::core::rng::RandomSource;
use crate::POWER_UP_SPAWN_PERCENT;

/// Power-up kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PowerUpKind {
    /// One step up the speed ladder
    #[serde(rename = "speed")]
    Speed,
    /// One more simultaneous bomb
    #[serde(rename = "bomb")]
    ExtraBomb,
    /// One more tile of blast reach
    #[serde(rename = "flame")]
    ExtraPower,
}

impl PowerUpKind {
    /// Every kind, in roll order.
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::Speed,
        PowerUpKind::ExtraBomb,
        PowerUpKind::ExtraPower,
    ];

    /// Uniformly random kind.
    pub fn random(rng: &mut dyn RandomSource) -> Self {
        Self::ALL[rng.next_int(Self::ALL.len() as u32) as usize]
    }
}

/// A power-up lying on the grid.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PowerUp {
    /// Identity
    pub id: String,
    /// Effect
    #[serde(rename = "type")]
    pub kind: PowerUpKind,
    /// Tile
    pub position: Position,
}

impl PowerUp {
    /// Create a power-up with a fresh id.
    pub fn new(kind: PowerUpKind, position: Position) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            position,
        }
    }

    /// Roll the drop chance for a destroyed tile.
    ///
    /// Consumes one value for the chance and, on success, one for the kind.
    pub fn maybe_spawn(position: Position, rng: &mut dyn RandomSource) -> Option<PowerUp> {
        if !rng.roll_percent(POWER_UP_SPAWN_PERCENT) {
            return None;
        }
        Some(PowerUp::new(PowerUpKind::random(rng), position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::ScriptedRng;

    #[test]
    fn test_spawn_roll() {
        let pos = Position::new(3, 4);

        // 29 < 30: spawns, kind index 2
        let mut rng = ScriptedRng::new(vec![29, 2]);
        let power_up = PowerUp::maybe_spawn(pos, &mut rng).unwrap();
        assert_eq!(power_up.kind, PowerUpKind::ExtraPower);
        assert_eq!(power_up.position, pos);

        // 30 is not under 30
        let mut rng = ScriptedRng::new(vec![30]);
        assert!(PowerUp::maybe_spawn(pos, &mut rng).is_none());
    }

    #[test]
    fn test_wire_names() {
        let power_up = PowerUp::new(PowerUpKind::ExtraBomb, Position::new(1, 1));
        let json = serde_json::to_value(&power_up).unwrap();
        assert_eq!(json["type"], "bomb");
        assert_eq!(json["position"]["y"], 1);

        assert_eq!(serde_json::to_string(&PowerUpKind::Speed).unwrap(), "\"speed\"");
        assert_eq!(serde_json::to_string(&PowerUpKind::ExtraPower).unwrap(), "\"flame\"");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = PowerUp::new(PowerUpKind::Speed, Position::new(1, 1));
        let b = PowerUp::new(PowerUpKind::Speed, Position::new(1, 1));
        assert_ne!(a.id, b.id);
    }
}
