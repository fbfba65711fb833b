//! Game Events
//!
//! Emitted by the tick step so the hub can log what happened
//! without reaching back into the aggregate.

use std::fmt;
use serde::Serialize;

use crate::core::position::Position;
use crate::game::player::PlayerId;
use crate::game::powerup::PowerUpKind;
use crate::game::state::SessionPhase;

/// Why a player lost their last life.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum EliminationCause {
    /// Caught in a blast
    Explosion {
        /// Owner of the bomb
        bomb_owner: PlayerId,
    },
    /// Grace period ran out while disconnected
    Disconnected,
}

/// Something that happened during one tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// Session state machine moved
    PhaseChanged {
        /// Previous phase
        from: SessionPhase,
        /// New phase
        to: SessionPhase,
    },

    /// A bomb went off
    BombDetonated {
        /// Bomb id
        bomb_id: String,
        /// Owner
        owner: PlayerId,
        /// Bomb tile
        center: Position,
        /// Number of tiles in the footprint
        tiles: usize,
    },

    /// Rubble cleared by a blast
    BlockDestroyed {
        /// Tile
        position: Position,
    },

    /// A power-up dropped from cleared rubble
    PowerUpSpawned {
        /// Power-up id
        id: String,
        /// Kind
        kind: PowerUpKind,
        /// Tile
        position: Position,
    },

    /// A player lost a life
    PlayerHit {
        /// Victim
        player_id: PlayerId,
        /// Lives after the hit
        lives_left: u8,
    },

    /// A player reached zero lives
    PlayerEliminated {
        /// Victim
        player_id: PlayerId,
        /// Cause
        #[serde(flatten)]
        cause: EliminationCause,
    },

    /// All entities cleared and grid re-seeded
    SessionReset,
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::PhaseChanged { from, to } => write!(f, "phase {:?} -> {:?}", from, to),
            GameEvent::BombDetonated { owner, center, tiles, .. } => {
                write!(f, "bomb of {} detonated at {:?} ({} tiles)", owner, center, tiles)
            }
            GameEvent::BlockDestroyed { position } => write!(f, "block destroyed at {:?}", position),
            GameEvent::PowerUpSpawned { kind, position, .. } => {
                write!(f, "{:?} power-up spawned at {:?}", kind, position)
            }
            GameEvent::PlayerHit { player_id, lives_left } => {
                write!(f, "player {} hit, {} lives left", player_id, lives_left)
            }
            GameEvent::PlayerEliminated { player_id, cause } => {
                write!(f, "player {} eliminated ({:?})", player_id, cause)
            }
            GameEvent::SessionReset => f.write_str("session reset"),
        }
    }
}

/// Result of one tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
}

impl TickResult {
    /// Phase changes recorded this tick, in order.
    pub fn phase_changes(&self) -> impl Iterator<Item = (SessionPhase, SessionPhase)> + '_ {
        self.events.iter().filter_map(|e| match e {
            GameEvent::PhaseChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
    }

    /// Ids of players eliminated this tick.
    pub fn eliminated(&self) -> Vec<&PlayerId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GameEvent::PlayerEliminated { player_id, .. } => Some(player_id),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = GameEvent::PlayerEliminated {
            player_id: PlayerId::from("p2"),
            cause: EliminationCause::Explosion {
                bomb_owner: PlayerId::from("p1"),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "player_eliminated");
        assert_eq!(json["cause"], "explosion");
        assert_eq!(json["bomb_owner"], "p1");
    }

    #[test]
    fn test_tick_result_helpers() {
        let result = TickResult {
            events: vec![
                GameEvent::PhaseChanged {
                    from: SessionPhase::Running,
                    to: SessionPhase::Finished,
                },
                GameEvent::PlayerEliminated {
                    player_id: PlayerId::from("p3"),
                    cause: EliminationCause::Disconnected,
                },
            ],
        };

        let changes: Vec<_> = result.phase_changes().collect();
        assert_eq!(changes, vec![(SessionPhase::Running, SessionPhase::Finished)]);
        assert_eq!(result.eliminated(), vec![&PlayerId::from("p3")]);
        assert_eq!(GameEvent::SessionReset.to_string(), "session reset");
    }
}
