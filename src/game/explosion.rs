//! Explosion Propagation
//!
//! Footprint computation and the effects of a footprint on the grid
//! and the seated players.

use crate::core::position::{Direction, Position};
use crate::game::events::{EliminationCause, GameEvent};
use crate::game::map::{GameMap, TileKind};
use crate::game::bomb::Explosion;
use crate::game::powerup::PowerUp;
use crate::game::state::Game;

/// Tiles reached by a blast of `power` centred on `center`.
///
/// The center is always included. Each direction walks outward up to
/// `power` steps, stopping before an out-of-bounds or indestructible
/// tile, and stopping after (including) the first destructible tile.
pub fn compute_footprint(map: &GameMap, center: Position, power: i32) -> Vec<Position> {
    let mut tiles = vec![center];

    for direction in Direction::ALL {
        for distance in 1..=power {
            let pos = center.step(direction, distance);
            match map.tile(pos) {
                None | Some(TileKind::IndestructibleWall) => break,
                Some(TileKind::DestructibleWall) => {
                    tiles.push(pos);
                    break;
                }
                Some(TileKind::Empty) => tiles.push(pos),
            }
        }
    }

    tiles
}

/// Apply an explosion to the session.
///
/// Rubble in the footprint is cleared and may drop a power-up; every
/// live player standing in the footprint loses exactly one life.
pub fn apply_explosion(game: &mut Game, explosion: &Explosion, events: &mut Vec<GameEvent>) {
    for pos in &explosion.tiles {
        if !game.map.destroy_block(*pos) {
            continue;
        }
        events.push(GameEvent::BlockDestroyed { position: *pos });

        if let Some(power_up) = PowerUp::maybe_spawn(*pos, game.rng.as_mut()) {
            events.push(GameEvent::PowerUpSpawned {
                id: power_up.id.clone(),
                kind: power_up.kind,
                position: power_up.position,
            });
            game.power_ups.insert(power_up.id.clone(), power_up);
        }
    }

    for player in game.players.values_mut() {
        if !player.is_alive() || !explosion.covers(player.position) {
            continue;
        }
        let eliminated = player.hit();
        events.push(GameEvent::PlayerHit {
            player_id: player.id.clone(),
            lives_left: player.lives,
        });
        if eliminated {
            events.push(GameEvent::PlayerEliminated {
                player_id: player.id.clone(),
                cause: EliminationCause::Explosion {
                    bomb_owner: explosion.player_id.clone(),
                },
            });
        }
    }
}
