//! Authoritative Simulation Tick
//!
//! The only place the session state machine moves. Called by the hub
//! once per tick under the game's write lock, with `now` taken from the
//! hub's clock.

use std::time::Instant;
use tracing::{debug, info};

use crate::game::bomb::TimedExplosion;
use crate::game::events::{EliminationCause, GameEvent, TickResult};
use crate::game::explosion::apply_explosion;
use crate::game::state::{Game, SessionPhase};
use crate::{COUNTDOWN, DISCONNECT_GRACE, EXPLOSION_LIFETIME, MAX_PLAYERS, RESET_COUNTDOWN};

/// Run one simulation tick.
///
/// Order of work:
/// 1. Eliminate players whose disconnect grace period ran out
/// 2. Honour an explicit reset request
/// 3. Phase-specific transition (and bomb processing while Running)
/// 4. Drop explosions that have been shown long enough
pub fn tick(game: &mut Game, now: Instant) -> TickResult {
    let mut result = TickResult::default();

    // 1. Grace period expiry
    expire_disconnected(game, now, &mut result.events);

    // 2. Explicit reset request
    if game.reset_deadline.is_some()
        && matches!(
            game.phase,
            SessionPhase::Waiting | SessionPhase::Countdown | SessionPhase::Running
        )
    {
        transition(game, SessionPhase::Resetting, &mut result.events);
    } else {
        // 3. Phase-specific logic
        match game.phase {
            SessionPhase::Waiting => tick_waiting(game, now, &mut result.events),
            SessionPhase::Countdown => tick_countdown(game, now, &mut result.events),
            SessionPhase::Running => tick_running(game, now, &mut result.events),
            SessionPhase::Finished => {
                if game.reset_deadline.is_none() {
                    game.reset_deadline = Some(now + RESET_COUNTDOWN);
                }
                transition(game, SessionPhase::Resetting, &mut result.events);
            }
            SessionPhase::Resetting => {
                if game.reset_deadline.is_some_and(|deadline| now >= deadline) {
                    game.reset();
                    result.events.push(GameEvent::SessionReset);
                    transition(game, SessionPhase::Waiting, &mut result.events);
                }
            }
        }
    }

    // 4. Explosion display lifetime
    game.explosions
        .retain(|timed| !timed.is_expired(now, EXPLOSION_LIFETIME));

    result
}

fn transition(game: &mut Game, to: SessionPhase, events: &mut Vec<GameEvent>) {
    let from = game.phase;
    debug_assert!(from.can_transition_to(to), "illegal transition {:?} -> {:?}", from, to);
    game.phase = to;
    info!("Session phase {:?} -> {:?}", from, to);
    events.push(GameEvent::PhaseChanged { from, to });
}

/// Force lives to zero for players disconnected past the grace period.
///
/// The disconnect timestamp is cleared so this fires once per disconnect.
fn expire_disconnected(game: &mut Game, now: Instant, events: &mut Vec<GameEvent>) {
    for player in game.players.values_mut() {
        let Some(since) = player.disconnected_at else {
            continue;
        };
        if player.is_connected || now.saturating_duration_since(since) < DISCONNECT_GRACE {
            continue;
        }
        player.disconnected_at = None;
        if player.lives == 0 {
            continue;
        }
        player.lives = 0;
        info!("Player {} eliminated after grace period", player.id);
        events.push(GameEvent::PlayerEliminated {
            player_id: player.id.clone(),
            cause: EliminationCause::Disconnected,
        });
    }
}

fn tick_waiting(game: &mut Game, now: Instant, events: &mut Vec<GameEvent>) {
    let count = game.players.len();
    let window_closed = game.lobby_deadline.is_some_and(|deadline| now >= deadline);

    if count >= MAX_PLAYERS || (window_closed && count >= 2) {
        game.lobby_deadline = None;
        game.countdown_deadline = Some(now + COUNTDOWN);
        transition(game, SessionPhase::Countdown, events);
    }
}

fn tick_countdown(game: &mut Game, now: Instant, events: &mut Vec<GameEvent>) {
    if game.countdown_deadline.is_some_and(|deadline| now >= deadline) {
        game.countdown_deadline = None;
        game.initial_player_count = game.players.len();
        game.started_at = Some(now);
        info!("Match started with {} players", game.initial_player_count);
        transition(game, SessionPhase::Running, events);
    }
}

fn tick_running(game: &mut Game, now: Instant, events: &mut Vec<GameEvent>) {
    detonate_due_bombs(game, now, events);

    if game.alive_count() <= 1 {
        transition(game, SessionPhase::Finished, events);
    }
}

/// Detonate every bomb whose fuse has elapsed, in bomb-id order.
fn detonate_due_bombs(game: &mut Game, now: Instant, events: &mut Vec<GameEvent>) {
    let due: Vec<String> = game
        .bombs
        .values()
        .filter(|bomb| bomb.is_due(now))
        .map(|bomb| bomb.id.clone())
        .collect();

    for bomb_id in due {
        let Some(bomb) = game.bombs.remove(&bomb_id) else {
            continue;
        };
        let explosion = bomb.explode(&game.map);
        debug!("Bomb {} at {:?} covers {} tiles", bomb.id, bomb.position, explosion.tiles.len());

        events.push(GameEvent::BombDetonated {
            bomb_id: bomb.id.clone(),
            owner: bomb.player_id.clone(),
            center: bomb.position,
            tiles: explosion.tiles.len(),
        });

        apply_explosion(game, &explosion, events);

        if let Some(owner) = game.players.get_mut(&bomb.player_id) {
            owner.bomb_exploded();
        }

        game.explosions.push(TimedExplosion {
            explosion,
            created_at: now,
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================
