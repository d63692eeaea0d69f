/// Enemy AI: timed heading changes, no pathfinding.
///
/// Two movement types:
///   1. **Wander**: pick any of the four axis directions at random.
///   2. **Horizontal**: strict left/right oscillation.
///
/// Each enemy holds a turn timer. When it runs out a new heading is
/// picked and the timer is re-armed with a random delay in
/// `[turn_min_ms, turn_max_ms]`. Enemies that hit a solid stop until
/// the next turn.

use rand::seq::SliceRandom;
use rand::Rng;

use super::entity::{Dir4, Enemy, DIRS};
use super::physics::{move_axis, Axis, Rect};
use super::tile::MoveType;

/// Heading after a turn.
pub fn next_heading<R: Rng>(move_type: MoveType, current: Option<Dir4>, rng: &mut R) -> Option<Dir4> {
    match move_type {
        MoveType::Wander => DIRS.choose(rng).copied(),
        MoveType::Horizontal => Some(match current {
            Some(d @ (Dir4::Left | Dir4::Right)) => d.opposite(),
            _ => {
                if rng.gen_bool(0.5) { Dir4::Left } else { Dir4::Right }
            }
        }),
    }
}

/// Random delay until the next heading change.
pub fn next_turn_delay<R: Rng>(min_ms: u32, max_ms: u32, rng: &mut R) -> u32 {
    if max_ms <= min_ms {
        return min_ms;
    }
    rng.gen_range(min_ms..=max_ms)
}

/// Advance one enemy by `dt_ms`: tick its timers, turn when due, then
/// move along the heading against `solids`.
pub fn update_enemy<R: Rng>(
    enemy: &mut Enemy,
    dt_ms: u32,
    turn_range: (u32, u32),
    solids: &[(Rect, ())],
    bounds: (f32, f32),
    rng: &mut R,
) {
    enemy.flash_ms = enemy.flash_ms.saturating_sub(dt_ms);

    if enemy.turn_timer_ms <= dt_ms {
        enemy.heading = next_heading(enemy.move_type, enemy.heading, rng);
        enemy.turn_timer_ms = next_turn_delay(turn_range.0, turn_range.1, rng);
    } else {
        enemy.turn_timer_ms -= dt_ms;
    }

    let dir = match enemy.heading {
        Some(d) => d,
        None => return,
    };
    let step = enemy.speed * dt_ms as f32 / 1000.0;
    let (ux, uy) = dir.unit();
    let axis = if ux != 0.0 { Axis::X } else { Axis::Y };
    let delta = step * (ux + uy);
    if move_axis(&mut enemy.body, delta, axis, solids, bounds).is_some() {
        // Horizontal movers keep their heading so the next turn flips it.
        if enemy.move_type == MoveType::Wander {
            enemy.heading = None;
        }
    }
}
