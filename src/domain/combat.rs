/// Combat resolver: transient hit regions against enemies and
/// breakable walls.
///
/// ```text
///   origin ──(facing × range)──► centre of hit region
///                                 ┌──────┐
///                                 │ size │  square, side = size
///                                 └──────┘
/// ```
///
/// Enemies take `damage` per hit; breakable walls always lose 1 HP.
/// Anything at hp ≤ 0 is removed. One resolution pass per attack: the
/// region never accumulates hits across ticks.

use super::entity::{Dir4, Enemy, StaticWall};
use super::physics::Rect;
use super::tile::WeaponData;

/// Reach used when no weapon is supplied (unarmed test swing).
pub const DEFAULT_RANGE: f32 = 24.0;
pub const DEFAULT_SIZE: f32 = 20.0;
pub const DEFAULT_DAMAGE: i32 = 1;

/// Flat damage a breakable wall takes per hit.
pub const WALL_DAMAGE: i32 = 1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitRegion {
    pub rect: Rect,
    pub damage: i32,
}

impl HitRegion {
    pub fn new(origin: (f32, f32), facing: Dir4, weapon: Option<&WeaponData>) -> Self {
        let (range, size, damage) = match weapon {
            Some(w) => (w.range, w.size, w.damage),
            None => (DEFAULT_RANGE, DEFAULT_SIZE, DEFAULT_DAMAGE),
        };
        let (ux, uy) = facing.unit();
        let cx = origin.0 + ux * range;
        let cy = origin.1 + uy * range;
        HitRegion { rect: Rect::from_center(cx, cy, size, size), damage }
    }
}

/// What one hit pass did. Indices refer to the collections as they were
/// before the pass; destroyed entries have already been removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HitReport {
    /// (centre, remaining hp) of every enemy that was hit
    pub enemies_hit: Vec<((f32, f32), i32)>,
    pub enemies_destroyed: Vec<(f32, f32)>,
    /// (cell, remaining hp) of every breakable wall that was hit
    pub walls_hit: Vec<((i32, i32), i32)>,
    pub walls_destroyed: Vec<(i32, i32)>,
}

impl HitReport {
    pub fn is_empty(&self) -> bool {
        self.enemies_hit.is_empty() && self.walls_hit.is_empty()
    }
}

/// Resolve one hit region against the world.
///
/// Surviving enemies get `flash_ms` set for the damage cue.
pub fn apply_hit(
    region: &HitRegion,
    enemies: &mut Vec<Enemy>,
    walls: &mut Vec<StaticWall>,
    flash_ms: u32,
) -> HitReport {
    let mut report = HitReport::default();

    for e in enemies.iter_mut() {
        if !region.rect.overlaps(&e.body) {
            continue;
        }
        e.hp -= region.damage;
        report.enemies_hit.push((e.body.center(), e.hp));
        if e.hp <= 0 {
            report.enemies_destroyed.push(e.body.center());
        } else {
            e.flash_ms = flash_ms;
        }
    }
    enemies.retain(|e| e.hp > 0);

    for w in walls.iter_mut() {
        let hp = match w.hp.as_mut() {
            Some(hp) => hp,
            None => continue,
        };
        if !region.rect.overlaps(&w.body) {
            continue;
        }
        *hp -= WALL_DAMAGE;
        let cell = w.body.cell_of_center();
        report.walls_hit.push((cell, *hp));
        if *hp <= 0 {
            report.walls_destroyed.push(cell);
        }
    }
    walls.retain(|w| w.hp.map_or(true, |hp| hp > 0));

    report
}
