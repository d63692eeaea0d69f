/// Runtime world objects: Player, walls, movable blocks, doors, buttons,
/// items, enemies, goals.
///
/// Every object carries explicit typed fields (hp, lock state, friction)
/// instead of a free-form data bag. Objects live for one play session and
/// are owned by `WorldState`.

use std::collections::BTreeSet;

use super::physics::Rect;
use super::tile::{FrictionClass, MoveType, WeaponData};

/// Axis-aligned direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dir4 {
    Left,
    Right,
    Up,
    Down,
}

pub const DIRS: [Dir4; 4] = [Dir4::Left, Dir4::Right, Dir4::Up, Dir4::Down];

impl Dir4 {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir4::Left => (-1, 0),
            Dir4::Right => (1, 0),
            Dir4::Up => (0, -1),
            Dir4::Down => (0, 1),
        }
    }

    pub fn unit(self) -> (f32, f32) {
        let (dx, dy) = self.delta();
        (dx as f32, dy as f32)
    }

    pub fn opposite(self) -> Dir4 {
        match self {
            Dir4::Left => Dir4::Right,
            Dir4::Right => Dir4::Left,
            Dir4::Up => Dir4::Down,
            Dir4::Down => Dir4::Up,
        }
    }
}

/// Input sampled once at tick start.
/// Movement = continuous (held keys), attack = edge-triggered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// -1, 0 or 1
    pub move_x: i8,
    /// -1, 0 or 1
    pub move_y: i8,
    pub attack: bool,
}

#[cfg(test)]
impl FrameInput {
    pub fn idle() -> Self {
        FrameInput::default()
    }

    pub fn toward(dir: Dir4) -> Self {
        let (dx, dy) = dir.delta();
        FrameInput { move_x: dx as i8, move_y: dy as i8, attack: false }
    }

    pub fn attack() -> Self {
        FrameInput { attack: true, ..FrameInput::default() }
    }
}

// ── Body sizes ──

pub const PLAYER_SIZE: f32 = 20.0;
pub const ENEMY_SIZE: f32 = 24.0;
pub const BUTTON_SIZE: f32 = 18.0;

#[derive(Clone, Debug)]
pub struct Player {
    pub body: Rect,
    pub facing: Dir4,
    /// At most one weapon; a new pickup replaces it.
    pub weapon: Option<WeaponData>,
    /// Door ids this player holds keys for.
    pub keys: BTreeSet<String>,
    /// Remaining ms before the next attack is allowed.
    pub attack_cooldown_ms: u32,
    pub alive: bool,
}

impl Player {
    pub fn new(cx: i32, cy: i32) -> Self {
        Player {
            body: Rect::in_cell(cx, cy, PLAYER_SIZE, PLAYER_SIZE),
            facing: Dir4::Down,
            weapon: None,
            keys: BTreeSet::new(),
            attack_cooldown_ms: 0,
            alive: true,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        self.body.center()
    }
}

/// Immutable or breakable wall. `hp` is `Some` only for breakable walls.
#[derive(Clone, Debug)]
pub struct StaticWall {
    pub body: Rect,
    pub hp: Option<i32>,
}

impl StaticWall {
    pub fn solid(cx: i32, cy: i32) -> Self {
        StaticWall { body: Rect::cell(cx, cy), hp: None }
    }

    pub fn breakable(cx: i32, cy: i32, hp: i32) -> Self {
        StaticWall { body: Rect::cell(cx, cy), hp: Some(hp) }
    }
}

/// Constant-speed tween of a block from one cell to another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transit {
    pub from: (f32, f32),
    pub to: (f32, f32),
    pub elapsed_ms: u32,
    pub duration_ms: u32,
}

#[derive(Clone, Debug)]
pub struct MovableBlock {
    pub body: Rect,
    /// Logical cell. Set to the destination as soon as a push starts.
    pub cell: (i32, i32),
    pub friction: FrictionClass,
    pub transit: Option<Transit>,
}

impl MovableBlock {
    pub fn new(cx: i32, cy: i32, friction: FrictionClass) -> Self {
        MovableBlock { body: Rect::cell(cx, cy), cell: (cx, cy), friction, transit: None }
    }

    pub fn is_moving(&self) -> bool {
        self.transit.is_some()
    }

    /// Begin travelling to `to`. Zero-length transits snap immediately.
    pub fn start_transit(&mut self, to: (i32, i32), duration_ms: u32) {
        let target = Rect::cell(to.0, to.1);
        self.cell = to;
        if duration_ms == 0 {
            self.body = target;
            self.transit = None;
            return;
        }
        self.transit = Some(Transit {
            from: (self.body.x, self.body.y),
            to: (target.x, target.y),
            elapsed_ms: 0,
            duration_ms,
        });
    }

    /// Advance the tween. Returns true on the tick it arrives.
    pub fn advance(&mut self, dt_ms: u32) -> bool {
        let t = match self.transit.as_mut() {
            Some(t) => t,
            None => return false,
        };
        t.elapsed_ms = t.elapsed_ms.saturating_add(dt_ms).min(t.duration_ms);
        let p = t.elapsed_ms as f32 / t.duration_ms as f32;
        self.body.x = t.from.0 + (t.to.0 - t.from.0) * p;
        self.body.y = t.from.1 + (t.to.1 - t.from.1) * p;
        if t.elapsed_ms >= t.duration_ms {
            self.body.x = t.to.0;
            self.body.y = t.to.1;
            self.transit = None;
            return true;
        }
        false
    }
}

#[derive(Clone, Debug)]
pub struct Door {
    pub id: String,
    pub body: Rect,
    /// Locked doors ignore buttons and open only with the matching key.
    pub is_locked: bool,
    pub is_open: bool,
}

impl Door {
    /// Collision is enabled while locked or closed.
    pub fn is_solid(&self) -> bool {
        self.is_locked || !self.is_open
    }
}

#[derive(Clone, Debug)]
pub struct Button {
    pub body: Rect,
    /// `None` = inert button (no matching door).
    pub linked_door_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ItemPayload {
    Key { target_door_id: Option<String> },
    Weapon(WeaponData),
}

#[derive(Clone, Debug)]
pub struct Item {
    pub body: Rect,
    pub payload: ItemPayload,
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub name: String,
    pub body: Rect,
    pub hp: i32,
    pub move_type: MoveType,
    /// px/s
    pub speed: f32,
    pub heading: Option<Dir4>,
    /// ms until the next heading change.
    pub turn_timer_ms: u32,
    /// Damage cue; presentation only.
    pub flash_ms: u32,
}

#[derive(Clone, Debug)]
pub struct Goal {
    pub body: Rect,
}

/// Button → door control link, resolved once at build time.
/// Indices point into `WorldObjects::buttons` / `WorldObjects::doors`,
/// which never shrink during a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    pub button: usize,
    pub door: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transit_is_linear_and_snaps() {
        let mut b = MovableBlock::new(1, 1, FrictionClass::Sliding);
        b.start_transit((4, 1), 300);
        assert!(b.is_moving());
        assert_eq!(b.cell, (4, 1));

        assert!(!b.advance(100));
        assert_eq!(b.body.x, 64.0);
        assert!(!b.advance(100));
        assert_eq!(b.body.x, 96.0);
        assert!(b.advance(150));
        assert_eq!(b.body.x, 128.0);
        assert!(!b.is_moving());
        assert!(!b.advance(100));
    }

    #[test]
    fn zero_duration_transit_snaps() {
        let mut b = MovableBlock::new(1, 1, FrictionClass::Heavy);
        b.start_transit((1, 2), 0);
        assert!(!b.is_moving());
        assert_eq!(b.body, Rect::cell(1, 2));
    }

    #[test]
    fn door_solidity() {
        let mut d = Door {
            id: "d1".into(),
            body: Rect::cell(0, 0),
            is_locked: false,
            is_open: false,
        };
        assert!(d.is_solid());
        d.is_open = true;
        assert!(!d.is_solid());
        d.is_locked = true;
        assert!(d.is_solid());
    }

    #[test]
    fn opposite_directions() {
        for d in DIRS {
            assert_eq!(d.opposite().opposite(), d);
            let (a, b) = d.delta();
            let (c, e) = d.opposite().delta();
            assert_eq!((a + c, b + e), (0, 0));
        }
    }
}
