/// WorldState: the complete snapshot of one play session.
///
/// ## Lifecycle
///
///   ```text
///   INITIALIZING ──build ok──► RUNNING ──goal──────► CLEARED
///                                 │
///                                 ├──enemy contact─► GAME_OVER (defeated)
///                                 └──countdown 0───► GAME_OVER (time up)
///   ```
///
/// Terminal phases have no way out except `restart()`, which rebuilds the
/// session from the same `MapData`. `finish()` is the only way into a
/// terminal phase and reports the terminal event exactly once.
///
/// ## Solids
///
/// Player and enemies collide with walls, breakable walls, blocks and
/// every door whose collision is enabled (locked or closed). Pushed-block
/// obstruction is answered per cell by `cell_blocked`, where a moving
/// block counts at its destination.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SpeedConfig;
use crate::domain::combat::HitRegion;
use crate::domain::entity::{Connection, Player};
use crate::domain::physics::{self, PushPlan, Rect, TILE_SIZE};
use crate::domain::tile::TileCatalog;
use super::event::{GameEvent, GameOverReason};
use super::level::{self, BuildWarning, WorldObjects};
use super::map::{MapData, MapError};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Initializing,
    Running,
    Cleared,
    GameOver,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// Score = seconds left on the clock.
    Cleared { score: u32 },
    GameOver { reason: GameOverReason },
}

/// What stopped a player move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Solid {
    Wall,
    BreakableWall,
    Door,
    Block(usize),
}

/// Hit region kept around for display after it resolved.
#[derive(Clone, Copy, Debug)]
pub struct ActiveHit {
    pub region: HitRegion,
    pub remaining_ms: u32,
}

pub struct WorldState {
    // ── Source ──
    pub map: MapData,
    pub catalog: TileCatalog,
    pub width: usize,
    pub height: usize,

    // ── Objects ──
    pub player: Player,
    pub spawn: (i32, i32),
    pub objects: WorldObjects,
    /// Built once per session; never re-resolved.
    pub connections: Vec<Connection>,
    pub warnings: Vec<BuildWarning>,

    // ── Timers ──
    /// Seconds; 0 = untimed.
    pub time_limit: u32,
    pub time_remaining: u32,
    pub countdown_acc_ms: u32,
    pub hit: Option<ActiveHit>,

    // ── Config ──
    pub speed: SpeedConfig,
    pub rng: StdRng,

    // ── Meta ──
    pub phase: Phase,
    pub outcome: Option<Outcome>,
    pub tick: u64,
}

// ── Construction ──

impl WorldState {
    /// Validate the map's structure, build it, and arm the countdown.
    pub fn new(
        map: MapData,
        catalog: TileCatalog,
        time_limit: u32,
        speed: SpeedConfig,
        seed: u64,
    ) -> Result<Self, MapError> {
        map.validate_structure(&catalog)?;
        let mut world = WorldState {
            width: map.grid_width(),
            height: map.grid_height(),
            map,
            catalog,
            player: Player::new(0, 0),
            spawn: (0, 0),
            objects: WorldObjects::default(),
            connections: vec![],
            warnings: vec![],
            time_limit,
            time_remaining: time_limit,
            countdown_acc_ms: 0,
            hit: None,
            speed,
            rng: StdRng::seed_from_u64(seed),
            phase: Phase::Initializing,
            outcome: None,
            tick: 0,
        };
        world.initialize()?;
        Ok(world)
    }

    /// Throw the session away and start over from the same map.
    pub fn restart(&mut self) -> Result<(), MapError> {
        self.phase = Phase::Initializing;
        self.initialize()
    }

    fn initialize(&mut self) -> Result<(), MapError> {
        let built = level::build(&self.map.tiles, &self.map.entities, &self.catalog)?;
        self.spawn = built.spawn;
        self.player = Player::new(built.spawn.0, built.spawn.1);
        self.objects = built.objects;
        self.connections = built.connections;
        self.warnings = built.warnings;
        self.time_remaining = self.time_limit;
        self.countdown_acc_ms = 0;
        self.hit = None;
        self.outcome = None;
        self.tick = 0;
        self.phase = Phase::Running;
        tracing::info!(
            "session started: {}x{} grid, {} connections, time limit {}s",
            self.width, self.height, self.connections.len(), self.time_limit,
        );
        Ok(())
    }
}

// ── Terminal transitions ──

impl WorldState {
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Cleared | Phase::GameOver)
    }

    /// Enter a terminal phase. Returns false (and reports nothing) if the
    /// session already ended.
    pub fn finish(&mut self, outcome: Outcome, events: &mut Vec<GameEvent>) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.outcome = Some(outcome);
        match outcome {
            Outcome::Cleared { score } => {
                self.phase = Phase::Cleared;
                events.push(GameEvent::Cleared { score });
                tracing::info!("dungeon cleared, score {}", score);
            }
            Outcome::GameOver { reason } => {
                self.phase = Phase::GameOver;
                events.push(GameEvent::GameOver { reason });
                tracing::info!("game over: {}", reason.label());
            }
        }
        true
    }
}

// ── Clock ──

impl WorldState {
    /// Credit wall-clock time the host kept out of a step's `dt`. Only the
    /// countdown sees it; bodies never jump.
    pub fn credit_countdown(&mut self, ms: u32) {
        if self.phase == Phase::Running && self.time_limit > 0 {
            self.countdown_acc_ms = self.countdown_acc_ms.saturating_add(ms);
        }
    }
}

// ── Collision queries ──

impl WorldState {
    /// World size in pixels.
    pub fn bounds(&self) -> (f32, f32) {
        (self.width as f32 * TILE_SIZE, self.height as f32 * TILE_SIZE)
    }

    pub fn player_solids(&self) -> Vec<(Rect, Solid)> {
        let o = &self.objects;
        let mut out = Vec::with_capacity(o.walls.len() + o.blocks.len() + 8);
        out.extend(o.walls.iter().map(|w| (w.body, Solid::Wall)));
        out.extend(o.breakable_walls.iter().map(|w| (w.body, Solid::BreakableWall)));
        out.extend(o.doors.iter().filter(|d| d.is_solid()).map(|d| (d.body, Solid::Door)));
        out.extend(o.blocks.iter().enumerate().map(|(i, b)| (b.body, Solid::Block(i))));
        out
    }

    pub fn enemy_solids(&self) -> Vec<(Rect, ())> {
        self.player_solids().into_iter().map(|(r, _)| (r, ())).collect()
    }

    /// Is cell `(cx, cy)` an obstruction for a pushed block?
    /// `skip` is the block being pushed.
    pub fn cell_blocked(&self, cx: i32, cy: i32, skip: Option<usize>) -> bool {
        let o = &self.objects;
        let at = |r: &Rect| r.cell_of_center() == (cx, cy);
        o.walls.iter().any(|w| at(&w.body))
            || o.breakable_walls.iter().any(|w| at(&w.body))
            || o.doors.iter().any(|d| d.is_solid() && at(&d.body))
            || o.blocks.iter().enumerate().any(|(i, b)| Some(i) != skip && b.cell == (cx, cy))
    }

    /// Push block `idx` away from `pusher`. Returns the plan when the block
    /// actually starts moving; a block already in transit ignores pushes.
    pub fn push_block(&mut self, idx: usize, pusher: (f32, f32)) -> Option<PushPlan> {
        let block = self.objects.blocks.get(idx)?;
        if block.is_moving() {
            return None;
        }
        let dir = physics::push_direction(pusher, block.body.center());
        let plan = physics::resolve_push(
            block.cell,
            block.friction,
            dir,
            (self.width, self.height),
            |x, y| self.cell_blocked(x, y, Some(idx)),
        );
        if plan.is_noop() {
            return None;
        }
        let duration = physics::transit_duration_ms(plan.cells, self.speed.block_cell_ms);
        self.objects.blocks[idx].start_transit(plan.to, duration);
        tracing::debug!("block {} pushed {:?} from {:?} to {:?}", idx, plan.dir, plan.from, plan.to);
        Some(plan)
    }
}
