/// Level builder: turns a tile grid + entity list into live world
/// objects and the button → door connection list.
///
/// ## Pass 1: tiles (`build`)
///
/// Every cell is classified once (`classify`) and dispatched to one
/// constructor per kind:
///
///   ```text
///   WALL     → StaticWall        (breakable_walls if is_breakable)
///   STONE    → MovableBlock      HEAVY
///   ICE      → MovableBlock      SLIDING
///   PLAYER   → spawn point       first one wins, extras are warnings
///   ITEM     → Item              weapon payload
///   ENEMY    → Enemy             hp / speed / move type from the catalog
///   GOAL     → Goal
///   GIMMICK  → Door / Button / Key embedded in the grid (never linked)
///   EMPTY    → nothing           (unknown symbols land here too)
///   ```
///
/// ## Pass 2: gimmick entities (`build_gimmicks`)
///
/// DOOR entities first (id lookup), then BUTTON, then KEY. Buttons and
/// keys resolve their door by their own `targetId`, falling back to a
/// door whose `targetId` names them, so either side of the editor's
/// link is enough. Unresolved links leave the object inert and produce
/// a `BuildWarning`.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::entity::{
    Button, Connection, Door, Enemy, Goal, Item, ItemPayload, MovableBlock, StaticWall,
    BUTTON_SIZE, ENEMY_SIZE,
};
use crate::domain::physics::Rect;
use crate::domain::tile::{
    default_tile_for, EnemyData, FrictionClass, GimmickData, GimmickKind, MoveType, TileCatalog,
    TileCategory, WeaponData,
};
use crate::sim::map::{EntityData, EntityType, MapError};

/// Tagged result of looking a symbol up in the catalog.
#[derive(Clone, Debug, PartialEq)]
pub enum WorldObjectKind<'a> {
    Empty,
    Wall,
    BreakableWall { hp: i32 },
    Block(FrictionClass),
    PlayerSpawn,
    Weapon(&'a WeaponData),
    /// ITEM tile without a payload.
    BareItem,
    Enemy(Option<&'a EnemyData>),
    Goal,
    Gimmick(&'a GimmickData),
}

pub fn classify<'a>(symbol: &str, catalog: &'a TileCatalog) -> WorldObjectKind<'a> {
    let def = match catalog.get(symbol) {
        Some(d) => d,
        None => return WorldObjectKind::Empty,
    };
    match def.category {
        TileCategory::Empty => WorldObjectKind::Empty,
        TileCategory::Wall if def.is_breakable => WorldObjectKind::BreakableWall { hp: def.wall_hp() },
        TileCategory::Wall => WorldObjectKind::Wall,
        TileCategory::Stone | TileCategory::Ice => match def.category.friction() {
            Some(f) => WorldObjectKind::Block(f),
            None => WorldObjectKind::Empty,
        },
        TileCategory::Player => WorldObjectKind::PlayerSpawn,
        TileCategory::Item => match &def.weapon {
            Some(w) => WorldObjectKind::Weapon(w),
            None => WorldObjectKind::BareItem,
        },
        TileCategory::Enemy => WorldObjectKind::Enemy(def.enemy.as_ref()),
        TileCategory::Goal => WorldObjectKind::Goal,
        TileCategory::Gimmick => match &def.gimmick {
            Some(g) => WorldObjectKind::Gimmick(g),
            None => WorldObjectKind::Empty,
        },
    }
}

/// Non-fatal integrity problems found while building.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildWarning {
    #[error("extra player start at ({x},{y}) ignored")]
    ExtraPlayer { x: usize, y: usize },

    #[error("map has no goal")]
    NoGoal,

    #[error("item tile {symbol:?} at ({x},{y}) has no payload")]
    EmptyItem { symbol: String, x: usize, y: usize },

    #[error("entity {id:?} uses tile {tile:?} which is not a {expected:?} gimmick")]
    WrongTile { id: String, tile: String, expected: GimmickKind },

    #[error("entity {id:?} is not linked to any door (target {target:?})")]
    Unlinked { id: String, target: Option<String> },

    #[error("door {id:?} targets {target:?}, which does not exist")]
    DanglingDoorTarget { id: String, target: String },
}

/// Everything built for one play session.
#[derive(Clone, Debug, Default)]
pub struct WorldObjects {
    pub walls: Vec<StaticWall>,
    pub breakable_walls: Vec<StaticWall>,
    pub blocks: Vec<MovableBlock>,
    pub doors: Vec<Door>,
    pub buttons: Vec<Button>,
    pub items: Vec<Item>,
    pub enemies: Vec<Enemy>,
    pub goals: Vec<Goal>,
}

#[derive(Clone, Debug)]
pub struct Level {
    pub objects: WorldObjects,
    pub connections: Vec<Connection>,
    pub spawn: (i32, i32),
    pub warnings: Vec<BuildWarning>,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Build the whole level. Fails only when there is no player start.
pub fn build(
    tiles: &[Vec<String>],
    entities: &[EntityData],
    catalog: &TileCatalog,
) -> Result<Level, MapError> {
    let mut objects = WorldObjects::default();
    let mut warnings = Vec::new();
    let mut spawn: Option<(i32, i32)> = None;

    for (y, row) in tiles.iter().enumerate() {
        for (x, symbol) in row.iter().enumerate() {
            let (cx, cy) = (x as i32, y as i32);
            match classify(symbol, catalog) {
                WorldObjectKind::Empty => {}
                WorldObjectKind::Wall => objects.walls.push(StaticWall::solid(cx, cy)),
                WorldObjectKind::BreakableWall { hp } => {
                    objects.breakable_walls.push(StaticWall::breakable(cx, cy, hp));
                }
                WorldObjectKind::Block(friction) => {
                    objects.blocks.push(MovableBlock::new(cx, cy, friction));
                }
                WorldObjectKind::PlayerSpawn => {
                    if spawn.is_none() {
                        spawn = Some((cx, cy));
                    } else {
                        warnings.push(BuildWarning::ExtraPlayer { x, y });
                    }
                }
                WorldObjectKind::Weapon(w) => objects.items.push(Item {
                    body: Rect::cell(cx, cy),
                    payload: ItemPayload::Weapon(w.clone()),
                }),
                WorldObjectKind::BareItem => {
                    warnings.push(BuildWarning::EmptyItem { symbol: symbol.clone(), x, y });
                }
                WorldObjectKind::Enemy(data) => objects.enemies.push(new_enemy(cx, cy, symbol, data)),
                WorldObjectKind::Goal => objects.goals.push(Goal { body: Rect::cell(cx, cy) }),
                WorldObjectKind::Gimmick(g) => {
                    build_embedded_gimmick(&mut objects, symbol, cx, cy, g);
                }
            }
        }
    }

    let spawn = spawn.ok_or(MapError::PlayerCount(0))?;
    if objects.goals.is_empty() {
        warnings.push(BuildWarning::NoGoal);
    }

    let (connections, gimmick_warnings) = build_gimmicks(entities, &mut objects, catalog);
    warnings.extend(gimmick_warnings);

    for w in &warnings {
        tracing::warn!("level build: {}", w);
    }
    tracing::debug!(
        "level built: {} walls, {} breakable, {} blocks, {} doors, {} buttons, {} items, {} enemies, {} connections",
        objects.walls.len(),
        objects.breakable_walls.len(),
        objects.blocks.len(),
        objects.doors.len(),
        objects.buttons.len(),
        objects.items.len(),
        objects.enemies.len(),
        connections.len(),
    );

    Ok(Level { objects, connections, spawn, warnings })
}

/// Build DOOR, BUTTON and KEY entities (in that order) and link them.
pub fn build_gimmicks(
    entities: &[EntityData],
    objects: &mut WorldObjects,
    catalog: &TileCatalog,
) -> (Vec<Connection>, Vec<BuildWarning>) {
    let mut warnings = Vec::new();
    let mut connections = Vec::new();

    // ── Doors ──
    let mut door_by_id: HashMap<&str, usize> = HashMap::new();
    let mut door_by_target: HashMap<&str, usize> = HashMap::new();
    for e in entities.iter().filter(|e| e.kind == EntityType::Door) {
        let gimmick = entity_tile(e, catalog, &mut warnings);
        let idx = objects.doors.len();
        objects.doors.push(new_door(&e.id, e.x, e.y, gimmick));
        door_by_id.insert(e.id.as_str(), idx);
        if let Some(t) = e.target_id() {
            door_by_target.insert(t, idx);
        }
    }

    let resolve = |e: &EntityData| -> Option<usize> {
        e.target_id()
            .and_then(|t| door_by_id.get(t))
            .or_else(|| door_by_target.get(e.id.as_str()))
            .copied()
    };

    // ── Buttons ──
    for e in entities.iter().filter(|e| e.kind == EntityType::Button) {
        entity_tile(e, catalog, &mut warnings);
        let door = resolve(e);
        let button = objects.buttons.len();
        objects.buttons.push(Button {
            body: Rect::in_cell(e.x, e.y, BUTTON_SIZE, BUTTON_SIZE),
            linked_door_id: door.map(|d| objects.doors[d].id.clone()),
        });
        match door {
            Some(door) => connections.push(Connection { button, door }),
            None => warnings.push(BuildWarning::Unlinked {
                id: e.id.clone(),
                target: e.target_id().map(String::from),
            }),
        }
    }

    // ── Keys ──
    for e in entities.iter().filter(|e| e.kind == EntityType::Key) {
        entity_tile(e, catalog, &mut warnings);
        let door = resolve(e);
        if door.is_none() {
            warnings.push(BuildWarning::Unlinked {
                id: e.id.clone(),
                target: e.target_id().map(String::from),
            });
        }
        objects.items.push(Item {
            body: Rect::cell(e.x, e.y),
            payload: ItemPayload::Key { target_door_id: door.map(|d| objects.doors[d].id.clone()) },
        });
    }

    // Door targets must name some entity.
    for e in entities.iter().filter(|e| e.kind == EntityType::Door) {
        if let Some(t) = e.target_id() {
            if !entities.iter().any(|o| o.id == t) {
                warnings.push(BuildWarning::DanglingDoorTarget { id: e.id.clone(), target: t.into() });
            }
        }
    }

    (connections, warnings)
}

// ══════════════════════════════════════════════════════════════
// Constructors
// ══════════════════════════════════════════════════════════════

fn new_enemy(cx: i32, cy: i32, symbol: &str, data: Option<&EnemyData>) -> Enemy {
    let (name, hp, move_type, speed) = match data {
        Some(d) => (d.name.clone(), d.hp.max(1), d.move_type, d.speed),
        None => (symbol.to_string(), 1, MoveType::Wander, 50.0),
    };
    Enemy {
        name,
        body: Rect::in_cell(cx, cy, ENEMY_SIZE, ENEMY_SIZE),
        hp,
        move_type,
        speed,
        heading: None,
        turn_timer_ms: 0,
        flash_ms: 0,
    }
}

fn new_door(id: &str, cx: i32, cy: i32, g: Option<&GimmickData>) -> Door {
    Door {
        id: id.to_string(),
        body: Rect::cell(cx, cy),
        is_locked: g.map_or(false, |g| g.is_locked),
        is_open: false,
    }
}

/// Gimmicks painted straight into the grid. They get a positional id and
/// are never linked: embedded doors stay closed (or locked), buttons and
/// keys are inert.
fn build_embedded_gimmick(
    objects: &mut WorldObjects,
    symbol: &str,
    cx: i32,
    cy: i32,
    g: &GimmickData,
) {
    let id = format!("{}@{},{}", symbol, cx, cy);
    match g.kind {
        GimmickKind::Door => objects.doors.push(new_door(&id, cx, cy, Some(g))),
        GimmickKind::Button => objects.buttons.push(Button {
            body: Rect::in_cell(cx, cy, BUTTON_SIZE, BUTTON_SIZE),
            linked_door_id: None,
        }),
        GimmickKind::Key => objects.items.push(Item {
            body: Rect::cell(cx, cy),
            payload: ItemPayload::Key { target_door_id: None },
        }),
    }
}

/// Tile definition for an entity: its `tileId`, else the per-type default.
fn entity_tile<'a>(
    e: &EntityData,
    catalog: &'a TileCatalog,
    warnings: &mut Vec<BuildWarning>,
) -> Option<&'a GimmickData> {
    let expected = e.kind.gimmick_kind();
    let tile = e.properties.tile_id.as_deref().unwrap_or_else(|| default_tile_for(expected));
    let gimmick = catalog.get(tile).and_then(|d| d.gimmick.as_ref()).filter(|g| g.kind == expected);
    if gimmick.is_none() {
        warnings.push(BuildWarning::WrongTile { id: e.id.clone(), tile: tile.to_string(), expected });
    }
    gimmick
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::map::ascii;

    fn build_ascii(rows: &[&str], entities: Vec<EntityData>) -> Level {
        let map = ascii(rows);
        build(&map.tiles, &entities, &TileCatalog::builtin()).unwrap()
    }

    #[test]
    fn classify_dispatches_by_category() {
        let c = TileCatalog::builtin();
        assert_eq!(classify("W", &c), WorldObjectKind::Wall);
        assert_eq!(classify("BW3", &c), WorldObjectKind::BreakableWall { hp: 3 });
        assert_eq!(classify("R1", &c), WorldObjectKind::Block(FrictionClass::Heavy));
        assert_eq!(classify("I1", &c), WorldObjectKind::Block(FrictionClass::Sliding));
        assert_eq!(classify("NEW_TILE", &c), WorldObjectKind::Empty);
        assert!(matches!(classify("S1", &c), WorldObjectKind::Weapon(w) if w.damage == 2));
    }

    #[test]
    fn tiles_are_routed_to_collections() {
        let l = build_ascii(&[
            "#######",
            "#P3RIE#",
            "#S.1.G#",
            "#######",
        ], vec![]);
        assert_eq!(l.spawn, (1, 1));
        assert_eq!(l.objects.walls.len(), 7 * 2 + 2 * 2);
        assert_eq!(l.objects.breakable_walls.len(), 2);
        assert_eq!(l.objects.blocks.len(), 2);
        assert!(l.objects.blocks.iter().all(|b| !b.is_moving()));
        assert_eq!(l.objects.blocks[1].friction, FrictionClass::Sliding);
        assert_eq!(l.objects.items.len(), 1);
        assert_eq!(l.objects.enemies.len(), 1);
        assert_eq!(l.objects.goals.len(), 1);
        assert!(l.warnings.is_empty());
    }

    #[test]
    fn unknown_symbols_are_skipped() {
        let mut map = ascii(&["####", "#PG#", "####"]);
        map.tiles[1][2] = "XYZ".into();
        let l = build(&map.tiles, &[], &TileCatalog::builtin()).unwrap();
        assert!(l.objects.goals.is_empty());
        assert_eq!(l.warnings, vec![BuildWarning::NoGoal]);
    }

    #[test]
    fn first_player_wins() {
        let l = build_ascii(&["#####", "#PPG#", "#####"], vec![]);
        assert_eq!(l.spawn, (1, 1));
        assert_eq!(l.warnings, vec![BuildWarning::ExtraPlayer { x: 2, y: 1 }]);
    }

    #[test]
    fn no_player_is_an_error() {
        let map = ascii(&["####", "#.G#", "####"]);
        assert!(matches!(
            build(&map.tiles, &[], &TileCatalog::builtin()),
            Err(MapError::PlayerCount(0))
        ));
    }

    #[test]
    fn button_links_to_door() {
        let l = build_ascii(&["#####", "#P.G#", "#####"], vec![
            EntityData::new("b1", EntityType::Button, 1, 1).with_target("d1"),
            EntityData::new("d1", EntityType::Door, 2, 1),
        ]);
        assert_eq!(l.connections, vec![Connection { button: 0, door: 0 }]);
        assert_eq!(l.objects.doors[0].id, "d1");
        assert!(!l.objects.doors[0].is_locked);
        assert_eq!(l.objects.buttons[0].linked_door_id.as_deref(), Some("d1"));
    }

    #[test]
    fn link_resolves_from_door_side() {
        let l = build_ascii(&["#####", "#P.G#", "#####"], vec![
            EntityData::new("d1", EntityType::Door, 2, 1).with_target("b1"),
            EntityData::new("b1", EntityType::Button, 1, 1),
        ]);
        assert_eq!(l.connections.len(), 1);
    }

    #[test]
    fn symmetric_link_yields_one_connection() {
        let l = build_ascii(&["#####", "#P.G#", "#####"], vec![
            EntityData::new("d1", EntityType::Door, 2, 1).with_target("b1"),
            EntityData::new("b1", EntityType::Button, 1, 1).with_target("d1"),
        ]);
        assert_eq!(l.connections.len(), 1);
        assert!(l.warnings.is_empty());
    }

    #[test]
    fn dangling_button_is_inert() {
        let l = build_ascii(&["#####", "#P.G#", "#####"], vec![
            EntityData::new("b1", EntityType::Button, 1, 1).with_target("nowhere"),
        ]);
        assert!(l.connections.is_empty());
        assert_eq!(l.objects.buttons.len(), 1);
        assert!(l.objects.buttons[0].linked_door_id.is_none());
        assert_eq!(l.warnings, vec![BuildWarning::Unlinked {
            id: "b1".into(),
            target: Some("nowhere".into()),
        }]);
    }

    #[test]
    fn locked_door_and_key() {
        let l = build_ascii(&["######", "#P..G#", "######"], vec![
            EntityData::new("key_A", EntityType::Key, 2, 1).with_tile("K1").with_target("door_A"),
            EntityData::new("door_A", EntityType::Door, 3, 1).with_tile("KD1").with_target("key_A"),
        ]);
        assert!(l.objects.doors[0].is_locked);
        assert_eq!(l.objects.items.len(), 1);
        assert_eq!(
            l.objects.items[0].payload,
            ItemPayload::Key { target_door_id: Some("door_A".into()) }
        );
        assert!(l.connections.is_empty());
        assert!(l.warnings.is_empty());
    }

    #[test]
    fn embedded_gimmicks_get_positional_ids() {
        let l = build_ascii(&["#####", "#PLG#", "#####"], vec![]);
        assert_eq!(l.objects.doors[0].id, "LD1@2,1");
        assert!(l.objects.doors[0].is_locked);
        assert!(l.connections.is_empty());
    }

    #[test]
    fn wrong_tile_id_is_a_warning() {
        let l = build_ascii(&["#####", "#P.G#", "#####"], vec![
            EntityData::new("d1", EntityType::Door, 2, 1).with_tile("B1"),
        ]);
        assert_eq!(l.objects.doors.len(), 1);
        assert!(matches!(l.warnings[0], BuildWarning::WrongTile { .. }));
    }
}
