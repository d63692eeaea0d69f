/// The step function: advances the world by one tick of `dt_ms`.
///
/// Processing order:
///   0. Block transits + hit-region display timer (run even after the end)
///   1. Player movement (pushes blocks it runs into) and attack edge
///   2. Enemy AI
///   3. Button → door connections (level-triggered)
///   4. Player ↔ locked door (key consumption)
///   5. Item pickup
///   6. Enemy contact → GAME_OVER (defeated)
///   7. Goal containment → CLEARED
///   8. Countdown → GAME_OVER (time up)
///
/// Every mutation is visible to the checks after it in the same tick.
/// Input is sampled once by the host and passed in; nothing here reads
/// devices.

use crate::domain::ai;
use crate::domain::combat::{self, HitRegion};
use crate::domain::entity::{Dir4, FrameInput, ItemPayload};
use crate::domain::physics::{self, Axis, CONTACT_SLOP};
use super::event::{GameEvent, GameOverReason};
use super::world::{ActiveHit, Outcome, Phase, Solid, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput, dt_ms: u32) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    resolve_transits(world, dt_ms);
    if world.phase == Phase::Running {
        resolve_session(world, input, dt_ms, &mut events);
    }

    for e in &events {
        tracing::debug!("tick {}: {:?}", world.tick, e);
    }
    events
}

fn resolve_session(world: &mut WorldState, input: FrameInput, dt_ms: u32, events: &mut Vec<GameEvent>) {
    world.player.attack_cooldown_ms = world.player.attack_cooldown_ms.saturating_sub(dt_ms);

    resolve_player_movement(world, input, dt_ms, events);
    if input.attack { resolve_attack(world, events); }
    resolve_enemy_movement(world, dt_ms);
    resolve_connections(world, events);
    resolve_locked_doors(world, events);
    resolve_item_pickup(world, events);
    if resolve_enemy_contact(world, events) { return; }
    if resolve_goal(world, events) { return; }
    resolve_countdown(world, dt_ms, events);
}

/// One countdown second. Reaching zero ends the session.
pub fn countdown_tick(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.phase != Phase::Running || world.time_limit == 0 { return; }
    world.time_remaining = world.time_remaining.saturating_sub(1);
    events.push(GameEvent::CountdownTick { remaining: world.time_remaining });
    if world.time_remaining == 0 {
        world.finish(Outcome::GameOver { reason: GameOverReason::TimeUp }, events);
    }
}

// ══════════════════════════════════════════════════════════════
// Timers that outlive the session
// ══════════════════════════════════════════════════════════════

fn resolve_transits(world: &mut WorldState, dt_ms: u32) {
    for b in &mut world.objects.blocks {
        b.advance(dt_ms);
    }
    if let Some(hit) = world.hit.as_mut() {
        hit.remaining_ms = hit.remaining_ms.saturating_sub(dt_ms);
        if hit.remaining_ms == 0 { world.hit = None; }
    }
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player_movement(world: &mut WorldState, input: FrameInput, dt_ms: u32, events: &mut Vec<GameEvent>) {
    if !world.player.alive { return; }
    let (mx, my) = (input.move_x.signum() as f32, input.move_y.signum() as f32);
    if mx == 0.0 && my == 0.0 { return; }

    world.player.facing = if my > 0.0 {
        Dir4::Down
    } else if my < 0.0 {
        Dir4::Up
    } else if mx > 0.0 {
        Dir4::Right
    } else {
        Dir4::Left
    };

    // Diagonals move at the same speed as straight lines.
    let len = (mx * mx + my * my).sqrt();
    let dist = world.speed.player_speed * dt_ms as f32 / 1000.0 / len;
    let bounds = world.bounds();

    for (axis, delta) in [(Axis::X, mx * dist), (Axis::Y, my * dist)] {
        if delta == 0.0 { continue; }
        let solids = world.player_solids();
        let hit = physics::move_axis(&mut world.player.body, delta, axis, &solids, bounds);
        if let Some(Solid::Block(idx)) = hit {
            let pusher = world.player.center();
            if let Some(plan) = world.push_block(idx, pusher) {
                events.push(GameEvent::BlockPushed { from: plan.from, to: plan.to, dir: plan.dir });
            }
        }
    }
}

/// Attack edge: no weapon or cooldown still running = no-op.
fn resolve_attack(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.player.attack_cooldown_ms > 0 { return; }
    let weapon = match world.player.weapon.as_ref() {
        Some(w) => w,
        None => return,
    };

    let region = HitRegion::new(world.player.center(), world.player.facing, Some(weapon));
    world.player.attack_cooldown_ms = weapon.cooldown_ms;
    events.push(GameEvent::Attack { dir: world.player.facing });

    let report = combat::apply_hit(
        &region,
        &mut world.objects.enemies,
        &mut world.objects.breakable_walls,
        world.speed.enemy_flash_ms,
    );
    if report.is_empty() {
        tracing::debug!("swing at {:?} hit nothing", region.rect);
    }
    for &((x, y), hp) in &report.enemies_hit {
        events.push(GameEvent::EnemyHit { x, y, hp });
    }
    for &(x, y) in &report.enemies_destroyed {
        events.push(GameEvent::EnemyDestroyed { x, y });
    }
    for &((x, y), hp) in &report.walls_hit {
        events.push(GameEvent::WallHit { x, y, hp });
    }
    for &(x, y) in &report.walls_destroyed {
        events.push(GameEvent::WallDestroyed { x, y });
    }

    if world.speed.hit_region_ms > 0 {
        world.hit = Some(ActiveHit { region, remaining_ms: world.speed.hit_region_ms });
    }
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

fn resolve_enemy_movement(world: &mut WorldState, dt_ms: u32) {
    let solids = world.enemy_solids();
    let bounds = world.bounds();
    let turn = (world.speed.enemy_turn_min_ms, world.speed.enemy_turn_max_ms);
    for e in world.objects.enemies.iter_mut() {
        ai::update_enemy(e, dt_ms, turn, &solids, bounds, &mut world.rng);
    }
}

fn resolve_enemy_contact(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    if !world.player.alive { return false; }
    let body = world.player.body;
    if !world.objects.enemies.iter().any(|e| e.hp > 0 && e.body.overlaps(&body)) {
        return false;
    }
    world.player.alive = false;
    world.finish(Outcome::GameOver { reason: GameOverReason::Defeated }, events)
}

// ══════════════════════════════════════════════════════════════
// Gimmicks
// ══════════════════════════════════════════════════════════════

/// Level-triggered: every tick each unlocked, connected door is open iff
/// at least one of its buttons is pressed by the player or a block.
/// Locked doors are skipped entirely.
fn resolve_connections(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let o = &world.objects;
    let mut want_open: Vec<Option<bool>> = vec![None; o.doors.len()];
    for c in &world.connections {
        let door = &o.doors[c.door];
        if door.is_locked { continue; }
        let button = &o.buttons[c.button].body;
        let pressed = world.player.body.overlaps(button)
            || o.blocks.iter().any(|b| b.body.overlaps(button));
        let slot = &mut want_open[c.door];
        *slot = Some(slot.unwrap_or(false) || pressed);
    }

    for (door, want) in world.objects.doors.iter_mut().zip(want_open) {
        let open = match want { Some(o) => o, None => continue };
        if door.is_open == open { continue; }
        door.is_open = open;
        events.push(if open {
            GameEvent::DoorOpened { id: door.id.clone() }
        } else {
            GameEvent::DoorClosed { id: door.id.clone() }
        });
    }
}

/// Touching a locked door with its key consumes the key and unlocks the
/// door for good.
fn resolve_locked_doors(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let reach = world.player.body.inflate(CONTACT_SLOP);
    let keys = &mut world.player.keys;
    for door in world.objects.doors.iter_mut() {
        if !door.is_locked || !reach.overlaps(&door.body) { continue; }
        if !keys.remove(&door.id) { continue; }
        door.is_locked = false;
        door.is_open = true;
        events.push(GameEvent::DoorUnlocked { id: door.id.clone() });
        tracing::info!("door {} unlocked", door.id);
    }
}

fn resolve_item_pickup(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let body = world.player.body;
    let (picked, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut world.objects.items)
        .into_iter()
        .partition(|item| item.body.overlaps(&body));
    world.objects.items = kept;

    for item in picked {
        let (x, y) = item.body.cell_of_center();
        events.push(GameEvent::ItemPicked { x, y });
        match item.payload {
            ItemPayload::Weapon(w) => {
                events.push(GameEvent::WeaponEquipped { name: w.name.clone() });
                world.player.weapon = Some(w);
            }
            ItemPayload::Key { target_door_id } => {
                if let Some(id) = &target_door_id {
                    world.player.keys.insert(id.clone());
                }
                events.push(GameEvent::KeyCollected { door_id: target_door_id });
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Win / lose
// ══════════════════════════════════════════════════════════════

fn resolve_goal(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let body = world.player.body;
    if !world.objects.goals.iter().any(|g| g.body.contains(&body)) {
        return false;
    }
    let score = world.time_remaining;
    world.finish(Outcome::Cleared { score }, events)
}

fn resolve_countdown(world: &mut WorldState, dt_ms: u32, events: &mut Vec<GameEvent>) {
    if world.time_limit == 0 { return; }
    world.countdown_acc_ms += dt_ms;
    while world.countdown_acc_ms >= 1000 && world.phase == Phase::Running {
        world.countdown_acc_ms -= 1000;
        countdown_tick(world, events);
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeedConfig;
    use crate::domain::physics::{Rect, TILE_SIZE};
    use crate::domain::tile::TileCatalog;
    use crate::sim::map::{ascii, EntityData, EntityType, MapData};

    const DT: u32 = 16;

    fn world_with(map: MapData, time_limit: u32) -> WorldState {
        WorldState::new(map, TileCatalog::builtin(), time_limit, SpeedConfig::default(), 7).unwrap()
    }

    fn world(rows: &[&str]) -> WorldState {
        world_with(ascii(rows), 60)
    }

    fn run(w: &mut WorldState, input: FrameInput, ticks: usize) -> Vec<GameEvent> {
        let mut all = vec![];
        for _ in 0..ticks {
            all.extend(step(w, input, DT));
        }
        all
    }

    fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
        events.iter().filter(|&e| pred(e)).count()
    }

    // ── Lock / key ──

    fn key_and_lock() -> WorldState {
        let mut map = ascii(&["#######", "#P.k.G#", "#######"]);
        map.tiles[1][3] = " ".into();
        map.entities = vec![
            EntityData::new("key_A", EntityType::Key, 2, 1).with_target("door_A"),
            EntityData::new("door_A", EntityType::Door, 4, 1).with_tile("LD1"),
        ];
        world_with(map, 60)
    }

    #[test]
    fn key_is_consumed_once_on_contact() {
        let mut w = key_and_lock();
        assert!(w.objects.doors[0].is_locked);

        let events = run(&mut w, FrameInput::toward(Dir4::Right), 60);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::KeyCollected { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::DoorUnlocked { .. })), 1);
        assert!(!w.objects.doors[0].is_locked);
        assert!(w.player.keys.is_empty());

        // Re-entering contact with the now unlocked door does nothing more.
        let events = run(&mut w, FrameInput::toward(Dir4::Left), 10);
        let events2 = run(&mut w, FrameInput::toward(Dir4::Right), 10);
        assert!(!events.iter().chain(&events2).any(|e| matches!(e, GameEvent::DoorUnlocked { .. })));
    }

    #[test]
    fn unlocked_door_then_follows_its_button() {
        let mut map = ascii(&["########", "#P.....#", "#....G.#", "########"]);
        map.entities = vec![
            EntityData::new("key_A", EntityType::Key, 2, 1).with_target("door_A"),
            EntityData::new("btn_A", EntityType::Button, 3, 1).with_target("door_A"),
            EntityData::new("door_A", EntityType::Door, 5, 1).with_tile("LD1"),
        ];
        let mut w = world_with(map, 60);

        // over the button while still locked, then up against the door
        let mut unlocked = false;
        for _ in 0..120 {
            let events = step(&mut w, FrameInput::toward(Dir4::Right), DT);
            assert!(!events.iter().any(|e| matches!(e, GameEvent::DoorOpened { .. })));
            if events.iter().any(|e| matches!(e, GameEvent::DoorUnlocked { .. })) {
                unlocked = true;
                break;
            }
        }
        assert!(unlocked);
        assert!(w.objects.doors[0].is_open);

        // nobody on the button: the door shuts on the next tick
        let events = step(&mut w, FrameInput::idle(), DT);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::DoorClosed { .. })), 1);
        assert!(!w.objects.doors[0].is_locked);
        assert!(!w.objects.doors[0].is_open);

        let events = run(&mut w, FrameInput::toward(Dir4::Left), 20);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::DoorOpened { .. })), 1);
        assert!(w.objects.doors[0].is_open);
    }

    #[test]
    fn locked_door_stops_player_without_key() {
        let mut map = ascii(&["#######", "#P..G.#", "#######"]);
        map.entities = vec![EntityData::new("door_A", EntityType::Door, 3, 1).with_tile("LD1")];
        let mut w = world_with(map, 60);
        run(&mut w, FrameInput::toward(Dir4::Right), 120);
        assert_eq!(w.player.body.right(), 3.0 * TILE_SIZE);
        assert!(w.objects.doors[0].is_locked);
        assert_eq!(w.phase, Phase::Running);
    }

    // ── Lethal contact ──

    #[test]
    fn enemy_contact_ends_game_exactly_once() {
        let mut w = world(&["######", "#P.E.#", "#...G#", "######"]);
        w.objects.enemies[0].speed = 0.0;
        w.objects.enemies[0].body = Rect::from_center(w.player.center().0 + 4.0, w.player.center().1, 24.0, 24.0);

        let events = run(&mut w, FrameInput::idle(), 5);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::GameOver { reason: GameOverReason::Defeated })), 1);
        assert_eq!(w.phase, Phase::GameOver);
        assert!(!w.player.alive);
        assert_eq!(w.outcome, Some(Outcome::GameOver { reason: GameOverReason::Defeated }));
    }

    // ── Combat ──

    #[test]
    fn wall_with_three_hp_needs_three_timed_hits() {
        let mut w = world(&["#######", "#PS3.G#", "#######"]);
        // walk onto the sword, stop against the wall
        run(&mut w, FrameInput::toward(Dir4::Right), 60);
        assert!(w.player.weapon.is_some());
        assert_eq!(w.player.facing, Dir4::Right);
        assert_eq!(w.objects.breakable_walls.len(), 1);
        run(&mut w, FrameInput::idle(), 20);

        let first = step(&mut w, FrameInput::attack(), DT);
        assert_eq!(count(&first, |e| matches!(e, GameEvent::WallHit { hp: 2, .. })), 1);

        // still cooling down
        let early = step(&mut w, FrameInput::attack(), DT);
        assert!(early.is_empty());
        assert_eq!(w.objects.breakable_walls[0].hp, Some(2));

        run(&mut w, FrameInput::idle(), 20);
        step(&mut w, FrameInput::attack(), DT);
        assert_eq!(w.objects.breakable_walls[0].hp, Some(1));

        run(&mut w, FrameInput::idle(), 20);
        let last = step(&mut w, FrameInput::attack(), DT);
        assert_eq!(count(&last, |e| matches!(e, GameEvent::WallDestroyed { x: 3, y: 1 })), 1);
        assert!(w.objects.breakable_walls.is_empty());
    }

    #[test]
    fn second_weapon_replaces_the_first() {
        let mut catalog = TileCatalog::builtin();
        catalog.merge(TileCatalog::from_toml(r#"
[tiles.S2]
category = "ITEM"

[tiles.S2.weapon]
id = "AXE"
name = "Axe"
range = 30.0
size = 28.0
damage = 3
cooldown = 500
"#).unwrap());
        let mut map = ascii(&["########", "#PS....#", "#.....G#", "########"]);
        map.tiles[1][4] = "S2".into();
        let mut w = WorldState::new(map, catalog, 60, SpeedConfig::default(), 7).unwrap();

        let events = run(&mut w, FrameInput::toward(Dir4::Right), 40);
        assert_eq!(w.player.weapon.as_ref().map(|wd| wd.id.as_str()), Some("SWORD"));
        let events: Vec<_> = events.into_iter().chain(run(&mut w, FrameInput::toward(Dir4::Right), 60)).collect();

        let equipped: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::WeaponEquipped { name } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(equipped, vec!["Sword", "Axe"]);
        let held = w.player.weapon.as_ref().unwrap();
        assert_eq!((held.id.as_str(), held.damage, held.cooldown_ms), ("AXE", 3, 500));
        assert!(w.objects.items.is_empty());
    }

    #[test]
    fn attack_without_weapon_is_noop() {
        let mut w = world(&["######", "#P1.G#", "######"]);
        let events = step(&mut w, FrameInput::attack(), DT);
        assert!(events.is_empty());
        assert!(w.hit.is_none());
        assert_eq!(w.objects.breakable_walls[0].hp, Some(1));
    }

    #[test]
    fn hit_region_expires() {
        let mut w = world(&["######", "#PS.G#", "######"]);
        run(&mut w, FrameInput::toward(Dir4::Right), 10);
        assert!(w.player.weapon.is_some());
        step(&mut w, FrameInput::attack(), DT);
        assert!(w.hit.is_some());
        run(&mut w, FrameInput::idle(), 7);
        assert!(w.hit.is_none());
    }

    // ── Countdown ──

    #[test]
    fn countdown_exhaustion_is_time_up() {
        let mut w = world_with(ascii(&["#####", "#P.G#", "#####"]), 5);
        let mut events = vec![];
        for _ in 0..5 {
            countdown_tick(&mut w, &mut events);
        }
        assert_eq!(w.phase, Phase::GameOver);
        assert_eq!(w.time_remaining, 0);
        assert_eq!(w.outcome, Some(Outcome::GameOver { reason: GameOverReason::TimeUp }));
        assert_eq!(count(&events, |e| matches!(e, GameEvent::CountdownTick { .. })), 5);

        // stopped timer: further ticks are ignored
        countdown_tick(&mut w, &mut events);
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn countdown_follows_elapsed_time() {
        let mut w = world_with(ascii(&["#####", "#P.G#", "#####"]), 2);
        let events = run(&mut w, FrameInput::idle(), 63);
        assert_eq!(w.time_remaining, 1);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::CountdownTick { remaining: 1 })), 1);
        let events = run(&mut w, FrameInput::idle(), 100);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::GameOver { .. })), 1);
        assert_eq!(w.phase, Phase::GameOver);
    }

    #[test]
    fn stalled_frame_time_still_counts_down() {
        let mut w = world_with(ascii(&["#####", "#P.G#", "#####"]), 10);
        let x = w.player.body.x;
        w.credit_countdown(2500);
        let events = step(&mut w, FrameInput::toward(Dir4::Right), DT);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::CountdownTick { .. })), 2);
        assert_eq!(w.time_remaining, 8);
        // movement only saw one tick
        assert!(w.player.body.x - x < 2.0);

        // nothing is credited once the session is over
        let mut end = vec![];
        w.finish(Outcome::GameOver { reason: GameOverReason::Defeated }, &mut end);
        let acc = w.countdown_acc_ms;
        w.credit_countdown(5000);
        assert_eq!(w.countdown_acc_ms, acc);
    }

    // ── Goal ──

    #[test]
    fn reaching_goal_clears_with_time_left() {
        let mut w = world(&["#####", "#PG.#", "#####"]);
        let events = run(&mut w, FrameInput::toward(Dir4::Right), 40);
        assert_eq!(w.phase, Phase::Cleared);
        assert_eq!(w.outcome, Some(Outcome::Cleared { score: 60 }));
        assert_eq!(count(&events, |e| matches!(e, GameEvent::Cleared { score: 60 })), 1);
        // frozen: no more movement
        let x = w.player.body.x;
        run(&mut w, FrameInput::toward(Dir4::Left), 10);
        assert_eq!(w.player.body.x, x);
    }

    // ── Buttons ──

    fn button_door() -> WorldState {
        let mut map = ascii(&["########", "#P..#..#", "#.....G#", "#...#..#", "########"]);
        map.entities = vec![
            EntityData::new("door_A", EntityType::Door, 4, 2),
            EntityData::new("btn_A", EntityType::Button, 2, 1).with_target("door_A"),
        ];
        world_with(map, 60)
    }

    #[test]
    fn button_is_level_triggered() {
        let mut w = button_door();
        assert!(!w.objects.doors[0].is_open);

        let events = run(&mut w, FrameInput::toward(Dir4::Right), 30);
        assert!(w.objects.doors[0].is_open);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::DoorOpened { .. })), 1);

        // standing still keeps it open; no repeated events
        let events = run(&mut w, FrameInput::idle(), 10);
        assert!(events.iter().all(|e| !matches!(e, GameEvent::DoorOpened { .. })));

        let events = run(&mut w, FrameInput::toward(Dir4::Left), 30);
        assert!(!w.objects.doors[0].is_open);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::DoorClosed { .. })), 1);
    }

    #[test]
    fn block_on_button_holds_door_open() {
        let mut w = button_door();
        w.objects.blocks.push(crate::domain::entity::MovableBlock::new(2, 1, crate::domain::tile::FrictionClass::Heavy));
        step(&mut w, FrameInput::idle(), DT);
        assert!(w.objects.doors[0].is_open);
    }

    #[test]
    fn locked_door_ignores_its_button() {
        let mut map = ascii(&["########", "#P..#..#", "#.....G#", "#...#..#", "########"]);
        map.entities = vec![
            EntityData::new("door_A", EntityType::Door, 4, 2).with_tile("LD1"),
            EntityData::new("btn_A", EntityType::Button, 2, 1).with_target("door_A"),
        ];
        let mut w = world_with(map, 60);
        run(&mut w, FrameInput::toward(Dir4::Right), 30);
        assert!(!w.objects.doors[0].is_open);
        assert!(w.objects.doors[0].is_solid());
    }

    // ── Push ──

    #[test]
    fn ice_slide_takes_proportional_time() {
        let mut w = world(&["########", "#PI...#G", "########"]);
        let mut pushed = vec![];
        for _ in 0..20 {
            pushed.extend(step(&mut w, FrameInput::toward(Dir4::Right), DT));
            if w.objects.blocks[0].is_moving() { break; }
        }
        assert_eq!(count(&pushed, |e| matches!(e, GameEvent::BlockPushed { to: (5, 1), .. })), 1);

        // 3 cells at 120 ms each
        let per_cell = w.speed.block_cell_ms;
        let transit = w.objects.blocks[0].transit.unwrap();
        assert_eq!(transit.duration_ms, 3 * per_cell);

        let mut ticks = 0;
        while w.objects.blocks[0].is_moving() {
            step(&mut w, FrameInput::idle(), DT);
            ticks += 1;
        }
        assert_eq!(ticks, (3 * per_cell).div_ceil(DT));
        assert_eq!(w.objects.blocks[0].body, Rect::cell(5, 1));
    }

    #[test]
    fn stone_against_wall_does_not_move() {
        let mut w = world(&["######", "#PR#G#", "######"]);
        let events = run(&mut w, FrameInput::toward(Dir4::Right), 30);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::BlockPushed { .. })));
        assert_eq!(w.objects.blocks[0].cell, (2, 1));
        assert!(!w.objects.blocks[0].is_moving());
    }

    #[test]
    fn block_tween_finishes_after_game_ends() {
        let mut w = world(&["#######", "#PI..G#", "#.....#", "#######"]);
        run(&mut w, FrameInput::toward(Dir4::Right), 8);
        assert!(w.objects.blocks[0].is_moving());
        let mut events = vec![];
        w.finish(Outcome::GameOver { reason: GameOverReason::Defeated }, &mut events);
        run(&mut w, FrameInput::idle(), 40);
        assert!(!w.objects.blocks[0].is_moving());
    }
}
