/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into the `front` buffer (array of Cell)
///   2. Compare each cell with the `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// ## Layout
///
///   ```text
///   row 0        HUD: dungeon name, time, weapon, keys, enemies
///   row 1        (gap)
///   row 2..      map viewport, one grid cell = 2 terminal columns
///   map+1        message bar (latest notable event) or end banner
///   map+3        help
///   ```
///
/// The map is drawn in layers: floor, static tiles, gimmicks, items,
/// blocks, enemies, hit region, player. Continuous bodies land on the
/// cell under their centre.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{Dir4, ItemPayload};
use crate::domain::physics::{cell_at, Rect};
use crate::domain::tile::FrictionClass;
use crate::sim::event::GameEvent;
use crate::sim::world::{Outcome, Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, used for
    /// both `Clear(ClearType::All)` and every cell so row gaps match.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = if bg == Color::Reset { Self::BASE_BG } else { bg };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    /// Paint a whole row, then write `s` over it.
    fn bar(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', fg, bg));
        }
        self.put_str(0, y, s, fg, bg);
    }
}

// ── Camera ──

/// Viewport into the grid. `(x, y)` is the top-left visible cell and may
/// be negative when the map is smaller than the view (centred).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Camera {
    x: i32,
    y: i32,
    view_w: usize,
    view_h: usize,
}

impl Camera {
    /// Follow a target with a dead zone of 20% on each side.
    fn follow(&mut self, target: (i32, i32), world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, target.0, self.view_w, world_w);
        self.y = follow_axis(self.y, target.1, self.view_h, world_h);
    }
}

fn follow_axis(origin: i32, target: i32, view: usize, world: usize) -> i32 {
    let (view, world) = (view as i32, world as i32);
    if world <= view {
        return -((view - world) / 2);
    }
    let margin = view / 5;
    let mut o = origin;
    if target < o + margin {
        o = target - margin;
    } else if target > o + view - margin - 1 {
        o = target - view + margin + 1;
    }
    o.clamp(0, world - view)
}

// ── Renderer ──

/// Each game cell maps to columns (gx*2, gx*2+1).
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

/// How many frames an event message stays on the message bar.
const MESSAGE_FRAMES: u32 = 90;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const FLOOR_BG: Color = Color::Rgb { r: 30, g: 30, b: 42 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    camera: Camera,
    last_phase: Option<Phase>,
    enhanced_keys: bool,
    message: String,
    message_timer: u32,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            camera: Camera::default(),
            last_phase: None,
            enhanced_keys: false,
            message: String::new(),
            message_timer: 0,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether the
    /// terminal reports key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced_keys = true;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back != front for every cell.
        self.back.cells.fill(Cell::INVALID);
    }

    /// Pick up the step's notable events for the message bar.
    pub fn note_events(&mut self, events: &[GameEvent]) {
        if let Some(msg) = events.iter().rev().find_map(event_message) {
            self.message = msg;
            self.message_timer = MESSAGE_FRAMES;
        }
    }

    pub fn clear_message(&mut self) {
        self.message.clear();
        self.message_timer = 0;
    }

    pub fn render(&mut self, world: &WorldState, title: &str) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Clean slate on phase change so the banner does not leave residue.
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.compose(world, title);
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 { self.message.clear(); }
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;

        // Do NOT use ResetColor here; the terminal default may differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut need_move = true;
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }
                if need_move {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, w: &WorldState, title: &str) {
        self.front.clear();

        let reserved_rows = MAP_ROW + 4;
        self.camera.view_w = (self.term_w / CELL_W).min(w.width);
        self.camera.view_h = self.term_h.saturating_sub(reserved_rows).max(1).min(w.height);
        self.camera.follow(w.player.body.cell_of_center(), w.width, w.height);

        self.compose_hud(w, title);
        self.compose_map(w);

        let msg_row = MAP_ROW + self.camera.view_h + 1;
        match w.outcome {
            Some(outcome) => {
                let (text, bg) = banner(outcome);
                self.front.bar(msg_row, &text, Color::White, bg);
            }
            None if !self.message.is_empty() => {
                let text = format!(" * {} ", self.message);
                self.front.bar(msg_row, &text, Color::Black, MSG_BG);
            }
            None => {}
        }

        let help = if w.is_terminal() {
            " R:Play again  Q/Esc:Quit"
        } else {
            " Arrows/WASD:Move  Space:Attack  R:Restart  Q/Esc:Quit"
        };
        self.front.put_str(0, msg_row + 2, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_hud(&mut self, w: &WorldState, title: &str) {
        let time = if w.time_limit == 0 {
            "--".to_string()
        } else {
            format!("{:>3}", w.time_remaining)
        };
        let weapon = w.player.weapon.as_ref().map_or("-", |wd| wd.name.as_str());
        let hud = format!(
            " {}  Time:{}  Weapon:{}  Keys:{}  Enemies:{} ",
            title, time, weapon, w.player.keys.len(), w.objects.enemies.len(),
        );
        self.front.bar(HUD_ROW, &hud, Color::White, HUD_BG);
    }

    /// Draw a two-column glyph at grid cell `(gx, gy)` if it is in view.
    fn put_cell(&mut self, gx: i32, gy: i32, glyph: [char; 2], fg: Color, bg: Color) {
        let cam = self.camera;
        let (vx, vy) = (gx - cam.x, gy - cam.y);
        if vx < 0 || vy < 0 || vx as usize >= cam.view_w || vy as usize >= cam.view_h {
            return;
        }
        let col = vx as usize * CELL_W;
        let row = MAP_ROW + vy as usize;
        self.front.set(col, row, Cell::new(glyph[0], fg, bg));
        self.front.set(col + 1, row, Cell::new(glyph[1], fg, bg));
    }

    fn put_body(&mut self, body: &Rect, glyph: [char; 2], fg: Color, bg: Color) {
        let (gx, gy) = body.cell_of_center();
        self.put_cell(gx, gy, glyph, fg, bg);
    }

    fn compose_map(&mut self, w: &WorldState) {
        let cam = self.camera;
        for vy in 0..cam.view_h as i32 {
            for vx in 0..cam.view_w as i32 {
                self.put_cell(cam.x + vx, cam.y + vy, [' ', ' '], Color::White, FLOOR_BG);
            }
        }

        let o = &w.objects;
        for wall in &o.walls {
            self.put_body(&wall.body, ['█', '█'], Color::Rgb { r: 120, g: 120, b: 120 }, Color::Rgb { r: 70, g: 70, b: 70 });
        }
        for wall in &o.breakable_walls {
            let hp = wall.hp.unwrap_or(0).clamp(0, 9) as u32;
            let digit = char::from_digit(hp, 10).unwrap_or('?');
            self.put_body(&wall.body, ['░', digit], Color::Rgb { r: 180, g: 120, b: 60 }, Color::Rgb { r: 100, g: 65, b: 30 });
        }
        for button in &o.buttons {
            // unlinked buttons do nothing; draw them dimmed
            let fg = if button.linked_door_id.is_some() {
                Color::Rgb { r: 255, g: 120, b: 200 }
            } else {
                Color::DarkGrey
            };
            self.put_body(&button.body, ['(', ')'], fg, Color::Reset);
        }
        for goal in &o.goals {
            self.put_body(&goal.body, ['▞', '▚'], Color::Rgb { r: 80, g: 255, b: 80 }, Color::Rgb { r: 20, g: 60, b: 20 });
        }
        for door in &o.doors {
            let (glyph, fg) = if door.is_locked {
                (['[', ']'], Color::Rgb { r: 255, g: 220, b: 50 })
            } else if door.is_open {
                (['·', '·'], Color::Rgb { r: 160, g: 110, b: 60 })
            } else {
                (['▐', '▌'], Color::Rgb { r: 160, g: 110, b: 60 })
            };
            self.put_body(&door.body, glyph, fg, Color::Rgb { r: 60, g: 40, b: 20 });
        }
        for item in &o.items {
            let (glyph, fg) = match &item.payload {
                ItemPayload::Key { .. } => (['k', '~'], Color::Rgb { r: 255, g: 220, b: 50 }),
                ItemPayload::Weapon(_) => (['†', ' '], Color::Rgb { r: 200, g: 200, b: 255 }),
            };
            self.put_body(&item.body, glyph, fg, Color::Reset);
        }
        for block in &o.blocks {
            let (glyph, fg, bg) = match block.friction {
                FrictionClass::Heavy => (['▓', '▓'], Color::Rgb { r: 150, g: 140, b: 120 }, Color::Rgb { r: 60, g: 55, b: 45 }),
                FrictionClass::Sliding => (['▒', '▒'], Color::Rgb { r: 180, g: 240, b: 255 }, Color::Rgb { r: 40, g: 80, b: 100 }),
            };
            self.put_body(&block.body, glyph, fg, bg);
        }
        for enemy in &o.enemies {
            let initial = enemy.name.chars().next().unwrap_or('e');
            let hp = char::from_digit(enemy.hp.clamp(0, 9) as u32, 10).unwrap_or('+');
            let (fg, bg) = if enemy.flash_ms > 0 {
                (Color::White, Color::Rgb { r: 200, g: 40, b: 40 })
            } else {
                (Color::Rgb { r: 255, g: 90, b: 90 }, Color::Reset)
            };
            self.put_body(&enemy.body, [initial, hp], fg, bg);
        }
        if let Some(hit) = &w.hit {
            let r = hit.region.rect;
            let (x0, y0) = cell_at(r.x, r.y);
            let (x1, y1) = cell_at(r.right() - 1.0, r.bottom() - 1.0);
            for gy in y0..=y1 {
                for gx in x0..=x1 {
                    self.put_cell(gx, gy, ['*', '*'], Color::Rgb { r: 255, g: 255, b: 120 }, Color::Rgb { r: 90, g: 60, b: 0 });
                }
            }
        }
        if w.player.alive {
            let arrow = match w.player.facing {
                Dir4::Left => '<',
                Dir4::Right => '>',
                Dir4::Up => '^',
                Dir4::Down => 'v',
            };
            self.put_body(&w.player.body, ['@', arrow], Color::Rgb { r: 120, g: 220, b: 255 }, Color::Reset);
        }
    }
}

fn banner(outcome: Outcome) -> (String, Color) {
    match outcome {
        Outcome::Cleared { score } => (
            format!(" DUNGEON CLEARED!  Score: {score}   R: play again   Q: quit "),
            Color::Rgb { r: 20, g: 90, b: 20 },
        ),
        Outcome::GameOver { reason } => (
            format!(" GAME OVER ({})   R: retry   Q: quit ", reason.label()),
            Color::Rgb { r: 120, g: 20, b: 20 },
        ),
    }
}

/// Message-bar text for the events worth telling the player about.
fn event_message(event: &GameEvent) -> Option<String> {
    match event {
        GameEvent::WeaponEquipped { name } => Some(format!("Equipped {name}")),
        GameEvent::KeyCollected { door_id: Some(id) } => Some(format!("Picked up the key to {id}")),
        GameEvent::KeyCollected { door_id: None } => Some("Picked up a key that fits nothing".into()),
        GameEvent::DoorUnlocked { id } => Some(format!("Unlocked {id}")),
        GameEvent::EnemyDestroyed { .. } => Some("Enemy defeated".into()),
        GameEvent::WallDestroyed { .. } => Some("Wall crumbles".into()),
        _ => None,
    }
}
