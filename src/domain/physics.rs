/// Rectangle physics: the small set of primitives the simulation needs
/// from a 2D physics collaborator, plus the push resolver for movable
/// blocks.
///
/// ## Coordinates
///
/// World units are pixels. One grid cell is `TILE_SIZE` pixels square;
/// cell `(cx, cy)` covers `[cx*32, cx*32+32) x [cy*32, cy*32+32)`.
/// Every body is an axis-aligned `Rect` stored by its top-left corner.
///
/// ## Overlap vs contact
///
/// `overlaps` is strict: rectangles that merely share an edge do not
/// overlap. Solid bodies therefore never overlap after a resolved move,
/// and "contact" with a solid is tested with `inflate(CONTACT_SLOP)`.
///
/// ## Push resolution
///
///   HEAVY  : probe one cell; move there if free.
///   SLIDING: probe cell by cell; stop before the first blocked cell or
///             at the last cell inside the grid.
///   first probe blocked → zero displacement (caller must not animate).

use super::entity::Dir4;
use super::tile::FrictionClass;

pub const TILE_SIZE: f32 = 32.0;

/// Distance used to turn "touching" into "overlapping" for contact checks.
pub const CONTACT_SLOP: f32 = 1.0;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Rect { x: cx - w / 2.0, y: cy - h / 2.0, w, h }
    }

    /// The full rectangle of grid cell `(cx, cy)`.
    pub fn cell(cx: i32, cy: i32) -> Self {
        Rect::new(cx as f32 * TILE_SIZE, cy as f32 * TILE_SIZE, TILE_SIZE, TILE_SIZE)
    }

    /// A `w x h` body centred in grid cell `(cx, cy)`.
    pub fn in_cell(cx: i32, cy: i32, w: f32, h: f32) -> Self {
        let (x, y) = cell_center(cx, cy);
        Rect::from_center(x, y, w, h)
    }

    #[inline] pub fn right(&self) -> f32 { self.x + self.w }
    #[inline] pub fn bottom(&self) -> f32 { self.y + self.h }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Strict intersection (shared edges do not count).
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Is `other` fully inside this rectangle? Edges inclusive.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn inflate(&self, d: f32) -> Rect {
        Rect::new(self.x - d, self.y - d, self.w + 2.0 * d, self.h + 2.0 * d)
    }

    /// Grid cell containing the centre.
    pub fn cell_of_center(&self) -> (i32, i32) {
        let (x, y) = self.center();
        cell_at(x, y)
    }
}

pub fn cell_center(cx: i32, cy: i32) -> (f32, f32) {
    (
        cx as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        cy as f32 * TILE_SIZE + TILE_SIZE / 2.0,
    )
}

pub fn cell_at(x: f32, y: f32) -> (i32, i32) {
    ((x / TILE_SIZE).floor() as i32, (y / TILE_SIZE).floor() as i32)
}

// ══════════════════════════════════════════════════════════════
// Axis-separated mover
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Axis {
    X,
    Y,
}

/// Move `body` by `delta` along one axis and clamp against `solids` and
/// the world rectangle `[0, bounds.0] x [0, bounds.1]`.
///
/// Solids the body already overlapped before the move are ignored, so a
/// body inside a door that just closed can still walk out.
///
/// Returns the tag of the solid that stopped the move, if any.
pub fn move_axis<T: Copy>(
    body: &mut Rect,
    delta: f32,
    axis: Axis,
    solids: &[(Rect, T)],
    bounds: (f32, f32),
) -> Option<T> {
    if delta == 0.0 {
        return None;
    }
    let before = *body;
    match axis {
        Axis::X => body.x += delta,
        Axis::Y => body.y += delta,
    }

    let mut hit = None;
    for (rect, tag) in solids {
        if before.overlaps(rect) || !body.overlaps(rect) {
            continue;
        }
        match (axis, delta > 0.0) {
            (Axis::X, true) => body.x = body.x.min(rect.x - body.w),
            (Axis::X, false) => body.x = body.x.max(rect.right()),
            (Axis::Y, true) => body.y = body.y.min(rect.y - body.h),
            (Axis::Y, false) => body.y = body.y.max(rect.bottom()),
        }
        hit = Some(*tag);
    }

    body.x = body.x.max(0.0).min((bounds.0 - body.w).max(0.0));
    body.y = body.y.max(0.0).min((bounds.1 - body.h).max(0.0));
    hit
}

// ══════════════════════════════════════════════════════════════
// Push resolver
// ══════════════════════════════════════════════════════════════

/// Push direction from pusher centre toward block centre: the axis with
/// the larger displacement wins, ties go horizontal.
pub fn push_direction(pusher: (f32, f32), block: (f32, f32)) -> Dir4 {
    let dx = block.0 - pusher.0;
    let dy = block.1 - pusher.1;
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 { Dir4::Right } else { Dir4::Left }
    } else if dy > 0.0 {
        Dir4::Down
    } else {
        Dir4::Up
    }
}

/// Result of a push: where the block ends up and how far it travels.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PushPlan {
    pub dir: Dir4,
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub cells: u32,
}

impl PushPlan {
    pub fn is_noop(&self) -> bool {
        self.cells == 0
    }
}

/// Scan from `from` along `dir` until blocked.
///
/// `is_blocked(cx, cy)` answers for cells inside the grid; cells outside
/// `grid` end the scan.
pub fn resolve_push(
    from: (i32, i32),
    friction: FrictionClass,
    dir: Dir4,
    grid: (usize, usize),
    is_blocked: impl Fn(i32, i32) -> bool,
) -> PushPlan {
    let (dx, dy) = dir.delta();
    let max_steps = match friction {
        FrictionClass::Heavy => 1,
        FrictionClass::Sliding => u32::MAX,
    };

    let mut to = from;
    let mut cells = 0;
    while cells < max_steps {
        let next = (to.0 + dx, to.1 + dy);
        let inside = next.0 >= 0
            && next.1 >= 0
            && (next.0 as usize) < grid.0
            && (next.1 as usize) < grid.1;
        if !inside || is_blocked(next.0, next.1) {
            break;
        }
        to = next;
        cells += 1;
    }

    PushPlan { dir, from, to, cells }
}

/// Constant-speed transit: duration scales with distance.
pub fn transit_duration_ms(cells: u32, per_cell_ms: u32) -> u32 {
    cells.saturating_mul(per_cell_ms)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    /// Rows of '#' (blocked) and '.' (free); returns a blocked-cell closure input.
    fn grid_from(rows: &[&str]) -> (Vec<Vec<bool>>, (usize, usize)) {
        let cells: Vec<Vec<bool>> = rows.iter()
            .map(|r| r.chars().map(|c| c == '#').collect())
            .collect();
        let size = (rows[0].len(), rows.len());
        (cells, size)
    }

    // ── Rect ──

    #[test]
    fn shared_edge_is_not_overlap() {
        let a = Rect::cell(0, 0);
        let b = Rect::cell(1, 0);
        assert!(!a.overlaps(&b));
        assert!(a.inflate(CONTACT_SLOP).overlaps(&b));
    }

    #[test]
    fn contains_is_inclusive() {
        let goal = Rect::cell(2, 2);
        assert!(goal.contains(&Rect::in_cell(2, 2, 20.0, 20.0)));
        assert!(goal.contains(&goal));
        assert!(!goal.contains(&Rect::in_cell(2, 2, 20.0, 20.0).inflate(7.0)));
    }

    #[test]
    fn center_cell_lookup() {
        let r = Rect::in_cell(3, 4, 20.0, 20.0);
        assert_eq!(r.cell_of_center(), (3, 4));
        assert_eq!(r.center(), (112.0, 144.0));
    }

    // ── move_axis ──

    #[test]
    fn move_stops_flush_against_solid() {
        let mut body = Rect::new(0.0, 0.0, 20.0, 20.0);
        let solids = [(Rect::cell(1, 0), 7u8)];
        let hit = move_axis(&mut body, 30.0, Axis::X, &solids, (320.0, 320.0));
        assert_eq!(hit, Some(7));
        assert_eq!(body.x, 12.0);
    }

    #[test]
    fn move_clamps_to_world_bounds() {
        let mut body = Rect::new(5.0, 5.0, 20.0, 20.0);
        let solids: [(Rect, ()); 0] = [];
        assert_eq!(move_axis(&mut body, -50.0, Axis::Y, &solids, (64.0, 64.0)), None);
        assert_eq!(body.y, 0.0);
        move_axis(&mut body, 500.0, Axis::X, &solids, (64.0, 64.0));
        assert_eq!(body.x, 44.0);
    }

    #[test]
    fn already_overlapping_solid_is_ignored() {
        let mut body = Rect::in_cell(1, 1, 20.0, 20.0);
        let solids = [(Rect::cell(1, 1), ())];
        assert_eq!(move_axis(&mut body, 4.0, Axis::X, &solids, (320.0, 320.0)), None);
    }

    // ── push_direction ──

    #[test]
    fn push_direction_prefers_larger_axis() {
        assert_eq!(push_direction((0.0, 0.0), (10.0, 3.0)), Dir4::Right);
        assert_eq!(push_direction((0.0, 0.0), (-10.0, 3.0)), Dir4::Left);
        assert_eq!(push_direction((0.0, 0.0), (2.0, 9.0)), Dir4::Down);
        assert_eq!(push_direction((0.0, 0.0), (2.0, -9.0)), Dir4::Up);
    }

    #[test]
    fn push_direction_tie_goes_horizontal() {
        assert_eq!(push_direction((0.0, 0.0), (5.0, 5.0)), Dir4::Right);
        assert_eq!(push_direction((0.0, 0.0), (-5.0, -5.0)), Dir4::Left);
    }

    // ── resolve_push ──

    #[test]
    fn heavy_block_against_obstruction_does_not_move() {
        let (g, size) = grid_from(&["..#.."]);
        let plan = resolve_push((1, 0), FrictionClass::Heavy, Dir4::Right, size, |x, y| g[y as usize][x as usize]);
        assert!(plan.is_noop());
        assert_eq!(plan.to, (1, 0));
    }

    #[test]
    fn heavy_block_moves_one_cell_only() {
        let (g, size) = grid_from(&["......"]);
        let plan = resolve_push((1, 0), FrictionClass::Heavy, Dir4::Right, size, |x, y| g[y as usize][x as usize]);
        assert_eq!(plan.to, (2, 0));
        assert_eq!(plan.cells, 1);
    }

    #[test]
    fn sliding_block_stops_before_wall() {
        // block at 1, free 2..=4, wall at 5
        let (g, size) = grid_from(&["#....#"]);
        let plan = resolve_push((1, 0), FrictionClass::Sliding, Dir4::Right, size, |x, y| g[y as usize][x as usize]);
        assert_eq!(plan.to, (4, 0));
        assert_eq!(plan.cells, 3);
        assert_eq!(transit_duration_ms(plan.cells, 120), 3 * transit_duration_ms(1, 120));
    }

    #[test]
    fn sliding_block_stops_at_grid_edge() {
        let (g, size) = grid_from(&[".", ".", ".", "."]);
        let plan = resolve_push((0, 0), FrictionClass::Sliding, Dir4::Down, size, |x, y| g[y as usize][x as usize]);
        assert_eq!(plan.to, (0, 3));
        assert_eq!(plan.cells, 3);
    }

    #[test]
    fn sliding_block_blocked_immediately() {
        let (g, size) = grid_from(&["#.", ".."]);
        let plan = resolve_push((0, 1), FrictionClass::Sliding, Dir4::Up, size, |x, y| g[y as usize][x as usize]);
        assert!(plan.is_noop());
    }
}
