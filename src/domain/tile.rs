/// Tile catalog: static mapping from a tile symbol to its semantic
/// category and gameplay parameters.
///
/// Pure data, loaded once at startup. Tile semantics (what is solid,
/// what slides, what a weapon does) are centralized here so the level
/// builder can stay a flat dispatch over categories.
///
/// Unknown symbols are never an error: `category()` reports them as
/// `Empty`, which keeps old runtimes forward-compatible with maps that
/// use tile types added later.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TileCategory {
    #[default]
    Empty,
    Wall,
    Stone,
    Ice,
    Player,
    Enemy,
    Item,
    Gimmick,
    Goal,
}

/// How a pushed block travels.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FrictionClass {
    /// Single-step push (stone).
    Heavy,
    /// Slides until obstructed (ice).
    Sliding,
}

impl TileCategory {
    /// Friction class for movable-block categories, `None` otherwise.
    pub fn friction(self) -> Option<FrictionClass> {
        match self {
            TileCategory::Stone => Some(FrictionClass::Heavy),
            TileCategory::Ice => Some(FrictionClass::Sliding),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct WeaponData {
    pub id: String,
    pub name: String,
    /// Distance from the attacker's centre to the hit region's centre.
    pub range: f32,
    /// Side length of the square hit region.
    pub size: f32,
    pub damage: i32,
    #[serde(rename = "cooldown")]
    pub cooldown_ms: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveType {
    /// Random pick among the four axis directions.
    #[default]
    Wander,
    /// Strict left/right oscillation.
    Horizontal,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EnemyData {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enemy_hp")]
    pub hp: i32,
    #[serde(default)]
    pub move_type: MoveType,
    /// px/s
    #[serde(default = "default_enemy_speed")]
    pub speed: f32,
}

fn default_enemy_hp() -> i32 { 1 }
fn default_enemy_speed() -> f32 { 50.0 }

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GimmickKind {
    Door,
    Button,
    Key,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GimmickData {
    pub kind: GimmickKind,
    #[serde(default)]
    pub is_locked: bool,
    /// Frame shown while open; doors without one reuse the closed frame.
    #[serde(default)]
    pub open_frame: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Default, Deserialize)]
pub struct TileDefinition {
    #[serde(default)]
    pub category: TileCategory,
    #[serde(default)]
    pub texture: String,
    #[serde(default)]
    pub frame: u32,
    #[serde(default)]
    pub is_breakable: bool,
    #[serde(default)]
    pub hp: Option<i32>,
    #[serde(default)]
    pub weapon: Option<WeaponData>,
    #[serde(default)]
    pub enemy: Option<EnemyData>,
    #[serde(default)]
    pub gimmick: Option<GimmickData>,
}

impl TileDefinition {
    /// Starting HP of a breakable wall. Always > 0.
    pub fn wall_hp(&self) -> i32 {
        self.hp.filter(|&hp| hp > 0).unwrap_or(1)
    }

    pub fn is_locked(&self) -> bool {
        self.gimmick.as_ref().map_or(false, |g| g.is_locked)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read tile catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tile catalog parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// TOML schema: `[tiles.<SYMBOL>]` tables.
#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tiles: HashMap<String, TileDefinition>,
}

#[derive(Clone, Debug)]
pub struct TileCatalog {
    defs: HashMap<String, TileDefinition>,
}

// ── Lookup ──

impl TileCatalog {
    pub fn get(&self, symbol: &str) -> Option<&TileDefinition> {
        self.defs.get(symbol)
    }

    /// Category of a symbol; missing symbols count as `Empty`.
    pub fn category(&self, symbol: &str) -> TileCategory {
        self.get(symbol).map_or(TileCategory::Empty, |d| d.category)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Every symbol with its definition, sorted by symbol.
    pub fn entries(&self) -> Vec<(&str, &TileDefinition)> {
        let mut out: Vec<_> = self.defs.iter().map(|(k, v)| (k.as_str(), v)).collect();
        out.sort_unstable_by_key(|&(k, _)| k);
        out
    }
}

// ── Loading ──

impl TileCatalog {
    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text)?;
        Ok(TileCatalog { defs: file.tiles })
    }

    /// Overlay `other` on top of this catalog (same symbol = replaced).
    pub fn merge(&mut self, other: TileCatalog) {
        self.defs.extend(other.defs);
    }

    /// Built-in catalog with an optional TOML overlay file.
    pub fn load(overlay: Option<&Path>) -> Result<Self, CatalogError> {
        let mut catalog = TileCatalog::builtin();
        if let Some(path) = overlay {
            let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let extra = TileCatalog::from_toml(&text)?;
            tracing::info!("tile catalog overlay {} adds {} symbols", path.display(), extra.len());
            catalog.merge(extra);
        }
        Ok(catalog)
    }

    pub fn builtin() -> Self {
        let mut defs = HashMap::new();

        defs.insert(" ".into(), TileDefinition::default());
        defs.insert("P".into(), plain(TileCategory::Player, "player_idle", 0));
        defs.insert("G".into(), plain(TileCategory::Goal, "tileset", 0));

        // Walls
        defs.insert("W".into(), plain(TileCategory::Wall, "tileset", 2));
        defs.insert("BW1".into(), breakable("tileset", 1, 1));
        defs.insert("BW3".into(), breakable("tileset", 3, 3));

        // Movable blocks
        defs.insert("R1".into(), plain(TileCategory::Stone, "circle", 0));
        defs.insert("R3".into(), plain(TileCategory::Ice, "circle", 2));
        defs.insert("I1".into(), plain(TileCategory::Ice, "ice", 0));

        // Items
        defs.insert("S1".into(), TileDefinition {
            weapon: Some(WeaponData {
                id: "SWORD".into(),
                name: "Sword".into(),
                range: 28.0,
                size: 24.0,
                damage: 2,
                cooldown_ms: 300,
            }),
            ..plain(TileCategory::Item, "items", 0)
        });

        // Enemies
        defs.insert("E1".into(), TileDefinition {
            enemy: Some(EnemyData {
                id: "E_SLIME".into(),
                name: "Slime".into(),
                hp: 1,
                move_type: MoveType::Wander,
                speed: 50.0,
            }),
            ..plain(TileCategory::Enemy, "enemies", 0)
        });
        defs.insert("E2".into(), TileDefinition {
            enemy: Some(EnemyData {
                id: "E_BAT".into(),
                name: "Bat".into(),
                hp: 2,
                move_type: MoveType::Horizontal,
                speed: 60.0,
            }),
            ..plain(TileCategory::Enemy, "enemies", 1)
        });

        // Gimmicks
        defs.insert("D1".into(), gimmick(GimmickKind::Door, false, 4, Some(5)));
        defs.insert("LD1".into(), gimmick(GimmickKind::Door, true, 6, Some(7)));
        defs.insert("KD1".into(), gimmick(GimmickKind::Door, true, 6, Some(7)));
        defs.insert("B1".into(), gimmick(GimmickKind::Button, false, 8, None));
        defs.insert("K1".into(), TileDefinition {
            texture: "items".into(),
            ..gimmick(GimmickKind::Key, false, 1, None)
        });

        TileCatalog { defs }
    }
}

/// Default tile id for an entity type that carries no `tileId`.
pub fn default_tile_for(kind: GimmickKind) -> &'static str {
    match kind {
        GimmickKind::Door => "D1",
        GimmickKind::Button => "B1",
        GimmickKind::Key => "K1",
    }
}

fn plain(category: TileCategory, texture: &str, frame: u32) -> TileDefinition {
    TileDefinition {
        category,
        texture: texture.into(),
        frame,
        ..TileDefinition::default()
    }
}

fn breakable(texture: &str, frame: u32, hp: i32) -> TileDefinition {
    TileDefinition {
        is_breakable: true,
        hp: Some(hp),
        ..plain(TileCategory::Wall, texture, frame)
    }
}

fn gimmick(kind: GimmickKind, is_locked: bool, frame: u32, open_frame: Option<u32>) -> TileDefinition {
    TileDefinition {
        gimmick: Some(GimmickData { kind, is_locked, open_frame }),
        ..plain(TileCategory::Gimmick, "gimmicks", frame)
    }
}
