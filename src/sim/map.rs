/// MapData: the serialized tile grid + entity list describing one dungeon.
///
/// ## JSON shape
///
///   ```text
///   {
///     "tiles":    [["W","W","W"], ["W","P","W"], ...],
///     "entities": [{ "id": "door_A", "type": "DOOR", "x": 4, "y": 3,
///                    "properties": { "tileId": "D1", "targetId": "btn_A" } }],
///     "width": 5, "height": 5          (optional)
///   }
///   ```
///
/// `entities` may be omitted. `width`/`height` are derived from the grid
/// when missing and must match it when present.
///
/// ## Validation levels
///
///   structure : rectangular grid, size match, unique entity ids,
///                entities strictly inside the outer ring, DOOR/BUTTON
///                not on a WALL tile. Required for every saved map.
///   playable  : structure + exactly one PLAYER + at least one GOAL.
///                Required before a map may be published or played.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::tile::{GimmickKind, TileCatalog, TileCategory};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Key,
    Door,
    Button,
}

impl EntityType {
    pub fn gimmick_kind(self) -> GimmickKind {
        match self {
            EntityType::Key => GimmickKind::Key,
            EntityType::Door => GimmickKind::Door,
            EntityType::Button => GimmickKind::Button,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityData {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub properties: EntityProperties,
}

impl EntityData {
    pub fn new(id: &str, kind: EntityType, x: i32, y: i32) -> Self {
        EntityData { id: id.into(), kind, x, y, properties: EntityProperties::default() }
    }

    pub fn with_tile(mut self, tile_id: &str) -> Self {
        self.properties.tile_id = Some(tile_id.into());
        self
    }

    pub fn with_target(mut self, target_id: &str) -> Self {
        self.properties.target_id = Some(target_id.into());
        self
    }

    pub fn target_id(&self) -> Option<&str> {
        self.properties.target_id.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapData {
    pub tiles: Vec<Vec<String>>,
    #[serde(default)]
    pub entities: Vec<EntityData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<usize>,
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tile grid is empty")]
    Empty,

    #[error("tile grid is not rectangular: row {row} has {len} cells, expected {expected}")]
    Ragged { row: usize, len: usize, expected: usize },

    #[error("declared size {declared_w}x{declared_h} does not match grid {actual_w}x{actual_h}")]
    SizeMismatch {
        declared_w: usize,
        declared_h: usize,
        actual_w: usize,
        actual_h: usize,
    },

    #[error("entity id {0:?} is used more than once")]
    DuplicateEntityId(String),

    #[error("entity {id:?} at ({x},{y}) is not inside the outer wall ring")]
    EntityOutOfBounds { id: String, x: i32, y: i32 },

    #[error("entity {id:?} at ({x},{y}) sits on a wall tile")]
    EntityOnWall { id: String, x: i32, y: i32 },

    #[error("map must have exactly one player start, found {0}")]
    PlayerCount(usize),

    #[error("map has no goal")]
    NoGoal,
}

impl MapData {
    pub fn new(tiles: Vec<Vec<String>>, entities: Vec<EntityData>) -> Self {
        MapData { tiles, entities, width: None, height: None }
    }

    /// Build a grid from string rows of symbols.
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        let tiles = rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect();
        MapData::new(tiles, Vec::new())
    }

    pub fn from_json(text: &str) -> Result<Self, MapError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, MapError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn grid_width(&self) -> usize {
        self.tiles.first().map_or(0, |r| r.len())
    }

    pub fn grid_height(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&str> {
        if x < 0 || y < 0 {
            return None;
        }
        self.tiles
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .map(String::as_str)
    }

    /// Cells whose tile has the given category, row-major.
    pub fn cells_of(&self, catalog: &TileCatalog, category: TileCategory) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for (y, row) in self.tiles.iter().enumerate() {
            for (x, sym) in row.iter().enumerate() {
                if catalog.category(sym) == category {
                    out.push((x, y));
                }
            }
        }
        out
    }
}

// ══════════════════════════════════════════════════════════════
// Validation
// ══════════════════════════════════════════════════════════════

impl MapData {
    pub fn validate_structure(&self, catalog: &TileCatalog) -> Result<(), MapError> {
        let h = self.grid_height();
        let w = self.grid_width();
        if h == 0 || w == 0 {
            return Err(MapError::Empty);
        }
        for (row, cells) in self.tiles.iter().enumerate() {
            if cells.len() != w {
                return Err(MapError::Ragged { row, len: cells.len(), expected: w });
            }
        }
        let declared_w = self.width.unwrap_or(w);
        let declared_h = self.height.unwrap_or(h);
        if declared_w != w || declared_h != h {
            return Err(MapError::SizeMismatch { declared_w, declared_h, actual_w: w, actual_h: h });
        }

        let mut seen = HashSet::new();
        for e in &self.entities {
            if !seen.insert(e.id.as_str()) {
                return Err(MapError::DuplicateEntityId(e.id.clone()));
            }
            let inside = e.x >= 1 && e.y >= 1 && (e.x as usize) < w - 1 && (e.y as usize) < h - 1;
            if !inside {
                return Err(MapError::EntityOutOfBounds { id: e.id.clone(), x: e.x, y: e.y });
            }
            let overlay = matches!(e.kind, EntityType::Door | EntityType::Button);
            let under = self.tile(e.x, e.y).unwrap_or(" ");
            if overlay && catalog.category(under) == TileCategory::Wall {
                return Err(MapError::EntityOnWall { id: e.id.clone(), x: e.x, y: e.y });
            }
        }
        Ok(())
    }

    pub fn validate_playable(&self, catalog: &TileCatalog) -> Result<(), MapError> {
        self.validate_structure(catalog)?;
        let players = self.cells_of(catalog, TileCategory::Player).len();
        if players != 1 {
            return Err(MapError::PlayerCount(players));
        }
        if self.cells_of(catalog, TileCategory::Goal).is_empty() {
            return Err(MapError::NoGoal);
        }
        Ok(())
    }
}

/// Test maps from single-character rows.
///
///   `#` W     `.` empty  `P` player  `G` goal    `S` sword
///   `1` BW1   `3` BW3    `R` stone   `I` ice     `E` slime  `H` bat
///   `D` door  `L` locked door        `b` button  `k` key
#[cfg(test)]
pub fn ascii(rows: &[&str]) -> MapData {
    let tiles = rows
        .iter()
        .map(|r| {
            r.chars()
                .map(|c| match c {
                    '#' => "W",
                    'P' => "P",
                    'G' => "G",
                    'S' => "S1",
                    '1' => "BW1",
                    '3' => "BW3",
                    'R' => "R1",
                    'I' => "I1",
                    'E' => "E1",
                    'H' => "E2",
                    'D' => "D1",
                    'L' => "LD1",
                    'b' => "B1",
                    'k' => "K1",
                    _ => " ",
                }
                .to_string())
                .collect()
        })
        .collect();
    MapData::new(tiles, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TileCatalog {
        TileCatalog::builtin()
    }

    #[test]
    fn parses_minimal_document() {
        let m = MapData::from_json(r#"{"tiles":[["W","W","W"],["W","P","W"],["W","G","W"]]}"#).unwrap();
        assert!(m.entities.is_empty());
        assert_eq!((m.grid_width(), m.grid_height()), (3, 3));
        assert!(m.validate_structure(&catalog()).is_ok());
    }

    #[test]
    fn round_trip_keeps_grid_and_entity_order() {
        let mut m = ascii(&["#####", "#P..#", "#...#", "#..G#", "#####"]);
        m.entities = vec![
            EntityData::new("key_A", EntityType::Key, 2, 2).with_target("door_A"),
            EntityData::new("door_A", EntityType::Door, 3, 1).with_tile("LD1"),
            EntityData::new("btn", EntityType::Button, 1, 3),
        ];
        let json = m.to_json().unwrap();
        assert!(json.contains(r#""type":"KEY""#));
        assert!(json.contains(r#""targetId":"door_A""#));
        let back = MapData::from_json(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn ragged_grid_is_rejected() {
        let m = MapData::from_rows(&[&["W", "W", "W"], &["W", "P"], &["W", "W", "W"]]);
        assert!(matches!(
            m.validate_structure(&catalog()),
            Err(MapError::Ragged { row: 1, len: 2, expected: 3 })
        ));
    }

    #[test]
    fn declared_size_must_match() {
        let mut m = ascii(&["###", "#P#", "###"]);
        m.width = Some(4);
        assert!(matches!(m.validate_structure(&catalog()), Err(MapError::SizeMismatch { .. })));
    }

    #[test]
    fn entity_on_border_is_rejected() {
        let mut m = ascii(&["####", "#P.#", "#.G#", "####"]);
        m.entities.push(EntityData::new("k", EntityType::Key, 3, 1));
        assert!(matches!(
            m.validate_structure(&catalog()),
            Err(MapError::EntityOutOfBounds { x: 3, y: 1, .. })
        ));
    }

    #[test]
    fn door_on_wall_is_rejected_but_key_is_not_checked() {
        let mut m = ascii(&["#####", "#P#.#", "#..G#", "#####"]);
        m.entities.push(EntityData::new("k", EntityType::Key, 2, 1));
        assert!(m.validate_structure(&catalog()).is_ok());
        m.entities.push(EntityData::new("d", EntityType::Door, 2, 1));
        assert!(matches!(m.validate_structure(&catalog()), Err(MapError::EntityOnWall { .. })));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut m = ascii(&["#####", "#P..#", "#..G#", "#####"]);
        m.entities.push(EntityData::new("a", EntityType::Door, 2, 1));
        m.entities.push(EntityData::new("a", EntityType::Button, 1, 2));
        assert!(matches!(m.validate_structure(&catalog()), Err(MapError::DuplicateEntityId(id)) if id == "a"));
    }

    #[test]
    fn playability_needs_one_player_and_a_goal() {
        let c = catalog();
        let no_goal = ascii(&["####", "#P.#", "####"]);
        assert!(no_goal.validate_structure(&c).is_ok());
        assert!(matches!(no_goal.validate_playable(&c), Err(MapError::NoGoal)));

        let two = ascii(&["#####", "#PPG#", "#####"]);
        assert!(matches!(two.validate_playable(&c), Err(MapError::PlayerCount(2))));

        let ok = ascii(&["####", "#PG#", "####"]);
        assert!(ok.validate_playable(&c).is_ok());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(MapData::from_json("{\"tiles\": 3}"), Err(MapError::Json(_))));
    }
}
