/// Dungeon persistence: create / get / list dungeon records.
///
/// ## Record
///
///   name, description, time limit (s), difficulty, status, and the
///   MapData document serialized to one JSON text blob.
///
/// ## Status gate
///
///   DRAFT     : structural checks only (grid shape, entity placement).
///   PUBLISHED : structural + playability (one player, a goal).
///
/// A record that fails its gate is never stored.
///
/// ## Backends
///
///   `MemoryDungeonStore`: RwLock'd map, for tests and one-off runs.
///   `FileDungeonStore`  : one `dungeon_<id>.json` per record, written
///                          to a temp file and renamed into place.
///
/// Ids are assigned in creation order, so listing by id descending is
/// listing newest first.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::tile::TileCatalog;
use crate::sim::map::{EntityData, EntityType, MapData, MapError};

pub type DungeonId = u64;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DungeonStatus {
    Draft,
    Published,
}

/// Input to `create_dungeon`.
#[derive(Clone, Debug)]
pub struct NewDungeon {
    pub name: String,
    pub description: String,
    /// Seconds.
    pub time_limit: u32,
    pub map: MapData,
    pub status: DungeonStatus,
    pub is_template: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dungeon {
    pub id: DungeonId,
    pub name: String,
    pub description: String,
    pub time_limit: u32,
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    pub status: DungeonStatus,
    #[serde(default)]
    pub is_template: bool,
    /// MapData as JSON text.
    pub map_data: String,
}

fn default_difficulty() -> u32 { 1 }

impl Dungeon {
    pub fn map(&self) -> std::result::Result<MapData, MapError> {
        MapData::from_json(&self.map_data)
    }

    pub fn summary(&self) -> DungeonSummary {
        DungeonSummary {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            time_limit: self.time_limit,
            difficulty: self.difficulty,
            status: self.status,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DungeonSummary {
    pub id: DungeonId,
    pub name: String,
    pub description: String,
    pub time_limit: u32,
    pub difficulty: u32,
    pub status: DungeonStatus,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dungeon store lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dungeon {0} not found")]
    NotFound(DungeonId),

    #[error("map rejected for {status:?}: {source}")]
    InvalidMap {
        status: DungeonStatus,
        #[source]
        source: MapError,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

// ══════════════════════════════════════════════════════════════
// Contract
// ══════════════════════════════════════════════════════════════

pub trait DungeonStore: Send + Sync {
    fn create_dungeon(&self, new: NewDungeon) -> Result<DungeonId>;

    fn get_dungeon(&self, id: DungeonId) -> Result<Dungeon>;

    /// Newest first.
    fn list_dungeons(&self) -> Result<Vec<DungeonSummary>>;
}

/// Apply the status gate and turn the input into a record.
fn prepare(new: NewDungeon, id: DungeonId, catalog: &TileCatalog) -> Result<Dungeon> {
    let checked = match new.status {
        DungeonStatus::Draft => new.map.validate_structure(catalog),
        DungeonStatus::Published => new.map.validate_playable(catalog),
    };
    checked.map_err(|source| StoreError::InvalidMap { status: new.status, source })?;

    let map_data = serde_json::to_string(&new.map)?;
    Ok(Dungeon {
        id,
        name: new.name,
        description: new.description,
        time_limit: new.time_limit,
        difficulty: default_difficulty(),
        status: new.status,
        is_template: new.is_template,
        map_data,
    })
}

// ══════════════════════════════════════════════════════════════
// In-memory backend
// ══════════════════════════════════════════════════════════════

pub struct MemoryDungeonStore {
    catalog: TileCatalog,
    records: RwLock<BTreeMap<DungeonId, Dungeon>>,
}

impl MemoryDungeonStore {
    pub fn new(catalog: TileCatalog) -> Self {
        Self { catalog, records: RwLock::new(BTreeMap::new()) }
    }
}

impl DungeonStore for MemoryDungeonStore {
    fn create_dungeon(&self, new: NewDungeon) -> Result<DungeonId> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let id = records.keys().next_back().map_or(1, |last| last + 1);
        let record = prepare(new, id, &self.catalog)?;
        records.insert(id, record);
        Ok(id)
    }

    fn get_dungeon(&self, id: DungeonId) -> Result<Dungeon> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        records.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn list_dungeons(&self) -> Result<Vec<DungeonSummary>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.values().rev().map(Dungeon::summary).collect())
    }
}

// ══════════════════════════════════════════════════════════════
// File backend
// ══════════════════════════════════════════════════════════════

pub struct FileDungeonStore {
    base_dir: PathBuf,
    catalog: TileCatalog,
    /// Serializes id allocation + write.
    write_lock: RwLock<()>,
}

impl FileDungeonStore {
    pub fn open(base_dir: impl AsRef<Path>, catalog: TileCatalog) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir, catalog, write_lock: RwLock::new(()) })
    }

    fn record_path(&self, id: DungeonId) -> PathBuf {
        self.base_dir.join(format!("dungeon_{}.json", id))
    }

    fn ids(&self) -> Result<Vec<DungeonId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let id = path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix("dungeon_"))
                .and_then(|s| s.strip_suffix(".json"))
                .and_then(|s| s.parse::<DungeonId>().ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn read_record(&self, id: DungeonId) -> Result<Dungeon> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id));
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl DungeonStore for FileDungeonStore {
    fn create_dungeon(&self, new: NewDungeon) -> Result<DungeonId> {
        let _guard = self.write_lock.write().map_err(|_| StoreError::LockPoisoned)?;
        let id = self.ids()?.last().map_or(1, |last| last + 1);
        let record = prepare(new, id, &self.catalog)?;

        let path = self.record_path(id);
        let temp_path = path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(&record)?;
        if let Err(e) = fs::write(&temp_path, text).and_then(|_| fs::rename(&temp_path, &path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        tracing::info!("saved dungeon {} {:?} to {}", id, record.name, path.display());
        Ok(id)
    }

    fn get_dungeon(&self, id: DungeonId) -> Result<Dungeon> {
        let _guard = self.write_lock.read().map_err(|_| StoreError::LockPoisoned)?;
        self.read_record(id)
    }

    fn list_dungeons(&self) -> Result<Vec<DungeonSummary>> {
        let _guard = self.write_lock.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut out = Vec::new();
        for id in self.ids()?.into_iter().rev() {
            match self.read_record(id) {
                Ok(d) => out.push(d.summary()),
                Err(e) => tracing::warn!("skipping unreadable dungeon {}: {}", id, e),
            }
        }
        Ok(out)
    }
}

// ══════════════════════════════════════════════════════════════
// Sample dungeons
// ══════════════════════════════════════════════════════════════

fn sample(name: &str, description: &str, time_limit: u32, rows: &[&[&str]], entities: Vec<EntityData>) -> NewDungeon {
    let mut map = MapData::from_rows(rows);
    map.entities = entities;
    NewDungeon {
        name: name.into(),
        description: description.into(),
        time_limit,
        map,
        status: DungeonStatus::Published,
        is_template: true,
    }
}

/// The built-in template dungeons, one per mechanic.
pub fn sample_dungeons() -> Vec<NewDungeon> {
    vec![
        sample(
            "Simple",
            "Reach the goal from the start before time runs out",
            10,
            &[
                &["W", "W", "W", "W", "W"],
                &["W", "P", " ", " ", "W"],
                &["W", " ", " ", " ", "W"],
                &["W", " ", " ", "G", "W"],
                &["W", "W", "W", "W", "W"],
            ],
            vec![],
        ),
        sample(
            "Breakable Walls",
            "Pick up the sword and break through to the goal",
            120,
            &[
                &["W", "W", "W", "W", "W", "W", "W", "W", "W"],
                &["W", "P", "W", "S1", "W", " ", " ", " ", "W"],
                &["W", " ", "W", " ", "W", " ", "W", " ", "W"],
                &["W", " ", "W", " ", "W", " ", "W", "BW1", "W"],
                &["W", " ", " ", " ", "BW1", " ", "W", "G", "W"],
                &["W", "W", "W", "W", "W", "W", "W", "W", "W"],
            ],
            vec![],
        ),
        sample(
            "Movable Stones",
            "Push the stones out of the way to reach the goal",
            120,
            &[
                &["W", "W", "W", "W", "W", "W", "W", "W", "W"],
                &["W", "P", " ", " ", " ", " ", " ", " ", "W"],
                &["W", " ", "R3", " ", "R1", " ", " ", " ", "W"],
                &["W", " ", " ", " ", "R1", " ", " ", " ", "W"],
                &["W", " ", " ", "W", "G", "W", " ", " ", "W"],
                &["W", " ", " ", "W", "W", "W", " ", " ", "W"],
                &["W", " ", " ", " ", " ", " ", " ", " ", "W"],
                &["W", "W", "W", "W", "W", "W", "W", "W", "W"],
            ],
            vec![],
        ),
        sample(
            "Key and Door",
            "Find the key to open the locked door",
            120,
            &[
                &["W", "W", "W", "W", "W", "W"],
                &["W", "P", " ", " ", " ", "W"],
                &["W", " ", " ", " ", " ", "W"],
                &["W", " ", " ", "W", " ", "W"],
                &["W", " ", " ", "W", "G", "W"],
                &["W", "W", "W", "W", "W", "W"],
            ],
            vec![
                EntityData::new("door_A", EntityType::Door, 4, 3).with_tile("KD1").with_target("key_A"),
                EntityData::new("key_A", EntityType::Key, 2, 2).with_tile("K1").with_target("door_A"),
            ],
        ),
        sample(
            "Button and Door",
            "Hold the button down to open the door",
            120,
            &[
                &["W", "W", "W", "W", "W", "W"],
                &["W", "P", " ", " ", " ", "W"],
                &["W", " ", " ", " ", " ", "W"],
                &["W", "R1", " ", "W", " ", "W"],
                &["W", " ", " ", "W", "G", "W"],
                &["W", "W", "W", "W", "W", "W"],
            ],
            vec![
                EntityData::new("door_A", EntityType::Door, 4, 3).with_tile("D1"),
                EntityData::new("btn_A", EntityType::Button, 1, 4).with_tile("B1").with_target("door_A"),
            ],
        ),
    ]
}

/// Store every sample dungeon. Returns their ids in creation order.
pub fn install_samples(store: &dyn DungeonStore) -> Result<Vec<DungeonId>> {
    let mut ids = Vec::new();
    for d in sample_dungeons() {
        ids.push(store.create_dungeon(d)?);
    }
    tracing::info!("installed {} sample dungeons", ids.len());
    Ok(ids)
}
