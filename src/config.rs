/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub dungeons_dir: PathBuf,
    /// Optional TOML tile catalog merged over the built-in one.
    pub catalog: Option<PathBuf>,
    pub log_dir: PathBuf,
    /// Enemy AI seed; 0 = seed from entropy.
    pub seed: u64,
    /// Problem met while reading config.toml. Logged once logging is up.
    pub load_warning: Option<String>,
}

/// Timing of the simulation. All durations are milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    /// px/s
    pub player_speed: f32,
    pub block_cell_ms: u32,      // pushed-block travel time per cell
    pub hit_region_ms: u32,      // how long an attack's hit box stays visible
    pub enemy_flash_ms: u32,
    pub enemy_turn_min_ms: u32,
    pub enemy_turn_max_ms: u32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        TomlSpeed::default().into()
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_player_speed")]
    player_speed: f32,
    #[serde(default = "default_block_cell")]
    block_cell_ms: u32,
    #[serde(default = "default_hit_region")]
    hit_region_ms: u32,
    #[serde(default = "default_enemy_flash")]
    enemy_flash_ms: u32,
    #[serde(default = "default_turn_min")]
    enemy_turn_min_ms: u32,
    #[serde(default = "default_turn_max")]
    enemy_turn_max_ms: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_dungeons_dir")]
    dungeons_dir: String,
    #[serde(default)]
    catalog: String,
    #[serde(default = "default_log_dir")]
    log_dir: String,
    #[serde(default)]
    seed: u64,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_player_speed() -> f32 { 80.0 }
fn default_block_cell() -> u32 { 120 }
fn default_hit_region() -> u32 { 100 }
fn default_enemy_flash() -> u32 { 100 }
fn default_turn_min() -> u32 { 500 }
fn default_turn_max() -> u32 { 2000 }
fn default_dungeons_dir() -> String { "dungeons".into() }
fn default_log_dir() -> String { "logs".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            player_speed: default_player_speed(),
            block_cell_ms: default_block_cell(),
            hit_region_ms: default_hit_region(),
            enemy_flash_ms: default_enemy_flash(),
            enemy_turn_min_ms: default_turn_min(),
            enemy_turn_max_ms: default_turn_max(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            dungeons_dir: default_dungeons_dir(),
            catalog: String::new(),
            log_dir: default_log_dir(),
            seed: 0,
        }
    }
}

impl From<TomlSpeed> for SpeedConfig {
    fn from(s: TomlSpeed) -> Self {
        let tick_rate_ms = s.tick_rate_ms.max(1);
        // A reversed turn range collapses to its minimum.
        let enemy_turn_max_ms = s.enemy_turn_max_ms.max(s.enemy_turn_min_ms);
        SpeedConfig {
            tick_rate_ms,
            player_speed: s.player_speed,
            block_cell_ms: s.block_cell_ms,
            hit_region_ms: s.hit_region_ms,
            enemy_flash_ms: s.enemy_flash_ms,
            enemy_turn_min_ms: s.enemy_turn_min_ms,
            enemy_turn_max_ms,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let (toml_cfg, warning) = load_toml(&search_dirs);
        let mut cfg = GameConfig::from_schema(toml_cfg, &search_dirs);
        cfg.load_warning = warning;
        cfg
    }

    /// Parse a config document. Relative paths resolve against the
    /// working directory.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg: TomlConfig = toml::from_str(text)?;
        Ok(GameConfig::from_schema(toml_cfg, &[]))
    }

    fn from_schema(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let general = toml_cfg.general;
        let catalog = if general.catalog.is_empty() {
            None
        } else {
            Some(resolve_path(&general.catalog, search_dirs, Path::is_file))
        };

        GameConfig {
            speed: toml_cfg.speed.into(),
            dungeons_dir: resolve_path(&general.dungeons_dir, search_dirs, Path::is_dir),
            catalog,
            log_dir: PathBuf::from(general.log_dir),
            seed: general.seed,
            load_warning: None,
        }
    }
}

/// Absolute paths are kept; relative ones are looked up in the candidate
/// directories and default to CWD-relative.
fn resolve_path(raw: &str, search_dirs: &[PathBuf], exists: fn(&Path) -> bool) -> PathBuf {
    let p = PathBuf::from(raw);
    if p.is_absolute() {
        return p;
    }
    search_dirs.iter()
        .map(|d| d.join(raw))
        .find(|c| exists(c))
        .unwrap_or(p)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> (TomlConfig, Option<String>) {
    let mut warning = None;
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return (cfg, None),
                    Err(e) => {
                        let msg = format!("{} parse error: {e}; using default settings", path.display());
                        return (TomlConfig::default(), Some(msg));
                    }
                },
                Err(e) => {
                    warning = Some(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    (TomlConfig::default(), warning)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = GameConfig::parse("").unwrap();
        assert_eq!(cfg.speed, SpeedConfig::default());
        assert_eq!(cfg.speed.tick_rate_ms, 16);
        assert_eq!(cfg.speed.player_speed, 80.0);
        assert_eq!(cfg.dungeons_dir, PathBuf::from("dungeons"));
        assert!(cfg.catalog.is_none());
        assert_eq!(cfg.seed, 0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::parse("[speed]\nblock_cell_ms = 60\n\n[general]\nseed = 42\ncatalog = \"tiles.toml\"\n").unwrap();
        assert_eq!(cfg.speed.block_cell_ms, 60);
        assert_eq!(cfg.speed.hit_region_ms, 100);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.catalog, Some(PathBuf::from("tiles.toml")));
    }

    #[test]
    fn reversed_turn_range_collapses() {
        let cfg = GameConfig::parse("[speed]\nenemy_turn_min_ms = 900\nenemy_turn_max_ms = 100\n").unwrap();
        assert_eq!(cfg.speed.enemy_turn_min_ms, 900);
        assert_eq!(cfg.speed.enemy_turn_max_ms, 900);
    }

    #[test]
    fn bad_types_are_errors() {
        assert!(GameConfig::parse("[speed]\ntick_rate_ms = \"fast\"\n").is_err());
    }
}
