/// Entry point: dungeon store commands and the terminal game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::GameConfig;
use domain::tile::TileCatalog;
use sim::level;
use sim::map::MapData;
use sim::save::{
    self, DungeonStatus, DungeonStore, FileDungeonStore, MemoryDungeonStore, NewDungeon,
};
use sim::step;
use sim::world::WorldState;
use ui::input::InputState;
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Time limit for imported dungeons when `--time` is not given.
const DEFAULT_TIME_LIMIT: u32 = 120;

/// Build, store and play tile-grid dungeons in the terminal.
#[derive(Parser)]
#[command(name = "dungeon-forge")]
#[command(about = "Build, store and play tile-grid dungeons", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file to use instead of searching for config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List stored dungeons, newest first
    List,

    /// Install the built-in sample dungeons
    Seed,

    /// Store a MapData JSON file as a new dungeon
    Import {
        file: PathBuf,
        /// Store as PUBLISHED (requires a playable map)
        #[arg(long)]
        publish: bool,
        #[arg(long)]
        name: Option<String>,
        /// Time limit in seconds (0 = untimed)
        #[arg(long)]
        time: Option<u32>,
    },

    /// Play a stored dungeon by id, or a MapData JSON file
    Play {
        target: String,
        /// Time limit for a file target (0 = untimed)
        #[arg(long)]
        time: Option<u32>,
    },

    /// Check a MapData JSON file against the DRAFT and PUBLISHED gates
    Validate { file: PathBuf },

    /// Print the tile catalog, built-in symbols plus any overlay
    Tiles,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            GameConfig::parse(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => GameConfig::load(),
    };
    let _log_guard = setup_logging(&config.log_dir)?;
    if let Some(warning) = &config.load_warning {
        tracing::warn!("{}", warning);
    }

    let catalog = TileCatalog::load(config.catalog.as_deref())
        .context("loading tile catalog")?;

    match cli.command.unwrap_or(Command::List) {
        Command::List => list(&open_store(&config, &catalog)?),
        Command::Seed => {
            let ids = save::install_samples(&open_store(&config, &catalog)?)?;
            println!("Installed {} sample dungeons (ids {:?})", ids.len(), ids);
            Ok(())
        }
        Command::Import { file, publish, name, time } => {
            let store = open_store(&config, &catalog)?;
            let map = read_map(&file)?;
            let new = NewDungeon {
                name: name.unwrap_or_else(|| file_title(&file)),
                description: String::new(),
                time_limit: time.unwrap_or(DEFAULT_TIME_LIMIT),
                map,
                status: if publish { DungeonStatus::Published } else { DungeonStatus::Draft },
                is_template: false,
            };
            let id = store.create_dungeon(new)?;
            println!("Stored dungeon {}", id);
            Ok(())
        }
        Command::Play { target, time } => {
            let (title, map, time_limit) = match target.parse::<save::DungeonId>() {
                Ok(id) => {
                    let dungeon = open_store(&config, &catalog)?.get_dungeon(id)?;
                    let map = dungeon.map()?;
                    (dungeon.name, map, time.unwrap_or(dungeon.time_limit))
                }
                Err(_) => {
                    let path = PathBuf::from(&target);
                    (file_title(&path), read_map(&path)?, time.unwrap_or(DEFAULT_TIME_LIMIT))
                }
            };
            play(&config, catalog, &title, map, time_limit)
        }
        Command::Validate { file } => validate(&catalog, &file),
        Command::Tiles => {
            tiles(&catalog);
            Ok(())
        }
    }
}

/// Log to a file under `log_dir`; the terminal belongs to the game.
fn setup_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, "dungeon-forge.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    tracing::info!("Log file: {}/dungeon-forge.log", log_dir.display());
    Ok(guard)
}

fn open_store(config: &GameConfig, catalog: &TileCatalog) -> Result<FileDungeonStore> {
    FileDungeonStore::open(&config.dungeons_dir, catalog.clone())
        .with_context(|| format!("opening dungeon store {}", config.dungeons_dir.display()))
}

fn read_map(path: &Path) -> Result<MapData> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    MapData::from_json(&text).with_context(|| format!("parsing {}", path.display()))
}

fn file_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".into())
}

// ── Commands ──

fn list(store: &dyn DungeonStore) -> Result<()> {
    let dungeons = store.list_dungeons()?;
    if dungeons.is_empty() {
        println!("No dungeons stored. Run `dungeon-forge seed` to install the samples.");
        return Ok(());
    }
    println!("{:>4}  {:<10} {:>5}  {:>4}  {}", "ID", "STATUS", "TIME", "DIFF", "NAME");
    for d in dungeons {
        let status = match d.status {
            DungeonStatus::Draft => "draft",
            DungeonStatus::Published => "published",
        };
        println!("{:>4}  {:<10} {:>4}s  {:>4}  {}", d.id, status, d.time_limit, d.difficulty, d.name);
        if !d.description.is_empty() {
            println!("{:>4}  {}", "", d.description);
        }
    }
    Ok(())
}

/// Run the file through both status gates and the level builder.
fn validate(catalog: &TileCatalog, file: &Path) -> Result<()> {
    let map = read_map(file)?;
    let store = MemoryDungeonStore::new(catalog.clone());
    for status in [DungeonStatus::Draft, DungeonStatus::Published] {
        let new = NewDungeon {
            name: file_title(file),
            description: String::new(),
            time_limit: 0,
            map: map.clone(),
            status,
            is_template: false,
        };
        match store.create_dungeon(new) {
            Ok(_) => println!("{:?}: ok", status),
            Err(e) => println!("{:?}: {}", status, e),
        }
    }
    match level::build(&map.tiles, &map.entities, catalog) {
        Ok(built) => {
            println!("{} connections", built.connections.len());
            for warning in &built.warnings {
                println!("warning: {}", warning);
            }
        }
        Err(e) => println!("not buildable: {}", e),
    }
    Ok(())
}

fn tiles(catalog: &TileCatalog) {
    println!("{:<6} {:<8} {:<12} {}", "SYMBOL", "CATEGORY", "SPRITE", "DETAIL");
    for (symbol, def) in catalog.entries() {
        let sprite = format!("{}:{}", def.texture, def.frame);
        let detail = if let Some(w) = &def.weapon {
            format!("{} dmg {} range {} cooldown {}ms", w.name, w.damage, w.range, w.cooldown_ms)
        } else if let Some(e) = &def.enemy {
            format!("{} hp {} {:?}", e.name, e.hp, e.move_type)
        } else if let Some(g) = &def.gimmick {
            let mut d = format!("{:?}", g.kind);
            if def.is_locked() {
                d.push_str(" locked");
            }
            if let Some(f) = g.open_frame {
                d.push_str(&format!(" open:{}", f));
            }
            d
        } else if def.is_breakable {
            format!("breakable hp {}", def.wall_hp())
        } else {
            String::new()
        };
        println!("{:<6} {:<8} {:<12} {}", symbol, format!("{:?}", def.category), sprite, detail);
    }
}

fn play(config: &GameConfig, catalog: TileCatalog, title: &str, map: MapData, time_limit: u32) -> Result<()> {
    let seed = if config.seed == 0 { rand::random() } else { config.seed };
    tracing::info!("playing {:?} (enemy seed {})", title, seed);
    let mut world = WorldState::new(map, catalog, time_limit, config.speed.clone(), seed)?;

    let mut renderer = Renderer::new();
    let enhanced = renderer.init().context("terminal init failed")?;

    let result = game_loop(&mut world, &mut renderer, enhanced, config, title);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    result?;

    match world.outcome {
        Some(sim::world::Outcome::Cleared { score }) => println!("Dungeon cleared! Score: {}", score),
        Some(sim::world::Outcome::GameOver { reason }) => println!("Game over: {}", reason.label()),
        None => println!("Left the dungeon."),
    }
    Ok(())
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    enhanced: bool,
    config: &GameConfig,
    title: &str,
) -> Result<()> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced;
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);
    // Bodies move at most four ticks per step; the countdown gets the rest.
    let max_dt = tick_rate * 4;
    let mut last_tick = Instant::now();
    let mut pending_attack = false;

    loop {
        kb.drain_events();
        if kb.quit_pressed() {
            break;
        }
        if kb.restart_pressed() {
            world.restart()?;
            renderer.clear_message();
            pending_attack = false;
            last_tick = Instant::now();
        }

        let mut input = kb.frame_input();
        pending_attack |= input.attack;

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            input.attack = std::mem::take(&mut pending_attack);
            let dt_ms = elapsed.min(max_dt).as_millis() as u32;
            world.credit_countdown((elapsed.as_millis() as u32).saturating_sub(dt_ms));
            let events = step::step(world, input, dt_ms);
            renderer.note_events(&events);
            last_tick = Instant::now();
        }

        renderer.render(world, title)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}
