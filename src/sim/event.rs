/// Events emitted during a simulation step.
/// The presentation layer consumes these for HUD messages and logs.

use crate::domain::entity::Dir4;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameOverReason {
    Defeated,
    TimeUp,
}

impl GameOverReason {
    pub fn label(self) -> &'static str {
        match self {
            GameOverReason::Defeated => "defeated",
            GameOverReason::TimeUp => "time up",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    ItemPicked { x: i32, y: i32 },
    WeaponEquipped { name: String },
    KeyCollected { door_id: Option<String> },
    DoorUnlocked { id: String },
    DoorOpened { id: String },
    DoorClosed { id: String },
    BlockPushed { from: (i32, i32), to: (i32, i32), dir: Dir4 },
    Attack { dir: Dir4 },
    EnemyHit { x: f32, y: f32, hp: i32 },
    EnemyDestroyed { x: f32, y: f32 },
    WallHit { x: i32, y: i32, hp: i32 },
    WallDestroyed { x: i32, y: i32 },
    CountdownTick { remaining: u32 },
    Cleared { score: u32 },
    GameOver { reason: GameOverReason },
}
