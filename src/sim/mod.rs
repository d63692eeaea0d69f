pub mod event;
pub mod level;
pub mod map;
pub mod save;
pub mod step;
pub mod world;
