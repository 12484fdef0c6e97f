mod level_up;
mod store;

pub use level_up::{LevelUpAnnouncer, LevelUpNotice};
pub use store::{level_for, ScoreSnapshot, ScoreStore};
